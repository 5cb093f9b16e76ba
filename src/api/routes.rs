use crate::backend::Backend;
use crate::engine::calendar::date_key;
use crate::model::Category;
use crate::store::AppStore;
use crate::view::{self, Dashboard, ReminderView, Stats, TaskView};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ApiState<B> {
    pub store: Arc<Mutex<AppStore<B>>>,
    pub port: u16,
}

impl<B> Clone for ApiState<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            port: self.port,
        }
    }
}

pub fn router<B>(state: ApiState<B>) -> Router
where
    B: Backend + Send + 'static,
{
    Router::new()
        .route("/api/v1/status", get(status::<B>))
        .route("/api/v1/dashboard", get(dashboard::<B>))
        .route("/api/v1/categories/:category", get(category_tasks::<B>))
        .route("/api/v1/reminders", get(reminders::<B>))
        .route("/api/v1/export", get(export::<B>))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    date: String,
    tasks: usize,
    habits: usize,
    active_reminders: usize,
    stats: Stats,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct CategoryPayload {
    category: Category,
    title: &'static str,
    description: &'static str,
    tasks: Vec<TaskView>,
}

async fn status<B: Backend>(State(state): State<ApiState<B>>) -> ApiResult<Json<StatusPayload>> {
    let store = state.store.lock().await;
    let app_state = store.state();
    let now = store.now();

    Ok(Json(StatusPayload {
        date: date_key(now.date_naive()),
        tasks: app_state.task_count(),
        habits: app_state.habits.len(),
        active_reminders: view::active_reminders(app_state, &now).len(),
        stats: store.stats(),
        api_port: state.port,
    }))
}

async fn dashboard<B: Backend>(State(state): State<ApiState<B>>) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.store.lock().await.dashboard()))
}

async fn category_tasks<B: Backend>(
    State(state): State<ApiState<B>>,
    Path(category): Path<String>,
) -> ApiResult<Json<CategoryPayload>> {
    let category = category
        .parse::<Category>()
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;

    let store = state.store.lock().await;
    let tasks = view::category_list(store.state(), category, store.now().date_naive());

    Ok(Json(CategoryPayload {
        category,
        title: category.title(),
        description: category.description(),
        tasks,
    }))
}

async fn reminders<B: Backend>(
    State(state): State<ApiState<B>>,
) -> ApiResult<Json<Vec<ReminderView>>> {
    let store = state.store.lock().await;
    Ok(Json(view::active_reminders(store.state(), &store.now())))
}

async fn export<B: Backend>(State(state): State<ApiState<B>>) -> ApiResult<Response> {
    let store = state.store.lock().await;
    let content = store.export_document()?;
    let filename = store.export_file_name();

    let mut response = Response::new(content.into_response().into_body());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))?,
    );

    Ok(response)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}
