pub mod calendar;
pub mod daily;
pub mod expiry;
pub mod streak;
