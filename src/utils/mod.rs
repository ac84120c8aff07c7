pub mod calendar;
pub mod user_locks;
