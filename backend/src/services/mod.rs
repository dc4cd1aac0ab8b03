pub mod alarms;
pub mod auth;
pub mod executions;
pub mod insights;
pub mod routines;
pub mod time_format;
pub mod users;
