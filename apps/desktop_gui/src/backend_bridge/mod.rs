//! Bridge between the UI thread and the controller's tokio runtime.

pub mod commands;
pub mod runtime;
