//! UI layer for the desktop GUI.

pub mod app;

pub use app::DocAgentApp;
