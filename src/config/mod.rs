//! Application configuration and title selection files.

pub mod loader;
pub mod model;

pub use model::{AppConfig, FailurePolicy, LogFormat, OutputSelection, SelectionFile, TitleSelection};
