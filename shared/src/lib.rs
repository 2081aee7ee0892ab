//! Shared types for the Grabber workspace: the task model, the in-memory
//! registry, the format reducer and the progress line parser.
pub mod errors;
pub mod formats;
pub mod models;
pub mod progress;
pub mod task_registry;
