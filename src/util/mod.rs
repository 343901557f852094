//! Utility modules

pub mod paths;
pub mod tasks;

pub use paths::{config_dir, config_path};
pub use tasks::TaskSet;
