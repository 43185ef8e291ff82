pub mod config_service;
pub mod json_project_store;
pub mod memory_project_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_project_store::JsonFileProjectStore;
pub use crate::memory_project_store::InMemoryProjectStore;
pub use crate::paths::PyidePaths;
