//! Effective settings: config file plus command-line overrides.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use pyide_application::AppContext;
use pyide_core::config::WorkspaceConfig;
use pyide_core::engine::ExecutionBackend;
use pyide_execution::ProcessBackend;
use pyide_infrastructure::{ConfigService, JsonFileProjectStore, PyidePaths};
use tokio::task::JoinHandle;

pub struct Settings {
    pub config_service: ConfigService,
    pub config: WorkspaceConfig,
    pub store_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl Settings {
    pub fn resolve(
        config_path: Option<PathBuf>,
        store: Option<PathBuf>,
        interpreter: Option<String>,
    ) -> Result<Self> {
        let paths = PyidePaths::new(None);
        let config_service = match config_path {
            Some(path) => ConfigService::with_path(path),
            None => ConfigService::new()?,
        };

        let mut config = config_service.get_config();
        if let Some(store) = store {
            config.store_path = Some(store);
        }
        if let Some(program) = interpreter {
            config.interpreter.program = program;
        }

        let store_path = match &config.store_path {
            Some(path) => path.clone(),
            None => paths.project_file()?,
        };
        let logs_dir = match &config.logging.directory {
            Some(dir) => dir.clone(),
            None => paths.logs_dir()?,
        };

        Ok(Self {
            config_service,
            config,
            store_path,
            logs_dir,
        })
    }

    /// Loads the project from the configured store.
    pub async fn open_context(&self) -> AppContext {
        let store = Arc::new(JsonFileProjectStore::with_path(self.store_path.clone()));
        AppContext::open(store).await
    }

    /// Boots the configured interpreter in the background.
    pub fn start_engine(&self, context: &AppContext) -> Result<JoinHandle<()>> {
        let interpreter = self.config.interpreter.clone();
        let handle = context.start_engine(async move {
            let backend: Arc<dyn ExecutionBackend> = Arc::new(ProcessBackend::boot(interpreter).await?);
            Ok(backend)
        })?;
        Ok(handle)
    }
}
