//! Command handlers -- one module per subcommand

pub mod config;
pub mod hosts;
pub mod import;
pub mod workspace;

use std::path::Path;

use ironscope_core::config::IronscopeConfig;
use ironscope_persistence::WorkspaceManager;

use crate::error::CliError;
use crate::logging;

/// Loaded configuration plus the workspace manager built from it.
pub struct Context {
    pub config: IronscopeConfig,
    pub workspaces: WorkspaceManager,
}

impl Context {
    /// Load config, apply the `--log-level` override, start logging and open storage.
    pub async fn load(
        config_path: Option<&Path>,
        log_level: Option<String>,
    ) -> Result<Self, CliError> {
        let mut config = config::load(config_path).await?;
        if let Some(level) = log_level {
            config.general.log_level = level;
            config.validate()?;
        }
        logging::init_tracing(&config.general)?;
        Self::open(config)
    }

    /// Open the storage backends described by `config` and discover existing workspaces.
    pub fn open(config: IronscopeConfig) -> Result<Self, CliError> {
        let workspaces = WorkspaceManager::from_config(&config.persistence)?;
        Ok(Self { config, workspaces })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use ironscope_core::config::IronscopeConfig;
    use tempfile::TempDir;

    use super::Context;

    /// Context rooted in a temp dir with both backends enabled.
    pub fn context(dir: &TempDir) -> Context {
        let mut config = IronscopeConfig::default();
        config.persistence.root = dir.path().join("persistence").display().to_string();
        config.persistence.docstore_uri =
            format!("sled://{}", dir.path().join("docstore").display());
        Context::open(config).expect("open context")
    }
}
