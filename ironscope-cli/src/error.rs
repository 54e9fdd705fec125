//! CLI-specific error types and exit code mapping

use ironscope_core::error::IronscopeError;

/// CLI-specific error type.
///
/// `exit_code()` maps each variant to the process exit status.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (report read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from the library crates.
    #[error("{0}")]
    Core(#[from] IronscopeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                 |
    /// |------|-------------------------|
    /// | 0    | Success                 |
    /// | 1    | General / command error |
    /// | 2    | Configuration error     |
    /// | 10   | IO error                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(IronscopeError::Config(_)) => 2,
            Self::Io(_) | Self::Core(IronscopeError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<ironscope_core::error::PluginError> for CliError {
    fn from(e: ironscope_core::error::PluginError) -> Self {
        Self::Core(e.into())
    }
}

impl From<ironscope_core::error::WorkspaceError> for CliError {
    fn from(e: ironscope_core::error::WorkspaceError) -> Self {
        Self::Core(e.into())
    }
}
