#![doc = include_str!("../README.md")]

pub mod action;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    ConfigError, IronscopeError, ModelError, PluginError, StorageError, WorkspaceError,
};

// 설정
pub use config::IronscopeConfig;

// 변경 의도
pub use action::{HostAttribute, HostDraft, ModelAction, PendingAction};

// 도메인 타입
pub use types::{
    BackendType, Host, HostKey, Protocol, Service, ServiceRef, Severity, Vulnerability, Workspace,
};
