#![doc = include_str!("../README.md")]
//!
//! # 사용 예시
//!
//! ```ignore
//! use std::sync::Arc;
//! use ironscope_core::types::BackendType;
//! use ironscope_persistence::{DbManager, WorkspaceManager};
//!
//! let manager = WorkspaceManager::from_config(&config.persistence)?;
//! let ws = manager.create_workspace("acme", "external test", BackendType::Fs)?;
//! manager.set_active_workspace(&ws)?;
//! ```

pub mod change;
pub mod connector;
pub mod db_manager;
pub mod document;
pub mod mapper;
pub mod workspace;

pub use change::{Change, ChangeController, CommitScope};
pub use connector::{DocStoreConnector, FsConnector, StorageConnector};
pub use db_manager::DbManager;
pub use document::{Document, DocumentKey, DocumentKind, Mapped, WORKSPACE_DOC_ID};
pub use mapper::MapperManager;
pub use workspace::WorkspaceManager;
