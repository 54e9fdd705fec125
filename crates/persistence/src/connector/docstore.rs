//! 문서 저장소 커넥터: sled 데이터베이스 안의 워크스페이스당 트리 하나

use std::path::Path;
use std::sync::{PoisonError, RwLock};

use sled::Db;
use tracing::{debug, warn};

use ironscope_core::error::StorageError;
use ironscope_core::types::BackendType;

use super::{StorageConnector, deserialize, serialize};
use crate::document::{Document, DocumentKind};

const TREE_PREFIX: &str = "ws::";

/// 문서 저장소 커넥터
///
/// 워크스페이스 `acme`는 `ws::acme` 트리에 대응합니다.
/// sled는 `open_tree` 호출만으로 트리를 만들기 때문에, 존재 확인은 `tree_names`로만 하고
/// 트리 생성/삭제와 문서 쓰기 사이는 `lifecycle` 잠금으로 분리합니다.
pub struct DocStoreConnector {
    db: Db,
    lifecycle: RwLock<()>,
}

impl DocStoreConnector {
    /// 경로의 데이터베이스를 열거나 생성합니다.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(unavailable)?;
        debug!(path = %path.display(), "document store opened");
        Ok(Self::with_db(db))
    }

    /// 프로세스 종료 시 사라지는 임시 데이터베이스를 엽니다.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(unavailable)?;
        Ok(Self::with_db(db))
    }

    fn with_db(db: Db) -> Self {
        Self {
            db,
            lifecycle: RwLock::new(()),
        }
    }

    fn tree_name(name: &str) -> String {
        format!("{TREE_PREFIX}{name}")
    }

    fn has_tree(&self, name: &str) -> bool {
        let wanted = Self::tree_name(name);
        self.db
            .tree_names()
            .iter()
            .any(|t| t.as_ref() == wanted.as_bytes())
    }

    /// 이미 존재하는 트리만 엽니다 (없으면 `None`).
    fn existing_tree(&self, name: &str) -> Result<Option<sled::Tree>, StorageError> {
        if !self.has_tree(name) {
            return Ok(None);
        }
        self.db
            .open_tree(Self::tree_name(name))
            .map(Some)
            .map_err(unavailable)
    }
}

impl StorageConnector for DocStoreConnector {
    fn backend(&self) -> BackendType {
        BackendType::DocStore
    }

    fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.has_tree(name))
    }

    fn create(&self, name: &str) -> Result<(), StorageError> {
        let _guard = self
            .lifecycle
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if self.has_tree(name) {
            return Err(StorageError::AlreadyExists {
                backend: BackendType::DocStore,
                name: name.to_owned(),
            });
        }
        self.db
            .open_tree(Self::tree_name(name))
            .map_err(unavailable)?;
        self.db.flush().map_err(unavailable)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        let _guard = self
            .lifecycle
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let dropped = self
            .db
            .drop_tree(Self::tree_name(name))
            .map_err(unavailable)?;
        if dropped {
            self.db.flush().map_err(unavailable)?;
        }
        Ok(())
    }

    fn list_workspaces(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .db
            .tree_names()
            .iter()
            .filter_map(|t| std::str::from_utf8(t).ok())
            .filter_map(|t| t.strip_prefix(TREE_PREFIX))
            .map(str::to_owned)
            .collect())
    }

    fn put(&self, workspace: &str, document: &Document) -> Result<(), StorageError> {
        let _guard = self
            .lifecycle
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let tree = self
            .existing_tree(workspace)?
            .ok_or_else(|| StorageError::MissingWorkspace {
                name: workspace.to_owned(),
            })?;
        tree.insert(document.id.as_bytes(), serialize(document)?)
            .map_err(unavailable)?;
        tree.flush().map_err(unavailable)?;
        Ok(())
    }

    fn get(&self, workspace: &str, id: &str) -> Result<Option<Document>, StorageError> {
        let _guard = self
            .lifecycle
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(tree) = self.existing_tree(workspace)? else {
            return Ok(None);
        };
        match tree.get(id.as_bytes()).map_err(unavailable)? {
            Some(bytes) => deserialize(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn remove(&self, workspace: &str, id: &str) -> Result<bool, StorageError> {
        let _guard = self
            .lifecycle
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(tree) = self.existing_tree(workspace)? else {
            return Ok(false);
        };
        let removed = tree.remove(id.as_bytes()).map_err(unavailable)?.is_some();
        if removed {
            tree.flush().map_err(unavailable)?;
        }
        Ok(removed)
    }

    fn scan(&self, workspace: &str, kind: DocumentKind) -> Result<Vec<Document>, StorageError> {
        let _guard = self
            .lifecycle
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let tree = self
            .existing_tree(workspace)?
            .ok_or_else(|| StorageError::MissingWorkspace {
                name: workspace.to_owned(),
            })?;

        let mut documents = Vec::new();
        for entry in tree.iter() {
            let (key, value) = entry.map_err(unavailable)?;
            match deserialize(&value) {
                Ok(doc) if doc.kind == kind => documents.push(doc),
                Ok(_) => {}
                Err(e) => warn!(
                    workspace,
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "skipping unreadable document"
                ),
            }
        }
        Ok(documents)
    }
}

fn unavailable(e: sled::Error) -> StorageError {
    StorageError::BackendUnavailable {
        backend: BackendType::DocStore,
        reason: e.to_string(),
    }
}
