//! 매퍼 매니저: 엔티티와 문서 레코드 사이의 변환과 식별자 맵
//!
//! 조회 결과 "없음"은 에러가 아닌 `None`입니다.
//! 저장된 문서는 `(workspace, id)` 키로 캐시되어 같은 문서를 반복해서 읽지 않습니다.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use tracing::debug;

use ironscope_core::error::StorageError;

use crate::connector::StorageConnector;
use crate::db_manager::DbManager;
use crate::document::{Document, DocumentKey, Mapped};

/// 문서 매퍼
pub struct MapperManager {
    db: Arc<DbManager>,
    cache: RwLock<HashMap<DocumentKey, Document>>,
}

impl MapperManager {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 커넥터 레지스트리
    pub fn db(&self) -> &Arc<DbManager> {
        &self.db
    }

    fn connector(&self, workspace: &str) -> Result<Option<Arc<dyn StorageConnector>>, StorageError> {
        match self.db.locate(workspace)? {
            Some(backend) => self.db.connector_for(backend).map(Some),
            None => Ok(None),
        }
    }

    fn require_connector(&self, workspace: &str) -> Result<Arc<dyn StorageConnector>, StorageError> {
        self.connector(workspace)?
            .ok_or_else(|| StorageError::MissingWorkspace {
                name: workspace.to_owned(),
            })
    }

    // ─── 문서 단위 연산 ─────────────────────────────────────────────

    /// 문서를 조회합니다. 워크스페이스나 문서가 없으면 `None`입니다.
    pub fn find(&self, key: &DocumentKey) -> Result<Option<Document>, StorageError> {
        if let Some(doc) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(Some(doc.clone()));
        }

        let Some(connector) = self.connector(&key.workspace)? else {
            return Ok(None);
        };
        let found = connector.get(&key.workspace, &key.id)?;
        if let Some(doc) = &found {
            self.cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.clone(), doc.clone());
        }
        Ok(found)
    }

    /// 문서를 저장하고 저장된 문서(증가된 리비전 포함)를 반환합니다.
    ///
    /// 워크스페이스 저장소가 없으면 [`StorageError::MissingWorkspace`]입니다.
    pub fn save(&self, workspace: &str, mut document: Document) -> Result<Document, StorageError> {
        let key = DocumentKey::new(workspace, document.id.clone());
        let connector = self.require_connector(workspace)?;

        let previous = self.find(&key)?.map_or(0, |d| d.revision);
        document.revision = previous + 1;
        document.updated_at = SystemTime::now();

        connector.put(workspace, &document)?;
        debug!(
            workspace,
            id = %document.id,
            revision = document.revision,
            "document saved"
        );

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, document.clone());
        Ok(document)
    }

    /// 문서를 삭제합니다. 삭제한 문서가 있었으면 `true`입니다.
    pub fn delete(&self, key: &DocumentKey) -> Result<bool, StorageError> {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        let Some(connector) = self.connector(&key.workspace)? else {
            return Ok(false);
        };
        let removed = connector.remove(&key.workspace, &key.id)?;
        if removed {
            debug!(document = %key, "document deleted");
        }
        Ok(removed)
    }

    /// 워크스페이스의 캐시된 문서를 모두 버립니다.
    pub fn evict_workspace(&self, workspace: &str) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| key.workspace != workspace);
    }

    // ─── 엔티티 단위 연산 ───────────────────────────────────────────

    /// 엔티티를 조회합니다.
    pub fn find_entity<T: Mapped>(
        &self,
        workspace: &str,
        id: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.find(&DocumentKey::new(workspace, id))? {
            Some(doc) => doc.to_entity().map(Some),
            None => Ok(None),
        }
    }

    /// 엔티티를 저장합니다.
    pub fn save_entity<T: Mapped>(&self, workspace: &str, entity: &T) -> Result<Document, StorageError> {
        self.save(workspace, Document::from_entity(entity)?)
    }

    /// 워크스페이스의 같은 종류 엔티티를 모두 읽습니다.
    ///
    /// 저장소가 없는 워크스페이스는 [`StorageError::MissingWorkspace`]입니다.
    pub fn load_all<T: Mapped>(&self, workspace: &str) -> Result<Vec<T>, StorageError> {
        let connector = self.require_connector(workspace)?;
        connector
            .scan(workspace, T::KIND)?
            .iter()
            .map(|doc| doc.to_entity::<T>())
            .collect()
    }
}
