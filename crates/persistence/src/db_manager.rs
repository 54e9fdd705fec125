//! DB 매니저: 워크스페이스 이름과 스토리지 커넥터의 레지스트리
//!
//! 백엔드별 커넥터를 하나씩 보관하고, 워크스페이스 이름이 어떤 백엔드를 쓰는지 기록합니다.
//! 커넥터 선택은 항상 기록된 [`BackendType`] 태그를 통해 이루어집니다.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use ironscope_core::config::PersistenceConfig;
use ironscope_core::error::StorageError;
use ironscope_core::types::BackendType;

use crate::connector::{DocStoreConnector, FsConnector, StorageConnector};

/// 사용할 수 없는 백엔드의 사유
#[derive(Debug, Clone, PartialEq, Eq)]
enum Unavailable {
    /// 설정으로 꺼짐
    Disabled,
    /// 열기 실패
    Failed(String),
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled by configuration"),
            Self::Failed(reason) => f.write_str(reason),
        }
    }
}

/// 커넥터 레지스트리
pub struct DbManager {
    connectors: HashMap<BackendType, Arc<dyn StorageConnector>>,
    /// 열지 못한 백엔드와 사유
    unavailable: HashMap<BackendType, Unavailable>,
    /// 워크스페이스 이름 → 백엔드
    registry: RwLock<BTreeMap<String, BackendType>>,
}

impl DbManager {
    /// 커넥터 목록으로 매니저를 생성합니다.
    ///
    /// 같은 백엔드가 두 번 주어지면 나중 것이 사용됩니다.
    pub fn new(connectors: Vec<Arc<dyn StorageConnector>>) -> Self {
        let connectors = connectors
            .into_iter()
            .map(|c| (c.backend(), c))
            .collect();
        Self {
            connectors,
            unavailable: HashMap::new(),
            registry: RwLock::new(BTreeMap::new()),
        }
    }

    /// 설정에서 커넥터를 구성합니다.
    ///
    /// 파일시스템 백엔드는 필수입니다. 문서 저장소를 열지 못하면 경고 후
    /// 해당 백엔드만 사용 불가로 표시합니다.
    pub fn from_config(config: &PersistenceConfig) -> Result<Self, StorageError> {
        let fs: Arc<dyn StorageConnector> = Arc::new(FsConnector::new(config.root_path())?);
        let mut manager = Self::new(vec![fs]);

        if config.docstore_enabled {
            match DocStoreConnector::open(config.docstore_path()) {
                Ok(docstore) => {
                    manager
                        .connectors
                        .insert(BackendType::DocStore, Arc::new(docstore));
                }
                Err(e) => {
                    warn!(error = %e, "document store unavailable");
                    manager
                        .unavailable
                        .insert(BackendType::DocStore, Unavailable::Failed(e.to_string()));
                }
            }
        } else {
            manager
                .unavailable
                .insert(BackendType::DocStore, Unavailable::Disabled);
        }

        Ok(manager)
    }

    /// 사용 가능한 백엔드 목록 (탐색 순서)
    pub fn available_backends(&self) -> Vec<BackendType> {
        BackendType::ALL
            .into_iter()
            .filter(|b| self.connectors.contains_key(b))
            .collect()
    }

    /// 열지 못한 백엔드와 그 사유 (탐색 순서)
    pub fn unavailable_backends(&self) -> Vec<(BackendType, String)> {
        BackendType::ALL
            .into_iter()
            .filter_map(|b| self.unavailable.get(&b).map(|reason| (b, reason.to_string())))
            .collect()
    }

    /// 백엔드의 커넥터를 반환합니다.
    pub fn connector_for(
        &self,
        backend: BackendType,
    ) -> Result<Arc<dyn StorageConnector>, StorageError> {
        self.connectors
            .get(&backend)
            .cloned()
            .ok_or_else(|| StorageError::BackendUnavailable {
                backend,
                reason: self
                    .unavailable
                    .get(&backend)
                    .map_or_else(|| "no connector configured".to_owned(), ToString::to_string),
            })
    }

    /// 열기에 실패한 백엔드가 있으면 [`StorageError::BackendUnavailable`]을 반환합니다.
    ///
    /// 설정으로 끈 백엔드와 구성하지 않은 백엔드는 제외합니다.
    pub fn require_reachable(&self) -> Result<(), StorageError> {
        for backend in BackendType::ALL {
            if let Some(Unavailable::Failed(reason)) = self.unavailable.get(&backend) {
                return Err(StorageError::BackendUnavailable {
                    backend,
                    reason: reason.clone(),
                });
            }
        }
        Ok(())
    }

    /// 등록된 워크스페이스의 커넥터를 반환합니다.
    ///
    /// 등록되지 않았거나 백엔드를 사용할 수 없으면 `None`입니다.
    pub fn get_connector(&self, name: &str) -> Option<Arc<dyn StorageConnector>> {
        let backend = self.backend_of(name)?;
        self.connectors.get(&backend).cloned()
    }

    /// 워크스페이스 이름이 어느 백엔드에든 존재하는지 확인합니다.
    ///
    /// 레지스트리에 있거나, 사용 가능한 백엔드 중 하나에 저장소가 있으면 `true`입니다.
    /// 열지 못한 백엔드가 있으면 답할 수 없으므로 [`StorageError::BackendUnavailable`]입니다.
    pub fn connector_exists(&self, name: &str) -> Result<bool, StorageError> {
        if self.backend_of(name).is_some() {
            return Ok(true);
        }
        self.require_reachable()?;
        Ok(!self.storage_backends(name)?.is_empty())
    }

    /// 저장소가 실제로 존재하는 백엔드 목록
    pub fn storage_backends(&self, name: &str) -> Result<Vec<BackendType>, StorageError> {
        let mut found = Vec::new();
        for backend in self.available_backends() {
            let connector = self.connector_for(backend)?;
            if connector.exists(name)? {
                found.push(backend);
            }
        }
        Ok(found)
    }

    /// 워크스페이스의 백엔드를 찾습니다.
    ///
    /// 레지스트리를 먼저 보고, 없으면 저장소를 탐색합니다 (생성 중이거나 고아 저장소).
    pub fn locate(&self, name: &str) -> Result<Option<BackendType>, StorageError> {
        if let Some(backend) = self.backend_of(name) {
            return Ok(Some(backend));
        }
        Ok(self.storage_backends(name)?.into_iter().next())
    }

    /// 워크스페이스를 레지스트리에 기록합니다.
    pub fn register(&self, name: &str, backend: BackendType) {
        debug!(workspace = name, %backend, "workspace registered");
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), backend);
    }

    /// 레지스트리에서 제거하고 기록되어 있던 백엔드를 반환합니다.
    pub fn unregister(&self, name: &str) -> Option<BackendType> {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// 등록된 워크스페이스의 백엔드
    pub fn backend_of(&self, name: &str) -> Option<BackendType> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    /// 등록된 모든 워크스페이스 이름 (정렬됨)
    pub fn workspace_names(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// 백엔드별로 저장소가 있는 워크스페이스 이름을 수집합니다.
    ///
    /// 레지스트리는 바꾸지 않습니다. 레코드 확인과 등록은 워크스페이스 매니저가 합니다.
    pub fn discover(&self) -> Result<Vec<(BackendType, String)>, StorageError> {
        let mut found = Vec::new();
        for backend in self.available_backends() {
            let connector = self.connector_for(backend)?;
            for name in connector.list_workspaces()? {
                found.push((backend, name));
            }
        }
        Ok(found)
    }
}
