//! 워크스페이스 매니저: 생성/열기/목록/삭제/활성화
//!
//! DB 매니저(저장소), 매퍼 매니저(레코드 조회), 변경 컨트롤러(레코드 쓰기)를 조합합니다.
//!
//! # 순서
//!
//! - 생성: 저장소 할당 → 레코드 저장 → 레지스트리 등록. 레코드 저장이 실패하면 저장소를 되돌립니다.
//! - 삭제: 레코드 삭제 → 레지스트리 해제 → 저장소 삭제. 이 구간은 변경 컨트롤러의 커밋 잠금
//!   안에서 실행되어 flush가 지워지는 저장소에 문서를 쓰지 못합니다.
//!
//! 어느 단계에서 프로세스가 중단되어도 레코드 없는 저장소만 남으며,
//! 그런 저장소는 [`WorkspaceManager::load_workspaces`]에서 목록에 올라가지 않습니다.
//!
//! 같은 이름에 대한 생성/열기/삭제는 이름 단위 잠금으로 상호 배제됩니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use ironscope_core::config::PersistenceConfig;
use ironscope_core::error::{IronscopeError, StorageError, WorkspaceError};
use ironscope_core::metrics as m;
use ironscope_core::types::{BackendType, Host, Workspace, validate_workspace_name};

use crate::change::{Change, ChangeController};
use crate::db_manager::DbManager;
use crate::document::{DocumentKey, WORKSPACE_DOC_ID};
use crate::mapper::MapperManager;

/// 워크스페이스 매니저
///
/// 활성 워크스페이스 포인터는 인스턴스마다 하나이며 전역 상태가 아닙니다.
pub struct WorkspaceManager {
    db: Arc<DbManager>,
    mapper: Arc<MapperManager>,
    changes: Arc<ChangeController>,
    name_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    active: RwLock<Option<Workspace>>,
}

impl WorkspaceManager {
    /// DB 매니저 위에 매퍼와 변경 컨트롤러를 구성합니다.
    pub fn new(db: Arc<DbManager>) -> Self {
        let mapper = Arc::new(MapperManager::new(Arc::clone(&db)));
        let changes = Arc::new(ChangeController::new(Arc::clone(&mapper)));
        Self {
            db,
            mapper,
            changes,
            name_locks: Mutex::new(HashMap::new()),
            active: RwLock::new(None),
        }
    }

    /// 설정에서 커넥터를 열고 기존 워크스페이스를 탐색합니다.
    pub fn from_config(config: &PersistenceConfig) -> Result<Self, IronscopeError> {
        let manager = Self::new(Arc::new(DbManager::from_config(config)?));
        manager.load_workspaces()?;
        Ok(manager)
    }

    pub fn db_manager(&self) -> &Arc<DbManager> {
        &self.db
    }

    pub fn mapper(&self) -> &Arc<MapperManager> {
        &self.mapper
    }

    /// 모든 영속 쓰기가 거치는 변경 컨트롤러
    pub fn change_controller(&self) -> &Arc<ChangeController> {
        &self.changes
    }

    /// 이름 단위 잠금을 잡고 `f`를 실행합니다.
    ///
    /// 다른 스레드가 쓰지 않는 잠금 항목은 끝날 때 제거합니다.
    fn with_name_lock<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        let lock = Arc::clone(
            self.name_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(name.to_owned())
                .or_default(),
        );

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);

        let mut locks = self
            .name_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks.get(name).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(name);
        }
        result
    }

    fn clear_active(&self, name: &str) {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|ws| ws.name == name) {
            *active = None;
            info!(workspace = name, "active workspace cleared");
        }
    }

    // ─── 탐색 ───────────────────────────────────────────────────────

    /// 모든 백엔드의 저장소를 탐색해 레코드가 있는 워크스페이스를 등록합니다.
    ///
    /// 레코드 없는 저장소(중단된 생성/삭제)는 경고 후 건너뜁니다.
    /// 등록된 워크스페이스 수를 반환합니다.
    pub fn load_workspaces(&self) -> Result<usize, IronscopeError> {
        let mut loaded = 0;
        for (backend, name) in self.db.discover()? {
            if self.db.backend_of(&name).is_some() {
                continue;
            }
            let record = self
                .db
                .connector_for(backend)?
                .get(&name, WORKSPACE_DOC_ID)?;
            match record {
                Some(_) => {
                    self.db.register(&name, backend);
                    loaded += 1;
                }
                None => warn!(
                    workspace = %name,
                    %backend,
                    "storage without workspace record, skipping"
                ),
            }
        }
        info!(count = loaded, "workspaces loaded");
        Ok(loaded)
    }

    // ─── 생명주기 ───────────────────────────────────────────────────

    /// 워크스페이스를 생성합니다.
    ///
    /// 이름이 어느 백엔드에든 이미 있으면 [`WorkspaceError::Duplicate`]입니다.
    /// 열지 못한 백엔드가 있으면 중복 여부를 알 수 없으므로 [`StorageError::BackendUnavailable`]입니다.
    pub fn create_workspace(
        &self,
        name: &str,
        description: &str,
        backend: BackendType,
    ) -> Result<Workspace, IronscopeError> {
        validate_workspace_name(name)?;
        self.with_name_lock(name, || self.create_locked(name, description, backend))
    }

    fn create_locked(
        &self,
        name: &str,
        description: &str,
        backend: BackendType,
    ) -> Result<Workspace, IronscopeError> {
        if self.db.connector_exists(name)? {
            return Err(duplicate(name));
        }

        let connector = self.db.connector_for(backend)?;
        match connector.create(name) {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => return Err(duplicate(name)),
            Err(e) => return Err(e.into()),
        }

        let workspace = Workspace::new(name, description, backend);
        let committed =
            Change::save(name, &workspace).and_then(|change| self.changes.apply(change));
        if let Err(e) = committed {
            error!(workspace = name, error = %e, "failed to save workspace record, rolling back storage");
            if let Err(rollback) = connector.delete(name) {
                error!(workspace = name, error = %rollback, "storage rollback failed");
            }
            self.mapper.evict_workspace(name);
            return Err(e.into());
        }

        self.db.register(name, backend);
        metrics::counter!(m::WORKSPACE_CREATED_TOTAL, m::LABEL_BACKEND => backend.to_string())
            .increment(1);
        info!(workspace = name, %backend, "workspace created");
        Ok(workspace)
    }

    /// 워크스페이스 레코드를 엽니다. 없으면 `None`입니다.
    pub fn open_workspace(&self, name: &str) -> Result<Option<Workspace>, IronscopeError> {
        if validate_workspace_name(name).is_err() {
            return Ok(None);
        }
        self.with_name_lock(name, || self.open_locked(name))
    }

    fn open_locked(&self, name: &str) -> Result<Option<Workspace>, IronscopeError> {
        let Some(workspace) = self
            .mapper
            .find_entity::<Workspace>(name, WORKSPACE_DOC_ID)?
        else {
            return Ok(None);
        };

        // 다른 프로세스가 만든 워크스페이스
        if self.db.backend_of(name).is_none() {
            self.db.register(name, workspace.backend);
        }
        Ok(Some(workspace))
    }

    /// 워크스페이스를 삭제합니다. 없는 이름이면 아무것도 하지 않습니다.
    ///
    /// 레코드 없는 저장소가 남아 있으면 함께 정리합니다.
    pub fn remove_workspace(&self, name: &str) -> Result<(), IronscopeError> {
        if validate_workspace_name(name).is_err() {
            return Ok(());
        }
        self.with_name_lock(name, || self.remove_locked(name))
    }

    fn remove_locked(&self, name: &str) -> Result<(), IronscopeError> {
        let registered = self.db.backend_of(name);
        let backends = self.db.storage_backends(name)?;
        if registered.is_none() && backends.is_empty() {
            debug!(workspace = name, "remove of unknown workspace ignored");
            return Ok(());
        }

        // 레코드가 지워진 뒤에는 저장소 삭제가 실패해도 목록/활성 상태에 남지 않는다
        self.changes.exclusive(|scope| -> Result<(), IronscopeError> {
            if !backends.is_empty() {
                scope.apply(Change::Delete(DocumentKey::workspace_record(name)))?;
            }
            self.db.unregister(name);
            self.mapper.evict_workspace(name);
            self.clear_active(name);

            for backend in &backends {
                if let Err(e) = self.db.connector_for(*backend)?.delete(name) {
                    error!(workspace = name, %backend, error = %e, "failed to delete workspace storage");
                    return Err(e.into());
                }
            }
            Ok(())
        })?;

        if let Some(backend) = registered {
            metrics::counter!(m::WORKSPACE_REMOVED_TOTAL, m::LABEL_BACKEND => backend.to_string())
                .increment(1);
        }
        info!(workspace = name, "workspace removed");
        Ok(())
    }

    // ─── 조회 ───────────────────────────────────────────────────────

    /// 모든 백엔드에 걸친 워크스페이스 이름 (정렬됨)
    pub fn workspace_names(&self) -> Vec<String> {
        self.db.workspace_names()
    }

    /// 알려진 워크스페이스의 백엔드. 모르는 이름이면 `None`입니다.
    pub fn workspace_type(&self, name: &str) -> Option<BackendType> {
        self.db.backend_of(name)
    }

    /// 워크스페이스에 저장된 호스트를 읽습니다.
    pub fn load_hosts(&self, name: &str) -> Result<Vec<Host>, IronscopeError> {
        if self.db.backend_of(name).is_none() {
            return Err(WorkspaceError::NotFound {
                name: name.to_owned(),
            }
            .into());
        }
        let mut hosts: Vec<Host> = self.mapper.load_all(name)?;
        hosts.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(hosts)
    }

    // ─── 활성 워크스페이스 ──────────────────────────────────────────

    /// 활성 워크스페이스를 바꿉니다.
    ///
    /// 이전 워크스페이스는 닫지 않습니다. 등록되지 않은 워크스페이스는 [`WorkspaceError::NotFound`]입니다.
    pub fn set_active_workspace(&self, workspace: &Workspace) -> Result<(), IronscopeError> {
        if self.db.backend_of(&workspace.name).is_none() {
            return Err(WorkspaceError::NotFound {
                name: workspace.name.clone(),
            }
            .into());
        }
        let previous = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(workspace.clone());
        info!(
            workspace = %workspace.name,
            previous = previous.as_ref().map(|ws| ws.name.as_str()).unwrap_or("-"),
            "active workspace changed"
        );
        Ok(())
    }

    /// 현재 활성 워크스페이스
    pub fn active_workspace(&self) -> Option<Workspace> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 이름이 활성 워크스페이스인지 확인합니다.
    pub fn is_active(&self, name: &str) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|ws| ws.name == name)
    }
}

fn duplicate(name: &str) -> IronscopeError {
    WorkspaceError::Duplicate {
        name: name.to_owned(),
    }
    .into()
}
