//! 변경 컨트롤러: 매핑된 엔티티에 대한 모든 영속 쓰기의 단일 순서점
//!
//! 워크스페이스 매니저와 모델 컨트롤러의 flush 단계처럼 여러 출처에서 오는 쓰기를
//! 하나의 커밋 잠금으로 직렬화하여, 같은 워크스페이스 레코드에 대한 부분 쓰기가
//! 서로 끼어들지 않도록 합니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use ironscope_core::error::StorageError;
use ironscope_core::metrics as m;

use crate::document::{Document, DocumentKey, Mapped};
use crate::mapper::MapperManager;

/// 커밋할 변경
#[derive(Debug, Clone)]
pub enum Change {
    /// 문서 저장 (생성 또는 갱신)
    Save {
        workspace: String,
        document: Document,
    },
    /// 문서 삭제
    Delete(DocumentKey),
}

impl Change {
    /// 엔티티 저장 변경을 만듭니다.
    pub fn save<T: Mapped>(workspace: impl Into<String>, entity: &T) -> Result<Self, StorageError> {
        Ok(Self::Save {
            workspace: workspace.into(),
            document: Document::from_entity(entity)?,
        })
    }

    /// 변경 대상 워크스페이스
    pub fn workspace(&self) -> &str {
        match self {
            Self::Save { workspace, .. } => workspace,
            Self::Delete(key) => &key.workspace,
        }
    }
}

/// 변경 컨트롤러
pub struct ChangeController {
    mapper: Arc<MapperManager>,
    /// 커밋 잠금, 마지막 커밋 순번을 보관
    commit: Mutex<u64>,
    committed: AtomicU64,
}

impl ChangeController {
    pub fn new(mapper: Arc<MapperManager>) -> Self {
        Self {
            mapper,
            commit: Mutex::new(0),
            committed: AtomicU64::new(0),
        }
    }

    /// 문서 매퍼
    pub fn mapper(&self) -> &Arc<MapperManager> {
        &self.mapper
    }

    /// 변경 하나를 커밋하고 커밋 순번을 반환합니다.
    pub fn apply(&self, change: Change) -> Result<u64, StorageError> {
        let mut seq = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        self.commit_locked(&mut seq, change)
    }

    /// 변경 묶음을 하나의 잠금 구간에서 순서대로 커밋합니다.
    ///
    /// 첫 실패에서 멈추며, 그 전에 커밋된 변경은 유지됩니다.
    /// 성공하면 마지막 커밋 순번을 반환합니다 (빈 묶음이면 현재 순번).
    pub fn apply_batch(&self, changes: Vec<Change>) -> Result<u64, StorageError> {
        let mut seq = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        for change in changes {
            self.commit_locked(&mut seq, change)?;
        }
        Ok(*seq)
    }

    /// 커밋 잠금을 잡은 채로 `f`를 실행합니다.
    ///
    /// `f` 안의 커밋은 [`CommitScope::apply`]로 하며, 그동안 다른 쓰기는 대기합니다.
    /// 저장소 삭제처럼 문서 쓰기와 섞이면 안 되는 작업에 씁니다.
    pub fn exclusive<R>(&self, f: impl FnOnce(&mut CommitScope<'_>) -> R) -> R {
        let mut seq = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        let mut scope = CommitScope {
            controller: self,
            seq: &mut *seq,
        };
        f(&mut scope)
    }

    fn commit_locked(&self, seq: &mut u64, change: Change) -> Result<u64, StorageError> {
        match change {
            Change::Save {
                workspace,
                document,
            } => {
                self.mapper.save(&workspace, document)?;
            }
            Change::Delete(key) => {
                self.mapper.delete(&key)?;
            }
        }
        *seq += 1;
        self.committed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::WORKSPACE_CHANGES_COMMITTED_TOTAL).increment(1);
        debug!(seq = *seq, "change committed");
        Ok(*seq)
    }

    /// 지금까지 커밋된 변경 수
    pub fn commit_count(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }
}

/// 커밋 잠금을 잡고 있는 구간
pub struct CommitScope<'a> {
    controller: &'a ChangeController,
    seq: &'a mut u64,
}

impl CommitScope<'_> {
    /// 잠금 구간 안에서 변경 하나를 커밋합니다.
    pub fn apply(&mut self, change: Change) -> Result<u64, StorageError> {
        self.controller.commit_locked(self.seq, change)
    }
}
