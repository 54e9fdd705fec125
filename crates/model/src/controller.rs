//! 모델 컨트롤러: 다중 생산자 / 단일 작성자 모델 갱신
//!
//! 생산자(플러그인 호출 완료 등)는 [`ModelController::enqueue`]로 변경 의도를 큐에 넣고,
//! [`ModelController::process_all_pending_actions`]만 컨테이너를 수정합니다.
//!
//! # 잠금 순서
//!
//! `writer` → `queue` → `state`. 처리와 워크스페이스 전환은 `writer`로 직렬화되며,
//! `enqueue`는 `queue` 잠금 안에서만 바인딩 여부를 확인합니다.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use ironscope_core::action::ModelAction;
use ironscope_core::error::{ModelError, StorageError};
use ironscope_core::metrics as m;
use ironscope_core::types::{Host, HostKey, Workspace};
use ironscope_persistence::{Change, ChangeController};

use crate::container::ModelContainer;
use crate::queue::ActionQueue;

/// 한 번의 처리 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// 적용된 액션 수
    pub applied: usize,
    /// 잘못된 형식으로 건너뛴 액션 수
    pub skipped: usize,
    /// 영속화된 호스트 수
    pub persisted: usize,
}

struct BoundModel {
    workspace: Workspace,
    container: ModelContainer,
    /// 아직 영속화되지 않은 호스트
    dirty: BTreeSet<HostKey>,
}

/// 모델 컨트롤러
pub struct ModelController {
    queue: Mutex<ActionQueue>,
    writer: Mutex<()>,
    state: RwLock<Option<BoundModel>>,
    changes: Option<Arc<ChangeController>>,
}

impl Default for ModelController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelController {
    /// 영속화 없이 동작하는 컨트롤러
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(ActionQueue::new()),
            writer: Mutex::new(()),
            state: RwLock::new(None),
            changes: None,
        }
    }

    /// 처리 후 변경된 호스트를 변경 컨트롤러로 영속화하는 컨트롤러
    pub fn with_change_controller(changes: Arc<ChangeController>) -> Self {
        Self {
            changes: Some(changes),
            ..Self::new()
        }
    }

    // ─── 바인딩 ─────────────────────────────────────────────────────

    /// 워크스페이스와 컨테이너를 바인딩합니다.
    ///
    /// 이전 워크스페이스의 처리되지 않은 액션은 버려집니다.
    pub fn set_workspace(&self, workspace: Workspace, container: ModelContainer) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let dropped = queue.clear();
        if dropped > 0 {
            warn!(
                previous = state.as_ref().map(|b| b.workspace.name.as_str()).unwrap_or("-"),
                dropped,
                "discarding unprocessed actions on workspace switch"
            );
            metrics::counter!(m::MODEL_ACTIONS_DISCARDED_TOTAL).increment(dropped as u64);
        }
        metrics::gauge!(m::MODEL_PENDING_ACTIONS).set(0.0);

        info!(
            workspace = %workspace.name,
            hosts = container.len(),
            "model bound to workspace"
        );
        *state = Some(BoundModel {
            workspace,
            container,
            dirty: BTreeSet::new(),
        });
    }

    /// 바인딩된 워크스페이스
    pub fn workspace(&self) -> Option<Workspace> {
        self.read(|bound| bound.workspace.clone())
    }

    // ─── 생산자 ─────────────────────────────────────────────────────

    /// 액션을 큐에 넣고 순번을 반환합니다.
    pub fn enqueue(&self, action: ModelAction) -> Result<u64, ModelError> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_bound()?;
        let seq = queue.push(action);
        metrics::gauge!(m::MODEL_PENDING_ACTIONS).set(queue.len() as f64);
        Ok(seq)
    }

    /// 여러 액션을 연속된 순번으로 한 번에 넣습니다.
    pub fn enqueue_all(&self, actions: Vec<ModelAction>) -> Result<Vec<u64>, ModelError> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_bound()?;
        let seqs = actions.into_iter().map(|a| queue.push(a)).collect();
        metrics::gauge!(m::MODEL_PENDING_ACTIONS).set(queue.len() as f64);
        Ok(seqs)
    }

    fn ensure_bound(&self) -> Result<(), ModelError> {
        let bound = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        if bound {
            Ok(())
        } else {
            Err(ModelError::NoActiveWorkspace)
        }
    }

    /// 대기 중인 액션 수
    pub fn pending_count(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // ─── 단일 작성자 ────────────────────────────────────────────────

    /// 큐를 제출 순서대로 비우며 컨테이너에 적용합니다.
    ///
    /// 잘못된 액션은 로그 후 건너뛰고 나머지를 계속 처리합니다.
    /// 변경 컨트롤러가 있으면 변경된 호스트를 영속화하며, 실패한 호스트는 다음 처리 때 다시 시도합니다.
    pub fn process_all_pending_actions(&self) -> ProcessSummary {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let batch = {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            let batch = queue.drain();
            metrics::gauge!(m::MODEL_PENDING_ACTIONS).set(0.0);
            batch
        };

        let mut summary = ProcessSummary::default();
        let (workspace, snapshot) = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let Some(bound) = state.as_mut() else {
                return summary;
            };

            for pending in batch {
                if let Err(reason) = pending.action.validate() {
                    let err = ModelError::MalformedAction {
                        seq: pending.seq,
                        reason,
                    };
                    warn!(error = %err, action = %pending.action, "skipping malformed action");
                    metrics::counter!(m::MODEL_ACTIONS_SKIPPED_TOTAL).increment(1);
                    summary.skipped += 1;
                    continue;
                }
                let key = bound.container.apply(&pending.action);
                debug!(seq = pending.seq, action = %pending.action, "action applied");
                bound.dirty.insert(key);
                summary.applied += 1;
            }
            metrics::counter!(m::MODEL_ACTIONS_APPLIED_TOTAL).increment(summary.applied as u64);

            if self.changes.is_none() || bound.dirty.is_empty() {
                return summary;
            }
            let snapshot: Vec<Host> = bound
                .dirty
                .iter()
                .filter_map(|key| bound.container.host(key).cloned())
                .collect();
            (bound.workspace.name.clone(), snapshot)
        };

        match self.flush(&workspace, &snapshot) {
            Ok(()) => {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                if let Some(bound) = state.as_mut() {
                    for host in &snapshot {
                        bound.dirty.remove(&host.key);
                    }
                }
                summary.persisted = snapshot.len();
            }
            Err(e) => {
                error!(workspace = %workspace, error = %e, "failed to persist hosts, will retry");
            }
        }

        debug!(
            applied = summary.applied,
            skipped = summary.skipped,
            persisted = summary.persisted,
            "pending actions processed"
        );
        summary
    }

    fn flush(&self, workspace: &str, hosts: &[Host]) -> Result<(), StorageError> {
        let Some(changes) = &self.changes else {
            return Ok(());
        };
        let batch = hosts
            .iter()
            .map(|host| Change::save(workspace, host))
            .collect::<Result<Vec<_>, _>>()?;
        changes.apply_batch(batch)?;
        Ok(())
    }

    // ─── 읽기 ───────────────────────────────────────────────────────

    fn read<T>(&self, f: impl FnOnce(&BoundModel) -> T) -> Option<T> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }

    /// 마지막 처리까지 적용된 모든 호스트 (키 순서)
    pub fn all_hosts(&self) -> Vec<Host> {
        self.read(|bound| bound.container.hosts().cloned().collect())
            .unwrap_or_default()
    }

    pub fn host(&self, key: &HostKey) -> Option<Host> {
        self.read(|bound| bound.container.host(key).cloned())
            .flatten()
    }

    pub fn host_count(&self) -> usize {
        self.read(|bound| bound.container.len()).unwrap_or(0)
    }

    /// 아직 영속화되지 않은 호스트 수
    pub fn dirty_count(&self) -> usize {
        self.read(|bound| bound.dirty.len()).unwrap_or(0)
    }
}
