//! 플러그인 컨트롤러: 명령 실행을 플러그인 파싱과 모델 큐로 연결
//!
//! 1. [`PluginController::process_command_input`]: 시그니처가 일치하면 대기 호출을 등록
//! 2. [`PluginController::on_command_finished`]: 출력을 파싱해 모델 컨트롤러 큐에 넣음
//!
//! 파싱은 잠금 밖에서 수행하므로 여러 호출이 동시에 완료되어도 서로 막지 않습니다.
//! 공유 구조를 건드리는 것은 대기 목록 갱신과 큐 삽입뿐입니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use ironscope_core::config::PluginsConfig;
use ironscope_core::error::PluginError;
use ironscope_core::metrics as m;
use ironscope_model::ModelController;
use ironscope_persistence::{Change, ChangeController};

use crate::invocation::{Invocation, InvocationState};
use crate::plugin::{Plugin, PluginInfo, command_signature};
use crate::registry::PluginRegistry;

/// 기본 최대 출력 크기 (64 MB)
const DEFAULT_MAX_OUTPUT_SIZE: usize = 64 * 1024 * 1024;

/// 플러그인 컨트롤러
///
/// # 사용 예시
/// ```ignore
/// let controller = PluginController::new(PluginRegistry::with_builtin(&[])?, model.clone());
///
/// if controller.process_command_input("./nessus report").is_some() {
///     controller.on_command_finished("./nessus report", &output);
/// }
/// model.process_all_pending_actions();
/// ```
pub struct PluginController {
    registry: RwLock<PluginRegistry>,
    model: Arc<ModelController>,
    changes: Option<Arc<ChangeController>>,
    max_output_size: usize,
    /// 명령 문자열 → 대기 중 호출
    pending: Mutex<HashMap<String, PendingInvocation>>,
    /// 완료된 호출 (완료 순서)
    history: Mutex<Vec<Invocation>>,
}

struct PendingInvocation {
    invocation: Invocation,
    plugin: Arc<dyn Plugin>,
}

impl PluginController {
    pub fn new(registry: PluginRegistry, model: Arc<ModelController>) -> Self {
        Self {
            registry: RwLock::new(registry),
            model,
            changes: None,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            pending: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// 설정으로부터 내장 플러그인을 등록한 컨트롤러를 생성합니다.
    pub fn from_config(
        config: &PluginsConfig,
        model: Arc<ModelController>,
    ) -> Result<Self, PluginError> {
        let registry = PluginRegistry::with_builtin(&config.disabled)?;
        Ok(Self::new(registry, model).with_max_output_size(config.max_output_size))
    }

    /// 완료된 호출을 명령 기록으로 영속화합니다.
    pub fn with_change_controller(mut self, changes: Arc<ChangeController>) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn with_max_output_size(mut self, max: usize) -> Self {
        self.max_output_size = max;
        self
    }

    // ─── 플러그인 관리 ───────────────────────────────────────────────

    /// 실행 중에 플러그인을 추가 등록합니다.
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(plugin)
    }

    /// 등록된 플러그인 메타데이터 (등록 순서)
    pub fn plugins(&self) -> Vec<PluginInfo> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        registry
            .ids()
            .iter()
            .filter_map(|id| registry.get(id))
            .map(|p| p.info().clone())
            .collect()
    }

    // ─── 명령 흐름 ───────────────────────────────────────────────────

    /// 명령 실행 시작을 알립니다.
    ///
    /// 시그니처에 맞는 플러그인이 있으면 대기 호출을 만들고 그 ID를 반환합니다.
    /// 일치하는 플러그인이 없으면 아무것도 하지 않고 `None`을 반환합니다.
    pub fn process_command_input(&self, command: &str) -> Option<String> {
        let signature = command_signature(command)?;
        let plugin = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .find_by_signature(&signature)?;

        let invocation = Invocation::pending(command, &plugin.info().id);
        let id = invocation.id.clone();

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.insert(
            command.to_owned(),
            PendingInvocation { invocation, plugin },
        ) {
            warn!(
                command,
                previous = %previous.invocation.id,
                "command restarted before finishing, replacing pending invocation"
            );
        }

        debug!(command, invocation = %id, signature = %signature, "invocation registered");
        Some(id)
    }

    /// 명령 완료와 캡처된 출력을 전달합니다.
    ///
    /// 대기 호출이 없으면 `None`. 파싱 실패는 호출을 `Failed`로 만들 뿐 전파되지 않습니다.
    pub fn on_command_finished(&self, command: &str, output: &str) -> Option<InvocationState> {
        let PendingInvocation {
            mut invocation,
            plugin,
        } = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(command)?;

        invocation.output_size = output.len();
        if output.len() <= self.max_output_size {
            invocation.output = output.to_owned();
        }
        let plugin_id = invocation.plugin_id.clone();

        match self.run_plugin(plugin.as_ref(), output) {
            Ok(enqueued) => {
                invocation.finish(enqueued);
                metrics::counter!(m::PLUGIN_INVOCATIONS_FINISHED_TOTAL, m::LABEL_PLUGIN => plugin_id.clone())
                    .increment(1);
                info!(
                    command,
                    plugin = %plugin_id,
                    actions = enqueued,
                    "invocation finished"
                );
            }
            Err(reason) => {
                warn!(command, plugin = %plugin_id, error = %reason, "invocation failed");
                invocation.fail(reason);
                metrics::counter!(m::PLUGIN_INVOCATIONS_FAILED_TOTAL, m::LABEL_PLUGIN => plugin_id)
                    .increment(1);
            }
        }

        let state = invocation.state;
        self.persist(&invocation);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation);
        Some(state)
    }

    fn run_plugin(&self, plugin: &dyn Plugin, output: &str) -> Result<usize, String> {
        if output.len() > self.max_output_size {
            return Err(PluginError::OutputTooLarge {
                size: output.len(),
                max: self.max_output_size,
            }
            .to_string());
        }

        let actions = plugin.parse(output).map_err(|e| e.to_string())?;
        let seqs = self
            .model
            .enqueue_all(actions)
            .map_err(|e| e.to_string())?;
        Ok(seqs.len())
    }

    fn persist(&self, invocation: &Invocation) {
        let Some(changes) = &self.changes else {
            return;
        };
        let Some(workspace) = self.model.workspace() else {
            debug!(invocation = %invocation.id, "no bound workspace, command record not persisted");
            return;
        };

        let result = Change::save(workspace.name.as_str(), invocation)
            .and_then(|change| changes.apply(change));
        if let Err(e) = result {
            error!(
                workspace = %workspace.name,
                invocation = %invocation.id,
                error = %e,
                "failed to persist command record"
            );
        }
    }

    // ─── 조회 ────────────────────────────────────────────────────────

    /// 대기 중인 호출 수
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 완료된 호출 목록 (완료 순서)
    pub fn invocations(&self) -> Vec<Invocation> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// ID로 호출을 찾습니다 (대기 중 포함).
    pub fn invocation(&self, id: &str) -> Option<Invocation> {
        if let Some(done) = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|inv| inv.id == id)
        {
            return Some(done.clone());
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|p| p.invocation.id == id)
            .map(|p| p.invocation.clone())
    }
}
