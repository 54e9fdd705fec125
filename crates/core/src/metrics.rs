//! 메트릭 상수
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()` 매크로를 호출합니다.
//! 코어는 레코더를 설치하지 않으므로, 레코더가 없으면 모든 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ironscope_`
//! - 컴포넌트명: `workspace_`, `model_`, `plugin_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(ironscope_core::metrics::MODEL_ACTIONS_APPLIED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 백엔드 레이블 키 (FS, DocStore)
pub const LABEL_BACKEND: &str = "backend";

/// 플러그인 레이블 키
pub const LABEL_PLUGIN: &str = "plugin";

// ─── Workspace 메트릭 ──────────────────────────────────────────────

/// Workspace: 생성된 워크스페이스 수 (counter, label: backend)
pub const WORKSPACE_CREATED_TOTAL: &str = "ironscope_workspace_created_total";

/// Workspace: 삭제된 워크스페이스 수 (counter, label: backend)
pub const WORKSPACE_REMOVED_TOTAL: &str = "ironscope_workspace_removed_total";

/// Workspace: 커밋된 문서 변경 수 (counter)
pub const WORKSPACE_CHANGES_COMMITTED_TOTAL: &str = "ironscope_workspace_changes_committed_total";

// ─── Model 메트릭 ──────────────────────────────────────────────────

/// Model: 적용된 액션 수 (counter)
pub const MODEL_ACTIONS_APPLIED_TOTAL: &str = "ironscope_model_actions_applied_total";

/// Model: 건너뛴 잘못된 액션 수 (counter)
pub const MODEL_ACTIONS_SKIPPED_TOTAL: &str = "ironscope_model_actions_skipped_total";

/// Model: 워크스페이스 전환으로 버려진 액션 수 (counter)
pub const MODEL_ACTIONS_DISCARDED_TOTAL: &str = "ironscope_model_actions_discarded_total";

/// Model: 대기 중인 액션 수 (gauge)
pub const MODEL_PENDING_ACTIONS: &str = "ironscope_model_pending_actions";

// ─── Plugin 메트릭 ─────────────────────────────────────────────────

/// Plugin: 완료된 호출 수 (counter, label: plugin)
pub const PLUGIN_INVOCATIONS_FINISHED_TOTAL: &str = "ironscope_plugin_invocations_finished_total";

/// Plugin: 실패한 호출 수 (counter, label: plugin)
pub const PLUGIN_INVOCATIONS_FAILED_TOTAL: &str = "ironscope_plugin_invocations_failed_total";
