//! 플러그인 호출 추적
//!
//! 상태 전이: `Pending → Finished` (파싱 성공) 또는 `Pending → Failed` (파싱 실패).
//! 완료된 호출은 명령 기록 문서로 영속화할 수 있습니다.
//! 캡처된 출력은 메모리에만 두며 명령 기록 문서에는 크기만 남습니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use ironscope_persistence::{DocumentKind, Mapped};

/// 호출 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// 명령 실행 중 (출력 대기)
    Pending,
    /// 파싱 완료, 변경 의도를 큐에 넣음
    Finished,
    /// 파싱 또는 큐 삽입 실패
    Failed,
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 명령 실행 한 번과 그 출력의 대응
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// 호출 ID (UUID v4)
    pub id: String,
    /// 원본 명령 문자열
    pub command: String,
    /// 처리한 플러그인 ID
    pub plugin_id: String,
    /// 명령 시작 시각
    pub started_at: SystemTime,
    /// 완료 시각
    pub finished_at: Option<SystemTime>,
    /// 현재 상태
    pub state: InvocationState,
    /// 캡처된 출력 (최대 출력 크기를 넘으면 비어 있음, 직렬화 제외)
    #[serde(skip)]
    pub output: String,
    /// 캡처된 출력 크기 (바이트)
    pub output_size: usize,
    /// 큐에 넣은 변경 의도 수
    pub actions_enqueued: usize,
    /// 실패 사유
    pub error: Option<String>,
}

impl Invocation {
    pub(crate) fn pending(command: &str, plugin_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            command: command.to_owned(),
            plugin_id: plugin_id.to_owned(),
            started_at: SystemTime::now(),
            finished_at: None,
            state: InvocationState::Pending,
            output: String::new(),
            output_size: 0,
            actions_enqueued: 0,
            error: None,
        }
    }

    pub(crate) fn finish(&mut self, actions_enqueued: usize) {
        self.state = InvocationState::Finished;
        self.actions_enqueued = actions_enqueued;
        self.finished_at = Some(SystemTime::now());
    }

    pub(crate) fn fail(&mut self, error: impl fmt::Display) {
        self.state = InvocationState::Failed;
        self.error = Some(error.to_string());
        self.finished_at = Some(SystemTime::now());
    }

    /// 완료 여부 (성공/실패 무관)
    pub fn is_complete(&self) -> bool {
        self.state != InvocationState::Pending
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("plugin_id", &self.plugin_id)
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .field("state", &self.state)
            .field("output", &format_args!("<{} bytes>", self.output.len()))
            .field("output_size", &self.output_size)
            .field("actions_enqueued", &self.actions_enqueued)
            .field("error", &self.error)
            .finish()
    }
}

impl Mapped for Invocation {
    const KIND: DocumentKind = DocumentKind::Command;

    fn document_id(&self) -> String {
        format!("command:{}", self.id)
    }
}
