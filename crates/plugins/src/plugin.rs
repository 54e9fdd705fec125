//! 플러그인 계약: 스캐너 출력 한 형식을 변경 의도로 바꾸는 파서
//!
//! 플러그인은 호출 간 상태를 공유하지 않습니다. 각 `parse` 호출은 새 파싱 문맥에서 시작하므로
//! 한 호출의 실패가 다른 호출에 영향을 주지 않으며, 여러 스레드에서 동시에 호출할 수 있습니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use ironscope_core::action::ModelAction;
use ironscope_core::error::PluginError;

/// 플러그인 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// 고유 ID (예: `"nessus"`)
    pub id: String,
    /// 표시 이름
    pub name: String,
    /// 플러그인 버전
    pub version: String,
    /// 설명
    pub description: String,
    /// 담당하는 명령 시그니처 (실행 파일 이름, 소문자)
    pub signature: String,
}

impl fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} ({})", self.id, self.version, self.signature)
    }
}

/// 스캐너 출력 플러그인
///
/// # 구현 요구사항
///
/// - `Send + Sync` 필수, `&self`만 사용 (가변 상태 없음)
/// - 형식은 맞지만 예상하지 못한 내용은 건너뛰고 에러로 만들지 않습니다
/// - 출력 전체를 해석할 수 없을 때만 [`PluginError::ParseFailed`]를 반환합니다
///
/// # 구현 예시
///
/// ```ignore
/// struct EchoPlugin { info: PluginInfo }
///
/// impl Plugin for EchoPlugin {
///     fn info(&self) -> &PluginInfo { &self.info }
///
///     fn parse(&self, output: &str) -> Result<Vec<ModelAction>, PluginError> {
///         Ok(output
///             .lines()
///             .filter(|l| !l.trim().is_empty())
///             .map(|l| ModelAction::AddHost(HostDraft::new(l)))
///             .collect())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// 플러그인 메타데이터를 반환합니다.
    fn info(&self) -> &PluginInfo;

    /// 캡처된 출력을 변경 의도 시퀀스로 변환합니다.
    fn parse(&self, output: &str) -> Result<Vec<ModelAction>, PluginError>;
}

/// 명령 문자열에서 시그니처를 추출합니다.
///
/// 선행 `sudo`를 건너뛴 첫 토큰에서 디렉토리 부분을 떼고 소문자로 만듭니다.
/// 빈 명령이면 `None`입니다.
///
/// ```ignore
/// assert_eq!(command_signature("./nessus report").as_deref(), Some("nessus"));
/// assert_eq!(command_signature("sudo /usr/bin/nmap -oG - 10.0.0.0/24").as_deref(), Some("nmap"));
/// ```
pub fn command_signature(command: &str) -> Option<String> {
    let mut tokens = command.split_whitespace();
    let mut first = tokens.next()?;
    if first == "sudo" {
        first = tokens.next()?;
    }
    let base = first.rsplit(['/', '\\']).next().unwrap_or(first);
    if base.is_empty() {
        return None;
    }
    Some(base.to_lowercase())
}

pub(crate) fn parse_failed(plugin: &str, reason: impl fmt::Display) -> PluginError {
    PluginError::ParseFailed {
        plugin: plugin.to_owned(),
        reason: reason.to_string(),
    }
}
