//! 모델 변경 의도: 플러그인이 만들고 모델 컨트롤러가 적용하는 단위
//!
//! 플러그인은 모델을 직접 수정하지 않고 [`ModelAction`] 시퀀스를 반환합니다.
//! 모델 컨트롤러는 이를 [`PendingAction`]으로 감싸 순번을 부여하고,
//! 처리 단계에서 제출 순서대로 한 번씩만 적용합니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::{HostKey, Service, Vulnerability};

/// 호스트 추가 의도
///
/// 같은 키의 호스트가 이미 있으면 병합됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDraft {
    /// 호스트 키 (주소 또는 호스트명)
    pub key: HostKey,
    /// 표시 이름 (비어 있으면 키 사용)
    pub name: String,
    /// 운영체제
    pub os: Option<String>,
    /// 호스트명 목록
    pub hostnames: Vec<String>,
}

impl HostDraft {
    /// 키만 가진 초안을 생성합니다.
    pub fn new(key: impl Into<HostKey>) -> Self {
        Self {
            key: key.into(),
            name: String::new(),
            os: None,
            hostnames: Vec::new(),
        }
    }

    /// 운영체제를 지정합니다.
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    /// 호스트명을 추가합니다.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostnames.push(hostname.into());
        self
    }
}

/// 갱신 가능한 호스트 속성
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostAttribute {
    /// 표시 이름
    Name(String),
    /// 운영체제
    Os(String),
    /// 호스트명 추가
    Hostname(String),
}

/// 모델 변경 의도
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelAction {
    /// 호스트 추가 (기존 키면 병합)
    AddHost(HostDraft),
    /// 서비스 추가 (호스트가 없으면 생성)
    AddService { host: HostKey, service: Service },
    /// 취약점 추가 (호스트가 없으면 생성)
    AddVulnerability {
        host: HostKey,
        vulnerability: Vulnerability,
    },
    /// 호스트 속성 갱신 (호스트가 없으면 생성)
    UpdateHost {
        host: HostKey,
        attribute: HostAttribute,
    },
}

impl ModelAction {
    /// 대상 호스트 키를 반환합니다.
    pub fn host_key(&self) -> &HostKey {
        match self {
            Self::AddHost(draft) => &draft.key,
            Self::AddService { host, .. }
            | Self::AddVulnerability { host, .. }
            | Self::UpdateHost { host, .. } => host,
        }
    }

    /// 로그용 액션 종류 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddHost(_) => "add_host",
            Self::AddService { .. } => "add_service",
            Self::AddVulnerability { .. } => "add_vulnerability",
            Self::UpdateHost { .. } => "update_host",
        }
    }

    /// 적용 가능한 액션인지 검증합니다.
    ///
    /// 실패 사유를 반환하며, 호출자는 이 액션을 건너뜁니다.
    pub fn validate(&self) -> Result<(), String> {
        if self.host_key().is_empty() {
            return Err("host key must not be empty".to_owned());
        }

        match self {
            Self::AddHost(_) => Ok(()),
            Self::AddService { service, .. } => {
                if service.port == 0 {
                    return Err("service port must not be 0".to_owned());
                }
                Ok(())
            }
            Self::AddVulnerability { vulnerability, .. } => {
                if vulnerability.name.trim().is_empty() {
                    return Err("vulnerability name must not be empty".to_owned());
                }
                if vulnerability.service.is_some_and(|s| s.port == 0) {
                    return Err("vulnerability service port must not be 0".to_owned());
                }
                Ok(())
            }
            Self::UpdateHost { attribute, .. } => {
                let value = match attribute {
                    HostAttribute::Name(v) | HostAttribute::Os(v) | HostAttribute::Hostname(v) => v,
                };
                if value.trim().is_empty() {
                    return Err("attribute value must not be empty".to_owned());
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ModelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} host={}", self.kind(), self.host_key())
    }
}

/// 큐에 들어간 변경 의도
///
/// `seq`는 컨트롤러 단위로 단조 증가하며 제출 순서를 나타냅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    /// 제출 순번
    pub seq: u64,
    /// 변경 의도
    pub action: ModelAction,
    /// 큐 삽입 시각
    pub enqueued_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::types::{Protocol, ServiceRef, Severity};

    fn service(port: u16) -> Service {
        Service {
            port,
            protocol: Protocol::Tcp,
            name: "http".to_owned(),
            status: "open".to_owned(),
            version: None,
        }
    }

    #[test]
    fn add_host_is_valid() {
        let action = ModelAction::AddHost(HostDraft::new("10.0.0.1").with_os("Linux"));
        assert!(action.validate().is_ok());
        assert_eq!(action.kind(), "add_host");
        assert_eq!(action.host_key().as_str(), "10.0.0.1");
    }

    #[test]
    fn empty_host_key_is_malformed() {
        let action = ModelAction::AddHost(HostDraft::new("   "));
        assert!(action.validate().is_err());
    }

    #[test]
    fn zero_port_service_is_malformed() {
        let action = ModelAction::AddService {
            host: HostKey::new("10.0.0.1"),
            service: service(0),
        };
        let reason = action.validate().unwrap_err();
        assert!(reason.contains("port"));
    }

    #[test]
    fn unnamed_vulnerability_is_malformed() {
        let action = ModelAction::AddVulnerability {
            host: HostKey::new("10.0.0.1"),
            vulnerability: Vulnerability {
                name: " ".to_owned(),
                severity: Severity::High,
                description: String::new(),
                resolution: None,
                references: BTreeSet::new(),
                service: Some(ServiceRef {
                    port: 80,
                    protocol: Protocol::Tcp,
                }),
            },
        };
        assert!(action.validate().is_err());
    }

    #[test]
    fn empty_attribute_is_malformed() {
        let action = ModelAction::UpdateHost {
            host: HostKey::new("10.0.0.1"),
            attribute: HostAttribute::Os(String::new()),
        };
        assert!(action.validate().is_err());
    }

    #[test]
    fn display_includes_kind_and_host() {
        let action = ModelAction::AddService {
            host: HostKey::new("Web01"),
            service: service(443),
        };
        assert_eq!(action.to_string(), "add_service host=web01");
    }
}
