//! 도메인 타입: 워크스페이스와 호스트/취약점 모델
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.
//! 플러그인은 이 타입으로 변경 의도를 만들고, 모델 컨트롤러는 이 타입으로 컨테이너를 구성하며,
//! 영속성 계층은 이 타입을 문서로 매핑합니다.

use std::collections::BTreeSet;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;

/// 워크스페이스 이름 최대 길이
pub const MAX_WORKSPACE_NAME_LEN: usize = 64;

// ─── BackendType ─────────────────────────────────────────────────────

/// 워크스페이스가 사용하는 스토리지 백엔드
///
/// 저장된 태그로 커넥터를 선택하며, 타입 검사로 분기하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendType {
    /// 워크스페이스당 디렉토리 하나
    #[serde(rename = "FS")]
    Fs,
    /// 워크스페이스당 문서 컬렉션 하나
    DocStore,
}

impl BackendType {
    /// 모든 백엔드 (탐색 순서)
    pub const ALL: [BackendType; 2] = [BackendType::Fs, BackendType::DocStore];

    /// 문자열에서 백엔드 타입을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fs" | "filesystem" | "file" => Some(Self::Fs),
            "docstore" | "doc" | "document" | "couchdb" | "sled" => Some(Self::DocStore),
            _ => None,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fs => write!(f, "FS"),
            Self::DocStore => write!(f, "DocStore"),
        }
    }
}

// ─── Workspace ───────────────────────────────────────────────────────

/// 워크스페이스: 하나의 점검(engagement) 데이터를 담는 이름 있는 컨테이너
///
/// 이름은 백엔드와 무관한 단일 네임스페이스에서 고유합니다.
/// 활성 여부는 워크스페이스 매니저가 보관하며 레코드에는 저장하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// 고유 이름
    pub name: String,
    /// 설명
    pub description: String,
    /// 백엔드 태그
    pub backend: BackendType,
    /// 생성 시각
    pub created_at: SystemTime,
}

impl Workspace {
    /// 새 워크스페이스 값을 생성합니다 (저장소 할당은 하지 않음).
    pub fn new(name: impl Into<String>, description: impl Into<String>, backend: BackendType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            backend,
            created_at: SystemTime::now(),
        }
    }
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.backend)
    }
}

/// 워크스페이스 이름 규칙을 검증합니다.
///
/// - 1-64자
/// - 소문자 ASCII로 시작
/// - `[a-z0-9_$()+-]`만 허용 (디렉토리 한 단계로 항상 안전)
pub fn validate_workspace_name(name: &str) -> Result<(), WorkspaceError> {
    let invalid = |reason: &str| WorkspaceError::InvalidName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > MAX_WORKSPACE_NAME_LEN {
        return Err(invalid(&format!(
            "name exceeds {MAX_WORKSPACE_NAME_LEN} characters"
        )));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid("name must start with a lowercase letter"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-".contains(*c)))
    {
        return Err(invalid(&format!("character '{bad}' is not allowed")));
    }
    Ok(())
}

// ─── Severity ────────────────────────────────────────────────────────

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 정보성 항목
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적: 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" | "none" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 스캐너의 숫자 심각도(0-4)를 변환합니다. 범위를 넘으면 `Critical`입니다.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Info,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

// ─── Host ────────────────────────────────────────────────────────────

/// 호스트 식별자
///
/// 앞뒤 공백을 제거하고 소문자로 정규화한 주소 또는 호스트명입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostKey(String);

impl HostKey {
    /// 정규화된 호스트 키를 생성합니다.
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// 키 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 빈 키인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// 전송 계층 프로토콜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// 문자열에서 프로토콜을 파싱합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            "sctp" => Some(Self::Sctp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::Sctp => write!(f, "sctp"),
        }
    }
}

/// 서비스가 노출된 포트 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceRef {
    pub port: u16,
    pub protocol: Protocol,
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// 호스트에서 열린 서비스
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// 포트 번호
    pub port: u16,
    /// 프로토콜
    pub protocol: Protocol,
    /// 서비스 이름 (ssh, http 등)
    pub name: String,
    /// 상태 (open, filtered 등)
    pub status: String,
    /// 제품/버전 배너
    pub version: Option<String>,
}

impl Service {
    /// 서비스 위치를 반환합니다.
    pub fn location(&self) -> ServiceRef {
        ServiceRef {
            port: self.port,
            protocol: self.protocol,
        }
    }
}

/// 호스트 취약점
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 취약점 이름 (스캐너 플러그인 이름 등)
    pub name: String,
    /// 심각도
    pub severity: Severity,
    /// 상세 설명
    pub description: String,
    /// 조치 방안
    pub resolution: Option<String>,
    /// CVE ID, 참고 URL
    pub references: BTreeSet<String>,
    /// 관련 서비스 (호스트 전체 대상이면 `None`)
    pub service: Option<ServiceRef>,
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.service {
            Some(svc) => write!(f, "[{}] {} ({})", self.severity, self.name, svc),
            None => write!(f, "[{}] {}", self.severity, self.name),
        }
    }
}

/// 호스트: 서비스와 취약점을 모으는 모델 노드
///
/// 적용된 pending action을 통해서만 생성/수정됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// 고유 키
    pub key: HostKey,
    /// 표시 이름
    pub name: String,
    /// 운영체제
    pub os: Option<String>,
    /// 알려진 호스트명
    pub hostnames: BTreeSet<String>,
    /// 열린 서비스
    pub services: Vec<Service>,
    /// 취약점 목록
    pub vulnerabilities: Vec<Vulnerability>,
}

impl Host {
    /// 키만 가진 빈 호스트를 생성합니다.
    pub fn new(key: HostKey) -> Self {
        Self {
            name: key.as_str().to_owned(),
            key,
            os: None,
            hostnames: BTreeSet::new(),
            services: Vec::new(),
            vulnerabilities: Vec::new(),
        }
    }

    /// 위치로 서비스를 조회합니다.
    pub fn service(&self, location: ServiceRef) -> Option<&Service> {
        self.services.iter().find(|s| s.location() == location)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} os={} services={} vulns={}",
            self.key,
            self.os.as_deref().unwrap_or("unknown"),
            self.services.len(),
            self.vulnerabilities.len(),
        )
    }
}
