//! 에러 타입: 도메인별 에러 정의
//!
//! 워크스페이스 조회(`open`, 타입 조회)의 "없음"은 에러가 아니라 `None`으로 표현합니다.
//! 여기 정의된 에러는 호출자에게 실제로 전달되어야 하는 실패만 다룹니다.

use crate::types::BackendType;

/// Ironscope 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum IronscopeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 워크스페이스 생명주기 에러
    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// 스토리지 백엔드 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 모델 컨트롤러 에러
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// 플러그인 에러
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 워크스페이스 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// 이미 존재하는 이름 (어느 백엔드든)
    #[error("workspace already exists: {name}")]
    Duplicate { name: String },

    /// 이름 규칙 위반
    #[error("invalid workspace name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// 워크스페이스가 반드시 있어야 하는 작업에서 찾지 못함
    #[error("workspace not found: {name}")]
    NotFound { name: String },
}

/// 스토리지 백엔드 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 커넥터가 저장소에 접근할 수 없음
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable { backend: BackendType, reason: String },

    /// 저장 공간이 이미 할당되어 있음
    #[error("{backend} storage already exists for '{name}'")]
    AlreadyExists { backend: BackendType, name: String },

    /// 저장 공간이 없는 워크스페이스에 문서 접근
    #[error("no storage allocated for workspace '{name}'")]
    MissingWorkspace { name: String },

    /// 파일시스템 I/O 실패
    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// 문서 직렬화/역직렬화 실패
    #[error("document serialization failed: {0}")]
    Serialization(String),
}

/// 모델 컨트롤러 에러
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// 적용할 수 없는 변경 의도 (로그 후 건너뜀)
    #[error("malformed action #{seq}: {reason}")]
    MalformedAction { seq: u64, reason: String },

    /// 바인딩된 워크스페이스 없이 큐에 추가 시도
    #[error("no workspace bound to the model controller")]
    NoActiveWorkspace,
}

/// 플러그인 에러
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// 같은 ID의 플러그인이 이미 등록됨
    #[error("plugin already registered: {id}")]
    AlreadyRegistered { id: String },

    /// 명령 시그니처 충돌
    #[error("signature '{signature}' conflicts with plugin '{existing}'")]
    SignatureConflict { signature: String, existing: String },

    /// 등록되지 않은 플러그인
    #[error("plugin not found: {id}")]
    NotFound { id: String },

    /// 리포트 파싱 실패
    #[error("plugin '{plugin}' failed to parse output: {reason}")]
    ParseFailed { plugin: String, reason: String },

    /// 캡처된 출력이 허용 크기를 초과
    #[error("output too large: {size} bytes (max: {max})")]
    OutputTooLarge { size: usize, max: usize },
}
