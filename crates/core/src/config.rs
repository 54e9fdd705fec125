//! 설정 관리: ironscope.toml 파싱 및 런타임 설정
//!
//! [`IronscopeConfig`]는 프로세스 전역 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 읽고 이후에는 변경하지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`IRONSCOPE_PERSISTENCE_ROOT=/data` 형식)
//! 3. 설정 파일 (`ironscope.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ironscope_core::error::IronscopeError> {
//! use ironscope_core::config::IronscopeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = IronscopeConfig::load("ironscope.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = IronscopeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, IronscopeError};
use crate::types::BackendType;

/// 캡처 출력 최대 허용 크기 상한 (1 GiB)
const MAX_OUTPUT_SIZE_LIMIT: usize = 1024 * 1024 * 1024;

/// 문서 저장소 URI 스킴
const SLED_SCHEME: &str = "sled://";

/// Ironscope 통합 설정
///
/// `ironscope.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IronscopeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 영속성 설정
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// 플러그인 설정
    #[serde(default)]
    pub plugins: PluginsConfig,
}

impl IronscopeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IronscopeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 없으면 기본값에서 시작하는 로드입니다.
    ///
    /// 파일이 존재하지만 잘못된 경우는 에러입니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, IronscopeError> {
        let mut config = match Self::from_file(path.as_ref()).await {
            Ok(config) => config,
            Err(IronscopeError::Config(ConfigError::FileNotFound { path })) => {
                tracing::debug!(path = %path, "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IronscopeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IronscopeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                IronscopeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, IronscopeError> {
        toml::from_str(toml_str).map_err(|e| {
            IronscopeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `IRONSCOPE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "IRONSCOPE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "IRONSCOPE_GENERAL_LOG_FORMAT");

        // Persistence
        override_string(&mut self.persistence.root, "IRONSCOPE_PERSISTENCE_ROOT");
        override_string(
            &mut self.persistence.docstore_uri,
            "IRONSCOPE_PERSISTENCE_DOCSTORE_URI",
        );
        override_bool(
            &mut self.persistence.docstore_enabled,
            "IRONSCOPE_PERSISTENCE_DOCSTORE_ENABLED",
        );
        override_string(
            &mut self.persistence.default_backend,
            "IRONSCOPE_PERSISTENCE_DEFAULT_BACKEND",
        );

        // Plugins
        override_usize(
            &mut self.plugins.max_output_size,
            "IRONSCOPE_PLUGINS_MAX_OUTPUT_SIZE",
        );
        override_csv(&mut self.plugins.disabled, "IRONSCOPE_PLUGINS_DISABLED");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IronscopeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.persistence.root.trim().is_empty() {
            return Err(invalid("persistence.root", "must not be empty".to_owned()));
        }
        if has_parent_component(&self.persistence.root) {
            return Err(invalid(
                "persistence.root",
                "contains path traversal pattern '..'".to_owned(),
            ));
        }

        let backend = BackendType::from_str_loose(&self.persistence.default_backend)
            .ok_or_else(|| {
                invalid(
                    "persistence.default_backend",
                    "must be one of: fs, docstore".to_owned(),
                )
            })?;

        if self.persistence.docstore_enabled {
            let path = self.persistence.docstore_uri_path();
            if path.trim().is_empty() {
                return Err(invalid(
                    "persistence.docstore_uri",
                    format!("must be '{SLED_SCHEME}<path>' or a filesystem path"),
                ));
            }
            if self.persistence.docstore_uri.contains("://")
                && !self.persistence.docstore_uri.starts_with(SLED_SCHEME)
            {
                return Err(invalid(
                    "persistence.docstore_uri",
                    format!("unsupported scheme (expected '{SLED_SCHEME}')"),
                ));
            }
            if has_parent_component(path) {
                return Err(invalid(
                    "persistence.docstore_uri",
                    "contains path traversal pattern '..'".to_owned(),
                ));
            }
        } else if backend == BackendType::DocStore {
            return Err(invalid(
                "persistence.default_backend",
                "docstore backend is disabled".to_owned(),
            ));
        }

        if self.plugins.max_output_size == 0 || self.plugins.max_output_size > MAX_OUTPUT_SIZE_LIMIT
        {
            return Err(invalid(
                "plugins.max_output_size",
                format!("must be 1-{MAX_OUTPUT_SIZE_LIMIT}"),
            ));
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 영속성 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// 파일시스템 백엔드 루트 (`~`는 홈 디렉토리)
    pub root: String,
    /// 문서 저장소 위치 (`sled://<path>` 또는 경로)
    pub docstore_uri: String,
    /// 문서 저장소 사용 여부
    pub docstore_enabled: bool,
    /// 생성 시 기본 백엔드 (fs, docstore)
    pub default_backend: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            root: "~/.ironscope/persistence".to_owned(),
            docstore_uri: "sled://~/.ironscope/docstore".to_owned(),
            docstore_enabled: true,
            default_backend: "fs".to_owned(),
        }
    }
}

impl PersistenceConfig {
    /// 파일시스템 백엔드 루트 경로 (`~` 확장)
    pub fn root_path(&self) -> PathBuf {
        expand_home(&self.root)
    }

    /// 문서 저장소 경로 (`~` 확장, 스킴 제거)
    pub fn docstore_path(&self) -> PathBuf {
        expand_home(self.docstore_uri_path())
    }

    /// 기본 백엔드 (검증 후에는 항상 파싱 가능)
    pub fn default_backend(&self) -> BackendType {
        BackendType::from_str_loose(&self.default_backend).unwrap_or(BackendType::Fs)
    }

    fn docstore_uri_path(&self) -> &str {
        self.docstore_uri
            .strip_prefix(SLED_SCHEME)
            .unwrap_or(&self.docstore_uri)
    }
}

/// 플러그인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// 캡처 출력 최대 크기 (바이트)
    pub max_output_size: usize,
    /// 등록하지 않을 플러그인 ID
    pub disabled: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            max_output_size: 64 * 1024 * 1024, // 64 MB
            disabled: Vec::new(),
        }
    }
}

fn invalid(field: &str, reason: String) -> IronscopeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn has_parent_component(path: &str) -> bool {
    Path::new(path)
        .components()
        .any(|c| c == Component::ParentDir)
}

/// `~` 또는 `~/...` 경로를 홈 디렉토리 기준으로 확장합니다.
///
/// 홈 디렉토리를 알 수 없으면 원본을 그대로 사용합니다.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => {
            warn!(path, "home directory unknown, using path as-is");
            PathBuf::from(path)
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
