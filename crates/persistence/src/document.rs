//! 문서 레코드: 영속 계층이 다루는 단위
//!
//! 매핑되는 엔티티(워크스페이스 레코드, 호스트, 명령 기록)는 JSON 본문을 가진
//! [`Document`]로 저장됩니다. 문서는 `(workspace, id)` 쌍으로 식별합니다.

use std::fmt;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use ironscope_core::error::StorageError;
use ironscope_core::types::{Host, Workspace};

/// 워크스페이스 레코드 문서 ID
pub const WORKSPACE_DOC_ID: &str = "workspace";

/// 문서 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// 워크스페이스 레코드 (워크스페이스당 하나)
    Workspace,
    /// 호스트
    Host,
    /// 명령 실행 기록
    Command,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workspace => write!(f, "workspace"),
            Self::Host => write!(f, "host"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// 문서 식별자
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    /// 소속 워크스페이스 이름
    pub workspace: String,
    /// 워크스페이스 안에서 고유한 문서 ID
    pub id: String,
}

impl DocumentKey {
    pub fn new(workspace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            id: id.into(),
        }
    }

    /// 워크스페이스 레코드의 키
    pub fn workspace_record(workspace: impl Into<String>) -> Self {
        Self::new(workspace, WORKSPACE_DOC_ID)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace, self.id)
    }
}

/// 저장된 문서
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 문서 ID
    pub id: String,
    /// 문서 종류
    pub kind: DocumentKind,
    /// 리비전 (저장할 때마다 1씩 증가, 저장 전에는 0)
    pub revision: u64,
    /// 마지막 저장 시각
    pub updated_at: SystemTime,
    /// 엔티티 본문
    pub body: serde_json::Value,
}

impl Document {
    /// 엔티티를 아직 저장되지 않은 문서로 변환합니다.
    pub fn from_entity<T: Mapped>(entity: &T) -> Result<Self, StorageError> {
        let body =
            serde_json::to_value(entity).map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Self {
            id: entity.document_id(),
            kind: T::KIND,
            revision: 0,
            updated_at: SystemTime::now(),
            body,
        })
    }

    /// 본문을 엔티티로 복원합니다.
    ///
    /// 종류가 다르면 직렬화 에러입니다.
    pub fn to_entity<T: Mapped>(&self) -> Result<T, StorageError> {
        if self.kind != T::KIND {
            return Err(StorageError::Serialization(format!(
                "document '{}' is a {} record, expected {}",
                self.id,
                self.kind,
                T::KIND
            )));
        }
        serde_json::from_value(self.body.clone())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// 문서로 매핑되는 엔티티
///
/// 구현 타입은 문서 종류와 워크스페이스 안에서 고유한 ID를 제공합니다.
pub trait Mapped: Serialize + DeserializeOwned {
    /// 문서 종류
    const KIND: DocumentKind;

    /// 문서 ID
    fn document_id(&self) -> String;
}

impl Mapped for Workspace {
    const KIND: DocumentKind = DocumentKind::Workspace;

    fn document_id(&self) -> String {
        WORKSPACE_DOC_ID.to_owned()
    }
}

impl Mapped for Host {
    const KIND: DocumentKind = DocumentKind::Host;

    fn document_id(&self) -> String {
        format!("host:{}", self.key)
    }
}
