//! 스토리지 커넥터: 백엔드별 워크스페이스 저장소 기본 연산
//!
//! 워크스페이스 하나는 정확히 하나의 백엔드 저장소(디렉토리 또는 문서 컬렉션)를 가집니다.
//! 커넥터 선택은 저장된 [`BackendType`] 태그로 이루어지며, 상위 계층은 구체 타입을 알지 못합니다.
//!
//! 존재 확인(`exists`)은 상태를 바꾸지 않으며 여러 스레드에서 동시에 호출할 수 있어야 합니다.

mod docstore;
mod fs;

pub use docstore::DocStoreConnector;
pub use fs::FsConnector;

use ironscope_core::error::StorageError;
use ironscope_core::types::BackendType;

use crate::document::{Document, DocumentKind};

/// 백엔드별 스토리지 커넥터
///
/// # 구현 요구사항
///
/// - `Send + Sync` 필수 (매니저 간 `Arc`로 공유)
/// - `exists`는 저장소를 생성하거나 수정하지 않아야 합니다
/// - `create`는 이미 있는 저장소에 대해 [`StorageError::AlreadyExists`]를 반환합니다
/// - `delete`는 없는 저장소에 대해 성공합니다 (멱등)
/// - 저장소에 접근할 수 없으면 [`StorageError::BackendUnavailable`]을 반환합니다
pub trait StorageConnector: Send + Sync {
    /// 백엔드 태그
    fn backend(&self) -> BackendType;

    /// 워크스페이스 저장소가 있는지 확인합니다.
    fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// 워크스페이스 저장소를 할당합니다.
    fn create(&self, name: &str) -> Result<(), StorageError>;

    /// 워크스페이스 저장소와 모든 문서를 삭제합니다.
    fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// 이 백엔드에 저장소가 있는 워크스페이스 이름 목록
    fn list_workspaces(&self) -> Result<Vec<String>, StorageError>;

    /// 문서를 저장합니다 (같은 ID면 덮어씀).
    ///
    /// 저장소가 없으면 [`StorageError::MissingWorkspace`]입니다.
    fn put(&self, workspace: &str, document: &Document) -> Result<(), StorageError>;

    /// 문서를 조회합니다. 저장소나 문서가 없으면 `None`입니다.
    fn get(&self, workspace: &str, id: &str) -> Result<Option<Document>, StorageError>;

    /// 문서를 삭제합니다. 삭제한 문서가 있었으면 `true`입니다.
    fn remove(&self, workspace: &str, id: &str) -> Result<bool, StorageError>;

    /// 종류가 일치하는 모든 문서를 읽습니다.
    fn scan(&self, workspace: &str, kind: DocumentKind) -> Result<Vec<Document>, StorageError>;
}

fn serialize(document: &Document) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(document).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn deserialize(bytes: &[u8]) -> Result<Document, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}
