//! 파일시스템 커넥터: 영속성 루트 아래 워크스페이스당 디렉토리 하나

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use ironscope_core::error::StorageError;
use ironscope_core::types::{BackendType, validate_workspace_name};

use super::{StorageConnector, deserialize, serialize};
use crate::document::{Document, DocumentKind};

const DOC_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "json.tmp";

/// 파일시스템 스토리지 커넥터
///
/// 디렉토리 존재가 곧 워크스페이스 존재이며, 삭제는 재귀 삭제입니다.
/// 문서는 `<root>/<workspace>/<encoded-id>.json`에 임시 파일 + rename으로 기록합니다.
pub struct FsConnector {
    root: PathBuf,
}

impl FsConnector {
    /// 루트 디렉토리를 준비하고 커넥터를 생성합니다.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StorageError::BackendUnavailable {
            backend: BackendType::Fs,
            reason: format!("cannot prepare root {}: {e}", root.display()),
        })?;
        debug!(root = %root.display(), "filesystem connector ready");
        Ok(Self { root })
    }

    /// 영속성 루트
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 워크스페이스 디렉토리 경로
    pub fn workspace_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn document_path(&self, workspace: &str, id: &str) -> PathBuf {
        self.workspace_dir(workspace)
            .join(format!("{}.{DOC_EXTENSION}", encode_id(id)))
    }

    fn require_dir(&self, workspace: &str) -> Result<PathBuf, StorageError> {
        let dir = self.workspace_dir(workspace);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StorageError::MissingWorkspace {
                name: workspace.to_owned(),
            })
        }
    }
}

impl StorageConnector for FsConnector {
    fn backend(&self) -> BackendType {
        BackendType::Fs
    }

    fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.workspace_dir(name).is_dir())
    }

    fn create(&self, name: &str) -> Result<(), StorageError> {
        let dir = self.workspace_dir(name);
        match std::fs::create_dir(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists {
                    backend: BackendType::Fs,
                    name: name.to_owned(),
                })
            }
            Err(e) => Err(io_error(&dir, e)),
        }
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        let dir = self.workspace_dir(name);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&dir, e)),
        }
    }

    fn list_workspaces(&self) -> Result<Vec<String>, StorageError> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| io_error(&self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if validate_workspace_name(&name).is_err() {
                debug!(dir = %name, "ignoring directory that is not a workspace name");
                continue;
            }
            names.push(name);
        }
        Ok(names)
    }

    fn put(&self, workspace: &str, document: &Document) -> Result<(), StorageError> {
        self.require_dir(workspace)?;

        let path = self.document_path(workspace, &document.id);
        let tmp = path.with_extension(TMP_EXTENSION);
        let bytes = serialize(document)?;

        std::fs::write(&tmp, bytes).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            // 실패한 임시 파일은 scan에서 무시되지만 남기지 않는다
            let _ = std::fs::remove_file(&tmp);
            io_error(&path, e)
        })
    }

    fn get(&self, workspace: &str, id: &str) -> Result<Option<Document>, StorageError> {
        let path = self.document_path(workspace, id);
        match std::fs::read(&path) {
            Ok(bytes) => deserialize(&bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn remove(&self, workspace: &str, id: &str) -> Result<bool, StorageError> {
        let path = self.document_path(workspace, id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn scan(&self, workspace: &str, kind: DocumentKind) -> Result<Vec<Document>, StorageError> {
        let dir = self.require_dir(workspace)?;
        let entries = std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;

        let mut documents = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOC_EXTENSION) {
                continue;
            }
            let bytes = std::fs::read(&path).map_err(|e| io_error(&path, e))?;
            match deserialize(&bytes) {
                Ok(doc) if doc.kind == kind => documents.push(doc),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }
}

fn io_error(path: &Path, source: io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// 문서 ID를 파일명으로 안전하게 인코딩합니다.
///
/// `[A-Za-z0-9._~-]` 이외의 바이트는 `%XX`가 됩니다. `%` 자신도 인코딩되므로 단사입니다.
fn encode_id(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}
