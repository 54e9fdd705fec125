//! 워크스페이스 생명주기 통합 테스트
//!
//! - 동시 생성: 같은 이름은 정확히 하나만 성공
//! - 삭제 멱등성
//! - 백엔드별 저장소 배치 (FS 디렉토리 / 문서 저장소 트리)
//! - 목록, 열기, 활성 포인터
//! - 재시작 후 탐색과 고아 저장소 처리
//! - 열지 못한 백엔드가 있을 때의 생성 거부
//! - 삭제와 동시에 진행되는 문서 쓰기

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ironscope_core::config::PersistenceConfig;
use ironscope_core::error::{IronscopeError, StorageError, WorkspaceError};
use ironscope_core::types::{BackendType, Host, HostKey};
use ironscope_persistence::{
    Change, DbManager, DocStoreConnector, FsConnector, StorageConnector, WorkspaceManager,
};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    manager: WorkspaceManager,
}

impl Fixture {
    fn fs_root(&self) -> std::path::PathBuf {
        self.dir.path().join("persistence")
    }

    fn docstore_path(&self) -> std::path::PathBuf {
        self.dir.path().join("docstore")
    }
}

fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir);
    Fixture { dir, manager }
}

fn open_manager(dir: &TempDir) -> WorkspaceManager {
    let fs: Arc<dyn StorageConnector> =
        Arc::new(FsConnector::new(dir.path().join("persistence")).unwrap());
    let doc: Arc<dyn StorageConnector> =
        Arc::new(DocStoreConnector::open(dir.path().join("docstore")).unwrap());
    WorkspaceManager::new(Arc::new(DbManager::new(vec![fs, doc])))
}

// =============================================================================
// 동시성
// =============================================================================

#[test]
fn concurrent_creates_of_same_name_exactly_one_succeeds() {
    let fx = setup();
    let successes = AtomicUsize::new(0);
    let duplicates = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for i in 0..8 {
            let backend = if i % 2 == 0 {
                BackendType::Fs
            } else {
                BackendType::DocStore
            };
            let manager = &fx.manager;
            let successes = &successes;
            let duplicates = &duplicates;
            s.spawn(move || match manager.create_workspace("race", "", backend) {
                Ok(_) => {
                    successes.fetch_add(1, Ordering::SeqCst);
                }
                Err(IronscopeError::Workspace(WorkspaceError::Duplicate { .. })) => {
                    duplicates.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => panic!("unexpected error: {e}"),
            });
        }
    });

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(duplicates.load(Ordering::SeqCst), 7);
    assert_eq!(fx.manager.workspace_names(), vec!["race"]);
}

#[test]
fn concurrent_creates_of_distinct_names_all_succeed() {
    let fx = setup();
    std::thread::scope(|s| {
        for i in 0..6 {
            let manager = &fx.manager;
            s.spawn(move || {
                manager
                    .create_workspace(&format!("ws{i}"), "", BackendType::Fs)
                    .unwrap();
            });
        }
    });
    assert_eq!(fx.manager.workspace_names().len(), 6);
}

// =============================================================================
// 삭제 멱등성
// =============================================================================

#[test]
fn remove_is_idempotent() {
    let fx = setup();
    fx.manager
        .create_workspace("acme", "", BackendType::Fs)
        .unwrap();

    fx.manager.remove_workspace("acme").unwrap();
    fx.manager.remove_workspace("acme").unwrap();

    assert!(fx.manager.open_workspace("acme").unwrap().is_none());
    assert!(fx.manager.workspace_type("acme").is_none());
    assert!(fx.manager.workspace_names().is_empty());
}

#[test]
fn remove_of_never_created_name_is_ok() {
    let fx = setup();
    fx.manager.remove_workspace("nothing").unwrap();
}

// =============================================================================
// 백엔드 배치
// =============================================================================

#[test]
fn fs_workspace_has_directory_until_removed() {
    let fx = setup();
    fx.manager
        .create_workspace("acme", "d", BackendType::Fs)
        .unwrap();

    assert_eq!(fx.manager.workspace_type("acme"), Some(BackendType::Fs));
    assert!(fx.fs_root().join("acme").is_dir());

    fx.manager.remove_workspace("acme").unwrap();
    assert!(!fx.fs_root().join("acme").exists());
}

#[test]
fn docstore_workspace_creates_no_directory() {
    let fx = setup();
    fx.manager
        .create_workspace("acme", "d", BackendType::DocStore)
        .unwrap();

    assert_eq!(
        fx.manager.workspace_type("acme"),
        Some(BackendType::DocStore)
    );
    assert!(!fx.fs_root().join("acme").exists());
    assert!(fx.docstore_path().exists());
}

// =============================================================================
// 목록 / 열기 / 활성
// =============================================================================

#[test]
fn names_include_every_live_workspace() {
    let fx = setup();
    fx.manager
        .create_workspace("alpha", "", BackendType::Fs)
        .unwrap();
    fx.manager
        .create_workspace("beta", "", BackendType::DocStore)
        .unwrap();
    fx.manager
        .create_workspace("gamma", "", BackendType::Fs)
        .unwrap();
    fx.manager.remove_workspace("beta").unwrap();

    assert_eq!(fx.manager.workspace_names(), vec!["alpha", "gamma"]);
}

#[test]
fn open_never_created_is_absent() {
    let fx = setup();
    assert!(fx.manager.open_workspace("never").unwrap().is_none());
    assert!(fx.manager.workspace_type("never").is_none());
}

#[test]
fn switching_active_workspace() {
    let fx = setup();
    let a = fx
        .manager
        .create_workspace("alpha", "", BackendType::Fs)
        .unwrap();
    let b = fx
        .manager
        .create_workspace("beta", "", BackendType::DocStore)
        .unwrap();

    fx.manager.set_active_workspace(&a).unwrap();
    assert!(fx.manager.is_active("alpha"));

    fx.manager.set_active_workspace(&b).unwrap();
    assert!(!fx.manager.is_active("alpha"));
    assert!(fx.manager.is_active("beta"));
    assert_eq!(fx.manager.active_workspace().unwrap().name, "beta");
}

// =============================================================================
// 재시작 / 고아 저장소
// =============================================================================

#[test]
fn reopened_manager_discovers_workspaces_and_hosts() {
    let dir = TempDir::new().unwrap();
    {
        let manager = open_manager(&dir);
        manager
            .create_workspace("alpha", "", BackendType::Fs)
            .unwrap();
        manager
            .create_workspace("beta", "", BackendType::DocStore)
            .unwrap();
        manager
            .change_controller()
            .apply(Change::save("beta", &Host::new(HostKey::new("10.0.0.1"))).unwrap())
            .unwrap();
    }

    let manager = open_manager(&dir);
    assert!(manager.workspace_names().is_empty());
    assert_eq!(manager.load_workspaces().unwrap(), 2);
    assert_eq!(manager.workspace_names(), vec!["alpha", "beta"]);
    assert_eq!(
        manager.workspace_type("beta"),
        Some(BackendType::DocStore)
    );

    let hosts = manager.load_hosts("beta").unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].key.as_str(), "10.0.0.1");
}

#[test]
fn orphaned_storage_is_hidden_and_blocks_reuse_until_removed() {
    let fx = setup();
    // 레코드 저장 전에 중단된 생성
    std::fs::create_dir_all(fx.fs_root().join("orphan")).unwrap();

    assert_eq!(fx.manager.load_workspaces().unwrap(), 0);
    assert!(fx.manager.workspace_names().is_empty());
    assert!(fx.manager.open_workspace("orphan").unwrap().is_none());

    let err = fx
        .manager
        .create_workspace("orphan", "", BackendType::Fs)
        .unwrap_err();
    assert!(matches!(
        err,
        IronscopeError::Workspace(WorkspaceError::Duplicate { .. })
    ));

    fx.manager.remove_workspace("orphan").unwrap();
    assert!(!fx.fs_root().join("orphan").exists());
    fx.manager
        .create_workspace("orphan", "", BackendType::Fs)
        .unwrap();
}

#[test]
fn recreated_workspace_starts_empty() {
    let fx = setup();
    fx.manager
        .create_workspace("acme", "", BackendType::DocStore)
        .unwrap();
    fx.manager
        .change_controller()
        .apply(Change::save("acme", &Host::new(HostKey::new("10.0.0.1"))).unwrap())
        .unwrap();

    fx.manager.remove_workspace("acme").unwrap();
    fx.manager
        .create_workspace("acme", "", BackendType::Fs)
        .unwrap();
    assert!(fx.manager.load_hosts("acme").unwrap().is_empty());
}

// =============================================================================
// 백엔드 장애
// =============================================================================

#[test]
fn create_is_refused_while_docstore_is_locked_elsewhere() {
    let dir = TempDir::new().unwrap();
    let config = PersistenceConfig {
        root: dir.path().join("persistence").display().to_string(),
        docstore_uri: format!("sled://{}", dir.path().join("docstore").display()),
        docstore_enabled: true,
        ..PersistenceConfig::default()
    };

    let first = WorkspaceManager::from_config(&config).unwrap();
    first
        .create_workspace("acme", "", BackendType::DocStore)
        .unwrap();

    let second = WorkspaceManager::from_config(&config).unwrap();
    let unavailable = second.db_manager().unavailable_backends();
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0].0, BackendType::DocStore);

    for name in ["acme", "fresh"] {
        let err = second
            .create_workspace(name, "", BackendType::Fs)
            .unwrap_err();
        assert!(
            matches!(
                err,
                IronscopeError::Storage(StorageError::BackendUnavailable {
                    backend: BackendType::DocStore,
                    ..
                })
            ),
            "{name}: {err}"
        );
        assert!(!dir.path().join("persistence").join(name).exists());
    }
    assert!(second.workspace_names().is_empty());
    assert_eq!(first.workspace_names(), vec!["acme"]);
}

#[test]
fn remove_racing_with_host_writes_leaves_nothing_behind() {
    for backend in [BackendType::Fs, BackendType::DocStore] {
        let fx = setup();
        fx.manager.create_workspace("acme", "", backend).unwrap();
        let changes = fx.manager.change_controller();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..50 {
                    let host = Host::new(HostKey::new(&format!("10.0.0.{i}")));
                    // 삭제 이후의 쓰기는 MissingWorkspace로 실패한다
                    let _ = changes.apply(Change::save("acme", &host).unwrap());
                }
            });
            s.spawn(|| fx.manager.remove_workspace("acme").unwrap());
        });

        assert!(fx.manager.workspace_names().is_empty(), "{backend}");
        assert!(!fx.fs_root().join("acme").exists(), "{backend}");
        assert!(
            !fx.manager
                .db_manager()
                .connector_exists("acme")
                .unwrap(),
            "{backend}"
        );
        for i in 0..50 {
            let id = format!("host:10.0.0.{i}");
            assert!(
                fx.manager
                    .mapper()
                    .find_entity::<Host>("acme", &id)
                    .unwrap()
                    .is_none(),
                "{backend}: {id}"
            );
        }
    }
}
