//! Integration tests for the `ironscope` command flow across process restarts.
//!
//! Each "process" loads config from a real TOML file, builds a workspace manager from it,
//! does its work and drops everything before the next one starts (the document store holds
//! a file lock while open).

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ironscope_core::config::IronscopeConfig;
use ironscope_core::types::{BackendType, HostKey};
use ironscope_model::{ModelContainer, ModelController};
use ironscope_persistence::WorkspaceManager;
use ironscope_plugins::{Invocation, InvocationState, PluginController};
use tempfile::TempDir;

const NESSUS_REPORT: &str =
    include_str!("../../crates/plugins/tests/fixtures/nessus_report.nessus");

fn write_config(dir: &Path) -> std::path::PathBuf {
    let config_path = dir.join("ironscope.toml");
    let config = format!(
        r#"
[general]
log_level = "debug"

[persistence]
root = "{}"
docstore_uri = "sled://{}"
default_backend = "docstore"

[plugins]
max_output_size = 1048576
"#,
        dir.join("persistence").display(),
        dir.join("docstore").display()
    );
    fs::write(&config_path, config).expect("should write config");
    config_path
}

async fn open(config_path: &Path) -> (IronscopeConfig, WorkspaceManager) {
    let config = IronscopeConfig::load(config_path)
        .await
        .expect("config should load");
    let manager =
        WorkspaceManager::from_config(&config.persistence).expect("storage should open");
    (config, manager)
}

fn import(
    config: &IronscopeConfig,
    manager: &WorkspaceManager,
    workspace: &str,
    output: &str,
) -> InvocationState {
    let bound = manager
        .open_workspace(workspace)
        .expect("open")
        .expect("workspace exists");
    let hosts = manager.load_hosts(workspace).expect("load hosts");

    let changes = manager.change_controller().clone();
    let model = Arc::new(ModelController::with_change_controller(changes.clone()));
    model.set_workspace(bound, ModelContainer::from_hosts(hosts));

    let plugins = PluginController::from_config(&config.plugins, model.clone())
        .expect("builtin plugins")
        .with_change_controller(changes);
    plugins
        .process_command_input("./nessus scan.nessus")
        .expect("nessus plugin matches");
    let state = plugins
        .on_command_finished("./nessus scan.nessus", output)
        .expect("pending invocation");
    model.process_all_pending_actions();
    state
}

#[tokio::test]
async fn test_import_survives_restart_on_both_backends() {
    // Given: two workspaces, one per backend
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(temp_dir.path());
    {
        let (config, manager) = open(&config_path).await;
        assert_eq!(config.persistence.default_backend(), BackendType::DocStore);

        manager
            .create_workspace("doc", "", config.persistence.default_backend())
            .expect("create on docstore");
        manager
            .create_workspace("files", "", BackendType::Fs)
            .expect("create on fs");

        // When: the same report is imported into both
        assert_eq!(import(&config, &manager, "doc", NESSUS_REPORT), InvocationState::Finished);
        assert_eq!(import(&config, &manager, "files", NESSUS_REPORT), InvocationState::Finished);
    }

    // Then: a fresh process discovers both with 7 hosts each
    let (_config, manager) = open(&config_path).await;
    assert_eq!(manager.workspace_names(), vec!["doc".to_owned(), "files".to_owned()]);
    assert_eq!(manager.workspace_type("doc"), Some(BackendType::DocStore));
    assert_eq!(manager.workspace_type("files"), Some(BackendType::Fs));

    for name in ["doc", "files"] {
        let hosts = manager.load_hosts(name).expect("load hosts");
        assert_eq!(hosts.len(), 7, "{name}");
        let commands: Vec<Invocation> = manager.mapper().load_all(name).expect("commands");
        assert_eq!(commands.len(), 1, "{name}");
    }
}

#[tokio::test]
async fn test_reimport_after_restart_merges() {
    // Given: a workspace with one import from a previous process
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(temp_dir.path());
    {
        let (config, manager) = open(&config_path).await;
        manager
            .create_workspace("acme", "", BackendType::Fs)
            .expect("create");
        import(&config, &manager, "acme", NESSUS_REPORT);
    }

    // When: the report is imported again in a new process
    let (config, manager) = open(&config_path).await;
    assert_eq!(import(&config, &manager, "acme", NESSUS_REPORT), InvocationState::Finished);

    // Then: hosts are merged, not duplicated
    let hosts = manager.load_hosts("acme").expect("load hosts");
    assert_eq!(hosts.len(), 7);
    let web = hosts
        .iter()
        .find(|h| h.key == HostKey::new("10.10.1.20"))
        .expect("web01 present");
    assert_eq!(web.services.len(), 3);
}

#[tokio::test]
async fn test_output_limit_from_config_fails_invocation() {
    // Given: a 1 MiB output limit in config
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(temp_dir.path());
    let (config, manager) = open(&config_path).await;
    manager
        .create_workspace("acme", "", BackendType::Fs)
        .expect("create");

    // When: a larger capture is delivered
    let oversized = " ".repeat(config.plugins.max_output_size + 1);
    let state = import(&config, &manager, "acme", &oversized);

    // Then: the invocation fails and nothing is stored
    assert_eq!(state, InvocationState::Failed);
    assert!(manager.load_hosts("acme").expect("load hosts").is_empty());
}

#[tokio::test]
async fn test_removed_workspace_is_gone_after_restart() {
    // Given: a created then removed workspace
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(temp_dir.path());
    {
        let (_config, manager) = open(&config_path).await;
        manager
            .create_workspace("gone", "", BackendType::DocStore)
            .expect("create");
        manager.remove_workspace("gone").expect("remove");
    }

    // Then: a fresh process does not list it and the name is free again
    let (_config, manager) = open(&config_path).await;
    assert!(manager.workspace_names().is_empty());
    manager
        .create_workspace("gone", "", BackendType::Fs)
        .expect("name is reusable");
}
