//! `ironscope import` command handler
//!
//! Binds the workspace's persisted hosts to a model controller, replays the report file as
//! the output of `"<plugin> <report>"`, drains the queue and persists the touched hosts.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use ironscope_core::error::WorkspaceError;
use ironscope_model::{ModelContainer, ModelController};
use ironscope_plugins::{InvocationState, PluginController};

use crate::cli::ImportArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `import` command.
pub async fn execute(args: ImportArgs, ctx: &Context, writer: &OutputWriter) -> Result<(), CliError> {
    let output = tokio::fs::read_to_string(&args.report).await?;
    let report = import(ctx, &args.workspace, &args.plugin, &args.report, &output)?;
    writer.render(&report)?;

    match report.state {
        InvocationState::Failed => Err(CliError::Command(format!(
            "import failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn import(
    ctx: &Context,
    workspace: &str,
    signature: &str,
    report_path: &Path,
    output: &str,
) -> Result<ImportReport, CliError> {
    let bound = ctx
        .workspaces
        .open_workspace(workspace)?
        .ok_or_else(|| WorkspaceError::NotFound {
            name: workspace.to_owned(),
        })?;
    let hosts = ctx.workspaces.load_hosts(workspace)?;
    let hosts_before = hosts.len();
    ctx.workspaces.set_active_workspace(&bound)?;

    let changes = ctx.workspaces.change_controller().clone();
    let model = Arc::new(ModelController::with_change_controller(changes.clone()));
    model.set_workspace(bound, ModelContainer::from_hosts(hosts));

    let plugins = PluginController::from_config(&ctx.config.plugins, model.clone())?
        .with_change_controller(changes);

    let command = format!("{signature} {}", report_path.display());
    let id = plugins.process_command_input(&command).ok_or_else(|| {
        CliError::Command(format!(
            "no plugin handles '{signature}' (available: {})",
            plugins
                .plugins()
                .iter()
                .map(|p| p.signature.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;

    let state = plugins
        .on_command_finished(&command, output)
        .unwrap_or(InvocationState::Failed);
    let summary = model.process_all_pending_actions();
    let invocation = plugins.invocation(&id);

    info!(
        workspace,
        command = %command,
        state = %state,
        applied = summary.applied,
        "report imported"
    );

    Ok(ImportReport {
        workspace: workspace.to_owned(),
        command,
        invocation: id,
        plugin: invocation
            .as_ref()
            .map(|i| i.plugin_id.clone())
            .unwrap_or_default(),
        state,
        error: invocation.and_then(|i| i.error),
        applied: summary.applied,
        skipped: summary.skipped,
        persisted: summary.persisted,
        hosts_before,
        hosts_after: model.host_count(),
    })
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub workspace: String,
    pub command: String,
    pub invocation: String,
    pub plugin: String,
    pub state: InvocationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub applied: usize,
    pub skipped: usize,
    pub persisted: usize,
    pub hosts_before: usize,
    pub hosts_after: usize,
}

impl Render for ImportReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let state = match self.state {
            InvocationState::Finished => self.state.to_string().green(),
            InvocationState::Failed => self.state.to_string().red(),
            InvocationState::Pending => self.state.to_string().yellow(),
        };
        writeln!(w, "Import into {}: {}", self.workspace.bold(), state)?;
        writeln!(w, "  Command:  {}", self.command)?;
        writeln!(w, "  Plugin:   {}", self.plugin)?;
        if let Some(err) = &self.error {
            writeln!(w, "  Error:    {}", err.red())?;
        }
        writeln!(
            w,
            "  Actions:  {} applied, {} skipped",
            self.applied, self.skipped
        )?;
        writeln!(
            w,
            "  Hosts:    {} -> {} ({} persisted)",
            self.hosts_before, self.hosts_after, self.persisted
        )
    }
}
