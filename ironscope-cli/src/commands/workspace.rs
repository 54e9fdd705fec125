//! `ironscope workspace` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use ironscope_core::error::WorkspaceError;
use ironscope_core::types::{BackendType, Workspace};
use ironscope_plugins::Invocation;

use crate::cli::{WorkspaceAction, WorkspaceArgs};
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, unix_seconds};

/// Execute the `workspace` command.
pub fn execute(args: WorkspaceArgs, ctx: &Context, writer: &OutputWriter) -> Result<(), CliError> {
    match args.action {
        WorkspaceAction::Create {
            name,
            description,
            backend,
        } => writer.render(&create(ctx, &name, &description, backend.as_deref())?),
        WorkspaceAction::List => writer.render(&list(ctx)?),
        WorkspaceAction::Show { name } => writer.render(&show(ctx, &name)?),
        WorkspaceAction::Remove { name } => writer.render(&remove(ctx, &name)?),
    }
}

fn parse_backend(ctx: &Context, backend: Option<&str>) -> Result<BackendType, CliError> {
    match backend {
        None => Ok(ctx.config.persistence.default_backend()),
        Some(raw) => BackendType::from_str_loose(raw).ok_or_else(|| {
            CliError::Command(format!("unknown backend '{raw}' (expected: fs, docstore)"))
        }),
    }
}

pub(crate) fn create(
    ctx: &Context,
    name: &str,
    description: &str,
    backend: Option<&str>,
) -> Result<WorkspaceEntry, CliError> {
    let backend = parse_backend(ctx, backend)?;
    let workspace = ctx
        .workspaces
        .create_workspace(name, description, backend)?;
    info!(workspace = name, %backend, "workspace created");
    Ok(WorkspaceEntry::from(&workspace))
}

pub(crate) fn list(ctx: &Context) -> Result<WorkspaceList, CliError> {
    let mut workspaces = Vec::new();
    for name in ctx.workspaces.workspace_names() {
        if let Some(workspace) = ctx.workspaces.open_workspace(&name)? {
            workspaces.push(WorkspaceEntry::from(&workspace));
        }
    }
    let unavailable = ctx
        .workspaces
        .db_manager()
        .unavailable_backends()
        .into_iter()
        .map(|(backend, reason)| format!("{backend}: {reason}"))
        .collect();
    Ok(WorkspaceList {
        total: workspaces.len(),
        workspaces,
        unavailable,
    })
}

pub(crate) fn show(ctx: &Context, name: &str) -> Result<WorkspaceDetail, CliError> {
    let workspace = ctx
        .workspaces
        .open_workspace(name)?
        .ok_or_else(|| WorkspaceError::NotFound {
            name: name.to_owned(),
        })?;
    let hosts = ctx.workspaces.load_hosts(name)?;
    let commands = ctx
        .workspaces
        .mapper()
        .load_all::<Invocation>(name)
        .map_err(|e| CliError::Core(e.into()))?;

    Ok(WorkspaceDetail {
        workspace: WorkspaceEntry::from(&workspace),
        hosts: hosts.len(),
        services: hosts.iter().map(|h| h.services.len()).sum(),
        vulnerabilities: hosts.iter().map(|h| h.vulnerabilities.len()).sum(),
        commands: commands.len(),
    })
}

pub(crate) fn remove(ctx: &Context, name: &str) -> Result<RemoveReport, CliError> {
    let existed = ctx.workspaces.workspace_type(name).is_some();
    ctx.workspaces.remove_workspace(name)?;
    Ok(RemoveReport {
        name: name.to_owned(),
        existed,
    })
}

// ─── payloads ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct WorkspaceEntry {
    pub name: String,
    pub backend: BackendType,
    pub description: String,
    /// Unix seconds.
    pub created_at: u64,
}

impl From<&Workspace> for WorkspaceEntry {
    fn from(ws: &Workspace) -> Self {
        Self {
            name: ws.name.clone(),
            backend: ws.backend,
            description: ws.description.clone(),
            created_at: unix_seconds(ws.created_at),
        }
    }
}

impl Render for WorkspaceEntry {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;
        writeln!(w, "Workspace {} [{}]", self.name.bold(), self.backend)?;
        if !self.description.is_empty() {
            writeln!(w, "  {}", self.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct WorkspaceList {
    pub total: usize,
    pub workspaces: Vec<WorkspaceEntry>,
    /// Backends that could not be opened, with the reason.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<String>,
}

impl Render for WorkspaceList {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Workspaces ({}):", self.total.to_string().bold())?;
        if self.workspaces.is_empty() {
            writeln!(w, "  (none)")?;
        } else {
            writeln!(w, "  {:<32} {:<10} Description", "Name", "Backend")?;
            writeln!(w, "  {}", "-".repeat(60))?;
            for ws in &self.workspaces {
                writeln!(
                    w,
                    "  {:<32} {:<10} {}",
                    ws.name,
                    ws.backend.to_string(),
                    ws.description
                )?;
            }
        }
        for reason in &self.unavailable {
            writeln!(w, "  {} {}", "unavailable:".yellow(), reason)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct WorkspaceDetail {
    #[serde(flatten)]
    pub workspace: WorkspaceEntry,
    pub hosts: usize,
    pub services: usize,
    pub vulnerabilities: usize,
    pub commands: usize,
}

impl Render for WorkspaceDetail {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.workspace.render_text(w)?;
        writeln!(w, "  Hosts:           {}", self.hosts)?;
        writeln!(w, "  Services:        {}", self.services)?;
        writeln!(w, "  Vulnerabilities: {}", self.vulnerabilities)?;
        writeln!(w, "  Commands:        {}", self.commands)
    }
}

#[derive(Debug, Serialize)]
pub struct RemoveReport {
    pub name: String,
    /// `false` when the name was unknown (removal is still successful).
    pub existed: bool,
}

impl Render for RemoveReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;
        if self.existed {
            writeln!(w, "{} workspace {} removed", "✓".green(), self.name.bold())
        } else {
            writeln!(w, "workspace {} did not exist, nothing removed", self.name)
        }
    }
}
