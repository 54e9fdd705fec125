//! `ironscope hosts` command handler

use std::io::Write;

use serde::Serialize;

use ironscope_core::types::{Host, Severity};

use crate::cli::HostsArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `hosts` command.
pub fn execute(args: HostsArgs, ctx: &Context, writer: &OutputWriter) -> Result<(), CliError> {
    writer.render(&list(ctx, &args.workspace)?)
}

pub(crate) fn list(ctx: &Context, workspace: &str) -> Result<HostList, CliError> {
    let mut hosts: Vec<HostEntry> = ctx
        .workspaces
        .load_hosts(workspace)?
        .iter()
        .map(HostEntry::from)
        .collect();
    hosts.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(HostList {
        workspace: workspace.to_owned(),
        total: hosts.len(),
        hosts,
    })
}

#[derive(Debug, Serialize)]
pub struct HostEntry {
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    pub services: usize,
    pub vulnerabilities: usize,
    /// Highest vulnerability severity, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_severity: Option<Severity>,
}

impl From<&Host> for HostEntry {
    fn from(host: &Host) -> Self {
        Self {
            key: host.key.as_str().to_owned(),
            name: host.name.clone(),
            os: host.os.clone(),
            services: host.services.len(),
            vulnerabilities: host.vulnerabilities.len(),
            max_severity: host.vulnerabilities.iter().map(|v| v.severity).max(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HostList {
    pub workspace: String,
    pub total: usize,
    pub hosts: Vec<HostEntry>,
}

impl Render for HostList {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Hosts in {} ({}):",
            self.workspace.bold(),
            self.total.to_string().bold()
        )?;
        if self.hosts.is_empty() {
            return writeln!(w, "  (none)");
        }

        writeln!(
            w,
            "  {:<24} {:<28} {:>5} {:>6} {:<9} OS",
            "Host", "Name", "Svcs", "Vulns", "Max"
        )?;
        writeln!(w, "  {}", "-".repeat(90))?;
        for h in &self.hosts {
            let severity = match h.max_severity {
                Some(s @ (Severity::Critical | Severity::High)) => pad(s).red(),
                Some(s @ Severity::Medium) => pad(s).yellow(),
                Some(s) => pad(s).normal(),
                None => format!("{:<9}", "-").normal(),
            };
            writeln!(
                w,
                "  {:<24} {:<28} {:>5} {:>6} {} {}",
                h.key,
                h.name,
                h.services,
                h.vulnerabilities,
                severity,
                h.os.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

fn pad(severity: Severity) -> String {
    format!("{:<9}", severity.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use ironscope_core::types::{HostKey, Vulnerability};
    use ironscope_persistence::Change;
    use tempfile::TempDir;

    use super::*;
    use crate::commands::test_support::context;
    use crate::commands::workspace;

    fn vuln(name: &str, severity: Severity) -> Vulnerability {
        Vulnerability {
            name: name.to_owned(),
            severity,
            description: String::new(),
            resolution: None,
            references: BTreeSet::new(),
            service: None,
        }
    }

    #[test]
    fn lists_persisted_hosts_sorted_by_key() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        workspace::create(&ctx, "acme", "", None).unwrap();

        let mut web = Host::new(HostKey::new("10.0.0.9"));
        web.vulnerabilities.push(vuln("weak tls", Severity::Medium));
        web.vulnerabilities.push(vuln("rce", Severity::Critical));
        let db = Host::new(HostKey::new("10.0.0.1"));

        let changes = ctx.workspaces.change_controller();
        changes.apply(Change::save("acme", &web).unwrap()).unwrap();
        changes.apply(Change::save("acme", &db).unwrap()).unwrap();

        let listing = list(&ctx, "acme").unwrap();
        assert_eq!(listing.total, 2);
        assert_eq!(listing.hosts[0].key, "10.0.0.1");
        assert_eq!(listing.hosts[0].max_severity, None);
        assert_eq!(listing.hosts[1].vulnerabilities, 2);
        assert_eq!(listing.hosts[1].max_severity, Some(Severity::Critical));
    }

    #[test]
    fn unknown_workspace_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        assert!(list(&ctx, "ghost").is_err());
    }

    #[test]
    fn empty_listing_renders_none() {
        colored::control::set_override(false);
        let listing = HostList {
            workspace: "acme".to_owned(),
            total: 0,
            hosts: Vec::new(),
        };
        let mut buf = Vec::new();
        listing.render_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Hosts in acme (0):"));
        assert!(text.contains("(none)"));
    }
}
