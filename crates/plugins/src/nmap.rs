//! Nmap grepable 출력 플러그인 (`nmap -oG`)
//!
//! # 형식 예시
//!
//! ```text
//! # Nmap 7.94 scan initiated Mon Mar  4 10:00:00 2024 as: nmap -sV -O -oG - 10.0.0.0/24
//! Host: 10.0.0.5 (web01.corp.local)	Status: Up
//! Host: 10.0.0.5 (web01.corp.local)	Ports: 22/open/tcp//ssh//OpenSSH 9.6/, 80/open/tcp//http//nginx 1.24/	Ignored State: closed (998)	OS: Linux 5.15
//! Host: 10.0.0.9 ()	Status: Down
//! # Nmap done at Mon Mar  4 10:00:42 2024 -- 256 IP addresses (2 hosts up) scanned in 42.00 seconds
//! ```
//!
//! 필드는 탭으로 구분됩니다. 열린 포트만 서비스로 기록하며, `Status: Down` 호스트는 건너뜁니다.
//! 형식에 맞지 않는 줄은 무시합니다.

use regex::Regex;
use tracing::debug;

use ironscope_core::action::{HostAttribute, HostDraft, ModelAction};
use ironscope_core::error::PluginError;
use ironscope_core::types::{HostKey, Protocol, Service};

use crate::plugin::{Plugin, PluginInfo, parse_failed};

const PLUGIN_ID: &str = "nmap";

/// Nmap grepable 출력 파서
pub struct NmapGrepablePlugin {
    info: PluginInfo,
    /// `Host: <addr> (<name>)<tab><fields>`
    host_line: Regex,
    /// `port/state/protocol/owner/service/rpc/version/`
    port_entry: Regex,
}

impl NmapGrepablePlugin {
    /// 정규식을 컴파일하여 플러그인을 생성합니다.
    pub fn new() -> Result<Self, PluginError> {
        let host_line = Regex::new(r"^Host:\s+(\S+)\s+\(([^)]*)\)\s*(.*)$")
            .map_err(|e| parse_failed(PLUGIN_ID, e))?;
        let port_entry = Regex::new(
            r"^(\d+)/([^/]*)/([^/]*)/([^/]*)/([^/]*)/([^/]*)/([^/]*)/?$",
        )
        .map_err(|e| parse_failed(PLUGIN_ID, e))?;

        Ok(Self {
            info: PluginInfo {
                id: PLUGIN_ID.to_owned(),
                name: "Nmap (grepable)".to_owned(),
                version: "0.1.0".to_owned(),
                description: "Imports nmap -oG grepable output".to_owned(),
                signature: "nmap".to_owned(),
            },
            host_line,
            port_entry,
        })
    }

    fn parse_ports(&self, key: &HostKey, ports: &str, actions: &mut Vec<ModelAction>) {
        for entry in ports.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some(caps) = self.port_entry.captures(entry) else {
                debug!(entry, "skipping unparsable port entry");
                continue;
            };
            if &caps[2] != "open" {
                continue;
            }
            let Ok(port) = caps[1].parse::<u16>() else {
                continue;
            };
            let Some(protocol) = Protocol::from_str_loose(&caps[3]) else {
                continue;
            };
            let version = caps[7].trim();

            actions.push(ModelAction::AddService {
                host: key.clone(),
                service: Service {
                    port,
                    protocol,
                    name: caps[5].trim_end_matches('?').to_owned(),
                    status: "open".to_owned(),
                    version: (!version.is_empty()).then(|| version.to_owned()),
                },
            });
        }
    }
}

impl Plugin for NmapGrepablePlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn parse(&self, output: &str) -> Result<Vec<ModelAction>, PluginError> {
        let mut actions = Vec::new();
        let mut down = std::collections::HashSet::new();

        for line in output.lines() {
            let Some(caps) = self.host_line.captures(line.trim_end()) else {
                continue;
            };
            let key = HostKey::new(&caps[1]);
            if key.is_empty() || down.contains(&key) {
                continue;
            }

            let fields: Vec<&str> = caps[3].split('\t').map(str::trim).collect();
            if fields
                .iter()
                .any(|f| f.strip_prefix("Status:").is_some_and(|s| s.trim() == "Down"))
            {
                debug!(host = %key, "skipping host reported down");
                down.insert(key);
                continue;
            }

            let hostname = caps[2].trim();
            let mut draft = HostDraft::new(key.clone());
            if !hostname.is_empty() {
                draft = draft.with_hostname(hostname);
            }
            actions.push(ModelAction::AddHost(draft));

            for field in fields {
                if let Some(ports) = field.strip_prefix("Ports:") {
                    self.parse_ports(&key, ports, &mut actions);
                } else if let Some(os) = field.strip_prefix("OS:") {
                    let os = os.trim();
                    if !os.is_empty() {
                        actions.push(ModelAction::UpdateHost {
                            host: key.clone(),
                            attribute: HostAttribute::Os(os.to_owned()),
                        });
                    }
                }
            }
        }

        debug!(actions = actions.len(), "nmap grepable output parsed");
        Ok(actions)
    }
}
