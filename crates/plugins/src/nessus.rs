//! Nessus v2 리포트 플러그인
//!
//! [`NessusPlugin`]은 `.nessus` (NessusClientData_v2) XML 리포트를 파싱합니다.
//!
//! # 형식 예시
//!
//! ```xml
//! <NessusClientData_v2>
//!   <Report name="weekly">
//!     <ReportHost name="10.0.0.5">
//!       <HostProperties>
//!         <tag name="host-ip">10.0.0.5</tag>
//!         <tag name="operating-system">Linux Kernel 5.15</tag>
//!         <tag name="host-fqdn">web01.corp.local</tag>
//!       </HostProperties>
//!       <ReportItem port="443" svc_name="www" protocol="tcp" severity="2" pluginName="TLS Version 1.0 Protocol Detection">
//!         <description>...</description>
//!         <solution>...</solution>
//!         <cve>CVE-2011-3389</cve>
//!         <see_also>https://...</see_also>
//!       </ReportItem>
//!     </ReportHost>
//!   </Report>
//! </NessusClientData_v2>
//! ```
//!
//! 호스트 키는 `host-ip` 태그, 없으면 `ReportHost`의 `name` 속성입니다.
//! 포트가 0인 항목은 호스트 전체에 대한 취약점으로 기록합니다.

use std::collections::BTreeSet;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use ironscope_core::action::{HostDraft, ModelAction};
use ironscope_core::error::PluginError;
use ironscope_core::types::{HostKey, Protocol, Service, ServiceRef, Severity, Vulnerability};

use crate::plugin::{Plugin, PluginInfo, parse_failed};

const PLUGIN_ID: &str = "nessus";

/// Nessus v2 XML 리포트 파서
pub struct NessusPlugin {
    info: PluginInfo,
}

impl NessusPlugin {
    pub fn new() -> Self {
        Self {
            info: PluginInfo {
                id: PLUGIN_ID.to_owned(),
                name: "Nessus".to_owned(),
                version: "0.1.0".to_owned(),
                description: "Imports Nessus v2 (.nessus) XML reports".to_owned(),
                signature: "nessus".to_owned(),
            },
        }
    }
}

impl Default for NessusPlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// 텍스트를 모으는 중인 요소
enum Field {
    Tag(String),
    Description,
    Solution,
    Cve,
    SeeAlso,
}

#[derive(Default)]
struct HostBuilder {
    name: String,
    ip: Option<String>,
    os: Option<String>,
    fqdn: Option<String>,
    items: Vec<ItemBuilder>,
}

#[derive(Default)]
struct ItemBuilder {
    port: u16,
    protocol: String,
    svc_name: String,
    severity: u8,
    plugin_name: String,
    description: String,
    solution: String,
    references: BTreeSet<String>,
}

/// 파싱 문맥 (호출마다 새로 생성)
#[derive(Default)]
struct ParseState {
    host: Option<HostBuilder>,
    item: Option<ItemBuilder>,
    field: Option<Field>,
    text: String,
    actions: Vec<ModelAction>,
}

impl ParseState {
    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), PluginError> {
        match e.name().as_ref() {
            b"ReportHost" => {
                self.host = Some(HostBuilder {
                    name: attr(e, "name")?.unwrap_or_default(),
                    ..HostBuilder::default()
                });
            }
            b"tag" if self.host.is_some() => {
                self.field = attr(e, "name")?.map(Field::Tag);
            }
            b"ReportItem" if self.host.is_some() => {
                self.item = Some(ItemBuilder {
                    port: attr(e, "port")?
                        .and_then(|p| p.trim().parse().ok())
                        .unwrap_or(0),
                    protocol: attr(e, "protocol")?.unwrap_or_default(),
                    svc_name: attr(e, "svc_name")?.unwrap_or_default(),
                    severity: attr(e, "severity")?
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(0),
                    plugin_name: attr(e, "pluginName")?.unwrap_or_default(),
                    ..ItemBuilder::default()
                });
            }
            b"description" if self.item.is_some() => self.field = Some(Field::Description),
            b"solution" if self.item.is_some() => self.field = Some(Field::Solution),
            b"cve" if self.item.is_some() => self.field = Some(Field::Cve),
            b"see_also" if self.item.is_some() => self.field = Some(Field::SeeAlso),
            _ => return Ok(()),
        }
        self.text.clear();
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"tag" | b"description" | b"solution" | b"cve" | b"see_also" => self.finish_field(),
            b"ReportItem" => {
                if let (Some(item), Some(host)) = (self.item.take(), self.host.as_mut()) {
                    host.items.push(item);
                }
            }
            b"ReportHost" => {
                if let Some(host) = self.host.take() {
                    emit_host(host, &mut self.actions);
                }
            }
            _ => {}
        }
    }

    fn finish_field(&mut self) {
        let Some(field) = self.field.take() else {
            return;
        };
        let value = self.text.trim().to_owned();
        self.text.clear();
        if value.is_empty() {
            return;
        }

        match field {
            Field::Tag(tag) => {
                if let Some(host) = self.host.as_mut() {
                    match tag.as_str() {
                        "host-ip" => host.ip = Some(value),
                        "operating-system" => host.os = Some(value),
                        "host-fqdn" => host.fqdn = Some(value),
                        _ => {}
                    }
                }
            }
            Field::Description => {
                if let Some(item) = self.item.as_mut() {
                    item.description = value;
                }
            }
            Field::Solution => {
                if let Some(item) = self.item.as_mut() {
                    item.solution = value;
                }
            }
            Field::Cve | Field::SeeAlso => {
                if let Some(item) = self.item.as_mut() {
                    item.references
                        .extend(value.split_whitespace().map(str::to_owned));
                }
            }
        }
    }
}

impl Plugin for NessusPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn parse(&self, output: &str) -> Result<Vec<ModelAction>, PluginError> {
        let mut reader = Reader::from_str(output);
        reader.config_mut().trim_text(true);

        let mut state = ParseState::default();
        let mut depth = 0usize;
        let mut saw_element = false;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(parse_failed(
                        PLUGIN_ID,
                        format!("at byte {}: {e}", reader.buffer_position()),
                    ));
                }
            };

            match event {
                Event::Start(e) => {
                    depth += 1;
                    saw_element = true;
                    state.open(&e)?;
                }
                Event::Empty(e) => {
                    saw_element = true;
                    state.open(&e)?;
                    state.close(e.name().as_ref());
                }
                Event::Text(t) => {
                    if state.field.is_some() {
                        let text = t.unescape().map_err(|e| parse_failed(PLUGIN_ID, e))?;
                        state.text.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if state.field.is_some() {
                        state.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::End(e) => {
                    depth = depth.saturating_sub(1);
                    state.close(e.name().as_ref());
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_element {
            return Err(parse_failed(PLUGIN_ID, "no XML element found"));
        }
        if depth != 0 {
            return Err(parse_failed(PLUGIN_ID, "unexpected end of document"));
        }

        debug!(actions = state.actions.len(), "nessus report parsed");
        Ok(state.actions)
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, PluginError> {
    match e.try_get_attribute(name) {
        Ok(Some(a)) => a
            .unescape_value()
            .map(|v| Some(v.into_owned()))
            .map_err(|err| parse_failed(PLUGIN_ID, err)),
        Ok(None) => Ok(None),
        Err(err) => Err(parse_failed(PLUGIN_ID, err)),
    }
}

fn emit_host(host: HostBuilder, actions: &mut Vec<ModelAction>) {
    let address = host
        .ip
        .as_deref()
        .filter(|ip| !ip.trim().is_empty())
        .unwrap_or(&host.name);
    let key = HostKey::new(address);
    if key.is_empty() {
        debug!("skipping ReportHost without address");
        return;
    }

    let mut draft = HostDraft::new(key.clone());
    draft.name = host.name.trim().to_owned();
    draft.os = host.os;
    draft.hostnames.extend(host.fqdn);
    actions.push(ModelAction::AddHost(draft));

    for item in host.items {
        let location = match Protocol::from_str_loose(&item.protocol) {
            Some(protocol) if item.port != 0 => Some(ServiceRef {
                port: item.port,
                protocol,
            }),
            _ => None,
        };

        if let Some(loc) = location {
            actions.push(ModelAction::AddService {
                host: key.clone(),
                service: Service {
                    port: loc.port,
                    protocol: loc.protocol,
                    name: item.svc_name.trim_end_matches('?').to_owned(),
                    status: "open".to_owned(),
                    version: None,
                },
            });
        }

        if item.plugin_name.trim().is_empty() {
            continue;
        }
        actions.push(ModelAction::AddVulnerability {
            host: key.clone(),
            vulnerability: Vulnerability {
                name: item.plugin_name.trim().to_owned(),
                severity: Severity::from_level(item.severity),
                description: item.description,
                resolution: (!item.solution.is_empty()).then_some(item.solution),
                references: item.references,
                service: location,
            },
        });
    }
}
