//! 모델 컨테이너: 한 워크스페이스의 호스트 그래프
//!
//! 호스트는 키로 유일하며, 같은 키에 대한 추가는 중복이 아닌 병합으로 처리합니다.

use std::collections::BTreeMap;

use ironscope_core::action::{HostAttribute, HostDraft, ModelAction};
use ironscope_core::types::{Host, HostKey, Service, Vulnerability};

/// 인메모리 호스트 모델
#[derive(Debug, Clone, Default)]
pub struct ModelContainer {
    hosts: BTreeMap<HostKey, Host>,
}

impl ModelContainer {
    /// 빈 컨테이너
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 호스트로 컨테이너를 구성합니다.
    pub fn from_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        Self {
            hosts: hosts.into_iter().map(|h| (h.key.clone(), h)).collect(),
        }
    }

    pub fn host(&self, key: &HostKey) -> Option<&Host> {
        self.hosts.get(key)
    }

    /// 키 순서로 정렬된 호스트
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// 검증된 액션을 적용하고 변경된 호스트 키를 반환합니다.
    ///
    /// 대상 호스트가 없으면 생성합니다.
    pub fn apply(&mut self, action: &ModelAction) -> HostKey {
        let key = action.host_key().clone();
        let host = self
            .hosts
            .entry(key.clone())
            .or_insert_with(|| Host::new(key.clone()));

        match action {
            ModelAction::AddHost(draft) => merge_draft(host, draft),
            ModelAction::AddService { service, .. } => merge_service(host, service),
            ModelAction::AddVulnerability { vulnerability, .. } => {
                merge_vulnerability(host, vulnerability)
            }
            ModelAction::UpdateHost { attribute, .. } => match attribute {
                HostAttribute::Name(name) => host.name = name.trim().to_owned(),
                HostAttribute::Os(os) => host.os = Some(os.trim().to_owned()),
                HostAttribute::Hostname(hostname) => {
                    host.hostnames.insert(hostname.trim().to_owned());
                }
            },
        }
        key
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn merge_draft(host: &mut Host, draft: &HostDraft) {
    if let Some(name) = non_empty(&draft.name) {
        host.name = name.to_owned();
    }
    if let Some(os) = draft.os.as_deref().and_then(non_empty) {
        host.os = Some(os.to_owned());
    }
    host.hostnames.extend(
        draft
            .hostnames
            .iter()
            .filter_map(|h| non_empty(h))
            .map(str::to_owned),
    );
}

fn merge_service(host: &mut Host, incoming: &Service) {
    let location = incoming.location();
    let Some(existing) = host.services.iter_mut().find(|s| s.location() == location) else {
        host.services.push(incoming.clone());
        return;
    };

    if let Some(name) = non_empty(&incoming.name) {
        existing.name = name.to_owned();
    }
    if let Some(status) = non_empty(&incoming.status) {
        existing.status = status.to_owned();
    }
    if let Some(version) = incoming.version.as_deref().and_then(non_empty) {
        existing.version = Some(version.to_owned());
    }
}

fn merge_vulnerability(host: &mut Host, incoming: &Vulnerability) {
    let Some(existing) = host
        .vulnerabilities
        .iter_mut()
        .find(|v| v.name == incoming.name && v.service == incoming.service)
    else {
        host.vulnerabilities.push(incoming.clone());
        return;
    };

    existing.severity = existing.severity.max(incoming.severity);
    if non_empty(&incoming.description).is_some() {
        existing.description = incoming.description.clone();
    }
    if let Some(resolution) = incoming.resolution.as_deref().and_then(non_empty) {
        existing.resolution = Some(resolution.to_owned());
    }
    existing
        .references
        .extend(incoming.references.iter().cloned());
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use ironscope_core::types::{Protocol, ServiceRef, Severity};

    fn service(port: u16, name: &str, version: Option<&str>) -> Service {
        Service {
            port,
            protocol: Protocol::Tcp,
            name: name.to_owned(),
            status: "open".to_owned(),
            version: version.map(str::to_owned),
        }
    }

    fn vuln(name: &str, severity: Severity, refs: &[&str]) -> Vulnerability {
        Vulnerability {
            name: name.to_owned(),
            severity,
            description: String::new(),
            resolution: None,
            references: refs.iter().map(|r| (*r).to_owned()).collect::<BTreeSet<_>>(),
            service: Some(ServiceRef {
                port: 443,
                protocol: Protocol::Tcp,
            }),
        }
    }

    #[test]
    fn duplicate_add_host_merges() {
        let mut model = ModelContainer::new();
        model.apply(&ModelAction::AddHost(
            HostDraft::new("10.0.0.1")
                .with_os("Linux")
                .with_hostname("web01"),
        ));
        model.apply(&ModelAction::AddHost(
            HostDraft::new("10.0.0.1").with_hostname("web01.corp"),
        ));

        assert_eq!(model.len(), 1);
        let host = model.host(&HostKey::new("10.0.0.1")).unwrap();
        assert_eq!(host.os.as_deref(), Some("Linux"));
        assert_eq!(host.hostnames.len(), 2);
        assert_eq!(host.name, "10.0.0.1");
    }

    #[test]
    fn empty_os_does_not_clear_existing() {
        let mut model = ModelContainer::new();
        model.apply(&ModelAction::AddHost(
            HostDraft::new("10.0.0.1").with_os("Windows"),
        ));
        model.apply(&ModelAction::AddHost(HostDraft::new("10.0.0.1").with_os(" ")));
        let host = model.host(&HostKey::new("10.0.0.1")).unwrap();
        assert_eq!(host.os.as_deref(), Some("Windows"));
    }

    #[test]
    fn services_merge_by_location() {
        let mut model = ModelContainer::new();
        let key = HostKey::new("10.0.0.1");
        model.apply(&ModelAction::AddService {
            host: key.clone(),
            service: service(22, "ssh", None),
        });
        model.apply(&ModelAction::AddService {
            host: key.clone(),
            service: service(22, "", Some("OpenSSH 9.6")),
        });
        model.apply(&ModelAction::AddService {
            host: key.clone(),
            service: service(80, "http", None),
        });

        let host = model.host(&key).unwrap();
        assert_eq!(host.services.len(), 2);
        let ssh = host
            .service(ServiceRef {
                port: 22,
                protocol: Protocol::Tcp,
            })
            .unwrap();
        assert_eq!(ssh.name, "ssh");
        assert_eq!(ssh.version.as_deref(), Some("OpenSSH 9.6"));
    }

    #[test]
    fn vulnerabilities_keep_max_severity_and_union_references() {
        let mut model = ModelContainer::new();
        let key = HostKey::new("10.0.0.1");
        model.apply(&ModelAction::AddVulnerability {
            host: key.clone(),
            vulnerability: vuln("TLS 1.0 enabled", Severity::High, &["CVE-2011-3389"]),
        });
        model.apply(&ModelAction::AddVulnerability {
            host: key.clone(),
            vulnerability: vuln("TLS 1.0 enabled", Severity::Medium, &["https://example.test"]),
        });

        let host = model.host(&key).unwrap();
        assert_eq!(host.vulnerabilities.len(), 1);
        let v = &host.vulnerabilities[0];
        assert_eq!(v.severity, Severity::High);
        assert_eq!(v.references.len(), 2);
    }

    #[test]
    fn action_on_unknown_host_creates_it() {
        let mut model = ModelContainer::new();
        let key = model.apply(&ModelAction::UpdateHost {
            host: HostKey::new("db01"),
            attribute: HostAttribute::Os("FreeBSD".to_owned()),
        });
        assert_eq!(key.as_str(), "db01");
        assert_eq!(
            model.host(&key).unwrap().os.as_deref(),
            Some("FreeBSD")
        );
    }

    #[test]
    fn from_hosts_keys_by_host_key() {
        let model = ModelContainer::from_hosts(vec![
            Host::new(HostKey::new("b")),
            Host::new(HostKey::new("a")),
        ]);
        let keys: Vec<&str> = model.hosts().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
