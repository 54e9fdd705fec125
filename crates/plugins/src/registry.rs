//! 플러그인 레지스트리: 명령 시그니처 기반 디스패치
//!
//! 등록 시점에 충돌을 검사하므로 실행 중 "나중 것이 이긴다" 같은 모호함이 없습니다.
//! 두 플러그인의 시그니처가 같거나 한쪽이 다른 쪽의 접두어이면 충돌입니다.

use std::sync::Arc;

use tracing::{debug, info};

use ironscope_core::error::PluginError;

use crate::nessus::NessusPlugin;
use crate::nmap::NmapGrepablePlugin;
use crate::plugin::Plugin;

/// 플러그인 레지스트리
///
/// 등록 순서가 보존되며, 디스패치는 첫 번째 일치 항목을 사용합니다.
///
/// # 사용 예시
/// ```ignore
/// let mut registry = PluginRegistry::new();
/// registry.register(Arc::new(NessusPlugin::new()))?;
///
/// let plugin = registry.find_by_signature("nessus");
/// ```
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// 내장 플러그인을 등록한 레지스트리를 생성합니다.
    ///
    /// `disabled`에 포함된 ID는 등록하지 않습니다.
    pub fn with_builtin(disabled: &[String]) -> Result<Self, PluginError> {
        let builtin: Vec<Arc<dyn Plugin>> = vec![
            Arc::new(NessusPlugin::new()),
            Arc::new(NmapGrepablePlugin::new()?),
        ];

        let mut registry = Self::new();
        for plugin in builtin {
            if disabled.iter().any(|id| *id == plugin.info().id) {
                debug!(plugin = %plugin.info().id, "plugin disabled by configuration");
                continue;
            }
            registry.register(plugin)?;
        }
        Ok(registry)
    }

    /// 플러그인을 등록합니다.
    ///
    /// 같은 ID가 있으면 [`PluginError::AlreadyRegistered`],
    /// 시그니처가 겹치면 [`PluginError::SignatureConflict`]입니다.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        let info = plugin.info();
        if self.plugins.iter().any(|p| p.info().id == info.id) {
            return Err(PluginError::AlreadyRegistered {
                id: info.id.clone(),
            });
        }
        if let Some(existing) = self
            .plugins
            .iter()
            .find(|p| signatures_overlap(&p.info().signature, &info.signature))
        {
            return Err(PluginError::SignatureConflict {
                signature: info.signature.clone(),
                existing: existing.info().id.clone(),
            });
        }

        info!(plugin = %info.id, signature = %info.signature, "plugin registered");
        self.plugins.push(plugin);
        Ok(())
    }

    /// 플러그인을 해제하고 소유권을 반환합니다.
    pub fn unregister(&mut self, id: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        match self.plugins.iter().position(|p| p.info().id == id) {
            Some(idx) => Ok(self.plugins.remove(idx)),
            None => Err(PluginError::NotFound { id: id.to_owned() }),
        }
    }

    /// ID로 플러그인을 조회합니다.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.info().id == id).cloned()
    }

    /// 명령 시그니처에 맞는 플러그인을 찾습니다.
    ///
    /// 정확히 일치하거나 명령 시그니처가 플러그인 시그니처로 시작하면 일치입니다.
    pub fn find_by_signature(&self, signature: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|p| signature.starts_with(p.info().signature.as_str()))
            .cloned()
    }

    /// 등록된 플러그인 ID 목록 (등록 순서)
    pub fn ids(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.info().id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn signatures_overlap(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}
