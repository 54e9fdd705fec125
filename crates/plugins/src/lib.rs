//! # ironscope-plugins
//!
//! 스캐너 출력 플러그인과 플러그인 컨트롤러.
//!
//! - [`plugin`]: 플러그인 계약 ([`Plugin`], [`PluginInfo`])과 명령 시그니처 추출
//! - [`registry`]: 시그니처 기반 디스패치와 등록 시점 충돌 검사
//! - [`controller`]: 명령 시작/완료를 받아 모델 컨트롤러 큐로 전달
//! - [`invocation`]: 호출 상태 추적과 명령 기록 문서
//! - [`nessus`], [`nmap`]: 내장 플러그인

pub mod controller;
pub mod invocation;
pub mod nessus;
pub mod nmap;
pub mod plugin;
pub mod registry;

pub use controller::PluginController;
pub use invocation::{Invocation, InvocationState};
pub use nessus::NessusPlugin;
pub use nmap::NmapGrepablePlugin;
pub use plugin::{Plugin, PluginInfo, command_signature};
pub use registry::PluginRegistry;
