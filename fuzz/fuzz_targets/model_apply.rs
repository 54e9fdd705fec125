#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ironscope_core::action::{HostAttribute, HostDraft, ModelAction};
use ironscope_core::types::{BackendType, HostKey, Protocol, Service, Workspace};
use ironscope_model::{ModelContainer, ModelController};

/// 퍼저용 구조적 입력 (호스트 키 공간을 좁혀 병합 경로를 자주 타게 함)
#[derive(Arbitrary, Debug)]
enum FuzzAction {
    AddHost { host: u8, os: Option<String> },
    AddService { host: u8, port: u16, udp: bool, name: String },
    UpdateOs { host: u8, os: String },
}

impl FuzzAction {
    fn into_action(self) -> ModelAction {
        let key = |h: u8| HostKey::new(&format!("10.0.0.{}", h % 16));
        match self {
            Self::AddHost { host, os } => {
                let mut draft = HostDraft::new(key(host));
                draft.os = os;
                ModelAction::AddHost(draft)
            }
            Self::AddService {
                host,
                port,
                udp,
                name,
            } => ModelAction::AddService {
                host: key(host),
                service: Service {
                    port,
                    protocol: if udp { Protocol::Udp } else { Protocol::Tcp },
                    name,
                    status: "open".to_owned(),
                    version: None,
                },
            },
            Self::UpdateOs { host, os } => ModelAction::UpdateHost {
                host: key(host),
                attribute: HostAttribute::Os(os),
            },
        }
    }
}

fuzz_target!(|input: Vec<FuzzAction>| {
    let controller = ModelController::new();
    controller.set_workspace(
        Workspace::new("fuzz", "", BackendType::Fs),
        ModelContainer::new(),
    );

    let total = input.len();
    let actions: Vec<ModelAction> = input.into_iter().map(FuzzAction::into_action).collect();
    controller.enqueue_all(actions).expect("workspace is bound");

    let summary = controller.process_all_pending_actions();
    assert_eq!(summary.applied + summary.skipped, total);
    assert_eq!(controller.pending_count(), 0);
    assert!(controller.host_count() <= 16);
});
