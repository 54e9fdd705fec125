#![no_main]

use ironscope_plugins::{NessusPlugin, Plugin};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let plugin = NessusPlugin::new();
        if let Ok(actions) = plugin.parse(content) {
            // 파서가 만든 액션의 호스트 키는 항상 비어 있지 않음
            for action in &actions {
                assert!(!action.host_key().is_empty());
            }
        }
    }
});
