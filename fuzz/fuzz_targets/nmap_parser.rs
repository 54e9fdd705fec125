#![no_main]

use ironscope_plugins::{NmapGrepablePlugin, Plugin};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(plugin) = NmapGrepablePlugin::new() else {
        return;
    };
    // 텍스트 입력에서는 절대 실패하지 않음
    let actions = plugin.parse(content).expect("grepable parsing never fails");
    for action in &actions {
        assert!(action.validate().is_ok(), "{action}");
    }
});
