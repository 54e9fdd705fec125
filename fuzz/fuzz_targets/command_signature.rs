#![no_main]

use ironscope_plugins::command_signature;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|command: &str| {
    if let Some(signature) = command_signature(command) {
        assert!(!signature.is_empty());
        assert!(!signature.contains(char::is_whitespace));
        assert!(!signature.contains('/'));
        assert_eq!(signature, signature.to_lowercase());
    }
});
