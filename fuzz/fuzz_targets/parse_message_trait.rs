#![no_main]

use libfuzzer_sys::fuzz_target;
use msgsynth_core::config::GenerationConfig;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 64 * 1024 {
        &data[..64 * 1024]
    } else {
        data
    };

    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };

    let config = GenerationConfig::default();
    let Ok(interfaces) = msgsynth_core::rust::import_rust_source(src, &config) else {
        return;
    };
    if let Ok(types) = msgsynth_core::synth::synthesize_all(&interfaces, &config) {
        for t in &types {
            let _ = msgsynth_core::java_emit::emit_type(t);
        }
    }
});
