#![no_main]

use libfuzzer_sys::fuzz_target;
use msgsynth_core::config::GenerationConfig;
use msgsynth_core::model::DescriptorDocument;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 64 * 1024 {
        &data[..64 * 1024]
    } else {
        data
    };

    let Ok(doc) = DescriptorDocument::from_json(data) else {
        return;
    };

    let config = GenerationConfig::default();
    if let Ok(types) = msgsynth_core::synth::synthesize_all(&doc.interfaces, &config) {
        for t in &types {
            let _ = msgsynth_core::json_emit::emit_type(t);
        }
    }
});
