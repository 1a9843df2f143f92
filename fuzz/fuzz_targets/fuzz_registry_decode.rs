#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding an arbitrary registry document must never panic, and whatever
    // decodes must hold the registry invariants and survive a re-encode.
    let Ok(registry) = antibot_store::codec::decode(data) else {
        return;
    };
    let encoded = antibot_store::codec::encode(&registry).expect("decoded registry encodes");
    let again = antibot_store::codec::decode(&encoded).expect("re-encoded registry decodes");
    assert_eq!(again, registry);
    assert!(registry.check_invariants().is_ok());
});
