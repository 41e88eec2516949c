#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that loads must convert and load again to the same content.
    if let Ok(loaded) = xnbkit::from_bytes(data.to_vec()) {
        if let Ok(bytes) = xnbkit::convert(&loaded) {
            let again = xnbkit::from_bytes(bytes).expect("converted container must load");
            assert_eq!(again.readers, loaded.readers);
        }
    }
});
