#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Neither the parser nor the validator may panic on any input.
        if let Ok(program) = sympath_lang::parse(s, "fuzz.py") {
            let _ = sympath_engine::validate::validate_program(&program, "main");
        }
    }
});
