#![no_main]

use dotspace::correction::autocorrect;
use dotspace::cop::layout::space_around_method_call_operator::check_text;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let offenses = check_text(text);
    let corrected = autocorrect(text, &offenses).expect("detector produced an invalid plan");
    assert!(corrected.len() <= text.len());
    if offenses.is_empty() {
        assert_eq!(corrected, text);
    }
});
