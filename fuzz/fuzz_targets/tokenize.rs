#![no_main]

use dotspace::parse::lexer::tokenize_bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(tokens) = tokenize_bytes(data) else {
        return;
    };
    let mut offset = 0;
    for token in &tokens {
        assert_eq!(token.span.start.offset, offset);
        offset = token.span.end.offset;
    }
    assert_eq!(offset, data.len());
});
