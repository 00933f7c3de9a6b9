#![no_main]

use captive_relay::{FormFieldExtractor, LineOverflow, LineRingBuffer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split, page)) = data.split_first() else {
        return;
    };

    let mut lines = LineRingBuffer::new(4, 64, LineOverflow::Truncate);
    let mut extractor = FormFieldExtractor::new("action=\"http://portal.local/login\"");

    for chunk in page.chunks(usize::from(split).max(1)) {
        let flow = lines.feed(chunk, |line| extractor.process_line(line)).expect("truncating buffer");
        if flow.is_break() {
            assert!(extractor.is_done());
            break;
        }
    }

    assert!(lines.len() <= lines.capacity());
    if extractor.is_done() {
        assert!(extractor.form().to_urlencoded().is_some());
    }
});
