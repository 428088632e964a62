#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = zenheic::check_file_type(data);
    let _ = zenheic::probe(data);

    let mut src = Cursor::new(data);
    let _ = zenheic::is_heic(&mut src, zenheic::check_file_type);
    assert_eq!(src.position(), 0);
    let _ = zenheic::probe_stream(&mut src);
    assert_eq!(src.position(), 0);
});
