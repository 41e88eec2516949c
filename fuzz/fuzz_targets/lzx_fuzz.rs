#![no_main]
use libfuzzer_sys::fuzz_target;
use xnbkit::buffer::ByteBitBuffer;
use xnbkit::lzx::{self, LzxDecoder};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let frame = usize::from(u16::from_le_bytes([data[0], data[1]])) % 0x8000 + 1;
    let body = data[2..].to_vec();
    let len = body.len();

    let mut decoder = LzxDecoder::new(lzx::framer::WINDOW_BITS).unwrap();
    let mut buf = ByteBitBuffer::new(body.clone());
    for _ in 0..64 {
        if buf.remaining() == 0 || decoder.decompress(&mut buf, frame, len).is_err() {
            break;
        }
    }

    let mut buf = ByteBitBuffer::new(body);
    let _ = lzx::decompress(&mut buf, len, frame);
});
