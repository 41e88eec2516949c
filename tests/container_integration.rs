mod common;

use common::{
    BitWriter, chunk, container, content, int32_container, match_element, uncompressed_frame,
};
use xnbkit::container::{Compression, Platform};
use xnbkit::lzx::{self, LzxDecoder};
use xnbkit::reader::Value;
use xnbkit::{XnbError, convert, from_bytes};

const ARRAY_OF_INT32: &str = "Microsoft.Xna.Framework.Content.ArrayReader`1[[System.Int32, mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089]]";
const DICT_OF_STRINGS: &str = "Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089],[System.String, mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089]]";
const STRING_READER: &str = "Microsoft.Xna.Framework.Content.StringReader";

// ---------------------------------------------------------------------------
// Uncompressed containers
// ---------------------------------------------------------------------------

#[test]
fn minimal_int32_container() {
    let loaded = from_bytes(int32_container(42)).unwrap();
    assert_eq!(loaded.header.platform, Platform::Windows);
    assert_eq!(loaded.header.format_version, 5);
    assert!(!loaded.header.hidef());
    assert_eq!(loaded.header.compression(), Compression::None);
    assert_eq!(loaded.readers.len(), 1);
    assert_eq!(loaded.readers[0].type_name, "System.Int32");
    assert_eq!(loaded.content, Value::Int32(42));
}

#[test]
fn truncated_container_fails_before_content() {
    let mut data = int32_container(42);
    data.pop();
    let actual = data.len() as u64;
    match from_bytes(data) {
        Err(XnbError::TruncatedFile { declared, actual: a }) => {
            assert_eq!(declared, actual + 1);
            assert_eq!(a, actual);
        }
        other => panic!("expected TruncatedFile, got {other:?}"),
    }
}

#[test]
fn reader_index_past_the_table() {
    let mut root = vec![2];
    root.extend_from_slice(&42i32.to_le_bytes());
    let data = container(b'w', 0, None, &content(&["System.Int32"], &root));
    assert!(matches!(
        from_bytes(data),
        Err(XnbError::InvalidReaderIndex { index: 2, count: 1 })
    ));
}

#[test]
fn array_of_int32_root() {
    let mut root = vec![1, 3, 0, 0, 0];
    for v in [7i32, -1, 1 << 20] {
        root.extend_from_slice(&v.to_le_bytes());
    }
    let data = container(b'w', 0, None, &content(&[ARRAY_OF_INT32], &root));
    let loaded = from_bytes(data).unwrap();
    assert_eq!(
        loaded.content,
        Value::List(vec![7.into(), (-1).into(), (1 << 20).into()])
    );
}

#[test]
fn dictionary_of_strings_round_trips_byte_for_byte() {
    let mut root = vec![1, 2, 0, 0, 0];
    for s in ["Parsnip", "A spring tuber.", "Bean", "Grows on a trellis."] {
        root.push(2);
        common::string(s, &mut root);
    }
    let data = container(b'w', 0, None, &content(&[DICT_OF_STRINGS, STRING_READER], &root));
    let loaded = from_bytes(data.clone()).unwrap();
    assert_eq!(
        loaded.content,
        Value::Map(vec![
            ("Parsnip".into(), "A spring tuber.".into()),
            ("Bean".into(), "Grows on a trellis.".into()),
        ])
    );
    assert_eq!(convert(&loaded).unwrap(), data);
}

#[test]
fn bad_magic_is_rejected() {
    let mut data = int32_container(1);
    data[..3].copy_from_slice(b"XNA");
    assert!(matches!(from_bytes(data), Err(XnbError::InvalidMagic(_))));
}

#[test]
fn unknown_platform_still_decodes() {
    let mut root = vec![1];
    root.extend_from_slice(&5i32.to_le_bytes());
    let data = container(b'q', 0, None, &content(&["System.Int32"], &root));
    let loaded = from_bytes(data).unwrap();
    assert_eq!(loaded.header.platform, Platform::Unknown(b'q'));
    assert_eq!(loaded.content, Value::Int32(5));
}

#[test]
fn unknown_reader_type() {
    let data = container(b'w', 0, None, &content(&["Game.Things.WidgetReader"], &[1]));
    assert!(matches!(from_bytes(data), Err(XnbError::UnknownType(_))));
}

#[test]
fn deeply_nested_reader_name_is_rejected() {
    let name = format!("System.Int32{}", "[]".repeat(20_000));
    let data = container(b'w', 0, None, &content(&[&name], &[1, 0, 0, 0, 0]));
    assert!(matches!(from_bytes(data), Err(XnbError::UnknownType(_))));
}

#[test]
fn shared_resources_are_unsupported() {
    let mut payload = content(&["System.Int32"], &[1, 0, 0, 0, 0]);
    // The shared count sits right before the root.
    let at = payload.len() - 6;
    payload[at] = 3;
    let data = container(b'w', 0, None, &payload);
    assert!(matches!(
        from_bytes(data),
        Err(XnbError::UnsupportedFeature(_))
    ));
}

// ---------------------------------------------------------------------------
// LZX
// ---------------------------------------------------------------------------

fn lzx_int32_container(value: i32) -> (Vec<u8>, usize) {
    let mut root = vec![1];
    root.extend_from_slice(&value.to_le_bytes());
    let inner = content(&["System.Int32"], &root);
    let block = uncompressed_frame(&inner);
    let payload = chunk(inner.len() as u16, &block);
    (
        container(b'x', 0x80, Some(inner.len() as u32), &payload),
        inner.len(),
    )
}

#[test]
fn lzx_container_with_uncompressed_block() {
    let (data, _) = lzx_int32_container(1234);
    let loaded = from_bytes(data).unwrap();
    assert_eq!(loaded.header.compression(), Compression::Lzx);
    assert_eq!(loaded.content, Value::Int32(1234));
}

#[test]
fn lzx_wins_when_both_bits_are_set() {
    let (mut data, _) = lzx_int32_container(9);
    data[5] = 0xC1;
    let loaded = from_bytes(data).unwrap();
    assert_eq!(loaded.header.compression(), Compression::Lzx);
    assert!(loaded.header.hidef());
    assert_eq!(loaded.content, Value::Int32(9));
}

#[test]
fn lzx_declared_size_mismatch_is_corrupt() {
    let (mut data, inner_len) = lzx_int32_container(9);
    data[10..14].copy_from_slice(&(inner_len as u32 + 1).to_le_bytes());
    assert!(matches!(
        from_bytes(data),
        Err(XnbError::CorruptStream(_) | XnbError::TruncatedStream { .. })
    ));
}

#[test]
fn lzx_converted_back_uncompressed() {
    let (data, _) = lzx_int32_container(77);
    let loaded = from_bytes(data).unwrap();
    let packed = convert(&loaded).unwrap();
    assert_eq!(packed[5], 0);
    assert_eq!(from_bytes(packed).unwrap().content, Value::Int32(77));
}

#[test]
fn framer_returns_raw_payload() {
    let payload: Vec<u8> = (0..=200u8).collect();
    let data = chunk(payload.len() as u16, &uncompressed_frame(&payload));
    let len = data.len();
    let mut buf = xnbkit::buffer::ByteBitBuffer::new(data);
    assert_eq!(lzx::decompress(&mut buf, len, payload.len()).unwrap(), payload);
}

#[test]
fn verbatim_block_with_matches() {
    let mut w = BitWriter::new();
    w.no_transform().block_header(1, 14).uniform_trees();
    w.literals(b"abc");
    // Slot 4, one verbatim bit = 1: offset 3, length 6.
    w.element(match_element(4, 6)).put(1, 1);
    // Slot 0 reuses R0 = 3.
    w.element(match_element(0, 3));
    // Slot 1 swaps in R1 = 1.
    w.element(match_element(1, 2));
    let data = w.finish();
    let len = data.len();

    let mut buf = xnbkit::buffer::ByteBitBuffer::new(data);
    let mut lzx = LzxDecoder::new(16).unwrap();
    let out = lzx.decompress(&mut buf, 14, len).unwrap().to_vec();
    assert_eq!(out, b"abcabcabcabccc");
    assert_eq!(lzx.repeated_offsets(), [1, 3, 1]);
}

#[test]
fn aligned_block_offsets() {
    let literals: Vec<u8> = (0..32u8).map(|i| b'A' + i).collect();
    let mut w = BitWriter::new();
    w.no_transform()
        .block_header(2, 42)
        .uniform_aligned_tree()
        .uniform_trees();
    w.literals(&literals);
    // Slot 8 has 3 extra bits, all from the aligned tree: 14 + 2 = 16.
    w.element(match_element(8, 8)).put(2, 3);
    // Slot 10 has 4 extra bits: one verbatim bit, then an aligned symbol:
    // 30 + (0 << 3) + 2 = 32.
    w.element(match_element(10, 2)).put(0, 1).put(2, 3);
    let data = w.finish();
    let len = data.len();

    let mut expected = literals.clone();
    expected.extend_from_slice(&literals[16..24]);
    expected.extend_from_slice(&literals[8..10]);

    let mut buf = xnbkit::buffer::ByteBitBuffer::new(data);
    let mut lzx = LzxDecoder::new(16).unwrap();
    let out = lzx.decompress(&mut buf, 42, len).unwrap().to_vec();
    assert_eq!(out, expected);
    assert_eq!(lzx.repeated_offsets(), [32, 16, 1]);
}

#[test]
fn match_overshoot_carries_into_the_next_frame() {
    let mut w = BitWriter::new();
    w.no_transform().block_header(1, 8).uniform_trees();
    w.literals(b"ab");
    // Slot 4, verbatim bit 0: offset 2, length 6.
    w.element(match_element(4, 6)).put(0, 1);
    let data = w.finish();
    let len = data.len();

    let mut buf = xnbkit::buffer::ByteBitBuffer::new(data);
    let mut lzx = LzxDecoder::new(16).unwrap();
    let first = lzx.decompress(&mut buf, 4, len).unwrap().to_vec();
    assert_eq!(first, b"abab");
    let second = lzx.decompress(&mut buf, 4, 0).unwrap().to_vec();
    assert_eq!(second, b"abab");
}

#[test]
fn empty_length_tree_cannot_decode_long_matches() {
    let mut w = BitWriter::new();
    w.no_transform().block_header(1, 12).uniform_trees();
    w.literals(b"ab");
    // Length header 7 needs the (empty) length tree.
    w.element(256 + (4 << 3) + 7).put(0, 1);
    let data = w.finish();
    let len = data.len();

    let mut buf = xnbkit::buffer::ByteBitBuffer::new(data);
    let mut lzx = LzxDecoder::new(16).unwrap();
    assert!(matches!(
        lzx.decompress(&mut buf, 12, len),
        Err(XnbError::CorruptHuffmanTable(_))
    ));
}

#[test]
fn second_block_recodes_lengths_against_the_first() {
    let mut w = BitWriter::new();
    w.no_transform().block_header(1, 4).uniform_trees();
    w.literals(b"abcd");

    // Block 2 main tree: literals 0..128 at 8 bits, 128..256 unused, every
    // match element still at 9 bits.
    w.block_header(1, 7).pretree();
    for _ in 0..32 {
        // Run of four, each (9 - 1) mod 17 = 8.
        w.pretree_symbol(19).put(0, 1).pretree_symbol(1);
    }
    for zeros in [51u32, 51, 26] {
        w.pretree_symbol(18).put(zeros - 20, 5);
    }
    w.pretree();
    for _ in 0..256 {
        w.pretree_symbol(0);
    }
    // Length tree stays empty.
    w.pretree();
    for zeros in [51u32, 51, 51, 51, 26] {
        w.pretree_symbol(18).put(zeros - 20, 5);
    }
    w.pretree_symbol(17).put(19 - 4, 4);

    w.put(u32::from(b'x'), 8).put(u32::from(b'y'), 8);
    // Slot 4, verbatim bit 1: offset 3, length 5.
    w.element(match_element(4, 5)).put(1, 1);
    let data = w.finish();
    let len = data.len();

    let mut buf = xnbkit::buffer::ByteBitBuffer::new(data);
    let mut lzx = LzxDecoder::new(16).unwrap();
    let out = lzx.decompress(&mut buf, 11, len).unwrap().to_vec();
    assert_eq!(out, b"abcdxydxydx");
    assert_eq!(lzx.repeated_offsets(), [3, 1, 1]);
}

// ---------------------------------------------------------------------------
// LZ4
// ---------------------------------------------------------------------------

#[cfg(feature = "lz4")]
#[test]
fn lz4_container() {
    let mut root = vec![1];
    root.extend_from_slice(&(-5i32).to_le_bytes());
    let inner = content(&["System.Int32"], &root);
    let compressed = lz4_flex::block::compress(&inner);
    let data = container(b'a', 0x40, Some(inner.len() as u32), &compressed);

    let loaded = from_bytes(data).unwrap();
    assert_eq!(loaded.header.platform, Platform::Android);
    assert_eq!(loaded.header.compression(), Compression::Lz4);
    assert_eq!(loaded.content, Value::Int32(-5));

    let repacked = convert(&loaded).unwrap();
    assert_eq!(repacked[5], 0x40);
    assert_eq!(from_bytes(repacked).unwrap().content, Value::Int32(-5));
}

#[test]
fn load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("value.xnb");
    std::fs::write(&path, int32_container(31)).unwrap();
    assert_eq!(xnbkit::load(&path).unwrap().content, Value::Int32(31));
    assert!(matches!(
        xnbkit::load(dir.path().join("missing.xnb")),
        Err(XnbError::Io(_))
    ));
}
