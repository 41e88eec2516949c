// Shared builders for integration tests: an LZX bitstream writer and
// container assembly helpers.

#![allow(dead_code)]

/// MSB-first bit packer emitting little-endian 16-bit words, the layout the
/// LZX decoder reads.
#[derive(Debug, Default)]
pub struct BitWriter {
    bits: Vec<bool>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, value: u32, n: u32) -> &mut Self {
        for i in (0..n).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
        self
    }

    pub fn align(&mut self) -> &mut Self {
        while self.bits.len() % 16 != 0 {
            self.bits.push(false);
        }
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.bits
            .chunks(16)
            .flat_map(|word| {
                word.iter()
                    .fold(0u16, |acc, &b| (acc << 1) | u16::from(b))
                    .to_le_bytes()
            })
            .collect()
    }

    /// Frame-leading "no call translation" bit.
    pub fn no_transform(&mut self) -> &mut Self {
        self.put(0, 1)
    }

    /// Block type (1 verbatim, 2 aligned, 3 uncompressed) and 24-bit length.
    pub fn block_header(&mut self, kind: u32, length: u32) -> &mut Self {
        self.put(kind, 3).put(length >> 8, 16).put(length & 0xFF, 8)
    }

    /// A pretree where symbols 0..12 have 4-bit codes and 12..20 5-bit codes.
    pub fn pretree(&mut self) -> &mut Self {
        for sym in 0..20 {
            self.put(if sym < 12 { 4 } else { 5 }, 4);
        }
        self
    }

    /// Code of `sym` under [`pretree`](Self::pretree).
    pub fn pretree_symbol(&mut self, sym: u32) -> &mut Self {
        if sym < 12 {
            self.put(sym, 4)
        } else {
            self.put(24 + (sym - 12), 5)
        }
    }

    /// Main tree with every one of the 512 elements of a 64 KiB window at
    /// 9 bits, and an empty length tree. Valid for the first block of a
    /// session only (lengths are delta coded against zero).
    pub fn uniform_trees(&mut self) -> &mut Self {
        for _ in 0..2 {
            self.pretree();
            for _ in 0..256 {
                // (0 - 8) mod 17 = 9
                self.pretree_symbol(8);
            }
        }
        self.pretree();
        for _ in 0..249 {
            self.pretree_symbol(0);
        }
        self
    }

    /// Aligned tree with all eight symbols at 3 bits.
    pub fn uniform_aligned_tree(&mut self) -> &mut Self {
        for _ in 0..8 {
            self.put(3, 3);
        }
        self
    }

    /// Main-tree element under `uniform_trees`: literal byte or 256 + match
    /// header.
    pub fn element(&mut self, element: u32) -> &mut Self {
        self.put(element, 9)
    }

    pub fn literals(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.element(u32::from(b));
        }
        self
    }
}

/// Match element for `slot` and a match `length` of 2..=8.
pub fn match_element(slot: u32, length: u32) -> u32 {
    assert!((2..=8).contains(&length));
    256 + (slot << 3) + (length - 2)
}

/// First frame of a session holding one uncompressed block of `payload`.
pub fn uncompressed_frame(payload: &[u8]) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.no_transform().block_header(3, payload.len() as u32);
    let mut out = w.finish();
    for r in [1u32, 1, 1] {
        out.extend_from_slice(&r.to_le_bytes());
    }
    out.extend_from_slice(payload);
    out
}

/// Chunk with an explicit frame size.
pub fn chunk(frame_size: u16, block: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF];
    out.extend_from_slice(&frame_size.to_be_bytes());
    out.extend_from_slice(&(block.len() as u16).to_be_bytes());
    out.extend_from_slice(block);
    out
}

pub fn seven_bit(mut v: u32, out: &mut Vec<u8>) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

pub fn string(s: &str, out: &mut Vec<u8>) {
    seven_bit(s.len() as u32, out);
    out.extend_from_slice(s.as_bytes());
}

/// Reader table, zero shared resources, then `root` verbatim.
pub fn content(readers: &[&str], root: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    seven_bit(readers.len() as u32, &mut out);
    for r in readers {
        string(r, &mut out);
        out.extend_from_slice(&0i32.to_le_bytes());
    }
    out.push(0);
    out.extend_from_slice(root);
    out
}

/// Full container: prologue (sizes filled in) followed by `payload`.
pub fn container(platform: u8, flags: u8, decompressed: Option<u32>, payload: &[u8]) -> Vec<u8> {
    let mut out = b"XNB".to_vec();
    out.extend_from_slice(&[platform, 5, flags]);
    let prologue = 10 + if decompressed.is_some() { 4 } else { 0 };
    out.extend_from_slice(&((prologue + payload.len()) as u32).to_le_bytes());
    if let Some(size) = decompressed {
        out.extend_from_slice(&size.to_le_bytes());
    }
    out.extend_from_slice(payload);
    out
}

/// Uncompressed Windows container whose root is the Int32 `value`.
pub fn int32_container(value: i32) -> Vec<u8> {
    let mut root = vec![1];
    root.extend_from_slice(&value.to_le_bytes());
    container(b'w', 0, None, &content(&["System.Int32"], &root))
}
