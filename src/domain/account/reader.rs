//! Bounds-checked little-endian reader over account bytes.
//!
//! Every accessor returns `None` instead of panicking when the buffer is too
//! short, and leaves the cursor untouched in that case.

use solana_program::pubkey::Pubkey;

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn get_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.get_bytes(len).map(|_| ())
    }

    pub fn get_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.get_bytes(N)?.try_into().ok()
    }

    pub fn get_u8(&mut self) -> Option<u8> {
        self.get_array::<1>().map(|b| b[0])
    }

    pub fn get_u32(&mut self) -> Option<u32> {
        self.get_array().map(u32::from_le_bytes)
    }

    pub fn get_u64(&mut self) -> Option<u64> {
        self.get_array().map(u64::from_le_bytes)
    }

    pub fn get_i64(&mut self) -> Option<i64> {
        self.get_array().map(i64::from_le_bytes)
    }

    pub fn get_pubkey(&mut self) -> Option<Pubkey> {
        self.get_array::<32>().map(Pubkey::new_from_array)
    }
}
