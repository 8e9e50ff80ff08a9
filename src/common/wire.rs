//! Little-endian framing shared by the persisted formats.
//!
//! Every file is a body followed by a 4-byte CRC32 of that body.

use crate::common::{Error, Result};

pub(crate) const TRAILER_SIZE: usize = 4;

#[inline]
pub(crate) fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append the CRC32 of everything already in `buf`.
pub(crate) fn seal(buf: &mut Vec<u8>) {
    let checksum = crc32fast::hash(buf);
    put_u32(buf, checksum);
}

/// Check the trailer and return the body it covers.
///
/// `min_body` is the smallest body the format can have.
pub(crate) fn unseal(bytes: &[u8], min_body: usize) -> Result<&[u8]> {
    if bytes.len() < min_body + TRAILER_SIZE {
        return Err(Error::corrupt(format!(
            "stream of {} bytes is shorter than the header",
            bytes.len()
        )));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - TRAILER_SIZE);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(Error::corrupt(format!(
            "checksum mismatch: stored {:#010x}, computed {:#010x}",
            stored, computed
        )));
    }
    Ok(body)
}

/// Bounds-checked little-endian reader over a byte slice.
pub(crate) struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(Error::corrupt(format!("truncated at byte {}", self.pos)));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub(crate) fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.u32()?))
    }

    /// A length prefix whose elements must fit in what is left.
    pub(crate) fn count(&mut self, elem_size: usize) -> Result<usize> {
        let at = self.pos;
        let n = self.u32()? as usize;
        if n.saturating_mul(elem_size) > self.remaining() {
            return Err(Error::corrupt(format!(
                "count {} at byte {} exceeds remaining {} bytes",
                n,
                at,
                self.remaining()
            )));
        }
        Ok(n)
    }

    /// Fail unless every byte was consumed.
    pub(crate) fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(Error::corrupt(format!("{} unexpected bytes at the end", n))),
        }
    }
}
