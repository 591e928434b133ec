//! Big-endian primitive reader and writer used by the JKS format.
//!
//! Strings use the Java "modified UTF-8" encoding: a `u16` byte length
//! followed by UTF-16 code units packed as 1, 2 or 3 bytes each, with NUL
//! written as the two-byte form `C0 80`.

use crate::error::{KeystoreError, Result};

/// Cursor over an in-memory keystore image.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(KeystoreError::Truncated)?;
        let out = self
            .data
            .get(self.pos..end)
            .ok_or(KeystoreError::Truncated)?;
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        self.array().map(u16::from_be_bytes)
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        self.array().map(u32::from_be_bytes)
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        self.array().map(u64::from_be_bytes)
    }

    /// A `u32` length prefix followed by that many bytes.
    pub(crate) fn length_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.bytes(len)
    }

    /// A modified UTF-8 string.
    pub(crate) fn utf(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        decode_modified_utf8(self.bytes(len)?)
    }
}

fn decode_modified_utf8(raw: &[u8]) -> Result<String> {
    let malformed = || KeystoreError::Malformed("invalid modified UTF-8 string".into());
    let continuation = |b: Option<&u8>| match b {
        Some(&b) if b & 0xc0 == 0x80 => Ok(u16::from(b & 0x3f)),
        _ => Err(malformed()),
    };

    let mut units = Vec::with_capacity(raw.len());
    let mut iter = raw.iter();
    while let Some(&b) = iter.next() {
        let unit = match b {
            0x01..=0x7f => u16::from(b),
            _ if b & 0xe0 == 0xc0 => (u16::from(b & 0x1f) << 6) | continuation(iter.next())?,
            _ if b & 0xf0 == 0xe0 => {
                let hi = u16::from(b & 0x0f) << 12;
                let mid = continuation(iter.next())? << 6;
                hi | mid | continuation(iter.next())?
            }
            _ => return Err(malformed()),
        };
        units.push(unit);
    }
    String::from_utf16(&units).map_err(|_| malformed())
}

pub(crate) fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_length_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| KeystoreError::Malformed("field exceeds 4 GiB".into()))?;
    put_u32(out, len);
    out.extend_from_slice(bytes);
    Ok(())
}

pub(crate) fn put_utf(out: &mut Vec<u8>, s: &str) -> Result<()> {
    let mut encoded = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007f => encoded.push(unit as u8),
            0x0000..=0x07ff => {
                encoded.push(0xc0 | (unit >> 6) as u8);
                encoded.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                encoded.push(0xe0 | (unit >> 12) as u8);
                encoded.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                encoded.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    let len = u16::try_from(encoded.len())
        .map_err(|_| KeystoreError::Malformed(format!("string too long ({} bytes)", encoded.len())))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&encoded);
    Ok(())
}
