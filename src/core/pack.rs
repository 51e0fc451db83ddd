/*!
 * Wire Codec
 * Length-prefixed binary packing for state snapshots
 *
 * All integers are big-endian. Strings carry a u32 byte-length prefix;
 * an absent string packs the NO_VAL sentinel with no body.
 */

use super::errors::PackError;
use super::limits::NO_VAL;
use super::types::Timestamp;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Growable output buffer for packing.
#[derive(Debug, Default)]
pub struct PackBuffer {
    buf: BytesMut,
}

impl PackBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
        }
    }

    #[inline]
    pub fn pack_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    #[inline]
    pub fn pack_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    #[inline]
    pub fn pack_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    /// Timestamps travel as u64 seconds.
    #[inline]
    pub fn pack_time(&mut self, value: Timestamp) {
        self.buf.put_u64(value);
    }

    /// Pack an optional string; `None` packs the NO_VAL sentinel.
    pub fn pack_str(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.buf.put_u32(s.len() as u32);
                self.buf.put_slice(s.as_bytes());
            }
            None => self.buf.put_u32(NO_VAL),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze into an immutable byte buffer.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Hand the packed bytes to an unpacker, for symmetrical decoding.
    #[must_use]
    pub fn into_unpacker(self) -> UnpackBuffer {
        UnpackBuffer::new(self.buf.freeze())
    }
}

/// Reader over a packed byte buffer.
#[derive(Debug)]
pub struct UnpackBuffer {
    buf: Bytes,
}

impl UnpackBuffer {
    #[must_use]
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    fn need(&self, bytes: usize) -> Result<(), PackError> {
        if self.buf.remaining() < bytes {
            return Err(PackError::Truncated {
                needed: bytes - self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn unpack_u16(&mut self) -> Result<u16, PackError> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn unpack_u32(&mut self) -> Result<u32, PackError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn unpack_u64(&mut self) -> Result<u64, PackError> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn unpack_time(&mut self) -> Result<Timestamp, PackError> {
        self.unpack_u64()
    }

    pub fn unpack_str(&mut self) -> Result<Option<String>, PackError> {
        let len = self.unpack_u32()?;
        if len == NO_VAL {
            return Ok(None);
        }
        let len = len as usize;
        self.need(len)?;
        let raw = self.buf.copy_to_bytes(len);
        String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|_| PackError::BadString)
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}
