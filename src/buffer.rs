// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Pooled scratch buffer, refill logic and varint primitives.
//!
//! The buffer pulls from a [`ByteSource`] in whole-buffer chunks and exposes
//! a contiguous window over the unconsumed bytes. Varint parsing is done by
//! peeking at that window without moving the cursor; the caller commits the
//! reported width only once the whole value has been validated.

use crate::error::Error;
use crate::source::ByteSource;
use anyhow::anyhow;
use std::sync::Mutex;

/// Default capacity of a pooled buffer, in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Outcome of peeking a varint at the front of a byte window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Varint<T> {
    /// The window was empty.
    Empty,
    /// The window ended mid-value; more bytes are needed.
    Incomplete,
    /// The encoding exceeded the maximum width for the target type.
    Overflow,
    /// A complete value and the number of bytes it occupied.
    Val(T, usize),
}

/// Peeks a base-128 varint u32 from the front of `bytes` without consuming.
///
/// With `trim_negative`, a ten-byte encoding whose tail is the canonical
/// sign-extension (`FF FF FF FF 01`) is accepted and truncated to 32 bits;
/// this is how negative 32-bit values written through a 64-bit encoder come
/// back. Any other use of more than five bytes is an overflow.
pub fn peek_varuint32(bytes: &[u8], trim_negative: bool) -> Varint<u32> {
    if bytes.is_empty() {
        return Varint::Empty;
    }
    let mut value = bytes[0] as u32;
    if value & 0x80 == 0 {
        return Varint::Val(value, 1);
    }
    value &= 0x7f;
    let mut shift = 7;
    for i in 1..4 {
        let Some(&b) = bytes.get(i) else {
            return Varint::Incomplete;
        };
        value |= ((b & 0x7f) as u32) << shift;
        if b & 0x80 == 0 {
            return Varint::Val(value, i + 1);
        }
        shift += 7;
    }
    let Some(&b) = bytes.get(4) else {
        return Varint::Incomplete;
    };
    value |= ((b & 0x0f) as u32) << 28;
    if b & 0xf0 == 0 {
        return Varint::Val(value, 5);
    }
    if trim_negative
        && b & 0xf0 == 0xf0
        && value & (1 << 31) != 0
    {
        // Sign-extended negative: the remaining five bytes must spell out
        // the canonical all-ones tail.
        match bytes.get(5..10) {
            Some(tail) => {
                if tail == [0xff, 0xff, 0xff, 0xff, 0x01] {
                    return Varint::Val(value, 10);
                }
            }
            None => return Varint::Incomplete,
        }
    }
    Varint::Overflow
}

/// Peeks a base-128 varint u64 from the front of `bytes` without consuming.
pub fn peek_varuint64(bytes: &[u8]) -> Varint<u64> {
    if bytes.is_empty() {
        return Varint::Empty;
    }
    let mut value = bytes[0] as u64;
    if value & 0x80 == 0 {
        return Varint::Val(value, 1);
    }
    value &= 0x7f;
    let mut shift = 7;
    for i in 1..9 {
        let Some(&b) = bytes.get(i) else {
            return Varint::Incomplete;
        };
        value |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            return Varint::Val(value, i + 1);
        }
        shift += 7;
    }
    // Tenth byte carries the final bit only.
    let Some(&b) = bytes.get(9) else {
        return Varint::Incomplete;
    };
    if b > 1 {
        return Varint::Overflow;
    }
    value |= (b as u64) << 63;
    Varint::Val(value, 10)
}

/// Zig-zag decode for 32-bit values.
#[inline(always)]
pub fn zag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Zig-zag decode for 64-bit values.
#[inline(always)]
pub fn zag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// A reuse pool of scratch buffers, shared by all decodes on one model.
pub struct BufferPool {
    capacity: usize,
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> BufferPool {
        BufferPool {
            capacity,
            free: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn acquire(&self) -> Vec<u8> {
        let mut free = self.free.lock().unwrap();
        free.pop().unwrap_or_else(|| vec![0; self.capacity])
    }

    pub fn release(&self, mut buf: Vec<u8>) {
        // Oversized buffers (grown past pool capacity) are dropped rather
        // than pinned in the pool.
        if buf.len() > self.capacity {
            return;
        }
        buf.resize(self.capacity, 0);
        let mut free = self.free.lock().unwrap();
        if free.len() < 8 {
            free.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> BufferPool {
        BufferPool::new(DEFAULT_BUFFER_CAPACITY)
    }
}

/// Windowed read buffer over a [`ByteSource`].
///
/// `position` is the logical stream offset of the next unconsumed byte and
/// only ever moves forward. `data_remaining` throttles refills when the
/// caller bounded the decode to a known payload length.
pub struct ReadBuffer {
    buf: Vec<u8>,
    index: usize,
    available: usize,
    position: u64,
    data_remaining: Option<u64>,
}

impl ReadBuffer {
    pub fn new(buf: Vec<u8>) -> ReadBuffer {
        ReadBuffer {
            buf,
            index: 0,
            available: 0,
            position: 0,
            data_remaining: None,
        }
    }

    /// Caps the total number of bytes this buffer will pull from its source.
    pub fn set_data_remaining(&mut self, remaining: u64) {
        self.data_remaining = Some(remaining);
    }

    /// Logical stream offset of the next unconsumed byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of buffered bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.available
    }

    /// The unconsumed window.
    pub fn window(&self) -> &[u8] {
        &self.buf[self.index..self.index + self.available]
    }

    /// The first `n` unconsumed bytes. Caller must have ensured availability.
    pub fn view(&self, n: usize) -> &[u8] {
        &self.buf[self.index..self.index + n]
    }

    /// Consumes `n` buffered bytes, advancing the logical position.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available);
        self.index += n;
        self.available -= n;
        self.position += n as u64;
    }

    /// Tries to make at least `count` bytes available, pulling from `source`
    /// as needed. Returns the number of bytes now buffered. With `strict`,
    /// falling short is an error; otherwise the caller inspects the count.
    pub fn ensure(
        &mut self,
        count: usize,
        strict: bool,
        source: &mut dyn ByteSource,
    ) -> Result<usize, Error> {
        if self.available >= count {
            return Ok(self.available);
        }
        // Slide the live window back to the origin before growing.
        if self.index > 0 {
            self.buf.copy_within(self.index..self.index + self.available, 0);
            self.index = 0;
        }
        if count > self.buf.len() {
            self.buf.resize(count, 0);
        }
        let mut want = self.writable();
        if let Some(remaining) = self.data_remaining {
            want = want.min(remaining.min(usize::MAX as u64) as usize);
        }
        while want > 0 {
            let start = self.index + self.available;
            let n = source.read(&mut self.buf[start..start + want])?;
            if n == 0 {
                break;
            }
            self.available += n;
            want -= n;
            if let Some(remaining) = &mut self.data_remaining {
                *remaining -= n as u64;
            }
            if self.available >= count {
                break;
            }
        }
        if strict && self.available < count {
            return Err(Error::UnexpectedEndOfInput(Default::default()));
        }
        Ok(self.available)
    }

    fn writable(&self) -> usize {
        self.buf.len() - self.index - self.available
    }

    /// Discards `len` bytes of payload, draining the source when it cannot
    /// seek. Buffered bytes are dropped first.
    pub fn skip_raw(&mut self, len: u64, source: &mut dyn ByteSource) -> Result<(), Error> {
        let from_buffer = (self.available as u64).min(len);
        self.consume(from_buffer as usize);
        let mut left = len - from_buffer;
        if left == 0 {
            return Ok(());
        }
        if let Some(remaining) = self.data_remaining {
            if left > remaining {
                return Err(Error::UnexpectedEndOfInput(Default::default()));
            }
            self.data_remaining = Some(remaining - left);
        }
        if source.can_seek() {
            source.seek_forward(left)?;
            self.position += left;
            return Ok(());
        }
        // Drain through the scratch buffer.
        if self.buf.is_empty() {
            return Err(anyhow!("cannot drain with a zero-capacity buffer").into());
        }
        self.index = 0;
        while left > 0 {
            let want = (self.buf.len() as u64).min(left) as usize;
            let n = source.read(&mut self.buf[..want])?;
            if n == 0 {
                return Err(Error::UnexpectedEndOfInput(Default::default()));
            }
            left -= n as u64;
            self.position += n as u64;
        }
        Ok(())
    }

    /// Hands the scratch allocation back so a pool can reuse it.
    pub fn into_storage(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    #[test]
    fn varuint32_widths() {
        assert_eq!(peek_varuint32(&[0x00], false), Varint::Val(0, 1));
        assert_eq!(peek_varuint32(&[0x7f], false), Varint::Val(127, 1));
        assert_eq!(peek_varuint32(&[0x80, 0x01], false), Varint::Val(128, 2));
        assert_eq!(peek_varuint32(&[0x96, 0x01], false), Varint::Val(150, 2));
        assert_eq!(
            peek_varuint32(&[0xff, 0xff, 0xff, 0xff, 0x0f], false),
            Varint::Val(u32::MAX, 5)
        );
    }

    #[test]
    fn varuint32_partial_and_empty() {
        assert_eq!(peek_varuint32(&[], false), Varint::Empty);
        assert_eq!(peek_varuint32(&[0x80], false), Varint::Incomplete);
        assert_eq!(peek_varuint32(&[0x80, 0x80, 0x80], false), Varint::Incomplete);
    }

    #[test]
    fn varuint32_overflow_without_trim() {
        let neg1 = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(peek_varuint32(&neg1, false), Varint::Overflow);
    }

    #[test]
    fn varuint32_trims_sign_extended_negative() {
        // -1 written through a 64-bit encoder.
        let neg1 = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(peek_varuint32(&neg1, true), Varint::Val(u32::MAX, 10));
        // A ten-byte tail that is not the canonical sign extension stays
        // an overflow even with trimming on.
        let bad = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f, 0x01];
        assert_eq!(peek_varuint32(&bad, true), Varint::Overflow);
    }

    #[test]
    fn varuint64_widths() {
        assert_eq!(peek_varuint64(&[0x01]), Varint::Val(1, 1));
        assert_eq!(
            peek_varuint64(&[0x80, 0x80, 0x80, 0x80, 0x10]),
            Varint::Val(1 << 32, 5)
        );
        let max = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(peek_varuint64(&max), Varint::Val(u64::MAX, 10));
        let over = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        assert_eq!(peek_varuint64(&over), Varint::Overflow);
    }

    #[test]
    fn zigzag_decode() {
        assert_eq!(zag32(0), 0);
        assert_eq!(zag32(1), -1);
        assert_eq!(zag32(2), 1);
        assert_eq!(zag32(3), -2);
        assert_eq!(zag64(4294967294), 2147483647);
        assert_eq!(zag64(u64::MAX), i64::MIN);
    }

    #[test]
    fn ensure_refills_and_slides() {
        let data: Vec<u8> = (0..64).collect();
        let mut src = SliceSource::new(&data);
        let mut buf = ReadBuffer::new(vec![0; 16]);
        assert_eq!(buf.ensure(8, true, &mut src).unwrap(), 16);
        assert_eq!(buf.view(4), &[0, 1, 2, 3]);
        buf.consume(12);
        assert_eq!(buf.position(), 12);
        // Window slides left and refills from byte 16 onward.
        assert_eq!(buf.ensure(10, true, &mut src).unwrap(), 16);
        assert_eq!(buf.view(6), &[12, 13, 14, 15, 16, 17]);
    }

    #[test]
    fn ensure_grows_past_capacity() {
        let data = vec![7u8; 100];
        let mut src = SliceSource::new(&data);
        let mut buf = ReadBuffer::new(vec![0; 8]);
        assert!(buf.ensure(50, true, &mut src).unwrap() >= 50);
        assert_eq!(buf.view(50), &data[..50]);
    }

    #[test]
    fn ensure_strict_fails_at_eof() {
        let data = [1u8, 2, 3];
        let mut src = SliceSource::new(&data);
        let mut buf = ReadBuffer::new(vec![0; 8]);
        assert!(matches!(
            buf.ensure(4, true, &mut src),
            Err(Error::UnexpectedEndOfInput(_))
        ));
    }

    #[test]
    fn data_remaining_throttles_refill() {
        let data = vec![5u8; 32];
        let mut src = SliceSource::new(&data);
        let mut buf = ReadBuffer::new(vec![0; 16]);
        buf.set_data_remaining(4);
        assert_eq!(buf.ensure(1, true, &mut src).unwrap(), 4);
        assert!(matches!(
            buf.ensure(5, true, &mut src),
            Err(Error::UnexpectedEndOfInput(_))
        ));
    }

    #[test]
    fn skip_raw_uses_seek() {
        let data: Vec<u8> = (0..32).collect();
        let mut src = SliceSource::new(&data);
        let mut buf = ReadBuffer::new(vec![0; 8]);
        buf.ensure(4, true, &mut src).unwrap();
        buf.skip_raw(20, &mut src).unwrap();
        assert_eq!(buf.position(), 20);
        buf.ensure(1, true, &mut src).unwrap();
        assert_eq!(buf.view(1), &[20]);
    }

    #[test]
    fn pool_round_trips_buffers() {
        let pool = BufferPool::new(64);
        let a = pool.acquire();
        assert_eq!(a.len(), 64);
        pool.release(a);
        let b = pool.acquire();
        assert_eq!(b.len(), 64);
    }
}
