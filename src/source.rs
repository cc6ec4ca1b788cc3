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

//! Byte sources the reader can pull from.
//!
//! A source is always owned by the caller; the reader borrows it for the
//! duration of one decode and never closes it.

use crate::error::Error;
use anyhow::anyhow;
use std::io;

/// A sequential producer of bytes.
pub trait ByteSource {
    /// Reads up to `buf.len()` bytes, returning how many were produced.
    /// A return of 0 means the source is exhausted.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Whether [`seek_forward`](ByteSource::seek_forward) is cheap and
    /// supported. Sources that cannot seek are drained through a scratch
    /// buffer when bytes need to be skipped.
    fn can_seek(&self) -> bool {
        false
    }

    /// Advances the source by `n` bytes without producing them. Only called
    /// when [`can_seek`](ByteSource::can_seek) returns true.
    fn seek_forward(&mut self, _n: u64) -> Result<(), Error> {
        Err(anyhow!("source does not support seeking").into())
    }
}

/// In-memory source over a borrowed slice. Seekable.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> SliceSource<'a> {
        SliceSource { data, pos: 0 }
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn can_seek(&self) -> bool {
        true
    }

    fn seek_forward(&mut self, n: u64) -> Result<(), Error> {
        // Seeking past the end is allowed; the next read simply reports
        // exhaustion, which the reader turns into UnexpectedEndOfInput.
        self.pos = self.pos.saturating_add(n as usize).min(self.data.len());
        Ok(())
    }
}

/// Adapter for any [`std::io::Read`]. Not seekable.
pub struct IoSource<R> {
    inner: R,
}

impl<R: io::Read> IoSource<R> {
    pub fn new(inner: R) -> IoSource<R> {
        IoSource { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: io::Read> ByteSource for IoSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.inner
            .read(buf)
            .map_err(|e| anyhow!("read from byte source failed: {e}").into())
    }
}
