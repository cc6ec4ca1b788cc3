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

//! Minimal fixture encoder. The crate itself is decode-only, so tests
//! assemble wire bytes by hand through this builder.

#![allow(dead_code)]

pub const VARINT: u8 = 0;
pub const FIXED64: u8 = 1;
pub const LEN: u8 = 2;
pub const START_GROUP: u8 = 3;
pub const END_GROUP: u8 = 4;
pub const FIXED32: u8 = 5;

#[derive(Default)]
pub struct Enc {
    buf: Vec<u8>,
}

impl Enc {
    pub fn new() -> Enc {
        Enc::default()
    }

    pub fn varint(mut self, mut v: u64) -> Enc {
        loop {
            let b = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(b);
                break;
            }
            self.buf.push(b | 0x80);
        }
        self
    }

    /// Zig-zag encoded signed varint.
    pub fn sint(self, v: i64) -> Enc {
        self.varint(((v << 1) ^ (v >> 63)) as u64)
    }

    pub fn tag(self, field: u32, wire: u8) -> Enc {
        self.varint(((field << 3) | wire as u32) as u64)
    }

    pub fn byte(mut self, b: u8) -> Enc {
        self.buf.push(b);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Enc {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn fixed32(self, v: u32) -> Enc {
        self.raw(&v.to_le_bytes())
    }

    pub fn fixed64(self, v: u64) -> Enc {
        self.raw(&v.to_le_bytes())
    }

    /// Length-prefixed UTF-8 payload.
    pub fn str(self, s: &str) -> Enc {
        self.varint(s.len() as u64).raw(s.as_bytes())
    }

    /// Length-prefixed nested payload.
    pub fn nested(self, inner: Enc) -> Enc {
        let bytes = inner.finish();
        self.varint(bytes.len() as u64).raw(&bytes)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
