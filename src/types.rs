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

//! Core wire-format constants and small shared types.

use std::fmt;

/// How a field's payload is framed on the wire.
///
/// Values 0..=5 are the 3-bit tags that appear in field headers. The
/// remaining variants are reader-internal extensions: they share the low
/// 3 bits with a base wire type and refine how the payload is interpreted
/// (`SignedVarint` is zig-zag `Varint`, `Fixed16`/`Fixed8` are narrow
/// fixed-width scalars). Extensions never appear in a tag byte; they are
/// adopted through [`hint`](crate::reader::WireReader::hint) /
/// [`assert_wire_type`](crate::reader::WireReader::assert_wire_type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Base-128 variable-length integer.
    Varint = 0,
    /// 8-byte little-endian payload.
    Fixed64 = 1,
    /// Length-prefixed payload: strings, bytes, nested messages, packed runs.
    String = 2,
    /// Opens a group-framed nested message.
    StartGroup = 3,
    /// Closes a group-framed nested message.
    EndGroup = 4,
    /// 4-byte little-endian payload.
    Fixed32 = 5,
    /// Zig-zag encoded variant of `Varint`.
    SignedVarint = 8,
    /// Single-byte scalar, extension of `Fixed64`'s tag group.
    Fixed8 = 9,
    /// 2-byte little-endian scalar, extension of `Fixed32`'s tag group.
    Fixed16 = 13,
}

impl WireType {
    /// Decodes the 3-bit wire type from a field tag, if it is one of the
    /// tags that may legally appear on the wire.
    pub fn from_tag(tag: u32) -> Option<WireType> {
        match tag & 7 {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::String),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }

    /// The underlying 3-bit tag this wire type shares with its extensions.
    pub fn base(self) -> u8 {
        self as u8 & 7
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Unit in which a serialized date/time or duration tick value is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeScale {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Ticks,
    /// Sentinel: the value is +1 for the maximum representable instant,
    /// -1 for the minimum.
    MinMax,
}

impl TimeScale {
    pub fn from_wire(value: i32) -> Option<TimeScale> {
        match value {
            0 => Some(TimeScale::Days),
            1 => Some(TimeScale::Hours),
            2 => Some(TimeScale::Minutes),
            3 => Some(TimeScale::Seconds),
            4 => Some(TimeScale::Milliseconds),
            5 => Some(TimeScale::Ticks),
            15 => Some(TimeScale::MinMax),
            _ => None,
        }
    }
}

/// 100-nanosecond units, the resolution of serialized date/time values.
pub const TICKS_PER_MILLISECOND: i64 = 10_000;
pub const TICKS_PER_SECOND: i64 = TICKS_PER_MILLISECOND * 1000;
pub const TICKS_PER_MINUTE: i64 = TICKS_PER_SECOND * 60;
pub const TICKS_PER_HOUR: i64 = TICKS_PER_MINUTE * 60;
pub const TICKS_PER_DAY: i64 = TICKS_PER_HOUR * 24;

/// Handle of a type registered with a [`TypeModel`](crate::model::TypeModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey(pub(crate) u32);

impl TypeKey {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity key of a reference-tracked object within one decode session.
pub type ObjKey = i32;
