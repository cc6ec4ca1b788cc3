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

//! The dynamic object model produced by a decode.

use crate::types::{ObjKey, TypeKey, WireType};
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A dynamically typed decoded value.
///
/// Strings are interned per decode session, so repeated values share one
/// allocation. `Ref` points into the session's object graph rather than
/// aliasing another `Value` directly; resolve it through
/// [`Decoded::resolve`](crate::model::Decoded::resolve).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(Arc<str>),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Duration(TimeDelta),
    Guid(Uuid),
    Enum(i64),
    List(Vec<Value>),
    Record(Record),
    /// Back-reference to an object already present in the session graph.
    Ref(ObjKey),
}

impl Value {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// An unknown field preserved verbatim for later inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionField {
    pub field_number: u32,
    pub wire_type: WireType,
    pub payload: ExtensionPayload,
}

/// The raw content of an unknown field, keyed by how it was framed.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionPayload {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    LengthDelimited(Vec<u8>),
}

/// A decoded instance of a registered message type.
///
/// `fields` is parallel to the type's member plan; members never seen on the
/// wire stay at their default (or `Null`). `uid` is the instance identity
/// within one decode session and survives merges into the same instance; it
/// is excluded from equality.
#[derive(Debug, Clone)]
pub struct Record {
    pub type_key: TypeKey,
    pub(crate) uid: u64,
    pub fields: Vec<Value>,
    /// Per-member "was present on the wire" flags, parallel to `fields`.
    pub specified: Vec<bool>,
    /// Unknown fields kept when the model stores extension data.
    pub extensions: Vec<ExtensionField>,
}

impl Record {
    pub(crate) fn new(type_key: TypeKey, uid: u64, fields: Vec<Value>) -> Record {
        let n = fields.len();
        Record {
            type_key,
            uid,
            fields,
            specified: vec![false; n],
            extensions: Vec::new(),
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Record) -> bool {
        self.type_key == other.type_key
            && self.fields == other.fields
            && self.specified == other.specified
            && self.extensions == other.extensions
    }
}

/// A 96-bit decimal with sign and a base-10 scaling factor of 0..=28.
///
/// The unscaled magnitude is `hi * 2^64 + mid * 2^32 + lo`, and the numeric
/// value is `magnitude / 10^scale`, negated when `negative`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    pub lo: u32,
    pub mid: u32,
    pub hi: u32,
    pub negative: bool,
    pub scale: u8,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        lo: 0,
        mid: 0,
        hi: 0,
        negative: false,
        scale: 0,
    };

    /// Assembles a decimal from its wire fields: the low 64 bits of the
    /// magnitude, the high 32 bits, and the packed sign/scale word
    /// (bit 0 = sign, bits 1.. = scale).
    pub fn from_parts(low: u64, high: u32, sign_scale: u32) -> Decimal {
        Decimal {
            lo: low as u32,
            mid: (low >> 32) as u32,
            hi: high,
            negative: sign_scale & 1 != 0,
            scale: (sign_scale >> 1) as u8,
        }
    }

    /// Lossy conversion for callers that accept rounding at f64 precision.
    pub fn to_f64(&self) -> f64 {
        let magnitude =
            self.hi as f64 * 18_446_744_073_709_551_616.0 + self.mid as f64 * 4_294_967_296.0
                + self.lo as f64;
        let scaled = magnitude / 10f64.powi(self.scale as i32);
        if self.negative {
            -scaled
        } else {
            scaled
        }
    }

    fn is_zero(&self) -> bool {
        self.lo == 0 && self.mid == 0 && self.hi == 0
    }

    /// Divides the 96-bit magnitude by ten in place, returning the remainder.
    fn div10(limbs: &mut [u32; 3]) -> u32 {
        let mut rem: u64 = 0;
        for limb in limbs.iter_mut().rev() {
            let cur = (rem << 32) | *limb as u64;
            *limb = (cur / 10) as u32;
            rem = cur % 10;
        }
        rem as u32
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() && self.scale == 0 {
            return f.write_str("0");
        }
        let mut limbs = [self.lo, self.mid, self.hi];
        let mut digits = Vec::new();
        while limbs != [0, 0, 0] {
            digits.push(b'0' + Decimal::div10(&mut limbs) as u8);
        }
        // Pad so at least one digit lands left of the point.
        while digits.len() <= self.scale as usize {
            digits.push(b'0');
        }
        let mut out = String::new();
        if self.negative {
            out.push('-');
        }
        for (i, &d) in digits.iter().rev().enumerate() {
            if self.scale != 0 && i == digits.len() - self.scale as usize {
                out.push('.');
            }
            out.push(d as char);
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_display() {
        assert_eq!(Decimal::ZERO.to_string(), "0");
        assert_eq!(Decimal::from_parts(550032, 0, 0x04).to_string(), "5500.32");
        assert_eq!(Decimal::from_parts(550032, 0, 0x05).to_string(), "-5500.32");
        assert_eq!(Decimal::from_parts(5, 0, 0x06).to_string(), "0.005");
        assert_eq!(Decimal::from_parts(12345, 0, 0).to_string(), "12345");
        // Magnitude that needs all three limbs.
        let big = Decimal::from_parts(u64::MAX, 1, 0);
        assert_eq!(big.to_string(), "36893488147419103231");
    }

    #[test]
    fn decimal_to_f64() {
        let d = Decimal::from_parts(550032, 0, 0x04);
        assert!((d.to_f64() - 5500.32).abs() < 1e-9);
        let n = Decimal::from_parts(550032, 0, 0x05);
        assert!((n.to_f64() + 5500.32).abs() < 1e-9);
    }

    #[test]
    fn record_equality_ignores_uid() {
        let a = Record::new(TypeKey(0), 1, vec![Value::Int32(5)]);
        let b = Record::new(TypeKey(0), 99, vec![Value::Int32(5)]);
        assert_eq!(a, b);
    }
}
