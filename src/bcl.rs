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

//! Decoders for composite scalar encodings: decimals, guids, date/time
//! values and reference-tracked object envelopes. Each is a small
//! sub-message with well-known field numbers.

use crate::error::Error;
use crate::reader::WireReader;
use crate::types::{
    ObjKey, TimeScale, TypeKey, WireType, TICKS_PER_DAY, TICKS_PER_HOUR, TICKS_PER_MILLISECOND,
    TICKS_PER_MINUTE, TICKS_PER_SECOND,
};
use crate::value::{Decimal, Value};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use uuid::Uuid;

const FIELD_TIMESPAN_VALUE: u32 = 1;
const FIELD_TIMESPAN_SCALE: u32 = 2;
const FIELD_TIMESPAN_KIND: u32 = 3;

const FIELD_DECIMAL_LOW: u32 = 1;
const FIELD_DECIMAL_HIGH: u32 = 2;
const FIELD_DECIMAL_SIGN_SCALE: u32 = 3;

const FIELD_GUID_LOW: u32 = 1;
const FIELD_GUID_HIGH: u32 = 2;

const FIELD_EXISTING_OBJECT_KEY: u32 = 1;
const FIELD_NEW_OBJECT_KEY: u32 = 2;
const FIELD_EXISTING_TYPE_KEY: u32 = 3;
const FIELD_NEW_TYPE_KEY: u32 = 4;
const FIELD_TYPE_NAME: u32 = 8;
const FIELD_OBJECT: u32 = 10;

/// Behavior flags for [`read_net_object`].
pub mod net_object_options {
    /// The stream may carry object keys instead of repeated payloads.
    pub const AS_REFERENCE: u8 = 1;
    /// The stream may carry type keys or type names for the payload.
    pub const DYNAMIC_TYPE: u8 = 2;
    /// New instances go through member defaults rather than raw allocation.
    pub const USE_CONSTRUCTOR: u8 = 4;
}

enum Ticks {
    Value(i64),
    Min,
    Max,
}

/// Reads the tick sub-message shared by durations and date/time values.
/// A bare `Fixed64` payload is the raw tick count with no scale envelope.
fn read_ticks(reader: &mut WireReader) -> Result<Ticks, Error> {
    if reader.wire_type() == Some(WireType::Fixed64) {
        return Ok(Ticks::Value(reader.read_int64()?));
    }
    let token = reader.start_sub_item()?;
    let mut value: i64 = 0;
    let mut scale = TimeScale::Days;
    loop {
        let field = reader.read_field_header()?;
        if field == 0 {
            break;
        }
        match field {
            FIELD_TIMESPAN_VALUE => {
                reader.assert_wire_type(WireType::SignedVarint)?;
                value = reader.read_int64()?;
            }
            FIELD_TIMESPAN_SCALE => {
                let raw = reader.read_int32()?;
                scale = TimeScale::from_wire(raw).ok_or_else(|| Error::UnknownEnumWireValue {
                    value: raw as i64,
                    state: reader.state(),
                })?;
            }
            FIELD_TIMESPAN_KIND => {
                // DateTimeKind; carried for fidelity but not represented.
                let kind = reader.read_int32()?;
                crate::ensure!(
                    (0..=2).contains(&kind),
                    Error::invalid_data(format!("invalid date-time kind {kind}"), reader.state())
                );
            }
            _ => reader.skip_field()?,
        }
    }
    reader.end_sub_item(token)?;
    let per_unit = match scale {
        TimeScale::Days => TICKS_PER_DAY,
        TimeScale::Hours => TICKS_PER_HOUR,
        TimeScale::Minutes => TICKS_PER_MINUTE,
        TimeScale::Seconds => TICKS_PER_SECOND,
        TimeScale::Milliseconds => TICKS_PER_MILLISECOND,
        TimeScale::Ticks => 1,
        TimeScale::MinMax => {
            return match value {
                1 => Ok(Ticks::Max),
                -1 => Ok(Ticks::Min),
                other => Err(Error::invalid_data(
                    format!("unknown min/max marker {other}"),
                    reader.state(),
                )),
            };
        }
    };
    value
        .checked_mul(per_unit)
        .map(Ticks::Value)
        .ok_or_else(|| Error::Overflow(reader.state()))
}

fn ticks_to_delta(ticks: i64, reader: &WireReader) -> Result<TimeDelta, Error> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND);
    let rem = ticks.rem_euclid(TICKS_PER_SECOND);
    let base =
        TimeDelta::try_seconds(secs).ok_or_else(|| Error::Overflow(reader.state()))?;
    Ok(base + TimeDelta::nanoseconds(rem * 100))
}

/// Reads a duration expressed in 100-nanosecond ticks.
pub fn read_duration(reader: &mut WireReader) -> Result<TimeDelta, Error> {
    match read_ticks(reader)? {
        Ticks::Value(ticks) => ticks_to_delta(ticks, reader),
        Ticks::Min => Ok(TimeDelta::MIN),
        Ticks::Max => Ok(TimeDelta::MAX),
    }
}

/// Reads a date/time as ticks relative to the 1970-01-01 epoch.
pub fn read_datetime(reader: &mut WireReader) -> Result<NaiveDateTime, Error> {
    match read_ticks(reader)? {
        Ticks::Value(ticks) => {
            let delta = ticks_to_delta(ticks, reader)?;
            DateTime::<Utc>::UNIX_EPOCH
                .naive_utc()
                .checked_add_signed(delta)
                .ok_or_else(|| Error::Overflow(reader.state()))
        }
        Ticks::Min => Ok(NaiveDateTime::MIN),
        Ticks::Max => Ok(NaiveDateTime::MAX),
    }
}

/// Reads a 96-bit decimal sub-message: low 64 bits, high 32 bits, and a
/// packed sign/scale word.
pub fn read_decimal(reader: &mut WireReader) -> Result<Decimal, Error> {
    let token = reader.start_sub_item()?;
    let mut low: u64 = 0;
    let mut high: u32 = 0;
    let mut sign_scale: u32 = 0;
    loop {
        let field = reader.read_field_header()?;
        if field == 0 {
            break;
        }
        match field {
            FIELD_DECIMAL_LOW => low = reader.read_uint64()?,
            FIELD_DECIMAL_HIGH => high = reader.read_uint32()?,
            FIELD_DECIMAL_SIGN_SCALE => sign_scale = reader.read_uint32()?,
            _ => reader.skip_field()?,
        }
    }
    reader.end_sub_item(token)?;
    let decimal = Decimal::from_parts(low, high, sign_scale);
    crate::ensure!(
        decimal.scale <= 28,
        Error::invalid_data(
            format!("decimal scale {} exceeds 28", decimal.scale),
            reader.state()
        )
    );
    Ok(decimal)
}

/// Reads a guid sub-message: two fixed 64-bit halves of the canonical
/// byte layout.
pub fn read_guid(reader: &mut WireReader) -> Result<Uuid, Error> {
    let token = reader.start_sub_item()?;
    let mut low: u64 = 0;
    let mut high: u64 = 0;
    loop {
        let field = reader.read_field_header()?;
        if field == 0 {
            break;
        }
        match field {
            FIELD_GUID_LOW => low = reader.read_uint64()?,
            FIELD_GUID_HIGH => high = reader.read_uint64()?,
            _ => reader.skip_field()?,
        }
    }
    reader.end_sub_item(token)?;
    if low == 0 && high == 0 {
        return Ok(Uuid::nil());
    }
    // The halves are the little-endian mixed-field layout: a 32-bit word
    // and two 16-bit words in `low`, eight raw bytes in `high`.
    Ok(Uuid::from_fields(
        low as u32,
        (low >> 32) as u16,
        (low >> 48) as u16,
        &high.to_le_bytes(),
    ))
}

fn uid_of(value: &Value) -> Option<u64> {
    value.as_record().map(|r| r.uid())
}

/// Reads a reference-tracked object envelope.
///
/// The envelope either names an already-seen object by key, or introduces a
/// new key plus a payload (optionally with dynamic type information). New
/// keys are registered in the session graph before the payload is decoded,
/// so self-referencing objects resolve.
pub fn read_net_object(
    reader: &mut WireReader,
    existing: Option<Value>,
    type_key: Option<TypeKey>,
    options: u8,
) -> Result<Value, Error> {
    let token = reader.start_sub_item()?;
    let mut value = existing;
    let mut resolved_type = type_key;
    let mut new_object_key: ObjKey = -1;
    let mut new_type_key: ObjKey = -1;
    loop {
        let field = reader.read_field_header()?;
        if field == 0 {
            break;
        }
        match field {
            FIELD_EXISTING_OBJECT_KEY => {
                let key = reader.read_int32()?;
                if !reader.graph().contains(key) {
                    return Err(Error::invalid_data(
                        format!("reference to unknown object key {key}"),
                        reader.state(),
                    ));
                }
                value = Some(Value::Ref(key));
            }
            FIELD_NEW_OBJECT_KEY => new_object_key = reader.read_int32()?,
            FIELD_EXISTING_TYPE_KEY => {
                let key = reader.read_int32()?;
                resolved_type = Some(reader.graph().type_key(key).ok_or_else(|| {
                    Error::invalid_data(
                        format!("reference to unknown type key {key}"),
                        reader.state(),
                    )
                })?);
            }
            FIELD_NEW_TYPE_KEY => new_type_key = reader.read_int32()?,
            FIELD_TYPE_NAME => {
                let name = reader.read_string()?;
                resolved_type = Some(reader.model().find(&name).ok_or_else(|| {
                    Error::UnresolvableDynamicType {
                        name: name.to_string(),
                    }
                })?);
            }
            FIELD_OBJECT => {
                let was_null = value.is_none();
                // Strings get their key registered after the read; there is
                // no partially constructed string to trap. The existing slot
                // value (even a default string) is simply replaced.
                let late_set = resolved_type.is_none()
                    && matches!(value, None | Some(Value::String(_)))
                    && reader.wire_type() == Some(WireType::String);
                if new_object_key >= 0 && !late_set {
                    match &value {
                        None => reader.trap_next_object(new_object_key),
                        Some(v) => reader.fill_object(new_object_key, v.clone()),
                    }
                    if new_type_key >= 0 {
                        if let Some(tk) = resolved_type {
                            reader.register_type(new_type_key, tk);
                        }
                    }
                }
                if late_set {
                    let text = Value::String(reader.read_string()?);
                    if new_object_key >= 0 {
                        reader.fill_object(new_object_key, text.clone());
                        if new_type_key >= 0 {
                            if let Some(tk) = resolved_type {
                                reader.register_type(new_type_key, tk);
                            }
                        }
                    }
                    value = Some(text);
                } else {
                    let tk = resolved_type.ok_or_else(|| {
                        Error::invalid_data(
                            "tracked object payload with no type information",
                            reader.state(),
                        )
                    })?;
                    let old_uid = if was_null {
                        None
                    } else {
                        value.as_ref().and_then(uid_of)
                    };
                    let decoded =
                        crate::codec::record::read_typed_object(reader, value.take(), tk)?;
                    if new_object_key >= 0 {
                        let noted_uid = if was_null {
                            reader.graph().object(new_object_key).and_then(uid_of)
                        } else {
                            old_uid
                        };
                        if let (Some(before), Some(after)) = (noted_uid, uid_of(&decoded)) {
                            if before != after {
                                return Err(Error::ReferenceIdentityViolation(reader.state()));
                            }
                        }
                        // Re-register the fully merged object.
                        reader.fill_object(new_object_key, decoded.clone());
                    }
                    value = Some(decoded);
                }
            }
            _ => reader.skip_field()?,
        }
    }
    if new_object_key >= 0 && options & net_object_options::AS_REFERENCE == 0 {
        return Err(Error::invalid_data(
            "object key in input stream, but reference-tracking was not expected",
            reader.state(),
        ));
    }
    if new_object_key < 0 && new_type_key >= 0 {
        if let Some(tk) = resolved_type {
            reader.register_type(new_type_key, tk);
        }
    }
    reader.end_sub_item(token)?;
    value.ok_or_else(|| {
        Error::invalid_data("tracked object envelope carried no value", reader.state())
    })
}
