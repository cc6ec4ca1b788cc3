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

//! Scalar codecs. Each reads one value at the reader's pending wire type.

use super::Codec;
use crate::bcl;
use crate::error::Error;
use crate::reader::WireReader;
use crate::value::Value;

macro_rules! scalar_codec {
    ($(#[$doc:meta])* $name:ident, $read:ident, $variant:ident) => {
        $(#[$doc])*
        pub struct $name;

        impl Codec for $name {
            fn read(
                &self,
                _existing: Option<Value>,
                reader: &mut WireReader,
            ) -> Result<Value, Error> {
                Ok(Value::$variant(reader.$read()?))
            }
        }
    };
}

scalar_codec!(BoolCodec, read_bool, Bool);
scalar_codec!(Int8Codec, read_int8, Int8);
scalar_codec!(UInt8Codec, read_uint8, UInt8);
scalar_codec!(Int16Codec, read_int16, Int16);
scalar_codec!(UInt16Codec, read_uint16, UInt16);
scalar_codec!(Int32Codec, read_int32, Int32);
scalar_codec!(UInt32Codec, read_uint32, UInt32);
scalar_codec!(Int64Codec, read_int64, Int64);
scalar_codec!(UInt64Codec, read_uint64, UInt64);
scalar_codec!(F32Codec, read_single, F32);
scalar_codec!(F64Codec, read_double, F64);
scalar_codec!(StringCodec, read_string, String);

/// Length-delimited blob; appends to the existing value on merge.
pub struct BytesCodec;

impl Codec for BytesCodec {
    fn requires_existing_value(&self) -> bool {
        true
    }

    fn read(&self, existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        let base = match existing {
            Some(Value::Bytes(b)) => b,
            _ => Vec::new(),
        };
        Ok(Value::Bytes(reader.append_bytes(base)?))
    }
}

pub struct DecimalCodec;

impl Codec for DecimalCodec {
    fn read(&self, _existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        Ok(Value::Decimal(bcl::read_decimal(reader)?))
    }
}

pub struct DateTimeCodec;

impl Codec for DateTimeCodec {
    fn read(&self, _existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        Ok(Value::DateTime(bcl::read_datetime(reader)?))
    }
}

pub struct DurationCodec;

impl Codec for DurationCodec {
    fn read(&self, _existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        Ok(Value::Duration(bcl::read_duration(reader)?))
    }
}

pub struct GuidCodec;

impl Codec for GuidCodec {
    fn read(&self, _existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        Ok(Value::Guid(bcl::read_guid(reader)?))
    }
}

/// Varint enum restricted to its declared wire values. An empty value list
/// accepts anything.
pub struct EnumCodec {
    pub(crate) values: Vec<i64>,
}

impl Codec for EnumCodec {
    fn read(&self, _existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        let value = reader.read_int64()?;
        if !self.values.is_empty() && !self.values.contains(&value) {
            return Err(Error::UnknownEnumWireValue {
                value,
                state: reader.state(),
            });
        }
        Ok(Value::Enum(value))
    }
}
