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

//! Composable per-field decoders.
//!
//! Every member of a registered type compiles to a chain of [`Codec`]s:
//! a scalar or message codec at the core, optionally wrapped by list and
//! surrogate decorators, routed into its record slot by a
//! [`member::MemberCodec`]. Chains are built once at registration and
//! shared across decodes.

pub mod list;
pub mod member;
pub mod primitive;
pub mod record;
pub mod surrogate;

use crate::error::Error;
use crate::model::field_plan::{wire_for, MemberDef, MemberType};
use crate::reader::WireReader;
use crate::value::Value;
use anyhow::anyhow;
use std::sync::Arc;

/// One link in a member's decode chain.
pub trait Codec: Send + Sync {
    /// Whether [`read`](Codec::read) wants the member's current value so it
    /// can merge into it (lists that append, nested messages, blobs).
    fn requires_existing_value(&self) -> bool {
        false
    }

    /// Whether the value returned by [`read`](Codec::read) replaces the
    /// member slot.
    fn produces_replacement_value(&self) -> bool {
        true
    }

    fn read(&self, existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error>;
}

/// Builds the full codec chain for one declared member.
pub(crate) fn for_member(
    def: &MemberDef,
    field_number: u32,
    index: usize,
) -> Result<member::MemberCodec, Error> {
    let (wire, tail) = if let Some(surrogate) = &def.surrogate {
        let wire = wire_for(&surrogate.encoded_as, def.data_format);
        let inner = scalar_codec(&surrogate.encoded_as)?;
        let tail: Arc<dyn Codec> = Arc::new(surrogate::SurrogateCodec {
            into_encoded: surrogate.into_encoded.clone(),
            from_encoded: surrogate.from_encoded.clone(),
            tail: inner,
        });
        (wire, tail)
    } else if let Some(options) = def.net_object {
        let type_name = match &def.member_type {
            MemberType::Message(name) => Some(name.clone()),
            MemberType::String => None,
            _ => {
                return Err(anyhow!(
                    "member `{}`: reference tracking applies to message and string members",
                    def.name
                )
                .into())
            }
        };
        let tail: Arc<dyn Codec> = Arc::new(record::NetObjectCodec { options, type_name });
        (crate::types::WireType::String, tail)
    } else if let MemberType::List(item) = &def.member_type {
        if matches!(**item, MemberType::List(_)) {
            return Err(Error::NestedCollectionsNotSupported);
        }
        let item_wire = wire_for(item, def.data_format);
        if def.packed && item_wire.base() == 2 {
            return Err(anyhow!(
                "member `{}`: packed encoding requires fixed or varint items",
                def.name
            )
            .into());
        }
        let tail: Arc<dyn Codec> = Arc::new(list::ListCodec {
            item: scalar_codec(item)?,
            item_wire,
            field_number,
            packed: def.packed,
            append: !def.overwrite_list,
        });
        (item_wire, tail)
    } else {
        let wire = wire_for(&def.member_type, def.data_format);
        (wire, scalar_codec(&def.member_type)?)
    };
    Ok(member::MemberCodec {
        index,
        field_number,
        wire,
        tail,
    })
}

fn scalar_codec(member: &MemberType) -> Result<Arc<dyn Codec>, Error> {
    use primitive::*;
    Ok(match member {
        MemberType::Bool => Arc::new(BoolCodec),
        MemberType::Int8 => Arc::new(Int8Codec),
        MemberType::UInt8 => Arc::new(UInt8Codec),
        MemberType::Int16 => Arc::new(Int16Codec),
        MemberType::UInt16 => Arc::new(UInt16Codec),
        MemberType::Int32 => Arc::new(Int32Codec),
        MemberType::UInt32 => Arc::new(UInt32Codec),
        MemberType::Int64 => Arc::new(Int64Codec),
        MemberType::UInt64 => Arc::new(UInt64Codec),
        MemberType::F32 => Arc::new(F32Codec),
        MemberType::F64 => Arc::new(F64Codec),
        MemberType::Decimal => Arc::new(DecimalCodec),
        MemberType::String => Arc::new(StringCodec),
        MemberType::Bytes => Arc::new(BytesCodec),
        MemberType::DateTime => Arc::new(DateTimeCodec),
        MemberType::Duration => Arc::new(DurationCodec),
        MemberType::Guid => Arc::new(GuidCodec),
        MemberType::Enum(values) => Arc::new(EnumCodec {
            values: values.clone(),
        }),
        MemberType::Message(name) => Arc::new(record::MessageCodec {
            type_name: name.clone(),
        }),
        MemberType::List(_) => return Err(Error::NestedCollectionsNotSupported),
    })
}
