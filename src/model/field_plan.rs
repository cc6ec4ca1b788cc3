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

//! Type descriptors and their compilation into decode plans.
//!
//! A [`TypeDescriptor`] is the caller-facing declaration of a message type.
//! Registration compiles it once into a [`TypePlan`]: members sorted by
//! field number, each carrying a ready codec chain. Plans are immutable
//! after compilation.

use crate::codec::member::MemberCodec;
use crate::error::Error;
use crate::types::WireType;
use crate::value::{Record, Value};
use anyhow::anyhow;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Logical type of a declared member.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberType {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    F32,
    F64,
    Decimal,
    String,
    Bytes,
    DateTime,
    Duration,
    Guid,
    /// Enum with its permitted wire values; an empty list accepts any value.
    Enum(Vec<i64>),
    /// Nested message, referencing a registered type by name. Resolved
    /// lazily at decode time so self-referential types work.
    Message(String),
    /// Repeated member. One level only.
    List(Box<MemberType>),
}

/// On-wire representation tweak for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    Default,
    /// Fixed-width little-endian instead of varint; raw ticks for date/time.
    FixedSize,
    /// Zig-zag varint for signed integers.
    ZigZag,
    /// Group framing instead of a length prefix, for message members.
    Group,
}

/// How a decoded value is converted when the wire carries a stand-in
/// representation for the declared member.
pub struct Surrogate {
    /// The representation actually present on the wire.
    pub encoded_as: MemberType,
    /// Converts an existing member value into the wire representation so a
    /// merge can apply to it.
    pub into_encoded: Arc<dyn Fn(Value) -> Result<Value, Error> + Send + Sync>,
    /// Converts the decoded wire representation into the member value.
    pub from_encoded: Arc<dyn Fn(Value) -> Result<Value, Error> + Send + Sync>,
}

/// How instances of a type come into being during decode.
#[derive(Clone, Default)]
pub enum ConstructPolicy {
    /// Members start at their type defaults.
    #[default]
    Constructor,
    /// Members start as `Null`, skipping defaults.
    Bypass,
    /// Caller-supplied factory producing the initial member values.
    Factory(Arc<dyn Fn() -> Vec<Value> + Send + Sync>),
    /// The type cannot be instantiated; decoding it without an existing
    /// value fails.
    Unavailable,
}

/// Hook invoked on a record before or after its fields are read.
pub type Callback = Arc<dyn Fn(&mut Record) + Send + Sync>;

/// Declaration of one member of a message type.
pub struct MemberDef {
    pub name: String,
    pub alias: Option<String>,
    /// Explicit field number; `None` continues from the previous member.
    pub field_number: Option<u32>,
    pub member_type: MemberType,
    pub data_format: DataFormat,
    /// Repeated members replace the existing list instead of appending.
    pub overwrite_list: bool,
    /// Repeated members may arrive as one length-prefixed packed run.
    pub packed: bool,
    pub surrogate: Option<Surrogate>,
    /// Decode the member through a reference-tracked object envelope with
    /// these option flags (see [`crate::bcl::net_object_options`]).
    pub net_object: Option<u8>,
}

impl MemberDef {
    pub fn new(name: impl Into<String>, member_type: MemberType) -> MemberDef {
        MemberDef {
            name: name.into(),
            alias: None,
            field_number: None,
            member_type,
            data_format: DataFormat::Default,
            overwrite_list: false,
            packed: false,
            surrogate: None,
            net_object: None,
        }
    }

    pub fn field_number(mut self, number: u32) -> MemberDef {
        self.field_number = Some(number);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> MemberDef {
        self.alias = Some(alias.into());
        self
    }

    pub fn format(mut self, format: DataFormat) -> MemberDef {
        self.data_format = format;
        self
    }

    pub fn overwrite_list(mut self) -> MemberDef {
        self.overwrite_list = true;
        self
    }

    pub fn packed(mut self) -> MemberDef {
        self.packed = true;
        self
    }

    pub fn surrogate(mut self, surrogate: Surrogate) -> MemberDef {
        self.surrogate = Some(surrogate);
        self
    }

    pub fn net_object(mut self, options: u8) -> MemberDef {
        self.net_object = Some(options);
        self
    }
}

/// Caller-facing declaration of a message type, built up fluently and
/// handed to [`TypeModel::register`](crate::model::TypeModel::register).
pub struct TypeDescriptor {
    pub(crate) name: String,
    pub(crate) members: Vec<MemberDef>,
    pub(crate) construct: ConstructPolicy,
    pub(crate) subtypes: Vec<(u32, String)>,
    pub(crate) before: Option<Callback>,
    pub(crate) after: Option<Callback>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> TypeDescriptor {
        TypeDescriptor {
            name: name.into(),
            members: Vec::new(),
            construct: ConstructPolicy::default(),
            subtypes: Vec::new(),
            before: None,
            after: None,
        }
    }

    /// Adds a member with the next implicit field number.
    pub fn member(mut self, name: impl Into<String>, member_type: MemberType) -> TypeDescriptor {
        self.members.push(MemberDef::new(name, member_type));
        self
    }

    /// Adds a fully configured member.
    pub fn member_def(mut self, def: MemberDef) -> TypeDescriptor {
        self.members.push(def);
        self
    }

    pub fn construct(mut self, policy: ConstructPolicy) -> TypeDescriptor {
        self.construct = policy;
        self
    }

    /// Declares a more specific type reachable through the given field
    /// number. The subtype's descriptor must declare this type's members
    /// first, in the same order, before its own.
    pub fn subtype(mut self, field_number: u32, type_name: impl Into<String>) -> TypeDescriptor {
        self.subtypes.push((field_number, type_name.into()));
        self
    }

    pub fn before_deserialize(mut self, callback: Callback) -> TypeDescriptor {
        self.before = Some(callback);
        self
    }

    pub fn after_deserialize(mut self, callback: Callback) -> TypeDescriptor {
        self.after = Some(callback);
        self
    }
}

/// One compiled member: its dispatch metadata plus the codec chain.
pub(crate) struct MemberPlan {
    pub name: String,
    pub alias: Option<String>,
    pub codec: MemberCodec,
}

impl MemberPlan {
    /// Case-insensitive match against an external column label.
    pub(crate) fn matches_label(&self, label: &str) -> bool {
        let target = self.alias.as_deref().unwrap_or(&self.name);
        target.eq_ignore_ascii_case(label)
    }
}

/// The compiled, immutable decode plan of one registered type.
pub(crate) struct TypePlan {
    /// Members sorted by ascending field number.
    pub members: Vec<MemberPlan>,
    /// Initial member values by slot index (declaration order).
    pub defaults: Vec<Value>,
    pub construct: ConstructPolicy,
    pub subtypes: Vec<(u32, String)>,
    pub before: Option<Callback>,
    pub after: Option<Callback>,
}

impl TypePlan {
    pub(crate) fn subtype_for_field(&self, field: u32) -> Option<&str> {
        self.subtypes
            .iter()
            .find(|(n, _)| *n == field)
            .map(|(_, name)| name.as_str())
    }
}

/// Infers the wire type a member is framed with, given its declared
/// representation tweak.
pub(crate) fn wire_for(member: &MemberType, format: DataFormat) -> WireType {
    match member {
        MemberType::Bool | MemberType::Int8 | MemberType::UInt8 => WireType::Fixed8,
        MemberType::Int16 | MemberType::UInt16 => match format {
            DataFormat::FixedSize => WireType::Fixed16,
            _ => WireType::Varint,
        },
        MemberType::Int32 | MemberType::Int64 => match format {
            DataFormat::FixedSize => {
                if matches!(member, MemberType::Int32) {
                    WireType::Fixed32
                } else {
                    WireType::Fixed64
                }
            }
            DataFormat::ZigZag => WireType::SignedVarint,
            _ => WireType::Varint,
        },
        MemberType::UInt32 => match format {
            DataFormat::FixedSize => WireType::Fixed32,
            _ => WireType::Varint,
        },
        MemberType::UInt64 => match format {
            DataFormat::FixedSize => WireType::Fixed64,
            _ => WireType::Varint,
        },
        MemberType::F32 => WireType::Fixed32,
        MemberType::F64 => WireType::Fixed64,
        MemberType::Enum(_) => WireType::Varint,
        MemberType::DateTime => match format {
            DataFormat::FixedSize => WireType::Fixed64,
            _ => WireType::String,
        },
        MemberType::Decimal
        | MemberType::String
        | MemberType::Bytes
        | MemberType::Duration
        | MemberType::Guid => WireType::String,
        MemberType::Message(_) => match format {
            DataFormat::Group => WireType::StartGroup,
            _ => WireType::String,
        },
        MemberType::List(item) => wire_for(item, format),
    }
}

/// The value a member starts at under the `Constructor` policy.
pub(crate) fn default_value(member: &MemberType) -> Value {
    match member {
        MemberType::Bool => Value::Bool(false),
        MemberType::Int8 => Value::Int8(0),
        MemberType::UInt8 => Value::UInt8(0),
        MemberType::Int16 => Value::Int16(0),
        MemberType::UInt16 => Value::UInt16(0),
        MemberType::Int32 => Value::Int32(0),
        MemberType::UInt32 => Value::UInt32(0),
        MemberType::Int64 => Value::Int64(0),
        MemberType::UInt64 => Value::UInt64(0),
        MemberType::F32 => Value::F32(0.0),
        MemberType::F64 => Value::F64(0.0),
        MemberType::Decimal => Value::Decimal(crate::value::Decimal::ZERO),
        MemberType::String => Value::String(Arc::from("")),
        MemberType::Bytes => Value::Bytes(Vec::new()),
        MemberType::DateTime => Value::DateTime(DateTime::<Utc>::UNIX_EPOCH.naive_utc()),
        MemberType::Duration => Value::Duration(TimeDelta::zero()),
        MemberType::Guid => Value::Guid(Uuid::nil()),
        MemberType::Enum(values) => Value::Enum(values.first().copied().unwrap_or(0)),
        MemberType::Message(_) => Value::Null,
        MemberType::List(_) => Value::List(Vec::new()),
    }
}

/// Compiles a descriptor into its plan: resolves field numbers, checks for
/// collisions and unsupported shapes, builds each member's codec chain.
pub(crate) fn build_plan(desc: &TypeDescriptor) -> Result<TypePlan, Error> {
    let mut seen = HashSet::new();
    let mut next_number = 1u32;
    let mut members = Vec::with_capacity(desc.members.len());
    let mut defaults = Vec::with_capacity(desc.members.len());

    for (index, def) in desc.members.iter().enumerate() {
        let number = def.field_number.unwrap_or(next_number);
        if number == 0 {
            return Err(anyhow!(
                "member `{}` of `{}` declares field-number 0",
                def.name,
                desc.name
            )
            .into());
        }
        next_number = number + 1;
        if !seen.insert(number) {
            return Err(Error::DuplicateFieldNumber {
                number,
                type_name: desc.name.clone(),
            });
        }
        if let Some((sub_number, _)) = desc.subtypes.iter().find(|(n, _)| *n == number) {
            return Err(Error::DuplicateFieldNumber {
                number: *sub_number,
                type_name: desc.name.clone(),
            });
        }
        let codec = crate::codec::for_member(def, number, index)?;
        defaults.push(default_value(&def.member_type));
        members.push(MemberPlan {
            name: def.name.clone(),
            alias: def.alias.clone(),
            codec,
        });
    }
    members.sort_by_key(|m| m.codec.field_number);

    Ok(TypePlan {
        members,
        defaults,
        construct: desc.construct.clone(),
        subtypes: desc.subtypes.clone(),
        before: desc.before.clone(),
        after: desc.after.clone(),
    })
}
