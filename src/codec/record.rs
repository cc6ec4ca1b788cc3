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

//! The composite-type codec: field dispatch, instance construction,
//! callbacks and single-level polymorphism.

use super::Codec;
use crate::bcl;
use crate::error::Error;
use crate::model::field_plan::ConstructPolicy;
use crate::model::TypeModel;
use crate::reader::WireReader;
use crate::types::{TypeKey, WireType};
use crate::value::{ExtensionField, ExtensionPayload, Record, Value};
use anyhow::anyhow;

/// Nested-message codec; resolves its target type lazily by name so
/// self-referential registrations work.
pub struct MessageCodec {
    pub(crate) type_name: String,
}

impl Codec for MessageCodec {
    fn requires_existing_value(&self) -> bool {
        true
    }

    fn read(&self, existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        let key = reader.model().find(&self.type_name).ok_or_else(|| {
            Error::UnresolvableDynamicType {
                name: self.type_name.clone(),
            }
        })?;
        read_typed_object(reader, existing, key)
    }
}

/// Member codec that decodes through a reference-tracked envelope.
pub struct NetObjectCodec {
    pub(crate) options: u8,
    /// Declared payload type; `None` leaves the type to the stream (or to
    /// the string late-set path).
    pub(crate) type_name: Option<String>,
}

impl Codec for NetObjectCodec {
    fn requires_existing_value(&self) -> bool {
        true
    }

    fn read(&self, existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        let key = match &self.type_name {
            Some(name) => Some(reader.model().find(name).ok_or_else(|| {
                Error::UnresolvableDynamicType { name: name.clone() }
            })?),
            None => None,
        };
        let mut options = self.options;
        if !reader.model().tracks_references() {
            options &= !bcl::net_object_options::AS_REFERENCE;
        }
        bcl::read_net_object(reader, existing, key, options)
    }
}

/// Decodes one framed message: sub-item in, record loop, sub-item out.
pub(crate) fn read_typed_object(
    reader: &mut WireReader,
    existing: Option<Value>,
    key: TypeKey,
) -> Result<Value, Error> {
    let token = reader.start_sub_item()?;
    let value = read_record(reader, existing, key)?;
    reader.end_sub_item(token)?;
    Ok(value)
}

/// The field dispatch loop for one message level.
///
/// Instances are created lazily on the first field; members resume their
/// table lookup at the previously matched entry, so in-order streams match
/// in constant time. Unknown fields are skipped or, when the model keeps
/// extension data, preserved on the record.
pub(crate) fn read_record(
    reader: &mut WireReader,
    existing: Option<Value>,
    key: TypeKey,
) -> Result<Value, Error> {
    read_record_inner(reader, existing, key, true)
}

fn read_record_inner(
    reader: &mut WireReader,
    existing: Option<Value>,
    key: TypeKey,
    fire_after: bool,
) -> Result<Value, Error> {
    let model = reader.model();
    let plan = model.plan(key)?;
    let store_extensions = model.stores_extension_data();

    let mut record = match existing {
        Some(Value::Record(r)) => Some(r),
        Some(Value::Null) | None => None,
        Some(_) => {
            return Err(Error::invalid_data(
                "existing value is not a record of the expected type",
                reader.state(),
            ))
        }
    };

    let mut last_field = 0u32;
    let mut last_index = 0usize;
    loop {
        let field = reader.read_field_header()?;
        if field == 0 {
            break;
        }

        if let Some(subtype_name) = plan.subtype_for_field(field) {
            let derived = model.find(subtype_name).ok_or_else(|| {
                Error::UnresolvableDynamicType {
                    name: subtype_name.to_string(),
                }
            })?;
            let retyped = retype(reader, model, record.take(), derived)?;
            let token = reader.start_sub_item()?;
            let merged = read_record_inner(reader, Some(Value::Record(retyped)), derived, false)?;
            reader.end_sub_item(token)?;
            record = match merged {
                Value::Record(r) => Some(r),
                _ => None,
            };
            continue;
        }

        let mut found = None;
        let count = plan.members.len();
        if count > 0 {
            if field == last_field {
                found = Some(last_index);
            } else {
                for offset in 0..count {
                    let i = (last_index + offset) % count;
                    if plan.members[i].codec.field_number == field {
                        last_field = field;
                        last_index = i;
                        found = Some(i);
                        break;
                    }
                }
            }
        }

        if record.is_none() {
            record = Some(create_instance(reader, model, key)?);
        }
        let rec = record.as_mut().ok_or_else(|| anyhow!("record vanished mid-decode"))?;
        match found {
            Some(i) => plan.members[i].codec.read_into(rec, reader)?,
            None => {
                if store_extensions {
                    capture_extension(reader, rec)?;
                } else {
                    reader.skip_field()?;
                }
            }
        }
    }

    let mut rec = match record {
        Some(r) => r,
        None => create_instance(reader, model, key)?,
    };
    // After-callbacks dispatch on the runtime type, which may be a subtype
    // of the declared one.
    if fire_after {
        let final_plan = model.plan(rec.type_key)?;
        if let Some(callback) = &final_plan.after {
            callback(&mut rec);
        }
    }
    Ok(Value::Record(rec))
}

/// Creates an instance per the type's construction policy and notes it in
/// the identity cache if a trap is armed.
fn create_instance(
    reader: &mut WireReader,
    model: &TypeModel,
    key: TypeKey,
) -> Result<Record, Error> {
    let plan = model.plan(key)?;
    let fields = match &plan.construct {
        ConstructPolicy::Constructor => plan.defaults.clone(),
        ConstructPolicy::Bypass => vec![Value::Null; plan.defaults.len()],
        ConstructPolicy::Factory(factory) => {
            let fields = factory();
            if fields.len() != plan.defaults.len() {
                return Err(anyhow!(
                    "factory for `{}` produced {} values, expected {}",
                    model.name(key).unwrap_or("?"),
                    fields.len(),
                    plan.defaults.len()
                )
                .into());
            }
            fields
        }
        ConstructPolicy::Unavailable => {
            return Err(Error::CannotConstructType {
                type_name: model.name(key).unwrap_or("?").to_string(),
            })
        }
    };
    let mut record = Record::new(key, reader.next_uid(), fields);
    if let Some(callback) = &plan.before {
        callback(&mut record);
    }
    reader.note_object(&Value::Record(record.clone()));
    Ok(record)
}

/// Re-types a record to a more specific plan, preserving identity and the
/// base member slots (the subtype's plan declares them as a prefix).
fn retype(
    reader: &mut WireReader,
    model: &TypeModel,
    current: Option<Record>,
    derived: TypeKey,
) -> Result<Record, Error> {
    let plan = model.plan(derived)?;
    match current {
        None => create_instance(reader, model, derived),
        Some(mut record) => {
            record.type_key = derived;
            for slot in record.fields.len()..plan.defaults.len() {
                record.fields.push(plan.defaults[slot].clone());
                record.specified.push(false);
            }
            Ok(record)
        }
    }
}

fn capture_extension(reader: &mut WireReader, record: &mut Record) -> Result<(), Error> {
    let field_number = reader.field_number();
    let Some(wire_type) = reader.wire_type() else {
        return Err(Error::UnexpectedWireType(reader.state()));
    };
    let payload = match wire_type {
        WireType::Varint => ExtensionPayload::Varint(reader.read_uint64()?),
        WireType::Fixed32 => ExtensionPayload::Fixed32(reader.read_uint32()?),
        WireType::Fixed64 => ExtensionPayload::Fixed64(reader.read_uint64()?),
        WireType::String => ExtensionPayload::LengthDelimited(reader.append_bytes(Vec::new())?),
        // Group-framed unknowns are not preserved.
        _ => return reader.skip_field(),
    };
    record.extensions.push(ExtensionField {
        field_number,
        wire_type,
        payload,
    });
    Ok(())
}
