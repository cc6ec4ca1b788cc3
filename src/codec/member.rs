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

//! Routing of decoded values into record slots.
//!
//! This is also where member presence is recorded: every successful member
//! read flips the record's "specified" flag for that slot, so callers can
//! distinguish wire-supplied values from defaults.

use super::Codec;
use crate::error::Error;
use crate::reader::WireReader;
use crate::types::WireType;
use crate::value::{Record, Value};
use std::sync::Arc;

/// Terminal link of a member's codec chain: hints the declared wire type,
/// runs the tail and stores the result in `record.fields[index]`.
#[derive(Clone)]
pub struct MemberCodec {
    pub(crate) index: usize,
    pub(crate) field_number: u32,
    pub(crate) wire: WireType,
    pub(crate) tail: Arc<dyn Codec>,
}

impl MemberCodec {
    pub(crate) fn read_into(
        &self,
        record: &mut Record,
        reader: &mut WireReader,
    ) -> Result<(), Error> {
        reader.hint(self.wire);
        let existing = if self.tail.requires_existing_value() {
            let current = std::mem::replace(&mut record.fields[self.index], Value::Null);
            if current.is_null() {
                None
            } else {
                Some(current)
            }
        } else {
            None
        };
        let value = self.tail.read(existing, reader)?;
        if self.tail.produces_replacement_value() {
            record.fields[self.index] = value;
        }
        record.specified[self.index] = true;
        Ok(())
    }
}
