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

//! Repeated-member decorator.

use super::Codec;
use crate::error::Error;
use crate::reader::WireReader;
use crate::types::WireType;
use crate::value::Value;

/// Decodes a repeated member, either as successive fields carrying the same
/// number or as one packed length-prefixed run.
pub struct ListCodec {
    pub(crate) item: std::sync::Arc<dyn Codec>,
    pub(crate) item_wire: WireType,
    pub(crate) field_number: u32,
    /// Whether a length-delimited payload is a packed run of items.
    pub(crate) packed: bool,
    /// Append to an existing list instead of replacing it.
    pub(crate) append: bool,
}

impl Codec for ListCodec {
    fn requires_existing_value(&self) -> bool {
        self.append
    }

    fn read(&self, existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        let mut items = match existing {
            Some(Value::List(v)) if self.append => v,
            _ => Vec::new(),
        };
        if self.packed && reader.wire_type() == Some(WireType::String) {
            let token = reader.start_sub_item()?;
            while reader.has_sub_value(self.item_wire) {
                items.push(self.item.read(None, reader)?);
            }
            reader.end_sub_item(token)?;
        } else {
            // One item per field header; consume the whole run of headers
            // carrying this member's number.
            loop {
                reader.hint(self.item_wire);
                items.push(self.item.read(None, reader)?);
                if !reader.try_read_field_header(self.field_number)? {
                    break;
                }
            }
        }
        Ok(Value::List(items))
    }
}
