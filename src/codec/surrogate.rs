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

//! Surrogate decorator: convert in, delegate, convert out.

use super::Codec;
use crate::error::Error;
use crate::reader::WireReader;
use crate::value::Value;
use std::sync::Arc;

/// Decodes a member through its wire stand-in: the existing value is
/// converted into the encoded representation, the tail merges the stream
/// into that, and the result is converted back.
pub struct SurrogateCodec {
    pub(crate) into_encoded: Arc<dyn Fn(Value) -> Result<Value, Error> + Send + Sync>,
    pub(crate) from_encoded: Arc<dyn Fn(Value) -> Result<Value, Error> + Send + Sync>,
    pub(crate) tail: Arc<dyn Codec>,
}

impl Codec for SurrogateCodec {
    fn requires_existing_value(&self) -> bool {
        true
    }

    fn read(&self, existing: Option<Value>, reader: &mut WireReader) -> Result<Value, Error> {
        let encoded = match existing {
            Some(value) => {
                let converted = (self.into_encoded)(value)?;
                if converted.is_null() {
                    None
                } else {
                    Some(converted)
                }
            }
            None => None,
        };
        let decoded = self.tail.read(encoded, reader)?;
        (self.from_encoded)(decoded)
    }
}
