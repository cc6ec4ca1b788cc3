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

//! Decode failure taxonomy.
//!
//! Every failure aborts the current decode call; there is no partial-result
//! recovery at this layer. Errors raised while the wire reader is live carry
//! a [`ReadState`] snapshot (field number, wire type, byte offset, nesting
//! depth) for troubleshooting.

use crate::types::WireType;
use std::fmt;

/// Snapshot of the wire reader's cursor at the moment an error was raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadState {
    pub field_number: u32,
    pub wire_type: Option<WireType>,
    pub offset: u64,
    pub depth: u32,
}

impl fmt::Display for ReadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field={}; wire-type={}; offset={}; depth={}",
            self.field_number,
            match self.wire_type {
                Some(w) => w.to_string(),
                None => "none".to_string(),
            },
            self.offset,
            self.depth
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unexpected end of input ({0})")]
    UnexpectedEndOfInput(ReadState),

    #[error("invalid wire-type for the requested read ({0})")]
    UnexpectedWireType(ReadState),

    #[error("value does not fit the target representation ({0})")]
    Overflow(ReadState),

    #[error("sub-message not read entirely ({0})")]
    SubMessageNotFullyConsumed(ReadState),

    #[error("sub-message read past its declared end ({0})")]
    SubMessageOverrun(ReadState),

    #[error("wrong group was ended ({0})")]
    WrongGroupEnded(ReadState),

    #[error("duplicate field-number {number} on type `{type_name}`")]
    DuplicateFieldNumber { number: u32, type_name: String },

    #[error("no member found to receive column `{column}`")]
    UnmappableColumn { column: String },

    #[error("nested or jagged lists and arrays are not supported")]
    NestedCollectionsNotSupported,

    #[error("no way to construct an instance of `{type_name}`")]
    CannotConstructType { type_name: String },

    #[error("unable to resolve dynamic type `{name}`")]
    UnresolvableDynamicType { name: String },

    #[error("a reference-tracked object changed identity during decode ({0})")]
    ReferenceIdentityViolation(ReadState),

    #[error("no enum value is mapped to wire-value {value} ({state})")]
    UnknownEnumWireValue { value: i64, state: ReadState },

    #[error("{message} ({state})")]
    InvalidData { message: String, state: ReadState },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn invalid_data(message: impl Into<String>, state: ReadState) -> Error {
        Error::InvalidData {
            message: message.into(),
            state,
        }
    }
}
