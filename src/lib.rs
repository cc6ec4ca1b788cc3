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

//! # protoread
//!
//! A streaming decoder for the protocol-buffer family of wire formats:
//! length-delimited, tag-based binary data is decoded into dynamically typed
//! object graphs driven by a registered type model.
//!
//! ## Architecture
//!
//! - **`buffer`**: pooled scratch buffer with refill, lookahead and varint parsing
//! - **`source`**: the [`source::ByteSource`] abstraction over caller-owned streams
//! - **`reader`**: [`reader::WireReader`], the stateful wire-level field cursor
//! - **`bcl`**: composite scalar decoders (decimal, guid, date/time, tracked objects)
//! - **`model`**: [`model::TypeModel`], type registration, field plans and decode entry points
//! - **`codec`**: composable per-field decoders (primitives, lists, surrogates, records)
//! - **`value`**: the [`value::Value`] dynamic object model produced by a decode
//! - **`error`**: the failure taxonomy, with wire-position diagnostics attached
//!
//! ## Usage
//!
//! ```
//! use protoread::model::{MemberType, TypeDescriptor, TypeModel};
//! use protoread::value::Value;
//!
//! let mut model = TypeModel::new();
//! let point = model
//!     .register(
//!         TypeDescriptor::new("Point")
//!             .member("x", MemberType::Int32)
//!             .member("y", MemberType::Int32),
//!     )
//!     .unwrap();
//!
//! // field 1 = 3, field 2 = 150
//! let decoded = model.decode_from_slice(&[0x08, 0x03, 0x10, 0x96, 0x01], point).unwrap();
//! let record = decoded.root.as_record().unwrap();
//! assert_eq!(record.fields[0], Value::Int32(3));
//! assert_eq!(record.fields[1], Value::Int32(150));
//! ```
//!
//! Decoding is read-only by design: there is no encoder in this crate. The
//! reader never takes ownership of the byte source and never closes it.

pub mod bcl;
pub mod buffer;
pub mod codec;
pub mod error;
pub mod model;
pub mod reader;
pub mod source;
pub mod types;
pub mod value;

pub use error::Error;
pub use model::TypeModel;
pub use value::Value;

/// Early-return with the given error when the condition does not hold.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
