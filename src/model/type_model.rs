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

//! The type model: registration, plan storage and decode entry points.

use crate::buffer::{BufferPool, DEFAULT_BUFFER_CAPACITY};
use crate::error::Error;
use crate::model::field_plan::{self, TypeDescriptor, TypePlan};
use crate::reader::{ObjectGraph, WireReader};
use crate::source::{ByteSource, SliceSource};
use crate::types::TypeKey;
use crate::value::Value;
use anyhow::anyhow;
use std::collections::HashMap;

pub(crate) struct TypeEntry {
    pub name: String,
    pub plan: TypePlan,
}

/// Registry of message types and their compiled decode plans.
///
/// Registration is append-only and takes `&mut self`; decoding takes
/// `&self`, so a populated model can be shared across threads and reused
/// for any number of decodes.
pub struct TypeModel {
    pub(crate) entries: Vec<TypeEntry>,
    pub(crate) by_name: HashMap<String, TypeKey>,
    pool: BufferPool,
    intern_strings: bool,
    track_references: bool,
    store_extension_data: bool,
}

impl TypeModel {
    pub fn new() -> TypeModel {
        TypeModel {
            entries: Vec::new(),
            by_name: HashMap::new(),
            pool: BufferPool::new(DEFAULT_BUFFER_CAPACITY),
            intern_strings: true,
            track_references: true,
            store_extension_data: false,
        }
    }

    /// Share one allocation for repeated string values within a decode.
    pub fn intern_strings(mut self, enabled: bool) -> TypeModel {
        self.intern_strings = enabled;
        self
    }

    /// Allow reference-tracked object envelopes to carry object keys.
    pub fn track_references(mut self, enabled: bool) -> TypeModel {
        self.track_references = enabled;
        self
    }

    /// Keep unknown fields on records instead of discarding them.
    pub fn store_extension_data(mut self, enabled: bool) -> TypeModel {
        self.store_extension_data = enabled;
        self
    }

    /// Capacity of pooled scratch buffers.
    pub fn buffer_capacity(mut self, capacity: usize) -> TypeModel {
        self.pool = BufferPool::new(capacity);
        self
    }

    pub(crate) fn interns_strings(&self) -> bool {
        self.intern_strings
    }

    pub(crate) fn tracks_references(&self) -> bool {
        self.track_references
    }

    pub(crate) fn stores_extension_data(&self) -> bool {
        self.store_extension_data
    }

    pub(crate) fn release_buffer(&self, storage: Vec<u8>) {
        self.pool.release(storage);
    }

    /// Compiles and registers a type, returning its key. Type names are
    /// unique within a model.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<TypeKey, Error> {
        if self.by_name.contains_key(&descriptor.name) {
            return Err(anyhow!("type `{}` is already registered", descriptor.name).into());
        }
        let plan = field_plan::build_plan(&descriptor)?;
        let key = TypeKey(self.entries.len() as u32);
        log::debug!(
            "registered `{}` with {} members",
            descriptor.name,
            plan.members.len()
        );
        self.by_name.insert(descriptor.name.clone(), key);
        self.entries.push(TypeEntry {
            name: descriptor.name,
            plan,
        });
        Ok(key)
    }

    pub fn find(&self, name: &str) -> Option<TypeKey> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, key: TypeKey) -> Option<&str> {
        self.entries.get(key.index()).map(|e| e.name.as_str())
    }

    pub(crate) fn plan(&self, key: TypeKey) -> Result<&TypePlan, Error> {
        self.entries
            .get(key.index())
            .map(|e| &e.plan)
            .ok_or_else(|| Error::UnresolvableDynamicType {
                name: format!("#{}", key.index()),
            })
    }

    /// Creates a standalone wire reader over the source, for callers that
    /// drive field-level decoding directly.
    pub fn reader<'a>(&'a self, source: &'a mut dyn ByteSource) -> WireReader<'a> {
        WireReader::new(source, self, self.pool.acquire(), None)
    }

    /// Like [`reader`](TypeModel::reader), treating at most `limit` bytes
    /// of the source as payload.
    pub fn reader_bounded<'a>(
        &'a self,
        source: &'a mut dyn ByteSource,
        limit: u64,
    ) -> WireReader<'a> {
        WireReader::new(source, self, self.pool.acquire(), Some(limit))
    }

    /// Decodes one message of the given type from the source.
    pub fn decode(&self, source: &mut dyn ByteSource, key: TypeKey) -> Result<Decoded, Error> {
        self.run(source, key, None, None)
    }

    /// Decodes, treating at most `limit` bytes of the source as payload.
    pub fn decode_bounded(
        &self,
        source: &mut dyn ByteSource,
        key: TypeKey,
        limit: u64,
    ) -> Result<Decoded, Error> {
        self.run(source, key, None, Some(limit))
    }

    /// Applies the stream on top of an existing value instead of starting
    /// from a fresh instance.
    pub fn merge(
        &self,
        source: &mut dyn ByteSource,
        key: TypeKey,
        existing: Value,
    ) -> Result<Decoded, Error> {
        self.run(source, key, Some(existing), None)
    }

    pub fn decode_from_slice(&self, data: &[u8], key: TypeKey) -> Result<Decoded, Error> {
        let mut source = SliceSource::new(data);
        self.run(&mut source, key, None, Some(data.len() as u64))
    }

    fn run(
        &self,
        source: &mut dyn ByteSource,
        key: TypeKey,
        existing: Option<Value>,
        bounded: Option<u64>,
    ) -> Result<Decoded, Error> {
        log::trace!("decode start: `{}`", self.name(key).unwrap_or("?"));
        let storage = self.pool.acquire();
        let mut reader = WireReader::new(source, self, storage, bounded);
        let root = crate::codec::record::read_record(&mut reader, existing, key)?;
        reader.set_root_object(&root);
        let graph = reader.take_graph();
        Ok(Decoded { root, graph })
    }
}

impl Default for TypeModel {
    fn default() -> TypeModel {
        TypeModel::new()
    }
}

/// The result of one decode: the root value plus the session object graph
/// needed to follow `Value::Ref` back-references.
#[derive(Debug)]
pub struct Decoded {
    pub root: Value,
    pub graph: ObjectGraph,
}

static NULL: Value = Value::Null;

impl Decoded {
    /// Follows a `Ref` into the session graph; other values pass through.
    pub fn resolve<'v>(&'v self, value: &'v Value) -> &'v Value {
        match value {
            Value::Ref(key) => self.graph.object(*key).unwrap_or(&NULL),
            other => other,
        }
    }
}
