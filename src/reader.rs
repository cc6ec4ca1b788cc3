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

//! The wire-level field cursor.
//!
//! [`WireReader`] walks a stream as a sequence of field headers and typed
//! payloads. The caller drives it: read a header, then either read the value
//! with the matching typed method, descend into a sub-item, or skip. The
//! reader tracks nesting depth, the current length-delimited block end and
//! the per-session object graph for reference-tracked decoding.

use crate::buffer::{self, ReadBuffer, Varint};
use crate::error::{Error, ReadState};
use crate::model::TypeModel;
use crate::source::ByteSource;
use crate::types::{ObjKey, TypeKey, WireType};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Graph key reserved for the root object of a decode session.
pub const ROOT_OBJECT_KEY: ObjKey = 0;

/// One slot in the per-session object graph.
#[derive(Debug, Clone)]
pub enum GraphSlot {
    /// Key announced but the object is still being decoded.
    Reserved,
    Object(crate::value::Value),
    Type(TypeKey),
}

/// Keyed objects and types seen during one decode session.
///
/// `Value::Ref` variants index into this graph; it is returned to the caller
/// alongside the root value so references stay resolvable after the decode.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    slots: HashMap<ObjKey, GraphSlot>,
}

impl ObjectGraph {
    pub fn object(&self, key: ObjKey) -> Option<&crate::value::Value> {
        match self.slots.get(&key) {
            Some(GraphSlot::Object(v)) => Some(v),
            _ => None,
        }
    }

    pub fn type_key(&self, key: ObjKey) -> Option<TypeKey> {
        match self.slots.get(&key) {
            Some(GraphSlot::Type(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn contains(&self, key: ObjKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub(crate) fn reserve(&mut self, key: ObjKey) {
        self.slots.entry(key).or_insert(GraphSlot::Reserved);
    }

    pub(crate) fn fill(&mut self, key: ObjKey, value: crate::value::Value) {
        self.slots.insert(key, GraphSlot::Object(value));
    }

    pub(crate) fn register_type(&mut self, key: ObjKey, type_key: TypeKey) {
        self.slots.insert(key, GraphSlot::Type(type_key));
    }
}

/// Token returned by [`WireReader::start_sub_item`]; hand it back to
/// [`WireReader::end_sub_item`] to validate and pop the frame.
#[derive(Debug, Clone, Copy)]
pub enum SubItemToken {
    /// A group frame; carries the opening field number.
    Group(u32),
    /// A length frame; carries the block end of the enclosing frame.
    Length(u64),
}

/// Stateful decoder over one byte stream.
pub struct WireReader<'a> {
    source: &'a mut dyn ByteSource,
    model: &'a TypeModel,
    buf: ReadBuffer,
    field_number: u32,
    wire_type: Option<WireType>,
    depth: u32,
    block_end: u64,
    graph: ObjectGraph,
    // The root object counts as one trapped note.
    trap_count: u32,
    pending_trap: Option<ObjKey>,
    interner: HashSet<Arc<str>>,
    intern_strings: bool,
    next_uid: u64,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(
        source: &'a mut dyn ByteSource,
        model: &'a TypeModel,
        storage: Vec<u8>,
        bounded: Option<u64>,
    ) -> WireReader<'a> {
        let mut buf = ReadBuffer::new(storage);
        if let Some(limit) = bounded {
            buf.set_data_remaining(limit);
        }
        WireReader {
            source,
            model,
            buf,
            field_number: 0,
            wire_type: None,
            depth: 0,
            block_end: u64::MAX,
            graph: ObjectGraph::default(),
            trap_count: 1,
            pending_trap: None,
            interner: HashSet::new(),
            intern_strings: model.interns_strings(),
            next_uid: 1,
        }
    }

    pub fn model(&self) -> &'a TypeModel {
        self.model
    }

    /// Field number of the most recent header, 0 when none is pending.
    pub fn field_number(&self) -> u32 {
        self.field_number
    }

    pub fn wire_type(&self) -> Option<WireType> {
        self.wire_type
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Logical stream offset of the next unconsumed byte.
    pub fn position(&self) -> u64 {
        self.buf.position()
    }

    /// Snapshot of the cursor for error diagnostics.
    pub fn state(&self) -> ReadState {
        ReadState {
            field_number: self.field_number,
            wire_type: self.wire_type,
            offset: self.buf.position(),
            depth: self.depth,
        }
    }

    pub(crate) fn next_uid(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    fn fill(&mut self, count: usize, strict: bool) -> Result<usize, Error> {
        match self.buf.ensure(count, strict, &mut *self.source) {
            Ok(n) => Ok(n),
            Err(Error::UnexpectedEndOfInput(_)) => {
                Err(Error::UnexpectedEndOfInput(self.state()))
            }
            Err(e) => Err(e),
        }
    }

    fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        self.fill(N, true)?;
        let mut out = [0u8; N];
        out.copy_from_slice(self.buf.view(N));
        self.buf.consume(N);
        Ok(out)
    }

    fn read_varuint32(&mut self, trim_negative: bool) -> Result<u32, Error> {
        self.fill(10, false)?;
        match buffer::peek_varuint32(self.buf.window(), trim_negative) {
            Varint::Val(v, n) => {
                self.buf.consume(n);
                Ok(v)
            }
            Varint::Overflow => Err(Error::Overflow(self.state())),
            Varint::Empty | Varint::Incomplete => {
                Err(Error::UnexpectedEndOfInput(self.state()))
            }
        }
    }

    fn read_varuint64(&mut self) -> Result<u64, Error> {
        self.fill(10, false)?;
        match buffer::peek_varuint64(self.buf.window()) {
            Varint::Val(v, n) => {
                self.buf.consume(n);
                Ok(v)
            }
            Varint::Overflow => Err(Error::Overflow(self.state())),
            Varint::Empty | Varint::Incomplete => {
                Err(Error::UnexpectedEndOfInput(self.state()))
            }
        }
    }

    /// Reads the next field header, returning its field number, or 0 when
    /// the current block or stream is exhausted. After a 0 from a group
    /// frame the pending `EndGroup` stays latched until the frame is popped
    /// with [`end_sub_item`](WireReader::end_sub_item).
    pub fn read_field_header(&mut self) -> Result<u32, Error> {
        if self.block_end <= self.buf.position() || self.wire_type == Some(WireType::EndGroup) {
            return Ok(0);
        }
        self.fill(10, false)?;
        match buffer::peek_varuint32(self.buf.window(), false) {
            Varint::Empty => {
                self.field_number = 0;
                self.wire_type = None;
                Ok(0)
            }
            Varint::Incomplete => Err(Error::UnexpectedEndOfInput(self.state())),
            Varint::Overflow => Err(Error::Overflow(self.state())),
            Varint::Val(tag, n) => {
                if tag == 0 {
                    return Err(Error::invalid_data("illegal zero tag", self.state()));
                }
                let Some(wt) = WireType::from_tag(tag) else {
                    return Err(Error::invalid_data(
                        format!("unexpected wire-type {} in tag", tag & 7),
                        self.state(),
                    ));
                };
                self.buf.consume(n);
                self.field_number = tag >> 3;
                self.wire_type = Some(wt);
                if wt == WireType::EndGroup {
                    if self.depth > 0 {
                        return Ok(0);
                    }
                    return Err(Error::invalid_data(
                        "group end with no open group",
                        self.state(),
                    ));
                }
                Ok(self.field_number)
            }
        }
    }

    /// Consumes the next header only if it carries the given field number.
    pub fn try_read_field_header(&mut self, field: u32) -> Result<bool, Error> {
        if field == 0
            || self.block_end <= self.buf.position()
            || self.wire_type == Some(WireType::EndGroup)
        {
            return Ok(false);
        }
        self.fill(10, false)?;
        if let Varint::Val(tag, n) = buffer::peek_varuint32(self.buf.window(), false) {
            if tag >> 3 == field {
                if let Some(wt) = WireType::from_tag(tag) {
                    if wt != WireType::EndGroup {
                        self.buf.consume(n);
                        self.field_number = field;
                        self.wire_type = Some(wt);
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Refines the pending wire type to an extension sharing its 3-bit tag.
    /// A hint that does not match the pending base is ignored.
    pub fn hint(&mut self, wt: WireType) {
        match self.wire_type {
            Some(cur) if cur == wt => {}
            Some(cur) if cur.base() == wt.base() => self.wire_type = Some(wt),
            _ => {}
        }
    }

    /// Like [`hint`](WireReader::hint) but a mismatched base is an error.
    pub fn assert_wire_type(&mut self, wt: WireType) -> Result<(), Error> {
        match self.wire_type {
            Some(cur) if cur == wt => Ok(()),
            Some(cur) if cur.base() == wt.base() => {
                self.wire_type = Some(wt);
                Ok(())
            }
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    /// Prepares the reader to decode a value without a preceding field
    /// header, as inside packed runs. Returns false when the current block
    /// is exhausted.
    pub fn has_sub_value(&mut self, wt: WireType) -> bool {
        if self.block_end <= self.buf.position() || self.wire_type == Some(WireType::EndGroup) {
            return false;
        }
        self.wire_type = Some(wt);
        true
    }

    /// Descends into a nested message, either group-framed or
    /// length-prefixed.
    pub fn start_sub_item(&mut self) -> Result<SubItemToken, Error> {
        match self.wire_type {
            Some(WireType::StartGroup) => {
                self.wire_type = None;
                self.depth += 1;
                Ok(SubItemToken::Group(self.field_number))
            }
            Some(WireType::String) => {
                let len = self.read_varuint32(false)? as u64;
                let token = SubItemToken::Length(self.block_end);
                self.block_end = self.buf.position() + len;
                self.depth += 1;
                self.wire_type = None;
                Ok(token)
            }
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    /// Pops a sub-item frame, verifying the payload was consumed exactly.
    pub fn end_sub_item(&mut self, token: SubItemToken) -> Result<(), Error> {
        match token {
            SubItemToken::Group(field) => {
                if self.wire_type != Some(WireType::EndGroup) || self.field_number != field {
                    return Err(Error::WrongGroupEnded(self.state()));
                }
                self.wire_type = None;
                self.depth -= 1;
                Ok(())
            }
            SubItemToken::Length(parent_end) => {
                let position = self.buf.position();
                if position > self.block_end {
                    return Err(Error::SubMessageOverrun(self.state()));
                }
                if position < self.block_end {
                    return Err(Error::SubMessageNotFullyConsumed(self.state()));
                }
                self.block_end = parent_end;
                self.depth -= 1;
                Ok(())
            }
        }
    }

    /// Discards the pending field's payload, recursing through groups.
    pub fn skip_field(&mut self) -> Result<(), Error> {
        match self.wire_type {
            Some(WireType::Varint) | Some(WireType::SignedVarint) => {
                self.read_varuint64()?;
                Ok(())
            }
            Some(WireType::Fixed8) => self.skip_bytes(1),
            Some(WireType::Fixed16) => self.skip_bytes(2),
            Some(WireType::Fixed32) => self.skip_bytes(4),
            Some(WireType::Fixed64) => self.skip_bytes(8),
            Some(WireType::String) => {
                let len = self.read_varuint32(false)? as u64;
                self.skip_bytes(len)?;
                self.wire_type = None;
                Ok(())
            }
            Some(WireType::StartGroup) => {
                let opening = self.field_number;
                self.depth += 1;
                while self.read_field_header()? > 0 {
                    self.skip_field()?;
                }
                self.depth -= 1;
                if self.wire_type == Some(WireType::EndGroup) && self.field_number == opening {
                    self.wire_type = None;
                    return Ok(());
                }
                Err(Error::WrongGroupEnded(self.state()))
            }
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    fn skip_bytes(&mut self, len: u64) -> Result<(), Error> {
        match self.buf.skip_raw(len, &mut *self.source) {
            Ok(()) => Ok(()),
            Err(Error::UnexpectedEndOfInput(_)) => {
                Err(Error::UnexpectedEndOfInput(self.state()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn read_uint32(&mut self) -> Result<u32, Error> {
        match self.wire_type {
            Some(WireType::Varint) => self.read_varuint32(false),
            Some(WireType::Fixed8) => Ok(self.read_fixed::<1>()?[0] as u32),
            Some(WireType::Fixed16) => Ok(u16::from_le_bytes(self.read_fixed()?) as u32),
            Some(WireType::Fixed32) => Ok(u32::from_le_bytes(self.read_fixed()?)),
            Some(WireType::Fixed64) => {
                let wide = u64::from_le_bytes(self.read_fixed()?);
                u32::try_from(wide).map_err(|_| Error::Overflow(self.state()))
            }
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    pub fn read_int32(&mut self) -> Result<i32, Error> {
        match self.wire_type {
            Some(WireType::Varint) => Ok(self.read_varuint32(true)? as i32),
            Some(WireType::SignedVarint) => Ok(buffer::zag32(self.read_varuint32(false)?)),
            Some(WireType::Fixed8) => Ok(self.read_fixed::<1>()?[0] as i8 as i32),
            Some(WireType::Fixed16) => Ok(i16::from_le_bytes(self.read_fixed()?) as i32),
            Some(WireType::Fixed32) => Ok(i32::from_le_bytes(self.read_fixed()?)),
            Some(WireType::Fixed64) => {
                let wide = i64::from_le_bytes(self.read_fixed()?);
                i32::try_from(wide).map_err(|_| Error::Overflow(self.state()))
            }
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    pub fn read_uint64(&mut self) -> Result<u64, Error> {
        match self.wire_type {
            Some(WireType::Varint) => self.read_varuint64(),
            Some(WireType::Fixed8) => Ok(self.read_fixed::<1>()?[0] as u64),
            Some(WireType::Fixed16) => Ok(u16::from_le_bytes(self.read_fixed()?) as u64),
            Some(WireType::Fixed32) => Ok(u32::from_le_bytes(self.read_fixed()?) as u64),
            Some(WireType::Fixed64) => Ok(u64::from_le_bytes(self.read_fixed()?)),
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    pub fn read_int64(&mut self) -> Result<i64, Error> {
        match self.wire_type {
            Some(WireType::Varint) => Ok(self.read_varuint64()? as i64),
            Some(WireType::SignedVarint) => Ok(buffer::zag64(self.read_varuint64()?)),
            Some(WireType::Fixed8) => Ok(self.read_fixed::<1>()?[0] as i8 as i64),
            Some(WireType::Fixed16) => Ok(i16::from_le_bytes(self.read_fixed()?) as i64),
            Some(WireType::Fixed32) => Ok(i32::from_le_bytes(self.read_fixed()?) as i64),
            Some(WireType::Fixed64) => Ok(i64::from_le_bytes(self.read_fixed()?)),
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        match self.read_uint32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::invalid_data(
                format!("unexpected boolean value {other}"),
                self.state(),
            )),
        }
    }

    pub fn read_int8(&mut self) -> Result<i8, Error> {
        let wide = self.read_int32()?;
        i8::try_from(wide).map_err(|_| Error::Overflow(self.state()))
    }

    pub fn read_uint8(&mut self) -> Result<u8, Error> {
        let wide = self.read_uint32()?;
        u8::try_from(wide).map_err(|_| Error::Overflow(self.state()))
    }

    pub fn read_int16(&mut self) -> Result<i16, Error> {
        let wide = self.read_int32()?;
        i16::try_from(wide).map_err(|_| Error::Overflow(self.state()))
    }

    pub fn read_uint16(&mut self) -> Result<u16, Error> {
        let wide = self.read_uint32()?;
        u16::try_from(wide).map_err(|_| Error::Overflow(self.state()))
    }

    pub fn read_single(&mut self) -> Result<f32, Error> {
        match self.wire_type {
            Some(WireType::Fixed32) => Ok(f32::from_le_bytes(self.read_fixed()?)),
            Some(WireType::Fixed64) => {
                let wide = f64::from_le_bytes(self.read_fixed()?);
                let narrow = wide as f32;
                if narrow.is_infinite() && wide.is_finite() {
                    return Err(Error::Overflow(self.state()));
                }
                Ok(narrow)
            }
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    pub fn read_double(&mut self) -> Result<f64, Error> {
        match self.wire_type {
            Some(WireType::Fixed32) => Ok(self.read_single()? as f64),
            Some(WireType::Fixed64) => Ok(f64::from_le_bytes(self.read_fixed()?)),
            _ => Err(Error::UnexpectedWireType(self.state())),
        }
    }

    /// Reads a length-delimited UTF-8 string, interning it when the model
    /// enables string interning.
    pub fn read_string(&mut self) -> Result<Arc<str>, Error> {
        self.assert_wire_type(WireType::String)?;
        let len = self.read_varuint32(false)? as usize;
        self.fill(len, true)?;
        let state = self.state();
        let text = std::str::from_utf8(self.buf.view(len)).map_err(|_| {
            Error::invalid_data("length-delimited payload is not valid UTF-8", state)
        })?;
        let out = if self.intern_strings {
            match self.interner.get(text) {
                Some(shared) => shared.clone(),
                None => {
                    let shared: Arc<str> = Arc::from(text);
                    self.interner.insert(shared.clone());
                    shared
                }
            }
        } else {
            Arc::from(text)
        };
        self.buf.consume(len);
        Ok(out)
    }

    /// Reads a length-delimited byte payload, appending to `existing`.
    /// Clears the pending wire type so a fresh header must follow.
    pub fn append_bytes(&mut self, mut existing: Vec<u8>) -> Result<Vec<u8>, Error> {
        self.assert_wire_type(WireType::String)?;
        let mut len = self.read_varuint32(false)? as usize;
        self.wire_type = None;
        existing.reserve(len);
        while len > 0 {
            if self.buf.buffered() == 0 {
                self.fill(1, true)?;
            }
            let take = self.buf.buffered().min(len);
            existing.extend_from_slice(self.buf.view(take));
            self.buf.consume(take);
            len -= take;
        }
        Ok(existing)
    }

    // ---- object graph -------------------------------------------------

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub(crate) fn take_graph(&mut self) -> ObjectGraph {
        std::mem::take(&mut self.graph)
    }

    /// Registers the root object against its reserved graph slot.
    pub fn set_root_object(&mut self, value: &crate::value::Value) {
        self.graph.fill(ROOT_OBJECT_KEY, value.clone());
        self.trap_count = self.trap_count.saturating_sub(1);
    }

    /// Fills the pending trapped slot with a freshly created object. Called
    /// once per object creation; only trapped creations are recorded.
    pub fn note_object(&mut self, value: &crate::value::Value) {
        if self.trap_count == 0 {
            return;
        }
        self.trap_count -= 1;
        if let Some(key) = self.pending_trap.take() {
            self.graph.fill(key, value.clone());
        }
    }

    /// Reserves `key` and arranges for the next created object to fill it.
    /// Supports objects that reference themselves mid-decode.
    pub fn trap_next_object(&mut self, key: ObjKey) {
        self.graph.reserve(key);
        self.pending_trap = Some(key);
        self.trap_count += 1;
    }

    pub(crate) fn fill_object(&mut self, key: ObjKey, value: crate::value::Value) {
        self.graph.fill(key, value);
    }

    pub(crate) fn register_type(&mut self, key: ObjKey, type_key: TypeKey) {
        self.graph.register_type(key, type_key);
    }
}

impl Drop for WireReader<'_> {
    // The scratch buffer goes back to the model's pool; the source stays
    // with the caller untouched.
    fn drop(&mut self) {
        let storage =
            std::mem::replace(&mut self.buf, ReadBuffer::new(Vec::new())).into_storage();
        self.model.release_buffer(storage);
    }
}
