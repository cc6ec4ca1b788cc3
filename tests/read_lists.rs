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

mod common;

use common::*;
use protoread::model::{MemberDef, MemberType, TypeDescriptor, TypeModel};
use protoread::source::SliceSource;
use protoread::value::Value;

fn ints(values: &[i32]) -> Value {
    Value::List(values.iter().map(|&v| Value::Int32(v)).collect())
}

#[test]
fn repeated_fields_accumulate() {
    let mut model = TypeModel::new();
    let key = model
        .register(
            TypeDescriptor::new("T")
                .member("nums", MemberType::List(Box::new(MemberType::Int32)))
                .member("name", MemberType::String),
        )
        .unwrap();
    let data = Enc::new()
        .tag(1, VARINT)
        .varint(1)
        .tag(1, VARINT)
        .varint(2)
        .tag(2, LEN)
        .str("mid")
        .tag(1, VARINT)
        .varint(3)
        .finish();
    let decoded = model.decode_from_slice(&data, key).unwrap();
    let record = decoded.root.as_record().unwrap();
    assert_eq!(record.fields[0], ints(&[1, 2, 3]));
    assert_eq!(record.fields[1], Value::String("mid".into()));
}

#[test]
fn packed_run_decodes() {
    let mut model = TypeModel::new();
    let key = model
        .register(
            TypeDescriptor::new("T").member_def(
                MemberDef::new("nums", MemberType::List(Box::new(MemberType::Int32))).packed(),
            ),
        )
        .unwrap();
    let data = Enc::new()
        .tag(1, LEN)
        .nested(Enc::new().varint(3).varint(270).varint(86_942))
        .finish();
    let decoded = model.decode_from_slice(&data, key).unwrap();
    let record = decoded.root.as_record().unwrap();
    assert_eq!(record.fields[0], ints(&[3, 270, 86_942]));
}

#[test]
fn packed_member_still_accepts_repeated_fields() {
    let mut model = TypeModel::new();
    let key = model
        .register(
            TypeDescriptor::new("T").member_def(
                MemberDef::new("nums", MemberType::List(Box::new(MemberType::Int32))).packed(),
            ),
        )
        .unwrap();
    let data = Enc::new()
        .tag(1, VARINT)
        .varint(4)
        .tag(1, VARINT)
        .varint(5)
        .finish();
    let decoded = model.decode_from_slice(&data, key).unwrap();
    assert_eq!(decoded.root.as_record().unwrap().fields[0], ints(&[4, 5]));
}

#[test]
fn overwrite_list_replaces_on_merge() {
    let mut model = TypeModel::new();
    let append_key = model
        .register(
            TypeDescriptor::new("Append")
                .member("nums", MemberType::List(Box::new(MemberType::Int32))),
        )
        .unwrap();
    let overwrite_key = model
        .register(
            TypeDescriptor::new("Overwrite").member_def(
                MemberDef::new("nums", MemberType::List(Box::new(MemberType::Int32)))
                    .overwrite_list(),
            ),
        )
        .unwrap();

    let first = Enc::new().tag(1, VARINT).varint(1).finish();
    let second = Enc::new().tag(1, VARINT).varint(2).finish();

    let base = model.decode_from_slice(&first, append_key).unwrap();
    let mut src = SliceSource::new(&second);
    let merged = model.merge(&mut src, append_key, base.root).unwrap();
    assert_eq!(merged.root.as_record().unwrap().fields[0], ints(&[1, 2]));

    let base = model.decode_from_slice(&first, overwrite_key).unwrap();
    let mut src = SliceSource::new(&second);
    let merged = model.merge(&mut src, overwrite_key, base.root).unwrap();
    assert_eq!(merged.root.as_record().unwrap().fields[0], ints(&[2]));
}

#[test]
fn list_of_messages() {
    let mut model = TypeModel::new();
    model
        .register(TypeDescriptor::new("Item").member("v", MemberType::Int32))
        .unwrap();
    let key = model
        .register(
            TypeDescriptor::new("Bag")
                .member("items", MemberType::List(Box::new(MemberType::Message("Item".into())))),
        )
        .unwrap();
    let data = Enc::new()
        .tag(1, LEN)
        .nested(Enc::new().tag(1, VARINT).varint(10))
        .tag(1, LEN)
        .nested(Enc::new().tag(1, VARINT).varint(20))
        .finish();
    let decoded = model.decode_from_slice(&data, key).unwrap();
    let items = decoded.root.as_record().unwrap().fields[0].as_list().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_record().unwrap().fields[0], Value::Int32(10));
    assert_eq!(items[1].as_record().unwrap().fields[0], Value::Int32(20));
}

#[test]
fn list_of_strings() {
    let mut model = TypeModel::new();
    let key = model
        .register(
            TypeDescriptor::new("T")
                .member("tags", MemberType::List(Box::new(MemberType::String))),
        )
        .unwrap();
    let data = Enc::new()
        .tag(1, LEN)
        .str("red")
        .tag(1, LEN)
        .str("blue")
        .finish();
    let decoded = model.decode_from_slice(&data, key).unwrap();
    assert_eq!(
        decoded.root.as_record().unwrap().fields[0],
        Value::List(vec![
            Value::String("red".into()),
            Value::String("blue".into())
        ])
    );
}

#[test]
fn append_bytes_across_refills() {
    let mut model = TypeModel::new().buffer_capacity(8);
    let key = model
        .register(TypeDescriptor::new("T").member("blob", MemberType::Bytes))
        .unwrap();
    let payload: Vec<u8> = (0..50).collect();
    let data = Enc::new()
        .tag(1, LEN)
        .varint(payload.len() as u64)
        .raw(&payload)
        .finish();
    let decoded = model.decode_from_slice(&data, key).unwrap();
    assert_eq!(
        decoded.root.as_record().unwrap().fields[0],
        Value::Bytes(payload)
    );
}

#[test]
fn bytes_append_on_merge() {
    let mut model = TypeModel::new();
    let key = model
        .register(TypeDescriptor::new("T").member("blob", MemberType::Bytes))
        .unwrap();
    let first = Enc::new().tag(1, LEN).varint(2).raw(&[1, 2]).finish();
    let second = Enc::new().tag(1, LEN).varint(2).raw(&[3, 4]).finish();
    let base = model.decode_from_slice(&first, key).unwrap();
    let mut src = SliceSource::new(&second);
    let merged = model.merge(&mut src, key, base.root).unwrap();
    assert_eq!(
        merged.root.as_record().unwrap().fields[0],
        Value::Bytes(vec![1, 2, 3, 4])
    );
}
