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
use protoread::model::{ColumnSpec, MemberDef, MemberType, TypeDescriptor, TypeModel};
use protoread::types::TypeKey;
use protoread::value::Value;
use protoread::Error;

fn user_model() -> (TypeModel, TypeKey) {
    let mut model = TypeModel::new();
    let key = model
        .register(
            TypeDescriptor::new("User")
                .member("username", MemberType::String)
                .member("age", MemberType::Int32),
        )
        .unwrap();
    (model, key)
}

#[test]
fn columns_renumber_fields_positionally() {
    let (mut model, base) = user_model();
    // Stream order: age first, then username. Labels match by name,
    // case-insensitively.
    let bound = model
        .bind_columns(
            base,
            &[ColumnSpec::new("age"), ColumnSpec::new("UserName")],
        )
        .unwrap();
    let data = Enc::new()
        .tag(1, VARINT)
        .varint(33)
        .tag(2, LEN)
        .str("bob")
        .finish();
    let decoded = model.decode_from_slice(&data, bound).unwrap();
    let record = decoded.root.as_record().unwrap();
    // Slots keep the declared layout regardless of column order.
    assert_eq!(record.fields[0], Value::String("bob".into()));
    assert_eq!(record.fields[1], Value::Int32(33));
}

#[test]
fn columns_match_aliases() {
    let mut model = TypeModel::new();
    let base = model
        .register(
            TypeDescriptor::new("Row")
                .member_def(MemberDef::new("created", MemberType::Int64).alias("created_at")),
        )
        .unwrap();
    let bound = model
        .bind_columns(base, &[ColumnSpec::new("CREATED_AT")])
        .unwrap();
    let data = Enc::new().tag(1, VARINT).varint(9).finish();
    let decoded = model.decode_from_slice(&data, bound).unwrap();
    assert_eq!(
        decoded.root.as_record().unwrap().fields[0],
        Value::Int64(9)
    );
}

#[test]
fn base_numbering_unaffected_by_binding() {
    let (mut model, base) = user_model();
    model
        .bind_columns(base, &[ColumnSpec::new("age")])
        .unwrap();
    let data = Enc::new()
        .tag(1, LEN)
        .str("eve")
        .tag(2, VARINT)
        .varint(7)
        .finish();
    let decoded = model.decode_from_slice(&data, base).unwrap();
    let record = decoded.root.as_record().unwrap();
    assert_eq!(record.fields[0], Value::String("eve".into()));
    assert_eq!(record.fields[1], Value::Int32(7));
}

#[test]
fn unknown_column_is_unmappable() {
    let (mut model, base) = user_model();
    let err = model
        .bind_columns(
            base,
            &[ColumnSpec::new("age"), ColumnSpec::new("extra_col")],
        )
        .unwrap_err();
    match err {
        Error::UnmappableColumn { column } => assert_eq!(column, "extra_col"),
        other => panic!("unexpected error: {other}"),
    }
}
