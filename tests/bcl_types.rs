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

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use common::*;
use protoread::model::{DataFormat, MemberDef, MemberType, TypeDescriptor, TypeModel};
use protoread::types::TypeKey;
use protoread::value::Value;
use protoread::Error;

fn epoch() -> NaiveDateTime {
    DateTime::<Utc>::UNIX_EPOCH.naive_utc()
}

fn single(member: MemberType) -> (TypeModel, TypeKey) {
    let mut model = TypeModel::new();
    let key = model
        .register(TypeDescriptor::new("T").member("v", member))
        .unwrap();
    (model, key)
}

fn decode(model: &TypeModel, key: TypeKey, data: &[u8]) -> Value {
    let decoded = model.decode_from_slice(data, key).unwrap();
    decoded.root.as_record().unwrap().fields[0].clone()
}

fn decimal_msg(low: u64, high: u64, sign_scale: u64) -> Vec<u8> {
    Enc::new()
        .tag(1, LEN)
        .nested(
            Enc::new()
                .tag(1, VARINT)
                .varint(low)
                .tag(2, VARINT)
                .varint(high)
                .tag(3, VARINT)
                .varint(sign_scale),
        )
        .finish()
}

fn decimal_text(value: Value) -> String {
    match value {
        Value::Decimal(d) => d.to_string(),
        other => panic!("unexpected value: {other:?}"),
    }
}

#[test]
fn decimal_with_scale() {
    let (model, key) = single(MemberType::Decimal);
    let value = decode(&model, key, &decimal_msg(550_032, 0, 0x04));
    assert_eq!(decimal_text(value), "5500.32");
}

#[test]
fn negative_decimal() {
    let (model, key) = single(MemberType::Decimal);
    let value = decode(&model, key, &decimal_msg(550_032, 0, 0x05));
    assert_eq!(decimal_text(value), "-5500.32");
}

#[test]
fn empty_decimal_is_zero() {
    let (model, key) = single(MemberType::Decimal);
    let data = Enc::new().tag(1, LEN).nested(Enc::new()).finish();
    assert_eq!(decimal_text(decode(&model, key, &data)), "0");
}

#[test]
fn decimal_scale_out_of_range() {
    let (model, key) = single(MemberType::Decimal);
    let err = model
        .decode_from_slice(&decimal_msg(1, 0, 29 << 1), key)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData { .. }));
}

#[test]
fn guid_reassembles_mixed_field_layout() {
    let (model, key) = single(MemberType::Guid);
    let data = Enc::new()
        .tag(1, LEN)
        .nested(
            Enc::new()
                .tag(1, FIXED64)
                .fixed64(0x6677_4455_0011_2233)
                .tag(2, FIXED64)
                .fixed64(0xffee_ddcc_bbaa_9988),
        )
        .finish();
    let value = decode(&model, key, &data);
    match value {
        Value::Guid(uuid) => {
            assert_eq!(uuid.to_string(), "00112233-4455-6677-8899-aabbccddeeff")
        }
        other => panic!("unexpected value: {other:?}"),
    }
}

#[test]
fn empty_guid_is_nil() {
    let (model, key) = single(MemberType::Guid);
    let data = Enc::new().tag(1, LEN).nested(Enc::new()).finish();
    match decode(&model, key, &data) {
        Value::Guid(uuid) => assert!(uuid.is_nil()),
        other => panic!("unexpected value: {other:?}"),
    }
}

fn time_msg(value: i64, scale: u64) -> Vec<u8> {
    Enc::new()
        .tag(1, LEN)
        .nested(Enc::new().tag(1, VARINT).sint(value).tag(2, VARINT).varint(scale))
        .finish()
}

#[test]
fn duration_in_seconds() {
    let (model, key) = single(MemberType::Duration);
    // TimeSpanScale::Seconds = 3
    assert_eq!(
        decode(&model, key, &time_msg(90, 3)),
        Value::Duration(TimeDelta::seconds(90))
    );
}

#[test]
fn negative_duration() {
    let (model, key) = single(MemberType::Duration);
    assert_eq!(
        decode(&model, key, &time_msg(-90, 3)),
        Value::Duration(TimeDelta::seconds(-90))
    );
}

#[test]
fn duration_in_raw_ticks() {
    let (model, key) = single(MemberType::Duration);
    // TimeSpanScale::Ticks = 5; one tick is 100ns.
    assert_eq!(
        decode(&model, key, &time_msg(15, 5)),
        Value::Duration(TimeDelta::nanoseconds(1500))
    );
}

#[test]
fn datetime_in_days_from_epoch() {
    let (model, key) = single(MemberType::DateTime);
    assert_eq!(
        decode(&model, key, &time_msg(2, 0)),
        Value::DateTime(epoch() + TimeDelta::days(2))
    );
}

#[test]
fn datetime_before_epoch() {
    let (model, key) = single(MemberType::DateTime);
    assert_eq!(
        decode(&model, key, &time_msg(-1, 1)),
        Value::DateTime(epoch() - TimeDelta::hours(1))
    );
}

#[test]
fn fixed_size_datetime_is_bare_ticks() {
    let mut model = TypeModel::new();
    let key = model
        .register(
            TypeDescriptor::new("T").member_def(
                MemberDef::new("v", MemberType::DateTime).format(DataFormat::FixedSize),
            ),
        )
        .unwrap();
    // One day of 100ns ticks, written as a plain fixed64 payload.
    let data = Enc::new()
        .tag(1, FIXED64)
        .fixed64(864_000_000_000)
        .finish();
    assert_eq!(
        decode(&model, key, &data),
        Value::DateTime(epoch() + TimeDelta::days(1))
    );
}

#[test]
fn min_max_markers() {
    let (model, key) = single(MemberType::DateTime);
    // TimeSpanScale::MinMax = 15 with a +/-1 payload.
    assert_eq!(
        decode(&model, key, &time_msg(1, 15)),
        Value::DateTime(NaiveDateTime::MAX)
    );
    assert_eq!(
        decode(&model, key, &time_msg(-1, 15)),
        Value::DateTime(NaiveDateTime::MIN)
    );
}

#[test]
fn unknown_time_scale_fails() {
    let (model, key) = single(MemberType::Duration);
    let err = model
        .decode_from_slice(&time_msg(1, 9), key)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownEnumWireValue { value: 9, .. }
    ));
}

#[test]
fn bad_min_max_marker_fails() {
    let (model, key) = single(MemberType::DateTime);
    let err = model
        .decode_from_slice(&time_msg(3, 15), key)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData { .. }));
}

#[test]
fn datetime_kind_field_is_validated_and_ignored() {
    let (model, key) = single(MemberType::DateTime);
    let data = Enc::new()
        .tag(1, LEN)
        .nested(
            Enc::new()
                .tag(1, VARINT)
                .sint(1)
                .tag(2, VARINT)
                .varint(0)
                .tag(3, VARINT)
                .varint(1),
        )
        .finish();
    assert_eq!(
        decode(&model, key, &data),
        Value::DateTime(epoch() + TimeDelta::days(1))
    );

    let bad = Enc::new()
        .tag(1, LEN)
        .nested(Enc::new().tag(1, VARINT).sint(1).tag(3, VARINT).varint(7))
        .finish();
    let err = model.decode_from_slice(&bad, key).unwrap_err();
    assert!(matches!(err, Error::InvalidData { .. }));
}
