use tuple::{Datetime, FieldType, Tag, TupleView, Value};

use super::helpers::*;
use crate::*;

// -------------------- Empty tuples --------------------

#[test]
fn empty_tuple_is_null() {
    let mut b = builder();
    assert_eq!(json(&mut b), "null");
    b.insert_u16(1, 1).unwrap();
    b.clear();
    assert_eq!(json(&mut b), "null");
    assert_eq!(json_with(&mut b, Some("  "), JsonFlags::DISABLE_JSON5), "null");
}

#[test]
fn empty_nested_tuple_is_null() {
    let mut child = builder();
    let mut b = builder();
    b.insert_nested(1, &child.freeze(true).unwrap()).unwrap();
    assert_eq!(json(&mut b), "{f1_nested:null}");
}

// -------------------- Integers --------------------

#[test]
fn uint16_fields_with_denil() {
    let mut b = builder();
    b.upsert_u16(1, 0).unwrap();
    b.upsert_u16(2, 35671).unwrap();
    b.upsert_u16(3, u16::MAX).unwrap();
    b.upsert_u16(4, 42).unwrap();
    assert_eq!(
        json(&mut b),
        "{f1_uint16:0,f2_uint16:35671,f3_uint16:null,f4_uint16:42}"
    );
}

#[test]
fn bool_collection_with_denil() {
    let mut b = builder();
    b.insert_bool(9, true).unwrap();
    b.insert_u16(9, u16::MAX).unwrap();
    b.insert_bool(9, false).unwrap();
    assert_eq!(json(&mut b), "{f9_uint16:[true,null,false]}");
}

#[test]
fn enum_collection_with_denil() {
    let mut b = builder();
    b.insert_u16(9, 42).unwrap();
    b.insert_u16(9, u16::MAX).unwrap();
    b.insert_u16(9, 33).unwrap();
    assert_eq!(json(&mut b), "{f9_uint16:[\"item42\",null,33]}");
}

#[test]
fn empty_label_for_other_values_renders_the_integer() {
    let schema = FnResolver::new(|_tag: Tag| Some("flag"), |_tag: Tag, _value: u16| Some(""));
    let mut b = builder();
    b.insert_u16(1, 0).unwrap();
    b.insert_u16(1, 1).unwrap();
    b.insert_u16(1, 5).unwrap();
    let view = b.freeze(false).unwrap();
    assert_eq!(
        tuple_to_json(&view, None, 0, &schema, JsonFlags::default()).unwrap(),
        "{flag:[false,true,5]}"
    );
}

#[test]
fn uint32_fields_with_denil() {
    let mut b = builder();
    b.upsert_u32(1, 0).unwrap();
    b.upsert_u32(2, 4_242_424_242).unwrap();
    b.upsert_u32(3, 1).unwrap();
    b.upsert_u32(4, u32::MAX).unwrap();
    assert_eq!(
        json(&mut b),
        "{f1_uint32:0,f2_uint32:4242424242,f3_uint32:1,f4_uint32:null}"
    );
}

#[test]
fn int32_fields_with_denil() {
    let mut b = builder();
    b.upsert_i32(1, i32::MIN).unwrap();
    b.upsert_i32(2, 0).unwrap();
    b.upsert_i32(3, 2_121_212_121).unwrap();
    b.upsert_i32(4, -1).unwrap();
    assert_eq!(
        json(&mut b),
        "{f1_int32:null,f2_int32:0,f3_int32:2121212121,f4_int32:-1}"
    );
}

#[test]
fn uint64_fields_are_lossless() {
    let mut b = builder();
    b.upsert_u64(1, 0).unwrap();
    b.upsert_u64(2, 4_242_424_242).unwrap();
    b.upsert_u64(3, i64::MAX as u64).unwrap();
    b.upsert_u64(4, u64::MAX).unwrap();
    assert_eq!(
        json(&mut b),
        "{f1_uint64:0,f2_uint64:4242424242,f3_uint64:9223372036854775807,f4_uint64:null}"
    );
}

#[test]
fn int64_fields_are_lossless() {
    let mut b = builder();
    b.upsert_i64(1, 0).unwrap();
    b.upsert_i64(2, 4_242_424_242).unwrap();
    b.upsert_i64(3, -i64::MAX).unwrap();
    b.upsert_i64(4, i64::MIN).unwrap();
    assert_eq!(
        json(&mut b),
        "{f1_int64:0,f2_int64:4242424242,f3_int64:-9223372036854775807,f4_int64:null}"
    );
}

// -------------------- Floats --------------------

#[test]
fn floats_use_shortest_decimal() {
    let mut b = builder();
    b.insert_f32(1, 0.1).unwrap();
    b.insert_f64(2, 2.5).unwrap();
    b.insert_f64(3, -0.0).unwrap();
    b.insert_f64(4, 1e21).unwrap();
    b.insert(Tag::new(5, FieldType::Fp32), Value::denil(FieldType::Fp32).unwrap())
        .unwrap();
    assert_eq!(
        json(&mut b),
        "{f1_fp32:0.1,f2_fp64:2.5,f3_fp64:-0,f4_fp64:1000000000000000000000,f5_fp32:null}"
    );
}

#[test]
fn non_finite_floats_depend_on_json5() {
    let mut b = builder();
    b.insert_f64(1, f64::NAN).unwrap();
    b.insert_f64(1, f64::INFINITY).unwrap();
    b.insert_f32(2, f32::NEG_INFINITY).unwrap();
    assert_eq!(json(&mut b), "{f1_fp64:[NaN,Infinity],f2_fp32:-Infinity}");
    assert_eq!(
        json_with(&mut b, None, JsonFlags::DISABLE_JSON5),
        "{\"f1_fp64\":[null,null],\"f2_fp32\":null}"
    );
}

// -------------------- Datetime, binaries --------------------

#[test]
fn datetime_renders_rfc3339() {
    let mut b = builder();
    b.insert_datetime(1, Datetime::from_unix(1_495_548_062, 0)).unwrap();
    b.insert_datetime(2, Datetime::from_unix(1_495_548_062, 500_000_000))
        .unwrap();
    b.insert_datetime(3, Datetime::DENIL).unwrap();
    assert_eq!(
        json(&mut b),
        "{f1_datetime:\"2017-05-23T14:01:02Z\",f2_datetime:\"2017-05-23T14:01:02.500Z\",f3_datetime:null}"
    );
}

#[test]
fn binaries_render_as_hex() {
    let mut b = builder();
    b.insert_b96(1, [0xAB; 12]).unwrap();
    b.insert_b128(2, [0xFF; 16]).unwrap();
    b.insert_opaque(3, &[0x00, 0x0F, 0xF0]).unwrap();
    b.insert_opaque(4, &[]).unwrap();
    assert_eq!(
        json(&mut b),
        "{f1_b96:\"abababababababababababab\",f2_b128:null,f3_opaque:\"000ff0\",f4_opaque:\"\"}"
    );
}

// -------------------- Strings and keys --------------------

#[test]
fn strings_and_fallback_keys() {
    let mut b = builder();
    b.upsert_str(0, "").unwrap();
    b.upsert_str(1, "строка").unwrap();
    b.upsert_str(2, "42").unwrap();
    b.insert_str(2, "string").unwrap();
    b.insert_str(2, "null").unwrap();
    b.insert_str(2, "true").unwrap();
    b.insert_str(2, "false").unwrap();
    assert_eq!(
        json(&mut b),
        "{\"@0\":\"\",f1_cstr:\"строка\",f2_cstr:[\"42\",\"string\",\"null\",\"true\",\"false\"]}"
    );
    assert_eq!(
        json_with(&mut b, None, JsonFlags::DISABLE_JSON5),
        "{\"@0\":\"\",\"f1_cstr\":\"строка\",\"f2_cstr\":[\"42\",\"string\",\"null\",\"true\",\"false\"]}"
    );
}

#[test]
fn string_escaping() {
    let mut b = builder();
    b.upsert_str(1, "\\").unwrap();
    b.upsert_str(2, "\"").unwrap();
    b.upsert_str(3, "'").unwrap();
    b.upsert_str(4, "\n\r\t\u{8}\u{c}").unwrap();
    b.upsert_cstr(5, b"\x01\x02\x03ddfg\xff\x1f").unwrap();
    let view = b.freeze(false).unwrap();
    let out = tuple_to_json_bytes(&view, None, 0, &SchemaX::new(), JsonFlags::default()).unwrap();
    assert_eq!(
        out,
        b"{f1_cstr:\"\\\\\",f2_cstr:\"\\\"\",f3_cstr:\"'\",f4_cstr:\"\\n\\r\\t\\b\\f\",\
          f5_cstr:\"\\u0001\\u0002\\u0003ddfg\xff\\u001f\"}"
            .to_vec()
    );
    assert!(matches!(
        tuple_to_json(&view, None, 0, &SchemaX::new(), JsonFlags::default()),
        Err(JsonError::Utf8(_))
    ));
}

#[test]
fn long_string() {
    let mut b = builder();
    let long = "A".repeat(1111);
    b.upsert_str(1, &long).unwrap();
    assert_eq!(json(&mut b), format!("{{f1_cstr:\"{long}\"}}"));
}

#[test]
fn keys_that_are_not_identifiers_are_quoted() {
    let names = ["$ok_1", "has space", "9lives", ""];
    let schema = FnResolver::new(
        |tag: Tag| names.get(tag.column() as usize).copied(),
        |_tag: Tag, _value: u16| None,
    );
    let mut b = builder();
    for column in 0..5 {
        b.insert_u32(column, u32::from(column)).unwrap();
    }
    let view = b.freeze(false).unwrap();
    assert_eq!(
        tuple_to_json(&view, None, 0, &schema, JsonFlags::default()).unwrap(),
        "{$ok_1:0,\"has space\":1,\"9lives\":2,\"@3\":3,\"@4\":4}"
    );
    assert_eq!(
        tuple_to_json(&view, None, 0, &schema, JsonFlags::FORCE_QUOTE_KEYS).unwrap(),
        "{\"$ok_1\":0,\"has space\":1,\"9lives\":2,\"@3\":3,\"@4\":4}"
    );
}

#[test]
fn no_schema_falls_back_to_columns() {
    let mut b = builder();
    b.insert_u16(7, 1).unwrap();
    b.insert_u16(8, 2).unwrap();
    b.insert_u16(8, 3).unwrap();
    let view = b.freeze(false).unwrap();
    assert_eq!(
        tuple_to_json(&view, None, 0, &NoSchema, JsonFlags::default()).unwrap(),
        "{\"@7\":1,\"@8\":[2,3]}"
    );
}

#[test]
fn unnamed_column_with_several_types_qualifies_keys() {
    let mut b = builder();
    b.insert_u16(7, 1).unwrap();
    b.insert_str(7, "x").unwrap();
    b.insert_str(7, "y").unwrap();
    b.insert_u32(9, 4).unwrap();
    let view = b.freeze(false).unwrap();
    assert_eq!(
        tuple_to_json(&view, None, 0, &NoSchema, JsonFlags::default()).unwrap(),
        "{\"@7:uint16\":1,\"@7:cstr\":[\"x\",\"y\"],\"@9\":4}"
    );

    let text = tuple_to_json(&view, None, 0, &NoSchema, JsonFlags::DISABLE_JSON5).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.as_object().unwrap().len(), 3);
    assert_eq!(parsed["@7:cstr"], serde_json::json!(["x", "y"]));
}

#[test]
fn named_type_keeps_its_name_next_to_unnamed_one() {
    let mut b = builder();
    b.insert_u16(7, 1).unwrap();
    b.insert_str(7, "x").unwrap();
    let view = b.freeze(false).unwrap();
    let schema = FnResolver::new(
        |tag: Tag| (tag.field_type() == FieldType::Cstr).then_some("label"),
        |_: Tag, _: u16| -> Option<&'static str> { None },
    );
    assert_eq!(
        tuple_to_json(&view, None, 0, &schema, JsonFlags::default()).unwrap(),
        "{\"@7\":1,label:\"x\"}"
    );
}

#[test]
fn object_name_property_is_accepted() {
    let mut b = builder();
    b.insert_u16(1, 3).unwrap();
    assert_eq!(
        json_with(&mut b, None, JsonFlags::OBJECT_NAME_PROPERTY),
        "{f1_uint16:3}"
    );
}

// -------------------- Arrays and nesting --------------------

#[test]
fn array_fields() {
    let mut b = builder();
    b.insert_array(
        3,
        FieldType::Int64,
        &[Value::Int64(1), Value::denil(FieldType::Int64).unwrap(), Value::Int64(-3)],
    )
    .unwrap();
    b.insert_array(
        9,
        FieldType::ENUM,
        &[Value::Uint16(0), Value::Uint16(1), Value::Uint16(42), Value::Uint16(7)],
    )
    .unwrap();
    b.insert_array(4, FieldType::Cstr, &[]).unwrap();
    assert_eq!(
        json(&mut b),
        "{a3_int64:[1,null,-3],a9_uint16:[false,true,\"item42\",7],a4_cstr:[]}"
    );
}

#[test]
fn nested_tuples_render_recursively() {
    let mut inner = builder();
    inner.insert_u16(1, 1).unwrap();
    inner.insert_str(2, "in").unwrap();
    let inner = inner.into_bytes().unwrap();
    let inner = TupleView::open(&inner).unwrap();

    let mut b = builder();
    b.insert_nested(5, &inner).unwrap();
    b.insert_array(6, FieldType::Nested, &[Value::Nested(inner)]).unwrap();
    assert_eq!(
        json(&mut b),
        "{f5_nested:{f1_uint16:1,f2_cstr:\"in\"},a6_nested:[{f1_uint16:1,f2_cstr:\"in\"}]}"
    );
}

// -------------------- Pretty printing --------------------

#[test]
fn pretty_printing_indents_each_level() {
    let mut inner = builder();
    inner.insert_u16(1, 1).unwrap();

    let mut b = builder();
    b.insert_u16(1, 1).unwrap();
    b.insert_u16(2, 1).unwrap();
    b.insert_u16(2, 2).unwrap();
    b.insert_nested_owned(3, inner).unwrap();
    let expected = "{\n  f1_uint16: 1,\n  f2_uint16: [\n    1,\n    2\n  ],\n  f3_nested: {\n    f1_uint16: 1\n  }\n}";
    assert_eq!(json_with(&mut b, Some("  "), JsonFlags::default()), expected);
}

#[test]
fn base_indent_shifts_inner_lines() {
    let mut b = builder();
    b.insert_u16(1, 1).unwrap();
    let view = b.freeze(false).unwrap();
    assert_eq!(
        tuple_to_json(&view, Some("\t"), 2, &SchemaX::new(), JsonFlags::default()).unwrap(),
        "{\n\t\t\tf1_uint16: 1\n\t\t}"
    );
}

// -------------------- Errors and writers --------------------

#[test]
fn invalid_tuple_is_rejected_without_output() {
    let mut b = builder();
    b.insert_u64(1, 1).unwrap();
    let mut bytes = b.into_bytes().unwrap();
    bytes[12] = 99;
    let view = TupleView::new(&bytes).unwrap();
    let mut out = Vec::new();
    let err = write_json(&mut out, &view, None, 0, &NoSchema, JsonFlags::default()).unwrap_err();
    assert!(matches!(
        err,
        JsonError::Tuple(tuple::TupleError::Validation(_))
    ));
    assert!(out.is_empty());
}

#[test]
fn nesting_beyond_the_limit_is_rejected() {
    let at_limit = nested_chain(tuple::MAX_NESTING_DEPTH);
    let view = TupleView::new(&at_limit).unwrap();
    let text = tuple_to_json(&view, None, 0, &NoSchema, JsonFlags::default()).unwrap();
    assert_eq!(text.matches('{').count(), tuple::MAX_NESTING_DEPTH + 1);
    assert!(text.ends_with("{\"@1\":1}}"));

    let too_deep = wrap_nested(&at_limit);
    let view = TupleView::new(&too_deep).unwrap();
    let mut out = Vec::new();
    let err = write_json(&mut out, &view, None, 0, &NoSchema, JsonFlags::default()).unwrap_err();
    assert!(matches!(
        err,
        JsonError::Tuple(tuple::TupleError::Validation(_))
    ));
    assert!(out.is_empty());
}

#[test]
fn write_json_matches_string_output() {
    let mut b = builder();
    b.insert_str(1, "w").unwrap();
    let view = b.freeze(false).unwrap();
    let mut out = Vec::new();
    write_json(&mut out, &view, None, 0, &SchemaX::new(), JsonFlags::default()).unwrap();
    assert_eq!(out, b"{f1_cstr:\"w\"}");
}

#[test]
fn strict_output_parses_as_json() {
    let mut inner = builder();
    inner.insert_str(1, "it's \"quoted\"\n").unwrap();
    let mut b = builder();
    b.insert_u64(1, u64::MAX - 1).unwrap();
    b.insert_f64(2, 0.25).unwrap();
    b.insert_nested_owned(3, inner).unwrap();
    b.insert_array(4, FieldType::Int32, &[Value::Int32(-1), Value::Int32(2)]).unwrap();
    let text = json_with(&mut b, Some("    "), JsonFlags::DISABLE_JSON5);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({
            "f1_uint64": u64::MAX - 1,
            "f2_fp64": 0.25,
            "f3_nested": { "f1_cstr": "it's \"quoted\"\n" },
            "a4_int32": [-1, 2],
        })
    );
}
