use json::NoSchema;

use super::*;

// -------------------- Registration --------------------

#[test]
fn add_field_and_look_it_up() {
    let mut s = SchemaDict::new();
    s.add_field("id", FieldType::Uint32, 1).unwrap();
    assert_eq!(s.len(), 1);
    assert_eq!(s.name_to_tag("id"), Some(make_tag(1, FieldType::Uint32)));
    assert_eq!(s.tag_to_name(make_tag(1, FieldType::Uint32)), Some("id"));
    assert_eq!(s.tag_to_name(make_tag(1, FieldType::Int32)), None);
    assert_eq!(s.name_to_tag("missing"), None);
}

#[test]
fn duplicate_tag_is_rejected() {
    let mut s = SchemaDict::new();
    s.add_field("a", FieldType::Cstr, 3).unwrap();
    let err = s.add_field("b", FieldType::Cstr, 3).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateTag { column: 3, ty: FieldType::Cstr }));
    assert_eq!(s.name_to_tag("b"), None);
    assert_eq!(s.len(), 1);
}

#[test]
fn duplicate_name_is_rejected() {
    let mut s = SchemaDict::new();
    s.add_field("a", FieldType::Cstr, 3).unwrap();
    let err = s.add_field("a", FieldType::Int64, 4).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateName(ref n) if n == "a"));
    assert_eq!(s.tag_to_name(make_tag(4, FieldType::Int64)), None);
}

#[test]
fn same_column_different_types_are_distinct_fields() {
    let mut s = SchemaDict::new();
    s.add_field("as_int", FieldType::Int32, 5).unwrap();
    s.add_field("as_text", FieldType::Cstr, 5).unwrap();
    assert_eq!(s.len(), 2);
}

#[test]
fn empty_names_may_repeat() {
    let mut s = SchemaDict::new();
    s.add_field("", FieldType::Int32, 1).unwrap();
    s.add_field("", FieldType::Int32, 2).unwrap();
    assert_eq!(s.len(), 2);
    assert_eq!(s.name_to_tag(""), None);
}

#[test]
fn enum_values_and_labels() {
    let mut s = SchemaDict::new();
    s.add_enum_value(2, "red", 0).unwrap();
    s.add_enum_value(2, "green", 1).unwrap();
    assert_eq!(s.label_to_value(2, "green"), Some(1));
    assert_eq!(s.label_to_value(3, "green"), None);
    assert_eq!(s.enum_label(make_tag(2, FieldType::ENUM), 0), Some("red"));

    let err = s.add_enum_value(2, "blue", 1).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateEnumValue { column: 2, value: 1 }));
    let err = s.add_enum_value(2, "red", 7).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateEnumLabel { column: 2, .. }));
    assert_eq!(s.enum_values(2).count(), 2);
}

#[test]
fn empty_enum_labels_may_repeat() {
    let mut s = SchemaDict::new();
    s.add_enum_value(4, "", 0).unwrap();
    s.add_enum_value(4, "", 1).unwrap();
    assert_eq!(s.enum_label(make_tag(4, FieldType::ENUM), 1), Some(""));
    assert_eq!(s.label_to_value(4, ""), None);
}

#[test]
fn fields_come_out_in_tag_order() {
    let mut s = SchemaDict::new();
    s.add_field("late", FieldType::Cstr, 9).unwrap();
    s.add_field("early", FieldType::Uint16, 1).unwrap();
    s.add_field("middle", FieldType::Opaque, 1).unwrap();
    let names: Vec<&str> = s.fields().map(|(_, name)| name).collect();
    assert_eq!(names, ["early", "middle", "late"]);
}

// -------------------- Resolving --------------------

#[test]
fn dict_resolves_json_keys_and_labels() {
    let mut s = SchemaDict::new();
    s.add_field("flag", FieldType::ENUM, 1).unwrap();
    s.add_field("color", FieldType::ENUM, 2).unwrap();
    s.add_enum_value(1, "", 0).unwrap();
    s.add_enum_value(1, "", 1).unwrap();
    s.add_enum_value(2, "red", 0).unwrap();

    let mut b = TupleBuilder::new(8, 1024).unwrap();
    b.insert_bool(1, true).unwrap();
    b.insert_enum(2, 0).unwrap();
    b.insert_enum(2, 5).unwrap();
    b.insert_i32(3, -1).unwrap();
    let view = b.freeze(false).unwrap();
    assert_eq!(
        tuple_to_json(&view, None, 0, &s, JsonFlags::default()).unwrap(),
        "{flag:true,color:[\"red\",5],\"@3\":-1}"
    );
    assert_eq!(
        tuple_to_json(&view, None, 0, &NoSchema, JsonFlags::default()).unwrap(),
        "{\"@1\":1,\"@2\":[0,5],\"@3\":-1}"
    );
}

// -------------------- Self description --------------------

#[test]
fn dict_of_schema_labels_every_type() {
    let dict = SchemaDict::dict_of_schema();
    assert_eq!(dict.len(), 6);
    assert_eq!(dict.label_to_value(0, "cstr"), Some(13));
    assert_eq!(dict.label_to_value(0, "nested[]"), Some(31));
    assert_eq!(dict.enum_values(0).count(), FieldType::ALL.len());
}

#[test]
fn empty_schema_renders_null() {
    assert_eq!(SchemaDict::new().schema_to_json(None).unwrap(), "null");
}

#[test]
fn single_field_schema() {
    let mut s = SchemaDict::new();
    s.add_field("id", FieldType::Uint32, 1).unwrap();
    assert_eq!(
        s.schema_to_json(None).unwrap(),
        "{field:{name:\"id\",colnum:1,type:\"uint32\"}}"
    );
    assert_eq!(
        s.schema_to_json(Some("  ")).unwrap(),
        "{\n  field: {\n    name: \"id\",\n    colnum: 1,\n    type: \"uint32\"\n  }\n}"
    );
}

#[test]
fn enum_fields_list_their_items() {
    let mut s = SchemaDict::new();
    s.add_field("id", FieldType::Uint32, 1).unwrap();
    s.add_field("color", FieldType::ENUM, 2).unwrap();
    s.add_enum_value(2, "red", 0).unwrap();
    s.add_enum_value(2, "green", 1).unwrap();
    s.add_enum_value(2, "none", DENIL_UINT16).unwrap();
    // labels of a column without an enum field are not listed
    s.add_enum_value(3, "orphan", 0).unwrap();

    let expected = concat!(
        "{field:[",
        "{name:\"id\",colnum:1,type:\"uint32\"},",
        "{name:\"color\",colnum:2,type:\"uint16\",",
        "enum:[{value:0,name:\"enum:red\"},{value:1,name:\"enum:green\"}]}",
        "]}"
    );
    assert_eq!(s.schema_to_json(None).unwrap(), expected);
}

#[test]
fn enum_array_field_lists_items_once() {
    let mut s = SchemaDict::new();
    s.add_field("tags", FieldType::ARRAY_ENUM, 4).unwrap();
    s.add_enum_value(4, "hot", 3).unwrap();
    assert_eq!(
        s.schema_to_json(None).unwrap(),
        "{field:{name:\"tags\",colnum:4,type:\"uint16[]\",enum:{value:3,name:\"enum:hot\"}}}"
    );
}

#[test]
fn schema_json_is_strict_json_parseable() {
    let mut s = SchemaDict::new();
    s.add_field("id", FieldType::Uint32, 1).unwrap();
    s.add_field("", FieldType::Cstr, 2).unwrap();
    let mut b = TupleBuilder::new(4, 256).unwrap();
    b.insert_u32(1, 7).unwrap();
    b.insert_str(2, "x").unwrap();
    let view = b.freeze(false).unwrap();
    let text = tuple_to_json(&view, None, 0, &s, JsonFlags::DISABLE_JSON5).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["id"], 7);
    assert_eq!(parsed["@2"], "x");

    let described = s.schema_to_json(Some("  ")).unwrap();
    assert!(described.contains("name: \"\""));
}
