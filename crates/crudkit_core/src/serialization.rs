//! Bridge from serializable models to flat store field maps.
//!
//! # Responsibility
//! - Flatten any `Serialize` model into column name -> store value pairs.
//! - Offer an explicit `FieldMap` builder for models that declare their
//!   columns by hand.
//!
//! # Invariants
//! - Only flat records are accepted; nested objects and arrays are rejected
//!   instead of being stored in some lossy form.
//! - Every produced value is one of text, integer, real, null or blob.
//! - Non-finite floats are rejected; JSON would silently turn them into null.

use crate::db::FieldMap;
use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EncodeResult<T> = Result<T, EncodingError>;

/// Model could not be turned into a flat field map.
#[derive(Debug)]
pub enum EncodingError {
    Serialize(serde_json::Error),
    /// Top-level encoding is not a keyed record.
    NotAnObject,
    /// Field holds an array or object.
    NestedField(String),
    /// Unsigned integer above `i64::MAX`.
    UnrepresentableNumber(String),
    /// Value has no store-primitive representation.
    UnsupportedValue(String),
}

impl Display for EncodingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "model serialization failed: {err}"),
            Self::NotAnObject => write!(f, "model does not encode to a keyed record"),
            Self::NestedField(field) => {
                write!(f, "field `{field}` is nested and cannot be stored as a column")
            }
            Self::UnrepresentableNumber(field) => {
                write!(f, "field `{field}` holds a number outside the 64-bit integer range")
            }
            Self::UnsupportedValue(field) => {
                write!(f, "field `{field}` has no store value representation")
            }
        }
    }
}

impl Error for EncodingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EncodingError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Serializes `model` and reinterprets it as a flat field map, leaving out
/// the `skip` columns.
pub fn encode_fields<T: Serialize + ?Sized>(model: &T, skip: &[&str]) -> EncodeResult<FieldMap> {
    if let Some(field) = float_scan::non_finite_field(model, skip) {
        return Err(EncodingError::UnsupportedValue(field));
    }
    let JsonValue::Object(record) = serde_json::to_value(model)? else {
        return Err(EncodingError::NotAnObject);
    };

    let mut fields = FieldMap::new();
    for (name, value) in record {
        if skip.contains(&name.as_str()) {
            continue;
        }
        let value = json_to_store_value(&name, value)?;
        fields.insert(name, value);
    }
    Ok(fields)
}

fn json_to_store_value(field: &str, value: JsonValue) -> EncodeResult<Value> {
    match value {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(flag) => Ok(Value::Integer(i64::from(flag))),
        JsonValue::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(Value::Integer(int))
            } else if number.is_u64() {
                Err(EncodingError::UnrepresentableNumber(field.to_string()))
            } else {
                number
                    .as_f64()
                    .map(Value::Real)
                    .ok_or_else(|| EncodingError::UnsupportedValue(field.to_string()))
            }
        }
        JsonValue::String(text) => Ok(Value::Text(text)),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            Err(EncodingError::NestedField(field.to_string()))
        }
    }
}

impl FieldMap {
    /// Builder step for explicitly declared columns.
    ///
    /// ```
    /// use crudkit_core::FieldMap;
    ///
    /// let fields = FieldMap::new()
    ///     .field("name", "Rex")?
    ///     .field("age", 10_i64)?
    ///     .field("avatar", vec![0_u8, 1, 2])?;
    /// assert_eq!(fields.len(), 3);
    /// # Ok::<(), crudkit_core::EncodingError>(())
    /// ```
    pub fn field(mut self, column: &str, value: impl ToSql) -> EncodeResult<Self> {
        let output = value
            .to_sql()
            .map_err(|_| EncodingError::UnsupportedValue(column.to_string()))?;
        let value = match output {
            ToSqlOutput::Borrowed(value_ref) => Value::from(value_ref),
            ToSqlOutput::Owned(value) => value,
            _ => return Err(EncodingError::UnsupportedValue(column.to_string())),
        };
        self.insert(column, value);
        Ok(self)
    }
}

/// Pre-pass over the top-level fields looking for `NaN` and infinities.
///
/// Anything it does not understand is left for the JSON pass to report.
mod float_scan {
    use serde::ser::{self, Impossible, Serialize, SerializeMap, SerializeStruct, Serializer};
    use serde_json::Value as JsonValue;
    use std::error::Error;
    use std::fmt::{Display, Formatter};

    pub(super) fn non_finite_field<T: Serialize + ?Sized>(
        model: &T,
        skip: &[&str],
    ) -> Option<String> {
        match model.serialize(RecordScan { skip }) {
            Err(ScanError::NonFinite(field)) => Some(field),
            _ => None,
        }
    }

    #[derive(Debug)]
    pub(super) enum ScanError {
        NonFinite(String),
        /// Shape the scan does not descend into.
        Skip,
        Custom,
    }

    impl Display for ScanError {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::NonFinite(field) => write!(f, "field `{field}` is not a finite number"),
                Self::Skip => write!(f, "value not scanned"),
                Self::Custom => write!(f, "serialization failed"),
            }
        }
    }

    impl Error for ScanError {}

    impl ser::Error for ScanError {
        fn custom<T: Display>(_msg: T) -> Self {
            Self::Custom
        }
    }

    fn scan_field<T: Serialize + ?Sized>(
        skip: &[&str],
        field: &str,
        value: &T,
    ) -> Result<(), ScanError> {
        if skip.contains(&field) {
            return Ok(());
        }
        match value.serialize(FieldScan { field }) {
            Err(ScanError::NonFinite(field)) => Err(ScanError::NonFinite(field)),
            _ => Ok(()),
        }
    }

    macro_rules! accept_scalars {
        ($($method:ident: $ty:ty),* $(,)?) => {
            $(
                fn $method(self, _value: $ty) -> Result<(), ScanError> {
                    Ok(())
                }
            )*
        };
    }

    macro_rules! skip_compounds {
        () => {
            fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ScanError> {
                Err(ScanError::Skip)
            }

            fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ScanError> {
                Err(ScanError::Skip)
            }

            fn serialize_tuple_struct(
                self,
                _name: &'static str,
                _len: usize,
            ) -> Result<Self::SerializeTupleStruct, ScanError> {
                Err(ScanError::Skip)
            }

            fn serialize_tuple_variant(
                self,
                _name: &'static str,
                _index: u32,
                _variant: &'static str,
                _len: usize,
            ) -> Result<Self::SerializeTupleVariant, ScanError> {
                Err(ScanError::Skip)
            }

            fn serialize_struct_variant(
                self,
                _name: &'static str,
                _index: u32,
                _variant: &'static str,
                _len: usize,
            ) -> Result<Self::SerializeStructVariant, ScanError> {
                Err(ScanError::Skip)
            }

            fn serialize_unit(self) -> Result<(), ScanError> {
                Ok(())
            }

            fn serialize_none(self) -> Result<(), ScanError> {
                Ok(())
            }

            fn serialize_unit_struct(self, _name: &'static str) -> Result<(), ScanError> {
                Ok(())
            }

            fn serialize_unit_variant(
                self,
                _name: &'static str,
                _index: u32,
                _variant: &'static str,
            ) -> Result<(), ScanError> {
                Ok(())
            }

            fn serialize_newtype_variant<T: Serialize + ?Sized>(
                self,
                _name: &'static str,
                _index: u32,
                _variant: &'static str,
                _value: &T,
            ) -> Result<(), ScanError> {
                Err(ScanError::Skip)
            }

            fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), ScanError> {
                value.serialize(self)
            }

            fn serialize_newtype_struct<T: Serialize + ?Sized>(
                self,
                _name: &'static str,
                value: &T,
            ) -> Result<(), ScanError> {
                value.serialize(self)
            }

            accept_scalars! {
                serialize_bool: bool,
                serialize_i8: i8,
                serialize_i16: i16,
                serialize_i32: i32,
                serialize_i64: i64,
                serialize_u8: u8,
                serialize_u16: u16,
                serialize_u32: u32,
                serialize_u64: u64,
                serialize_char: char,
                serialize_str: &str,
                serialize_bytes: &[u8],
            }
        };
    }

    /// Walks the record itself: struct fields or string-keyed map entries.
    struct RecordScan<'a> {
        skip: &'a [&'a str],
    }

    impl<'a> Serializer for RecordScan<'a> {
        type Ok = ();
        type Error = ScanError;
        type SerializeSeq = Impossible<(), ScanError>;
        type SerializeTuple = Impossible<(), ScanError>;
        type SerializeTupleStruct = Impossible<(), ScanError>;
        type SerializeTupleVariant = Impossible<(), ScanError>;
        type SerializeMap = MapScan<'a>;
        type SerializeStruct = StructScan<'a>;
        type SerializeStructVariant = Impossible<(), ScanError>;

        skip_compounds!();

        accept_scalars! {
            serialize_f32: f32,
            serialize_f64: f64,
        }

        fn serialize_map(self, _len: Option<usize>) -> Result<MapScan<'a>, ScanError> {
            Ok(MapScan {
                skip: self.skip,
                key: None,
            })
        }

        fn serialize_struct(
            self,
            _name: &'static str,
            _len: usize,
        ) -> Result<StructScan<'a>, ScanError> {
            Ok(StructScan { skip: self.skip })
        }
    }

    struct StructScan<'a> {
        skip: &'a [&'a str],
    }

    impl SerializeStruct for StructScan<'_> {
        type Ok = ();
        type Error = ScanError;

        fn serialize_field<T: Serialize + ?Sized>(
            &mut self,
            key: &'static str,
            value: &T,
        ) -> Result<(), ScanError> {
            scan_field(self.skip, key, value)
        }

        fn end(self) -> Result<(), ScanError> {
            Ok(())
        }
    }

    struct MapScan<'a> {
        skip: &'a [&'a str],
        key: Option<String>,
    }

    impl SerializeMap for MapScan<'_> {
        type Ok = ();
        type Error = ScanError;

        fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ScanError> {
            self.key = match key.serialize(serde_json::value::Serializer) {
                Ok(JsonValue::String(key)) => Some(key),
                _ => None,
            };
            Ok(())
        }

        fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ScanError> {
            match self.key.take() {
                Some(field) => scan_field(self.skip, &field, value),
                None => Ok(()),
            }
        }

        fn end(self) -> Result<(), ScanError> {
            Ok(())
        }
    }

    /// Inspects one field value; only scalars and their wrappers are checked.
    struct FieldScan<'a> {
        field: &'a str,
    }

    impl FieldScan<'_> {
        fn check(self, finite: bool) -> Result<(), ScanError> {
            if finite {
                Ok(())
            } else {
                Err(ScanError::NonFinite(self.field.to_string()))
            }
        }
    }

    impl Serializer for FieldScan<'_> {
        type Ok = ();
        type Error = ScanError;
        type SerializeSeq = Impossible<(), ScanError>;
        type SerializeTuple = Impossible<(), ScanError>;
        type SerializeTupleStruct = Impossible<(), ScanError>;
        type SerializeTupleVariant = Impossible<(), ScanError>;
        type SerializeMap = Impossible<(), ScanError>;
        type SerializeStruct = Impossible<(), ScanError>;
        type SerializeStructVariant = Impossible<(), ScanError>;

        skip_compounds!();

        fn serialize_f32(self, value: f32) -> Result<(), ScanError> {
            self.check(value.is_finite())
        }

        fn serialize_f64(self, value: f64) -> Result<(), ScanError> {
            self.check(value.is_finite())
        }

        fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ScanError> {
            Err(ScanError::Skip)
        }

        fn serialize_struct(
            self,
            _name: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeStruct, ScanError> {
            Err(ScanError::Skip)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_fields, EncodingError};
    use crate::db::FieldMap;
    use rusqlite::types::Value;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Dog {
        id: Option<i64>,
        name: String,
        age: u8,
        weight: f64,
        good: bool,
        nickname: Option<String>,
    }

    #[derive(Serialize)]
    struct Kennel {
        name: String,
        dogs: Vec<String>,
    }

    #[derive(Serialize)]
    struct Counter {
        hits: u64,
    }

    #[derive(Serialize)]
    struct Reading {
        id: Option<i64>,
        value: f64,
        peak: Option<f32>,
    }

    #[test]
    fn flat_record_maps_to_primitive_values() {
        let dog = Dog {
            id: None,
            name: "Rex".to_string(),
            age: 10,
            weight: 12.5,
            good: true,
            nickname: None,
        };

        let fields = encode_fields(&dog, &["id"]).expect("flat model should encode");
        assert_eq!(fields.len(), 5);
        assert!(fields.get("id").is_none());
        assert_eq!(fields.get("name"), Some(&Value::Text("Rex".to_string())));
        assert_eq!(fields.get("age"), Some(&Value::Integer(10)));
        assert_eq!(fields.get("weight"), Some(&Value::Real(12.5)));
        assert_eq!(fields.get("good"), Some(&Value::Integer(1)));
        assert_eq!(fields.get("nickname"), Some(&Value::Null));
    }

    #[test]
    fn nested_field_is_rejected() {
        let kennel = Kennel {
            name: "North".to_string(),
            dogs: vec!["Rex".to_string()],
        };
        let err = encode_fields(&kennel, &[]).expect_err("arrays are not columns");
        assert!(matches!(err, EncodingError::NestedField(field) if field == "dogs"));
    }

    #[test]
    fn non_record_is_rejected() {
        let err = encode_fields(&42_i64, &[]).expect_err("scalars are not records");
        assert!(matches!(err, EncodingError::NotAnObject));
    }

    #[test]
    fn u64_above_i64_range_is_rejected() {
        let err = encode_fields(&Counter { hits: u64::MAX }, &[])
            .expect_err("u64::MAX does not fit");
        assert!(matches!(err, EncodingError::UnrepresentableNumber(_)));

        let fields = encode_fields(&Counter { hits: 7 }, &[]).expect("small u64 fits");
        assert_eq!(fields.get("hits"), Some(&Value::Integer(7)));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let reading = Reading {
                id: None,
                value,
                peak: None,
            };
            let err = encode_fields(&reading, &["id"]).expect_err("non-finite float");
            assert!(matches!(err, EncodingError::UnsupportedValue(field) if field == "value"));
        }

        let reading = Reading {
            id: None,
            value: 1.5,
            peak: Some(f32::NAN),
        };
        let err = encode_fields(&reading, &[]).expect_err("optional NaN is still NaN");
        assert!(matches!(err, EncodingError::UnsupportedValue(field) if field == "peak"));

        let mut record = BTreeMap::new();
        record.insert("value", f64::INFINITY);
        let err = encode_fields(&record, &[]).expect_err("map values are scanned too");
        assert!(matches!(err, EncodingError::UnsupportedValue(field) if field == "value"));

        let fields = encode_fields(&record, &["value"]).expect("skipped columns are not scanned");
        assert!(fields.is_empty());
    }

    #[test]
    fn map_keyed_models_encode_like_structs() {
        let mut record = BTreeMap::new();
        record.insert("email", "amelia@gastrobot.xyz");
        let fields = encode_fields(&record, &[]).expect("string map should encode");
        assert_eq!(
            fields.get("email"),
            Some(&Value::Text("amelia@gastrobot.xyz".to_string()))
        );
    }

    #[test]
    fn builder_accepts_blob_and_null() {
        let fields = FieldMap::new()
            .field("avatar", vec![1_u8, 2, 3])
            .and_then(|fields| fields.field("nickname", Option::<String>::None))
            .expect("builder should accept primitive values");
        assert_eq!(fields.get("avatar"), Some(&Value::Blob(vec![1, 2, 3])));
        assert_eq!(fields.get("nickname"), Some(&Value::Null));
    }
}
