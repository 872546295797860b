use super::models::{ArrayValue, MapValue, Value, ValueType};
use super::FirestoreError;
use serde::de::Error;
use serde::ser::Error as SerError;
use serde_json::map::Map;
use serde_json::Value as SerdeValue;
use std::collections::HashMap;

// Firestore's typed value map -> plain JSON object
pub(crate) fn convert_fields_to_serde_value(
    fields: HashMap<String, Value>,
) -> Result<SerdeValue, FirestoreError> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key, convert_value_to_serde_value(value)?);
    }
    Ok(SerdeValue::Object(map))
}

pub(crate) fn convert_value_to_serde_value(value: Value) -> Result<SerdeValue, FirestoreError> {
    use serde_json::json;
    Ok(match value.value_type {
        ValueType::StringValue(s) => SerdeValue::String(s),
        ValueType::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|e| {
                <serde_json::Error as Error>::custom(format!(
                    "Failed to parse integer string '{}': {}",
                    s, e
                ))
            })?;
            SerdeValue::Number(i.into())
        }
        ValueType::DoubleValue(d) => SerdeValue::Number(
            serde_json::Number::from_f64(d).ok_or_else(|| {
                <serde_json::Error as Error>::custom(format!("Invalid f64 value: {}", d))
            })?,
        ),
        ValueType::BooleanValue(b) => SerdeValue::Bool(b),
        ValueType::MapValue(map_value) => convert_fields_to_serde_value(map_value.fields)?,
        ValueType::ArrayValue(array_value) => {
            let values = array_value
                .values
                .into_iter()
                .map(convert_value_to_serde_value)
                .collect::<Result<Vec<_>, _>>()?;
            SerdeValue::Array(values)
        }
        ValueType::NullValue(_) => SerdeValue::Null,
        ValueType::TimestampValue(s) => SerdeValue::String(s),
        ValueType::GeoPointValue(gp) => {
            json!({ "latitude": gp.latitude, "longitude": gp.longitude })
        }
        ValueType::BytesValue(s) => SerdeValue::String(s),
        ValueType::ReferenceValue(s) => SerdeValue::String(s),
    })
}

// Plain JSON object -> Firestore's typed value map
pub(crate) fn convert_object_to_fields(
    object: Map<String, SerdeValue>,
) -> Result<HashMap<String, Value>, FirestoreError> {
    object
        .into_iter()
        .map(|(k, v)| convert_serde_value_to_firestore_value(v).map(|value| (k, value)))
        .collect()
}

pub(crate) fn convert_serde_value_to_firestore_value(
    value: SerdeValue,
) -> Result<Value, FirestoreError> {
    let value_type = match value {
        SerdeValue::Null => ValueType::NullValue(()),
        SerdeValue::Bool(b) => ValueType::BooleanValue(b),
        SerdeValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ValueType::IntegerValue(i.to_string())
            } else if let Some(f) = n.as_f64() {
                ValueType::DoubleValue(f)
            } else {
                return Err(FirestoreError::SerializationError(SerError::custom(
                    format!("Unsupported number type: {}", n)
                )));
            }
        }
        SerdeValue::String(s) => ValueType::StringValue(s),
        SerdeValue::Array(a) => {
            let values = a
                .into_iter()
                .map(convert_serde_value_to_firestore_value)
                .collect::<Result<Vec<_>, _>>()?;
            ValueType::ArrayValue(ArrayValue { values })
        }
        SerdeValue::Object(o) => ValueType::MapValue(MapValue {
            fields: convert_object_to_fields(o)?,
        }),
    };
    Ok(Value { value_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_firestore_document_fields_to_json() {
        let fields: HashMap<String, Value> = serde_json::from_value(json!({
            "name": { "stringValue": "Runners" },
            "memberIds": { "arrayValue": { "values": [{ "stringValue": "u1" }] } },
            "createdAt": { "timestampValue": "2024-05-01T09:30:00.123456Z" },
            "streak": { "integerValue": "12" },
            "archived": { "booleanValue": false },
            "empty": { "arrayValue": {} }
        }))
        .unwrap();

        let value = convert_fields_to_serde_value(fields).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Runners",
                "memberIds": ["u1"],
                "createdAt": "2024-05-01T09:30:00.123456Z",
                "streak": 12,
                "archived": false,
                "empty": []
            })
        );
    }

    #[test]
    fn test_json_object_to_firestore_fields() {
        let object = json!({ "goal": "Run 5k", "memberIds": ["u1"], "score": 1.5 });
        let SerdeValue::Object(object) = object else {
            unreachable!()
        };

        let fields = convert_object_to_fields(object).unwrap();
        let wire = serde_json::to_value(&fields).unwrap();
        assert_eq!(
            wire,
            json!({
                "goal": { "stringValue": "Run 5k" },
                "memberIds": { "arrayValue": { "values": [{ "stringValue": "u1" }] } },
                "score": { "doubleValue": 1.5 }
            })
        );
    }

    #[test]
    fn test_bad_integer_is_rejected() {
        let value = Value {
            value_type: ValueType::IntegerValue("twelve".to_string()),
        };
        assert!(convert_value_to_serde_value(value).is_err());
    }
}
