//! Conversion of dynamically-shaped Postgres rows into JSON objects. The
//! CRUD layer has no compile-time row types, so columns are decoded by their
//! reported Postgres type name.

use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

#[must_use]
pub fn row_to_json(row: &PgRow) -> Value {
    let mut object = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, index, column.type_info().name());
        object.insert(column.name().to_string(), value);
    }
    Value::Object(object)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(index).ok().flatten().map_or(Value::Null, Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(index).ok().flatten().map_or(Value::Null, Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(index).ok().flatten().map_or(Value::Null, Value::from),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index).ok().flatten().map_or(Value::Null, Value::from),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index).ok().flatten().map_or(Value::Null, Value::from),
        "BOOL" => row.try_get::<Option<bool>, _>(index).ok().flatten().map_or(Value::Null, Value::from),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| Value::String(v.to_string())),
        "TIMESTAMPTZ" | "TIMESTAMP" => row
            .try_get::<Option<OffsetDateTime>, _>(index)
            .ok()
            .flatten()
            .and_then(|ts| ts.format(&Rfc3339).ok())
            .map_or(Value::Null, Value::String),
        // TEXT, VARCHAR, and anything else that decodes as text.
        _ => row.try_get::<Option<String>, _>(index).ok().flatten().map_or(Value::Null, Value::String),
    }
}
