//! Test fixtures for schema reader integration tests
//!
//! Tables are described the way `information_schema` reports them on
//! PostgreSQL: column name plus `udt_name`, in ordinal order.

#![allow(dead_code)]

use schemadelta_catalog::MemoryReaderBuilder;

/// A person table with one column of an unsupported type
pub fn person_columns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("id", "int4"),
        ("firstName", "varchar"),
        ("weirdo", "polygon"),
    ]
}

/// A movie table
pub fn movie_columns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("id", "int4"),
        ("title", "varchar"),
        ("releasedAt", "timestamptz"),
        ("budget", "numeric"),
        ("metadata", "jsonb"),
    ]
}

/// Join table between people and movies
pub fn person_movie_columns() -> Vec<(&'static str, &'static str)> {
    vec![("personId", "int4"), ("movieId", "int4"), ("role", "text")]
}

/// One column per supported PostgreSQL type, named after the type
pub fn all_supported_columns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("c_varchar", "varchar"),
        ("c_bpchar", "bpchar"),
        ("c_text", "text"),
        ("c_bool", "bool"),
        ("c_int2", "int2"),
        ("c_int4", "int4"),
        ("c_int8", "int8"),
        ("c_numeric", "numeric"),
        ("c_float4", "float4"),
        ("c_float8", "float8"),
        ("c_date", "date"),
        ("c_timestamp", "timestamp"),
        ("c_timestamptz", "timestamptz"),
        ("c_time", "time"),
        ("c_json", "json"),
        ("c_jsonb", "jsonb"),
        ("c_bytea", "bytea"),
    ]
}

/// PostgreSQL types the kind normalizer does not recognize
pub fn unsupported_columns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("c_uuid", "uuid"),
        ("c_polygon", "polygon"),
        ("c_inet", "inet"),
        ("c_int_array", "int4[]"),
    ]
}

/// A small catalog with the person, movie and join tables
pub fn cinema_builder() -> MemoryReaderBuilder {
    MemoryReaderBuilder::new()
        .with_table("Person", person_columns())
        .with_table("Movie", movie_columns())
        .with_table("Person_Movie", person_movie_columns())
}

/// The same catalog as a JSON snapshot
pub fn cinema_snapshot_json() -> String {
    let table = |columns: Vec<(&str, &str)>| {
        serde_json::Value::Object(
            columns
                .into_iter()
                .map(|(name, native)| (name.to_string(), serde_json::Value::from(native)))
                .collect(),
        )
    };

    serde_json::json!({
        "Person": table(person_columns()),
        "Movie": table(movie_columns()),
        "Person_Movie": table(person_movie_columns()),
    })
    .to_string()
}
