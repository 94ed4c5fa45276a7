//! Standard response envelope helpers. Keys of every payload are converted to camelCase.

use crate::case::value_keys_to_camel_case_recursive;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

pub fn success_one(mut data: Value) -> (StatusCode, Json<SuccessOne<Value>>) {
    value_keys_to_camel_case_recursive(&mut data);
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_many(mut data: Vec<Value>) -> (StatusCode, Json<SuccessMany<Value>>) {
    for row in data.iter_mut() {
        value_keys_to_camel_case_recursive(row);
    }
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}
