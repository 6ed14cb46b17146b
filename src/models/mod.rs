// src/models/mod.rs

pub mod analytics;
pub mod fields;
pub mod scenario;
pub mod simulation;
pub mod submission;
pub mod task;
pub mod user;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::AppError,
    store::{Record, into_record},
};

/// Reads a typed entity out of a stored record.
/// A record that does not fit its model is a server-side fault.
pub fn decode<T: DeserializeOwned>(record: Record) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::Object(record)).map_err(|e| {
        tracing::error!("Failed to decode record: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })
}

pub fn decode_all<T: DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, AppError> {
    records.into_iter().map(decode).collect()
}

/// Serializes a new entity into a record body for the store.
pub fn encode<T: Serialize>(value: &T) -> Result<Record, AppError> {
    let value = serde_json::to_value(value)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    into_record(value)
}
