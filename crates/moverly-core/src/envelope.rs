//! Backend response envelope.
//!
//! Every backend payload is decoded here, once, into either a success carrying
//! `data` or a failure carrying an error description. Any other shape is
//! rejected instead of being guessed at by the call site.

use crate::{MoverlyError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A decoded backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<T> {
    Success {
        data: T,
    },
    Failure {
        error: String,
        message: Option<String>,
    },
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning a failure envelope into [`MoverlyError::Api`].
    pub fn into_result(self, status: u16) -> Result<T> {
        match self {
            Envelope::Success { data } => Ok(data),
            Envelope::Failure { error, message } => Err(MoverlyError::Api {
                status,
                message: message.unwrap_or(error),
            }),
        }
    }
}

fn decode_error(message: impl Into<String>) -> MoverlyError {
    MoverlyError::Decode {
        message: message.into(),
    }
}

/// Parse a response body into an [`Envelope`].
///
/// The `data` key must be present for a success, even when `T` is an
/// `Option`; an explicit `null` is the only way to say "no payload".
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Envelope<T>> {
    let value: Value = serde_json::from_slice(body).map_err(|e| decode_error(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(decode_error("response body is not a JSON object"));
    };

    if let Some(data) = fields.remove("data") {
        let data = serde_json::from_value(data).map_err(|e| decode_error(e.to_string()))?;
        return Ok(Envelope::Success { data });
    }

    match fields.remove("error") {
        Some(Value::String(error)) => Ok(Envelope::Failure {
            error,
            message: optional_string(&mut fields, "message")?,
        }),
        Some(_) => Err(decode_error("`error` must be a string")),
        None => Err(decode_error("expected a `data` or `error` field")),
    }
}

fn optional_string(fields: &mut Map<String, Value>, key: &str) -> Result<Option<String>> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(decode_error(format!("`{key}` must be a string"))),
    }
}

/// Parse a body and return the payload, or the error it describes.
pub fn decode_data<T: DeserializeOwned>(body: &[u8], status: u16) -> Result<T> {
    decode::<T>(body)?.into_result(status)
}
