use serde::de::DeserializeOwned;

use crate::error::Cause;

/// Deserialize native JSON with JSON-path context in error messages.
pub fn from_json_with_path<T: DeserializeOwned>(json: &serde_json::Value) -> Result<T, Cause> {
    match serde_path_to_error::deserialize::<_, T>(json) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(Cause::msg(format!("at JSON path {path} → {}", err.into_inner())))
        }
    }
}
