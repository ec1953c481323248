use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::store::KeyValueStore;
use super::errors::RepositoryError;

/// Load a struct-typed value stored under `key`.
///
/// Only a JSON object is accepted. serde would otherwise decode an array
/// positionally into the struct's fields.
pub(crate) async fn load_object<S, T>(store: &S, key: &str) -> Result<Option<T>, RepositoryError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    load_shaped(store, key, Value::is_object).await
}

/// Load a list of struct-typed values stored under `key`.
///
/// The value must be an array whose elements are all objects.
pub(crate) async fn load_list<S, T>(store: &S, key: &str) -> Result<Option<Vec<T>>, RepositoryError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    load_shaped(store, key, |value| {
        value
            .as_array()
            .map_or(false, |items| items.iter().all(Value::is_object))
    })
    .await
}

/// Load and decode the JSON value under `key`.
///
/// A missing key, a value of the wrong shape and a value that no longer
/// decodes all come back as `None`; only store failures are errors.
async fn load_shaped<S, T>(
    store: &S,
    key: &str,
    expected_shape: impl Fn(&Value) -> bool,
) -> Result<Option<T>, RepositoryError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        debug!("No stored value for {}", key);
        return Ok(None);
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring malformed value stored under {}: {}", key, e);
            return Ok(None);
        }
    };

    if !expected_shape(&value) {
        warn!("Ignoring value of unexpected shape stored under {}", key);
        return Ok(None);
    }

    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            warn!("Ignoring malformed value stored under {}: {}", key, e);
            Ok(None)
        }
    }
}

/// Encode `value` as JSON and store it under `key`
pub(crate) async fn save<S, T>(store: &S, key: &str, value: &T) -> Result<(), RepositoryError>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let encoded = serde_json::to_string(value)?;
    store.set(key, encoded).await?;
    Ok(())
}
