use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Result, SessionKey};

/// The stored form of a session: a flat map of top-level sections.
pub type StateBag = serde_json::Map<String, Value>;

/// Removes `field` from `state` and decodes it.
///
/// A missing or `null` section decodes to `T::default()`.
pub fn decode_field<T>(state: &mut StateBag, field: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match state.remove(field) {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// Core trait for session storage backends.
///
/// Implementations must be safe to share between concurrent requests for
/// different users. Requests for the *same* user are not serialized here;
/// callers that need that use [`crate::UserLocks`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session state, or an empty map if none is stored.
    async fn get(&self, key: &SessionKey) -> Result<StateBag>;

    /// Shallow-merges `partial` into the stored state.
    ///
    /// Keys present in `partial` overwrite the stored values; every other
    /// stored key is left untouched. Creates the session if absent.
    async fn merge(&self, key: &SessionKey, partial: StateBag) -> Result<()>;

    /// Replaces the stored state wholesale.
    async fn replace(&self, key: &SessionKey, full: StateBag) -> Result<()>;
}

/// Typed access to individual session sections.
#[async_trait]
pub trait SessionStoreExt: SessionStore {
    /// Loads one section, falling back to `T::default()` when it is absent.
    async fn load_field<T>(&self, key: &SessionKey, field: &str) -> Result<T>
    where
        T: DeserializeOwned + Default + Send,
    {
        let mut state = self.get(key).await?;
        decode_field(&mut state, field)
    }

    /// Writes one section, leaving the rest of the session as it was.
    async fn store_field<T>(&self, key: &SessionKey, field: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let mut partial = StateBag::new();
        partial.insert(field.to_string(), serde_json::to_value(value)?);
        self.merge(key, partial).await
    }
}

// Blanket implementation for all SessionStore implementations
impl<T: SessionStore + ?Sized> SessionStoreExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionStoreError;
    use serde_json::json;

    fn bag(value: Value) -> StateBag {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn decode_field_takes_only_the_named_section() {
        let mut state = bag(json!({ "count": 3, "name": "tea" }));

        let count: u32 = decode_field(&mut state, "count").unwrap();

        assert_eq!(count, 3);
        assert!(!state.contains_key("count"));
        assert_eq!(state["name"], "tea");
    }

    #[test]
    fn decode_field_defaults_missing_and_null_sections() {
        let mut state = bag(json!({ "items": null }));

        let items: Vec<u32> = decode_field(&mut state, "items").unwrap();
        let absent: Option<String> = decode_field(&mut state, "absent").unwrap();

        assert!(items.is_empty());
        assert!(absent.is_none());
    }

    #[test]
    fn decode_field_reports_malformed_sections() {
        let mut state = bag(json!({ "count": "three" }));

        let err = decode_field::<u32>(&mut state, "count").unwrap_err();

        assert!(matches!(err, SessionStoreError::Serialization(_)));
    }
}
