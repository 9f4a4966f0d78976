use std::marker::PhantomData;

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::StoreError;

/// Characters of an error body kept in `StoreError::Server`.
const ERROR_BODY_LIMIT: usize = 100;

/// One REST resource collection (`{base}/{name}`) of the persistence API.
pub struct Collection<T> {
    client: Client,
    endpoint: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: DeserializeOwned + Serialize,
{
    pub fn new(client: Client, base_url: &str, name: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/{name}", base_url.trim_end_matches('/')),
            _record: PhantomData,
        }
    }

    /// Lists records matching `query`, scoped to `user_id` when signed in.
    pub async fn find(
        &self,
        user_id: Option<&str>,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, StoreError> {
        let mut params: Vec<(&str, &str)> = query.to_vec();
        if let Some(user_id) = user_id {
            params.push(("userId", user_id));
        }

        let response = self.client.get(&self.endpoint).query(&params).send().await?;
        match read_json(response).await? {
            Value::Array(items) => items.into_iter().map(decode).collect(),
            other => Err(StoreError::InvalidResponse(format!(
                "expected a JSON array, got {}",
                kind_of(&other)
            ))),
        }
    }

    pub async fn find_one(&self, id: &str) -> Result<Option<T>, StoreError> {
        let response = self
            .client
            .get(format!("{}/{id}", self.endpoint))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_optional(read_json(response).await?)
    }

    pub async fn insert_one(&self, user_id: Option<&str>, doc: &T) -> Result<T, StoreError> {
        let body = with_user(serde_json::to_value(doc)?, user_id);
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        decode(read_json(response).await?)
    }

    /// Applies a partial update. `None` when the record does not exist.
    pub async fn update_one(
        &self,
        user_id: Option<&str>,
        id: &str,
        updates: Value,
    ) -> Result<Option<T>, StoreError> {
        let body = with_user(updates, user_id);
        let response = self
            .client
            .patch(format!("{}/{id}", self.endpoint))
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_optional(read_json(response).await?)
    }

    /// Deletes a record. `false` when it does not exist; other failures are errors.
    pub async fn delete_one(&self, id: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .delete(format!("{}/{id}", self.endpoint))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let text = response.text().await?;
            return Err(error_from(status, &text));
        }
        Ok(true)
    }
}

/// Reads a response body as JSON, mapping non-2xx statuses onto `StoreError`.
pub(super) async fn read_json(response: Response) -> Result<Value, StoreError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(error_from(status, &text));
    }

    serde_json::from_str(&text)
        .map_err(|e| StoreError::InvalidResponse(format!("server response is not JSON: {e}")))
}

pub(super) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    serde_json::from_value(normalize_id(value))
        .map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

pub(super) fn decode_optional<T: DeserializeOwned>(value: Value) -> Result<Option<T>, StoreError> {
    match value {
        Value::Null => Ok(None),
        other => decode(other).map(Some),
    }
}

fn error_from(status: StatusCode, body: &str) -> StoreError {
    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound(
            error_message(body).unwrap_or_else(|| "Record not found".to_string()),
        );
    }
    if status.is_client_error() {
        if let Some(message) = error_message(body) {
            return StoreError::Rejected {
                status: status.as_u16(),
                message,
            };
        }
    }
    StoreError::Server {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_LIMIT).collect(),
    }
}

/// The persistence API reports failures as `{"error": "..."}`.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(String::from)
}

fn with_user(mut body: Value, user_id: Option<&str>) -> Value {
    if let (Some(user_id), Some(map)) = (user_id, body.as_object_mut()) {
        map.insert("userId".to_string(), Value::String(user_id.to_string()));
    }
    body
}

/// Documents created outside this service may only carry the store's `_id`.
fn normalize_id(mut value: Value) -> Value {
    if let Some(map) = value.as_object_mut() {
        let has_id = map
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty());
        if !has_id {
            let fallback = match map.get("_id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Object(oid)) => oid.get("$oid").and_then(Value::as_str).map(String::from),
                _ => None,
            };
            if let Some(id) = fallback {
                map.insert("id".to_string(), Value::String(id));
            }
        }
    }
    value
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_normalize_id_copies_string_underscore_id() {
        let value = normalize_id(json!({"_id": "65ab", "title": "x"}));
        assert_eq!(value["id"], "65ab");
    }

    #[test]
    fn test_normalize_id_copies_oid_object() {
        let value = normalize_id(json!({"_id": {"$oid": "65ab"}}));
        assert_eq!(value["id"], "65ab");
    }

    #[test]
    fn test_normalize_id_keeps_existing_id() {
        let value = normalize_id(json!({"id": "j-1", "_id": "65ab"}));
        assert_eq!(value["id"], "j-1");
    }

    #[test]
    fn test_with_user_adds_scope_only_when_signed_in() {
        assert_eq!(with_user(json!({"a": 1}), Some("u-1"))["userId"], "u-1");
        assert!(with_user(json!({"a": 1}), None).get("userId").is_none());
    }

    #[test]
    fn test_server_error_body_is_truncated() {
        let body = "x".repeat(500);
        match error_from(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            StoreError::Server { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), ERROR_BODY_LIMIT);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_client_error_with_message_is_rejected() {
        let err = error_from(StatusCode::UNAUTHORIZED, r#"{"error": "Invalid credentials"}"#);
        assert!(matches!(
            err,
            StoreError::Rejected { status: 401, ref message } if message == "Invalid credentials"
        ));
    }
}
