//! Remote API collaborator.
//!
//! The dispatch core never talks to the network itself. Handlers receive a
//! [`BoxedBot`] and use it to call Bot API methods; the transport behind it
//! is supplied by the runtime (or by a test double).

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult, ResponseParameters};
use crate::types::Update;

/// A capability to invoke Bot API methods.
#[async_trait]
pub trait BotApi: Send + Sync + 'static {
    /// Calls `method` with JSON `params` and returns the raw `result` field.
    async fn call(&self, method: &str, params: Value) -> ApiResult<Value>;
}

/// Shared, type-erased bot handle.
pub type BoxedBot = Arc<dyn BotApi>;

/// Typed helpers on top of [`BotApi::call`].
#[async_trait]
pub trait BotApiExt: BotApi {
    /// Serializes `params`, calls `method` and deserializes the result.
    async fn request<P, R>(&self, method: &str, params: &P) -> ApiResult<R>
    where
        P: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let params = serde_json::to_value(params).map_err(ApiError::decode)?;
        let raw = self.call(method, params).await?;
        serde_json::from_value(raw).map_err(ApiError::decode)
    }

    /// Long-polls for new updates.
    async fn get_updates(&self, params: &GetUpdates) -> ApiResult<Vec<Update>> {
        self.request("getUpdates", params).await
    }

    /// Acknowledges a callback query so the client stops its spinner.
    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> ApiResult<bool> {
        let mut params = serde_json::json!({ "callback_query_id": callback_query_id });
        if let Some(text) = text {
            params["text"] = Value::String(text.to_string());
        }
        let raw = self.call("answerCallbackQuery", params).await?;
        serde_json::from_value(raw).map_err(ApiError::decode)
    }

    /// Sends a plain text message.
    async fn send_message(&self, chat_id: i64, text: &str) -> ApiResult<Value> {
        self.call(
            "sendMessage",
            serde_json::json!({ "chat_id": chat_id, "text": text }),
        )
        .await
    }
}

impl<T: BotApi + ?Sized> BotApiExt for T {}

/// Parameters of `getUpdates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_updates: Vec<String>,
}

/// The envelope every Bot API response is wrapped in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error_code: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

impl ApiResponse {
    /// Converts the envelope into the `result` payload or an [`ApiError`].
    pub fn into_result(self) -> ApiResult<Value> {
        if self.ok {
            return Ok(self.result.unwrap_or(Value::Null));
        }
        let err = ApiError::remote(
            self.error_code.unwrap_or_default(),
            self.description.unwrap_or_default(),
        );
        Err(match self.parameters {
            Some(params) => err.with_parameters(params),
            None => err,
        })
    }
}

/// Parses a raw response body.
pub fn parse_response(body: &[u8]) -> ApiResult<Value> {
    let envelope: ApiResponse = serde_json::from_slice(body).map_err(ApiError::decode)?;
    envelope.into_result()
}
