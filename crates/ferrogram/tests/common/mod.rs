#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use ferrogram::core::{ApiResult, BotApi, BoxedBot, Update};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Records `sendMessage` calls and answers every method successfully.
#[derive(Default)]
pub struct RecordingBot {
    sent: Mutex<Vec<(i64, String)>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingBot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn boxed(self: &Arc<Self>) -> BoxedBot {
        self.clone()
    }

    /// Texts sent to `chat_id`, oldest first.
    pub fn sent_to(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(chat, _)| *chat == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BotApi for RecordingBot {
    async fn call(&self, method: &str, params: Value) -> ApiResult<Value> {
        self.calls.lock().push(method.to_string());
        if method == "sendMessage" {
            let chat = params["chat_id"].as_i64().unwrap_or_default();
            let text = params["text"].as_str().unwrap_or_default().to_string();
            self.sent.lock().push((chat, text));
            return Ok(json!({ "message_id": 1, "chat": { "id": chat, "type": "private" } }));
        }
        Ok(Value::Bool(true))
    }
}

pub fn text(user_id: i64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": 1,
        "message": {
            "message_id": 1,
            "from": { "id": user_id, "is_bot": false, "first_name": "User" },
            "chat": { "id": user_id, "type": "private" },
            "date": 0,
            "text": text
        }
    }))
    .unwrap()
}

pub fn callback(user_id: i64, data: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": 2,
        "callback_query": {
            "id": "cq-1",
            "from": { "id": user_id, "is_bot": false, "first_name": "User" },
            "message": {
                "message_id": 5,
                "chat": { "id": user_id, "type": "private" },
                "date": 0,
                "text": "menu"
            },
            "data": data
        }
    }))
    .unwrap()
}
