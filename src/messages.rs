/// Cross-context message protocol (popup <-> background <-> content script)
use crate::history::{HistoryEntry, QrOptions};
use crate::storage::js_error_message;
use serde::{Deserialize, Serialize};
use std::fmt;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    fn runtime_send_message(message: &JsValue) -> Result<js_sys::Promise, JsValue>;
}

#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn sendToActiveTab(message: JsValue) -> Result<JsValue, JsValue>;
}

/// What a QR code carries between contexts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<QrOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverlayOptions {
    /// Milliseconds before the overlay closes itself; 0 keeps it open
    #[serde(default)]
    pub auto_close: u32,
}

/// Messages keyed by their `action` string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    AddToHistory {
        #[serde(rename = "qrData")]
        qr_data: QrPayload,
    },
    GetHistory,
    ClearHistory,
    HistoryUpdated {
        #[serde(default)]
        history: Vec<HistoryEntry>,
    },
    SettingsUpdated,
    ShowQrInPage {
        #[serde(rename = "qrData")]
        qr_data: QrPayload,
        #[serde(rename = "qrOptions", default)]
        qr_options: OverlayOptions,
    },
    DisplayQrOverlay {
        #[serde(rename = "qrData")]
        qr_data: QrPayload,
        #[serde(rename = "qrOptions", default)]
        qr_options: OverlayOptions,
    },
}

/// Reply envelope. Failures are reported through `success`, never thrown.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<HistoryEntry>,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(error: impl fmt::Display) -> Self {
        Response {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_entry(mut self, entry: Option<HistoryEntry>) -> Self {
        self.entry = entry;
        self
    }
}

/// Broadcasts state changes to the extension's other open views
pub trait Notifier {
    fn notify(&self, message: Message);
}

/// Fire-and-forget broadcast through chrome.runtime.sendMessage
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeNotifier;

impl Notifier for RuntimeNotifier {
    fn notify(&self, message: Message) {
        spawn_local(async move {
            // Rejects when no other view is open to listen
            if let Err(e) = send(&message).await {
                log::debug!("Broadcast not delivered: {}", e);
            }
        });
    }
}

pub fn to_js(message: &Message) -> Result<JsValue, String> {
    message
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize message: {}", e))
}

/// Send to the background service worker and other extension pages
pub async fn send(message: &Message) -> Result<Response, String> {
    let message_js = to_js(message)?;
    let promise = runtime_send_message(&message_js).map_err(|e| js_error_message(&e))?;
    let reply = JsFuture::from(promise).await.map_err(|e| js_error_message(&e))?;
    parse_reply(reply)
}

/// Send to the content script of the active tab
pub async fn send_to_active_tab(message: &Message) -> Result<Response, String> {
    let reply = sendToActiveTab(to_js(message)?)
        .await
        .map_err(|e| js_error_message(&e))?;
    parse_reply(reply)
}

fn parse_reply(reply: JsValue) -> Result<Response, String> {
    if reply.is_undefined() || reply.is_null() {
        return Ok(Response::ok());
    }
    serde_wasm_bindgen::from_value(reply).map_err(|e| format!("Failed to parse reply: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_variants_serialize_as_action_only() {
        assert_eq!(serde_json::to_value(Message::GetHistory).unwrap(), json!({"action": "getHistory"}));
        assert_eq!(
            serde_json::to_value(Message::SettingsUpdated).unwrap(),
            json!({"action": "settingsUpdated"})
        );
    }

    #[test]
    fn test_parse_add_to_history() {
        let message: Message = serde_json::from_value(json!({
            "action": "addToHistory",
            "qrData": { "text": "hello", "dataUrl": "data:image/png;base64,AAAA" }
        }))
        .unwrap();

        match message {
            Message::AddToHistory { qr_data } => {
                assert_eq!(qr_data.text, "hello");
                assert_eq!(qr_data.options, None);
                assert_eq!(qr_data.data_url.as_deref(), Some("data:image/png;base64,AAAA"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_overlay_message_shape() {
        let message = Message::DisplayQrOverlay {
            qr_data: QrPayload {
                text: "hi".to_string(),
                options: None,
                data_url: None,
            },
            qr_options: OverlayOptions { auto_close: 0 },
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "action": "displayQrOverlay",
                "qrData": { "text": "hi" },
                "qrOptions": { "autoClose": 0 }
            })
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = serde_json::from_value::<Message>(json!({"action": "formatDisk"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_response_envelope() {
        assert_eq!(serde_json::to_value(Response::ok()).unwrap(), json!({"success": true}));
        assert_eq!(
            serde_json::to_value(Response::failure("nope")).unwrap(),
            json!({"success": false, "error": "nope"})
        );
        assert_eq!(
            serde_json::to_value(Response::ok().with_history(vec![])).unwrap(),
            json!({"success": true, "history": []})
        );
    }
}
