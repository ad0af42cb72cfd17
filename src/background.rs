/// Background service worker: install setup, context menus, message routing
use crate::controller::Controller;
use crate::history::QrOptions;
use crate::messages::{self, Message, OverlayOptions, QrPayload, Response, RuntimeNotifier};
use crate::qr_content::now_millis;
use crate::storage::{ChromeStorage, HISTORY_KEY, PENDING_KEY, Scope, StorageArea, js_error_message};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

/// How long a context-menu request waits for the popup to pick it up
pub const PENDING_TTL_MS: i64 = 10_000;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onInstalled"], js_name = addListener)]
    fn add_installed_listener(listener: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn add_message_listener(listener: &Closure<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>);

    #[wasm_bindgen(catch, js_namespace = ["chrome", "contextMenus"], js_name = create)]
    fn create_context_menu(properties: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "contextMenus", "onClicked"], js_name = addListener)]
    fn add_menu_click_listener(listener: &Closure<dyn FnMut(JsValue, JsValue)>);

    #[wasm_bindgen(catch, js_namespace = ["chrome", "action"], js_name = openPopup)]
    fn open_popup() -> Result<js_sys::Promise, JsValue>;
}

/// What the popup should do with a pending request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PendingKind {
    Text,
    Url,
    /// Decode the QR code in an image
    Read,
}

/// Hand-off from a context-menu click to the next popup opening
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRequest {
    #[serde(rename = "type")]
    pub kind: PendingKind,
    pub data: String,
    pub timestamp: i64,
}

impl PendingRequest {
    pub fn is_fresh(&self, now: i64) -> bool {
        (0..PENDING_TTL_MS).contains(&(now - self.timestamp))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    GenerateFromSelection,
    GenerateFromLink,
    ReadFromImage,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [
        MenuItem::GenerateFromSelection,
        MenuItem::GenerateFromLink,
        MenuItem::ReadFromImage,
    ];

    pub fn id(self) -> &'static str {
        match self {
            MenuItem::GenerateFromSelection => "generateQrFromSelection",
            MenuItem::GenerateFromLink => "generateQrFromLink",
            MenuItem::ReadFromImage => "readQrFromImage",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MenuItem::GenerateFromSelection => "Generate QR code from selected text",
            MenuItem::GenerateFromLink => "Generate QR code for this link",
            MenuItem::ReadFromImage => "Read QR code in this image",
        }
    }

    pub fn context(self) -> &'static str {
        match self {
            MenuItem::GenerateFromSelection => "selection",
            MenuItem::GenerateFromLink => "link",
            MenuItem::ReadFromImage => "image",
        }
    }

    pub fn from_id(id: &str) -> Option<MenuItem> {
        Self::ALL.into_iter().find(|item| item.id() == id)
    }
}

/// The fields of contextMenus.OnClickData we use
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickInfo {
    #[serde(default)]
    pub menu_item_id: String,
    #[serde(default)]
    pub selection_text: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub src_url: Option<String>,
}

impl ClickInfo {
    pub fn to_pending(&self, now: i64) -> Option<PendingRequest> {
        let (kind, data) = match MenuItem::from_id(&self.menu_item_id)? {
            MenuItem::GenerateFromSelection => (PendingKind::Text, self.selection_text.as_ref()?),
            MenuItem::GenerateFromLink => (PendingKind::Url, self.link_url.as_ref()?),
            MenuItem::ReadFromImage => (PendingKind::Read, self.src_url.as_ref()?),
        };
        if data.is_empty() {
            return None;
        }

        Some(PendingRequest {
            kind,
            data: data.clone(),
            timestamp: now,
        })
    }
}

pub async fn store_pending<S: StorageArea>(storage: &S, request: &PendingRequest) -> Result<(), String> {
    let value = serde_json::to_value(request).map_err(|e| e.to_string())?;
    storage
        .set(Scope::Local, PENDING_KEY, value)
        .await
        .map_err(|e| e.to_string())
}

/// Remove the pending request and return it if it is still fresh
pub async fn take_pending<S: StorageArea>(storage: &S, now: i64) -> Option<PendingRequest> {
    let stored = match storage.get(Scope::Local, PENDING_KEY).await {
        Ok(stored) => stored?,
        Err(e) => {
            log::warn!("Failed to read pending request: {}", e);
            return None;
        }
    };

    if let Err(e) = storage.remove(Scope::Local, PENDING_KEY).await {
        log::warn!("Failed to clear pending request: {}", e);
    }

    serde_json::from_value::<PendingRequest>(stored)
        .ok()
        .filter(|request| request.is_fresh(now))
}

/// First-run setup: complete the settings record and make sure a history
/// list exists in local scope.
pub async fn initialize<S: StorageArea>(controller: &Controller<S>) {
    controller.load_settings().await;

    match controller.storage().get(Scope::Local, HISTORY_KEY).await {
        Ok(Some(_)) => {}
        Ok(None) => match controller.storage().set(Scope::Local, HISTORY_KEY, json!([])).await {
            Ok(()) => log::info!("History initialized"),
            Err(e) => log::error!("Failed to initialize history: {}", e),
        },
        Err(e) => log::error!("Failed to check history: {}", e),
    }
}

/// Answer a message addressed to the background context
pub async fn dispatch<S: StorageArea>(controller: &Controller<S>, message: Message) -> Response {
    match message {
        Message::AddToHistory { qr_data } => {
            let settings = controller.load_settings().await;
            let options = qr_data
                .options
                .unwrap_or_else(|| QrOptions::from_settings(&settings));

            match controller.add_entry(&qr_data.text, options, qr_data.data_url).await {
                Ok(entry) => Response::ok().with_entry(entry),
                Err(e) => Response::failure(e),
            }
        }
        Message::GetHistory => match controller.load_history().await {
            Ok(history) => Response::ok().with_history(history),
            Err(e) => Response::failure(e),
        },
        Message::ClearHistory => match controller.clear_history().await {
            Ok(()) => Response::ok(),
            Err(e) => Response::failure(e),
        },
        Message::HistoryUpdated { .. } => match controller.load_history().await {
            Ok(_) => Response::ok(),
            Err(e) => Response::failure(e),
        },
        Message::SettingsUpdated => {
            controller.load_settings().await;
            Response::ok()
        }
        other => Response::failure(format!("Unsupported action: {}", action_name(&other))),
    }
}

fn action_name(message: &Message) -> String {
    serde_json::to_value(message)
        .ok()
        .and_then(|v| v.get("action").and_then(|a| a.as_str()).map(str::to_string))
        .unwrap_or_default()
}

async fn relay_overlay(qr_data: QrPayload, qr_options: OverlayOptions) -> Response {
    let message = Message::DisplayQrOverlay { qr_data, qr_options };
    match messages::send_to_active_tab(&message).await {
        Ok(_) => Response::ok(),
        Err(e) => Response::failure(e),
    }
}

#[derive(Serialize)]
struct MenuProperties {
    id: &'static str,
    title: &'static str,
    contexts: [&'static str; 1],
}

fn register_context_menus() {
    for item in MenuItem::ALL {
        let properties = MenuProperties {
            id: item.id(),
            title: item.title(),
            contexts: [item.context()],
        };
        let result = serde_wasm_bindgen::to_value(&properties)
            .map_err(|e| e.to_string())
            .and_then(|js| create_context_menu(&js).map_err(|e| js_error_message(&e)));
        if let Err(e) = result {
            log::error!("Failed to create menu {}: {}", item.id(), e);
        }
    }
}

fn reply(send_response: &js_sys::Function, response: &Response) {
    let result = response
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| e.to_string())
        .and_then(|js| {
            send_response
                .call1(&JsValue::NULL, &js)
                .map_err(|e| js_error_message(&e))
        });
    if let Err(e) = result {
        log::warn!("Failed to reply: {}", e);
    }
}

/// Register every service worker listener. Must run synchronously at
/// worker start so Chrome can wake the worker for these events.
pub fn start() {
    let controller = Controller::new(ChromeStorage).with_notifier(Rc::new(RuntimeNotifier));

    let on_installed = {
        let controller = controller.clone();
        Closure::wrap(Box::new(move |_details: JsValue| {
            log::info!("QR Pocket installed or updated");
            register_context_menus();
            let controller = controller.clone();
            spawn_local(async move {
                initialize(&controller).await;
            });
        }) as Box<dyn FnMut(JsValue)>)
    };
    add_installed_listener(&on_installed);
    on_installed.forget();

    let on_menu_click = Closure::wrap(Box::new(move |info: JsValue, _tab: JsValue| {
        let info: ClickInfo = match serde_wasm_bindgen::from_value(info) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Unreadable menu click: {}", e);
                return;
            }
        };
        let Some(request) = info.to_pending(now_millis()) else {
            return;
        };

        spawn_local(async move {
            if let Err(e) = store_pending(&ChromeStorage, &request).await {
                log::error!("Failed to store pending request: {}", e);
                return;
            }
            let opened = match open_popup() {
                Ok(promise) => JsFuture::from(promise).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = opened {
                log::warn!("Failed to open popup: {}", js_error_message(&e));
            }
        });
    }) as Box<dyn FnMut(JsValue, JsValue)>);
    add_menu_click_listener(&on_menu_click);
    on_menu_click.forget();

    let on_message = Closure::wrap(Box::new(
        move |message: JsValue, _sender: JsValue, send_response: js_sys::Function| -> bool {
            let message: Message = match serde_wasm_bindgen::from_value(message) {
                Ok(message) => message,
                Err(e) => {
                    reply(&send_response, &Response::failure(format!("Unrecognized message: {}", e)));
                    return false;
                }
            };

            let controller = controller.clone();
            spawn_local(async move {
                let response = match message {
                    Message::ShowQrInPage { qr_data, qr_options } => relay_overlay(qr_data, qr_options).await,
                    other => dispatch(&controller, other).await,
                };
                reply(&send_response, &response);
            });
            // Keep the channel open for the async reply
            true
        },
    ) as Box<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>);
    add_message_listener(&on_message);
    on_message.forget();

    log::info!("Background listeners registered");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::storage::SETTINGS_KEY;
    use crate::storage::memory::MemoryStorage;
    use futures::executor::block_on;

    fn click(menu_item_id: &str) -> ClickInfo {
        ClickInfo {
            menu_item_id: menu_item_id.to_string(),
            selection_text: Some("selected words".to_string()),
            link_url: Some("https://example.com/link".to_string()),
            src_url: Some("https://example.com/qr.png".to_string()),
        }
    }

    #[test]
    fn test_menu_ids_round_trip() {
        for item in MenuItem::ALL {
            assert_eq!(MenuItem::from_id(item.id()), Some(item));
        }
        assert_eq!(MenuItem::from_id("somethingElse"), None);
    }

    #[test]
    fn test_click_to_pending() {
        let request = click("generateQrFromLink").to_pending(100).unwrap();
        assert_eq!(request.kind, PendingKind::Url);
        assert_eq!(request.data, "https://example.com/link");
        assert_eq!(request.timestamp, 100);

        let request = click("readQrFromImage").to_pending(100).unwrap();
        assert_eq!(request.kind, PendingKind::Read);

        let mut info = click("generateQrFromSelection");
        info.selection_text = None;
        assert_eq!(info.to_pending(100), None);
        assert_eq!(click("unknown").to_pending(100), None);
    }

    #[test]
    fn test_parse_click_info() {
        let info: ClickInfo = serde_json::from_value(json!({
            "menuItemId": "generateQrFromSelection",
            "selectionText": "hello",
            "editable": false
        }))
        .unwrap();

        assert_eq!(info.selection_text.as_deref(), Some("hello"));
        assert_eq!(info.link_url, None);
    }

    #[test]
    fn test_pending_freshness() {
        let request = PendingRequest {
            kind: PendingKind::Text,
            data: "x".to_string(),
            timestamp: 1_000,
        };

        assert!(request.is_fresh(1_000));
        assert!(request.is_fresh(10_999));
        assert!(!request.is_fresh(11_000));
        assert!(!request.is_fresh(999));
    }

    #[test]
    fn test_take_pending_consumes_once() {
        let storage = MemoryStorage::new();
        let request = click("generateQrFromSelection").to_pending(5_000).unwrap();
        block_on(store_pending(&storage, &request)).unwrap();

        assert_eq!(
            storage.value(Scope::Local, PENDING_KEY).unwrap()["type"],
            json!("text")
        );
        assert_eq!(block_on(take_pending(&storage, 6_000)), Some(request));
        assert_eq!(block_on(take_pending(&storage, 6_000)), None);
    }

    #[test]
    fn test_stale_pending_is_dropped() {
        let storage = MemoryStorage::new();
        let request = click("generateQrFromSelection").to_pending(5_000).unwrap();
        block_on(store_pending(&storage, &request)).unwrap();

        assert_eq!(block_on(take_pending(&storage, 60_000)), None);
        assert_eq!(storage.value(Scope::Local, PENDING_KEY), None);
    }

    #[test]
    fn test_initialize_on_empty_store() {
        let controller = Controller::new(MemoryStorage::new());

        block_on(initialize(&controller));

        assert_eq!(
            controller.storage().value(Scope::Sync, SETTINGS_KEY),
            Some(serde_json::to_value(Settings::default()).unwrap())
        );
        assert_eq!(controller.storage().value(Scope::Local, HISTORY_KEY), Some(json!([])));
        assert_eq!(controller.storage().value(Scope::Sync, HISTORY_KEY), None);
    }

    #[test]
    fn test_initialize_keeps_existing_history() {
        let existing = json!([{ "id": "1", "text": "keep", "timestamp": 3 }]);
        let controller = Controller::new(
            MemoryStorage::new().with(Scope::Local, HISTORY_KEY, existing.clone()),
        );

        block_on(initialize(&controller));

        assert_eq!(controller.storage().value(Scope::Local, HISTORY_KEY), Some(existing));
    }

    #[test]
    fn test_dispatch_add_get_clear() {
        let controller = Controller::new(MemoryStorage::new());

        let response = block_on(dispatch(
            &controller,
            Message::AddToHistory {
                qr_data: QrPayload {
                    text: "from content script".to_string(),
                    options: None,
                    data_url: None,
                },
            },
        ));
        assert!(response.success);
        let entry = response.entry.unwrap();
        assert_eq!(entry.options, QrOptions::default());

        let response = block_on(dispatch(&controller, Message::GetHistory));
        assert!(response.success);
        assert_eq!(response.history.unwrap(), vec![entry]);

        let response = block_on(dispatch(&controller, Message::ClearHistory));
        assert!(response.success);
        let response = block_on(dispatch(&controller, Message::GetHistory));
        assert_eq!(response.history, Some(vec![]));
    }

    #[test]
    fn test_dispatch_reports_storage_failure() {
        let controller = Controller::new(MemoryStorage::new());
        controller.storage().fail_reads(true);

        let response = block_on(dispatch(&controller, Message::GetHistory));

        assert!(!response.success);
        assert!(response.error.unwrap().contains("read failed"));
    }

    #[test]
    fn test_dispatch_unsupported_action() {
        let controller = Controller::new(MemoryStorage::new());

        let message = Message::DisplayQrOverlay {
            qr_data: QrPayload {
                text: "hi".to_string(),
                options: None,
                data_url: None,
            },
            qr_options: OverlayOptions::default(),
        };

        let response = block_on(dispatch(&controller, message));

        assert_eq!(response, Response::failure("Unsupported action: displayQrOverlay"));
    }
}
