/// Reusable UI components

use crate::history::{EntryKind, HistoryEntry};
use crate::qr_content::{display_title, format_timestamp};
use patternfly_yew::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use yew::prelude::*;

const TOAST_MS: i32 = 3000;
const TITLE_CHARS: usize = 30;

#[derive(Clone, Copy, PartialEq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, PartialEq)]
pub struct ToastMessage {
    /// Distinguishes repeated identical messages so each restarts the timer
    pub id: i64,
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Properties, PartialEq)]
pub struct ToastProps {
    pub toast: ToastMessage,
    pub on_close: Callback<()>,
}

/// Transient status notification that closes itself after three seconds
#[function_component(Toast)]
pub fn toast(props: &ToastProps) -> Html {
    {
        let on_close = props.on_close.clone();
        use_effect_with(props.toast.id, move |_| {
            let window = web_sys::window();
            let handle = window.as_ref().and_then(|w| {
                let callback = Closure::once_into_js(move || on_close.emit(()));
                w.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), TOAST_MS)
                    .ok()
            });
            move || {
                if let (Some(w), Some(handle)) = (window, handle) {
                    w.clear_timeout_with_handle(handle);
                }
            }
        });
    }

    let alert_type = match props.toast.kind {
        ToastKind::Info => AlertType::Info,
        ToastKind::Success => AlertType::Success,
        ToastKind::Warning => AlertType::Warning,
        ToastKind::Error => AlertType::Danger,
    };

    html! {
        <div class="notification visible">
            <Alert r#type={alert_type} title={props.toast.message.clone()} inline={true}>
            </Alert>
            <button class="notification-close" onclick={props.on_close.reform(|_| ())}>
                {"×"}
            </button>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct HistoryRowProps {
    pub entry: HistoryEntry,
    pub on_restore: Callback<String>,
    pub on_remove: Callback<String>,
}

/// One entry in the history list: thumbnail, title, date and actions
#[function_component(HistoryRow)]
pub fn history_row(props: &HistoryRowProps) -> Html {
    let entry = &props.entry;

    let on_restore = {
        let id = entry.id.clone();
        props.on_restore.reform(move |_: MouseEvent| id.clone())
    };
    let on_remove = {
        let id = entry.id.clone();
        props.on_remove.reform(move |e: MouseEvent| {
            // Don't let the click reach the row's restore handler
            e.stop_propagation();
            id.clone()
        })
    };

    let icon = match entry.kind {
        EntryKind::Url => "🔗",
        EntryKind::Text => "📝",
    };

    html! {
        <li class="history-item" onclick={on_restore.clone()}>
            <div class="history-thumbnail">
                if let Some(data_url) = &entry.data_url {
                    <img src={data_url.clone()} alt="QR Code" />
                } else {
                    <span class="history-icon">{icon}</span>
                }
            </div>
            <div class="history-content">
                <h4 class="history-title" title={entry.text.clone()}>
                    {display_title(&entry.text, TITLE_CHARS)}
                </h4>
                <span class="history-date">{format_timestamp(entry.timestamp)}</span>
            </div>
            <div class="history-actions">
                <Button onclick={on_restore} variant={ButtonVariant::Plain} size={ButtonSize::Small}>
                    {"🔄"}
                </Button>
                <Button onclick={on_remove} variant={ButtonVariant::Plain} size={ButtonSize::Small}>
                    {"🗑️"}
                </Button>
            </div>
        </li>
    }
}
