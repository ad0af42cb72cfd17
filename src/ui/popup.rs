/// Popup UI: generate, history, read and settings tabs

use crate::background::{PendingKind, take_pending};
use crate::controller::{Controller, Refreshed};
use crate::history::{ErrorCorrection, HistoryEntry, QrOptions};
use crate::messages::{self, Message, OverlayOptions, QrPayload, RuntimeNotifier};
use crate::qr_content::{download_filename, export_filename, now_millis, openable_url};
use crate::settings::{MAX_HISTORY_RANGE, QR_SIZE_RANGE, Settings, SettingsPatch, Theme};
use crate::storage::{ChromeStorage, js_error_message, subscribe_changes};
use crate::ui::components::{HistoryRow, Toast, ToastKind, ToastMessage};
use patternfly_yew::prelude::*;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

// Import JS bridge functions
#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn renderQrCode(text: &str, size: u32, foreground: &str, background: &str, level: &str) -> Result<String, JsValue>;

    #[wasm_bindgen(catch)]
    async fn decodeQrFromImage(src: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn readSelectedFile(input_id: &str, as_text: bool) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn copyText(text: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn copyImage(data_url: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn openTab(url: &str) -> Result<(), JsValue>;

    fn downloadDataUrl(data_url: &str, filename: &str);

    fn exportToFile(data: &str, filename: &str);
}

type PopupController = Controller<ChromeStorage>;

#[derive(Clone, PartialEq)]
enum ActiveTab {
    Generate,
    History,
    Read,
    Settings,
}

/// The code currently shown in the generate tab
#[derive(Clone, PartialEq)]
struct GeneratedQr {
    text: String,
    options: QrOptions,
    data_url: String,
}

/// Generator form state
#[derive(Clone, PartialEq)]
struct Form {
    text: String,
    options: QrOptions,
}

impl Form {
    fn from_settings(settings: &Settings) -> Form {
        Form {
            text: String::new(),
            options: QrOptions::from_settings(settings),
        }
    }
}

/// Shows a toast. Errors always show; the rest respect `showNotifications`.
#[derive(Clone)]
struct Notify {
    toast: UseStateHandle<Option<ToastMessage>>,
    controller: Rc<PopupController>,
}

impl Notify {
    fn show(&self, kind: ToastKind, message: impl Into<String>) {
        if kind != ToastKind::Error && !self.controller.settings().show_notifications {
            return;
        }
        self.toast.set(Some(ToastMessage {
            id: now_millis(),
            kind,
            message: message.into(),
        }));
    }
}

#[function_component(App)]
pub fn app() -> Html {
    let controller = use_memo((), |_| {
        Controller::new(ChromeStorage).with_notifier(Rc::new(RuntimeNotifier))
    });
    let settings = use_state(Settings::default);
    let history = use_state(Vec::<HistoryEntry>::new);
    let theme = use_state(Theme::default);
    let active_tab = use_state(|| ActiveTab::Generate);
    let form = use_state(|| Form::from_settings(&Settings::default()));
    let current = use_state(|| None::<GeneratedQr>);
    let read_preview = use_state(|| None::<String>);
    let read_result = use_state(|| None::<String>);
    let image_url = use_state(String::new);
    let toast = use_state(|| None::<ToastMessage>);

    let notify = Notify {
        toast: toast.clone(),
        controller: controller.clone(),
    };

    // Generate, show and record a code
    let generate = {
        let controller = controller.clone();
        let current = current.clone();
        let history = history.clone();
        let notify = notify.clone();

        Rc::new(move |text: String, options: QrOptions| {
            let text = text.trim().to_string();
            if text.is_empty() {
                notify.show(ToastKind::Warning, "Please enter some text or a URL");
                return;
            }

            let data_url = match render_qr(&text, &options) {
                Ok(data_url) => data_url,
                Err(e) => {
                    log::error!("Failed to render QR code: {}", e);
                    notify.show(ToastKind::Error, "Failed to generate QR code");
                    return;
                }
            };

            current.set(Some(GeneratedQr {
                text: text.clone(),
                options: options.clone(),
                data_url: data_url.clone(),
            }));
            notify.show(ToastKind::Success, "QR code generated");

            let controller = controller.clone();
            let history = history.clone();
            let notify = notify.clone();
            spawn_local(async move {
                match controller.add_entry(&text, options, Some(data_url)).await {
                    Ok(_) => history.set(controller.history()),
                    Err(e) => notify.show(ToastKind::Error, format!("History not saved: {}", e)),
                }
            });
        })
    };

    // Decode a QR code from an image URL or data URL
    let decode = {
        let read_preview = read_preview.clone();
        let read_result = read_result.clone();
        let notify = notify.clone();

        Rc::new(move |src: String| {
            let read_preview = read_preview.clone();
            let read_result = read_result.clone();
            let notify = notify.clone();

            read_preview.set(Some(src.clone()));
            read_result.set(None);
            spawn_local(async move {
                match decode_qr(&src).await {
                    Ok(Some(text)) => read_result.set(Some(text)),
                    Ok(None) => notify.show(ToastKind::Warning, "No QR code found in the image"),
                    Err(e) => {
                        log::error!("Failed to decode image: {}", e);
                        notify.show(ToastKind::Error, "Failed to read the image");
                    }
                }
            });
        })
    };

    // Load state, pick up a context-menu request, follow other contexts
    {
        let controller = controller.clone();
        let settings = settings.clone();
        let history = history.clone();
        let theme = theme.clone();
        let form = form.clone();
        let active_tab = active_tab.clone();
        let notify = notify.clone();
        let generate = generate.clone();
        let decode = decode.clone();

        use_effect_with((), move |_| {
            {
                let controller = controller.clone();
                let settings = settings.clone();
                let history = history.clone();
                let theme = theme.clone();
                spawn_local(async move {
                    let loaded = controller.load_settings().await;
                    form.set(Form::from_settings(&loaded));
                    settings.set(loaded.clone());

                    let loaded_theme = controller.load_theme().await;
                    apply_theme(loaded_theme);
                    theme.set(loaded_theme);

                    match controller.load_history().await {
                        Ok(entries) => history.set(entries),
                        Err(e) => notify.show(ToastKind::Error, format!("Failed to load history: {}", e)),
                    }

                    if let Some(request) = take_pending(controller.storage(), now_millis()).await {
                        match request.kind {
                            PendingKind::Text | PendingKind::Url => {
                                form.set(Form {
                                    text: request.data.clone(),
                                    options: QrOptions::from_settings(&loaded),
                                });
                                active_tab.set(ActiveTab::Generate);
                                generate(request.data, QrOptions::from_settings(&loaded));
                            }
                            PendingKind::Read => {
                                active_tab.set(ActiveTab::Read);
                                decode(request.data);
                            }
                        }
                    }
                });
            }

            subscribe_changes(move |changes| {
                for change in changes {
                    match controller.apply_external_change(&change) {
                        Some(Refreshed::Settings) => settings.set(controller.settings()),
                        Some(Refreshed::History) => history.set(controller.history()),
                        Some(Refreshed::Theme) => {
                            let controller = controller.clone();
                            let theme = theme.clone();
                            spawn_local(async move {
                                let loaded = controller.load_theme().await;
                                apply_theme(loaded);
                                theme.set(loaded);
                            });
                        }
                        None => {}
                    }
                }
            });
            || ()
        });
    }

    // Generate tab handlers

    let on_text_input = {
        let form = form.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                let mut next = (*form).clone();
                next.text = input.value();
                form.set(next);
            }
        })
    };

    let on_size_input = {
        let form = form.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(size) = e
                .target_dyn_into::<HtmlInputElement>()
                .and_then(|input| input.value().parse::<u32>().ok())
            {
                let mut next = (*form).clone();
                next.options.size = size;
                form.set(next);
            }
        })
    };

    let on_color_input = |foreground: bool| {
        let form = form.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                let mut next = (*form).clone();
                if foreground {
                    next.options.foreground = input.value();
                } else {
                    next.options.background = input.value();
                }
                form.set(next);
            }
        })
    };

    let on_level_change = {
        let form = form.clone();
        Callback::from(move |e: Event| {
            if let Some(level) = e
                .target_dyn_into::<HtmlSelectElement>()
                .and_then(|select| ErrorCorrection::parse(&select.value()))
            {
                let mut next = (*form).clone();
                next.options.error_correction = level;
                form.set(next);
            }
        })
    };

    let on_generate = {
        let form = form.clone();
        let generate = generate.clone();
        Callback::from(move |_| {
            generate(form.text.clone(), form.options.clone());
        })
    };

    let on_copy_qr = {
        let current = current.clone();
        let notify = notify.clone();
        Callback::from(move |_| {
            let Some(qr) = (*current).clone() else {
                notify.show(ToastKind::Warning, "No QR code to copy");
                return;
            };
            let notify = notify.clone();
            spawn_local(async move {
                match copyImage(&qr.data_url).await {
                    Ok(()) => notify.show(ToastKind::Success, "QR code copied to clipboard"),
                    Err(e) => {
                        log::error!("Copy failed: {}", js_error_message(&e));
                        notify.show(ToastKind::Error, "Could not copy the QR code");
                    }
                }
            });
        })
    };

    let on_download_qr = {
        let current = current.clone();
        let notify = notify.clone();
        Callback::from(move |_| match &*current {
            Some(qr) => {
                downloadDataUrl(&qr.data_url, &download_filename(&qr.text));
                notify.show(ToastKind::Success, "QR code downloaded");
            }
            None => notify.show(ToastKind::Warning, "No QR code to download"),
        })
    };

    let on_show_in_page = {
        let current = current.clone();
        let notify = notify.clone();
        Callback::from(move |_| {
            let Some(qr) = (*current).clone() else {
                notify.show(ToastKind::Warning, "No QR code to show");
                return;
            };
            let notify = notify.clone();
            spawn_local(async move {
                let message = Message::ShowQrInPage {
                    qr_data: QrPayload {
                        text: qr.text,
                        options: Some(qr.options),
                        data_url: Some(qr.data_url),
                    },
                    qr_options: OverlayOptions { auto_close: 0 },
                };
                match messages::send(&message).await {
                    Ok(response) if response.success => {
                        if let Some(window) = web_sys::window() {
                            let _ = window.close();
                        }
                    }
                    Ok(response) => notify.show(
                        ToastKind::Error,
                        format!(
                            "Could not show the QR code on the page: {}",
                            response.error.unwrap_or_default()
                        ),
                    ),
                    Err(e) => notify.show(ToastKind::Error, format!("Could not show the QR code on the page: {}", e)),
                }
            });
        })
    };

    // History tab handlers

    let on_restore = {
        let controller = controller.clone();
        let form = form.clone();
        let active_tab = active_tab.clone();
        let generate = generate.clone();
        let notify = notify.clone();
        Callback::from(move |id: String| match controller.find_entry(&id) {
            Ok(entry) => {
                form.set(Form {
                    text: entry.text.clone(),
                    options: entry.options.clone(),
                });
                active_tab.set(ActiveTab::Generate);
                generate(entry.text, entry.options);
            }
            Err(e) => notify.show(ToastKind::Warning, e.to_string()),
        })
    };

    let on_remove = {
        let controller = controller.clone();
        let history = history.clone();
        let notify = notify.clone();
        Callback::from(move |id: String| {
            let controller = controller.clone();
            let history = history.clone();
            let notify = notify.clone();
            spawn_local(async move {
                match controller.remove_entry(&id).await {
                    Ok(true) => notify.show(ToastKind::Success, "Removed from history"),
                    Ok(false) => {}
                    Err(e) => notify.show(ToastKind::Error, format!("Failed to remove: {}", e)),
                }
                history.set(controller.history());
            });
        })
    };

    let on_clear_history = {
        let controller = controller.clone();
        let history = history.clone();
        let notify = notify.clone();
        Callback::from(move |_| {
            if !confirm("Clear the whole history?") {
                return;
            }
            let controller = controller.clone();
            let history = history.clone();
            let notify = notify.clone();
            spawn_local(async move {
                match controller.clear_history().await {
                    Ok(()) => notify.show(ToastKind::Success, "History cleared"),
                    Err(e) => notify.show(ToastKind::Error, format!("Failed to clear history: {}", e)),
                }
                history.set(controller.history());
            });
        })
    };

    // Read tab handlers

    let on_image_file = {
        let decode = decode.clone();
        let notify = notify.clone();
        Callback::from(move |_: Event| {
            let decode = decode.clone();
            let notify = notify.clone();
            spawn_local(async move {
                match read_file("qrFileInput", false).await {
                    Ok(Some(data_url)) if data_url.starts_with("data:image/") => decode(data_url),
                    Ok(Some(_)) => notify.show(ToastKind::Warning, "Please choose an image file"),
                    Ok(None) => {}
                    Err(e) => notify.show(ToastKind::Error, format!("Failed to read the file: {}", e)),
                }
            });
        })
    };

    let on_image_url_input = {
        let image_url = image_url.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                image_url.set(input.value());
            }
        })
    };

    let on_read_url = {
        let image_url = image_url.clone();
        let decode = decode.clone();
        let notify = notify.clone();
        Callback::from(move |_| {
            let url = image_url.trim().to_string();
            if url.is_empty() {
                notify.show(ToastKind::Warning, "Please enter an image URL");
            } else {
                decode(url);
            }
        })
    };

    let on_close_preview = {
        let read_preview = read_preview.clone();
        let read_result = read_result.clone();
        Callback::from(move |_| {
            read_preview.set(None);
            read_result.set(None);
        })
    };

    let on_copy_result = {
        let read_result = read_result.clone();
        let notify = notify.clone();
        Callback::from(move |_| {
            let Some(text) = (*read_result).clone() else {
                return;
            };
            let notify = notify.clone();
            spawn_local(async move {
                match copyText(&text).await {
                    Ok(()) => notify.show(ToastKind::Success, "Text copied to clipboard"),
                    Err(e) => notify.show(ToastKind::Error, format!("Copy failed: {}", js_error_message(&e))),
                }
            });
        })
    };

    let on_open_result = {
        let read_result = read_result.clone();
        let notify = notify.clone();
        Callback::from(move |_| {
            let Some(url) = read_result.as_deref().and_then(openable_url) else {
                return;
            };
            let notify = notify.clone();
            spawn_local(async move {
                if let Err(e) = openTab(url.as_str()).await {
                    notify.show(ToastKind::Error, format!("Could not open tab: {}", js_error_message(&e)));
                }
            });
        })
    };

    let on_generate_from_result = {
        let read_result = read_result.clone();
        let form = form.clone();
        let active_tab = active_tab.clone();
        let generate = generate.clone();
        Callback::from(move |_| {
            let Some(text) = (*read_result).clone() else {
                return;
            };
            let mut next = (*form).clone();
            next.text = text.clone();
            form.set(next.clone());
            active_tab.set(ActiveTab::Generate);
            generate(text, next.options);
        })
    };

    // Settings tab handlers

    let save_patch = {
        let controller = controller.clone();
        let settings = settings.clone();
        let notify = notify.clone();
        Rc::new(move |patch: SettingsPatch| {
            let controller = controller.clone();
            let settings = settings.clone();
            let notify = notify.clone();
            spawn_local(async move {
                if let Err(e) = controller.save_settings(&patch).await {
                    notify.show(ToastKind::Error, format!("Failed to save settings: {}", e));
                }
                settings.set(controller.settings());
            });
        })
    };

    let on_toggle_setting = |field: fn(bool) -> SettingsPatch| {
        let save_patch = save_patch.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                save_patch(field(input.checked()));
            }
        })
    };

    let on_number_setting = |field: fn(u32) -> SettingsPatch| {
        let save_patch = save_patch.clone();
        Callback::from(move |e: Event| {
            if let Some(value) = e
                .target_dyn_into::<HtmlInputElement>()
                .and_then(|input| input.value().parse::<u32>().ok())
            {
                save_patch(field(value));
            }
        })
    };

    let on_color_setting = |field: fn(String) -> SettingsPatch| {
        let save_patch = save_patch.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                save_patch(field(input.value()));
            }
        })
    };

    let on_reset_settings = {
        let controller = controller.clone();
        let settings = settings.clone();
        let form = form.clone();
        let notify = notify.clone();
        Callback::from(move |_| {
            if !confirm("Restore the default settings?") {
                return;
            }
            let controller = controller.clone();
            let settings = settings.clone();
            let form = form.clone();
            let notify = notify.clone();
            spawn_local(async move {
                match controller.reset_settings().await {
                    Ok(defaults) => {
                        form.set(Form::from_settings(&defaults));
                        notify.show(ToastKind::Success, "Settings restored");
                    }
                    Err(e) => notify.show(ToastKind::Error, format!("Failed to reset settings: {}", e)),
                }
                settings.set(controller.settings());
            });
        })
    };

    let on_export_settings = {
        let controller = controller.clone();
        let notify = notify.clone();
        Callback::from(move |_| match controller.export_settings() {
            Ok(json) => {
                exportToFile(&json, &export_filename("qrcode-settings", now_millis()));
                notify.show(ToastKind::Success, "Settings exported");
            }
            Err(e) => notify.show(ToastKind::Error, format!("Export failed: {}", e)),
        })
    };

    let on_import_settings = {
        let controller = controller.clone();
        let settings = settings.clone();
        let notify = notify.clone();
        Callback::from(move |_: Event| {
            let controller = controller.clone();
            let settings = settings.clone();
            let notify = notify.clone();
            spawn_local(async move {
                let document = match read_file("importSettingsFile", true).await {
                    Ok(Some(document)) => document,
                    Ok(None) => return,
                    Err(e) => {
                        notify.show(ToastKind::Error, format!("Failed to read the file: {}", e));
                        return;
                    }
                };
                match controller.import_settings(&document).await {
                    Ok(_) => notify.show(ToastKind::Success, "Settings imported"),
                    Err(e) => notify.show(ToastKind::Error, format!("Import failed: {}", e)),
                }
                settings.set(controller.settings());
            });
        })
    };

    let on_toggle_theme = {
        let controller = controller.clone();
        let theme = theme.clone();
        let notify = notify.clone();
        Callback::from(move |_| {
            let next = theme.toggled();
            apply_theme(next);
            theme.set(next);
            let controller = controller.clone();
            let notify = notify.clone();
            spawn_local(async move {
                if let Err(e) = controller.save_theme(next).await {
                    notify.show(ToastKind::Error, format!("Failed to save theme: {}", e));
                }
            });
        })
    };

    let on_close_toast = {
        let toast = toast.clone();
        Callback::from(move |_| toast.set(None))
    };

    let on_tab_click = {
        let active_tab = active_tab.clone();
        move |tab: ActiveTab| {
            let active_tab = active_tab.clone();
            Callback::from(move |_| {
                active_tab.set(tab.clone());
            })
        }
    };

    let tab_class = |tab: ActiveTab| {
        if *active_tab == tab { "pf-v5-c-tabs__item pf-m-current" } else { "pf-v5-c-tabs__item" }
    };

    let has_code = current.is_some();
    let result_url = read_result.as_deref().and_then(openable_url);

    html! {
        <div class="padding-20">
            <div class="popup-header">
                <h1 class="popup-title">{"QR Pocket"}</h1>
                <button class="theme-toggle" onclick={on_toggle_theme}>
                    {if *theme == Theme::Dark { "☀️" } else { "🌙" }}
                </button>
            </div>

            // Tab navigation
            <div class="pf-v5-c-tabs tabs-nav">
                <ul class="pf-v5-c-tabs__list">
                    <li class={tab_class(ActiveTab::Generate)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_tab_click(ActiveTab::Generate)}>
                            <span class="pf-v5-c-tabs__item-text">{"Generate"}</span>
                        </button>
                    </li>
                    <li class={tab_class(ActiveTab::History)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_tab_click(ActiveTab::History)}>
                            <span class="pf-v5-c-tabs__item-text">{"History"}</span>
                        </button>
                    </li>
                    <li class={tab_class(ActiveTab::Read)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_tab_click(ActiveTab::Read)}>
                            <span class="pf-v5-c-tabs__item-text">{"Read"}</span>
                        </button>
                    </li>
                    <li class={tab_class(ActiveTab::Settings)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_tab_click(ActiveTab::Settings)}>
                            <span class="pf-v5-c-tabs__item-text">{"Settings"}</span>
                        </button>
                    </li>
                </ul>
            </div>

            if let Some(message) = (*toast).clone() {
                <Toast toast={message} on_close={on_close_toast} />
            }

            // Tab content
            <div class="tab-pane-content">
                {match &*active_tab {
                    ActiveTab::Generate => html! {
                        <div class="flex-column-gap">
                            <textarea
                                class="qr-text"
                                placeholder="Text or URL"
                                value={form.text.clone()}
                                oninput={on_text_input}
                            />
                            <label class="field">
                                {format!("Size: {}px", form.options.size)}
                                <input
                                    type="range"
                                    min={QR_SIZE_RANGE.start().to_string()}
                                    max={QR_SIZE_RANGE.end().to_string()}
                                    step="10"
                                    value={form.options.size.to_string()}
                                    oninput={on_size_input}
                                />
                            </label>
                            <div class="color-row">
                                <label class="field">
                                    {"Foreground"}
                                    <input type="color" value={form.options.foreground.clone()} oninput={on_color_input(true)} />
                                </label>
                                <label class="field">
                                    {"Background"}
                                    <input type="color" value={form.options.background.clone()} oninput={on_color_input(false)} />
                                </label>
                            </div>
                            <label class="field">
                                {"Error correction"}
                                <select onchange={on_level_change}>
                                    {for ErrorCorrection::ALL.iter().map(|level| html! {
                                        <option
                                            value={level.as_str()}
                                            selected={*level == form.options.error_correction}
                                        >
                                            {level.label()}
                                        </option>
                                    })}
                                </select>
                            </label>
                            <Button onclick={on_generate} variant={ButtonVariant::Primary} block={true}>
                                {"Generate QR Code"}
                            </Button>

                            if let Some(qr) = &*current {
                                <div class="qr-preview">
                                    <img src={qr.data_url.clone()} alt="QR Code" />
                                </div>
                            }

                            <div class="action-row">
                                <Button onclick={on_copy_qr} disabled={!has_code} variant={ButtonVariant::Secondary}>
                                    {"📋 Copy"}
                                </Button>
                                <Button onclick={on_download_qr} disabled={!has_code} variant={ButtonVariant::Secondary}>
                                    {"💾 Download"}
                                </Button>
                                <Button onclick={on_show_in_page} disabled={!has_code} variant={ButtonVariant::Secondary}>
                                    {"🖥️ Show in page"}
                                </Button>
                            </div>
                        </div>
                    },
                    ActiveTab::History => html! {
                        <div class="flex-column-gap">
                            if history.is_empty() {
                                <div class="empty-state">
                                    <p>{"No QR codes generated yet."}</p>
                                </div>
                            } else {
                                <ul class="history-list">
                                    {for history.iter().map(|entry| html! {
                                        <HistoryRow
                                            key={entry.id.clone()}
                                            entry={entry.clone()}
                                            on_restore={on_restore.clone()}
                                            on_remove={on_remove.clone()}
                                        />
                                    })}
                                </ul>
                                <Button onclick={on_clear_history} variant={ButtonVariant::Danger} block={true}>
                                    {"🗑️ Clear History"}
                                </Button>
                            }
                        </div>
                    },
                    ActiveTab::Read => html! {
                        <div class="flex-column-gap">
                            <label class="file-button">
                                {"📁 Read from image file"}
                                <input id="qrFileInput" type="file" accept="image/*" class="hidden" onchange={on_image_file} />
                            </label>
                            <div class="url-row">
                                <input
                                    type="text"
                                    class="image-url-input"
                                    placeholder="Image URL"
                                    value={(*image_url).clone()}
                                    oninput={on_image_url_input}
                                />
                                <Button onclick={on_read_url} variant={ButtonVariant::Secondary}>
                                    {"Read"}
                                </Button>
                            </div>

                            if let Some(src) = &*read_preview {
                                <div class="image-preview">
                                    <img src={src.clone()} alt="Image to read" />
                                    <button class="close-preview" onclick={on_close_preview}>{"×"}</button>
                                </div>
                            }

                            if let Some(text) = &*read_result {
                                <div class="read-result">
                                    if let Some(url) = &result_url {
                                        <a href={url.to_string()} target="_blank" class="read-text">{text.clone()}</a>
                                    } else {
                                        <p class="read-text">{text.clone()}</p>
                                    }
                                    <div class="action-row">
                                        <Button onclick={on_copy_result} variant={ButtonVariant::Secondary}>
                                            {"📋 Copy"}
                                        </Button>
                                        if result_url.is_some() {
                                            <Button onclick={on_open_result} variant={ButtonVariant::Secondary}>
                                                {"🔗 Open"}
                                            </Button>
                                        }
                                        <Button onclick={on_generate_from_result} variant={ButtonVariant::Secondary}>
                                            {"🔄 Generate"}
                                        </Button>
                                    </div>
                                </div>
                            }
                        </div>
                    },
                    ActiveTab::Settings => html! {
                        <div class="flex-column-gap">
                            <label class="setting">
                                <input
                                    type="checkbox"
                                    checked={settings.save_history}
                                    onchange={on_toggle_setting(|v| SettingsPatch { save_history: Some(v), ..Default::default() })}
                                />
                                {"Save history"}
                            </label>
                            <label class="setting">
                                <input
                                    type="checkbox"
                                    checked={settings.show_notifications}
                                    onchange={on_toggle_setting(|v| SettingsPatch { show_notifications: Some(v), ..Default::default() })}
                                />
                                {"Show notifications"}
                            </label>
                            <label class="setting">
                                {format!("History size: {} items", settings.max_history_items)}
                                <input
                                    type="range"
                                    min={MAX_HISTORY_RANGE.start().to_string()}
                                    max={MAX_HISTORY_RANGE.end().to_string()}
                                    value={settings.max_history_items.to_string()}
                                    onchange={on_number_setting(|v| SettingsPatch { max_history_items: Some(v as usize), ..Default::default() })}
                                />
                            </label>
                            <label class="setting">
                                {format!("Default size: {}px", settings.default_qr_size)}
                                <input
                                    type="range"
                                    min={QR_SIZE_RANGE.start().to_string()}
                                    max={QR_SIZE_RANGE.end().to_string()}
                                    step="10"
                                    value={settings.default_qr_size.to_string()}
                                    onchange={on_number_setting(|v| SettingsPatch { default_qr_size: Some(v), ..Default::default() })}
                                />
                            </label>
                            <div class="color-row">
                                <label class="setting">
                                    {"Default foreground"}
                                    <input
                                        type="color"
                                        value={settings.default_foreground.clone()}
                                        onchange={on_color_setting(|v| SettingsPatch { default_foreground: Some(v), ..Default::default() })}
                                    />
                                </label>
                                <label class="setting">
                                    {"Default background"}
                                    <input
                                        type="color"
                                        value={settings.default_background.clone()}
                                        onchange={on_color_setting(|v| SettingsPatch { default_background: Some(v), ..Default::default() })}
                                    />
                                </label>
                            </div>
                            <div class="action-row">
                                <Button onclick={on_reset_settings} variant={ButtonVariant::Secondary}>
                                    {"Reset"}
                                </Button>
                                <Button onclick={on_export_settings} variant={ButtonVariant::Secondary}>
                                    {"📥 Export"}
                                </Button>
                                <label class="file-button">
                                    {"📤 Import"}
                                    <input id="importSettingsFile" type="file" accept="application/json" class="hidden" onchange={on_import_settings} />
                                </label>
                            </div>
                        </div>
                    },
                }}
            </div>

            <p class="footer-popup">
                {"QR Pocket v0.1.0"}
            </p>
        </div>
    }
}

// Helper functions

fn render_qr(text: &str, options: &QrOptions) -> Result<String, String> {
    renderQrCode(
        text,
        options.size,
        &options.foreground,
        &options.background,
        options.error_correction.as_str(),
    )
    .map_err(|e| js_error_message(&e))
}

async fn decode_qr(src: &str) -> Result<Option<String>, String> {
    let decoded = decodeQrFromImage(src).await.map_err(|e| js_error_message(&e))?;
    Ok(decoded.as_string())
}

/// Contents of the file picked in `<input id=input_id>`, `None` if nothing was picked
pub(crate) async fn read_file(input_id: &str, as_text: bool) -> Result<Option<String>, String> {
    let contents = readSelectedFile(input_id, as_text)
        .await
        .map_err(|e| js_error_message(&e))?;
    Ok(contents.as_string())
}

pub(crate) fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

pub(crate) fn apply_theme(theme: Theme) {
    if let Some(body) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
    {
        body.set_class_name(theme.body_class());
    }
}
