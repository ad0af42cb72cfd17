/// Options page: settings form and history maintenance

use crate::controller::{Controller, HistoryStats, Refreshed};
use crate::messages::RuntimeNotifier;
use crate::qr_content::{export_filename, now_millis};
use crate::settings::{MAX_HISTORY_RANGE, QR_SIZE_RANGE, Settings, SettingsPatch};
use crate::storage::{ChromeStorage, subscribe_changes};
use crate::ui::components::{Toast, ToastKind, ToastMessage};
use crate::ui::popup::{confirm, read_file};
use patternfly_yew::prelude::*;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    fn exportToFile(data: &str, filename: &str);
}

#[function_component(OptionsPage)]
pub fn options_page() -> Html {
    let controller = use_memo((), |_| {
        Controller::new(ChromeStorage).with_notifier(Rc::new(RuntimeNotifier))
    });
    // Form edits stay local until Save
    let draft = use_state(Settings::default);
    let stats = use_state(|| HistoryStats { count: 0, approx_bytes: 0 });
    let toast = use_state(|| None::<ToastMessage>);

    let show = {
        let toast = toast.clone();
        move |kind: ToastKind, message: String| {
            toast.set(Some(ToastMessage {
                id: now_millis(),
                kind,
                message,
            }));
        }
    };

    {
        let controller = controller.clone();
        let draft = draft.clone();
        let stats = stats.clone();
        let show = show.clone();
        use_effect_with((), move |_| {
            {
                let controller = controller.clone();
                let draft = draft.clone();
                let stats = stats.clone();
                spawn_local(async move {
                    draft.set(controller.load_settings().await);
                    if let Err(e) = controller.load_history().await {
                        show(ToastKind::Error, format!("Failed to load history: {}", e));
                    }
                    stats.set(controller.history_stats());
                });
            }

            subscribe_changes(move |changes| {
                for change in changes {
                    match controller.apply_external_change(&change) {
                        Some(Refreshed::Settings) => draft.set(controller.settings()),
                        Some(Refreshed::History) => stats.set(controller.history_stats()),
                        _ => {}
                    }
                }
            });
            || ()
        });
    }

    let edit = |update: fn(&mut Settings, &HtmlInputElement)| {
        let draft = draft.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                let mut next = (*draft).clone();
                update(&mut next, &input);
                draft.set(next);
            }
        })
    };

    let on_save = {
        let controller = controller.clone();
        let draft = draft.clone();
        let show = show.clone();
        Callback::from(move |_| {
            let controller = controller.clone();
            let draft = draft.clone();
            let show = show.clone();
            spawn_local(async move {
                match controller.save_settings(&SettingsPatch::from(&*draft)).await {
                    Ok(saved) => {
                        draft.set(saved);
                        show(ToastKind::Success, "Settings saved".to_string());
                    }
                    Err(e) => show(ToastKind::Error, format!("Failed to save settings: {}", e)),
                }
            });
        })
    };

    let on_reset = {
        let controller = controller.clone();
        let draft = draft.clone();
        let show = show.clone();
        Callback::from(move |_| {
            if !confirm("Restore the default settings?") {
                return;
            }
            let controller = controller.clone();
            let draft = draft.clone();
            let show = show.clone();
            spawn_local(async move {
                match controller.reset_settings().await {
                    Ok(defaults) => {
                        draft.set(defaults);
                        show(ToastKind::Success, "Settings restored to defaults".to_string());
                    }
                    Err(e) => show(ToastKind::Error, format!("Failed to reset settings: {}", e)),
                }
            });
        })
    };

    let on_export_history = {
        let controller = controller.clone();
        let show = show.clone();
        Callback::from(move |_| {
            let controller = controller.clone();
            let show = show.clone();
            spawn_local(async move {
                if controller.history_stats().count == 0 {
                    show(ToastKind::Info, "History is empty, nothing to export".to_string());
                    return;
                }
                match controller.export_history().await {
                    Ok(json) => {
                        exportToFile(&json, &export_filename("qrcode-history", now_millis()));
                        show(ToastKind::Success, "History exported".to_string());
                    }
                    Err(e) => show(ToastKind::Error, format!("Export failed: {}", e)),
                }
            });
        })
    };

    let on_import_history = {
        let controller = controller.clone();
        let stats = stats.clone();
        let show = show.clone();
        Callback::from(move |_: Event| {
            let controller = controller.clone();
            let stats = stats.clone();
            let show = show.clone();
            spawn_local(async move {
                let document = match read_file("importHistoryFile", true).await {
                    Ok(Some(document)) => document,
                    Ok(None) => return,
                    Err(e) => {
                        show(ToastKind::Error, format!("Failed to read the file: {}", e));
                        return;
                    }
                };
                if !confirm("Importing replaces the current history. Continue?") {
                    return;
                }
                match controller.import_history(&document).await {
                    Ok(count) => show(ToastKind::Success, format!("Imported {} entries", count)),
                    Err(e) => show(ToastKind::Error, format!("Import failed: {}", e)),
                }
                stats.set(controller.history_stats());
            });
        })
    };

    let on_clear_history = {
        let controller = controller.clone();
        let stats = stats.clone();
        let show = show.clone();
        Callback::from(move |_| {
            if !confirm("Clear the whole history? This cannot be undone.") {
                return;
            }
            let controller = controller.clone();
            let stats = stats.clone();
            let show = show.clone();
            spawn_local(async move {
                match controller.clear_history().await {
                    Ok(()) => show(ToastKind::Success, "History cleared".to_string()),
                    Err(e) => show(ToastKind::Error, format!("Failed to clear history: {}", e)),
                }
                stats.set(controller.history_stats());
            });
        })
    };

    let on_close_toast = {
        let toast = toast.clone();
        Callback::from(move |_| toast.set(None))
    };

    html! {
        <div class="options-container">
            <h1>{"QR Pocket Settings"}</h1>

            if let Some(message) = (*toast).clone() {
                <Toast toast={message} on_close={on_close_toast} />
            }

            <section class="options-section">
                <h2>{"General"}</h2>
                <label class="setting">
                    <input
                        type="checkbox"
                        checked={draft.save_history}
                        onchange={edit(|s, input| s.save_history = input.checked())}
                    />
                    {"Save generated codes to history"}
                </label>
                <label class="setting">
                    <input
                        type="checkbox"
                        checked={draft.show_notifications}
                        onchange={edit(|s, input| s.show_notifications = input.checked())}
                    />
                    {"Show notifications"}
                </label>
                <label class="setting">
                    {"History size"}
                    <input
                        type="number"
                        min={MAX_HISTORY_RANGE.start().to_string()}
                        max={MAX_HISTORY_RANGE.end().to_string()}
                        value={draft.max_history_items.to_string()}
                        onchange={edit(|s, input| {
                            if let Ok(n) = input.value().parse() {
                                s.max_history_items = n;
                            }
                        })}
                    />
                </label>
            </section>

            <section class="options-section">
                <h2>{"QR code defaults"}</h2>
                <label class="setting">
                    {"Size (px)"}
                    <input
                        type="number"
                        min={QR_SIZE_RANGE.start().to_string()}
                        max={QR_SIZE_RANGE.end().to_string()}
                        step="10"
                        value={draft.default_qr_size.to_string()}
                        onchange={edit(|s, input| {
                            if let Ok(n) = input.value().parse() {
                                s.default_qr_size = n;
                            }
                        })}
                    />
                </label>
                <label class="setting">
                    {"Foreground"}
                    <input
                        type="color"
                        value={draft.default_foreground.clone()}
                        onchange={edit(|s, input| s.default_foreground = input.value())}
                    />
                </label>
                <label class="setting">
                    {"Background"}
                    <input
                        type="color"
                        value={draft.default_background.clone()}
                        onchange={edit(|s, input| s.default_background = input.value())}
                    />
                </label>
                <div class="action-row">
                    <Button onclick={on_save} variant={ButtonVariant::Primary}>
                        {"Save"}
                    </Button>
                    <Button onclick={on_reset} variant={ButtonVariant::Secondary}>
                        {"Reset to defaults"}
                    </Button>
                </div>
            </section>

            <section class="options-section">
                <h2>{"History"}</h2>
                <p class="history-stats">
                    {format!(
                        "{} entries, about {:.1} KB",
                        stats.count,
                        stats.approx_bytes as f64 / 1024.0
                    )}
                </p>
                <div class="action-row">
                    <Button onclick={on_export_history} variant={ButtonVariant::Secondary}>
                        {"📥 Export"}
                    </Button>
                    <label class="file-button">
                        {"📤 Import"}
                        <input id="importHistoryFile" type="file" accept="application/json" class="hidden" onchange={on_import_history} />
                    </label>
                    <Button onclick={on_clear_history} variant={ButtonVariant::Danger}>
                        {"🗑️ Clear"}
                    </Button>
                </div>
            </section>
        </div>
    }
}
