/// Settings record kept in chrome.storage.sync
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use std::sync::LazyLock;

pub const MAX_HISTORY_RANGE: RangeInclusive<usize> = 1..=50;
pub const QR_SIZE_RANGE: RangeInclusive<u32> = 100..=1000;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex colour pattern"));

/// Fully populated settings. Missing or invalid stored fields fall back to
/// the defaults below, so every field always has a usable value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub max_history_items: usize,
    pub default_qr_size: u32,
    pub default_foreground: String,
    pub default_background: String,
    pub save_history: bool,
    pub show_notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_history_items: 10,
            default_qr_size: 200,
            default_foreground: "#000000".to_string(),
            default_background: "#ffffff".to_string(),
            save_history: true,
            show_notifications: true,
        }
    }
}

impl Settings {
    /// Complete a stored record from the defaults. Stored values win.
    pub fn from_stored(value: &Value) -> Settings {
        let mut settings = Settings::default();
        settings.apply(&SettingsPatch::from_value(value));
        settings
    }

    /// Merge a partial edit, clamping numbers and dropping malformed colours
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(max) = patch.max_history_items {
            self.max_history_items = max.clamp(*MAX_HISTORY_RANGE.start(), *MAX_HISTORY_RANGE.end());
        }
        if let Some(size) = patch.default_qr_size {
            self.default_qr_size = size.clamp(*QR_SIZE_RANGE.start(), *QR_SIZE_RANGE.end());
        }
        if let Some(color) = patch.default_foreground.as_deref().filter(|c| is_hex_color(c)) {
            self.default_foreground = color.to_lowercase();
        }
        if let Some(color) = patch.default_background.as_deref().filter(|c| is_hex_color(c)) {
            self.default_background = color.to_lowercase();
        }
        if let Some(save) = patch.save_history {
            self.save_history = save;
        }
        if let Some(show) = patch.show_notifications {
            self.show_notifications = show;
        }
    }
}

/// A partial settings edit. Only the `Some` fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_qr_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_foreground: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_history: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_notifications: Option<bool>,
}

impl SettingsPatch {
    /// Pick out every well-typed field of a stored object.
    ///
    /// A field with the wrong type is skipped on its own instead of
    /// invalidating the whole record.
    pub fn from_value(value: &Value) -> SettingsPatch {
        let Some(obj) = value.as_object() else {
            return SettingsPatch::default();
        };

        SettingsPatch {
            max_history_items: number_field(obj, "maxHistoryItems").map(|n| n.max(0) as usize),
            default_qr_size: number_field(obj, "defaultQrSize").map(|n| n.clamp(0, u32::MAX as i64) as u32),
            default_foreground: string_field(obj, "defaultForeground"),
            default_background: string_field(obj, "defaultBackground"),
            save_history: obj.get("saveHistory").and_then(Value::as_bool),
            show_notifications: obj.get("showNotifications").and_then(Value::as_bool),
        }
    }
}

impl From<&Settings> for SettingsPatch {
    fn from(settings: &Settings) -> Self {
        SettingsPatch {
            max_history_items: Some(settings.max_history_items),
            default_qr_size: Some(settings.default_qr_size),
            default_foreground: Some(settings.default_foreground.clone()),
            default_background: Some(settings.default_background.clone()),
            save_history: Some(settings.save_history),
            show_notifications: Some(settings.show_notifications),
        }
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = obj.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

pub fn is_hex_color(s: &str) -> bool {
    HEX_COLOR.is_match(s)
}

/// Popup colour theme, stored apart from the settings record
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn body_class(self) -> &'static str {
        match self {
            Theme::Light => "",
            Theme::Dark => "dark-theme",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.max_history_items, 10);
        assert_eq!(settings.default_qr_size, 200);
        assert_eq!(settings.default_foreground, "#000000");
        assert_eq!(settings.default_background, "#ffffff");
        assert!(settings.save_history);
        assert!(settings.show_notifications);
    }

    #[test]
    fn test_from_stored_completes_partial_record() {
        let stored = json!({ "maxHistoryItems": 25, "saveHistory": false });

        let settings = Settings::from_stored(&stored);

        assert_eq!(settings.max_history_items, 25);
        assert!(!settings.save_history);
        assert_eq!(settings.default_qr_size, 200);
        assert_eq!(settings.default_background, "#ffffff");
    }

    #[test]
    fn test_from_stored_skips_wrongly_typed_fields() {
        let stored = json!({
            "maxHistoryItems": "lots",
            "defaultQrSize": 300,
            "showNotifications": "yes",
        });

        let settings = Settings::from_stored(&stored);

        assert_eq!(settings.max_history_items, 10);
        assert_eq!(settings.default_qr_size, 300);
        assert!(settings.show_notifications);
    }

    #[test]
    fn test_from_stored_non_object() {
        assert_eq!(Settings::from_stored(&json!([1, 2, 3])), Settings::default());
        assert_eq!(Settings::from_stored(&Value::Null), Settings::default());
    }

    #[test]
    fn test_from_stored_accepts_float_numbers() {
        let settings = Settings::from_stored(&json!({ "defaultQrSize": 250.0 }));
        assert_eq!(settings.default_qr_size, 250);
    }

    #[test]
    fn test_apply_clamps_numbers() {
        let mut settings = Settings::default();
        settings.apply(&SettingsPatch {
            max_history_items: Some(500),
            default_qr_size: Some(10),
            ..Default::default()
        });

        assert_eq!(settings.max_history_items, 50);
        assert_eq!(settings.default_qr_size, 100);
    }

    #[test]
    fn test_apply_rejects_bad_colours() {
        let mut settings = Settings::default();
        settings.apply(&SettingsPatch {
            default_foreground: Some("red".to_string()),
            default_background: Some("#ABCDEF".to_string()),
            ..Default::default()
        });

        assert_eq!(settings.default_foreground, "#000000");
        assert_eq!(settings.default_background, "#abcdef");
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let value = serde_json::to_value(Settings::default()).unwrap();

        assert_eq!(value["maxHistoryItems"], 10);
        assert_eq!(value["defaultForeground"], "#000000");
        assert_eq!(value["showNotifications"], true);
    }

    #[test]
    fn test_patch_round_trip_through_settings() {
        let settings = Settings {
            max_history_items: 7,
            ..Default::default()
        };
        let patch = SettingsPatch::from(&settings);

        let mut rebuilt = Settings::default();
        rebuilt.apply(&patch);

        assert_eq!(rebuilt, settings);
    }

    #[test]
    fn test_theme() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(serde_json::to_value(Theme::Dark).unwrap(), json!("dark"));
        assert_eq!(Theme::Dark.body_class(), "dark-theme");
    }
}
