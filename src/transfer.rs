/// Export and import documents for history and settings
use crate::error::ValidationError;
use crate::history::{HistoryEntry, QrOptions};
use crate::qr_content::{classify, iso_timestamp};
use crate::settings::{Settings, SettingsPatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Settings-only export file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsExport {
    pub settings: Settings,
    pub export_date: String,
}

/// History export: a pretty-printed JSON array of entries
pub fn export_history(entries: &[HistoryEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(entries)
}

pub fn export_settings(settings: &Settings, now_millis: i64) -> serde_json::Result<String> {
    let export = SettingsExport {
        settings: settings.clone(),
        export_date: iso_timestamp(now_millis),
    };
    serde_json::to_string_pretty(&export)
}

/// Parse and validate an imported history file.
///
/// Every element must carry a non-empty `text` and a positive `timestamp`;
/// one bad element rejects the whole document.
pub fn parse_history_document(document: &str) -> Result<Vec<HistoryEntry>, ValidationError> {
    let value: Value =
        serde_json::from_str(document).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
    parse_entries(&value)
}

pub fn parse_entries(value: &Value) -> Result<Vec<HistoryEntry>, ValidationError> {
    let items = value.as_array().ok_or(ValidationError::NotASequence)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| entry_from_value(index, item))
        .collect()
}

/// Read history written by any context, skipping elements that don't
/// validate instead of failing the whole load.
pub fn entries_from_stored(value: &Value) -> Vec<HistoryEntry> {
    let Some(items) = value.as_array() else {
        log::warn!("Stored history is not a list, ignoring it");
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match entry_from_value(index, item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping stored history entry: {}", e);
                None
            }
        })
        .collect()
}

/// Parse an imported settings file into a patch over the current settings
pub fn parse_settings_document(document: &str) -> Result<SettingsPatch, ValidationError> {
    let value: Value =
        serde_json::from_str(document).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;

    value
        .get("settings")
        .filter(|s| s.is_object())
        .map(SettingsPatch::from_value)
        .ok_or(ValidationError::MissingSettings)
}

fn entry_from_value(index: usize, item: &Value) -> Result<HistoryEntry, ValidationError> {
    let text = item
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or(ValidationError::MissingField { index, field: "text" })?;

    let timestamp = item
        .get("timestamp")
        .and_then(timestamp_of)
        .filter(|t| *t > 0)
        .ok_or(ValidationError::MissingField { index, field: "timestamp" })?;

    // Older files used numeric ids (Date.now()) or none at all
    let id = match item.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => Uuid::new_v4().to_string(),
    };

    let kind = item
        .get("type")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_else(|| classify(text));

    let options: QrOptions = item
        .get("options")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    Ok(HistoryEntry {
        id,
        text: text.to_string(),
        kind,
        timestamp,
        options,
        data_url: item.get("dataUrl").and_then(Value::as_str).map(str::to_string),
    })
}

fn timestamp_of(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{EntryKind, ErrorCorrection};
    use serde_json::json;

    fn sample_entries() -> Vec<HistoryEntry> {
        vec![
            HistoryEntry {
                id: "b".to_string(),
                text: "https://example.com".to_string(),
                kind: EntryKind::Url,
                timestamp: 1_700_000_002_000,
                options: QrOptions {
                    size: 300,
                    foreground: "#112233".to_string(),
                    background: "#ffffff".to_string(),
                    error_correction: ErrorCorrection::H,
                },
                data_url: Some("data:image/png;base64,AAAA".to_string()),
            },
            HistoryEntry {
                id: "a".to_string(),
                text: "hello".to_string(),
                kind: EntryKind::Text,
                timestamp: 1_700_000_001_000,
                options: QrOptions::default(),
                data_url: None,
            },
        ]
    }

    #[test]
    fn test_export_then_import_reproduces_entries() {
        let entries = sample_entries();

        let document = export_history(&entries).unwrap();
        let imported = parse_history_document(&document).unwrap();

        assert_eq!(imported, entries);
    }

    #[test]
    fn test_rejects_object_document() {
        let result = parse_history_document(r#"{"text": "x", "timestamp": 1}"#);
        assert_eq!(result, Err(ValidationError::NotASequence));
    }

    #[test]
    fn test_rejects_missing_timestamp() {
        let result = parse_history_document(r#"[{"text": "x", "timestamp": 1}, {"text": "y"}]"#);
        assert_eq!(
            result,
            Err(ValidationError::MissingField { index: 1, field: "timestamp" })
        );
    }

    #[test]
    fn test_rejects_missing_or_empty_text() {
        assert_eq!(
            parse_history_document(r#"[{"timestamp": 5}]"#),
            Err(ValidationError::MissingField { index: 0, field: "text" })
        );
        assert_eq!(
            parse_history_document(r#"[{"text": "", "timestamp": 5}]"#),
            Err(ValidationError::MissingField { index: 0, field: "text" })
        );
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            parse_history_document("[{"),
            Err(ValidationError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_minimal_entries_are_completed() {
        let imported =
            parse_history_document(r#"[{"text": "https://a.io", "timestamp": 1700000000000, "id": 17}]"#)
                .unwrap();

        assert_eq!(imported[0].id, "17");
        assert_eq!(imported[0].kind, EntryKind::Url);
        assert_eq!(imported[0].options, QrOptions::default());
        assert_eq!(imported[0].data_url, None);
    }

    #[test]
    fn test_entries_from_stored_skips_bad_elements() {
        let stored = json!([
            { "text": "ok", "timestamp": 10 },
            { "text": "no timestamp" },
            "garbage",
        ]);

        let entries = entries_from_stored(&stored);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "ok");
        assert!(entries_from_stored(&json!({"not": "a list"})).is_empty());
    }

    #[test]
    fn test_settings_export_shape() {
        let document = export_settings(&Settings::default(), 1_709_647_629_123).unwrap();
        let value: Value = serde_json::from_str(&document).unwrap();

        assert_eq!(value["settings"]["maxHistoryItems"], 10);
        assert_eq!(value["exportDate"], "2024-03-05T14:07:09.123Z");
    }

    #[test]
    fn test_parse_settings_document() {
        let patch = parse_settings_document(r#"{"settings": {"defaultQrSize": 320}}"#).unwrap();
        assert_eq!(patch.default_qr_size, Some(320));
        assert_eq!(patch.save_history, None);

        assert_eq!(
            parse_settings_document(r#"{"maxHistoryItems": 3}"#),
            Err(ValidationError::MissingSettings)
        );
        assert_eq!(
            parse_settings_document(r#"{"settings": 3}"#),
            Err(ValidationError::MissingSettings)
        );
    }
}
