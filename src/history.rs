/// History entries and the most-recent-first history list
use crate::qr_content::classify;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of content an entry encodes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Text,
    Url,
}

/// QR redundancy tier
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl ErrorCorrection {
    pub const ALL: [ErrorCorrection; 4] = [
        ErrorCorrection::L,
        ErrorCorrection::M,
        ErrorCorrection::Q,
        ErrorCorrection::H,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCorrection::L => "L",
            ErrorCorrection::M => "M",
            ErrorCorrection::Q => "Q",
            ErrorCorrection::H => "H",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorCorrection::L => "Low (7%)",
            ErrorCorrection::M => "Medium (15%)",
            ErrorCorrection::Q => "Quartile (25%)",
            ErrorCorrection::H => "High (30%)",
        }
    }

    pub fn parse(s: &str) -> Option<ErrorCorrection> {
        Self::ALL.into_iter().find(|level| level.as_str() == s)
    }
}

/// Rendering options an entry was generated with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrOptions {
    pub size: u32,
    pub foreground: String,
    pub background: String,
    pub error_correction: ErrorCorrection,
}

impl QrOptions {
    pub fn from_settings(settings: &Settings) -> QrOptions {
        QrOptions {
            size: settings.default_qr_size,
            foreground: settings.default_foreground.clone(),
            background: settings.default_background.clone(),
            error_correction: ErrorCorrection::default(),
        }
    }
}

impl Default for QrOptions {
    fn default() -> Self {
        QrOptions::from_settings(&Settings::default())
    }
}

/// One recorded QR generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub timestamp: i64,
    pub options: QrOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

impl HistoryEntry {
    pub fn new(text: String, options: QrOptions, data_url: Option<String>, timestamp: i64) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4().to_string(),
            kind: classify(&text),
            text,
            timestamp,
            options,
            data_url,
        }
    }
}

/// History as stored under `qrHistory`: newest first, `text` unique
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct HistoryList {
    entries: Vec<HistoryEntry>,
}

impl HistoryList {
    pub fn new() -> Self {
        HistoryList { entries: Vec::new() }
    }

    /// Wrap entries and enforce uniqueness and the length cap.
    /// Earlier occurrences win, matching newest-first order.
    pub fn from_entries(entries: Vec<HistoryEntry>, max_items: usize) -> Self {
        let mut list = HistoryList { entries: Vec::with_capacity(entries.len()) };
        for entry in entries {
            if !list.entries.iter().any(|e| e.text == entry.text) {
                list.entries.push(entry);
            }
        }
        list.entries.truncate(max_items);
        list
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Put `entry` at the front, dropping any earlier entry with the same
    /// text and anything past `max_items`.
    pub fn record(&mut self, entry: HistoryEntry, max_items: usize) {
        self.entries.retain(|e| e.text != entry.text);
        self.entries.insert(0, entry);
        self.entries.truncate(max_items);
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let original_len = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() < original_len
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Cut the list to `max_items`, returning whether anything was dropped
    pub fn truncate(&mut self, max_items: usize) -> bool {
        let dropped = self.entries.len() > max_items;
        self.entries.truncate(max_items);
        dropped
    }

    /// Approximate serialized size, as shown on the options page
    pub fn approx_bytes(&self) -> usize {
        serde_json::to_string(&self.entries).map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_entry(id: &str, text: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            text: text.to_string(),
            kind: classify(text),
            timestamp: 1698508200000,
            options: QrOptions::default(),
            data_url: None,
        }
    }

    fn texts(list: &HistoryList) -> Vec<&str> {
        list.entries().iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_new_entry() {
        let entry = HistoryEntry::new(
            "https://example.com".to_string(),
            QrOptions::default(),
            Some("data:image/png;base64,AAAA".to_string()),
            42,
        );

        assert_eq!(entry.kind, EntryKind::Url);
        assert_eq!(entry.timestamp, 42);
        assert!(Uuid::parse_str(&entry.id).is_ok());
    }

    #[test]
    fn test_record_moves_duplicate_to_front() {
        let mut list = HistoryList::new();
        list.record(create_test_entry("1", "x"), 10);
        list.record(create_test_entry("2", "y"), 10);
        list.record(create_test_entry("3", "x"), 10);

        assert_eq!(texts(&list), vec!["x", "y"]);
        assert_eq!(list.entries()[0].id, "3");
    }

    #[test]
    fn test_record_caps_length() {
        let mut list = HistoryList::new();
        for (i, text) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            list.record(create_test_entry(&i.to_string(), text), 3);
        }

        assert_eq!(texts(&list), vec!["e", "d", "c"]);
    }

    #[test]
    fn test_dedup_is_exact_match() {
        let mut list = HistoryList::new();
        list.record(create_test_entry("1", "Hello"), 10);
        list.record(create_test_entry("2", "hello"), 10);
        list.record(create_test_entry("3", "hello "), 10);

        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_remove() {
        let mut list = HistoryList::new();
        list.record(create_test_entry("1", "a"), 10);
        list.record(create_test_entry("2", "b"), 10);

        assert!(list.remove("1"));
        assert_eq!(texts(&list), vec!["b"]);
        assert!(!list.remove("nonexistent"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_get() {
        let mut list = HistoryList::new();
        list.record(create_test_entry("1", "a"), 10);

        assert_eq!(list.get("1").map(|e| e.text.as_str()), Some("a"));
        assert!(list.get("2").is_none());
    }

    #[test]
    fn test_from_entries_dedups_and_caps() {
        let list = HistoryList::from_entries(
            vec![
                create_test_entry("1", "a"),
                create_test_entry("2", "b"),
                create_test_entry("3", "a"),
                create_test_entry("4", "c"),
            ],
            2,
        );

        assert_eq!(texts(&list), vec!["a", "b"]);
        assert_eq!(list.entries()[0].id, "1");
    }

    #[test]
    fn test_truncate_reports_dropped_entries() {
        let mut list = HistoryList::from_entries(
            vec![create_test_entry("1", "a"), create_test_entry("2", "b")],
            10,
        );

        assert!(!list.truncate(2));
        assert!(list.truncate(1));
        assert_eq!(texts(&list), vec!["a"]);
    }

    #[test]
    fn test_serialization_shape() {
        let mut entry = create_test_entry("1", "https://example.com");
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["type"], "url");
        assert_eq!(value["options"]["errorCorrection"], "M");
        assert!(value.get("dataUrl").is_none());

        entry.data_url = Some("data:image/png;base64,AAAA".to_string());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["dataUrl"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_list_serializes_as_array() {
        let mut list = HistoryList::new();
        list.record(create_test_entry("1", "a"), 10);

        let value = serde_json::to_value(&list).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["text"], json!("a"));
        assert!(list.approx_bytes() > 0);
        assert_eq!(HistoryList::new().approx_bytes(), 2);
    }

    #[test]
    fn test_error_correction_parse() {
        assert_eq!(ErrorCorrection::parse("H"), Some(ErrorCorrection::H));
        assert_eq!(ErrorCorrection::parse("x"), None);
        assert_eq!(ErrorCorrection::default().as_str(), "M");
    }
}
