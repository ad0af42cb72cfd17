/// History/settings controller.
///
/// Owns the cached settings record and history list for one extension
/// context and mediates every read and write against storage. Storage is
/// the source of truth: writes are made on a copy, the cache is only
/// updated once the write succeeds, and a failed write reloads the cache
/// from storage.
///
/// Writes are serialized: a second write waits until the one in flight has
/// persisted. Clones share the same cache and the same queue.
use crate::error::{ControllerError, Result, ValidationError};
use crate::history::{HistoryEntry, HistoryList, QrOptions};
use crate::messages::{Message, Notifier};
use crate::qr_content::now_millis;
use crate::settings::{Settings, SettingsPatch, Theme};
use crate::storage::{HISTORY_KEY, SETTINGS_KEY, Scope, StorageArea, StorageChange, THEME_KEY};
use crate::transfer;
use futures::lock::Mutex;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct State {
    settings: Settings,
    history: HistoryList,
}

/// Which cached datum an external storage change refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refreshed {
    Settings,
    History,
    Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    pub count: usize,
    pub approx_bytes: usize,
}

pub struct Controller<S> {
    storage: Rc<S>,
    state: Rc<RefCell<State>>,
    notifier: Option<Rc<dyn Notifier>>,
    writes: Rc<Mutex<()>>,
}

impl<S> Clone for Controller<S> {
    fn clone(&self) -> Self {
        Controller {
            storage: Rc::clone(&self.storage),
            state: Rc::clone(&self.state),
            notifier: self.notifier.clone(),
            writes: Rc::clone(&self.writes),
        }
    }
}

impl<S: StorageArea> Controller<S> {
    pub fn new(storage: S) -> Self {
        Controller {
            storage: Rc::new(storage),
            state: Rc::new(RefCell::new(State::default())),
            notifier: None,
            writes: Rc::new(Mutex::new(())),
        }
    }

    pub fn with_notifier(mut self, notifier: Rc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Cached settings, defaults until `load_settings` has run
    pub fn settings(&self) -> Settings {
        self.state.borrow().settings.clone()
    }

    /// Cached history, newest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.borrow().history.entries().to_vec()
    }

    pub fn history_stats(&self) -> HistoryStats {
        let state = self.state.borrow();
        HistoryStats {
            count: state.history.len(),
            approx_bytes: state.history.approx_bytes(),
        }
    }

    /// Look up a cached entry to restore it into the generator
    pub fn find_entry(&self, id: &str) -> Result<HistoryEntry> {
        self.state
            .borrow()
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| ControllerError::NotFound(id.to_string()))
    }

    // Settings

    /// Read settings, completing them from the defaults.
    ///
    /// First run writes the defaults. Storage failures are logged and the
    /// defaults returned; this never fails.
    pub async fn load_settings(&self) -> Settings {
        match self.storage.get(Scope::Sync, SETTINGS_KEY).await {
            Ok(Some(value)) => {
                let settings = Settings::from_stored(&value);
                self.state.borrow_mut().settings = settings.clone();
                settings
            }
            Ok(None) => {
                let settings = Settings::default();
                match serde_json::to_value(&settings) {
                    Ok(value) => {
                        if let Err(e) = self.storage.set(Scope::Sync, SETTINGS_KEY, value).await {
                            log::warn!("Failed to store default settings: {}", e);
                        } else {
                            log::info!("Default settings initialized");
                        }
                    }
                    Err(e) => log::warn!("Failed to serialize default settings: {}", e),
                }
                self.state.borrow_mut().settings = settings.clone();
                settings
            }
            Err(e) => {
                log::error!("Failed to load settings: {}", e);
                Settings::default()
            }
        }
    }

    /// Merge a partial edit into the current settings and persist the full record
    pub async fn save_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        let _queued = self.writes.lock().await;
        self.merge_settings(patch).await
    }

    pub async fn reset_settings(&self) -> Result<Settings> {
        let _queued = self.writes.lock().await;
        self.persist_settings(Settings::default()).await
    }

    /// `{ settings, exportDate }` document
    pub fn export_settings(&self) -> Result<String> {
        Ok(transfer::export_settings(&self.settings(), now_millis())?)
    }

    pub async fn import_settings(&self, document: &str) -> Result<Settings> {
        let patch = transfer::parse_settings_document(document)?;
        let _queued = self.writes.lock().await;
        self.merge_settings(&patch).await
    }

    async fn merge_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        let mut settings = self.settings();
        settings.apply(patch);
        self.persist_settings(settings).await
    }

    async fn persist_settings(&self, settings: Settings) -> Result<Settings> {
        let value = serde_json::to_value(&settings)?;
        match self.storage.set(Scope::Sync, SETTINGS_KEY, value).await {
            Ok(()) => {
                self.state.borrow_mut().settings = settings.clone();
                self.notify(Message::SettingsUpdated);
                self.enforce_history_cap(settings.max_history_items).await?;
                Ok(settings)
            }
            Err(e) => {
                log::error!("Failed to save settings: {}", e);
                self.reload_settings().await;
                Err(e.into())
            }
        }
    }

    async fn reload_settings(&self) {
        match self.storage.get(Scope::Sync, SETTINGS_KEY).await {
            Ok(Some(value)) => self.state.borrow_mut().settings = Settings::from_stored(&value),
            Ok(None) => {}
            Err(e) => log::warn!("Keeping cached settings: {}", e),
        }
    }

    pub async fn load_theme(&self) -> Theme {
        match self.storage.get(Scope::Sync, THEME_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(e) => {
                log::warn!("Failed to load theme: {}", e);
                Theme::default()
            }
        }
    }

    pub async fn save_theme(&self, theme: Theme) -> Result<()> {
        let value = serde_json::to_value(theme)?;
        self.storage.set(Scope::Sync, THEME_KEY, value).await?;
        Ok(())
    }

    // History

    /// Read history from storage and refresh the cache. Storage is not written.
    pub async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        let list = self.read_history().await?;
        let entries = list.entries().to_vec();
        self.state.borrow_mut().history = list;
        Ok(entries)
    }

    /// Record a generated code at the front of history.
    ///
    /// Returns `None` without touching storage when history is disabled.
    /// Reads the stored list first so entries written by other contexts
    /// are kept.
    pub async fn add_entry(
        &self,
        text: &str,
        options: QrOptions,
        data_url: Option<String>,
    ) -> Result<Option<HistoryEntry>> {
        let _queued = self.writes.lock().await;
        let settings = self.settings();
        if !settings.save_history {
            return Ok(None);
        }
        if text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }

        let mut list = self.read_history().await?;
        let entry = HistoryEntry::new(text.to_string(), options, data_url, now_millis());
        list.record(entry.clone(), settings.max_history_items);

        self.persist_history(list).await?;
        Ok(Some(entry))
    }

    /// Remove an entry by id. A missing id is a no-op returning `false`.
    pub async fn remove_entry(&self, id: &str) -> Result<bool> {
        let _queued = self.writes.lock().await;
        let mut list = self.read_history().await?;
        if !list.remove(id) {
            self.state.borrow_mut().history = list;
            return Ok(false);
        }

        self.persist_history(list).await?;
        Ok(true)
    }

    /// Store an empty list. Confirmation is the caller's job.
    pub async fn clear_history(&self) -> Result<()> {
        let _queued = self.writes.lock().await;
        self.persist_history(HistoryList::new()).await
    }

    /// Pretty JSON array of every stored entry
    pub async fn export_history(&self) -> Result<String> {
        let entries = self.load_history().await?;
        Ok(transfer::export_history(&entries)?)
    }

    /// Replace history with the entries of an exported document.
    ///
    /// The document is validated in full before anything is written; the
    /// stored list keeps the uniqueness and length rules. Returns the
    /// number of entries stored.
    pub async fn import_history(&self, document: &str) -> Result<usize> {
        let entries = transfer::parse_history_document(document)?;
        let _queued = self.writes.lock().await;
        let list = HistoryList::from_entries(entries, self.settings().max_history_items);
        let count = list.len();

        self.persist_history(list).await?;
        log::info!("Imported {} history entries", count);
        Ok(count)
    }

    /// Drop stored entries past a lowered cap
    async fn enforce_history_cap(&self, max_items: usize) -> Result<()> {
        let mut list = self.read_history().await?;
        if list.truncate(max_items) {
            log::info!("History trimmed to {} entries", max_items);
            self.persist_history(list).await?;
        }
        Ok(())
    }

    async fn read_history(&self) -> Result<HistoryList> {
        let stored = self.storage.get(Scope::Local, HISTORY_KEY).await?;
        Ok(stored
            .map(|value| HistoryList::from_entries(transfer::entries_from_stored(&value), usize::MAX))
            .unwrap_or_default())
    }

    async fn persist_history(&self, list: HistoryList) -> Result<()> {
        let value = serde_json::to_value(&list)?;
        match self.storage.set(Scope::Local, HISTORY_KEY, value).await {
            Ok(()) => {
                let history = list.entries().to_vec();
                self.state.borrow_mut().history = list;
                self.notify(Message::HistoryUpdated { history });
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to save history: {}", e);
                match self.read_history().await {
                    Ok(stored) => self.state.borrow_mut().history = stored,
                    Err(e) => log::warn!("Keeping cached history: {}", e),
                }
                Err(e.into())
            }
        }
    }

    // Cross-context sync

    /// Fold a storage.onChanged notification into the cache
    pub fn apply_external_change(&self, change: &StorageChange) -> Option<Refreshed> {
        match (change.scope, change.key.as_str()) {
            (Scope::Sync, SETTINGS_KEY) => {
                let settings = change
                    .new_value
                    .as_ref()
                    .map(Settings::from_stored)
                    .unwrap_or_default();
                log::debug!("Settings changed in another context");
                self.state.borrow_mut().settings = settings;
                Some(Refreshed::Settings)
            }
            (Scope::Local, HISTORY_KEY) => {
                let history = change
                    .new_value
                    .as_ref()
                    .map(|value| HistoryList::from_entries(transfer::entries_from_stored(value), usize::MAX))
                    .unwrap_or_default();
                log::debug!("History changed in another context");
                self.state.borrow_mut().history = history;
                Some(Refreshed::History)
            }
            (Scope::Sync, THEME_KEY) => Some(Refreshed::Theme),
            _ => None,
        }
    }

    fn notify(&self, message: Message) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(message);
        }
    }
}
