use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::Notify;

use crate::auth::types::UserIdentity;
use crate::error_handling::types::{EditError, StoreError};
use crate::store::store_trait::TelemetryStore;
use crate::store::types::ConfigRecord;

/// How long the save notice stays up before the authoritative snapshot is
/// re-fetched and reconciled.
const REFRESH_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient feedback attached to the edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Stages and persists detection threshold edits.
///
/// The draft always equals either the last loaded config record, or the
/// operator's unsaved edits layered on top of it; `reset` drops the edits
/// and restores the loaded values (or the defaults if nothing was ever
/// loaded). Field bounds are advisory form hints only; the store remains
/// the final authority and its rejection is surfaced, never coerced away.
pub struct ConfigEditor {
    store: Arc<dyn TelemetryStore>,
    refresh: Arc<Notify>,
    draft: ConfigRecord,
    last_loaded: Option<ConfigRecord>,
    dirty: bool,
    notice: Option<Notice>,
}

impl ConfigEditor {
    pub fn new(store: Arc<dyn TelemetryStore>, refresh: Arc<Notify>) -> Self {
        Self {
            store,
            refresh,
            draft: ConfigRecord::default(),
            last_loaded: None,
            dirty: false,
            notice: None,
        }
    }

    pub fn draft(&self) -> &ConfigRecord {
        &self.draft
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reconcile with a config fetched by the poller.
    ///
    /// Unsaved edits win over the fetched values, but an id is adopted
    /// into an id-less draft so the next save updates instead of
    /// inserting a duplicate record.
    pub fn apply_loaded(&mut self, loaded: Option<ConfigRecord>) {
        self.last_loaded = loaded.clone();
        match loaded {
            Some(cfg) => {
                if !self.dirty {
                    self.draft = cfg;
                    self.notice = None;
                } else if self.draft.id.is_none() {
                    self.draft.id = cfg.id;
                }
            }
            None => {
                if !self.dirty {
                    self.draft = ConfigRecord::default();
                }
            }
        }
    }

    /// Stage one field edit from its raw form value.
    ///
    /// Integer fields must parse; a failed parse rejects the edit and the
    /// draft keeps its previous valid value, so the form stays
    /// submittable.
    pub fn update_field(&mut self, name: &str, raw: &str) -> Result<(), EditError> {
        match name {
            "traffic_threshold" => {
                self.draft.traffic_threshold = parse_number("traffic_threshold", raw)?;
            }
            "connection_rate" => {
                self.draft.connection_rate = parse_number("connection_rate", raw)?;
            }
            "protocol_blacklist" => {
                self.draft.protocol_blacklist = raw.trim().to_string();
            }
            other => return Err(EditError::UnknownField(other.to_string())),
        }
        self.dirty = true;
        Ok(())
    }

    /// Discard unsaved edits.
    pub fn reset(&mut self) {
        self.draft = self.last_loaded.clone().unwrap_or_default();
        self.dirty = false;
        self.notice = None;
    }

    /// Drop everything, including the loaded record. Used on sign-out.
    pub fn clear(&mut self) {
        self.draft = ConfigRecord::default();
        self.last_loaded = None;
        self.dirty = false;
        self.notice = None;
    }

    /// Persist the draft: insert on first save (tagged with the caller's
    /// id), update by id afterwards.
    ///
    /// Success posts a notice and schedules a re-fetch of the
    /// authoritative snapshot after the notice delay. Failure posts the
    /// store's message and leaves the draft untouched so the operator can
    /// correct and retry.
    pub async fn save(&mut self, user: &UserIdentity) -> Result<(), StoreError> {
        let result = match self.draft.id {
            None => match self.store.insert_config(&self.draft, user.id).await {
                Ok(stored) => {
                    self.draft.id = stored.id;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Some(id) => self.store.update_config(id, &self.draft).await,
        };

        match result {
            Ok(()) => {
                info!("configuration saved");
                self.dirty = false;
                self.last_loaded = Some(self.draft.clone());
                self.notice = Some(Notice {
                    kind: NoticeKind::Success,
                    text: String::from("Configuration saved successfully!"),
                });
                let refresh = self.refresh.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(REFRESH_DELAY).await;
                    refresh.notify_one();
                });
                Ok(())
            }
            Err(e) => {
                warn!("configuration save failed: {}", e);
                self.notice = Some(Notice {
                    kind: NoticeKind::Error,
                    text: format!("Error: {}", e),
                });
                Err(e)
            }
        }
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<i64, EditError> {
    raw.trim().parse::<i64>().map_err(|_| EditError::InvalidNumber {
        field,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    fn operator() -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            email: String::from("operator@example.com"),
        }
    }

    fn editor_with_store() -> (ConfigEditor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let editor = ConfigEditor::new(store.clone(), Arc::new(Notify::new()));
        (editor, store)
    }

    fn loaded_record(id: Uuid) -> ConfigRecord {
        ConfigRecord {
            id: Some(id),
            traffic_threshold: 1000,
            connection_rate: 100,
            protocol_blacklist: String::from("ICMP,IGMP"),
        }
    }

    #[test]
    fn test_draft_defaults_before_any_load() {
        let (editor, _) = editor_with_store();
        assert_eq!(editor.draft(), &ConfigRecord::default());
        assert_eq!(editor.draft().traffic_threshold, 1000);
        assert_eq!(editor.draft().connection_rate, 100);
        assert_eq!(editor.draft().protocol_blacklist, "ICMP,IGMP");
    }

    #[test]
    fn test_reset_restores_last_loaded_exactly() {
        let (mut editor, _) = editor_with_store();
        let loaded = loaded_record(Uuid::new_v4());
        editor.apply_loaded(Some(loaded.clone()));

        editor.update_field("traffic_threshold", "2500").unwrap();
        editor.update_field("connection_rate", "70").unwrap();
        editor.update_field("protocol_blacklist", "ICMP").unwrap();
        assert!(editor.is_dirty());

        editor.reset();
        assert_eq!(editor.draft(), &loaded);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_reset_without_load_restores_defaults() {
        let (mut editor, _) = editor_with_store();
        editor.update_field("traffic_threshold", "9000").unwrap();
        editor.reset();
        assert_eq!(editor.draft(), &ConfigRecord::default());
    }

    #[test]
    fn test_invalid_number_rejected_and_draft_unchanged() {
        let (mut editor, _) = editor_with_store();
        let err = editor.update_field("traffic_threshold", "lots").unwrap_err();
        assert_eq!(
            err,
            EditError::InvalidNumber {
                field: "traffic_threshold",
                raw: String::from("lots"),
            }
        );
        assert_eq!(editor.draft().traffic_threshold, 1000);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let (mut editor, _) = editor_with_store();
        let err = editor.update_field("no_such_field", "1").unwrap_err();
        assert!(matches!(err, EditError::UnknownField(_)));
    }

    #[test]
    fn test_fetched_config_does_not_clobber_unsaved_edits() {
        let (mut editor, _) = editor_with_store();
        editor.update_field("traffic_threshold", "2500").unwrap();

        let id = Uuid::new_v4();
        editor.apply_loaded(Some(loaded_record(id)));

        // Edits survive, but the id is adopted for the next save.
        assert_eq!(editor.draft().traffic_threshold, 2500);
        assert_eq!(editor.draft().id, Some(id));
    }

    #[tokio::test]
    async fn test_first_save_inserts_once_tagged_with_user() {
        let (mut editor, store) = editor_with_store();
        let user = operator();

        editor.update_field("traffic_threshold", "2500").unwrap();
        editor.save(&user).await.unwrap();

        assert_eq!(store.config_inserts.load(Ordering::SeqCst), 1);
        assert_eq!(store.config_updates.load(Ordering::SeqCst), 0);
        let stored = store.stored_config(user.id).unwrap();
        assert_eq!(stored.traffic_threshold, 2500);
        assert_eq!(editor.draft().id, stored.id);
        assert_eq!(editor.notice().unwrap().kind, NoticeKind::Success);
        assert!(!editor.is_dirty());
    }

    #[tokio::test]
    async fn test_second_save_updates_by_id_zero_inserts() {
        let (mut editor, store) = editor_with_store();
        let user = operator();

        editor.save(&user).await.unwrap();
        editor.update_field("connection_rate", "40").unwrap();
        editor.save(&user).await.unwrap();

        assert_eq!(store.config_inserts.load(Ordering::SeqCst), 1);
        assert_eq!(store.config_updates.load(Ordering::SeqCst), 1);
        assert_eq!(store.stored_config(user.id).unwrap().connection_rate, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_draft_and_skips_refetch() {
        let store = Arc::new(MemoryStore::new());
        let refresh = Arc::new(Notify::new());
        let mut editor = ConfigEditor::new(store.clone(), refresh.clone());

        let refreshed = Arc::new(AtomicBool::new(false));
        let waiter_flag = refreshed.clone();
        let waiter_refresh = refresh.clone();
        tokio::spawn(async move {
            waiter_refresh.notified().await;
            waiter_flag.store(true, Ordering::SeqCst);
        });

        store.fail_writes.store(true, Ordering::SeqCst);
        editor.update_field("traffic_threshold", "2500").unwrap();
        let result = editor.save(&operator()).await;
        assert!(result.is_err());

        assert_eq!(editor.draft().traffic_threshold, 2500);
        assert!(editor.is_dirty());
        assert_eq!(editor.notice().unwrap().kind, NoticeKind::Error);
        assert!(editor.notice().unwrap().text.contains("injected failure"));

        tokio::time::advance(Duration::from_secs(10)).await;
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert!(!refreshed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_save_refetches_after_notice_delay() {
        let store = Arc::new(MemoryStore::new());
        let refresh = Arc::new(Notify::new());
        let mut editor = ConfigEditor::new(store.clone(), refresh.clone());

        let refreshed = Arc::new(AtomicBool::new(false));
        let waiter_flag = refreshed.clone();
        let waiter_refresh = refresh.clone();
        tokio::spawn(async move {
            waiter_refresh.notified().await;
            waiter_flag.store(true, Ordering::SeqCst);
        });

        editor.save(&operator()).await.unwrap();
        // Let the spawned delay task register its timer before advancing.
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert!(!refreshed.load(Ordering::SeqCst));

        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert!(refreshed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_post_save_reconciliation_clears_notice() {
        let (mut editor, _) = editor_with_store();
        let user = operator();
        editor.save(&user).await.unwrap();
        assert!(editor.notice().is_some());

        let saved = editor.draft().clone();
        editor.apply_loaded(Some(saved.clone()));
        assert!(editor.notice().is_none());
        assert_eq!(editor.draft(), &saved);
    }
}
