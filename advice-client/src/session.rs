//! Client-local record of who is signed in.
//!
//! A [`SessionHub`] owns one [`SessionSlot`] plus a broadcast channel. Every
//! part of the client that cares about the session holds its own
//! [`SessionView`]; a write through one view is announced to all the others
//! but never echoed back to the writer. Clearing the session is announced to
//! every view, the writer included.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

use crate::PublicUser;
use crate::error::AdviceClientError;

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: PublicUser,
    pub access_token: String,
}

/// Raw storage for the serialized session. Implementations only move
/// strings; parsing lives in [`SessionView::get`].
#[async_trait]
pub trait SessionSlot: Send + Sync {
    async fn read(&self) -> Result<Option<String>, AdviceClientError>;
    async fn write(&self, raw: String) -> Result<(), AdviceClientError>;
    async fn remove(&self) -> Result<(), AdviceClientError>;
}

#[derive(Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionSlot for MemorySlot {
    async fn read(&self) -> Result<Option<String>, AdviceClientError> {
        Ok(self.value.lock().await.clone())
    }

    async fn write(&self, raw: String) -> Result<(), AdviceClientError> {
        *self.value.lock().await = Some(raw);
        Ok(())
    }

    async fn remove(&self) -> Result<(), AdviceClientError> {
        self.value.lock().await.take();
        Ok(())
    }
}

/// Session kept in a JSON file so it survives between CLI invocations.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionSlot for FileSlot {
    async fn read(&self) -> Result<Option<String>, AdviceClientError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, raw: String) -> Result<(), AdviceClientError> {
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn remove(&self) -> Result<(), AdviceClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u64);

#[derive(Debug, Clone)]
enum SessionEvent {
    Updated {
        origin: ViewId,
        revision: u64,
        session: Session,
    },
    Reset {
        revision: u64,
    },
}

impl SessionEvent {
    fn revision(&self) -> u64 {
        match self {
            SessionEvent::Updated { revision, .. } | SessionEvent::Reset { revision } => *revision,
        }
    }
}

/// What a view observes when the session changes elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    Updated(Session),
    /// The session was cleared; views should return to their signed-out state.
    Reset,
    /// Events were dropped while this view lagged; this is the slot's
    /// current content.
    Resync(Option<Session>),
}

pub struct SessionHub<S> {
    slot: S,
    // held from the slot write until the event is out, so the newest
    // revision always describes what the slot holds
    write_lock: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
    revision: AtomicU64,
    next_view: AtomicU64,
}

impl<S: SessionSlot> SessionHub<S> {
    pub fn new(slot: S) -> Arc<Self> {
        Self::with_capacity(slot, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(slot: S, capacity: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            slot,
            write_lock: Mutex::new(()),
            events,
            revision: AtomicU64::new(0),
            next_view: AtomicU64::new(1),
        })
    }

    pub fn view(self: &Arc<Self>) -> SessionView<S> {
        SessionView {
            id: ViewId(self.next_view.fetch_add(1, Ordering::Relaxed)),
            hub: Arc::clone(self),
            rx: self.events.subscribe(),
            last_seen: self.revision.load(Ordering::Acquire),
        }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    fn bump(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    async fn load(&self) -> Result<Option<Session>, AdviceClientError> {
        let Some(raw) = self.slot.read().await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(error = %err, "ignoring unreadable session");
                Ok(None)
            }
        }
    }
}

pub struct SessionView<S> {
    id: ViewId,
    hub: Arc<SessionHub<S>>,
    rx: broadcast::Receiver<SessionEvent>,
    last_seen: u64,
}

impl<S: SessionSlot> SessionView<S> {
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Unparseable slot content reads as no session.
    pub async fn get(&self) -> Result<Option<Session>, AdviceClientError> {
        self.hub.load().await
    }

    pub async fn set(&self, session: Session) -> Result<u64, AdviceClientError> {
        let raw = serde_json::to_string_pretty(&session)?;
        let _guard = self.hub.write_lock.lock().await;
        self.hub.slot.write(raw).await?;
        let revision = self.hub.bump();
        debug!(view = self.id.0, revision, user_id = %session.user.id, "session stored");
        self.hub.publish(SessionEvent::Updated {
            origin: self.id,
            revision,
            session,
        });
        Ok(revision)
    }

    pub async fn clear(&self) -> Result<u64, AdviceClientError> {
        let _guard = self.hub.write_lock.lock().await;
        self.hub.slot.remove().await?;
        let revision = self.hub.bump();
        debug!(view = self.id.0, revision, "session cleared");
        self.hub.publish(SessionEvent::Reset { revision });
        Ok(revision)
    }

    /// Waits for the next change made by another view, or for a reset.
    /// Returns `None` once the hub is gone.
    pub async fn next_change(&mut self) -> Option<SessionChange> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    let revision = event.revision();
                    if revision <= self.last_seen {
                        continue;
                    }
                    self.last_seen = revision;
                    match event {
                        SessionEvent::Updated { origin, .. } if origin == self.id => continue,
                        SessionEvent::Updated { session, .. } => {
                            return Some(SessionChange::Updated(session));
                        }
                        SessionEvent::Reset { .. } => return Some(SessionChange::Reset),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(view = self.id.0, skipped, "session view lagged, re-reading slot");
                    let _guard = self.hub.write_lock.lock().await;
                    self.last_seen = self.hub.revision.load(Ordering::Acquire);
                    let current = match self.hub.load().await {
                        Ok(current) => current,
                        Err(err) => {
                            warn!(error = %err, "session slot unreadable during resync");
                            None
                        }
                    };
                    return Some(SessionChange::Resync(current));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tokio::time::timeout;
    use uuid::Uuid;

    use super::*;
    use crate::Role;

    fn session(name: &str) -> Session {
        Session {
            user: PublicUser {
                id: Uuid::new_v4(),
                name: name.into(),
                email: format!("{}@x.com", name.to_lowercase()),
                role: Role::User,
                image: None,
                created_at: Utc::now(),
            },
            access_token: format!("token-{name}"),
        }
    }

    async fn quiet<S: SessionSlot>(view: &mut SessionView<S>) -> bool {
        timeout(Duration::from_millis(50), view.next_change())
            .await
            .is_err()
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let hub = SessionHub::new(MemorySlot::new());
        let view = hub.view();
        assert_eq!(view.get().await.unwrap(), None);

        let ann = session("Ann");
        view.set(ann.clone()).await.unwrap();
        assert_eq!(view.get().await.unwrap(), Some(ann));
    }

    #[tokio::test]
    async fn garbage_in_slot_reads_as_signed_out() {
        let slot = MemorySlot::new();
        slot.write("{not json".into()).await.unwrap();
        let hub = SessionHub::new(slot);
        assert_eq!(hub.view().get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn other_views_see_updates_but_writer_does_not() {
        let hub = SessionHub::new(MemorySlot::new());
        let mut writer = hub.view();
        let mut reader = hub.view();

        let ann = session("Ann");
        writer.set(ann.clone()).await.unwrap();

        assert_eq!(reader.next_change().await, Some(SessionChange::Updated(ann)));
        assert!(quiet(&mut writer).await);
    }

    #[tokio::test]
    async fn clear_resets_every_view_including_caller() {
        let hub = SessionHub::new(MemorySlot::new());
        let mut a = hub.view();
        let mut b = hub.view();

        a.set(session("Ann")).await.unwrap();
        a.clear().await.unwrap();

        assert_eq!(a.next_change().await, Some(SessionChange::Reset));
        assert!(matches!(b.next_change().await, Some(SessionChange::Updated(_))));
        assert_eq!(b.next_change().await, Some(SessionChange::Reset));
        assert_eq!(a.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn replayed_events_are_ignored() {
        let hub = SessionHub::new(MemorySlot::new());
        let writer = hub.view();
        let mut reader = hub.view();

        let ann = session("Ann");
        let revision = writer.set(ann.clone()).await.unwrap();
        hub.publish(SessionEvent::Updated {
            origin: writer.id(),
            revision,
            session: ann.clone(),
        });

        assert_eq!(reader.next_change().await, Some(SessionChange::Updated(ann)));
        assert!(quiet(&mut reader).await);
    }

    #[tokio::test]
    async fn views_ignore_history_from_before_they_existed() {
        let hub = SessionHub::new(MemorySlot::new());
        let writer = hub.view();
        writer.set(session("Ann")).await.unwrap();

        let mut late = hub.view();
        assert!(quiet(&mut late).await);
        assert!(late.get().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn lagging_view_resyncs_from_slot() {
        let hub = SessionHub::with_capacity(MemorySlot::new(), 2);
        let writer = hub.view();
        let mut slow = hub.view();

        let mut last = None;
        for name in ["A", "B", "C", "D", "E"] {
            let s = session(name);
            writer.set(s.clone()).await.unwrap();
            last = Some(s);
        }

        assert_eq!(slow.next_change().await, Some(SessionChange::Resync(last)));
        assert!(quiet(&mut slow).await);
    }

    /// Takes its time to return after storing anything mentioning "Slow".
    struct SlowSlot {
        inner: MemorySlot,
    }

    #[async_trait]
    impl SessionSlot for SlowSlot {
        async fn read(&self) -> Result<Option<String>, AdviceClientError> {
            self.inner.read().await
        }

        async fn write(&self, raw: String) -> Result<(), AdviceClientError> {
            let slow = raw.contains("Slow");
            self.inner.write(raw).await?;
            if slow {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(())
        }

        async fn remove(&self) -> Result<(), AdviceClientError> {
            self.inner.remove().await
        }
    }

    #[tokio::test]
    async fn concurrent_writers_leave_observers_in_sync_with_slot() {
        let hub = SessionHub::new(SlowSlot {
            inner: MemorySlot::new(),
        });
        let a = hub.view();
        let b = hub.view();
        let mut observer = hub.view();

        let (slow, fast) = tokio::join!(a.set(session("Slow")), b.set(session("Fast")));
        slow.unwrap();
        fast.unwrap();

        let mut last = None;
        while let Ok(Some(change)) =
            timeout(Duration::from_millis(100), observer.next_change()).await
        {
            match change {
                SessionChange::Updated(session) => last = Some(session),
                other => panic!("unexpected change: {other:?}"),
            }
        }

        let stored = hub.view().get().await.unwrap();
        assert!(stored.is_some());
        assert_eq!(last, stored);
    }

    #[tokio::test]
    async fn file_slot_survives_a_new_hub() {
        let path = std::env::temp_dir().join(format!("advice-session-{}.json", Uuid::new_v4()));
        let ann = session("Ann");

        let hub = SessionHub::new(FileSlot::new(&path));
        hub.view().set(ann.clone()).await.unwrap();
        drop(hub);

        let hub = SessionHub::new(FileSlot::new(&path));
        let view = hub.view();
        assert_eq!(view.get().await.unwrap(), Some(ann));

        view.clear().await.unwrap();
        assert!(!hub.slot().path().exists());
        view.clear().await.unwrap();
    }
}
