//! Catalog-diff curation of playlists.
//!
//! A curation session snapshots a playlist, offers every catalog song that
//! is not already in it, lets the user toggle a selection, and submits the
//! selection as one batch-add. After a successful submission the playlist is
//! read again from the server; the selection is never spliced into a local
//! copy.
//!
//! Session lifecycle:
//!
//! ```text
//! open ─► Idle ─commit─► Submitting ─┬─► Committed (terminal)
//!                            ▲       └─► Failed ─┐
//!                            └───── commit ──────┘
//! ```
//!
//! `cancel` closes the session from any state. Cancelling while a submission
//! is in flight detaches the session: the request still completes, but its
//! result is dropped, and `open` reports [`CuratorError::SessionBusy`] until
//! it settles.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogService;
use crate::error::{CuratorError, Result};
use crate::model::{Identity, PlaylistId, Song, SongId};

/// Identifier of a curation session, unique per curator.
pub type SessionId = u64;

/// Submission state of a curation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum SubmissionState {
    /// Loaded, nothing submitted yet.
    Idle,
    /// A batch-add is in flight.
    Submitting,
    /// The last batch-add failed; the selection is kept for a retry.
    Failed(String),
    /// The batch-add succeeded. The session accepts no further changes.
    Committed,
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Submitting => write!(f, "Submitting"),
            Self::Failed(msg) => write!(f, "Failed: {msg}"),
            Self::Committed => write!(f, "Committed"),
        }
    }
}

/// Catalog songs that are not in the playlist, in catalog order.
///
/// Songs are compared by id only. A catalog listing the same id twice
/// contributes it once.
pub fn compute_candidate_pool(catalog: Vec<Song>, existing: &HashSet<SongId>) -> Vec<Song> {
    let mut seen = HashSet::new();
    catalog
        .into_iter()
        .filter(|song| !existing.contains(&song.id) && seen.insert(song.id.clone()))
        .collect()
}

/// One curation of one playlist.
#[derive(Debug, Clone)]
pub struct CurationSession {
    id: SessionId,
    playlist_id: PlaylistId,
    existing_song_ids: HashSet<SongId>,
    candidate_pool: Vec<Song>,
    candidate_ids: HashSet<SongId>,
    selection: BTreeSet<SongId>,
    submission: SubmissionState,
}

impl CurationSession {
    fn new(id: SessionId, playlist_id: PlaylistId, catalog: Vec<Song>, existing: Vec<Song>) -> Self {
        let existing_song_ids: HashSet<SongId> = existing.into_iter().map(|s| s.id).collect();
        let candidate_pool = compute_candidate_pool(catalog, &existing_song_ids);
        let candidate_ids = candidate_pool.iter().map(|s| s.id.clone()).collect();

        Self {
            id,
            playlist_id,
            existing_song_ids,
            candidate_pool,
            candidate_ids,
            selection: BTreeSet::new(),
            submission: SubmissionState::Idle,
        }
    }

    /// Session id.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Playlist being curated.
    pub const fn playlist_id(&self) -> &PlaylistId {
        &self.playlist_id
    }

    /// Songs that were in the playlist when the session opened.
    pub const fn existing_song_ids(&self) -> &HashSet<SongId> {
        &self.existing_song_ids
    }

    /// Songs that may be added, in catalog order.
    pub fn candidate_pool(&self) -> &[Song] {
        &self.candidate_pool
    }

    /// Currently selected song ids.
    pub const fn selection(&self) -> &BTreeSet<SongId> {
        &self.selection
    }

    /// Submission state.
    pub const fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    /// True if the song is selected.
    pub fn is_selected(&self, song_id: &SongId) -> bool {
        self.selection.contains(song_id)
    }

    /// True if the song can be selected.
    pub fn is_candidate(&self, song_id: &SongId) -> bool {
        self.candidate_ids.contains(song_id)
    }

    /// Selected songs in candidate-pool order.
    pub fn selected_songs(&self) -> Vec<&Song> {
        self.candidate_pool
            .iter()
            .filter(|song| self.selection.contains(&song.id))
            .collect()
    }

    fn ensure_editable(&self) -> std::result::Result<(), CuratorError> {
        match self.submission {
            SubmissionState::Submitting => Err(CuratorError::AlreadySubmitting),
            SubmissionState::Committed => Err(CuratorError::SessionCommitted),
            SubmissionState::Idle | SubmissionState::Failed(_) => Ok(()),
        }
    }

    /// Flip a candidate in or out of the selection. Returns the new membership.
    fn toggle(&mut self, song_id: &SongId) -> std::result::Result<bool, CuratorError> {
        if !self.is_candidate(song_id) {
            return Err(CuratorError::InvalidCandidate(song_id.clone()));
        }
        if self.selection.remove(song_id) {
            Ok(false)
        } else {
            self.selection.insert(song_id.clone());
            Ok(true)
        }
    }
}

/// Events emitted by the curator for re-rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CuratorEvent {
    /// A session was opened.
    SessionOpened {
        /// The new session.
        session_id: SessionId,
        /// Playlist being curated.
        playlist_id: PlaylistId,
        /// Size of the candidate pool.
        candidates: usize,
    },
    /// The selection changed.
    SelectionChanged {
        /// The session.
        session_id: SessionId,
        /// Number of selected songs.
        selected: usize,
    },
    /// A batch-add was sent.
    SubmissionStarted {
        /// The session.
        session_id: SessionId,
        /// Number of songs in the batch.
        count: usize,
    },
    /// The batch-add succeeded.
    Committed {
        /// The session.
        session_id: SessionId,
        /// Playlist that received the songs.
        playlist_id: PlaylistId,
        /// Songs that were submitted.
        added: Vec<SongId>,
    },
    /// The batch-add failed; the selection is kept.
    SubmissionFailed {
        /// The session.
        session_id: SessionId,
        /// Error message.
        error: String,
    },
    /// The playlist was re-read after a commit.
    PlaylistRefreshed {
        /// The playlist.
        playlist_id: PlaylistId,
        /// Number of songs the server reported.
        songs: usize,
    },
    /// A session was closed.
    SessionClosed {
        /// The session.
        session_id: SessionId,
        /// True if a submission was still in flight.
        detached: bool,
    },
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// The committed session.
    pub session_id: SessionId,
    /// Playlist that received the songs.
    pub playlist_id: PlaylistId,
    /// Songs that were submitted.
    pub added: Vec<SongId>,
    /// Playlist contents read back from the server. `None` if the re-read
    /// failed or the session was detached; the caller must re-fetch.
    pub refreshed: Option<Vec<Song>>,
}

struct CuratorState {
    session: Option<CurationSession>,
    next_session_id: SessionId,
    /// Session whose batch-add is in flight, attached or not.
    in_flight: Option<SessionId>,
}

/// Catalog-diff curator for the signed-in user's playlists.
pub struct Curator<C: ?Sized> {
    catalog: Arc<C>,
    identity: Identity,
    state: Arc<RwLock<CuratorState>>,
    event_tx: mpsc::UnboundedSender<CuratorEvent>,
    event_rx: Arc<RwLock<mpsc::UnboundedReceiver<CuratorEvent>>>,
}

impl<C> Curator<C>
where
    C: CatalogService + ?Sized + 'static,
{
    /// Create a curator acting on behalf of `identity`.
    pub fn new(catalog: Arc<C>, identity: Identity) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            catalog,
            identity,
            state: Arc::new(RwLock::new(CuratorState {
                session: None,
                next_session_id: 0,
                in_flight: None,
            })),
            event_tx,
            event_rx: Arc::new(RwLock::new(event_rx)),
        }
    }

    /// The identity this curator acts for.
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Open a session for `playlist_id`, replacing any idle session.
    ///
    /// Reads the catalog and the playlist concurrently. If either read
    /// fails, no session is created.
    pub async fn open(&self, playlist_id: PlaylistId) -> Result<CurationSession> {
        if self.state.read().await.in_flight.is_some() {
            warn!(playlist = %playlist_id, "Cannot open curator while a submission is in flight");
            return Err(CuratorError::SessionBusy.into());
        }

        info!(playlist = %playlist_id, "Opening curation session");

        let (catalog, existing) = tokio::join!(
            self.catalog.list_catalog_songs(),
            self.catalog.list_playlist_songs(&self.identity, &playlist_id)
        );
        let catalog = catalog.map_err(|e| {
            warn!(error = %e, "Failed to load catalog");
            CuratorError::Load(e)
        })?;
        let existing = existing.map_err(|e| {
            warn!(playlist = %playlist_id, error = %e, "Failed to load playlist songs");
            CuratorError::Load(e)
        })?;

        let mut state = self.state.write().await;
        // A commit may have started on the previous session during the reads.
        if state.in_flight.is_some() {
            return Err(CuratorError::SessionBusy.into());
        }

        let id = state.next_session_id;
        state.next_session_id += 1;
        let session = CurationSession::new(id, playlist_id, catalog, existing);
        let previous = state.session.replace(session.clone());
        drop(state);

        if let Some(previous) = previous {
            debug!(session_id = previous.id, "Replaced previous curation session");
            let _ = self.event_tx.send(CuratorEvent::SessionClosed {
                session_id: previous.id,
                detached: false,
            });
        }

        info!(
            session_id = id,
            playlist = %session.playlist_id,
            existing = session.existing_song_ids.len(),
            candidates = session.candidate_pool.len(),
            "Curation session opened"
        );
        let _ = self.event_tx.send(CuratorEvent::SessionOpened {
            session_id: id,
            playlist_id: session.playlist_id.clone(),
            candidates: session.candidate_pool.len(),
        });

        Ok(session)
    }

    /// Flip `song_id` in or out of the selection. Returns true if it is now selected.
    pub async fn toggle(&self, song_id: &SongId) -> Result<bool> {
        let mut state = self.state.write().await;
        let session = state.session.as_mut().ok_or(CuratorError::NoSession)?;
        session.ensure_editable()?;

        let selected = session.toggle(song_id).inspect_err(|_| {
            debug!(song_id = %song_id, "Rejected toggle of non-candidate song");
        })?;
        let event = CuratorEvent::SelectionChanged {
            session_id: session.id,
            selected: session.selection.len(),
        };
        drop(state);

        let _ = self.event_tx.send(event);
        Ok(selected)
    }

    /// Select every candidate. Returns the selection size.
    pub async fn select_all(&self) -> Result<usize> {
        self.edit_selection(|session| {
            session.selection = session.candidate_ids.iter().cloned().collect();
        })
        .await
    }

    /// Clear the selection.
    pub async fn clear_selection(&self) -> Result<usize> {
        self.edit_selection(|session| session.selection.clear()).await
    }

    async fn edit_selection<F>(&self, edit: F) -> Result<usize>
    where
        F: FnOnce(&mut CurationSession),
    {
        let mut state = self.state.write().await;
        let session = state.session.as_mut().ok_or(CuratorError::NoSession)?;
        session.ensure_editable()?;

        edit(session);
        let selected = session.selection.len();
        let session_id = session.id;
        drop(state);

        let _ = self.event_tx.send(CuratorEvent::SelectionChanged {
            session_id,
            selected,
        });
        Ok(selected)
    }

    /// Submit the selection as one batch-add.
    ///
    /// The request runs on its own task and completes even if this future is
    /// dropped. On success the playlist is read again and returned in the
    /// receipt; on failure the selection is kept and the session moves to
    /// [`SubmissionState::Failed`].
    pub async fn commit(&self) -> Result<CommitReceipt> {
        let (session_id, playlist_id, song_ids) = {
            let mut state = self.state.write().await;
            let session = state.session.as_mut().ok_or(CuratorError::NoSession)?;
            session.ensure_editable()?;
            if session.selection.is_empty() {
                return Err(CuratorError::NoSelection.into());
            }

            session.submission = SubmissionState::Submitting;
            let batch = (
                session.id,
                session.playlist_id.clone(),
                session.selection.iter().cloned().collect::<Vec<_>>(),
            );
            state.in_flight = Some(batch.0);
            batch
        };

        info!(
            session_id,
            playlist = %playlist_id,
            count = song_ids.len(),
            "Submitting songs to playlist"
        );
        let _ = self.event_tx.send(CuratorEvent::SubmissionStarted {
            session_id,
            count: song_ids.len(),
        });

        let handle = self.spawn_submission(session_id, playlist_id.clone(), song_ids.clone());
        let (result, attached) = match handle.await {
            Ok(settled) => settled,
            Err(e) => {
                let message = format!("Submission task failed: {e}");
                let attached = settle(
                    &self.state,
                    &self.event_tx,
                    session_id,
                    &playlist_id,
                    &song_ids,
                    Err(message.clone()),
                )
                .await;
                (Err(message), attached)
            }
        };

        if let Err(message) = result {
            return Err(CuratorError::Submit(message).into());
        }

        let refreshed = if attached {
            self.reload(&playlist_id).await
        } else {
            None
        };

        Ok(CommitReceipt {
            session_id,
            playlist_id,
            added: song_ids,
            refreshed,
        })
    }

    /// Run the batch-add on its own task, supervised by a second task that
    /// settles the session however the request ends, panics included.
    fn spawn_submission(
        &self,
        session_id: SessionId,
        playlist_id: PlaylistId,
        song_ids: Vec<SongId>,
    ) -> tokio::task::JoinHandle<(std::result::Result<(), String>, bool)> {
        let catalog = Arc::clone(&self.catalog);
        let identity = self.identity.clone();
        let state = Arc::clone(&self.state);
        let event_tx = self.event_tx.clone();

        let request = {
            let playlist_id = playlist_id.clone();
            let song_ids = song_ids.clone();
            tokio::spawn(async move {
                catalog
                    .add_songs_to_playlist(&identity, &playlist_id, &song_ids)
                    .await
            })
        };

        tokio::spawn(async move {
            let result = match request.await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => {
                    error!(session_id, error = %e, "Submission task did not complete");
                    Err(format!("Submission task failed: {e}"))
                }
            };
            let attached = settle(
                &state,
                &event_tx,
                session_id,
                &playlist_id,
                &song_ids,
                result.clone(),
            )
            .await;
            (result, attached)
        })
    }

    /// Read the playlist back from the server after a commit.
    async fn reload(&self, playlist_id: &PlaylistId) -> Option<Vec<Song>> {
        match self
            .catalog
            .list_playlist_songs(&self.identity, playlist_id)
            .await
        {
            Ok(songs) => {
                debug!(playlist = %playlist_id, songs = songs.len(), "Playlist refreshed");
                let _ = self.event_tx.send(CuratorEvent::PlaylistRefreshed {
                    playlist_id: playlist_id.clone(),
                    songs: songs.len(),
                });
                Some(songs)
            }
            Err(e) => {
                warn!(playlist = %playlist_id, error = %e, "Failed to refresh playlist after commit");
                None
            }
        }
    }

    /// Close the current session. Returns true if there was one.
    ///
    /// A session with a submission in flight is detached rather than awaited.
    pub async fn cancel(&self) -> bool {
        let Some(session) = self.state.write().await.session.take() else {
            return false;
        };

        let detached = session.submission == SubmissionState::Submitting;
        if detached {
            info!(session_id = session.id, "Detached curation session with submission in flight");
        } else {
            debug!(session_id = session.id, "Curation session closed");
        }
        let _ = self.event_tx.send(CuratorEvent::SessionClosed {
            session_id: session.id,
            detached,
        });
        true
    }

    /// Copy of the current session, for rendering.
    pub async fn snapshot(&self) -> Option<CurationSession> {
        self.state.read().await.session.clone()
    }

    /// True while a batch-add is in flight, including one from a detached session.
    pub async fn is_busy(&self) -> bool {
        self.state.read().await.in_flight.is_some()
    }

    /// Try to receive a curator event (non-blocking).
    pub async fn try_recv_event(&self) -> Option<CuratorEvent> {
        let mut rx = self.event_rx.write().await;
        rx.try_recv().ok()
    }

    /// Get a clone of the event sender for external use.
    #[must_use]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<CuratorEvent> {
        self.event_tx.clone()
    }
}

impl<C: ?Sized> std::fmt::Debug for Curator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Curator")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Record the outcome of a batch-add. Returns false if the session was
/// detached in the meantime, in which case the outcome is dropped.
async fn settle(
    state: &RwLock<CuratorState>,
    event_tx: &mpsc::UnboundedSender<CuratorEvent>,
    session_id: SessionId,
    playlist_id: &PlaylistId,
    song_ids: &[SongId],
    outcome: std::result::Result<(), String>,
) -> bool {
    let mut state = state.write().await;
    if state.in_flight == Some(session_id) {
        state.in_flight = None;
    }

    let Some(session) = state
        .session
        .as_mut()
        .filter(|session| session.id == session_id)
    else {
        info!(session_id, "Submission settled for a detached session; result ignored");
        return false;
    };

    let event = match outcome {
        Ok(()) => {
            session.submission = SubmissionState::Committed;
            info!(session_id, playlist = %playlist_id, count = song_ids.len(), "Songs added to playlist");
            CuratorEvent::Committed {
                session_id,
                playlist_id: playlist_id.clone(),
                added: song_ids.to_vec(),
            }
        }
        Err(error) => {
            session.submission = SubmissionState::Failed(error.clone());
            warn!(session_id, error = %error, "Failed to add songs to playlist");
            CuratorEvent::SubmissionFailed { session_id, error }
        }
    };
    drop(state);

    let _ = event_tx.send(event);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MockCatalogService;
    use crate::error::{CatalogError, Error};

    fn songs(ids: &[&str]) -> Vec<Song> {
        ids.iter()
            .map(|id| Song::new(*id, format!("Song {id}"), "Artist"))
            .collect()
    }

    fn ids(ids: &[&str]) -> Vec<SongId> {
        ids.iter().map(|id| SongId::new(*id)).collect()
    }

    /// Catalog {A,B,C,D}; playlist "Focus" holds {A,B}.
    fn focus_mock() -> MockCatalogService {
        let mut mock = MockCatalogService::new();
        mock.expect_list_catalog_songs()
            .returning(|| Ok(songs(&["A", "B", "C", "D"])));
        mock.expect_list_playlist_songs()
            .returning(|_, _| Ok(songs(&["A", "B"])));
        mock
    }

    fn curator(mock: MockCatalogService) -> Curator<MockCatalogService> {
        Curator::new(Arc::new(mock), Identity::new("alice"))
    }

    #[test]
    fn test_candidate_pool_excludes_existing() {
        let existing: HashSet<SongId> = ids(&["A", "B"]).into_iter().collect();
        let pool = compute_candidate_pool(songs(&["A", "C", "B", "D"]), &existing);
        let pool_ids: Vec<_> = pool.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(pool_ids, vec!["C", "D"]);
    }

    #[test]
    fn test_candidate_pool_dedupes_catalog() {
        let pool = compute_candidate_pool(songs(&["C", "C", "D"]), &HashSet::new());
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn test_open_computes_diff() {
        let curator = curator(focus_mock());

        let session = curator.open(PlaylistId::new("Focus")).await.expect("open");

        let pool: Vec<_> = session.candidate_pool().iter().map(|s| s.id.clone()).collect();
        assert_eq!(pool, ids(&["C", "D"]));
        assert!(
            pool.iter()
                .all(|id| !session.existing_song_ids().contains(id))
        );
        assert_eq!(session.submission(), &SubmissionState::Idle);
        assert!(matches!(
            curator.try_recv_event().await,
            Some(CuratorEvent::SessionOpened { candidates: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_open_load_error_leaves_no_session() {
        let mut mock = MockCatalogService::new();
        mock.expect_list_catalog_songs()
            .returning(|| Err(CatalogError::Unreachable("connection refused".to_string())));
        mock.expect_list_playlist_songs()
            .returning(|_, _| Ok(Vec::new()));
        let curator = curator(mock);

        let result = curator.open(PlaylistId::new("Focus")).await;

        assert!(matches!(
            result,
            Err(Error::Curator(CuratorError::Load(CatalogError::Unreachable(_))))
        ));
        assert!(curator.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_toggle_is_involution() {
        let curator = curator(focus_mock());
        curator.open(PlaylistId::new("Focus")).await.expect("open");
        let c = SongId::new("C");

        assert!(curator.toggle(&c).await.expect("select"));
        assert!(!curator.toggle(&c).await.expect("deselect"));

        let session = curator.snapshot().await.expect("session");
        assert!(session.selection().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_rejects_non_candidates() {
        let curator = curator(focus_mock());
        curator.open(PlaylistId::new("Focus")).await.expect("open");
        curator.toggle(&SongId::new("C")).await.expect("select");

        for rejected in ["Z", "A"] {
            let result = curator.toggle(&SongId::new(rejected)).await;
            assert!(matches!(
                result,
                Err(Error::Curator(CuratorError::InvalidCandidate(ref id))) if id.as_str() == rejected
            ));
        }

        let session = curator.snapshot().await.expect("session");
        assert_eq!(session.selection().iter().cloned().collect::<Vec<_>>(), ids(&["C"]));
    }

    #[tokio::test]
    async fn test_toggle_without_session() {
        let curator = curator(MockCatalogService::new());
        assert!(matches!(
            curator.toggle(&SongId::new("C")).await,
            Err(Error::Curator(CuratorError::NoSession))
        ));
    }

    #[tokio::test]
    async fn test_commit_empty_selection() {
        let mut mock = focus_mock();
        mock.expect_add_songs_to_playlist().never();
        let curator = curator(mock);
        curator.open(PlaylistId::new("Focus")).await.expect("open");

        let result = curator.commit().await;

        assert!(matches!(
            result,
            Err(Error::Curator(CuratorError::NoSelection))
        ));
        let session = curator.snapshot().await.expect("session");
        assert_eq!(session.submission(), &SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_commit_submits_selection_and_refreshes() {
        let mut mock = MockCatalogService::new();
        mock.expect_list_catalog_songs()
            .returning(|| Ok(songs(&["A", "B", "C", "D"])));
        let mut reads = 0;
        mock.expect_list_playlist_songs()
            .times(2)
            .returning(move |_, _| {
                reads += 1;
                if reads == 1 {
                    Ok(songs(&["A", "B"]))
                } else {
                    Ok(songs(&["A", "B", "C", "D"]))
                }
            });
        mock.expect_add_songs_to_playlist()
            .times(1)
            .withf(|identity, playlist, song_ids| {
                identity.display_name == "alice"
                    && playlist.as_str() == "Focus"
                    && song_ids == ids(&["C", "D"]).as_slice()
            })
            .returning(|_, _, _| Ok(()));
        let curator = curator(mock);

        curator.open(PlaylistId::new("Focus")).await.expect("open");
        curator.toggle(&SongId::new("C")).await.expect("toggle C");
        curator.toggle(&SongId::new("D")).await.expect("toggle D");
        let receipt = curator.commit().await.expect("commit");

        assert_eq!(receipt.added, ids(&["C", "D"]));
        let refreshed: Vec<_> = receipt
            .refreshed
            .expect("refreshed")
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(refreshed, ids(&["A", "B", "C", "D"]));

        let session = curator.snapshot().await.expect("session");
        assert_eq!(session.submission(), &SubmissionState::Committed);
        assert!(!curator.is_busy().await);
    }

    #[tokio::test]
    async fn test_committed_session_is_terminal() {
        let mut mock = focus_mock();
        mock.expect_add_songs_to_playlist()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let curator = curator(mock);
        curator.open(PlaylistId::new("Focus")).await.expect("open");
        curator.toggle(&SongId::new("C")).await.expect("toggle");
        curator.commit().await.expect("commit");

        assert!(matches!(
            curator.commit().await,
            Err(Error::Curator(CuratorError::SessionCommitted))
        ));
        assert!(matches!(
            curator.toggle(&SongId::new("D")).await,
            Err(Error::Curator(CuratorError::SessionCommitted))
        ));
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_selection_and_retries() {
        let mut mock = focus_mock();
        let mut attempts = 0;
        mock.expect_add_songs_to_playlist()
            .times(2)
            .returning(move |_, _, _| {
                attempts += 1;
                if attempts == 1 {
                    Err(CatalogError::Server {
                        status: 500,
                        message: "database locked".to_string(),
                    })
                } else {
                    Ok(())
                }
            });
        let curator = curator(mock);
        curator.open(PlaylistId::new("Focus")).await.expect("open");
        curator.toggle(&SongId::new("D")).await.expect("toggle");

        let first = curator.commit().await;
        assert!(matches!(
            first,
            Err(Error::Curator(CuratorError::Submit(ref msg))) if msg.contains("database locked")
        ));
        let session = curator.snapshot().await.expect("session");
        assert!(matches!(session.submission(), SubmissionState::Failed(_)));
        assert!(session.is_selected(&SongId::new("D")));

        let receipt = curator.commit().await.expect("retry");
        assert_eq!(receipt.added, ids(&["D"]));
    }

    #[tokio::test]
    async fn test_back_to_back_commits_make_one_request() {
        let mut mock = focus_mock();
        mock.expect_add_songs_to_playlist()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let curator = curator(mock);
        curator.open(PlaylistId::new("Focus")).await.expect("open");
        curator.toggle(&SongId::new("C")).await.expect("toggle");

        let (first, second) = tokio::join!(curator.commit(), curator.commit());

        assert!(first.is_ok());
        assert!(matches!(
            second,
            Err(Error::Curator(CuratorError::AlreadySubmitting))
        ));
    }

    #[tokio::test]
    async fn test_cancel_during_submission_detaches() {
        let mut mock = focus_mock();
        mock.expect_add_songs_to_playlist()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let curator = curator(mock);
        curator.open(PlaylistId::new("Focus")).await.expect("open");
        curator.toggle(&SongId::new("C")).await.expect("toggle");

        let (committed, reopened) = tokio::join!(curator.commit(), async {
            assert!(curator.cancel().await);
            curator.open(PlaylistId::new("Focus")).await
        });

        assert!(matches!(
            reopened,
            Err(Error::Curator(CuratorError::SessionBusy))
        ));
        let receipt = committed.expect("request still completes");
        assert!(receipt.refreshed.is_none());
        assert!(curator.snapshot().await.is_none());
        assert!(!curator.is_busy().await);

        curator
            .open(PlaylistId::new("Focus"))
            .await
            .expect("open after settle");
    }

    #[tokio::test]
    async fn test_cancel_without_session() {
        let curator = curator(MockCatalogService::new());
        assert!(!curator.cancel().await);
    }

    #[tokio::test]
    async fn test_select_all_and_clear() {
        let curator = curator(focus_mock());
        curator.open(PlaylistId::new("Focus")).await.expect("open");

        assert_eq!(curator.select_all().await.expect("select all"), 2);
        let session = curator.snapshot().await.expect("session");
        let selected: Vec<_> = session.selected_songs().iter().map(|s| s.id.clone()).collect();
        assert_eq!(selected, ids(&["C", "D"]));

        assert_eq!(curator.clear_selection().await.expect("clear"), 0);
    }

    #[test]
    fn test_submission_state_display() {
        assert_eq!(SubmissionState::Idle.to_string(), "Idle");
        assert_eq!(
            SubmissionState::Failed("boom".to_string()).to_string(),
            "Failed: boom"
        );
    }
}
