//! Two-click confirm gesture for cards.
//!
//! Destructive or navigating actions on a card need an "are you sure" step
//! without a modal: the first click arms the card, a second click inside the
//! confirm window fires the committed action, and an armed card disarms by
//! itself once the window passes.
//!
//! - [`ConfirmGesture`] is the state machine for one item, driven by
//!   explicit timestamps.
//! - [`GestureBoard`] tracks every armed item, runs expiry timers on tokio
//!   and emits [`GestureEvent`]s so the view can highlight armed cards.
//!
//! The window includes its deadline: a click landing exactly on it still
//! fires, and the expiry timer runs just after the deadline, so a click
//! always wins a tie against the timer.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tokio::time::Instant;
use tracing::debug;

use crate::config::AppConfig;
use crate::model::{ItemKey, Selectable};

/// Default confirm window.
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_millis(1000);

/// Delay between the deadline and the expiry timer.
const EXPIRY_SLACK: Duration = Duration::from_millis(1);

/// State of one item's gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// Not armed.
    Idle,
    /// Armed by a first click.
    Armed {
        /// When the first click happened.
        armed_at: Instant,
    },
}

/// What a click did to the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDecision {
    /// The item is now armed until `expires_at`.
    Arm {
        /// Last instant at which a second click still fires.
        expires_at: Instant,
    },
    /// The click confirmed an armed item; the committed action must run.
    Fire,
}

/// Result of a click once the committed action has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome<T> {
    /// First click: the item is armed, nothing ran.
    Armed {
        /// Last instant at which a second click still fires.
        expires_at: Instant,
    },
    /// Second click: the committed action ran and returned this value.
    Fired(T),
}

impl<T> ClickOutcome<T> {
    /// True if the committed action ran.
    pub const fn is_fired(&self) -> bool {
        matches!(self, Self::Fired(_))
    }
}

/// Arm/fire/expire state machine for a single item.
#[derive(Debug, Clone)]
pub struct ConfirmGesture<K> {
    item: K,
    window: Duration,
    state: GestureState,
}

impl<K> ConfirmGesture<K> {
    /// Create an idle gesture with the default window.
    pub const fn new(item: K) -> Self {
        Self::with_window(item, DEFAULT_CONFIRM_WINDOW)
    }

    /// Create an idle gesture with a custom window.
    pub const fn with_window(item: K, window: Duration) -> Self {
        Self {
            item,
            window,
            state: GestureState::Idle,
        }
    }

    /// The item this gesture guards.
    pub const fn item(&self) -> &K {
        &self.item
    }

    /// Current state.
    pub const fn state(&self) -> GestureState {
        self.state
    }

    /// True while armed, regardless of whether the window has passed.
    pub const fn is_armed(&self) -> bool {
        matches!(self.state, GestureState::Armed { .. })
    }

    /// Deadline of the current arm cycle.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            GestureState::Armed { armed_at } => Some(armed_at + self.window),
            GestureState::Idle => None,
        }
    }

    /// Apply a click at `now` without running anything.
    ///
    /// An armed gesture whose deadline has passed is treated as idle, so a
    /// late click starts a new cycle.
    pub fn register_click(&mut self, now: Instant) -> ClickDecision {
        if let Some(deadline) = self.deadline()
            && now <= deadline
        {
            self.state = GestureState::Idle;
            return ClickDecision::Fire;
        }

        self.state = GestureState::Armed { armed_at: now };
        ClickDecision::Arm {
            expires_at: now + self.window,
        }
    }

    /// Apply a click and run `on_commit` if it confirms.
    ///
    /// The action runs at most once per arm cycle. Its error is returned
    /// unchanged and the gesture stays idle.
    pub fn click<T, E, F>(&mut self, now: Instant, on_commit: F) -> Result<ClickOutcome<T>, E>
    where
        F: FnOnce(&K) -> Result<T, E>,
    {
        match self.register_click(now) {
            ClickDecision::Fire => on_commit(&self.item).map(ClickOutcome::Fired),
            ClickDecision::Arm { expires_at } => Ok(ClickOutcome::Armed { expires_at }),
        }
    }

    /// Disarm if the window has passed at `now`. Returns true if it expired.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now > deadline => {
                self.state = GestureState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Disarm unconditionally. Returns true if it was armed.
    pub const fn reset(&mut self) -> bool {
        let was_armed = self.is_armed();
        self.state = GestureState::Idle;
        was_armed
    }
}

/// Events emitted by the gesture board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureEvent<K> {
    /// An item was armed.
    Armed {
        /// The armed item.
        item: K,
        /// Last instant at which a second click fires.
        expires_at: Instant,
    },
    /// An item's committed action was triggered.
    Fired {
        /// The confirmed item.
        item: K,
    },
    /// An armed item timed out without a second click.
    Expired {
        /// The disarmed item.
        item: K,
    },
}

struct ArmedEntry<K> {
    gesture: ConfirmGesture<K>,
    /// Arm cycle this entry belongs to; timers of older cycles are ignored.
    cycle: u64,
}

struct BoardState<K> {
    armed: HashMap<K, ArmedEntry<K>>,
    next_cycle: u64,
}

/// Confirm gestures for many items, with tokio-driven expiry.
///
/// Items are independent: arming one never affects another.
pub struct GestureBoard<K = ItemKey> {
    window: Duration,
    state: Arc<RwLock<BoardState<K>>>,
    event_tx: mpsc::UnboundedSender<GestureEvent<K>>,
    event_rx: Arc<RwLock<mpsc::UnboundedReceiver<GestureEvent<K>>>>,
}

impl<K> GestureBoard<K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    /// Create a board with the default window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_CONFIRM_WINDOW)
    }

    /// Create a board with the window from the configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_window(config.confirm_window())
    }

    /// Create a board with a custom window.
    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            window,
            state: Arc::new(RwLock::new(BoardState {
                armed: HashMap::new(),
                next_cycle: 0,
            })),
            event_tx,
            event_rx: Arc::new(RwLock::new(event_rx)),
        }
    }

    /// The confirm window.
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Feed a click on `item` into its gesture.
    ///
    /// The first click arms the item and schedules its expiry. A click
    /// inside the window runs `on_commit` with the item, outside the board
    /// lock, so the action may use the board again.
    pub async fn arm_and_fire<T, E, F>(&self, item: K, on_commit: F) -> Result<ClickOutcome<T>, E>
    where
        F: FnOnce(&K) -> Result<T, E>,
    {
        let now = Instant::now();
        let mut state = self.state.write().await;

        let existing = state
            .armed
            .get_mut(&item)
            .map(|entry| entry.gesture.register_click(now));

        let decision = if let Some(decision) = existing {
            decision
        } else {
            let mut gesture = ConfirmGesture::with_window(item.clone(), self.window);
            let decision = gesture.register_click(now);
            state.armed.insert(
                item.clone(),
                ArmedEntry {
                    gesture,
                    cycle: 0,
                },
            );
            decision
        };

        match decision {
            ClickDecision::Fire => {
                state.armed.remove(&item);
                drop(state);

                debug!(item = ?item, "Confirm gesture fired");
                let _ = self.event_tx.send(GestureEvent::Fired { item: item.clone() });
                on_commit(&item).map(ClickOutcome::Fired)
            }
            ClickDecision::Arm { expires_at } => {
                let cycle = state.next_cycle;
                state.next_cycle += 1;
                if let Some(entry) = state.armed.get_mut(&item) {
                    entry.cycle = cycle;
                }
                drop(state);

                debug!(item = ?item, cycle, "Confirm gesture armed");
                let _ = self.event_tx.send(GestureEvent::Armed {
                    item: item.clone(),
                    expires_at,
                });
                self.schedule_expiry(item, cycle, expires_at);
                Ok(ClickOutcome::Armed { expires_at })
            }
        }
    }

    fn schedule_expiry(&self, item: K, cycle: u64, expires_at: Instant) {
        let state = Arc::clone(&self.state);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at + EXPIRY_SLACK).await;

            let mut state = state.write().await;
            let expired = match state.armed.get_mut(&item) {
                Some(entry) if entry.cycle == cycle => entry.gesture.expire(Instant::now()),
                _ => false,
            };
            if !expired {
                return;
            }
            state.armed.remove(&item);
            drop(state);

            debug!(item = ?item, cycle, "Confirm gesture expired");
            let _ = event_tx.send(GestureEvent::Expired { item });
        });
    }

    /// True if `item` is armed and its window has not passed.
    pub async fn is_armed(&self, item: &K) -> bool {
        let now = Instant::now();
        let state = self.state.read().await;
        state
            .armed
            .get(item)
            .and_then(|entry| entry.gesture.deadline())
            .is_some_and(|deadline| now <= deadline)
    }

    /// All items currently armed.
    pub async fn armed_items(&self) -> Vec<K> {
        let now = Instant::now();
        let state = self.state.read().await;
        state
            .armed
            .iter()
            .filter(|(_, entry)| entry.gesture.deadline().is_some_and(|d| now <= d))
            .map(|(item, _)| item.clone())
            .collect()
    }

    /// Disarm one item without firing. Returns true if it was armed.
    pub async fn reset(&self, item: &K) -> bool {
        self.state.write().await.armed.remove(item).is_some()
    }

    /// Disarm everything, e.g. when the view is torn down.
    pub async fn reset_all(&self) -> usize {
        let mut state = self.state.write().await;
        let count = state.armed.len();
        state.armed.clear();
        count
    }

    /// Try to receive a gesture event (non-blocking).
    pub async fn try_recv_event(&self) -> Option<GestureEvent<K>> {
        let mut rx = self.event_rx.write().await;
        rx.try_recv().ok()
    }

    /// Get a clone of the event sender for external use.
    #[must_use]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<GestureEvent<K>> {
        self.event_tx.clone()
    }
}

impl GestureBoard<ItemKey> {
    /// Click a card for any selectable catalog item.
    pub async fn click_card<S, T, E, F>(&self, card: &S, on_commit: F) -> Result<ClickOutcome<T>, E>
    where
        S: Selectable + ?Sized,
        F: FnOnce(&ItemKey) -> Result<T, E>,
    {
        self.arm_and_fire(card.item_key(), on_commit).await
    }
}

impl<K> Default for GestureBoard<K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> std::fmt::Debug for GestureBoard<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureBoard")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemKind, PlaylistSummary, Song};

    const WINDOW: Duration = Duration::from_millis(1000);

    fn ok_unit(_: &&str) -> Result<(), ()> {
        Ok(())
    }

    #[test]
    fn test_single_click_arms_without_action() {
        let start = Instant::now();
        let mut gesture = ConfirmGesture::new("song-1");
        let mut calls = 0;

        let outcome = gesture
            .click(start, |_| -> Result<(), ()> {
                calls += 1;
                Ok(())
            })
            .expect("click");

        assert_eq!(
            outcome,
            ClickOutcome::Armed {
                expires_at: start + WINDOW
            }
        );
        assert!(gesture.is_armed());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_second_click_fires_once() {
        let start = Instant::now();
        let mut gesture = ConfirmGesture::new("song-1");
        let mut fired = Vec::new();

        gesture.click(start, ok_unit).expect("arm");
        let outcome = gesture
            .click(start + Duration::from_millis(400), |item| -> Result<_, ()> {
                fired.push(item.to_string());
                Ok(42)
            })
            .expect("fire");

        assert_eq!(outcome, ClickOutcome::Fired(42));
        assert_eq!(fired, vec!["song-1".to_string()]);
        assert_eq!(gesture.state(), GestureState::Idle);
    }

    #[test]
    fn test_third_click_rearms() {
        let start = Instant::now();
        let mut gesture = ConfirmGesture::new("song-1");

        gesture.click(start, ok_unit).expect("arm");
        gesture
            .click(start + Duration::from_millis(100), ok_unit)
            .expect("fire");
        let third = gesture
            .click(start + Duration::from_millis(200), ok_unit)
            .expect("re-arm");

        assert!(!third.is_fired());
        assert!(gesture.is_armed());
    }

    #[test]
    fn test_click_on_deadline_fires() {
        let start = Instant::now();
        let mut gesture = ConfirmGesture::new("song-1");

        gesture.click(start, ok_unit).expect("arm");
        assert!(!gesture.expire(start + WINDOW));
        let outcome = gesture.click(start + WINDOW, ok_unit).expect("fire");
        assert!(outcome.is_fired());
    }

    #[test]
    fn test_late_click_starts_new_cycle() {
        let start = Instant::now();
        let mut gesture = ConfirmGesture::new("song-1");

        gesture.click(start, ok_unit).expect("arm");
        let late = start + WINDOW + Duration::from_millis(1);
        let outcome = gesture.click(late, ok_unit).expect("re-arm");

        assert_eq!(
            outcome,
            ClickOutcome::Armed {
                expires_at: late + WINDOW
            }
        );
    }

    #[test]
    fn test_expire_after_window() {
        let start = Instant::now();
        let mut gesture = ConfirmGesture::new("song-1");

        gesture.click(start, ok_unit).expect("arm");
        assert!(gesture.expire(start + WINDOW + Duration::from_millis(1)));
        assert_eq!(gesture.state(), GestureState::Idle);
        assert!(!gesture.expire(start + WINDOW * 2));
    }

    #[test]
    fn test_action_error_propagates_and_does_not_rearm() {
        let start = Instant::now();
        let mut gesture = ConfirmGesture::new("song-1");

        gesture.click(start, ok_unit).expect("arm");
        let result = gesture.click(start + Duration::from_millis(10), |_| -> Result<(), _> {
            Err("navigation failed")
        });

        assert_eq!(result, Err("navigation failed"));
        assert!(!gesture.is_armed());
    }

    #[test]
    fn test_reset() {
        let start = Instant::now();
        let mut gesture = ConfirmGesture::with_window("p", Duration::from_millis(250));
        gesture.click(start, ok_unit).expect("arm");
        assert_eq!(gesture.deadline(), Some(start + Duration::from_millis(250)));
        assert!(gesture.reset());
        assert!(!gesture.reset());
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_fires_within_window() {
        let board: GestureBoard<&'static str> = GestureBoard::new();

        let first = board
            .arm_and_fire("album-9", |_| -> Result<(), ()> { Ok(()) })
            .await
            .expect("arm");
        assert!(!first.is_fired());
        assert!(board.is_armed(&"album-9").await);

        tokio::time::sleep(Duration::from_millis(900)).await;
        let second = board
            .arm_and_fire("album-9", |item| -> Result<_, ()> { Ok(format!("/albums/{item}")) })
            .await
            .expect("fire");

        assert_eq!(second, ClickOutcome::Fired("/albums/album-9".to_string()));
        assert!(!board.is_armed(&"album-9").await);
        assert!(matches!(
            board.try_recv_event().await,
            Some(GestureEvent::Armed { item: "album-9", .. })
        ));
        assert_eq!(
            board.try_recv_event().await,
            Some(GestureEvent::Fired { item: "album-9" })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_expires_without_second_click() {
        let board: GestureBoard<&'static str> = GestureBoard::new();
        let mut calls = 0;

        board
            .arm_and_fire("artist-3", |_| -> Result<(), ()> {
                calls += 1;
                Ok(())
            })
            .await
            .expect("arm");

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(!board.is_armed(&"artist-3").await);
        assert!(board.armed_items().await.is_empty());
        assert!(matches!(
            board.try_recv_event().await,
            Some(GestureEvent::Armed { .. })
        ));
        assert_eq!(
            board.try_recv_event().await,
            Some(GestureEvent::Expired { item: "artist-3" })
        );
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_click_after_expiry_rearms() {
        let board: GestureBoard<&'static str> = GestureBoard::new();

        board.arm_and_fire("s", |_| -> Result<(), ()> { Ok(()) }).await.expect("arm");
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let outcome = board
            .arm_and_fire("s", |_| -> Result<(), ()> { Ok(()) })
            .await
            .expect("re-arm");
        assert!(!outcome.is_fired());
        assert!(board.is_armed(&"s").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_clear_new_cycle() {
        let board: GestureBoard<&'static str> = GestureBoard::new();
        let noop = |_: &&'static str| -> Result<(), ()> { Ok(()) };

        board.arm_and_fire("s", noop).await.expect("arm");
        tokio::time::sleep(Duration::from_millis(500)).await;
        board.arm_and_fire("s", noop).await.expect("fire");
        tokio::time::sleep(Duration::from_millis(100)).await;
        board.arm_and_fire("s", noop).await.expect("re-arm");

        // First cycle's timer runs at ~1001ms; the second cycle lives until 1600ms.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(board.is_armed(&"s").await);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!board.is_armed(&"s").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_items_are_independent() {
        let board: GestureBoard<&'static str> = GestureBoard::new();
        let noop = |_: &&'static str| -> Result<(), ()> { Ok(()) };

        board.arm_and_fire("a", noop).await.expect("arm a");
        let b = board.arm_and_fire("b", noop).await.expect("arm b");

        assert!(!b.is_fired());
        let mut armed = board.armed_items().await;
        armed.sort_unstable();
        assert_eq!(armed, vec!["a", "b"]);

        assert!(board.reset(&"a").await);
        assert!(!board.is_armed(&"a").await);
        assert!(board.is_armed(&"b").await);
        assert_eq!(board.reset_all().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_action_may_reenter_board() {
        let board: GestureBoard<&'static str> = GestureBoard::new();
        let noop = |_: &&'static str| -> Result<(), ()> { Ok(()) };

        board.arm_and_fire("a", noop).await.expect("arm");
        let outcome = board
            .arm_and_fire("a", |_| -> Result<_, ()> { Ok(board.window()) })
            .await
            .expect("fire");
        assert_eq!(outcome, ClickOutcome::Fired(WINDOW));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_card_keys_by_kind() {
        let board: GestureBoard = GestureBoard::with_window(Duration::from_millis(300));
        let song = Song::new("1", "Intro", "Band");
        let playlist = PlaylistSummary::new("1");

        board
            .click_card(&song, |_| -> Result<(), ()> { Ok(()) })
            .await
            .expect("arm song");
        let outcome = board
            .click_card(&playlist, |_| -> Result<(), ()> { Ok(()) })
            .await
            .expect("arm playlist");

        assert!(!outcome.is_fired());
        assert!(board.is_armed(&ItemKey::new(ItemKind::Song, "1")).await);
        assert!(board.is_armed(&ItemKey::new(ItemKind::Playlist, "1")).await);

        let fired = board
            .click_card(&song, |key| -> Result<_, ()> { Ok(key.clone()) })
            .await
            .expect("fire song");
        assert_eq!(fired, ClickOutcome::Fired(ItemKey::new(ItemKind::Song, "1")));
    }
}
