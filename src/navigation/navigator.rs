//! Section Navigator - One transition at a time through the section sequence
//!
//! # Transition
//!
//! ```text
//! Idle ──jump──▶ Transitioning
//!                  │ await preload      (failure: back to Idle, nothing committed)
//!                  │ fade-out, sleep fade_out
//!                  │ commit current/previous
//!                  │ apply_exit(old) → apply_enter(new)
//!                  │ fade-in, sleep fade_in
//!                  ▼
//!                Idle ──▶ on_navigate(old, new)
//! ```
//!
//! A jump requested while another is in flight is rejected, never queued.
//! A jump whose future is dropped part way (a timeout, a `select!`, an aborted
//! task) still returns the navigator to `Idle`.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::config::StageConfig;
use crate::engine::PolicyEngine;
use crate::error::NavigationError;
use crate::state::Viewport;
use crate::types::{Direction, SectionId};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavState {
    #[default]
    Idle,
    Transitioning,
}

/// Fixed delays of a transition plus the input cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationTimings {
    pub scroll_delay: Duration,
    pub fade_out: Duration,
    pub fade_in: Duration,
}

impl Default for NavigationTimings {
    fn default() -> Self {
        Self::from(&StageConfig::default())
    }
}

impl From<&StageConfig> for NavigationTimings {
    fn from(config: &StageConfig) -> Self {
        Self {
            scroll_delay: config.scroll_delay(),
            fade_out: config.fade_out(),
            fade_in: config.fade_in(),
        }
    }
}

pub type PreloadFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;
pub type PreloadHook = Rc<dyn Fn(SectionId) -> PreloadFuture>;
pub type FadeHook = Rc<dyn Fn(SectionId)>;
pub type NavigateHook = Rc<dyn Fn(SectionId, SectionId)>;

/// Caller hooks around a transition. Every hook is optional.
#[derive(Clone, Default)]
pub struct NavigationCallbacks {
    /// Awaited before anything visible happens.
    pub preload: Option<PreloadHook>,
    /// Receives the section being left.
    pub on_fade_out: Option<FadeHook>,
    /// Receives the section just committed.
    pub on_fade_in: Option<FadeHook>,
    /// Receives `(from, to)` once the transition is complete.
    pub on_navigate: Option<NavigateHook>,
}

impl NavigationCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preload<F, Fut>(mut self, preload: F) -> Self
    where
        F: Fn(SectionId) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.preload = Some(Rc::new(move |section| -> PreloadFuture {
            Box::pin(preload(section))
        }));
        self
    }

    pub fn with_fade_out(mut self, hook: impl Fn(SectionId) + 'static) -> Self {
        self.on_fade_out = Some(Rc::new(hook));
        self
    }

    pub fn with_fade_in(mut self, hook: impl Fn(SectionId) + 'static) -> Self {
        self.on_fade_in = Some(Rc::new(hook));
        self
    }

    pub fn with_on_navigate(mut self, hook: impl Fn(SectionId, SectionId) + 'static) -> Self {
        self.on_navigate = Some(Rc::new(hook));
        self
    }
}

// =============================================================================
// NAVIGATOR
// =============================================================================

struct NavigatorInner {
    viewport: Viewport,
    policy: PolicyEngine,
    timings: NavigationTimings,
    state: Cell<NavState>,
    last_transition: Cell<Option<Instant>>,
    callbacks: RefCell<NavigationCallbacks>,
}

/// Ends a transition however the jump future finishes.
///
/// Before the commit the half-started navigation is aborted; after it, the
/// committed section is kept and the navigation is finished.
struct TransitionGuard<'a> {
    inner: &'a NavigatorInner,
    to: SectionId,
    committed: bool,
    completed: bool,
}

impl<'a> TransitionGuard<'a> {
    fn begin(inner: &'a NavigatorInner, to: SectionId) -> Self {
        inner.state.set(NavState::Transitioning);
        inner.viewport.begin_navigation(to);
        Self {
            inner,
            to,
            committed: false,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            self.inner.viewport.finish_navigation();
        } else {
            self.inner.viewport.abort_navigation();
        }
        self.inner.state.set(NavState::Idle);
        if !self.completed {
            tracing::debug!(to = %self.to, committed = self.committed, "transition ended early");
        }
    }
}

/// Shared navigator handle. Clones refer to the same navigator.
#[derive(Clone)]
pub struct Navigator {
    inner: Rc<NavigatorInner>,
}

impl Navigator {
    pub fn new(viewport: Viewport, policy: PolicyEngine, timings: NavigationTimings) -> Self {
        Self {
            inner: Rc::new(NavigatorInner {
                viewport,
                policy,
                timings,
                state: Cell::new(NavState::Idle),
                last_transition: Cell::new(None),
                callbacks: RefCell::new(NavigationCallbacks::default()),
            }),
        }
    }

    pub fn set_callbacks(&self, callbacks: NavigationCallbacks) {
        *self.inner.callbacks.borrow_mut() = callbacks;
    }

    pub fn timings(&self) -> NavigationTimings {
        self.inner.timings
    }

    pub fn state(&self) -> NavState {
        self.inner.state.get()
    }

    pub fn is_transitioning(&self) -> bool {
        self.inner.state.get() == NavState::Transitioning
    }

    pub fn current_section(&self) -> SectionId {
        self.inner.viewport.current_section()
    }

    pub fn current_index(&self) -> usize {
        self.current_section().index()
    }

    /// When the last transition committed, if any has.
    pub fn last_transition(&self) -> Option<Instant> {
        self.inner.last_transition.get()
    }

    // =========================================================================
    // Cooldown
    // =========================================================================

    /// Why input-driven navigation would be refused at `now`, if it would be.
    pub fn scroll_gate(&self, now: Instant) -> Result<(), NavigationError> {
        if self.inner.viewport.is_scroll_disabled() {
            return Err(NavigationError::ScrollDisabled);
        }
        if self.is_transitioning() {
            return Err(NavigationError::InFlight);
        }
        if let Some(last) = self.inner.last_transition.get() {
            if now.saturating_duration_since(last) < self.inner.timings.scroll_delay {
                return Err(NavigationError::CooldownActive);
            }
        }
        Ok(())
    }

    /// True iff scrolling is enabled, nothing is in flight and the cooldown
    /// since the last committed transition has elapsed.
    pub fn can_scroll(&self, now: Instant) -> bool {
        self.scroll_gate(now).is_ok()
    }

    // =========================================================================
    // Jumps
    // =========================================================================

    /// Transition to the section at `index`. Resolves to the committed section.
    pub async fn jump_to_index(&self, index: usize) -> Result<SectionId, NavigationError> {
        let Some(to) = SectionId::from_index(index) else {
            tracing::warn!(index, "section index out of range");
            return Err(NavigationError::OutOfRange {
                index,
                len: SectionId::COUNT,
            });
        };
        if self.is_transitioning() {
            tracing::debug!(to = %to, "jump rejected; transition in flight");
            return Err(NavigationError::InFlight);
        }
        let from = self.current_section();
        if from == to {
            tracing::debug!(section = %to, "jump to the active section ignored");
            return Err(NavigationError::AlreadyActive(to));
        }

        let mut guard = TransitionGuard::begin(&self.inner, to);
        let callbacks = self.inner.callbacks.borrow().clone();

        if let Some(preload) = &callbacks.preload {
            if let Err(err) = preload(to).await {
                tracing::warn!(to = %to, error = %err, "preload failed; navigation aborted");
                guard.complete();
                return Err(NavigationError::Preload {
                    section: to,
                    message: format!("{err:#}"),
                });
            }
        }

        if let Some(fade_out) = &callbacks.on_fade_out {
            fade_out(from);
        }
        sleep(self.inner.timings.fade_out).await;

        self.inner.viewport.commit_section(to);
        guard.committed = true;
        self.inner.last_transition.set(Some(Instant::now()));
        tracing::info!(from = %from, to = %to, "section committed");

        self.inner.policy.apply_exit(from);
        self.inner.policy.apply_enter(to);

        if let Some(fade_in) = &callbacks.on_fade_in {
            fade_in(to);
        }
        sleep(self.inner.timings.fade_in).await;
        guard.complete();

        if let Some(on_navigate) = &callbacks.on_navigate {
            on_navigate(from, to);
        }
        Ok(to)
    }

    pub async fn jump_to_section(&self, section: SectionId) -> Result<SectionId, NavigationError> {
        self.jump_to_index(section.index()).await
    }

    /// Jump by section id string, e.g. `"booking"`.
    pub async fn jump_to_section_by_id(&self, id: &str) -> Result<SectionId, NavigationError> {
        let section: SectionId = id.parse().map_err(|err| {
            tracing::warn!(id, "unknown section id");
            NavigationError::from(err)
        })?;
        self.jump_to_section(section).await
    }

    /// Move one section in `direction`. Fails at either end of the sequence.
    pub async fn step(&self, direction: Direction) -> Result<SectionId, NavigationError> {
        let current = self.current_section();
        let Some(index) = current.index().checked_add_signed(direction.step()) else {
            tracing::debug!(section = %current, "already at the first section");
            return Err(NavigationError::Boundary(current));
        };
        if index >= SectionId::COUNT {
            tracing::debug!(section = %current, "already at the last section");
            return Err(NavigationError::Boundary(current));
        }
        self.jump_to_index(index).await
    }

    pub async fn next_section(&self) -> Result<SectionId, NavigationError> {
        self.step(Direction::Down).await
    }

    pub async fn previous_section(&self) -> Result<SectionId, NavigationError> {
        self.step(Direction::Up).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Breakpoints;
    use crate::engine::{ComponentRegistry, SectionTable};
    use tokio::task::LocalSet;

    fn setup() -> Navigator {
        let viewport = Viewport::new(Breakpoints::default());
        let registry = ComponentRegistry::new(viewport.clone(), Duration::from_millis(300));
        let policy = PolicyEngine::new(registry, &SectionTable::default());
        Navigator::new(viewport, policy, NavigationTimings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_commits_and_returns_to_idle() {
        let nav = setup();
        assert_eq!(nav.jump_to_index(3).await, Ok(SectionId::Chef));
        assert_eq!(nav.current_section(), SectionId::Chef);
        assert_eq!(nav.state(), NavState::Idle);
        assert!(nav.last_transition().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_rejected() {
        let nav = setup();
        assert_eq!(
            nav.jump_to_index(7).await,
            Err(NavigationError::OutOfRange { index: 7, len: 7 })
        );
        assert_eq!(nav.current_section(), SectionId::Hero);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_to_current_fails() {
        let nav = setup();
        assert_eq!(
            nav.jump_to_index(0).await,
            Err(NavigationError::AlreadyActive(SectionId::Hero))
        );
        assert!(!nav.inner.viewport.is_navigating());
        assert!(nav.last_transition().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_fails_at_first() {
        let nav = setup();
        assert_eq!(
            nav.previous_section().await,
            Err(NavigationError::Boundary(SectionId::Hero))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_id() {
        let nav = setup();
        let result = nav.jump_to_section_by_id("lobby").await;
        assert!(matches!(result, Err(NavigationError::UnknownSection(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_jump_rejected() {
        LocalSet::new()
            .run_until(async {
                let nav = setup();
                let first = {
                    let nav = nav.clone();
                    tokio::task::spawn_local(async move { nav.jump_to_index(2).await })
                };
                sleep(Duration::from_millis(10)).await;
                assert!(nav.is_transitioning());
                assert_eq!(nav.jump_to_index(4).await, Err(NavigationError::InFlight));

                assert_eq!(first.await.unwrap(), Ok(SectionId::Menu));
                assert_eq!(nav.current_section(), SectionId::Menu);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_jump_before_commit_returns_to_idle() {
        let nav = setup();
        let result = tokio::time::timeout(Duration::from_millis(100), nav.jump_to_index(2)).await;
        assert!(result.is_err());

        assert_eq!(nav.state(), NavState::Idle);
        assert_eq!(nav.current_section(), SectionId::Hero);
        let section = nav.inner.viewport.section();
        assert_eq!(section.target, None);
        assert!(!section.is_navigating);

        assert_eq!(nav.jump_to_index(2).await, Ok(SectionId::Menu));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_jump_after_commit_keeps_section() {
        let nav = setup();
        let result = tokio::time::timeout(Duration::from_millis(320), nav.jump_to_index(4)).await;
        assert!(result.is_err());

        assert_eq!(nav.state(), NavState::Idle);
        assert_eq!(nav.current_section(), SectionId::Gallery);
        assert!(!nav.inner.viewport.is_navigating());
        assert_eq!(nav.previous_section().await, Ok(SectionId::Chef));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_gate() {
        let nav = setup();
        assert!(nav.can_scroll(Instant::now()));

        nav.next_section().await.unwrap();
        assert_eq!(
            nav.scroll_gate(Instant::now()),
            Err(NavigationError::CooldownActive)
        );

        sleep(Duration::from_millis(1000)).await;
        assert!(nav.can_scroll(Instant::now()));

        nav.inner.viewport.set_scroll_disabled(true);
        assert_eq!(
            nav.scroll_gate(Instant::now()),
            Err(NavigationError::ScrollDisabled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_order() {
        let nav = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
        nav.set_callbacks(
            NavigationCallbacks::new()
                .with_preload(move |s| {
                    a.borrow_mut().push(format!("preload {s}"));
                    async { Ok(()) }
                })
                .with_fade_out(move |s| b.borrow_mut().push(format!("fade_out {s}")))
                .with_fade_in(move |s| c.borrow_mut().push(format!("fade_in {s}")))
                .with_on_navigate(move |f, t| d.borrow_mut().push(format!("navigate {f} {t}"))),
        );

        nav.jump_to_section(SectionId::Gallery).await.unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                "preload gallery",
                "fade_out hero",
                "fade_in gallery",
                "navigate hero gallery"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_failure_does_not_commit() {
        let nav = setup();
        let faded = Rc::new(Cell::new(false));
        let f = faded.clone();
        nav.set_callbacks(
            NavigationCallbacks::new()
                .with_preload(|_| async { Err(anyhow::anyhow!("assets unavailable")) })
                .with_fade_out(move |_| f.set(true)),
        );

        let result = nav.jump_to_index(5).await;
        assert!(matches!(
            result,
            Err(NavigationError::Preload { section: SectionId::Booking, .. })
        ));
        assert_eq!(nav.current_section(), SectionId::Hero);
        assert_eq!(nav.state(), NavState::Idle);
        assert!(!faded.get());
        assert_eq!(nav.inner.viewport.section().target, None);
    }
}
