//! Stage - The application context
//!
//! One `Stage` is built at startup and handed to everything that needs
//! visibility or navigation. It owns exactly one of each subsystem, all
//! sharing the same viewport and lock table:
//!
//! ```text
//! Stage
//! ├── Viewport           scroll / section / mouse / responsive state
//! ├── ComponentRegistry  slots, handles, locks, subscriptions
//! ├── PolicyEngine       section table + per-section runtimes
//! ├── Navigator          transitions and cooldown
//! ├── InputNormalizer    wheel / key / swipe → direction
//! └── ModalManager       snapshot + lock around overlays
//! ```
//!
//! # Example
//!
//! ```ignore
//! let stage = Stage::new(StageConfig::load("stage.toml")?)?;
//! stage.register_component(ComponentId::Navigation, VisibilityOptions::manual(false));
//! stage.start();
//!
//! match stage.handle_input(InputEvent::Wheel { delta_y: 120.0 }).await {
//!     InputOutcome::Navigated(section) => println!("now on {section}"),
//!     _ => {}
//! }
//! ```

use std::collections::BTreeMap;

use tokio::time::Instant;

use crate::config::StageConfig;
use crate::engine::{
    ComponentRegistry, ModalManager, PolicyEngine, SectionComponentOptions, SectionEvent,
};
use crate::error::{ConfigError, NavigationError, RegistrationError};
use crate::navigation::{
    InputEvent, InputNormalizer, NavigationCallbacks, NavigationTimings, Navigator,
};
use crate::state::{Viewport, Visibility, VisibilityOptions};
use crate::types::{Cleanup, ComponentId, Point, SectionId, Targets};

/// What happened to one input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// The event carries no direction.
    Ignored,
    /// A direction was recognised but the cooldown gate refused it.
    Gated(NavigationError),
    Navigated(SectionId),
    /// The gate passed but the jump itself failed (e.g. at a boundary).
    Rejected(NavigationError),
}

pub struct Stage {
    config: StageConfig,
    viewport: Viewport,
    registry: ComponentRegistry,
    policy: PolicyEngine,
    navigator: Navigator,
    input: InputNormalizer,
    modals: ModalManager,
}

impl Stage {
    /// Build every subsystem from a validated config.
    pub fn new(config: StageConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let viewport = Viewport::new(config.breakpoints);
        let registry = ComponentRegistry::new(viewport.clone(), config.default_hide_delay());
        let policy = PolicyEngine::new(registry.clone(), &config.sections);
        let navigator = Navigator::new(
            viewport.clone(),
            policy.clone(),
            NavigationTimings::from(&config),
        );
        let input = InputNormalizer::new(viewport.clone(), config.swipe_threshold_px);
        let modals = ModalManager::new(registry.clone());

        Ok(Self {
            config,
            viewport,
            registry,
            policy,
            navigator,
            input,
            modals,
        })
    }

    /// Apply the entry policy of the section shown on load.
    pub fn start(&self) {
        let section = self.viewport.current_section();
        tracing::info!(section = %section, "stage started");
        self.policy.apply_enter(section);
    }

    /// Unmount every component, cancelling all of their timers.
    pub fn shutdown(&self) {
        self.registry.destroy_all();
        tracing::info!("stage shut down");
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn modals(&self) -> &ModalManager {
        &self.modals
    }

    // =========================================================================
    // Components
    // =========================================================================

    pub fn register_component(&self, id: ComponentId, options: VisibilityOptions) -> Visibility {
        self.registry.register_component(id, options)
    }

    pub fn unregister_component(&self, id: ComponentId) -> bool {
        self.registry.unregister_component(id)
    }

    pub fn show_component(&self, targets: impl Into<Targets>) {
        self.registry.show_component(targets);
    }

    pub fn hide_component(&self, targets: impl Into<Targets>) {
        self.registry.hide_component(targets);
    }

    pub fn reset_component_visibility(&self, targets: impl Into<Targets>) {
        self.registry.reset_component_visibility(targets);
    }

    pub fn is_component_visible(&self, id: ComponentId) -> bool {
        self.registry.displayed(id)
    }

    pub fn set_interacting(&self, id: ComponentId, interacting: bool) {
        self.registry.set_interacting(id, interacting);
    }

    pub fn set_hovered(&self, id: ComponentId, hovered: bool) {
        self.registry.set_hovered(id, hovered);
    }

    pub fn register_section_component(
        &self,
        section: SectionId,
        id: ComponentId,
        options: SectionComponentOptions,
    ) -> Result<(), RegistrationError> {
        self.policy.register_section_component(section, id, options)
    }

    pub fn unregister_section_component(&self, section: SectionId, id: ComponentId) -> bool {
        self.policy.unregister_section_component(section, id)
    }

    // =========================================================================
    // Locks
    // =========================================================================

    pub fn lock_visibility(&self, targets: impl Into<Targets>, value: bool) {
        self.registry.lock_visibility(targets, value);
    }

    pub fn unlock_visibility(&self, targets: impl Into<Targets>, value: Option<bool>) -> usize {
        self.registry.unlock_visibility(targets, value)
    }

    pub fn is_visibility_locked(&self, targets: impl Into<Targets>) -> bool {
        self.registry.is_visibility_locked(targets)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub fn subscribe_to_component_visibility(
        &self,
        id: ComponentId,
        callback: impl Fn(bool) + 'static,
    ) -> Cleanup {
        self.registry.subscribe(id, callback)
    }

    pub fn subscribe_to_all_components_visibility(
        &self,
        callback: impl Fn(&BTreeMap<ComponentId, bool>) + 'static,
    ) -> Cleanup {
        self.registry.subscribe_all(callback)
    }

    pub fn on_section_change(&self, observer: impl Fn(SectionEvent) + 'static) -> Cleanup {
        self.policy.on_section_change(observer)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn set_navigation_callbacks(&self, callbacks: NavigationCallbacks) {
        self.navigator.set_callbacks(callbacks);
    }

    pub fn current_section(&self) -> SectionId {
        self.viewport.current_section()
    }

    pub async fn jump_to_section(&self, index: usize) -> Result<SectionId, NavigationError> {
        self.navigator.jump_to_index(index).await
    }

    pub async fn jump_to_section_by_id(&self, id: &str) -> Result<SectionId, NavigationError> {
        self.navigator.jump_to_section_by_id(id).await
    }

    pub async fn next_section(&self) -> Result<SectionId, NavigationError> {
        self.navigator.next_section().await
    }

    pub async fn previous_section(&self) -> Result<SectionId, NavigationError> {
        self.navigator.previous_section().await
    }

    pub fn can_scroll(&self) -> bool {
        self.navigator.can_scroll(Instant::now())
    }

    pub fn set_scroll_enabled(&self, enabled: bool) {
        self.viewport.set_scroll_disabled(!enabled);
    }

    pub fn is_scroll_enabled(&self) -> bool {
        !self.viewport.is_scroll_disabled()
    }

    /// Normalize one input event and, if the cooldown gate allows, navigate.
    pub async fn handle_input(&self, event: InputEvent) -> InputOutcome {
        let now = Instant::now();
        let Some(direction) = self.input.normalize(&event, now) else {
            return InputOutcome::Ignored;
        };
        if let Err(reason) = self.navigator.scroll_gate(now) {
            tracing::debug!(?direction, %reason, "input gated");
            return InputOutcome::Gated(reason);
        }
        match self.navigator.step(direction).await {
            Ok(section) => InputOutcome::Navigated(section),
            Err(err) => InputOutcome::Rejected(err),
        }
    }

    // =========================================================================
    // Pointer / Viewport
    // =========================================================================

    pub fn pointer_moved(&self, position: Point) {
        self.viewport.pointer_moved(position, Instant::now());
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.viewport.resize(width, height);
    }

    // =========================================================================
    // Modals
    // =========================================================================

    pub fn lock_modal(&self, modal_id: &str) {
        self.modals.lock_modal(modal_id);
    }

    pub fn restore_modal(&self, modal_id: &str) -> bool {
        self.modals.restore_modal(modal_id)
    }

    pub fn cleanup_modal(&self, modal_id: &str) {
        self.modals.cleanup_modal(modal_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SectionConfig;
    use ComponentId::*;

    fn setup() -> Stage {
        let stage = Stage::new(StageConfig::default()).unwrap();
        for id in ComponentId::ALL {
            stage.register_component(id, VisibilityOptions::manual(false));
        }
        stage
    }

    #[test]
    fn test_invalid_table_rejected() {
        let mut config = StageConfig::default();
        config.sections.set(
            SectionId::Menu,
            SectionConfig {
                hide_on_call: vec![ChatButton],
                show_on_call: vec![ChatButton],
                ..SectionConfig::default()
            },
        );
        assert!(matches!(
            Stage::new(config),
            Err(ConfigError::OverlappingLists { .. })
        ));
    }

    #[test]
    fn test_start_applies_first_section() {
        let stage = setup();
        stage.start();
        assert!(stage.is_component_visible(LanguageSwitch));
        assert!(stage.is_component_visible(ScrollIndicator));
        assert!(!stage.is_component_visible(Navigation));
    }

    #[test]
    fn test_scroll_enable_toggle() {
        let stage = setup();
        assert!(stage.is_scroll_enabled());
        stage.set_scroll_enabled(false);
        assert!(!stage.can_scroll());
        stage.set_scroll_enabled(true);
        assert!(stage.can_scroll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmapped_key_ignored() {
        let stage = setup();
        let outcome = stage
            .handle_input(InputEvent::Key(crate::navigation::KeyboardEvent::new("Tab")))
            .await;
        assert_eq!(outcome, InputOutcome::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wheel_up_at_first_section_rejected() {
        let stage = setup();
        let outcome = stage.handle_input(InputEvent::Wheel { delta_y: -50.0 }).await;
        assert_eq!(
            outcome,
            InputOutcome::Rejected(NavigationError::Boundary(SectionId::Hero))
        );
    }
}
