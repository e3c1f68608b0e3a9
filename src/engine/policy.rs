//! Section Policy Engine - Applies section configs on every section change
//!
//! One engine interprets the section table for all sections. Each section
//! keeps its own runtime: its phase (`Inactive` / `Active`) and the components
//! registered to it at mount time.
//!
//! # Order of application
//!
//! ```text
//! enter: hide_on_call → show_on_call → section components
//! exit:  show_on_exit → hide_on_exit → section components (delayed hide)
//! ```
//!
//! Hides skip any component that is being interacted with, so a widget in use
//! is never pulled away.
//!
//! Delayed hides of section components are scheduled on the registry, one per
//! component. A component shared by two sections is therefore never hidden by
//! the section it just left once the next section has shown it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use super::registry::{hide_unless_busy, ComponentRegistry};
use super::sections::{SectionConfig, SectionTable};
use crate::error::RegistrationError;
use crate::types::{Cleanup, ComponentId, SectionId};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionPhase {
    #[default]
    Inactive,
    Active,
}

/// Emitted after a section's exit or entry policy has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionEvent {
    Exit(SectionId),
    Enter(SectionId),
}

/// How a section drives one of its own components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionComponentOptions {
    /// Delay between leaving the section and hiding the component.
    pub hide_delay: Duration,
    /// Shown on entry if true, hidden on entry otherwise.
    pub initially_visible: bool,
}

impl Default for SectionComponentOptions {
    fn default() -> Self {
        Self {
            hide_delay: Duration::from_millis(300),
            initially_visible: true,
        }
    }
}

struct SectionRuntime {
    config: SectionConfig,
    phase: SectionPhase,
    components: BTreeMap<ComponentId, SectionComponentOptions>,
}

type SectionObserver = Rc<dyn Fn(SectionEvent)>;

#[derive(Default)]
struct Observers {
    handlers: Vec<(usize, SectionObserver)>,
    next_id: usize,
}

// =============================================================================
// POLICY ENGINE
// =============================================================================

struct PolicyInner {
    registry: ComponentRegistry,
    runtimes: RefCell<BTreeMap<SectionId, SectionRuntime>>,
    observers: Rc<RefCell<Observers>>,
}

/// Shared engine handle. Clones refer to the same engine.
#[derive(Clone)]
pub struct PolicyEngine {
    inner: Rc<PolicyInner>,
}

impl PolicyEngine {
    pub fn new(registry: ComponentRegistry, table: &SectionTable) -> Self {
        let runtimes = SectionId::ALL
            .into_iter()
            .map(|section| {
                let runtime = SectionRuntime {
                    config: table.get(section),
                    phase: SectionPhase::Inactive,
                    components: BTreeMap::new(),
                };
                (section, runtime)
            })
            .collect();

        Self {
            inner: Rc::new(PolicyInner {
                registry,
                runtimes: RefCell::new(runtimes),
                observers: Rc::new(RefCell::new(Observers::default())),
            }),
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.inner.registry
    }

    pub fn config(&self, section: SectionId) -> SectionConfig {
        self.inner
            .runtimes
            .borrow()
            .get(&section)
            .map(|r| r.config.clone())
            .unwrap_or_default()
    }

    pub fn phase(&self, section: SectionId) -> SectionPhase {
        self.inner
            .runtimes
            .borrow()
            .get(&section)
            .map(|r| r.phase)
            .unwrap_or_default()
    }

    pub fn active_sections(&self) -> Vec<SectionId> {
        self.inner
            .runtimes
            .borrow()
            .iter()
            .filter(|(_, r)| r.phase == SectionPhase::Active)
            .map(|(s, _)| *s)
            .collect()
    }

    // =========================================================================
    // Enter / Exit
    // =========================================================================

    /// Apply `section`'s entry policy and mark it active.
    ///
    /// Applying twice in a row leaves the same visibility as applying once.
    pub fn apply_enter(&self, section: SectionId) {
        let (config, components) = {
            let mut runtimes = self.inner.runtimes.borrow_mut();
            let Some(runtime) = runtimes.get_mut(&section) else {
                return;
            };
            runtime.phase = SectionPhase::Active;
            let components: Vec<(ComponentId, bool)> = runtime
                .components
                .iter()
                .map(|(id, options)| (*id, options.initially_visible))
                .collect();
            (runtime.config.clone(), components)
        };

        for &id in &config.hide_on_call {
            self.hide_unless_busy(section, id);
        }
        for &id in &config.show_on_call {
            self.inner.registry.show_component(id);
        }
        for (id, visible) in components {
            self.inner.registry.cancel_scheduled_hide(id);
            if visible {
                self.inner.registry.show_component(id);
            } else {
                self.hide_unless_busy(section, id);
            }
        }

        tracing::debug!(section = %section, "section entered");
        self.notify(SectionEvent::Enter(section));
    }

    /// Apply `section`'s exit policy and mark it inactive.
    pub fn apply_exit(&self, section: SectionId) {
        let (config, components) = {
            let mut runtimes = self.inner.runtimes.borrow_mut();
            let Some(runtime) = runtimes.get_mut(&section) else {
                return;
            };
            runtime.phase = SectionPhase::Inactive;
            let components: Vec<(ComponentId, Duration)> = runtime
                .components
                .iter()
                .map(|(id, options)| (*id, options.hide_delay))
                .collect();
            (runtime.config.clone(), components)
        };

        for &id in &config.show_on_exit {
            self.inner.registry.show_component(id);
        }
        for &id in &config.hide_on_exit {
            self.hide_unless_busy(section, id);
        }
        for (id, delay) in components {
            tracing::trace!(section = %section, component = %id, ?delay, "section component hide");
            self.inner.registry.schedule_hide(id, delay);
        }

        tracing::debug!(section = %section, "section exited");
        self.notify(SectionEvent::Exit(section));
    }

    fn hide_unless_busy(&self, section: SectionId, id: ComponentId) {
        tracing::trace!(section = %section, component = %id, "section hide");
        hide_unless_busy(&self.inner.registry, id);
    }

    // =========================================================================
    // Section Components
    // =========================================================================

    /// Register `id` as driven by `section`. `id` must be one of the section's
    /// manual components.
    pub fn register_section_component(
        &self,
        section: SectionId,
        id: ComponentId,
        options: SectionComponentOptions,
    ) -> Result<(), RegistrationError> {
        let active = {
            let mut runtimes = self.inner.runtimes.borrow_mut();
            let Some(runtime) = runtimes.get_mut(&section) else {
                return Err(RegistrationError::NotManual {
                    section,
                    component: id,
                });
            };
            if !runtime.config.is_manual(id) {
                tracing::warn!(
                    section = %section,
                    component = %id,
                    "component is not a manual component of this section"
                );
                return Err(RegistrationError::NotManual {
                    section,
                    component: id,
                });
            }
            runtime.components.insert(id, options);
            runtime.phase == SectionPhase::Active
        };

        if active {
            if options.initially_visible {
                self.inner.registry.show_component(id);
            } else {
                self.hide_unless_busy(section, id);
            }
        }
        Ok(())
    }

    /// Stop driving `id` from `section`. Cancels its pending hide.
    pub fn unregister_section_component(&self, section: SectionId, id: ComponentId) -> bool {
        let removed = self
            .inner
            .runtimes
            .borrow_mut()
            .get_mut(&section)
            .and_then(|r| r.components.remove(&id));
        if removed.is_some() {
            self.inner.registry.cancel_scheduled_hide(id);
        }
        removed.is_some()
    }

    pub fn section_components(&self, section: SectionId) -> Vec<ComponentId> {
        self.inner
            .runtimes
            .borrow()
            .get(&section)
            .map(|r| r.components.keys().copied().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Observe every applied exit/entry, in application order.
    pub fn on_section_change(&self, observer: impl Fn(SectionEvent) + 'static) -> Cleanup {
        let id = {
            let mut obs = self.inner.observers.borrow_mut();
            let id = obs.next_id;
            obs.next_id += 1;
            obs.handlers.push((id, Rc::new(observer)));
            id
        };

        let observers = self.inner.observers.clone();
        Box::new(move || {
            observers.borrow_mut().handlers.retain(|(oid, _)| *oid != id);
        })
    }

    fn notify(&self, event: SectionEvent) {
        let handlers: Vec<SectionObserver> = self
            .inner
            .observers
            .borrow()
            .handlers
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Breakpoints;
    use crate::state::{Viewport, VisibilityOptions};
    use tokio::task::LocalSet;
    use tokio::time::sleep;
    use ComponentId::*;

    fn setup() -> PolicyEngine {
        let registry =
            ComponentRegistry::new(Viewport::new(Breakpoints::default()), Duration::from_millis(300));
        for id in ComponentId::ALL {
            registry.register_component(id, VisibilityOptions::manual(false));
        }
        PolicyEngine::new(registry, &SectionTable::default())
    }

    fn displayed(engine: &PolicyEngine) -> BTreeMap<ComponentId, bool> {
        ComponentId::ALL
            .into_iter()
            .map(|id| (id, engine.registry().displayed(id)))
            .collect()
    }

    #[test]
    fn test_enter_applies_hide_then_show() {
        let engine = setup();
        engine.registry().show_component(Navigation);

        engine.apply_enter(SectionId::Hero);
        assert!(!engine.registry().displayed(Navigation));
        assert!(engine.registry().displayed(LanguageSwitch));
        assert!(engine.registry().displayed(ScrollIndicator));
        assert_eq!(engine.phase(SectionId::Hero), SectionPhase::Active);
    }

    #[test]
    fn test_exit_applies_show_then_hide() {
        let engine = setup();
        engine.apply_enter(SectionId::Hero);
        engine.apply_exit(SectionId::Hero);

        assert!(engine.registry().displayed(Navigation));
        assert!(!engine.registry().displayed(ScrollIndicator));
        assert_eq!(engine.phase(SectionId::Hero), SectionPhase::Inactive);
    }

    #[test]
    fn test_enter_is_idempotent() {
        for section in SectionId::ALL {
            let engine = setup();
            engine.apply_enter(section);
            let once = displayed(&engine);
            engine.apply_enter(section);
            assert_eq!(displayed(&engine), once, "{section}");
        }
    }

    #[test]
    fn test_busy_component_not_hidden() {
        let engine = setup();
        engine.registry().show_component(ChatButton);
        engine.registry().set_interacting(ChatButton, true);

        engine.apply_enter(SectionId::Booking);
        assert!(engine.registry().displayed(ChatButton));

        engine.registry().set_interacting(ChatButton, false);
        engine.apply_enter(SectionId::Booking);
        assert!(!engine.registry().displayed(ChatButton));
    }

    #[test]
    fn test_observers_see_order() {
        let engine = setup();
        let events = Rc::new(RefCell::new(Vec::new()));
        let e = events.clone();
        let stop = engine.on_section_change(move |event| e.borrow_mut().push(event));

        engine.apply_exit(SectionId::Hero);
        engine.apply_enter(SectionId::Menu);
        assert_eq!(
            *events.borrow(),
            vec![
                SectionEvent::Exit(SectionId::Hero),
                SectionEvent::Enter(SectionId::Menu)
            ]
        );

        stop();
        engine.apply_enter(SectionId::Chef);
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_section_component_must_be_manual() {
        let engine = setup();
        let result = engine.register_section_component(
            SectionId::Menu,
            Highlight,
            SectionComponentOptions::default(),
        );
        assert_eq!(
            result,
            Err(RegistrationError::NotManual {
                section: SectionId::Menu,
                component: Highlight
            })
        );
        assert!(engine.section_components(SectionId::Menu).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_section_component_lifecycle() {
        LocalSet::new()
            .run_until(async {
                let engine = setup();
                let options = SectionComponentOptions {
                    hide_delay: Duration::from_millis(200),
                    initially_visible: true,
                };
                engine
                    .register_section_component(SectionId::Highlights, Highlight, options)
                    .unwrap();
                assert!(!engine.registry().displayed(Highlight), "section inactive");

                engine.apply_enter(SectionId::Highlights);
                assert!(engine.registry().displayed(Highlight));

                engine.apply_exit(SectionId::Highlights);
                assert!(engine.registry().displayed(Highlight), "hide is delayed");

                sleep(Duration::from_millis(250)).await;
                assert!(!engine.registry().displayed(Highlight));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentry_cancels_delayed_hide() {
        LocalSet::new()
            .run_until(async {
                let engine = setup();
                engine
                    .register_section_component(
                        SectionId::Gallery,
                        Highlight,
                        SectionComponentOptions::default(),
                    )
                    .unwrap();

                engine.apply_enter(SectionId::Gallery);
                engine.apply_exit(SectionId::Gallery);
                engine.apply_enter(SectionId::Gallery);

                sleep(Duration::from_millis(1000)).await;
                assert!(engine.registry().displayed(Highlight));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_section_component_cancels_hide() {
        LocalSet::new()
            .run_until(async {
                let engine = setup();
                engine
                    .register_section_component(
                        SectionId::Gallery,
                        Highlight,
                        SectionComponentOptions::default(),
                    )
                    .unwrap();
                engine.apply_enter(SectionId::Gallery);
                engine.apply_exit(SectionId::Gallery);

                assert!(engine.unregister_section_component(SectionId::Gallery, Highlight));
                sleep(Duration::from_millis(1000)).await;
                assert!(engine.registry().displayed(Highlight));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_component_survives_previous_section_hide() {
        LocalSet::new()
            .run_until(async {
                let engine = setup();
                for section in [SectionId::Highlights, SectionId::Gallery] {
                    engine
                        .register_section_component(
                            section,
                            Highlight,
                            SectionComponentOptions::default(),
                        )
                        .unwrap();
                }

                engine.apply_enter(SectionId::Gallery);
                engine.apply_exit(SectionId::Gallery);
                engine.apply_enter(SectionId::Highlights);
                assert!(engine.registry().displayed(Highlight));

                sleep(Duration::from_millis(1000)).await;
                assert!(engine.registry().displayed(Highlight));
            })
            .await;
    }
}
