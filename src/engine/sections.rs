//! Section Table - Declarative per-section visibility config
//!
//! Each section declares which floating components it hides and shows when it
//! becomes active (`hide_on_call` / `show_on_call`), which ones it restores or
//! removes when it is left (`show_on_exit` / `hide_on_exit`), and which
//! components it drives itself (`manual_components`).
//!
//! One table replaces a module per section; the policy engine interprets it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ComponentId, SectionId};

use ComponentId::*;

// =============================================================================
// SECTION CONFIG
// =============================================================================

/// Immutable visibility policy for one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub hide_on_call: Vec<ComponentId>,
    pub show_on_call: Vec<ComponentId>,
    pub show_on_exit: Vec<ComponentId>,
    pub hide_on_exit: Vec<ComponentId>,
    pub manual_components: Vec<ComponentId>,
}

impl SectionConfig {
    /// Check the list invariants for `section`.
    ///
    /// `hide_on_call` and `show_on_call` must be disjoint, otherwise applying
    /// entry twice is order dependent. Manual components may not appear in any
    /// list, since the section drives them itself.
    pub fn validate(&self, section: SectionId) -> Result<(), ConfigError> {
        if let Some(&component) = self
            .hide_on_call
            .iter()
            .find(|id| self.show_on_call.contains(id))
        {
            return Err(ConfigError::OverlappingLists { section, component });
        }

        let listed = self
            .hide_on_call
            .iter()
            .chain(&self.show_on_call)
            .chain(&self.show_on_exit)
            .chain(&self.hide_on_exit);
        for id in listed {
            if self.manual_components.contains(id) {
                return Err(ConfigError::ManualOverlap {
                    section,
                    component: *id,
                });
            }
        }

        Ok(())
    }

    pub fn is_manual(&self, id: ComponentId) -> bool {
        self.manual_components.contains(&id)
    }
}

// =============================================================================
// SECTION TABLE
// =============================================================================

/// Config for every section, keyed by id.
///
/// Sections missing from a loaded table get an empty config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionTable {
    configs: BTreeMap<SectionId, SectionConfig>,
}

impl SectionTable {
    pub fn new(configs: BTreeMap<SectionId, SectionConfig>) -> Self {
        Self { configs }
    }

    /// Config for `section` (empty if none declared).
    pub fn get(&self, section: SectionId) -> SectionConfig {
        self.configs.get(&section).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, section: SectionId, config: SectionConfig) {
        self.configs.insert(section, config);
    }

    /// Validate every declared section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, config) in &self.configs {
            config.validate(*section)?;
        }
        Ok(())
    }
}

impl Default for SectionTable {
    /// The site's built-in policy.
    fn default() -> Self {
        let mut configs = BTreeMap::new();

        configs.insert(
            SectionId::Hero,
            SectionConfig {
                hide_on_call: vec![Navigation, BookingButton, ChatButton],
                show_on_call: vec![LanguageSwitch, ScrollIndicator],
                show_on_exit: vec![Navigation],
                hide_on_exit: vec![ScrollIndicator],
                manual_components: vec![],
            },
        );
        configs.insert(
            SectionId::Highlights,
            SectionConfig {
                hide_on_call: vec![ScrollIndicator],
                show_on_call: vec![Navigation],
                show_on_exit: vec![],
                hide_on_exit: vec![],
                manual_components: vec![Highlight],
            },
        );
        configs.insert(
            SectionId::Menu,
            SectionConfig {
                hide_on_call: vec![LanguageSwitch],
                show_on_call: vec![Navigation, BookingButton, ChatButton],
                show_on_exit: vec![LanguageSwitch],
                hide_on_exit: vec![],
                manual_components: vec![],
            },
        );
        configs.insert(
            SectionId::Chef,
            SectionConfig {
                hide_on_call: vec![BookingButton],
                show_on_call: vec![Navigation, ChatButton],
                show_on_exit: vec![BookingButton],
                hide_on_exit: vec![],
                manual_components: vec![],
            },
        );
        configs.insert(
            SectionId::Gallery,
            SectionConfig {
                hide_on_call: vec![ChatButton, BookingButton],
                show_on_call: vec![Navigation],
                show_on_exit: vec![ChatButton],
                hide_on_exit: vec![],
                manual_components: vec![Highlight],
            },
        );
        configs.insert(
            SectionId::Booking,
            SectionConfig {
                hide_on_call: vec![BookingButton, ChatButton],
                show_on_call: vec![Navigation],
                show_on_exit: vec![BookingButton],
                hide_on_exit: vec![],
                manual_components: vec![],
            },
        );
        configs.insert(
            SectionId::Footer,
            SectionConfig {
                hide_on_call: vec![ScrollIndicator, ChatButton],
                show_on_call: vec![SocialLinks, Navigation],
                show_on_exit: vec![ScrollIndicator],
                hide_on_exit: vec![SocialLinks],
                manual_components: vec![],
            },
        );

        Self { configs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let table = SectionTable::default();
        assert!(table.validate().is_ok());
        for section in SectionId::ALL {
            let config = table.get(section);
            assert!(
                !config.show_on_call.is_empty() || !config.hide_on_call.is_empty(),
                "{section} should declare a policy"
            );
        }
    }

    #[test]
    fn test_overlap_rejected() {
        let config = SectionConfig {
            hide_on_call: vec![Navigation, ChatButton],
            show_on_call: vec![ChatButton],
            ..Default::default()
        };
        match config.validate(SectionId::Menu) {
            Err(ConfigError::OverlappingLists { section, component }) => {
                assert_eq!(section, SectionId::Menu);
                assert_eq!(component, ChatButton);
            }
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn test_manual_component_cannot_be_listed() {
        let config = SectionConfig {
            hide_on_exit: vec![Highlight],
            manual_components: vec![Highlight],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(SectionId::Gallery),
            Err(ConfigError::ManualOverlap { .. })
        ));
    }

    #[test]
    fn test_missing_section_is_empty() {
        let table = SectionTable::new(BTreeMap::new());
        assert_eq!(table.get(SectionId::Chef), SectionConfig::default());
    }
}
