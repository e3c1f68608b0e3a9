//! Core types for pageflow.
//!
//! Identifiers for the fixed set of sections and floating components, plus the
//! small geometric and mode types shared by every subsystem.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownId;

/// Cleanup function returned by subscriptions and registrations.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// SectionId - Navigation order is declaration order
// =============================================================================

/// One full-viewport page in the fixed sequence.
///
/// Variants are declared in navigation order; `index()` and the derived `Ord`
/// both follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Hero,
    Highlights,
    Menu,
    Chef,
    Gallery,
    Booking,
    Footer,
}

impl SectionId {
    /// Number of sections.
    pub const COUNT: usize = 7;

    /// All sections in navigation order.
    pub const ALL: [SectionId; Self::COUNT] = [
        Self::Hero,
        Self::Highlights,
        Self::Menu,
        Self::Chef,
        Self::Gallery,
        Self::Booking,
        Self::Footer,
    ];

    /// Position in navigation order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Section at `index`, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// First section (the one shown on load).
    pub fn first() -> Self {
        Self::ALL[0]
    }

    /// Last section.
    pub fn last() -> Self {
        Self::ALL[Self::COUNT - 1]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Highlights => "highlights",
            Self::Menu => "menu",
            Self::Chef => "chef",
            Self::Gallery => "gallery",
            Self::Booking => "booking",
            Self::Footer => "footer",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = UnknownId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownId::Section(s.to_string()))
    }
}

// =============================================================================
// ComponentId - Floating widgets
// =============================================================================

/// A floating widget that lives outside section content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentId {
    Navigation,
    LanguageSwitch,
    ScrollIndicator,
    ChatButton,
    Highlight,
    BookingButton,
    SocialLinks,
}

impl ComponentId {
    pub const ALL: [ComponentId; 7] = [
        Self::Navigation,
        Self::LanguageSwitch,
        Self::ScrollIndicator,
        Self::ChatButton,
        Self::Highlight,
        Self::BookingButton,
        Self::SocialLinks,
    ];

    /// Position in `ALL`.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::LanguageSwitch => "language_switch",
            Self::ScrollIndicator => "scroll_indicator",
            Self::ChatButton => "chat_button",
            Self::Highlight => "highlight",
            Self::BookingButton => "booking_button",
            Self::SocialLinks => "social_links",
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentId {
    type Err = UnknownId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both "chat_button" and "chat-button"
        let normalized = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownId::Component(s.to_string()))
    }
}

// =============================================================================
// Targets - One id, several ids, or every mounted component
// =============================================================================

/// Set of components an operation applies to.
///
/// `All` resolves to every currently mounted component at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    All,
    Only(Vec<ComponentId>),
}

impl From<ComponentId> for Targets {
    fn from(id: ComponentId) -> Self {
        Self::Only(vec![id])
    }
}

impl From<Vec<ComponentId>> for Targets {
    fn from(ids: Vec<ComponentId>) -> Self {
        Self::Only(ids)
    }
}

impl From<&[ComponentId]> for Targets {
    fn from(ids: &[ComponentId]) -> Self {
        Self::Only(ids.to_vec())
    }
}

impl<const N: usize> From<[ComponentId; N]> for Targets {
    fn from(ids: [ComponentId; N]) -> Self {
        Self::Only(ids.to_vec())
    }
}

// =============================================================================
// Direction
// =============================================================================

/// Normalized navigation direction.
///
/// `Down` moves to the next section, `Up` to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn step(self) -> isize {
        match self {
            Self::Up => -1,
            Self::Down => 1,
        }
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Pointer position in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Circular proximity region around a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub center: Point,
    pub radius: f64,
}

impl Area {
    pub const fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Strictly inside the radius. A pointer exactly on the edge is outside.
    pub fn contains(&self, point: Point) -> bool {
        self.center.distance_to(point) < self.radius
    }
}

// =============================================================================
// Visibility modes and interaction flags
// =============================================================================

/// How a component's raw visibility is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityMode {
    /// Only explicit show/hide calls change it.
    #[default]
    Manual,
    /// Alternates between shown and hidden on two independent delays.
    TimeCycle,
    /// Shown while the pointer is near a point, hidden after a delay once it leaves.
    AreaProximity,
    /// Shown by `trigger()`, hidden again after the hide delay.
    TriggerOnly,
}

bitflags::bitflags! {
    /// Transient interaction state of a component.
    ///
    /// While any flag is set, section policy will not hide the component.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ComponentFlags: u8 {
        const NONE = 0;
        const INTERACTING = 1 << 0;
        const HOVERED = 1 << 1;
    }
}

impl ComponentFlags {
    /// Whether section policy must leave this component alone.
    pub fn is_busy(self) -> bool {
        self.intersects(Self::INTERACTING | Self::HOVERED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_order_matches_index() {
        for (i, section) in SectionId::ALL.iter().enumerate() {
            assert_eq!(section.index(), i);
            assert_eq!(SectionId::from_index(i), Some(*section));
        }
        assert_eq!(SectionId::from_index(SectionId::COUNT), None);
        assert!(SectionId::Hero < SectionId::Footer);
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!("booking".parse::<SectionId>().ok(), Some(SectionId::Booking));
        assert_eq!("Booking".parse::<SectionId>().ok(), Some(SectionId::Booking));
        assert!("lobby".parse::<SectionId>().is_err());

        assert_eq!(
            "chat-button".parse::<ComponentId>().ok(),
            Some(ComponentId::ChatButton)
        );
        assert_eq!(
            "scroll_indicator".parse::<ComponentId>().ok(),
            Some(ComponentId::ScrollIndicator)
        );
        assert!("sidebar".parse::<ComponentId>().is_err());
    }

    #[test]
    fn test_area_contains_is_strict() {
        let area = Area::new(Point::new(500.0, 500.0), 100.0);
        assert!(area.contains(Point::new(550.0, 500.0)));
        assert!(!area.contains(Point::new(700.0, 500.0)));
        assert!(!area.contains(Point::new(600.0, 500.0)));
    }

    #[test]
    fn test_busy_flags() {
        assert!(!ComponentFlags::NONE.is_busy());
        assert!(ComponentFlags::HOVERED.is_busy());
        assert!((ComponentFlags::INTERACTING | ComponentFlags::HOVERED).is_busy());
    }

    #[test]
    fn test_targets_conversions() {
        assert_eq!(
            Targets::from(ComponentId::Navigation),
            Targets::Only(vec![ComponentId::Navigation])
        );
        assert_eq!(
            Targets::from([ComponentId::Navigation, ComponentId::Highlight]),
            Targets::Only(vec![ComponentId::Navigation, ComponentId::Highlight])
        );
    }
}
