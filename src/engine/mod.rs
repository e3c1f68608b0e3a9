//! Engine - Registry, section policy and modal coordination.
//!
//! - Registry: Mounted components, override writes, locks and subscriptions
//! - Sections: The per-section visibility table
//! - Policy: Applies the table on every section enter/exit
//! - Modal: Snapshot, lock and restore around overlays
//!
//! # Architecture
//!
//! Every component owns one visibility slot for the whole session:
//!
//! ```text
//! visible  (raw flag, driven by the component's own mode)
//! override (None | Some(bool), written by policy and callers, gated by locks)
//! displayed = override ?? visible
//! ```
//!
//! Policy writes go through the same gated channel as external callers, so a
//! lock silently absorbs them until it is released.

mod modal;
mod policy;
mod registry;
mod sections;

pub use modal::{ModalManager, ModalSnapshot};
pub use policy::{PolicyEngine, SectionComponentOptions, SectionEvent, SectionPhase};
pub use registry::ComponentRegistry;
pub use sections::{SectionConfig, SectionTable};
