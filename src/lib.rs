#![doc(html_root_url = "https://docs.rs/weft-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A virtual-tree reconciliation engine.
//!
//! Callers describe a UI as an immutable [`Node`] tree, once per update.
//! [`diff`](`diff::diff`) compares the previous tree against the next one and
//! produces a flat [`Patch`](`patch::Patch`) list ordered by pre-order
//! traversal index. A [`Reconciler`] then locates each patch's live node in a
//! single walk of the old tree (pruning untouched subtrees by their
//! precomputed descendant counts) and applies the mutations through a
//! [`Host`](`host::Host`) implementation.
//!
//! The engine never holds state between update cycles: the `new` tree of one
//! cycle must be passed as the `old` tree of the next.

pub mod apply;
pub mod diff;
pub mod event;
pub mod facts;
pub mod host;
pub mod keyed;
pub mod node;
pub mod patch;
pub mod render;

pub use diff::diff;
pub use event::{EventContext, EventHandler, Mapper, Msg};
pub use facts::{organize_facts, Directive, Facts, PropertyValue};
pub use host::{EventCallback, EventPayload, Host, LiveNode};
pub use node::{custom, element, element_ns, keyed_element, keyed_element_ns, tagged, text, thunk, CacheKey, CustomDiff, CustomPatchFn, CustomRender, Node};
pub use patch::{Patch, PatchKind};
pub use render::Reconciler;
