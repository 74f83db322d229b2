use crate::facts::PropertyValue;
use core::{any::Any, fmt::Debug, hash::Hash};
use std::rc::Rc;

/// Opaque event data handed to listeners by the host. Decoding it into
/// application messages is the event layer's business, not this engine's.
pub type EventPayload = Rc<dyn Any>;

/// The callback shape the engine hands to [`Host::add_event_listener`].
///
/// Listener identity is the `Rc` allocation: [`Host::remove_event_listener`]
/// receives the same `Rc` that was added.
pub type EventCallback = Rc<dyn Fn(&EventPayload)>;

/// Bounds on a host's live-node handle type.
///
/// Handles are cheap identities (a node id, an interned pointer wrapper),
/// not the node data itself: the engine clones them freely and uses them as
/// map keys for its listener and event-context registries.
pub trait LiveNode: Clone + Eq + Hash + Debug + 'static {}
impl<T> LiveNode for T where T: Clone + Eq + Hash + Debug + 'static {}

/// The primitive live-tree capability this engine consumes.
///
/// Implemented by the external GUI/DOM layer. The engine is the sole mutator
/// of the live tree while a cycle is in progress; the host must not let
/// anything else touch the same subtree concurrently.
///
/// A `value` of `None` in the setters means "remove".
///
/// # Correct Use
///
/// `insert_child` with a `child` that is already attached somewhere must
/// detach it first (the ***insertBefore*** contract); keyed reorders move
/// nodes to trailing positions through exactly that path.
///
/// Allocation or mutation failures are the host's to surface. The engine
/// performs no retries and adds no error wrapping of its own.
pub trait Host {
	type Node: LiveNode;

	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> Self::Node;
	fn create_text(&mut self, content: &str) -> Self::Node;

	fn set_text(&mut self, node: &Self::Node, content: &str);
	fn set_attribute(&mut self, node: &Self::Node, name: &str, value: Option<&str>);
	fn set_attribute_ns(&mut self, node: &Self::Node, namespace: &str, name: &str, value: Option<&str>);
	fn set_property(&mut self, node: &Self::Node, name: &str, value: Option<&PropertyValue>);
	fn set_style(&mut self, node: &Self::Node, name: &str, value: Option<&str>);

	fn add_event_listener(&mut self, node: &Self::Node, name: &str, callback: EventCallback);
	fn remove_event_listener(&mut self, node: &Self::Node, name: &str, callback: &EventCallback);

	fn insert_child(&mut self, parent: &Self::Node, child: &Self::Node, before: Option<&Self::Node>);
	fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node);
	fn replace_child(&mut self, parent: &Self::Node, old: &Self::Node, new: &Self::Node);

	/// The `index`th current child of `parent`, if any.
	fn child(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;
	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
}
