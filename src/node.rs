use crate::event::Mapper;
use crate::facts::{organize_facts, Directive, Facts};
use crate::host::{Host, LiveNode};
use core::fmt;
use std::{any::Any, cell::RefCell, rc::Rc};

/// Renders a custom node's opaque model into a live node.
pub type CustomRender<L> = Rc<dyn Fn(&dyn Any, &mut dyn Host<Node = L>) -> L>;
/// Compares two opaque models; `Some` is a mutation to apply to the live node.
pub type CustomDiff<L> = Rc<dyn Fn(&dyn Any, &dyn Any) -> Option<CustomPatchFn<L>>>;
/// A custom node's own patch operation. May return a replacement live node.
pub type CustomPatchFn<L> = Rc<dyn Fn(&mut dyn Host<Node = L>, &L) -> L>;

/// An immutable description of one UI tree position.
///
/// Constructed once per render by the caller and never mutated; variants hold
/// `Rc` payloads, so the diff's identity short-circuit is a pointer check and
/// cloning a node is cheap.
pub enum Node<L: LiveNode> {
	Text(Rc<str>),
	Element(Rc<Element<L>>),
	Keyed(Rc<KeyedElement<L>>),
	Custom(Rc<CustomNode<L>>),
	Tagged(Rc<TaggedNode<L>>),
	Thunk(Rc<ThunkNode<L>>),
}
impl<L: LiveNode> Clone for Node<L> {
	fn clone(&self) -> Self {
		match self {
			Node::Text(text) => Node::Text(text.clone()),
			Node::Element(element) => Node::Element(element.clone()),
			Node::Keyed(keyed) => Node::Keyed(keyed.clone()),
			Node::Custom(custom) => Node::Custom(custom.clone()),
			Node::Tagged(tagged) => Node::Tagged(tagged.clone()),
			Node::Thunk(thunk) => Node::Thunk(thunk.clone()),
		}
	}
}
impl<L: LiveNode> Node<L> {
	/// The number of nodes transitively reachable below this one.
	///
	/// Each node occupies `1 + descendants()` consecutive pre-order traversal
	/// positions; the addressing pass prunes whole subtrees on this number
	/// alone. A thunk counts as a single position regardless of what its
	/// realized subtree holds; patches inside it are scoped to its own
	/// composite patch.
	#[must_use]
	pub fn descendants(&self) -> usize {
		match self {
			Node::Text(_) | Node::Custom(_) | Node::Thunk(_) => 0,
			Node::Element(element) => element.descendants,
			Node::Keyed(keyed) => keyed.descendants,
			Node::Tagged(tagged) => 1 + tagged.inner.descendants(),
		}
	}

	/// Whether both nodes are the same allocation.
	#[must_use]
	pub(crate) fn same_identity(&self, other: &Self) -> bool {
		match (self, other) {
			(Node::Text(a), Node::Text(b)) => Rc::ptr_eq(a, b),
			(Node::Element(a), Node::Element(b)) => Rc::ptr_eq(a, b),
			(Node::Keyed(a), Node::Keyed(b)) => Rc::ptr_eq(a, b),
			(Node::Custom(a), Node::Custom(b)) => Rc::ptr_eq(a, b),
			(Node::Tagged(a), Node::Tagged(b)) => Rc::ptr_eq(a, b),
			(Node::Thunk(a), Node::Thunk(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}
impl<L: LiveNode> fmt::Debug for Node<L> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Node::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Node::Element(element) => f
				.debug_struct("Element")
				.field("tag", &element.tag)
				.field("children", &element.children.len())
				.field("descendants", &element.descendants)
				.finish(),
			Node::Keyed(keyed) => f
				.debug_struct("Keyed")
				.field("tag", &keyed.tag)
				.field("children", &keyed.children.len())
				.field("descendants", &keyed.descendants)
				.finish(),
			Node::Custom(_) => f.write_str("Custom"),
			Node::Tagged(tagged) => f.debug_struct("Tagged").field("mappers", &tagged.mappers.len()).finish(),
			Node::Thunk(thunk) => f.debug_struct("Thunk").field("keys", &thunk.keys).finish(),
		}
	}
}

pub struct Element<L: LiveNode> {
	pub tag: Rc<str>,
	pub namespace: Option<Rc<str>>,
	pub facts: Facts,
	pub children: Vec<Node<L>>,
	pub descendants: usize,
}

pub struct KeyedElement<L: LiveNode> {
	pub tag: Rc<str>,
	pub namespace: Option<Rc<str>>,
	pub facts: Facts,
	pub children: Vec<(Rc<str>, Node<L>)>,
	pub descendants: usize,
}
impl<L: LiveNode> KeyedElement<L> {
	/// Projects the keyed children to plain ones.
	///
	/// Structure and descendant counts are unchanged, so the projection
	/// compares as a plain element without disturbing patch addressing.
	#[must_use]
	pub(crate) fn dekey(&self) -> Rc<Element<L>> {
		Rc::new(Element {
			tag: self.tag.clone(),
			namespace: self.namespace.clone(),
			facts: self.facts.clone(),
			children: self.children.iter().map(|(_, child)| child.clone()).collect(),
			descendants: self.descendants,
		})
	}
}

/// A host-escape node. The engine never looks inside `model`; it only hands
/// the old and new models to the node's own `diff`.
pub struct CustomNode<L: LiveNode> {
	pub facts: Facts,
	pub model: Rc<dyn Any>,
	pub render: CustomRender<L>,
	pub diff: CustomDiff<L>,
}

/// A subtree wrapped in one or more message mappers. Adjacent layers are
/// flattened and compared as a single unit.
pub struct TaggedNode<L: LiveNode> {
	pub mappers: Vec<Mapper>,
	pub inner: Node<L>,
}

/// A memoized subtree: skipped entirely when `keys` are pairwise equal.
pub struct ThunkNode<L: LiveNode> {
	pub keys: Vec<CacheKey>,
	build: Box<dyn Fn() -> Node<L>>,
	cached: RefCell<Option<Node<L>>>,
}
impl<L: LiveNode> ThunkNode<L> {
	/// Forces the build at most once and returns the realized subtree.
	#[must_use]
	pub fn realize(&self) -> Node<L> {
		let mut cached = self.cached.borrow_mut();
		if cached.is_none() {
			*cached = Some((self.build)());
		}
		cached.as_ref().expect("weft-dom bug: thunk cache empty after forcing").clone()
	}

	/// The realized subtree from a previous render or diff, if any.
	#[must_use]
	pub fn cached(&self) -> Option<Node<L>> {
		self.cached.borrow().clone()
	}

	/// Adopts an equal thunk's realized subtree so this one never builds.
	pub(crate) fn adopt(&self, realized: Node<L>) {
		*self.cached.borrow_mut() = Some(realized);
	}
}

/// A thunk cache key. `Ptr` compares by allocation identity, the rest by
/// value.
#[derive(Clone)]
pub enum CacheKey {
	Int(i64),
	Text(Rc<str>),
	Ptr(Rc<dyn Any>),
}
impl PartialEq for CacheKey {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(CacheKey::Int(a), CacheKey::Int(b)) => a == b,
			(CacheKey::Text(a), CacheKey::Text(b)) => a == b,
			#[allow(clippy::vtable_address_comparisons)]
			(CacheKey::Ptr(a), CacheKey::Ptr(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}
impl fmt::Debug for CacheKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CacheKey::Int(value) => write!(f, "Int({})", value),
			CacheKey::Text(value) => write!(f, "Text({:?})", value),
			CacheKey::Ptr(value) => write!(f, "Ptr({:p})", Rc::as_ptr(value)),
		}
	}
}
impl From<i64> for CacheKey {
	fn from(value: i64) -> Self {
		CacheKey::Int(value)
	}
}
impl From<&str> for CacheKey {
	fn from(value: &str) -> Self {
		CacheKey::Text(value.into())
	}
}

#[must_use]
pub fn text<L: LiveNode>(content: impl AsRef<str>) -> Node<L> {
	Node::Text(content.as_ref().into())
}

#[must_use]
pub fn element<L: LiveNode>(tag: impl AsRef<str>, directives: Vec<Directive>, children: Vec<Node<L>>) -> Node<L> {
	element_ns(tag, None, directives, children)
}

#[must_use]
pub fn element_ns<L: LiveNode>(tag: impl AsRef<str>, namespace: Option<&str>, directives: Vec<Directive>, children: Vec<Node<L>>) -> Node<L> {
	let descendants = children.iter().map(|child| 1 + child.descendants()).sum();
	Node::Element(Rc::new(Element {
		tag: tag.as_ref().into(),
		namespace: namespace.map(Into::into),
		facts: organize_facts(directives),
		children,
		descendants,
	}))
}

#[must_use]
pub fn keyed_element<L: LiveNode>(tag: impl AsRef<str>, directives: Vec<Directive>, children: Vec<(&str, Node<L>)>) -> Node<L> {
	keyed_element_ns(tag, None, directives, children)
}

#[must_use]
pub fn keyed_element_ns<L: LiveNode>(tag: impl AsRef<str>, namespace: Option<&str>, directives: Vec<Directive>, children: Vec<(&str, Node<L>)>) -> Node<L> {
	let descendants = children.iter().map(|(_, child)| 1 + child.descendants()).sum();
	Node::Keyed(Rc::new(KeyedElement {
		tag: tag.as_ref().into(),
		namespace: namespace.map(Into::into),
		facts: organize_facts(directives),
		children: children.into_iter().map(|(key, child)| (key.into(), child)).collect(),
		descendants,
	}))
}

/// Wraps `inner` with a message mapper. Nesting is fine; runs of tagged
/// layers are flattened when rendered and diffed.
#[must_use]
pub fn tagged<L: LiveNode>(mapper: Mapper, inner: Node<L>) -> Node<L> {
	Node::Tagged(Rc::new(TaggedNode { mappers: vec![mapper], inner }))
}

#[must_use]
pub fn thunk<L: LiveNode>(keys: Vec<CacheKey>, build: impl Fn() -> Node<L> + 'static) -> Node<L> {
	Node::Thunk(Rc::new(ThunkNode {
		keys,
		build: Box::new(build),
		cached: RefCell::new(None),
	}))
}

#[must_use]
pub fn custom<L: LiveNode>(directives: Vec<Directive>, model: Rc<dyn Any>, render: CustomRender<L>, diff: CustomDiff<L>) -> Node<L> {
	Node::Custom(Rc::new(CustomNode {
		facts: organize_facts(directives),
		model,
		render,
		diff,
	}))
}
