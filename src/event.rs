use crate::host::EventPayload;
use core::fmt;
use std::{any::Any, cell::RefCell, rc::Rc};

/// An opaque application message, produced by event handlers and transformed
/// by [`Mapper`]s on its way to the dispatch sink.
pub type Msg = Rc<dyn Any>;

/// A message-mapping function, as attached by a `Tagged` node.
///
/// Equality is function identity: two mappers are equal exactly when they are
/// the same allocation. The diff relies on this to decide between leaving a
/// subtree alone and emitting a retag patch.
#[derive(Clone)]
pub struct Mapper(Rc<dyn Fn(Msg) -> Msg>);
impl Mapper {
	pub fn new(map: impl Fn(Msg) -> Msg + 'static) -> Self {
		Self(Rc::new(map))
	}

	#[must_use]
	pub fn apply(&self, msg: Msg) -> Msg {
		(self.0)(msg)
	}
}
impl PartialEq for Mapper {
	#[allow(clippy::vtable_address_comparisons)]
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl fmt::Debug for Mapper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Mapper({:p})", Rc::as_ptr(&self.0))
	}
}

/// An event fact's value: turns a host event payload into a message, or
/// `None` to swallow the event.
///
/// Equality is function identity, like [`Mapper`]. A facts diff that finds an
/// unequal handler for an existing listener swaps the handler inside the
/// listener cell without detaching anything.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&EventPayload) -> Option<Msg>>);
impl EventHandler {
	pub fn new(handle: impl Fn(&EventPayload) -> Option<Msg> + 'static) -> Self {
		Self(Rc::new(handle))
	}

	#[must_use]
	pub fn handle(&self, payload: &EventPayload) -> Option<Msg> {
		(self.0)(payload)
	}
}
impl PartialEq for EventHandler {
	#[allow(clippy::vtable_address_comparisons)]
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl fmt::Debug for EventHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0))
	}
}

/// One link in the chain of message-mapping functions between a live node and
/// the dispatch root.
///
/// The renderer allocates one context per collapsed run of `Tagged` layers
/// and registers it against the run's live node. A retag patch overwrites
/// `mappers` in place, so listeners that captured the context keep their
/// identity and simply route through the new chain.
pub struct EventContext {
	mappers: RefCell<Vec<Mapper>>,
	parent: Option<Rc<EventContext>>,
}
impl EventContext {
	/// The dispatch root: no mappers, no parent.
	#[must_use]
	pub fn root() -> Rc<Self> {
		Rc::new(Self {
			mappers: RefCell::new(Vec::new()),
			parent: None,
		})
	}

	#[must_use]
	pub fn child(parent: &Rc<Self>, mappers: Vec<Mapper>) -> Rc<Self> {
		Rc::new(Self {
			mappers: RefCell::new(mappers),
			parent: Some(parent.clone()),
		})
	}

	/// Overwrites the mapper chain in place. Listener identity is untouched.
	pub fn retag(&self, mappers: Vec<Mapper>) {
		*self.mappers.borrow_mut() = mappers;
	}

	/// Routes a message towards the dispatch root.
	///
	/// Mappers are stored outermost-first, so the innermost one is applied
	/// first, then each enclosing one, then the parent context's chain.
	#[must_use]
	pub fn route(&self, msg: Msg) -> Msg {
		let mut msg = msg;
		for mapper in self.mappers.borrow().iter().rev() {
			msg = mapper.apply(msg);
		}
		match &self.parent {
			Some(parent) => parent.route(msg),
			None => msg,
		}
	}
}
impl fmt::Debug for EventContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventContext")
			.field("mappers", &self.mappers.borrow().len())
			.field("parent", &self.parent.is_some())
			.finish()
	}
}

/// The engine-side half of an attached listener: the handler slot that a
/// facts change swaps without touching the host listener, and the context the
/// handler's messages route through.
pub(crate) struct ListenerCell {
	pub handler: RefCell<EventHandler>,
	pub context: Rc<EventContext>,
}
