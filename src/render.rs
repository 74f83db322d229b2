use crate::event::{EventContext, EventHandler, ListenerCell, Msg};
use crate::facts::FactsDelta;
use crate::host::{EventCallback, EventPayload, Host};
use crate::node::Node;
use hashbrown::HashMap;
use std::{cell::RefCell, rc::Rc};
use tracing::trace_span;

/// The engine-side record of one attached listener: the swappable cell plus
/// the callback allocation whose identity the host knows it by.
pub(crate) struct ListenerHandle {
	pub cell: Rc<ListenerCell>,
	pub callback: EventCallback,
}

/// Renders node trees into live nodes and applies patch lists to them.
///
/// Owns the host, the dispatch sink every routed message ends up at, and two
/// registries keyed by live node: attached listeners (so a facts change can
/// swap a handler without touching the host) and the event contexts of
/// tagged subtrees (so addressing and retag patches can find them).
///
/// # Correct Use
///
/// The engine holds no tree state between update cycles: the `new` tree
/// passed to [`diff`](`crate::diff::diff`) in one cycle must be the `old`
/// tree of the next, and nothing else may mutate a live subtree while a
/// cycle is in progress.
pub struct Reconciler<H: Host> {
	pub(crate) host: H,
	pub(crate) dispatch: Rc<dyn Fn(Msg)>,
	pub(crate) listeners: HashMap<H::Node, HashMap<Rc<str>, ListenerHandle>>,
	pub(crate) contexts: HashMap<H::Node, Rc<EventContext>>,
}

impl<H: Host> Reconciler<H> {
	pub fn new(host: H, dispatch: impl Fn(Msg) + 'static) -> Self {
		Self {
			host,
			dispatch: Rc::new(dispatch),
			listeners: HashMap::new(),
			contexts: HashMap::new(),
		}
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}

	/// Materializes `node` into a live node for first paint.
	///
	/// Event listeners route through `context`; tagged subtrees get a child
	/// context registered against their live node so later patches can find
	/// it.
	pub fn render(&mut self, node: &Node<H::Node>, context: &Rc<EventContext>) -> H::Node {
		match node {
			Node::Text(content) => self.host.create_text(content),

			Node::Element(element) => {
				let span = trace_span!("Creating element", tag = &*element.tag);
				let _enter = span.enter();

				let live = self.host.create_element(&element.tag, element.namespace.as_deref());
				self.apply_facts(&live, &FactsDelta::from_full(&element.facts), context);
				for child in &element.children {
					let child_live = self.render(child, context);
					self.host.insert_child(&live, &child_live, None);
				}
				live
			}

			Node::Keyed(keyed) => {
				let span = trace_span!("Creating keyed element", tag = &*keyed.tag);
				let _enter = span.enter();

				let live = self.host.create_element(&keyed.tag, keyed.namespace.as_deref());
				self.apply_facts(&live, &FactsDelta::from_full(&keyed.facts), context);
				for (_, child) in &keyed.children {
					let child_live = self.render(child, context);
					self.host.insert_child(&live, &child_live, None);
				}
				live
			}

			Node::Custom(custom) => {
				let span = trace_span!("Creating custom node");
				let _enter = span.enter();

				let live = (custom.render)(&*custom.model, &mut self.host);
				self.apply_facts(&live, &FactsDelta::from_full(&custom.facts), context);
				live
			}

			Node::Tagged(tagged) => {
				let span = trace_span!("Creating tagged subtree", mappers = tagged.mappers.len());
				let _enter = span.enter();

				let (mappers, inner) = crate::diff::flatten_tagged(tagged);
				let sub_context = EventContext::child(context, mappers);
				let live = self.render(&inner, &sub_context);
				self.contexts.insert(live.clone(), sub_context);
				live
			}

			Node::Thunk(thunk) => {
				let realized = thunk.realize();
				self.render(&realized, context)
			}
		}
	}

	/// Applies a fact delta to a live node, category by category.
	///
	/// Also used for first paint, with the full fact record as the delta.
	pub(crate) fn apply_facts(&mut self, live: &H::Node, delta: &FactsDelta, context: &Rc<EventContext>) {
		for (name, value) in &delta.styles {
			self.host.set_style(live, name, value.as_deref());
		}
		for (name, value) in &delta.properties {
			self.host.set_property(live, name, value.as_ref());
		}
		for (name, value) in &delta.attributes {
			self.host.set_attribute(live, name, value.as_deref());
		}
		for (name, (namespace, value)) in &delta.namespaced {
			self.host.set_attribute_ns(live, namespace, name, value.as_deref());
		}
		for (name, handler) in &delta.events {
			self.update_listener(live, name, handler.as_ref(), context);
		}
	}

	fn update_listener(&mut self, live: &H::Node, name: &Rc<str>, handler: Option<&EventHandler>, context: &Rc<EventContext>) {
		let per_node = self.listeners.entry(live.clone()).or_default();
		let attached = per_node.contains_key(name);
		match (attached, handler) {
			(true, Some(next)) => {
				// The listener identity survives; only the handler slot
				// changes.
				let handle = per_node.get(name).expect("weft-dom bug: listener registry entry vanished");
				*handle.cell.handler.borrow_mut() = next.clone();
			}
			(true, None) => {
				let removed = per_node.remove(name).expect("weft-dom bug: listener registry entry vanished");
				self.host.remove_event_listener(live, name, &removed.callback);
			}
			(false, Some(next)) => {
				let cell = Rc::new(ListenerCell {
					handler: RefCell::new(next.clone()),
					context: context.clone(),
				});
				let callback = make_callback(&cell, &self.dispatch);
				self.host.add_event_listener(live, name, callback.clone());
				self.listeners
					.entry(live.clone())
					.or_default()
					.insert(name.clone(), ListenerHandle { cell, callback });
			}
			(false, None) => {}
		}
		if self.listeners.get(live).map_or(false, |per_node| per_node.is_empty()) {
			self.listeners.remove(live);
		}
	}
}

fn make_callback(cell: &Rc<ListenerCell>, dispatch: &Rc<dyn Fn(Msg)>) -> EventCallback {
	let cell = cell.clone();
	let dispatch = dispatch.clone();
	Rc::new(move |payload: &EventPayload| {
		let handler = cell.handler.borrow().clone();
		if let Some(msg) = handler.handle(payload) {
			dispatch(cell.context.route(msg));
		}
	})
}
