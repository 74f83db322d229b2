use crate::diff::{diff, flatten_tagged};
use crate::event::EventContext;
use crate::host::{Host, LiveNode};
use crate::node::Node;
use crate::patch::{EntryHandle, EntryStatus, InsertRecord, Patch, PatchKind, Reorder};
use crate::render::Reconciler;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, trace, trace_span};

/// Freshly allocated per [`Reconciler::apply_patches`] call: pairs each patch
/// (by identity) with the live node and event context the addressing walk
/// located for it, and stashes the live nodes of moved keyed children between
/// their remove and insert steps.
///
/// The patch list itself stays immutable.
struct AddressState<H: Host> {
	slots: HashMap<usize, (H::Node, Rc<EventContext>)>,
	moved: HashMap<usize, H::Node>,
}
impl<H: Host> AddressState<H> {
	fn new() -> Self {
		Self {
			slots: HashMap::new(),
			moved: HashMap::new(),
		}
	}
}

fn patch_id<L: LiveNode>(patch: &Patch<L>) -> usize {
	(patch as *const Patch<L>) as usize
}

fn entry_id<L: LiveNode>(entry: &EntryHandle<L>) -> usize {
	Rc::as_ptr(entry) as usize
}

impl<H: Host> Reconciler<H> {
	/// Diffs `old` against `new` and applies the result to `root` in one
	/// step. This is the once-per-cycle entry point.
	///
	/// Returns the (possibly replaced) root. `new` must become the next
	/// cycle's `old`.
	pub fn update(&mut self, root: H::Node, old: &Node<H::Node>, new: &Node<H::Node>, context: &Rc<EventContext>) -> H::Node {
		let patches = diff(old, new);
		self.apply_patches(root, old, &patches, context)
	}

	/// Applies an ordered patch list produced by diffing `old` against some
	/// newer tree.
	///
	/// Pass 1 walks `old` and the live tree in lock-step once, skipping any
	/// subtree whose index range holds no patch; pass 2 executes the patches
	/// in ascending index order. May return a different root if the root
	/// itself was redrawn.
	///
	/// # Panics
	///
	/// A patch that cannot be located in the live tree means the patch list
	/// and the live tree have diverged: an engine bug, reported with the
	/// patch kind and index rather than silently ignored.
	pub fn apply_patches(&mut self, root: H::Node, old: &Node<H::Node>, patches: &[Patch<H::Node>], context: &Rc<EventContext>) -> H::Node {
		if patches.is_empty() {
			return root;
		}

		let span = trace_span!("Applying patches", count = patches.len());
		let _enter = span.enter();

		let mut state = AddressState::new();
		self.address_nodes(&root, old, patches, 0, 0, old.descendants(), context, &mut state);
		self.apply_patch_list(root, patches, &mut state)
	}

	/// The addressing walk: one pre-order pass over the old tree and the live
	/// tree together.
	///
	/// `low..=high` is the traversal range the current node covers
	/// (`high = low + descendants`). Patches at `low` belong to this node;
	/// composite payloads recurse into their own sub-lists against the same
	/// bounds. Children are entered only when the next patch index falls
	/// inside their range.
	///
	/// Returns the cursor past the last patch addressed here.
	#[allow(clippy::too_many_arguments)]
	fn address_nodes(
		&self,
		live: &H::Node,
		vnode: &Node<H::Node>,
		patches: &[Patch<H::Node>],
		mut cursor: usize,
		low: usize,
		high: usize,
		context: &Rc<EventContext>,
		state: &mut AddressState<H>,
	) -> usize {
		let mut index = match patches.get(cursor) {
			Some(patch) => patch.index,
			None => return cursor,
		};

		while index == low {
			let patch = &patches[cursor];
			state.slots.insert(patch_id(patch), (live.clone(), context.clone()));

			match &patch.kind {
				PatchKind::ThunkRecurse(sub) => {
					let realized = match vnode {
						Node::Thunk(thunk) => thunk
							.cached()
							.unwrap_or_else(|| panic!("weft-dom bug: thunk at index {} was never realized", low)),
						other => panic!("weft-dom bug: thunk-recurse patch at index {} addressed {:?}", low, other),
					};
					// The thunk claims a single slot in its parent, but its
					// sub-patches span the realized subtree.
					let realized_high = low + realized.descendants();
					self.address_nodes(live, &realized, sub, 0, low, realized_high, context, state);
				}
				PatchKind::Reorder(reorder) => {
					if !reorder.sub.is_empty() {
						self.address_nodes(live, vnode, &reorder.sub, 0, low, high, context, state);
					}
				}
				PatchKind::RemoveKeyed(Some(keyed_move)) => {
					state.moved.insert(entry_id(&keyed_move.entry), live.clone());
					if !keyed_move.sub.is_empty() {
						self.address_nodes(live, vnode, &keyed_move.sub, 0, low, high, context, state);
					}
				}
				_ => {}
			}

			cursor += 1;
			match patches.get(cursor) {
				Some(next) if next.index <= high => index = next.index,
				_ => return cursor,
			}
		}

		match vnode {
			Node::Tagged(tagged) => {
				// The live node is shared with the collapsed inner node; the
				// registered context takes over for everything below.
				let (_, inner) = flatten_tagged(tagged);
				let sub_context = self
					.contexts
					.get(live)
					.cloned()
					.unwrap_or_else(|| panic!("weft-dom bug: no event context registered for the tagged node at index {}", low));
				self.address_nodes(live, &inner, patches, cursor, low + 1, high, &sub_context, state)
			}
			Node::Element(element) => self.address_children(live, element.children.iter(), patches, cursor, low, high, context, state),
			Node::Keyed(keyed) => self.address_children(live, keyed.children.iter().map(|(_, child)| child), patches, cursor, low, high, context, state),
			// Single-slot nodes: anything still in range is left unaddressed
			// and reported by the application pass.
			Node::Text(_) | Node::Custom(_) | Node::Thunk(_) => cursor,
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn address_children<'a>(
		&self,
		live: &H::Node,
		children: impl Iterator<Item = &'a Node<H::Node>>,
		patches: &[Patch<H::Node>],
		mut cursor: usize,
		mut low: usize,
		high: usize,
		context: &Rc<EventContext>,
		state: &mut AddressState<H>,
	) -> usize
	where
		H::Node: 'a,
		H: 'a,
	{
		for (child_offset, child) in children.enumerate() {
			low += 1;
			let child_high = low + child.descendants();

			let index = match patches.get(cursor) {
				Some(patch) => patch.index,
				None => return cursor,
			};
			if low <= index && index <= child_high {
				let child_live = self
					.host
					.child(live, child_offset)
					.unwrap_or_else(|| panic!("weft-dom bug: live child {} missing under {:?} while addressing index {}", child_offset, live, index));
				cursor = self.address_nodes(&child_live, child, patches, cursor, low, child_high, context, state);
				match patches.get(cursor) {
					Some(next) if next.index <= high => {}
					_ => return cursor,
				}
			}

			low = child_high;
		}
		cursor
	}

	fn apply_patch_list(&mut self, mut root: H::Node, patches: &[Patch<H::Node>], state: &mut AddressState<H>) -> H::Node {
		for patch in patches {
			let (live, context) = state.slots.get(&patch_id(patch)).cloned().unwrap_or_else(|| {
				error!("Unaddressed {} patch at index {}.", patch.kind.name(), patch.index);
				panic!(
					"weft-dom bug: the patch list and the live tree diverged ({} patch at index {})",
					patch.kind.name(),
					patch.index
				)
			});
			let replacement = self.apply_patch(&live, patch, &context, state);
			if live == root {
				root = replacement;
			}
		}
		root
	}

	#[allow(clippy::too_many_lines)]
	fn apply_patch(&mut self, live: &H::Node, patch: &Patch<H::Node>, context: &Rc<EventContext>, state: &mut AddressState<H>) -> H::Node {
		match &patch.kind {
			PatchKind::Redraw(new) => self.apply_redraw(live, new, context),

			PatchKind::Facts(delta) => {
				self.apply_facts(live, delta, context);
				live.clone()
			}

			PatchKind::Text(content) => {
				self.host.set_text(live, content);
				live.clone()
			}

			PatchKind::Retag(mappers) => {
				// No live-tree mutation: only the routing context changes, so
				// attached listeners keep their identity.
				match self.contexts.get(live) {
					Some(registered) => registered.retag(mappers.clone()),
					None => {
						let fresh = EventContext::child(context, mappers.clone());
						self.contexts.insert(live.clone(), fresh);
					}
				}
				live.clone()
			}

			PatchKind::RemoveTrailing { keep, drop } => {
				for _ in 0..*drop {
					let child = self
						.host
						.child(live, *keep)
						.unwrap_or_else(|| panic!("weft-dom bug: remove-trailing patch at index {} ran out of children", patch.index));
					self.unbind_subtree(&child);
					self.host.remove_child(live, &child);
				}
				live.clone()
			}

			PatchKind::AppendTrailing { start, children } => {
				let anchor = self.host.child(live, *start);
				for child in children {
					let fresh = self.render(child, context);
					self.host.insert_child(live, &fresh, anchor.as_ref());
				}
				live.clone()
			}

			PatchKind::ThunkRecurse(sub) => self.apply_patch_list(live.clone(), sub, state),

			PatchKind::Reorder(reorder) => self.apply_reorder(live, reorder, context, state),

			PatchKind::RemoveKeyed(None) => {
				self.unbind_subtree(live);
				match self.host.parent(live) {
					Some(parent) => self.host.remove_child(&parent, live),
					None => error!("Keyed child to remove has no parent. Ignoring."),
				}
				live.clone()
			}

			PatchKind::RemoveKeyed(Some(keyed_move)) => {
				// Positioned re-entry detaches now; a trailing re-entry stays
				// attached and is moved by the insert itself.
				let target = keyed_move.entry.borrow().target;
				if target.is_some() {
					if let Some(parent) = self.host.parent(live) {
						self.host.remove_child(&parent, live);
					}
				}
				let patched = self.apply_patch_list(live.clone(), &keyed_move.sub, state);
				state.moved.insert(entry_id(&keyed_move.entry), patched.clone());
				patched
			}

			PatchKind::Custom(custom) => custom(&mut self.host, live),
		}
	}

	/// Removals first; insert offsets count against the post-removal child
	/// list. Moved children reuse their stashed live node instead of being
	/// re-rendered.
	fn apply_reorder(&mut self, live: &H::Node, reorder: &Reorder<H::Node>, context: &Rc<EventContext>, state: &mut AddressState<H>) -> H::Node {
		let live = self.apply_patch_list(live.clone(), &reorder.sub, state);

		for insert in &reorder.inserts {
			let child = self.materialize_insert(insert, context, state);
			let target = insert.target.expect("weft-dom bug: positioned insert record without a target");
			let anchor = self.host.child(&live, target);
			self.host.insert_child(&live, &child, anchor.as_ref());
		}
		for insert in &reorder.trailing {
			let child = self.materialize_insert(insert, context, state);
			self.host.insert_child(&live, &child, None);
		}

		live
	}

	fn materialize_insert(&mut self, insert: &InsertRecord<H::Node>, context: &Rc<EventContext>, state: &mut AddressState<H>) -> H::Node {
		let (status, vnode) = {
			let entry = insert.entry.borrow();
			(entry.status, entry.vnode.clone())
		};
		match status {
			EntryStatus::Reconciled => state
				.moved
				.get(&entry_id(&insert.entry))
				.cloned()
				.unwrap_or_else(|| panic!("weft-dom bug: moved keyed child has no stashed live node")),
			EntryStatus::Inserted | EntryStatus::Removed => self.render(&vnode, context),
		}
	}

	fn apply_redraw(&mut self, live: &H::Node, new: &Node<H::Node>, context: &Rc<EventContext>) -> H::Node {
		let span = trace_span!("Redrawing subtree", new = ?new);
		let _enter = span.enter();

		let outgoing_context = self.contexts.get(live).cloned();
		self.unbind_subtree(live);
		let fresh = self.render(new, context);
		if let Some(outgoing) = outgoing_context {
			// Keep ancestor tagged layers resolvable through the replacement.
			self.contexts.entry(fresh.clone()).or_insert(outgoing);
		}

		match self.host.parent(live) {
			Some(parent) => self.host.replace_child(&parent, live, &fresh),
			None => trace!("Redrew the root node."),
		}
		fresh
	}

	/// Releases the listener and context registrations of a live subtree that
	/// is leaving the tree.
	pub(crate) fn unbind_subtree(&mut self, live: &H::Node) {
		let freed = self.unbind_subtree_inner(live);
		if freed > 0 {
			trace!("Freed {} listener registration(s).", freed);
		}
	}

	fn unbind_subtree_inner(&mut self, live: &H::Node) -> usize {
		let mut freed = 0;
		if let Some(per_node) = self.listeners.remove(live) {
			for (name, handle) in per_node {
				self.host.remove_event_listener(live, &name, &handle.callback);
				freed += 1;
			}
		}
		self.contexts.remove(live);

		let mut child_offset = 0;
		while let Some(child) = self.host.child(live, child_offset) {
			freed += self.unbind_subtree_inner(&child);
			child_offset += 1;
		}
		freed
	}
}
