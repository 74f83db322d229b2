use crate::event::Mapper;
use crate::facts::FactsDelta;
use crate::host::LiveNode;
use crate::node::{CustomPatchFn, Node};
use core::fmt;
use std::{cell::RefCell, rc::Rc};

/// One described mutation, addressed by a position in the old tree's
/// pre-order traversal (each node occupies `1 + descendants` consecutive
/// positions).
///
/// A patch list is totally ordered by ascending `index`; the addressing pass
/// depends on that to locate every target in one monotonic walk.
pub struct Patch<L: LiveNode> {
	pub index: usize,
	pub kind: PatchKind<L>,
}
impl<L: LiveNode> fmt::Debug for Patch<L> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Patch {{ {} @ {} }}", self.kind.name(), self.index)
	}
}

pub enum PatchKind<L: LiveNode> {
	/// Replace the subtree wholesale with a fresh render of the payload.
	Redraw(Node<L>),
	Facts(FactsDelta),
	Text(Rc<str>),
	/// Swap the mapper chain on the node's event context. No listener churn.
	Retag(Vec<Mapper>),
	/// Drop the trailing run of children, keeping the first `keep`.
	RemoveTrailing { keep: usize, drop: usize },
	/// Render and append new trailing children at child offset `start`.
	AppendTrailing { start: usize, children: Vec<Node<L>> },
	/// Patches against a thunk's realized subtree, scoped to its single slot.
	ThunkRecurse(Vec<Patch<L>>),
	Reorder(Reorder<L>),
	/// Detach one keyed child; carries move data when the child re-enters
	/// elsewhere in the same reorder.
	RemoveKeyed(Option<KeyedMove<L>>),
	Custom(CustomPatchFn<L>),
}
impl<L: LiveNode> PatchKind<L> {
	#[must_use]
	pub fn name(&self) -> &'static str {
		match self {
			PatchKind::Redraw(_) => "redraw",
			PatchKind::Facts(_) => "facts",
			PatchKind::Text(_) => "text",
			PatchKind::Retag(_) => "retag",
			PatchKind::RemoveTrailing { .. } => "remove-trailing",
			PatchKind::AppendTrailing { .. } => "append-trailing",
			PatchKind::ThunkRecurse(_) => "thunk-recurse",
			PatchKind::Reorder(_) => "reorder",
			PatchKind::RemoveKeyed(_) => "remove-keyed",
			PatchKind::Custom(_) => "custom",
		}
	}
}

/// The composite output of one keyed-children diff.
///
/// `sub` holds the per-key diffs and removals (ascending index order);
/// `inserts` the positioned insertions and `trailing` the end-appended ones.
/// Removals are fully applied before any insertion is positioned; insert
/// offsets count against the post-removal child list.
pub struct Reorder<L: LiveNode> {
	pub sub: Vec<Patch<L>>,
	pub inserts: Vec<InsertRecord<L>>,
	pub trailing: Vec<InsertRecord<L>>,
}

pub struct InsertRecord<L: LiveNode> {
	/// Child slot to insert before; `None` appends at the end.
	pub target: Option<usize>,
	pub entry: EntryHandle<L>,
}

pub struct KeyedMove<L: LiveNode> {
	pub sub: Vec<Patch<L>>,
	pub entry: EntryHandle<L>,
}

/// Shared handle to a reconciliation ledger entry.
///
/// Shared between a reorder's insert records and the paired remove patch so
/// a key seen as removed and inserted within one keyed diff resolves to a
/// single move. Created fresh per keyed-diff call; carries no identity beyond
/// it.
pub type EntryHandle<L> = Rc<RefCell<LedgerEntry<L>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
	Inserted,
	Removed,
	Reconciled,
}

pub struct LedgerEntry<L: LiveNode> {
	pub status: EntryStatus,
	pub vnode: Node<L>,
	/// Child slot the node ends up at; `None` for trailing inserts.
	pub target: Option<usize>,
	/// Traversal index the node was first seen removed at. Diff base for the
	/// move's sub-patches.
	pub(crate) diff_base: usize,
	/// Position of the plain remove patch in the local patch list, so a later
	/// insert of the same key can upgrade it into a move.
	pub(crate) removed_at: usize,
}
impl<L: LiveNode> LedgerEntry<L> {
	pub(crate) fn handle(status: EntryStatus, vnode: Node<L>, target: Option<usize>, diff_base: usize, removed_at: usize) -> EntryHandle<L> {
		Rc::new(RefCell::new(LedgerEntry {
			status,
			vnode,
			target,
			diff_base,
			removed_at,
		}))
	}
}
