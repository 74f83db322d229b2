use crate::diff::diff_help;
use crate::host::LiveNode;
use crate::node::Node;
use crate::patch::{EntryHandle, EntryStatus, InsertRecord, KeyedMove, LedgerEntry, Patch, PatchKind, Reorder};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{trace_span, warn};

/// Appended to a key to re-enter the ledger when the key occurs twice.
/// Contains a control character so synthesized keys cannot collide with
/// caller-supplied ones.
const DUPLICATE_KEY_SUFFIX: &str = "\u{1f}dup";

/// Reconciles two keyed child lists with a single forward scan.
///
/// The scan looks exactly one step ahead on each side to classify a mismatch
/// as a swap, an insert, a remove, or a one-for-one replacement; anything
/// needing deeper lookahead stops the scan and falls to the remainder sweep
/// (removes for old leftovers, trailing inserts for new ones). A key seen as
/// both removed and inserted within this one call is resolved into a single
/// move through the ledger.
///
/// Emits at most one composite reorder patch at the parent's index.
#[allow(clippy::too_many_lines)]
pub(crate) fn diff_keyed_children<L: LiveNode>(old: &[(Rc<str>, Node<L>)], new: &[(Rc<str>, Node<L>)], patches: &mut Vec<Patch<L>>, root_index: usize) {
	let span = trace_span!("Diffing keyed children", old = old.len(), new = new.len());
	let _enter = span.enter();

	let mut ledger: HashMap<String, EntryHandle<L>> = HashMap::new();
	let mut local: Vec<Patch<L>> = Vec::new();
	let mut inserts: Vec<InsertRecord<L>> = Vec::new();
	let mut trailing: Vec<InsertRecord<L>> = Vec::new();

	let mut i = 0;
	let mut j = 0;
	let mut index = root_index;

	while i < old.len() && j < new.len() {
		let (old_key, old_node) = &old[i];
		let (new_key, new_node) = &new[j];

		if old_key == new_key {
			index += 1;
			diff_help(old_node, new_node, &mut local, index);
			index += old_node.descendants();
			i += 1;
			j += 1;
			continue;
		}

		let old_next = old.get(i + 1);
		let new_next = new.get(j + 1);
		let old_match = old_next.map_or(false, |(key, _)| key == new_key);
		let new_match = new_next.map_or(false, |(key, _)| key == old_key);

		if new_match && old_match {
			// Swap: old[i] pairs with new[j+1]; new[j] re-enters where
			// old[i+1] leaves, which the ledger resolves into one move.
			let (_, new_next_node) = new_next.expect("weft-dom bug: lookahead lost new[j+1]");
			let (old_next_key, old_next_node) = old_next.expect("weft-dom bug: lookahead lost old[i+1]");

			index += 1;
			diff_help(old_node, new_next_node, &mut local, index);
			insert_node(&mut ledger, &mut local, &mut inserts, new_key, new_node, Some(j));
			index += old_node.descendants();

			index += 1;
			remove_node(&mut ledger, &mut local, old_next_key, old_next_node, index);
			index += old_next_node.descendants();

			i += 2;
			j += 2;
			continue;
		}

		if new_match {
			// new[j] is new here; old[i] lines up with new[j+1].
			let (_, new_next_node) = new_next.expect("weft-dom bug: lookahead lost new[j+1]");

			index += 1;
			insert_node(&mut ledger, &mut local, &mut inserts, new_key, new_node, Some(j));
			diff_help(old_node, new_next_node, &mut local, index);
			index += old_node.descendants();

			i += 1;
			j += 2;
			continue;
		}

		if old_match {
			// old[i] is gone; old[i+1] lines up with new[j].
			let (_, old_next_node) = old_next.expect("weft-dom bug: lookahead lost old[i+1]");

			index += 1;
			remove_node(&mut ledger, &mut local, old_key, old_node, index);
			index += old_node.descendants();

			index += 1;
			diff_help(old_next_node, new_node, &mut local, index);
			index += old_next_node.descendants();

			i += 2;
			j += 1;
			continue;
		}

		let realigned = match (old_next, new_next) {
			(Some((old_next_key, old_next_node)), Some((new_next_key, new_next_node))) if old_next_key == new_next_key => {
				// One-for-one replacement, then both sides realign.
				index += 1;
				remove_node(&mut ledger, &mut local, old_key, old_node, index);
				insert_node(&mut ledger, &mut local, &mut inserts, new_key, new_node, Some(j));
				index += old_node.descendants();

				index += 1;
				diff_help(old_next_node, new_next_node, &mut local, index);
				index += old_next_node.descendants();

				i += 2;
				j += 2;
				true
			}
			_ => false,
		};
		if !realigned {
			// No alignment within one step of lookahead; the remainder sweep
			// takes over.
			break;
		}
	}

	while i < old.len() {
		index += 1;
		let (key, node) = &old[i];
		remove_node(&mut ledger, &mut local, key, node, index);
		index += node.descendants();
		i += 1;
	}

	for (key, node) in &new[j..] {
		insert_node(&mut ledger, &mut local, &mut trailing, key, node, None);
	}

	if !local.is_empty() || !inserts.is_empty() || !trailing.is_empty() {
		patches.push(Patch {
			index: root_index,
			kind: PatchKind::Reorder(Reorder { sub: local, inserts, trailing }),
		});
	}
}

/// Registers `vnode` as entering at `target` (`None` appends at the end).
///
/// A key already recorded as removed resolves into a move: the earlier plain
/// remove patch is upgraded to carry the pair's sub-patches and the shared
/// ledger entry, and the insert reuses the removed child's live node.
fn insert_node<L: LiveNode>(
	ledger: &mut HashMap<String, EntryHandle<L>>,
	local: &mut Vec<Patch<L>>,
	inserts: &mut Vec<InsertRecord<L>>,
	key: &str,
	vnode: &Node<L>,
	target: Option<usize>,
) {
	match ledger.get(key).cloned() {
		None => {
			let entry = LedgerEntry::handle(EntryStatus::Inserted, vnode.clone(), target, 0, usize::MAX);
			inserts.push(InsertRecord { target, entry: entry.clone() });
			ledger.insert(key.to_owned(), entry);
		}
		Some(entry) => {
			let removed = entry.borrow().status == EntryStatus::Removed;
			if removed {
				inserts.push(InsertRecord { target, entry: entry.clone() });

				let (old_vnode, diff_base, removed_at) = {
					let entry = entry.borrow();
					(entry.vnode.clone(), entry.diff_base, entry.removed_at)
				};
				let mut sub = Vec::new();
				diff_help(&old_vnode, vnode, &mut sub, diff_base);
				{
					let mut entry = entry.borrow_mut();
					entry.status = EntryStatus::Reconciled;
					entry.target = target;
				}
				local[removed_at].kind = PatchKind::RemoveKeyed(Some(KeyedMove { sub, entry }));
			} else {
				warn!("Duplicate key {:?} among keyed children. Treating the duplicate as a distinct key.", key);
				let key = format!("{}{}", key, DUPLICATE_KEY_SUFFIX);
				insert_node(ledger, local, inserts, &key, vnode, target);
			}
		}
	}
}

/// Registers `vnode` as leaving its slot at traversal position `index`.
///
/// A key already recorded as inserted resolves into a move: the remove patch
/// carries the pair's sub-patches, and application stashes the live node for
/// the insert instead of detaching it for good.
fn remove_node<L: LiveNode>(ledger: &mut HashMap<String, EntryHandle<L>>, local: &mut Vec<Patch<L>>, key: &str, vnode: &Node<L>, index: usize) {
	match ledger.get(key).cloned() {
		None => {
			local.push(Patch {
				index,
				kind: PatchKind::RemoveKeyed(None),
			});
			let entry = LedgerEntry::handle(EntryStatus::Removed, vnode.clone(), None, index, local.len() - 1);
			ledger.insert(key.to_owned(), entry);
		}
		Some(entry) => {
			let inserted = entry.borrow().status == EntryStatus::Inserted;
			if inserted {
				let new_vnode = entry.borrow().vnode.clone();
				let mut sub = Vec::new();
				diff_help(vnode, &new_vnode, &mut sub, index);
				entry.borrow_mut().status = EntryStatus::Reconciled;
				local.push(Patch {
					index,
					kind: PatchKind::RemoveKeyed(Some(KeyedMove { sub, entry })),
				});
			} else {
				warn!("Duplicate key {:?} among keyed children. Treating the duplicate as a distinct key.", key);
				let key = format!("{}{}", key, DUPLICATE_KEY_SUFFIX);
				remove_node(ledger, local, &key, vnode, index);
			}
		}
	}
}
