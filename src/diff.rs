use crate::facts::diff_facts;
use crate::host::LiveNode;
use crate::keyed::diff_keyed_children;
use crate::node::{Element, Node, TaggedNode};
use crate::patch::{Patch, PatchKind};
use std::rc::Rc;
use tracing::{trace, trace_span};

/// Diffs two tree descriptions into a flat patch list ordered by ascending
/// traversal index.
///
/// Diffing is total over well-formed node pairs: structural mismatches are
/// not errors, they resolve to a single redraw patch for the mismatched
/// subtree.
#[must_use]
pub fn diff<L: LiveNode>(old: &Node<L>, new: &Node<L>) -> Vec<Patch<L>> {
	let span = trace_span!("diff", old = ?old, new = ?new);
	let _enter = span.enter();

	let mut patches = Vec::new();
	diff_help(old, new, &mut patches, 0);
	patches
}

#[allow(clippy::too_many_lines)]
pub(crate) fn diff_help<L: LiveNode>(old: &Node<L>, new: &Node<L>, patches: &mut Vec<Patch<L>>, index: usize) {
	if old.same_identity(new) {
		return;
	}

	match (old, new) {
		(Node::Thunk(old_thunk), Node::Thunk(new_thunk)) => {
			let span = trace_span!("Diffing thunk", keys = old_thunk.keys.len());
			let _enter = span.enter();

			let matched = old_thunk.keys.len() == new_thunk.keys.len() && old_thunk.keys.iter().zip(&new_thunk.keys).all(|(a, b)| a == b);
			if matched {
				trace!("Cache keys matched. Reusing the realized subtree.");
				new_thunk.adopt(old_thunk.realize());
				return;
			}

			let realized_old = old_thunk.realize();
			let realized_new = new_thunk.realize();
			let mut sub = Vec::new();
			diff_help(&realized_old, &realized_new, &mut sub, index);
			if !sub.is_empty() {
				patches.push(Patch {
					index,
					kind: PatchKind::ThunkRecurse(sub),
				});
			}
		}

		(Node::Tagged(old_tagged), Node::Tagged(new_tagged)) => {
			let span = trace_span!("Diffing tagged");
			let _enter = span.enter();

			let (old_mappers, old_inner) = flatten_tagged(old_tagged);
			let (new_mappers, new_inner) = flatten_tagged(new_tagged);

			// A different nesting arity is a structural mismatch.
			if old_mappers.len() != new_mappers.len() {
				patches.push(Patch {
					index,
					kind: PatchKind::Redraw(new.clone()),
				});
				return;
			}

			if old_mappers.iter().zip(&new_mappers).any(|(a, b)| a != b) {
				patches.push(Patch {
					index,
					kind: PatchKind::Retag(new_mappers),
				});
			}

			diff_help(&old_inner, &new_inner, patches, index + 1);
		}

		(Node::Text(old_text), Node::Text(new_text)) => {
			if old_text != new_text {
				patches.push(Patch {
					index,
					kind: PatchKind::Text(new_text.clone()),
				});
			}
		}

		(Node::Element(old_element), Node::Element(new_element)) => {
			diff_plain_elements(old_element, new_element, new, patches, index);
		}

		(Node::Keyed(old_keyed), Node::Keyed(new_keyed)) => {
			let span = trace_span!("Diffing keyed element", tag = &*old_keyed.tag);
			let _enter = span.enter();

			if old_keyed.tag != new_keyed.tag || old_keyed.namespace != new_keyed.namespace {
				patches.push(Patch {
					index,
					kind: PatchKind::Redraw(new.clone()),
				});
				return;
			}
			if let Some(delta) = diff_facts(&old_keyed.facts, &new_keyed.facts) {
				patches.push(Patch {
					index,
					kind: PatchKind::Facts(delta),
				});
			}
			diff_keyed_children(&old_keyed.children, &new_keyed.children, patches, index);
		}

		// Toggling whether a child list is keyed is not worth a redraw: the
		// keyed side is projected to plain children and compared as-is.
		(Node::Element(old_element), Node::Keyed(new_keyed)) => {
			diff_plain_elements(old_element, &new_keyed.dekey(), new, patches, index);
		}
		(Node::Keyed(old_keyed), Node::Element(new_element)) => {
			diff_plain_elements(&old_keyed.dekey(), new_element, new, patches, index);
		}

		(Node::Custom(old_custom), Node::Custom(new_custom)) => {
			let span = trace_span!("Diffing custom node");
			let _enter = span.enter();

			#[allow(clippy::vtable_address_comparisons)]
			let same_hooks = Rc::ptr_eq(&old_custom.render, &new_custom.render) && Rc::ptr_eq(&old_custom.diff, &new_custom.diff);
			if !same_hooks {
				patches.push(Patch {
					index,
					kind: PatchKind::Redraw(new.clone()),
				});
				return;
			}

			if let Some(delta) = diff_facts(&old_custom.facts, &new_custom.facts) {
				patches.push(Patch {
					index,
					kind: PatchKind::Facts(delta),
				});
			}
			if let Some(custom_patch) = (new_custom.diff)(&*old_custom.model, &*new_custom.model) {
				patches.push(Patch {
					index,
					kind: PatchKind::Custom(custom_patch),
				});
			}
		}

		// Mismatching node kinds: replace the subtree.
		(_, _) => {
			let span = trace_span!("Replace mismatching", old = ?old, new = ?new);
			let _enter = span.enter();

			patches.push(Patch {
				index,
				kind: PatchKind::Redraw(new.clone()),
			});
		}
	}
}

fn diff_plain_elements<L: LiveNode>(old: &Element<L>, new: &Element<L>, new_node: &Node<L>, patches: &mut Vec<Patch<L>>, index: usize) {
	let span = trace_span!("Diffing element", tag = &*old.tag);
	let _enter = span.enter();

	if old.tag != new.tag || old.namespace != new.namespace {
		patches.push(Patch {
			index,
			kind: PatchKind::Redraw(new_node.clone()),
		});
		return;
	}
	if let Some(delta) = diff_facts(&old.facts, &new.facts) {
		patches.push(Patch {
			index,
			kind: PatchKind::Facts(delta),
		});
	}
	diff_children(&old.children, &new.children, patches, index);
}

/// Pairwise diff over the common prefix, with a single bulk patch for a
/// trailing run of removed or appended children.
fn diff_children<L: LiveNode>(old: &[Node<L>], new: &[Node<L>], patches: &mut Vec<Patch<L>>, index: usize) {
	if old.len() > new.len() {
		patches.push(Patch {
			index,
			kind: PatchKind::RemoveTrailing {
				keep: new.len(),
				drop: old.len() - new.len(),
			},
		});
	} else if old.len() < new.len() {
		patches.push(Patch {
			index,
			kind: PatchKind::AppendTrailing {
				start: old.len(),
				children: new[old.len()..].to_vec(),
			},
		});
	}

	let mut index = index;
	for (old_child, new_child) in old.iter().zip(new) {
		index += 1;
		diff_help(old_child, new_child, patches, index);
		index += old_child.descendants();
	}
}

/// Collapses a run of nested tagged layers into one composite mapper list
/// (outermost first) and the first non-tagged inner node.
pub(crate) fn flatten_tagged<L: LiveNode>(tagged: &TaggedNode<L>) -> (Vec<crate::event::Mapper>, Node<L>) {
	let mut mappers = tagged.mappers.clone();
	let mut inner = tagged.inner.clone();
	while let Node::Tagged(next) = inner {
		mappers.extend(next.mappers.iter().cloned());
		inner = next.inner.clone();
	}
	(mappers, inner)
}
