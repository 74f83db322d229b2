//! Patch-shape properties of the pure diff: what gets emitted, where, and
//! crucially what does not.

use std::{cell::Cell, rc::Rc};
use weft_dom::{diff, element, keyed_element, patch::EntryStatus, tagged, text, thunk, CacheKey, Directive, EventHandler, Mapper, Node, PatchKind};

use mem_host_::init_logging;

type N = Node<()>;

fn item(key: &'static str, label: &str) -> (&'static str, N) {
	(key, element("li", vec![], vec![text(label)]))
}

#[test]
fn identical_allocations_produce_no_patches() {
	init_logging();
	let tree: N = element("div", vec![], vec![text("a"), element("span", vec![], vec![text("b")])]);
	assert!(diff(&tree, &tree).is_empty());
}

#[test]
fn structurally_equal_trees_produce_no_patches() {
	init_logging();
	let handler = EventHandler::new(|_| None);
	let build = |handler: &EventHandler| -> N {
		element(
			"div",
			vec![
				Directive::attribute("id", "root"),
				Directive::style("color", "red"),
				Directive::on("click", handler.clone()),
			],
			vec![text("a"), element("span", vec![], vec![text("b")])],
		)
	};
	assert!(diff(&build(&handler), &build(&handler)).is_empty());
}

#[test]
fn changed_text_patches_at_its_traversal_index() {
	init_logging();
	let old: N = element("div", vec![], vec![text("a"), text("b")]);
	let new: N = element("div", vec![], vec![text("a"), text("c")]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index, 2);
	match &patches[0].kind {
		PatchKind::Text(content) => assert_eq!(&**content, "c"),
		other => panic!("expected a text patch, got {}", other.name()),
	}
}

#[test]
fn removed_trailing_children_collapse_to_one_patch() {
	init_logging();
	let old: N = element("div", vec![], vec![text("a"), text("b"), text("c")]);
	let new: N = element("div", vec![], vec![text("a"), text("b")]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index, 0);
	match &patches[0].kind {
		PatchKind::RemoveTrailing { keep, drop } => {
			assert_eq!(*keep, 2);
			assert_eq!(*drop, 1);
		}
		other => panic!("expected a remove-trailing patch, got {}", other.name()),
	}
}

#[test]
fn appended_trailing_children_collapse_to_one_patch() {
	init_logging();
	let old: N = element("div", vec![], vec![text("a"), text("b")]);
	let new: N = element("div", vec![], vec![text("a"), text("b"), text("c"), text("d")]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	match &patches[0].kind {
		PatchKind::AppendTrailing { start, children } => {
			assert_eq!(*start, 2);
			assert_eq!(children.len(), 2);
		}
		other => panic!("expected an append-trailing patch, got {}", other.name()),
	}
}

#[test]
fn changed_tag_redraws_without_recursing() {
	init_logging();
	let old: N = element("div", vec![], vec![text("a"), text("b")]);
	let new: N = element("span", vec![], vec![text("a"), text("changed")]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index, 0);
	assert!(matches!(patches[0].kind, PatchKind::Redraw(_)));
}

#[test]
fn thunks_with_equal_keys_are_skipped_without_building() {
	init_logging();
	let new_built = Rc::new(Cell::new(false));
	let witness = new_built.clone();

	let old: N = thunk(vec![CacheKey::Int(1), CacheKey::from("row")], || text("cached"));
	let new: N = thunk(vec![CacheKey::Int(1), CacheKey::from("row")], move || {
		witness.set(true);
		text("cached")
	});

	assert!(diff(&old, &new).is_empty());
	assert!(!new_built.get(), "the new thunk's build ran despite equal cache keys");
}

#[test]
fn thunks_with_changed_keys_diff_their_realized_subtrees() {
	init_logging();
	let old: N = thunk(vec![CacheKey::Int(1)], || element("div", vec![], vec![text("v1")]));
	let new: N = thunk(vec![CacheKey::Int(2)], || element("div", vec![], vec![text("v2")]));

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index, 0);
	match &patches[0].kind {
		PatchKind::ThunkRecurse(sub) => {
			assert_eq!(sub.len(), 1);
			assert!(matches!(sub[0].kind, PatchKind::Text(_)));
		}
		other => panic!("expected a thunk-recurse patch, got {}", other.name()),
	}
}

#[test]
fn changed_mapper_retags_without_touching_the_subtree() {
	init_logging();
	let inner: N = element("div", vec![], vec![text("a")]);
	let old = tagged(Mapper::new(|msg| msg), inner.clone());
	let new = tagged(Mapper::new(|msg| msg), inner);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index, 0);
	assert!(matches!(patches[0].kind, PatchKind::Retag(_)));
}

#[test]
fn shared_mapper_produces_no_patches() {
	init_logging();
	let mapper = Mapper::new(|msg| msg);
	let inner: N = element("div", vec![], vec![text("a")]);
	let old = tagged(mapper.clone(), inner.clone());
	let new = tagged(mapper, inner);

	assert!(diff(&old, &new).is_empty());
}

#[test]
fn changed_tagger_arity_redraws() {
	init_logging();
	let mapper = Mapper::new(|msg| msg);
	let inner: N = element("div", vec![], vec![text("a")]);
	let old = tagged(mapper.clone(), tagged(mapper.clone(), inner.clone()));
	let new = tagged(mapper, inner);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert!(matches!(patches[0].kind, PatchKind::Redraw(_)));
}

#[test]
fn toggling_keyedness_does_not_redraw() {
	init_logging();
	let plain: N = element("ul", vec![], vec![element("li", vec![], vec![text("a")])]);
	let keyed: N = keyed_element("ul", vec![], vec![("a", element("li", vec![], vec![text("a")]))]);

	assert!(diff(&plain, &keyed).is_empty());
	assert!(diff(&keyed, &plain).is_empty());
}

#[test]
fn keyed_rotation_is_one_reorder_with_a_single_move() {
	init_logging();
	let a = item("a", "alpha");
	let b = item("b", "beta");
	let c = item("c", "gamma");

	let old: N = keyed_element("ul", vec![], vec![a.clone(), b.clone(), c.clone()]);
	let new: N = keyed_element("ul", vec![], vec![c, a, b]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	match &patches[0].kind {
		PatchKind::Reorder(reorder) => {
			// One move pair, zero redundant diffs of the unmoved children.
			assert_eq!(reorder.inserts.len(), 1);
			assert_eq!(reorder.inserts[0].target, Some(0));
			assert!(reorder.trailing.is_empty());
			assert_eq!(reorder.sub.len(), 1);
			match &reorder.sub[0].kind {
				PatchKind::RemoveKeyed(Some(keyed_move)) => {
					assert_eq!(keyed_move.entry.borrow().status, EntryStatus::Reconciled);
					assert!(keyed_move.sub.is_empty());
				}
				other => panic!("expected the move's remove half, got {}", other.name()),
			}
		}
		other => panic!("expected a reorder patch, got {}", other.name()),
	}
}

#[test]
fn keyed_equal_lists_produce_no_patches() {
	init_logging();
	let a = item("a", "alpha");
	let b = item("b", "beta");
	let old: N = keyed_element("ul", vec![], vec![a.clone(), b.clone()]);
	let new: N = keyed_element("ul", vec![], vec![a, b]);

	assert!(diff(&old, &new).is_empty());
}

#[test]
fn duplicated_key_degrades_without_panicking() {
	init_logging();
	let old: N = keyed_element("ul", vec![], vec![item("k", "x")]);
	let new: N = keyed_element("ul", vec![], vec![item("k", "y1"), item("k", "y2")]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	match &patches[0].kind {
		PatchKind::Reorder(reorder) => {
			// The matched pair diffs in place; the duplicate arrives as an
			// independent trailing insert.
			assert_eq!(reorder.trailing.len(), 1);
			assert!(reorder.inserts.is_empty());
		}
		other => panic!("expected a reorder patch, got {}", other.name()),
	}
}

#[test]
fn duplicate_removals_become_independent_removes() {
	init_logging();
	let old: N = keyed_element("ul", vec![], vec![item("k", "x1"), item("k", "x2")]);
	let new: N = keyed_element("ul", vec![], vec![item("z", "zed")]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	match &patches[0].kind {
		PatchKind::Reorder(reorder) => {
			let removes = reorder
				.sub
				.iter()
				.filter(|patch| matches!(patch.kind, PatchKind::RemoveKeyed(None)))
				.count();
			assert_eq!(removes, 2);
			assert_eq!(reorder.trailing.len(), 1);
		}
		other => panic!("expected a reorder patch, got {}", other.name()),
	}
}

#[test]
fn descendant_counts_add_up() {
	init_logging();
	let leafy: N = element("div", vec![], vec![text("a"), text("b")]);
	assert_eq!(leafy.descendants(), 2);

	let tagged_node = tagged(Mapper::new(|msg| msg), leafy.clone());
	assert_eq!(tagged_node.descendants(), 3);

	let keyed: N = keyed_element("ul", vec![], vec![item("a", "alpha"), item("b", "beta")]);
	assert_eq!(keyed.descendants(), 4);

	let lazy: N = thunk(vec![CacheKey::Int(7)], || element("div", vec![], vec![text("deep")]));
	assert_eq!(lazy.descendants(), 0);

	let root: N = element("main", vec![], vec![tagged_node, keyed, lazy]);
	assert_eq!(root.descendants(), 4 + 5 + 1);

	match &root {
		Node::Element(element) => {
			let summed: usize = element.children.iter().map(|child| 1 + child.descendants()).sum();
			assert_eq!(element.descendants, summed);
		}
		_ => unreachable!(),
	}
}
