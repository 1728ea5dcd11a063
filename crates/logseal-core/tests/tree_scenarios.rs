//! End-to-end tree scenarios: construction shape, validation, tamper
//! sensitivity, and append-only persistence.

use logseal_core::{
    Digest, Error, HashAlgorithm, LookupStrategy, Side, Tree, TreeConfig, render_tree,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn lines(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("2024-01-01T00:00:{i:02}Z host app[{i}]: request served"))
        .collect()
}

fn build(events: &[String]) -> Tree {
    Tree::from_events(TreeConfig::default(), events).expect("build tree")
}

fn root_of(events: &[String]) -> Digest {
    build(events).root_digest().expect("root").clone()
}

fn h(event: &str) -> Digest {
    Digest::of(event, HashAlgorithm::Sha256)
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

#[test]
fn four_events_make_a_balanced_tree() {
    let events: Vec<String> = ["a", "b", "c", "d"].iter().map(ToString::to_string).collect();
    let tree = build(&events);

    assert_eq!(tree.depth(), Some(2));
    assert_eq!(tree.leaf_count(), 4);
    assert_eq!(tree.node_count(), 7);

    let root = tree.node(tree.root().expect("root"));
    let left = tree.node(root.left().expect("left"));
    let right = tree.node(root.right().expect("right"));
    assert_eq!(left.depth(), 1);
    assert_eq!(right.depth(), 1);

    assert_eq!(tree.node(left.left().expect("a")).digest(), &h("a"));
    assert_eq!(tree.node(right.right().expect("d")).digest(), &h("d"));
}

#[test]
fn three_events_compose_as_documented() {
    let tree = Tree::from_events(TreeConfig::default(), ["a", "b", "c"]).expect("tree");

    let mut a = h("a");
    let mut b = h("b");
    let mut ab = Digest::merge(&mut a, &mut b).expect("ab");
    let mut c = h("c");
    let root = Digest::merge(&mut ab, &mut c).expect("root");

    assert_eq!(tree.root_digest().expect("root"), &root);
}

#[test]
fn every_algorithm_builds_and_validates() {
    for algorithm in HashAlgorithm::ALL {
        let tree = Tree::from_events(TreeConfig::with_algorithm(algorithm.name()), lines(9))
            .expect("tree");
        let root = tree.root_digest().expect("root");
        assert_eq!(root.algorithm(), algorithm);
        assert_eq!(root.as_bytes().len(), algorithm.output_len());
        for line in lines(9) {
            assert!(tree.is_valid_event(&line).expect("validate"), "{algorithm:?}");
        }
    }
}

#[test]
fn single_event_tree_root_is_the_leaf() {
    let tree = Tree::from_events(TreeConfig::default(), ["only"]).expect("tree");
    assert_eq!(tree.root_digest().expect("root"), &h("only"));
    assert_eq!(tree.depth(), Some(0));
    assert!(tree.is_valid_event("only").expect("validate"));

    let chain = tree.hash_chain("only").expect("chain");
    assert_eq!(chain.len(), 2);
    assert!(chain.siblings().is_empty());
}

#[test]
fn empty_input_is_rejected() {
    let err = Tree::from_events(TreeConfig::default(), Vec::<String>::new()).expect_err("empty");
    assert_eq!(err, Error::EmptyTree);
    assert_eq!(err.code().code(), "E2001");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn every_inserted_event_validates() {
    for n in [1, 2, 3, 5, 8, 13, 64, 100] {
        let events = lines(n);
        let tree = build(&events);
        for event in &events {
            assert!(tree.is_valid_event(event).expect("validate"), "n={n}");
        }
    }
}

#[test]
fn absent_event_is_not_found() {
    let tree = build(&lines(10));
    let err = tree.is_valid_event("never logged").expect_err("absent");
    assert!(matches!(err, Error::DigestNotFound(_)));
    assert!(matches!(
        tree.hash_chain("never logged"),
        Err(Error::DigestNotFound(_))
    ));
}

#[test]
fn chain_sides_match_positions() {
    let events: Vec<String> = ["a", "b", "c", "d"].iter().map(ToString::to_string).collect();
    let tree = build(&events);

    // "c" is a left child; its sibling "d" sits on the right, and the "ab"
    // subtree sits on the left one level up.
    let chain = tree.hash_chain("c").expect("chain");
    let sides: Vec<Option<Side>> = chain.siblings().iter().map(Digest::side).collect();
    assert_eq!(sides, vec![Some(Side::Right), Some(Side::Left)]);
    assert_eq!(&chain.siblings()[0], &h("d"));
    assert_eq!(chain.root(), tree.root_digest().expect("root"));
}

#[test]
fn lookup_strategies_agree() {
    let events = lines(21);
    let indexed = build(&events);
    let search = Tree::from_events(
        TreeConfig::default().lookup(LookupStrategy::Search),
        &events,
    )
    .expect("tree");

    assert_eq!(indexed.root_digest(), search.root_digest());
    for event in &events {
        assert_eq!(
            indexed.hash_chain(event).expect("indexed"),
            search.hash_chain(event).expect("search")
        );
    }
}

// ---------------------------------------------------------------------------
// Tamper sensitivity
// ---------------------------------------------------------------------------

#[test]
fn modified_event_changes_root() {
    let events = lines(12);
    let mut tampered = events.clone();
    tampered[7].push('!');
    assert_ne!(root_of(&events), root_of(&tampered));
}

#[test]
fn deleted_event_changes_root() {
    let events = lines(12);
    let mut tampered = events.clone();
    tampered.remove(3);
    assert_ne!(root_of(&events), root_of(&tampered));
}

#[test]
fn reordered_events_change_root() {
    let events = lines(12);
    let mut tampered = events.clone();
    tampered.swap(0, 1);
    assert_ne!(root_of(&events), root_of(&tampered));
}

#[test]
fn root_from_another_log_is_not_found() {
    let tree = build(&lines(12));
    let foreign = root_of(&lines(11));
    assert!(matches!(
        tree.is_valid_digest(&foreign),
        Err(Error::DigestNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Append-only persistence
// ---------------------------------------------------------------------------

#[test]
fn appended_tree_still_validates_old_events() {
    let original = lines(10);
    let mut extended = original.clone();
    extended.extend(lines(25).into_iter().skip(10));

    let tree = build(&extended);
    for event in &original {
        assert!(tree.is_valid_event(event).expect("validate"));
    }
}

#[test]
fn merged_prefix_root_survives_as_interior_node() {
    let original = lines(10);
    let signed = build(&original);
    let signed_root = signed.root_digest().expect("root").clone();

    let mut extended = Tree::default();
    extended.merge(signed).expect("merge");
    for event in lines(25).iter().skip(10) {
        extended.append_event(event).expect("append");
    }
    extended.finalize().expect("finalize");

    assert_eq!(extended.leaf_count(), 25);
    assert!(extended.is_valid_digest(&signed_root).expect("validate"));
    assert_ne!(extended.root_digest().expect("root"), &signed_root);
}

#[test]
fn render_draws_every_leaf() {
    let tree = build(&lines(5));
    let drawn = render_tree(&tree, 8).expect("render");
    assert_eq!(drawn.lines().count(), 5);
    assert!(drawn.starts_with(&tree.root_digest().expect("root").to_hex()[..8]));
}
