//! Journal behavior: recording, transcripts, replay, and linear undo/redo

use flow_graph::{equivalent, Graph, Journal, Metadata};
use serde_json::{json, Value};

fn meta(pairs: &[(&str, Value)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn attaching_to_an_initialized_graph_yields_one_initial_transaction() {
    init_tracing();
    let mut g = Graph::new();
    g.add_node("Foo", "Bar").unwrap();
    g.add_node("Baz", "Foo").unwrap();
    g.add_edge("Foo", "out", "Baz", "in").unwrap();

    let mut j = Journal::attach(g);
    assert_eq!(j.last_revision(), 0);
}

#[test]
fn each_unbracketed_change_creates_one_transaction() {
    let mut j = Journal::attach(Graph::new());
    j.graph_mut().add_node("Foo", "Bar").unwrap();
    j.graph_mut().add_node("Baz", "Foo").unwrap();
    j.graph_mut().add_edge("Foo", "out", "Baz", "in").unwrap();
    assert_eq!(j.last_revision(), 3);
    j.graph_mut().remove_node("Baz").unwrap();
    assert_eq!(j.last_revision(), 4);
}

#[test]
fn transcript_is_human_readable() {
    let mut j = Journal::attach(Graph::new());

    let g = j.graph_mut();
    g.start_transaction("test1").unwrap();
    g.add_node("Foo", "Bar").unwrap();
    g.add_node("Baz", "Foo").unwrap();
    g.add_edge("Foo", "out", "Baz", "in").unwrap();
    g.add_initial(json!(42), "Foo", "in").unwrap();
    g.remove_node("Foo").unwrap();
    g.end_transaction("test1").unwrap();

    g.start_transaction("test2").unwrap();
    g.remove_node("Baz").unwrap();
    g.end_transaction("test2").unwrap();

    let expected = "\
>>> 0: initial
<<< 0: initial
>>> 1: test1
Foo(Bar)
Baz(Foo)
Foo out -> in Baz
'42' -> in Foo
META Foo out -> in Baz
Foo out -X> in Baz
'42' -X> in Foo
META Foo
DEL Foo(Bar)
<<< 1: test1";
    assert_eq!(j.to_pretty_string(0, 2), expected);
}

#[test]
fn jumping_to_revision_changes_the_graph() {
    let mut j = Journal::attach(Graph::new());
    j.graph_mut().add_node("Foo", "Bar").unwrap();
    j.graph_mut().add_node("Baz", "Foo").unwrap();
    j.graph_mut().add_edge("Foo", "out", "Baz", "in").unwrap();
    j.graph_mut().add_initial(json!(42), "Foo", "in").unwrap();
    j.graph_mut().remove_node("Foo").unwrap();

    j.move_to_revision(0).unwrap();
    assert_eq!(j.graph().nodes().len(), 0);
    j.move_to_revision(2).unwrap();
    assert_eq!(j.graph().nodes().len(), 2);
    j.move_to_revision(5).unwrap();
    assert_eq!(j.graph().nodes().len(), 1);
}

#[test]
fn linear_undo_and_redo() {
    let mut j = Journal::attach(Graph::new());
    j.graph_mut().add_node("Foo", "Bar").unwrap();
    j.graph_mut().add_node("Baz", "Foo").unwrap();
    j.graph_mut().add_edge("Foo", "out", "Baz", "in").unwrap();
    j.graph_mut().add_initial(json!(42), "Foo", "in").unwrap();
    let before_removal = j.graph().clone();

    // undo restores the previous revision
    assert_eq!(j.graph().nodes().len(), 2);
    j.graph_mut().remove_node("Foo").unwrap();
    assert_eq!(j.graph().nodes().len(), 1);
    j.undo().unwrap();
    assert_eq!(j.graph().nodes().len(), 2);
    assert!(equivalent(j.graph(), &before_removal));

    // redo applies the same change again
    j.redo().unwrap();
    assert_eq!(j.graph().nodes().len(), 1);

    // undo works multiple revisions back
    j.graph_mut().remove_node("Baz").unwrap();
    j.undo().unwrap();
    j.undo().unwrap();
    assert_eq!(j.graph().nodes().len(), 2);
    assert!(equivalent(j.graph(), &before_removal));
}

#[test]
fn undo_redo_pair_is_a_no_op() {
    let mut j = Journal::attach(Graph::new());
    j.graph_mut().add_node("Foo", "Bar").unwrap();
    j.graph_mut().add_node("Baz", "Foo").unwrap();
    let live = j.graph().clone();
    let revision = j.current_revision();

    j.undo().unwrap();
    j.redo().unwrap();
    assert_eq!(j.current_revision(), revision);
    assert!(equivalent(j.graph(), &live));

    // both directions are no-ops at their bounds
    j.redo().unwrap();
    assert_eq!(j.current_revision(), revision);
    j.move_to_revision(0).unwrap();
    j.undo().unwrap();
    assert_eq!(j.current_revision(), 0);
}

#[test]
fn undo_redo_of_group_changes() {
    let mut j = Journal::attach(Graph::new());
    j.graph_mut().add_node("Foo", "Bar").unwrap();
    j.graph_mut().add_node("Baz", "Foo").unwrap();
    j.graph_mut().add_edge("Foo", "out", "Baz", "in").unwrap();

    // adding a group; membership may reference unknown nodes
    j.graph_mut()
        .add_group(
            "all",
            vec!["Foo".to_string(), "Bax".to_string()],
            meta(&[("label", json!("all nodes"))]),
        )
        .unwrap();
    assert_eq!(j.graph().groups().len(), 1);
    assert_eq!(j.graph().groups()[0].name, "all");

    j.undo().unwrap();
    assert_eq!(j.graph().groups().len(), 0);

    j.redo().unwrap();
    assert_eq!(
        j.graph().groups()[0].metadata.get("label"),
        Some(&json!("all nodes"))
    );

    // changing group metadata adds a revision
    let r = j.last_revision();
    j.graph_mut()
        .set_group_metadata("all", meta(&[("label", json!("ALL NODES!"))]))
        .unwrap();
    assert_eq!(j.last_revision(), r + 1);

    j.undo().unwrap();
    assert_eq!(
        j.graph().group("all").unwrap().metadata.get("label"),
        Some(&json!("all nodes"))
    );

    j.redo().unwrap();
    assert_eq!(
        j.graph().group("all").unwrap().metadata.get("label"),
        Some(&json!("ALL NODES!"))
    );
}

#[test]
fn undo_redo_of_node_metadata() {
    let mut j = Journal::attach(Graph::new());
    j.graph_mut().add_node("Foo", "Bar").unwrap();

    j.graph_mut()
        .set_node_metadata("Foo", meta(&[("oneone", json!(11)), ("2", json!("two"))]))
        .unwrap();
    assert_eq!(j.graph().node("Foo").unwrap().metadata.len(), 2);

    j.undo().unwrap();
    assert_eq!(j.graph().node("Foo").unwrap().metadata.len(), 0);

    j.redo().unwrap();
    assert_eq!(
        j.graph().node("Foo").unwrap().metadata.get("oneone"),
        Some(&json!(11))
    );
}

#[test]
fn detaching_returns_the_live_document() {
    let mut j = Journal::attach(Graph::new());
    j.graph_mut().add_node("Foo", "Bar").unwrap();
    j.graph_mut().remove_node("Foo").unwrap();
    j.undo().unwrap();
    let g = j.into_graph();
    assert!(g.node("Foo").is_some());
}
