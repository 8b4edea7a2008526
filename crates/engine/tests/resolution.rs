mod common;

use std::net::IpAddr;

use blockwire_engine::{
    Capability, EngineError, Graph, GraphResolver, Link, Locale, Node, NodeId, launch,
};
use common::{Connection, Counter, Hostname, Sum, fixture};

#[test]
fn constant_feeds_static_factory_end_to_end() {
    let fixture = fixture();
    let graph = Graph::new(
        [Node::constant(1, "int", "42"), Node::block(2, "demo.Counter", "of")],
        [Link::argument(1, 2, "value")],
    )
    .expect("valid graph");

    let mut app = launch(&graph, fixture.registry.clone()).expect("launch");
    assert_eq!(app.get::<Counter>(NodeId(2)), Some(Counter { count: 42 }));
    assert_eq!(app.get::<i32>(NodeId(1)), Some(42));
    assert_eq!(fixture.counter_calls(), 1);

    app.close().expect("nothing to release");
    assert!(fixture.journal().is_empty());
}

#[test]
fn link_free_factory_does_not_touch_other_nodes() {
    let fixture = fixture();
    let graph = Graph::new(
        [Node::block(0, "demo.Counter", "of"), Node::block(1, "demo.Counter", "fresh")],
        [],
    )
    .expect("valid graph");

    let mut resolver = GraphResolver::new(&graph, fixture.registry.clone());
    let fresh = resolver.resolve_node(NodeId(1)).expect("fresh counter");
    assert_eq!(fresh.cloned::<Counter>(), Some(Counter { count: 0 }));
    assert_eq!(fixture.counter_calls(), 0);
    assert_eq!(resolver.report().blocks_constructed, 1);
}

#[test]
fn repeated_resolution_returns_the_same_value() {
    let fixture = fixture();
    let graph = Graph::new(
        [
            Node::constant(0, "int", "7"),
            Node::block(1, "demo.Counter", "of"),
            Node::block(2, "demo.Counter", "of"),
            Node::block(3, "demo.Counter", "of"),
        ],
        [
            Link::argument(0, 1, "value"),
            Link::argument(1, 2, "value").from_output("count"),
            Link::argument(1, 3, "value").from_output("count"),
        ],
    )
    .expect("valid graph");

    let mut resolver = GraphResolver::new(&graph, fixture.registry.clone());
    let first = resolver.resolve_node(NodeId(1)).expect("first");
    let second = resolver.resolve_node(NodeId(1)).expect("second");
    assert!(first.ptr_eq(&second));

    let app = resolver.resolve().expect("resolve");
    assert_eq!(fixture.counter_calls(), 3);
    assert_eq!(app.report().accessor_calls, 1);
    assert_eq!(app.get::<Counter>(NodeId(3)), Some(Counter { count: 7 }));
    assert!(app.value(NodeId(1)).is_some_and(|value| value.ptr_eq(&first)));
}

#[test]
fn variadic_arguments_follow_link_indices() {
    let fixture = fixture();
    let graph = Graph::new(
        [
            Node::constant(1, "String", "X"),
            Node::constant(2, "String", "Y"),
            Node::constant(3, "String", "Z"),
            Node::block(4, "demo.Sum", "of"),
        ],
        [
            Link::argument(3, 4, "values").at_index(2),
            Link::argument(1, 4, "values").at_index(0),
            Link::argument(2, 4, "values").at_index(1),
        ],
    )
    .expect("valid graph");

    let app = launch(&graph, fixture.registry.clone()).expect("launch");
    assert_eq!(app.with_value(NodeId(4), |sum: &Sum| sum.values.clone()), Some(vec!["X".to_string(), "Y".to_string(), "Z".to_string()]));
}

#[test]
fn unbound_variadic_parameter_is_empty() {
    let fixture = fixture();
    let graph = Graph::new([Node::block(0, "demo.Sum", "of")], []).expect("valid graph");

    let app = launch(&graph, fixture.registry.clone()).expect("launch");
    assert_eq!(app.get::<Sum>(NodeId(0)), Some(Sum { values: Vec::new() }));
}

#[test]
fn dependent_block_uses_its_parent_as_receiver() {
    let fixture = fixture();
    let graph = Graph::new(
        [
            Node::constant(0, "int", "4"),
            Node::block(1, "demo.Pool", "open"),
            Node::dependent(2, 1, "connect"),
            Node::constant(3, "String", "primary"),
            Node::dependent(4, 1, "connect"),
        ],
        [Link::argument(0, 1, "size"), Link::argument(3, 4, "label")],
    )
    .expect("valid graph");

    let mut app = launch(&graph, fixture.registry.clone()).expect("launch");
    let unlabeled = app.get::<Connection>(NodeId(2)).expect("connection");
    assert_eq!(unlabeled.pool_size, 4);
    assert_eq!(unlabeled.label, None);
    assert_eq!(app.get::<Connection>(NodeId(4)).and_then(|connection| connection.label), Some("primary".to_string()));

    app.close().expect("release");
    assert_eq!(fixture.journal(), vec!["close connection primary", "close connection -", "close pool 4"]);
}

#[test]
fn inputs_are_wired_after_construction() {
    let fixture = fixture();
    let graph = Graph::new(
        [
            Node::constant(0, "int", "40"),
            Node::constant(1, "int", "2"),
            Node::block(2, "demo.Counter", "of"),
            Node::constant(3, "String", "A"),
            Node::constant(4, "String", "B"),
            Node::block(5, "demo.Sum", "of"),
        ],
        [
            Link::argument(0, 2, "value"),
            Link::input(1, 2, "add"),
            Link::input(4, 5, "extra").at_index(1),
            Link::input(3, 5, "extra").at_index(0),
        ],
    )
    .expect("valid graph");

    let app = launch(&graph, fixture.registry.clone()).expect("launch");
    assert_eq!(app.get::<Counter>(NodeId(2)), Some(Counter { count: 42 }));
    assert_eq!(app.get::<Sum>(NodeId(5)), Some(Sum { values: vec!["A".to_string(), "B".to_string()] }));
    assert_eq!(app.report().wiring_calls, 2);
}

#[test]
fn input_reads_are_taken_before_any_mutator_runs() {
    let fixture = fixture();
    // Counter 2 feeds its own count into counter 1; counter 1 feeds counter 2.
    // Both reads happen against the constructed values, before either `add`.
    let graph = Graph::new(
        [
            Node::constant(0, "int", "10"),
            Node::block(1, "demo.Counter", "of"),
            Node::block(2, "demo.Counter", "of"),
        ],
        [
            Link::argument(0, 1, "value"),
            Link::argument(0, 2, "value"),
            Link::input(2, 1, "add").from_output("count"),
            Link::input(1, 2, "add").from_output("count"),
        ],
    )
    .expect("valid graph");

    let app = launch(&graph, fixture.registry.clone()).expect("launch");
    assert_eq!(app.get::<Counter>(NodeId(1)), Some(Counter { count: 20 }));
    assert_eq!(app.get::<Counter>(NodeId(2)), Some(Counter { count: 20 }));
}

#[test]
fn builtin_constant_kinds_are_parsed() {
    let fixture = fixture();
    let graph = Graph::new(
        [
            Node::constant(0, "int[]", "1, 2,3"),
            Node::constant(1, "boolean", "TRUE"),
            Node::constant(2, "InetAddress", "127.0.0.1"),
            Node::constant(3, "Locale", "en_us"),
            Node::constant(4, "String", "  spaced  "),
            Node::constant(5, "String[]", ""),
        ],
        [],
    )
    .expect("valid graph");

    let app = launch(&graph, fixture.registry.clone()).expect("launch");
    assert_eq!(app.get::<Vec<i32>>(NodeId(0)), Some(vec![1, 2, 3]));
    assert_eq!(app.get::<bool>(NodeId(1)), Some(true));
    assert_eq!(app.get::<IpAddr>(NodeId(2)), Some(IpAddr::from([127, 0, 0, 1])));
    assert_eq!(app.get::<Locale>(NodeId(3)).map(|locale| locale.to_string()), Some("en_US".to_string()));
    assert_eq!(app.get::<String>(NodeId(4)).as_deref(), Some("  spaced  "));
    assert_eq!(app.get::<Vec<String>>(NodeId(5)), Some(Vec::new()));
    assert_eq!(app.report().constants_resolved, 6);
}

#[test]
fn unknown_constant_kind_falls_back_to_a_registered_literal_factory() {
    let fixture = fixture();
    let graph = Graph::new([Node::constant(0, "demo.Hostname", "Example.COM")], []).expect("valid graph");

    let app = launch(&graph, fixture.registry.clone()).expect("launch");
    assert_eq!(app.get::<Hostname>(NodeId(0)), Some(Hostname("example.com".to_string())));
}

#[test]
fn unparseable_literals_name_the_constant() {
    let fixture = fixture();

    let graph = Graph::new([Node::constant(3, "int", "forty")], []).expect("valid graph");
    let error = launch(&graph, fixture.registry.clone()).expect_err("not a number");
    assert!(matches!(error, EngineError::Parse { node: NodeId(3), .. }), "{error}");

    let graph = Graph::new([Node::constant(5, "demo.Hostname", "two words")], []).expect("valid graph");
    let error = launch(&graph, fixture.registry.clone()).expect_err("factory rejects the literal");
    assert!(matches!(error, EngineError::Parse { node: NodeId(5), .. }), "{error}");

    let graph = Graph::new([Node::constant(6, "demo.Unknown", "x")], []).expect("valid graph");
    let error = launch(&graph, fixture.registry.clone()).expect_err("no such kind");
    assert!(
        matches!(
            error,
            EngineError::NoSuchCapability {
                node: NodeId(6),
                capability: Capability::LiteralFactory { .. }
            }
        ),
        "{error}"
    );
}

#[test]
fn unknown_factories_are_reported_as_missing_capabilities() {
    let fixture = fixture();

    let graph = Graph::new([Node::block(1, "demo.Counter", "missing")], []).expect("valid graph");
    let error = launch(&graph, fixture.registry.clone()).expect_err("no such factory");
    match error {
        EngineError::NoSuchCapability { node, capability } => {
            assert_eq!(node, NodeId(1));
            assert_eq!(
                capability,
                Capability::StaticFactory {
                    type_name: "demo.Counter".to_string(),
                    operation: "missing".to_string(),
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }

    let graph = Graph::new(
        [Node::constant(0, "int", "1"), Node::block(1, "demo.Pool", "open"), Node::dependent(2, 1, "teleport")],
        [Link::argument(0, 1, "size")],
    )
    .expect("valid graph");
    let error = launch(&graph, fixture.registry.clone()).expect_err("no such instance factory");
    assert!(
        matches!(
            &error,
            EngineError::NoSuchCapability {
                node: NodeId(2),
                capability: Capability::InstanceFactory { type_name, .. }
            } if type_name == "demo.Pool"
        ),
        "{error}"
    );
}
