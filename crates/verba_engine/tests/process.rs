//! End-to-end behaviour of the observe, register, describe and visit pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use verba_engine::{
    compile, CapabilityName, CompileError, Compiler, Element, NodeFault, NodeType, Processor,
    Stage, Value,
};

/// A registration callback that records every raw value it sees.
fn recording(
    calls: &Arc<Mutex<Vec<Value>>>,
    f: impl Fn(i64) -> i64 + Send + Sync + 'static,
) -> Processor {
    let calls = Arc::clone(calls);
    Processor::new(move |raw| {
        calls.lock().unwrap().push(raw.clone());
        Ok(raw.as_int().map(&f).map(Value::Int).unwrap_or(Value::Int(6)))
    })
}

fn calls() -> Arc<Mutex<Vec<Value>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn recorded(calls: &Arc<Mutex<Vec<Value>>>) -> Vec<Value> {
    calls.lock().unwrap().clone()
}

#[test]
fn register_receives_observed_value() {
    let ty = Arc::new(NodeType::new("Test").observe(|_| Ok(Value::Int(3))));
    let seen = calls();
    compile(&Element::of(&ty), recording(&seen, |n| n)).unwrap();
    assert_eq!(recorded(&seen), vec![Value::Int(3)]);
}

#[test]
fn observe_receives_props_and_children() {
    let ty = Arc::new(NodeType::new("Test").observe(|ctx| {
        assert!(ctx.children.is_empty());
        assert_eq!(ctx.props.len(), 1);
        let num = ctx.props.get("num").and_then(Value::as_int).unwrap_or(0);
        Ok(Value::Int(num + 3))
    }));
    let seen = calls();
    compile(&Element::of(&ty).with_prop("num", 3), recording(&seen, |n| n)).unwrap();
    assert_eq!(recorded(&seen), vec![Value::Int(6)]);
}

#[test]
fn describe_receives_registered_data() {
    let described = calls();
    let sink = Arc::clone(&described);
    let ty = Arc::new(
        NodeType::new("Root")
            .observe(|_| Ok(Value::Int(3)))
            .describe(move |ctx| {
                let data = ctx.data.cloned().unwrap_or_default();
                sink.lock().unwrap().push(data.clone());
                Ok(Element::literal("test").with_prop("value", data))
            }),
    );
    let seen = calls();
    let parser = compile(&Element::of(&ty), recording(&seen, |n| n + 3)).unwrap();

    assert_eq!(recorded(&seen), vec![Value::Int(3)]);
    assert_eq!(recorded(&described), vec![Value::Int(6)]);
    assert_eq!(parser.parse("test").unwrap()[0].result, Value::Int(6));
}

fn counted_child(count: &Arc<AtomicUsize>) -> Arc<NodeType> {
    let count = Arc::clone(count);
    Arc::new(NodeType::new("Child").describe(move |ctx| {
        count.fetch_add(1, Ordering::SeqCst);
        let data = ctx.props.get("data").cloned().unwrap_or_default();
        Ok(Element::literal("test").with_prop("value", data))
    }))
}

fn parse_repeatedly(parser: &verba_engine::Parser) {
    for input in ["", "t", "te"] {
        let options = parser.parse(input).unwrap();
        assert!(!options.is_empty(), "no options for {input:?}");
    }
}

#[test]
fn parsing_does_not_redescribe() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let root = Arc::new(
        NodeType::new("Root")
            .observe(|_| Ok(Value::Null))
            .describe(move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                let data = ctx.data.cloned().unwrap_or_default();
                Ok(Element::literal("test").with_prop("value", data))
            }),
    );
    let parser = compile(&Element::of(&root), Processor::new(|_| Ok(Value::Int(6)))).unwrap();
    parse_repeatedly(&parser);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn parsing_does_not_redescribe_children() {
    let count = Arc::new(AtomicUsize::new(0));
    let child = counted_child(&count);
    let root = Arc::new(
        NodeType::new("Root")
            .observe(|_| Ok(Value::Null))
            .describe(move |ctx| {
                let data = ctx.data.cloned().unwrap_or_default();
                Ok(Element::of(&child).with_prop("data", data))
            }),
    );
    let parser = compile(&Element::of(&root), Processor::new(|_| Ok(Value::Int(6)))).unwrap();
    parse_repeatedly(&parser);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn parsing_does_not_redescribe_nested_children() {
    let count = Arc::new(AtomicUsize::new(0));
    let child = counted_child(&count);
    let root = Arc::new(
        NodeType::new("Root")
            .observe(|_| Ok(Value::Null))
            .describe(move |ctx| {
                let data = ctx.data.cloned().unwrap_or_default();
                Ok(Element::sequence(vec![
                    Element::literal("test"),
                    Element::of(&child).with_prop("data", data),
                ]))
            }),
    );
    let parser = compile(&Element::of(&root), Processor::new(|_| Ok(Value::Int(6)))).unwrap();
    parse_repeatedly(&parser);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let options = parser.parse("testtest").unwrap();
    assert_eq!(options.len(), 1);
    assert!(options[0].result.is_null());
}

#[test]
fn visit_receives_registered_data() {
    let root = Arc::new(
        NodeType::new("Root")
            .observe(|_| Ok(Value::Int(3)))
            .visit(|opt, ctx, traverser| {
                assert_eq!(opt.text.as_deref(), Some("test"));
                let data = ctx.data.cloned().unwrap_or_default();
                assert_eq!(data, Value::Int(6));
                Ok(traverser.traverse(&Element::literal("test").with_prop("value", data), opt)?)
            }),
    );
    let seen = calls();
    let parser = compile(&Element::of(&root), recording(&seen, |n| n + 3)).unwrap();
    assert_eq!(recorded(&seen), vec![Value::Int(3)]);

    let options = parser.parse("test").unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].result, Value::Int(6));
}

#[test]
fn source_runs_before_register() {
    let test = Arc::new(NodeType::new("Test"));
    let described = calls();
    let sink = Arc::clone(&described);
    let root = Arc::new(
        NodeType::new("Root")
            .observe(|_| Ok(Value::Int(3)))
            .describe(move |ctx| {
                let data = ctx.data.cloned().unwrap_or_default();
                sink.lock().unwrap().push(data.clone());
                Ok(Element::of(&test).with_prop("test", data))
            }),
    );

    let sources = calls();
    let source_log = Arc::clone(&sources);
    let seen = calls();
    let processor = recording(&seen, |n| n + 3).with_source(move |raw| {
        source_log.lock().unwrap().push(raw.clone());
        Ok(Value::Int(6))
    });
    compile(&Element::of(&root), processor).unwrap();

    assert_eq!(recorded(&sources), vec![Value::Int(3)]);
    assert_eq!(recorded(&seen), vec![Value::Int(6)]);
    assert_eq!(recorded(&described), vec![Value::Int(9)]);
}

#[test]
fn kind_source_replaces_observe_and_register() {
    let observed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&observed);
    let external = Arc::new(
        NodeType::new("Contacts")
            .observe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Int(0))
            })
            .describe(|ctx| {
                let names = ctx.data.and_then(Value::as_list).unwrap_or(&[]);
                Ok(Element::choice(
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|name| Element::literal(name).with_prop("value", name))
                        .collect(),
                ))
            }),
    );

    let seen = calls();
    let processor = recording(&seen, |n| n).with_source_for(&external, |element| {
        let element = element.as_element().ok_or("expected the element")?;
        assert_eq!(element.kind_name(), "Contacts");
        Ok(Value::List(vec!["amy".into(), "bob".into()]))
    });
    let parser = compile(&Element::of(&external), processor).unwrap();

    assert_eq!(observed.load(Ordering::SeqCst), 0);
    assert!(recorded(&seen).is_empty());
    let options = parser.parse("b").unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].result, Value::from("bob"));
}

#[test]
fn unchanged_observe_registers_once_across_compiles() {
    let ty = Arc::new(
        NodeType::new("Test")
            .observe(|ctx| Ok(ctx.props.get("n").cloned().unwrap_or_default()))
            .describe(|ctx| {
                let data = ctx.data.cloned().unwrap_or_default();
                Ok(Element::literal("x").with_prop("value", data))
            }),
    );
    let seen = calls();
    let mut compiler = Compiler::new(recording(&seen, |n| n * 2));
    let root = Element::of(&ty).with_prop("n", 4);

    compiler.compile(&root).unwrap();
    let parser = compiler.compile(&root).unwrap();
    assert_eq!(recorded(&seen), vec![Value::Int(4)]);
    assert_eq!(parser.parse("x").unwrap()[0].result, Value::Int(8));

    let changed = compiler.compile(&Element::of(&ty).with_prop("n", 5)).unwrap();
    assert_eq!(recorded(&seen), vec![Value::Int(4), Value::Int(5)]);
    assert_eq!(changed.parse("x").unwrap()[0].result, Value::Int(10));
}

#[test]
fn changed_sibling_does_not_redescribe_the_other() {
    let count = Arc::new(AtomicUsize::new(0));
    let child = counted_child(&count);
    let mut compiler = Compiler::new(Processor::identity());

    let tree = |left: i64, right: i64| {
        Element::sequence(vec![
            Element::of(&child).with_prop("data", left),
            Element::of(&child).with_prop("data", right),
        ])
    };

    compiler.compile(&tree(1, 2)).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    let parser = compiler.compile(&tree(1, 3)).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(compiler.stats().describe.hits, 1);
    assert_eq!(parser.parse("testtest").unwrap().len(), 1);
}

#[test]
fn redescribed_parent_reuses_unchanged_child() {
    let count = Arc::new(AtomicUsize::new(0));
    let child = counted_child(&count);
    let parent = Arc::new(NodeType::new("Parent").describe(move |ctx| {
        let prefix = ctx.props.get("prefix").and_then(Value::as_str).unwrap_or("");
        Ok(Element::sequence(vec![
            Element::literal(prefix),
            Element::of(&child).with_prop("data", 1),
        ]))
    }));
    let mut compiler = Compiler::new(Processor::identity());

    compiler.compile(&Element::of(&parent).with_prop("prefix", "a")).unwrap();
    compiler.compile(&Element::of(&parent).with_prop("prefix", "b")).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn node_without_describe_or_visit_fails_parse() {
    let bare = Arc::new(NodeType::new("Bare"));
    let parser = compile(&Element::of(&bare), Processor::identity()).unwrap();
    let err = parser.parse("x").unwrap_err();
    assert!(matches!(
        err,
        CompileError::MissingCapability { capability: CapabilityName::Describe, .. }
    ));
}

#[test]
fn describe_fault_aborts_compile() {
    let broken = Arc::new(NodeType::new("Broken").describe(|_| Err(NodeFault::new("no grammar"))));
    let err = compile(&Element::of(&broken), Processor::identity()).unwrap_err();
    match err {
        CompileError::Fault { kind, stage, source } => {
            assert_eq!(kind, "Broken");
            assert_eq!(stage, Stage::Describe);
            assert_eq!(source.message, "no grammar");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unmatched_input_is_not_an_error() {
    let parser = compile(&Element::literal("hello"), Processor::identity()).unwrap();
    assert!(parser.parse("goodbye").unwrap().is_empty());
}

#[test]
fn kind_source_ignores_same_named_type() {
    let routed = Arc::new(NodeType::new("Contacts").describe(|_| Ok(Element::literal("x"))));
    let local = Arc::new(
        NodeType::new("Contacts")
            .observe(|_| Ok(Value::Int(1)))
            .describe(|ctx| {
                let data = ctx.data.cloned().unwrap_or_default();
                Ok(Element::literal("y").with_prop("value", data))
            }),
    );
    let seen = calls();
    let processor = recording(&seen, |n| n + 1).with_source_for(&routed, |_| Ok(Value::Int(0)));

    let parser = compile(&Element::of(&local), processor).unwrap();
    assert_eq!(recorded(&seen), vec![Value::Int(1)]);
    assert_eq!(parser.parse("y").unwrap()[0].result, Value::Int(2));
}

#[test]
fn compile_with_cloned_processor_registers_once() {
    let ty = Arc::new(NodeType::new("Test").observe(|_| Ok(Value::Int(3))));
    let seen = calls();
    let processor = recording(&seen, |n| n);
    let root = Element::of(&ty);

    compile(&root, processor.clone()).unwrap();
    compile(&root, processor.clone()).unwrap();
    assert_eq!(recorded(&seen), vec![Value::Int(3)]);
    assert_eq!(processor.cache_stats().observe.hits, 1);

    // A fresh processor starts from an empty cache.
    let fresh = calls();
    compile(&root, recording(&fresh, |n| n)).unwrap();
    assert_eq!(recorded(&fresh), vec![Value::Int(3)]);
}

#[test]
fn visit_delegating_to_observing_node_registers_once() {
    let inner = Arc::new(
        NodeType::new("Inner")
            .observe(|_| Ok(Value::Int(3)))
            .describe(|ctx| {
                let data = ctx.data.cloned().unwrap_or_default();
                Ok(Element::literal("test").with_prop("value", data))
            }),
    );
    let outer = Arc::new(NodeType::new("Outer").visit(move |opt, _, traverser| {
        Ok(traverser.traverse(&Element::of(&inner), opt)?)
    }));
    let seen = calls();
    let parser = compile(&Element::of(&outer), recording(&seen, |n| n + 3)).unwrap();
    assert!(recorded(&seen).is_empty());

    for input in ["", "t", "test"] {
        let options = parser.parse(input).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].result, Value::Int(6));
    }
    assert_eq!(recorded(&seen), vec![Value::Int(3)]);
}

#[test]
fn unchanged_parent_skips_nested_observing_child() {
    let observed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&observed);
    let child = Arc::new(
        NodeType::new("Child")
            .observe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Int(2))
            })
            .describe(|ctx| {
                let data = ctx.data.cloned().unwrap_or_default();
                Ok(Element::literal("c").with_prop("value", data))
            }),
    );
    let described = Arc::new(AtomicUsize::new(0));
    let parent_count = Arc::clone(&described);
    let parent = Arc::new(NodeType::new("Parent").describe(move |_| {
        parent_count.fetch_add(1, Ordering::SeqCst);
        Ok(Element::sequence(vec![
            Element::literal("p"),
            Element::of(&child),
        ]))
    }));
    let seen = calls();
    let processor = recording(&seen, |n| n * 10);
    let root = Element::of(&parent);

    let first = compile(&root, processor.clone()).unwrap();
    let second = compile(&root, processor.clone()).unwrap();

    assert_eq!(described.load(Ordering::SeqCst), 1);
    assert_eq!(observed.load(Ordering::SeqCst), 1);
    assert_eq!(recorded(&seen), vec![Value::Int(2)]);
    assert!(Arc::ptr_eq(first.expansion(), second.expansion()));
    // The child's entries survive the sweep under the reused parent.
    assert_eq!(processor.cache_stats().observe_entries, 1);
    assert_eq!(processor.cache_stats().describe_entries, 2);
}
