//! Default traversal of the built-in structural primitives.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::element::{Element, Primitive};
use crate::error::CompileError;
use crate::expanded::Expanded;
use crate::option::{ParseOption, Word};
use crate::traverse::Traverser;
use crate::value::Value;

pub(crate) fn traverse(
    primitive: Primitive,
    node: &Expanded,
    option: &ParseOption,
    traverser: &Traverser<'_>,
) -> Result<Vec<ParseOption>, CompileError> {
    match primitive {
        Primitive::Literal => literal(node.element(), option),
        Primitive::Sequence => sequence(node, option, traverser),
        Primitive::Choice => choice(node, option, traverser),
        Primitive::Optional => optional(node, option, traverser),
        Primitive::Repeat => repeat(node, option, traverser),
    }
}

fn malformed(primitive: Primitive, reason: impl Into<String>) -> CompileError {
    CompileError::Primitive {
        primitive,
        reason: reason.into(),
    }
}

fn single_child(node: &Expanded, primitive: Primitive) -> Result<&Arc<Expanded>, CompileError> {
    match node.children() {
        [child] => Ok(child),
        children => Err(malformed(
            primitive,
            format!("expected exactly one child, found {}", children.len()),
        )),
    }
}

fn bool_prop(element: &Element, primitive: Primitive, key: &str) -> Result<bool, CompileError> {
    match element.prop(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(malformed(primitive, format!("`{key}` must be a boolean"))),
    }
}

fn count_prop(
    element: &Element,
    primitive: Primitive,
    key: &str,
) -> Result<Option<usize>, CompileError> {
    match element.prop(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Int(n)) if *n >= 0 => Ok(Some(*n as usize)),
        Some(_) => Err(malformed(
            primitive,
            format!("`{key}` must be a non-negative integer"),
        )),
    }
}

/// Matches the `text` prop against the front of the remaining input.
///
/// Consumes it when the input starts with it; when the remaining input is
/// itself a prefix of the text (including the empty input), yields a
/// completion that suggests the rest.
fn literal(element: &Element, option: &ParseOption) -> Result<Vec<ParseOption>, CompileError> {
    let text = element
        .prop("text")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(Primitive::Literal, "missing string prop `text`"))?;
    let score = match element.prop("score") {
        None => 1.0,
        Some(v) => v
            .as_float()
            .ok_or_else(|| malformed(Primitive::Literal, "`score` must be a number"))?,
    };

    let mut next = option.clone();
    next.result = element.prop("value").cloned().unwrap_or_default();
    next.score *= score;

    match option.text.as_deref() {
        None => next.words.push(Word::suggested(text)),
        Some(rest) if rest.starts_with(text) => {
            next.text = Some(rest[text.len()..].to_string());
            next.words.push(Word::matched(text));
        }
        Some(rest) if text.starts_with(rest) => {
            if !rest.is_empty() {
                next.words.push(Word::matched(rest));
            }
            next.words.push(Word::suggested(&text[rest.len()..]));
            next.text = None;
        }
        Some(_) => return Ok(Vec::new()),
    }
    Ok(vec![next])
}

/// Matches every child in order; each child continues from every option the
/// previous one produced.
fn sequence(
    node: &Expanded,
    option: &ParseOption,
    traverser: &Traverser<'_>,
) -> Result<Vec<ParseOption>, CompileError> {
    struct Slot {
        id: Option<String>,
        merge: bool,
    }

    let slots = node
        .children()
        .iter()
        .map(|child| {
            let element = child.element();
            let id = match element.prop("id") {
                None | Some(Value::Null) => None,
                Some(Value::Str(id)) => Some(id.clone()),
                Some(_) => {
                    return Err(malformed(Primitive::Sequence, "child `id` must be a string"))
                }
            };
            let merge = bool_prop(element, Primitive::Sequence, "merge")?;
            Ok(Slot { id, merge })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let keyed = slots.iter().any(|s| s.id.is_some() || s.merge);

    let mut partials = vec![(option.clone(), BTreeMap::<String, Value>::new())];
    for (child, slot) in node.children().iter().zip(&slots) {
        let mut next = Vec::new();
        for (partial, acc) in &partials {
            let start = partial.clone().with_result(Value::Null);
            for out in traverser.traverse_expanded(child, &start)? {
                let mut acc = acc.clone();
                if let Some(id) = &slot.id {
                    acc.insert(id.clone(), out.result.clone());
                } else if slot.merge {
                    if let Value::Map(fields) = &out.result {
                        acc.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                }
                next.push((out, acc));
            }
        }
        partials = next;
        if partials.is_empty() {
            break;
        }
    }

    let fixed = node.element().prop("value").cloned();
    Ok(partials
        .into_iter()
        .map(|(opt, acc)| {
            let result = match &fixed {
                Some(value) => value.clone(),
                None if keyed => Value::Map(acc),
                None => Value::Null,
            };
            opt.with_result(result)
        })
        .collect())
}

/// Every child's options, in child order.
fn choice(
    node: &Expanded,
    option: &ParseOption,
    traverser: &Traverser<'_>,
) -> Result<Vec<ParseOption>, CompileError> {
    let fixed = node.element().prop("value");
    let mut out = Vec::new();
    for child in node.children() {
        for opt in traverser.traverse_expanded(child, option)? {
            out.push(match fixed {
                Some(value) => opt.with_result(value.clone()),
                None => opt,
            });
        }
    }
    Ok(out)
}

/// The child's options plus the option that skips it.
fn optional(
    node: &Expanded,
    option: &ParseOption,
    traverser: &Traverser<'_>,
) -> Result<Vec<ParseOption>, CompileError> {
    let child = single_child(node, Primitive::Optional)?;
    let preferred = bool_prop(node.element(), Primitive::Optional, "preferred")?;

    let skipped = option.clone().with_result(Value::Null);
    let taken = traverser.traverse_expanded(child, option)?;

    let mut out = Vec::with_capacity(taken.len() + 1);
    if preferred {
        out.extend(taken);
        out.push(skipped);
    } else {
        out.push(skipped);
        out.extend(taken);
    }
    Ok(out)
}

/// Between `min` and `max` consecutive matches of the child, results
/// collected into a list. Shorter repetitions are reported first.
fn repeat(
    node: &Expanded,
    option: &ParseOption,
    traverser: &Traverser<'_>,
) -> Result<Vec<ParseOption>, CompileError> {
    let child = single_child(node, Primitive::Repeat)?;
    let element = node.element();
    let min = count_prop(element, Primitive::Repeat, "min")?.unwrap_or(1);
    let max = count_prop(element, Primitive::Repeat, "max")?
        .unwrap_or(traverser.config().traversal.max_repeat);
    if max == 0 || min > max {
        return Err(malformed(
            Primitive::Repeat,
            format!("invalid bounds min={min} max={max}"),
        ));
    }

    let mut out = Vec::new();
    if min == 0 {
        out.push(option.clone().with_result(Value::List(Vec::new())));
    }

    let mut frontier = vec![(option.clone(), Vec::<Value>::new())];
    for iteration in 1..=max {
        let mut next = Vec::new();
        for (partial, results) in &frontier {
            for step in traverser.traverse_expanded(child, partial)? {
                let mut results = results.clone();
                results.push(step.result.clone());

                // Only repetitions that consumed input are extended, except
                // while still short of `min`.
                let progressed = match (&partial.text, &step.text) {
                    (Some(before), Some(after)) => after.len() < before.len(),
                    _ => false,
                };
                if iteration < max && (iteration < min || progressed) {
                    next.push((step.clone(), results.clone()));
                }
                if iteration >= min {
                    out.push(step.with_result(Value::List(results)));
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verba_config::EngineConfig;

    use crate::expand::Expander;
    use crate::processor::Processor;

    fn run(element: &Element, input: &str) -> Vec<ParseOption> {
        try_run(element, input).unwrap()
    }

    fn try_run(element: &Element, input: &str) -> Result<Vec<ParseOption>, CompileError> {
        let processor = Processor::identity();
        let config = EngineConfig::default();
        let expanded = Expander::transient(&processor, &config).expand_root(element)?;
        Traverser::new(&processor, &config).traverse_expanded(&expanded, &ParseOption::new(input))
    }

    fn remaining(options: &[ParseOption]) -> Vec<Option<&str>> {
        options.iter().map(|o| o.text.as_deref()).collect()
    }

    #[test]
    fn literal_consumes_prefix() {
        let options = run(&Element::literal("test").with_prop("value", 6), "testing");
        assert_eq!(remaining(&options), vec![Some("ing")]);
        assert_eq!(options[0].result, Value::Int(6));
        assert_eq!(options[0].words, vec![Word::matched("test")]);
    }

    #[test]
    fn literal_completes_partial_input() {
        let options = run(&Element::literal("test"), "te");
        assert_eq!(remaining(&options), vec![None]);
        assert_eq!(
            options[0].words,
            vec![Word::matched("te"), Word::suggested("st")]
        );
    }

    #[test]
    fn literal_suggests_on_empty_input() {
        let options = run(&Element::literal("test"), "");
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].words, vec![Word::suggested("test")]);
    }

    #[test]
    fn literal_rejects_mismatch() {
        assert!(run(&Element::literal("test"), "tx").is_empty());
    }

    #[test]
    fn literal_without_text_is_malformed() {
        let bare = Element::new(Primitive::Literal, Default::default(), Vec::new());
        let err = try_run(&bare, "x").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Primitive { primitive: Primitive::Literal, .. }
        ));
    }

    #[test]
    fn literal_score_multiplies() {
        let options = run(&Element::literal("a").with_prop("score", 0.5), "a");
        assert_eq!(options[0].score, 0.5);
    }

    #[test]
    fn sequence_matches_in_order() {
        let seq = Element::sequence(vec![Element::literal("hello "), Element::literal("world")]);
        let options = run(&seq, "hello world");
        assert_eq!(remaining(&options), vec![Some("")]);
        assert_eq!(options[0].phrase(), "hello world");
        assert!(run(&seq, "world hello").is_empty());
    }

    #[test]
    fn sequence_continues_as_completion() {
        let seq = Element::sequence(vec![Element::literal("hello "), Element::literal("world")]);
        let options = run(&seq, "hel");
        assert_eq!(remaining(&options), vec![None]);
        assert_eq!(options[0].phrase(), "hello world");
        assert!(!options[0].words[2].input);
    }

    #[test]
    fn sequence_collects_keyed_results() {
        let seq = Element::sequence(vec![
            Element::literal("a").with_prop("id", "first").with_prop("value", 1),
            Element::literal("b"),
            Element::literal("c").with_prop("id", "third").with_prop("value", 3),
        ]);
        let options = run(&seq, "abc");
        let result = options[0].result.as_map().unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result["first"], Value::Int(1));
        assert_eq!(result["third"], Value::Int(3));
    }

    #[test]
    fn sequence_merges_map_results() {
        let x = Element::literal("x").with_prop("id", "x").with_prop("value", 1);
        let inner = Element::sequence(vec![x]).with_prop("merge", true);
        let seq = Element::sequence(vec![
            inner,
            Element::literal("y").with_prop("id", "y").with_prop("value", 2),
        ]);
        let options = run(&seq, "xy");
        let result = options[0].result.as_map().unwrap();
        assert_eq!(result["x"], Value::Int(1));
        assert_eq!(result["y"], Value::Int(2));
    }

    #[test]
    fn sequence_cross_product_in_discovery_order() {
        let seq = Element::sequence(vec![
            Element::choice(vec![Element::literal("a"), Element::literal("ab")]),
            Element::choice(vec![Element::literal("b"), Element::literal("")]),
        ]);
        let options = run(&seq, "ab");
        // "a"+"b", "a"+"" (leaves "b"), "ab" then a suggested "b", "ab"+"".
        assert_eq!(
            remaining(&options),
            vec![Some(""), Some("b"), None, Some("")]
        );
    }

    #[test]
    fn unkeyed_sequence_result_is_null_or_value() {
        let seq = Element::sequence(vec![Element::literal("a")]);
        assert!(run(&seq, "a")[0].result.is_null());
        let valued = seq.with_prop("value", "fixed");
        assert_eq!(run(&valued, "a")[0].result, Value::from("fixed"));
    }

    #[test]
    fn choice_unions_children() {
        let choice = Element::choice(vec![
            Element::literal("cat").with_prop("value", 1),
            Element::literal("car").with_prop("value", 2),
        ]);
        let options = run(&choice, "ca");
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].result, Value::Int(1));
        assert_eq!(options[1].result, Value::Int(2));
        assert_eq!(run(&choice, "car").len(), 1);
    }

    #[test]
    fn optional_skip_first_unless_preferred() {
        let opt = Element::optional(Element::literal("please ").with_prop("value", true));
        let options = run(&opt, "please ");
        assert_eq!(remaining(&options), vec![Some("please "), Some("")]);

        let preferred = opt.with_prop("preferred", true);
        let options = run(&preferred, "please ");
        assert_eq!(remaining(&options), vec![Some(""), Some("please ")]);
        assert_eq!(options[0].result, Value::Bool(true));
        assert!(options[1].result.is_null());
    }

    #[test]
    fn optional_requires_one_child() {
        let two = Element::new(
            Primitive::Optional,
            Default::default(),
            vec![Element::literal("a"), Element::literal("b")],
        );
        assert!(try_run(&two, "a").is_err());
    }

    #[test]
    fn repeat_collects_results() {
        let rep = Element::repeat(Element::literal("ab").with_prop("value", 1));
        let options = run(&rep, "ababab");
        // The exhausted input still offers one more repetition as a completion.
        assert_eq!(
            remaining(&options),
            vec![Some("abab"), Some("ab"), Some(""), None]
        );
        assert_eq!(
            options[2].result,
            Value::List(vec![Value::Int(1), Value::Int(1), Value::Int(1)])
        );
    }

    #[test]
    fn repeat_respects_bounds() {
        let rep = Element::repeat(Element::literal("a"))
            .with_prop("min", 2)
            .with_prop("max", 3);
        let options = run(&rep, "aaaa");
        assert_eq!(remaining(&options), vec![Some("aa"), Some("a")]);
    }

    #[test]
    fn repeat_min_zero_includes_empty() {
        let rep = Element::repeat(Element::literal("a")).with_prop("min", 0);
        let options = run(&rep, "b");
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].result, Value::List(Vec::new()));
    }

    #[test]
    fn repeat_completion_stops_after_one_suggestion() {
        let rep = Element::repeat(Element::literal("ab"));
        let options = run(&rep, "a");
        assert_eq!(remaining(&options), vec![None]);
    }

    #[test]
    fn repeat_rejects_inverted_bounds() {
        let rep = Element::repeat(Element::literal("a"))
            .with_prop("min", 3)
            .with_prop("max", 1);
        assert!(matches!(
            try_run(&rep, "a").unwrap_err(),
            CompileError::Primitive { primitive: Primitive::Repeat, .. }
        ));
    }
}
