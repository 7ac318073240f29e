//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Minimal XPath location-path evaluator.
//!
//! The validation and defaults engines delegate their XPath needs here:
//! `unique` schema-node-ids with transient descendants, `when` conditions,
//! and the subtree selection of the global-defaults merge. The supported
//! grammar is the subset those call sites produce - child-axis location
//! paths with optional prefixes, `.` and `..`, `*` name tests, simple
//! `[leaf='value']` predicates, and boolean expressions built from path
//! existence, `=`/`!=` literal comparisons, `not()`, `and` and `or`. Full
//! XPath 1.0 is explicitly out of scope.

use indexmap::IndexMap;

use crate::context::Context;
use crate::data::{DataNodeId, DataTree};
use crate::error::{Error, Result};
use crate::schema::SchemaModule;

/// Prefix to namespace-URI bindings used during evaluation. An entry with a
/// `None` prefix is the default namespace.
#[derive(Clone, Debug, Default)]
pub struct NsContext {
    map: IndexMap<Option<String>, String>,
}

impl NsContext {
    pub fn new() -> NsContext {
        NsContext::default()
    }

    pub fn add(&mut self, prefix: Option<&str>, uri: &str) {
        self.map
            .insert(prefix.map(|p| p.to_string()), uri.to_string());
    }

    pub fn get(&self, prefix: Option<&str>) -> Option<&str> {
        self.map
            .get(&prefix.map(|p| p.to_string()))
            .map(|uri| uri.as_str())
    }

    /// Context carrying the canonical prefix of every registered module.
    pub fn canonical(ctx: &Context) -> NsContext {
        let mut nsc = NsContext::new();
        for module in ctx.modules() {
            nsc.add(Some(module.prefix()), module.namespace());
        }
        nsc
    }

    /// Context carrying a single module's canonical prefix.
    pub fn from_module(module: &SchemaModule<'_>) -> NsContext {
        let mut nsc = NsContext::new();
        nsc.add(Some(module.prefix()), module.namespace());
        nsc
    }
}

#[derive(Debug)]
enum Step {
    This,
    Parent,
    Child {
        prefix: Option<String>,
        name: String,
        wildcard: bool,
        predicate: Option<(String, String)>,
    },
}

/// Evaluate a location path and collect the matching nodes in document
/// order. Absolute paths start at the tree root, relative paths at `node`.
pub fn xpath_vec(
    tree: &DataTree,
    node: DataNodeId,
    nsc: &NsContext,
    expr: &str,
) -> Result<Vec<DataNodeId>> {
    let expr = expr.trim();
    let (absolute, steps) = parse_path(expr)?;
    let mut current = vec![if absolute { tree.root() } else { node }];
    for step in &steps {
        let mut next: Vec<DataNodeId> = Vec::new();
        for id in &current {
            match step {
                Step::This => next.push(*id),
                Step::Parent => {
                    if let Some(parent) = tree.parent(*id) {
                        next.push(parent);
                    }
                }
                Step::Child {
                    prefix,
                    name,
                    wildcard,
                    predicate,
                } => {
                    for child in tree.children(*id) {
                        if !wildcard && tree.name(*child) != name {
                            continue;
                        }
                        if let Some(p) = prefix {
                            let uri = nsc.get(Some(p)).ok_or_else(|| {
                                Error::xpath(format!("unknown prefix {}", p))
                            })?;
                            if tree.namespace(*child) != Some(uri) {
                                continue;
                            }
                        }
                        if let Some((pname, pvalue)) = predicate {
                            let hit = tree
                                .children(*child)
                                .iter()
                                .any(|grandchild| {
                                    tree.name(*grandchild) == pname
                                        && tree.body(*grandchild)
                                            == Some(pvalue.as_str())
                                });
                            if !hit {
                                continue;
                            }
                        }
                        next.push(*child);
                    }
                }
            }
        }
        next.dedup();
        current = next;
    }
    Ok(current)
}

/// Evaluate a boolean expression against `node` (used for `when`).
pub fn xpath_bool(
    tree: &DataTree,
    node: DataNodeId,
    nsc: &NsContext,
    expr: &str,
) -> Result<bool> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(Error::xpath("empty expression"));
    }
    // Disjunction has the lowest precedence.
    let parts = split_top(expr, " or ");
    if parts.len() > 1 {
        for part in parts {
            if xpath_bool(tree, node, nsc, part)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    let parts = split_top(expr, " and ");
    if parts.len() > 1 {
        for part in parts {
            if !xpath_bool(tree, node, nsc, part)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }
    if let Some(inner) = strip_call(expr, "not") {
        return Ok(!xpath_bool(tree, node, nsc, inner)?);
    }
    if expr.starts_with('(') && expr.ends_with(')') {
        return xpath_bool(tree, node, nsc, &expr[1..expr.len() - 1]);
    }
    for op in &["!=", "="] {
        let parts = split_top(expr, op);
        if parts.len() == 2 {
            let matches = xpath_vec(tree, node, nsc, parts[0].trim())?;
            let literal = parse_literal(parts[1].trim())?;
            let eq = *op == "=";
            return Ok(matches.iter().any(|id| {
                let value = tree.body(*id).unwrap_or("");
                (value == literal) == eq
            }));
        } else if parts.len() > 2 {
            return Err(Error::xpath(format!("chained {} comparison", op)));
        }
    }
    // Bare path: existence test.
    Ok(!xpath_vec(tree, node, nsc, expr)?.is_empty())
}

/// Prefix every unprefixed step of a schema-node-id with the module's
/// canonical prefix, returning the rewritten path and the namespace context
/// it is valid in.
pub fn canonicalize(
    expr: &str,
    module: &SchemaModule<'_>,
) -> Result<(String, NsContext)> {
    let expr = expr.trim();
    let absolute = expr.starts_with('/');
    let body = expr.trim_start_matches('/');
    let mut steps = Vec::new();
    for segment in body.split('/') {
        if segment.is_empty() {
            return Err(Error::xpath(format!("empty step in {}", expr)));
        }
        if segment == "." || segment == ".." || segment.starts_with('*') {
            steps.push(segment.to_string());
            continue;
        }
        let name_end =
            segment.find('[').unwrap_or(segment.len());
        let (name, predicate) = segment.split_at(name_end);
        if name.contains(':') {
            steps.push(segment.to_string());
        } else {
            steps.push(format!("{}:{}{}", module.prefix(), name, predicate));
        }
    }
    let mut path = steps.join("/");
    if absolute {
        path.insert(0, '/');
    }
    Ok((path, NsContext::from_module(module)))
}

// ===== parsing helpers =====

fn parse_path(expr: &str) -> Result<(bool, Vec<Step>)> {
    let absolute = expr.starts_with('/');
    let body = expr.trim_start_matches('/');
    let mut steps = Vec::new();
    if body.is_empty() {
        if absolute {
            return Ok((true, steps));
        }
        return Err(Error::xpath("empty path"));
    }
    for segment in body.split('/') {
        let segment = segment.trim();
        match segment {
            "" => return Err(Error::xpath(format!("empty step in {}", expr))),
            "." => steps.push(Step::This),
            ".." => steps.push(Step::Parent),
            _ => steps.push(parse_step(segment)?),
        }
    }
    Ok((absolute, steps))
}

fn parse_step(segment: &str) -> Result<Step> {
    let (test, predicate) = match segment.find('[') {
        Some(open) => {
            if !segment.ends_with(']') {
                return Err(Error::xpath(format!(
                    "unterminated predicate in {}",
                    segment
                )));
            }
            let predicate =
                parse_predicate(&segment[open + 1..segment.len() - 1])?;
            (&segment[..open], Some(predicate))
        }
        None => (segment, None),
    };
    let (prefix, name) = match test.split_once(':') {
        Some((prefix, name)) => (Some(prefix.to_string()), name),
        None => (None, test),
    };
    if name.is_empty() {
        return Err(Error::xpath(format!("bad name test in {}", segment)));
    }
    Ok(Step::Child {
        prefix,
        wildcard: name == "*",
        name: name.to_string(),
        predicate,
    })
}

fn parse_predicate(body: &str) -> Result<(String, String)> {
    let (lhs, rhs) = body
        .split_once('=')
        .ok_or_else(|| Error::xpath(format!("bad predicate [{}]", body)))?;
    // Predicates compare a direct child leaf by local name.
    let name = match lhs.trim().split_once(':') {
        Some((_, local)) => local,
        None => lhs.trim(),
    };
    let value = parse_literal(rhs.trim())?;
    Ok((name.to_string(), value.to_string()))
}

fn parse_literal(text: &str) -> Result<&str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let quote = bytes[0];
        if (quote == b'\'' || quote == b'"') && bytes[bytes.len() - 1] == quote
        {
            return Ok(&text[1..text.len() - 1]);
        }
    }
    Err(Error::xpath(format!("expected string literal, got {}", text)))
}

/// Split at top level only: separators inside quotes, brackets or
/// parentheses do not count.
fn split_top<'a>(expr: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    let bytes = expr.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let ch = bytes[i] as char;
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                _ => {
                    if depth == 0
                        && expr.is_char_boundary(i)
                        && expr[i..].starts_with(sep)
                    {
                        parts.push(&expr[start..i]);
                        i += sep.len();
                        start = i;
                        continue;
                    }
                }
            },
        }
        i += 1;
    }
    parts.push(&expr[start..]);
    parts
}

fn strip_call<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    let inner = expr.strip_prefix(name)?.trim_start();
    let inner = inner.strip_prefix('(')?;
    let inner = inner.strip_suffix(')')?;
    Some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> DataTree {
        DataTree::parse_string(
            r#"<config xmlns="urn:example:ex">
                 <server>
                   <name>a</name>
                   <port>80</port>
                 </server>
                 <server>
                   <name>b</name>
                   <port>443</port>
                 </server>
               </config>"#,
        )
        .unwrap()
    }

    #[test]
    fn path_relative_and_absolute() {
        let tree = sample_tree();
        let nsc = NsContext::new();
        let root = tree.root();

        let servers = xpath_vec(&tree, root, &nsc, "server").unwrap();
        assert_eq!(servers.len(), 2);

        let names = xpath_vec(&tree, root, &nsc, "/server/name").unwrap();
        let names: Vec<_> =
            names.iter().map(|id| tree.body(*id).unwrap()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let first = servers[0];
        let up = xpath_vec(&tree, first, &nsc, "../server").unwrap();
        assert_eq!(up.len(), 2);
    }

    #[test]
    fn path_predicate() {
        let tree = sample_tree();
        let nsc = NsContext::new();
        let hit = xpath_vec(
            &tree,
            tree.root(),
            &nsc,
            "server[name='b']/port",
        )
        .unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(tree.body(hit[0]), Some("443"));
    }

    #[test]
    fn path_prefixed() {
        let tree = sample_tree();
        let mut nsc = NsContext::new();
        nsc.add(Some("ex"), "urn:example:ex");
        let hit =
            xpath_vec(&tree, tree.root(), &nsc, "ex:server").unwrap();
        assert_eq!(hit.len(), 2);
        assert!(xpath_vec(&tree, tree.root(), &nsc, "bad:server").is_err());
    }

    #[test]
    fn boolean_expressions() {
        let tree = sample_tree();
        let nsc = NsContext::new();
        let root = tree.root();

        assert!(xpath_bool(&tree, root, &nsc, "server").unwrap());
        assert!(!xpath_bool(&tree, root, &nsc, "client").unwrap());
        assert!(
            xpath_bool(&tree, root, &nsc, "server/name = 'a'").unwrap()
        );
        assert!(
            !xpath_bool(&tree, root, &nsc, "server/port = '8080'").unwrap()
        );
        assert!(xpath_bool(
            &tree,
            root,
            &nsc,
            "server/name = 'a' and server/name = 'b'"
        )
        .unwrap());
        assert!(xpath_bool(
            &tree,
            root,
            &nsc,
            "client or server/port != '80'"
        )
        .unwrap());
        assert!(xpath_bool(&tree, root, &nsc, "not(client)").unwrap());
    }

    #[test]
    fn canonical_rewrite() {
        let mut ctx = Context::new();
        ctx.add_module("example", "urn:example:ex", "ex").unwrap();
        let module = ctx.get_module("example").unwrap();
        let (path, nsc) = canonicalize("a/b", &module).unwrap();
        assert_eq!(path, "ex:a/ex:b");
        assert_eq!(nsc.get(Some("ex")), Some("urn:example:ex"));
    }
}
