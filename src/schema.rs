//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG schema data.

use crate::context::Context;
use crate::iter::{Ancestors, NodeIterable, Siblings, Traverse};

/// Index of a schema node inside its [`Context`] arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SchemaNodeId(pub(crate) usize);

/// YANG schema node kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchemaNodeKind {
    Module,
    Container,
    Case,
    Choice,
    Leaf,
    LeafList,
    List,
    Input,
    Output,
}

impl std::fmt::Display for SchemaNodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SchemaNodeKind::Module => "module",
            SchemaNodeKind::Container => "container",
            SchemaNodeKind::Case => "case",
            SchemaNodeKind::Choice => "choice",
            SchemaNodeKind::Leaf => "leaf",
            SchemaNodeKind::LeafList => "leaf-list",
            SchemaNodeKind::List => "list",
            SchemaNodeKind::Input => "input",
            SchemaNodeKind::Output => "output",
        };
        write!(f, "{}", name)
    }
}

/// Arena payload of a single schema node.
///
/// `namespace` and `prefix` are meaningful on `Module` roots only; all other
/// nodes reach them through their owning module. `config` is resolved at
/// append time (a `config false` ancestor forces the whole subtree).
#[derive(Clone, Debug)]
pub(crate) struct SchemaNodeData {
    pub(crate) kind: SchemaNodeKind,
    pub(crate) name: String,
    pub(crate) module: SchemaNodeId,
    pub(crate) parent: Option<SchemaNodeId>,
    pub(crate) children: Vec<SchemaNodeId>,
    pub(crate) namespace: String,
    pub(crate) prefix: String,
    pub(crate) config: bool,
    pub(crate) presence: bool,
    pub(crate) ordered_by_user: bool,
    pub(crate) default: Option<String>,
    pub(crate) default_case: Option<String>,
    pub(crate) min_elements: Option<u32>,
    pub(crate) max_elements: Option<u32>,
    pub(crate) when: Option<String>,
    pub(crate) keys: Vec<String>,
    pub(crate) uniques: Vec<Vec<String>>,
}

impl SchemaNodeData {
    pub(crate) fn new(kind: SchemaNodeKind, name: &str) -> SchemaNodeData {
        SchemaNodeData {
            kind,
            name: name.to_string(),
            module: SchemaNodeId(0),
            parent: None,
            children: Vec::new(),
            namespace: String::new(),
            prefix: String::new(),
            config: true,
            presence: false,
            ordered_by_user: false,
            default: None,
            default_case: None,
            min_elements: None,
            max_elements: None,
            when: None,
            keys: Vec::new(),
            uniques: Vec::new(),
        }
    }
}

/// Descriptor used to append a node into the schema arena.
///
/// The YANG parser is out of scope for this crate; schemas are constructed
/// programmatically from these descriptors (or by an external loader feeding
/// them). Facets not set keep their YANG defaults: `config true`, no
/// presence, ordered-by system, unbounded cardinality.
#[derive(Clone, Debug)]
pub struct SchemaNodeDef {
    pub(crate) kind: SchemaNodeKind,
    pub(crate) name: String,
    pub(crate) config: Option<bool>,
    pub(crate) presence: bool,
    pub(crate) ordered_by_user: bool,
    pub(crate) default: Option<String>,
    pub(crate) default_case: Option<String>,
    pub(crate) min_elements: Option<u32>,
    pub(crate) max_elements: Option<u32>,
    pub(crate) when: Option<String>,
    pub(crate) keys: Vec<String>,
    pub(crate) uniques: Vec<Vec<String>>,
}

impl SchemaNodeDef {
    fn new(kind: SchemaNodeKind, name: &str) -> SchemaNodeDef {
        SchemaNodeDef {
            kind,
            name: name.to_string(),
            config: None,
            presence: false,
            ordered_by_user: false,
            default: None,
            default_case: None,
            min_elements: None,
            max_elements: None,
            when: None,
            keys: Vec::new(),
            uniques: Vec::new(),
        }
    }

    pub fn container(name: &str) -> SchemaNodeDef {
        SchemaNodeDef::new(SchemaNodeKind::Container, name)
    }

    pub fn list(name: &str) -> SchemaNodeDef {
        SchemaNodeDef::new(SchemaNodeKind::List, name)
    }

    pub fn leaf(name: &str) -> SchemaNodeDef {
        SchemaNodeDef::new(SchemaNodeKind::Leaf, name)
    }

    pub fn leaf_list(name: &str) -> SchemaNodeDef {
        SchemaNodeDef::new(SchemaNodeKind::LeafList, name)
    }

    pub fn choice(name: &str) -> SchemaNodeDef {
        SchemaNodeDef::new(SchemaNodeKind::Choice, name)
    }

    pub fn case(name: &str) -> SchemaNodeDef {
        SchemaNodeDef::new(SchemaNodeKind::Case, name)
    }

    pub fn input() -> SchemaNodeDef {
        SchemaNodeDef::new(SchemaNodeKind::Input, "input")
    }

    pub fn output() -> SchemaNodeDef {
        SchemaNodeDef::new(SchemaNodeKind::Output, "output")
    }

    /// Mark a container as a presence container.
    pub fn presence(mut self) -> SchemaNodeDef {
        self.presence = true;
        self
    }

    pub fn config(mut self, config: bool) -> SchemaNodeDef {
        self.config = Some(config);
        self
    }

    pub fn ordered_by_user(mut self) -> SchemaNodeDef {
        self.ordered_by_user = true;
        self
    }

    /// Canonical default value of a leaf.
    pub fn default_value(mut self, value: &str) -> SchemaNodeDef {
        self.default = Some(value.to_string());
        self
    }

    /// Name of the default case of a choice.
    pub fn default_case(mut self, case: &str) -> SchemaNodeDef {
        self.default_case = Some(case.to_string());
        self
    }

    /// The min-elements constraint of a list or leaf-list.
    pub fn min_elements(mut self, min: u32) -> SchemaNodeDef {
        self.min_elements = Some(min);
        self
    }

    /// The max-elements constraint. Zero means unbounded.
    pub fn max_elements(mut self, max: u32) -> SchemaNodeDef {
        self.max_elements = if max == 0 { None } else { Some(max) };
        self
    }

    /// XPath condition gating the existence of this node.
    pub fn when(mut self, xpath: &str) -> SchemaNodeDef {
        self.when = Some(xpath.to_string());
        self
    }

    /// Ordered key leaf names of a list.
    pub fn keys<I, S>(mut self, keys: I) -> SchemaNodeDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Add one `unique` statement (an ordered list of schema-node-ids).
    pub fn unique<I, S>(mut self, args: I) -> SchemaNodeDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniques.push(args.into_iter().map(Into::into).collect());
        self
    }
}

/// A YANG module registered in a [`Context`].
#[derive(Clone, Debug)]
pub struct SchemaModule<'a> {
    pub(crate) context: &'a Context,
    pub(crate) id: SchemaNodeId,
}

/// Generic YANG schema node.
#[derive(Clone, Debug)]
pub struct SchemaNode<'a> {
    pub(crate) context: &'a Context,
    pub(crate) id: SchemaNodeId,
}

// ===== impl SchemaModule =====

impl<'a> SchemaModule<'a> {
    fn data(&self) -> &'a SchemaNodeData {
        &self.context.nodes[self.id.0]
    }

    pub fn id(&self) -> SchemaNodeId {
        self.id
    }

    /// Name of the module.
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Namespace of the module.
    pub fn namespace(&self) -> &'a str {
        &self.data().namespace
    }

    /// Prefix of the module.
    pub fn prefix(&self) -> &'a str {
        &self.data().prefix
    }

    /// Returns an iterator over the top-level data nodes.
    pub fn data_nodes(&self) -> Siblings<'a, SchemaNode<'a>> {
        let first = self
            .data()
            .children
            .first()
            .map(|id| self.context.node(*id));
        Siblings::new(first)
    }

    /// Returns an iterator over all data nodes in the module (depth-first
    /// search algorithm).
    pub fn traverse(&self) -> impl Iterator<Item = SchemaNode<'a>> {
        self.data_nodes().flat_map(|snode| snode.traverse())
    }

    /// Module node as a generic schema node (parent of the top-level nodes).
    pub fn node(&self) -> SchemaNode<'a> {
        self.context.node(self.id)
    }
}

impl PartialEq for SchemaModule<'_> {
    fn eq(&self, other: &SchemaModule<'_>) -> bool {
        std::ptr::eq(self.context, other.context) && self.id == other.id
    }
}

// ===== impl SchemaNode =====

impl<'a> SchemaNode<'a> {
    fn data(&self) -> &'a SchemaNodeData {
        &self.context.nodes[self.id.0]
    }

    pub fn id(&self) -> SchemaNodeId {
        self.id
    }

    /// Returns the kind of the schema node.
    pub fn kind(&self) -> SchemaNodeKind {
        self.data().kind
    }

    /// Schema node name.
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Schema node module.
    pub fn module(&self) -> SchemaModule<'a> {
        SchemaModule {
            context: self.context,
            id: self.data().module,
        }
    }

    /// Namespace the node belongs to (its module namespace).
    pub fn namespace(&self) -> &'a str {
        &self.context.nodes[self.data().module.0].namespace
    }

    /// Returns whether the node is a configuration node. Resolved through
    /// the ancestor chain: a `config false` ancestor forces false.
    pub fn is_config(&self) -> bool {
        self.data().config
    }

    /// Returns whether the node is a non-presence container.
    pub fn is_np_container(&self) -> bool {
        self.kind() == SchemaNodeKind::Container && !self.data().presence
    }

    /// Returns whether the node is a presence container.
    pub fn is_presence_container(&self) -> bool {
        self.kind() == SchemaNodeKind::Container && self.data().presence
    }

    /// Returns whether the node is an user-ordered list or leaf-list.
    pub fn is_user_ordered(&self) -> bool {
        match self.kind() {
            SchemaNodeKind::LeafList | SchemaNodeKind::List => {
                self.data().ordered_by_user
            }
            _ => false,
        }
    }

    /// Returns whether the node appears only in the schema tree and not in
    /// the data tree.
    pub fn is_schema_only(&self) -> bool {
        matches!(self.kind(), SchemaNodeKind::Choice | SchemaNodeKind::Case)
    }

    /// Returns whether a default value is set.
    pub fn has_default(&self) -> bool {
        self.data().default.is_some()
    }

    /// The default value of the leaf (canonical string representation).
    pub fn default_value(&self) -> Option<&'a str> {
        self.data().default.as_deref()
    }

    /// The default case of the choice.
    pub fn default_case(&self) -> Option<SchemaNode<'a>> {
        let case = self.data().default_case.as_deref()?;
        self.children().find(|child| {
            child.kind() == SchemaNodeKind::Case && child.name() == case
        })
    }

    /// The min-elements constraint.
    pub fn min_elements(&self) -> Option<u32> {
        self.data().min_elements
    }

    /// The max-elements constraint (`None` means unbounded).
    pub fn max_elements(&self) -> Option<u32> {
        self.data().max_elements
    }

    /// The when condition, if any.
    pub fn when(&self) -> Option<&'a str> {
        self.data().when.as_deref()
    }

    /// Ordered key leaf names of the list.
    pub fn key_names(&self) -> &'a [String] {
        &self.data().keys
    }

    /// The unique statements of the list, each an ordered list of
    /// schema-node-ids.
    pub fn unique_statements(&self) -> &'a [Vec<String>] {
        &self.data().uniques
    }

    /// Returns an iterator over the ancestor schema nodes.
    pub fn ancestors(&self) -> Ancestors<'a, SchemaNode<'a>> {
        Ancestors::new(self.parent())
    }

    /// Returns an iterator over this schema node and its ancestors.
    pub fn inclusive_ancestors(&self) -> Ancestors<'a, SchemaNode<'a>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over the child schema nodes.
    pub fn children(&self) -> Siblings<'a, SchemaNode<'a>> {
        Siblings::new(self.first_child())
    }

    /// Returns an iterator over all elements in the schema subtree
    /// (depth-first search algorithm).
    pub fn traverse(&self) -> Traverse<'a, SchemaNode<'a>> {
        Traverse::new(self.clone())
    }

    /// Find the data child matching a namespace-qualified name, descending
    /// transparently through choice and case nodes.
    pub fn find_child(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<SchemaNode<'a>> {
        for child in self.children() {
            if child.is_schema_only() {
                if let Some(found) = child.find_child(namespace, name) {
                    return Some(found);
                }
                continue;
            }
            if child.name() != name {
                continue;
            }
            match namespace {
                Some(ns) if ns != child.namespace() => continue,
                _ => return Some(child),
            }
        }
        None
    }

    /// The inclusive ancestor of this node whose parent is `ancestor`, used
    /// to lift nodes bound under choice/case back to the child position they
    /// occupy among `ancestor`'s schema children.
    pub fn child_of(&self, ancestor: SchemaNodeId) -> Option<SchemaNode<'a>> {
        self.inclusive_ancestors()
            .find(|snode| snode.data().parent == Some(ancestor))
    }

    /// Position of this node (choice-lifted) among the children of
    /// `ancestor`.
    pub(crate) fn position_in(&self, ancestor: SchemaNodeId) -> Option<usize> {
        let lifted = self.child_of(ancestor)?;
        self.context.nodes[ancestor.0]
            .children
            .iter()
            .position(|id| *id == lifted.id)
    }

    /// Generate the path of the node, module-qualified at the top level.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        for snode in self.inclusive_ancestors() {
            if snode.kind() == SchemaNodeKind::Module {
                break;
            }
            if snode.data().parent.map(|p| self.context.nodes[p.0].kind)
                == Some(SchemaNodeKind::Module)
            {
                segments
                    .push(format!("{}:{}", snode.module().name(), snode.name()));
            } else {
                segments.push(snode.name().to_string());
            }
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}

impl<'a> NodeIterable<'a> for SchemaNode<'a> {
    fn parent(&self) -> Option<SchemaNode<'a>> {
        let parent = self.data().parent?;
        Some(self.context.node(parent))
    }

    fn next_sibling(&self) -> Option<SchemaNode<'a>> {
        let parent = self.data().parent?;
        let siblings = &self.context.nodes[parent.0].children;
        let pos = siblings.iter().position(|id| *id == self.id)?;
        let next = siblings.get(pos + 1)?;
        Some(self.context.node(*next))
    }

    fn first_child(&self) -> Option<SchemaNode<'a>> {
        let child = self.data().children.first()?;
        Some(self.context.node(*child))
    }
}

impl PartialEq for SchemaNode<'_> {
    fn eq(&self, other: &SchemaNode<'_>) -> bool {
        std::ptr::eq(self.context, other.context) && self.id == other.id
    }
}
