//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! XML-shaped instance data trees.

use std::collections::HashSet;

use bitflags::bitflags;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::iter::{Ancestors, NodeIterable, Siblings, Traverse};
use crate::schema::{SchemaNode, SchemaNodeId, SchemaNodeKind};

/// Index of a data node inside its [`DataTree`] arena.
///
/// Ids are stable for the lifetime of the tree and never reused; purged
/// nodes leave a tombstone behind.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DataNodeId(pub(crate) usize);

bitflags! {
    /// Per-node scratch and lifecycle flags.
    ///
    /// The ADD/DEL/CHANGE triad gates partial re-validation and selective
    /// default refresh; DEFAULT marks leaves and containers synthesised by
    /// the defaults engine; MARK is free for transient use by a single pass.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct DataFlags: u16 {
        /// Subtree contains a modification.
        const CHANGE = 0x01;
        /// Node was added.
        const ADD = 0x02;
        /// Node is deleted (or scheduled for deletion).
        const DEL = 0x04;
        /// Node was synthesised from a schema default.
        const DEFAULT = 0x08;
        /// Scratch mark.
        const MARK = 0x10;
    }
}

bitflags! {
    /// Data printer flags.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct PrintFlags: u32 {
        /// Indent the output and emit one element per line.
        const PRETTY = 0x01;
        /// Do not print nodes carrying the DEFAULT flag.
        const SKIP_DEFAULT = 0x02;
    }
}

/// A single XML attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attr {
    pub prefix: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug)]
pub(crate) struct DataNodeData {
    pub(crate) name: String,
    pub(crate) prefix: Option<String>,
    /// `xmlns` declarations made on this element.
    pub(crate) namespaces: Vec<(Option<String>, String)>,
    pub(crate) attrs: Vec<Attr>,
    pub(crate) value: Option<String>,
    pub(crate) spec: Option<SchemaNodeId>,
    pub(crate) flags: DataFlags,
    pub(crate) parent: Option<DataNodeId>,
    pub(crate) children: Vec<DataNodeId>,
    /// Position among the parent's children, kept in sync by every child
    /// vector mutation.
    pub(crate) pos: usize,
    pub(crate) freed: bool,
}

impl DataNodeData {
    fn new(name: &str) -> DataNodeData {
        DataNodeData {
            name: name.to_string(),
            prefix: None,
            namespaces: Vec::new(),
            attrs: Vec::new(),
            value: None,
            spec: None,
            flags: DataFlags::empty(),
            parent: None,
            children: Vec::new(),
            pos: 0,
            freed: false,
        }
    }
}

/// A mutable XML instance tree.
///
/// The tree owns all of its nodes; sibling order is a property of the
/// parent. It holds no reference to a [`Context`] - schema-aware operations
/// take the context explicitly, which also allows expanded default trees to
/// be cached inside the context itself.
#[derive(Clone, Debug)]
pub struct DataTree {
    nodes: Vec<DataNodeData>,
    root: DataNodeId,
}

/// A reference to a node of a [`DataTree`].
#[derive(Clone, Debug)]
pub struct DataNodeRef<'a> {
    pub(crate) tree: &'a DataTree,
    pub(crate) id: DataNodeId,
}

// ===== impl DataTree =====

impl DataTree {
    /// Create a tree holding a single root element.
    pub fn new(name: &str) -> DataTree {
        DataTree {
            nodes: vec![DataNodeData::new(name)],
            root: DataNodeId(0),
        }
    }

    pub fn root(&self) -> DataNodeId {
        self.root
    }

    /// Append a new element under `parent`.
    pub fn new_element(
        &mut self,
        parent: DataNodeId,
        name: &str,
    ) -> DataNodeId {
        let id = DataNodeId(self.nodes.len());
        let mut data = DataNodeData::new(name);
        data.parent = Some(parent);
        data.pos = self.nodes[parent.0].children.len();
        self.nodes.push(data);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn name(&self, id: DataNodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn prefix(&self, id: DataNodeId) -> Option<&str> {
        self.nodes[id.0].prefix.as_deref()
    }

    pub fn set_prefix(&mut self, id: DataNodeId, prefix: Option<&str>) {
        self.nodes[id.0].prefix = prefix.map(|p| p.to_string());
    }

    /// The body (text value) of an element.
    pub fn body(&self, id: DataNodeId) -> Option<&str> {
        self.nodes[id.0].value.as_deref()
    }

    pub fn set_body(&mut self, id: DataNodeId, value: &str) {
        self.nodes[id.0].value = Some(value.to_string());
    }

    pub fn add_attr(
        &mut self,
        id: DataNodeId,
        prefix: Option<&str>,
        name: &str,
        value: &str,
    ) {
        self.nodes[id.0].attrs.push(Attr {
            prefix: prefix.map(|p| p.to_string()),
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// Attribute value by local name.
    pub fn attr(&self, id: DataNodeId, name: &str) -> Option<&str> {
        self.nodes[id.0]
            .attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn attrs(&self, id: DataNodeId) -> &[Attr] {
        &self.nodes[id.0].attrs
    }

    /// Declare a namespace (`xmlns` / `xmlns:prefix`) on an element.
    pub fn add_namespace(
        &mut self,
        id: DataNodeId,
        prefix: Option<&str>,
        uri: &str,
    ) {
        self.nodes[id.0]
            .namespaces
            .push((prefix.map(|p| p.to_string()), uri.to_string()));
    }

    pub fn namespaces(&self, id: DataNodeId) -> &[(Option<String>, String)] {
        &self.nodes[id.0].namespaces
    }

    /// Resolve a prefix against the namespace context chain of `id`.
    pub fn resolve_prefix(
        &self,
        id: DataNodeId,
        prefix: Option<&str>,
    ) -> Option<&str> {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            for (p, uri) in &self.nodes[node.0].namespaces {
                if p.as_deref() == prefix {
                    return Some(uri);
                }
            }
            cursor = self.nodes[node.0].parent;
        }
        None
    }

    /// Namespace URI the element resolves to.
    pub fn namespace(&self, id: DataNodeId) -> Option<&str> {
        self.resolve_prefix(id, self.prefix(id))
    }

    /// Reverse lookup: the prefix bound to `uri` in the context chain of
    /// `id`. `Some(None)` means the default namespace.
    pub fn prefix_for_namespace(
        &self,
        id: DataNodeId,
        uri: &str,
    ) -> Option<Option<&str>> {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            for (p, u) in &self.nodes[node.0].namespaces {
                if u == uri {
                    return Some(p.as_deref());
                }
            }
            cursor = self.nodes[node.0].parent;
        }
        None
    }

    pub fn spec(&self, id: DataNodeId) -> Option<SchemaNodeId> {
        self.nodes[id.0].spec
    }

    pub fn set_spec(&mut self, id: DataNodeId, spec: Option<SchemaNodeId>) {
        self.nodes[id.0].spec = spec;
    }

    /// The bound schema node, if any.
    pub fn schema<'a>(
        &self,
        ctx: &'a Context,
        id: DataNodeId,
    ) -> Option<SchemaNode<'a>> {
        self.spec(id).map(|spec| ctx.node(spec))
    }

    pub fn flags(&self, id: DataNodeId) -> DataFlags {
        self.nodes[id.0].flags
    }

    pub fn set_flag(&mut self, id: DataNodeId, flag: DataFlags) {
        self.nodes[id.0].flags |= flag;
    }

    pub fn clear_flag(&mut self, id: DataNodeId, flag: DataFlags) {
        self.nodes[id.0].flags &= !flag;
    }

    /// Whether any bit of `mask` is set on the node.
    pub fn has_flag(&self, id: DataNodeId, mask: DataFlags) -> bool {
        self.nodes[id.0].flags.intersects(mask)
    }

    /// Set `flag` on every ancestor of `id` (exclusive).
    pub fn set_flag_ancestors(&mut self, id: DataNodeId, flag: DataFlags) {
        let mut cursor = self.nodes[id.0].parent;
        while let Some(node) = cursor {
            self.nodes[node.0].flags |= flag;
            cursor = self.nodes[node.0].parent;
        }
    }

    /// Clear `mask` on the whole subtree rooted at `id`.
    pub fn clear_flags_recursive(&mut self, id: DataNodeId, mask: DataFlags) {
        self.nodes[id.0].flags &= !mask;
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.clear_flags_recursive(child, mask);
        }
    }

    pub fn parent(&self, id: DataNodeId) -> Option<DataNodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: DataNodeId) -> &[DataNodeId] {
        &self.nodes[id.0].children
    }

    /// First direct child with the given local name.
    pub fn child_by_name(
        &self,
        id: DataNodeId,
        name: &str,
    ) -> Option<DataNodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].name == name)
    }

    pub(crate) fn is_freed(&self, id: DataNodeId) -> bool {
        self.nodes[id.0].freed
    }

    /// Detach `id` from its parent and tombstone the whole subtree. The
    /// root cannot be purged.
    pub fn purge(&mut self, id: DataNodeId) {
        let parent = match self.nodes[id.0].parent {
            Some(parent) => parent,
            None => return,
        };
        let pos = self.nodes[id.0].pos;
        self.nodes[parent.0].children.remove(pos);
        let following: Vec<DataNodeId> =
            self.nodes[parent.0].children[pos..].to_vec();
        for sibling in following {
            self.nodes[sibling.0].pos -= 1;
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: DataNodeId) {
        self.nodes[id.0].freed = true;
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.free_subtree(child);
        }
    }

    /// Purge every descendant of `top` that has any bit of `mask` set.
    /// Returns whether anything was removed.
    pub fn prune_flagged(&mut self, top: DataNodeId, mask: DataFlags) -> bool {
        let mut removed = false;
        let mut stack: Vec<DataNodeId> = self.children(top).to_vec();
        while let Some(id) = stack.pop() {
            if self.is_freed(id) {
                continue;
            }
            if self.has_flag(id, mask) {
                self.purge(id);
                removed = true;
            } else {
                stack.extend(self.children(id).iter().copied());
            }
        }
        removed
    }

    pub fn node_ref(&self, id: DataNodeId) -> DataNodeRef<'_> {
        DataNodeRef { tree: self, id }
    }

    /// Slash-separated path of local names from the root.
    pub fn path(&self, id: DataNodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            names.push(self.nodes[node.0].name.clone());
            cursor = self.nodes[node.0].parent;
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    // ----- sorting -----

    /// Sort the children of `parent` into schema order: bound children by
    /// the position of their (choice-lifted) schema node, list and
    /// leaf-list runs contiguous, ordered-by-system entries by key tuple.
    /// Unbound children keep their relative order at the tail.
    pub fn sort(&mut self, ctx: &Context, parent: DataNodeId) {
        let parent_spec = self.spec(parent);
        let mut children = self.nodes[parent.0].children.clone();
        let keys: Vec<(usize, usize, Vec<String>)> = children
            .iter()
            .map(|child| self.sort_key(ctx, parent_spec, *child))
            .collect();
        let mut order: Vec<usize> = (0..children.len()).collect();
        order.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
        children = order.iter().map(|i| children[*i]).collect();
        for (pos, child) in children.iter().enumerate() {
            self.nodes[child.0].pos = pos;
        }
        self.nodes[parent.0].children = children;
    }

    /// Sort the whole subtree rooted at `from`.
    pub fn sort_recursive(&mut self, ctx: &Context, from: DataNodeId) {
        self.sort(ctx, from);
        let children = self.nodes[from.0].children.clone();
        for child in children {
            self.sort_recursive(ctx, child);
        }
    }

    fn sort_key(
        &self,
        ctx: &Context,
        parent_spec: Option<SchemaNodeId>,
        id: DataNodeId,
    ) -> (usize, usize, Vec<String>) {
        let snode = match self.schema(ctx, id) {
            Some(snode) => snode,
            None => return (usize::MAX, usize::MAX, Vec::new()),
        };
        let (major, minor) = match parent_spec {
            Some(pspec) => {
                (0, snode.position_in(pspec).unwrap_or(usize::MAX))
            }
            None => {
                // Unbound parent (datastore top): order across modules by
                // registration, then by top-level position.
                let module = snode.module().id();
                (
                    ctx.module_index(module),
                    snode.position_in(module).unwrap_or(usize::MAX),
                )
            }
        };
        let tuple = match snode.kind() {
            SchemaNodeKind::List if !snode.is_user_ordered() => snode
                .key_names()
                .iter()
                .map(|key| {
                    self.child_by_name(id, key)
                        .and_then(|k| self.body(k))
                        .unwrap_or("")
                        .to_string()
                })
                .collect(),
            SchemaNodeKind::LeafList if !snode.is_user_ordered() => {
                vec![self.body(id).unwrap_or("").to_string()]
            }
            _ => Vec::new(),
        };
        (major, minor, tuple)
    }

    // ----- copying and merging -----

    /// Deep-copy a subtree of `src` under `parent`, preserving payload and
    /// flags. Returns the id of the copied subtree root.
    pub fn import_subtree(
        &mut self,
        src: &DataTree,
        src_id: DataNodeId,
        parent: DataNodeId,
    ) -> DataNodeId {
        let id = self.new_element(parent, &src.nodes[src_id.0].name);
        self.copy_payload(src, src_id, id);
        let children = src.nodes[src_id.0].children.clone();
        for child in children {
            self.import_subtree(src, child, id);
        }
        id
    }

    fn copy_payload(
        &mut self,
        src: &DataTree,
        src_id: DataNodeId,
        dst_id: DataNodeId,
    ) {
        let srcd = &src.nodes[src_id.0];
        let dstd = &mut self.nodes[dst_id.0];
        dstd.prefix = srcd.prefix.clone();
        dstd.namespaces = srcd.namespaces.clone();
        dstd.attrs = srcd.attrs.clone();
        dstd.value = srcd.value.clone();
        dstd.spec = srcd.spec;
        dstd.flags = srcd.flags;
    }

    /// Copy the marked spine of this tree into a new tree: subtrees rooted
    /// in `keep` are copied whole, `spine` nodes are copied shallow and
    /// descended into. The root is always part of the spine.
    pub fn copy_marked(
        &self,
        keep: &HashSet<DataNodeId>,
        spine: &HashSet<DataNodeId>,
    ) -> DataTree {
        let mut out = DataTree::new(&self.nodes[self.root.0].name);
        let out_root = out.root;
        out.copy_payload(self, self.root, out_root);
        self.copy_marked_at(self.root, &mut out, out_root, keep, spine);
        out
    }

    fn copy_marked_at(
        &self,
        src_id: DataNodeId,
        out: &mut DataTree,
        out_id: DataNodeId,
        keep: &HashSet<DataNodeId>,
        spine: &HashSet<DataNodeId>,
    ) {
        let children = self.nodes[src_id.0].children.clone();
        for child in children {
            if keep.contains(&child) {
                out.import_subtree(self, child, out_id);
            } else if spine.contains(&child) {
                let copy = out.new_element(out_id, &self.nodes[child.0].name);
                out.copy_payload(self, child, copy);
                self.copy_marked_at(child, out, copy, keep, spine);
            }
        }
    }

    /// Merge another tree into this one. Existing nodes win over incoming
    /// ones (an explicit value is never overwritten by a default); missing
    /// subtrees are deep-copied and the affected parents re-sorted.
    pub fn merge(&mut self, ctx: &Context, other: &DataTree) -> Result<()> {
        let children = other.nodes[other.root.0].children.clone();
        for child in children {
            self.merge_node(ctx, self.root, other, child)?;
        }
        Ok(())
    }

    fn merge_node(
        &mut self,
        ctx: &Context,
        parent: DataNodeId,
        src: &DataTree,
        src_id: DataNodeId,
    ) -> Result<()> {
        let name = &src.nodes[src_id.0].name;
        let src_ns = src.namespace(src_id);
        let target = self.children(parent).iter().copied().find(|child| {
            if self.nodes[child.0].name != *name {
                return false;
            }
            let tgt_ns = self.namespace(*child);
            match (tgt_ns, src_ns) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        });
        match target {
            Some(target) => {
                let children = src.nodes[src_id.0].children.clone();
                for child in children {
                    self.merge_node(ctx, target, src, child)?;
                }
            }
            None => {
                let copied = self.import_subtree(src, src_id, parent);
                self.fixup_namespace_recursive(src, src_id, copied);
                self.sort(ctx, parent);
            }
        }
        Ok(())
    }

    /// After copying a subtree from another tree, make sure every copied
    /// element still resolves to the namespace it had in the source tree.
    /// Prefixes declared on source ancestors outside the copied subtree
    /// are rebound against this tree's context chain, declaring the
    /// namespace locally when nothing in scope provides it.
    fn fixup_namespace_recursive(
        &mut self,
        src: &DataTree,
        src_id: DataNodeId,
        new_id: DataNodeId,
    ) {
        self.fixup_namespace(src, src_id, new_id);
        let pairs: Vec<(DataNodeId, DataNodeId)> = src
            .children(src_id)
            .iter()
            .copied()
            .zip(self.children(new_id).iter().copied())
            .collect();
        for (src_child, new_child) in pairs {
            self.fixup_namespace_recursive(src, src_child, new_child);
        }
    }

    fn fixup_namespace(
        &mut self,
        src: &DataTree,
        src_id: DataNodeId,
        new_id: DataNodeId,
    ) {
        let uri = match src.namespace(src_id) {
            Some(uri) => uri.to_string(),
            None => return,
        };
        if self.namespace(new_id) == Some(uri.as_str()) {
            return;
        }
        let parent = match self.parent(new_id) {
            Some(parent) => parent,
            None => return,
        };
        match self.prefix_for_namespace(parent, &uri) {
            Some(prefix) => {
                let prefix = prefix.map(|p| p.to_string());
                self.set_prefix(new_id, prefix.as_deref());
            }
            None => {
                let prefix = src.prefix(src_id).map(|p| p.to_string());
                self.add_namespace(new_id, prefix.as_deref(), &uri);
                self.set_prefix(new_id, prefix.as_deref());
            }
        }
    }

    // ----- parsing and printing -----

    /// Parse an XML document into a tree. Comments, processing instructions
    /// and whitespace-only text are ignored; exactly one root element is
    /// expected.
    pub fn parse_string(xml: &str) -> Result<DataTree> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut tree: Option<DataTree> = None;
        let mut stack: Vec<DataNodeId> = Vec::new();
        loop {
            let event =
                reader.read_event().map_err(|e| Error::parse(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    let id = open_element(&mut tree, &stack, &start)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    open_element(&mut tree, &stack, &start)?;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::parse(e.to_string()))?;
                    append_body(&mut tree, &stack, &text)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    append_body(&mut tree, &stack, &text)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        tree.ok_or_else(|| Error::parse("no root element"))
    }

    /// Serialise the tree into a string.
    pub fn print_string(&self, flags: PrintFlags) -> String {
        let mut buf = String::new();
        self.print_node(&mut buf, self.root, flags, 0);
        buf
    }

    fn print_node(
        &self,
        buf: &mut String,
        id: DataNodeId,
        flags: PrintFlags,
        indent: usize,
    ) {
        let data = &self.nodes[id.0];
        if flags.contains(PrintFlags::SKIP_DEFAULT)
            && data.flags.contains(DataFlags::DEFAULT)
        {
            return;
        }
        let pretty = flags.contains(PrintFlags::PRETTY);
        if pretty {
            buf.push_str(&"  ".repeat(indent));
        }
        buf.push('<');
        buf.push_str(&qname(&data.prefix, &data.name));
        for (prefix, uri) in &data.namespaces {
            match prefix {
                Some(prefix) => {
                    buf.push_str(&format!(" xmlns:{}=\"{}\"", prefix, uri))
                }
                None => buf.push_str(&format!(" xmlns=\"{}\"", uri)),
            }
        }
        for attr in &data.attrs {
            buf.push_str(&format!(
                " {}=\"{}\"",
                qname(&attr.prefix, &attr.name),
                escape(&attr.value)
            ));
        }
        let printable: Vec<DataNodeId> = data
            .children
            .iter()
            .copied()
            .filter(|child| {
                !(flags.contains(PrintFlags::SKIP_DEFAULT)
                    && self.has_flag(*child, DataFlags::DEFAULT))
            })
            .collect();
        if printable.is_empty() && data.value.is_none() {
            buf.push_str("/>");
        } else {
            buf.push('>');
            if let Some(value) = &data.value {
                buf.push_str(&escape(value));
            }
            if !printable.is_empty() {
                if pretty {
                    buf.push('\n');
                }
                for child in printable {
                    self.print_node(buf, child, flags, indent + 1);
                }
                if pretty {
                    buf.push_str(&"  ".repeat(indent));
                }
            }
            buf.push_str(&format!("</{}>", qname(&data.prefix, &data.name)));
        }
        if pretty {
            buf.push('\n');
        }
    }
}

// ===== impl DataNodeRef =====

impl<'a> DataNodeRef<'a> {
    pub fn id(&self) -> DataNodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.tree.nodes[self.id.0].name
    }

    /// The body (text value) of the element.
    pub fn value(&self) -> Option<&'a str> {
        self.tree.nodes[self.id.0].value.as_deref()
    }

    pub fn schema_id(&self) -> Option<SchemaNodeId> {
        self.tree.nodes[self.id.0].spec
    }

    pub fn flags(&self) -> DataFlags {
        self.tree.nodes[self.id.0].flags
    }

    /// Whether the node was synthesised from a schema default.
    pub fn is_default(&self) -> bool {
        self.flags().contains(DataFlags::DEFAULT)
    }

    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }

    /// Returns an iterator over the ancestors of the node.
    pub fn ancestors(&self) -> Ancestors<'a, DataNodeRef<'a>> {
        Ancestors::new(self.parent())
    }

    /// Returns an iterator over the node and its ancestors.
    pub fn inclusive_ancestors(&self) -> Ancestors<'a, DataNodeRef<'a>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over the following siblings.
    pub fn siblings(&self) -> Siblings<'a, DataNodeRef<'a>> {
        Siblings::new(self.next_sibling())
    }

    /// Returns an iterator over the node and its following siblings.
    pub fn inclusive_siblings(&self) -> Siblings<'a, DataNodeRef<'a>> {
        Siblings::new(Some(self.clone()))
    }

    /// Returns an iterator over the child nodes.
    pub fn children(&self) -> Siblings<'a, DataNodeRef<'a>> {
        Siblings::new(self.first_child())
    }

    /// Returns an iterator over all elements of the subtree (depth-first
    /// search algorithm).
    pub fn traverse(&self) -> Traverse<'a, DataNodeRef<'a>> {
        Traverse::new(self.clone())
    }
}

impl<'a> NodeIterable<'a> for DataNodeRef<'a> {
    fn parent(&self) -> Option<DataNodeRef<'a>> {
        let parent = self.tree.nodes[self.id.0].parent?;
        Some(DataNodeRef {
            tree: self.tree,
            id: parent,
        })
    }

    fn next_sibling(&self) -> Option<DataNodeRef<'a>> {
        let parent = self.tree.nodes[self.id.0].parent?;
        let pos = self.tree.nodes[self.id.0].pos;
        let next = self.tree.nodes[parent.0].children.get(pos + 1)?;
        Some(DataNodeRef {
            tree: self.tree,
            id: *next,
        })
    }

    fn first_child(&self) -> Option<DataNodeRef<'a>> {
        let child = self.tree.nodes[self.id.0].children.first()?;
        Some(DataNodeRef {
            tree: self.tree,
            id: *child,
        })
    }
}

impl PartialEq for DataNodeRef<'_> {
    fn eq(&self, other: &DataNodeRef<'_>) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

// ===== helpers =====

fn qname(prefix: &Option<String>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, name),
        None => name.to_string(),
    }
}

pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn open_element(
    tree: &mut Option<DataTree>,
    stack: &[DataNodeId],
    start: &BytesStart<'_>,
) -> Result<DataNodeId> {
    let raw = start.name();
    let qname = std::str::from_utf8(raw.as_ref())
        .map_err(|e| Error::parse(e.to_string()))?
        .to_string();
    let (prefix, local) = split_qname(&qname);

    let id = match stack.last() {
        Some(parent) => {
            let tree = tree.as_mut().unwrap();
            tree.new_element(*parent, local)
        }
        None => {
            if tree.is_some() {
                return Err(Error::parse("multiple root elements"));
            }
            *tree = Some(DataTree::new(local));
            tree.as_ref().unwrap().root()
        }
    };
    let tree = tree.as_mut().unwrap();
    tree.set_prefix(id, prefix);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::parse(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::parse(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::parse(e.to_string()))?
            .into_owned();
        if key == "xmlns" {
            tree.add_namespace(id, None, &value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            tree.add_namespace(id, Some(prefix), &value);
        } else {
            let (aprefix, aname) = split_qname(&key);
            tree.add_attr(id, aprefix, aname, &value);
        }
    }
    Ok(id)
}

fn append_body(
    tree: &mut Option<DataTree>,
    stack: &[DataNodeId],
    text: &str,
) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let id = match stack.last() {
        Some(id) => *id,
        None => return Err(Error::parse("text outside of root element")),
    };
    let tree = tree.as_mut().unwrap();
    let value = match tree.body(id) {
        Some(existing) => format!("{}{}", existing, text),
        None => text.to_string(),
    };
    tree.set_body(id, &value);
    Ok(())
}
