//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Binding of XML elements to their schema nodes.

use log::debug;

use crate::context::Context;
use crate::data::{DataNodeId, DataTree};
use crate::error::Result;
use crate::schema::SchemaNode;

/// Bind every element of the tree to its schema node.
///
/// The root binds against the module set; it may also be an unbound
/// datastore-top wrapper, in which case its children bind against the
/// module set instead. Elements with no schema match are tolerated: they
/// are left unbound, their subtrees are skipped, and later validation
/// passes ignore them. Binding is idempotent.
///
/// Fails only when a lookup is ambiguous (two schema nodes claim the same
/// name), which is a schema bug.
pub fn bind_tree(ctx: &Context, tree: &mut DataTree) -> Result<()> {
    let root = tree.root();
    let name = tree.name(root).to_string();
    let namespace = tree.namespace(root).map(str::to_string);
    match ctx.find_top(namespace.as_deref(), &name)? {
        Some(snode) => tree.set_spec(root, Some(snode.id())),
        None => tree.set_spec(root, None),
    }
    bind_children(ctx, tree, root)
}

fn bind_children(
    ctx: &Context,
    tree: &mut DataTree,
    parent: DataNodeId,
) -> Result<()> {
    let parent_spec = tree.spec(parent);
    let children = tree.children(parent).to_vec();
    for child in children {
        let name = tree.name(child).to_string();
        let namespace = tree.namespace(child).map(str::to_string);
        let snode: Option<SchemaNode<'_>> = match parent_spec {
            Some(pspec) => {
                ctx.node(pspec).find_child(namespace.as_deref(), &name)
            }
            // Children of an unbound datastore top bind against the
            // module set.
            None if parent == tree.root() => {
                ctx.find_top(namespace.as_deref(), &name)?
            }
            None => None,
        };
        match snode {
            Some(snode) => {
                tree.set_spec(child, Some(snode.id()));
                bind_children(ctx, tree, child)?;
            }
            None => {
                debug!("no schema match for {}", tree.path(child));
                tree.set_spec(child, None);
            }
        }
    }
    Ok(())
}
