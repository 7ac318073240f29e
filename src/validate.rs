//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG structural validation: min/max-elements, list keys, unique
//! constraints and duplicate removal.
//!
//! All passes assume the tree is bound ([`crate::bind::bind_tree`]) and its
//! children sorted into schema order ([`crate::data::DataTree::sort`]), so
//! that list runs are contiguous and ordered-by-system entries are in key
//! order.

use log::debug;

use crate::context::Context;
use crate::data::{DataFlags, DataNodeId, DataTree};
use crate::error::{Error, ErrorKind, Result};
use crate::iter::NodeIterable;
use crate::netconf::RpcError;
use crate::schema::{SchemaNode, SchemaNodeId, SchemaNodeKind};
use crate::xpath;

/// Outcome of a validation pass.
///
/// A pass distinguishes user-visible constraint failures, which the caller
/// serialises into its NETCONF reply, from internal faults, which surface
/// as [`Error`] and abort the transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Validity {
    Valid,
    Invalid(RpcError),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn into_error(self) -> Option<RpcError> {
        match self {
            Validity::Valid => None,
            Validity::Invalid(error) => Some(error),
        }
    }
}

/// Early-return with the failure when the checked expression is invalid.
macro_rules! check {
    ($expr:expr) => {
        match $expr {
            Validity::Valid => {}
            invalid => return Ok(invalid),
        }
    };
}

/// Single-pass min/max-elements and unique check over the children of `xt`.
///
/// The walker exploits schema sharing between siblings: a contiguous run of
/// list entries shares one schema node, so one forward pass with a running
/// counter covers every run. Empty lists are caught by gap analysis against
/// the parent schema's child order; empty choice cases are not detected.
/// With `presence_recurse` set the walker also descends into non-presence
/// containers.
pub fn validate_minmax(
    ctx: &Context,
    tree: &DataTree,
    xt: DataNodeId,
    presence_recurse: bool,
) -> Result<Validity> {
    let yt = tree.spec(xt);
    let mut yprev: Option<SchemaNodeId> = None;
    let mut nr: u32 = 0;
    let mut inext: usize = 0;
    let mut ye: Option<SchemaNodeId> = None;

    let children = tree.children(xt).to_vec();
    for x in children {
        let y = match tree.spec(x) {
            Some(y) => y,
            None => continue,
        };
        let ynode = ctx.node(y);
        match ynode.kind() {
            SchemaNodeKind::List | SchemaNodeKind::LeafList => {
                if Some(y) == yprev {
                    nr += 1;
                    continue;
                }
                check!(gap_analysis(
                    ctx, tree, xt, y, yt, &mut inext, &mut ye
                ));
                if let Some(yp) = yprev {
                    let ypnode = ctx.node(yp);
                    if is_multi(&ypnode) {
                        check!(check_minmax(tree, xt, &ypnode, nr));
                    }
                }
                nr = 1;
                let (validity, _) = match ynode.kind() {
                    SchemaNodeKind::List => check_new_list(ctx, tree, x, y)?,
                    _ => check_new_leaf_list(tree, x, y)?,
                };
                check!(validity);
                yprev = Some(y);
            }
            _ => {
                if Some(y) == yprev {
                    // Only lists and leaf-lists may repeat.
                    return Ok(Validity::Invalid(RpcError::minmax_elements(
                        tree.path(xt),
                        tree.name(x),
                        true,
                    )));
                }
                check!(gap_analysis(
                    ctx, tree, xt, y, yt, &mut inext, &mut ye
                ));
                if let Some(yp) = yprev {
                    let ypnode = ctx.node(yp);
                    if is_multi(&ypnode) {
                        check!(check_minmax(tree, xt, &ypnode, nr));
                        nr = 0;
                    }
                }
                if presence_recurse && ynode.is_np_container() {
                    check!(validate_minmax(ctx, tree, x, presence_recurse)?);
                }
                yprev = Some(y);
            }
        }
    }

    // After the pass: the remaining schema children may hold empty lists.
    while let Some(rest) = schema_child(ctx, yt, &mut inext) {
        check!(check_empty_list_minmax(ctx, tree, xt, &ctx.node(rest)));
    }
    // Terminal check for a trailing list run.
    if let Some(yp) = yprev {
        let ypnode = ctx.node(yp);
        if is_multi(&ypnode) {
            check!(check_minmax(tree, xt, &ypnode, nr));
        }
    }
    Ok(Validity::Valid)
}

/// Recursive min/max-elements and unique check over a whole tree.
pub fn validate_minmax_recursive(
    ctx: &Context,
    tree: &DataTree,
    root: DataNodeId,
) -> Result<Validity> {
    for node in tree.node_ref(root).traverse() {
        check!(validate_minmax(ctx, tree, node.id(), true)?);
    }
    Ok(Validity::Valid)
}

/// Unique and duplicate check over the children of `xt`, without the
/// min/max-elements machinery.
pub fn validate_unique(
    ctx: &Context,
    tree: &DataTree,
    xt: DataNodeId,
) -> Result<Validity> {
    let mut yprev: Option<SchemaNodeId> = None;
    let children = tree.children(xt).to_vec();
    for x in children {
        let y = match tree.spec(x) {
            Some(y) => y,
            None => continue,
        };
        let kind = ctx.node(y).kind();
        match kind {
            SchemaNodeKind::List | SchemaNodeKind::LeafList => {
                if Some(y) == yprev {
                    continue;
                }
                let (validity, _) = match kind {
                    SchemaNodeKind::List => check_new_list(ctx, tree, x, y)?,
                    _ => check_new_leaf_list(tree, x, y)?,
                };
                check!(validity);
                yprev = Some(y);
            }
            _ => {}
        }
    }
    Ok(Validity::Valid)
}

/// Recursive unique check over a whole tree.
pub fn validate_unique_recursive(
    ctx: &Context,
    tree: &DataTree,
    root: DataNodeId,
) -> Result<Validity> {
    for node in tree.node_ref(root).traverse() {
        check!(validate_unique(ctx, tree, node.id())?);
    }
    Ok(Validity::Valid)
}

/// Remove duplicate list and leaf-list entries, keeping the last entry of
/// each colliding pair (the merge policy of datastore assembly). Runs until
/// stable; a `unique`-statement violation cannot be auto-removed and is
/// returned as invalid.
pub fn remove_duplicates_recursive(
    ctx: &Context,
    tree: &mut DataTree,
    root: DataNodeId,
) -> Result<Validity> {
    let order: Vec<DataNodeId> =
        tree.node_ref(root).traverse().map(|node| node.id()).collect();
    for xt in order {
        if tree.is_freed(xt) {
            continue;
        }
        check!(remove_duplicates_at(ctx, tree, xt)?);
    }
    Ok(Validity::Valid)
}

fn remove_duplicates_at(
    ctx: &Context,
    tree: &mut DataTree,
    xt: DataNodeId,
) -> Result<Validity> {
    loop {
        let mut again = false;
        let mut yprev: Option<SchemaNodeId> = None;
        let children = tree.children(xt).to_vec();
        for x in children {
            let y = match tree.spec(x) {
                Some(y) => y,
                None => continue,
            };
            let kind = ctx.node(y).kind();
            if !matches!(
                kind,
                SchemaNodeKind::List | SchemaNodeKind::LeafList
            ) {
                continue;
            }
            if Some(y) == yprev {
                continue;
            }
            let (validity, duplicate) = match kind {
                SchemaNodeKind::List => check_new_list(ctx, tree, x, y)?,
                _ => check_new_leaf_list(tree, x, y)?,
            };
            if let Validity::Invalid(error) = validity {
                if let Some(duplicate) = duplicate {
                    debug!(
                        "removing duplicate entry {}",
                        tree.path(duplicate)
                    );
                    tree.set_flag(duplicate, DataFlags::DEL);
                }
                if tree.prune_flagged(xt, DataFlags::DEL) {
                    // Entries were dropped; discard the pending error and
                    // rescan this parent.
                    again = true;
                    break;
                }
                return Ok(Validity::Invalid(error));
            }
            yprev = Some(y);
        }
        if !again {
            return Ok(Validity::Valid);
        }
    }
}

// ===== walker internals =====

fn is_multi(snode: &SchemaNode<'_>) -> bool {
    matches!(
        snode.kind(),
        SchemaNodeKind::List | SchemaNodeKind::LeafList
    )
}

/// Ordered iteration cursor over the children of an (optional) schema node.
fn schema_child(
    ctx: &Context,
    yt: Option<SchemaNodeId>,
    inext: &mut usize,
) -> Option<SchemaNodeId> {
    let yt = yt?;
    let child = ctx.nodes[yt.0].children.get(*inext).copied()?;
    *inext += 1;
    Some(child)
}

/// Check `min-elements`/`max-elements` of one list run under `xp`.
fn check_minmax(
    tree: &DataTree,
    xp: DataNodeId,
    y: &SchemaNode<'_>,
    nr: u32,
) -> Validity {
    if let Some(min) = y.min_elements() {
        if nr < min {
            debug!("too few {} entries under {}", y.name(), tree.path(xp));
            return Validity::Invalid(RpcError::minmax_elements(
                tree.path(xp),
                y.name(),
                false,
            ));
        }
    }
    if let Some(max) = y.max_elements() {
        if nr > max {
            return Validity::Invalid(RpcError::minmax_elements(
                tree.path(xp),
                y.name(),
                true,
            ));
        }
    }
    Validity::Valid
}

/// Check an absent schema child: an empty list violates its
/// `min-elements`, and a non-presence container may hide one further down.
fn check_empty_list_minmax(
    ctx: &Context,
    tree: &DataTree,
    xt: DataNodeId,
    ye: &SchemaNode<'_>,
) -> Validity {
    if !ye.is_config() {
        return Validity::Valid;
    }
    if ye.is_np_container() {
        for child in ye.children() {
            match check_empty_list_minmax(ctx, tree, xt, &child) {
                Validity::Valid => {}
                invalid => return invalid,
            }
        }
    } else if is_multi(ye) {
        return check_minmax(tree, xt, ye, 0);
    }
    Validity::Valid
}

/// Gap analysis over the schema child interval between the iteration
/// cursor and the (choice-lifted) schema node of the current child: any
/// intervening list with `min-elements` has zero entries. Empty choice
/// cases are intentionally not analysed.
#[allow(clippy::too_many_arguments)]
fn gap_analysis(
    ctx: &Context,
    tree: &DataTree,
    xt: DataNodeId,
    y: SchemaNodeId,
    yt: Option<SchemaNodeId>,
    inext: &mut usize,
    ye: &mut Option<SchemaNodeId>,
) -> Validity {
    let ynode = ctx.node(y);
    let ych: Option<SchemaNodeId> = Some(match yt {
        Some(yt) => ynode.child_of(yt).map(|snode| snode.id()).unwrap_or(y),
        None => y,
    });
    // Skip while iterating multiple children of the same schema node
    // (e.g. several lists of one case), and when the parent is unbound.
    if yt.is_some() && ych != *ye {
        *ye = schema_child(ctx, yt, inext);
        if ye.is_some() && ych != *ye {
            loop {
                let cursor = ye.unwrap();
                match check_empty_list_minmax(ctx, tree, xt, &ctx.node(cursor))
                {
                    Validity::Valid => {}
                    invalid => return invalid,
                }
                *ye = schema_child(ctx, yt, inext);
                if ye.is_none() || *ye == ych {
                    break;
                }
            }
        }
    }
    Validity::Valid
}

// ===== unique/key checker =====

/// Next sibling of `x` still belonging to the same list run.
fn next_in_run(
    tree: &DataTree,
    x: DataNodeId,
    y: SchemaNodeId,
) -> Option<DataNodeId> {
    let next = tree.node_ref(x).next_sibling()?.id();
    if tree.spec(next) == Some(y) {
        Some(next)
    } else {
        None
    }
}

/// Key and unique checks for a new list run starting at `x`.
///
/// Returns the validity plus the earlier entry of a colliding key pair, for
/// the duplicate remover. Violations of `unique` statements carry no
/// removable entry.
fn check_new_list(
    ctx: &Context,
    tree: &DataTree,
    x: DataNodeId,
    y: SchemaNodeId,
) -> Result<(Validity, Option<DataNodeId>)> {
    let ynode = ctx.node(y);
    let keys = ynode.key_names();
    let outcome = check_unique_list_direct(ctx, tree, x, y, keys, true)?;
    if !outcome.0.is_valid() {
        return Ok(outcome);
    }
    for unique in ynode.unique_statements() {
        let outcome = check_unique_list(ctx, tree, x, y, unique)?;
        if !outcome.0.is_valid() {
            return Ok(outcome);
        }
    }
    Ok((Validity::Valid, None))
}

/// One `unique` statement of a list.
///
/// Two variants are supported: a list of direct descendant names
/// (`unique "a b"`) and a single transient schema-node-id (`unique "a/b"`).
/// Combining both would make the constraint a cross product of result sets,
/// so it is rejected.
fn check_unique_list(
    ctx: &Context,
    tree: &DataTree,
    x0: DataNodeId,
    y: SchemaNodeId,
    unique: &[String],
) -> Result<(Validity, Option<DataNodeId>)> {
    if unique.len() != 1 {
        return check_unique_list_direct(ctx, tree, x0, y, unique, false);
    }
    let arg = &unique[0];
    if !arg.contains('/') {
        return check_unique_list_direct(
            ctx,
            tree,
            x0,
            y,
            std::slice::from_ref(arg),
            false,
        );
    }

    // Transient descendant: canonicalise against the list's module, then
    // accumulate the matched body strings across the run.
    let module = ctx.node(y).module();
    let (cpath, nsc) = xpath::canonicalize(arg, &module)?;
    let mut seen: Vec<String> = Vec::new();
    let mut cursor = Some(x0);
    while let Some(x) = cursor {
        for xi in xpath::xpath_vec(tree, x, &nsc, &cpath)? {
            let body = match tree.body(xi) {
                Some(body) => body,
                None => break,
            };
            if seen.iter().any(|s| s == body) {
                let error = RpcError::data_not_unique(
                    tree.path(x),
                    vec![(arg.clone(), body.to_string())],
                );
                return Ok((Validity::Invalid(error), None));
            }
            seen.push(body.to_string());
        }
        cursor = next_in_run(tree, x, y);
    }
    Ok((Validity::Valid, None))
}

/// Duplicate detection over a tuple of direct descendant leaf values.
///
/// Entries missing any referenced leaf are not taken into account
/// (RFC 7950 section 7.8.3.1). For an ordered-by-system list checked by its
/// true keys the entries are already in key order and comparing against the
/// previous tuple suffices; otherwise a quadratic backward scan is used.
fn check_unique_list_direct(
    ctx: &Context,
    tree: &DataTree,
    x0: DataNodeId,
    y: SchemaNodeId,
    names: &[String],
    is_keys: bool,
) -> Result<(Validity, Option<DataNodeId>)> {
    let clen = names.len();
    if clen == 0 {
        // Keyless list: nothing to check.
        return Ok((Validity::Valid, None));
    }
    let sorted = is_keys && !ctx.node(y).is_user_ordered();

    let mut entries: Vec<DataNodeId> = Vec::new();
    let mut rows: Vec<Option<Vec<String>>> = Vec::new();
    let mut cursor = Some(x0);
    while let Some(x) = cursor {
        let mut tuple = Vec::with_capacity(clen);
        let mut complete = true;
        for name in names {
            if name.contains('/') {
                return Err(Error::new(
                    ErrorKind::MultipleDescendant,
                    format!(
                        "multiple descendant nodes not allowed (w /): {}",
                        name
                    ),
                ));
            }
            match tree.child_by_name(x, name).and_then(|c| tree.body(c)) {
                Some(body) => tuple.push(body.to_string()),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            let duplicate = if sorted {
                match rows.last() {
                    Some(Some(prev)) if *prev == tuple => Some(rows.len() - 1),
                    _ => None,
                }
            } else {
                rows.iter().position(|row| row.as_ref() == Some(&tuple))
            };
            if let Some(duplicate) = duplicate {
                let keys = names
                    .iter()
                    .cloned()
                    .zip(tuple.iter().cloned())
                    .collect();
                let error = RpcError::data_not_unique(tree.path(x), keys);
                return Ok((
                    Validity::Invalid(error),
                    Some(entries[duplicate]),
                ));
            }
            rows.push(Some(tuple));
        } else {
            rows.push(None);
        }
        entries.push(x);
        cursor = next_in_run(tree, x, y);
    }
    Ok((Validity::Valid, None))
}

/// Duplicate detection over a leaf-list run: element bodies are compared
/// pairwise, for ordered-by-user and ordered-by-system alike.
fn check_new_leaf_list(
    tree: &DataTree,
    x0: DataNodeId,
    y: SchemaNodeId,
) -> Result<(Validity, Option<DataNodeId>)> {
    let mut xi = Some(x0);
    while let Some(i) = xi {
        if let Some(bi) = tree.body(i) {
            let mut xj = next_in_run(tree, i, y);
            while let Some(j) = xj {
                if tree.body(j) == Some(bi) {
                    let error = RpcError::data_not_unique(
                        tree.path(i),
                        vec![("name".to_string(), bi.to_string())],
                    );
                    return Ok((Validity::Invalid(error), Some(i)));
                }
                xj = next_in_run(tree, j, y);
            }
        }
        xi = next_in_run(tree, i, y);
    }
    Ok((Validity::Valid, None))
}
