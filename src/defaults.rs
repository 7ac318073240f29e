//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Materialisation of schema default values, the NETCONF with-defaults
//! modes (RFC 6243) and non-presence container pruning.

use std::collections::HashSet;

use log::debug;

use crate::context::Context;
use crate::data::{DataFlags, DataNodeId, DataTree};
use crate::error::{Error, Result};
use crate::netconf::{WITH_DEFAULTS_ATTR_PREFIX, WITH_DEFAULTS_NAMESPACE};
use crate::schema::{SchemaNode, SchemaNodeId, SchemaNodeKind};
use crate::xpath::{self, NsContext};

/// Name of the synthetic element at the top of a datastore (and of the
/// cached global default trees).
pub const DATASTORE_TOP_SYMBOL: &str = "config";

/// The with-defaults retrieval modes of RFC 6243.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WithDefaults {
    /// Report only explicitly set values.
    Explicit,
    /// Strip nodes whose value equals the schema default.
    Trim,
    /// Report all default values.
    ReportAll,
    /// Report all default values and tag them with `wd:default="true"`.
    ReportAllTagged,
}

impl WithDefaults {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithDefaults::Explicit => "explicit",
            WithDefaults::Trim => "trim",
            WithDefaults::ReportAll => "report-all",
            WithDefaults::ReportAllTagged => "report-all-tagged",
        }
    }
}

impl std::str::FromStr for WithDefaults {
    type Err = Error;

    fn from_str(text: &str) -> Result<WithDefaults> {
        match text {
            "explicit" => Ok(WithDefaults::Explicit),
            "trim" => Ok(WithDefaults::Trim),
            "report-all" => Ok(WithDefaults::ReportAll),
            "report-all-tagged" => Ok(WithDefaults::ReportAllTagged),
            _ => Err(Error::parse(format!(
                "unknown with-defaults mode {}",
                text
            ))),
        }
    }
}

/// Pruning behavior for empty non-presence containers and default leaves.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PruneMode {
    /// Report only, remove nothing.
    None,
    /// Remove config nodes that are empty non-presence containers or
    /// default leaves.
    Config,
    /// Remove all such nodes.
    All,
    /// Remove empty non-presence containers only.
    NpOnly,
}

// ===== default creation =====

/// Create an element for schema node `y` under `xt`, bound and correctly
/// prefixed against the target's namespace context. When the namespace is
/// not in scope an `xmlns` declaration is added on the new element, using
/// the module's canonical prefix.
fn default_create1(
    tree: &mut DataTree,
    y: &SchemaNode<'_>,
    xt: DataNodeId,
) -> DataNodeId {
    let xc = tree.new_element(xt, y.name());
    tree.set_spec(xc, Some(y.id()));
    let namespace = y.namespace();
    let found = tree
        .prefix_for_namespace(xt, namespace)
        .map(|prefix| prefix.map(|p| p.to_string()));
    match found {
        Some(prefix) => tree.set_prefix(xc, prefix.as_deref()),
        None => {
            let prefix = y.module().prefix().to_string();
            tree.add_namespace(xc, Some(&prefix), namespace);
            tree.set_prefix(xc, Some(&prefix));
        }
    }
    xc
}

/// Create a leaf carrying its schema default value, flagged DEFAULT.
fn default_create(
    tree: &mut DataTree,
    y: &SchemaNode<'_>,
    xt: DataNodeId,
) -> Result<DataNodeId> {
    let value = y
        .default_value()
        .ok_or_else(|| {
            Error::internal(format!("leaf {} has no default value", y.name()))
        })?
        .to_string();
    let xc = default_create1(tree, y, xt);
    tree.set_flag(xc, DataFlags::DEFAULT);
    tree.set_body(xc, &value);
    debug!("created default {}={}", tree.path(xc), value);
    Ok(xc)
}

/// Would creating non-presence container `yt` introduce any default? True
/// when a reachable leaf default, a nested non-presence container with one,
/// or a choice with a default case exists, honouring the config/state
/// guards.
fn nopresence_needed(yt: &SchemaNode<'_>, state: bool) -> bool {
    for y in yt.children() {
        if !state && !y.is_config() {
            continue;
        }
        if state && y.is_config() {
            continue;
        }
        match y.kind() {
            SchemaNodeKind::Leaf => {
                if y.has_default() {
                    return true;
                }
            }
            SchemaNodeKind::Container => {
                if y.is_np_container() && nopresence_needed(&y, state) {
                    return true;
                }
            }
            SchemaNodeKind::Choice => {
                if y.default_case().is_some() {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// RFC 7950 section 7.9.3: the default case of a choice is instantiated
/// only when no child node from any of the choice's cases is present.
fn default_choice(
    ctx: &Context,
    tree: &mut DataTree,
    yc: &SchemaNode<'_>,
    xt: DataNodeId,
    state: bool,
) -> Result<()> {
    let children = tree.children(xt).to_vec();
    for x in children {
        let y = match tree.spec(x) {
            Some(y) => y,
            None => continue,
        };
        if ctx
            .node(y)
            .inclusive_ancestors()
            .any(|snode| snode.id() == yc.id())
        {
            // Some case of this choice is populated.
            return Ok(());
        }
    }
    if let Some(case) = yc.default_case() {
        fill_defaults(ctx, tree, xt, case.id(), state)?;
    }
    Ok(())
}

/// Whether the `when` condition of `y`, if any, holds on `xt`. Creation of
/// a default node is suppressed when it does not.
fn when_allows(
    ctx: &Context,
    tree: &DataTree,
    y: &SchemaNode<'_>,
    xt: DataNodeId,
) -> Result<bool> {
    match y.when() {
        Some(expr) => {
            let nsc = NsContext::canonical(ctx);
            xpath::xpath_bool(tree, xt, &nsc, expr)
        }
        None => Ok(true),
    }
}

/// Ensure default values are set on the direct schema children of one XML
/// node.
///
/// Not recursive, except through non-presence containers that have to be
/// invented to host a default further down. `state` selects state-data
/// materialisation, which skips `config true` subtrees (the running config
/// already supplies those); config materialisation skips `config false`
/// nodes entirely. The parent is re-sorted after every insertion so later
/// passes see schema order.
pub fn fill_defaults(
    ctx: &Context,
    tree: &mut DataTree,
    xt: DataNodeId,
    yt: SchemaNodeId,
    state: bool,
) -> Result<()> {
    match ctx.node(yt).kind() {
        SchemaNodeKind::Module
        | SchemaNodeKind::Container
        | SchemaNodeKind::List
        | SchemaNodeKind::Input
        | SchemaNodeKind::Output
        | SchemaNodeKind::Case => {}
        _ => return Ok(()),
    }
    let children: Vec<SchemaNodeId> =
        ctx.node(yt).children().map(|snode| snode.id()).collect();
    for yc in children {
        let ycnode = ctx.node(yc);
        if !state && !ycnode.is_config() {
            continue;
        }
        if state && ycnode.is_config() {
            continue;
        }
        match ycnode.kind() {
            SchemaNodeKind::Leaf => {
                if !ycnode.has_default() {
                    continue;
                }
                if !when_allows(ctx, tree, &ycnode, xt)? {
                    continue;
                }
                if tree.child_by_name(xt, ycnode.name()).is_none() {
                    default_create(tree, &ycnode, xt)?;
                    tree.sort(ctx, xt);
                }
            }
            SchemaNodeKind::Container => {
                if !ycnode.is_np_container() {
                    continue;
                }
                if !when_allows(ctx, tree, &ycnode, xt)? {
                    continue;
                }
                if tree.child_by_name(xt, ycnode.name()).is_some() {
                    continue;
                }
                // Invent the container only when a descendant default
                // needs it.
                if nopresence_needed(&ycnode, state) {
                    let xc = default_create1(tree, &ycnode, xt);
                    tree.set_flag(xc, DataFlags::DEFAULT);
                    tree.sort(ctx, xt);
                    fill_defaults(ctx, tree, xc, yc, state)?;
                }
            }
            SchemaNodeKind::Choice => {
                default_choice(ctx, tree, &ycnode, xt, state)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Selectively recursive variant of [`fill_defaults`] driven by node flags.
///
/// With a non-empty `flag` mask, only subtrees whose root carries CHANGE or
/// any bit of the mask are descended into; below a masked node everything
/// is processed. An empty mask processes the whole tree.
pub fn fill_defaults_recursive(
    ctx: &Context,
    tree: &mut DataTree,
    xn: DataNodeId,
    state: bool,
    flag: DataFlags,
) -> Result<()> {
    let mut flag = flag;
    if !flag.is_empty() {
        if tree.has_flag(xn, DataFlags::CHANGE) {
            // Continue with the same gate.
        } else if tree.has_flag(xn, flag) {
            // Below this point, process everything.
            flag = DataFlags::empty();
        } else {
            return Ok(());
        }
    }
    if let Some(yn) = tree.spec(xn) {
        fill_defaults(ctx, tree, xn, yn, state)?;
    }
    let children = tree.children(xn).to_vec();
    for x in children {
        if let Some(y) = tree.spec(x) {
            if !state && !ctx.node(y).is_config() {
                continue;
            }
        }
        fill_defaults_recursive(ctx, tree, x, state, flag)?;
    }
    Ok(())
}

/// Build a fully expanded default tree for the whole schema, rooted in a
/// synthetic datastore-top element. Used to populate the per-context cache.
pub(crate) fn build_global_defaults(
    ctx: &Context,
    state: bool,
) -> Result<DataTree> {
    debug!(
        "building global {} defaults",
        if state { "state" } else { "config" }
    );
    let mut tree = DataTree::new(DATASTORE_TOP_SYMBOL);
    let root = tree.root();
    for module in ctx.modules() {
        fill_defaults(ctx, &mut tree, root, module.id(), state)?;
    }
    Ok(tree)
}

/// Merge the cached global default tree into `xt`, restricted to the
/// subtrees matching `xpath` (the whole tree when `None`).
///
/// The cache itself is shared and never mutated: the matching subtrees and
/// their ancestor spine are copied into a scratch tree which is then merged
/// into the caller's tree, explicit values winning over defaults.
pub fn global_defaults(
    ctx: &Context,
    tree: &mut DataTree,
    nsc: &NsContext,
    xpath: Option<&str>,
    state: bool,
) -> Result<()> {
    let cache = ctx.global_defaults_tree(state)?;
    let matched =
        xpath::xpath_vec(cache, cache.root(), nsc, xpath.unwrap_or("/"))?;
    if matched.is_empty() {
        return Ok(());
    }
    let mut keep: HashSet<DataNodeId> = matched.into_iter().collect();
    if keep.remove(&cache.root()) {
        keep.extend(cache.children(cache.root()).iter().copied());
    }
    let mut spine: HashSet<DataNodeId> = HashSet::new();
    for id in &keep {
        let mut cursor = cache.parent(*id);
        while let Some(parent) = cursor {
            spine.insert(parent);
            cursor = cache.parent(parent);
        }
    }
    let part = cache.copy_marked(&keep, &spine);
    tree.merge(ctx, &part)
}

// ===== with-defaults (RFC 6243) =====

/// Set `flag` on a node whose body equals the compiled default of its
/// bound schema leaf, clear it otherwise.
pub fn flag_default_value(
    ctx: &Context,
    tree: &mut DataTree,
    x: DataNodeId,
    flag: DataFlags,
) {
    tree.clear_flag(x, flag);
    let body = match tree.body(x) {
        Some(body) => body,
        None => return,
    };
    let y = match tree.schema(ctx, x) {
        Some(y) => y,
        None => return,
    };
    if y.default_value() == Some(body) {
        tree.set_flag(x, flag);
    }
}

/// As [`flag_default_value`], but only for state (`config false`) nodes.
pub fn flag_state_default_value(
    ctx: &Context,
    tree: &mut DataTree,
    x: DataNodeId,
    flag: DataFlags,
) {
    tree.clear_flag(x, flag);
    if let Some(y) = tree.schema(ctx, x) {
        if y.is_config() {
            return;
        }
    }
    flag_default_value(ctx, tree, x, flag);
}

/// Attach the RFC 6243 `default="true"` attribute to `x`, declaring the
/// with-defaults namespace on the node when it is not yet in scope.
pub fn add_default_tag(tree: &mut DataTree, x: DataNodeId) {
    if tree.attr(x, "default").is_some() {
        return;
    }
    let prefix = tree
        .prefix_for_namespace(x, WITH_DEFAULTS_NAMESPACE)
        .map(|prefix| prefix.map(|p| p.to_string()));
    let prefix = match prefix {
        Some(Some(prefix)) => prefix,
        // Attributes never use the default namespace; bind the canonical
        // prefix locally.
        _ => {
            tree.add_namespace(
                x,
                Some(WITH_DEFAULTS_ATTR_PREFIX),
                WITH_DEFAULTS_NAMESPACE,
            );
            WITH_DEFAULTS_ATTR_PREFIX.to_string()
        }
    };
    tree.add_attr(x, Some(&prefix), "default", "true");
}

/// Apply a with-defaults retrieval mode to the subtree rooted at `root`.
pub fn with_defaults_apply(
    ctx: &Context,
    tree: &mut DataTree,
    root: DataNodeId,
    mode: WithDefaults,
) -> Result<()> {
    match mode {
        WithDefaults::Explicit => Ok(()),
        WithDefaults::ReportAll => {
            fill_defaults_recursive(ctx, tree, root, false, DataFlags::empty())?;
            fill_defaults_recursive(ctx, tree, root, true, DataFlags::empty())
        }
        WithDefaults::Trim => {
            let order: Vec<DataNodeId> = tree
                .node_ref(root)
                .traverse()
                .map(|node| node.id())
                .collect();
            for x in order {
                flag_default_value(ctx, tree, x, DataFlags::MARK);
            }
            tree.prune_flagged(root, DataFlags::MARK);
            prune_nopresence(
                ctx,
                tree,
                root,
                PruneMode::NpOnly,
                DataFlags::empty(),
            )?;
            Ok(())
        }
        WithDefaults::ReportAllTagged => {
            with_defaults_apply(ctx, tree, root, WithDefaults::ReportAll)?;
            let order: Vec<DataNodeId> = tree
                .node_ref(root)
                .traverse()
                .map(|node| node.id())
                .collect();
            for x in order {
                flag_default_value(ctx, tree, x, DataFlags::MARK);
                let tag = tree.has_flag(x, DataFlags::MARK)
                    || (tree.body(x).is_some()
                        && tree.has_flag(x, DataFlags::DEFAULT));
                if tag {
                    add_default_tag(tree, x);
                }
            }
            tree.clear_flags_recursive(root, DataFlags::MARK);
            Ok(())
        }
    }
}

// ===== non-presence pruning =====

/// Recursively find empty non-presence containers and default leaves,
/// optionally purging them per `mode`.
///
/// Returns whether `xn` itself is a (recursively) empty non-presence
/// container or a default leaf; `xn` itself is never removed. With a
/// non-empty `flag` mask only subtrees carrying CHANGE or the mask are
/// visited, as in [`fill_defaults_recursive`].
pub fn prune_nopresence(
    ctx: &Context,
    tree: &mut DataTree,
    xn: DataNodeId,
    mode: PruneMode,
    flag: DataFlags,
) -> Result<bool> {
    let mut flag = flag;
    if !flag.is_empty() {
        if tree.has_flag(xn, DataFlags::CHANGE) {
            // Continue with the same gate.
        } else if tree.has_flag(xn, flag) {
            flag = DataFlags::empty();
        } else {
            return Ok(false);
        }
    }
    let mut removable = false;
    let mut config = true;
    if let Some(yn) = tree.schema(ctx, xn) {
        if yn.is_np_container() {
            removable = true;
        } else if yn.kind() == SchemaNodeKind::Leaf
            && tree.has_flag(xn, DataFlags::DEFAULT)
            && mode != PruneMode::NpOnly
        {
            removable = true;
        }
        config = yn.is_config();
    }
    let children = tree.children(xn).to_vec();
    for x in children {
        if tree.is_freed(x) {
            continue;
        }
        if prune_nopresence(ctx, tree, x, mode, flag)? {
            match mode {
                PruneMode::None => {}
                PruneMode::Config => {
                    let child_config = tree
                        .schema(ctx, x)
                        .map(|y| y.is_config())
                        .unwrap_or(true);
                    if config && child_config {
                        tree.purge(x);
                    }
                }
                PruneMode::All | PruneMode::NpOnly => tree.purge(x),
            }
        } else if removable {
            // A surviving child turns an empty non-presence container into
            // a populated one.
            removable = false;
        }
    }
    Ok(removable)
}
