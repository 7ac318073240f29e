use pretty_assertions::assert_eq;
use yangtree::bind::bind_tree;
use yangtree::context::Context;
use yangtree::data::{DataTree, PrintFlags};
use yangtree::netconf::RpcError;
use yangtree::schema::{SchemaNodeDef, SchemaNodeId};
use yangtree::validate::{
    remove_duplicates_recursive, validate_minmax, validate_minmax_recursive,
    validate_unique, validate_unique_recursive, Validity,
};
use yangtree::ErrorKind;

static NS: &str = "urn:example:config";

fn parse_bound(ctx: &Context, xml: &str) -> DataTree {
    let mut tree = DataTree::parse_string(xml).expect("Failed to parse");
    bind_tree(ctx, &mut tree).expect("Failed to bind");
    let root = tree.root();
    tree.sort_recursive(ctx, root);
    tree
}

fn invalid(validity: Validity) -> RpcError {
    validity.into_error().expect("expected a validation failure")
}

/// module example { container c { list x { key k; leaf k; leaf v; }}}
fn list_context(
    min: Option<u32>,
    max: Option<u32>,
) -> (Context, SchemaNodeId) {
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let mut def = SchemaNodeDef::list("x").keys(["k"]);
    if let Some(min) = min {
        def = def.min_elements(min);
    }
    if let Some(max) = max {
        def = def.max_elements(max);
    }
    let x = ctx.append(c, def).unwrap();
    ctx.append(x, SchemaNodeDef::leaf("k")).unwrap();
    ctx.append(x, SchemaNodeDef::leaf("v")).unwrap();
    (ctx, x)
}

#[test]
fn minmax_empty_parent_too_few() {
    let (ctx, _) = list_context(Some(1), None);
    let tree = parse_bound(&ctx, "<c xmlns=\"urn:example:config\"/>");
    let error =
        invalid(validate_minmax(&ctx, &tree, tree.root(), true).unwrap());
    assert_eq!(error.app_tag(), "too-few-elements");
    assert_eq!(error.path(), "/c/x");
}

#[test]
fn minmax_satisfied() {
    let (ctx, _) = list_context(Some(1), Some(2));
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><x><k>a</k></x></c>",
    );
    assert!(validate_minmax(&ctx, &tree, tree.root(), true)
        .unwrap()
        .is_valid());
}

#[test]
fn minmax_trailing_run_too_many() {
    let (ctx, _) = list_context(None, Some(1));
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <x><k>a</k></x><x><k>b</k></x></c>",
    );
    let error =
        invalid(validate_minmax(&ctx, &tree, tree.root(), true).unwrap());
    assert_eq!(error.app_tag(), "too-many-elements");
    assert_eq!(error.path(), "/c/x");
}

#[test]
fn minmax_too_few_in_run() {
    let (ctx, _) = list_context(Some(3), None);
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <x><k>a</k></x><x><k>b</k></x></c>",
    );
    let error =
        invalid(validate_minmax(&ctx, &tree, tree.root(), true).unwrap());
    assert_eq!(error.app_tag(), "too-few-elements");
}

#[test]
fn minmax_duplicate_keys() {
    let (ctx, _) = list_context(None, None);
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <x><k>a</k></x><x><k>a</k></x></c>",
    );
    let error =
        invalid(validate_minmax(&ctx, &tree, tree.root(), true).unwrap());
    assert_eq!(error.app_tag(), "data-not-unique");
    assert_eq!(
        error.non_unique(),
        &[("k".to_string(), "a".to_string())]
    );
}

#[test]
fn minmax_repeated_non_list() {
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    ctx.append(c, SchemaNodeDef::leaf("s")).unwrap();
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><s>1</s><s>2</s></c>",
    );
    let error =
        invalid(validate_minmax(&ctx, &tree, tree.root(), true).unwrap());
    assert_eq!(error.app_tag(), "too-many-elements");
    assert_eq!(error.path(), "/c/s");
}

#[test]
fn minmax_gap_between_lists() {
    // list a, list x (min-elements 1), list b: entries for a and b only.
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    for (name, min) in &[("a", None::<u32>), ("x", Some(1)), ("b", None)] {
        let mut def = SchemaNodeDef::list(name).keys(["k"]);
        if let Some(min) = min {
            def = def.min_elements(*min);
        }
        let list = ctx.append(c, def).unwrap();
        ctx.append(list, SchemaNodeDef::leaf("k")).unwrap();
    }
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <a><k>1</k></a><b><k>2</k></b></c>",
    );
    let error =
        invalid(validate_minmax(&ctx, &tree, tree.root(), true).unwrap());
    assert_eq!(error.app_tag(), "too-few-elements");
    assert_eq!(error.path(), "/c/x");
}

#[test]
fn minmax_gap_through_nopresence_container() {
    // container g (non-presence) { list x { min-elements 1 }}.
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let g = ctx.append(c, SchemaNodeDef::container("g")).unwrap();
    let x = ctx
        .append(g, SchemaNodeDef::list("x").keys(["k"]).min_elements(1))
        .unwrap();
    ctx.append(x, SchemaNodeDef::leaf("k")).unwrap();

    let tree = parse_bound(&ctx, "<c xmlns=\"urn:example:config\"/>");
    let error =
        invalid(validate_minmax(&ctx, &tree, tree.root(), true).unwrap());
    assert_eq!(error.app_tag(), "too-few-elements");
    assert_eq!(error.path(), "/c/x");
}

#[test]
fn minmax_state_list_not_checked() {
    // min-elements on a config false list is not enforced.
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let x = ctx
        .append(
            c,
            SchemaNodeDef::list("x")
                .keys(["k"])
                .min_elements(1)
                .config(false),
        )
        .unwrap();
    ctx.append(x, SchemaNodeDef::leaf("k")).unwrap();
    let tree = parse_bound(&ctx, "<c xmlns=\"urn:example:config\"/>");
    assert!(validate_minmax(&ctx, &tree, tree.root(), true)
        .unwrap()
        .is_valid());
}

#[test]
fn minmax_recursive_descends() {
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let outer = ctx
        .append(c, SchemaNodeDef::list("outer").keys(["k"]))
        .unwrap();
    ctx.append(outer, SchemaNodeDef::leaf("k")).unwrap();
    let inner = ctx
        .append(outer, SchemaNodeDef::list("inner").keys(["k"]))
        .unwrap();
    ctx.append(inner, SchemaNodeDef::leaf("k")).unwrap();

    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><outer><k>o</k>\
         <inner><k>i</k></inner><inner><k>i</k></inner></outer></c>",
    );
    let error = invalid(
        validate_minmax_recursive(&ctx, &tree, tree.root()).unwrap(),
    );
    assert_eq!(error.app_tag(), "data-not-unique");
}

#[test]
fn unique_direct_tuple() {
    // unique "a b": both leaves must collide, entries missing one are
    // ignored.
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let l = ctx
        .append(
            c,
            SchemaNodeDef::list("l").keys(["k"]).unique(["a", "b"]),
        )
        .unwrap();
    ctx.append(l, SchemaNodeDef::leaf("k")).unwrap();
    ctx.append(l, SchemaNodeDef::leaf("a")).unwrap();
    ctx.append(l, SchemaNodeDef::leaf("b")).unwrap();

    let ok = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <l><k>1</k><a>x</a><b>y</b></l>\
         <l><k>2</k><a>x</a><b>z</b></l>\
         <l><k>3</k><a>x</a></l></c>",
    );
    assert!(validate_unique(&ctx, &ok, ok.root()).unwrap().is_valid());

    let bad = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <l><k>1</k><a>x</a><b>y</b></l>\
         <l><k>2</k><a>x</a><b>y</b></l></c>",
    );
    let error = invalid(validate_unique(&ctx, &bad, bad.root()).unwrap());
    assert_eq!(error.app_tag(), "data-not-unique");
    assert_eq!(
        error.non_unique(),
        &[
            ("a".to_string(), "x".to_string()),
            ("b".to_string(), "y".to_string())
        ]
    );
}

#[test]
fn unique_xpath_descendant() {
    // unique "a/b": a transient schema-node-id evaluated per entry.
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let l = ctx
        .append(c, SchemaNodeDef::list("l").keys(["k"]).unique(["a/b"]))
        .unwrap();
    ctx.append(l, SchemaNodeDef::leaf("k")).unwrap();
    let a = ctx.append(l, SchemaNodeDef::container("a")).unwrap();
    ctx.append(a, SchemaNodeDef::leaf("b")).unwrap();

    let bad = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <l><k>1</k><a><b>x</b></a></l>\
         <l><k>2</k><a><b>x</b></a></l></c>",
    );
    let error = invalid(validate_unique(&ctx, &bad, bad.root()).unwrap());
    assert_eq!(error.app_tag(), "data-not-unique");

    let ok = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <l><k>1</k><a><b>x</b></a></l>\
         <l><k>2</k><a><b>y</b></a></l></c>",
    );
    assert!(validate_unique(&ctx, &ok, ok.root()).unwrap().is_valid());
}

#[test]
fn unique_mixed_descendant_rejected() {
    // unique "a/b c" combines a transient path with a direct name.
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let l = ctx
        .append(
            c,
            SchemaNodeDef::list("l").keys(["k"]).unique(["a/b", "c"]),
        )
        .unwrap();
    ctx.append(l, SchemaNodeDef::leaf("k")).unwrap();
    ctx.append(l, SchemaNodeDef::leaf("c")).unwrap();
    let a = ctx.append(l, SchemaNodeDef::container("a")).unwrap();
    ctx.append(a, SchemaNodeDef::leaf("b")).unwrap();

    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <l><k>1</k><c>v</c><a><b>x</b></a></l>\
         <l><k>2</k><c>v</c><a><b>x</b></a></l></c>",
    );
    let err = validate_unique(&ctx, &tree, tree.root()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MultipleDescendant);
}

#[test]
fn leaf_list_duplicates() {
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    ctx.append(c, SchemaNodeDef::leaf_list("ll")).unwrap();

    let bad = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><ll>p</ll><ll>p</ll></c>",
    );
    let error =
        invalid(validate_minmax(&ctx, &bad, bad.root(), true).unwrap());
    assert_eq!(error.app_tag(), "data-not-unique");
    let error = invalid(validate_unique(&ctx, &bad, bad.root()).unwrap());
    assert_eq!(error.app_tag(), "data-not-unique");

    let ok = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><ll>p</ll><ll>q</ll></c>",
    );
    assert!(validate_unique(&ctx, &ok, ok.root()).unwrap().is_valid());
}

#[test]
fn leaf_list_duplicates_ordered_by_user() {
    // Duplicates stay invalid for ordered-by-user leaf-lists as well.
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    ctx.append(c, SchemaNodeDef::leaf_list("ll").ordered_by_user())
        .unwrap();
    let bad = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><ll>p</ll><ll>q</ll><ll>p</ll></c>",
    );
    let error = invalid(validate_unique(&ctx, &bad, bad.root()).unwrap());
    assert_eq!(error.app_tag(), "data-not-unique");
}

#[test]
fn unique_recursive_descends() {
    let (ctx, _) = list_context(None, None);
    let tree = parse_bound(
        &ctx,
        "<config><c xmlns=\"urn:example:config\">\
         <x><k>a</k></x><x><k>a</k></x></c></config>",
    );
    let error = invalid(
        validate_unique_recursive(&ctx, &tree, tree.root()).unwrap(),
    );
    assert_eq!(error.app_tag(), "data-not-unique");
}

#[test]
fn unique_soundness_after_ok() {
    // After a valid pass no two entries share a key tuple.
    let (ctx, _) = list_context(None, None);
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <x><k>a</k></x><x><k>b</k></x><x><k>c</k></x></c>",
    );
    assert!(validate_unique(&ctx, &tree, tree.root()).unwrap().is_valid());
    let mut keys: Vec<String> = tree
        .children(tree.root())
        .iter()
        .map(|x| {
            let k = tree.child_by_name(*x, "k").unwrap();
            tree.body(k).unwrap().to_string()
        })
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), tree.children(tree.root()).len());
}

#[test]
fn remove_duplicates_keeps_last() {
    let (ctx, _) = list_context(None, None);
    let mut tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <x><k>a</k><v>old</v></x>\
         <x><k>a</k><v>new</v></x>\
         <x><k>b</k><v>keep</v></x></c>",
    );
    let root = tree.root();
    let validity = remove_duplicates_recursive(&ctx, &mut tree, root).unwrap();
    assert!(validity.is_valid());
    assert_eq!(
        tree.print_string(PrintFlags::empty()),
        "<c xmlns=\"urn:example:config\">\
         <x><k>a</k><v>new</v></x>\
         <x><k>b</k><v>keep</v></x></c>"
    );
    // The pruned tree now validates.
    assert!(validate_minmax(&ctx, &tree, root, true).unwrap().is_valid());
}

#[test]
fn remove_duplicates_leaf_list() {
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    ctx.append(c, SchemaNodeDef::leaf_list("ll")).unwrap();
    let mut tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <ll>p</ll><ll>p</ll><ll>q</ll></c>",
    );
    let root = tree.root();
    let validity = remove_duplicates_recursive(&ctx, &mut tree, root).unwrap();
    assert!(validity.is_valid());
    assert_eq!(
        tree.print_string(PrintFlags::empty()),
        "<c xmlns=\"urn:example:config\"><ll>p</ll><ll>q</ll></c>"
    );
}
