use pretty_assertions::assert_eq;
use yangtree::bind::bind_tree;
use yangtree::context::Context;
use yangtree::data::{DataFlags, DataTree, PrintFlags};
use yangtree::schema::{SchemaNodeDef, SchemaNodeKind};
use yangtree::ErrorKind;

static NS: &str = "urn:example:config";

macro_rules! assert_data_eq {
    ($tree1:expr, $tree2:expr) => {
        assert_eq!(
            $tree1.print_string(PrintFlags::empty()),
            $tree2.print_string(PrintFlags::empty())
        );
    };
}

fn create_context() -> Context {
    let mut ctx = Context::new();
    let module = ctx
        .add_module("example", NS, "ex")
        .expect("Failed to register module");
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    ctx.append(c, SchemaNodeDef::leaf("s")).unwrap();
    let x = ctx
        .append(c, SchemaNodeDef::list("x").keys(["k"]))
        .unwrap();
    ctx.append(x, SchemaNodeDef::leaf("k")).unwrap();
    ctx.append(x, SchemaNodeDef::leaf("v")).unwrap();
    ctx.append(c, SchemaNodeDef::leaf_list("ll")).unwrap();
    ctx
}

fn parse_bound(ctx: &Context, xml: &str) -> DataTree {
    let mut tree = DataTree::parse_string(xml).expect("Failed to parse");
    bind_tree(ctx, &mut tree).expect("Failed to bind");
    tree
}

#[test]
fn data_parse_print_round_trip() {
    let xml = "<c xmlns=\"urn:example:config\"><s>a&amp;b</s>\
               <x><k>one</k><v>1</v></x></c>";
    let tree = DataTree::parse_string(xml).unwrap();
    assert_eq!(tree.print_string(PrintFlags::empty()), xml);
}

#[test]
fn data_parse_attributes_and_namespaces() {
    let tree = DataTree::parse_string(
        "<ex:c xmlns:ex=\"urn:example:config\" note=\"n1\">\
         <ex:s>1</ex:s></ex:c>",
    )
    .unwrap();
    let root = tree.root();
    assert_eq!(tree.prefix(root), Some("ex"));
    assert_eq!(tree.namespace(root), Some(NS));
    assert_eq!(tree.attr(root, "note"), Some("n1"));
    let s = tree.children(root)[0];
    assert_eq!(tree.namespace(s), Some(NS));
    assert_eq!(tree.body(s), Some("1"));
}

#[test]
fn data_print_pretty() {
    let tree = DataTree::parse_string("<c><s>1</s></c>").unwrap();
    assert_eq!(
        tree.print_string(PrintFlags::PRETTY),
        "<c>\n  <s>1</s>\n</c>\n"
    );
}

#[test]
fn schema_lookup_and_traverse() {
    let ctx = create_context();
    assert!(ctx.get_module("example").is_some());
    assert_eq!(ctx.get_module_ns(NS).unwrap().name(), "example");
    assert_eq!(
        ctx.traverse()
            .map(|snode| snode.name().to_string())
            .collect::<Vec<String>>(),
        vec!["c", "s", "x", "k", "v", "ll"]
    );
}

#[test]
fn data_bind() {
    let ctx = create_context();
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><s>1</s>\
         <x><k>a</k></x><ll>z</ll></c>",
    );
    let root = tree.root();
    let snode = tree.schema(&ctx, root).expect("root unbound");
    assert_eq!(snode.kind(), SchemaNodeKind::Container);
    assert_eq!(snode.name(), "c");
    assert_eq!(snode.path(), "/example:c");
    for child in tree.node_ref(root).children() {
        let snode = tree.schema(&ctx, child.id()).expect("child unbound");
        assert_eq!(snode.name(), child.name());
    }
    let x = tree.child_by_name(root, "x").unwrap();
    assert_eq!(tree.schema(&ctx, x).unwrap().path(), "/example:c/x");
}

#[test]
fn data_bind_wrapped_top() {
    let ctx = create_context();
    let tree = parse_bound(
        &ctx,
        "<config><c xmlns=\"urn:example:config\"><s>1</s></c></config>",
    );
    let root = tree.root();
    assert_eq!(tree.spec(root), None);
    let c = tree.children(root)[0];
    assert!(tree.spec(c).is_some());
}

#[test]
fn data_bind_idempotent() {
    let ctx = create_context();
    let mut tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><x><k>a</k><v>1</v></x></c>",
    );
    let before: Vec<_> = tree
        .node_ref(tree.root())
        .traverse()
        .map(|node| node.schema_id())
        .collect();
    bind_tree(&ctx, &mut tree).unwrap();
    let after: Vec<_> = tree
        .node_ref(tree.root())
        .traverse()
        .map(|node| node.schema_id())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn data_bind_tolerates_unknown() {
    let ctx = create_context();
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><zzz><inner/></zzz><s>1</s></c>",
    );
    let zzz = tree.child_by_name(tree.root(), "zzz").unwrap();
    assert_eq!(tree.spec(zzz), None);
    let s = tree.child_by_name(tree.root(), "s").unwrap();
    assert!(tree.spec(s).is_some());
}

#[test]
fn data_bind_ambiguous_unprefixed_top() {
    let mut ctx = Context::new();
    let m1 = ctx.add_module("one", "urn:example:one", "o").unwrap();
    let m2 = ctx.add_module("two", "urn:example:two", "t").unwrap();
    ctx.append(m1, SchemaNodeDef::container("c")).unwrap();
    ctx.append(m2, SchemaNodeDef::container("c")).unwrap();

    // No namespace in the document: the top-level name matches both
    // modules.
    let mut tree = DataTree::parse_string("<c/>").unwrap();
    let err = bind_tree(&ctx, &mut tree).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BindAmbiguous);

    // A namespace disambiguates.
    let mut tree =
        DataTree::parse_string("<c xmlns=\"urn:example:two\"/>").unwrap();
    bind_tree(&ctx, &mut tree).unwrap();
    assert!(tree.spec(tree.root()).is_some());
}

#[test]
fn schema_ambiguous_export_rejected() {
    let mut ctx = Context::new();
    let m1 = ctx.add_module("one", "urn:example:same", "o").unwrap();
    let m2 = ctx.add_module("two", "urn:example:same", "t").unwrap();
    ctx.append(m1, SchemaNodeDef::container("c")).unwrap();
    let err = ctx.append(m2, SchemaNodeDef::container("c")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BindAmbiguous);
}

#[test]
fn data_sort_schema_order() {
    let ctx = create_context();
    let mut tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><ll>z</ll>\
         <x><k>b</k></x><s>q</s><x><k>a</k></x></c>",
    );
    let root = tree.root();
    tree.sort(&ctx, root);
    assert_eq!(
        tree.print_string(PrintFlags::empty()),
        "<c xmlns=\"urn:example:config\"><s>q</s>\
         <x><k>a</k></x><x><k>b</k></x><ll>z</ll></c>"
    );
}

#[test]
fn data_sort_keeps_user_order() {
    let mut ctx = Context::new();
    let module = ctx.add_module("example", NS, "ex").unwrap();
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let x = ctx
        .append(c, SchemaNodeDef::list("x").keys(["k"]).ordered_by_user())
        .unwrap();
    ctx.append(x, SchemaNodeDef::leaf("k")).unwrap();

    let mut tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\">\
         <x><k>b</k></x><x><k>a</k></x></c>",
    );
    let root = tree.root();
    tree.sort(&ctx, root);
    assert_eq!(
        tree.print_string(PrintFlags::empty()),
        "<c xmlns=\"urn:example:config\">\
         <x><k>b</k></x><x><k>a</k></x></c>"
    );
}

#[test]
fn data_sort_unbound_at_tail() {
    let ctx = create_context();
    let mut tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><zzz/><s>1</s></c>",
    );
    let root = tree.root();
    tree.sort(&ctx, root);
    assert_eq!(
        tree.print_string(PrintFlags::empty()),
        "<c xmlns=\"urn:example:config\"><s>1</s><zzz/></c>"
    );
}

#[test]
fn data_iterator_traverse() {
    let ctx = create_context();
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><s>1</s>\
         <x><k>a</k><v>7</v></x></c>",
    );
    assert_eq!(
        tree.node_ref(tree.root())
            .traverse()
            .map(|node| node.name().to_string())
            .collect::<Vec<String>>(),
        vec!["c", "s", "x", "k", "v"]
    );
}

#[test]
fn data_iterator_ancestors() {
    let ctx = create_context();
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><x><k>a</k></x></c>",
    );
    let x = tree.child_by_name(tree.root(), "x").unwrap();
    let k = tree.child_by_name(x, "k").unwrap();
    assert_eq!(
        tree.node_ref(k)
            .inclusive_ancestors()
            .map(|node| node.name().to_string())
            .collect::<Vec<String>>(),
        vec!["k", "x", "c"]
    );
    assert_eq!(tree.path(k), "/c/x/k");
}

#[test]
fn data_iterator_siblings() {
    let ctx = create_context();
    let tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><s>1</s>\
         <x><k>a</k></x><ll>z</ll></c>",
    );
    let s = tree.child_by_name(tree.root(), "s").unwrap();
    assert_eq!(
        tree.node_ref(s)
            .siblings()
            .map(|node| node.name().to_string())
            .collect::<Vec<String>>(),
        vec!["x", "ll"]
    );
}

#[test]
fn data_purge_and_flags() {
    let ctx = create_context();
    let mut tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><s>1</s><ll>z</ll></c>",
    );
    let root = tree.root();
    let s = tree.child_by_name(root, "s").unwrap();
    tree.set_flag(s, DataFlags::DEL);
    assert!(tree.has_flag(s, DataFlags::DEL | DataFlags::MARK));
    assert!(tree.prune_flagged(root, DataFlags::DEL));
    assert_eq!(
        tree.print_string(PrintFlags::empty()),
        "<c xmlns=\"urn:example:config\"><ll>z</ll></c>"
    );
    // Nothing left to prune.
    assert!(!tree.prune_flagged(root, DataFlags::DEL));
}

#[test]
fn data_merge_explicit_wins() {
    let ctx = create_context();
    let mut tree = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><s>explicit</s></c>",
    );
    let incoming = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><s>default</s><ll>z</ll></c>",
    );
    // The missing leaf-list is grafted, the explicit body survives.
    tree.merge(&ctx, &incoming).unwrap();
    let expect = parse_bound(
        &ctx,
        "<c xmlns=\"urn:example:config\"><s>explicit</s><ll>z</ll></c>",
    );
    assert_data_eq!(&tree, &expect);
}
