use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use yangtree::bind::bind_tree;
use yangtree::context::Context;
use yangtree::data::DataTree;
use yangtree::schema::SchemaNodeDef;
use yangtree::validate::{validate_minmax, validate_unique};

fn create_context() -> Context {
    let mut ctx = Context::new();
    let module = ctx
        .add_module("example", "urn:example:config", "ex")
        .expect("Failed to register module");
    let c = ctx.append(module, SchemaNodeDef::container("c")).unwrap();
    let x = ctx
        .append(c, SchemaNodeDef::list("x").keys(["k"]).unique(["v"]))
        .unwrap();
    ctx.append(x, SchemaNodeDef::leaf("k")).unwrap();
    ctx.append(x, SchemaNodeDef::leaf("v")).unwrap();
    ctx
}

fn data_generate(ctx: &Context, entries: u32) -> DataTree {
    let mut tree = DataTree::new("c");
    let root = tree.root();
    tree.add_namespace(root, None, "urn:example:config");
    for i in 0..entries {
        let x = tree.new_element(root, "x");
        let k = tree.new_element(x, "k");
        tree.set_body(k, &format!("{:08}", i));
        let v = tree.new_element(x, "v");
        tree.set_body(v, &format!("value-{}", i));
    }
    bind_tree(ctx, &mut tree).expect("Failed to bind data tree");
    tree.sort_recursive(ctx, root);
    tree
}

fn criterion_benchmark(c: &mut Criterion) {
    let tree_sizes = [256, 1024, 4 * 1024];
    let ctx = create_context();

    let mut group = c.benchmark_group("validate_minmax / list entries");
    for size in &tree_sizes {
        let tree = data_generate(&ctx, *size);
        let root = tree.root();
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _| {
                b.iter(|| {
                    assert!(validate_minmax(&ctx, &tree, root, true)
                        .expect("validation error")
                        .is_valid())
                });
            },
        );
    }
    group.finish();

    let mut group = c.benchmark_group("validate_unique / list entries");
    for size in &tree_sizes {
        let tree = data_generate(&ctx, *size);
        let root = tree.root();
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _| {
                b.iter(|| {
                    assert!(validate_unique(&ctx, &tree, root)
                        .expect("validation error")
                        .is_valid())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
