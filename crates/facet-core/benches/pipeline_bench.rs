use criterion::{black_box, criterion_group, criterion_main, Criterion};
use facet_core::optimizer::OptimizationSet;
use facet_core::parser::parse;
use facet_core::permutation::{Permutation, VariantValue};
use facet_core::serializer::compress;
use facet_core::specialize;

const SOURCE: &str = r#"
    main.Application = function(settings) {
        var registry = main.util.Registry.shared();
        var renderer = null;
        this.__started = false;

        this.__configure = function(options) {
            var merged = registry.merge(settings, options);
            if (Permutation.isSet("debug", "on")) {
                main.util.Logger.dump(merged);
            }
            return merged;
        };

        this.boot = function() {
            if (this.__started) {
                return null;
            }
            this.__started = true;
            renderer = main.render.Engine.create(this.__configure(null));
            return renderer.start();
        };
    };
"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_class", |b| {
        b.iter(|| parse(black_box(SOURCE), "main.Application").unwrap())
    });
}

fn bench_specialize(c: &mut Criterion) {
    let tree = parse(SOURCE, "main.Application").unwrap();
    let mut perm = Permutation::new();
    perm.set("debug", VariantValue::Str("off".into()));

    c.bench_function("specialize_class", |b| {
        b.iter(|| {
            let mut copy = tree.clone();
            specialize::specialize(&mut copy, black_box(&perm));
            copy
        })
    });
}

fn bench_optimize_and_compress(c: &mut Criterion) {
    let tree = parse(SOURCE, "main.Application").unwrap();
    let opts =
        OptimizationSet::parse(["privates", "variables", "blocks", "declarations"]).unwrap();

    c.bench_function("optimize_and_compress_class", |b| {
        b.iter(|| {
            let mut copy = tree.clone();
            opts.apply(&mut copy, "bvN9jb");
            compress(black_box(&copy))
        })
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_specialize,
    bench_optimize_and_compress
);
criterion_main!(benches);
