//! Whole-pipeline tests over a real on-disk project and durable cache.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use facet_core::cache::{Cache, CacheKey};
use facet_core::diagnostics::{CollectingDiagnosticHandler, DiagnosticHandler};
use facet_core::optimizer::OptimizationSet;
use facet_core::permutation::VariantValue;
use facet_core::session::Session;
use tempfile::TempDir;

fn write_class(root: &Path, rel: &str, source: &str) {
    let path = root.join("src").join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, source).unwrap();
}

fn project(root: &Path) {
    write_class(
        root,
        "app/Application.js",
        r#"
            app.data.Store.register();
            app.Application = function() {
                this.__view = null;
                this.boot = function() {
                    this.__view = app.ui.View.create();
                    if (Permutation.isSet("debug", "on")) {
                        app.dev.Inspector.attach(this.__view);
                    }
                    return this.__view;
                };
            };
        "#,
    );
    write_class(root, "app/ui/View.js", "app.ui.View = function() {};");
    write_class(root, "app/data/Store.js", "app.data.Store = function() {};");
    write_class(root, "app/dev/Inspector.js", "app.dev.Inspector = function() {};");
}

fn session(cache: Arc<Cache>) -> (Session, Arc<CollectingDiagnosticHandler>) {
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    (Session::new(cache, handler.clone()), handler)
}

#[test]
fn debug_permutation_controls_the_included_classes() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    project(root.path());

    let (mut session, _) = session(Arc::new(Cache::in_memory()));
    session.add_project(root.path()).unwrap();
    session.add_variant(
        "debug",
        vec![
            VariantValue::Str("on".into()),
            VariantValue::Str("off".into()),
        ],
    );

    let opts = OptimizationSet::parse(["unused"]).unwrap();
    let outcomes = session.build(&["app.Application".to_string()], &opts, out.path(), None);
    assert_eq!(outcomes.len(), 2);

    let on = fs::read_to_string(outcomes[0].result.as_ref().unwrap()).unwrap();
    let off = fs::read_to_string(outcomes[1].result.as_ref().unwrap()).unwrap();

    assert!(on.contains("app.dev.Inspector=function(){};"));
    assert!(!off.contains("app.dev.Inspector"));

    // Break dependency: the store registers at load time and must
    // precede the application class in both bundles.
    for bundle in [&on, &off] {
        let store = bundle.find("app.data.Store=function(){};").unwrap();
        let app = bundle.find("app.Application=function()").unwrap();
        assert!(store < app);
    }
}

#[test]
fn cached_stages_survive_across_sessions() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    project(root.path());

    let opts = OptimizationSet::parse(["blocks"]).unwrap();
    let entry = vec!["app.Application".to_string()];

    let first_bundle;
    let id_first;
    {
        let cache = Arc::new(Cache::open(cache_dir.path(), "fp").unwrap());
        let (mut session, _) = session(cache.clone());
        session.add_project(root.path()).unwrap();
        let outcomes = session.build(&entry, &opts, out.path(), None);
        first_bundle = fs::read_to_string(outcomes[0].result.as_ref().unwrap()).unwrap();
        id_first = cache.read::<String>(&CacheKey::id("app.Application")).unwrap();
    }

    // A fresh process over the same durable cache reproduces the
    // bundle and the identifier without any source change.
    let cache = Arc::new(Cache::open(cache_dir.path(), "fp").unwrap());
    let (mut session, handler) = session(cache.clone());
    session.add_project(root.path()).unwrap();
    let outcomes = session.build(&entry, &opts, out.path(), None);
    let second_bundle = fs::read_to_string(outcomes[0].result.as_ref().unwrap()).unwrap();

    assert_eq!(first_bundle, second_bundle);
    assert_eq!(
        cache.read::<String>(&CacheKey::id("app.Application")).unwrap(),
        id_first
    );
    assert!(!handler.has_errors());
}

#[test]
fn source_change_invalidates_the_stale_class_only() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    project(root.path());

    let opts = OptimizationSet::new();
    let entry = vec!["app.Application".to_string()];

    {
        let cache = Arc::new(Cache::open(cache_dir.path(), "fp").unwrap());
        let (mut session, _) = session(cache);
        session.add_project(root.path()).unwrap();
        session.build(&entry, &opts, out.path(), None);
    }

    // Touch one class with new content and a newer mtime.
    std::thread::sleep(std::time::Duration::from_millis(20));
    write_class(
        root.path(),
        "app/ui/View.js",
        "app.ui.View = function() { this.fresh = true; };",
    );

    let cache = Arc::new(Cache::open(cache_dir.path(), "fp").unwrap());
    let (mut session, _) = session(cache);
    session.add_project(root.path()).unwrap();
    let outcomes = session.build(&entry, &opts, out.path(), None);
    let bundle = fs::read_to_string(outcomes[0].result.as_ref().unwrap()).unwrap();

    assert!(bundle.contains("this.fresh=true;"));
}

#[test]
fn single_class_bundle_matches_the_documented_layout() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_class(
        root.path(),
        "main/Application.js",
        "main.Application = function() { this.ready = true; };",
    );

    let (mut session, _) = session(Arc::new(Cache::in_memory()));
    session.add_project(root.path()).unwrap();
    session.add_variant("debug", vec![VariantValue::Str("on".into())]);

    let opts = OptimizationSet::parse(["unused", "blocks"]).unwrap();
    let outcomes = session.build(&["main.Application".to_string()], &opts, out.path(), None);
    let bundle = fs::read_to_string(outcomes[0].result.as_ref().unwrap()).unwrap();

    let expected_body = "main.Application=function(){this.ready=true;};\nnew main.Application().boot();";
    assert!(bundle.contains(" * Permutation: debug:on\n"));
    assert!(bundle.contains(" * Optimizations: blocks, unused\n"));
    assert!(bundle.ends_with(expected_body));
}
