use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use facet_core::cache::{Cache, CACHE_DIR_NAME};
use facet_core::config::BuildConfig;
use facet_core::diagnostics::ConsoleDiagnosticHandler;
use facet_core::optimizer::OptimizationSet;
use facet_core::permutation::VariantValue;
use facet_core::session::Session;

/// Facet - a permutation-aware JavaScript build pipeline
#[derive(Parser, Debug, Clone)]
#[command(name = "facet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entry classes to build (first one receives the boot call)
    #[arg(value_name = "CLASS")]
    entries: Vec<String>,

    /// Path to facet.json / facet.yaml configuration file
    #[arg(short, long, value_name = "FILE")]
    project: Option<PathBuf>,

    /// Output directory for generated bundles
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Fixed output filename (default: build-<permutation key>.js)
    #[arg(long, value_name = "FILE")]
    out_file: Option<String>,

    /// Additional project roots (classes are discovered under <DIR>/src)
    #[arg(long, value_name = "DIR")]
    source_dir: Vec<PathBuf>,

    /// Fix a variant axis to a single value, e.g. --variant debug=on
    #[arg(long, value_name = "NAME=VALUE")]
    variant: Vec<String>,

    /// Optimization passes to apply (comma-separated)
    #[arg(long, value_name = "NAMES")]
    optimize: Option<String>,

    /// Locales exported into every bundle
    #[arg(long, value_name = "LOCALE")]
    locale: Vec<String>,

    /// Keep the cache memory-only for this run
    #[arg(long)]
    no_cache: bool,

    /// Clear the persistent cache before building
    #[arg(long)]
    clear_cache: bool,

    /// Pretty print diagnostics
    #[arg(long)]
    pretty: bool,

    /// Initialize a new facet project in the current directory
    #[arg(long)]
    init: bool,

    /// Watch source directories and rebuild on changes
    #[arg(short, long)]
    watch: bool,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug for detailed logs
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.init {
        init_project()?;
        return Ok(());
    }

    let config = load_config(&cli)?;
    let entries = resolve_entries(&cli, &config)?;
    let optimizations = resolve_optimizations(&cli, &config)?;

    if cli.watch {
        return watch_loop(&cli, &config, &entries, &optimizations);
    }

    let ok = run_build(&cli, &config, &entries, &optimizations)?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<BuildConfig> {
    if let Some(path) = &cli.project {
        return Ok(BuildConfig::load(path)?);
    }
    for candidate in ["facet.json", "facet.yaml", "facet.yml"] {
        let path = Path::new(candidate);
        if path.exists() {
            info!(config = candidate, "using project configuration");
            return Ok(BuildConfig::load(path)?);
        }
    }
    Ok(BuildConfig::default())
}

fn resolve_entries(cli: &Cli, config: &BuildConfig) -> anyhow::Result<Vec<String>> {
    let mut entries = cli.entries.clone();
    if entries.is_empty() {
        if let Some(entry) = &config.entry {
            entries.push(entry.clone());
        }
    }
    if entries.is_empty() {
        bail!("no entry class specified; pass one as an argument or set `entry` in the config");
    }
    Ok(entries)
}

fn resolve_optimizations(cli: &Cli, config: &BuildConfig) -> anyhow::Result<OptimizationSet> {
    let names: Vec<String> = match &cli.optimize {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => config.optimizations.clone(),
    };
    Ok(OptimizationSet::parse(names)?)
}

/// A `--variant debug=on` value is parsed as a JSON literal where
/// possible, so `--variant version=1.2` stays numeric.
fn parse_variant(spec: &str) -> anyhow::Result<(String, VariantValue)> {
    let (name, raw) = spec
        .split_once('=')
        .with_context(|| format!("invalid --variant {:?}, expected NAME=VALUE", spec))?;
    let value = serde_json::from_str::<VariantValue>(raw)
        .unwrap_or_else(|_| VariantValue::Str(raw.to_string()));
    Ok((name.to_string(), value))
}

fn open_cache(cli: &Cli, config: &BuildConfig) -> anyhow::Result<Arc<Cache>> {
    if cli.no_cache || !config.builder_options.cache {
        return Ok(Arc::new(Cache::in_memory()));
    }
    let dir = config
        .builder_options
        .cache_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(CACHE_DIR_NAME));
    let cache = Cache::open(&dir, &config.fingerprint())?;
    if cli.clear_cache {
        cache.clear()?;
    }
    Ok(Arc::new(cache))
}

/// Builds every permutation once. Returns whether all of them
/// succeeded; individual failures are already reported.
fn run_build(
    cli: &Cli,
    config: &BuildConfig,
    entries: &[String],
    optimizations: &OptimizationSet,
) -> anyhow::Result<bool> {
    let cache = open_cache(cli, config)?;
    let handler = Arc::new(ConsoleDiagnosticHandler::new(
        cli.pretty || config.builder_options.pretty,
    ));

    let mut session = Session::new(cache, handler);
    session.set_id_collision(config.builder_options.id_collision);
    session.set_copyright(config.builder_options.copyright.clone());

    for root in source_roots(cli, config) {
        session.add_project(&root)?;
    }
    if session.class_count() == 0 {
        bail!("no classes found; check `projects` or pass --source-dir");
    }

    for (name, values) in &config.variants {
        session.add_variant(name.clone(), values.clone());
    }
    for spec in &cli.variant {
        let (name, value) = parse_variant(spec)?;
        session.add_variant(name, vec![value]);
    }
    for locale in config.locales.iter().chain(cli.locale.iter()) {
        session.add_locale(locale.clone());
    }

    let out_dir = cli
        .out_dir
        .clone()
        .or_else(|| config.builder_options.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)?;
    let out_file = cli
        .out_file
        .clone()
        .or_else(|| config.builder_options.output_file.clone());

    let outcomes = session.build(entries, optimizations, &out_dir, out_file.as_deref());
    let failed = outcomes
        .iter()
        .filter(|outcome| outcome.result.is_err())
        .count();
    if failed > 0 {
        warn!(failed, total = outcomes.len(), "permutations failed");
    }
    Ok(failed == 0)
}

fn source_roots(cli: &Cli, config: &BuildConfig) -> Vec<PathBuf> {
    config
        .projects
        .iter()
        .cloned()
        .chain(cli.source_dir.iter().cloned())
        .collect()
}

fn watch_loop(
    cli: &Cli,
    config: &BuildConfig,
    entries: &[String],
    optimizations: &OptimizationSet,
) -> anyhow::Result<()> {
    use notify::{RecursiveMode, Watcher};

    if let Err(err) = run_build(cli, config, entries, optimizations) {
        warn!("build failed: {}", err);
    }

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    for root in source_roots(cli, config) {
        let src = root.join("src");
        watcher.watch(&src, RecursiveMode::Recursive)?;
        info!(dir = %src.display(), "watching");
    }

    loop {
        match rx.recv() {
            Ok(Err(err)) => warn!("watch error: {}", err),
            Err(_) => return Ok(()),
            Ok(Ok(_)) => {
                // Debounce: editors fire bursts of events per save.
                while rx.recv_timeout(Duration::from_millis(300)).is_ok() {}
                info!("change detected, rebuilding");
                if let Err(err) = run_build(cli, config, entries, optimizations) {
                    warn!("build failed: {}", err);
                }
            }
        }
    }
}

fn init_project() -> anyhow::Result<()> {
    let config_path = Path::new("facet.json");
    if config_path.exists() {
        bail!("facet.json already exists");
    }

    std::fs::write(
        config_path,
        r#"{
    "builderOptions": {
        "outputDir": "build"
    },
    "projects": ["."],
    "variants": {
        "debug": ["on", "off"]
    },
    "optimizations": ["unused", "privates", "variables", "declarations", "blocks"],
    "entry": "main.Application"
}
"#,
    )?;

    let sample = Path::new("src/main/Application.js");
    std::fs::create_dir_all(sample.parent().expect("sample path has a parent"))?;
    std::fs::write(
        sample,
        r#"main.Application = function() {
    this.boot = function() {
        if (Permutation.isSet("debug", "on")) {
            console.log("booting in debug mode");
        }
        return this;
    };
};
"#,
    )?;

    println!("Created facet.json and src/main/Application.js");
    println!("Run `facet` to build all permutations.");
    Ok(())
}
