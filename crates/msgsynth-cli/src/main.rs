use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use msgsynth_contracts::BATCH_MANIFEST_SCHEMA_VERSION;
use msgsynth_core::config::GenerationConfig;
use msgsynth_core::ir::GeneratedType;
use msgsynth_core::model::{DescriptorDocument, MessageInterface};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "msgsynth")]
#[command(about = "Deterministic generator for message-bundle and exception-factory methods.", long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum Emit {
    Java,
    Json,
}

impl Emit {
    fn extension(self) -> &'static str {
        match self {
            Emit::Java => "java",
            Emit::Json => "json",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate from message traits declared in a Rust file.
    Rust {
        #[arg(long)]
        r#in: PathBuf,
        /// Output root (writes <out>/<package path>/<Type>.<ext>).
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = Emit::Java)]
        emit: Emit,
        #[arg(long)]
        config: Option<PathBuf>,
        /// If set, fail if output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Generate from a descriptor JSON document.
    Descriptors {
        #[arg(long)]
        r#in: PathBuf,
        /// Output root (writes <out>/<package path>/<Type>.<ext>).
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = Emit::Java)]
        emit: Emit,
        #[arg(long)]
        config: Option<PathBuf>,
        /// If set, fail if output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Run multiple generations from a manifest.
    Batch {
        #[arg(long)]
        manifest: PathBuf,
        /// If set, fail if any output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Print the diagnostics catalog as Markdown.
    Diagnostics,
}

fn main() -> Result<()> {
    try_main().map_err(|err| {
        eprintln!("{err:#}");
        err
    })
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Command::Rust {
            r#in,
            out,
            emit,
            config,
            check,
        } => {
            let config = load_config(config.as_deref())?;
            run_rust(&r#in, &out, emit, &config, check)
        }
        Command::Descriptors {
            r#in,
            out,
            emit,
            config,
            check,
        } => {
            let config = load_config(config.as_deref())?;
            run_descriptors(&r#in, &out, emit, &config, check)
        }
        Command::Batch { manifest, check } => run_batch(&manifest, check),
        Command::Diagnostics => {
            print!("{}", msgsynth_core::diagnostics::render_diagnostics_md());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GenerationConfig> {
    match path {
        Some(path) => GenerationConfig::load(path),
        None => Ok(GenerationConfig::default()),
    }
}

fn run_rust(
    src_path: &Path,
    out_root: &Path,
    emit: Emit,
    config: &GenerationConfig,
    check: bool,
) -> Result<()> {
    let src = std::fs::read_to_string(src_path)
        .with_context(|| format!("read Rust source: {}", src_path.display()))?;
    let interfaces = msgsynth_core::rust::import_rust_file(src_path, &src, config)
        .with_context(|| format!("import {}", src_path.display()))?;
    generate(&interfaces, out_root, emit, config, check)
}

fn run_descriptors(
    src_path: &Path,
    out_root: &Path,
    emit: Emit,
    config: &GenerationConfig,
    check: bool,
) -> Result<()> {
    let bytes = std::fs::read(src_path)
        .with_context(|| format!("read descriptors: {}", src_path.display()))?;
    let doc = DescriptorDocument::from_json(&bytes)
        .with_context(|| format!("load descriptors: {}", src_path.display()))?;
    generate(&doc.interfaces, out_root, emit, config, check)
}

fn generate(
    interfaces: &[MessageInterface],
    out_root: &Path,
    emit: Emit,
    config: &GenerationConfig,
    check: bool,
) -> Result<()> {
    let types = msgsynth_core::synth::synthesize_all(interfaces, config)?;
    for t in &types {
        let src = match emit {
            Emit::Java => msgsynth_core::java_emit::emit_type(t)?,
            Emit::Json => msgsynth_core::json_emit::emit_type(t)?,
        };
        write_type(out_root, t, emit, &src, check)?;
    }
    tracing::info!(types = types.len(), out = %out_root.display(), "generation complete");
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct Manifest {
    schema_version: String,
    #[serde(default)]
    config: Option<String>,
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct ManifestEntry {
    kind: String,
    source: String,
    out_root: String,
    #[serde(default)]
    emit: Option<Emit>,
}

/// Relative manifest paths are resolved against the manifest's directory.
fn resolve(base: &Path, p: &str) -> PathBuf {
    let p = PathBuf::from(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

fn run_batch(manifest_path: &Path, check: bool) -> Result<()> {
    let bytes = std::fs::read(manifest_path)
        .with_context(|| format!("read manifest: {}", manifest_path.display()))?;
    let m: Manifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse manifest JSON: {}", manifest_path.display()))?;
    if m.schema_version.trim() != BATCH_MANIFEST_SCHEMA_VERSION {
        anyhow::bail!(
            "manifest schema_version mismatch: expected {BATCH_MANIFEST_SCHEMA_VERSION} got {:?}",
            m.schema_version
        );
    }

    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let config = load_config(m.config.as_deref().map(|c| resolve(base, c)).as_deref())?;
    for (idx, e) in m.entries.iter().enumerate() {
        let out_root = resolve(base, &e.out_root);
        let src_path = resolve(base, &e.source);
        let emit = e.emit.unwrap_or(Emit::Java);
        match e.kind.as_str() {
            "rust" => run_rust(&src_path, &out_root, emit, &config, check)
                .with_context(|| format!("manifest entry[{idx}] rust"))?,
            "descriptors" => run_descriptors(&src_path, &out_root, emit, &config, check)
                .with_context(|| format!("manifest entry[{idx}] descriptors"))?,
            other => anyhow::bail!(
                "manifest entry[{idx}] has unknown kind {:?} (expected 'rust' or 'descriptors')",
                other
            ),
        }
    }
    Ok(())
}

fn write_type(
    out_root: &Path,
    t: &GeneratedType,
    emit: Emit,
    src: &str,
    check: bool,
) -> Result<()> {
    let mut rel = PathBuf::new();
    if let Some(pkg) = &t.package {
        for seg in pkg.split('.').filter(|s| !s.is_empty()) {
            rel.push(seg);
        }
    }
    rel.push(format!("{}.{}", t.name, emit.extension()));
    let out_path = out_root.join(rel);

    if check {
        let cur = std::fs::read_to_string(&out_path)
            .with_context(|| format!("read existing output: {}", out_path.display()))?;
        if cur != src {
            anyhow::bail!("generated output differs: {}", out_path.display());
        }
        return Ok(());
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }
    std::fs::write(&out_path, src.as_bytes())
        .with_context(|| format!("write output: {}", out_path.display()))?;
    tracing::debug!(path = %out_path.display(), "wrote generated type");
    Ok(())
}
