use anyhow::{Context, Result};
use clap::Parser;
use docs_toml_verify::core::extractor::{dedup_by_fingerprint, extract_snippets};
use docs_toml_verify::core::materializer::{materialize, Layout, ScratchDir};
use docs_toml_verify::utils::logger::{self, LogFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "collect_snippets")]
#[command(about = "Export every TOML snippet in the docs as an annotated file")]
struct Args {
    /// Documentation root to scan
    #[arg(long, default_value = "docs")]
    docs_root: PathBuf,

    /// Output directory (cleared before writing)
    #[arg(long, default_value = "ci/tmp")]
    output_dir: PathBuf,

    /// Documentation file extension, without the dot
    #[arg(long, default_value = "md")]
    doc_extension: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logger::init_logger(LogFormat::Compact, args.verbose);

    // 準備失敗或掃描失敗時目錄會被刪除；成功後才保留
    let scratch = ScratchDir::prepare(&args.output_dir)
        .with_context(|| format!("preparing {}", args.output_dir.display()))?;

    let snippets = extract_snippets(&args.docs_root, &args.doc_extension)
        .with_context(|| format!("scanning {}", args.docs_root.display()))?;
    let snippets = dedup_by_fingerprint(snippets).context("fingerprinting snippets")?;

    let written = materialize(&scratch, snippets, Layout::Export)
        .await
        .context("writing snippet files")?;

    let output_dir = scratch.keep();

    for item in &written {
        tracing::debug!("{} → {}", item.snippet.location(), item.path.display());
    }
    println!(
        "📁 Exported {} snippet(s) to {}",
        written.len(),
        output_dir.display()
    );

    Ok(())
}
