//! `a3s-imagetools create` command — Combine source images into one manifest list.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use a3s_imagetools_core::ImagetoolsConfig;
use a3s_imagetools_runtime::{
    check_inputs, CreateOutcome, CreateRequest, ManifestCreator, RegistryAccess,
};
use clap::Args;

#[derive(Args)]
pub struct CreateArgs {
    /// Source images: references, digests or descriptor JSON
    pub sources: Vec<String>,

    /// Read source descriptor from file (repeatable)
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Set reference for new image (repeatable)
    #[arg(short = 't', long = "tag", value_name = "REF")]
    pub tags: Vec<String>,

    /// Show final image instead of pushing
    #[arg(long)]
    pub dry_run: bool,

    /// Append to existing manifest
    #[arg(long)]
    pub append: bool,
}

pub async fn execute(
    args: CreateArgs,
    config: ImagetoolsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // Source files count as sources; reject empty runs before reading any of them.
    // ManifestCreator repeats this check for callers that bypass the CLI.
    check_inputs(
        args.sources.len() + args.files.len(),
        args.tags.len(),
        args.dry_run,
    )?;

    let sources = collect_sources(&args.files, args.sources)?;
    let request = CreateRequest {
        sources,
        tags: args.tags,
        dry_run: args.dry_run,
        append: args.append,
    };

    let creator = ManifestCreator::new(Arc::new(RegistryAccess::new(config)));
    let mut stdout = std::io::stdout();
    let outcome = creator.create(request, &mut stdout).await?;

    let pushed = match &outcome {
        CreateOutcome::Pushed { tags, .. } => tags.len(),
        CreateOutcome::DryRun { .. } => 0,
    };
    tracing::info!(
        digest = %outcome.descriptor().digest,
        pushed,
        "Manifest list created"
    );
    Ok(())
}

/// File contents first (one source per file, in order), then positional sources.
fn collect_sources(files: &[PathBuf], positional: Vec<String>) -> std::io::Result<Vec<String>> {
    let mut sources = Vec::with_capacity(files.len() + positional.len());
    for file in files {
        sources.push(read_source_file(file)?);
    }
    sources.extend(positional);
    Ok(sources)
}

fn read_source_file(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("failed to read source file {}: {}", path.display(), e),
        )
    })
}
