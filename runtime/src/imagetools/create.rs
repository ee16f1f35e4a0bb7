//! `imagetools create` orchestration.
//!
//! Parses sources and tags, enforces the single-repository invariant,
//! resolves references concurrently, combines everything into one manifest
//! list, and either prints it (dry run) or pushes it under every tag.

use std::io::Write;
use std::sync::Arc;

use a3s_imagetools_core::error::{Result, ToolsError};

use super::repository::{attach_bare_digests, derive_repository};
use super::resolve::resolve_sources;
use super::traits::Registry;
use crate::oci::{parse_sources, parse_tags, Descriptor, ImageReference};

/// Inputs of a create run.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// Source tokens: contents of source files first, then positional sources
    pub sources: Vec<String>,
    /// Destination tags, in push order
    pub tags: Vec<String>,
    /// Print the combined manifest list instead of pushing it
    pub dry_run: bool,
    /// Add the first tag as an extra leading source
    pub append: bool,
}

/// What a successful create run produced.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// The manifest list was printed, nothing was pushed
    DryRun { descriptor: Descriptor },
    /// The manifest list was pushed under every tag
    Pushed {
        descriptor: Descriptor,
        tags: Vec<ImageReference>,
    },
}

impl CreateOutcome {
    pub fn descriptor(&self) -> &Descriptor {
        match self {
            CreateOutcome::DryRun { descriptor } => descriptor,
            CreateOutcome::Pushed { descriptor, .. } => descriptor,
        }
    }
}

/// Reject runs that have nothing to combine or nowhere to push.
///
/// `source_count` counts positional sources plus source files.
pub fn check_inputs(source_count: usize, tag_count: usize, dry_run: bool) -> Result<()> {
    if source_count == 0 {
        return Err(ToolsError::NoSources);
    }
    if !dry_run && tag_count == 0 {
        return Err(ToolsError::NoTags);
    }
    Ok(())
}

/// Builds multi-platform manifest lists from existing images.
pub struct ManifestCreator {
    registry: Arc<dyn Registry>,
}

impl ManifestCreator {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Run a create request, writing user-facing output to `out`.
    ///
    /// Dry runs write the combined manifest list; pushes write each tag's
    /// canonical name as soon as that tag has been pushed. A failed push
    /// stops the run, leaving earlier tags in place.
    pub async fn create<W>(&self, request: CreateRequest, out: &mut W) -> Result<CreateOutcome>
    where
        W: Write + Send,
    {
        check_inputs(request.sources.len(), request.tags.len(), request.dry_run)?;

        let tags = parse_tags(&request.tags)?;

        let mut tokens = request.sources;
        if request.append {
            if let Some(first) = request.tags.first() {
                tokens.insert(0, first.clone());
            }
        }
        let mut sources = parse_sources(&tokens)?;

        let repository = derive_repository(&tags, &sources)?;
        let rewritten = attach_bare_digests(&repository, &mut sources)?;
        let repository = repository.name();

        tracing::info!(
            repository = %repository,
            sources = sources.len(),
            digests = rewritten,
            tags = tags.len(),
            dry_run = request.dry_run,
            "Creating manifest list"
        );

        let reader = self.registry.reader()?;
        let descriptors = resolve_sources(Arc::clone(&reader), &sources).await?;

        let (data, descriptor) = reader.combine(&repository, &descriptors).await?;
        tracing::info!(
            digest = %descriptor.digest,
            media_type = %descriptor.media_type,
            size = descriptor.size,
            manifests = descriptors.len(),
            "Combined manifest list"
        );

        if request.dry_run {
            out.write_all(&data)?;
            out.write_all(b"\n")?;
            out.flush()?;
            return Ok(CreateOutcome::DryRun { descriptor });
        }

        // Pushing may need different authorization than resolving
        let writer = self.registry.writer()?;
        for tag in &tags {
            writer
                .push(&tag.with_default_tag(), &descriptor, &data)
                .await?;
            tracing::info!(tag = %tag, digest = %descriptor.digest, "Pushed manifest list");
            writeln!(out, "{}", tag)?;
            out.flush()?;
        }

        Ok(CreateOutcome::Pushed { descriptor, tags })
    }
}
