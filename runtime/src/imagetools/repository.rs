//! Single-repository invariant.
//!
//! All tags and reference sources must live in one repository. Bare digest
//! sources are then rewritten into `repository@digest` references.

use std::collections::BTreeSet;

use a3s_imagetools_core::error::{Result, ToolsError};

use crate::oci::{Digest, ImageReference, Source};

/// Derive the single repository shared by `tags` and reference sources.
pub fn derive_repository(tags: &[ImageReference], sources: &[Source]) -> Result<ImageReference> {
    let mut names = BTreeSet::new();
    let mut repository = None;

    let references = tags.iter().chain(sources.iter().filter_map(Source::reference));
    for reference in references {
        if names.insert(reference.name()) && repository.is_none() {
            repository = Some(ImageReference {
                tag: None,
                digest: None,
                ..reference.clone()
            });
        }
    }

    match (names.len(), repository) {
        (1, Some(repository)) => Ok(repository),
        (0, _) => Err(ToolsError::NoRepository),
        _ => Err(ToolsError::MultipleRepositories(names.into_iter().collect())),
    }
}

/// Rewrite bare digest sources into references inside `repository`.
///
/// Returns how many sources were rewritten.
pub fn attach_bare_digests(repository: &ImageReference, sources: &mut [Source]) -> Result<usize> {
    let mut rewritten = 0;
    for source in sources.iter_mut() {
        let Source::ByDescriptor(descriptor) = source else {
            continue;
        };
        if !descriptor.is_bare_digest() {
            continue;
        }
        let digest = Digest::parse(&descriptor.digest)?;
        *source = Source::ByReference(repository.with_digest(&digest));
        rewritten += 1;
    }
    Ok(rewritten)
}
