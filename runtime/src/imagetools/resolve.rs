//! Concurrent source resolution.
//!
//! Every reference source is resolved on its own task. Results land in
//! slots indexed by source position, so the output order always matches the
//! input order. The first failure cancels the remaining tasks; its error is
//! returned once every task has exited.

use std::sync::Arc;

use a3s_imagetools_core::error::{Result, ToolsError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::traits::Resolver;
use crate::oci::{Descriptor, Source};

/// Resolve all sources to descriptors, preserving source order.
///
/// Sources that already carry a descriptor are passed through untouched.
pub async fn resolve_sources<R>(resolver: Arc<R>, sources: &[Source]) -> Result<Vec<Descriptor>>
where
    R: Resolver + ?Sized + 'static,
{
    let pending: Vec<(usize, String)> = sources
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.reference().map(|r| (i, r.to_string())))
        .collect();

    let mut slots: Vec<Option<Descriptor>> = vec![None; sources.len()];
    if !pending.is_empty() {
        resolve_pending(resolver, pending, &mut slots).await?;
    }

    sources
        .iter()
        .zip(slots)
        .map(|(source, slot)| match source {
            Source::ByDescriptor(d) => Ok(d.clone()),
            Source::ByReference(r) => slot.ok_or_else(|| ToolsError::ResolveError {
                reference: r.to_string(),
                message: "no descriptor resolved".to_string(),
            }),
        })
        .collect()
}

async fn resolve_pending<R>(
    resolver: Arc<R>,
    pending: Vec<(usize, String)>,
    slots: &mut [Option<Descriptor>],
) -> Result<()>
where
    R: Resolver + ?Sized + 'static,
{
    let token = CancellationToken::new();
    let mut tasks = JoinSet::new();

    tracing::debug!(count = pending.len(), "Resolving sources");

    for (index, reference) in pending {
        let resolver = Arc::clone(&resolver);
        let token = token.clone();
        tasks.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(ToolsError::Cancelled),
                resolved = resolver.resolve(&reference) => resolved,
            };
            (index, reference, result)
        });
    }

    let mut first_error: Option<ToolsError> = None;
    while let Some(joined) = tasks.join_next().await {
        let error = match joined {
            Ok((index, reference, Ok((name, descriptor)))) => {
                tracing::debug!(
                    reference = %reference,
                    name = %name,
                    digest = %descriptor.digest,
                    media_type = %descriptor.media_type,
                    "Resolved source"
                );
                slots[index] = Some(descriptor);
                continue;
            }
            Ok((_, _, Err(ToolsError::Cancelled))) if token.is_cancelled() => continue,
            Ok((_, reference, Err(e))) => {
                tracing::warn!(reference = %reference, error = %e, "Source resolution failed");
                e
            }
            Err(e) => ToolsError::Other(format!("Resolve task failed: {}", e)),
        };

        if first_error.is_none() {
            token.cancel();
            first_error = Some(error);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
