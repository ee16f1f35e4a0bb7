//! Collaborator traits for manifest list assembly.
//!
//! Reading (resolve + combine) and writing (push) are opened separately
//! through a [`Registry`], so each phase gets its own client and
//! authorization state.

use std::sync::Arc;

use a3s_imagetools_core::error::Result;
use async_trait::async_trait;

use crate::oci::{Descriptor, ImageReference};

/// Maps a reference to the descriptor of its manifest.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `reference`, returning its canonical name and descriptor.
    async fn resolve(&self, reference: &str) -> Result<(String, Descriptor)>;
}

/// Merges descriptors into a single manifest list.
#[async_trait]
pub trait Combiner: Send + Sync {
    /// Combine `descriptors` (all inside `repository`) into one index,
    /// returning its bytes and descriptor.
    async fn combine(
        &self,
        repository: &str,
        descriptors: &[Descriptor],
    ) -> Result<(Vec<u8>, Descriptor)>;
}

/// Uploads a manifest under a tag.
#[async_trait]
pub trait Pusher: Send + Sync {
    async fn push(
        &self,
        reference: &ImageReference,
        descriptor: &Descriptor,
        data: &[u8],
    ) -> Result<()>;
}

/// Read capability: everything needed before the publish step.
pub trait ReadSession: Resolver + Combiner {}

impl<T: Resolver + Combiner> ReadSession for T {}

/// Opens read and write sessions against container registries.
pub trait Registry: Send + Sync {
    /// Open a read session with freshly loaded credentials.
    fn reader(&self) -> Result<Arc<dyn ReadSession>>;

    /// Open a write session with freshly loaded credentials.
    fn writer(&self) -> Result<Arc<dyn Pusher>>;
}
