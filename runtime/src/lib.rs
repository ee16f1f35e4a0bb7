//! A3S Imagetools Runtime - manifest list assembly.
//!
//! This crate turns a set of image sources (references, digests, inline
//! descriptors) into a single multi-platform manifest list and publishes it
//! to a container registry under one or more tags.

#![allow(clippy::result_large_err)]

pub mod imagetools;
pub mod oci;

// Re-export common types
pub use imagetools::{
    check_inputs, Combiner, CreateOutcome, CreateRequest, ManifestCreator, Pusher, ReadSession,
    Registry, Resolver,
};
pub use oci::{CredentialStore, Descriptor, Digest, ImageReference, Platform, Source};
pub use oci::{RegistryAccess, RegistryAuth, RegistryClient};

/// A3S Imagetools Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
