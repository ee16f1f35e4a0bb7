//! OCI registry types and plumbing.
//!
//! ```text
//!   token ──► Source ──┬── ByReference(ImageReference) ──► resolve ──┐
//!                      └── ByDescriptor(Descriptor) ─────────────────┤
//!                                                                    ▼
//!                                                 combine ──► index bytes + Descriptor
//!                                                                    │
//!                                                 push (one PUT per tag) ◄──┘
//! ```

pub mod combine;
pub mod credentials;
pub mod descriptor;
pub mod digest;
pub mod reference;
pub mod registry;
pub mod source;

pub use combine::{combine_manifests, ImageIndex, IndexBuilder};
pub use credentials::CredentialStore;
pub use descriptor::{
    Descriptor, Platform, ACCEPTED_MANIFEST_MEDIA_TYPES, DOCKER_MANIFEST_LIST_MEDIA_TYPE,
    DOCKER_MANIFEST_MEDIA_TYPE, OCI_INDEX_MEDIA_TYPE, OCI_MANIFEST_MEDIA_TYPE,
};
pub use digest::Digest;
pub use reference::{parse_tags, ImageReference};
pub use registry::{RegistryAccess, RegistryAuth, RegistryClient};
pub use source::{parse_sources, Source};
