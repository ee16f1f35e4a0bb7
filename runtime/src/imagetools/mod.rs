//! Manifest list creation.

mod create;
mod repository;
mod resolve;
mod traits;

pub use create::{check_inputs, CreateOutcome, CreateRequest, ManifestCreator};
pub use repository::{attach_bare_digests, derive_repository};
pub use resolve::resolve_sources;
pub use traits::{Combiner, Pusher, ReadSession, Registry, Resolver};
