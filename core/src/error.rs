use thiserror::Error;

/// A3S Imagetools error types
#[derive(Error, Debug)]
pub enum ToolsError {
    /// Neither positional sources nor source files were given
    #[error("No sources specified")]
    NoSources,

    /// Push requested without any destination tag
    #[error("Can't push with no tags specified, please set --tag or --dry-run")]
    NoTags,

    /// Malformed content digest
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    /// Malformed image reference
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Source token that is neither a digest, a reference nor a descriptor
    #[error("Failed to parse source {token:?}, valid sources are digests, references and descriptors: {message}")]
    InvalidSource { token: String, message: String },

    /// Malformed destination tag
    #[error("Invalid tag {tag:?}: {message}")]
    InvalidTag { tag: String, message: String },

    /// No repository could be derived from tags or sources
    #[error("No repositories specified, please set a reference in tag or source")]
    NoRepository,

    /// Tags and sources point at more than one repository
    #[error("Multiple repositories currently not supported, found: {}", .0.join(", "))]
    MultipleRepositories(Vec<String>),

    /// Resolving a source reference failed
    #[error("Failed to resolve {reference}: {message}")]
    ResolveError { reference: String, message: String },

    /// Work aborted because a sibling task failed
    #[error("Operation cancelled")]
    Cancelled,

    /// The descriptor set could not be combined into one index
    #[error("Combine error: {0}")]
    CombineError(String),

    /// Pushing the combined index under a tag failed
    #[error("Failed to push {reference}: {message}")]
    PushError { reference: String, message: String },

    /// Container registry error
    #[error("Registry error: {registry} - {message}")]
    RegistryError { registry: String, message: String },

    /// Credential store error
    #[error("Credential error: {0}")]
    CredentialError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ToolsError {
    fn from(err: serde_json::Error) -> Self {
        ToolsError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ToolsError {
    fn from(err: serde_yaml::Error) -> Self {
        ToolsError::SerializationError(err.to_string())
    }
}

/// Result type alias for imagetools operations
pub type Result<T> = std::result::Result<T, ToolsError>;
