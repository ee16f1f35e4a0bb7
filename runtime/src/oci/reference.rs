//! OCI image reference parsing.
//!
//! Parses image references like `ghcr.io/a3s-box/code:v0.1.0` into normalized
//! components. Parsing never invents a tag; callers that talk to a registry
//! use [`ImageReference::with_default_tag`].

use a3s_imagetools_core::error::{Result, ToolsError};

use super::digest::Digest;

/// Default registry when none is specified.
const DEFAULT_REGISTRY: &str = "docker.io";

/// Legacy Docker Hub hostname, normalized to [`DEFAULT_REGISTRY`].
const LEGACY_DEFAULT_REGISTRY: &str = "index.docker.io";

/// Namespace for single-component Docker Hub repositories.
const OFFICIAL_NAMESPACE: &str = "library";

/// Default tag applied before talking to a registry.
const DEFAULT_TAG: &str = "latest";

/// Maximum length of `registry/repository`.
const NAME_TOTAL_LENGTH_MAX: usize = 255;

/// Maximum tag length.
const TAG_LENGTH_MAX: usize = 128;

/// Parsed, normalized OCI image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    /// Registry hostname (e.g., "ghcr.io", "docker.io")
    pub registry: String,
    /// Repository path (e.g., "library/nginx", "a3s-box/code")
    pub repository: String,
    /// Tag (e.g., "latest", "v0.1.0")
    pub tag: Option<String>,
    /// Digest (e.g., "sha256:abc123...")
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse and normalize an image reference string.
    ///
    /// Supports formats:
    /// - `nginx` → docker.io/library/nginx
    /// - `nginx:1.25` → docker.io/library/nginx:1.25
    /// - `myuser/myimage` → docker.io/myuser/myimage
    /// - `ghcr.io/org/image:tag` → ghcr.io/org/image:tag
    /// - `ghcr.io/org/image@sha256:abc...` → ghcr.io/org/image@sha256:abc...
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ToolsError::InvalidReference(
                "empty image reference".to_string(),
            ));
        }

        if reference.len() == 64 && reference.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(ToolsError::InvalidReference(format!(
                "invalid repository name ({}), cannot specify 64-byte hexadecimal strings",
                reference
            )));
        }

        // Split off digest first (@ separator)
        let (name_tag, digest) = match reference.split_once('@') {
            Some((name_tag, digest_part)) => {
                let digest = Digest::parse(digest_part).map_err(|e| {
                    ToolsError::InvalidReference(format!("'{}': {}", reference, e))
                })?;
                (name_tag, Some(digest.to_string()))
            }
            None => (reference, None),
        };

        // Split tag on the last colon after the last slash, so registry ports survive
        let tag_start = name_tag.rfind('/').map(|p| p + 1).unwrap_or(0);
        let (name, tag) = match name_tag[tag_start..].rfind(':') {
            Some(colon) => {
                let colon = tag_start + colon;
                (&name_tag[..colon], Some(&name_tag[colon + 1..]))
            }
            None => (name_tag, None),
        };

        if let Some(tag) = tag {
            validate_tag(reference, tag)?;
        }

        let (registry, repository) = Self::split_registry_repository(reference, name)?;

        if registry.len() + 1 + repository.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(ToolsError::InvalidReference(format!(
                "'{}': repository name must not be more than {} characters",
                reference, NAME_TOTAL_LENGTH_MAX
            )));
        }

        Ok(ImageReference {
            registry,
            repository,
            tag: tag.map(str::to_string),
            digest,
        })
    }

    /// Split a name into registry and repository components.
    fn split_registry_repository(reference: &str, name: &str) -> Result<(String, String)> {
        // The first component is a registry hostname when it contains a dot
        // or colon, or is "localhost"
        let (registry, remainder) = match name.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                validate_registry(reference, first)?;
                (first.to_string(), rest)
            }
            _ => (DEFAULT_REGISTRY.to_string(), name),
        };

        let registry = if registry == LEGACY_DEFAULT_REGISTRY {
            DEFAULT_REGISTRY.to_string()
        } else {
            registry
        };

        if remainder.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ToolsError::InvalidReference(format!(
                "'{}': repository name must be lowercase",
                reference
            )));
        }
        if remainder.is_empty() {
            return Err(ToolsError::InvalidReference(format!(
                "'{}': empty repository",
                reference
            )));
        }
        for component in remainder.split('/') {
            validate_path_component(reference, component)?;
        }

        // Single name like "nginx" → "library/nginx" for Docker Hub
        let repository = if registry == DEFAULT_REGISTRY && !remainder.contains('/') {
            format!("{}/{}", OFFICIAL_NAMESPACE, remainder)
        } else {
            remainder.to_string()
        };

        Ok((registry, repository))
    }

    /// Repository name: the reference without tag or digest.
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Get the full reference string.
    pub fn full_reference(&self) -> String {
        let mut s = self.name();
        if let Some(ref tag) = self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }

    /// Return this reference with the `latest` tag added when it has neither
    /// tag nor digest.
    pub fn with_default_tag(&self) -> Self {
        let mut r = self.clone();
        if r.tag.is_none() && r.digest.is_none() {
            r.tag = Some(DEFAULT_TAG.to_string());
        }
        r
    }

    /// Reference to `digest` inside this reference's repository.
    pub fn with_digest(&self, digest: &Digest) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: None,
            digest: Some(digest.to_string()),
        }
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

impl std::str::FromStr for ImageReference {
    type Err = ToolsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parse destination tags in order, failing on the first invalid one.
pub fn parse_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<ImageReference>> {
    tags.iter()
        .map(|tag| {
            let tag = tag.as_ref();
            ImageReference::parse(tag).map_err(|e| ToolsError::InvalidTag {
                tag: tag.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn validate_tag(reference: &str, tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid_first || !valid_rest || tag.len() > TAG_LENGTH_MAX {
        return Err(ToolsError::InvalidReference(format!(
            "'{}': invalid tag '{}'",
            reference, tag
        )));
    }
    Ok(())
}

fn validate_registry(reference: &str, registry: &str) -> Result<()> {
    let (host, port) = match registry.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (registry, None),
    };
    let host_ok = !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                && !label.starts_with('-')
                && !label.ends_with('-')
        });
    let port_ok = port.map_or(true, |p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if !host_ok || !port_ok {
        return Err(ToolsError::InvalidReference(format!(
            "'{}': invalid registry '{}'",
            reference, registry
        )));
    }
    Ok(())
}

/// Path components are lowercase alphanumeric runs joined by `.`, `_`, `__`
/// or one or more `-`.
fn validate_path_component(reference: &str, component: &str) -> Result<()> {
    let invalid = || {
        ToolsError::InvalidReference(format!(
            "'{}': invalid repository path component '{}'",
            reference, component
        ))
    };

    let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let mut chars = component.chars().peekable();
    if !chars.peek().copied().is_some_and(is_alnum) {
        return Err(invalid());
    }

    let mut separator = String::new();
    for c in chars {
        if is_alnum(c) {
            let valid = separator.is_empty()
                || separator == "."
                || separator == "_"
                || separator == "__"
                || separator.chars().all(|s| s == '-');
            if !valid {
                return Err(invalid());
            }
            separator.clear();
        } else if matches!(c, '.' | '_' | '-') {
            separator.push(c);
        } else {
            return Err(invalid());
        }
    }

    if !separator.is_empty() {
        return Err(invalid());
    }
    Ok(())
}
