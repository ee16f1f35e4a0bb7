//! Source tokens for `imagetools create`.
//!
//! A source is a bare content digest, an image reference, or an inline
//! descriptor JSON object, tried in that order.

use a3s_imagetools_core::error::{Result, ToolsError};

use super::descriptor::Descriptor;
use super::digest::Digest;
use super::reference::ImageReference;

/// One input to a manifest list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Content already described (bare digest or inline descriptor)
    ByDescriptor(Descriptor),
    /// Content that must be looked up in the registry
    ByReference(ImageReference),
}

impl Source {
    /// Parse one source token.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let invalid = |message: String| ToolsError::InvalidSource {
            token: token.to_string(),
            message,
        };

        match Digest::parse(token) {
            Ok(digest) => return Ok(Source::ByDescriptor(Descriptor::from_digest(digest.to_string()))),
            // A malformed digest is never reinterpreted as a repository name
            Err(e) if Digest::has_algorithm_prefix(token) => return Err(invalid(e.to_string())),
            Err(_) => {}
        }

        let reference_err = match ImageReference::parse(token) {
            Ok(reference) => return Ok(Source::ByReference(reference)),
            Err(e) => e,
        };
        if !token.starts_with('{') {
            return Err(invalid(reference_err.to_string()));
        }

        serde_json::from_str::<Descriptor>(token)
            .map(Source::ByDescriptor)
            .map_err(|e| invalid(format!("invalid descriptor JSON: {}", e)))
    }

    /// The reference this source must be resolved through, if any.
    pub fn reference(&self) -> Option<&ImageReference> {
        match self {
            Source::ByReference(r) => Some(r),
            Source::ByDescriptor(_) => None,
        }
    }

    pub fn descriptor(&self) -> Option<&Descriptor> {
        match self {
            Source::ByDescriptor(d) => Some(d),
            Source::ByReference(_) => None,
        }
    }
}

/// Parse every source token in order, failing on the first invalid one.
pub fn parse_sources<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Source>> {
    tokens.iter().map(|t| Source::parse(t.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::descriptor::OCI_MANIFEST_MEDIA_TYPE;

    fn digest(c: char) -> String {
        format!("sha256:{}", c.to_string().repeat(64))
    }

    #[test]
    fn test_parse_bare_digest() {
        let d = digest('a');
        let source = Source::parse(&d).unwrap();
        let desc = source.descriptor().unwrap();
        assert_eq!(desc.digest, d);
        assert!(desc.media_type.is_empty());
        assert_eq!(desc.size, 0);
        assert!(desc.is_bare_digest());
    }

    #[test]
    fn test_parse_malformed_digest_is_error() {
        for token in ["sha256:abc", "sha256:", "sha256", "sha512:zz", "sha256abc/repo"] {
            let err = Source::parse(token).unwrap_err();
            assert!(
                matches!(err, ToolsError::InvalidSource { .. }),
                "{token} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_reference() {
        let source = Source::parse("ghcr.io/org/app:amd64").unwrap();
        let r = source.reference().unwrap();
        assert_eq!(r.to_string(), "ghcr.io/org/app:amd64");
        assert!(source.descriptor().is_none());
    }

    #[test]
    fn test_parse_reference_with_digest() {
        let token = format!("ghcr.io/org/app@{}", digest('c'));
        let source = Source::parse(&token).unwrap();
        assert_eq!(source.reference().unwrap().digest, Some(digest('c')));
    }

    #[test]
    fn test_parse_descriptor_json() {
        let token = format!(
            r#"{{"mediaType":"{}","digest":"{}","size":123}}"#,
            OCI_MANIFEST_MEDIA_TYPE,
            digest('b')
        );
        let source = Source::parse(&token).unwrap();
        let desc = source.descriptor().unwrap();
        assert_eq!(desc.media_type, OCI_MANIFEST_MEDIA_TYPE);
        assert_eq!(desc.digest, digest('b'));
        assert_eq!(desc.size, 123);
    }

    #[test]
    fn test_parse_descriptor_json_with_trailing_newline() {
        let token = format!("{{\"digest\":\"{}\",\"size\":7}}\n", digest('d'));
        let source = Source::parse(&token).unwrap();
        assert_eq!(source.descriptor().unwrap().size, 7);
    }

    #[test]
    fn test_parse_digest_from_file_contents() {
        let source = Source::parse(&format!("{}\n", digest('e'))).unwrap();
        let desc = source.descriptor().unwrap();
        assert!(desc.is_bare_digest());
        assert_eq!(desc.digest, digest('e'));
    }

    #[test]
    fn test_parse_surrounding_whitespace_ignored() {
        let source = Source::parse("  repo:a\t").unwrap();
        assert_eq!(
            source.reference().unwrap().to_string(),
            "docker.io/library/repo:a"
        );
    }

    #[test]
    fn test_parse_broken_json() {
        let err = Source::parse(r#"{"digest": "#).unwrap_err();
        assert!(err.to_string().contains("invalid descriptor JSON"));
    }

    #[test]
    fn test_parse_garbage() {
        let err = Source::parse("not a valid source!").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("\"not a valid source!\""));
        assert!(msg.contains("digests, references and descriptors"));
    }

    #[test]
    fn test_parse_sources_keeps_order() {
        let tokens = vec![
            "repo:b".to_string(),
            digest('a'),
            "repo:a".to_string(),
        ];
        let sources = parse_sources(&tokens).unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].reference().unwrap().tag.as_deref(), Some("b"));
        assert!(sources[1].descriptor().is_some());
        assert_eq!(sources[2].reference().unwrap().tag.as_deref(), Some("a"));
    }

    #[test]
    fn test_parse_sources_fails_fast() {
        let err = parse_sources(&["repo:a", "Bad Token", "sha256:zz"]).unwrap_err();
        match err {
            ToolsError::InvalidSource { token, .. } => assert_eq!(token, "Bad Token"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
