//! OCI content descriptors and the media types imagetools understands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// OCI image manifest media type.
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

/// OCI image index media type.
pub const OCI_INDEX_MEDIA_TYPE: &str = "application/vnd.oci.image.index.v1+json";

/// Docker image manifest (schema 2) media type.
pub const DOCKER_MANIFEST_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.v2+json";

/// Docker manifest list media type.
pub const DOCKER_MANIFEST_LIST_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// Media types accepted when fetching manifests.
pub const ACCEPTED_MANIFEST_MEDIA_TYPES: &[&str] = &[
    OCI_INDEX_MEDIA_TYPE,
    DOCKER_MANIFEST_LIST_MEDIA_TYPE,
    OCI_MANIFEST_MEDIA_TYPE,
    DOCKER_MANIFEST_MEDIA_TYPE,
];

/// Content descriptor, serialized in the OCI descriptor JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content (empty for bare digests)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub media_type: String,
    /// Content digest (e.g., "sha256:abc123...")
    #[serde(default)]
    pub digest: String,
    /// Size of the referenced content in bytes
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl Descriptor {
    /// Descriptor carrying only a digest, as produced for bare digest sources.
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            ..Default::default()
        }
    }

    /// A digest without a media type still has to be looked up in the registry.
    pub fn is_bare_digest(&self) -> bool {
        self.media_type.is_empty() && !self.digest.is_empty()
    }

    /// Whether the descriptor points at an image index or manifest list.
    pub fn is_index(&self) -> bool {
        is_index_media_type(&self.media_type)
    }
}

/// Target platform of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(rename = "os.version", default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(rename = "os.features", default, skip_serializing_if = "Option::is_none")]
    pub os_features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(ref variant) = self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

pub fn is_index_media_type(media_type: &str) -> bool {
    media_type == OCI_INDEX_MEDIA_TYPE || media_type == DOCKER_MANIFEST_LIST_MEDIA_TYPE
}

pub fn is_manifest_media_type(media_type: &str) -> bool {
    media_type == OCI_MANIFEST_MEDIA_TYPE || media_type == DOCKER_MANIFEST_MEDIA_TYPE
}

/// Whether a media type belongs to the OCI (rather than Docker) family.
pub fn is_oci_media_type(media_type: &str) -> bool {
    media_type.starts_with("application/vnd.oci.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_descriptor() {
        let d: Descriptor = serde_json::from_str(
            r#"{"mediaType":"application/vnd.oci.image.manifest.v1+json","digest":"sha256:bbbb","size":123}"#,
        )
        .unwrap();
        assert_eq!(d.media_type, OCI_MANIFEST_MEDIA_TYPE);
        assert_eq!(d.digest, "sha256:bbbb");
        assert_eq!(d.size, 123);
        assert!(d.platform.is_none());
    }

    #[test]
    fn test_deserialize_platform_fields() {
        let d: Descriptor = serde_json::from_str(
            r#"{"digest":"sha256:aa","size":1,"platform":{"architecture":"arm64","os":"linux","variant":"v8","os.version":"10.0"}}"#,
        )
        .unwrap();
        let p = d.platform.unwrap();
        assert_eq!(p.architecture, "arm64");
        assert_eq!(p.variant.as_deref(), Some("v8"));
        assert_eq!(p.os_version.as_deref(), Some("10.0"));
        assert_eq!(p.to_string(), "linux/arm64/v8");
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let d = Descriptor::from_digest("sha256:aa");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"digest":"sha256:aa","size":0}"#);
    }

    #[test]
    fn test_is_bare_digest() {
        assert!(Descriptor::from_digest("sha256:aa").is_bare_digest());
        let full = Descriptor {
            media_type: OCI_MANIFEST_MEDIA_TYPE.to_string(),
            ..Descriptor::from_digest("sha256:aa")
        };
        assert!(!full.is_bare_digest());
        assert!(!Descriptor::default().is_bare_digest());
    }

    #[test]
    fn test_media_type_families() {
        assert!(is_index_media_type(DOCKER_MANIFEST_LIST_MEDIA_TYPE));
        assert!(is_index_media_type(OCI_INDEX_MEDIA_TYPE));
        assert!(!is_index_media_type(OCI_MANIFEST_MEDIA_TYPE));
        assert!(is_manifest_media_type(DOCKER_MANIFEST_MEDIA_TYPE));
        assert!(is_oci_media_type(OCI_MANIFEST_MEDIA_TYPE));
        assert!(!is_oci_media_type(DOCKER_MANIFEST_MEDIA_TYPE));
    }
}
