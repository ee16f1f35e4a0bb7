//! Manifest list assembly.
//!
//! Merges resolved descriptors into a single image index. Index sources are
//! flattened into their child manifests, entries are de-duplicated by digest,
//! and the result is serialized together with its own descriptor.

use std::collections::HashMap;

use a3s_imagetools_core::error::{Result, ToolsError};
use oci_distribution::manifest::{OciDescriptor, OciImageManifest, OciManifest};
use oci_spec::image::ImageConfiguration;
use serde::{Deserialize, Serialize};

use super::descriptor::{
    is_index_media_type, is_oci_media_type, Descriptor, Platform,
    DOCKER_MANIFEST_LIST_MEDIA_TYPE, OCI_INDEX_MEDIA_TYPE, OCI_MANIFEST_MEDIA_TYPE,
};
use super::digest::Digest;

/// Image index / manifest list document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub media_type: String,
    #[serde(default)]
    pub manifests: Vec<Descriptor>,
}

/// Parse the child manifests of an index or manifest list.
pub fn index_children(data: &[u8]) -> Result<Vec<Descriptor>> {
    let index: ImageIndex = serde_json::from_slice(data)
        .map_err(|e| ToolsError::CombineError(format!("invalid image index: {}", e)))?;
    Ok(index.manifests)
}

/// Extract the config descriptor of a single-platform manifest.
pub fn manifest_config(data: &[u8]) -> Result<OciDescriptor> {
    let manifest: OciImageManifest = serde_json::from_slice(data)
        .map_err(|e| ToolsError::CombineError(format!("invalid image manifest: {}", e)))?;
    Ok(manifest.config)
}

/// Read the platform of an image from its config blob.
pub fn platform_from_config(data: &[u8]) -> Result<Platform> {
    let config: ImageConfiguration = serde_json::from_slice(data)
        .map_err(|e| ToolsError::CombineError(format!("invalid image config: {}", e)))?;

    let os = config.os().to_string();
    let architecture = config.architecture().to_string();
    if os.is_empty() || architecture.is_empty() {
        return Err(ToolsError::CombineError(
            "image config has no os/architecture".to_string(),
        ));
    }
    Ok(Platform {
        architecture,
        os,
        os_version: config.os_version().clone(),
        os_features: config.os_features().clone(),
        variant: config.variant().clone().filter(|v| !v.is_empty()),
    })
}

/// Media type of a manifest body, read from its `mediaType` field or
/// inferred from its shape.
pub fn detect_media_type(data: &[u8]) -> Result<String> {
    let manifest: OciManifest = serde_json::from_slice(data).map_err(|e| {
        ToolsError::Other(format!("cannot determine manifest media type: {}", e))
    })?;
    let (media_type, fallback) = match manifest {
        OciManifest::Image(m) => (m.media_type, OCI_MANIFEST_MEDIA_TYPE),
        OciManifest::ImageIndex(i) => (i.media_type, OCI_INDEX_MEDIA_TYPE),
    };
    Ok(media_type
        .filter(|mt| !mt.is_empty())
        .unwrap_or_else(|| fallback.to_string()))
}

/// Accumulates index entries, de-duplicating by digest.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    entries: Vec<Descriptor>,
    positions: HashMap<String, usize>,
    oci: bool,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A digest seen before keeps its first position; the later
    /// entry fills a missing media type, replaces the platform when it has
    /// one, and merges its annotations.
    pub fn add(&mut self, descriptor: Descriptor) {
        if is_oci_media_type(&descriptor.media_type) {
            self.oci = true;
        }

        let Some(&pos) = self.positions.get(&descriptor.digest) else {
            self.positions.insert(descriptor.digest.clone(), self.entries.len());
            self.entries.push(descriptor);
            return;
        };

        let existing = &mut self.entries[pos];
        if existing.media_type.is_empty() {
            existing.media_type = descriptor.media_type;
        }
        if descriptor.platform.is_some() {
            existing.platform = descriptor.platform;
        }
        if let Some(annotations) = descriptor.annotations {
            existing
                .annotations
                .get_or_insert_with(Default::default)
                .extend(annotations);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the index and compute its descriptor.
    pub fn finish(self) -> Result<(Vec<u8>, Descriptor)> {
        if self.entries.is_empty() {
            return Err(ToolsError::CombineError(
                "no manifests to combine".to_string(),
            ));
        }

        let media_type = if self.oci {
            OCI_INDEX_MEDIA_TYPE
        } else {
            DOCKER_MANIFEST_LIST_MEDIA_TYPE
        };
        let index = ImageIndex {
            schema_version: 2,
            media_type: media_type.to_string(),
            manifests: self.entries,
        };
        let data = serde_json::to_vec_pretty(&index)?;
        let descriptor = Descriptor {
            media_type: media_type.to_string(),
            digest: Digest::from_bytes(&data).to_string(),
            size: data.len() as i64,
            ..Default::default()
        };
        Ok((data, descriptor))
    }
}

/// Combine resolved sources into one index.
///
/// `inputs` pairs every descriptor with the manifest body it points at, in
/// source order. Single-platform descriptors are expected to already carry
/// their platform. A lone index source is returned unchanged.
pub fn combine_manifests(inputs: &[(Descriptor, Vec<u8>)]) -> Result<(Vec<u8>, Descriptor)> {
    if let [(descriptor, data)] = inputs {
        if descriptor.is_index() {
            return Ok((data.clone(), descriptor.clone()));
        }
    }

    let mut builder = IndexBuilder::new();
    for (descriptor, data) in inputs {
        if is_index_media_type(&descriptor.media_type) {
            if is_oci_media_type(&descriptor.media_type) {
                builder.oci = true;
            }
            for child in index_children(data)? {
                builder.add(child);
            }
        } else {
            builder.add(descriptor.clone());
        }
    }
    builder.finish()
}
