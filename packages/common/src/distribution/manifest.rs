use serde::Deserialize;

use super::descriptor::{Descriptor, media_type};
use super::error::DistributionError;
use crate::digest::Digest;

/// Docker schema2 image manifest or OCI image manifest.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

/// Docker manifest list or OCI image index.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    pub manifests: Vec<Descriptor>,
}

#[derive(Clone, Debug)]
pub enum Manifest {
    Image(ImageManifest),
    Index(ImageIndex),
}

impl Manifest {
    /// Everything the manifest points at, in declaration order.
    ///
    /// Image manifests list their config before their layers.
    pub fn references(&self) -> Vec<Descriptor> {
        match self {
            Manifest::Image(image) => std::iter::once(image.config.clone())
                .chain(image.layers.iter().cloned())
                .collect(),
            Manifest::Index(index) => index.manifests.clone(),
        }
    }

    /// References whose content is hosted outside the registry.
    pub fn foreign_layers(&self) -> Vec<Descriptor> {
        match self {
            Manifest::Image(image) => image
                .layers
                .iter()
                .filter(|layer| layer.is_foreign())
                .cloned()
                .collect(),
            Manifest::Index(_) => Vec::new(),
        }
    }
}

/// Parse a pushed manifest body.
///
/// Returns the manifest along with a descriptor for the manifest itself: its
/// resolved media type, the SHA-256 digest of `body` and the body length.
pub fn unmarshal_manifest(
    content_type: &str,
    body: &[u8],
) -> Result<(Manifest, Descriptor), DistributionError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| DistributionError::InvalidManifest(e.to_string()))?;

    let declared = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    let resolved = match declared {
        "" | "application/json" | media_type::OCTET_STREAM => detect_media_type(&value),
        other => other.to_string(),
    };

    let manifest = match resolved.as_str() {
        media_type::DOCKER_MANIFEST | media_type::OCI_MANIFEST => Manifest::Image(
            serde_json::from_value(value)
                .map_err(|e| DistributionError::InvalidManifest(e.to_string()))?,
        ),
        media_type::DOCKER_MANIFEST_LIST | media_type::OCI_INDEX => Manifest::Index(
            serde_json::from_value(value)
                .map_err(|e| DistributionError::InvalidManifest(e.to_string()))?,
        ),
        _ => return Err(DistributionError::UnsupportedMediaType(resolved)),
    };

    let descriptor = Descriptor::new(resolved, Digest::compute(body), body.len() as i64);

    Ok((manifest, descriptor))
}

/// Guess the media type of a manifest pushed without a usable Content-Type.
fn detect_media_type(value: &serde_json::Value) -> String {
    if let Some(media_type) = value.get("mediaType").and_then(|v| v.as_str()) {
        return media_type.to_string();
    }

    if value.get("manifests").is_some() {
        media_type::OCI_INDEX.to_string()
    } else {
        media_type::OCI_MANIFEST.to_string()
    }
}
