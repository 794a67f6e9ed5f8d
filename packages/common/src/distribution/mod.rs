//! Distribution API vocabulary: descriptors, manifests and request paths.

mod descriptor;
mod error;
mod manifest;
mod path;

pub use descriptor::{Descriptor, media_type};
pub use error::DistributionError;
pub use manifest::{ImageIndex, ImageManifest, Manifest, unmarshal_manifest};
pub use path::{BlobUploadPath, ManifestPath, is_valid_repository_name, project_name};
