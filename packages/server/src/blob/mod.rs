//! Blob ledger: the blob table, its artifact/project attachments, and the
//! upload-size cache that bridges chunked uploads.

mod controller;
mod params;
pub mod store;
pub mod upload_size;

pub use controller::BlobController;
pub use params::{AttachToProject, BlobQuery, BlobSelector, ProjectRef};
pub use upload_size::{MemoryUploadSizeCache, RedisUploadSizeCache, UploadSizeCache};
