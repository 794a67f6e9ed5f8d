pub mod artifact_blob;
pub mod blob;
pub mod project;
pub mod project_blob;
