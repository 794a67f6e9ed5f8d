pub mod blob;
pub mod proxy;
