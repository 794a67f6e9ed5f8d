pub mod digest;
pub mod distribution;

pub use digest::Digest;
pub use distribution::{Descriptor, DistributionError, Manifest};
