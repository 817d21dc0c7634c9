// Adapters layer: concrete storage backends.

pub mod blob;
#[cfg(feature = "lambda")]
pub mod s3;

pub use blob::BlobStorage;
#[cfg(feature = "lambda")]
pub use s3::S3Storage;
