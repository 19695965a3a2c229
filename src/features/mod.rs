// Feature extraction — hostnames to fixed-order numeric vectors.
//
// normalizer → registry (explicit list of extractors) → vector builder.
// Everything here is pure: the same configuration and the same host always
// produce the same bits in the same column order.

pub mod config;
pub mod extractors;
pub mod normalizer;
pub mod registry;
pub mod traits;
pub mod vector;

pub use config::ExtractorConfig;
pub use normalizer::{Domain, DomainNormalizer, DomainParts};
pub use registry::FeatureRegistry;
pub use traits::FeatureExtractor;
pub use vector::{FeatureMatrix, FeatureSet, FeatureVectorBuilder};
