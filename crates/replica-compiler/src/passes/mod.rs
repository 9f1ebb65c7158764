//! Module passes.

mod canonicalize_compile_and_replicate_attributes;

pub use canonicalize_compile_and_replicate_attributes::{
    COMPILE_DEVICE_TYPE_ATTR, CanonicalizeCompileAndReplicateAttributesPass, CanonicalizeStats,
    REPLICATION_INFO_ATTR, TPU_DEVICE, TPU_REPLICATE_ATTR, canonicalize,
    create_canonicalize_compile_and_replicate_attributes_pass,
};
