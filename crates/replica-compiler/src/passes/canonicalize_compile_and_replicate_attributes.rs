//! Compile and replicate attribute canonicalization pass.
//!
//! Converts the legacy `_tpu_replicate = X` marker into the unified pair
//! `_replication_info = X` and `_xla_compile_device_type = "TPU"`.
//! `tf.TPUReplicateMetadata` operations only receive `_replication_info`;
//! their device type is owned by whoever built them.
//!
//! Runs in the `Canonicalization` stage.

use replica_core::{AttributeValue, Module, Operation, Pass, Result, Stage, WalkResult};

/// Legacy replication marker.
pub const TPU_REPLICATE_ATTR: &str = "_tpu_replicate";

/// Unified compile device type marker.
pub const COMPILE_DEVICE_TYPE_ATTR: &str = "_xla_compile_device_type";

/// Unified replication info marker.
pub const REPLICATION_INFO_ATTR: &str = "_replication_info";

/// Device type written for operations that carried the legacy marker.
pub const TPU_DEVICE: &str = "TPU";

/// Counts gathered by a single canonicalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalizeStats {
    /// Operations whose legacy marker was rewritten.
    pub rewritten: usize,

    /// Of those, how many were metadata declarations (no device type set).
    pub metadata_declarations: usize,
}

impl CanonicalizeStats {
    /// Whether the run changed the module.
    pub fn changed(&self) -> bool {
        self.rewritten > 0
    }
}

/// Rewrite a single operation's attributes. Returns `true` if it carried the
/// legacy marker.
///
/// Pre-existing unified attributes are overwritten.
fn canonicalize_op(op: &mut Operation) -> Result<bool> {
    let Some(replication_info) = op.remove_attribute(TPU_REPLICATE_ATTR) else {
        return Ok(false);
    };

    op.set_attribute(REPLICATION_INFO_ATTR, replication_info)?;
    if !op.is_metadata_declaration() {
        op.set_attribute(
            COMPILE_DEVICE_TYPE_ATTR,
            AttributeValue::String(TPU_DEVICE.to_string()),
        )?;
    }

    Ok(true)
}

/// Canonicalize every operation in `module`, at any nesting depth.
///
/// Operations without the legacy marker are left untouched. Running this on
/// an already canonical module is a no-op.
///
/// # Errors
///
/// Propagates attribute store rejections. Operations rewritten before the
/// failure stay rewritten.
pub fn canonicalize(module: &mut Module) -> Result<CanonicalizeStats> {
    let mut stats = CanonicalizeStats::default();

    module.walk_mut(|id, op| {
        if canonicalize_op(op)? {
            tracing::trace!(?id, kind = %op.kind, "canonicalized replication attributes");
            stats.rewritten += 1;
            if op.is_metadata_declaration() {
                stats.metadata_declarations += 1;
            }
        }
        Ok(WalkResult::Advance)
    })?;

    tracing::debug!(
        rewritten = stats.rewritten,
        metadata_declarations = stats.metadata_declarations,
        "canonicalize compile and replicate attributes"
    );

    Ok(stats)
}

/// Pass wrapper around [`canonicalize`].
pub struct CanonicalizeCompileAndReplicateAttributesPass;

impl CanonicalizeCompileAndReplicateAttributesPass {
    /// Pass argument used for registry lookup.
    pub const ARGUMENT: &'static str = "tf-canonicalize-compile-and-replicate-attributes";

    /// Create a new canonicalization pass.
    pub fn new() -> Self {
        Self
    }
}

impl Default for CanonicalizeCompileAndReplicateAttributesPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for CanonicalizeCompileAndReplicateAttributesPass {
    fn name(&self) -> &str {
        "canonicalize_compile_and_replicate_attributes"
    }

    fn argument(&self) -> &str {
        Self::ARGUMENT
    }

    fn stage(&self) -> Stage {
        Stage::Canonicalization
    }

    fn run(&self, module: &mut Module) -> Result<bool> {
        Ok(canonicalize(module)?.changed())
    }
}

/// Create a boxed instance of the canonicalization pass.
pub fn create_canonicalize_compile_and_replicate_attributes_pass() -> Box<dyn Pass> {
    Box::new(CanonicalizeCompileAndReplicateAttributesPass::new())
}
