//! Module pass trait and stage definitions.

use crate::Result;
use crate::ir::Module;

/// Pipeline stage for organizing passes.
///
/// Passes are grouped into stages and run in a fixed order. Within each stage,
/// passes run in the order they were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Rewrite legacy encodings into their canonical form.
    ///
    /// Passes in this stage are local and idempotent: running one twice
    /// leaves the module unchanged the second time.
    Canonicalization,

    /// Module rewriting that relies on canonical attributes being present.
    ///
    /// Empty by default; custom passes are added to it via
    /// `CompilerPipeline::add_pass` or a `PassRegistry`.
    Optimization,
}

/// Trait for implementing module passes.
///
/// A pass is a module transformation that runs during a specific stage.
/// Passes hold no per-module state, so a single instance may be run over
/// any number of independent modules.
///
/// # Return Value
///
/// The `run()` method returns `Ok(true)` if the pass changed the module, or
/// `Ok(false)` if no changes were made.
///
/// # Example
///
/// ```ignore
/// struct StripDeviceAttributesPass;
///
/// impl Pass for StripDeviceAttributesPass {
///     fn name(&self) -> &str {
///         "strip_device_attributes"
///     }
///
///     fn argument(&self) -> &str {
///         "strip-device-attributes"
///     }
///
///     fn stage(&self) -> Stage {
///         Stage::Optimization
///     }
///
///     fn run(&self, module: &mut Module) -> Result<bool> {
///         let mut changed = false;
///         module.walk_mut(|_, op| {
///             changed |= op.remove_attribute("device").is_some();
///             Ok(WalkResult::Advance)
///         })?;
///         Ok(changed)
///     }
/// }
/// ```
pub trait Pass: Send + Sync {
    /// Get the pass name (used for logging and debugging).
    fn name(&self) -> &str;

    /// Get the command-line style argument the pass is registered under.
    fn argument(&self) -> &str;

    /// Get the stage this pass belongs to.
    fn stage(&self) -> Stage;

    /// Run the pass on the given module.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the pass changed the module.
    /// * `Ok(false)` if no changes were made.
    /// * `Err(_)` if the module rejected an edit. Edits made before the
    ///   failure are kept.
    fn run(&self, module: &mut Module) -> Result<bool>;
}
