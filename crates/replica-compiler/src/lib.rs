//! Attribute canonicalization passes and pipeline driver for replica.
//!
//! The pipeline runs passes grouped by stage:
//! 1. **Canonicalization** - Rewrite legacy attribute encodings
//! 2. **Optimization** - Rewrites that rely on canonical attributes (custom passes)
//!
//! The built-in pass rewrites `_tpu_replicate` into `_replication_info` and
//! `_xla_compile_device_type`.
//!
//! # Example
//!
//! ```no_run
//! use replica_compiler::canonicalize_module;
//! use replica_core::{Module, OpKind, Operation};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut module = Module::new();
//! module.push(
//!     Operation::new(OpKind::from_name("tf.AddV2")).with_attribute("_tpu_replicate", "cluster1"),
//! )?;
//!
//! let report = canonicalize_module(&mut module)?;
//! println!("{} pass(es) changed the module", report.changed_count());
//! # Ok(())
//! # }
//! ```

pub mod passes;

pub use passes::{
    CanonicalizeCompileAndReplicateAttributesPass, CanonicalizeStats, canonicalize,
    create_canonicalize_compile_and_replicate_attributes_pass,
};

// Re-export commonly used types from replica-core
pub use replica_core::{Error, Module, Pass, PassRegistry, Result, Stage};

/// Build a registry holding every built-in pass.
pub fn default_registry() -> PassRegistry {
    let mut registry = PassRegistry::new();
    registry.register(
        CanonicalizeCompileAndReplicateAttributesPass::ARGUMENT,
        create_canonicalize_compile_and_replicate_attributes_pass,
    );
    registry
}

/// Pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Verify module structure before the first pass and after every pass.
    pub verify_each: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { verify_each: true }
    }
}

/// Outcome of a pipeline run, one entry per pass in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// `(pass name, changed)` pairs.
    pub passes: Vec<(String, bool)>,
}

impl PipelineReport {
    /// Number of passes that changed the module.
    pub fn changed_count(&self) -> usize {
        self.passes.iter().filter(|(_, changed)| *changed).count()
    }

    /// Whether any pass changed the module.
    pub fn changed(&self) -> bool {
        self.changed_count() > 0
    }
}

/// Module pipeline with pluggable passes.
///
/// Passes run sorted by stage; within a stage they run in registration order.
pub struct CompilerPipeline {
    /// All passes to run, ordered by (stage, registration order).
    passes: Vec<Box<dyn Pass>>,

    options: PipelineOptions,
}

impl CompilerPipeline {
    /// Create an empty pipeline.
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            passes: Vec::new(),
            options,
        }
    }

    /// Create a pipeline with the built-in passes and default options.
    ///
    /// The built-in passes are:
    /// - `CanonicalizeCompileAndReplicateAttributesPass` (Canonicalization stage)
    pub fn with_defaults() -> Self {
        let mut pipeline = Self::new(PipelineOptions::default());
        pipeline.add_pass(CanonicalizeCompileAndReplicateAttributesPass::new());
        pipeline
    }

    /// Build a pipeline from pass arguments looked up in `registry`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownPass` for the first argument the registry does
    /// not know.
    pub fn from_pass_names(
        names: &[&str],
        registry: &PassRegistry,
        options: PipelineOptions,
    ) -> Result<Self> {
        let mut pipeline = Self::new(options);
        for name in names {
            pipeline.passes.push(registry.create(name)?);
        }
        Ok(pipeline)
    }

    /// Add a custom pass to the pipeline.
    ///
    /// Returns a mutable reference to self for method chaining.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Number of registered passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the pipeline has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass over `module`.
    ///
    /// # Errors
    ///
    /// Returns an error if verification fails or any pass fails. Passes that
    /// already ran keep their edits.
    #[tracing::instrument(skip_all, fields(num_ops = module.op_count(), num_passes = self.passes.len()))]
    pub fn run(&mut self, module: &mut Module) -> Result<PipelineReport> {
        // Stable sort keeps registration order within a stage
        self.passes.sort_by_key(|p| p.stage());

        if self.options.verify_each {
            module.verify()?;
        }

        let mut report = PipelineReport::default();
        for pass in &self.passes {
            let _span =
                tracing::debug_span!("pass", name = pass.name(), stage = ?pass.stage()).entered();

            let changed = pass.run(module)?;
            tracing::debug!(changed, "pass finished");

            if self.options.verify_each {
                module.verify().map_err(|e| {
                    Error::Verification(format!("after pass '{}': {}", pass.name(), e))
                })?;
            }

            report.passes.push((pass.name().to_string(), changed));
        }

        Ok(report)
    }
}

/// Convenience function: run the default pipeline over `module`.
#[tracing::instrument(skip_all)]
pub fn canonicalize_module(module: &mut Module) -> Result<PipelineReport> {
    CompilerPipeline::with_defaults().run(module)
}
