//! Pass registry for building pipelines from pass arguments.

use crate::pass::Pass;
use crate::{Error, Result};
use std::collections::HashMap;

type PassFactory = Box<dyn Fn() -> Box<dyn Pass> + Send + Sync>;

/// Registry of pass constructors.
///
/// Maps pass arguments (e.g., "tf-canonicalize-compile-and-replicate-attributes")
/// to factories that build a fresh pass instance. This lets a driver assemble
/// a pipeline from a textual list of pass names.
///
/// # Example
///
/// ```ignore
/// let mut registry = PassRegistry::new();
/// registry.register("strip-device-attributes", || Box::new(StripDeviceAttributesPass));
///
/// let pass = registry.create("strip-device-attributes")?;
/// pass.run(&mut module)?;
/// ```
pub struct PassRegistry {
    /// Map from pass argument to factory.
    factories: HashMap<String, PassFactory>,
}

impl PassRegistry {
    /// Create a new empty pass registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a pass factory under `argument`.
    ///
    /// Registering the same argument twice replaces the earlier factory.
    /// Returns `self` for method chaining.
    pub fn register<F>(&mut self, argument: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Pass> + Send + Sync + 'static,
    {
        self.factories.insert(argument.to_string(), Box::new(factory));
        self
    }

    /// Build a new instance of the pass registered under `argument`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownPass` if nothing is registered under `argument`.
    pub fn create(&self, argument: &str) -> Result<Box<dyn Pass>> {
        self.factories
            .get(argument)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownPass(argument.to_string()))
    }

    /// Check if a pass is registered.
    pub fn contains(&self, argument: &str) -> bool {
        self.factories.contains_key(argument)
    }

    /// Get the number of registered passes.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Iterate over all registered pass arguments.
    pub fn pass_arguments(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
