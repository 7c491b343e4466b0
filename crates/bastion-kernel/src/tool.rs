//! Tool registry
//!
//! Modules contribute tools through plain registration functions collected
//! in a static list by the host:
//!
//! ```rust,ignore
//! const MODULES: &[ModuleRegistration] = &[sales::register, inventory::register];
//! let registry = ToolRegistry::from_modules(MODULES)?;
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// A tool backed by a stored procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name offered to the model
    pub name: String,
    /// Owning module
    pub module: String,
    /// Stored procedure executed for this tool
    pub procedure: String,
    #[serde(default)]
    pub description: String,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        procedure: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            procedure: procedure.into(),
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ToolRegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),

    #[error("tool '{0}' is not registered")]
    NotFound(String),
}

/// Registration hook exposed by each module.
pub type ModuleRegistration = fn(&mut ToolRegistry) -> Result<(), ToolRegistryError>;

/// Directory of every tool known to the host.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry by running each registration function in order.
    pub fn from_modules(modules: &[ModuleRegistration]) -> Result<Self, ToolRegistryError> {
        let mut registry = Self::new();
        for register in modules {
            register(&mut registry)?;
        }
        tracing::debug!(tools = registry.len(), "tool registry assembled");
        Ok(registry)
    }

    pub fn register(&mut self, tool: ToolDefinition) -> Result<(), ToolRegistryError> {
        if self.tools.contains_key(&tool.name) {
            return Err(ToolRegistryError::Duplicate(tool.name));
        }
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ToolDefinition, ToolRegistryError> {
        self.tools
            .get(name)
            .ok_or_else(|| ToolRegistryError::NotFound(name.to_string()))
    }

    /// Tools owned by `module`, ordered by name.
    pub fn for_module<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a ToolDefinition> + 'a {
        self.tools.values().filter(move |t| t.module == module)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Order-insensitive fingerprint of a tool set.
pub fn tool_set_fingerprint<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
    names.sort();
    names.dedup();

    let mut hasher = Sha256::new();
    for name in &names {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales(registry: &mut ToolRegistry) -> Result<(), ToolRegistryError> {
        registry.register(ToolDefinition::new("top_customers", "sales", "sp_top_customers"))?;
        registry.register(ToolDefinition::new("monthly_revenue", "sales", "sp_monthly_revenue"))
    }

    fn inventory(registry: &mut ToolRegistry) -> Result<(), ToolRegistryError> {
        registry.register(ToolDefinition::new("stock_level", "inventory", "sp_stock_level"))
    }

    fn rogue(registry: &mut ToolRegistry) -> Result<(), ToolRegistryError> {
        registry.register(ToolDefinition::new("stock_level", "rogue", "sp_other"))
    }

    #[test]
    fn registry_is_built_from_static_module_list() {
        let registry = ToolRegistry::from_modules(&[sales, inventory]).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("stock_level").unwrap().procedure, "sp_stock_level");
        assert_eq!(registry.for_module("sales").count(), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ToolRegistry::from_modules(&[inventory, rogue]).unwrap_err();
        assert_eq!(err, ToolRegistryError::Duplicate("stock_level".into()));
    }

    #[test]
    fn unknown_tool_lookup_fails() {
        let registry = ToolRegistry::new();
        assert!(matches!(registry.get("nope"), Err(ToolRegistryError::NotFound(_))));
    }

    #[test]
    fn fingerprint_ignores_order_and_duplicates() {
        let a = tool_set_fingerprint(["b", "a", "c"]);
        let b = tool_set_fingerprint(["c", "a", "b", "a"]);
        assert_eq!(a, b);
        assert_ne!(a, tool_set_fingerprint(["a", "b"]));
        assert_eq!(a.len(), 64);
    }
}
