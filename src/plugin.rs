//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Typed plugin registry.
//!
//! Per-deployment validation and commit callbacks register here as trait
//! objects keyed by plugin name, replacing dynamic-library symbol lookup.
//! Registration order is preserved and drives invocation order.

use indexmap::IndexMap;

use crate::context::Context;
use crate::data::DataTree;
use crate::error::{Error, ErrorKind, Result};
use crate::validate::Validity;

/// A per-deployment plugin. Hooks default to no-ops so implementations
/// override only what they need.
pub trait Plugin {
    /// Unique plugin name.
    fn name(&self) -> &str;

    /// Called after the structural validation passes on a candidate tree.
    fn validate(
        &self,
        _ctx: &Context,
        _tree: &DataTree,
    ) -> Result<Validity> {
        Ok(Validity::Valid)
    }

    /// Called when a validated candidate is committed.
    fn commit(&self, _ctx: &Context, _tree: &DataTree) -> Result<()> {
        Ok(())
    }
}

/// Registry of plugins, iterated in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
    index: IndexMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> PluginRegistry {
        PluginRegistry::default()
    }

    /// Register a plugin. Names must be unique.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<()> {
        let name = plugin.name().to_string();
        if self.index.contains_key(&name) {
            return Err(Error::new(
                ErrorKind::Plugin,
                format!("plugin {} already registered", name),
            ));
        }
        self.index.insert(name, self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    /// Look up a plugin by name.
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        let index = self.index.get(name)?;
        Some(self.plugins[*index].as_ref())
    }

    /// Iterate over the plugins in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|plugin| plugin.as_ref())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run every plugin's validate hook; the first invalid result stops
    /// the run.
    pub fn validate_all(
        &self,
        ctx: &Context,
        tree: &DataTree,
    ) -> Result<Validity> {
        for plugin in self.iter() {
            match plugin.validate(ctx, tree)? {
                Validity::Valid => {}
                invalid => return Ok(invalid),
            }
        }
        Ok(Validity::Valid)
    }

    /// Run every plugin's commit hook.
    pub fn commit_all(&self, ctx: &Context, tree: &DataTree) -> Result<()> {
        for plugin in self.iter() {
            plugin.commit(ctx, tree)?;
        }
        Ok(())
    }
}
