//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG schema context.

use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::data::DataTree;
use crate::error::{Error, ErrorKind, Result};
use crate::schema::{
    SchemaModule, SchemaNode, SchemaNodeData, SchemaNodeDef, SchemaNodeId,
    SchemaNodeKind,
};

/// Context of the YANG schemas.
///
/// The context holds every registered module in a single arena and is the
/// only owner of schema state. It is created and populated once, then shared
/// read-only; all data trees referencing it must be dropped before it is.
/// The expanded global-defaults trees are cached here, one slot for config
/// and one for state data, populated on first use.
#[derive(Debug)]
pub struct Context {
    pub(crate) nodes: Vec<SchemaNodeData>,
    pub(crate) modules: IndexMap<String, SchemaNodeId>,
    defaults_cache: DefaultsCache,
}

#[derive(Debug, Default)]
struct DefaultsCache {
    config: OnceLock<DataTree>,
    state: OnceLock<DataTree>,
}

// ===== impl Context =====

impl Context {
    /// Create an empty schema context.
    pub fn new() -> Context {
        Context {
            nodes: Vec::new(),
            modules: IndexMap::new(),
            defaults_cache: DefaultsCache::default(),
        }
    }

    /// Register a new module. The returned id is the arena root under which
    /// the module's top-level data nodes are appended.
    pub fn add_module(
        &mut self,
        name: &str,
        namespace: &str,
        prefix: &str,
    ) -> Result<SchemaNodeId> {
        if self.modules.contains_key(name) {
            return Err(Error::internal(format!(
                "module {} already registered",
                name
            )));
        }
        let mut data = SchemaNodeData::new(SchemaNodeKind::Module, name);
        data.namespace = namespace.to_string();
        data.prefix = prefix.to_string();
        let id = SchemaNodeId(self.nodes.len());
        data.module = id;
        self.nodes.push(data);
        self.modules.insert(name.to_string(), id);
        self.defaults_cache = DefaultsCache::default();
        Ok(id)
    }

    /// Append a schema node under `parent` (a module root or another schema
    /// node). Facets are taken from the descriptor; `config` is resolved
    /// against the parent at this point.
    pub fn append(
        &mut self,
        parent: SchemaNodeId,
        def: SchemaNodeDef,
    ) -> Result<SchemaNodeId> {
        let pdata = self
            .nodes
            .get(parent.0)
            .ok_or_else(|| Error::internal("invalid parent schema node"))?;
        match pdata.kind {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                return Err(Error::internal(format!(
                    "{} {} cannot have children",
                    pdata.kind, pdata.name
                )));
            }
            _ => {}
        }
        if def.kind == SchemaNodeKind::Module {
            return Err(Error::internal("use add_module to register modules"));
        }

        // Name clash detection, from the nearest non-schema-only ancestor so
        // that siblings hidden under other cases of the same choice are seen.
        let mut scope = parent;
        while self.nodes[scope.0].kind == SchemaNodeKind::Choice
            || self.nodes[scope.0].kind == SchemaNodeKind::Case
        {
            match self.nodes[scope.0].parent {
                Some(p) => scope = p,
                None => break,
            }
        }
        let namespace = self.nodes[pdata.module.0].namespace.clone();
        if self.nodes[scope.0].kind == SchemaNodeKind::Module {
            // Top-level: no two modules may export the same name in the same
            // namespace.
            for module in self.modules.values() {
                if self.nodes[module.0].namespace != namespace {
                    continue;
                }
                if self
                    .node(*module)
                    .find_child(Some(&namespace), &def.name)
                    .is_some()
                {
                    return Err(Error::new(
                        ErrorKind::BindAmbiguous,
                        format!(
                            "{} already exported in namespace {}",
                            def.name, namespace
                        ),
                    ));
                }
            }
        } else if self
            .node(scope)
            .find_child(Some(&namespace), &def.name)
            .is_some()
        {
            return Err(Error::internal(format!(
                "duplicate schema child {}",
                def.name
            )));
        }

        let pconfig = self.nodes[parent.0].config;
        let module = self.nodes[parent.0].module;
        let mut data = SchemaNodeData::new(def.kind, &def.name);
        data.module = module;
        data.parent = Some(parent);
        data.config = pconfig && def.config.unwrap_or(true);
        data.presence = def.presence;
        data.ordered_by_user = def.ordered_by_user;
        data.default = def.default;
        data.default_case = def.default_case;
        data.min_elements = def.min_elements;
        data.max_elements = def.max_elements;
        data.when = def.when;
        data.keys = def.keys;
        data.uniques = def.uniques;

        let id = SchemaNodeId(self.nodes.len());
        self.nodes.push(data);
        self.nodes[parent.0].children.push(id);
        // Schema changed; cached default trees are stale.
        self.defaults_cache = DefaultsCache::default();
        Ok(id)
    }

    /// Handle for an arena node id.
    pub fn node(&self, id: SchemaNodeId) -> SchemaNode<'_> {
        SchemaNode { context: self, id }
    }

    /// Get a module by name.
    pub fn get_module(&self, name: &str) -> Option<SchemaModule<'_>> {
        let id = self.modules.get(name)?;
        Some(SchemaModule {
            context: self,
            id: *id,
        })
    }

    /// Get a module by namespace.
    pub fn get_module_ns(&self, namespace: &str) -> Option<SchemaModule<'_>> {
        self.modules()
            .find(|module| module.namespace() == namespace)
    }

    /// Returns an iterator over the registered modules, in registration
    /// order.
    pub fn modules(&self) -> impl Iterator<Item = SchemaModule<'_>> {
        self.modules.values().map(move |id| SchemaModule {
            context: self,
            id: *id,
        })
    }

    /// Returns an iterator over all schema data nodes of all modules
    /// (depth-first search algorithm).
    pub fn traverse(&self) -> impl Iterator<Item = SchemaNode<'_>> {
        self.modules().flat_map(|module| {
            module.data_nodes().flat_map(|snode| snode.traverse())
        })
    }

    /// Registration index of a module, used for cross-module sibling
    /// ordering.
    pub(crate) fn module_index(&self, module: SchemaNodeId) -> usize {
        self.modules
            .values()
            .position(|id| *id == module)
            .unwrap_or(usize::MAX)
    }

    /// Find a top-level data node across the module set.
    ///
    /// With a namespace the lookup is exact. Without one (unprefixed XML
    /// with no default namespace in scope) the name is matched across all
    /// modules and two hits make the binding ambiguous.
    pub(crate) fn find_top(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<SchemaNode<'_>>> {
        let mut found: Option<SchemaNode<'_>> = None;
        for module in self.modules() {
            if let Some(ns) = namespace {
                if ns != module.namespace() {
                    continue;
                }
            }
            if let Some(snode) = module.node().find_child(namespace, name) {
                if found.is_some() {
                    return Err(Error::new(
                        ErrorKind::BindAmbiguous,
                        format!("top-level name {} is ambiguous", name),
                    ));
                }
                found = Some(snode);
            }
        }
        Ok(found)
    }

    /// The cached whole-schema default tree for config or state data.
    ///
    /// Populated on first use; population is idempotent and readers never
    /// observe a partially built tree. The cache is dropped whenever the
    /// schema changes.
    pub fn global_defaults_tree(&self, state: bool) -> Result<&DataTree> {
        let slot = if state {
            &self.defaults_cache.state
        } else {
            &self.defaults_cache.config
        };
        if let Some(tree) = slot.get() {
            return Ok(tree);
        }
        let tree = crate::defaults::build_global_defaults(self, state)?;
        // A concurrent populate of the same epoch built the same tree, so a
        // lost race is harmless.
        let _ = slot.set(tree);
        Ok(slot.get().unwrap())
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}
