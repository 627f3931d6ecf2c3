use std::collections::HashSet;

use crate::fields::{JoinKey, RenderContext};
use crate::sql_ast::Join;

/// Request-scoped join registry keyed by alias.
///
/// Registering an alias that is already present is a no-op, so any number of
/// fields may ask for the same lookup join. Joins are emitted in
/// first-registration order, which lets later joins reference earlier aliases.
#[derive(Debug, Default)]
pub struct JoinPlanner {
    aliases: HashSet<String>,
    joins: Vec<Join>,
}

impl JoinPlanner {
    /// Planner for a source whose FROM clause already binds `base_alias`.
    pub fn with_base(base_alias: &str) -> Self {
        let mut planner = Self::default();
        planner.aliases.insert(base_alias.to_string());
        planner
    }

    /// Register a join under `alias`; `build` only runs for a new alias.
    /// Returns whether the join was added.
    pub fn register_join<F>(&mut self, alias: &str, build: F) -> bool
    where
        F: FnOnce() -> Join,
    {
        if self.aliases.contains(alias) {
            return false;
        }
        self.aliases.insert(alias.to_string());
        self.joins.push(build());
        true
    }

    pub fn register_key(&mut self, key: JoinKey, ctx: &RenderContext<'_>) -> bool {
        self.register_join(key.alias(), || key.build(ctx))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn into_joins(self) -> Vec<Join> {
        self.joins
    }
}
