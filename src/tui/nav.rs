//! Hierarchical navigation for parent/child lists
//!
//! The path holds the ancestors of the level being shown. An empty path is
//! the root level. The current level's own id never appears in it.

use crate::api::ParentFilter;
use crate::model::Entity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationPath {
    stack: Vec<Crumb>,
}

impl NavigationPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descend into `entity`; its children become the visible level
    pub fn drill_in(&mut self, entity: &Entity) {
        if self.stack.iter().any(|c| c.id == entity.id) {
            return;
        }
        self.stack.push(Crumb {
            id: entity.id.clone(),
            name: entity.name.clone(),
        });
    }

    /// Up one level; `false` when already at root
    pub fn back(&mut self) -> bool {
        self.stack.pop().is_some()
    }

    /// Clear to root; `false` when already there
    pub fn home(&mut self) -> bool {
        let moved = !self.stack.is_empty();
        self.stack.clear();
        moved
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_root(&self) -> bool {
        self.stack.is_empty()
    }

    /// Parent id of the visible level
    pub fn current_parent(&self) -> Option<&str> {
        self.stack.last().map(|c| c.id.as_str())
    }

    pub fn filter(&self) -> ParentFilter {
        match self.current_parent() {
            Some(id) => ParentFilter::Children(id.to_string()),
            None => ParentFilter::Root,
        }
    }

    /// "Root / Engineering / Web"
    pub fn breadcrumb(&self) -> String {
        std::iter::once("Root")
            .chain(self.stack.iter().map(|c| c.name.as_str()))
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn ids(&self) -> Vec<&str> {
        self.stack.iter().map(|c| c.id.as_str()).collect()
    }
}
