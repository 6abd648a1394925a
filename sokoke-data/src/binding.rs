use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

use crate::access::DataAccess;
use crate::entity::Entity;
use crate::repository::Repository;

/// Read-only table from entity name to its bound [`DataAccess`].
///
/// Produced by [`BindingsBuilder::build`] during startup wiring and never
/// mutated afterwards, so concurrent lookups need no locking.
pub struct Bindings {
    entries: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl Bindings {
    pub fn builder() -> BindingsBuilder {
        BindingsBuilder::default()
    }

    /// The data access bound for `E`, if any.
    pub fn data_access<E: Entity>(&self) -> Option<Arc<dyn DataAccess<E>>> {
        self.entries
            .get(E::name())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn DataAccess<E>>>())
            .cloned()
    }

    /// A repository over the data access bound for `E`.
    pub fn repository<E: Entity>(&self) -> Option<Repository<E>> {
        self.data_access::<E>().map(Repository::new)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entries.contains_key(entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Bindings").field("entities", &names).finish()
    }
}

#[derive(Default)]
pub struct BindingsBuilder {
    entries: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl BindingsBuilder {
    /// Bind `E` to `access`. A later binding for the same entity replaces the earlier one.
    pub fn bind<E: Entity>(mut self, access: Arc<dyn DataAccess<E>>) -> Self {
        tracing::debug!(entity = E::name(), ty = type_name::<E>(), "binding data access");
        self.entries.insert(E::name(), Box::new(access));
        self
    }

    pub fn build(self) -> Bindings {
        Bindings {
            entries: self.entries,
        }
    }
}
