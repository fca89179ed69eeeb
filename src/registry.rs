//! Confined type registry: which types are context-confined and how.
//!
//! Built once at startup and handed to the guard. Lookups are keyed by `TypeId`,
//! so no runtime type introspection is needed at check time.

use crate::context::{ConcurrencyType, ContextId};
use std::any::{type_name, TypeId};
use std::collections::HashMap;

/// Registration entry for one confined type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfinedType {
    pub type_name: &'static str,
    pub concurrency: ConcurrencyType,
}

impl ConfinedType {
    /// Context an instance created on `creating` must be used from
    pub fn expected_context(&self, creating: ContextId) -> ContextId {
        match self.concurrency {
            ConcurrencyType::MainQueue => ContextId::MAIN_QUEUE,
            _ => creating,
        }
    }
}

/// Registry of confined types
#[derive(Debug, Clone, Default)]
pub struct ConfinedTypeRegistry {
    types: HashMap<TypeId, ConfinedType>,
}

impl ConfinedTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` as confined; re-registration replaces the concurrency type
    pub fn register<T: 'static>(&mut self, concurrency: ConcurrencyType) -> &mut Self {
        self.types.insert(
            TypeId::of::<T>(),
            ConfinedType {
                type_name: type_name::<T>(),
                concurrency,
            },
        );
        self
    }

    pub fn lookup<T: 'static>(&self) -> Option<&ConfinedType> {
        self.types.get(&TypeId::of::<T>())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfinedType> {
        self.types.values()
    }
}
