//! The frozen registration table and its node-aware lookups.
//!
//! Every lookup that the resolver needs goes through here, so a missing
//! capability is always reported against the node that asked for it.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use blockwire_types::NodeId;
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{
    builder::TypeBuilder,
    table::{InstanceFactory, Input, Output, StaticFactory, TypeCapabilities},
};
use crate::{
    error::{Capability, EngineError},
    value::Value,
};

/// Registration table mapping producer types to their capabilities.
///
/// Types are indexed twice: by the declared name used in graph documents
/// (for static factories and literal fallbacks) and by runtime [`TypeId`]
/// (for instance factories, accessors, mutators, and lifecycle hooks on
/// already-produced values). The table is built once and shared read-only
/// for the lifetime of a run.
#[derive(Default)]
pub struct CapabilityRegistry {
    by_name: IndexMap<String, Arc<TypeCapabilities>>,
    by_type: HashMap<TypeId, Arc<TypeCapabilities>>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("types", &self.by_name.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CapabilityRegistry {
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::default()
    }

    /// Capabilities registered under a declared type name.
    pub fn type_named(&self, type_name: &str) -> Option<Arc<TypeCapabilities>> {
        self.by_name.get(type_name).cloned()
    }

    /// Capabilities of a produced value's runtime type.
    pub fn type_of(&self, value: &Value) -> Option<Arc<TypeCapabilities>> {
        self.by_type.get(&value.value_type_id()).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.by_name.contains_key(type_name)
    }

    /// Declared type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Static factory `operation` of the type declared as `type_name`, needed by `node`.
    pub fn static_factory(&self, node: NodeId, type_name: &str, operation: &str) -> Result<Arc<StaticFactory>, EngineError> {
        self.type_named(type_name)
            .and_then(|capabilities| capabilities.static_factory(operation).cloned())
            .ok_or_else(|| {
                EngineError::missing(
                    node,
                    Capability::StaticFactory {
                        type_name: type_name.to_string(),
                        operation: operation.to_string(),
                    },
                )
            })
    }

    /// Instance factory `operation` on the runtime type of `receiver`, needed by `node`.
    pub fn instance_factory(&self, node: NodeId, receiver: &Value, operation: &str) -> Result<Arc<InstanceFactory>, EngineError> {
        self.type_of(receiver)
            .and_then(|capabilities| capabilities.instance_factory(operation).cloned())
            .ok_or_else(|| {
                EngineError::missing(
                    node,
                    Capability::InstanceFactory {
                        type_name: self.type_label(receiver),
                        operation: operation.to_string(),
                    },
                )
            })
    }

    /// Accessor `slot` on the value produced at `node`.
    pub fn output(&self, node: NodeId, value: &Value, slot: &str) -> Result<Arc<Output>, EngineError> {
        self.type_of(value)
            .and_then(|capabilities| capabilities.output(slot).cloned())
            .ok_or_else(|| {
                EngineError::missing(
                    node,
                    Capability::Output {
                        type_name: self.type_label(value),
                        slot: slot.to_string(),
                    },
                )
            })
    }

    /// Mutator `slot` on the value produced at `node`.
    pub fn input(&self, node: NodeId, value: &Value, slot: &str) -> Result<Arc<Input>, EngineError> {
        self.type_of(value)
            .and_then(|capabilities| capabilities.input(slot).cloned())
            .ok_or_else(|| {
                EngineError::missing(
                    node,
                    Capability::Input {
                        type_name: self.type_label(value),
                        slot: slot.to_string(),
                    },
                )
            })
    }

    /// Single-string factory used to build constants of kind `type_name`.
    pub fn literal_factory(&self, node: NodeId, type_name: &str) -> Result<Arc<StaticFactory>, EngineError> {
        self.type_named(type_name)
            .and_then(|capabilities| capabilities.literal_factory().cloned())
            .ok_or_else(|| {
                EngineError::missing(
                    node,
                    Capability::LiteralFactory {
                        type_name: type_name.to_string(),
                    },
                )
            })
    }

    /// Capabilities of `value` when its type has a start or release hook.
    pub fn lifecycle_of(&self, value: &Value) -> Option<Arc<TypeCapabilities>> {
        self.type_of(value)
            .filter(|capabilities| capabilities.is_startable() || capabilities.is_closeable())
    }

    /// Registered name of a value's type, falling back to its Rust type name.
    fn type_label(&self, value: &Value) -> String {
        self.type_of(value)
            .map_or_else(|| value.type_name().to_string(), |capabilities| capabilities.type_name().to_string())
    }
}

/// Accumulates type registrations before freezing them into a [`CapabilityRegistry`].
#[derive(Default)]
pub struct CapabilityRegistryBuilder {
    types: Vec<TypeCapabilities>,
}

impl CapabilityRegistryBuilder {
    pub fn register<T: Any>(mut self, builder: TypeBuilder<T>) -> Self {
        self.types.push(builder.finish());
        self
    }

    pub fn build(self) -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::default();
        for capabilities in self.types {
            let capabilities = Arc::new(capabilities);
            debug!(
                type_name = %capabilities.type_name(),
                rust_type = capabilities.rust_type(),
                "registered producer type"
            );

            let type_id = capabilities.value_type_id();
            if let Some(previous) = registry.by_type.insert(type_id, Arc::clone(&capabilities)) {
                warn!(
                    previous = %previous.type_name(),
                    current = %capabilities.type_name(),
                    rust_type = capabilities.rust_type(),
                    "rust type registered under several names; runtime lookups use the last one"
                );
            }
            if registry
                .by_name
                .insert(capabilities.type_name().to_string(), capabilities)
                .is_some()
            {
                warn!("type name registered twice; keeping the last registration");
            }
        }
        registry
    }
}
