//! Capability registry: what the engine can do with each producer type.
//!
//! Modules:
//! - `table`: per-type tables of factories, accessors, mutators, and lifecycle hooks
//! - `builder`: typed registration of those tables
//! - `registry`: the frozen, shared lookup table

mod builder;
mod registry;
mod table;

pub use builder::TypeBuilder;
pub use registry::{CapabilityRegistry, CapabilityRegistryBuilder};
pub use table::{InstanceFactory, Input, Output, StaticFactory, TypeCapabilities};
