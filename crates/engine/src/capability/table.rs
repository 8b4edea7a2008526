//! Per-type capability tables.

use std::{any::TypeId, fmt, sync::Arc};

use anyhow::Result;
use indexmap::IndexMap;

use crate::value::{Arg, Args, Param, Shape, Value};

pub(crate) type StaticInvoker = Box<dyn Fn(&Args) -> Result<Value> + Send + Sync>;
pub(crate) type InstanceInvoker = Box<dyn Fn(&Value, &Args) -> Result<Value> + Send + Sync>;
pub(crate) type Accessor = Box<dyn Fn(&Value) -> Result<Value> + Send + Sync>;
pub(crate) type Mutator = Box<dyn Fn(&Value, Arg) -> Result<()> + Send + Sync>;
pub(crate) type Hook = Box<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// A static factory operation: constructs a value from arguments alone.
pub struct StaticFactory {
    name: String,
    params: Vec<Param>,
    invoke: StaticInvoker,
}

impl StaticFactory {
    pub(crate) fn new(name: String, params: Vec<Param>, invoke: StaticInvoker) -> Self {
        Self { name, params, invoke }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn invoke(&self, args: &Args) -> Result<Value> {
        (self.invoke)(args)
    }

    /// True when the sole parameter is a string, making this usable for literals.
    pub fn accepts_literal(&self) -> bool {
        matches!(self.params.as_slice(), [param] if param.shape == Shape::Str && !param.variadic)
    }
}

impl fmt::Debug for StaticFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticFactory")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// An instance factory operation: constructs a value from a resolved receiver.
pub struct InstanceFactory {
    name: String,
    params: Vec<Param>,
    invoke: InstanceInvoker,
}

impl InstanceFactory {
    pub(crate) fn new(name: String, params: Vec<Param>, invoke: InstanceInvoker) -> Self {
        Self { name, params, invoke }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn invoke(&self, receiver: &Value, args: &Args) -> Result<Value> {
        (self.invoke)(receiver, args)
    }
}

impl fmt::Debug for InstanceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceFactory")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A zero-argument accessor exposing part of a produced value.
pub struct Output {
    name: String,
    read: Accessor,
}

impl Output {
    pub(crate) fn new(name: String, read: Accessor) -> Self {
        Self { name, read }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self, value: &Value) -> Result<Value> {
        (self.read)(value)
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A single-argument mutator invoked during post-construction wiring.
pub struct Input {
    param: Param,
    apply: Mutator,
}

impl Input {
    pub(crate) fn new(param: Param, apply: Mutator) -> Self {
        Self { param, apply }
    }

    pub fn param(&self) -> &Param {
        &self.param
    }

    pub fn apply(&self, target: &Value, argument: Arg) -> Result<()> {
        (self.apply)(target, argument)
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input").field("param", &self.param).finish_non_exhaustive()
    }
}

/// Everything the engine can do with values of one concrete type.
pub struct TypeCapabilities {
    pub(crate) type_name: String,
    pub(crate) type_id: TypeId,
    pub(crate) rust_type: &'static str,
    pub(crate) static_factories: IndexMap<String, Arc<StaticFactory>>,
    pub(crate) instance_factories: IndexMap<String, Arc<InstanceFactory>>,
    pub(crate) outputs: IndexMap<String, Arc<Output>>,
    pub(crate) inputs: IndexMap<String, Arc<Input>>,
    pub(crate) start: Option<Hook>,
    pub(crate) close: Option<Hook>,
}

impl TypeCapabilities {
    /// Name the type is registered under (e.g. `demo.Counter`).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Runtime type of the values this table describes.
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    /// Underlying Rust type name.
    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    pub fn static_factory(&self, operation: &str) -> Option<&Arc<StaticFactory>> {
        self.static_factories.get(operation)
    }

    pub fn instance_factory(&self, operation: &str) -> Option<&Arc<InstanceFactory>> {
        self.instance_factories.get(operation)
    }

    /// First static factory taking exactly one string.
    pub fn literal_factory(&self) -> Option<&Arc<StaticFactory>> {
        self.static_factories.values().find(|factory| factory.accepts_literal())
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn output(&self, slot: &str) -> Option<&Arc<Output>> {
        self.outputs.get(slot)
    }

    pub fn input(&self, slot: &str) -> Option<&Arc<Input>> {
        self.inputs.get(slot)
    }

    pub fn is_startable(&self) -> bool {
        self.start.is_some()
    }

    pub fn is_closeable(&self) -> bool {
        self.close.is_some()
    }

    /// Runs the begin-execution hook; a no-op for non-startable types.
    pub fn start(&self, value: &Value) -> Result<()> {
        self.start.as_ref().map_or(Ok(()), |hook| hook(value))
    }

    /// Runs the release hook; a no-op for non-closeable types.
    pub fn close(&self, value: &Value) -> Result<()> {
        self.close.as_ref().map_or(Ok(()), |hook| hook(value))
    }
}

impl fmt::Debug for TypeCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCapabilities")
            .field("type_name", &self.type_name)
            .field("rust_type", &self.rust_type)
            .field("static_factories", &self.static_factories.keys().collect::<Vec<_>>())
            .field("instance_factories", &self.instance_factories.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("startable", &self.is_startable())
            .field("closeable", &self.is_closeable())
            .finish()
    }
}
