//! Typed registration of a producer type's capabilities.

use std::{
    any::{Any, TypeId, type_name},
    marker::PhantomData,
    sync::Arc,
};

use anyhow::Result;
use indexmap::IndexMap;
use tracing::warn;

use super::table::{InstanceFactory, Input, Output, StaticFactory, TypeCapabilities};
use crate::value::{Arg, Args, Param, Shape, Value, type_mismatch};

/// Builder collecting the factories, accessors, mutators, and lifecycle hooks of `T`.
///
/// ```rust
/// use blockwire_engine::{Param, Shape, TypeBuilder};
///
/// #[derive(Clone)]
/// struct Counter {
///     count: i32,
/// }
///
/// let counter = TypeBuilder::<Counter>::new("demo.Counter")
///     .factory("of", [Param::new("value", Shape::Int)], |args| Ok(Counter { count: args.get(0)? }))
///     .output("count", |counter: &Counter| counter.count)
///     .input("add", Shape::Int, |counter: &mut Counter, step: i32| {
///         counter.count += step;
///         Ok(())
///     });
/// ```
pub struct TypeBuilder<T> {
    capabilities: TypeCapabilities,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> TypeBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            capabilities: TypeCapabilities {
                type_name: name.into(),
                type_id: TypeId::of::<T>(),
                rust_type: type_name::<T>(),
                static_factories: IndexMap::new(),
                instance_factories: IndexMap::new(),
                outputs: IndexMap::new(),
                inputs: IndexMap::new(),
                start: None,
                close: None,
            },
            _marker: PhantomData,
        }
    }

    /// Registers a static factory. The produced value may be of any type.
    pub fn factory<R, F>(mut self, operation: &str, params: impl IntoIterator<Item = Param>, invoke: F) -> Self
    where
        R: Any,
        F: Fn(&Args) -> Result<R> + Send + Sync + 'static,
    {
        let factory = Arc::new(StaticFactory::new(
            operation.to_string(),
            params.into_iter().collect(),
            Box::new(move |args: &Args| invoke(args).map(Value::new)),
        ));
        if self.capabilities.static_factories.insert(operation.to_string(), factory).is_some() {
            self.warn_replaced("static factory", operation);
        }
        self
    }

    /// Registers an instance factory invoked on a resolved `T`.
    pub fn instance_factory<R, F>(mut self, operation: &str, params: impl IntoIterator<Item = Param>, invoke: F) -> Self
    where
        R: Any,
        F: Fn(&T, &Args) -> Result<R> + Send + Sync + 'static,
    {
        let factory = Arc::new(InstanceFactory::new(
            operation.to_string(),
            params.into_iter().collect(),
            Box::new(move |receiver: &Value, args: &Args| {
                receiver
                    .with_ref(|target: &T| invoke(target, args))
                    .ok_or_else(|| type_mismatch::<T>(receiver))?
                    .map(Value::new)
            }),
        ));
        if self.capabilities.instance_factories.insert(operation.to_string(), factory).is_some() {
            self.warn_replaced("instance factory", operation);
        }
        self
    }

    /// Registers a zero-argument accessor.
    pub fn output<R, F>(mut self, slot: &str, read: F) -> Self
    where
        R: Any,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        let output = Output::new(
            slot.to_string(),
            Box::new(move |value: &Value| {
                value
                    .with_ref(|target: &T| Value::new(read(target)))
                    .ok_or_else(|| type_mismatch::<T>(value))
            }),
        );
        if self.capabilities.outputs.insert(slot.to_string(), Arc::new(output)).is_some() {
            self.warn_replaced("output", slot);
        }
        self
    }

    /// Registers a single-valued mutator.
    pub fn input<A, F>(self, slot: &str, shape: Shape, apply: F) -> Self
    where
        A: Any + Clone,
        F: Fn(&mut T, A) -> Result<()> + Send + Sync + 'static,
    {
        self.insert_input(Param::new(slot, shape), move |target, argument| {
            let value: A = argument.single()?;
            target
                .with_mut(|target: &mut T| apply(target, value))
                .ok_or_else(|| type_mismatch::<T>(target))?
        })
    }

    /// Registers a variable-length mutator receiving every bound source in index order.
    pub fn input_list<A, F>(self, slot: &str, shape: Shape, apply: F) -> Self
    where
        A: Any + Clone,
        F: Fn(&mut T, Vec<A>) -> Result<()> + Send + Sync + 'static,
    {
        self.insert_input(Param::variadic(slot, shape), move |target, argument| {
            let values: Vec<A> = argument.list()?;
            target
                .with_mut(|target: &mut T| apply(target, values))
                .ok_or_else(|| type_mismatch::<T>(target))?
        })
    }

    fn insert_input<F>(mut self, param: Param, apply: F) -> Self
    where
        F: Fn(&Value, Arg) -> Result<()> + Send + Sync + 'static,
    {
        let slot = param.name.clone();
        let input = Arc::new(Input::new(param, Box::new(apply)));
        if self.capabilities.inputs.insert(slot.clone(), input).is_some() {
            self.warn_replaced("input", &slot);
        }
        self
    }

    /// Marks `T` as startable with the given begin-execution operation.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
    {
        self.capabilities.start = Some(Box::new(move |value: &Value| {
            value
                .with_mut(|target: &mut T| hook(target))
                .ok_or_else(|| type_mismatch::<T>(value))?
        }));
        self
    }

    /// Marks `T` as closeable with the given release operation.
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
    {
        self.capabilities.close = Some(Box::new(move |value: &Value| {
            value
                .with_mut(|target: &mut T| hook(target))
                .ok_or_else(|| type_mismatch::<T>(value))?
        }));
        self
    }

    pub(crate) fn finish(self) -> TypeCapabilities {
        self.capabilities
    }

    fn warn_replaced(&self, capability: &str, name: &str) {
        warn!(
            type_name = %self.capabilities.type_name,
            capability,
            name,
            "capability registered twice; keeping the last registration"
        );
    }
}
