//! Type-erased runtime values and factory arguments.
//!
//! Every produced value lives in a shared [`Value`] cell. Values are compared
//! by identity: two structurally equal values built by different nodes are
//! distinct. Factories, accessors, and mutators receive their inputs as
//! [`Arg`]s and extract typed data with the helpers on [`Args`].

use std::{
    any::{Any, TypeId, type_name},
    cell::RefCell,
    fmt,
    rc::Rc,
};

use anyhow::{Result, anyhow, bail};

/// A produced value shared between the resolver, links, and the lifecycle coordinator.
#[derive(Clone)]
pub struct Value {
    cell: Rc<RefCell<dyn Any>>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Runtime type of the wrapped value.
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the wrapped value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Runs `read` against the wrapped value when it is a `T` and not mutably borrowed.
    pub fn with_ref<T: Any, R>(&self, read: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.cell.try_borrow().ok()?;
        guard.downcast_ref::<T>().map(read)
    }

    /// Runs `write` against the wrapped value when it is a `T` and not otherwise borrowed.
    pub fn with_mut<T: Any, R>(&self, write: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.cell.try_borrow_mut().ok()?;
        guard.downcast_mut::<T>().map(write)
    }

    /// Clones the wrapped value out when it is a `T`.
    pub fn cloned<T: Any + Clone>(&self) -> Option<T> {
        self.with_ref(T::clone)
    }

    /// Like [`Value::cloned`], reporting a mismatch as an error.
    pub fn extract<T: Any + Clone>(&self) -> Result<T> {
        self.cloned().ok_or_else(|| type_mismatch::<T>(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.type_name).finish()
    }
}

pub(crate) fn type_mismatch<T: Any>(found: &Value) -> anyhow::Error {
    anyhow!(
        "expected a value of type {}, found {} (or the value is in use)",
        type_name::<T>(),
        found.type_name()
    )
}

/// Structural shape of a parameter, used to pick zero values for unbound slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Int,
    Long,
    Short,
    Byte,
    Float,
    Double,
    Bool,
    Char,
    Str,
    Object,
}

impl Shape {
    /// Value substituted when no link feeds a single-valued parameter.
    pub fn zero_value(self) -> Option<Value> {
        match self {
            Shape::Int => Some(Value::new(0i32)),
            Shape::Long => Some(Value::new(0i64)),
            Shape::Short => Some(Value::new(0i16)),
            Shape::Byte => Some(Value::new(0i8)),
            Shape::Float => Some(Value::new(0f32)),
            Shape::Double => Some(Value::new(0f64)),
            Shape::Bool => Some(Value::new(false)),
            Shape::Char => Some(Value::new('\0')),
            Shape::Str | Shape::Object => None,
        }
    }
}

/// A declared factory or mutator parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub shape: Shape,
    /// Variable-length parameters collect every bound link into a list.
    pub variadic: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            variadic: false,
        }
    }

    pub fn variadic(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            variadic: true,
            ..Self::new(name, shape)
        }
    }

    /// Argument used when no link is bound to this parameter.
    pub fn zero_argument(&self) -> Arg {
        if self.variadic {
            return Arg::List(Vec::new());
        }
        self.shape.zero_value().map_or(Arg::Absent, Arg::Single)
    }
}

/// A bound argument.
#[derive(Debug, Clone)]
pub enum Arg {
    Absent,
    Single(Value),
    List(Vec<Value>),
}

impl Arg {
    pub fn is_absent(&self) -> bool {
        matches!(self, Arg::Absent)
    }

    pub fn single<T: Any + Clone>(&self) -> Result<T> {
        match self {
            Arg::Single(value) => value.extract(),
            Arg::Absent => bail!("argument is absent"),
            Arg::List(_) => bail!("expected a single value, found a list"),
        }
    }

    pub fn optional<T: Any + Clone>(&self) -> Result<Option<T>> {
        match self {
            Arg::Absent => Ok(None),
            other => other.single().map(Some),
        }
    }

    pub fn list<T: Any + Clone>(&self) -> Result<Vec<T>> {
        match self {
            Arg::List(values) => values.iter().map(Value::extract).collect(),
            Arg::Single(_) => bail!("expected a list, found a single value"),
            Arg::Absent => Ok(Vec::new()),
        }
    }
}

/// Ordered arguments for one factory invocation.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<Arg>,
}

impl Args {
    pub fn new(values: Vec<Arg>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.values.iter()
    }

    pub fn arg(&self, index: usize) -> Result<&Arg> {
        self.values
            .get(index)
            .ok_or_else(|| anyhow!("argument {index} is out of range ({} supplied)", self.values.len()))
    }

    /// Typed single value at `index`.
    pub fn get<T: Any + Clone>(&self, index: usize) -> Result<T> {
        self.arg(index)?.single().map_err(|error| error.context(format!("argument {index}")))
    }

    /// Typed single value at `index`, `None` when nothing was bound.
    pub fn optional<T: Any + Clone>(&self, index: usize) -> Result<Option<T>> {
        self.arg(index)?.optional().map_err(|error| error.context(format!("argument {index}")))
    }

    /// Typed list at `index` (variable-length parameters).
    pub fn list<T: Any + Clone>(&self, index: usize) -> Result<Vec<T>> {
        self.arg(index)?.list().map_err(|error| error.context(format!("argument {index}")))
    }

    /// The shared value at `index` without cloning its contents.
    pub fn value(&self, index: usize) -> Result<Value> {
        match self.arg(index)? {
            Arg::Single(value) => Ok(value.clone()),
            Arg::Absent => bail!("argument {index} is absent"),
            Arg::List(_) => bail!("argument {index} is a list"),
        }
    }
}

impl From<Vec<Arg>> for Args {
    fn from(values: Vec<Arg>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_compare_by_identity() {
        let first = Value::new(7i32);
        let second = Value::new(7i32);
        assert!(first.ptr_eq(&first.clone()));
        assert!(!first.ptr_eq(&second));
    }

    #[test]
    fn extract_reports_type_mismatch() {
        let value = Value::new("text".to_string());
        let error = value.extract::<i32>().expect_err("mismatch");
        assert!(error.to_string().contains("expected a value of type i32"), "{error}");
    }

    #[test]
    fn with_mut_updates_in_place() {
        let value = Value::new(vec![1u8]);
        value.with_mut(|items: &mut Vec<u8>| items.push(2)).expect("vec");
        assert_eq!(value.cloned::<Vec<u8>>(), Some(vec![1, 2]));
    }

    #[test]
    fn zero_arguments_follow_shape() {
        assert_eq!(Param::new("n", Shape::Long).zero_argument().single::<i64>().unwrap(), 0);
        assert!(!Param::new("flag", Shape::Bool).zero_argument().single::<bool>().unwrap());
        assert!(Param::new("name", Shape::Str).zero_argument().is_absent());
        assert!(matches!(Param::variadic("items", Shape::Int).zero_argument(), Arg::List(items) if items.is_empty()));
    }

    #[test]
    fn args_helpers_extract_typed_values() {
        let args = Args::new(vec![
            Arg::Single(Value::new(3i32)),
            Arg::Absent,
            Arg::List(vec![Value::new(1i64), Value::new(2i64)]),
        ]);

        assert_eq!(args.get::<i32>(0).unwrap(), 3);
        assert_eq!(args.optional::<String>(1).unwrap(), None);
        assert_eq!(args.list::<i64>(2).unwrap(), vec![1, 2]);
        assert!(args.get::<i32>(5).is_err());
    }
}
