// vim: tw=80
//! Dynamic argument and return values
//!
//! A [`Context`](crate::Context) matches calls across every method of every
//! mock it owns, so arguments travel through the engine as [`Value`]s rather
//! than as each method's native types.  [`ToValue`] and [`FromValue`] convert
//! at the edges.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt,
    rc::Rc,
};

use downcast::{downcast, Any};

use crate::Error;

/// Keyword arguments of a call, ordered by name.
pub type Kwargs = BTreeMap<String, Value>;

/// Any user type that can travel inside a [`Value::Object`].
///
/// Implemented for every `'static` type with `PartialEq` and `Debug`.
pub trait AnyValue: Any + fmt::Debug {
    /// Compare with another object, which may be of a different type.
    fn eq_value(&self, other: &dyn AnyValue) -> bool;
}

downcast!(dyn AnyValue);

impl<T: PartialEq + fmt::Debug + 'static> AnyValue for T {
    fn eq_value(&self, other: &dyn AnyValue) -> bool {
        other.downcast_ref::<T>().map_or(false, |o| self == o)
    }
}

/// An opaque, shared user value.
#[derive(Clone)]
pub struct Object(Rc<dyn AnyValue>);

impl Object {
    pub fn new<T: PartialEq + fmt::Debug + 'static>(t: T) -> Self {
        Object(Rc::new(t))
    }

    /// Recover the original value, if it is a `T`.
    pub fn downcast_ref<T: AnyValue>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>().ok()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Object) -> bool {
        self.0.eq_value(&*other.0)
    }
}

/// A single argument or return value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// The absence of a value.  Mocked methods return this unless told
    /// otherwise.
    #[default]
    None,
    Bool(bool),
    /// Every Rust integer type fits without loss.
    Int(i128),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(Object),
}

impl Value {
    /// Wrap an arbitrary user value.
    pub fn object<T: PartialEq + fmt::Debug + 'static>(t: T) -> Self {
        Value::Object(Object::new(t))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as an `i64`, if it is an integer in range.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => i64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Recover a value stored with [`Value::object`].
    pub fn downcast_ref<T: AnyValue>(&self) -> Option<&T> {
        match self {
            Value::Object(o) => o.downcast_ref(),
            _ => None,
        }
    }

    /// Add two values the way a running sum accumulates them.
    ///
    /// Numbers add, strings and lists concatenate.  Returns `None` when the
    /// operands have no sum, including on integer overflow.
    pub fn checked_add(&self, rhs: &Value) -> Option<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int),
            (Value::Int(a), Value::Float(b)) =>
                Some(Value::Float(*a as f64 + b)),
            (Value::Float(a), Value::Int(b)) =>
                Some(Value::Float(a + *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a + b)),
            (Value::Str(a), Value::Str(b)) => Some(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) =>
                Some(Value::List(a.iter().chain(b).cloned().collect())),
            _ => None,
        }
    }
}

/// Compare an integer with a float exactly, without rounding the integer.
fn cmp_int_float(a: i128, b: f64) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    // 2^127; every i128 is below it and at least its negation
    let limit = 2f64.powi(127);
    if b >= limit {
        return Some(Ordering::Less);
    }
    if b < -limit {
        return Some(Ordering::Greater);
    }
    let floor = b.floor();
    match a.cmp(&(floor as i128)) {
        Ordering::Equal if b > floor => Some(Ordering::Less),
        o => Some(o),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b))
                | (Value::Float(b), Value::Int(a)) =>
                cmp_int_float(*a, *b) == Some(Ordering::Equal),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::None, Value::None) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => cmp_int_float(*a, *b),
            (Value::Float(a), Value::Int(b)) =>
                cmp_int_float(*b, *a).map(Ordering::reverse),
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            (Value::List(a), Value::List(b)) => a.partial_cmp(b),
            (Value::Object(a), Value::Object(b)) if a == b =>
                Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(o) => write!(f, "{o:?}"),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ident)*) => {$(
        impl From<$t> for Value {
            fn from(x: $t) -> Self {
                Value::Int(i128::from(x))
            }
        }
    )*}
}
value_from_int!(i8 i16 i32 i64 i128 u8 u16 u32 u64);

// No `From<usize> for i128`, but the cast never truncates
macro_rules! value_from_size {
    ($($t:ident)*) => {$(
        impl From<$t> for Value {
            fn from(x: $t) -> Self {
                Value::Int(x as i128)
            }
        }
    )*}
}
value_from_size!(usize isize);

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Str(c.to_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map_or(Value::None, Into::into)
    }
}

/// Convert a borrowed argument into a [`Value`].
///
/// Used by `#[interface]` mocks, whose methods receive their arguments by
/// value or by reference.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for &mut T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

macro_rules! to_value_copy {
    ($($t:ident)*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::from(*self)
            }
        }
    )*}
}
to_value_copy!(i8 i16 i32 i64 i128 u8 u16 u32 u64 usize isize f32 f64 bool
    char);

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_owned())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl ToValue for () {
    fn to_value(&self) -> Value {
        Value::None
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for Object {
    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::None, ToValue::to_value)
    }
}

/// Convert a [`Value`] back into a native type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, Error>;
}

fn conversion(expected: &'static str, found: Value) -> Error {
    Error::Conversion { expected, found }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, Error> {
        Ok(value)
    }
}

/// Methods returning nothing accept whatever the expectation returns.
impl FromValue for () {
    fn from_value(_: Value) -> Result<Self, Error> {
        Ok(())
    }
}

macro_rules! from_value_int {
    ($($t:ident)*) => {$(
        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, Error> {
                match value {
                    Value::Int(i) => <$t>::try_from(i)
                        .map_err(|_| conversion(stringify!($t), Value::Int(i))),
                    other => Err(conversion(stringify!($t), other))
                }
            }
        }
    )*}
}
from_value_int!(i8 i16 i32 i64 i128 u8 u16 u32 u64 usize isize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, Error> {
        value.as_float().ok_or_else(|| conversion("f64", value))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, Error> {
        value.as_float()
            .map(|x| x as f32)
            .ok_or_else(|| conversion("f32", value))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, Error> {
        value.as_bool().ok_or_else(|| conversion("bool", value))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(conversion("String", other))
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::List(items) =>
                items.into_iter().map(T::from_value).collect(),
            other => Err(conversion("Vec", other))
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some)
        }
    }
}

/// The arity and keyword names of a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    pub arity: usize,
    pub keywords: BTreeSet<String>,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({} positional", self.arity)?;
        if !self.keywords.is_empty() {
            let names = self.keywords.iter()
                .map(String::as_str)
                .collect::<Vec<_>>();
            write!(f, "; keywords: {}", names.join(", "))?;
        }
        f.write_str(")")
    }
}

/// The positional and keyword arguments of one call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keywords: Kwargs,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn push<V: Into<Value>>(&mut self, value: V) {
        self.positional.push(value.into());
    }

    /// Set a keyword argument, replacing any earlier one of the same name.
    pub fn insert<K, V>(&mut self, name: K, value: V)
        where K: Into<String>, V: Into<Value>
    {
        self.keywords.insert(name.into(), value.into());
    }

    pub fn arg<V: Into<Value>>(mut self, value: V) -> Self {
        self.push(value);
        self
    }

    pub fn kwarg<K, V>(mut self, name: K, value: V) -> Self
        where K: Into<String>, V: Into<Value>
    {
        self.insert(name, value);
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &Kwargs {
        &self.keywords
    }

    pub fn get(&self, i: usize) -> Option<&Value> {
        self.positional.get(i)
    }

    pub fn get_kwarg(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    pub fn shape(&self) -> Shape {
        Shape {
            arity: self.positional.len(),
            keywords: self.keywords.keys().cloned().collect(),
        }
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Args::new()
    }
}

impl From<Vec<Value>> for Args {
    fn from(positional: Vec<Value>) -> Self {
        Args { positional, keywords: Kwargs::new() }
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts = self.positional.iter()
            .map(ToString::to_string)
            .chain(self.keywords.iter().map(|(k, v)| format!("{k}={v}")))
            .collect::<Vec<_>>();
        f.write_str(&parts.join(", "))
    }
}
