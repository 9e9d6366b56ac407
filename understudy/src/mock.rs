// vim: tw=80
//! Mock objects and their methods

use std::{
    collections::BTreeMap,
    fmt,
    ops::Index,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    context::{default_context, Context},
    error::UnexpectedCall,
    expectation::Expectation,
    matcher::{Arg, Pattern},
    value::{Args, ToValue, Value},
    Error,
};

static NEXT_MOCK: AtomicU64 = AtomicU64::new(1);

/// Identifies one mock object.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MockId(u64);

impl MockId {
    fn next() -> Self {
        MockId(NEXT_MOCK.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identifies one method slot of one mock.
#[derive(Clone, Debug)]
pub struct MethodId {
    mock: MockId,
    class: Rc<str>,
    name: Rc<str>,
}

impl MethodId {
    pub fn mock(&self) -> MockId {
        self.mock
    }

    /// Name of the mocked class.
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for MethodId {
    fn eq(&self, other: &Self) -> bool {
        self.mock == other.mock && self.name == other.name
    }
}

impl Eq for MethodId {}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} #{}.{}", self.class, self.mock, self.name)
    }
}

/// An attempted call, as reported when nothing expected it.
#[derive(Clone, Debug)]
pub struct Call {
    pub method: MethodId,
    pub args: Args,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.method, self.args)
    }
}

/// The signature of one method of a [`Class`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<String>,
}

/// An explicit description of the interface being mocked.
///
/// ```
/// # use understudy::*;
/// let class = Class::new("Store", "app::db")
///     .method("get", &["key"])
///     .method("put", &["key", "value"]);
/// assert_eq!("app::db::Store", class.qualified_name());
/// assert_eq!(["key", "value"], class.find("put").unwrap().params[..]);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Class {
    name: String,
    module: String,
    methods: Vec<MethodSig>,
}

impl Class {
    pub fn new<N, M>(name: N, module: M) -> Self
        where N: Into<String>, M: Into<String>
    {
        Class { name: name.into(), module: module.into(), methods: Vec::new() }
    }

    /// Declare a method.  Redeclaring a name replaces its signature.
    pub fn method<N: Into<String>>(mut self, name: N, params: &[&str]) -> Self
    {
        let sig = MethodSig {
            name: name.into(),
            params: params.iter().map(|p| (*p).to_owned()).collect(),
        };
        match self.methods.iter_mut().find(|m| m.name == sig.name) {
            Some(m) => *m = sig,
            None => self.methods.push(sig),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn methods(&self) -> &[MethodSig] {
        &self.methods
    }

    pub fn find(&self, name: &str) -> Option<&MethodSig> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn qualified_name(&self) -> String {
        if self.module.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.module, self.name)
        }
    }
}

/// Mock every declared method whose name does not contain `__`.
pub fn default_method_selector(class: &Class, name: &str) -> bool {
    class.find(name).is_some() && !name.contains("__")
}

/// The stand-in for one method of a [`Mock`].
///
/// A `MockMethod` holds no expectations of its own; they live in its
/// [`Context`].
#[derive(Clone, Debug)]
pub struct MockMethod {
    id: MethodId,
    context: Context,
}

impl MockMethod {
    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn id(&self) -> &MethodId {
        &self.id
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Expect a call matching `pattern`.
    ///
    /// `pattern` may be a [`Pattern`], literal [`Args`], `()` for a call with
    /// no arguments, or a whole-list [`Matcher`](crate::Matcher).
    pub fn expect<P: Into<Pattern>>(&self, pattern: P) -> Expectation {
        self.context.register(self.id.clone(), pattern.into())
    }

    /// Call the method.
    ///
    /// The first active expectation that matches is satisfied and produces
    /// the result.  If none matches, fails with [`Error::UnexpectedCall`].
    pub fn call<A: Into<Args>>(&self, args: A) -> Result<Value, Error> {
        let args = args.into();
        match self.context.find_active(&self.id, &args) {
            Some(id) => Expectation::new(self.context.clone(), id)
                .satisfy(&args),
            None => {
                let active = self.context.active_infos();
                let call = Call { method: self.id.clone(), args };
                debug!(target: "understudy::mock", %call,
                    active = active.len(), "unexpected call");
                Err(UnexpectedCall { call, active }.into())
            }
        }
    }
}

struct MockInner {
    id: MockId,
    class: Class,
    context: Context,
    methods: BTreeMap<String, MockMethod>,
    attrs: BTreeMap<String, Value>,
}

/// A mock object: one [`MockMethod`] per selected method of a [`Class`],
/// plus any extra attributes.
///
/// Mocks are cheap handles compared by identity, and can be passed to other
/// mocks as arguments.
///
/// ```
/// # use understudy::*;
/// let ctx = Context::new();
/// let class = Class::new("Thing", "demo").method("bar", &["x"]);
/// let mock = Mock::builder(class)
///     .context(&ctx)
///     .attr("name", "thing one")
///     .build();
/// mock["bar"].expect(args![1]).returns("one").unwrap();
/// assert_eq!(Value::from("one"), mock.call("bar", args![1]).unwrap());
/// assert_eq!(Some(&Value::from("thing one")), mock.attr("name"));
/// ```
#[derive(Clone)]
pub struct Mock {
    inner: Rc<MockInner>,
}

impl Mock {
    /// Mock `class` in the [default context](crate::default_context).
    pub fn new(class: Class) -> Self {
        Self::builder(class).build()
    }

    pub fn builder(class: Class) -> MockBuilder {
        MockBuilder {
            class,
            context: None,
            selector: Box::new(default_method_selector),
            attrs: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> MockId {
        self.inner.id
    }

    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    pub fn method(&self, name: &str) -> Option<&MockMethod> {
        self.inner.methods.get(name)
    }

    /// The mocked methods, by name.
    pub fn methods(&self) -> impl Iterator<Item=&MockMethod> {
        self.inner.methods.values()
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.inner.attrs.get(name)
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.inner.attrs
    }

    fn lookup(&self, name: &str) -> Result<&MockMethod, Error> {
        self.method(name).ok_or_else(|| Error::NoSuchMethod {
            class: self.inner.class.name().to_owned(),
            name: name.to_owned(),
        })
    }

    /// Call the method named `name`.
    pub fn call<A: Into<Args>>(&self, name: &str, args: A)
        -> Result<Value, Error>
    {
        self.lookup(name)?.call(args)
    }

    /// Expect a call of the method named `name`.
    pub fn expect<P: Into<Pattern>>(&self, name: &str, pattern: P)
        -> Result<Expectation, Error>
    {
        Ok(self.lookup(name)?.expect(pattern))
    }
}

impl Index<&str> for Mock {
    type Output = MockMethod;

    /// # Panics
    ///
    /// Panics if `name` is not a mocked method.
    fn index(&self, name: &str) -> &MockMethod {
        match self.lookup(name) {
            Ok(m) => m,
            Err(e) => panic!("{e}")
        }
    }
}

impl PartialEq for Mock {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Mock")
            .field("class", &self.inner.class.name)
            .field("id", &self.inner.id)
            .finish()
    }
}

impl ToValue for Mock {
    fn to_value(&self) -> Value {
        Value::object(self.clone())
    }
}

impl From<Mock> for Value {
    fn from(mock: Mock) -> Self {
        Value::object(mock)
    }
}

impl From<&Mock> for Value {
    fn from(mock: &Mock) -> Self {
        Value::object(mock.clone())
    }
}

impl From<&Mock> for Arg {
    fn from(mock: &Mock) -> Self {
        Arg::Value(mock.into())
    }
}

/// Configures the construction of a [`Mock`].
pub struct MockBuilder {
    class: Class,
    context: Option<Context>,
    selector: Box<dyn Fn(&Class, &str) -> bool>,
    attrs: BTreeMap<String, Value>,
}

impl MockBuilder {
    /// Register expectations in `context` instead of the default one.
    pub fn context(mut self, context: &Context) -> Self {
        self.context = Some(context.clone());
        self
    }

    /// Choose which declared methods get mocked.
    pub fn selector<F>(mut self, f: F) -> Self
        where F: Fn(&Class, &str) -> bool + 'static
    {
        self.selector = Box::new(f);
        self
    }

    /// Attach an extra attribute, readable with [`Mock::attr`].
    pub fn attr<N, V>(mut self, name: N, value: V) -> Self
        where N: Into<String>, V: Into<Value>
    {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Mock {
        let MockBuilder { class, context, selector, attrs } = self;
        let id = MockId::next();
        let context = context.unwrap_or_else(default_context);
        let class_name: Rc<str> = Rc::from(class.name());
        let methods = class.methods()
            .iter()
            .filter(|sig| selector(&class, &sig.name))
            .map(|sig| {
                let method = MockMethod {
                    id: MethodId {
                        mock: id,
                        class: class_name.clone(),
                        name: Rc::from(sig.name.as_str()),
                    },
                    context: context.clone(),
                };
                (sig.name.clone(), method)
            })
            .collect::<BTreeMap<_, _>>();
        debug!(target: "understudy::mock", class = %class.qualified_name(),
            %id, methods = methods.len(), "built mock");
        Mock {
            inner: Rc::new(MockInner { id, class, context, methods, attrs })
        }
    }
}

impl fmt::Debug for MockBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MockBuilder")
            .field("class", &self.class)
            .field("context", &self.context)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod t {
    use super::*;

    fn thing() -> Class {
        Class::new("Thing", "t")
            .method("foo", &[])
            .method("bar", &["x"])
            .method("__eq__", &["other"])
    }

    #[test]
    fn default_selector_skips_dunder() {
        let class = thing();
        assert!(default_method_selector(&class, "foo"));
        assert!(!default_method_selector(&class, "__eq__"));
        assert!(!default_method_selector(&class, "nonexistent"));
    }

    #[test]
    fn redeclare_replaces() {
        let class = Class::new("T", "").method("a", &["x"]).method("a", &[]);
        assert_eq!(1, class.methods().len());
        assert!(class.find("a").unwrap().params.is_empty());
        assert_eq!("T", class.qualified_name());
    }

    #[test]
    fn method_identity() {
        let ctx = Context::new();
        let a = Mock::builder(thing()).context(&ctx).build();
        let b = Mock::builder(thing()).context(&ctx).build();
        assert_eq!(a["foo"].id(), a.clone()["foo"].id());
        assert_ne!(a["foo"].id(), b["foo"].id());
        assert_ne!(a["foo"].id(), a["bar"].id());
        assert_ne!(a, b);
    }

    #[test]
    fn method_display() {
        let ctx = Context::new();
        let m = Mock::builder(thing()).context(&ctx).build();
        let call = Call { method: m["bar"].id().clone(), args: args![1] };
        assert_eq!(format!("Thing #{}.bar(1)", m.id()), call.to_string());
    }

    #[test]
    fn mock_as_value() {
        let ctx = Context::new();
        let a = Mock::builder(thing()).context(&ctx).build();
        let v = a.to_value();
        assert_eq!(Some(&a), v.downcast_ref::<Mock>());
        assert_eq!(v, Value::from(a.clone()));
    }
}
