// zjs Runtime Values
// Functions, classes, instances and namespaces are shared through Rc;
// member tables use RefCell since mixins extend classes after definition

use crate::error::ZjsResult;
use crate::vm::meta::MetaSlot;
use crate::vm::runtime::Runtime;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Argument storage; most calls pass a handful of values
pub type ArgVec = SmallVec<[Value; 4]>;

/// Native function body: (runtime, this, arguments) -> result
pub type NativeBody = dyn Fn(&Runtime, &Value, &Rc<Arguments>) -> ZjsResult<Value>;

/// Identity of anything that can carry metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        EntityId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Object(Rc<Instance>),
    Namespace(Rc<Namespace>),
    /// Call-site arguments object, carries the executing function
    Arguments(Rc<Arguments>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "Undefined",
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Function(_) => "Function",
            Value::Class(_) => "Class",
            Value::Object(_) => "Object",
            Value::Namespace(_) => "Namespace",
            Value::Arguments(_) => "Arguments",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Rc<Class>> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Rc<Namespace>> {
        match self {
            Value::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn array(values: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(values)))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Rc::ptr_eq(a, b),
            (Value::Arguments(a), Value::Arguments(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Array(arr) => {
                let items: Vec<String> = arr.borrow().iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Function(func) => write!(f, "<fn #{}>", func.id),
            Value::Class(class) => write!(f, "<class #{}>", class.id),
            Value::Object(inst) => write!(f, "<object of class #{}>", inst.class.id),
            Value::Namespace(ns) => write!(f, "<namespace {}>", ns.declared_name),
            Value::Arguments(args) => write!(f, "<arguments of fn #{}>", args.callee.id),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(Rc::new(f))
    }
}

impl From<Rc<Function>> for Value {
    fn from(f: Rc<Function>) -> Self {
        Value::Function(f)
    }
}

impl From<Rc<Class>> for Value {
    fn from(c: Rc<Class>) -> Self {
        Value::Class(c)
    }
}

impl From<Rc<Namespace>> for Value {
    fn from(ns: Rc<Namespace>) -> Self {
        Value::Namespace(ns)
    }
}

/// Function object wrapping a native closure
pub struct Function {
    pub id: EntityId,
    pub declared_name: Option<String>,
    /// Explicit mixin priority annotation
    pub priority: i32,
    pub(crate) meta: MetaSlot,
    body: Box<NativeBody>,
}

impl Function {
    pub fn native<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Runtime, &Value, &Rc<Arguments>) -> ZjsResult<Value> + 'static,
    {
        Self {
            id: EntityId::fresh(),
            declared_name: Some(name.into()),
            priority: 0,
            meta: MetaSlot::default(),
            body: Box::new(body),
        }
    }

    pub fn anonymous<F>(body: F) -> Self
    where
        F: Fn(&Runtime, &Value, &Rc<Arguments>) -> ZjsResult<Value> + 'static,
    {
        Self {
            id: EntityId::fresh(),
            declared_name: None,
            priority: 0,
            meta: MetaSlot::default(),
            body: Box::new(body),
        }
    }

    /// Priority annotation used when the function joins a tagged mixin chain
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub(crate) fn run(
        &self,
        rt: &Runtime,
        this: &Value,
        args: &Rc<Arguments>,
    ) -> ZjsResult<Value> {
        (self.body)(rt, this, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("id", &self.id)
            .field("declared_name", &self.declared_name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Arguments object built for every invocation
pub struct Arguments {
    pub callee: Rc<Function>,
    pub values: ArgVec,
}

impl Arguments {
    pub fn new(callee: Rc<Function>, values: &[Value]) -> Self {
        Self {
            callee,
            values: values.iter().cloned().collect(),
        }
    }

    /// Argument at `index`, `Undefined` when absent
    pub fn get(&self, index: usize) -> Value {
        self.values.get(index).cloned().unwrap_or(Value::Undefined)
    }

    pub fn number(&self, index: usize) -> f64 {
        self.get(index).as_number().unwrap_or(f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

/// Class object
pub struct Class {
    pub id: EntityId,
    pub superclass: Option<Rc<Class>>,
    /// Instance-scope members (the instance template)
    pub prototype: RefCell<FxHashMap<String, Value>>,
    /// Class-scope members
    pub statics: RefCell<FxHashMap<String, Value>>,
    pub(crate) meta: MetaSlot,
}

impl Class {
    pub fn new(superclass: Option<Rc<Class>>) -> Self {
        Self {
            id: EntityId::fresh(),
            superclass,
            prototype: RefCell::new(FxHashMap::default()),
            statics: RefCell::new(FxHashMap::default()),
            meta: MetaSlot::default(),
        }
    }

    pub fn table(&self, is_static: bool) -> &RefCell<FxHashMap<String, Value>> {
        if is_static {
            &self.statics
        } else {
            &self.prototype
        }
    }

    /// Ancestors, nearest first, excluding self
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.superclass.clone(),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("superclass", &self.superclass.as_ref().map(|s| s.id))
            .finish()
    }
}

pub struct Ancestors {
    next: Option<Rc<Class>>,
}

impl Iterator for Ancestors {
    type Item = Rc<Class>;

    fn next(&mut self) -> Option<Rc<Class>> {
        let current = self.next.take()?;
        self.next = current.superclass.clone();
        Some(current)
    }
}

/// Instance object
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<FxHashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.borrow_mut().insert(name.into(), value.into());
    }
}

/// Namespace node
pub struct Namespace {
    pub id: EntityId,
    pub declared_name: String,
    pub members: RefCell<FxHashMap<String, Value>>,
    pub(crate) meta: MetaSlot,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::fresh(),
            declared_name: name.into(),
            members: RefCell::new(FxHashMap::default()),
            meta: MetaSlot::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.members.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.borrow().contains_key(name)
    }

    /// Member names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.members.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("id", &self.id)
            .field("name", &self.declared_name)
            .finish()
    }
}

/// Member scope marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Instance,
    Static,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub scope: Scope,
    pub value: Value,
}

impl Member {
    pub fn is_static(&self) -> bool {
        self.scope == Scope::Static
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Member {
            scope: Scope::Instance,
            value,
        }
    }
}

/// Static annotation: marks a member as class-scoped
pub fn stat(value: impl Into<Value>) -> Member {
    Member {
        scope: Scope::Static,
        value: value.into(),
    }
}

/// Ordered member bundle for class bodies and mixins
#[derive(Debug, Clone, Default)]
pub struct Members {
    entries: Vec<(String, Member)>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn member(mut self, name: impl Into<String>, member: Member) -> Self {
        self.entries.push((name.into(), member));
        self
    }

    /// Instance-scope member
    pub fn value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(name, Member::from(value.into()))
    }

    pub fn static_value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(name, stat(value))
    }

    pub fn method(self, name: impl Into<String>, func: Function) -> Self {
        self.value(name, func)
    }

    pub fn static_method(self, name: impl Into<String>, func: Function) -> Self {
        self.member(name, stat(func))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Members {
    type Item = (String, Member);
    type IntoIter = std::vec::IntoIter<(String, Member)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
