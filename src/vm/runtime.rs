// zjs Runtime
// Process-wide object model: owns the namespace root and the panic sink. Constructed once at startup and handed to callers.

use std::rc::Rc;

use crate::builtins;
use crate::builtins::console::{ConsoleSink, Level, Sink};
use crate::config::RuntimeConfig;
use crate::error::{ZjsError, ZjsResult};
use crate::vm::meta::{self, Entity, Meta, MetaPatch};
use crate::vm::value::{Arguments, Function, Namespace, Value};

pub struct Runtime {
    config: RuntimeConfig,
    root: Rc<Namespace>,
    sink: Rc<dyn Sink>,
    /// Fallback target of super calls with nothing to reach
    noop: Rc<Function>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let sink = Rc::new(ConsoleSink::new(config.color));
        Self::with_sink(config, sink)
    }

    pub fn with_sink(config: RuntimeConfig, sink: Rc<dyn Sink>) -> Self {
        let runtime = Self {
            config,
            root: Rc::new(Namespace::new("")),
            sink,
            noop: Rc::new(Function::native("noop", |_, _, _| Ok(Value::Undefined))),
        };

        if runtime.config.builtins {
            if let Err(e) = builtins::install(&runtime) {
                runtime
                    .sink
                    .emit(Level::Warn, &format!("builtins not installed: {}", e));
            }
        }

        runtime
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The global scope every dotted path starts from
    pub fn root(&self) -> &Rc<Namespace> {
        &self.root
    }

    pub fn noop(&self) -> &Rc<Function> {
        &self.noop
    }

    pub fn get_meta<E: Entity + ?Sized>(&self, entity: &E) -> Meta {
        meta::get(entity)
    }

    pub fn add_meta<'a, E: Entity + ?Sized>(&self, entity: &'a E, patch: MetaPatch) -> &'a E {
        meta::add(entity, patch);
        entity
    }

    /// Fully qualified diagnostic name
    pub fn full_name<E: Entity + ?Sized>(&self, entity: &E) -> String {
        let meta = meta::get(entity);
        match &meta.derivation {
            Some(derivation) if meta.binding.is_none() && meta.namespace.is_none() => {
                let targets: Vec<String> = derivation
                    .targets
                    .iter()
                    .map(|target| self.full_name(target.as_ref()))
                    .collect();
                format!("{}({})", derivation.kind.as_str(), targets.join(","))
            }
            _ => meta.fullname,
        }
    }

    /// Local diagnostic name
    pub fn name<E: Entity + ?Sized>(&self, entity: &E) -> String {
        meta::get(entity).name
    }

    /// Fullname of a value that is an entity
    pub fn value_full_name(&self, value: &Value) -> Option<String> {
        match value {
            Value::Function(f) => Some(self.full_name(f.as_ref())),
            Value::Class(c) => Some(self.full_name(c.as_ref())),
            Value::Namespace(ns) => Some(self.full_name(ns.as_ref())),
            _ => None,
        }
    }

    pub fn value_name(&self, value: &Value) -> Option<String> {
        match value {
            Value::Function(f) => Some(self.name(f.as_ref())),
            Value::Class(c) => Some(self.name(c.as_ref())),
            Value::Namespace(ns) => Some(self.name(ns.as_ref())),
            _ => None,
        }
    }

    /// Call `func` with an explicit receiver
    pub fn call(&self, func: &Rc<Function>, this: &Value, args: &[Value]) -> ZjsResult<Value> {
        let arguments = Rc::new(Arguments::new(func.clone(), args));
        func.run(self, this, &arguments).map_err(|mut e| {
            e.push_frame(self.full_name(func.as_ref()));
            e
        })
    }

    pub fn call_value(&self, callee: &Value, this: &Value, args: &[Value]) -> ZjsResult<Value> {
        match callee {
            Value::Function(func) => self.call(func, this, args),
            other => Err(ZjsError::type_error(format!(
                "'{}' is not callable",
                other.type_name()
            ))),
        }
    }

    /// Call member `name` on an object, class or namespace
    pub fn invoke(&self, target: &Value, name: &str, args: &[Value]) -> ZjsResult<Value> {
        let member = match target {
            Value::Object(instance) => instance
                .get(name)
                .or_else(|| instance.class.find_member(name, false)),
            Value::Class(class) => class.find_member(name, true),
            Value::Namespace(ns) => ns.get(name),
            other => {
                return Err(ZjsError::type_error(format!(
                    "cannot invoke '{}' on '{}'",
                    name,
                    other.type_name()
                )))
            }
        };

        match member {
            Some(Value::Function(func)) => self.call(&func, target, args),
            Some(other) => Err(ZjsError::type_error(format!(
                "member '{}' is '{}', not a function",
                name,
                other.type_name()
            ))),
            None => Err(ZjsError::attribute_error(format!(
                "'{}' has no member '{}'",
                self.value_full_name(target)
                    .unwrap_or_else(|| target.type_name().to_string()),
                name
            ))),
        }
    }

    /// The single fatal-error channel; the application decides what fatal means
    pub fn panic(&self, message: &str) {
        self.sink.emit(Level::Panic, message);
    }

    /// Report a load-time error through the panic channel and hand it back
    pub(crate) fn report(&self, err: ZjsError) -> ZjsError {
        self.panic(&err.to_string());
        err
    }

    pub(crate) fn trace(&self, message: impl FnOnce() -> String) {
        if self.config.trace {
            self.sink.emit(Level::Trace, &message());
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::builtins::console::MemorySink;
    use crate::error::ErrorKind;
    use crate::vm::value::Members;

    /// Runtime without builtins, logging into a memory sink
    pub(crate) fn bare_runtime() -> (Runtime, Rc<MemorySink>) {
        let sink = Rc::new(MemorySink::new());
        let config = RuntimeConfig {
            trace: true,
            color: false,
            builtins: false,
        };
        (Runtime::with_sink(config, sink.clone()), sink)
    }

    #[test]
    fn test_call_passes_receiver_and_arguments() {
        let (rt, _) = bare_runtime();
        let f = Rc::new(Function::native("add", |_, this, args| {
            Ok(Value::from(this.as_number().unwrap_or(0.0) + args.number(0)))
        }));
        let result = rt.call(&f, &Value::from(40), &[Value::from(2)]).unwrap();
        assert_eq!(result, Value::from(42));
    }

    #[test]
    fn test_arguments_carry_callee() {
        let (rt, _) = bare_runtime();
        let f = Rc::new(Function::native("me", |_, _, args| {
            Ok(Value::Function(args.callee.clone()))
        }));
        let result = rt.call(&f, &Value::Undefined, &[]).unwrap();
        assert_eq!(result, Value::Function(f));
    }

    #[test]
    fn test_error_trace_records_fullnames() {
        let (rt, _) = bare_runtime();
        let inner = Rc::new(Function::native("inner", |_, _, _| {
            Err(ZjsError::runtime_error("boom"))
        }));
        let inner_ref = inner.clone();
        let outer = Rc::new(Function::native("outer", move |rt, this, _| {
            rt.call(&inner_ref, this, &[])
        }));
        let err = rt.call(&outer, &Value::Undefined, &[]).unwrap_err();
        assert_eq!(err.trace, vec!["inner".to_string(), "outer".to_string()]);
    }

    #[test]
    fn test_invoke_missing_member() {
        let (rt, _) = bare_runtime();
        let class = rt.define_class(None, Members::new());
        let obj = rt.construct(&class, &[]).unwrap();
        let err = rt.invoke(&obj, "missing", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AttributeError);
    }

    #[test]
    fn test_invoke_non_function_member() {
        let (rt, _) = bare_runtime();
        let class = rt.define_class(None, Members::new().value("answer", 42));
        let obj = rt.construct(&class, &[]).unwrap();
        let err = rt.invoke(&obj, "answer", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_call_value_rejects_non_callable() {
        let (rt, _) = bare_runtime();
        let err = rt
            .call_value(&Value::from(1), &Value::Undefined, &[])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_panic_goes_to_sink() {
        let (rt, sink) = bare_runtime();
        rt.panic("fatal thing");
        assert_eq!(sink.messages(Level::Panic), vec!["fatal thing".to_string()]);
    }

    #[test]
    fn test_with_sink_keeps_config() {
        let (rt, _) = bare_runtime();
        assert!(rt.config().trace);
        assert!(!rt.config().builtins);
        assert!(!rt.root().contains("zjs"));
    }

    #[test]
    fn test_dropped_derived_functions_release_targets() {
        let (rt, _) = bare_runtime();
        let f = Rc::new(Function::native("f", |_, _, _| Ok(Value::Undefined)));
        for _ in 0..1000 {
            let bound = rt.bind(&f, Value::Null, Vec::new());
            rt.call(&bound, &Value::Undefined, &[]).unwrap();
            assert_eq!(rt.full_name(bound.as_ref()), "bind(f)");
        }
        assert_eq!(Rc::strong_count(&f), 1);

        let failing = Rc::new(Function::native("fails", |_, _, _| {
            Err(ZjsError::runtime_error("boom"))
        }));
        let weak = Rc::downgrade(&failing);
        assert!(rt.call(&failing, &Value::Undefined, &[]).is_err());
        drop(failing);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_builtins_installed_by_default() {
        let sink = Rc::new(MemorySink::new());
        let rt = Runtime::with_sink(RuntimeConfig::default(), sink.clone());
        assert!(rt.root().contains("zjs"));
        assert!(sink.messages(Level::Warn).is_empty());
    }
}
