// zjs Super-Call Resolver
// A method names itself through its arguments object; the next
// implementation is its chain successor, else the same member on the
// nearest ancestor, else a no-op.

use std::rc::Rc;

use crate::error::{ZjsError, ZjsResult};
use crate::vm::runtime::Runtime;
use crate::vm::value::{Arguments, Function, Value};

impl Runtime {
    /// The implementation a super call from `args.callee` reaches
    pub fn resolve_super(&self, args: &Arguments) -> Rc<Function> {
        let binding = match self.get_meta(args.callee.as_ref()).binding {
            Some(binding) => binding,
            None => return self.noop().clone(),
        };

        if let Some(next) = binding.call_next {
            return next;
        }

        let class = match binding.class.upgrade() {
            Some(class) => class,
            None => return self.noop().clone(),
        };

        class
            .ancestors()
            .find_map(|ancestor| match ancestor.own_member(&binding.name, binding.is_static) {
                Some(Value::Function(func)) => Some(func),
                _ => None,
            })
            .unwrap_or_else(|| self.noop().clone())
    }

    /// Invoke the next implementation with the original arguments
    pub fn call_super(&self, args: &Arguments, this: &Value) -> ZjsResult<Value> {
        let target = self.resolve_super(args);
        self.call(&target, this, args.as_slice())
    }

    pub fn call_super_with(
        &self,
        args: &Arguments,
        this: &Value,
        explicit: &[Value],
    ) -> ZjsResult<Value> {
        let target = self.resolve_super(args);
        self.call(&target, this, explicit)
    }

    /// Variadic form: `(arguments)` resolves only, `(arguments, this)`
    /// forwards the original arguments, `(arguments, this, list)` passes
    /// `list` instead.
    pub fn super_call(&self, argv: &[Value]) -> ZjsResult<Value> {
        if argv.is_empty() || argv.len() > 3 {
            return Err(self.report(ZjsError::invalid_super_call(argv.len())));
        }

        let args = match &argv[0] {
            Value::Arguments(args) => args.clone(),
            other => {
                return Err(ZjsError::type_error(format!(
                    "super call needs the caller's arguments object, got '{}'",
                    other.type_name()
                )))
            }
        };

        match argv {
            [_] => Ok(Value::Function(self.resolve_super(&args))),
            [_, this] => self.call_super(&args, this),
            [_, this, explicit] => {
                let explicit = match explicit {
                    Value::Array(items) => items.borrow().clone(),
                    Value::Arguments(other) => other.as_slice().to_vec(),
                    Value::Undefined => args.as_slice().to_vec(),
                    other => {
                        return Err(ZjsError::argument_error(format!(
                            "explicit super arguments must be an Array, got '{}'",
                            other.type_name()
                        )))
                    }
                };
                self.call_super_with(&args, this, &explicit)
            }
            _ => Err(self.report(ZjsError::invalid_super_call(argv.len()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builtins::console::Level;
    use crate::error::ErrorKind;
    use crate::vm::runtime::tests::bare_runtime;
    use crate::vm::value::{Function, Members, Value};
    use std::rc::Rc;

    #[test]
    fn test_root_method_super_is_silent_noop() {
        let (rt, sink) = bare_runtime();
        let class = rt.define_class(
            None,
            Members::new().method("m", Function::native("m", |rt, this, args| rt.call_super(args, this))),
        );
        let obj = rt.construct(&class, &[]).unwrap();
        assert!(rt.invoke(&obj, "m", &[]).unwrap().is_undefined());
        assert!(sink.messages(Level::Panic).is_empty());
    }

    #[test]
    fn test_free_function_super_is_noop() {
        let (rt, _) = bare_runtime();
        let f = Rc::new(Function::native("free", |rt, _, args| {
            Ok(Value::Function(rt.resolve_super(args)))
        }));
        let resolved = rt.call(&f, &Value::Undefined, &[]).unwrap();
        assert_eq!(resolved, Value::Function(rt.noop().clone()));
    }

    #[test]
    fn test_resolve_only_allows_manual_composition() {
        let (rt, _) = bare_runtime();
        let a = rt.define_class(
            None,
            Members::new().method(
                "greet",
                Function::native("greet", |_, _, args| Ok(Value::from(format!("hi {}", args.get(0))))),
            ),
        );
        let b = rt.define_class(
            Some(&a),
            Members::new().method(
                "greet",
                Function::native("greet", |rt, this, args| {
                    let parent = rt.resolve_super(args);
                    rt.call(&parent, this, &[Value::from("there")])
                }),
            ),
        );
        let obj = rt.construct(&b, &[]).unwrap();
        assert_eq!(
            rt.invoke(&obj, "greet", &[Value::from("you")]).unwrap(),
            Value::from("hi there")
        );
    }

    #[test]
    fn test_explicit_arguments_replace_originals() {
        let (rt, _) = bare_runtime();
        let a = rt.define_class(
            None,
            Members::new().method("add", Function::native("add", |_, _, args| {
                Ok(Value::from(args.number(0) + args.number(1)))
            })),
        );
        let b = rt.define_class(
            Some(&a),
            Members::new().method("add", Function::native("add", |rt, this, args| {
                rt.call_super_with(args, this, &[args.get(0), Value::from(100)])
            })),
        );
        let obj = rt.construct(&b, &[]).unwrap();
        assert_eq!(
            rt.invoke(&obj, "add", &[Value::from(1), Value::from(2)]).unwrap(),
            Value::from(101)
        );
    }

    #[test]
    fn test_super_keeps_receiver() {
        let (rt, _) = bare_runtime();
        let a = rt.define_class(
            None,
            Members::new().method("me", Function::native("me", |_, this, _| Ok(this.clone()))),
        );
        let b = rt.define_class(
            Some(&a),
            Members::new().method("me", Function::native("me", |rt, this, args| rt.call_super(args, this))),
        );
        let obj = rt.construct(&b, &[]).unwrap();
        assert_eq!(rt.invoke(&obj, "me", &[]).unwrap(), obj);
    }

    #[test]
    fn test_super_call_argument_count() {
        let (rt, sink) = bare_runtime();
        let err = rt.super_call(&[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSuperCall);

        let f = Rc::new(Function::native("four", |rt, this, args| {
            let a = Value::Arguments(args.clone());
            rt.super_call(&[a, this.clone(), Value::Undefined, Value::Null])
        }));
        let err = rt.call(&f, &Value::Undefined, &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSuperCall);
        assert_eq!(sink.messages(Level::Panic).len(), 2);
    }

    #[test]
    fn test_super_call_requires_arguments_object() {
        let (rt, _) = bare_runtime();
        let err = rt.super_call(&[Value::from(1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_variadic_modes() {
        let (rt, _) = bare_runtime();
        let a = rt.define_class(
            None,
            Members::new().method("m", Function::native("m", |_, _, args| {
                Ok(Value::from(args.len() as f64 * 10.0 + args.number(0)))
            })),
        );
        let b = rt.define_class(
            Some(&a),
            Members::new().method("m", Function::native("m", |rt, this, args| {
                let site = Value::Arguments(args.clone());
                let resolved = rt.super_call(&[site.clone()])?;
                let resolved = resolved.as_function().cloned().unwrap_or_else(|| rt.noop().clone());
                let manual = rt.call(&resolved, this, &[Value::from(5)])?;
                let forwarded = rt.super_call(&[site.clone(), this.clone()])?;
                let explicit = rt.super_call(&[
                    site,
                    this.clone(),
                    Value::array(vec![Value::from(1), Value::from(2), Value::from(3)]),
                ])?;
                Ok(Value::array(vec![manual, forwarded, explicit]))
            })),
        );
        let obj = rt.construct(&b, &[]).unwrap();
        let result = rt.invoke(&obj, "m", &[Value::from(7), Value::from(8)]).unwrap();
        assert_eq!(result.to_string(), "[15, 27, 31]");
    }
}
