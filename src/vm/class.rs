// zjs Class Model
// Single inheritance over explicit prototype and static tables.
// Defining a class never runs a constructor; `ctor` only runs on construct.

use std::rc::Rc;

use crate::error::ZjsResult;
use crate::vm::meta::MetaPatch;
use crate::vm::runtime::Runtime;
use crate::vm::value::{Class, Function, Instance, Members, Value};

/// Member invoked with the constructor arguments
pub const CTOR: &str = "ctor";
/// Class-identity accessor installed on every class
pub const GET_CLASS: &str = "getClass";

impl Class {
    pub fn own_member(&self, name: &str, is_static: bool) -> Option<Value> {
        self.table(is_static).borrow().get(name).cloned()
    }

    /// Look `name` up on this class, then on each ancestor
    pub fn find_member(&self, name: &str, is_static: bool) -> Option<Value> {
        self.own_member(name, is_static)
            .or_else(|| self.ancestors().find_map(|a| a.own_member(name, is_static)))
    }

    pub fn is_subclass_of(&self, other: &Rc<Class>) -> bool {
        self.id == other.id || self.ancestors().any(|a| Rc::ptr_eq(&a, other))
    }
}

impl Runtime {
    /// Define a class from a member bundle
    pub fn define_class(&self, superclass: Option<&Rc<Class>>, members: Members) -> Rc<Class> {
        let class = Rc::new(Class::new(superclass.cloned()));
        self.mixin(&class, None, members);
        self.install_class_accessors(&class);
        self.trace(|| match superclass {
            Some(parent) => format!(
                "class {} extends {}",
                self.full_name(class.as_ref()),
                self.full_name(parent.as_ref())
            ),
            None => format!("class {}", self.full_name(class.as_ref())),
        });
        class
    }

    /// Define a class from a factory; private helpers live in the factory's
    /// closures. The factory runs exactly once.
    pub fn define_class_with<F>(&self, superclass: Option<&Rc<Class>>, factory: F) -> Rc<Class>
    where
        F: FnOnce() -> Members,
    {
        self.define_class(superclass, factory())
    }

    fn install_class_accessors(&self, class: &Rc<Class>) {
        let accessor = |class: &Rc<Class>| {
            let weak = Rc::downgrade(class);
            Function::native(GET_CLASS, move |_, _, _| {
                Ok(weak.upgrade().map_or(Value::Undefined, Value::Class))
            })
        };
        self.mixin(
            class,
            None,
            Members::new()
                .method(GET_CLASS, accessor(class))
                .static_method(GET_CLASS, accessor(class)),
        );
    }

    /// Create an instance and run the nearest `ctor` with `args`
    pub fn construct(&self, class: &Rc<Class>, args: &[Value]) -> ZjsResult<Value> {
        let instance = Value::Object(Rc::new(Instance::new(class.clone())));
        if let Some(Value::Function(ctor)) = class.find_member(CTOR, false) {
            self.call(&ctor, &instance, args)?;
        }
        Ok(instance)
    }

    pub fn instance_of(&self, value: &Value, class: &Rc<Class>) -> bool {
        match value {
            Value::Object(instance) => instance.class.is_subclass_of(class),
            _ => false,
        }
    }

    pub fn class_of(&self, value: &Value) -> Option<Rc<Class>> {
        match value {
            Value::Object(instance) => Some(instance.class.clone()),
            _ => None,
        }
    }

    /// Give every method this class owns its qualified name
    pub(crate) fn connect_members(&self, class: &Rc<Class>) {
        let class_name = self.full_name(class.as_ref());
        for is_static in [false, true] {
            let heads: Vec<Rc<Function>> = class
                .table(is_static)
                .borrow()
                .values()
                .filter_map(|value| value.as_function().cloned())
                .collect();

            for head in heads {
                for link in self.chain_links(&head) {
                    let binding = match self.get_meta(link.as_ref()).binding {
                        Some(binding) if binding.belongs_to(class) => binding,
                        _ => continue,
                    };
                    self.add_meta(
                        link.as_ref(),
                        MetaPatch {
                            fullname: Some(format!("{}.{}", class_name, binding.display_name())),
                            name: Some(binding.name.clone()),
                            ..MetaPatch::default()
                        },
                    );
                }
            }
        }
    }
}
