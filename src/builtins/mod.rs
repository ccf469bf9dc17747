// zjs Built-in Namespace
// Installs the `zjs` namespace: the root class and the helpers scripts
// reach through dotted paths instead of runtime methods

pub mod console;
pub mod functional;

use std::rc::Rc;

use crate::error::ZjsResult;
use crate::vm::runtime::Runtime;
use crate::vm::value::{Function, Members, Value};

/// Namespace the builtins are registered under
pub const NAMESPACE: &str = "zjs";

pub fn install(rt: &Runtime) -> ZjsResult<()> {
    let object = rt.define_class(None, Members::new());

    let call_super = Function::native("callSuper", |rt, _, args| rt.super_call(args.as_slice()));

    let panic = Function::native("panic", |rt, _, args| {
        rt.panic(&args.get(0).to_string());
        Ok(Value::Undefined)
    });

    let get_full_name = Function::native("getFullName", |rt, _, args| {
        Ok(rt
            .value_full_name(&args.get(0))
            .map_or(Value::Undefined, Value::from))
    });

    let get_name = Function::native("getName", |rt, _, args| {
        Ok(rt
            .value_name(&args.get(0))
            .map_or(Value::Undefined, Value::from))
    });

    rt.declare(
        NAMESPACE,
        vec![
            ("Object", Value::Class(object)),
            ("callSuper", Value::Function(Rc::new(call_super))),
            ("panic", Value::Function(Rc::new(panic))),
            ("getFullName", Value::Function(Rc::new(get_full_name))),
            ("getName", Value::Function(Rc::new(get_name))),
        ],
    )?;
    Ok(())
}
