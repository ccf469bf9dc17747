// zjs
// Namespaces, classes with single inheritance, prioritized mixin chains
// and super calls resolved from the executing function

pub mod builtins;
pub mod config;
pub mod error;
pub mod vm;

pub use config::RuntimeConfig;
pub use error::{ErrorKind, ZjsError, ZjsResult};
pub use vm::{stat, Arguments, Class, Function, Members, Namespace, Runtime, Value};
