pub mod class;
pub mod meta;
pub mod mixin;
pub mod namespace;
pub mod resolver;
pub mod runtime;
pub mod value;

pub use meta::{Derivation, DerivationKind, Entity, Meta, MetaPatch, MetaSlot, MethodBinding};
pub use namespace::{EntrySnapshot, NamespaceRef};
pub use runtime::Runtime;
pub use value::{
    stat, Arguments, Class, EntityId, Function, Instance, Member, Members, Namespace, Scope, Value,
};
