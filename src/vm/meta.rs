// zjs Metadata
// Naming and lineage records carried by each entity. Records are created
// lazily, only ever patched, and freed together with their entity.

use crate::vm::value::{Class, Function, Namespace};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Anything that can carry metadata
pub trait Entity {
    fn meta_slot(&self) -> &MetaSlot;

    /// Record used the first time the entity is looked up
    fn initial_meta(&self) -> Meta;
}

impl Entity for Function {
    fn meta_slot(&self) -> &MetaSlot {
        &self.meta
    }

    fn initial_meta(&self) -> Meta {
        let name = match &self.declared_name {
            Some(name) => name.clone(),
            None => format!("anonymous#{}", self.id),
        };
        Meta::named(name)
    }
}

impl Entity for Class {
    fn meta_slot(&self) -> &MetaSlot {
        &self.meta
    }

    fn initial_meta(&self) -> Meta {
        Meta::named(format!("Class#{}", self.id))
    }
}

impl Entity for Namespace {
    fn meta_slot(&self) -> &MetaSlot {
        &self.meta
    }

    fn initial_meta(&self) -> Meta {
        Meta::named(self.declared_name.clone())
    }
}

/// How a method is attached to its class
#[derive(Clone)]
pub struct MethodBinding {
    pub class: Weak<Class>,
    pub is_static: bool,
    pub name: String,
    pub priority: i32,
    /// Next lower-priority link of the same (class, name) chain
    pub call_next: Option<Rc<Function>>,
    /// Mixin tag, `None` for members given at definition time
    pub tag: Option<String>,
}

impl MethodBinding {
    pub fn belongs_to(&self, class: &Rc<Class>) -> bool {
        self.class
            .upgrade()
            .map_or(false, |owner| Rc::ptr_eq(&owner, class))
    }

    /// Local display name: `name` or `name(tag)`
    pub fn display_name(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}({})", self.name, tag),
            None => self.name.clone(),
        }
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("class", &self.class.upgrade().map(|c| c.id))
            .field("is_static", &self.is_static)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("call_next", &self.call_next.as_ref().map(|f| f.id))
            .field("tag", &self.tag)
            .finish()
    }
}

/// Relationship of a derived function to its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationKind {
    Bind,
    Bind2,
    Head,
    Tail,
    Returns,
    Seal,
    Tee,
}

impl DerivationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivationKind::Bind => "bind",
            DerivationKind::Bind2 => "bind2",
            DerivationKind::Head => "head",
            DerivationKind::Tail => "tail",
            DerivationKind::Returns => "returns",
            DerivationKind::Seal => "seal",
            DerivationKind::Tee => "tee",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Derivation {
    pub kind: DerivationKind,
    pub targets: SmallVec<[Rc<Function>; 2]>,
}

/// Naming and lineage record
#[derive(Clone, Default)]
pub struct Meta {
    pub fullname: String,
    pub name: String,
    /// Owning namespace (or class scope for methods, which keep it `None`)
    pub namespace: Option<Weak<Namespace>>,
    /// Child namespaces in creation order (namespaces only)
    pub sub_namespaces: Vec<Rc<Namespace>>,
    pub binding: Option<MethodBinding>,
    pub derivation: Option<Derivation>,
}

impl Meta {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            fullname: name.clone(),
            name,
            ..Self::default()
        }
    }

    pub fn owner(&self) -> Option<Rc<Namespace>> {
        self.namespace.as_ref().and_then(Weak::upgrade)
    }

    pub fn priority(&self) -> i32 {
        self.binding.as_ref().map_or(0, |b| b.priority)
    }

    pub fn call_next(&self) -> Option<Rc<Function>> {
        self.binding.as_ref().and_then(|b| b.call_next.clone())
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("fullname", &self.fullname)
            .field("name", &self.name)
            .field("sub_namespaces", &self.sub_namespaces.len())
            .field("binding", &self.binding)
            .field("derivation", &self.derivation.as_ref().map(|d| d.kind))
            .finish()
    }
}

/// Shallow patch merged by `meta::add`
#[derive(Default)]
pub struct MetaPatch {
    pub fullname: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<Weak<Namespace>>,
    pub binding: Option<MethodBinding>,
    pub derivation: Option<Derivation>,
}

/// Per-entity record cell, filled on first access and dropped with the entity
#[derive(Default)]
pub struct MetaSlot {
    record: RefCell<Option<Meta>>,
}

impl MetaSlot {
    pub fn is_initialized(&self) -> bool {
        self.record.borrow().is_some()
    }
}

/// Snapshot of the entity's record, creating it on first access
pub fn get<E: Entity + ?Sized>(entity: &E) -> Meta {
    update(entity, |meta| meta.clone())
}

/// Merge `patch` into the entity's record
pub fn add<E: Entity + ?Sized>(entity: &E, patch: MetaPatch) {
    update(entity, |meta| {
        if let Some(fullname) = patch.fullname {
            meta.fullname = fullname;
        }
        if let Some(name) = patch.name {
            meta.name = name;
        }
        if let Some(namespace) = patch.namespace {
            meta.namespace = Some(namespace);
        }
        if let Some(binding) = patch.binding {
            meta.binding = Some(binding);
        }
        if let Some(derivation) = patch.derivation {
            meta.derivation = Some(derivation);
        }
    });
}

/// Run `f` against the entity's record. `f` must not touch the same entity's metadata.
pub fn update<E, R>(entity: &E, f: impl FnOnce(&mut Meta) -> R) -> R
where
    E: Entity + ?Sized,
{
    let mut record = entity.meta_slot().record.borrow_mut();
    let meta = record.get_or_insert_with(|| entity.initial_meta());
    f(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::value::Value;

    fn noop(name: Option<&str>) -> Function {
        match name {
            Some(name) => Function::native(name, |_, _, _| Ok(Value::Undefined)),
            None => Function::anonymous(|_, _, _| Ok(Value::Undefined)),
        }
    }

    #[test]
    fn test_lazy_initialization() {
        let f = noop(Some("render"));
        assert!(!f.meta_slot().is_initialized());
        let meta = get(&f);
        assert_eq!(meta.name, "render");
        assert_eq!(meta.fullname, "render");
        assert!(f.meta_slot().is_initialized());
    }

    #[test]
    fn test_anonymous_function_gets_generated_name() {
        let f = noop(None);
        let meta = get(&f);
        assert_eq!(meta.name, format!("anonymous#{}", f.id));
    }

    #[test]
    fn test_add_merges_shallowly() {
        let f = noop(Some("a"));
        add(
            &f,
            MetaPatch {
                fullname: Some("app.a".to_string()),
                ..MetaPatch::default()
            },
        );
        let meta = get(&f);
        assert_eq!(meta.fullname, "app.a");
        assert_eq!(meta.name, "a");
        assert!(meta.binding.is_none());
    }

    #[test]
    fn test_binding_display_name() {
        let class = Rc::new(Class::new(None));
        let binding = MethodBinding {
            class: Rc::downgrade(&class),
            is_static: false,
            name: "foo".to_string(),
            priority: 0,
            call_next: None,
            tag: Some("log".to_string()),
        };
        assert_eq!(binding.display_name(), "foo(log)");
        assert!(binding.belongs_to(&class));
        assert!(!binding.belongs_to(&Rc::new(Class::new(None))));
    }

    #[test]
    fn test_class_and_namespace_initializers() {
        let class = Class::new(None);
        let ns = Namespace::new("models");
        assert_eq!(get(&class).name, format!("Class#{}", class.id));
        assert_eq!(get(&ns).fullname, "models");
    }

    #[test]
    fn test_record_is_freed_with_entity() {
        let target = Rc::new(noop(Some("target")));
        for _ in 0..100 {
            let derived = Rc::new(noop(None));
            add(
                derived.as_ref(),
                MetaPatch {
                    derivation: Some(Derivation {
                        kind: DerivationKind::Bind,
                        targets: smallvec::smallvec![target.clone()],
                    }),
                    ..MetaPatch::default()
                },
            );
            assert_eq!(Rc::strong_count(&target), 2);
        }
        assert_eq!(Rc::strong_count(&target), 1);
    }
}
