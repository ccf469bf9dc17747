// zjs Namespace Registry
// Dotted paths map onto a tree of namespaces rooted at the runtime's
// global scope. Names are unique per namespace.

use regex::Regex;
use serde::Serialize;
use std::rc::Rc;
use std::sync::OnceLock;

use crate::error::{ZjsError, ZjsResult};
use crate::vm::meta::{self, MetaPatch};
use crate::vm::runtime::Runtime;
use crate::vm::value::{Class, Function, Namespace, Value};

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid")
    })
}

pub fn is_identifier(name: &str) -> bool {
    identifier().is_match(name)
}

/// Where a declaration lands: a dotted path from the root, or a namespace
#[derive(Clone, Copy)]
pub enum NamespaceRef<'a> {
    Path(&'a str),
    Namespace(&'a Rc<Namespace>),
}

impl<'a> From<&'a str> for NamespaceRef<'a> {
    fn from(path: &'a str) -> Self {
        NamespaceRef::Path(path)
    }
}

impl<'a> From<&'a Rc<Namespace>> for NamespaceRef<'a> {
    fn from(ns: &'a Rc<Namespace>) -> Self {
        NamespaceRef::Namespace(ns)
    }
}

/// Serializable view of a registry subtree
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub name: String,
    pub fullname: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntrySnapshot>,
}

impl Runtime {
    /// Register `members` into the namespace at `target`, creating the path
    pub fn declare<'a, S, I>(
        &self,
        target: impl Into<NamespaceRef<'a>>,
        members: I,
    ) -> ZjsResult<Rc<Namespace>>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Value)>,
    {
        let ns = match target.into() {
            NamespaceRef::Path(path) => self.declare_namespace(path)?,
            NamespaceRef::Namespace(ns) => ns.clone(),
        };
        self.register_members(&ns, members)?;
        Ok(ns)
    }

    /// Walk or create the namespaces along `path` starting at the root
    pub fn declare_namespace(&self, path: &str) -> ZjsResult<Rc<Namespace>> {
        let root = self.root().clone();
        self.declare_namespace_in(&root, path)
    }

    pub fn declare_namespace_in(&self, start: &Rc<Namespace>, path: &str) -> ZjsResult<Rc<Namespace>> {
        let mut current = start.clone();
        if path.is_empty() {
            return Ok(current);
        }

        for segment in path.split('.') {
            if !is_identifier(segment) {
                return Err(self.report(ZjsError::invalid_name(segment)));
            }

            let next = match current.get(segment) {
                Some(Value::Namespace(existing)) => existing,
                Some(other) => {
                    let owner = self.full_name(current.as_ref());
                    return Err(self.report(
                        ZjsError::name_conflict(segment, &owner).with_help(format!(
                            "'{}' holds a {}, not a namespace",
                            segment,
                            other.type_name()
                        )),
                    ));
                }
                None => self.create_child(&current, segment),
            };
            current = next;
        }

        Ok(current)
    }

    fn create_child(&self, parent: &Rc<Namespace>, segment: &str) -> Rc<Namespace> {
        let child = Rc::new(Namespace::new(segment));
        let fullname = self.qualify(parent, segment);
        self.add_meta(
            child.as_ref(),
            MetaPatch {
                fullname: Some(fullname.clone()),
                name: Some(segment.to_string()),
                namespace: Some(Rc::downgrade(parent)),
                ..MetaPatch::default()
            },
        );
        meta::update(parent.as_ref(), |meta| meta.sub_namespaces.push(child.clone()));
        parent
            .members
            .borrow_mut()
            .insert(segment.to_string(), Value::Namespace(child.clone()));
        self.trace(|| format!("namespace {}", fullname));
        child
    }

    /// Add each member to `ns`; an existing name is a conflict. Members
    /// before a failing entry stay registered.
    pub fn register_members<S, I>(&self, ns: &Rc<Namespace>, members: I) -> ZjsResult<()>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Value)>,
    {
        for (name, value) in members {
            let name = name.into();
            if !is_identifier(&name) {
                return Err(self.report(ZjsError::invalid_name(&name)));
            }
            if ns.contains(&name) {
                let owner = self.full_name(ns.as_ref());
                return Err(self.report(ZjsError::name_conflict(&name, &owner)));
            }

            ns.members.borrow_mut().insert(name.clone(), value.clone());
            match &value {
                Value::Function(func) => self.connect_function(ns, &name, func),
                Value::Class(class) => self.connect_class(ns, &name, class),
                _ => {}
            }
            self.trace(|| format!("register {}", self.qualify(ns, &name)));
        }
        Ok(())
    }

    fn connect_function(&self, ns: &Rc<Namespace>, name: &str, func: &Rc<Function>) {
        self.add_meta(
            func.as_ref(),
            MetaPatch {
                fullname: Some(self.qualify(ns, name)),
                name: Some(name.to_string()),
                namespace: Some(Rc::downgrade(ns)),
                ..MetaPatch::default()
            },
        );
    }

    fn connect_class(&self, ns: &Rc<Namespace>, name: &str, class: &Rc<Class>) {
        self.add_meta(
            class.as_ref(),
            MetaPatch {
                fullname: Some(self.qualify(ns, name)),
                name: Some(name.to_string()),
                namespace: Some(Rc::downgrade(ns)),
                ..MetaPatch::default()
            },
        );
        self.connect_members(class);
    }

    /// `parent.fullname + "." + name`, or `name` directly under the root
    pub fn qualify(&self, parent: &Rc<Namespace>, name: &str) -> String {
        if Rc::ptr_eq(parent, self.root()) {
            name.to_string()
        } else {
            format!("{}.{}", self.full_name(parent.as_ref()), name)
        }
    }

    pub fn sub_namespaces(&self, ns: &Rc<Namespace>) -> Vec<Rc<Namespace>> {
        self.get_meta(ns.as_ref()).sub_namespaces
    }

    /// Look up a dotted path from the root. The last segment may name a
    /// static member of a class.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let mut current = Value::Namespace(self.root().clone());
        for segment in path.split('.') {
            current = match &current {
                Value::Namespace(ns) => ns.get(segment)?,
                Value::Class(class) => class.find_member(segment, true)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn snapshot(&self, ns: &Rc<Namespace>) -> EntrySnapshot {
        let children = ns
            .names()
            .into_iter()
            .filter_map(|name| ns.get(&name).map(|value| self.snapshot_value(&name, &value)))
            .collect();
        EntrySnapshot {
            name: self.name(ns.as_ref()),
            fullname: self.full_name(ns.as_ref()),
            kind: "namespace",
            children,
        }
    }

    fn snapshot_value(&self, name: &str, value: &Value) -> EntrySnapshot {
        match value {
            Value::Namespace(ns) => self.snapshot(ns),
            Value::Class(class) => {
                let mut children = Vec::new();
                for is_static in [false, true] {
                    let mut names: Vec<String> =
                        class.table(is_static).borrow().keys().cloned().collect();
                    names.sort();
                    for member in names {
                        if let Some(Value::Function(head)) = class.own_member(&member, is_static) {
                            children.push(self.snapshot_chain(&head, is_static));
                        }
                    }
                }
                EntrySnapshot {
                    name: name.to_string(),
                    fullname: self.full_name(class.as_ref()),
                    kind: "class",
                    children,
                }
            }
            Value::Function(func) => EntrySnapshot {
                name: name.to_string(),
                fullname: self.full_name(func.as_ref()),
                kind: "function",
                children: Vec::new(),
            },
            other => EntrySnapshot {
                name: name.to_string(),
                fullname: other.to_string(),
                kind: "value",
                children: Vec::new(),
            },
        }
    }

    fn snapshot_chain(&self, head: &Rc<Function>, is_static: bool) -> EntrySnapshot {
        let links = self.chain_links(head);
        let children = if links.len() > 1 {
            links
                .iter()
                .map(|link| EntrySnapshot {
                    name: self.name(link.as_ref()),
                    fullname: self.full_name(link.as_ref()),
                    kind: "link",
                    children: Vec::new(),
                })
                .collect()
        } else {
            Vec::new()
        };
        EntrySnapshot {
            name: self.name(head.as_ref()),
            fullname: self.full_name(head.as_ref()),
            kind: if is_static { "static method" } else { "method" },
            children,
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
    fn test_declare_namespace_links_metadata() {
        let (rt, _) = bare_runtime();
        let models = rt.declare_namespace("app.models").unwrap();
        assert_eq!(rt.full_name(models.as_ref()), "app.models");
        assert_eq!(rt.name(models.as_ref()), "models");

        let app = rt.resolve("app").unwrap();
        let app = app.as_namespace().unwrap();
        assert_eq!(rt.full_name(app.as_ref()), "app");
        let subs = rt.sub_namespaces(app);
        assert_eq!(subs.len(), 1);
        assert!(Rc::ptr_eq(&subs[0], &models));
        let owner = rt.get_meta(models.as_ref()).owner().unwrap();
        assert!(Rc::ptr_eq(&owner, app));
    }

    #[test]
    fn test_declare_namespace_reuses_nodes() {
        let (rt, _) = bare_runtime();
        let first = rt.declare_namespace("app.models").unwrap();
        let second = rt.declare_namespace("app.models").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        rt.declare_namespace("app.views").unwrap();
        let app = rt.resolve("app").unwrap();
        let names: Vec<String> = rt
            .sub_namespaces(app.as_namespace().unwrap())
            .iter()
            .map(|ns| rt.name(ns.as_ref()))
            .collect();
        assert_eq!(names, vec!["models", "views"]);
    }

    #[test]
    fn test_empty_path_is_root() {
        let (rt, _) = bare_runtime();
        let ns = rt.declare("", vec![("answer", Value::from(42))]).unwrap();
        assert!(Rc::ptr_eq(&ns, rt.root()));
        assert_eq!(rt.resolve("answer"), Some(Value::from(42)));
    }

    #[test]
    fn test_register_same_name_twice_conflicts() {
        let (rt, sink) = bare_runtime();
        rt.declare("app", vec![("version", Value::from(1))]).unwrap();
        let err = rt
            .declare("app", vec![("version", Value::from(2))])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NameConflict);
        assert_eq!(rt.resolve("app.version"), Some(Value::from(1)));
        assert_eq!(sink.messages(Level::Panic).len(), 1);
    }

    #[test]
    fn test_sibling_classes_conflict() {
        let (rt, _) = bare_runtime();
        let a = rt.define_class(None, Members::new());
        let b = rt.define_class(None, Members::new());
        rt.declare("app", vec![("Widget", Value::Class(a))]).unwrap();
        let err = rt
            .declare("app", vec![("Widget", Value::Class(b))])
            .unwrap_err();
        assert!(err.is(ErrorKind::NameConflict));
    }

    #[test]
    fn test_path_through_value_conflicts() {
        let (rt, _) = bare_runtime();
        rt.declare("app", vec![("config", Value::from(true))]).unwrap();
        let err = rt.declare_namespace("app.config.db").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NameConflict);
    }

    #[test]
    fn test_invalid_segment() {
        let (rt, _) = bare_runtime();
        let err = rt.declare_namespace("app..models").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidName);
        let err = rt
            .declare("app", vec![("1st", Value::from(1))])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidName);
    }

    #[test]
    fn test_declare_on_namespace_object() {
        let (rt, _) = bare_runtime();
        let util = rt.declare_namespace("lib.util").unwrap();
        let f = Rc::new(Function::anonymous(|_, _, _| Ok(Value::Undefined)));
        rt.declare(&util, vec![("helper", Value::Function(f.clone()))])
            .unwrap();
        assert_eq!(rt.full_name(f.as_ref()), "lib.util.helper");
        assert_eq!(rt.name(f.as_ref()), "helper");
        assert_eq!(rt.resolve("lib.util.helper"), Some(Value::Function(f)));
    }

    #[test]
    fn test_conflict_keeps_earlier_entries() {
        let (rt, _) = bare_runtime();
        let err = rt
            .declare(
                "app",
                vec![("x", Value::from(1)), ("x", Value::from(2)), ("y", Value::from(3))],
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NameConflict);
        assert_eq!(rt.resolve("app.x"), Some(Value::from(1)));
        assert_eq!(rt.resolve("app.y"), None);
    }

    #[test]
    fn test_namespace_value_keeps_its_name() {
        let (rt, _) = bare_runtime();
        let util = rt.declare_namespace("lib.util").unwrap();
        rt.declare("app", vec![("u", Value::Namespace(util.clone()))])
            .unwrap();
        assert_eq!(rt.full_name(util.as_ref()), "lib.util");
        assert_eq!(rt.name(util.as_ref()), "util");
        match rt.resolve("app.u") {
            Some(Value::Namespace(alias)) => assert!(Rc::ptr_eq(&alias, &util)),
            other => panic!("expected namespace, got {:?}", other),
        }
    }

    #[test]
    fn test_full_name_is_stable() {
        let (rt, _) = bare_runtime();
        let ns = rt.declare_namespace("a.b.c").unwrap();
        let first = rt.full_name(ns.as_ref());
        assert_eq!(first, rt.full_name(ns.as_ref()));
        assert_eq!(first, "a.b.c");
    }

    #[test]
    fn test_registered_class_connects_methods() {
        let (rt, _) = bare_runtime();
        let render = Rc::new(Function::native("render", |_, _, _| Ok(Value::Undefined)));
        let create = Rc::new(Function::native("create", |_, _, _| Ok(Value::Undefined)));
        let class = rt.define_class(
            None,
            Members::new()
                .value("render", render.clone())
                .static_value("create", create.clone()),
        );
        rt.declare("ui", vec![("View", Value::Class(class.clone()))])
            .unwrap();
        assert_eq!(rt.full_name(class.as_ref()), "ui.View");
        assert_eq!(rt.full_name(render.as_ref()), "ui.View.render");
        assert_eq!(rt.full_name(create.as_ref()), "ui.View.create");
    }

    #[test]
    fn test_resolve_static_member() {
        let (rt, _) = bare_runtime();
        let class = rt.define_class(None, Members::new().static_value("LIMIT", 10));
        rt.declare("cfg", vec![("Limits", Value::Class(class))]).unwrap();
        assert_eq!(rt.resolve("cfg.Limits.LIMIT"), Some(Value::from(10)));
        assert_eq!(rt.resolve("cfg.Limits.missing"), None);
        assert_eq!(rt.resolve("cfg.nothing.here"), None);
    }

    #[test]
    fn test_snapshot_lists_chains() {
        let (rt, _) = bare_runtime();
        let class = rt.define_class(
            None,
            Members::new().method("run", Function::native("run", |_, _, _| Ok(Value::Undefined))),
        );
        rt.mixin(
            &class,
            Some("log"),
            Members::new().method("run", Function::native("run", |_, _, _| Ok(Value::Undefined))),
        );
        rt.declare("jobs", vec![("Job", Value::Class(class))]).unwrap();

        let snapshot = rt.snapshot(rt.root());
        let jobs = &snapshot.children[0];
        assert_eq!(jobs.fullname, "jobs");
        let job = &jobs.children[0];
        assert_eq!(job.kind, "class");
        let run = job
            .children
            .iter()
            .find(|entry| entry.kind == "method" && entry.name == "run")
            .unwrap();
        let links: Vec<&str> = run.children.iter().map(|l| l.fullname.as_str()).collect();
        assert_eq!(links, vec!["jobs.Job.run(log)", "jobs.Job.run"]);
    }

    #[test]
    fn test_trace_logs_definitions() {
        let (rt, sink) = bare_runtime();
        rt.declare_namespace("app.models").unwrap();
        let traces = sink.messages(Level::Trace);
        assert!(traces.contains(&"namespace app".to_string()));
        assert!(traces.contains(&"namespace app.models".to_string()));
    }
}
