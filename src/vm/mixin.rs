// zjs Mixin/Override Engine
// Tagged mixins turn a member slot into a priority-ordered chain of
// functions linked through `call_next`; the slot holds the head.
// Untagged mixins and non-function members simply replace the slot.

use rustc_hash::FxHashSet;
use std::rc::Rc;

use crate::vm::meta::{self, MetaPatch, MethodBinding};
use crate::vm::runtime::Runtime;
use crate::vm::value::{Class, Function, Members, Value};

impl Runtime {
    /// Add `members` to `class`, chaining function members under `tag`
    pub fn mixin(&self, class: &Rc<Class>, tag: Option<&str>, members: Members) {
        for (name, member) in members {
            let is_static = member.is_static();
            match (tag, member.value) {
                (Some(tag), Value::Function(func)) => {
                    self.chain_method(class, tag, &name, is_static, func);
                    self.trace(|| format!("mixin {}", self.full_name_of_slot(class, &name, is_static)));
                }
                (_, Value::Function(func)) => {
                    self.bind_method(class, &name, is_static, &func, None);
                    class
                        .table(is_static)
                        .borrow_mut()
                        .insert(name, Value::Function(func));
                }
                (_, value) => {
                    class.table(is_static).borrow_mut().insert(name, value);
                }
            }
        }
    }

    /// Every link of the chain starting at `head`, head first
    pub fn chain_links(&self, head: &Rc<Function>) -> Vec<Rc<Function>> {
        let mut links = Vec::new();
        let mut seen = FxHashSet::default();
        let mut link = Some(head.clone());
        while let Some(current) = link {
            if !seen.insert(current.id) {
                break;
            }
            link = self.call_next_of(&current);
            links.push(current);
        }
        links
    }

    pub fn call_next_of(&self, func: &Rc<Function>) -> Option<Rc<Function>> {
        self.get_meta(func.as_ref()).call_next()
    }

    /// Chain priority: the bound priority, else the annotation
    pub fn priority_of(&self, func: &Rc<Function>) -> i32 {
        self.get_meta(func.as_ref())
            .binding
            .map_or(func.priority, |binding| binding.priority)
    }

    fn bind_method(
        &self,
        class: &Rc<Class>,
        name: &str,
        is_static: bool,
        func: &Rc<Function>,
        tag: Option<&str>,
    ) {
        let binding = MethodBinding {
            class: Rc::downgrade(class),
            is_static,
            name: name.to_string(),
            priority: func.priority,
            call_next: None,
            tag: tag.map(str::to_string),
        };
        let fullname = format!("{}.{}", self.full_name(class.as_ref()), binding.display_name());
        self.add_meta(
            func.as_ref(),
            MetaPatch {
                fullname: Some(fullname),
                name: Some(name.to_string()),
                binding: Some(binding),
                ..MetaPatch::default()
            },
        );
    }

    fn set_call_next(&self, func: &Rc<Function>, next: Option<Rc<Function>>) {
        meta::update(func.as_ref(), |meta| {
            if let Some(binding) = meta.binding.as_mut() {
                binding.call_next = next;
            }
        });
    }

    fn chain_method(
        &self,
        class: &Rc<Class>,
        tag: &str,
        name: &str,
        is_static: bool,
        func: Rc<Function>,
    ) {
        self.unlink(class, name, is_static, &func);

        let head = class
            .own_member(name, is_static)
            .and_then(|value| value.as_function().cloned());
        if let Some(head) = &head {
            if self.get_meta(head.as_ref()).binding.is_none() {
                self.bind_method(class, name, is_static, head, None);
            }
        }

        let priority = func.priority;
        self.bind_method(class, name, is_static, &func, Some(tag));

        match head {
            // An equal-priority head is displaced; below the head, equal
            // priorities keep insertion order.
            Some(head) if self.priority_of(&head) > priority => {
                // Walk past every link of higher or equal priority and
                // splice in after the last of them.
                let mut link = head;
                while let Some(next) = self.call_next_of(&link) {
                    if self.priority_of(&next) < priority {
                        break;
                    }
                    link = next;
                }
                let after = self.call_next_of(&link);
                self.set_call_next(&func, after);
                self.set_call_next(&link, Some(func));
            }
            head => {
                self.set_call_next(&func, head);
                class
                    .table(is_static)
                    .borrow_mut()
                    .insert(name.to_string(), Value::Function(func));
            }
        }
    }

    /// Remove `func` from the slot's chain if it is already linked there
    fn unlink(&self, class: &Rc<Class>, name: &str, is_static: bool, func: &Rc<Function>) {
        let head = match class.own_member(name, is_static) {
            Some(Value::Function(head)) => head,
            _ => return,
        };

        if Rc::ptr_eq(&head, func) {
            let mut table = class.table(is_static).borrow_mut();
            match self.call_next_of(func) {
                Some(next) => {
                    table.insert(name.to_string(), Value::Function(next));
                }
                None => {
                    table.remove(name);
                }
            }
            return;
        }

        let links = self.chain_links(&head);
        for pair in links.windows(2) {
            if Rc::ptr_eq(&pair[1], func) {
                let after = self.call_next_of(func);
                self.set_call_next(&pair[0], after);
                return;
            }
        }
    }

    fn full_name_of_slot(&self, class: &Rc<Class>, name: &str, is_static: bool) -> String {
        match class.own_member(name, is_static) {
            Some(Value::Function(head)) => self.full_name(head.as_ref()),
            _ => format!("{}.{}", self.full_name(class.as_ref()), name),
        }
    }
}
