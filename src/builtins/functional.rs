// Function derivation
// bind, bind2, head, tail, returns, seal, tee. Each derived function
// records what it was made from; that record only feeds naming.

use smallvec::{smallvec, SmallVec};
use std::rc::Rc;

use crate::vm::meta::{Derivation, DerivationKind, MetaPatch};
use crate::vm::runtime::Runtime;
use crate::vm::value::{Function, Value};

impl Runtime {
    fn derive(
        &self,
        kind: DerivationKind,
        targets: SmallVec<[Rc<Function>; 2]>,
        func: Function,
    ) -> Rc<Function> {
        let func = Rc::new(func);
        self.add_meta(
            func.as_ref(),
            MetaPatch {
                derivation: Some(Derivation { kind, targets }),
                ..MetaPatch::default()
            },
        );
        func
    }

    /// Fixed receiver; `bound` goes before the call arguments
    pub fn bind(&self, target: &Rc<Function>, this: Value, bound: Vec<Value>) -> Rc<Function> {
        let inner = target.clone();
        self.derive(
            DerivationKind::Bind,
            smallvec![target.clone()],
            Function::anonymous(move |rt, _, args| {
                let mut all = bound.clone();
                all.extend_from_slice(args.as_slice());
                rt.call(&inner, &this, &all)
            }),
        )
    }

    /// Fixed receiver; `bound` goes after the call arguments
    pub fn bind2(&self, target: &Rc<Function>, this: Value, bound: Vec<Value>) -> Rc<Function> {
        let inner = target.clone();
        self.derive(
            DerivationKind::Bind2,
            smallvec![target.clone()],
            Function::anonymous(move |rt, _, args| {
                let mut all = args.as_slice().to_vec();
                all.extend_from_slice(&bound);
                rt.call(&inner, &this, &all)
            }),
        )
    }

    /// Run `pre` first, then `target`; the result is `target`'s
    pub fn head(&self, target: &Rc<Function>, pre: &Rc<Function>) -> Rc<Function> {
        let (inner, first) = (target.clone(), pre.clone());
        self.derive(
            DerivationKind::Head,
            smallvec![target.clone(), pre.clone()],
            Function::anonymous(move |rt, this, args| {
                rt.call(&first, this, args.as_slice())?;
                rt.call(&inner, this, args.as_slice())
            }),
        )
    }

    /// Run `target`, then `post`; the result is `target`'s
    pub fn tail(&self, target: &Rc<Function>, post: &Rc<Function>) -> Rc<Function> {
        let (inner, last) = (target.clone(), post.clone());
        self.derive(
            DerivationKind::Tail,
            smallvec![target.clone(), post.clone()],
            Function::anonymous(move |rt, this, args| {
                let result = rt.call(&inner, this, args.as_slice())?;
                rt.call(&last, this, args.as_slice())?;
                Ok(result)
            }),
        )
    }

    /// Run `target`, then answer `value`
    pub fn returns(&self, target: &Rc<Function>, value: Value) -> Rc<Function> {
        let inner = target.clone();
        self.derive(
            DerivationKind::Returns,
            smallvec![target.clone()],
            Function::anonymous(move |rt, this, args| {
                rt.call(&inner, this, args.as_slice())?;
                Ok(value.clone())
            }),
        )
    }

    /// Run `target` with no arguments, whatever the caller passed
    pub fn seal(&self, target: &Rc<Function>) -> Rc<Function> {
        let inner = target.clone();
        self.derive(
            DerivationKind::Seal,
            smallvec![target.clone()],
            Function::anonymous(move |rt, this, _| rt.call(&inner, this, &[])),
        )
    }

    /// Run `target`, then answer the first argument
    pub fn tee(&self, target: &Rc<Function>) -> Rc<Function> {
        let inner = target.clone();
        self.derive(
            DerivationKind::Tee,
            smallvec![target.clone()],
            Function::anonymous(move |rt, this, args| {
                rt.call(&inner, this, args.as_slice())?;
                Ok(args.get(0))
            }),
        )
    }
}
