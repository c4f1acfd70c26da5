//! Statement sink the synthesizer writes into.
//!
//! The synthesizer only ever talks to a [`BodyBuilder`]; it never sees how a body is
//! finally rendered. [`BodyRecorder`] collects statements into a [`GeneratedBody`]
//! for the emission backends.

use crate::ir::{Expr, GeneratedBody, Stmt};
use crate::model::TypeRef;

pub trait BodyBuilder {
    /// Declares `name: ty = init` and returns a reference to the new local.
    fn declare_local(&mut self, name: &str, ty: &TypeRef, init: Expr) -> Expr;

    /// Evaluates `call` for its side effect.
    fn invoke(&mut self, call: Expr);

    fn assign(&mut self, target: Expr, value: Expr);

    fn trim_stack_trace(&mut self, target: Expr, drop_frames: usize, scratch: &str);

    fn return_value(&mut self, value: Expr);

    fn construct(&mut self, ty: &TypeRef, args: Vec<Expr>) -> Expr {
        Expr::Construct {
            ty: ty.clone(),
            args,
        }
    }

    fn invoke_static(&mut self, owner: &TypeRef, method: &str, args: Vec<Expr>) -> Expr {
        Expr::InvokeStatic {
            owner: owner.clone(),
            method: method.to_string(),
            args,
        }
    }

    fn invoke_instance(&mut self, target: Expr, method: &str, args: Vec<Expr>) -> Expr {
        Expr::InvokeInstance {
            target: Box::new(target),
            method: method.to_string(),
            args,
        }
    }
}

#[derive(Debug, Default)]
pub struct BodyRecorder {
    stmts: Vec<Stmt>,
}

impl BodyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> GeneratedBody {
        GeneratedBody { stmts: self.stmts }
    }
}

impl BodyBuilder for BodyRecorder {
    fn declare_local(&mut self, name: &str, ty: &TypeRef, init: Expr) -> Expr {
        self.stmts.push(Stmt::DeclareLocal {
            name: name.to_string(),
            ty: ty.clone(),
            init,
        });
        Expr::local(name)
    }

    fn invoke(&mut self, call: Expr) {
        self.stmts.push(Stmt::Invoke(call));
    }

    fn assign(&mut self, target: Expr, value: Expr) {
        self.stmts.push(Stmt::Assign { target, value });
    }

    fn trim_stack_trace(&mut self, target: Expr, drop_frames: usize, scratch: &str) {
        self.stmts.push(Stmt::TrimStackTrace {
            target,
            drop_frames,
            scratch: scratch.to_string(),
        });
    }

    fn return_value(&mut self, value: Expr) {
        self.stmts.push(Stmt::Return(value));
    }
}
