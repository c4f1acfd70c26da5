use serde::{Deserialize, Serialize};

use crate::model::TypeRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Null,
    Str(String),
    Long(i64),
    /// A local binding or a method parameter.
    Local(String),
    /// A class-level constant of the generated type.
    Const(String),
    This,
    Concat(Vec<Expr>),
    InvokeStatic {
        owner: TypeRef,
        method: String,
        args: Vec<Expr>,
    },
    InvokeInstance {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Construct {
        ty: TypeRef,
        args: Vec<Expr>,
    },
    Field {
        target: Box<Expr>,
        name: String,
    },
}

impl Expr {
    pub fn local(name: impl Into<String>) -> Self {
        Expr::Local(name.into())
    }

    /// Pre-order walk over this expression and all nested expressions.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Null
            | Expr::Str(_)
            | Expr::Long(_)
            | Expr::Local(_)
            | Expr::Const(_)
            | Expr::This => {}
            Expr::Concat(args)
            | Expr::InvokeStatic { args, .. }
            | Expr::Construct { args, .. } => {
                for e in args {
                    e.walk(f);
                }
            }
            Expr::InvokeInstance { target, args, .. } => {
                target.walk(f);
                for e in args {
                    e.walk(f);
                }
            }
            Expr::Field { target, .. } => target.walk(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    DeclareLocal {
        name: String,
        ty: TypeRef,
        init: Expr,
    },
    /// An invocation evaluated for its side effect.
    Invoke(Expr),
    Assign {
        target: Expr,
        value: Expr,
    },
    /// Replace the stack trace of `target` with the frames after the first `drop_frames`.
    ///
    /// `scratch` names the local the backend may use to hold the captured trace.
    TrimStackTrace {
        target: Expr,
        drop_frames: usize,
        scratch: String,
    },
    Return(Expr),
}

impl Stmt {
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            Stmt::DeclareLocal { init, .. } => vec![init],
            Stmt::Invoke(e) | Stmt::Return(e) => vec![e],
            Stmt::Assign { target, value } => vec![target, value],
            Stmt::TrimStackTrace { target, .. } => vec![target],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBody {
    pub stmts: Vec<Stmt>,
}

impl GeneratedBody {
    /// Every expression node of the body, statements in order, each walked pre-order.
    pub fn all_exprs(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        for stmt in &self.stmts {
            for e in stmt.exprs() {
                e.walk(&mut |x| out.push(x));
            }
        }
        out
    }

    pub fn count_exprs(&self, pred: impl Fn(&Expr) -> bool) -> usize {
        self.all_exprs().into_iter().filter(|e| pred(*e)).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
}

impl Visibility {
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedParam {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedMethod {
    pub name: String,
    pub visibility: Visibility,
    pub params: Vec<GeneratedParam>,
    pub ret: TypeRef,
    pub thrown: Vec<TypeRef>,
    pub body: GeneratedBody,
}

/// A `private static final` class-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    pub init: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedType {
    pub package: Option<String>,
    pub name: String,
    pub implements: Vec<TypeRef>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<GeneratedMethod>,
    pub source_path: Option<String>,
    pub source_sha256: Option<String>,
}

impl GeneratedType {
    pub fn method(&self, name: &str) -> Option<&GeneratedMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}
