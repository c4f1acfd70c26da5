use anyhow::Result;
use msgsynth_contracts::GENERATED_SCHEMA_VERSION;
use serde_json::Value;

use crate::ir::{Expr, FieldDecl, GeneratedMethod, GeneratedType, Stmt};

pub fn emit_type(t: &GeneratedType) -> Result<String> {
    let v = emit_type_value(t);
    Ok(serde_json::to_string(&v)? + "\n")
}

fn emit_type_value(t: &GeneratedType) -> Value {
    let mut root = serde_json::Map::new();
    root.insert(
        "schema_version".to_string(),
        Value::String(GENERATED_SCHEMA_VERSION.to_string()),
    );
    root.insert("kind".to_string(), Value::String("type".to_string()));
    if let Some(pkg) = &t.package {
        root.insert("package".to_string(), Value::String(pkg.clone()));
    }
    root.insert("name".to_string(), Value::String(t.name.clone()));
    root.insert(
        "implements".to_string(),
        Value::Array(
            t.implements
                .iter()
                .map(|i| Value::String(i.to_string()))
                .collect(),
        ),
    );
    root.insert(
        "fields".to_string(),
        Value::Array(t.fields.iter().map(field_value).collect()),
    );
    root.insert(
        "methods".to_string(),
        Value::Array(t.methods.iter().map(method_value).collect()),
    );

    let mut meta = serde_json::Map::new();
    meta.insert(
        "generated_by".to_string(),
        Value::String("msgsynth".to_string()),
    );
    if let Some(src) = &t.source_path {
        meta.insert("source_path".to_string(), Value::String(src.clone()));
    }
    if let Some(sha) = &t.source_sha256 {
        meta.insert("source_sha256".to_string(), Value::String(sha.clone()));
    }
    root.insert("meta".to_string(), Value::Object(meta));

    Value::Object(root)
}

fn field_value(f: &FieldDecl) -> Value {
    let mut fm = serde_json::Map::new();
    fm.insert("name".to_string(), Value::String(f.name.clone()));
    fm.insert("ty".to_string(), Value::String(f.ty.to_string()));
    fm.insert("init".to_string(), expr_to_value(&f.init));
    Value::Object(fm)
}

fn method_value(m: &GeneratedMethod) -> Value {
    let mut decl = serde_json::Map::new();
    decl.insert("name".to_string(), Value::String(m.name.clone()));
    decl.insert(
        "visibility".to_string(),
        Value::String(m.visibility.keyword().to_string()),
    );
    decl.insert(
        "params".to_string(),
        Value::Array(
            m.params
                .iter()
                .map(|p| {
                    let mut pm = serde_json::Map::new();
                    pm.insert("name".to_string(), Value::String(p.name.clone()));
                    pm.insert("ty".to_string(), Value::String(p.ty.to_string()));
                    Value::Object(pm)
                })
                .collect(),
        ),
    );
    decl.insert("result".to_string(), Value::String(m.ret.to_string()));
    if !m.thrown.is_empty() {
        decl.insert(
            "throws".to_string(),
            Value::Array(m.thrown.iter().map(|t| Value::String(t.to_string())).collect()),
        );
    }
    decl.insert(
        "body".to_string(),
        Value::Array(m.body.stmts.iter().map(stmt_to_value).collect()),
    );
    Value::Object(decl)
}

fn head(name: &str, rest: impl IntoIterator<Item = Value>) -> Value {
    let mut items = vec![Value::String(name.to_string())];
    items.extend(rest);
    Value::Array(items)
}

fn stmt_to_value(s: &Stmt) -> Value {
    match s {
        Stmt::DeclareLocal { name, ty, init } => head(
            "let",
            [
                Value::String(name.clone()),
                Value::String(ty.to_string()),
                expr_to_value(init),
            ],
        ),
        Stmt::Invoke(e) => head("do", [expr_to_value(e)]),
        Stmt::Assign { target, value } => {
            head("set", [expr_to_value(target), expr_to_value(value)])
        }
        Stmt::TrimStackTrace {
            target,
            drop_frames,
            scratch,
        } => head(
            "trim_stack_trace",
            [
                expr_to_value(target),
                Value::Number((*drop_frames as u64).into()),
                Value::String(scratch.clone()),
            ],
        ),
        Stmt::Return(e) => head("return", [expr_to_value(e)]),
    }
}

fn expr_to_value(e: &Expr) -> Value {
    match e {
        Expr::Null => Value::Null,
        Expr::Str(s) => head("str", [Value::String(s.clone())]),
        Expr::Long(i) => head("long", [Value::Number((*i).into())]),
        Expr::Local(name) => head("local", [Value::String(name.clone())]),
        Expr::Const(name) => head("const", [Value::String(name.clone())]),
        Expr::This => head("this", Vec::new()),
        Expr::Concat(parts) => head("concat", parts.iter().map(expr_to_value)),
        Expr::InvokeStatic {
            owner,
            method,
            args,
        } => head(
            "invoke_static",
            [Value::String(owner.to_string()), Value::String(method.clone())]
                .into_iter()
                .chain(args.iter().map(expr_to_value)),
        ),
        Expr::InvokeInstance {
            target,
            method,
            args,
        } => head(
            "invoke",
            [expr_to_value(target), Value::String(method.clone())]
                .into_iter()
                .chain(args.iter().map(expr_to_value)),
        ),
        Expr::Construct { ty, args } => head(
            "new",
            std::iter::once(Value::String(ty.to_string())).chain(args.iter().map(expr_to_value)),
        ),
        Expr::Field { target, name } => {
            head("field", [expr_to_value(target), Value::String(name.clone())])
        }
    }
}
