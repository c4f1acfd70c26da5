//! Renders a [`GeneratedType`] as Java source.
//!
//! Types are written exactly as named in the IR, so the output needs no imports.

use std::fmt::Write as _;

use anyhow::Result;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::ir::{Expr, GeneratedMethod, GeneratedType, Stmt};

const INDENT: &str = "    ";

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
    "throw", "throws", "transient", "true", "try", "void", "volatile", "while", "_",
];

pub fn emit_type(t: &GeneratedType) -> Result<String> {
    check_identifiers(t)?;

    let mut out = String::new();
    out.push_str("// Generated by msgsynth. Do not edit.\n");
    if let Some(src) = &t.source_path {
        let _ = writeln!(out, "// source: {src}");
    }
    if let Some(sha) = &t.source_sha256 {
        let _ = writeln!(out, "// source sha256: {sha}");
    }
    out.push('\n');
    if let Some(pkg) = t.package.as_deref().filter(|p| !p.is_empty()) {
        let _ = writeln!(out, "package {pkg};\n");
    }

    let implements: Vec<&str> = t.implements.iter().map(|i| i.as_str()).collect();
    let _ = write!(out, "public class {}", t.name);
    if !implements.is_empty() {
        let _ = write!(out, " implements {}", implements.join(", "));
    }
    out.push_str(" {\n");

    for f in &t.fields {
        let init = expr(&f.init);
        let _ = writeln!(out, "{INDENT}private static final {} {} = {init};", f.ty, f.name);
    }

    for m in &t.methods {
        out.push('\n');
        method(&mut out, m);
    }
    out.push_str("}\n");
    Ok(out)
}

fn method(out: &mut String, m: &GeneratedMethod) {
    let params: Vec<String> = m
        .params
        .iter()
        .map(|p| format!("final {} {}", p.ty, p.name))
        .collect();
    let _ = write!(
        out,
        "{INDENT}{} {} {}({})",
        m.visibility.keyword(),
        m.ret,
        m.name,
        params.join(", ")
    );
    if !m.thrown.is_empty() {
        let thrown: Vec<&str> = m.thrown.iter().map(|t| t.as_str()).collect();
        let _ = write!(out, " throws {}", thrown.join(", "));
    }
    out.push_str(" {\n");
    for s in &m.body.stmts {
        stmt(out, s);
    }
    let _ = writeln!(out, "{INDENT}}}");
}

fn stmt(out: &mut String, s: &Stmt) {
    let pad = INDENT.repeat(2);
    match s {
        Stmt::DeclareLocal { name, ty, init } => {
            let _ = writeln!(out, "{pad}final {ty} {name} = {};", expr(init));
        }
        Stmt::Invoke(e) => {
            let _ = writeln!(out, "{pad}{};", expr(e));
        }
        Stmt::Assign { target, value } => {
            let _ = writeln!(out, "{pad}{} = {};", expr(target), expr(value));
        }
        Stmt::TrimStackTrace {
            target,
            drop_frames,
            scratch,
        } => {
            let target = expr(target);
            let _ = writeln!(
                out,
                "{pad}final StackTraceElement[] {scratch} = {target}.getStackTrace();"
            );
            let _ = writeln!(
                out,
                "{pad}{target}.setStackTrace(java.util.Arrays.copyOfRange({scratch}, {drop_frames}, {scratch}.length));"
            );
        }
        Stmt::Return(e) => {
            let _ = writeln!(out, "{pad}return {};", expr(e));
        }
    }
}

fn expr(e: &Expr) -> String {
    match e {
        Expr::Null => "null".to_string(),
        Expr::Str(s) => quote(s),
        Expr::Long(i) => format!("{i}L"),
        Expr::Local(name) | Expr::Const(name) => name.clone(),
        Expr::This => "this".to_string(),
        Expr::Concat(parts) => parts.iter().map(expr).collect::<Vec<_>>().join(" + "),
        Expr::InvokeStatic {
            owner,
            method,
            args,
        } => format!("{owner}.{method}({})", args_list(args)),
        Expr::InvokeInstance {
            target,
            method,
            args,
        } => match target.as_ref() {
            Expr::This => format!("{method}({})", args_list(args)),
            t => format!("{}.{method}({})", expr(t), args_list(args)),
        },
        Expr::Construct { ty, args } => format!("new {ty}({})", args_list(args)),
        Expr::Field { target, name } => format!("{}.{name}", expr(target)),
    }
}

fn args_list(args: &[Expr]) -> String {
    args.iter().map(expr).collect::<Vec<_>>().join(", ")
}

/// Java string literal for `s`.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn check_identifiers(t: &GeneratedType) -> Result<()> {
    for m in &t.methods {
        let names = std::iter::once(&m.name).chain(m.params.iter().map(|p| &p.name));
        for name in names {
            if RESERVED.contains(&name.as_str()) {
                return Err(Diagnostic::error(
                    DiagnosticCode::MSG0600ReservedIdentifier,
                    format!("`{name}` is a Java keyword"),
                )
                .at(format!("{}.{}", t.name, m.name))
                .into());
            }
        }
    }
    Ok(())
}
