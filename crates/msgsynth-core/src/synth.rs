//! Method body synthesis and the per-type builder context.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};

use crate::builder::{BodyBuilder, BodyRecorder};
use crate::config::GenerationConfig;
use crate::construction::{bind_construction, select_strategy, ConstructionStrategy};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::format_expr::FormatExpressionBuilder;
use crate::ir::{
    Expr, FieldDecl, GeneratedBody, GeneratedMethod, GeneratedParam, GeneratedType, Stmt,
    Visibility,
};
use crate::message_id::MessageIdFormatter;
use crate::model::{MessageInterface, MethodDescriptor, ParamRole, ReturnKind, TypeRef};

/// Frames dropped from every constructed exception: the call into the generated method.
pub const SYNTHETIC_FRAMES: usize = 1;

/// What the synthesizer decided for one method, alongside the statements it emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub strategy: Option<ConstructionStrategy>,
}

pub struct MethodBodySynthesizer<'a> {
    format: FormatExpressionBuilder<'a>,
}

impl<'a> MethodBodySynthesizer<'a> {
    pub fn new(id_formatter: &'a dyn MessageIdFormatter, project_code: &'a str) -> Self {
        MethodBodySynthesizer {
            format: FormatExpressionBuilder::new(id_formatter, project_code),
        }
    }

    /// Writes the body of `method` into `b`. `accessor` names the raw message-text accessor.
    pub fn synthesize<B: BodyBuilder>(
        &self,
        b: &mut B,
        method: &MethodDescriptor,
        accessor: &str,
    ) -> Result<SynthesisOutcome> {
        validate(method)?;
        let ret = &method.return_type;
        let result_name = fresh_local("result", method, &[]);

        let desc = match &ret.kind {
            ReturnKind::Value => {
                let value = self.format.build(b, method, accessor);
                let result = b.declare_local(&result_name, &ret.ty, value);
                b.return_value(result);
                return Ok(SynthesisOutcome { strategy: None });
            }
            ReturnKind::Throwable(desc) => desc,
        };

        let message = if method.params.is_empty() {
            self.format.message_text(b, method, accessor)
        } else {
            self.format.build(b, method, accessor)
        };
        let msg_name = fresh_local("msg", method, &[&result_name]);
        let message = b.declare_local(&msg_name, &TypeRef::string(), message);

        let strategy = select_strategy(desc, method.cause().is_some());
        tracing::debug!(
            method = %method.name,
            rule = strategy.rule(),
            ?strategy,
            "selected construction strategy"
        );
        let construction = bind_construction(strategy, desc, method, message)?;

        let init = b.construct(&ret.ty, construction.args);
        let result = b.declare_local(&result_name, &ret.ty, init);
        if let Some(cause) = construction.init_cause {
            let call = b.invoke_instance(result.clone(), "initCause", vec![cause]);
            b.invoke(call);
        }

        for param in &method.params {
            let Some(target) = param.target_name() else {
                continue;
            };
            let value = Expr::local(&param.name);
            match param.role {
                ParamRole::FieldTarget { .. } => {
                    let field = Expr::Field {
                        target: Box::new(result.clone()),
                        name: target,
                    };
                    b.assign(field, value);
                }
                _ => {
                    let call = b.invoke_instance(result.clone(), &target, vec![value]);
                    b.invoke(call);
                }
            }
        }

        let scratch = fresh_local("st", method, &[&result_name, &msg_name]);
        b.trim_stack_trace(result.clone(), SYNTHETIC_FRAMES, &scratch);
        b.return_value(result);
        Ok(SynthesisOutcome {
            strategy: Some(strategy),
        })
    }
}

/// Synthesizes a standalone body for `method`.
pub fn synthesize_body(
    method: &MethodDescriptor,
    accessor: &str,
    id_formatter: &dyn MessageIdFormatter,
    project_code: &str,
) -> Result<GeneratedBody> {
    let mut b = BodyRecorder::new();
    MethodBodySynthesizer::new(id_formatter, project_code).synthesize(&mut b, method, accessor)?;
    Ok(b.finish())
}

fn validate(method: &MethodDescriptor) -> Result<()> {
    let mut seen = BTreeSet::new();
    for p in &method.params {
        if !seen.insert(p.name.as_str()) {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0401DuplicateParamName,
                format!("parameter {:?} declared twice", p.name),
            )
            .at(&method.name)
            .into());
        }
    }
    let causes = method
        .params
        .iter()
        .filter(|p| p.role == ParamRole::Cause)
        .count();
    if causes > 1 {
        return Err(Diagnostic::error(
            DiagnosticCode::MSG0202MultipleCauses,
            format!("{causes} parameters are marked as cause"),
        )
        .at(&method.name)
        .into());
    }

    let slots: BTreeSet<&str> = match &method.return_type.kind {
        ReturnKind::Throwable(desc) => desc
            .construction_params
            .iter()
            .flatten()
            .filter(|slot| !slot.is_message)
            .map(|slot| slot.name.as_str())
            .collect(),
        ReturnKind::Value => BTreeSet::new(),
    };
    if let Some(p) = method
        .params
        .iter()
        .find(|p| p.role == ParamRole::MessageBound && !slots.contains(p.name.as_str()))
    {
        return Err(Diagnostic::error(
            DiagnosticCode::MSG0403UnboundMessageParam,
            format!(
                "parameter {:?} is not named by any construction slot of {}",
                p.name, method.return_type.ty
            ),
        )
        .at(&method.name)
        .into());
    }
    Ok(())
}

/// `base`, or `base` with trailing underscores until it clashes with no parameter
/// and no name in `taken`.
fn fresh_local(base: &str, method: &MethodDescriptor, taken: &[&str]) -> String {
    let mut name = base.to_string();
    while method.param(&name).is_some() || taken.contains(&name.as_str()) {
        name.push('_');
    }
    name
}

/// Builder context for one generated type. Methods added to the same context share the
/// class-level declarations (serial version field, message constants, accessors).
pub struct TypeContext<'a> {
    interface: &'a MessageInterface,
    config: &'a GenerationConfig,
    ty: GeneratedType,
    /// message constant name -> text it was declared with
    constants: BTreeMap<String, String>,
}

impl<'a> TypeContext<'a> {
    pub fn new(interface: &'a MessageInterface, config: &'a GenerationConfig) -> Self {
        let ty = GeneratedType {
            package: interface.package.clone(),
            name: format!("{}{}", interface.name, config.impl_suffix),
            implements: vec![
                TypeRef::new(interface.qualified_name()),
                TypeRef::new("java.io.Serializable"),
            ],
            fields: vec![FieldDecl {
                name: "serialVersionUID".to_string(),
                ty: TypeRef::new("long"),
                init: Expr::Long(config.serial_version_uid),
            }],
            methods: Vec::new(),
            source_path: interface.source_path.clone(),
            source_sha256: interface.source_sha256.clone(),
        };
        TypeContext {
            interface,
            config,
            ty,
            constants: BTreeMap::new(),
        }
    }

    pub fn add_method(&mut self, method: &MethodDescriptor) -> Result<SynthesisOutcome> {
        let subject = format!("{}.{}", self.interface.name, method.name);
        let accessor = self
            .message_accessor(method)
            .map_err(|err| attach_subject(err, &subject))?;

        let project_code = self.interface.project_code.as_deref().unwrap_or("");
        let synth = MethodBodySynthesizer::new(&self.config.id_format, project_code);
        let mut b = BodyRecorder::new();
        let outcome = synth
            .synthesize(&mut b, method, &accessor)
            .map_err(|err| attach_subject(err, &subject))?;
        let body = b.finish();
        tracing::trace!(method = %subject, stmts = body.stmts.len(), "synthesized body");

        self.ty.methods.push(GeneratedMethod {
            name: method.name.clone(),
            visibility: Visibility::Public,
            params: method
                .params
                .iter()
                .map(|p| GeneratedParam {
                    name: p.name.clone(),
                    ty: p.ty.clone(),
                })
                .collect(),
            ret: method.return_type.ty.clone(),
            thrown: method.thrown.clone(),
            body,
        });
        Ok(outcome)
    }

    /// Declares the message constant and its accessor on first use; overloads share them
    /// and must agree on the text.
    fn message_accessor(&mut self, method: &MethodDescriptor) -> Result<String> {
        let accessor = format!("{}$str", method.name);
        if let Some(text) = self.constants.get(&method.name) {
            if *text != method.message.text {
                return Err(Diagnostic::error(
                    DiagnosticCode::MSG0402ConflictingOverloadText,
                    format!(
                        "overload declares {:?} but an earlier overload declared {text:?}",
                        method.message.text
                    ),
                )
                .into());
            }
            return Ok(accessor);
        }
        self.constants
            .insert(method.name.clone(), method.message.text.clone());
        self.ty.fields.push(FieldDecl {
            name: method.name.clone(),
            ty: TypeRef::string(),
            init: Expr::Str(method.message.text.clone()),
        });
        self.ty.methods.push(GeneratedMethod {
            name: accessor.clone(),
            visibility: Visibility::Protected,
            params: Vec::new(),
            ret: TypeRef::string(),
            thrown: Vec::new(),
            body: GeneratedBody {
                stmts: vec![Stmt::Return(Expr::Const(method.name.clone()))],
            },
        });
        Ok(accessor)
    }

    pub fn finish(self) -> GeneratedType {
        self.ty
    }
}

fn attach_subject(err: anyhow::Error, subject: &str) -> anyhow::Error {
    match err.downcast::<Diagnostic>() {
        Ok(d) if d.subject.is_none() => d.at(subject).into(),
        Ok(d) => d.into(),
        Err(err) => err.context(format!("synthesize {subject}")),
    }
}

/// Synthesizes every method of `interface` into one generated type, in declaration order.
pub fn synthesize_interface(
    interface: &MessageInterface,
    config: &GenerationConfig,
) -> Result<GeneratedType> {
    let mut cx = TypeContext::new(interface, config);
    for method in &interface.methods {
        cx.add_method(method)?;
    }
    tracing::debug!(
        interface = %interface.qualified_name(),
        methods = interface.methods.len(),
        "synthesized type"
    );
    Ok(cx.finish())
}

/// Synthesizes each interface independently; distinct types share no state.
pub fn synthesize_all(
    interfaces: &[MessageInterface],
    config: &GenerationConfig,
) -> Result<Vec<GeneratedType>> {
    interfaces
        .iter()
        .map(|i| {
            synthesize_interface(i, config)
                .with_context(|| format!("synthesize {}", i.qualified_name()))
        })
        .collect()
}
