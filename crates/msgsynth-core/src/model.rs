//! Normalized descriptors of message interfaces and their methods.
//!
//! Descriptors are produced by an extraction front-end (see [`crate::rust`]) or handed
//! over as JSON by an external collaborator, and are never mutated afterwards. Every
//! capability the synthesizer inspects (constructor shapes, target names, resolved ids)
//! is already attached here; synthesis performs no lookups of its own.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use msgsynth_contracts::DESCRIPTORS_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticCode};

/// A type as it is named in the generated artifact (`String`, `java.io.IOException`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last dotted segment: `java.lang.String` -> `String`.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn string() -> Self {
        TypeRef::new("String")
    }

    pub fn is_string(&self) -> bool {
        matches!(self.0.as_str(), "String" | "java.lang.String")
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Selects the static function that substitutes parameters into the message text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    #[default]
    MessageFormat,
    Printf,
    NoFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatFunction {
    pub owner: &'static str,
    pub method: &'static str,
}

impl FormatKind {
    pub fn function(self) -> FormatFunction {
        match self {
            FormatKind::MessageFormat => FormatFunction {
                owner: "java.text.MessageFormat",
                method: "format",
            },
            FormatKind::Printf => FormatFunction {
                owner: "String",
                method: "format",
            },
            FormatKind::NoFormat => FormatFunction {
                owner: "String",
                method: "valueOf",
            },
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "message_format" => Some(FormatKind::MessageFormat),
            "printf" => Some(FormatKind::Printf),
            "no_format" => Some(FormatKind::NoFormat),
            _ => None,
        }
    }
}

/// How a parameter participates in the generated body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ParamRole {
    FormatArgument,
    Cause,
    /// Bound to a construction slot of the returned exception; never formatted.
    MessageBound,
    FieldTarget {
        #[serde(rename = "target", default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    PropertyTarget {
        #[serde(rename = "target", default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub ty: TypeRef,
    #[serde(flatten)]
    pub role: ParamRole,
    /// Adapter constructed around the argument before it is handed to the format function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<TypeRef>,
}

impl ParameterDescriptor {
    pub fn format_arg(name: impl Into<String>, ty: impl Into<String>) -> Self {
        ParameterDescriptor {
            name: name.into(),
            ty: TypeRef::new(ty),
            role: ParamRole::FormatArgument,
            formatter: None,
        }
    }

    pub fn with_role(mut self, role: ParamRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(TypeRef::new(formatter));
        self
    }

    pub fn is_format_arg(&self) -> bool {
        matches!(self.role, ParamRole::FormatArgument)
    }

    /// Field or setter name on the returned exception for target parameters.
    ///
    /// Fields use the explicit name or the parameter's own name; properties use
    /// `set` + capitalize(explicit name or parameter name).
    pub fn target_name(&self) -> Option<String> {
        match &self.role {
            ParamRole::FieldTarget { name } => {
                Some(name.clone().unwrap_or_else(|| self.name.clone()))
            }
            ParamRole::PropertyTarget { name } => {
                let base = name.as_deref().unwrap_or(&self.name);
                Some(format!("set{}", capitalize(base)))
            }
            _ => None,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub text: String,
    /// Final id; inheritance is resolved before descriptors reach the synthesizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inherits_id: bool,
    #[serde(default)]
    pub format: FormatKind,
}

impl MessageDescriptor {
    pub fn new(text: impl Into<String>) -> Self {
        MessageDescriptor {
            text: text.into(),
            id: None,
            inherits_id: false,
            format: FormatKind::default(),
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_format(mut self, format: FormatKind) -> Self {
        self.format = format;
        self
    }
}

/// One constructor signature an exception type may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructorShape {
    /// `(String)`
    String,
    /// `(String, Throwable)`
    StringThrowable,
    /// `(Throwable, String)`
    ThrowableString,
    /// `(Throwable)`
    Throwable,
}

impl ConstructorShape {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "string" => Some(ConstructorShape::String),
            "string_throwable" => Some(ConstructorShape::StringThrowable),
            "throwable_string" => Some(ConstructorShape::ThrowableString),
            "throwable" => Some(ConstructorShape::Throwable),
            _ => None,
        }
    }
}

/// Precomputed set of constructor shapes; the no-argument constructor is always assumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstructorShapes(BTreeSet<ConstructorShape>);

impl ConstructorShapes {
    pub fn none() -> Self {
        ConstructorShapes::default()
    }

    pub fn has(&self, shape: ConstructorShape) -> bool {
        self.0.contains(&shape)
    }

    pub fn insert(&mut self, shape: ConstructorShape) {
        self.0.insert(shape);
    }

    pub fn iter(&self) -> impl Iterator<Item = ConstructorShape> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ConstructorShape> for ConstructorShapes {
    fn from_iter<I: IntoIterator<Item = ConstructorShape>>(iter: I) -> Self {
        ConstructorShapes(iter.into_iter().collect())
    }
}

/// One slot of an explicit construction-parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionParam {
    pub name: String,
    /// The slot receives the formatted message instead of a method parameter.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_message: bool,
}

impl ConstructionParam {
    pub fn message(name: impl Into<String>) -> Self {
        ConstructionParam {
            name: name.into(),
            is_message: true,
        }
    }

    pub fn param(name: impl Into<String>) -> Self {
        ConstructionParam {
            name: name.into(),
            is_message: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowableReturnDescriptor {
    #[serde(default)]
    pub constructors: ConstructorShapes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction_params: Option<Vec<ConstructionParam>>,
}

impl ThrowableReturnDescriptor {
    pub fn with_shapes(shapes: impl IntoIterator<Item = ConstructorShape>) -> Self {
        ThrowableReturnDescriptor {
            constructors: shapes.into_iter().collect(),
            construction_params: None,
        }
    }

    pub fn with_construction_params(mut self, params: Vec<ConstructionParam>) -> Self {
        self.construction_params = Some(params);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReturnKind {
    Value,
    Throwable(ThrowableReturnDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnDescriptor {
    pub ty: TypeRef,
    #[serde(flatten)]
    pub kind: ReturnKind,
}

impl ReturnDescriptor {
    pub fn value(ty: impl Into<String>) -> Self {
        ReturnDescriptor {
            ty: TypeRef::new(ty),
            kind: ReturnKind::Value,
        }
    }

    pub fn throwable(ty: impl Into<String>, desc: ThrowableReturnDescriptor) -> Self {
        ReturnDescriptor {
            ty: TypeRef::new(ty),
            kind: ReturnKind::Throwable(desc),
        }
    }

    pub fn throwable_descriptor(&self) -> Option<&ThrowableReturnDescriptor> {
        match &self.kind {
            ReturnKind::Throwable(d) => Some(d),
            ReturnKind::Value => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParameterDescriptor>,
    pub return_type: ReturnDescriptor,
    pub message: MessageDescriptor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thrown: Vec<TypeRef>,
}

impl MethodDescriptor {
    pub fn cause(&self) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.role == ParamRole::Cause)
    }

    pub fn format_args(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.params.iter().filter(|p| p.is_format_arg())
    }

    pub fn param(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInterface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_code: Option<String>,
    pub methods: Vec<MethodDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
}

impl MessageInterface {
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(pkg) if !pkg.is_empty() => format!("{pkg}.{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Descriptor hand-over document for external extraction collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorDocument {
    pub schema_version: String,
    pub interfaces: Vec<MessageInterface>,
}

impl DescriptorDocument {
    pub fn new(interfaces: Vec<MessageInterface>) -> Self {
        DescriptorDocument {
            schema_version: DESCRIPTORS_SCHEMA_VERSION.to_string(),
            interfaces,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: DescriptorDocument =
            serde_json::from_slice(bytes).context("parse descriptor JSON")?;
        if doc.schema_version.trim() != DESCRIPTORS_SCHEMA_VERSION {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0500ConfigSchemaMismatch,
                format!(
                    "descriptor schema_version mismatch: expected {DESCRIPTORS_SCHEMA_VERSION} got {:?}",
                    doc.schema_version
                ),
            )
            .into());
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)? + "\n")
    }
}
