use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Parse,
    Validate,
    Resolve,
    Synthesize,
    Emit,
    Config,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    MSG0001ParseError,
    MSG0110UnsupportedMethodSig,
    MSG0111UnsupportedParamPattern,
    MSG0120UnsupportedType,
    MSG0200MissingMessage,
    MSG0201InvalidAttribute,
    MSG0202MultipleCauses,
    MSG0203InheritedIdNotFound,
    MSG0300UnresolvedReturnType,
    MSG0301DuplicateConstructionParams,
    MSG0400UnknownConstructionParam,
    MSG0401DuplicateParamName,
    MSG0402ConflictingOverloadText,
    MSG0403UnboundMessageParam,
    MSG0500ConfigSchemaMismatch,
    MSG0501ConfigValueOutOfRange,
    MSG0600ReservedIdentifier,
    MSG0901InternalBug,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::MSG0001ParseError => "MSG0001",
            DiagnosticCode::MSG0110UnsupportedMethodSig => "MSG0110",
            DiagnosticCode::MSG0111UnsupportedParamPattern => "MSG0111",
            DiagnosticCode::MSG0120UnsupportedType => "MSG0120",
            DiagnosticCode::MSG0200MissingMessage => "MSG0200",
            DiagnosticCode::MSG0201InvalidAttribute => "MSG0201",
            DiagnosticCode::MSG0202MultipleCauses => "MSG0202",
            DiagnosticCode::MSG0203InheritedIdNotFound => "MSG0203",
            DiagnosticCode::MSG0300UnresolvedReturnType => "MSG0300",
            DiagnosticCode::MSG0301DuplicateConstructionParams => "MSG0301",
            DiagnosticCode::MSG0400UnknownConstructionParam => "MSG0400",
            DiagnosticCode::MSG0401DuplicateParamName => "MSG0401",
            DiagnosticCode::MSG0402ConflictingOverloadText => "MSG0402",
            DiagnosticCode::MSG0403UnboundMessageParam => "MSG0403",
            DiagnosticCode::MSG0500ConfigSchemaMismatch => "MSG0500",
            DiagnosticCode::MSG0501ConfigValueOutOfRange => "MSG0501",
            DiagnosticCode::MSG0600ReservedIdentifier => "MSG0600",
            DiagnosticCode::MSG0901InternalBug => "MSG0901",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            DiagnosticCode::MSG0001ParseError => Phase::Parse,
            DiagnosticCode::MSG0110UnsupportedMethodSig
            | DiagnosticCode::MSG0111UnsupportedParamPattern
            | DiagnosticCode::MSG0120UnsupportedType
            | DiagnosticCode::MSG0200MissingMessage
            | DiagnosticCode::MSG0201InvalidAttribute
            | DiagnosticCode::MSG0202MultipleCauses => Phase::Validate,
            DiagnosticCode::MSG0203InheritedIdNotFound
            | DiagnosticCode::MSG0300UnresolvedReturnType
            | DiagnosticCode::MSG0301DuplicateConstructionParams => Phase::Resolve,
            DiagnosticCode::MSG0400UnknownConstructionParam
            | DiagnosticCode::MSG0401DuplicateParamName
            | DiagnosticCode::MSG0402ConflictingOverloadText
            | DiagnosticCode::MSG0403UnboundMessageParam => Phase::Synthesize,
            DiagnosticCode::MSG0500ConfigSchemaMismatch
            | DiagnosticCode::MSG0501ConfigValueOutOfRange => Phase::Config,
            DiagnosticCode::MSG0600ReservedIdentifier => Phase::Emit,
            DiagnosticCode::MSG0901InternalBug => Phase::Internal,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::MSG0001ParseError => "failed to parse source file",
            DiagnosticCode::MSG0110UnsupportedMethodSig => "unsupported message method signature",
            DiagnosticCode::MSG0111UnsupportedParamPattern => "unsupported parameter pattern",
            DiagnosticCode::MSG0120UnsupportedType => "unsupported type",
            DiagnosticCode::MSG0200MissingMessage => "message method has no #[message] attribute",
            DiagnosticCode::MSG0201InvalidAttribute => "invalid attribute",
            DiagnosticCode::MSG0202MultipleCauses => "more than one cause parameter",
            DiagnosticCode::MSG0203InheritedIdNotFound => "inherited message id not found",
            DiagnosticCode::MSG0300UnresolvedReturnType => "exception return type cannot be resolved",
            DiagnosticCode::MSG0301DuplicateConstructionParams => {
                "exception type declares more than one construction parameter list"
            }
            DiagnosticCode::MSG0400UnknownConstructionParam => {
                "construction parameter names an absent method parameter"
            }
            DiagnosticCode::MSG0401DuplicateParamName => "duplicate parameter name",
            DiagnosticCode::MSG0402ConflictingOverloadText => {
                "overloads of one method name declare different message text"
            }
            DiagnosticCode::MSG0403UnboundMessageParam => {
                "#[param] parameter is not consumed by any construction slot"
            }
            DiagnosticCode::MSG0500ConfigSchemaMismatch => "config schema_version mismatch",
            DiagnosticCode::MSG0501ConfigValueOutOfRange => "config value out of range",
            DiagnosticCode::MSG0600ReservedIdentifier => "identifier is reserved in the target language",
            DiagnosticCode::MSG0901InternalBug => "internal msgsynth bug",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::MSG0001ParseError => {
                Some("Ensure the file parses as Rust and message traits use only supported attributes.")
            }
            DiagnosticCode::MSG0203InheritedIdNotFound => Some(
                "`id = inherit` needs a same-named method with an explicit id on a supertrait declared in the same file.",
            ),
            DiagnosticCode::MSG0300UnresolvedReturnType => Some(
                "Declare the type with #[exception(constructors(...))] or add it to the config `exceptions` catalog.",
            ),
            DiagnosticCode::MSG0400UnknownConstructionParam => Some(
                "Every non-message slot of `construct(...)` must match a parameter name of the method.",
            ),
            DiagnosticCode::MSG0402ConflictingOverloadText => Some(
                "Overloads share one message constant; give them the same text or distinct names.",
            ),
            DiagnosticCode::MSG0403UnboundMessageParam => Some(
                "Name the parameter in the return type's `construct(...)` list or drop the #[param] attribute.",
            ),
            DiagnosticCode::MSG0600ReservedIdentifier => {
                Some("Rename the method or parameter; Java keywords cannot be used as names.")
            }
            DiagnosticCode::MSG0901InternalBug => {
                Some("This is a bug in msgsynth. Please report it with the input source file.")
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub phase: Phase,
    pub severity: Severity,
    pub message: String,
    /// `Interface.method` the diagnostic was raised for, when known.
    pub subject: Option<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            phase: code.phase(),
            severity: Severity::Error,
            message: message.into(),
            subject: None,
            help: code.default_help().map(|s| s.to_string()),
        }
    }

    pub fn at(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {:?}: {}",
            self.code.code_str(),
            self.phase,
            self.severity,
            self.message
        )?;
        if let Some(subject) = &self.subject {
            write!(f, " (at {subject})")?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Returns the diagnostic carried by an error chain, if any.
pub fn find_diagnostic(err: &anyhow::Error) -> Option<&Diagnostic> {
    err.chain().find_map(|e| e.downcast_ref::<Diagnostic>())
}

pub fn render_diagnostics_md() -> String {
    let mut rows: Vec<(String, Phase, String, String)> = all_codes()
        .iter()
        .map(|&code| {
            (
                code.code_str().to_string(),
                code.phase(),
                code.default_message().to_string(),
                code.default_help().unwrap_or("").to_string(),
            )
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    out.push_str("# msgsynth diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/msgsynth-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Phase | Severity | Message | Help |\n");
    out.push_str("| ---- | ----- | -------- | ------- | ---- |\n");
    for (code, phase, msg, help) in rows {
        out.push_str(&format!(
            "| {code} | {phase:?} | {:?} | {msg} | {help} |\n",
            Severity::Error
        ));
    }
    out
}

fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::MSG0001ParseError,
        DiagnosticCode::MSG0110UnsupportedMethodSig,
        DiagnosticCode::MSG0111UnsupportedParamPattern,
        DiagnosticCode::MSG0120UnsupportedType,
        DiagnosticCode::MSG0200MissingMessage,
        DiagnosticCode::MSG0201InvalidAttribute,
        DiagnosticCode::MSG0202MultipleCauses,
        DiagnosticCode::MSG0203InheritedIdNotFound,
        DiagnosticCode::MSG0300UnresolvedReturnType,
        DiagnosticCode::MSG0301DuplicateConstructionParams,
        DiagnosticCode::MSG0400UnknownConstructionParam,
        DiagnosticCode::MSG0401DuplicateParamName,
        DiagnosticCode::MSG0402ConflictingOverloadText,
        DiagnosticCode::MSG0403UnboundMessageParam,
        DiagnosticCode::MSG0500ConfigSchemaMismatch,
        DiagnosticCode::MSG0501ConfigValueOutOfRange,
        DiagnosticCode::MSG0600ReservedIdentifier,
        DiagnosticCode::MSG0901InternalBug,
    ]
}
