//! Chooses how an exception return value is constructed.
//!
//! The choice is a pure function of the return type's precomputed constructor shapes
//! and whether the method has a cause parameter. [`select_strategy`] encodes the
//! priority chain as a single ordered match; the first arm that applies wins.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::ir::Expr;
use crate::model::{ConstructorShape, MethodDescriptor, ThrowableReturnDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionStrategy {
    /// `new T(<declared slots>)`
    ConstructionParams,
    /// `new T(message, cause)`
    MessageAndCause,
    /// `new T(cause, message)`
    CauseAndMessage,
    /// `new T(message)`, then `initCause(cause)` when a cause is present.
    MessageOnly,
    /// `new T(cause)`; the message is discarded.
    CauseOnly,
    /// `new T(message, null)`
    MessageAndNullCause,
    /// `new T(null, message)`
    NullCauseAndMessage,
    /// `new T()`, then `initCause(cause)`; the message is discarded.
    NoArgThenInitCause,
    /// `new T()`; the message is discarded.
    NoArg,
}

impl ConstructionStrategy {
    /// Position in the priority chain, 1 (highest) to 9.
    pub fn rule(self) -> u8 {
        match self {
            ConstructionStrategy::ConstructionParams => 1,
            ConstructionStrategy::MessageAndCause => 2,
            ConstructionStrategy::CauseAndMessage => 3,
            ConstructionStrategy::MessageOnly => 4,
            ConstructionStrategy::CauseOnly => 5,
            ConstructionStrategy::MessageAndNullCause => 6,
            ConstructionStrategy::NullCauseAndMessage => 7,
            ConstructionStrategy::NoArgThenInitCause => 8,
            ConstructionStrategy::NoArg => 9,
        }
    }

    /// False when the formatted message never reaches the constructor.
    pub fn uses_message(self) -> bool {
        !matches!(
            self,
            ConstructionStrategy::CauseOnly
                | ConstructionStrategy::NoArgThenInitCause
                | ConstructionStrategy::NoArg
        )
    }
}

pub fn select_strategy(desc: &ThrowableReturnDescriptor, has_cause: bool) -> ConstructionStrategy {
    use ConstructorShape::{String, StringThrowable, Throwable, ThrowableString};
    use ConstructionStrategy::*;

    let has = |shape| desc.constructors.has(shape);
    match (&desc.construction_params, has_cause) {
        (Some(_), _) => ConstructionParams,
        (None, true) if has(StringThrowable) => MessageAndCause,
        (None, true) if has(ThrowableString) => CauseAndMessage,
        (None, _) if has(String) => MessageOnly,
        (None, true) if has(Throwable) => CauseOnly,
        (None, false) if has(StringThrowable) => MessageAndNullCause,
        (None, false) if has(ThrowableString) => NullCauseAndMessage,
        (None, true) => NoArgThenInitCause,
        (None, false) => NoArg,
    }
}

/// Constructor arguments plus the cause to attach after construction, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Construction {
    pub strategy: ConstructionStrategy,
    pub args: Vec<Expr>,
    pub init_cause: Option<Expr>,
}

/// Binds `message` and the method's cause parameter to the selected strategy.
pub fn bind_construction(
    strategy: ConstructionStrategy,
    desc: &ThrowableReturnDescriptor,
    method: &MethodDescriptor,
    message: Expr,
) -> Result<Construction> {
    let cause = method.cause().map(|p| Expr::local(&p.name));
    let (args, init_cause) = match strategy {
        ConstructionStrategy::ConstructionParams => {
            let slots = desc.construction_params.as_deref().unwrap_or_default();
            let mut args = Vec::with_capacity(slots.len());
            for slot in slots {
                if slot.is_message {
                    args.push(message.clone());
                } else if method.param(&slot.name).is_some() {
                    args.push(Expr::local(&slot.name));
                } else {
                    return Err(Diagnostic::error(
                        DiagnosticCode::MSG0400UnknownConstructionParam,
                        format!(
                            "construction parameter {:?} of {} is not a parameter of {}",
                            slot.name, method.return_type.ty, method.name
                        ),
                    )
                    .into());
                }
            }
            (args, None)
        }
        ConstructionStrategy::MessageAndCause => (vec![message, require(cause, method)?], None),
        ConstructionStrategy::CauseAndMessage => (vec![require(cause, method)?, message], None),
        ConstructionStrategy::MessageOnly => (vec![message], cause),
        ConstructionStrategy::CauseOnly => (vec![require(cause, method)?], None),
        ConstructionStrategy::MessageAndNullCause => (vec![message, Expr::Null], None),
        ConstructionStrategy::NullCauseAndMessage => (vec![Expr::Null, message], None),
        ConstructionStrategy::NoArgThenInitCause => (Vec::new(), Some(require(cause, method)?)),
        ConstructionStrategy::NoArg => (Vec::new(), None),
    };
    Ok(Construction {
        strategy,
        args,
        init_cause,
    })
}

fn require(cause: Option<Expr>, method: &MethodDescriptor) -> Result<Expr> {
    cause.ok_or_else(|| {
        Diagnostic::error(
            DiagnosticCode::MSG0901InternalBug,
            format!("cause strategy selected for {} without a cause parameter", method.name),
        )
        .into()
    })
}
