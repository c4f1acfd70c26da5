//! Synthesizes the bodies of generated message-bundle and exception-factory methods.
//!
//! Pipeline: a front-end ([`rust`] or descriptor JSON) yields [`model::MessageInterface`]s,
//! [`synth`] turns each into an [`ir::GeneratedType`], and [`json_emit`] / [`java_emit`]
//! render the result.

pub mod builder;
pub mod config;
pub mod construction;
pub mod diagnostics;
pub mod format_expr;
pub mod ir;
pub mod java_emit;
pub mod json_emit;
pub mod message_id;
pub mod model;
pub mod rust;
pub mod synth;

mod util;
