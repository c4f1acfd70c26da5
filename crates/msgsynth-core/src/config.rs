use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use msgsynth_contracts::CONFIG_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::message_id::{IdFormat, MAX_ID_WIDTH};
use crate::model::{ConstructorShape, FormatKind, ThrowableReturnDescriptor, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub schema_version: String,
    pub id_format: IdFormat,
    pub serial_version_uid: i64,
    /// Appended to the interface name to form the generated type name.
    pub impl_suffix: String,
    pub default_format: FormatKind,
    pub exceptions: Vec<ExceptionDecl>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            id_format: IdFormat::default(),
            serial_version_uid: 1,
            impl_suffix: "_$bundle".to_string(),
            default_format: FormatKind::default(),
            exceptions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionDecl {
    pub name: TypeRef,
    #[serde(flatten)]
    pub descriptor: ThrowableReturnDescriptor,
}

impl GenerationConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let cfg: GenerationConfig = serde_json::from_slice(bytes).context("parse config JSON")?;
        if cfg.schema_version.trim() != CONFIG_SCHEMA_VERSION {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0500ConfigSchemaMismatch,
                format!(
                    "config schema_version mismatch: expected {CONFIG_SCHEMA_VERSION} got {:?}",
                    cfg.schema_version
                ),
            )
            .into());
        }
        if cfg.id_format.width > MAX_ID_WIDTH {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0501ConfigValueOutOfRange,
                format!(
                    "id_format.width {} exceeds the maximum of {MAX_ID_WIDTH}",
                    cfg.id_format.width
                ),
            )
            .into());
        }
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read config: {}", path.display()))?;
        Self::from_json(&bytes).with_context(|| format!("load config: {}", path.display()))
    }

    /// Built-in exception catalog overlaid with the configured declarations.
    pub fn catalog(&self) -> ExceptionCatalog {
        let mut catalog = ExceptionCatalog::builtin();
        for decl in &self.exceptions {
            catalog.insert(decl.name.clone(), decl.descriptor.clone());
        }
        catalog
    }
}

/// Constructor capabilities of known exception types, keyed by qualified name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionCatalog {
    types: BTreeMap<TypeRef, ThrowableReturnDescriptor>,
}

impl ExceptionCatalog {
    pub fn builtin() -> Self {
        use ConstructorShape::{String, StringThrowable, Throwable};

        let full = [String, StringThrowable, Throwable];
        let message_only = [String];
        let mut catalog = ExceptionCatalog::default();
        for name in [
            "java.lang.Throwable",
            "java.lang.Exception",
            "java.lang.RuntimeException",
            "java.lang.Error",
            "java.lang.IllegalArgumentException",
            "java.lang.IllegalStateException",
            "java.lang.UnsupportedOperationException",
            "java.lang.SecurityException",
            "java.io.IOException",
        ] {
            catalog.insert(TypeRef::new(name), ThrowableReturnDescriptor::with_shapes(full));
        }
        for name in [
            "java.lang.NullPointerException",
            "java.lang.ArithmeticException",
            "java.lang.ClassCastException",
            "java.lang.IndexOutOfBoundsException",
            "java.lang.NumberFormatException",
            "java.io.FileNotFoundException",
        ] {
            catalog.insert(
                TypeRef::new(name),
                ThrowableReturnDescriptor::with_shapes(message_only),
            );
        }
        catalog
    }

    pub fn insert(&mut self, name: TypeRef, desc: ThrowableReturnDescriptor) {
        self.types.insert(name, desc);
    }

    /// Looks a type up by qualified name, then by unambiguous simple name.
    pub fn resolve(&self, name: &str) -> Option<(&TypeRef, &ThrowableReturnDescriptor)> {
        if let Some(entry) = self.types.get_key_value(&TypeRef::new(name)) {
            return Some(entry);
        }
        if name.contains('.') {
            return None;
        }
        let mut matches = self.types.iter().filter(|(k, _)| k.simple_name() == name);
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }
}
