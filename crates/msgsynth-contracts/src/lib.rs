//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable I/O: descriptor documents handed over by an extraction
//! collaborator, generated-type documents written by the JSON backend, and the
//! config/batch manifests read by the CLI.

pub const DESCRIPTORS_SCHEMA_VERSION: &str = "msgsynth.descriptors@0.1.0";
pub const GENERATED_SCHEMA_VERSION: &str = "msgsynth.generated@0.1.0";

pub const CONFIG_SCHEMA_VERSION: &str = "msgsynth.config@0.1.0";
pub const BATCH_MANIFEST_SCHEMA_VERSION: &str = "msgsynth.manifest@0.1.0";
