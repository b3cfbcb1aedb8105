//! A portable shader-graph compiler: validates a JSON-serializable node
//! graph IR and generates Metal Shading Language source plus the host-side
//! layout manifest a thin harness needs to bind resources and pack the
//! globals buffer.

pub mod abi;
pub mod conformance;
pub mod edges;
pub mod error;
pub mod generator;
pub mod ir;
pub mod schema;
pub mod validate;

use anyhow::{Context, Result};

use error::Diagnostic;
use generator::Manifest;
use ir::IRDocument;
use validate::TypedDocument;

/// Loads and parses an IR document from a JSON string.
pub fn load_document(text: &str) -> Result<IRDocument> {
    ir::parse_document(text).context("parsing IR document")
}

/// Runs structural checks and type inference. Never fails: callers decide
/// what a fatal diagnostic means via [`error::has_fatal`].
pub fn validate(doc: &IRDocument) -> (Vec<Diagnostic>, TypedDocument) {
    validate::validate(doc)
}

/// Validates `doc`, then generates MSL for it. Returns the diagnostics
/// alongside the manifest so a caller can choose to surface warnings even
/// on success; fails only if validation found a fatal diagnostic or
/// generation itself hit an unrecoverable condition (recursion, an unknown
/// function reference).
pub fn generate(doc: &IRDocument) -> Result<(Vec<Diagnostic>, Manifest)> {
    let (diagnostics, typed) = validate(doc);
    if error::has_fatal(&diagnostics) {
        anyhow::bail!(
            "document has {} fatal diagnostic(s); refusing to generate",
            diagnostics.iter().filter(|d| d.severity == error::Severity::Error).count()
        );
    }
    let manifest = generator::generate_msl(doc, &typed)?;
    Ok((diagnostics, manifest))
}
