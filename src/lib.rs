//! Composepack Core - Package Renderer and Integrity Engine
//!
//! # Guarantees
//! 1. Overrides Win (mappings deep-merge, everything else is replaced)
//! 2. Helpers Are Package-Global
//! 3. Empty Output Emits Nothing
//! 4. Deterministic Order
//! 5. No Half-Written Artifacts
//! 6. Digests Are Reproducible

pub mod error;
pub mod walk;
pub mod values;
pub mod templates;
pub mod render;
pub mod combine;
pub mod checksum;
pub mod package;
pub mod pipeline;

pub use error::PackageError;
pub use values::{load_values, merge, resolve, ValueMap};
pub use templates::{compile, discover, Discovery, TemplateFile, TemplateSet, TemplateUnit};
pub use render::{execute, RenderedFragment};
pub use combine::{combine, list_rendered, write_split};
pub use checksum::{compute, Verification};
pub use package::PackageLayout;
pub use pipeline::{render_package, OutputMode, RenderOutcome, RenderPipeline, RenderRequest};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
