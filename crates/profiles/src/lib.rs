//! # Switchyard Profiles
//!
//! Everything about getting specialist profiles into the engine: the
//! document schema (TOML or JSON), the compiled-in catalog, directory
//! loading driven by configuration, and the [`ProfileRegistry`] that owns
//! the validated profiles for the life of the process.

pub mod builtin;
pub mod document;
pub mod loader;
pub mod registry;

pub use document::ProfileSet;
pub use loader::{from_config, load_dir, load_document};
pub use registry::{ProfileRegistry, ProfileSnapshot};
