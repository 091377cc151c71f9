//! The built-in specialist catalog compiled into the binary.

use switchyard_core::{Profile, Result};

use crate::document::ProfileSet;

const BACKEND: &str = include_str!("../catalog/backend.toml");
const FRONTEND: &str = include_str!("../catalog/frontend.toml");

/// Parse the built-in profiles, backend first.
pub fn catalog() -> Result<Vec<Profile>> {
    let mut profiles = ProfileSet::from_toml("builtin:backend", BACKEND)?.profiles;
    profiles.extend(ProfileSet::from_toml("builtin:frontend", FRONTEND)?.profiles);
    Ok(profiles)
}
