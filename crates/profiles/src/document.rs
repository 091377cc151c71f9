//! Profile documents: the on-disk schema profiles are loaded from.
//!
//! A document is either a set of profiles under a `profiles` array or a
//! single profile at the top level. TOML and JSON share the same shape:
//!
//! ```toml
//! [[profiles]]
//! id = "backend"
//! tags = ["api", "database", "server"]
//!
//! [[profiles.rankings]]
//! category = "datastore"
//! options = [{ name = "postgresql", rationale = "relational default" }]
//!
//! [[profiles.template]]
//! name = "Data Model"
//!
//! [profiles.contract]
//! provides = ["API contract"]
//! requires = ["UI contract"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use switchyard_core::{Error, Profile, Result};

/// An ordered batch of profiles parsed from one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSet {
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. `source` names the document in errors.
    pub fn from_toml(source: &str, text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text)
            .map_err(|e| Error::validation(source, format!("TOML parse error: {e}")))?;

        let set = if table.contains_key("profiles") {
            toml::Value::Table(table).try_into::<ProfileSet>()
        } else {
            toml::Value::Table(table)
                .try_into::<Profile>()
                .map(|p| ProfileSet { profiles: vec![p] })
        }
        .map_err(|e| Error::validation(source, format!("schema error: {e}")))?;

        set.validate()?;
        Ok(set)
    }

    /// Parse a JSON document. `source` names the document in errors.
    pub fn from_json(source: &str, text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::validation(source, format!("JSON parse error: {e}")))?;

        let set = if value.get("profiles").is_some() {
            serde_json::from_value::<ProfileSet>(value)
        } else {
            serde_json::from_value::<Profile>(value).map(|p| ProfileSet { profiles: vec![p] })
        }
        .map_err(|e| Error::validation(source, format!("schema error: {e}")))?;

        set.validate()?;
        Ok(set)
    }

    /// Read and parse a document, choosing the format by file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::validation(&source, format!("cannot read document: {e}")))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&source, &text),
            Some("json") => Self::from_json(&source, &text),
            _ => Err(Error::validation(
                source,
                "unsupported document extension (expected .toml or .json)",
            )),
        }
    }

    /// Validate every profile and reject identifiers repeated within the set.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for profile in &self.profiles {
            profile.validate()?;
            if !ids.insert(profile.id.as_str()) {
                return Err(Error::validation(
                    &profile.id,
                    "profile identifier appears twice in the document",
                ));
            }
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl IntoIterator for ProfileSet {
    type Item = Profile;
    type IntoIter = std::vec::IntoIter<Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PROFILES: &str = r#"
[[profiles]]
id = "backend"
tags = ["api", "database", "server"]

[[profiles.rankings]]
category = "datastore"
options = [
    { name = "postgresql", rationale = "relational default" },
    { name = "sqlite" },
]

[[profiles.template]]
name = "Data Model"

[[profiles.template]]
name = "Datastore"
category = "datastore"

[[profiles.template]]
name = "Runbook"
required = false

[profiles.contract]
provides = ["API contract"]
requires = ["UI contract"]

[[profiles]]
id = "frontend"
tags = ["ui", "component", "browser"]

[profiles.contract]
provides = ["UI contract"]
requires = ["API contract"]
"#;

    #[test]
    fn parses_profile_array() {
        let set = ProfileSet::from_toml("inline", TWO_PROFILES).unwrap();
        assert_eq!(set.len(), 2);
        let backend = &set.profiles[0];
        assert_eq!(backend.id, "backend");
        assert_eq!(backend.rankings[0].options[0].rationale, "relational default");
        assert!(backend.template[0].required);
        assert!(!backend.template[2].required);
        assert_eq!(backend.template[1].category.as_deref(), Some("datastore"));
        assert_eq!(set.profiles[1].contract.requires, vec!["API contract"]);
    }

    #[test]
    fn parses_single_top_level_profile() {
        let set = ProfileSet::from_toml(
            "single",
            r#"
id = "data"
tags = ["etl", "pipeline"]
"#,
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.profiles[0].id, "data");
    }

    #[test]
    fn parses_json_documents() {
        let json = r#"{"profiles":[{"id":"ops","tags":["deploy","infra"]}]}"#;
        let set = ProfileSet::from_json("ops.json", json).unwrap();
        assert_eq!(set.profiles[0].tags, vec!["deploy", "infra"]);

        let single = r#"{"id":"qa","tags":["test"]}"#;
        assert_eq!(ProfileSet::from_json("qa.json", single).unwrap().len(), 1);
    }

    #[test]
    fn schema_errors_name_the_source() {
        let err = ProfileSet::from_toml("broken.toml", "id = \"x\"\ntags = 3").unwrap_err();
        assert!(matches!(err, Error::Validation { ref subject, .. } if subject == "broken.toml"));
    }

    #[test]
    fn duplicate_ids_within_document_rejected() {
        let doc = r#"
[[profiles]]
id = "a"
tags = ["x"]

[[profiles]]
id = "a"
tags = ["y"]
"#;
        assert!(ProfileSet::from_toml("dup", doc).is_err());
    }

    #[test]
    fn invalid_profile_fails_whole_document() {
        let doc = r#"
[[profiles]]
id = "a"
tags = ["x"]

[[profiles.rankings]]
category = "empty"
options = []
"#;
        let err = ProfileSet::from_toml("doc", doc).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn toml_roundtrip_is_exact() {
        let set = ProfileSet::from_toml("inline", TWO_PROFILES).unwrap();
        let text = set.to_toml().unwrap();
        let back = ProfileSet::from_toml("roundtrip", &text).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn json_roundtrip_is_exact() {
        let set = ProfileSet::from_toml("inline", TWO_PROFILES).unwrap();
        let text = set.to_json().unwrap();
        let back = ProfileSet::from_json("roundtrip", &text).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn from_path_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("team.toml");
        std::fs::write(&toml_path, TWO_PROFILES).unwrap();
        assert_eq!(ProfileSet::from_path(&toml_path).unwrap().len(), 2);

        let yaml_path = dir.path().join("team.yaml");
        std::fs::write(&yaml_path, "id: x").unwrap();
        assert!(ProfileSet::from_path(&yaml_path).is_err());
    }
}
