//! Context composition: one working context from the active profiles.
//!
//! The merged template is the union of every active profile's required
//! sections. Profiles are walked in confidence order; each keeps its own
//! section order and a section name already present (case-insensitive)
//! merges into the existing slot instead of adding a new one.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use switchyard_core::{Error, Profile, Result, normalize_key};
use switchyard_profiles::ProfileSnapshot;

use crate::classifier::{ActiveProfile, ClassificationResult};
use crate::resolver::{Resolution, ResolvedPreference};

/// One slot of the merged template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSlot {
    /// Display name, taken from the first profile that declares it.
    pub name: String,
    /// Profiles declaring this section, in confidence order.
    pub profiles: Vec<String>,
    pub content: SlotContent,
}

/// What fills a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotContent {
    /// The section renders a resolved preference category.
    Preference {
        category: String,
        resolution: Resolution,
    },
    /// Each declaring profile contributes its own part, attributed.
    Attributed { parts: Vec<Attribution> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub profile: String,
    /// The section name as that profile spells it.
    pub section: String,
}

/// The single merged working context for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionResult {
    /// Active profiles, in confidence order.
    pub profiles: Vec<ActiveProfile>,
    pub preferences: Vec<ResolvedPreference>,
    pub sections: Vec<SectionSlot>,
}

impl CompositionResult {
    /// Categories that resolved to a conflict.
    pub fn conflicts(&self) -> Vec<&ResolvedPreference> {
        self.preferences.iter().filter(|p| p.is_conflict()).collect()
    }

    pub fn preference(&self, category: &str) -> Option<&ResolvedPreference> {
        let key = normalize_key(category);
        self.preferences
            .iter()
            .find(|p| normalize_key(&p.category) == key)
    }

    pub fn section(&self, name: &str) -> Option<&SectionSlot> {
        let key = normalize_key(name);
        self.sections.iter().find(|s| normalize_key(&s.name) == key)
    }

    pub fn profile_ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.profile_id.as_str()).collect()
    }

    pub fn is_multi_profile(&self) -> bool {
        self.profiles.len() > 1
    }

    /// Hex SHA-256 of the canonical JSON encoding. Equal compositions have
    /// equal fingerprints.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(Sha256::digest(&bytes)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect())
    }
}

/// Compose the working context. Pure: no I/O, no shared-state writes.
///
/// Fails with `NotFound` if an active profile is missing from `profiles`.
pub fn compose(
    classification: &ClassificationResult,
    preferences: &[ResolvedPreference],
    profiles: &ProfileSnapshot,
) -> Result<CompositionResult> {
    let mut sections: Vec<SectionSlot> = Vec::new();
    let mut bindings: Vec<Option<String>> = Vec::new();

    for active in &classification.active {
        let profile = profiles
            .get(&active.profile_id)
            .ok_or_else(|| Error::profile_not_found(&active.profile_id))?;

        for section in profile.required_sections() {
            let key = normalize_key(&section.name);
            let category = bound_category(&profile, &section.name, section.category.as_deref());
            let attribution = Attribution {
                profile: profile.id.clone(),
                section: section.name.clone(),
            };

            match sections.iter().position(|s| normalize_key(&s.name) == key) {
                Some(i) => {
                    sections[i].profiles.push(profile.id.clone());
                    if let SlotContent::Attributed { parts } = &mut sections[i].content {
                        parts.push(attribution);
                    }
                    if bindings[i].is_none() {
                        bindings[i] = category;
                    }
                }
                None => {
                    sections.push(SectionSlot {
                        name: section.name.clone(),
                        profiles: vec![profile.id.clone()],
                        content: SlotContent::Attributed {
                            parts: vec![attribution],
                        },
                    });
                    bindings.push(category);
                }
            }
        }
    }

    // Bound slots render their category's resolution once every declaring
    // profile has been seen.
    for (slot, binding) in sections.iter_mut().zip(bindings) {
        let Some(category) = binding else { continue };
        let key = normalize_key(&category);
        if let Some(pref) = preferences
            .iter()
            .find(|p| normalize_key(&p.category) == key)
        {
            slot.content = SlotContent::Preference {
                category: pref.category.clone(),
                resolution: pref.resolution.clone(),
            };
        }
    }

    Ok(CompositionResult {
        profiles: classification.active.clone(),
        preferences: preferences.to_vec(),
        sections,
    })
}

/// The category a section renders: explicit, or implied by a ranking with
/// the same name.
fn bound_category(profile: &Profile, section: &str, explicit: Option<&str>) -> Option<String> {
    match explicit {
        Some(category) => Some(category.to_string()),
        None => profile.ranking(section).map(|r| r.category.clone()),
    }
}
