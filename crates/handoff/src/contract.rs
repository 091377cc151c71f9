//! Collaboration contract matching.
//!
//! A participant's requirement is met when another participant provides an
//! item with the same normalized name, or when the item was supplied from
//! outside the task.

use serde::{Deserialize, Serialize};

use switchyard_core::{CollaborationContract, normalize_key};

/// Contract fulfilment of one participating profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractStatus {
    pub profile_id: String,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    /// Requirements nobody covers yet.
    pub missing: Vec<String>,
}

impl ContractStatus {
    pub fn new(profile_id: impl Into<String>, contract: &CollaborationContract) -> Self {
        Self {
            profile_id: profile_id.into(),
            provides: contract.provides.clone(),
            requires: contract.requires.clone(),
            missing: contract.requires.clone(),
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Recompute every participant's `missing` list in place.
pub fn evaluate(participants: &mut [ContractStatus], supplied: &[String]) {
    let offered: Vec<(usize, String)> = participants
        .iter()
        .enumerate()
        .flat_map(|(i, p)| p.provides.iter().map(move |item| (i, normalize_key(item))))
        .collect();
    let supplied: Vec<String> = supplied.iter().map(|s| normalize_key(s)).collect();

    for (i, participant) in participants.iter_mut().enumerate() {
        participant.missing = participant
            .requires
            .iter()
            .filter(|item| {
                let key = normalize_key(item);
                let from_peer = offered.iter().any(|(j, offer)| *j != i && *offer == key);
                !from_peer && !supplied.contains(&key)
            })
            .cloned()
            .collect();
    }
}

/// Every missing item across participants, first occurrence kept.
pub fn missing_items(participants: &[ContractStatus]) -> Vec<String> {
    let mut seen = Vec::new();
    let mut items = Vec::new();
    for item in participants.iter().flat_map(|p| p.missing.iter()) {
        let key = normalize_key(item);
        if !seen.contains(&key) {
            seen.push(key);
            items.push(item.clone());
        }
    }
    items
}
