//! Citizen and import batch domain model.
//!
//! # Responsibility
//! - Define the canonical citizen record stored inside an import batch.
//! - Provide the partial-update shape and its merge semantics.
//!
//! # Invariants
//! - `citizen_id` never changes after import.
//! - `relatives` reference citizens of the same batch only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sequential import batch identifier (1, 2, 3, ... in creation order).
pub type ImportId = i64;

/// Citizen identifier, unique inside one import batch.
pub type CitizenId = i64;

/// Citizen gender as accepted by the payload schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// One citizen record inside an import batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Citizen {
    pub citizen_id: CitizenId,
    pub town: String,
    pub street: String,
    pub building: String,
    pub apartment: i64,
    pub name: String,
    /// `DD.MM.YYYY` textual form, validated by `validation::date`.
    pub birth_date: String,
    pub gender: Gender,
    /// Ids of relatives in the same batch. Mirrored on every listed peer.
    pub relatives: Vec<CitizenId>,
}

impl Citizen {
    /// Returns whether `other` is listed as a relative of this citizen.
    pub fn has_relative(&self, other: CitizenId) -> bool {
        self.relatives.contains(&other)
    }

    /// Appends `other` to the relatives list unless already present.
    pub fn link_relative(&mut self, other: CitizenId) {
        if !self.has_relative(other) {
            self.relatives.push(other);
        }
    }

    /// Removes `other` from the relatives list. Missing ids are a no-op.
    pub fn unlink_relative(&mut self, other: CitizenId) {
        self.relatives.retain(|id| *id != other);
    }
}

/// Partial update payload for one citizen.
///
/// Every field is optional; `citizen_id` is intentionally absent so it can
/// never be changed through an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitizenPatch {
    pub town: Option<String>,
    pub street: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<i64>,
    pub name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<Gender>,
    pub relatives: Option<Vec<CitizenId>>,
}

impl CitizenPatch {
    /// Shallow-merges provided fields onto `citizen`, overwriting them.
    ///
    /// Relative propagation to peers is not handled here; see
    /// `service::consistency`.
    pub fn apply_to(self, citizen: &mut Citizen) {
        if let Some(town) = self.town {
            citizen.town = town;
        }
        if let Some(street) = self.street {
            citizen.street = street;
        }
        if let Some(building) = self.building {
            citizen.building = building;
        }
        if let Some(apartment) = self.apartment {
            citizen.apartment = apartment;
        }
        if let Some(name) = self.name {
            citizen.name = name;
        }
        if let Some(birth_date) = self.birth_date {
            citizen.birth_date = birth_date;
        }
        if let Some(gender) = self.gender {
            citizen.gender = gender;
        }
        if let Some(relatives) = self.relatives {
            citizen.relatives = relatives;
        }
    }
}

/// One persisted import batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBatch {
    pub import_id: ImportId,
    pub citizens: BTreeMap<CitizenId, Citizen>,
}

impl ImportBatch {
    /// Returns one citizen by id.
    pub fn citizen(&self, citizen_id: CitizenId) -> Option<&Citizen> {
        self.citizens.get(&citizen_id)
    }

    /// Returns citizens ordered by id.
    pub fn citizen_list(&self) -> Vec<&Citizen> {
        self.citizens.values().collect()
    }

    /// Number of citizens in the batch.
    pub fn len(&self) -> usize {
        self.citizens.len()
    }

    /// Returns whether the batch holds no citizens.
    pub fn is_empty(&self) -> bool {
        self.citizens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Citizen, CitizenPatch, Gender};

    fn citizen(id: i64, relatives: Vec<i64>) -> Citizen {
        Citizen {
            citizen_id: id,
            town: "Moscow".to_string(),
            street: "Lenina".to_string(),
            building: "16k7s5".to_string(),
            apartment: 7,
            name: "Ivan".to_string(),
            birth_date: "26.12.1986".to_string(),
            gender: Gender::Male,
            relatives,
        }
    }

    #[test]
    fn link_relative_does_not_duplicate() {
        let mut value = citizen(1, vec![2]);
        value.link_relative(2);
        value.link_relative(3);
        assert_eq!(value.relatives, vec![2, 3]);
    }

    #[test]
    fn unlink_missing_relative_is_noop() {
        let mut value = citizen(1, vec![2]);
        value.unlink_relative(9);
        assert_eq!(value.relatives, vec![2]);
    }

    #[test]
    fn patch_overwrites_only_provided_fields() {
        let mut value = citizen(1, vec![]);
        let patch = CitizenPatch {
            name: Some("Maria".to_string()),
            gender: Some(Gender::Female),
            ..CitizenPatch::default()
        };
        patch.apply_to(&mut value);

        assert_eq!(value.name, "Maria");
        assert_eq!(value.gender, Gender::Female);
        assert_eq!(value.town, "Moscow");
        assert_eq!(value.citizen_id, 1);
    }

    #[test]
    fn patch_rejects_citizen_id_field() {
        let raw = serde_json::json!({ "citizen_id": 5 });
        assert!(serde_json::from_value::<CitizenPatch>(raw).is_err());
    }
}
