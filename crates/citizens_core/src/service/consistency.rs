//! Batch-wide relatives invariants.
//!
//! # Responsibility
//! - Verify the symmetric relatives relation of a staged batch.
//! - Propagate one citizen's relatives edit onto its peers.
//!
//! # Invariants
//! - Functions either fail before touching any citizen or apply the whole edit.
//! - After `propagate_relatives`, every added peer lists the citizen and no
//!   removed peer does.

use crate::model::citizen::{Citizen, CitizenId};
use crate::validation::ValidationError;
use std::collections::{BTreeMap, BTreeSet};

/// Checks that every listed relative exists and lists the citizen back.
pub fn check_relatives_symmetric(
    citizens: &BTreeMap<CitizenId, Citizen>,
) -> Result<(), ValidationError> {
    for (citizen_id, citizen) in citizens {
        for relative_id in &citizen.relatives {
            let relative = citizens
                .get(relative_id)
                .ok_or(ValidationError::UnknownRelative(*relative_id))?;
            if !relative.has_relative(*citizen_id) {
                return Err(ValidationError::AsymmetricRelatives {
                    citizen_id: *citizen_id,
                    relative_id: *relative_id,
                });
            }
        }
    }
    Ok(())
}

/// Symmetric difference between a current and a requested relatives list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativesDiff {
    pub added: BTreeSet<CitizenId>,
    pub removed: BTreeSet<CitizenId>,
}

impl RelativesDiff {
    pub fn between(current: &[CitizenId], next: &[CitizenId]) -> Self {
        let current: BTreeSet<CitizenId> = current.iter().copied().collect();
        let next: BTreeSet<CitizenId> = next.iter().copied().collect();
        Self {
            added: next.difference(&current).copied().collect(),
            removed: current.difference(&next).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Every id whose relatives list the edit changes, in ascending order.
    pub fn touched(&self) -> BTreeSet<CitizenId> {
        self.added.union(&self.removed).copied().collect()
    }
}

/// Mirrors `citizen_id`'s new relatives list onto its peers.
///
/// Only peer lists are changed; the caller applies `next` to the citizen
/// itself. Returns the ids of peers that were touched.
///
/// # Errors
/// - `ValidationError::UnknownRelative` when an added or removed id is not a
///   citizen of the batch. Nothing is mutated in that case.
pub fn propagate_relatives(
    citizens: &mut BTreeMap<CitizenId, Citizen>,
    citizen_id: CitizenId,
    next: &[CitizenId],
) -> Result<BTreeSet<CitizenId>, ValidationError> {
    let current = citizens
        .get(&citizen_id)
        .map(|citizen| citizen.relatives.clone())
        .unwrap_or_default();
    let diff = RelativesDiff::between(&current, next);
    let touched = diff.touched();

    if let Some(missing) = touched.iter().find(|id| !citizens.contains_key(*id)) {
        return Err(ValidationError::UnknownRelative(*missing));
    }

    for relative_id in &diff.added {
        if let Some(relative) = citizens.get_mut(relative_id) {
            relative.link_relative(citizen_id);
        }
    }
    for relative_id in &diff.removed {
        if let Some(relative) = citizens.get_mut(relative_id) {
            relative.unlink_relative(citizen_id);
        }
    }

    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::{check_relatives_symmetric, propagate_relatives, RelativesDiff};
    use crate::model::citizen::{Citizen, CitizenId, Gender};
    use crate::validation::ValidationError;
    use std::collections::BTreeMap;

    fn batch(entries: &[(CitizenId, &[CitizenId])]) -> BTreeMap<CitizenId, Citizen> {
        entries
            .iter()
            .map(|(id, relatives)| {
                (
                    *id,
                    Citizen {
                        citizen_id: *id,
                        town: "Kazan".to_string(),
                        street: "Baumana".to_string(),
                        building: "1".to_string(),
                        apartment: 1,
                        name: format!("citizen {id}"),
                        birth_date: "01.01.1990".to_string(),
                        gender: Gender::Female,
                        relatives: relatives.to_vec(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn symmetric_batch_passes() {
        let citizens = batch(&[(1, &[2, 3]), (2, &[1]), (3, &[1]), (4, &[])]);
        check_relatives_symmetric(&citizens).unwrap();
    }

    #[test]
    fn one_sided_link_is_reported() {
        let citizens = batch(&[(1, &[2]), (2, &[])]);
        let err = check_relatives_symmetric(&citizens).unwrap_err();
        assert_eq!(
            err,
            ValidationError::AsymmetricRelatives {
                citizen_id: 1,
                relative_id: 2
            }
        );
    }

    #[test]
    fn link_to_missing_citizen_is_reported() {
        let citizens = batch(&[(1, &[7])]);
        let err = check_relatives_symmetric(&citizens).unwrap_err();
        assert_eq!(err, ValidationError::UnknownRelative(7));
    }

    #[test]
    fn self_link_is_symmetric() {
        let citizens = batch(&[(1, &[1])]);
        check_relatives_symmetric(&citizens).unwrap();
    }

    #[test]
    fn diff_splits_additions_and_removals() {
        let diff = RelativesDiff::between(&[1, 2, 3], &[3, 4]);
        assert_eq!(diff.added.into_iter().collect::<Vec<_>>(), vec![4]);
        assert_eq!(diff.removed.into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(RelativesDiff::between(&[2, 1], &[1, 2]).is_empty());
    }

    #[test]
    fn propagate_links_and_unlinks_peers() {
        let mut citizens = batch(&[(1, &[2]), (2, &[1]), (3, &[])]);
        let touched = propagate_relatives(&mut citizens, 1, &[3]).unwrap();

        assert_eq!(touched.into_iter().collect::<Vec<_>>(), vec![2, 3]);
        assert!(citizens[&2].relatives.is_empty());
        assert_eq!(citizens[&3].relatives, vec![1]);
        // The edited citizen itself is left to the caller.
        assert_eq!(citizens[&1].relatives, vec![2]);
    }

    #[test]
    fn propagate_with_unknown_id_mutates_nothing() {
        let mut citizens = batch(&[(1, &[2]), (2, &[1]), (3, &[])]);
        let before = citizens.clone();

        let err = propagate_relatives(&mut citizens, 1, &[3, 42]).unwrap_err();
        assert_eq!(err, ValidationError::UnknownRelative(42));
        assert_eq!(citizens, before);
    }

    #[test]
    fn removing_non_reciprocal_peer_is_noop_for_peer() {
        let mut citizens = batch(&[(1, &[2]), (2, &[])]);
        propagate_relatives(&mut citizens, 1, &[]).unwrap();
        assert!(citizens[&2].relatives.is_empty());
    }
}
