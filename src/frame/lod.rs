//! Level-of-detail selection.
//!
//! In static mode every entity uses one configured variant. In dynamic mode
//! the variant is chosen per frame from the camera distance: the variant
//! whose threshold is the largest one not exceeding the distance. Equal
//! thresholds resolve to the lower index (higher detail). A distance below
//! every threshold picks the smallest threshold.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::sim::{Character, SimulationData};

/// How geometry variants are chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LodMode {
    /// One configured variant for every entity and frame.
    #[default]
    Static,
    /// Per-frame selection by camera distance.
    Dynamic,
}

/// Pick the variant index for a camera distance.
///
/// Returns 0 for an empty table.
pub fn select_lod(thresholds: &[f32], distance: f32) -> usize {
    let mut best: Option<(usize, f32)> = None;
    for (i, &t) in thresholds.iter().enumerate() {
        if t.is_nan() || t > distance {
            continue;
        }
        match best {
            Some((_, bt)) if bt >= t => {}
            _ => best = Some((i, t)),
        }
    }
    if let Some((i, _)) = best {
        return i;
    }

    // Closer than every threshold: highest detail available.
    thresholds
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_nan())
        .fold(None::<(usize, f32)>, |acc, (i, &t)| match acc {
            Some((_, at)) if at <= t => acc,
            _ => Some((i, t)),
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Threshold table of a character, honoring per-run overrides from the
/// simulation when they match the variant count.
pub fn thresholds_for<'a>(character: &'a Character, index: usize, simulation: &'a SimulationData) -> Cow<'a, [f32]> {
    let overridden = simulation
        .lod_thresholds
        .as_ref()
        .and_then(|table| table.get(index))
        .filter(|t| t.len() == character.variants.len());
    match overridden {
        Some(t) => Cow::Borrowed(t.as_slice()),
        None => Cow::Owned(character.lod_thresholds()),
    }
}
