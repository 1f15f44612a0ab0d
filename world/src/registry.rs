//! Registry answering whether new fires may still start.

use std::collections::BTreeSet;

use fire_drill_core::FireId;

/// Tracks every fire that was ever registered during the session.
///
/// Identifiers are never removed, so fires despawned without deregistration
/// are simply skipped when the registry rescans.
#[derive(Debug, Default)]
pub(crate) struct FireRegistry {
    all_fires: BTreeSet<FireId>,
    all_extinguished: bool,
}

impl FireRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly ignited fire, returning whether it was not known yet.
    ///
    /// The fire is burning, so the all-extinguished flag is cleared.
    pub(crate) fn register(&mut self, fire: FireId) -> bool {
        self.all_extinguished = false;
        self.all_fires.insert(fire)
    }

    /// Rescans all registered fires after one was extinguished.
    ///
    /// `lookup` reports the extinguished flag of fires still in play and
    /// `None` for fires that no longer exist. Returns `true` only on the
    /// transition into the all-extinguished state.
    pub(crate) fn on_extinguished<F>(&mut self, lookup: F) -> bool
    where
        F: Fn(FireId) -> Option<bool>,
    {
        let burning = self
            .all_fires
            .iter()
            .filter_map(|fire| lookup(*fire))
            .any(|extinguished| !extinguished);
        if burning || self.all_extinguished {
            return false;
        }

        self.all_extinguished = true;
        true
    }

    pub(crate) fn can_start_new_fire(&self) -> bool {
        !self.all_extinguished
    }

    pub(crate) fn len(&self) -> usize {
        self.all_fires.len()
    }
}
