use std::collections::BTreeSet;

use rand::Rng;

/// Identifiers of the persons that have not been guessed in the current rotation.
///
/// Ids are kept ordered so a seeded random source always yields the same draw
/// sequence for the same catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPool {
    remaining: BTreeSet<u32>,
}

impl PersonPool {
    /// Build a pool holding every id of the catalog.
    pub fn new(all_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            remaining: all_ids.into_iter().collect(),
        }
    }

    /// Remove `id` from the rotation. Unknown or already consumed ids are ignored.
    pub fn consume(&mut self, id: u32) -> bool {
        self.remaining.remove(&id)
    }

    /// Draw one of the remaining ids uniformly, or `None` once the pool is empty.
    pub fn select_next<R>(&self, rng: &mut R) -> Option<u32>
    where
        R: Rng + ?Sized,
    {
        if self.remaining.is_empty() {
            return None;
        }

        let pick = rng.random_range(0..self.remaining.len());
        self.remaining.iter().nth(pick).copied()
    }

    /// Put every catalog id back into the rotation.
    pub fn replenish(&mut self, all_ids: impl IntoIterator<Item = u32>) {
        self.remaining = all_ids.into_iter().collect();
    }

    /// Whether the rotation fell strictly below the low-water mark.
    pub fn needs_replenish(&self, low_water_mark: usize) -> bool {
        self.remaining.len() < low_water_mark
    }

    /// Whether `id` was not drawn yet.
    pub fn contains(&self, id: u32) -> bool {
        self.remaining.contains(&id)
    }

    /// Number of ids left.
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    /// Whether every id was drawn.
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Remaining ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        self.remaining.iter().copied().collect()
    }
}
