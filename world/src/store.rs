use std::collections::BTreeMap;

use geomerge_core::{CellCoord, CellOverride, OverrideEntry, Token};
use geomerge_system_spawning::SpawnOracle;

/// Sparse record of every cell the player has acted on.
///
/// Cells that never appear here keep answering with the spawn oracle and cost
/// no memory. Entries are never evicted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellStore {
    overrides: BTreeMap<CellCoord, CellOverride>,
}

impl CellStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded override for the cell, or `None` when the cell was never touched.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<CellOverride> {
        self.overrides.get(&cell).copied()
    }

    /// Records or overwrites the override for the cell.
    pub fn set(&mut self, cell: CellCoord, value: CellOverride) {
        let _ = self.overrides.insert(cell, value);
    }

    /// Content of the cell: the override when recorded, the oracle's answer otherwise.
    #[must_use]
    pub fn effective_content(&self, cell: CellCoord, oracle: &SpawnOracle) -> Option<Token> {
        match self.get(cell) {
            Some(value) => value.content(),
            None => oracle.spawn_of(cell),
        }
    }

    /// Number of recorded overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Reports whether no override was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Iterates the recorded overrides ordered by address.
    pub fn iter(&self) -> impl Iterator<Item = OverrideEntry> + '_ {
        self.overrides
            .iter()
            .map(|(cell, value)| OverrideEntry {
                cell: *cell,
                value: *value,
            })
    }

    pub(crate) fn clear(&mut self) {
        self.overrides.clear();
    }
}

impl FromIterator<OverrideEntry> for CellStore {
    fn from_iter<T: IntoIterator<Item = OverrideEntry>>(iter: T) -> Self {
        Self {
            overrides: iter
                .into_iter()
                .map(|entry| (entry.cell, entry.value))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptied_cell_does_not_fall_back_to_oracle() {
        let oracle = SpawnOracle::new(3, 1.0);
        let mut store = CellStore::new();
        let cell = CellCoord::new(4, -2);

        assert_eq!(store.get(cell), None);
        assert_eq!(store.effective_content(cell, &oracle), Some(Token::BASE));

        store.set(cell, CellOverride::Empty);
        assert_eq!(store.get(cell), Some(CellOverride::Empty));
        assert_eq!(store.effective_content(cell, &oracle), None);
    }

    #[test]
    fn set_overwrites_without_growing() {
        let mut store = CellStore::new();
        let cell = CellCoord::new(0, 0);
        store.set(cell, CellOverride::Empty);
        store.set(cell, CellOverride::Token(Token::BASE));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(cell), Some(CellOverride::Token(Token::BASE)));
    }

    #[test]
    fn iteration_is_ordered_by_address() {
        let store: CellStore = [
            OverrideEntry {
                cell: CellCoord::new(2, 0),
                value: CellOverride::Empty,
            },
            OverrideEntry {
                cell: CellCoord::new(-1, 5),
                value: CellOverride::Empty,
            },
        ]
        .into_iter()
        .collect();

        let cells: Vec<_> = store.iter().map(|entry| entry.cell).collect();
        assert_eq!(cells, vec![CellCoord::new(-1, 5), CellCoord::new(2, 0)]);
    }
}
