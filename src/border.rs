//! Boundary rings around growing regions
//!
//! A border is one 8-connected component of the cells a region grower
//! rejected. The ring with the largest rectangle usually surrounds the whole
//! region; every other ring encloses a pocket.

use std::collections::{BTreeSet, VecDeque};
use std::ops::{Deref, DerefMut};

use log::warn;

use crate::cell::CellId;
use crate::collection::BoundedCellSet;
use crate::grid::TerrainGrid;

/// One connected boundary ring, with a bounded cell set underneath
#[derive(Debug, Clone)]
pub struct Border {
    id: u32,
    ring: BoundedCellSet,
}

impl Border {
    /// Create an empty ring
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ring: BoundedCellSet::new(),
        }
    }

    /// Create an up-to-date ring from its member cells
    pub fn from_cells<I>(grid: &TerrainGrid, id: u32, cells: I) -> Self
    where
        I: IntoIterator<Item = CellId>,
    {
        let mut ring = BoundedCellSet::new();
        for cell in cells {
            ring.add(grid, cell);
        }
        ring.update();
        Self { id, ring }
    }

    /// Identity of this ring within its pass
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Flood-fill the cells this ring encloses
    ///
    /// Starts at the ring's topmost cell and spreads over all eight neighbour
    /// directions, admitting cells inside the ring's rectangle for which
    /// `is_outside` is false; open sea is skipped when `exclude_sea` is set.
    /// Ring members the first flood could not reach start floods of their own.
    ///
    /// The flood is clipped to the ring's live rectangle, while the size check
    /// compares against the area cached by the last `update`. A ring grown
    /// through `DerefMut` without an `update` can therefore report an
    /// oversized enclosed set; that is logged and the set is still returned.
    pub fn enclosed_cell_set<F>(
        &self,
        grid: &TerrainGrid,
        is_outside: F,
        exclude_sea: bool,
    ) -> BTreeSet<CellId>
    where
        F: Fn(CellId) -> bool,
    {
        let admissible = |id: CellId| {
            !is_outside(id)
                && !(exclude_sea && grid.cell(id).is_sea())
                && self.ring.is_enclosed(grid, id)
        };

        let mut enclosed = BTreeSet::new();
        let mut queue = VecDeque::new();
        let starts = self.ring.top().into_iter().chain(self.ring.iter());
        for start in starts {
            if enclosed.contains(&start) || !admissible(start) {
                continue;
            }
            enclosed.insert(start);
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                for (_, neighbor) in grid.cell(current).neighbors() {
                    if !enclosed.contains(&neighbor) && admissible(neighbor) {
                        enclosed.insert(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        if enclosed.len() as u64 > self.ring.rectangle_area() {
            warn!(
                "border {}: enclosed area of {} cells exceeds its {} cell rectangle",
                self.id,
                enclosed.len(),
                self.ring.rectangle_area()
            );
        }
        enclosed
    }

    /// Drop ring cells that now belong to a finalized inner area
    pub fn consolidate(&mut self, grid: &TerrainGrid, inner_area: &BTreeSet<CellId>) {
        self.ring.remove_all(grid, inner_area);
        self.ring.update();
    }
}

impl Deref for Border {
    type Target = BoundedCellSet;

    fn deref(&self) -> &BoundedCellSet {
        &self.ring
    }
}

impl DerefMut for Border {
    fn deref_mut(&mut self) -> &mut BoundedCellSet {
        &mut self.ring
    }
}
