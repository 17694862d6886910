//! Finalized regions and their derived statistics
//!
//! A [`Region`] owns a fixed set of cells; a [`SuperRegion`] groups child
//! regions (the tiles of a subdivided region and the regions grown inside its
//! enclosed pockets) without owning cells itself. Both are reached through
//! [`RegionNode`], which exposes the same query surface for either.

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::biome::BiomeId;
use crate::cell::CellId;
use crate::collection::BoundedCellSet;
use crate::grid::TerrainGrid;

/// Identity of a region within one segmentation pass
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Area-weighted aggregates over a region's cells
///
/// Every field is a pure function of membership, so a persisted partition
/// can rebuild these with [`RegionStats::compute`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionStats {
    /// Sum of member cell areas
    pub total_area: f32,
    pub cell_count: usize,
    pub altitude: f32,
    pub rainfall: f32,
    pub temperature: f32,
    pub accessibility: f32,
    pub arability: f32,
    /// Mean presence of each biome, indexed by [`BiomeId::index`]
    pub biome_presences: Vec<f32>,
    /// Biome with the highest mean presence, land biomes first
    pub dominant_biome: Option<BiomeId>,
    /// Share of the area lying on coastal cells, in percent
    pub coastal_percentage: f32,
}

impl RegionStats {
    /// Aggregate the given cells
    pub fn compute<I>(grid: &TerrainGrid, cells: I) -> Self
    where
        I: IntoIterator<Item = CellId>,
    {
        let mut stats = RegionStats {
            biome_presences: vec![0.0; grid.biomes().len()],
            ..Default::default()
        };
        let mut coastal_area = 0.0;

        for id in cells {
            let cell = grid.cell(id);
            let area = cell.area;
            let t = &cell.terrain;
            stats.cell_count += 1;
            stats.total_area += area;
            stats.altitude += t.altitude * area;
            stats.rainfall += t.rainfall * area;
            stats.temperature += t.temperature * area;
            stats.accessibility += t.accessibility * area;
            stats.arability += t.arability * area;
            for (slot, presence) in stats.biome_presences.iter_mut().zip(&t.biome_presences) {
                *slot += presence * area;
            }
            if grid.is_coastal(id) {
                coastal_area += area;
            }
        }

        if stats.total_area > 0.0 {
            let total = stats.total_area;
            for value in [
                &mut stats.altitude,
                &mut stats.rainfall,
                &mut stats.temperature,
                &mut stats.accessibility,
                &mut stats.arability,
            ] {
                *value /= total;
            }
            stats.biome_presences.iter_mut().for_each(|p| *p /= total);
            stats.coastal_percentage = coastal_area / total * 100.0;
        }

        let pick = |skip_water: bool| {
            let mut best: Option<(BiomeId, f32)> = None;
            for (i, &presence) in stats.biome_presences.iter().enumerate() {
                let biome = BiomeId(i as u16);
                if presence <= 0.0 || (skip_water && grid.biomes().is_water(biome)) {
                    continue;
                }
                if best.map_or(true, |(_, b)| presence > b) {
                    best = Some((biome, presence));
                }
            }
            best.map(|(biome, _)| biome)
        };
        stats.dominant_biome = pick(true).or_else(|| pick(false));
        stats
    }
}

/// Members with at least one neighbour outside the set
fn inner_border_of(grid: &TerrainGrid, cells: &BTreeSet<CellId>) -> BTreeSet<CellId> {
    cells
        .iter()
        .copied()
        .filter(|&id| grid.cell(id).neighbors().any(|(_, n)| !cells.contains(&n)))
        .collect()
}

/// A finalized region: a fixed cell set with cached statistics
#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    biome: Option<BiomeId>,
    cells: BoundedCellSet,
    inner_border: BTreeSet<CellId>,
    stats: RegionStats,
    most_centered_cell: Option<CellId>,
}

impl Region {
    pub(crate) fn new(grid: &TerrainGrid, id: RegionId, biome: BiomeId, mut cells: BoundedCellSet) -> Self {
        cells.update();
        let stats = RegionStats::compute(grid, cells.iter());
        let inner_border = inner_border_of(grid, cells.cells());
        let most_centered_cell = cells.most_centered_cell(grid);
        Self {
            id,
            biome: Some(biome),
            cells,
            inner_border,
            stats,
            most_centered_cell,
        }
    }

    /// Rebuild a region from its membership alone
    ///
    /// The region's biome becomes the dominant biome of its statistics.
    pub fn from_cells<I>(grid: &TerrainGrid, id: RegionId, cells: I) -> Self
    where
        I: IntoIterator<Item = CellId>,
    {
        let cells = BoundedCellSet::from_cells(grid, cells);
        let stats = RegionStats::compute(grid, cells.iter());
        let inner_border = inner_border_of(grid, cells.cells());
        let most_centered_cell = cells.most_centered_cell(grid);
        Self {
            id,
            biome: stats.dominant_biome,
            cells,
            inner_border,
            stats,
            most_centered_cell,
        }
    }

    #[inline]
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// The biome this region was grown for
    #[inline]
    pub fn biome(&self) -> Option<BiomeId> {
        self.biome
    }

    /// Member cells in ascending id order
    #[inline]
    pub fn cells(&self) -> &BTreeSet<CellId> {
        self.cells.cells()
    }

    /// Members together with their bounding rectangle
    #[inline]
    pub fn bounds(&self) -> &BoundedCellSet {
        &self.cells
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains(id)
    }

    /// Check if a member touches a cell outside the region
    #[inline]
    pub fn is_inner_border_cell(&self, id: CellId) -> bool {
        self.inner_border.contains(&id)
    }

    pub fn inner_border(&self) -> &BTreeSet<CellId> {
        &self.inner_border
    }

    #[inline]
    pub fn stats(&self) -> &RegionStats {
        &self.stats
    }

    /// Member closest to the region's mean position
    #[inline]
    pub fn most_centered_cell(&self) -> Option<CellId> {
        self.most_centered_cell
    }
}

/// A composite of child regions that owns no cells directly
///
/// Statistics are derived when the group is built. The union of the
/// children's cells is only materialized on first use and cached until a
/// child is added.
#[derive(Debug, Clone)]
pub struct SuperRegion {
    id: RegionId,
    root_cell: CellId,
    children: Vec<RegionNode>,
    union: OnceCell<BTreeSet<CellId>>,
    inner_border: BTreeSet<CellId>,
    stats: RegionStats,
    most_centered_cell: Option<CellId>,
}

impl SuperRegion {
    /// Group children under a region rooted at the seed cell they grew from
    pub fn new(grid: &TerrainGrid, id: RegionId, root_cell: CellId, children: Vec<RegionNode>) -> Self {
        let mut region = Self {
            id,
            root_cell,
            children,
            union: OnceCell::new(),
            inner_border: BTreeSet::new(),
            stats: RegionStats::default(),
            most_centered_cell: None,
        };
        region.refresh(grid);
        region
    }

    /// Add a child and refresh the derived data
    pub fn add_child(&mut self, grid: &TerrainGrid, child: RegionNode) {
        self.children.push(child);
        self.union = OnceCell::new();
        self.refresh(grid);
    }

    fn refresh(&mut self, grid: &TerrainGrid) {
        let union = self.collect_union();
        self.stats = RegionStats::compute(grid, union.iter().copied());
        self.inner_border = inner_border_of(grid, &union);
        self.most_centered_cell =
            BoundedCellSet::from_cells(grid, union.iter().copied()).most_centered_cell(grid);
    }

    fn collect_union(&self) -> BTreeSet<CellId> {
        let mut all = BTreeSet::new();
        for child in &self.children {
            all.extend(child.cells().iter().copied());
        }
        all
    }

    #[inline]
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// The seed cell the whole group grew from
    #[inline]
    pub fn root_cell(&self) -> CellId {
        self.root_cell
    }

    #[inline]
    pub fn children(&self) -> &[RegionNode] {
        &self.children
    }

    /// Union of every child's cells
    pub fn cells(&self) -> &BTreeSet<CellId> {
        self.union.get_or_init(|| self.collect_union())
    }

    /// Check if the union has been built since the last change
    #[inline]
    pub fn is_union_cached(&self) -> bool {
        self.union.get().is_some()
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.children.iter().any(|child| child.contains(id))
    }

    #[inline]
    pub fn is_inner_border_cell(&self, id: CellId) -> bool {
        self.inner_border.contains(&id)
    }

    #[inline]
    pub fn stats(&self) -> &RegionStats {
        &self.stats
    }

    #[inline]
    pub fn most_centered_cell(&self) -> Option<CellId> {
        self.most_centered_cell
    }
}

/// Either a leaf region or a group of regions
#[derive(Debug, Clone)]
pub enum RegionNode {
    Leaf(Region),
    Super(SuperRegion),
}

impl RegionNode {
    pub fn id(&self) -> RegionId {
        match self {
            RegionNode::Leaf(r) => r.id(),
            RegionNode::Super(s) => s.id(),
        }
    }

    pub fn cells(&self) -> &BTreeSet<CellId> {
        match self {
            RegionNode::Leaf(r) => r.cells(),
            RegionNode::Super(s) => s.cells(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells().is_empty()
    }

    pub fn contains(&self, id: CellId) -> bool {
        match self {
            RegionNode::Leaf(r) => r.contains(id),
            RegionNode::Super(s) => s.contains(id),
        }
    }

    pub fn is_inner_border_cell(&self, id: CellId) -> bool {
        match self {
            RegionNode::Leaf(r) => r.is_inner_border_cell(id),
            RegionNode::Super(s) => s.is_inner_border_cell(id),
        }
    }

    pub fn stats(&self) -> &RegionStats {
        match self {
            RegionNode::Leaf(r) => r.stats(),
            RegionNode::Super(s) => s.stats(),
        }
    }

    /// The grown biome of a leaf, the dominant biome of a group
    pub fn biome(&self) -> Option<BiomeId> {
        match self {
            RegionNode::Leaf(r) => r.biome(),
            RegionNode::Super(s) => s.stats().dominant_biome,
        }
    }

    pub fn most_centered_cell(&self) -> Option<CellId> {
        match self {
            RegionNode::Leaf(r) => r.most_centered_cell(),
            RegionNode::Super(s) => s.most_centered_cell(),
        }
    }

    /// Direct children; empty for a leaf
    pub fn children(&self) -> &[RegionNode] {
        match self {
            RegionNode::Leaf(_) => &[],
            RegionNode::Super(s) => s.children(),
        }
    }

    /// Every leaf region under this node, depth first
    pub fn leaves(&self) -> Vec<&Region> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Region>) {
        match self {
            RegionNode::Leaf(r) => out.push(r),
            RegionNode::Super(s) => s.children().iter().for_each(|c| c.collect_leaves(out)),
        }
    }

    /// Find a node by id in this subtree
    pub fn find(&self, id: RegionId) -> Option<&RegionNode> {
        if self.id() == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }
}
