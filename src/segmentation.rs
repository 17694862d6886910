//! The segmentation pass and its result

use std::time::Instant;

use log::info;

use crate::cell::CellId;
use crate::config::SegmentationConfig;
use crate::error::Result;
use crate::grid::TerrainGrid;
use crate::grower::{PassContext, RegionGrower};
use crate::region::{Region, RegionId, RegionNode};
use crate::rng::{CellRandom, SeededCellRandom};

/// Runs one deterministic segmentation pass over a grid
///
/// Cells are visited in id order; every unclaimed land cell seeds a region
/// tree. Claims are written to the grid as regions are accepted.
///
/// # Example
///
/// ```
/// use biome_regions::*;
///
/// let mut grid = TerrainGrid::generate(64, 32, &PerlinCellSampler::new(7)).unwrap();
/// let config = SegmentationConfigBuilder::new().random_seed(7).build().unwrap();
/// let rng = SeededCellRandom::new(config.random_seed);
///
/// let map = Segmenter::new(&mut grid, config, &rng).run().unwrap();
/// for (id, owner) in map.membership().iter().enumerate() {
///     assert_eq!(owner.is_none(), grid.cell(id).is_sea());
/// }
/// ```
pub struct Segmenter<'a, R: CellRandom + ?Sized> {
    grid: &'a mut TerrainGrid,
    config: SegmentationConfig,
    rng: &'a R,
}

impl<'a, R: CellRandom + ?Sized> Segmenter<'a, R> {
    pub fn new(grid: &'a mut TerrainGrid, config: SegmentationConfig, rng: &'a R) -> Self {
        Self { grid, config, rng }
    }

    /// Segment the whole grid
    ///
    /// Previous claims are cleared first, so the same grid can be segmented
    /// again with another configuration.
    ///
    /// # Errors
    ///
    /// Any fatal consistency error aborts the pass; the grid's claims are then
    /// left partially written.
    pub fn run(self) -> Result<RegionMap> {
        let start = Instant::now();
        let cell_count = self.grid.cell_count();
        info!(
            "segmenting {}x{} grid ({} cells)",
            self.grid.width(),
            self.grid.height(),
            cell_count
        );

        self.grid.clear_claims();
        let config = self.config;
        let mut ctx = PassContext::new(cell_count);
        let mut grower = RegionGrower::new(self.grid, &config, self.rng);

        let mut roots = Vec::new();
        for seed in 0..cell_count {
            if !grower.is_available(&ctx, seed) {
                continue;
            }
            if let Some(node) = grower.build_region(&mut ctx, seed)? {
                roots.push(node);
            }
        }

        let membership = grower.grid().claims().to_vec();
        let map = RegionMap { roots, membership };
        info!(
            "segmentation finished in {:.2?}: {} root regions, {} leaf regions, {} ids",
            start.elapsed(),
            map.roots.len(),
            map.leaves().len(),
            ctx.regions_created()
        );
        Ok(map)
    }
}

/// Segment a grid with the default random service seeded from the configuration
pub fn segment(grid: &mut TerrainGrid, config: SegmentationConfig) -> Result<RegionMap> {
    let rng = SeededCellRandom::new(config.random_seed);
    Segmenter::new(grid, config, &rng).run()
}

/// Every region tree of a pass, plus cell-to-leaf membership
#[derive(Debug, Clone)]
pub struct RegionMap {
    roots: Vec<RegionNode>,
    membership: Vec<Option<RegionId>>,
}

impl RegionMap {
    /// Top-level region trees in the order their seeds were visited
    pub fn roots(&self) -> &[RegionNode] {
        &self.roots
    }

    /// Leaf region of each cell, indexed by cell id; `None` for unclaimed cells
    pub fn membership(&self) -> &[Option<RegionId>] {
        &self.membership
    }

    /// Leaf region holding a cell
    pub fn region_of(&self, cell: CellId) -> Option<RegionId> {
        self.membership.get(cell).copied().flatten()
    }

    /// Find any region, leaf or group, by id
    pub fn find(&self, id: RegionId) -> Option<&RegionNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    /// Every leaf region, depth first
    pub fn leaves(&self) -> Vec<&Region> {
        self.roots.iter().flat_map(|root| root.leaves()).collect()
    }
}
