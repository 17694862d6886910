//! Biome-homogeneous region growing
//!
//! A region grows from a seed cell over cardinal steps while the cells it
//! reaches share the seed's locally dominant biome. The cells it had to
//! reject are traced into rings; rings lying inside the region's rectangle
//! surround pockets, which are either merged (small) or grown into regions of
//! their own (large). Undersized regions then try to absorb neighbouring
//! patches, oversized ones are subdivided, and the result is claimed.

use std::collections::{BTreeSet, HashSet, VecDeque};

use log::{debug, trace};

use crate::biome::BiomeId;
use crate::border::Border;
use crate::cell::CellId;
use crate::collection::BoundedCellSet;
use crate::config::SegmentationConfig;
use crate::error::{Result, SegmentationError};
use crate::grid::TerrainGrid;
use crate::partition;
use crate::region::{Region, RegionId, RegionNode, SuperRegion};
use crate::rng::CellRandom;

/// Bookkeeping shared by every build of one segmentation pass
///
/// Threaded explicitly through the recursive builds; nothing here outlives
/// the pass.
#[derive(Debug, Clone)]
pub struct PassContext {
    next_border_id: u32,
    next_region_id: u32,
    rng_offset: u32,
    reserved: Vec<bool>,
}

impl PassContext {
    /// Fresh context for a grid of `cell_count` cells
    pub fn new(cell_count: usize) -> Self {
        Self {
            next_border_id: 0,
            next_region_id: 0,
            rng_offset: 0,
            reserved: vec![false; cell_count],
        }
    }

    pub fn next_border_id(&mut self) -> u32 {
        let id = self.next_border_id;
        self.next_border_id += 1;
        id
    }

    pub fn next_region_id(&mut self) -> RegionId {
        let id = RegionId(self.next_region_id);
        self.next_region_id += 1;
        id
    }

    /// Offset for the next random draw; advances on every call
    pub fn next_rng_offset(&mut self) -> u32 {
        let offset = self.rng_offset;
        self.rng_offset = self.rng_offset.wrapping_add(1);
        offset
    }

    /// Number of region ids handed out so far
    pub fn regions_created(&self) -> u32 {
        self.next_region_id
    }

    /// Check if a cell is held by a region still being built
    #[inline]
    pub fn is_reserved(&self, id: CellId) -> bool {
        self.reserved.get(id).copied().unwrap_or(false)
    }

    fn reserve<I: IntoIterator<Item = CellId>>(&mut self, cells: I) {
        for id in cells {
            self.reserved[id] = true;
        }
    }

    fn release<I: IntoIterator<Item = CellId>>(&mut self, cells: I) {
        for id in cells {
            self.reserved[id] = false;
        }
    }
}

/// Cells grown from one seed, before absorption and recursion
#[derive(Debug)]
struct GrownArea {
    cells: BoundedCellSet,
    /// Largest ring outside the region's rectangle
    outer: Option<Border>,
    /// Cells of every ring outside the region's rectangle
    exterior: BTreeSet<CellId>,
    /// Enclosed areas too large to merge, left for recursion
    pockets: Vec<BTreeSet<CellId>>,
}

struct ResolvedBorders {
    outer: Option<Border>,
    exterior: BTreeSet<CellId>,
    pockets: Vec<BTreeSet<CellId>>,
}

/// Grows, resolves and claims regions on a grid
pub struct RegionGrower<'a, R: CellRandom + ?Sized> {
    grid: &'a mut TerrainGrid,
    config: &'a SegmentationConfig,
    rng: &'a R,
    dominance: Vec<Option<BiomeId>>,
}

impl<'a, R: CellRandom + ?Sized> RegionGrower<'a, R> {
    /// Prepare a grower, caching every cell's locally dominant biome
    pub fn new(grid: &'a mut TerrainGrid, config: &'a SegmentationConfig, rng: &'a R) -> Self {
        let dominance = (0..grid.cell_count())
            .map(|id| grid.dominant_biome(id, config.ignore_water_dominance))
            .collect();
        Self {
            grid,
            config,
            rng,
            dominance,
        }
    }

    #[inline]
    pub fn grid(&self) -> &TerrainGrid {
        self.grid
    }

    /// Cached locally dominant biome of a cell
    #[inline]
    pub fn dominant_biome(&self, id: CellId) -> Option<BiomeId> {
        self.dominance.get(id).copied().flatten()
    }

    /// Check if a cell could still join a new region
    pub fn is_available(&self, ctx: &PassContext, id: CellId) -> bool {
        !self.grid.is_claimed(id) && !ctx.is_reserved(id) && !self.grid.cell(id).is_sea()
    }

    /// Build the region tree seeded at `seed` and claim its cells
    ///
    /// Returns `Ok(None)` when the seed is unavailable (claimed, reserved,
    /// open sea or without any biome). Sibling regions grown inside large
    /// pockets are claimed before the seed's own region.
    ///
    /// # Errors
    ///
    /// Fails with `CellNotFound` for an out-of-range seed and propagates the
    /// fatal errors of subdivision and claiming.
    pub fn build_region(&mut self, ctx: &mut PassContext, seed: CellId) -> Result<Option<RegionNode>> {
        if self.grid.get_cell(seed).is_none() {
            return Err(SegmentationError::CellNotFound(seed));
        }
        if !self.is_available(ctx, seed) {
            return Ok(None);
        }
        let Some(biome) = self.dominant_biome(seed) else {
            return Ok(None);
        };
        let Some(mut area) = self.grow_area(ctx, seed, biome, None) else {
            return Ok(None);
        };
        ctx.reserve(area.cells.iter());

        self.absorb_undersized(ctx, &mut area);
        let siblings = self.regionalize_pockets(ctx, &area.pockets)?;
        let leaves = self.accept(ctx, seed, biome, area.cells)?;

        let mut children: Vec<RegionNode> = leaves.into_iter().map(RegionNode::Leaf).collect();
        if children.len() == 1 && siblings.is_empty() {
            return Ok(children.pop());
        }
        children.extend(siblings);
        let id = ctx.next_region_id();
        debug!(
            "super region {} rooted at cell {} groups {} children",
            id,
            seed,
            children.len()
        );
        Ok(Some(RegionNode::Super(SuperRegion::new(self.grid, id, seed, children))))
    }

    fn admits(&self, ctx: &PassContext, id: CellId, biome: BiomeId) -> bool {
        self.is_available(ctx, id) && self.dominance[id] == Some(biome)
    }

    /// Explore from `seed`, then resolve the rejected cells into rings
    ///
    /// With a cutoff, returns `None` as soon as the area grows past it.
    fn grow_area(
        &self,
        ctx: &mut PassContext,
        seed: CellId,
        biome: BiomeId,
        cutoff: Option<usize>,
    ) -> Option<GrownArea> {
        let grid: &TerrainGrid = self.grid;
        let mut cells = BoundedCellSet::new();
        let mut visited = HashSet::from([seed]);
        let mut rejected = BTreeSet::new();
        let mut queue = VecDeque::from([seed]);
        cells.add(grid, seed);

        while let Some(current) = queue.pop_front() {
            for next in grid.cell(current).cardinal_neighbors() {
                if !visited.insert(next) {
                    continue;
                }
                if self.admits(ctx, next, biome) {
                    cells.add(grid, next);
                    queue.push_back(next);
                    if cutoff.is_some_and(|max| cells.len() > max) {
                        return None;
                    }
                } else {
                    rejected.insert(next);
                }
            }
        }

        let resolved = self.resolve_borders(ctx, &mut cells, &rejected, &BTreeSet::new());
        Some(GrownArea {
            cells,
            outer: resolved.outer,
            exterior: resolved.exterior,
            pockets: resolved.pockets,
        })
    }

    /// Split rejected cells into 8-connected rings
    fn trace_borders(&self, ctx: &mut PassContext, rejected: &BTreeSet<CellId>) -> Vec<Border> {
        let grid: &TerrainGrid = self.grid;
        let mut seen = BTreeSet::new();
        let mut borders = Vec::new();

        for &start in rejected {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for (_, next) in grid.cell(current).neighbors() {
                    if rejected.contains(&next) && seen.insert(next) {
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
            let border = Border::from_cells(grid, ctx.next_border_id(), component);
            trace!(
                "border {}: {} cells, {}x{} rectangle",
                border.id(),
                border.len(),
                border.rectangle_width(),
                border.rectangle_height()
            );
            borders.push(border);
        }
        borders
    }

    /// Classify rings and settle the pockets they enclose
    ///
    /// Rings whose rectangle lies inside the region's rectangle surround
    /// pockets; the rest are exterior and the largest of them is the outer
    /// border. Pockets of at most `min_region_area` cells join `cells`.
    /// Cells in `known` belong to pockets found earlier and are skipped.
    fn resolve_borders(
        &self,
        ctx: &mut PassContext,
        cells: &mut BoundedCellSet,
        rejected: &BTreeSet<CellId>,
        known: &BTreeSet<CellId>,
    ) -> ResolvedBorders {
        let grid: &TerrainGrid = self.grid;
        cells.update();
        let borders = self.trace_borders(ctx, rejected);

        let (exterior_rings, pocket_rings): (Vec<Border>, Vec<Border>) = borders
            .into_iter()
            .partition(|border| !cells.contains_rectangle(grid, border));
        let exterior: BTreeSet<CellId> = exterior_rings.iter().flat_map(|b| b.iter()).collect();
        let outer = exterior_rings
            .into_iter()
            .max_by_key(|b| (b.rectangle_area(), std::cmp::Reverse(b.id())));

        let mut taken = known.clone();
        let mut pockets = Vec::new();
        for mut ring in pocket_rings {
            let enclosed = ring.enclosed_cell_set(
                grid,
                |id| {
                    cells.contains(id)
                        || exterior.contains(&id)
                        || taken.contains(&id)
                        || grid.is_claimed(id)
                        || ctx.is_reserved(id)
                },
                self.config.exclude_sea_from_enclosed,
            );
            if enclosed.is_empty() {
                continue;
            }
            taken.extend(enclosed.iter().copied());

            if enclosed.len() <= self.config.min_region_area {
                trace!("border {}: merging {} enclosed cells", ring.id(), enclosed.len());
                for &id in &enclosed {
                    cells.add(grid, id);
                }
                ring.consolidate(grid, &enclosed);
            } else {
                trace!("border {}: keeping {} enclosed cells apart", ring.id(), enclosed.len());
                pockets.push(enclosed);
            }
        }
        cells.update();

        ResolvedBorders {
            outer,
            exterior,
            pockets,
        }
    }

    /// Retry loop for regions at or below the minimum area
    ///
    /// Each attempt refuses patches larger than the cells still missing to
    /// exceed `min_region_area`. An attempt that gains nothing lifts that
    /// cutoff for the following attempts; a second empty attempt leaves the
    /// region undersized.
    fn absorb_undersized(&self, ctx: &mut PassContext, area: &mut GrownArea) {
        let min_area = self.config.min_region_area;
        let mut relaxed = false;
        let mut attempts = 0;

        while area.cells.len() <= min_area && attempts < self.config.absorption_attempts {
            attempts += 1;
            let cutoff = (!relaxed).then(|| min_area + 1 - area.cells.len());
            let gained = self.absorb_neighbours(ctx, area, cutoff);
            debug!(
                "absorption attempt {}: {} cells gained (cutoff {:?}), region now {} cells",
                attempts,
                gained,
                cutoff,
                area.cells.len()
            );
            if gained == 0 {
                if relaxed {
                    break;
                }
                relaxed = true;
            }
        }
    }

    /// Grow a patch from every available exterior ring cell and merge it in
    fn absorb_neighbours(&self, ctx: &mut PassContext, area: &mut GrownArea, cutoff: Option<usize>) -> usize {
        let grid: &TerrainGrid = self.grid;
        let candidates: Vec<CellId> = area
            .outer
            .iter()
            .flat_map(|b| b.iter())
            .chain(area.exterior.iter().copied())
            .collect();

        let mut gained = 0;
        for start in candidates {
            if area.cells.contains(start) || !self.is_available(ctx, start) {
                continue;
            }
            let Some(biome) = self.dominant_biome(start) else {
                continue;
            };
            let Some(patch) = self.grow_area(ctx, start, biome, cutoff) else {
                continue;
            };
            ctx.reserve(patch.cells.iter());
            gained += patch.cells.len();
            area.cells.merge(grid, &patch.cells);
            area.pockets.extend(patch.pockets);
        }

        if gained > 0 {
            let rejected: BTreeSet<CellId> = area
                .cells
                .iter()
                .flat_map(|id| grid.cell(id).cardinal_neighbors())
                .filter(|&n| !area.cells.contains(n))
                .collect();
            let known: BTreeSet<CellId> = area.pockets.iter().flatten().copied().collect();
            let resolved = self.resolve_borders(ctx, &mut area.cells, &rejected, &known);
            area.outer = resolved.outer;
            area.exterior = resolved.exterior;
            area.pockets.extend(resolved.pockets);
            ctx.reserve(area.cells.iter());
        }
        gained
    }

    /// Grow sibling regions inside the pockets that were too large to merge
    fn regionalize_pockets(
        &mut self,
        ctx: &mut PassContext,
        pockets: &[BTreeSet<CellId>],
    ) -> Result<Vec<RegionNode>> {
        let mut siblings = Vec::new();
        for pocket in pockets {
            let open: BTreeSet<CellId> = pocket
                .iter()
                .copied()
                .filter(|&id| self.is_available(ctx, id))
                .collect();
            for component in cardinal_components(self.grid, &open) {
                let seed = component
                    .iter()
                    .copied()
                    .find(|&id| self.is_available(ctx, id) && self.dominant_biome(id).is_some());
                let Some(seed) = seed else {
                    continue;
                };
                if let Some(node) = self.build_region(ctx, seed)? {
                    siblings.push(node);
                }
            }
        }
        Ok(siblings)
    }

    /// Subdivide if needed, then claim every cell for its leaf region
    fn accept(
        &mut self,
        ctx: &mut PassContext,
        seed: CellId,
        biome: BiomeId,
        cells: BoundedCellSet,
    ) -> Result<Vec<Region>> {
        let count = cells.len();
        let tiles: Vec<BoundedCellSet> = if cells.longest_side() > self.config.max_region_length {
            partition::partition(self.grid, self.config, self.rng, ctx, &cells, seed)?
                .into_iter()
                .map(|tile| BoundedCellSet::from_cells(self.grid, tile))
                .collect()
        } else {
            vec![cells]
        };
        if tiles.is_empty() {
            return Err(SegmentationError::EmptyPartition { seed, cells: count });
        }

        let mut leaves = Vec::with_capacity(tiles.len());
        for tile in tiles {
            let id = ctx.next_region_id();
            for cell in tile.iter() {
                self.grid.claim(cell, id)?;
            }
            ctx.release(tile.iter());
            debug!(
                "region {} accepted: {} cells of {}, {}x{} rectangle",
                id,
                tile.len(),
                biome,
                tile.rectangle_width(),
                tile.rectangle_height()
            );
            leaves.push(Region::new(self.grid, id, biome, tile));
        }
        Ok(leaves)
    }
}

/// Split cells into components connected by cardinal steps
pub(crate) fn cardinal_components(grid: &TerrainGrid, cells: &BTreeSet<CellId>) -> Vec<BTreeSet<CellId>> {
    let mut seen = BTreeSet::new();
    let mut components = Vec::new();
    for &start in cells {
        if !seen.insert(start) {
            continue;
        }
        let mut component = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in grid.cell(current).cardinal_neighbors() {
                if cells.contains(&next) && seen.insert(next) {
                    component.insert(next);
                    queue.push_back(next);
                }
            }
        }
        components.push(component);
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentationConfigBuilder;
    use crate::rng::SeededCellRandom;
    use crate::testing::{init_logging, pocket_grid, uniform_grid};

    fn config(min_area: usize) -> SegmentationConfig {
        SegmentationConfigBuilder::new()
            .random_seed(7)
            .min_region_area(min_area)
            .build()
            .unwrap()
    }

    fn block(grid: &TerrainGrid, lon: u32, lat: u32, w: u32, h: u32) -> BTreeSet<CellId> {
        let mut cells = BTreeSet::new();
        for y in lat..lat + h {
            for x in lon..lon + w {
                cells.insert(grid.id_of(x, y));
            }
        }
        cells
    }

    #[test]
    fn test_small_pocket_is_merged() {
        init_logging();
        let mut grid = pocket_grid(12, 10, 4, 4, 2, 4, true);
        let config = config(8);
        let rng = SeededCellRandom::new(config.random_seed);
        let mut ctx = PassContext::new(grid.cell_count());
        let mut grower = RegionGrower::new(&mut grid, &config, &rng);

        let node = grower.build_region(&mut ctx, 0).unwrap().unwrap();
        let RegionNode::Leaf(region) = node else {
            panic!("expected a single region");
        };
        assert_eq!(region.len(), 120);
        assert!(region.contains(grid.id_of(5, 6)));
        assert!(grid.claims().iter().all(|owner| *owner == Some(region.id())));
    }

    #[test]
    fn test_pocket_above_threshold_becomes_sibling() {
        init_logging();
        let mut grid = pocket_grid(12, 10, 4, 4, 3, 3, true);
        let pocket = block(&grid, 4, 4, 3, 3);
        let marsh = grid.biomes().find("marsh").unwrap();
        let config = config(8);
        let rng = SeededCellRandom::new(config.random_seed);
        let mut ctx = PassContext::new(grid.cell_count());
        let mut grower = RegionGrower::new(&mut grid, &config, &rng);

        let node = grower.build_region(&mut ctx, 0).unwrap().unwrap();
        let RegionNode::Super(group) = &node else {
            panic!("expected a super region");
        };
        assert_eq!(group.root_cell(), 0);
        assert_eq!(group.children().len(), 2);

        let outer = &group.children()[0];
        let inner = &group.children()[1];
        assert_eq!(outer.len(), 120 - 9);
        assert_eq!(inner.cells(), &pocket);
        assert_eq!(inner.biome(), Some(marsh));
        assert!(outer.cells().is_disjoint(inner.cells()));
        assert_eq!(grid.owner(grid.id_of(5, 5)), Some(inner.id()));
    }

    #[test]
    fn test_seed_must_be_available() {
        let mut grid = uniform_grid(6, 4);
        let config = config(8);
        let rng = SeededCellRandom::new(1);
        let mut ctx = PassContext::new(grid.cell_count());
        let mut grower = RegionGrower::new(&mut grid, &config, &rng);

        assert!(grower.build_region(&mut ctx, 3).unwrap().is_some());
        // Every cell now belongs to the first region
        assert!(grower.build_region(&mut ctx, 10).unwrap().is_none());
        assert!(matches!(
            grower.build_region(&mut ctx, 999),
            Err(SegmentationError::CellNotFound(999))
        ));
    }

    /// 12x6 plains with a 2x2 marsh patch at the pole; only its top row is marsh-dominated
    fn marsh_corner_grid() -> TerrainGrid {
        let mut biomes = crate::biome::BiomeTable::new();
        biomes.add("plains", false);
        biomes.add("marsh", false);
        TerrainGrid::from_fn(12, 6, biomes, |lon, lat| crate::cell::CellTerrain {
            biome_presences: if lon < 2 && lat < 2 { vec![0.0, 1.0] } else { vec![1.0, 0.0] },
            accessibility: 1.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_undersized_region_absorbs_neighbour_patch() {
        init_logging();
        let mut grid = marsh_corner_grid();
        let config = config(8);
        let rng = SeededCellRandom::new(1);
        let mut ctx = PassContext::new(grid.cell_count());

        // Claim everything but the top-left 3x3 corner for another region
        let corner = block(&grid, 0, 0, 3, 3);
        for id in 0..grid.cell_count() {
            if !corner.contains(&id) {
                grid.claim(id, RegionId(99)).unwrap();
            }
        }

        let mut grower = RegionGrower::new(&mut grid, &config, &rng);
        let node = grower.build_region(&mut ctx, 0).unwrap().unwrap();
        // Two marsh cells are undersized and absorb the plains rest of the corner
        assert_eq!(node.biome(), grower.grid().biomes().find("marsh"));
        assert_eq!(node.cells(), &corner);
        assert!(matches!(node, RegionNode::Leaf(_)));
    }

    #[test]
    fn test_relaxed_cutoff_absorbs_large_patch() {
        init_logging();
        let mut grid = marsh_corner_grid();
        let config = config(8);
        let rng = SeededCellRandom::new(1);
        let mut ctx = PassContext::new(grid.cell_count());
        let mut grower = RegionGrower::new(&mut grid, &config, &rng);

        // The 70-cell plains patch is refused under the cutoff, then taken whole
        let node = grower.build_region(&mut ctx, 0).unwrap().unwrap();
        let RegionNode::Leaf(region) = &node else {
            panic!("expected a single region");
        };
        assert_eq!(region.len(), 72);
        assert_eq!(region.biome(), grower.grid().biomes().find("marsh"));
        assert!(grower.grid().claims().iter().all(|owner| *owner == Some(region.id())));
    }

    #[test]
    fn test_undersized_region_kept_when_nothing_to_absorb() {
        init_logging();
        let mut grid = marsh_corner_grid();
        let marsh_cells: BTreeSet<CellId> = [grid.id_of(0, 0), grid.id_of(1, 0)].into_iter().collect();
        for id in 0..grid.cell_count() {
            if !marsh_cells.contains(&id) {
                grid.claim(id, RegionId(99)).unwrap();
            }
        }
        let config = config(8);
        let rng = SeededCellRandom::new(1);
        let mut ctx = PassContext::new(grid.cell_count());
        let mut grower = RegionGrower::new(&mut grid, &config, &rng);

        let node = grower.build_region(&mut ctx, 0).unwrap().unwrap();
        let RegionNode::Leaf(region) = &node else {
            panic!("expected a single region");
        };
        assert_eq!(region.len(), 2);
        assert_eq!(region.cells(), &marsh_cells);
        assert_eq!(grower.grid().owner(0), Some(region.id()));
    }

    #[test]
    fn test_cutoff_is_the_missing_area() {
        init_logging();
        // Two marsh cells need seven more; the only neighbour patch has eight
        let strip = |grid: &TerrainGrid| block(grid, 0, 0, 5, 2);
        let build = |attempts: usize| {
            let mut grid = marsh_corner_grid();
            let open = strip(&grid);
            for id in 0..grid.cell_count() {
                if !open.contains(&id) {
                    grid.claim(id, RegionId(99)).unwrap();
                }
            }
            let config = SegmentationConfigBuilder::new()
                .random_seed(1)
                .min_region_area(8)
                .absorption_attempts(attempts)
                .build()
                .unwrap();
            let rng = SeededCellRandom::new(1);
            let mut ctx = PassContext::new(grid.cell_count());
            let mut grower = RegionGrower::new(&mut grid, &config, &rng);
            grower.build_region(&mut ctx, 0).unwrap().unwrap().len()
        };

        assert_eq!(build(1), 2);
        assert_eq!(build(2), 10);
    }

    #[test]
    fn test_cardinal_components() {
        let grid = uniform_grid(8, 4);
        let cells: BTreeSet<CellId> = [
            grid.id_of(0, 0),
            grid.id_of(7, 0),
            grid.id_of(3, 2),
            grid.id_of(4, 3),
        ]
        .into_iter()
        .collect();
        let components = cardinal_components(&grid, &cells);
        // Columns 7 and 0 touch across the seam; (3,2) and (4,3) only diagonally
        assert_eq!(components.len(), 3);
        assert_eq!(components[0].len(), 2);
    }
}
