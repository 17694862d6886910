//! Cell sets with a wraparound-aware bounding rectangle
//!
//! A [`BoundedCellSet`] keeps its extreme members up to date as cells are
//! added, so the bounding rectangle of a growing region is always known
//! without rescanning. Longitude wraps: a set straddling the seam has its left
//! edge at a larger column than its right edge.

use std::collections::BTreeSet;

use glam::{DVec2, Vec2};

use crate::cell::CellId;
use crate::grid::TerrainGrid;
use crate::spatial::{grid_point, SpatialIndex};

/// Extreme members and the column span they define
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extents {
    top: CellId,
    bottom: CellId,
    left: CellId,
    right: CellId,
    top_lat: u32,
    bottom_lat: u32,
    left_lon: u32,
    /// Number of columns covered, starting at `left_lon` and going east
    span: u32,
}

impl Extents {
    fn single(id: CellId, longitude: u32, latitude: u32) -> Self {
        Self {
            top: id,
            bottom: id,
            left: id,
            right: id,
            top_lat: latitude,
            bottom_lat: latitude,
            left_lon: longitude,
            span: 1,
        }
    }

    fn rows(&self) -> u32 {
        self.bottom_lat - self.top_lat + 1
    }
}

/// A mutable set of distinct cells with an incrementally tracked bounding rectangle
///
/// Extreme ties are broken towards the lower cell id. Merging rebuilds the
/// rectangle from the members, so merges commute and associate. Members
/// iterate in ascending id order.
///
/// Area and member count are cached; they are refreshed by [`update`](Self::update).
#[derive(Debug, Clone, Default)]
pub struct BoundedCellSet {
    cells: BTreeSet<CellId>,
    extents: Option<Extents>,
    wraps: bool,
    rectangle_area: u64,
    member_count: usize,
    dirty: bool,
}

impl BoundedCellSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an up-to-date set from arbitrary cells
    ///
    /// The column span is the tightest arc around the members, found from the
    /// widest gap between occupied columns.
    pub fn from_cells<I>(grid: &TerrainGrid, cells: I) -> Self
    where
        I: IntoIterator<Item = CellId>,
    {
        let mut set = Self::new();
        set.cells.extend(cells);
        set.recompute_extents(grid);
        set.update();
        set
    }

    /// Add a cell, widening the rectangle towards it
    ///
    /// A cell outside the column span extends whichever edge needs fewer
    /// columns to reach it. Returns `false` if the cell was already a member.
    pub fn add(&mut self, grid: &TerrainGrid, id: CellId) -> bool {
        if !self.cells.insert(id) {
            return false;
        }
        self.dirty = true;

        let cell = grid.cell(id);
        let (lon, lat) = (cell.longitude, cell.latitude);
        let width = grid.width();

        let Some(e) = self.extents.as_mut() else {
            self.extents = Some(Extents::single(id, lon, lat));
            self.wraps = false;
            return true;
        };

        if lat < e.top_lat || (lat == e.top_lat && id < e.top) {
            e.top = id;
            e.top_lat = lat;
        }
        if lat > e.bottom_lat || (lat == e.bottom_lat && id < e.bottom) {
            e.bottom = id;
            e.bottom_lat = lat;
        }

        let offset = grid.longitude_offset(e.left_lon, lon);
        if offset < e.span {
            if offset == 0 && id < e.left {
                e.left = id;
            }
            if offset == e.span - 1 && id < e.right {
                e.right = id;
            }
        } else {
            let grow_east = offset - (e.span - 1);
            let grow_west = width - offset;
            if grow_east <= grow_west {
                e.span = offset + 1;
                e.right = id;
            } else {
                e.left_lon = lon;
                e.span += grow_west;
                e.left = id;
            }
        }
        self.wraps = e.left_lon + e.span > width;
        true
    }

    /// Recompute the cached rectangle area and member count
    pub fn update(&mut self) {
        self.rectangle_area = self
            .extents
            .map(|e| e.span as u64 * e.rows() as u64)
            .unwrap_or(0);
        self.member_count = self.cells.len();
        self.dirty = false;
    }

    /// Union another set into this one
    ///
    /// The rectangle is rebuilt from the merged members, so it matches
    /// [`from_cells`](Self::from_cells) on the union whatever order a chain of
    /// merges runs in.
    pub fn merge(&mut self, grid: &TerrainGrid, other: &BoundedCellSet) {
        if other.cells.is_empty() {
            return;
        }
        self.cells.extend(other.cells.iter().copied());
        self.dirty = true;
        self.recompute_extents(grid);
    }

    /// Remove every member of `cells`, shrinking the rectangle to what remains
    pub fn remove_all(&mut self, grid: &TerrainGrid, cells: &BTreeSet<CellId>) {
        let before = self.cells.len();
        self.cells.retain(|id| !cells.contains(id));
        if self.cells.len() != before {
            self.recompute_extents(grid);
            self.dirty = true;
        }
    }

    /// Check if a cell lies within the bounding rectangle (not necessarily a member)
    pub fn is_enclosed(&self, grid: &TerrainGrid, id: CellId) -> bool {
        let Some(e) = self.extents else {
            return false;
        };
        let cell = grid.cell(id);
        cell.latitude >= e.top_lat
            && cell.latitude <= e.bottom_lat
            && grid.longitude_offset(e.left_lon, cell.longitude) < e.span
    }

    /// Check if another set's rectangle lies inside this one's
    ///
    /// A rectangle spanning every column contains any column range.
    pub fn contains_rectangle(&self, grid: &TerrainGrid, other: &BoundedCellSet) -> bool {
        let (Some(outer), Some(inner)) = (self.extents, other.extents) else {
            return false;
        };
        if inner.top_lat < outer.top_lat || inner.bottom_lat > outer.bottom_lat {
            return false;
        }
        outer.span >= grid.width()
            || grid.longitude_offset(outer.left_lon, inner.left_lon) + inner.span <= outer.span
    }

    /// Mean member position, longitude unwrapped eastwards from the left edge
    ///
    /// The x coordinate may exceed the grid width for sets that straddle the seam.
    pub fn centroid(&self, grid: &TerrainGrid) -> Option<Vec2> {
        let e = self.extents?;
        let mut sum = DVec2::ZERO;
        for &id in &self.cells {
            sum += self.unwrapped_position(grid, &e, id);
        }
        let mean = sum / self.cells.len() as f64;
        Some(Vec2::new(mean.x as f32, mean.y as f32))
    }

    /// Member closest to the centroid
    pub fn most_centered_cell(&self, grid: &TerrainGrid) -> Option<CellId> {
        let e = self.extents?;
        let centroid = self.centroid(grid)?;
        let members: Vec<CellId> = self.cells.iter().copied().collect();
        let points: Vec<DVec2> = members
            .iter()
            .map(|&id| {
                let p = self.unwrapped_position(grid, &e, id);
                grid_point(p.x, p.y, grid.width(), grid.height())
            })
            .collect();
        let index = SpatialIndex::new(&points);
        index
            .find_nearest(centroid.as_dvec2())
            .map(|i| members[i])
    }

    /// Check if a cell is a member
    #[inline]
    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains(&id)
    }

    /// Number of members (always current, unlike [`member_count`](Self::member_count))
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the set has no members
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Members in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.iter().copied()
    }

    /// The underlying member set
    #[inline]
    pub fn cells(&self) -> &BTreeSet<CellId> {
        &self.cells
    }

    /// Cached rectangle area as of the last [`update`](Self::update)
    #[inline]
    pub fn rectangle_area(&self) -> u64 {
        self.rectangle_area
    }

    /// Cached member count as of the last [`update`](Self::update)
    #[inline]
    pub fn member_count(&self) -> usize {
        self.member_count
    }

    /// Check if members changed since the last [`update`](Self::update)
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if the rectangle crosses the longitude seam
    #[inline]
    pub fn wraps(&self) -> bool {
        self.wraps
    }

    /// Northernmost member (lowest row)
    pub fn top(&self) -> Option<CellId> {
        self.extents.map(|e| e.top)
    }

    /// Southernmost member (highest row)
    pub fn bottom(&self) -> Option<CellId> {
        self.extents.map(|e| e.bottom)
    }

    /// Westernmost member of the column span
    pub fn left(&self) -> Option<CellId> {
        self.extents.map(|e| e.left)
    }

    /// Easternmost member of the column span
    pub fn right(&self) -> Option<CellId> {
        self.extents.map(|e| e.right)
    }

    /// Column of the rectangle's western edge
    pub fn left_longitude(&self) -> Option<u32> {
        self.extents.map(|e| e.left_lon)
    }

    /// Row of the rectangle's northern edge
    pub fn top_latitude(&self) -> Option<u32> {
        self.extents.map(|e| e.top_lat)
    }

    /// Rectangle width in columns
    pub fn rectangle_width(&self) -> u32 {
        self.extents.map(|e| e.span).unwrap_or(0)
    }

    /// Rectangle height in rows
    pub fn rectangle_height(&self) -> u32 {
        self.extents.map(|e| e.rows()).unwrap_or(0)
    }

    /// Longer side of the rectangle
    pub fn longest_side(&self) -> u32 {
        self.rectangle_width().max(self.rectangle_height())
    }

    fn unwrapped_position(&self, grid: &TerrainGrid, e: &Extents, id: CellId) -> DVec2 {
        let cell = grid.cell(id);
        let x = e.left_lon as f64 + grid.longitude_offset(e.left_lon, cell.longitude) as f64;
        DVec2::new(x, cell.latitude as f64)
    }

    fn recompute_extents(&mut self, grid: &TerrainGrid) {
        let width = grid.width();
        let mut occupied = vec![false; width as usize];
        let mut top: Option<(CellId, u32)> = None;
        let mut bottom: Option<(CellId, u32)> = None;
        for &id in &self.cells {
            let cell = grid.cell(id);
            occupied[cell.longitude as usize] = true;
            top = Some(match top {
                Some(t) => pick_extreme(t, (id, cell.latitude), |x, y| x < y),
                None => (id, cell.latitude),
            });
            bottom = Some(match bottom {
                Some(b) => pick_extreme(b, (id, cell.latitude), |x, y| x > y),
                None => (id, cell.latitude),
            });
        }
        let (Some((top, top_lat)), Some((bottom, bottom_lat))) = (top, bottom) else {
            self.extents = None;
            self.wraps = false;
            return;
        };

        // The span starts just east of the widest run of empty columns
        let mut best_gap = (0u32, 0u32); // (length, first empty column)
        let mut gap_start = None;
        let mut gap_len = 0u32;
        for step in 0..2 * width {
            let column = step % width;
            if occupied[column as usize] {
                if gap_len > best_gap.0 {
                    best_gap = (gap_len, gap_start.unwrap_or(column));
                }
                gap_len = 0;
                gap_start = None;
            } else {
                if gap_start.is_none() {
                    gap_start = Some(column);
                }
                gap_len = (gap_len + 1).min(width);
            }
        }
        let (gap_len, gap_first) = best_gap;
        let (left_lon, span) = if gap_len == 0 {
            (0, width)
        } else {
            ((gap_first + gap_len) % width, width - gap_len)
        };
        let right_lon = (left_lon + span - 1) % width;

        let mut left = None;
        let mut right = None;
        for &id in &self.cells {
            let lon = grid.cell(id).longitude;
            if lon == left_lon && left.is_none() {
                left = Some(id);
            }
            if lon == right_lon && right.is_none() {
                right = Some(id);
            }
        }

        self.extents = Some(Extents {
            top,
            bottom,
            left: left.unwrap_or(top),
            right: right.unwrap_or(top),
            top_lat,
            bottom_lat,
            left_lon,
            span,
        });
        self.wraps = left_lon + span > width;
    }
}

/// Pick the extreme of two `(cell, coordinate)` pairs; equal coordinates keep the lower id
fn pick_extreme<F>(a: (CellId, u32), b: (CellId, u32), better: F) -> (CellId, u32)
where
    F: Fn(u32, u32) -> bool,
{
    if better(b.1, a.1) || (b.1 == a.1 && b.0 < a.0) {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::uniform_grid;

    fn set_of(grid: &TerrainGrid, coords: &[(u32, u32)]) -> BoundedCellSet {
        let mut set = BoundedCellSet::new();
        for &(lon, lat) in coords {
            set.add(grid, grid.id_of(lon, lat));
        }
        set.update();
        set
    }

    #[test]
    fn test_add_tracks_rectangle() {
        let grid = uniform_grid(20, 10);
        let set = set_of(&grid, &[(3, 2), (4, 2), (4, 3), (6, 5)]);

        assert_eq!(set.rectangle_width(), 4);
        assert_eq!(set.rectangle_height(), 4);
        assert_eq!(set.rectangle_area(), 16);
        assert_eq!(set.member_count(), 4);
        assert_eq!(set.top(), Some(grid.id_of(3, 2)));
        assert_eq!(set.bottom(), Some(grid.id_of(6, 5)));
        assert_eq!(set.left(), Some(grid.id_of(3, 2)));
        assert_eq!(set.right(), Some(grid.id_of(6, 5)));
        assert!(!set.wraps());
        assert!(!set.is_dirty());
    }

    #[test]
    fn test_add_is_idempotent() {
        let grid = uniform_grid(10, 4);
        let mut set = BoundedCellSet::new();
        assert!(set.add(&grid, 5));
        assert!(!set.add(&grid, 5));
        set.update();
        assert_eq!(set.member_count(), 1);
        assert_eq!(set.rectangle_area(), 1);
    }

    #[test]
    fn test_add_across_seam() {
        let grid = uniform_grid(10, 4);
        let set = set_of(&grid, &[(9, 1), (0, 1), (1, 1), (8, 2)]);

        assert!(set.wraps());
        assert_eq!(set.rectangle_width(), 4);
        assert_eq!(set.left_longitude(), Some(8));
        assert_eq!(set.left(), Some(grid.id_of(8, 2)));
        assert_eq!(set.right(), Some(grid.id_of(1, 1)));
        assert!(set.is_enclosed(&grid, grid.id_of(0, 2)));
        assert!(!set.is_enclosed(&grid, grid.id_of(5, 1)));
        assert!(!set.is_enclosed(&grid, grid.id_of(0, 3)));
    }

    #[test]
    fn test_every_member_is_enclosed() {
        let grid = uniform_grid(12, 8);
        let coords = [(11, 0), (0, 1), (2, 2), (10, 7), (5, 4), (7, 3), (1, 1)];
        let set = set_of(&grid, &coords);

        assert!(set.rectangle_area() >= set.member_count() as u64);
        for id in set.iter() {
            assert!(set.is_enclosed(&grid, id));
        }
    }

    #[test]
    fn test_merge_is_commutative() {
        let grid = uniform_grid(16, 8);
        let a = set_of(&grid, &[(14, 1), (15, 1), (15, 2)]);
        let b = set_of(&grid, &[(1, 3), (2, 3), (2, 4)]);

        let mut ab = a.clone();
        ab.merge(&grid, &b);
        ab.update();
        let mut ba = b.clone();
        ba.merge(&grid, &a);
        ba.update();

        assert_eq!(ab.extents, ba.extents);
        assert_eq!(ab.rectangle_area(), ba.rectangle_area());
        assert_eq!(ab.cells(), ba.cells());
        assert!(ab.wraps());
        assert_eq!(ab.left_longitude(), Some(14));
        assert_eq!(ab.rectangle_width(), 5);
        for id in ab.iter() {
            assert!(ab.is_enclosed(&grid, id));
        }
    }

    #[test]
    fn test_merge_ties_resolve_the_same_way() {
        let grid = uniform_grid(10, 6);
        // Two arcs of equal length either way around
        let a = set_of(&grid, &[(0, 1), (1, 1)]);
        let b = set_of(&grid, &[(5, 1), (6, 1)]);

        let mut ab = a.clone();
        ab.merge(&grid, &b);
        let mut ba = b.clone();
        ba.merge(&grid, &a);

        assert_eq!(ab.extents, ba.extents);
        assert_eq!(ab.left_longitude(), Some(5));
        assert_eq!(ab.rectangle_width(), 7);
    }

    #[test]
    fn test_merge_is_associative() {
        let grid = uniform_grid(20, 4);
        let a = set_of(&grid, &[(0, 1)]);
        let b = set_of(&grid, &[(10, 1)]);
        let c = set_of(&grid, &[(15, 2)]);

        let mut ab_c = a.clone();
        ab_c.merge(&grid, &b);
        ab_c.merge(&grid, &c);
        ab_c.update();

        let mut bc = b.clone();
        bc.merge(&grid, &c);
        let mut a_bc = a.clone();
        a_bc.merge(&grid, &bc);
        a_bc.update();

        let whole = BoundedCellSet::from_cells(&grid, ab_c.iter());
        assert_eq!(ab_c.extents, a_bc.extents);
        assert_eq!(ab_c.extents, whole.extents);
        // The widest empty run is columns 1..=9, so the span starts at 10
        assert_eq!(ab_c.left_longitude(), Some(10));
        assert_eq!(ab_c.rectangle_width(), 11);
        assert_eq!(ab_c.rectangle_area(), a_bc.rectangle_area());
        assert_eq!(ab_c.rectangle_area(), 22);
        assert!(ab_c.wraps());
    }

    #[test]
    fn test_merge_with_empty() {
        let grid = uniform_grid(10, 6);
        let a = set_of(&grid, &[(2, 2), (3, 2)]);
        let mut empty = BoundedCellSet::new();
        empty.merge(&grid, &a);
        empty.update();
        assert_eq!(empty.rectangle_area(), a.rectangle_area());

        let mut a2 = a.clone();
        a2.merge(&grid, &BoundedCellSet::new());
        assert_eq!(a2.extents, a.extents);
    }

    #[test]
    fn test_from_cells_finds_tightest_span() {
        let grid = uniform_grid(10, 4);
        let cells = [grid.id_of(8, 0), grid.id_of(0, 0), grid.id_of(9, 1), grid.id_of(1, 1)];
        let set = BoundedCellSet::from_cells(&grid, cells);

        assert_eq!(set.left_longitude(), Some(8));
        assert_eq!(set.rectangle_width(), 4);
        assert_eq!(set.rectangle_area(), 8);
        assert!(set.wraps());
    }

    #[test]
    fn test_full_band_spans_whole_width() {
        let grid = uniform_grid(6, 4);
        let set = BoundedCellSet::from_cells(&grid, (0..6).map(|lon| grid.id_of(lon, 2)));
        assert_eq!(set.rectangle_width(), 6);
        assert_eq!(set.rectangle_area(), 6);
        assert!(!set.wraps());
    }

    #[test]
    fn test_remove_all_shrinks() {
        let grid = uniform_grid(10, 6);
        let mut set = set_of(&grid, &[(1, 1), (2, 1), (3, 1), (3, 4)]);
        let gone: BTreeSet<CellId> = [grid.id_of(3, 4)].into_iter().collect();
        set.remove_all(&grid, &gone);
        assert!(set.is_dirty());
        set.update();
        assert_eq!(set.rectangle_height(), 1);
        assert_eq!(set.rectangle_area(), 3);
    }

    #[test]
    fn test_centroid_and_most_centered() {
        let grid = uniform_grid(10, 8);
        let mut coords = Vec::new();
        for lon in 2..5 {
            for lat in 3..6 {
                coords.push((lon, lat));
            }
        }
        let set = set_of(&grid, &coords);

        let centroid = set.centroid(&grid).unwrap();
        assert!((centroid.x - 3.0).abs() < 1e-5);
        assert!((centroid.y - 4.0).abs() < 1e-5);
        assert_eq!(set.most_centered_cell(&grid), Some(grid.id_of(3, 4)));
    }

    #[test]
    fn test_centroid_across_seam() {
        let grid = uniform_grid(10, 4);
        let set = set_of(&grid, &[(9, 1), (0, 1), (1, 1)]);
        let centroid = set.centroid(&grid).unwrap();
        // Unwrapped: columns 9, 10, 11
        assert!((centroid.x - 10.0).abs() < 1e-5);
        assert_eq!(set.most_centered_cell(&grid), Some(grid.id_of(0, 1)));
    }

    #[test]
    fn test_empty_set_queries() {
        let grid = uniform_grid(4, 4);
        let set = BoundedCellSet::new();
        assert!(set.is_empty());
        assert_eq!(set.centroid(&grid), None);
        assert_eq!(set.most_centered_cell(&grid), None);
        assert!(!set.is_enclosed(&grid, 0));
        assert_eq!(set.longest_side(), 0);
    }

    #[test]
    fn test_contains_rectangle() {
        let grid = uniform_grid(10, 8);
        let outer = set_of(&grid, &[(8, 1), (2, 6)]);
        let inner = set_of(&grid, &[(9, 2), (0, 3)]);
        let beyond = set_of(&grid, &[(2, 2), (3, 2)]);
        assert!(outer.contains_rectangle(&grid, &inner));
        assert!(!inner.contains_rectangle(&grid, &outer));
        assert!(!outer.contains_rectangle(&grid, &beyond));

        // A full-width band contains any column range within its rows
        let band = BoundedCellSet::from_cells(&grid, (0..10).map(|lon| grid.id_of(lon, 4)));
        let dot = set_of(&grid, &[(6, 4)]);
        assert!(band.contains_rectangle(&grid, &dot));
        assert!(!band.contains_rectangle(&grid, &inner));
    }
}
