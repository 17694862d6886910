//! Spatial indexing for nearest-member lookups
//!
//! With the `spatial-index` feature the lookup runs on a KD-tree; without it a
//! linear scan over the same points gives the same answer.

use glam::DVec2;

#[cfg(feature = "spatial-index")]
use kiddo::immutable::float::kdtree::ImmutableKdTree;
#[cfg(feature = "spatial-index")]
use kiddo::SquaredEuclidean;

/// Nearest-point index over a fixed set of planar points
///
/// KD-tree buckets cannot split runs of identical coordinates, so callers
/// should not feed points sharing an x or a y value; [`grid_point`] builds
/// points that never do.
///
/// # Example
///
/// ```
/// use biome_regions::SpatialIndex;
/// use glam::DVec2;
///
/// let points = vec![DVec2::new(0.0, 0.0), DVec2::new(4.1, 0.2), DVec2::new(2.2, 3.3)];
/// let index = SpatialIndex::new(&points);
/// assert_eq!(index.find_nearest(DVec2::new(3.9, 0.5)), Some(1));
/// ```
#[derive(Clone)]
pub struct SpatialIndex {
    #[cfg(feature = "spatial-index")]
    tree: Option<ImmutableKdTree<f64, usize, 2, 32>>,
    #[cfg(not(feature = "spatial-index"))]
    points: Vec<DVec2>,
}

impl SpatialIndex {
    /// Build an index over the points; item ids are slice positions
    pub fn new(points: &[DVec2]) -> Self {
        #[cfg(feature = "spatial-index")]
        {
            let coords: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
            let tree = if coords.is_empty() {
                None
            } else {
                Some(ImmutableKdTree::new_from_slice(&coords))
            };
            Self { tree }
        }
        #[cfg(not(feature = "spatial-index"))]
        {
            Self {
                points: points.to_vec(),
            }
        }
    }

    /// Position of the point nearest to `target`, `None` for an empty index
    pub fn find_nearest(&self, target: DVec2) -> Option<usize> {
        #[cfg(feature = "spatial-index")]
        {
            let tree = self.tree.as_ref()?;
            let result = tree.nearest_one::<SquaredEuclidean>(&[target.x, target.y]);
            Some(result.item as usize)
        }
        #[cfg(not(feature = "spatial-index"))]
        {
            let mut best: Option<(usize, f64)> = None;
            for (i, p) in self.points.iter().enumerate() {
                let d = p.distance_squared(target);
                if best.map_or(true, |(_, b)| d < b) {
                    best = Some((i, d));
                }
            }
            best.map(|(i, _)| i)
        }
    }
}

/// Planar position of a cell for nearest-member queries
///
/// `x` is the longitude unwrapped relative to a collection's left edge. Each
/// axis is nudged by a small amount derived from the other axis, so two cells
/// never share a coordinate on either axis.
pub fn grid_point(x: f64, y: f64, width: u32, height: u32) -> DVec2 {
    let nudge_x = y / (height.max(1) as f64) * 1e-3;
    let nudge_y = x / (2.0 * width.max(1) as f64) * 1e-3;
    DVec2::new(x + nudge_x, y + nudge_y)
}
