//! Error types for region segmentation

use std::fmt;

use crate::cell::CellId;
use crate::region::RegionId;

/// Errors that can abort a segmentation pass or reject its inputs
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationError {
    /// Configuration validation failed
    InvalidConfig(String),
    /// Grid dimensions or per-cell data are inconsistent
    InvalidGrid(String),
    /// Requested cell ID does not exist
    CellNotFound(usize),
    /// A cell was claimed a second time during one pass
    CellAlreadyClaimed {
        /// The contested cell
        cell: CellId,
        /// The region already holding it
        owner: RegionId,
    },
    /// Subdividing a non-empty region produced no regions
    EmptyPartition {
        /// Seed cell of the region being subdivided
        seed: CellId,
        /// Number of cells in the region
        cells: usize,
    },
    /// The weighted expansion left some parent cells without an owner
    UnreachedCells {
        /// Seed cell of the region being subdivided
        seed: CellId,
        /// Number of cells never settled
        count: usize,
    },
    /// Edge cost into a cell would divide by a non-positive influence
    NonPositiveInfluence {
        /// The cell with the offending accessibility
        cell: CellId,
    },
}

impl fmt::Display for SegmentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            SegmentationError::InvalidGrid(msg) => write!(f, "invalid grid: {}", msg),
            SegmentationError::CellNotFound(id) => write!(f, "cell not found: {}", id),
            SegmentationError::CellAlreadyClaimed { cell, owner } => {
                write!(f, "cell {} is already claimed by region {}", cell, owner)
            }
            SegmentationError::EmptyPartition { seed, cells } => write!(
                f,
                "subdivision of region seeded at {} ({} cells) produced no regions",
                seed, cells
            ),
            SegmentationError::UnreachedCells { seed, count } => write!(
                f,
                "weighted expansion of region seeded at {} left {} cells unowned",
                seed, count
            ),
            SegmentationError::NonPositiveInfluence { cell } => {
                write!(f, "non-positive expansion influence at cell {}", cell)
            }
        }
    }
}

impl std::error::Error for SegmentationError {}

/// Result type alias for segmentation operations
pub type Result<T> = std::result::Result<T, SegmentationError>;
