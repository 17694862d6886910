//! Biome identifiers and the biome table a grid is classified against

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a biome in a [`BiomeTable`]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BiomeId(pub u16);

impl BiomeId {
    /// Position of this biome in per-cell presence vectors
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "biome#{}", self.0)
    }
}

/// A named biome classification
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Biome {
    /// Human-readable name, unique within its table
    pub name: String,
    /// Water biomes can be left out of local dominance
    pub is_water: bool,
}

/// Ordered set of biomes; every cell of a grid carries one presence value per entry
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiomeTable {
    biomes: Vec<Biome>,
}

impl BiomeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a biome, returning its id
    ///
    /// Registering an existing name returns the existing id.
    pub fn add(&mut self, name: &str, is_water: bool) -> BiomeId {
        if let Some(id) = self.find(name) {
            return id;
        }
        self.biomes.push(Biome {
            name: name.to_string(),
            is_water,
        });
        BiomeId((self.biomes.len() - 1) as u16)
    }

    /// Look a biome up by name
    pub fn find(&self, name: &str) -> Option<BiomeId> {
        self.biomes
            .iter()
            .position(|b| b.name == name)
            .map(|i| BiomeId(i as u16))
    }

    /// Get a biome by id
    #[inline]
    pub fn get(&self, id: BiomeId) -> Option<&Biome> {
        self.biomes.get(id.index())
    }

    /// Check if a biome is a water biome (unknown ids are not)
    #[inline]
    pub fn is_water(&self, id: BiomeId) -> bool {
        self.get(id).map(|b| b.is_water).unwrap_or(false)
    }

    /// Number of biomes in the table
    #[inline]
    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    /// Check if the table has no biomes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Iterate over `(id, biome)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (BiomeId, &Biome)> {
        self.biomes
            .iter()
            .enumerate()
            .map(|(i, b)| (BiomeId(i as u16), b))
    }
}
