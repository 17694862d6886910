//! Segment a synthetic world and print a summary of its regions
//!
//! Run with `RUST_LOG=debug` to follow the pass region by region.

use std::collections::BTreeMap;

use biome_regions::{
    segment, PerlinCellSampler, RegionNode, SegmentationConfigBuilder, TerrainGrid,
};

fn main() -> biome_regions::Result<()> {
    env_logger::init();

    println!("Region Segmentation Demo\n");

    let seed = 42;
    let mut grid = TerrainGrid::generate(120, 60, &PerlinCellSampler::new(seed as u32))?;
    let land = grid.cells().iter().filter(|c| !c.is_sea()).count();
    println!(
        "Grid: {}x{} ({} cells, {} land)",
        grid.width(),
        grid.height(),
        grid.cell_count(),
        land
    );

    let config = SegmentationConfigBuilder::new()
        .random_seed(seed)
        .max_region_length(20)?
        .build()?;
    let map = segment(&mut grid, config)?;

    let leaves = map.leaves();
    let groups = map
        .roots()
        .iter()
        .filter(|root| matches!(root, RegionNode::Super(_)))
        .count();
    println!("\n{:-<60}", "");
    println!("Root regions:   {}", map.roots().len());
    println!("Super regions:  {}", groups);
    println!("Leaf regions:   {}", leaves.len());
    println!("{:-<60}", "");

    // Leaf regions per biome
    let mut by_biome: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for region in &leaves {
        let name = region
            .biome()
            .and_then(|b| grid.biomes().get(b))
            .map_or_else(|| "none".to_string(), |b| b.name.clone());
        let entry = by_biome.entry(name).or_default();
        entry.0 += 1;
        entry.1 += region.len();
    }
    for (name, (count, cells)) in &by_biome {
        println!("{:12} : {:4} regions, {:6} cells", name, count, cells);
    }

    println!("\n{:-<60}", "");
    println!("Largest regions:");
    let mut largest: Vec<_> = leaves.iter().collect();
    largest.sort_by_key(|r| std::cmp::Reverse(r.len()));
    for region in largest.into_iter().take(5) {
        let stats = region.stats();
        println!(
            "region {:4}: {:4} cells, altitude {:7.1} m, rainfall {:6.1} mm, coast {:5.1}%",
            region.id(),
            region.len(),
            stats.altitude,
            stats.rainfall,
            stats.coastal_percentage
        );
    }

    Ok(())
}
