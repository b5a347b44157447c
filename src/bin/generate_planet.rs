//! Planet generator binary: generates a planet in parallel and reports block statistics.
//!
//! Usage: cargo run --release --bin generate_planet -- [OPTIONS]
//!
//! Options:
//!   --seed <SEED>     Terrain seed (default: 42)
//!   --chunks <N>      Chunks per axis (default: 5)
//!   --jobs <N>        Parallel chunk generation threads (default: all cores)
//!   --ship <SIZE>     Also generate a ship hull, "small" or "large"
//!   --out <DIR>       Write compressed chunks to DIR
//!
//! Output structure:
//!   <DIR>/
//!     planet/chunk_0_1_0.rkc
//!     ship/chunk_0_0_0.rkc

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use glam::UVec3;

use spaceblock::block::{BlockLibrary, EMPTY_BLOCK_INDEX};
use spaceblock::container::{ChunkContainer, Planet, PlanetConfig, Ship, ShipConfig};
use spaceblock::core::types::ChunkIndices;
use spaceblock::terrain::TerrainParams;
use spaceblock::voxel::serialize::compress_content;

fn main() {
    spaceblock::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let defaults = TerrainParams::default();
    let seed = parse_u32_arg(&args, "--seed").unwrap_or(defaults.seed);
    let chunks = parse_u32_arg(&args, "--chunks").unwrap_or(defaults.chunk_count.x);
    let jobs = parse_usize_arg(&args, "--jobs");
    let ship = parse_str_arg(&args, "--ship");
    let output_dir = parse_str_arg(&args, "--out").map(PathBuf::from);

    if let Some(jobs) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .expect("Failed to configure thread pool");
    }

    println!("=== Spaceblock Planet Generator ===");
    println!("Seed:   {}", seed);
    println!("Chunks: {}^3", chunks);
    println!("Jobs:   {}", rayon::current_num_threads());
    if let Some(dir) = &output_dir {
        println!("Output: {}", dir.display());
    }
    println!();

    let library = Arc::new(BlockLibrary::with_default_blocks());
    let mut planet = Planet::new(library.clone(), PlanetConfig::default());
    let params = TerrainParams {
        seed,
        chunk_count: UVec3::splat(chunks),
        ..defaults
    };

    let start = Instant::now();
    if let Err(err) = planet.generate_chunks(params) {
        eprintln!("Planet generation failed: {}", err);
        std::process::exit(1);
    }
    let elapsed = start.elapsed();

    let deformed = planet
        .chunk_map()
        .chunks()
        .filter(|chunk| chunk.geometry().is_deformed())
        .count();
    println!(
        "Generated {} chunks ({} deformed) in {:.2}s",
        planet.chunk_map().chunk_count(),
        deformed,
        elapsed.as_secs_f64()
    );

    print_block_stats(&library, &planet);

    if let Some(dir) = &output_dir {
        match write_chunks(planet.chunk_map().chunks(), &dir.join("planet")) {
            Ok(count) => println!("Wrote {} planet chunks", count),
            Err(err) => eprintln!("Failed to write planet chunks: {}", err),
        }
    }

    if let Some(size) = ship {
        let small = match size.as_str() {
            "small" => true,
            "large" => false,
            other => {
                eprintln!("Unknown ship size \"{}\", expected small or large", other);
                std::process::exit(1);
            }
        };

        let mut ship = Ship::new(library.clone(), ShipConfig::default());
        if let Err(err) = ship.generate(small) {
            eprintln!("Ship generation failed: {}", err);
            std::process::exit(1);
        }

        if let Some(dir) = &output_dir {
            match write_chunks(ship.chunk_map().chunks(), &dir.join("ship")) {
                Ok(count) => println!("Wrote {} ship chunks", count),
                Err(err) => eprintln!("Failed to write ship chunks: {}", err),
            }
        }
    }
}

fn print_block_stats(library: &BlockLibrary, planet: &Planet) {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for chunk in planet.chunk_map().chunks() {
        let guard = chunk.lock_read();
        for index in 0..library.len() {
            let index = index as spaceblock::block::BlockIndex;
            if index == EMPTY_BLOCK_INDEX {
                continue;
            }
            let count = guard.block_type_count(index);
            if count > 0 {
                let name = library
                    .get_block_data(index)
                    .map(|data| data.name.clone())
                    .unwrap_or_else(|| format!("#{}", index));
                *totals.entry(name).or_default() += count as u64;
            }
        }
    }

    println!();
    println!("Block statistics:");
    for (name, count) in &totals {
        println!("  {:<14} {:>10}", name, count);
    }
    println!("  {:<14} {:>10}", "total", totals.values().sum::<u64>());
}

fn write_chunks<'a>(
    chunks: impl Iterator<Item = &'a spaceblock::voxel::Chunk>,
    dir: &Path,
) -> spaceblock::core::Result<usize> {
    std::fs::create_dir_all(dir)?;

    let mut count = 0;
    for chunk in chunks {
        let guard = chunk.lock_read();
        if !guard.has_content() {
            continue;
        }
        std::fs::write(chunk_path(dir, chunk.indices()), compress_content(&guard)?)?;
        count += 1;
    }
    Ok(count)
}

fn chunk_path(dir: &Path, indices: ChunkIndices) -> PathBuf {
    dir.join(format!("chunk_{}_{}_{}.rkc", indices.x, indices.y, indices.z))
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
