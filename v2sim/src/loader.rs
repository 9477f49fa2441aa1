use anyhow::{Context, Result};
use v2sim_core::{Scenario, SimConfig, WorldState};
use std::path::Path;

pub fn load_scenario(path: &Path) -> Result<(WorldState, SimConfig)> {
    log::info!("Loading scenario from {:?}", path);
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    let scenario = Scenario::from_json(&json)
        .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
    let (state, config) = scenario
        .build_world()
        .with_context(|| format!("Invalid scenario {}", path.display()))?;
    Ok((state, config))
}
