pub mod config;
pub mod terrain;

use tracing::info;

use crate::error::SimError;
use crate::model::World;

pub use config::{MAX_GRID_SIDE, WorldGenConfig};
pub use terrain::generate_terrain;

/// Generate terrain and wrap it in an empty world ready for initialization.
/// Fails when the grid is too large for event ids.
pub fn generate_world(config: &WorldGenConfig) -> Result<World, SimError> {
    config.validate()?;
    let terrain = generate_terrain(config);
    let land = terrain.cells().filter(|c| c.water_presence() < 1.0).count();
    info!(
        seed = config.seed,
        width = config.width,
        height = config.height,
        land_cells = land,
        "terrain generated"
    );
    Ok(World::new(config.clone(), terrain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_grid_is_refused() {
        let config = WorldGenConfig {
            width: 4,
            height: MAX_GRID_SIDE + 1,
            ..WorldGenConfig::default()
        };
        assert!(matches!(generate_world(&config), Err(SimError::GridSize { .. })));

        let config = WorldGenConfig {
            width: 4,
            height: 6,
            ..WorldGenConfig::default()
        };
        let world = generate_world(&config).unwrap();
        assert_eq!(world.terrain.len(), 24);
    }
}
