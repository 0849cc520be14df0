//! Static map layouts: spawn points, obstacle boxes and world bounds
//!
//! Maps are loaded once at startup into a [`MapCatalog`] and never mutated.
//! Every room for a given map id shares the same `Arc<MapConfig>`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::geometry::{Aabb, Point2, Vec3};

/// Uniform horizontal scale applied to the built-in layout
const MAP_SCALE: f64 = 1.8;
/// Map used when a client asks for an unknown id
pub const DEFAULT_MAP_ID: &str = "dust";

/// Immutable description of one map
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    pub id: String,
    pub spawn_points: Vec<Point2>,
    pub obstacles: Vec<Aabb>,
    pub world_half_extent: f64,
}

/// Errors raised while loading map definitions
#[derive(Debug, thiserror::Error)]
pub enum MapConfigError {
    #[error("Failed to read map config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse map config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid map config: {0}")]
    Invalid(String),
}

/// On-disk format of a map catalog
#[derive(Debug, Deserialize)]
struct CatalogFile {
    default: String,
    maps: Vec<MapConfig>,
}

/// All maps known to the server, keyed by canonical id
#[derive(Debug, Clone)]
pub struct MapCatalog {
    default: Arc<MapConfig>,
    maps: HashMap<String, Arc<MapConfig>>,
}

impl MapCatalog {
    /// Build a catalog, validating every map
    pub fn new(default_id: impl Into<String>, maps: Vec<MapConfig>) -> Result<Self, MapConfigError> {
        let default_id = default_id.into();
        if maps.is_empty() {
            return Err(MapConfigError::Invalid("no maps defined".into()));
        }

        let mut by_id = HashMap::with_capacity(maps.len());
        for map in maps {
            if map.spawn_points.is_empty() {
                return Err(MapConfigError::Invalid(format!("map '{}' has no spawn points", map.id)));
            }
            if !(map.world_half_extent.is_finite() && map.world_half_extent > 0.0) {
                return Err(MapConfigError::Invalid(format!(
                    "map '{}' has a non-positive world extent",
                    map.id
                )));
            }
            if let Some(bad) = map.obstacles.iter().position(|b| !b.is_well_formed()) {
                return Err(MapConfigError::Invalid(format!(
                    "map '{}' obstacle {} has min > max",
                    map.id, bad
                )));
            }
            by_id.insert(map.id.clone(), Arc::new(map));
        }

        let Some(default) = by_id.get(&default_id).cloned() else {
            return Err(MapConfigError::Invalid(format!(
                "default map '{}' is not defined",
                default_id
            )));
        };

        Ok(Self {
            default,
            maps: by_id,
        })
    }

    /// The three built-in maps. They share one layout and differ only by id.
    pub fn builtin() -> Self {
        let maps = ["dust", "mirage", "city"]
            .into_iter()
            .map(|id| MapConfig {
                id: id.to_string(),
                spawn_points: builtin_spawn_points(),
                obstacles: builtin_obstacles(),
                world_half_extent: 120.0 * MAP_SCALE,
            })
            .collect();

        Self::new(DEFAULT_MAP_ID, maps).expect("built-in maps are valid")
    }

    /// Load a catalog from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MapConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, MapConfigError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Self::new(file.default, file.maps)
    }

    /// Resolve a requested id to a known one, falling back to the default map
    pub fn canonical_id<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(id) if self.maps.contains_key(id) => id,
            _ => &self.default.id,
        }
    }

    /// Look up a map, falling back to the default map
    pub fn get(&self, requested: Option<&str>) -> Arc<MapConfig> {
        requested
            .and_then(|id| self.maps.get(id))
            .unwrap_or(&self.default)
            .clone()
    }

    pub fn default_id(&self) -> &str {
        &self.default.id
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

// (x, z, width, depth, height) before scaling
const BUILDINGS: [(f64, f64, f64, f64, f64); 11] = [
    (-40.0, -10.0, 18.0, 16.0, 12.0),
    (30.0, -12.0, 20.0, 16.0, 12.0),
    (-10.0, 30.0, 16.0, 20.0, 10.0),
    (32.0, 30.0, 14.0, 14.0, 12.0),
    (-55.0, 18.0, 16.0, 16.0, 10.0),
    (14.0, -50.0, 18.0, 16.0, 10.0),
    (0.0, 0.0, 12.0, 10.0, 9.0),
    (-34.0, -44.0, 18.0, 16.0, 10.0),
    (52.0, 4.0, 14.0, 12.0, 10.0),
    (0.0, 60.0, 18.0, 14.0, 9.0),
    (-60.0, -40.0, 16.0, 16.0, 10.0),
];

// Crates and pillars: (min, max) corners before horizontal scaling
const COVER_PROPS: [([f64; 3], [f64; 3]); 19] = [
    ([-8.0, 0.0, 2.0], [-4.0, 2.0, 6.0]),
    ([0.0, 0.0, -10.0], [4.0, 2.0, -6.0]),
    ([10.0, 0.0, 4.0], [14.0, 3.0, 8.0]),
    ([-14.0, 0.0, -2.0], [-10.0, 2.5, 2.0]),
    ([6.0, 0.0, 10.0], [8.0, 4.0, 12.0]),
    ([-16.0, 0.0, 4.0], [-14.0, 4.0, 6.0]),
    ([-14.0, 0.0, -10.0], [-10.0, 2.5, -6.0]),
    ([18.0, 0.0, -14.0], [22.0, 3.0, -10.0]),
    ([6.0, 0.0, 14.0], [10.0, 3.0, 18.0]),
    ([-8.0, 0.0, 24.0], [2.0, 3.5, 30.0]),
    ([16.0, 0.0, -26.0], [28.0, 4.0, -18.0]),
    ([-28.0, 0.0, -28.0], [-20.0, 3.0, -20.0]),
    ([-12.0, 0.0, 32.0], [4.0, 4.0, 38.0]),
    ([20.0, 0.0, 52.0], [34.0, 4.0, 60.0]),
    ([46.0, 0.0, -8.0], [58.0, 6.0, 10.0]),
    ([-14.0, 0.0, 20.0], [-2.0, 4.0, 30.0]),
    ([16.0, 0.0, -26.0], [28.0, 5.0, -14.0]),
    ([-30.0, 0.0, -30.0], [-18.0, 4.0, -18.0]),
    ([6.0, 0.0, 44.0], [16.0, 4.0, 56.0]),
];

const SPAWN_POINTS: [(f64, f64); 20] = [
    (-42.0, -16.0),
    (-36.0, 10.0),
    (26.0, -28.0),
    (44.0, -12.0),
    (-10.0, 22.0),
    (-10.0, 42.0),
    (30.0, 14.0),
    (40.0, 36.0),
    (-56.0, 14.0),
    (-50.0, 32.0),
    (8.0, -34.0),
    (6.0, -54.0),
    (-44.0, -30.0),
    (52.0, 8.0),
    (12.0, 8.0),
    (-6.0, -10.0),
    (0.0, 64.0),
    (-62.0, -26.0),
    (22.0, 50.0),
    (-30.0, 52.0),
];

fn builtin_obstacles() -> Vec<Aabb> {
    // Buildings grow only partly in height so rooftops stay reachable
    let height_scale = 1.0 + (MAP_SCALE - 1.0) * 0.35;

    let buildings = BUILDINGS.iter().map(|&(x, z, w, d, h)| {
        let (x, z, w, d) = (x * MAP_SCALE, z * MAP_SCALE, w * MAP_SCALE, d * MAP_SCALE);
        Aabb::new(
            Vec3::new(x - w / 2.0, 0.0, z - d / 2.0),
            Vec3::new(x + w / 2.0, h * height_scale, z + d / 2.0),
        )
    });

    let props = COVER_PROPS.iter().map(|&(min, max)| {
        Aabb::new(
            Vec3::new(min[0] * MAP_SCALE, min[1], min[2] * MAP_SCALE),
            Vec3::new(max[0] * MAP_SCALE, max[1], max[2] * MAP_SCALE),
        )
    });

    buildings.chain(props).collect()
}

fn builtin_spawn_points() -> Vec<Point2> {
    SPAWN_POINTS
        .iter()
        .map(|&(x, z)| Point2::new(x * MAP_SCALE, z * MAP_SCALE))
        .collect()
}
