use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::foundation::core::PixelSize;
use crate::foundation::error::{MapflowError, MapflowResult};

/// JSON description of a pipeline: named nodes, the edges between their pads and the pads
/// exposed as named outputs.
///
/// ```json
/// {
///   "nodes": {
///     "osm": { "type": "tile_pyramid", "parameters": { "url": "https://tile.example/{zoom}/{x}/{y}.png" } },
///     "tint": { "type": "solid", "parameters": { "color": [0, 0, 1, 0.2] } },
///     "map": { "type": "composite" }
///   },
///   "edges": [["osm:raster", "map:layer0"], ["tint:raster", "map:layer1"]],
///   "outputs": { "default": "map:raster" },
///   "default_size": [512, 512]
/// }
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Node definitions keyed by node name.
    pub nodes: BTreeMap<String, NodeDef>,
    /// `[source "node:pad", destination "node:pad"]` pairs.
    #[serde(default)]
    pub edges: Vec<[String; 2]>,
    /// Output name to `"node:pad"`.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    /// Box that unsized renders are fitted into; 256x256 when absent.
    #[serde(default)]
    pub default_size: Option<PixelSize>,
}

/// One `{type, parameters}` node entry.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDef {
    /// Node kind, e.g. `"tile_pyramid"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific parameters.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl PipelineConfig {
    /// Parse a pipeline from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> MapflowResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| MapflowError::serde(format!("parse pipeline JSON: {e}")))
    }

    /// Parse a pipeline from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> MapflowResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            MapflowError::validation(format!("open pipeline JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }
}

/// A `"node:pad"` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PadAddr {
    /// Node name.
    pub node: String,
    /// Pad name on that node.
    pub pad: String,
}

impl std::str::FromStr for PadAddr {
    type Err = MapflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((node, pad)) if !node.is_empty() && !pad.is_empty() => Ok(Self {
                node: node.to_string(),
                pad: pad.to_string(),
            }),
            _ => Err(MapflowError::validation(format!(
                "pad reference '{s}' must look like 'node:pad'"
            ))),
        }
    }
}

impl std::fmt::Display for PadAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.pad)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
