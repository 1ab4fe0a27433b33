//! Session configuration
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```json
//! { "distance_mode": "absolute", "precision": 3, "extrusion": { "layer_height": 0.22 } }
//! ```

use crate::error::{GCodeError, Result};
use crate::extrusion::ExtrusionConfig;
use crate::format::{CommentSymbol, LineFormatter};
use crate::modes::DistanceMode;
use crate::position::Axis;
use crate::validator;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Unix, // \n
    Windows, // \r\n
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Windows => "\r\n",
        }
    }
}

/// Initial output labels of the spatial axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisNames {
    pub x: String,
    pub y: String,
    pub z: String,
}

impl Default for AxisNames {
    fn default() -> Self {
        Self {
            x: "X".to_string(),
            y: "Y".to_string(),
            z: "Z".to_string(),
        }
    }
}

impl AxisNames {
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &str)> {
        [
            (Axis::X, self.x.as_str()),
            (Axis::Y, self.y.as_str()),
            (Axis::Z, self.z.as_str()),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcConfig {
    /// Emit arcs as line segments instead of G2/G3
    pub linearize: bool,
    /// Maximum distance between the arc and a segment chord
    pub chord_tolerance: f64,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            linearize: false,
            chord_tolerance: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    pub distance_mode: DistanceMode,
    pub precision: usize,
    /// Append instruction descriptions as inline comments
    pub comments: bool,
    pub comment_symbol: CommentSymbol,
    pub line_ending: LineEnding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    pub axis_names: AxisNames,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extrusion: Option<ExtrusionConfig>,
    pub arcs: ArcConfig,
    /// Flag every line as expecting an acknowledgment from the transport
    pub wait_for_response: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            distance_mode: DistanceMode::Relative,
            precision: 5,
            comments: true,
            comment_symbol: CommentSymbol::Semicolon,
            line_ending: LineEnding::Unix,
            header: None,
            footer: None,
            axis_names: AxisNames::default(),
            extrusion: None,
            arcs: ArcConfig::default(),
            wait_for_response: false,
        }
    }
}

impl EmitterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EmitterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        validator::precision(self.precision)?;
        let labels: Vec<&str> = self.axis_names.iter().map(|(_, label)| label).collect();
        for (i, label) in labels.iter().enumerate() {
            validator::axis_label(label)?;
            if labels[..i].contains(label) {
                return Err(GCodeError::argument(format!(
                    "axis label `{}` assigned twice",
                    label
                )));
            }
        }
        if let Some(extrusion) = &self.extrusion {
            extrusion.validate()?;
            if labels.contains(&extrusion.axis.as_str()) {
                return Err(GCodeError::argument(format!(
                    "extrusion axis `{}` collides with a spatial axis label",
                    extrusion.axis
                )));
            }
        }
        validator::positive("chord tolerance", self.arcs.chord_tolerance)?;
        Ok(())
    }

    pub fn formatter(&self) -> LineFormatter {
        LineFormatter {
            precision: self.precision,
            comments: self.comments,
            comment_symbol: self.comment_symbol,
        }
    }

    pub fn with_distance_mode(mut self, mode: DistanceMode) -> Self {
        self.distance_mode = mode;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn with_comment_symbol(mut self, symbol: CommentSymbol) -> Self {
        self.comment_symbol = symbol;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn with_axis_names(mut self, axis_names: AxisNames) -> Self {
        self.axis_names = axis_names;
        self
    }

    pub fn with_extrusion(mut self, extrusion: ExtrusionConfig) -> Self {
        self.extrusion = Some(extrusion);
        self
    }

    pub fn with_linearized_arcs(mut self, chord_tolerance: f64) -> Self {
        self.arcs = ArcConfig {
            linearize: true,
            chord_tolerance,
        };
        self
    }

    pub fn with_wait_for_response(mut self, wait: bool) -> Self {
        self.wait_for_response = wait;
        self
    }
}
