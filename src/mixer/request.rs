//! Mix request types and the JSON wire format the HTTP layer forwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MixError, Result};
use crate::registry::{InputSlot, OutputSlot, INPUT_SLOT_COUNT};

/// Largest accepted slider weight
pub const MAX_WEIGHT: f64 = 10.0;

/// Which pair of spectral components is blended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixMode {
    /// Weighted magnitude, phasor-averaged phase
    #[default]
    MagnitudePhase,
    /// Weighted real and imaginary parts
    RealImag,
}

impl MixMode {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "magnitude_phase" => Ok(MixMode::MagnitudePhase),
            "real_imag" => Ok(MixMode::RealImag),
            other => Err(MixError::InvalidRequest {
                reason: format!("mode must be magnitude_phase or real_imag, got '{}'", other),
            }),
        }
    }
}

impl fmt::Display for MixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixMode::MagnitudePhase => write!(f, "magnitude_phase"),
            MixMode::RealImag => write!(f, "real_imag"),
        }
    }
}

/// Per-slot slider weights on the 0-10 scale
///
/// `a` weights the first component (magnitude or real), `b` the second
/// (phase or imaginary).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotWeights {
    pub a: [f64; INPUT_SLOT_COUNT],
    pub b: [f64; INPUT_SLOT_COUNT],
}

impl SlotWeights {
    pub fn new(a: [f64; INPUT_SLOT_COUNT], b: [f64; INPUT_SLOT_COUNT]) -> Self {
        let mut weights = Self::default();
        for slot in InputSlot::ALL {
            weights.set(slot, a[slot.index()], b[slot.index()]);
        }
        weights
    }

    /// Same weight pair for every slot
    pub fn uniform(a: f64, b: f64) -> Self {
        Self::new([a; INPUT_SLOT_COUNT], [b; INPUT_SLOT_COUNT])
    }

    /// Set one slot's weights, clamped to `[0, 10]`
    pub fn set(&mut self, slot: InputSlot, a: f64, b: f64) {
        self.a[slot.index()] = clamp_weight(a);
        self.b[slot.index()] = clamp_weight(b);
    }

    /// Weights scaled to `[0, 1]`
    pub fn normalized(&self, slot: InputSlot) -> (f64, f64) {
        (
            self.a[slot.index()] / MAX_WEIGHT,
            self.b[slot.index()] / MAX_WEIGHT,
        )
    }
}

fn clamp_weight(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_WEIGHT)
    } else {
        0.0
    }
}

/// Whether a region keeps what is inside or outside its rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionRole {
    #[default]
    Inner,
    Outer,
}

/// Rectangle placed on the spectral plane, in percent of each axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionMask {
    pub role: RegionRole,
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
}

impl Default for RegionMask {
    /// The whole plane, kept
    fn default() -> Self {
        Self {
            role: RegionRole::Inner,
            x_percent: 0.0,
            y_percent: 0.0,
            width_percent: 100.0,
            height_percent: 100.0,
        }
    }
}

/// Centered rectangle applied to every slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasicMask {
    pub size_percent: f64,
    /// Keep the rectangle (true) or its complement (false)
    pub applies_inner: bool,
}

impl Default for BasicMask {
    fn default() -> Self {
        Self {
            size_percent: 100.0,
            applies_inner: true,
        }
    }
}

/// Spectral masking for a whole mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskConfig {
    /// One centered window shared by every slot
    Basic(BasicMask),
    /// An independent window per slot; `None` keeps the full plane
    Region {
        regions: [Option<RegionMask>; INPUT_SLOT_COUNT],
    },
}

impl Default for MaskConfig {
    fn default() -> Self {
        MaskConfig::Basic(BasicMask::default())
    }
}

impl MaskConfig {
    pub fn basic(size_percent: f64, applies_inner: bool) -> Self {
        MaskConfig::Basic(BasicMask {
            size_percent,
            applies_inner,
        })
    }

    /// Region mode with the given per-slot rectangles
    pub fn region(entries: impl IntoIterator<Item = (InputSlot, RegionMask)>) -> Self {
        let mut regions: [Option<RegionMask>; INPUT_SLOT_COUNT] = Default::default();
        for (slot, region) in entries {
            regions[slot.index()] = Some(region);
        }
        MaskConfig::Region { regions }
    }
}

/// Everything one mix job needs besides the images
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MixRequest {
    pub mode: MixMode,
    pub weights: SlotWeights,
    pub masks: MaskConfig,
    pub target: OutputSlot,
}

impl MixRequest {
    /// Parse the JSON body of a start-mix call
    ///
    /// Weight keys start with `wa` or `wb` and end with the slot digit, e.g.
    /// `wa1` or `wb_3`. Unspecified weights are zero.
    ///
    /// # Errors
    /// - `InvalidSlot` for weight or region keys naming a slot outside 1-4
    /// - `InvalidOutputKey` for a `target_output` other than 1 or 2
    /// - `InvalidRequest` for any other malformed field
    pub fn from_json(body: &Value) -> Result<Self> {
        let object = body.as_object().ok_or_else(|| MixError::InvalidRequest {
            reason: "request body must be a JSON object".to_string(),
        })?;

        let mut weights = SlotWeights::default();
        for (key, value) in object {
            let is_a = key.starts_with("wa");
            let is_b = key.starts_with("wb");
            let Some(last) = key.chars().last().filter(|c| c.is_ascii_digit()) else {
                continue;
            };
            if !is_a && !is_b {
                continue;
            }
            let slot = InputSlot::try_from(last as u8 - b'0')?;
            let weight = number(value, key)?;
            let (a, b) = (weights.a[slot.index()], weights.b[slot.index()]);
            if is_a {
                weights.set(slot, weight, b);
            } else {
                weights.set(slot, a, weight);
            }
        }

        let mode = match object.get("mode") {
            None | Some(Value::Null) => MixMode::default(),
            Some(value) => MixMode::parse(string(value, "mode")?)?,
        };

        let target = match object.get("target_output") {
            None | Some(Value::Null) => OutputSlot::default(),
            Some(value) => {
                let port = number(value, "target_output")?;
                if port.fract() != 0.0 || !(0.0..=255.0).contains(&port) {
                    return Err(MixError::InvalidOutputKey {
                        key: value.to_string(),
                    });
                }
                OutputSlot::try_from(port as u8)?
            }
        };

        let mixing_mode = match object.get("mixing_mode") {
            None | Some(Value::Null) => "basic",
            Some(value) => string(value, "mixing_mode")?,
        };
        let masks = match mixing_mode {
            "basic" => {
                let defaults = BasicMask::default();
                let size_percent = match object.get("size") {
                    None | Some(Value::Null) => defaults.size_percent,
                    Some(value) => number(value, "size")?,
                };
                let applies_inner = match object.get("inner") {
                    None | Some(Value::Null) => defaults.applies_inner,
                    Some(value) => value.as_bool().ok_or_else(|| MixError::InvalidRequest {
                        reason: "inner must be a boolean".to_string(),
                    })?,
                };
                MaskConfig::basic(size_percent, applies_inner)
            }
            "region" => parse_regions(object.get("regions"))?,
            other => {
                return Err(MixError::InvalidRequest {
                    reason: format!("mixing_mode must be basic or region, got '{}'", other),
                })
            }
        };

        Ok(Self {
            mode,
            weights,
            masks,
            target,
        })
    }
}

/// Wire shape of one region entry
#[derive(Debug, Deserialize)]
struct RegionWire {
    #[serde(rename = "type", default)]
    role: RegionRole,
    #[serde(default, deserialize_with = "lenient_f64")]
    x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    height: Option<f64>,
}

impl From<RegionWire> for RegionMask {
    fn from(wire: RegionWire) -> Self {
        let full = RegionMask::default();
        Self {
            role: wire.role,
            x_percent: wire.x.unwrap_or(full.x_percent),
            y_percent: wire.y.unwrap_or(full.y_percent),
            width_percent: wire.width.unwrap_or(full.width_percent),
            height_percent: wire.height.unwrap_or(full.height_percent),
        }
    }
}

fn parse_regions(value: Option<&Value>) -> Result<MaskConfig> {
    let entries = match value {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(value) => serde_json::from_value::<BTreeMap<String, RegionWire>>(value.clone())
            .map_err(|e| MixError::InvalidRequest {
                reason: format!("regions: {}", e),
            })?,
    };

    let mut parsed = Vec::with_capacity(entries.len());
    for (key, wire) in entries {
        parsed.push((key.parse::<InputSlot>()?, RegionMask::from(wire)));
    }
    Ok(MaskConfig::region(parsed))
}

/// Accept numbers and numeric strings, as browsers send both
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => number(&v, "region field")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn number(value: &Value, field: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| MixError::InvalidRequest {
            reason: format!("{} must be a number, got {}", field, value),
        })
}

fn string<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    value.as_str().ok_or_else(|| MixError::InvalidRequest {
        reason: format!("{} must be a string, got {}", field, value),
    })
}
