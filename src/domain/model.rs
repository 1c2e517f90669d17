//! Model description file schema.
//!
//! A model is a sum of components, each scaled by one amplitude parameter:
//!
//! ```text
//! μ(x) = Σ_k p_k φ_k(x)
//! ```
//!
//! so it is linear in its parameters. The file also carries the observed data.

use serde::{Deserialize, Serialize};

use crate::domain::ParameterId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub name: String,
    pub components: Vec<ComponentSpec>,
    pub data: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(flatten)]
    pub kind: ComponentKind,
    pub parameter: ParameterSpec,
}

/// Basis shape of a component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentKind {
    /// `1`
    Constant,
    /// `x`
    Linear,
    /// `x^-index` (requires `x > 0`)
    PowerLaw { index: f64 },
    /// Unit-area Gaussian line.
    Gaussian { center: f64, width: f64 },
    /// `exp(-x / scale)`
    Exponential { scale: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkSpec>,
    #[serde(default = "default_hard_min")]
    pub hard_min: f64,
    #[serde(default = "default_hard_max")]
    pub hard_max: f64,
}

/// `value = factor * value(to)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub to: ParameterId,
    #[serde(default = "default_link_factor")]
    pub factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    /// 1σ measurement error (χ² only); defaults to `sqrt(max(y, 1))`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
}

impl DataPoint {
    pub fn sigma(&self) -> f64 {
        self.error.unwrap_or_else(|| self.y.max(1.0).sqrt())
    }
}

fn default_hard_min() -> f64 {
    -1e30
}

fn default_hard_max() -> f64 {
    1e30
}

fn default_link_factor() -> f64 {
    1.0
}
