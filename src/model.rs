//! Station records shared with the persistence collaborator and observers.
//!
//! The controller only ever rewrites [`Station::water_level`]; plants and
//! templates are owned by the administrative surface and are read-only
//! inputs to the watering decision.

use serde::{Deserialize, Serialize};

/// Watering profile shared by plants of the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantTemplate {
    pub id: u64,
    pub name: String,
    /// Moisture percentage at or below which the plant is thirsty.
    pub water_threshold: f64,
}

/// A plant placed on one port of a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: u64,
    #[serde(rename = "stationID")]
    pub station_id: u64,
    pub active: bool,
    pub name: String,
    pub port: String,
    pub template: PlantTemplate,
}

impl Plant {
    /// Whether `moisture` is at or below this plant's threshold.
    pub fn is_thirsty(&self, moisture: f64) -> bool {
        self.template.water_threshold >= moisture
    }
}

/// Aggregate root for one physical installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: u64,
    pub name: String,
    pub water_level: f64,
    pub plants: Vec<Plant>,
}

impl Station {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            water_level: 0.0,
            plants: Vec::new(),
        }
    }
}
