//! In-memory station repository.
//!
//! Stands in for the database owned by the administrative surface.  The
//! binary seeds it with the default station and, in demo mode, a few
//! plants; tests populate it directly.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::info;

use crate::app::ports::StationStore;
use crate::error::StoreError;
use crate::model::{Plant, Station};

/// Identifier of the station created on first start.
pub const DEFAULT_STATION_ID: u64 = 1;

/// Name of the station created on first start.
pub const DEFAULT_STATION_NAME: &str = "Station 1";

#[derive(Debug, Default)]
pub struct MemoryStore {
    stations: Mutex<BTreeMap<u64, Station>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the default station.
    pub fn with_default_station() -> Self {
        let store = Self::new();
        store.ensure_station(DEFAULT_STATION_ID, DEFAULT_STATION_NAME);
        store
    }

    fn stations(&self) -> MutexGuard<'_, BTreeMap<u64, Station>> {
        self.stations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create station `id` unless it already exists.  Returns the record.
    pub fn ensure_station(&self, id: u64, name: &str) -> Station {
        self.stations()
            .entry(id)
            .or_insert_with(|| {
                info!("Creating station {} ({})", id, name);
                Station::new(id, name)
            })
            .clone()
    }

    /// Place `plant` on its port, replacing whatever was there.
    pub fn upsert_plant(&self, plant: Plant) -> Result<(), StoreError> {
        let mut stations = self.stations();
        let station = stations
            .get_mut(&plant.station_id)
            .ok_or(StoreError::NotFound)?;
        station.plants.retain(|p| p.port != plant.port);
        station.plants.push(plant);
        Ok(())
    }

    /// Remove the plant on `port`.  Returns whether one was there.
    pub fn remove_plant(&self, station_id: u64, port: &str) -> bool {
        let mut stations = self.stations();
        let Some(station) = stations.get_mut(&station_id) else {
            return false;
        };
        let before = station.plants.len();
        station.plants.retain(|p| p.port != port);
        station.plants.len() != before
    }
}

impl StationStore for MemoryStore {
    fn get_station(&self, id: u64) -> Result<Station, StoreError> {
        self.stations().get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn save_station(&self, station: &Station) -> Result<(), StoreError> {
        self.stations().insert(station.id, station.clone());
        Ok(())
    }

    fn find_plant_by_port(&self, port: &str, station_id: u64) -> Result<Option<Plant>, StoreError> {
        let stations = self.stations();
        let station = stations.get(&station_id).ok_or(StoreError::NotFound)?;
        Ok(station.plants.iter().find(|p| p.port == port).cloned())
    }
}
