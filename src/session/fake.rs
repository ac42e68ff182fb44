//! 内存版 `FlightApi`，记录每次调用，可按操作注入失败。

use super::api::FlightApi;
use crate::model::{Airline, Airport, ApiError, RelationEntry, RouteResult, Stats};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    airports: Vec<Airport>,
    airlines: Vec<Airline>,
    airlines_by_airport: HashMap<String, Vec<RelationEntry<Airline>>>,
    airports_by_airline: HashMap<String, Vec<RelationEntry<Airport>>>,
    routes: Vec<RouteResult>,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

pub fn airport(id: i64, iata: &str, name: &str, city: &str) -> Airport {
    Airport {
        id,
        name: name.to_string(),
        city: city.to_string(),
        country: "United States".to_string(),
        iata: iata.to_string(),
        icao: format!("K{}", iata),
        latitude: 37.6,
        longitude: -122.4,
        altitude: 13,
        timezone: None,
        dst: None,
        tz_database: None,
        kind: None,
        source: None,
    }
}

pub fn airline(id: i64, iata: &str, name: &str, country: &str) -> Airline {
    Airline {
        id,
        name: name.to_string(),
        alias: String::new(),
        iata: iata.to_string(),
        icao: String::new(),
        callsign: String::new(),
        country: country.to_string(),
        active: "Y".to_string(),
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_airports(self, airports: Vec<Airport>) -> Self {
        self.state.lock().unwrap().airports = airports;
        self
    }

    pub fn with_airlines(self, airlines: Vec<Airline>) -> Self {
        self.state.lock().unwrap().airlines = airlines;
        self
    }

    pub fn with_routes(self, routes: Vec<RouteResult>) -> Self {
        self.state.lock().unwrap().routes = routes;
        self
    }

    pub fn set_airlines_at(&self, iata: &str, entries: Vec<RelationEntry<Airline>>) {
        self.state
            .lock()
            .unwrap()
            .airlines_by_airport
            .insert(iata.to_string(), entries);
    }

    pub fn set_airports_for(&self, iata: &str, entries: Vec<RelationEntry<Airport>>) {
        self.state
            .lock()
            .unwrap()
            .airports_by_airline
            .insert(iata.to_string(), entries);
    }

    /// 让某个操作返回 500（操作名同 `calls()` 里的前缀，如 "list_airports"）
    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, op: &'static str, detail: String) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(if detail.is_empty() {
            op.to_string()
        } else {
            format!("{} {}", op, detail)
        });
        if state.failing.contains(op) {
            return Err(ApiError::status(500, format!("{} failed", op)));
        }
        Ok(())
    }
}

fn patched<T: Serialize + DeserializeOwned>(record: &T, patch: &Map<String, Value>) -> T {
    let mut value = serde_json::to_value(record).unwrap();
    if let Value::Object(map) = &mut value {
        for (k, v) in patch {
            map.insert(k.clone(), v.clone());
        }
    }
    serde_json::from_value(value).unwrap()
}

#[async_trait]
impl FlightApi for FakeApi {
    async fn list_airports(&self) -> Result<Vec<Airport>, ApiError> {
        self.record("list_airports", String::new())?;
        Ok(self.state.lock().unwrap().airports.clone())
    }

    async fn list_airlines(&self) -> Result<Vec<Airline>, ApiError> {
        self.record("list_airlines", String::new())?;
        Ok(self.state.lock().unwrap().airlines.clone())
    }

    async fn airlines_at_airport(
        &self,
        iata: &str,
    ) -> Result<Vec<RelationEntry<Airline>>, ApiError> {
        self.record("airlines_at_airport", iata.to_string())?;
        let state = self.state.lock().unwrap();
        Ok(state.airlines_by_airport.get(iata).cloned().unwrap_or_default())
    }

    async fn airports_for_airline(
        &self,
        iata: &str,
    ) -> Result<Vec<RelationEntry<Airport>>, ApiError> {
        self.record("airports_for_airline", iata.to_string())?;
        let state = self.state.lock().unwrap();
        Ok(state.airports_by_airline.get(iata).cloned().unwrap_or_default())
    }

    async fn create_airport(&self, payload: &Map<String, Value>) -> Result<Value, ApiError> {
        self.record("create_airport", Value::Object(payload.clone()).to_string())?;
        let created: Airport = serde_json::from_value(Value::Object(payload.clone()))
            .map_err(|e| ApiError::status(400, e.to_string()))?;
        self.state.lock().unwrap().airports.push(created.clone());
        Ok(serde_json::to_value(created).unwrap())
    }

    async fn create_airline(&self, payload: &Map<String, Value>) -> Result<Value, ApiError> {
        self.record("create_airline", Value::Object(payload.clone()).to_string())?;
        let created: Airline = serde_json::from_value(Value::Object(payload.clone()))
            .map_err(|e| ApiError::status(400, e.to_string()))?;
        self.state.lock().unwrap().airlines.push(created.clone());
        Ok(serde_json::to_value(created).unwrap())
    }

    async fn update_airport(
        &self,
        id: i64,
        patch: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        self.record(
            "update_airport",
            format!("{} {}", id, Value::Object(patch.clone())),
        )?;
        let mut state = self.state.lock().unwrap();
        let slot = state
            .airports
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::status(404, "Airport not found"))?;
        *slot = patched(slot, patch);
        Ok(serde_json::to_value(slot.clone()).unwrap())
    }

    async fn update_airline(
        &self,
        id: i64,
        patch: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        self.record(
            "update_airline",
            format!("{} {}", id, Value::Object(patch.clone())),
        )?;
        let mut state = self.state.lock().unwrap();
        let slot = state
            .airlines
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::status(404, "Airline not found"))?;
        *slot = patched(slot, patch);
        Ok(serde_json::to_value(slot.clone()).unwrap())
    }

    async fn delete_airport(&self, id: i64) -> Result<String, ApiError> {
        self.record("delete_airport", id.to_string())?;
        let mut state = self.state.lock().unwrap();
        let before = state.airports.len();
        state.airports.retain(|a| a.id != id);
        if state.airports.len() == before {
            return Err(ApiError::status(404, "Airport not found"));
        }
        Ok("Airport removed successfully".to_string())
    }

    async fn delete_airline(&self, id: i64) -> Result<String, ApiError> {
        self.record("delete_airline", id.to_string())?;
        let mut state = self.state.lock().unwrap();
        let before = state.airlines.len();
        state.airlines.retain(|a| a.id != id);
        if state.airlines.len() == before {
            return Err(ApiError::status(404, "Airline not found"));
        }
        Ok("Airline removed successfully".to_string())
    }

    async fn one_hop_routes(&self, source: &str, dest: &str) -> Result<Vec<RouteResult>, ApiError> {
        self.record("one_hop_routes", format!("{} {}", source, dest))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .routes
            .iter()
            .filter(|r| r.source() == source && r.destination() == dest)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<Stats, ApiError> {
        self.record("stats", String::new())?;
        let state = self.state.lock().unwrap();
        Ok(Stats {
            airports: state.airports.len() as u64,
            airlines: state.airlines.len() as u64,
            routes: state.routes.len() as u64,
        })
    }
}
