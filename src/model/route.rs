use serde::{Deserialize, Serialize};

/// 单段航线（有向）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    #[serde(default)]
    pub source_airport_iata: String,
    #[serde(default)]
    pub dest_airport_iata: String,
    #[serde(default)]
    pub airline_iata: String,
    #[serde(default)]
    pub airline_id: i64,
    #[serde(default)]
    pub stops: i64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub equipment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_airport_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_airport_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codeshare: Option<String>,
}

/// 一次中转：两段航线经由同一个中转机场
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub first_leg: RouteLeg,
    #[serde(default)]
    pub intermediate_airport: String,
    pub second_leg: RouteLeg,
    #[serde(default)]
    pub total_distance_miles: f64,
}

impl RouteResult {
    pub fn source(&self) -> &str {
        &self.first_leg.source_airport_iata
    }

    pub fn destination(&self) -> &str {
        &self.second_leg.dest_airport_iata
    }
}

/// 数据集规模（/stats）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub airports: u64,
    #[serde(default)]
    pub airlines: u64,
    #[serde(default)]
    pub routes: u64,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_equipment_is_treated_as_missing() {
        let route: RouteResult = serde_json::from_value(json!({
            "first_leg": {
                "source_airport_iata": "SFO", "dest_airport_iata": "DEN",
                "airline_iata": "UA", "airline_id": 5209, "stops": 0, "equipment": ""
            },
            "intermediate_airport": "DEN",
            "second_leg": {
                "source_airport_iata": "DEN", "dest_airport_iata": "JFK",
                "airline_iata": "UA", "airline_id": 5209, "stops": 0, "equipment": "320"
            },
            "total_distance_miles": 2588.4
        }))
        .unwrap();

        assert_eq!(route.first_leg.equipment, None);
        assert_eq!(route.second_leg.equipment.as_deref(), Some("320"));
        assert_eq!(route.source(), "SFO");
        assert_eq!(route.destination(), "JFK");
    }
}
