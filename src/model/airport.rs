use serde::{Deserialize, Serialize};

use super::entity::{contains_ci, FieldKind, FieldSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub iata: String,
    #[serde(default)]
    pub icao: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub altitude: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz_database: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

pub(crate) const AIRPORT_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("id", FieldKind::Int),
    FieldSpec::required("name", FieldKind::Text),
    FieldSpec::required("city", FieldKind::Text),
    FieldSpec::required("country", FieldKind::Text),
    FieldSpec::required("iata", FieldKind::Text),
    FieldSpec::optional("icao", FieldKind::Text),
    FieldSpec::required("latitude", FieldKind::Float),
    FieldSpec::required("longitude", FieldKind::Float),
    FieldSpec::with_default("altitude", FieldKind::Int, "0"),
];

impl Airport {
    /// 过滤字段：IATA / 名称 / 城市
    pub fn matches_query(&self, needle: &str) -> bool {
        contains_ci(&self.iata, needle)
            || contains_ci(&self.name, needle)
            || contains_ci(&self.city, needle)
    }
}
