use serde::{Deserialize, Serialize};

use super::entity::{contains_ci, FieldKind, FieldSpec};

fn default_active() -> String {
    "Y".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airline {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub iata: String,
    #[serde(default)]
    pub icao: String,
    #[serde(default)]
    pub callsign: String,
    #[serde(default)]
    pub country: String,
    #[serde(default = "default_active")]
    pub active: String,
}

pub(crate) const AIRLINE_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("id", FieldKind::Int),
    FieldSpec::required("name", FieldKind::Text),
    FieldSpec::optional("alias", FieldKind::Text),
    FieldSpec::required("iata", FieldKind::Text),
    FieldSpec::optional("icao", FieldKind::Text),
    FieldSpec::optional("callsign", FieldKind::Text),
    FieldSpec::required("country", FieldKind::Text),
    FieldSpec::with_default("active", FieldKind::Flag, "Y"),
];

impl Airline {
    /// 过滤字段：IATA / 名称 / 国家
    pub fn matches_query(&self, needle: &str) -> bool {
        contains_ci(&self.iata, needle)
            || contains_ci(&self.name, needle)
            || contains_ci(&self.country, needle)
    }

    pub fn is_active(&self) -> bool {
        self.active.eq_ignore_ascii_case("Y")
    }
}
