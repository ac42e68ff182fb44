use crate::model::{Airline, Airport, RelationEntry, RouteResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Serialize)]
pub struct AirportsResponse {
    #[serde(default)]
    pub airports: Vec<Airport>,
    pub total: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AirlinesResponse {
    #[serde(default)]
    pub airlines: Vec<Airline>,
    pub total: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OneHopResponse {
    pub source: Option<String>,
    pub destination: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteResult>,
    pub total_routes: Option<usize>,
}

/// 解析关联列表
///
/// 兼容两种报文：
/// - 嵌套 `{"airline": {...} | null, "route_count": 7}`
/// - 平铺 `{...机场字段..., "route_count": 7}`
///
/// 关联实体为空或无法解析时记为 `related: None`，不让整个列表失败。
pub fn decode_relations<R: DeserializeOwned>(
    body: &Value,
    list_key: &str,
    nested_key: &str,
) -> Vec<RelationEntry<R>> {
    let Some(items) = body.get(list_key).and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| {
            let route_count = item
                .get("route_count")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            let related = match item.get(nested_key) {
                Some(nested) if nested.is_null() => None,
                Some(nested) => serde_json::from_value::<R>(nested.clone()).ok(),
                None if item.is_object() => serde_json::from_value::<R>(item.clone()).ok(),
                None => None,
            };
            RelationEntry {
                related,
                route_count,
            }
        })
        .collect()
}
