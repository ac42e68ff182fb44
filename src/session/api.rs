use crate::model::{Airline, Airport, ApiError, RelationEntry, RouteResult, Stats};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// 远端数据服务
///
/// 控制器只依赖这个 trait；`FlightSession` 是 HTTP 实现，测试里换成内存实现。
#[async_trait]
pub trait FlightApi: Send + Sync {
    async fn list_airports(&self) -> Result<Vec<Airport>, ApiError>;
    async fn list_airlines(&self) -> Result<Vec<Airline>, ApiError>;

    /// 在该机场有航线的航空公司（含航线数）
    async fn airlines_at_airport(&self, iata: &str)
        -> Result<Vec<RelationEntry<Airline>>, ApiError>;
    /// 该航空公司通航的机场（含航线数）
    async fn airports_for_airline(&self, iata: &str)
        -> Result<Vec<RelationEntry<Airport>>, ApiError>;

    async fn create_airport(&self, payload: &Map<String, Value>) -> Result<Value, ApiError>;
    async fn create_airline(&self, payload: &Map<String, Value>) -> Result<Value, ApiError>;

    /// PATCH：只包含变化的字段
    async fn update_airport(&self, id: i64, patch: &Map<String, Value>)
        -> Result<Value, ApiError>;
    async fn update_airline(&self, id: i64, patch: &Map<String, Value>)
        -> Result<Value, ApiError>;

    /// 成功时服务端可能只返回一段纯文本
    async fn delete_airport(&self, id: i64) -> Result<String, ApiError>;
    async fn delete_airline(&self, id: i64) -> Result<String, ApiError>;

    async fn one_hop_routes(&self, source: &str, dest: &str)
        -> Result<Vec<RouteResult>, ApiError>;
    async fn stats(&self) -> Result<Stats, ApiError>;
}
