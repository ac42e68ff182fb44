use super::api::FlightApi;
use super::dto::{decode_relations, AirlinesResponse, AirportsResponse, OneHopResponse};
use super::urls::*;
use crate::config::AppConfig;
use crate::model::{Airline, Airport, ApiError, RelationEntry, RouteResult, Stats};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// 成功响应体：JSON 或纯文本（DELETE 成功时服务端只回一句话）
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    fn into_value(self) -> Value {
        match self {
            Payload::Json(v) => v,
            Payload::Text(t) => Value::String(t),
        }
    }

    fn into_text(self) -> String {
        match self {
            Payload::Json(v) => v.to_string(),
            Payload::Text(t) => t,
        }
    }

    fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Payload::Json(v) => {
                serde_json::from_value(v).map_err(|e| ApiError::Decode(e.to_string()))
            }
            Payload::Text(t) => serde_json::from_str(&t).map_err(|e| ApiError::Decode(e.to_string())),
        }
    }
}

/// 航班数据服务的 HTTP 会话
///
/// 不做自动重试：失败直接交给调用方展示。
pub struct FlightSession {
    client: Client,
    base_url: String,
}

impl FlightSession {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .timeout(config.http_timeout)
            .user_agent("flightdesk/0.1");

        if let Some(raw) = &config.proxy {
            let url = if raw.contains("://") {
                raw.to_string()
            } else {
                format!("socks5h://{}", raw)
            };
            let proxy = reqwest::Proxy::all(&url).map_err(|e| ApiError::Transport(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build().map_err(|e| ApiError::Transport(e.to_string()))?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 发送请求并按状态码 / Content-Type 拆出结果
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Payload, ApiError> {
        let resp = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("{} {} 网络失败: {}", self, what, e);
                return Err(e.into());
            }
        };

        let status = resp.status();
        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        let body = resp.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            warn!("{} {} [HTTP {}]: {}", self, what, status.as_u16(), body);
            return Err(ApiError::status(status.as_u16(), body));
        }

        info!("{} {} [HTTP {}]", self, what, status.as_u16());
        if is_json {
            let value = serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
            Ok(Payload::Json(value))
        } else {
            Ok(Payload::Text(body))
        }
    }

    async fn call(
        &self,
        method: Method,
        url: &str,
        body: Option<&Map<String, Value>>,
    ) -> Result<Payload, ApiError> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request, &format!("{} {}", method, url)).await
    }
}

#[async_trait]
impl FlightApi for FlightSession {
    async fn list_airports(&self) -> Result<Vec<Airport>, ApiError> {
        let url = url_airports(&self.base_url);
        let resp: AirportsResponse = self.call(Method::GET, &url, None).await?.decode()?;
        Ok(resp.airports)
    }

    async fn list_airlines(&self) -> Result<Vec<Airline>, ApiError> {
        let url = url_airlines(&self.base_url);
        let resp: AirlinesResponse = self.call(Method::GET, &url, None).await?.decode()?;
        Ok(resp.airlines)
    }

    async fn airlines_at_airport(
        &self,
        iata: &str,
    ) -> Result<Vec<RelationEntry<Airline>>, ApiError> {
        let url = url_airports_iata_airlines(&self.base_url, iata);
        let body = self.call(Method::GET, &url, None).await?.into_value();
        Ok(decode_relations(&body, "airlines", "airline"))
    }

    async fn airports_for_airline(
        &self,
        iata: &str,
    ) -> Result<Vec<RelationEntry<Airport>>, ApiError> {
        let url = url_airlines_iata_airports(&self.base_url, iata);
        let body = self.call(Method::GET, &url, None).await?.into_value();
        Ok(decode_relations(&body, "airports", "airport"))
    }

    async fn create_airport(&self, payload: &Map<String, Value>) -> Result<Value, ApiError> {
        let url = url_airports(&self.base_url);
        Ok(self.call(Method::POST, &url, Some(payload)).await?.into_value())
    }

    async fn create_airline(&self, payload: &Map<String, Value>) -> Result<Value, ApiError> {
        let url = url_airlines(&self.base_url);
        Ok(self.call(Method::POST, &url, Some(payload)).await?.into_value())
    }

    async fn update_airport(
        &self,
        id: i64,
        patch: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let url = url_airports_id(&self.base_url, id);
        Ok(self.call(Method::PATCH, &url, Some(patch)).await?.into_value())
    }

    async fn update_airline(
        &self,
        id: i64,
        patch: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let url = url_airlines_id(&self.base_url, id);
        Ok(self.call(Method::PATCH, &url, Some(patch)).await?.into_value())
    }

    async fn delete_airport(&self, id: i64) -> Result<String, ApiError> {
        let url = url_airports_id(&self.base_url, id);
        Ok(self.call(Method::DELETE, &url, None).await?.into_text())
    }

    async fn delete_airline(&self, id: i64) -> Result<String, ApiError> {
        let url = url_airlines_id(&self.base_url, id);
        Ok(self.call(Method::DELETE, &url, None).await?.into_text())
    }

    async fn one_hop_routes(&self, source: &str, dest: &str) -> Result<Vec<RouteResult>, ApiError> {
        let url = url_routes_one_hop(&self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("source", source), ("dest", dest)]);
        let what = format!("GET {}?source={}&dest={}", url, source, dest);
        let resp: OneHopResponse = self.send(request, &what).await?.decode()?;
        Ok(resp.routes)
    }

    async fn stats(&self) -> Result<Stats, ApiError> {
        let url = url_stats(&self.base_url);
        self.call(Method::GET, &url, None).await?.decode()
    }
}

impl std::fmt::Display for FlightSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<FlightSession [{}]>", self.base_url)
    }
}

impl std::fmt::Debug for FlightSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<FlightSession [{}]>", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload_decodes_when_server_omits_content_type() {
        let payload = Payload::Text(r#"{"airports": 7698, "airlines": 6162, "routes": 67663}"#.into());
        let stats: Stats = payload.decode().unwrap();
        assert_eq!(stats.routes, 67663);

        assert_eq!(
            Payload::Text("Airport removed successfully".into()).into_text(),
            "Airport removed successfully"
        );
    }

    #[test]
    fn session_trims_trailing_slash_and_parses_proxy() {
        let config = AppConfig {
            api_url: "http://localhost:8080/api/".into(),
            proxy: Some("127.0.0.1:1080".into()),
            ..AppConfig::default()
        };
        let session = FlightSession::new(&config).unwrap();
        assert_eq!(session.base_url(), "http://localhost:8080/api");
        assert_eq!(session.to_string(), "<FlightSession [http://localhost:8080/api]>");
    }
}
