use crate::session::DEFAULT_API_URL;
use crate::sync::search::SearchSettings;
use anyhow::{Context, Result};
use std::time::Duration;

/// 运行配置
///
/// 来源优先级：命令行第一个参数（仅深链接） > 环境变量 > .env > 默认值。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub http_timeout: Duration,
    /// 例如 `127.0.0.1:1080`（默认按 socks5h 处理）或完整的代理 URL
    pub proxy: Option<String>,
    pub search: SearchSettings,
    /// 形如 `/airports?selected=SFO`
    pub deep_link: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            proxy: None,
            search: SearchSettings::default(),
            deep_link: None,
        }
    }
}

impl AppConfig {
    /// 加载 .env，然后读取进程环境变量
    ///
    /// 返回配置和启动信息（显示在日志面板）。
    pub fn load(cli_link: Option<String>) -> Result<(Self, Vec<String>)> {
        let mut info = Vec::new();
        match dotenv::dotenv() {
            Ok(path) => info.push(format!("✓ 找到 .env 文件: {}", path.display())),
            Err(_) => info.push("⚠ 未找到 .env 文件，使用系统环境变量".to_string()),
        }

        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        if let Some(link) = cli_link.filter(|s| !s.trim().is_empty()) {
            config.deep_link = Some(link);
        }
        info.push(format!("✓ API 地址: {}", config.api_url));
        if let Some(link) = &config.deep_link {
            info.push(format!("✓ 深链接: {}", link));
        }
        Ok((config, info))
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("FLIGHTDESK_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("FLIGHTDESK_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("FLIGHTDESK_HTTP_TIMEOUT_SECS 不是整数: {}", raw))?;
            config.http_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(raw) = get("FLIGHTDESK_DEBOUNCE_MS") {
            let ms: u64 = raw
                .parse()
                .with_context(|| format!("FLIGHTDESK_DEBOUNCE_MS 不是整数: {}", raw))?;
            config.search.debounce = Duration::from_millis(ms);
        }
        if let Some(raw) = get("FLIGHTDESK_MIN_QUERY") {
            config.search.min_query_len = raw
                .parse()
                .with_context(|| format!("FLIGHTDESK_MIN_QUERY 不是整数: {}", raw))?;
        }
        if let Some(raw) = get("FLIGHTDESK_SUGGESTIONS") {
            let n: usize = raw
                .parse()
                .with_context(|| format!("FLIGHTDESK_SUGGESTIONS 不是整数: {}", raw))?;
            config.search.max_per_category = n.max(1);
        }
        config.proxy = get("FLIGHTDESK_PROXY");
        config.deep_link = get("FLIGHTDESK_LINK");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_search_contract() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.search.debounce, Duration::from_millis(300));
        assert_eq!(config.search.min_query_len, 2);
        assert_eq!(config.search.max_per_category, 5);
        assert!(config.deep_link.is_none());
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FLIGHTDESK_API_URL", "http://flights.internal/api/"),
            ("FLIGHTDESK_DEBOUNCE_MS", "150"),
            ("FLIGHTDESK_LINK", "/airlines?selected=UA"),
            ("FLIGHTDESK_PROXY", "  "),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://flights.internal/api");
        assert_eq!(config.search.debounce, Duration::from_millis(150));
        assert_eq!(config.deep_link.as_deref(), Some("/airlines?selected=UA"));
        assert!(config.proxy.is_none());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("FLIGHTDESK_DEBOUNCE_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("FLIGHTDESK_DEBOUNCE_MS"));
    }
}
