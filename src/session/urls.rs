use reqwest::Url;

/// 默认 API 基础 URL（可通过 FLIGHTDESK_API_URL 覆盖）
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// 机场相关 URL
pub fn url_airports(base: &str) -> String {
    format!("{}/airports", base)
}
pub fn url_airports_id(base: &str, id: i64) -> String {
    format!("{}/airports/{}", base, id)
}
pub fn url_airports_iata_airlines(base: &str, iata: &str) -> String {
    with_segments(base, &["airports", iata, "airlines"])
}

/// 在基础 URL 后追加路径段，每段单独做百分号编码
fn with_segments(base: &str, segments: &[&str]) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            if let Ok(mut path) = url.path_segments_mut() {
                path.pop_if_empty().extend(segments);
            }
            url.to_string()
        }
        // 基础 URL 不合法时请求本身会报错
        Err(_) => format!("{}/{}", base, segments.join("/")),
    }
}

/// 航空公司相关 URL
pub fn url_airlines(base: &str) -> String {
    format!("{}/airlines", base)
}
pub fn url_airlines_id(base: &str, id: i64) -> String {
    format!("{}/airlines/{}", base, id)
}
pub fn url_airlines_iata_airports(base: &str, iata: &str) -> String {
    with_segments(base, &["airlines", iata, "airports"])
}

/// 航线相关 URL（source / dest 通过 query 参数传递）
pub fn url_routes_one_hop(base: &str) -> String {
    format!("{}/routes/one-hop", base)
}

pub fn url_stats(base: &str) -> String {
    format!("{}/stats", base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_urls_encode_the_code_as_one_segment() {
        assert_eq!(
            url_airports_iata_airlines(DEFAULT_API_URL, "SFO"),
            "http://localhost:8080/api/airports/SFO/airlines"
        );
        assert_eq!(
            url_airports_iata_airlines(DEFAULT_API_URL, "A/B C"),
            "http://localhost:8080/api/airports/A%2FB%20C/airlines"
        );
        assert_eq!(
            url_airlines_iata_airports("http://example.com/api/", "U?#%"),
            "http://example.com/api/airlines/U%3F%23%25/airports"
        );
        assert_eq!(
            url_airlines_iata_airports(DEFAULT_API_URL, "A\\B"),
            "http://localhost:8080/api/airlines/A%5CB/airports"
        );
    }
}
