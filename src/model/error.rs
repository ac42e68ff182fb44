/// 远端服务错误（网络 / 非 2xx / 报文解析）
///
/// 非 2xx 时响应体直接作为错误信息；响应体为空时退化为 `HTTP <code>`。
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("网络请求失败: {0}")]
    Transport(String),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("响应解析失败: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body
        };
        Self::Status { status, message }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// 本地校验错误：在发起任何网络请求之前拦截
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("缺少必填字段: {0}")]
    Missing(&'static str),
    #[error("字段 {field} 需要数字，实际为 {value:?}")]
    NotNumeric { field: &'static str, value: String },
    #[error("字段 {field} 只能是 Y 或 N，实际为 {value:?}")]
    BadFlag { field: &'static str, value: String },
    #[error("未知字段: {0}")]
    UnknownField(String),
    #[error("出发和到达机场都必须填写")]
    MissingRouteEndpoint,
}

/// 增删改失败：校验失败（未发请求）或远端失败
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_error_body_falls_back_to_status_line() {
        assert_eq!(ApiError::status(404, "").to_string(), "HTTP 404");
        assert_eq!(
            ApiError::status(409, "Airport ID already exists").to_string(),
            "Airport ID already exists"
        );
    }
}
