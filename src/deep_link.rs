use crate::model::EntityKind;
use reqwest::Url;

/// 深链接指向的页面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPage {
    Entity(EntityKind),
    Routes,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkError {
    #[error("深链接为空")]
    Empty,
    #[error("无法解析深链接 {0}")]
    Malformed(String),
    #[error("未知页面: {0}")]
    UnknownPage(String),
}

/// `/airports?selected=SFO`、`/routes?source=SFO&dest=JFK`、完整 URL 或裸 IATA 代码
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLink {
    pub page: Option<LinkPage>,
    pub selected: Option<String>,
    pub source: Option<String>,
    pub dest: Option<String>,
}

impl DeepLink {
    pub fn parse(raw: &str) -> Result<Self, DeepLinkError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DeepLinkError::Empty);
        }

        if !raw.contains('/') && !raw.contains('?') {
            return Ok(Self {
                selected: Some(raw.to_string()),
                ..Self::default()
            });
        }

        let base = Url::parse("http://flightdesk.local/")
            .map_err(|e| DeepLinkError::Malformed(e.to_string()))?;
        let url = base
            .join(raw)
            .map_err(|_| DeepLinkError::Malformed(raw.to_string()))?;

        let segment = url
            .path_segments()
            .and_then(|mut segs| segs.rfind(|s| !s.is_empty()))
            .unwrap_or("")
            .to_string();
        let page = match segment.as_str() {
            "" => None,
            "airports" => Some(LinkPage::Entity(EntityKind::Airport)),
            "airlines" => Some(LinkPage::Entity(EntityKind::Airline)),
            "routes" => Some(LinkPage::Routes),
            other => return Err(DeepLinkError::UnknownPage(other.to_string())),
        };

        let mut link = Self {
            page,
            ..Self::default()
        };
        for (key, value) in url.query_pairs() {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "selected" => link.selected = Some(value),
                "source" => link.source = Some(value),
                "dest" => link.dest = Some(value),
                _ => {}
            }
        }
        Ok(link)
    }

    /// 要选中的实体类型；裸代码默认按机场处理
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self.page {
            Some(LinkPage::Entity(kind)) => Some(kind),
            Some(LinkPage::Routes) => None,
            None => self.selected.as_ref().map(|_| EntityKind::Airport),
        }
    }
}
