use super::debounce::Debouncer;
use super::dismiss::{DismissBus, PointerEvent, Region};
use super::stamp::{RequestSequence, Stamp};
use super::Emitter;
use crate::model::{Airline, Airport, ApiError, Entity, EntityKind};
use crate::session::FlightApi;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// 最后一次输入后的静默期
    pub debounce: Duration,
    /// 少于该字符数不发起查询
    pub min_query_len: usize,
    /// 每类建议最多条数
    pub max_per_category: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_query_len: 2,
            max_per_category: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResultSet {
    pub airports: Vec<Airport>,
    pub airlines: Vec<Airline>,
}

impl SearchResultSet {
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty() && self.airlines.is_empty()
    }
}

/// 客户端子串匹配，每类按原顺序截取前 `limit` 条
pub fn search_entities(
    airports: &[Airport],
    airlines: &[Airline],
    query: &str,
    limit: usize,
) -> SearchResultSet {
    let needle = query.to_lowercase();
    SearchResultSet {
        airports: airports
            .iter()
            .filter(|a| a.matches(&needle))
            .take(limit)
            .cloned()
            .collect(),
        airlines: airlines
            .iter()
            .filter(|a| a.matches(&needle))
            .take(limit)
            .cloned()
            .collect(),
    }
}

/// 下拉框中的一条建议
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: EntityKind,
    pub iata: String,
    pub name: String,
    pub subtitle: String,
}

impl Suggestion {
    fn of<E: Entity>(e: &E) -> Self {
        Self {
            kind: E::KIND,
            iata: e.iata().to_string(),
            name: e.name().to_string(),
            subtitle: e.subtitle(),
        }
    }
}

/// 搜索框产生的跳转
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    Select { kind: EntityKind, iata: String },
    Routes,
}

impl NavigationIntent {
    /// 等价的深链接
    pub fn to_link(&self) -> String {
        match self {
            NavigationIntent::Select { kind, iata } => {
                format!("/{}?selected={}", kind.path(), iata)
            }
            NavigationIntent::Routes => "/routes".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum SearchEvent {
    /// 静默期结束；`keystroke` 是安排这次触发的那次输入
    Due { keystroke: Stamp },
    Completed {
        stamp: Stamp,
        query: String,
        result: Result<SearchResultSet, ApiError>,
    },
}

pub struct SearchController {
    settings: SearchSettings,
    api: Arc<dyn FlightApi>,
    emit: Emitter<SearchEvent>,
    query: String,
    open: bool,
    loading: bool,
    results: SearchResultSet,
    highlighted: usize,
    debouncer: Debouncer,
    keystrokes: RequestSequence,
    lookups: RequestSequence,
    dismissals: Option<broadcast::Receiver<PointerEvent>>,
    region: Region,
}

impl SearchController {
    pub fn new(settings: SearchSettings, api: Arc<dyn FlightApi>, emit: Emitter<SearchEvent>) -> Self {
        let debouncer = Debouncer::new(settings.debounce);
        Self {
            settings,
            api,
            emit,
            query: String::new(),
            open: false,
            loading: false,
            results: SearchResultSet::default(),
            highlighted: 0,
            debouncer,
            keystrokes: RequestSequence::new(),
            lookups: RequestSequence::new(),
            dismissals: None,
            region: Region::default(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn results(&self) -> &SearchResultSet {
        &self.results
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    /// 每次输入变化都调用
    pub fn on_query_changed(&mut self, text: &str) {
        self.query = text.to_string();
        let keystroke = self.keystrokes.issue();

        if self.query.chars().count() < self.settings.min_query_len {
            self.debouncer.cancel();
            self.lookups.invalidate();
            self.loading = false;
            self.open = false;
            return;
        }

        let emit = self.emit.clone();
        self.debouncer.schedule(async move {
            emit.emit(SearchEvent::Due { keystroke });
        });
    }

    pub fn handle(&mut self, evt: SearchEvent) {
        match evt {
            SearchEvent::Due { keystroke } => {
                // abort 之前已经送进通道的触发
                if !self.keystrokes.is_current(keystroke) {
                    debug!("忽略过期的搜索触发 {}", keystroke);
                    return;
                }
                if self.query.chars().count() < self.settings.min_query_len {
                    return;
                }
                self.issue_lookup();
            }
            SearchEvent::Completed {
                stamp,
                query,
                result,
            } => {
                if !self.lookups.is_current(stamp) {
                    debug!("丢弃过期的搜索结果 {} \"{}\"", stamp, query);
                    return;
                }
                self.loading = false;
                self.results = match result {
                    Ok(set) => set,
                    Err(e) => {
                        warn!("搜索 \"{}\" 失败: {}", query, e);
                        SearchResultSet::default()
                    }
                };
                self.highlighted = 0;
                self.open = true;
            }
        }
    }

    fn issue_lookup(&mut self) {
        let stamp = self.lookups.issue();
        self.loading = true;

        let api = Arc::clone(&self.api);
        let emit = self.emit.clone();
        let query = self.query.clone();
        let limit = self.settings.max_per_category;
        info!("搜索 {} \"{}\"", stamp, query);

        tokio::spawn(async move {
            let (airports, airlines) = futures::join!(api.list_airports(), api.list_airlines());
            let result = match (airports, airlines) {
                (Ok(airports), Ok(airlines)) => {
                    Ok(search_entities(&airports, &airlines, &query, limit))
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            emit.emit(SearchEvent::Completed {
                stamp,
                query,
                result,
            });
        });
    }

    /// 当前下拉框里的建议（机场在前）
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.results
            .airports
            .iter()
            .map(Suggestion::of)
            .chain(self.results.airlines.iter().map(Suggestion::of))
            .collect()
    }

    /// 可选中的行数：有结果时在建议之后多一行"搜索航线"，没有结果时为 0
    pub fn row_count(&self) -> usize {
        match self.suggestions().len() {
            0 => 0,
            n => n + 1,
        }
    }

    pub fn move_highlight(&mut self, delta: isize) {
        let rows = self.row_count();
        if rows == 0 {
            self.highlighted = 0;
            return;
        }
        let next = self.highlighted as isize + delta;
        self.highlighted = next.clamp(0, rows as isize - 1) as usize;
    }

    /// 回车：选中高亮行
    pub fn choose_highlighted(&mut self) -> Option<NavigationIntent> {
        if !self.open || self.loading || self.results.is_empty() {
            return None;
        }
        match self.suggestions().get(self.highlighted).cloned() {
            Some(s) => Some(self.select_suggestion(&s)),
            None => Some(self.open_routes_shortcut()),
        }
    }

    pub fn select_suggestion(&mut self, suggestion: &Suggestion) -> NavigationIntent {
        self.reset();
        NavigationIntent::Select {
            kind: suggestion.kind,
            iata: suggestion.iata.clone(),
        }
    }

    pub fn open_routes_shortcut(&mut self) -> NavigationIntent {
        self.open = false;
        NavigationIntent::Routes
    }

    fn reset(&mut self) {
        self.query.clear();
        self.keystrokes.invalidate();
        self.debouncer.cancel();
        self.lookups.invalidate();
        self.loading = false;
        self.open = false;
        self.highlighted = 0;
    }

    /// 关闭下拉框，保留输入
    pub fn dismiss(&mut self) {
        self.open = false;
    }

    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// 安装点击监听（已安装则不重复）
    pub fn activate(&mut self, bus: &DismissBus) {
        if self.dismissals.is_none() {
            self.dismissals = Some(bus.subscribe());
        }
    }

    pub fn is_active(&self) -> bool {
        self.dismissals.is_some()
    }

    /// 移除点击监听，撤回所有未完成的查询
    pub fn teardown(&mut self) {
        self.dismissals = None;
        self.debouncer.cancel();
        self.keystrokes.invalidate();
        self.lookups.invalidate();
        self.loading = false;
    }

    /// 处理积压的点击：落在搜索区域外就关闭下拉框
    pub fn drain_dismissals(&mut self) {
        let Some(rx) = self.dismissals.as_mut() else {
            return;
        };
        let mut outside = false;
        loop {
            match rx.try_recv() {
                Ok(evt) => outside |= !self.region.contains(evt.column, evt.row),
                Err(TryRecvError::Lagged(n)) => {
                    debug!("点击事件积压，跳过 {} 条", n);
                    outside = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if outside {
            self.dismiss();
        }
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.teardown();
    }
}
