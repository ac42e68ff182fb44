use super::stamp::{RequestSequence, Stamp};
use super::{Emitter, Notice};
use crate::model::{filter_indices, visible_relations, ApiError, Entity, RelationEntry};
use crate::session::FlightApi;
use log::{debug, info, warn};
use std::sync::Arc;

/// 删除前的确认
pub trait ConfirmGate {
    fn confirm(&self, prompt: &str) -> bool;
}

/// 已经拿到答案的确认（终端里 y/n 之后，或测试里）
#[derive(Debug, Clone, Copy)]
pub struct AnswerGate(pub bool);

impl ConfirmGate for AnswerGate {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[derive(Debug)]
pub enum DirectoryEvent<E: Entity> {
    Loaded {
        stamp: Stamp,
        result: Result<Vec<E>, ApiError>,
    },
    RelationsLoaded {
        stamp: Stamp,
        iata: String,
        result: Result<Vec<RelationEntry<E::Related>>, ApiError>,
    },
    Deleted {
        id: i64,
        result: Result<String, ApiError>,
    },
}

/// 机场 / 航空公司列表页的状态
pub struct DirectoryController<E: Entity> {
    api: Arc<dyn FlightApi>,
    emit: Emitter<DirectoryEvent<E>>,
    all: Vec<E>,
    /// `all` 中的下标
    filtered: Vec<usize>,
    filter_text: String,
    selected: Option<E>,
    relations: Vec<RelationEntry<E::Related>>,
    relations_loading: bool,
    loaded: bool,
    loading: bool,
    load_seq: RequestSequence,
    relation_seq: RequestSequence,
    pending_key: Option<String>,
    pending_reselect: Option<i64>,
    deleting: Option<i64>,
    last_error: Option<String>,
}

impl<E: Entity> DirectoryController<E> {
    pub fn new(api: Arc<dyn FlightApi>, emit: Emitter<DirectoryEvent<E>>) -> Self {
        Self {
            api,
            emit,
            all: Vec::new(),
            filtered: Vec::new(),
            filter_text: String::new(),
            selected: None,
            relations: Vec::new(),
            relations_loading: false,
            loaded: false,
            loading: false,
            load_seq: RequestSequence::new(),
            relation_seq: RequestSequence::new(),
            pending_key: None,
            pending_reselect: None,
            deleting: None,
            last_error: None,
        }
    }

    pub fn load(&mut self) {
        let stamp = self.load_seq.issue();
        self.loading = true;
        let api = Arc::clone(&self.api);
        let emit = self.emit.clone();
        info!("加载{}列表 {}", E::KIND.label(), stamp);
        tokio::spawn(async move {
            let result = E::fetch_all(api).await;
            emit.emit(DirectoryEvent::Loaded { stamp, result });
        });
    }

    pub fn handle(&mut self, evt: DirectoryEvent<E>) -> Option<Notice> {
        match evt {
            DirectoryEvent::Loaded { stamp, result } => {
                if !self.load_seq.is_current(stamp) {
                    debug!("丢弃过期的{}列表 {}", E::KIND.label(), stamp);
                    return None;
                }
                self.loading = false;
                match result {
                    Ok(list) => {
                        let count = list.len();
                        self.all = list;
                        self.filtered = filter_indices(&self.all, &self.filter_text);
                        self.loaded = true;
                        self.last_error = None;
                        self.reconcile_selection();
                        Some(Notice::Info(format!("✓ 已加载 {} 个{}", count, E::KIND.label())))
                    }
                    Err(e) => {
                        warn!("加载{}列表失败: {}", E::KIND.label(), e);
                        let msg = format!("✗ 加载{}列表失败: {}", E::KIND.label(), e);
                        self.last_error = Some(msg.clone());
                        Some(Notice::Error(msg))
                    }
                }
            }
            DirectoryEvent::RelationsLoaded {
                stamp,
                iata,
                result,
            } => {
                if !self.relation_seq.is_current(stamp) {
                    debug!("丢弃过期的关联数据 {} ({})", stamp, iata);
                    return None;
                }
                self.relations_loading = false;
                match result {
                    Ok(entries) => self.relations = entries,
                    Err(e) => {
                        // 关联失败只影响关联列表，详情照常显示
                        warn!("{} {} 关联查询失败: {}", E::KIND.label(), iata, e);
                        self.relations.clear();
                    }
                }
                None
            }
            DirectoryEvent::Deleted { id, result } => {
                self.deleting = None;
                match result {
                    Ok(msg) => {
                        info!("已删除{} {}: {}", E::KIND.label(), id, msg);
                        self.clear_selection();
                        self.load();
                        Some(Notice::Info(format!("✓ 已删除{} (ID: {})", E::KIND.label(), id)))
                    }
                    Err(e) => {
                        warn!("删除{} {} 失败: {}", E::KIND.label(), id, e);
                        let msg = format!("删除{}失败: {}", E::KIND.label(), e);
                        self.last_error = Some(msg.clone());
                        Some(Notice::Blocking(msg))
                    }
                }
            }
        }
    }

    /// 重新加载后让选中项跟上新数据
    fn reconcile_selection(&mut self) {
        if let Some(id) = self.pending_reselect.take() {
            match self.find_by_id(id).cloned() {
                Some(fresh) => self.select(fresh),
                None => self.clear_selection(),
            }
        } else if let Some(current) = self.selected.clone() {
            match self.find_by_id(current.id()).cloned() {
                None => self.clear_selection(),
                Some(fresh) if fresh.iata() != current.iata() => self.select(fresh),
                Some(fresh) => self.selected = Some(fresh),
            }
        }

        if let Some(key) = self.pending_key.take() {
            self.resolve_now(&key);
        }
    }

    pub fn set_filter_text(&mut self, text: &str) {
        self.filter_text = text.to_string();
        self.filtered = filter_indices(&self.all, &self.filter_text);
    }

    pub fn select(&mut self, entity: E) {
        let iata = entity.iata().to_string();
        self.selected = Some(entity);
        self.relations.clear();
        self.relations_loading = true;

        let stamp = self.relation_seq.issue();
        let api = Arc::clone(&self.api);
        let emit = self.emit.clone();
        tokio::spawn(async move {
            let result = E::fetch_related(api, iata.clone()).await;
            emit.emit(DirectoryEvent::RelationsLoaded {
                stamp,
                iata,
                result,
            });
        });
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.relations.clear();
        self.relations_loading = false;
        self.relation_seq.invalidate();
    }

    /// 按外部给出的 IATA 选中（深链接 / 搜索跳转）
    ///
    /// 列表未加载时先记下，首次加载成功后再解析。
    pub fn resolve_initial_selection(&mut self, key: &str) {
        if self.loaded {
            self.resolve_now(key);
        } else {
            self.pending_key = Some(key.to_string());
        }
    }

    fn resolve_now(&mut self, key: &str) {
        match self.all.iter().find(|e| e.iata() == key).cloned() {
            Some(entity) => self.select(entity),
            // 找不到时保留原来的选中项
            None => info!("{}列表中没有 {}", E::KIND.label(), key),
        }
    }

    /// 下次加载成功后按 id 重新选中
    pub fn reselect_after_reload(&mut self, id: i64) {
        self.pending_reselect = Some(id);
    }

    /// 返回是否真正发出了删除请求
    pub fn delete(&mut self, id: i64, gate: &dyn ConfirmGate) -> bool {
        let label = self
            .find_by_id(id)
            .map(|e| format!("{} {}", e.iata(), e.name()))
            .unwrap_or_else(|| format!("ID {}", id));
        let prompt = format!("确定删除{} {}？", E::KIND.label(), label);
        if !gate.confirm(&prompt) {
            debug!("取消删除 {}", label);
            return false;
        }

        self.deleting = Some(id);
        let api = Arc::clone(&self.api);
        let emit = self.emit.clone();
        tokio::spawn(async move {
            let result = E::remove(api, id).await;
            emit.emit(DirectoryEvent::Deleted { id, result });
        });
        true
    }

    fn find_by_id(&self, id: i64) -> Option<&E> {
        self.all.iter().find(|e| e.id() == id)
    }

    pub fn all(&self) -> &[E] {
        &self.all
    }

    pub fn filtered(&self) -> Vec<&E> {
        self.filtered.iter().filter_map(|&i| self.all.get(i)).collect()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn position_in_filtered(&self, id: i64) -> Option<usize> {
        self.filtered
            .iter()
            .position(|&i| self.all.get(i).map(|e| e.id() == id).unwrap_or(false))
    }

    pub fn selected(&self) -> Option<&E> {
        self.selected.as_ref()
    }

    pub fn raw_relations(&self) -> &[RelationEntry<E::Related>] {
        &self.relations
    }

    pub fn visible_relations(&self) -> Vec<(&E::Related, i64)> {
        visible_relations(&self.relations)
    }

    pub fn relation_count(&self) -> usize {
        self.visible_relations().len()
    }

    pub fn relations_loading(&self) -> bool {
        self.relations_loading
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Airline, Airport};
    use crate::session::fake::{airline, airport, FakeApi};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn fixture() -> Arc<FakeApi> {
        let api = FakeApi::new().with_airports(vec![
            airport(1, "SFO", "San Francisco International", "San Francisco"),
            airport(2, "OAK", "Oakland International", "Oakland"),
            airport(3, "SJC", "Norman Y. Mineta San Jose", "San Jose"),
        ]);
        api.set_airlines_at(
            "SFO",
            vec![
                RelationEntry {
                    related: None,
                    route_count: 3,
                },
                RelationEntry {
                    related: Some(airline(24, "AA", "American Airlines", "United States")),
                    route_count: 7,
                },
            ],
        );
        api.set_airlines_at(
            "OAK",
            vec![RelationEntry {
                related: Some(airline(4547, "WN", "Southwest Airlines", "United States")),
                route_count: 40,
            }],
        );
        Arc::new(api)
    }

    type Events = UnboundedReceiver<DirectoryEvent<Airport>>;

    fn directory(api: Arc<FakeApi>) -> (DirectoryController<Airport>, Events) {
        let (emit, rx) = Emitter::channel();
        (DirectoryController::new(api, emit), rx)
    }

    async fn pump(dir: &mut DirectoryController<Airport>, rx: &mut Events) -> Option<Notice> {
        let evt = rx.recv().await.unwrap();
        dir.handle(evt)
    }

    async fn loaded(api: Arc<FakeApi>) -> (DirectoryController<Airport>, Events) {
        let (mut dir, mut rx) = directory(api);
        dir.load();
        pump(&mut dir, &mut rx).await;
        (dir, rx)
    }

    #[tokio::test]
    async fn initial_key_resolves_after_first_load_with_one_relation_fetch() {
        let api = fixture();
        let (mut dir, mut rx) = directory(api.clone());

        dir.resolve_initial_selection("SFO");
        assert!(dir.selected().is_none());
        dir.load();
        pump(&mut dir, &mut rx).await;

        assert_eq!(dir.selected().map(|a| a.id), Some(1));
        pump(&mut dir, &mut rx).await;
        assert_eq!(api.calls_to("airlines_at_airport"), vec!["airlines_at_airport SFO"]);

        // 关联为空的条目不显示
        assert_eq!(dir.raw_relations().len(), 2);
        assert_eq!(dir.relation_count(), 1);
        assert_eq!(dir.visible_relations()[0].0.iata, "AA");
    }

    #[tokio::test]
    async fn unknown_or_differently_cased_key_selects_nothing() {
        let api = fixture();
        let (mut dir, _rx) = loaded(api.clone()).await;

        dir.resolve_initial_selection("XXX");
        dir.resolve_initial_selection("sfo");
        tokio::task::yield_now().await;

        assert!(dir.selected().is_none());
        assert!(api.calls_to("airlines_at_airport").is_empty());
    }

    #[tokio::test]
    async fn unmatched_key_keeps_current_selection() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;
        let sfo = dir.all()[0].clone();
        dir.select(sfo);
        pump(&mut dir, &mut rx).await;
        api.clear_calls();

        dir.resolve_initial_selection("XXX");
        tokio::task::yield_now().await;

        assert_eq!(dir.selected().map(|a| a.iata.as_str()), Some("SFO"));
        assert_eq!(dir.relation_count(), 1);
        assert!(!dir.relations_loading());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn plain_reload_follows_iata_change_of_selected_record() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;
        let oak = dir.all()[1].clone();
        dir.select(oak);
        pump(&mut dir, &mut rx).await;

        // 只改名称：刷新记录，不重新查关联
        let rename = serde_json::json!({ "name": "Oakland Metropolitan" });
        api.update_airport(2, rename.as_object().unwrap()).await.unwrap();
        api.clear_calls();
        dir.load();
        pump(&mut dir, &mut rx).await;
        tokio::task::yield_now().await;

        assert_eq!(dir.selected().map(|a| a.name.as_str()), Some("Oakland Metropolitan"));
        assert_eq!(dir.relation_count(), 1);
        assert!(!dir.relations_loading());
        assert!(api.calls_to("airlines_at_airport").is_empty());

        // iata 被别处改掉：按 id 找回并用新代码查关联
        let recode = serde_json::json!({ "iata": "OAX" });
        api.update_airport(2, recode.as_object().unwrap()).await.unwrap();
        dir.load();
        pump(&mut dir, &mut rx).await;

        assert_eq!(dir.selected().map(|a| (a.id, a.iata.as_str())), Some((2, "OAX")));
        assert!(dir.relations_loading());
        pump(&mut dir, &mut rx).await;
        assert_eq!(api.calls_to("airlines_at_airport"), vec!["airlines_at_airport OAX"]);
        assert_eq!(dir.relation_count(), 0);
    }

    #[tokio::test]
    async fn changing_selection_discards_previous_relation_fetch() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;

        let sfo = dir.all()[0].clone();
        let oak = dir.all()[1].clone();
        dir.select(sfo);
        let sfo_relations = rx.recv().await.unwrap();
        dir.select(oak);
        let oak_relations = rx.recv().await.unwrap();

        dir.handle(oak_relations);
        dir.handle(sfo_relations);

        assert_eq!(dir.selected().map(|a| a.iata.as_str()), Some("OAK"));
        assert_eq!(dir.visible_relations()[0].0.iata, "WN");
    }

    #[tokio::test]
    async fn relation_failure_clears_relations_without_notice() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;
        api.fail("airlines_at_airport");

        let sfo = dir.all()[0].clone();
        dir.select(sfo);
        assert!(dir.relations_loading());
        assert_eq!(pump(&mut dir, &mut rx).await, None);

        assert_eq!(dir.selected().map(|a| a.iata.as_str()), Some("SFO"));
        assert!(dir.raw_relations().is_empty());
        assert!(!dir.relations_loading());
    }

    #[tokio::test]
    async fn filter_does_not_touch_pending_relation_fetch() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;

        let sfo = dir.all()[0].clone();
        dir.select(sfo);
        dir.set_filter_text("oak");
        assert_eq!(dir.filtered_len(), 1);
        pump(&mut dir, &mut rx).await;
        assert_eq!(dir.relation_count(), 1);

        dir.set_filter_text("");
        assert_eq!(dir.filtered().len(), 3);
        assert_eq!(dir.position_in_filtered(3), Some(2));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_list() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;
        dir.set_filter_text("san");

        api.fail("list_airports");
        dir.load();
        let notice = pump(&mut dir, &mut rx).await;

        assert!(matches!(notice, Some(Notice::Error(_))));
        assert_eq!(dir.all().len(), 3);
        assert_eq!(dir.filtered_len(), 2);
        assert!(dir.last_error().is_some());
    }

    #[tokio::test]
    async fn older_load_arriving_late_is_discarded() {
        let api = fixture();
        let (mut dir, mut rx) = directory(api.clone());

        dir.load();
        let first = rx.recv().await.unwrap();
        dir.load();
        let second = rx.recv().await.unwrap();

        dir.handle(second);
        assert_eq!(dir.all().len(), 3);
        assert_eq!(dir.handle(first), None);
    }

    #[tokio::test]
    async fn declined_confirmation_sends_nothing() {
        let api = fixture();
        let (mut dir, _rx) = loaded(api.clone()).await;

        assert!(!dir.delete(1, &AnswerGate(false)));
        tokio::task::yield_now().await;
        assert!(api.calls_to("delete_airport").is_empty());
    }

    #[tokio::test]
    async fn deleting_selected_entity_clears_selection_and_reloads() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;

        let sfo = dir.all()[0].clone();
        dir.select(sfo);
        pump(&mut dir, &mut rx).await;
        assert_eq!(dir.relation_count(), 1);

        assert!(dir.delete(1, &AnswerGate(true)));
        let notice = pump(&mut dir, &mut rx).await;
        assert!(matches!(notice, Some(Notice::Info(_))));
        assert!(dir.selected().is_none());
        assert!(dir.raw_relations().is_empty());

        pump(&mut dir, &mut rx).await;
        assert!(dir.all().iter().all(|a| a.id != 1));
        assert!(dir.filtered().iter().all(|a| a.id != 1));
        assert_eq!(dir.all().len(), 2);
    }

    #[tokio::test]
    async fn failed_delete_is_blocking_and_keeps_state() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;
        let sfo = dir.all()[0].clone();
        dir.select(sfo);
        pump(&mut dir, &mut rx).await;

        api.fail("delete_airport");
        dir.delete(1, &AnswerGate(true));
        let notice = pump(&mut dir, &mut rx).await;

        assert!(matches!(notice, Some(Notice::Blocking(_))));
        assert_eq!(dir.selected().map(|a| a.id), Some(1));
        assert_eq!(dir.relation_count(), 1);
        assert_eq!(dir.all().len(), 3);
        assert_eq!(api.calls_to("delete_airport").len(), 1);
        assert_eq!(api.calls_to("list_airports").len(), 1);
    }

    #[tokio::test]
    async fn reload_drops_selection_that_vanished_on_the_server() {
        let api = fixture();
        let (mut dir, mut rx) = loaded(api.clone()).await;
        let oak = dir.all()[1].clone();
        dir.select(oak);
        pump(&mut dir, &mut rx).await;

        api.delete_airport(2).await.unwrap();
        dir.load();
        pump(&mut dir, &mut rx).await;
        assert!(dir.selected().is_none());
    }

    #[tokio::test]
    async fn airline_directory_fetches_airports_by_airline_code() {
        let api = FakeApi::new().with_airlines(vec![airline(5209, "UA", "United Airlines", "United States")]);
        api.set_airports_for(
            "UA",
            vec![RelationEntry {
                related: Some(airport(1, "SFO", "San Francisco International", "San Francisco")),
                route_count: 42,
            }],
        );
        let api = Arc::new(api);
        let (emit, mut rx) = Emitter::channel();
        let mut dir: DirectoryController<Airline> = DirectoryController::new(api.clone(), emit);

        dir.resolve_initial_selection("UA");
        dir.load();
        let evt = rx.recv().await.unwrap();
        dir.handle(evt);
        let evt = rx.recv().await.unwrap();
        dir.handle(evt);

        assert_eq!(dir.visible_relations()[0].1, 42);
        assert_eq!(api.calls_to("airports_for_airline"), vec!["airports_for_airline UA"]);
    }
}
