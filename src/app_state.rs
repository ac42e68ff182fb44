use crate::app_service;
use crate::commands::{AppCommand, COMMANDS};
use crate::config::AppConfig;
use crate::deep_link::{DeepLink, LinkPage};
use crate::model::{Airline, Airport, Entity, EntityKind, Stats};
use crate::session::FlightApi;
use crate::sync::directory::{AnswerGate, DirectoryController, DirectoryEvent};
use crate::sync::dismiss::{DismissBus, PointerEvent};
use crate::sync::mutation::{MutationController, MutationEvent};
use crate::sync::routes::{RouteEvent, RouteFinder};
use crate::sync::search::{NavigationIntent, SearchController, SearchEvent};
use crate::sync::{Emitter, Notice};
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ViewMode {
    Airports,
    Airlines,
    Routes,
}

impl ViewMode {
    pub const MENU: [ViewMode; 3] = [ViewMode::Airports, ViewMode::Airlines, ViewMode::Routes];

    pub fn title(self) -> &'static str {
        match self {
            ViewMode::Airports => "机场",
            ViewMode::Airlines => "航空公司",
            ViewMode::Routes => "中转航线",
        }
    }

    pub fn menu_index(self) -> usize {
        match self {
            ViewMode::Airports => 0,
            ViewMode::Airlines => 1,
            ViewMode::Routes => 2,
        }
    }

    fn of(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Airport => ViewMode::Airports,
            EntityKind::Airline => ViewMode::Airlines,
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InputMode {
    Normal,
    Command,
    Search,
    /// 等待 y/n
    Confirm,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum FocusArea {
    Menu,     // 焦点在左侧菜单
    MainView, // 焦点在主视图
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Search(SearchEvent),
    Airports(DirectoryEvent<Airport>),
    Airlines(DirectoryEvent<Airline>),
    AirportMutation(MutationEvent),
    AirlineMutation(MutationEvent),
    Routes(RouteEvent),
    Stats(Stats),
}

/// 一个实体类型的页面：列表 + 表单 + 光标
pub struct Page<E: Entity> {
    pub directory: DirectoryController<E>,
    pub mutation: MutationController<E>,
    /// 过滤后列表中的位置
    pub cursor: usize,
    pub list_state: ListState,
}

impl<E: Entity> Page<E> {
    fn new(
        api: &Arc<dyn FlightApi>,
        dir_emit: Emitter<DirectoryEvent<E>>,
        mut_emit: Emitter<MutationEvent>,
    ) -> Self {
        Self {
            directory: DirectoryController::new(Arc::clone(api), dir_emit),
            mutation: MutationController::new(Arc::clone(api), mut_emit),
            cursor: 0,
            list_state: ListState::default(),
        }
    }

    fn selected_id(&self) -> Option<i64> {
        self.directory.selected().map(|e| e.id())
    }

    pub fn clamp_cursor(&mut self) {
        let len = self.directory.filtered_len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
        self.list_state.select(if len == 0 { None } else { Some(self.cursor) });
    }

    /// 光标跟随选中项
    fn follow_selection(&mut self) {
        if let Some(pos) = self
            .selected_id()
            .and_then(|id| self.directory.position_in_filtered(id))
        {
            self.cursor = pos;
        }
        self.clamp_cursor();
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.directory.filtered_len();
        if len == 0 {
            return;
        }
        let next = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = next as usize;
        self.clamp_cursor();
    }

    pub fn select_cursor(&mut self) {
        let picked = self.directory.filtered().get(self.cursor).map(|e| (*e).clone());
        if let Some(entity) = picked {
            self.directory.select(entity);
        }
    }

    fn apply_directory(&mut self, evt: DirectoryEvent<E>) -> Option<Notice> {
        let before = self.selected_id();
        let notice = self.directory.handle(evt);
        if self.selected_id() != before {
            self.follow_selection();
        } else {
            self.clamp_cursor();
        }
        notice
    }

    fn apply_mutation(&mut self, evt: MutationEvent) -> Option<Notice> {
        self.mutation.handle(evt, &mut self.directory)
    }

    pub fn set_filter(&mut self, text: &str) {
        self.directory.set_filter_text(text);
        self.cursor = 0;
        self.follow_selection();
    }

    pub fn select_key(&mut self, iata: &str) {
        self.directory.resolve_initial_selection(iata);
        self.follow_selection();
    }
}

pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub search: SearchController,
    pub airports: Page<Airport>,
    pub airlines: Page<Airline>,
    pub routes: RouteFinder,
    pub route_scroll: u16,
    pub stats: Option<Stats>,
    pub command_input: String,
    /// 字符位置
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub log_messages: Vec<String>,
    /// 阻塞式错误，按任意键关闭
    pub popup: Option<String>,
    pub pending_delete: Option<(EntityKind, i64)>,
    pub dismiss_bus: DismissBus,
    pub api: Arc<dyn FlightApi>,
    pub evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: &AppConfig,
        api: Arc<dyn FlightApi>,
        evt_tx: mpsc::UnboundedSender<AppEvent>,
        session_info: Vec<String>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(session_info);

        let dismiss_bus = DismissBus::new();
        let mut search = SearchController::new(
            config.search.clone(),
            Arc::clone(&api),
            Emitter::new(evt_tx.clone(), AppEvent::Search),
        );
        search.activate(&dismiss_bus);

        App {
            view_mode: ViewMode::Airports,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_selected_index: 0,
            search,
            airports: Page::new(
                &api,
                Emitter::new(evt_tx.clone(), AppEvent::Airports),
                Emitter::new(evt_tx.clone(), AppEvent::AirportMutation),
            ),
            airlines: Page::new(
                &api,
                Emitter::new(evt_tx.clone(), AppEvent::Airlines),
                Emitter::new(evt_tx.clone(), AppEvent::AirlineMutation),
            ),
            routes: RouteFinder::new(Arc::clone(&api), Emitter::new(evt_tx.clone(), AppEvent::Routes)),
            route_scroll: 0,
            stats: None,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            log_messages,
            popup: None,
            pending_delete: None,
            dismiss_bus,
            api,
            evt_tx,
        }
    }

    /// 首次加载：打开深链接、拉取两个列表和统计
    pub fn start(&mut self, deep_link: Option<&str>) {
        if let Some(raw) = deep_link {
            self.open_link(raw);
        }
        self.airports.directory.load();
        self.airlines.directory.load();
        app_service::spawn_stats_refresh(self);
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    fn notify(&mut self, notice: Option<Notice>) {
        match notice {
            Some(Notice::Info(msg)) | Some(Notice::Error(msg)) => self.add_log(msg),
            Some(Notice::Blocking(msg)) => {
                self.add_log(format!("✗ {}", msg));
                self.popup = Some(msg);
            }
            None => {}
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) => self.add_log(msg),
            AppEvent::Search(evt) => self.search.handle(evt),
            AppEvent::Airports(evt) => {
                let notice = self.airports.apply_directory(evt);
                self.notify(notice);
            }
            AppEvent::Airlines(evt) => {
                let notice = self.airlines.apply_directory(evt);
                self.notify(notice);
            }
            AppEvent::AirportMutation(evt) => {
                let notice = self.airports.apply_mutation(evt);
                self.notify(notice);
            }
            AppEvent::AirlineMutation(evt) => {
                let notice = self.airlines.apply_mutation(evt);
                self.notify(notice);
            }
            AppEvent::Routes(evt) => {
                let notice = self.routes.handle(evt);
                self.route_scroll = 0;
                self.notify(notice);
            }
            AppEvent::Stats(stats) => self.stats = Some(stats),
        }
    }

    /// 每帧调用：处理积压的点击
    pub fn tick(&mut self) {
        self.search.drain_dismissals();
    }

    pub fn handle_mouse_click(&mut self, column: u16, row: u16) {
        self.dismiss_bus.publish(PointerEvent { column, row });
        if self.search.region().contains(column, row) {
            self.input_mode = InputMode::Search;
        } else if self.input_mode == InputMode::Search {
            self.input_mode = InputMode::Normal;
        }
    }

    pub fn switch_view(&mut self, view: ViewMode) {
        self.view_mode = view;
        self.menu_selected_index = view.menu_index();
    }

    pub fn navigate(&mut self, intent: NavigationIntent) {
        match intent {
            NavigationIntent::Select { kind, iata } => {
                self.switch_view(ViewMode::of(kind));
                self.focus_area = FocusArea::MainView;
                match kind {
                    EntityKind::Airport => self.airports.select_key(&iata),
                    EntityKind::Airline => self.airlines.select_key(&iata),
                }
            }
            NavigationIntent::Routes => {
                self.switch_view(ViewMode::Routes);
                self.focus_area = FocusArea::MainView;
            }
        }
    }

    pub fn open_link(&mut self, raw: &str) {
        let link = match DeepLink::parse(raw) {
            Ok(link) => link,
            Err(e) => {
                self.add_log(format!("⚠ {}", e));
                return;
            }
        };
        if link.page == Some(LinkPage::Routes) {
            self.navigate(NavigationIntent::Routes);
            if let (Some(src), Some(dst)) = (&link.source, &link.dest) {
                if let Err(e) = self.routes.search(src, dst) {
                    self.add_log(format!("✗ {}", e));
                }
            }
            return;
        }
        match (link.entity_kind(), link.selected) {
            (Some(kind), Some(iata)) => self.navigate(NavigationIntent::Select { kind, iata }),
            (Some(kind), None) => self.switch_view(ViewMode::of(kind)),
            (None, _) => {}
        }
    }

    pub fn request_delete(&mut self) {
        let target = match self.view_mode {
            ViewMode::Airports => self
                .airports
                .selected_id()
                .map(|id| (EntityKind::Airport, id)),
            ViewMode::Airlines => self
                .airlines
                .selected_id()
                .map(|id| (EntityKind::Airline, id)),
            ViewMode::Routes => None,
        };
        match target {
            Some(t) => {
                self.pending_delete = Some(t);
                self.input_mode = InputMode::Confirm;
            }
            None => self.add_log("⚠ 请先选择要删除的记录".to_string()),
        }
    }

    pub fn confirm_delete(&mut self, answer: bool) {
        self.input_mode = InputMode::Normal;
        let Some((kind, id)) = self.pending_delete.take() else {
            return;
        };
        let gate = AnswerGate(answer);
        let sent = match kind {
            EntityKind::Airport => self.airports.directory.delete(id, &gate),
            EntityKind::Airline => self.airlines.directory.delete(id, &gate),
        };
        if !sent {
            self.add_log("已取消删除".to_string());
        }
    }

    /// 确认提示文本
    pub fn delete_prompt(&self) -> Option<String> {
        let (kind, id) = self.pending_delete?;
        let label = match kind {
            EntityKind::Airport => self
                .airports
                .directory
                .selected()
                .map(|a| format!("{} {}", a.iata, a.name)),
            EntityKind::Airline => self
                .airlines
                .directory
                .selected()
                .map(|a| format!("{} {}", a.iata, a.name)),
        }
        .unwrap_or_else(|| format!("ID {}", id));
        Some(format!("确定删除{} {}？(y/n)", kind.label(), label))
    }

    /// 获取当前的预测建议
    pub fn get_completion_hint(&self) -> Option<String> {
        let input = self.command_input.trim();
        if input.is_empty() || input.contains(char::is_whitespace) {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(input) && **cmd != input)
            .map(|cmd| cmd[input.len()..].to_string())
    }

    fn command_byte_index(&self) -> usize {
        self.command_input
            .char_indices()
            .nth(self.command_cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.command_input.len())
    }

    fn command_len(&self) -> usize {
        self.command_input.chars().count()
    }

    fn reset_command(&mut self) {
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    fn enter_command(&mut self, prefill: &str) {
        self.input_mode = InputMode::Command;
        self.command_input = prefill.to_string();
        self.command_cursor = self.command_len();
    }

    /// 返回 true 表示退出
    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        if self.popup.is_some() {
            self.popup = None;
            return false;
        }

        match self.input_mode {
            InputMode::Confirm => {
                self.confirm_delete(matches!(key, KeyCode::Char('y') | KeyCode::Char('Y')));
                false
            }
            InputMode::Command => self.handle_command_key(key),
            InputMode::Search => {
                self.handle_search_key(key);
                false
            }
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_command_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Enter => {
                let cmd_owned = self.command_input.trim().to_string();
                self.reset_command();
                if cmd_owned.is_empty() {
                    return false;
                }
                self.command_history.push(cmd_owned.clone());
                self.command_history_index = None;

                let cmd = AppCommand::from_str(&cmd_owned)
                    .unwrap_or_else(|_| AppCommand::Unknown(cmd_owned.clone()));
                app_service::execute(self, cmd)
            }
            KeyCode::Esc => {
                self.reset_command();
                false
            }
            KeyCode::Tab => {
                if let Some(hint) = self.get_completion_hint() {
                    let insert = format!("{} ", hint);
                    let at = self.command_byte_index();
                    self.command_input.insert_str(at, &insert);
                    self.command_cursor += insert.chars().count();
                }
                false
            }
            KeyCode::Up => {
                if self.command_history.is_empty() {
                    return false;
                }
                let next = match self.command_history_index {
                    None => self.command_history.len().saturating_sub(1),
                    Some(i) => i.saturating_sub(1),
                };
                self.command_history_index = Some(next);
                if let Some(cmd) = self.command_history.get(next) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_len();
                }
                false
            }
            KeyCode::Down => {
                let Some(i) = self.command_history_index else {
                    return false;
                };
                let next = i + 1;
                if next >= self.command_history.len() {
                    self.command_history_index = None;
                    self.command_input.clear();
                    self.command_cursor = 0;
                    return false;
                }
                self.command_history_index = Some(next);
                if let Some(cmd) = self.command_history.get(next) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_len();
                }
                false
            }
            KeyCode::Backspace => {
                if self.command_cursor > 0 {
                    self.command_cursor -= 1;
                    let at = self.command_byte_index();
                    self.command_input.remove(at);
                }
                false
            }
            KeyCode::Delete => {
                if self.command_cursor < self.command_len() {
                    let at = self.command_byte_index();
                    self.command_input.remove(at);
                }
                false
            }
            KeyCode::Left => {
                self.command_cursor = self.command_cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                if self.command_cursor < self.command_len() {
                    self.command_cursor += 1;
                }
                false
            }
            KeyCode::Home => {
                self.command_cursor = 0;
                false
            }
            KeyCode::End => {
                self.command_cursor = self.command_len();
                false
            }
            KeyCode::Char(c) => {
                let at = self.command_byte_index();
                self.command_input.insert(at, c);
                self.command_cursor += 1;
                false
            }
            _ => false,
        }
    }

    fn handle_search_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char(c) => {
                let mut q = self.search.query().to_string();
                q.push(c);
                self.search.on_query_changed(&q);
            }
            KeyCode::Backspace => {
                let mut q = self.search.query().to_string();
                q.pop();
                self.search.on_query_changed(&q);
            }
            KeyCode::Up => self.search.move_highlight(-1),
            KeyCode::Down => self.search.move_highlight(1),
            KeyCode::Enter => {
                if let Some(intent) = self.search.choose_highlighted() {
                    self.input_mode = InputMode::Normal;
                    self.navigate(intent);
                }
            }
            KeyCode::Esc | KeyCode::Tab => {
                // 焦点离开搜索框
                self.search.dismiss();
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('/') => {
                self.enter_command("");
                false
            }
            KeyCode::Char('q') => true,
            KeyCode::Char('s') => {
                self.input_mode = InputMode::Search;
                false
            }
            KeyCode::Esc => {
                self.search.dismiss();
                false
            }
            KeyCode::Left => {
                self.focus_area = FocusArea::Menu;
                false
            }
            KeyCode::Right => {
                self.focus_area = FocusArea::MainView;
                false
            }
            KeyCode::Up | KeyCode::Down => {
                let delta = if key == KeyCode::Up { -1 } else { 1 };
                if self.focus_area == FocusArea::Menu {
                    let last = ViewMode::MENU.len() as isize - 1;
                    self.menu_selected_index =
                        (self.menu_selected_index as isize + delta).clamp(0, last) as usize;
                } else {
                    match self.view_mode {
                        ViewMode::Airports => self.airports.move_cursor(delta),
                        ViewMode::Airlines => self.airlines.move_cursor(delta),
                        ViewMode::Routes => {
                            self.route_scroll = if delta < 0 {
                                self.route_scroll.saturating_sub(1)
                            } else {
                                self.route_scroll.saturating_add(1)
                            }
                        }
                    }
                }
                false
            }
            KeyCode::Enter | KeyCode::Char('c') => {
                if self.focus_area == FocusArea::Menu {
                    if let Some(view) = ViewMode::MENU.get(self.menu_selected_index) {
                        self.view_mode = *view;
                    }
                    self.focus_area = FocusArea::MainView;
                } else {
                    match self.view_mode {
                        ViewMode::Airports => self.airports.select_cursor(),
                        ViewMode::Airlines => self.airlines.select_cursor(),
                        ViewMode::Routes => self.enter_command("routes "),
                    }
                }
                false
            }
            KeyCode::Char('d') => {
                self.request_delete();
                false
            }
            KeyCode::Char('r') => app_service::execute(self, AppCommand::Reload),
            KeyCode::Char('n') => {
                self.enter_command("new ");
                false
            }
            KeyCode::Char('e') => {
                self.enter_command("edit ");
                false
            }
            KeyCode::Char('f') => {
                self.enter_command("filter ");
                false
            }
            _ => false,
        }
    }
}
