use crate::app_state::{App, FocusArea, InputMode, Page, ViewMode};
use crate::model::{Airline, Airport, Entity, EntityKind, RouteLeg};
use crate::sync::dismiss::Region;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏 + 搜索框
            Constraint::Min(0),    // 中间内容区域
            Constraint::Min(8),    // 底部命令/日志区域
        ])
        .split(f.size());

    let search_area = render_top_bar(f, chunks[0], app);

    let middle_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_left_menu(f, middle_chunks[0], app);
    render_main_view(f, middle_chunks[1], app);
    render_bottom_bar(f, chunks[2], app);

    // 下拉框画在最上层；点击区域 = 搜索框 + 下拉框
    let mut region = Region::from(search_area);
    if app.search.is_open() {
        let overlay = render_search_overlay(f, search_area, chunks[1], app);
        region = region.union(Region::from(overlay));
    }
    app.search.set_region(region);

    if let Some(msg) = app.popup.as_deref() {
        render_popup(f, msg);
    }
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

/// 返回搜索框所在区域
fn render_top_bar(f: &mut Frame, area: Rect, app: &App) -> Rect {
    let parts = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([
            Constraint::Length(24),
            Constraint::Min(20),
            Constraint::Length(36),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(vec![Span::styled(
        " 航班数据台 ",
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Cyan)),
    )
    .alignment(ratatui::layout::Alignment::Center);
    f.render_widget(title, parts[0]);

    let searching = app.input_mode == InputMode::Search;
    let mut spans = vec![Span::raw(app.search.query().to_string())];
    if searching {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    } else if app.search.query().is_empty() {
        spans.push(Span::styled(
            "按 s 搜索机场 / 航空公司",
            Style::default().fg(Color::DarkGray),
        ));
    }
    if app.search.is_loading() {
        spans.push(Span::styled("  搜索中...", Style::default().fg(Color::Gray)));
    }
    let search = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if searching { "搜索 (Esc 关闭)" } else { "搜索" })
            .style(if searching {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(search, parts[1]);

    let stats = match app.stats {
        Some(s) => format!("机场 {} | 航司 {} | 航线 {}", s.airports, s.airlines, s.routes),
        None => "统计加载中...".to_string(),
    };
    let stats = Paragraph::new(stats)
        .block(Block::default().borders(Borders::ALL).title("数据集"))
        .style(Style::default().fg(Color::Gray));
    f.render_widget(stats, parts[2]);

    parts[1]
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = ViewMode::MENU
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let is_selected = i == app.menu_selected_index;
            let is_active = *view == app.view_mode;

            let style = if is_selected {
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{}", prefix, view.title())).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "菜单 (Enter/c 确认)"
    } else {
        "菜单 (← 切换)"
    };

    let menu = List::new(menu_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(border_style(app.focus_area == FocusArea::Menu)),
    );
    f.render_widget(menu, area);
}

fn render_main_view(f: &mut Frame, area: Rect, app: &mut App) {
    let focused = app.focus_area == FocusArea::MainView;
    match app.view_mode {
        ViewMode::Airports => render_directory(f, area, &mut app.airports, focused, airport_detail),
        ViewMode::Airlines => render_directory(f, area, &mut app.airlines, focused, airline_detail),
        ViewMode::Routes => render_routes(f, area, app, focused),
    }
}

fn render_directory<E: Entity>(
    f: &mut Frame,
    area: Rect,
    page: &mut Page<E>,
    focused: bool,
    detail: fn(&E) -> Vec<Line<'static>>,
) {
    let halves = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let dir = &page.directory;
    let selected_id = dir.selected().map(|e| e.id());
    let items: Vec<ListItem> = dir
        .filtered()
        .into_iter()
        .map(|e| {
            let marker = if Some(e.id()) == selected_id { "● " } else { "  " };
            let content = Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Green)),
                Span::styled(format!("{:<4}", e.iata()), Style::default().fg(Color::Cyan)),
                Span::raw(e.name().to_string()),
                Span::styled(format!("  {}", e.subtitle()), Style::default().fg(Color::DarkGray)),
            ]);
            ListItem::new(content)
        })
        .collect();

    let mut title = format!("{}列表 [{}/{}]", E::KIND.label(), dir.filtered_len(), dir.all().len());
    if !dir.filter_text().is_empty() {
        title.push_str(&format!(" 过滤: \"{}\"", dir.filter_text()));
    }
    if dir.is_loading() {
        title.push_str(" 加载中...");
    }
    if focused {
        title.push_str(" (Enter 选中, f 过滤, n 新建, e 修改, d 删除, r 刷新)");
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(border_style(focused)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    page.clamp_cursor();
    f.render_stateful_widget(list, halves[0], &mut page.list_state);

    let dir = &page.directory;
    let mut lines = match dir.selected() {
        Some(e) => detail(e),
        None if !dir.is_loaded() && dir.last_error().is_none() => vec![Line::from("正在加载...")],
        None => vec![Line::from(format!("未选中{}", E::KIND.label()))],
    };

    if let Some(err) = dir.last_error() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))));
    }
    if let Some(err) = page.mutation.error() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("✗ 表单: {}", err),
            Style::default().fg(Color::Red),
        )));
    }
    if page.mutation.is_busy() {
        lines.push(Line::from(Span::styled("提交中...", Style::default().fg(Color::Yellow))));
    }
    if dir.is_deleting() {
        lines.push(Line::from(Span::styled("删除中...", Style::default().fg(Color::Yellow))));
    }

    if dir.selected().is_some() {
        let related = match E::KIND {
            EntityKind::Airport => "航空公司",
            EntityKind::Airline => "机场",
        };
        lines.push(Line::from(""));
        if dir.relations_loading() {
            lines.push(Line::from(Span::styled(
                format!("--- 相关{} (加载中) ---", related),
                Style::default().fg(Color::Yellow),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                format!("--- 相关{} ({}) ---", related, dir.relation_count()),
                Style::default().fg(Color::Yellow),
            )));
            for (r, count) in dir.visible_relations() {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {:<4}", r.iata()), Style::default().fg(Color::Cyan)),
                    Span::raw(format!("{:<32}", r.name())),
                    Span::styled(format!("{:>5} 条航线", count), Style::default().fg(Color::Green)),
                ]));
            }
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("详细信息"))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, halves[1]);
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value),
    ])
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "N/A".to_string())
}

fn airport_detail(a: &Airport) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", a.iata),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(a.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        field("ID", a.id.to_string()),
        field("城市", a.subtitle()),
        field("ICAO", a.icao.clone()),
        field("坐标", format!("{:.4}, {:.4}", a.latitude, a.longitude)),
        field("海拔", format!("{} ft", a.altitude)),
        field(
            "时区",
            format!(
                "{} ({})",
                a.timezone.map(|t| t.to_string()).unwrap_or_else(|| "N/A".to_string()),
                opt(&a.tz_database)
            ),
        ),
        field("夏令时", opt(&a.dst)),
        field("类型", opt(&a.kind)),
    ]
}

fn airline_detail(a: &Airline) -> Vec<Line<'static>> {
    let active = if a.is_active() {
        Span::styled("运营中", Style::default().fg(Color::Green))
    } else {
        Span::styled("停运", Style::default().fg(Color::Red))
    };
    vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", a.iata),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(a.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        field("ID", a.id.to_string()),
        field("国家", a.subtitle()),
        field("别名", a.alias.clone()),
        field("ICAO", a.icao.clone()),
        field("呼号", a.callsign.clone()),
        Line::from(vec![
            Span::styled("状态: ", Style::default().add_modifier(Modifier::BOLD)),
            active,
        ]),
    ]
}

fn leg_line(leg: &RouteLeg) -> String {
    let equipment = leg.equipment.as_deref().unwrap_or("-");
    format!(
        "{} -> {}  {}  经停 {}  机型 {}",
        leg.source_airport_iata, leg.dest_airport_iata, leg.airline_iata, leg.stops, equipment
    )
}

fn render_routes(f: &mut Frame, area: Rect, app: &App, focused: bool) {
    let finder = &app.routes;
    let mut lines = Vec::new();

    if finder.is_loading() {
        lines.push(Line::from(format!(
            "正在查询 {} -> {} ...",
            finder.source(),
            finder.dest()
        )));
    } else if let Some(err) = finder.error() {
        lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))));
    } else if !finder.has_searched() {
        lines.push(Line::from("输入 routes <出发> <到达> 查询一次中转航线，例如 routes SFO JFK"));
    } else if finder.routes().is_empty() {
        lines.push(Line::from(format!(
            "{} -> {} 没有一次中转航线",
            finder.source(),
            finder.dest()
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!(
                "--- {} -> {} 共 {} 条 ---",
                finder.source(),
                finder.dest(),
                finder.routes().len()
            ),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        for (i, route) in finder.routes().iter().enumerate() {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(format!("#{:<3}", i + 1), Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("经 {}", route.intermediate_airport),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  总距离 {:.0} 英里", route.total_distance_miles),
                    Style::default().fg(Color::Green),
                ),
            ]));
            lines.push(Line::from(format!("     第一段: {}", leg_line(&route.first_leg))));
            lines.push(Line::from(format!("     第二段: {}", leg_line(&route.second_leg))));
        }
    }

    let title = if focused {
        "中转航线 (↑↓ 滚动, Enter 输入查询, ← 菜单)"
    } else {
        "中转航线"
    };
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(border_style(focused)),
        )
        .scroll((app.route_scroll, 0));
    f.render_widget(paragraph, area);
}

/// 画在搜索框正下方，返回实际占用的区域
fn render_search_overlay(f: &mut Frame, anchor: Rect, bounds: Rect, app: &App) -> Rect {
    let suggestions = app.search.suggestions();
    let mut items: Vec<ListItem> = Vec::new();
    let mut selectable = false;
    if app.search.is_loading() {
        items.push(ListItem::new(Span::styled(
            "搜索中...",
            Style::default().fg(Color::Yellow),
        )));
    } else if suggestions.is_empty() {
        items.push(ListItem::new(Span::styled(
            "没有匹配结果",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for s in &suggestions {
            items.push(ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", s.kind.label()), Style::default().fg(Color::Magenta)),
                Span::styled(format!("{:<4}", s.iata), Style::default().fg(Color::Cyan)),
                Span::raw(s.name.clone()),
                Span::styled(format!("  {}", s.subtitle), Style::default().fg(Color::DarkGray)),
            ])));
        }
        items.push(ListItem::new(Span::styled(
            "→ 查询中转航线",
            Style::default().fg(Color::Yellow),
        )));
        selectable = true;
    }

    let height = (items.len() as u16 + 2).min(bounds.height);
    let area = Rect {
        x: anchor.x,
        y: bounds.y,
        width: anchor.width,
        height,
    };

    // 提示行不可选
    let mut state = ratatui::widgets::ListState::default();
    if selectable {
        state.select(Some(app.search.highlighted()));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("建议 (↑↓ 选择, Enter 跳转)")
                .style(Style::default().fg(Color::Green)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(Clear, area);
    f.render_stateful_widget(list, area, &mut state);
    area
}

fn render_popup(f: &mut Frame, msg: &str) {
    let size = f.size();
    let width = size.width.saturating_sub(4).min(60);
    let height = 7u16.min(size.height);
    let area = Rect {
        x: size.x + (size.width.saturating_sub(width)) / 2,
        y: size.y + (size.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(msg.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled("按任意键关闭", Style::default().fg(Color::Gray))),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("错误")
            .style(Style::default().fg(Color::Red)),
    );
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let command_prompt = match app.input_mode {
        InputMode::Command => {
            let mut spans = vec![Span::styled(
                "命令: ",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )];
            let split = app
                .command_input
                .char_indices()
                .nth(app.command_cursor)
                .map(|(i, _)| i)
                .unwrap_or(app.command_input.len());
            let (left, right) = app.command_input.split_at(split);
            spans.push(Span::raw(left));
            spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(right));

            // 补全提示
            if let Some(hint) = app.get_completion_hint() {
                spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
            }

            vec![Line::from(spans)]
        }
        InputMode::Confirm => vec![Line::from(Span::styled(
            app.delete_prompt().unwrap_or_default(),
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ))],
        InputMode::Normal | InputMode::Search => vec![Line::from(vec![
            Span::styled("命令: ", Style::default().fg(Color::Yellow)),
            Span::raw("/命令 s搜索 ←→切换 ↑↓导航 Enter/c确认 n新建 e修改 d删除 q退出"),
        ])],
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(match app.input_mode {
                InputMode::Command => "命令输入模式 (Enter执行 Esc取消 Tab补全 ↑↓历史)",
                InputMode::Confirm => "确认",
                _ => "命令输入",
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 最新的在顶部，最多 20 条
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with("✓") {
                Style::default().fg(Color::Green)
            } else if msg.starts_with("✗") {
                Style::default().fg(Color::Red)
            } else if msg.starts_with("⚠") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
