use crate::app_state::{App, AppEvent, Page, ViewMode};
use crate::commands::{AppCommand, HELP};
use crate::model::{Entity, FormFields};
use crate::session::FlightApi;
use log::warn;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn refresh_stats(api: &Arc<dyn FlightApi>, tx: &mpsc::UnboundedSender<AppEvent>) {
    match api.stats().await {
        Ok(stats) => {
            let _ = tx.send(AppEvent::Stats(stats));
        }
        Err(e) => {
            warn!("获取统计失败: {}", e);
            let _ = tx.send(AppEvent::Log(format!("⚠ 获取统计失败: {}", e)));
        }
    }
}

pub fn spawn_stats_refresh(app: &App) {
    let api = Arc::clone(&app.api);
    let tx = app.evt_tx.clone();
    tokio::spawn(async move {
        refresh_stats(&api, &tx).await;
    });
}

fn submit_create<E: Entity>(page: &mut Page<E>, fields: FormFields) -> String {
    match page.mutation.create(fields) {
        Ok(()) => format!("正在新建{}...", E::KIND.label()),
        Err(e) => format!("✗ {}", e),
    }
}

fn submit_edit<E: Entity>(page: &mut Page<E>, fields: FormFields) -> String {
    let Some(original) = page.directory.selected().cloned() else {
        return format!("⚠ 请先选择要修改的{}", E::KIND.label());
    };
    match page.mutation.update(&original, fields) {
        Ok(true) => format!("正在修改{} {}...", E::KIND.label(), original.iata()),
        Ok(false) => "没有改动，未提交".to_string(),
        Err(e) => format!("✗ {}", e),
    }
}

fn select_in<E: Entity>(page: &mut Page<E>, iata: &str) -> String {
    page.select_key(iata);
    if !page.directory.is_loaded() {
        format!("列表加载后选中 {}", iata)
    } else if page.directory.selected().map(|e| e.iata() == iata).unwrap_or(false) {
        format!("已选中 {}", iata)
    } else {
        format!("⚠ {}列表中没有 {}", E::KIND.label(), iata)
    }
}

/// 执行一条命令，返回 true 表示退出
pub fn execute(app: &mut App, cmd: AppCommand) -> bool {
    match cmd {
        AppCommand::Airports => app.switch_view(ViewMode::Airports),
        AppCommand::Airlines => app.switch_view(ViewMode::Airlines),
        AppCommand::Routes { source, dest } => {
            app.switch_view(ViewMode::Routes);
            match (source, dest) {
                (Some(src), Some(dst)) => {
                    if let Err(e) = app.routes.search(&src, &dst) {
                        app.add_log(format!("✗ {}", e));
                    }
                }
                (None, None) => {}
                _ => app.add_log("用法: routes <SRC> <DST>".to_string()),
            }
        }
        AppCommand::Search(text) => {
            app.input_mode = crate::app_state::InputMode::Search;
            app.search.on_query_changed(&text);
        }
        AppCommand::Filter(text) => match app.view_mode {
            ViewMode::Airports => app.airports.set_filter(&text),
            ViewMode::Airlines => app.airlines.set_filter(&text),
            ViewMode::Routes => app.add_log("⚠ 航线页面不支持过滤".to_string()),
        },
        AppCommand::Select(iata) => {
            let msg = match app.view_mode {
                ViewMode::Airports => select_in(&mut app.airports, &iata),
                ViewMode::Airlines => select_in(&mut app.airlines, &iata),
                ViewMode::Routes => "⚠ 请先切换到机场或航空公司页面".to_string(),
            };
            app.add_log(msg);
        }
        AppCommand::New(fields) => {
            let msg = match app.view_mode {
                ViewMode::Airports => submit_create(&mut app.airports, fields),
                ViewMode::Airlines => submit_create(&mut app.airlines, fields),
                ViewMode::Routes => "⚠ 请先切换到机场或航空公司页面".to_string(),
            };
            app.add_log(msg);
        }
        AppCommand::Edit(fields) => {
            let msg = match app.view_mode {
                ViewMode::Airports => submit_edit(&mut app.airports, fields),
                ViewMode::Airlines => submit_edit(&mut app.airlines, fields),
                ViewMode::Routes => "⚠ 请先切换到机场或航空公司页面".to_string(),
            };
            app.add_log(msg);
        }
        AppCommand::Delete => app.request_delete(),
        AppCommand::Reload => {
            match app.view_mode {
                ViewMode::Airports => app.airports.directory.load(),
                ViewMode::Airlines => app.airlines.directory.load(),
                ViewMode::Routes => {
                    let (src, dst) = (app.routes.source().to_string(), app.routes.dest().to_string());
                    if let Err(e) = app.routes.search(&src, &dst) {
                        app.add_log(format!("⚠ {}", e));
                    }
                }
            }
            spawn_stats_refresh(app);
        }
        AppCommand::Stats => spawn_stats_refresh(app),
        AppCommand::Open(link) => app.open_link(&link),
        AppCommand::Help => app.add_log(HELP.to_string()),
        AppCommand::Quit => return true,
        AppCommand::Unknown(msg) => {
            if !msg.is_empty() {
                app.add_log(format!("✗ {}", msg));
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::session::fake::{airline, airport, FakeApi};

    async fn loaded_app(api: Arc<FakeApi>) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(&AppConfig::default(), api, tx, Vec::new());
        app.start(None);
        while !(app.airports.directory.is_loaded()
            && app.airlines.directory.is_loaded()
            && app.stats.is_some())
        {
            let evt = rx.recv().await.expect("event");
            app.apply_event(evt);
        }
        (app, rx)
    }

    fn fixture() -> Arc<FakeApi> {
        Arc::new(
            FakeApi::new()
                .with_airports(vec![
                    airport(3469, "SFO", "San Francisco International", "San Francisco"),
                    airport(3361, "LAX", "Los Angeles International", "Los Angeles"),
                    airport(3797, "JFK", "John F Kennedy International", "New York"),
                ])
                .with_airlines(vec![airline(5209, "UA", "United Airlines", "United States")]),
        )
    }

    #[tokio::test]
    async fn filter_narrows_the_list_and_select_by_code() {
        let (mut app, _rx) = loaded_app(fixture()).await;
        assert_eq!(app.stats.as_ref().map(|s| s.airports), Some(3));

        execute(&mut app, AppCommand::Filter("international".into()));
        assert_eq!(app.airports.directory.filtered_len(), 3);
        execute(&mut app, AppCommand::Filter("new york".into()));
        assert_eq!(app.airports.directory.filtered_len(), 1);

        execute(&mut app, AppCommand::Select("JFK".into()));
        assert_eq!(app.airports.directory.selected().map(|a| a.id), Some(3797));
        assert_eq!(app.airports.cursor, 0);

        execute(&mut app, AppCommand::Select("ZZZ".into()));
        assert_eq!(app.airports.directory.selected().map(|a| a.id), Some(3797));
        assert!(app.log_messages.last().unwrap().starts_with("⚠"));
        assert!(app.log_messages.last().unwrap().contains("ZZZ"));
    }

    #[tokio::test]
    async fn edit_sends_only_changed_fields_and_keeps_selection() {
        let api = fixture();
        let (mut app, mut rx) = loaded_app(api.clone()).await;
        execute(&mut app, AppCommand::Select("SFO".into()));

        let fields: FormFields = [("iata", "SFX"), ("city", "San Francisco")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        execute(&mut app, AppCommand::Edit(fields));
        while app
            .airports
            .directory
            .selected()
            .map(|a| a.iata != "SFX")
            .unwrap_or(true)
        {
            let evt = rx.recv().await.expect("event");
            app.apply_event(evt);
        }

        assert_eq!(
            api.calls_to("update_airport"),
            vec![r#"update_airport 3469 {"iata":"SFX"}"#]
        );
        assert_eq!(app.airports.directory.selected().map(|a| a.id), Some(3469));
    }

    #[tokio::test]
    async fn unchanged_edit_and_edit_without_selection_send_nothing() {
        let api = fixture();
        let (mut app, _rx) = loaded_app(api.clone()).await;

        let fields: FormFields = [("iata".to_string(), "SFO".to_string())].into_iter().collect();
        execute(&mut app, AppCommand::Edit(fields.clone()));
        assert!(app.log_messages.last().unwrap().contains("请先选择"));

        execute(&mut app, AppCommand::Select("SFO".into()));
        execute(&mut app, AppCommand::Edit(fields));
        tokio::task::yield_now().await;
        assert!(api.calls_to("update_airport").is_empty());
        assert_eq!(app.log_messages.last().map(String::as_str), Some("没有改动，未提交"));
    }

    #[tokio::test]
    async fn routes_command_needs_both_codes() {
        let api = fixture();
        let (mut app, mut rx) = loaded_app(api.clone()).await;

        execute(&mut app, AppCommand::Routes {
            source: Some("SFO".into()),
            dest: None,
        });
        assert_eq!(app.view_mode, ViewMode::Routes);
        assert!(api.calls_to("one_hop_routes").is_empty());

        execute(&mut app, AppCommand::Routes {
            source: Some("sfo".into()),
            dest: Some("jfk".into()),
        });
        while !app.routes.has_searched() {
            let evt = rx.recv().await.expect("event");
            app.apply_event(evt);
        }
        assert_eq!(api.calls_to("one_hop_routes"), vec!["one_hop_routes SFO JFK"]);
        assert!(!execute(&mut app, AppCommand::Help));
        assert!(execute(&mut app, AppCommand::Quit));
    }
}
