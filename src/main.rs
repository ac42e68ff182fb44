mod app_service;
mod app_state;
mod commands;
mod config;
mod deep_link;
mod model;
mod session;
mod sync;
mod ui;

use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use session::{FlightApi, FlightSession};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app_service::refresh_stats;
use crate::app_state::{App, AppEvent};
use crate::config::AppConfig;
use crate::ui::draw;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> io::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // 终端被 TUI 占用，日志写文件
        .filter_level(log::LevelFilter::Warn)
        .filter_module("flightdesk", log::LevelFilter::Info)
        .filter_module("reqwest", log::LevelFilter::Error)
        .filter_module("hyper", log::LevelFilter::Error)
        .init();

    // 命令行第一个参数作为深链接
    let (config, mut session_info) = match AppConfig::load(std::env::args().nth(1)) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("配置错误: {:#}", e);
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("配置错误: {:#}", e),
            ));
        }
    };

    let session = match FlightSession::new(&config) {
        Ok(sess) => {
            session_info.push(format!("✓ 已创建会话: {}", sess));
            sess
        }
        Err(e) => {
            eprintln!("无法创建 HTTP 客户端: {}", e);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("HTTP 客户端创建失败: {}", e),
            ));
        }
    };
    let api: Arc<dyn FlightApi> = Arc::new(session);

    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 周期性刷新统计
    {
        let apic = Arc::clone(&api);
        let txc = evt_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                refresh_stats(&apic, &txc).await;
            }
        });
    }

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config, api, evt_tx, session_info);
    app.start(config.deep_link.as_deref());

    let res = run_app_loop(&mut terminal, &mut app, evt_rx).await;

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = res {
        eprintln!("{}", e);
    }
    Ok(())
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        while let Ok(event) = evt_rx.try_recv() {
            app.apply_event(event);
        }
        app.tick();

        terminal.draw(|f| draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key_event(key.code) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    if let MouseEventKind::Down(_) = mouse.kind {
                        app.handle_mouse_click(mouse.column, mouse.row);
                    }
                }
                _ => {}
            }
        }
    }
}
