mod state;
mod theme;
mod ui;
mod worker;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use site_client::{
    ChannelConfirmer, ChannelNotifier, ClientConfig, ConfigOverrides, QueryCache, RestClient,
    Session,
};
use site_core::EntityId;
use state::{App, Command};
use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "site-board", about = "Task and checklist board for a construction project")]
struct Args {
    /// Base URL of the site API.
    #[arg(long)]
    api_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Restrict the board to one project.
    #[arg(long)]
    project: Option<EntityId>,
    /// Name written on new comments.
    #[arg(long, default_value = "Site team")]
    author: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = ClientConfig::load(&ConfigOverrides {
        api_url: args.api_url,
        timeout_secs: args.timeout_secs,
        project: args.project,
    })
    .context("loading configuration")?;
    info!(
        event = "board_start",
        api_url = %config.base_url,
        timeout = ?config.request_timeout
    );

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let (confirm_tx, confirm_rx) = mpsc::channel(4);
    let session = Session::new(
        Arc::new(RestClient::from_config(&config)),
        Arc::new(QueryCache::new()),
        Arc::new(ChannelNotifier::new(notice_tx)),
        Arc::new(ChannelConfirmer::new(confirm_tx)),
    );
    let app = App::new(config.default_project, args.author);

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, app, session, notice_rx, confirm_rx).await;
    restore_terminal(&mut terminal)?;

    if let Err(err) = &result {
        eprintln!("site-board: {err}");
    }
    result
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(std::env::var("SITE_LOG_LEVEL").unwrap_or_else(|_| "info".into()))
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_enabled = matches!(
        std::env::var("SITE_LOG_STDOUT").ok().as_deref(),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
    );
    if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    session: Session,
    mut notice_rx: mpsc::UnboundedReceiver<site_client::Notice>,
    mut confirm_rx: mpsc::Receiver<site_client::ConfirmRequest>,
) -> Result<()> {
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let mut cache_events = session.cache().subscribe();
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    let dispatch = |command: Command| worker::spawn(session.clone(), update_tx.clone(), command);
    for command in app.initial_commands() {
        dispatch(command);
    }

    loop {
        terminal.draw(|f| ui::render(f, &mut app))?;

        tokio::select! {
            _ = ticker.tick() => {
                app.on_tick(Instant::now());
            }
            Some(notice) = notice_rx.recv() => {
                app.push_notice(notice, Instant::now());
            }
            Some(request) = confirm_rx.recv() => {
                app.set_prompt(request);
            }
            Some(update) = update_rx.recv() => {
                for command in app.apply_update(update) {
                    dispatch(command);
                }
            }
            cache_event = cache_events.recv() => {
                match cache_event {
                    Ok(event) => {
                        if let Some(command) = app.command_for_cache_event(&event) {
                            dispatch(command);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(event = "cache_events_lagged", skipped);
                        dispatch(Command::LoadTasks { project_id: app.project_id });
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            if let Some(command) = app.handle_key(key) {
                                dispatch(command);
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(event = "terminal_event_error", error = %err);
                    }
                    None => break,
                }
            }
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
