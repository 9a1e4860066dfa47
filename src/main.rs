use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use clap::builder::TypedValueParser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{backend::CrosstermBackend, prelude::*};
use tracing::info;

mod app;
mod error;
mod fetch;
mod logging;
mod record;
mod store;
mod ui;

use app::{App, AppMode, LoadState};
use fetch::{DEFAULT_MEMBERS_URL, FetchConfig, FetchRequest, FetchResponse, start_fetch_worker};

#[derive(Parser, Debug)]
#[command(author, version, about = "Member admin panel: search, page, edit and delete members")]
struct Args {
    /// URL of the JSON member list
    #[arg(long, env = "MEMBER_ADMIN_URL", default_value = DEFAULT_MEMBERS_URL)]
    url: String,

    /// Page size (rows per page)
    #[arg(short = 'n', long, env = "MEMBER_ADMIN_PAGE_SIZE", default_value_t = store::DEFAULT_PAGE_SIZE,
          value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    page_size: usize,

    /// HTTP timeout for the member fetch, in seconds
    #[arg(long, env = "MEMBER_ADMIN_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Directory for member-admin.log (defaults to the system temp dir)
    #[arg(long, env = "MEMBER_ADMIN_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_dir = args.log_dir.clone().unwrap_or_else(std::env::temp_dir);
    let _log_guard = logging::init(&log_dir)?;
    info!(url = %args.url, page_size = args.page_size, "starting member-admin");

    let mut terminal = setup_terminal()?;

    // Fetch worker channels
    let (req_tx, req_rx) = crossbeam_channel::unbounded::<FetchRequest>();
    let (resp_tx, resp_rx) = crossbeam_channel::unbounded::<FetchResponse>();

    let config = FetchConfig {
        url: args.url.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
    };
    std::thread::spawn(move || start_fetch_worker(config, req_rx, resp_tx));

    let mut app = App::new(args.page_size, req_tx, resp_rx);
    app.request_load();

    let res = run_app(&mut terminal, &mut app, Duration::from_millis(100));

    restore_terminal(terminal)?;
    if let Err(e) = res {
        tracing::error!(error = %e, "event loop failed");
        eprintln!("Error: {e:?}");
    }
    info!("member-admin exiting");
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();
    // Redraw only when state changes or on tick
    let mut dirty = true;
    loop {
        // Apply finished loads without blocking
        while let Ok(msg) = app.resp_rx.try_recv() {
            app.handle_fetch_response(msg);
            dirty = true;
        }

        let tick_due = last_tick.elapsed() >= tick_rate;
        if dirty || tick_due {
            terminal.draw(|f| ui::draw(f, app))?;
            dirty = false;
            if tick_due {
                last_tick = Instant::now();
            }
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));

        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(app, key);
            dirty = true;
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }
    if app.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            app.toggle_help();
        }
        return;
    }
    match app.mode {
        AppMode::Normal => handle_key_normal(app, key.code),
        AppMode::Searching => handle_key_search(app, key),
        AppMode::Editing { .. } => handle_key_editing(app, key),
    }
}

fn handle_key_normal(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Char('r') => app.request_load(),
        KeyCode::Char('/') => app.begin_search(),
        KeyCode::Esc => {
            if !app.store.query().is_empty() {
                app.clear_search();
            }
        }
        // Nothing below applies until a collection is on screen
        _ if matches!(app.load_state, LoadState::Failed(_)) => {
            app.status = "Nothing loaded; press r to reload".into();
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_up(),
        KeyCode::Down | KeyCode::Char('j') => app.move_down(),
        KeyCode::PageDown | KeyCode::Right => app.next_page(),
        KeyCode::PageUp | KeyCode::Left => app.prev_page(),
        KeyCode::Home => app.first_page(),
        KeyCode::End => app.last_page(),
        KeyCode::Char(' ') => app.toggle_select_current(),
        KeyCode::Char('a') => app.toggle_select_all(),
        KeyCode::Char('e') | KeyCode::Enter => app.begin_edit_current(),
        KeyCode::Char('d') | KeyCode::Delete => app.delete_current(),
        KeyCode::Char('D') => app.delete_selected(),
        _ => {}
    }
}

fn handle_key_search(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_search(),
        KeyCode::Esc => app.close_search(),
        KeyCode::Backspace => app.search_backspace(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.search_input_char(c)
        }
        _ => {}
    }
}

fn handle_key_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_edit(),
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Tab | KeyCode::Down => app.edit_next_field(),
        KeyCode::BackTab | KeyCode::Up => app.edit_prev_field(),
        KeyCode::Backspace => app.edit_input_backspace(),
        KeyCode::Delete => app.edit_input_delete(),
        KeyCode::Left => app.edit_input_left(),
        KeyCode::Right => app.edit_input_right(),
        KeyCode::Home => app.edit_input_home(),
        KeyCode::End => app.edit_input_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.edit_input_insert(c)
        }
        _ => {}
    }
}
