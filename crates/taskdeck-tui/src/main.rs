use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use taskdeck_service::{
    BackendConfig, FileSessionStore, MemorySessionStore, SessionPersistence,
};
use taskdeck_tui::app::App;
use taskdeck_tui::context::AppContext;
use tracing_subscriber::EnvFilter;

const LOCAL_PORT: u16 = 54321;
const DEFAULT_URL: &str = "http://127.0.0.1:54321";

/// Terminal client for taskdeck projects and tasks.
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "TASKDECK_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Public API key sent with every request
    #[arg(long, env = "TASKDECK_ANON_KEY", default_value = "")]
    anon_key: String,

    /// Keep the signed-in session in this file across restarts
    #[arg(long, env = "TASKDECK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, env = "TASKDECK_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Start a local taskdeck-server and connect to it
    #[arg(long)]
    local: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.log_file {
        init_logging(path)?;
    }

    let url = if cli.local { DEFAULT_URL } else { cli.url.as_str() };
    let config = BackendConfig::new(url, &cli.anon_key)
        .with_context(|| format!("invalid backend URL {url:?}"))?;

    let store: Arc<dyn SessionPersistence> = match cli.session_file {
        Some(ref path) => Arc::new(FileSessionStore::new(path)),
        None => Arc::new(MemorySessionStore::new()),
    };

    let mut child = if cli.local {
        Some(spawn_server(&cli.anon_key)?)
    } else {
        None
    };

    let ctx = AppContext::new(config, store);
    let result = if child.is_some() {
        wait_for_server(&ctx).and_then(|()| run_tui(ctx))
    } else {
        run_tui(ctx)
    };

    // Cleanup: kill server if we spawned it
    if let Some(ref mut child) = child {
        let _ = child.kill();
        let _ = child.wait();
    }

    result
}

fn init_logging(path: &PathBuf) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("taskdeck_tui=info,taskdeck_service=info")
            }),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn spawn_server(anon_key: &str) -> Result<Child> {
    // Look for taskdeck-server next to our own binary first,
    // then fall back to PATH
    let self_exe = std::env::current_exe().unwrap_or_default();
    let sibling = self_exe
        .parent()
        .map(|d| d.join("taskdeck-server"))
        .filter(|p| p.exists());
    let server_bin = sibling.unwrap_or_else(|| "taskdeck-server".into());

    let mut command = Command::new(&server_bin);
    command
        .env("TASKDECK_BIND", "127.0.0.1")
        .env("TASKDECK_PORT", LOCAL_PORT.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if !anon_key.trim().is_empty() {
        command.env("TASKDECK_ANON_KEY", anon_key);
    }

    let child = command
        .spawn()
        .with_context(|| format!("failed to start {}", server_bin.display()))?;
    tracing::info!(pid = child.id(), "started local taskdeck-server");
    Ok(child)
}

fn wait_for_server(ctx: &AppContext) -> Result<()> {
    let start = Instant::now();
    let timeout = Duration::from_secs(10);

    loop {
        if ctx.service.health_check().is_ok() {
            return Ok(());
        }
        if start.elapsed() > timeout {
            bail!(
                "taskdeck-server did not become ready within {}s",
                timeout.as_secs()
            );
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn run_tui(ctx: AppContext) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, ctx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        eprintln!("Error: {e}");
    }

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ctx: AppContext,
) -> Result<()> {
    let mut app = App::new(ctx);

    // Splash first, then the (possibly slow) silent restore.
    terminal.draw(|frame| app.render(frame))?;
    app.restore_session();

    loop {
        terminal.draw(|frame| app.render(frame))?;

        if !event::poll(Duration::from_millis(250))? {
            app.tick();
            continue;
        }
        if let Event::Key(key) = event::read()? {
            // Ctrl+C always quits
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }
            // q quits unless we're in an input mode
            if key.code == KeyCode::Char('q') && !app.is_input_mode() {
                break;
            }
            app.handle_key(key);
        }
    }

    Ok(())
}
