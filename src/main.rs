// main.rs

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use taskdeck::app::App;
use taskdeck::clock::SystemClock;
use taskdeck::config::{Config, StoreConfig};
use taskdeck::store::{MemoryStore, RecordStore, RemoteStore};
use taskdeck::ui::run_app;
use taskdeck::{CategoryRepository, TaskRepository, View};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Logs go to a file because the terminal belongs to the UI. Off unless RUST_LOG is set.
fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("taskdeck");
    let file = std::fs::create_dir_all(&dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("taskdeck.log"))
    });

    match file {
        Ok(file) => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .with(filter)
            .init(),
        Err(err) => eprintln!("Logging disabled: {}", err),
    }
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn RecordStore> = match config {
        StoreConfig::Remote {
            instance_url,
            api_key,
            project_id,
        } => {
            tracing::info!(%instance_url, project_id, "using remote record store");
            Arc::new(RemoteStore::new(instance_url, api_key, *project_id))
        }
        StoreConfig::Memory { seed: Some(path) } => Arc::new(MemoryStore::from_seed_file(path).await?),
        StoreConfig::Memory { seed: None } => {
            tracing::info!("using empty in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load()?;
    let store = open_store(&config.store).await?;
    let view = View::parse(std::env::args().nth(1).as_deref());

    let mut app = App::new(
        TaskRepository::new(store.clone(), Arc::new(SystemClock), view),
        CategoryRepository::new(store),
    );
    app.load().await;

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
