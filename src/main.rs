use anyhow::Result;
use clap::Parser;

mod app;
mod client;
mod config;
mod handler;
mod session;
mod tui;
mod ui;

use app::App;
use client::AskClient;
use config::Config;

#[derive(Parser)]
#[command(name = "consulta")]
#[command(about = "Terminal chat client for an HTTP question-answering service")]
struct Cli {
    /// URL of the ask endpoint (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long)]
    timeout: Option<u64>,

    /// Persist the resolved endpoint and timeout to the config file
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let mut config = Config::load().unwrap_or_default();
    if cli.endpoint.is_some() {
        config.endpoint = cli.endpoint;
    }
    if cli.timeout.is_some() {
        config.timeout_secs = cli.timeout;
    }
    if cli.save_config {
        config.save()?;
    }

    tracing::info!("starting with endpoint {}", config.endpoint());
    let client = AskClient::new(config.endpoint(), config.timeout())?;
    let mut app = App::new(client);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut terminal, &mut events, &mut app).await;

    // Teardown aborts any in-flight request so a late response cannot
    // touch state after this point.
    app.session.cancel();
    tui::restore()?;

    result
}

async fn run(
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

/// Log to a file; the TUI owns the terminal.
fn init_tracing() -> Result<()> {
    let dir = config::log_dir()?;
    std::fs::create_dir_all(&dir)?;
    let log_file = std::fs::File::create(dir.join("consulta.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    Ok(())
}
