use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tokio::task::JoinError;
use tracing::{info, warn};
use localchat_core::{ChatClient, ChatError, Content, Role, Session};

mod app;
mod config;
mod handler;
mod logging;
mod tui;
mod ui;

use app::{App, wait_for_request};
use config::{Config, BACKEND_URL_ENV};
use logging::LogTarget;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "localchat", version)]
#[command(about = "Chat with a local LLM through its HTTP backend")]
struct Cli {
    /// Backend base URL; the chat endpoint is <URL>/chat
    #[arg(long, global = true)]
    backend_url: Option<String>,
    /// Log filter directive, e.g. "localchat=debug"
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Send one prompt and print the transcript
    Ask {
        /// Text to send
        prompt: String,
    },
    /// Save the backend URL to the config file
    SetBackend {
        url: String,
    },
}

enum Step {
    Event(Option<tui::AppEvent>),
    Resolved(Result<Result<Content, ChatError>, JoinError>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        backend_url,
        log_level,
        command,
    } = Cli::parse();
    let command = command.unwrap_or(Commands::Chat);

    let log_target = match command {
        Commands::Chat => LogTarget::File(logging::default_log_file()?),
        _ => LogTarget::Stderr,
    };
    logging::init(log_target, log_level.as_deref())?;

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Config load failed, using defaults: {e}");
        Config::new()
    });

    match command {
        Commands::SetBackend { url } => {
            let mut config = config;
            config.backend_url = Some(url);
            let path = config.save()?;
            println!("Saved backend URL to {}", path.display());
            Ok(())
        }
        command => {
            let env_url = std::env::var(BACKEND_URL_ENV).ok();
            let url = config.resolve_backend_url(backend_url.as_deref(), env_url.as_deref());
            let client = ChatClient::new(&url);
            info!(endpoint = %client.endpoint_url(), "localchat v{} starting", env!("CARGO_PKG_VERSION"));

            match command {
                Commands::Ask { prompt } => ask(&client, prompt).await,
                _ => run_tui(client).await,
            }
        }
    }
}

async fn ask(client: &ChatClient, prompt: String) -> Result<()> {
    let mut session = Session::new();
    session.update_draft(prompt);

    let failed = match session.exchange(client).await {
        Some(last) => last.role() == Role::Error,
        None => return Err(anyhow!("Nothing to send: the prompt is empty")),
    };

    for record in session.render() {
        println!("{}:\n{}\n", record.label, record.body);
    }

    if failed {
        bail!("The backend reply was an error");
    }
    Ok(())
}

async fn run_tui(client: ChatClient) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run_app(&mut terminal, App::new(client)).await;

    tui::restore()?;
    result
}

async fn run_app(terminal: &mut Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        if app.take_redraw() {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
        }

        let step = tokio::select! {
            event = events.next() => Step::Event(event),
            joined = wait_for_request(&mut app.request_task) => Step::Resolved(joined),
        };

        match step {
            Step::Event(Some(event)) => handler::handle_event(&mut app, event),
            Step::Event(None) => break,
            Step::Resolved(joined) => app.finish_request(joined),
        }
    }

    info!(entries = app.session.transcript().len(), "session closed");
    Ok(())
}
