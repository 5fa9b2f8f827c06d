//! Wavelink command-line client

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use wavelink::config::Config;
use wavelink::history::HistoryLoader;
use wavelink::identity::IdentityStore;
use wavelink::model::Role;
use wavelink::transport::{Transport, TransportEvent, WsTransport};
use wavelink::SessionOrchestrator;

#[derive(Parser)]
#[command(name = "wavelink", version, about = "Realtime chat client")]
struct Cli {
    /// Backend base URL (overrides config file)
    #[arg(long, env = "WAVELINK_SERVER_URL")]
    server_url: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List known sessions
    Sessions,
    /// Delete the active session's transcript
    Clear,
    /// Abandon the current identity and mint a fresh session
    NewSession,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(url) = &cli.server_url {
        config.set_server_url(url);
    }

    let history = HistoryLoader::new(&config.server_url, config.http_timeout)
        .context("failed to build history client")?;
    let mut identity = config
        .identity_path
        .clone()
        .map_or_else(IdentityStore::in_memory, IdentityStore::new);

    match cli.command {
        Some(Command::Sessions) => {
            let sessions = history.fetch_session_list().await?;
            if sessions.is_empty() {
                println!("no sessions");
            }
            for session in sessions {
                let preview = session.last_message.as_deref().unwrap_or("");
                println!("{}  {preview}", session.id);
            }
            Ok(())
        }
        Some(Command::Clear) => {
            let id = identity.resolve();
            history.delete_transcript(&id).await?;
            println!("cleared {id}");
            Ok(())
        }
        Some(Command::NewSession) => {
            identity.clear();
            let id = identity.resolve();
            println!("started {id}");
            Ok(())
        }
        None => run_chat(config, identity, history).await,
    }
}

/// Interactive chat loop: transport events and stdin lines interleaved
/// through one dispatch point.
async fn run_chat(
    config: Config,
    identity: IdentityStore,
    history: HistoryLoader,
) -> anyhow::Result<()> {
    let transport = WsTransport::new(config.ws_url.clone(), config.retry.clone());
    let mut orchestrator = SessionOrchestrator::new(identity, transport, history);

    orchestrator.initialize().await;
    let mut events = orchestrator
        .take_events()
        .context("transport events already taken")?;

    for message in orchestrator.transcript() {
        print_message(&message.role, &message.content);
    }
    if let Some(error) = orchestrator.last_error() {
        eprintln!("! {error}");
    }
    println!("(session {})", orchestrator.active_session());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(scoped) = event else { break };
                if orchestrator.event_in_scope(&scoped) {
                    render_event(&scoped.event, &orchestrator);
                }
                orchestrator.handle_event(scoped).await;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else { break };
                if !dispatch_line(&mut orchestrator, &line).await {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Handle one line of user input; returns `false` to exit
async fn dispatch_line<T: Transport>(
    orchestrator: &mut SessionOrchestrator<T>,
    line: &str,
) -> bool {
    match line.trim() {
        "/quit" => return false,
        "/retry" => orchestrator.retry_connection().await,
        "/clear" => orchestrator.clear_chat().await,
        "/new" => {
            orchestrator.new_session().await;
            println!("(session {})", orchestrator.active_session());
        }
        "/sessions" => {
            for session in orchestrator.sessions() {
                let preview = session.last_message.as_deref().unwrap_or("");
                println!("{}  {preview}", session.id);
            }
        }
        text => {
            if let Some(id) = text.strip_prefix("/switch ") {
                orchestrator.switch_session(id.trim().into()).await;
                for message in orchestrator.transcript() {
                    print_message(&message.role, &message.content);
                }
            } else {
                orchestrator.send_message(text);
            }
        }
    }
    if let Some(error) = orchestrator.last_error() {
        eprintln!("! {error}");
    }
    true
}

fn render_event<T: Transport>(event: &TransportEvent, orchestrator: &SessionOrchestrator<T>) {
    match event {
        TransportEvent::MessageFinal(message) => {
            print_message(&message.role, &message.content);
        }
        TransportEvent::ReconnectAttempt(attempt) => {
            eprintln!("! reconnecting (attempt {attempt})");
        }
        TransportEvent::ReconnectExhausted => {
            eprintln!("! connection lost; type /retry to reconnect");
        }
        TransportEvent::ChannelError(reason) => {
            eprintln!("! {reason}");
        }
        TransportEvent::SessionAssigned(id) => {
            if id != orchestrator.active_session() {
                println!("(session {id})");
            }
        }
        _ => {}
    }
}

fn print_message(role: &Role, content: &str) {
    let prefix = match role {
        Role::User => ">",
        Role::Assistant => "<",
    };
    println!("{prefix} {content}");
}

fn init_tracing(verbosity: u8) {
    let directive = match verbosity {
        0 => "info,wavelink=info",
        1 => "info,wavelink=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
