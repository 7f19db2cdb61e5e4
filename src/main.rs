// Command line client for a Codex app server.
//
// Connects, performs the initialize handshake and runs one session operation.

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use codex_app_client::types::options::DEFAULT_PORT;
use codex_app_client::{
    AppServerClient, ClientEvent, ClientOptions, ServerNotification, ThreadId,
};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Parser)]
#[command(name = "codex-app-client", version, about = "Talk to a Codex app server")]
struct Cli {
    /// App server host; `ws://` prefixes, ports and paths are ignored
    #[arg(long, env = "CODEX_HOST")]
    host: String,

    /// App server port
    #[arg(long, env = "CODEX_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 6)]
    connect_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List recent threads
    Threads {
        /// Only threads started in this directory
        #[arg(long)]
        cwd: Option<String>,
    },
    /// Start a thread and run one prompt in it
    Start {
        /// Working directory for the thread
        #[arg(long)]
        cwd: String,
        /// Model override
        #[arg(long)]
        model: Option<String>,
        /// Prompt text
        prompt: String,
    },
    /// Resume a thread and run one prompt in it
    Send {
        /// Thread to resume
        #[arg(long)]
        thread: String,
        /// Working directory for the thread
        #[arg(long)]
        cwd: String,
        /// Reasoning effort override
        #[arg(long)]
        effort: Option<String>,
        /// Prompt text
        prompt: String,
    },
    /// Interrupt the running turn of a thread
    Interrupt {
        /// Thread to interrupt
        #[arg(long)]
        thread: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let options = ClientOptions::builder()
        .connect_timeout(std::time::Duration::from_secs(cli.connect_timeout))
        .build()?;
    let mut client = AppServerClient::new(options);
    let mut events = client
        .take_event_receiver()
        .context("event receiver already taken")?;

    client
        .connect(&cli.host, cli.port)
        .await
        .with_context(|| format!("connecting to {}:{}", cli.host, cli.port))?;
    client
        .initialize(
            client.options().client_info.name.clone(),
            client.options().client_info.version.clone(),
        )
        .await
        .context("initialize")?;

    let outcome = run(&client, &mut events, cli.command).await;
    client.disconnect().await;
    outcome
}

async fn run(
    client: &AppServerClient,
    events: &mut UnboundedReceiver<ClientEvent>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Threads { cwd } => {
            for thread in client.list_threads(cwd.as_deref()).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    thread.id, thread.updated_at, thread.cwd, thread.preview
                );
            }
        }
        Command::Start { cwd, model, prompt } => {
            let thread = client.start_thread(&cwd, model.as_deref()).await?;
            eprintln!("thread {thread}");
            client.start_turn(&thread, &prompt, None, None).await?;
            stream_turn(events).await?;
        }
        Command::Send {
            thread,
            cwd,
            effort,
            prompt,
        } => {
            let thread = ThreadId::new(thread);
            client.resume_thread(&thread, &cwd).await?;
            client
                .start_turn(&thread, &prompt, None, effort.as_deref())
                .await?;
            stream_turn(events).await?;
        }
        Command::Interrupt { thread } => {
            client.interrupt_turn(&ThreadId::new(thread)).await?;
        }
    }
    Ok(())
}

/// Print agent text until the turn completes
async fn stream_turn(events: &mut UnboundedReceiver<ClientEvent>) -> Result<()> {
    let mut stdout = std::io::stdout();
    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::Error(reason) => bail!("connection lost: {reason}"),
            ClientEvent::ConnectionChanged(_) => {}
            notification => match notification.as_notification() {
                Some(ServerNotification::AgentMessageDelta { delta }) => {
                    write!(stdout, "{delta}")?;
                    stdout.flush()?;
                }
                Some(ServerNotification::ItemCompleted { item_type, .. }) => {
                    log::info!("item completed: {item_type}");
                }
                Some(ServerNotification::TurnCompleted) => {
                    writeln!(stdout)?;
                    return Ok(());
                }
                _ => {}
            },
        }
    }
    bail!("event stream ended before the turn completed")
}
