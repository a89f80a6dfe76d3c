use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use ephemeral_spaces::common::{
    EventRecord, EventType, NewEvent, SessionCommand, SessionUpdate, format_location,
    short_address, time_remaining,
};
use ephemeral_spaces::config::{self, AppConfig};
use ephemeral_spaces::session::{FeedMessage, StatusKind};
use ephemeral_spaces::{
    AppError, ContractDatabase, DirectoryIndex, LocalWallet, SessionManager, SessionService,
    SessionSettings,
};

#[derive(Parser)]
#[command(
    name = "ephemeral_spaces",
    version,
    about = "Temporary social spaces backed by a contract key/value store"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init,
    /// List active events, newest first
    List,
    /// Create a new event
    Create {
        /// One of: Concert, Conference, Meetup, Party, Sports, Art
        #[arg(long = "type", value_parser = parse_event_type)]
        event_type: EventType,
        /// Lifetime in hours (1-24)
        #[arg(long)]
        hours: Option<u32>,
        /// Maximum participants (2-100)
        #[arg(long)]
        max: Option<u32>,
        /// Free text or "lat,lng"
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Take a seat in an event
    Join { event_id: String },
    /// Show the message feed of an event
    Messages { event_id: String },
    /// Post a message to an event
    Send { event_id: String, text: String },
    /// Sign the challenge and reveal another participant's message
    Reveal { event_id: String, message_id: String },
    /// Interactive session
    Shell,
}

fn parse_event_type(name: &str) -> Result<EventType, String> {
    EventType::from_name(name).ok_or_else(|| {
        let names: Vec<_> = EventType::ALL.iter().map(|kind| kind.name()).collect();
        format!("unknown event type `{name}` (expected one of {})", names.join(", "))
    })
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        log::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let app_config = config::load_config(&cli.config);

    match cli.command {
        Command::Init => {
            config::save_config(&cli.config, &AppConfig::default())
                .map_err(|err| AppError::Unknown(err.to_string()))?;
            println!("Wrote default config to {}", cli.config);
        }
        Command::List => {
            let mut session = build_session(&app_config)?;
            let events = session.browse().await?;
            if events.is_empty() {
                println!("No active spaces found");
            }
            for event in events {
                print_event(event);
            }
        }
        Command::Create {
            event_type,
            hours,
            max,
            location,
            description,
        } => {
            let draft = NewEvent {
                event_type,
                description,
                duration_hours: hours.unwrap_or(app_config.default_duration_hours),
                location,
                max_participants: max.unwrap_or(app_config.default_max_participants),
            };
            let mut session = build_session(&app_config)?;
            let id = session.create_event(&draft).await?;
            println!("Created {id}");
        }
        Command::Join { event_id } => {
            let mut session = build_session(&app_config)?;
            let event = session.join(&event_id).await?;
            print_event(&event);
            print_feed(session.state().messages.iter());
        }
        Command::Messages { event_id } => {
            let mut session = build_session(&app_config)?;
            session.open(&event_id).await?;
            print_feed(session.state().messages.iter());
        }
        Command::Send { event_id, text } => {
            let mut session = build_session(&app_config)?;
            session.open(&event_id).await?;
            match session.send(&text).await? {
                Some(record) => println!("Sent {}", record.id),
                None => println!("Nothing to send"),
            }
        }
        Command::Reveal {
            event_id,
            message_id,
        } => {
            let mut session = build_session(&app_config)?;
            session.open(&event_id).await?;
            session.reveal(&message_id)?;
            while session.state().decrypting {
                if let Some(event) = session.next_event().await {
                    session.apply(event);
                }
            }
            print_feed(
                session
                    .state()
                    .messages
                    .iter()
                    .filter(|message| message.record.id == message_id),
            );
        }
        Command::Shell => {
            let session = build_session(&app_config)?;
            run_shell(session, &app_config).await;
        }
    }
    Ok(())
}

fn build_session(app_config: &AppConfig) -> Result<SessionManager, AppError> {
    let store = ContractDatabase::open(&app_config.store_path, &app_config.contract_address)?;
    let wallet = if app_config.wallet_address.is_empty() {
        LocalWallet::random()
    } else {
        LocalWallet::new(app_config.wallet_address.clone())
    };
    log::info!(
        "Using store {} as {}",
        app_config.store_path,
        wallet_label(&wallet)
    );

    let directory = DirectoryIndex::new(Arc::new(store), Arc::new(wallet));
    Ok(SessionManager::new(directory, SessionSettings::from(app_config)))
}

fn wallet_label(wallet: &LocalWallet) -> String {
    use ephemeral_spaces::Wallet;
    wallet.address().unwrap_or_else(|| "<disconnected>".to_string())
}

async fn run_shell(session: SessionManager, app_config: &AppConfig) {
    // UI -> Session
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Session -> UI
    let (update_tx, mut update_rx) = mpsc::channel(100);

    let service = tokio::spawn(SessionService::new(session, cmd_rx, update_tx).run());
    let printer = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            print_update(update);
        }
    });

    println!("Commands: list | create <type> [hours] [max] | join <id> | open <id> | say <text> | reveal <msg> | leave | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                log::warn!("Failed to read input: {err}");
                break;
            }
        };
        let command = match parse_shell_line(&line, app_config) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        let quit = matches!(command, SessionCommand::Shutdown);
        if let Err(err) = cmd_tx.send(command).await {
            log::warn!("Failed to send command to session: {err}");
            break;
        }
        if quit {
            break;
        }
    }

    let _ = cmd_tx.send(SessionCommand::Shutdown).await;
    if let Err(err) = service.await {
        log::error!("Session service terminated: {err}");
    }
    // give the printer a moment to drain the last updates
    let _ = tokio::time::timeout(Duration::from_millis(200), printer).await;
}

fn parse_shell_line(line: &str, app_config: &AppConfig) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let command = match word {
        "" => return Ok(None),
        "list" => SessionCommand::Browse,
        "create" => {
            let mut parts = rest.split_whitespace();
            let event_type = parse_event_type(parts.next().unwrap_or_default())?;
            let mut draft = NewEvent::new(event_type);
            draft.duration_hours = parse_or(parts.next(), app_config.default_duration_hours)?;
            draft.max_participants = parse_or(parts.next(), app_config.default_max_participants)?;
            SessionCommand::CreateEvent(draft)
        }
        "join" if !rest.is_empty() => SessionCommand::Join(rest.to_string()),
        "open" if !rest.is_empty() => SessionCommand::Open(rest.to_string()),
        "say" => SessionCommand::Send(rest.to_string()),
        "reveal" if !rest.is_empty() => SessionCommand::Reveal(rest.to_string()),
        "leave" => SessionCommand::Leave,
        "quit" | "exit" => SessionCommand::Shutdown,
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(Some(command))
}

fn parse_or(value: Option<&str>, default: u32) -> Result<u32, String> {
    match value {
        Some(text) => text
            .parse()
            .map_err(|_| format!("`{text}` is not a number")),
        None => Ok(default),
    }
}

fn print_update(update: SessionUpdate) {
    match update {
        SessionUpdate::EventsLoaded(events) => {
            println!("-- {} active space(s)", events.len());
            for event in &events {
                print_event(event);
            }
        }
        SessionUpdate::EventOpened(event) => {
            println!("-- opened {} {}", event.icon(), event.event_type);
            print_event(&event);
        }
        SessionUpdate::MessagesLoaded(messages) => print_feed(messages.iter()),
        SessionUpdate::MessagePosted(record) => println!("-- sent {}", record.id),
        SessionUpdate::ParticipantCount(count) => println!("-- 👥 {count}"),
        SessionUpdate::MessageRevealed { message_id, text } => {
            println!("-- {message_id}: {text}")
        }
        SessionUpdate::RevealFailed { message_id } => {
            println!("-- {message_id}: [Encrypted Message]")
        }
        SessionUpdate::Status(Some(status)) => {
            let mark = match status.kind {
                StatusKind::Pending => "…",
                StatusKind::Success => "✓",
                StatusKind::Error => "✗",
            };
            println!("{mark} {}", status.message);
        }
        SessionUpdate::Status(None) => {}
        SessionUpdate::Left => println!("-- back to all spaces"),
    }
}

fn print_event(event: &EventRecord) {
    let now = chrono::Utc::now().timestamp();
    println!(
        "{} {:<10} {}  {}  👥 {}/{}  {}",
        event.icon(),
        event.event_type,
        event.id,
        format_location(&event.location),
        event.participants,
        event.max_participants,
        time_remaining(event.expires_at, now)
    );
    if !event.description.is_empty() {
        println!("    {}", event.description);
    }
}

fn print_feed<'a>(messages: impl Iterator<Item = &'a FeedMessage>) {
    let mut empty = true;
    for message in messages {
        empty = false;
        let who = if message.own {
            "You".to_string()
        } else {
            short_address(&message.record.sender)
        };
        println!("[{}] {who}: {}", message.record.id, message.display_text());
    }
    if empty {
        println!("Be the first to message in this space");
    }
}
