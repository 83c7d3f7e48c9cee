use clap::{Parser, Subcommand};
use lib::analytics::{AnalyticsReporter, AnalyticsSink, HttpSink, LogSink};
use lib::content::ContentResolver;
use lib::lifecycle::{HostEvent, LifecycleSignal};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio Reader CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default config file.
    Init {
        /// Config file path (default: FOLIO_CONFIG_PATH or ~/.folio/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Open a book and drive a player session over stdin/stdout: each stdin
    /// line is a wire message from the player, outbound deliveries are
    /// printed, and EOF ends the session for good (flushing the progress
    /// report). Development stand-in for the webview shell.
    Open {
        /// Book folder (or the entry .htm file itself).
        book: PathBuf,

        /// Config file path (default: FOLIO_CONFIG_PATH or ~/.folio/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("folio {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Open { book, config }) => {
            if let Err(e) = run_open(book, config).await {
                log::error!("open failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::config::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

/// Prints outbound player deliveries to stdout.
struct StdoutSurface;

impl lib::channel::ContentSurface for StdoutSurface {
    fn deliver(&self, script: &str) {
        println!("-> {}", script);
    }
}

async fn run_open(book: PathBuf, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _path) = lib::config::load_config(config_path)?;

    // Resolution failure aborts before anything is started: no session, no
    // half-configured player.
    let resolved = lib::content::FsContentResolver
        .resolve(&book)
        .map_err(|e| anyhow::anyhow!("cannot open book: {}", e))?;
    match config.reader.player_entry.as_deref() {
        Some(player) => println!(
            "player url: {}",
            lib::content::player_url(player, &resolved.book_html)
        ),
        None => println!(
            "book entry: {} (base {})",
            resolved.book_html.display(),
            resolved.base_dir.display()
        ),
    }

    let sink: Arc<dyn AnalyticsSink> = match lib::config::resolve_write_key(&config) {
        Some(key) if config.analytics.enabled => {
            Arc::new(HttpSink::new(key, config.analytics.endpoint.clone()))
        }
        _ => Arc::new(LogSink),
    };
    let reporter = AnalyticsReporter::new(sink);
    let (outbound_tx, pump) = lib::channel::spawn_outbound_pump(Arc::new(StdoutSurface));
    let (host_tx, mut host_rx) = mpsc::channel(8);
    let book_name = resolved
        .base_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("book")
        .to_string();
    let session = lib::session::ReaderSession::new(book_name);
    let handle = lib::bridge::start_session(session, reporter, outbound_tx, host_tx);

    // Blocking stdin reader thread; lines are wire messages from the "player".
    let (line_tx, mut line_rx) = mpsc::channel::<String>(8);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            line = line_rx.recv() => match line {
                Some(line) if !line.trim().is_empty() => {
                    if let Err(e) = handle.deliver_wire(line).await {
                        log::warn!("deliver failed: {}", e);
                        break;
                    }
                }
                Some(_) => {}
                // EOF: the shell is going away for good.
                None => break,
            },
            event = host_rx.recv() => match event {
                Some(HostEvent::CloseRequested) => {
                    println!("(player asked to close)");
                    break;
                }
                Some(HostEvent::ReplaceBook(path)) => {
                    println!("(handoff to {})", path.display());
                    break;
                }
                None => break,
            },
        }
    }

    if let Err(e) = handle.signal(LifecycleSignal::Terminated).await {
        log::warn!("terminate failed: {}", e);
    }
    handle.join().await;
    let _ = pump.await;
    Ok(())
}
