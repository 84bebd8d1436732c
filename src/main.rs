//! Binary entrypoint for the Relay BBS CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the data directory
//! - `status` - print node identity, peers and content counts
//! - `start` - run the BBS over the line-framed stdin/stdout transport
//! - `console --node <id>` - talk to the menus as a single user
//! - `apply <file|->` - replay sync records as if a peer had sent them
//!
//! See the library crate docs for module-level details: `relaybbs::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use relaybbs::bbs::ingress::format_frame;
use relaybbs::bbs::BbsServer;
use relaybbs::config::{parse_node_id, Config};
use relaybbs::metrics;
use relaybbs::storage::Storage;

#[derive(Parser)]
#[command(name = "relaybbs")]
#[command(about = "A store-and-forward BBS for mesh radio networks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new BBS configuration
    Init,
    /// Show BBS status and statistics
    Status,
    /// Start the BBS, reading `from<TAB>to<TAB>text` frames on stdin
    Start,
    /// Interactive console session as one node
    Console {
        /// Node id to speak as (!hex, 0x hex or decimal)
        #[arg(short, long, default_value = "!00000001")]
        node: String,
    },
    /// Apply sync records from a file ("-" for stdin)
    Apply {
        /// Input path
        input: String,
        /// Peer the records are attributed to (defaults to the first configured peer)
        #[arg(short, long)]
        peer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new BBS configuration");
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        let cfg = Config::load(&cli.config).await?;
        Storage::new(&cfg.storage.data_dir).await?;
        info!("Initialized data directory {}", cfg.storage.data_dir);
        return Ok(());
    }

    let config = match Config::load(&cli.config).await {
        Ok(c) => c,
        Err(e) => {
            init_logging(&None, cli.verbose);
            return Err(anyhow!("{} (run `relaybbs init` first?)", e));
        }
    };
    init_logging(&Some(config.clone()), cli.verbose);

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Status => {
            let bbs = BbsServer::new(config).await?;
            bbs.show_status().await?;
        }
        Commands::Start => {
            info!("Starting Relay BBS v{}", env!("CARGO_PKG_VERSION"));
            let mut bbs = BbsServer::new(config).await?;
            let (tx, mut rx) = mpsc::unbounded_channel();
            bbs.attach_outgoing(tx);
            let printer = tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    println!("{}", format_frame(&msg));
                }
            });
            let stdin = BufReader::new(tokio::io::stdin());
            bbs.run(stdin).await?;
            drop(bbs);
            let _ = printer.await;
        }
        Commands::Console { node } => {
            let node_id = parse_node_id(&node).ok_or_else(|| anyhow!("Invalid node id '{}'", node))?;
            let mut bbs = BbsServer::new(config).await?;
            println!("Console session as {}. Ctrl+D to quit.", node);
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                bbs.handle_direct(node_id, &line).await?;
                for (to, text) in bbs.take_test_messages() {
                    if to == node || parse_node_id(&to) == Some(node_id) {
                        println!("{}\n", text);
                    } else {
                        println!("[-> {}] {}\n", to, text);
                    }
                }
            }
        }
        Commands::Apply { input, peer } => {
            let peer_id = match peer {
                Some(p) => parse_node_id(&p).ok_or_else(|| anyhow!("Invalid peer id '{}'", p))?,
                None => match config.peer_ids().first() {
                    Some(id) => *id,
                    None => {
                        warn!("No peers configured; attributing records to !00000000");
                        0
                    }
                },
            };
            let content = if input == "-" {
                let mut buf = String::new();
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Some(line) = lines.next_line().await? {
                    buf.push_str(&line);
                    buf.push('\n');
                }
                buf
            } else {
                tokio::fs::read_to_string(&input)
                    .await
                    .map_err(|e| anyhow!("Failed to read {}: {}", input, e))?
            };
            let mut bbs = BbsServer::new(config).await?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                bbs.handle_sync(peer_id, line).await?;
            }
            for (to, text) in bbs.take_test_messages() {
                println!("[-> {}] {}", to, text);
            }
            let snap = metrics::snapshot();
            println!(
                "applied={} duplicate={} absent={} dropped={}",
                snap.sync_applied, snap.sync_duplicate, snap.sync_absent, snap.sync_dropped
            );
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let config_level = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    // CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config_level,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let file = config.as_ref().and_then(|c| c.logging.file.clone());
    let opened = file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match opened {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // stdout carries frames in `start`; console echo goes to stderr only when interactive
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    builder.target(env_logger::Target::Stderr);
    let _ = builder.try_init();
}
