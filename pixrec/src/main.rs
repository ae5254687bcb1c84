//! pixrec entry point.
//!
//! ```text
//! pixrec send [-m tcp|udp] [-i host] [-p port] [-f in.png]    Send an image
//! pixrec recv [-m tcp|udp] [-i host] [-p port] [-f out.png]   Receive and save an image
//! pixrec seq send [-m tcp|udp] [-i host] [-p port] [-n 10]     Send numbered text messages
//! pixrec seq recv [-m tcp|udp] [-i host] [-p port]             Log incoming text messages
//! pixrec --config <path> ...                                   Load a custom config TOML
//! pixrec --gen-config                                          Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pixrec::config::{Mode, PixrecConfig};
use pixrec::{sequence, service};
use pixrec_core::CancellationToken;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pixrec", version, about = "Send or receive an image as fixed-size records over TCP or UDP")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, global = true, default_value = "pixrec.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send an image to a receiver.
    Send(Endpoint),
    /// Wait for one image and save it.
    Recv(Endpoint),
    /// Exchange numbered text messages to check connectivity.
    Seq {
        #[command(subcommand)]
        action: SeqCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SeqCommand {
    /// Send `<0>` .. `<n-1>` to a receiver.
    Send {
        #[command(flatten)]
        peer: Peer,

        /// Number of messages.
        #[arg(short = 'n', default_value_t = 10)]
        count: u32,
    },
    /// Log messages until the peer closes (tcp), the idle timeout fires or Ctrl-C.
    Recv(Peer),
}

/// Network overrides of the config file.
#[derive(Args, Debug)]
struct Peer {
    /// Transport.
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Host to connect to (send) or bind on (recv).
    #[arg(short, long)]
    interface: Option<String>,

    /// Port to connect to (send) or bind on (recv).
    #[arg(short, long)]
    port: Option<u16>,
}

impl Peer {
    fn apply(self, config: &mut PixrecConfig) {
        if let Some(mode) = self.mode {
            config.network.mode = mode;
        }
        if let Some(interface) = self.interface {
            config.network.interface = interface;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
    }
}

/// Per-invocation overrides for an image transfer.
#[derive(Args, Debug)]
struct Endpoint {
    #[command(flatten)]
    peer: Peer,

    /// Image to read (send) or write (recv).
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl Endpoint {
    fn apply(self, config: &mut PixrecConfig, sending: bool) {
        self.peer.apply(config);
        if let Some(file) = self.file {
            if sending {
                config.transfer.input_file = file;
            } else {
                config.transfer.output_file = file;
            }
        }
    }
}

/// Cancel the returned token on Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, cancelling");
        ctrl_c.cancel();
    });
    cancel
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&PixrecConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let Some(command) = cli.command else {
        eprintln!("nothing to do: use `pixrec send`, `pixrec recv`, `pixrec seq` or `--gen-config`");
        std::process::exit(2);
    };

    let mut config = PixrecConfig::load(&cli.config)
        .map_err(|e| format!("invalid config {}: {e}", cli.config.display()))?;

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("pixrec v{}", env!("CARGO_PKG_VERSION"));

    match command {
        Command::Send(endpoint) => {
            endpoint.apply(&mut config, true);
            info!(
                "sending {} to {}:{} over {}",
                config.transfer.input_file.display(),
                config.network.interface,
                config.network.port,
                config.network.mode,
            );
            service::run_send(&config).await?;
        }
        Command::Recv(endpoint) => {
            endpoint.apply(&mut config, false);
            if let Err(e) = service::run_receive(&config, &ctrl_c_token()).await {
                error!("receive failed: {e}");
                return Err(e);
            }
        }
        Command::Seq { action } => match action {
            SeqCommand::Send { peer, count } => {
                peer.apply(&mut config);
                sequence::run_seq_send(&config, count).await?;
            }
            SeqCommand::Recv(peer) => {
                peer.apply(&mut config);
                sequence::run_seq_receive(&config, &ctrl_c_token()).await?;
            }
        },
    }

    Ok(())
}
