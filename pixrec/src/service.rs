//! Send and receive sessions.
//!
//! Owns everything the protocol core leaves to its caller: address
//! resolution, socket setup, image files and persisting the result.
//! The image is only written once the receiver reached `END`.

use std::error::Error;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream, UdpSocket, lookup_host};
use tracing::{info, warn};

use pixrec_core::{
    CancellationToken, DatagramSender, PixrecError, ReceivedImage, Record, encode,
    receive_datagrams, receive_stream, send_stream,
};

use crate::config::{Mode, PixrecConfig};
use crate::imaging::{self, ImageSource};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Outcome of a send session.
#[derive(Debug, Clone, Copy)]
pub struct SendReport {
    pub records: usize,
    pub bytes: u64,
}

/// Resolve `host:port` to the first matching socket address.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, BoxError> {
    lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| format!("could not resolve {host}:{port}").into())
}

// ── Send ─────────────────────────────────────────────────────────

/// Load the configured input image and send it to the configured peer.
pub async fn run_send(config: &PixrecConfig) -> Result<SendReport, BoxError> {
    let path = &config.transfer.input_file;
    let source = ImageSource::open(path)
        .map_err(|e| format!("cannot load {}: {e}", path.display()))?;

    // Encode fully before touching the network so a bad image sends nothing.
    let records = encode(&source)?;
    info!("loaded {} ({} records)", path.display(), records.len());

    let peer = resolve(&config.network.interface, config.network.port).await?;
    send_records(config, peer, &records).await
}

/// Send an already-encoded record sequence to `peer`.
pub async fn send_records(
    config: &PixrecConfig,
    peer: SocketAddr,
    records: &[Record],
) -> Result<SendReport, BoxError> {
    let bytes = match config.network.mode {
        Mode::Tcp => {
            let stream = TcpStream::connect(peer).await?;
            stream.set_nodelay(true)?;
            info!("connected {} → {peer} (tcp)", stream.local_addr()?);
            send_stream(stream, records).await?
        }
        Mode::Udp => {
            let bind: SocketAddr = if peer.is_ipv4() {
                "0.0.0.0:0".parse()?
            } else {
                "[::]:0".parse()?
            };
            let socket = UdpSocket::bind(bind).await?;
            info!("sending from {} → {peer} (udp)", socket.local_addr()?);

            let mut sender = DatagramSender::new(socket, peer);
            if let Some((every, pause)) = config.pacing() {
                sender = sender.with_pacing(every, pause);
            }
            sender.send_records(records).await?
        }
    };

    info!("sent {} records ({bytes} bytes)", records.len());
    Ok(SendReport {
        records: records.len(),
        bytes,
    })
}

// ── Receive ──────────────────────────────────────────────────────

/// Bind on the configured address, receive one image and save it.
pub async fn run_receive(
    config: &PixrecConfig,
    cancel: &CancellationToken,
) -> Result<ReceivedImage, BoxError> {
    let addr = resolve(&config.network.interface, config.network.port).await?;

    let received = match config.network.mode {
        Mode::Tcp => {
            let listener = TcpListener::bind(addr).await?;
            info!("listening on {} (tcp)", listener.local_addr()?);
            serve_tcp(listener, config, cancel).await?
        }
        Mode::Udp => {
            let socket = UdpSocket::bind(addr).await?;
            info!("bound on {} (udp)", socket.local_addr()?);
            serve_udp(&socket, config, cancel).await?
        }
    };

    persist(&received, config)?;
    Ok(received)
}

/// Accept exactly one connection on `listener` and receive an image from it.
pub async fn serve_tcp(
    listener: TcpListener,
    config: &PixrecConfig,
    cancel: &CancellationToken,
) -> Result<ReceivedImage, PixrecError> {
    let (stream, peer) = tokio::select! {
        accepted = listener.accept() => accepted?,
        _ = cancel.cancelled() => return Err(PixrecError::Cancelled),
    };
    info!("accepted connection from {peer}");
    drop(listener);

    let received = receive_stream(stream, &config.to_receiver_config(), cancel).await?;
    log_received(&received);
    Ok(received)
}

/// Receive an image from datagrams arriving on `socket`.
pub async fn serve_udp(
    socket: &UdpSocket,
    config: &PixrecConfig,
    cancel: &CancellationToken,
) -> Result<ReceivedImage, PixrecError> {
    let received = receive_datagrams(socket, &config.to_receiver_config(), cancel).await?;
    if received.stats.dropped > 0 {
        warn!("{} malformed datagrams dropped", received.stats.dropped);
    }
    log_received(&received);
    Ok(received)
}

/// Write the completed image to the configured output file.
pub fn persist(received: &ReceivedImage, config: &PixrecConfig) -> Result<(), BoxError> {
    let path = &config.transfer.output_file;
    imaging::save(&received.grid, path)
        .map_err(|e| format!("cannot save {}: {e}", path.display()))?;
    info!("saved {}", path.display());
    Ok(())
}

fn log_received(received: &ReceivedImage) {
    let stats = &received.stats;
    info!(
        "received {}x{} image: {} records, {} bytes in {:?}",
        received.grid.width(),
        received.grid.height(),
        stats.records,
        stats.bytes,
        stats.elapsed,
    );
    if stats.reconstruct.skipped > 0 {
        warn!("{} out-of-range pixels skipped", stats.reconstruct.skipped);
    }
}

// ── Tests ────────────────────────────────────────────────────────
