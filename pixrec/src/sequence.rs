//! Connectivity check: numbered text messages instead of an image.
//!
//! The sender emits `<0>`, `<1>`, … `<n-1>`. Over TCP the messages are
//! written back-to-back and the receiver logs whatever each read returns,
//! so several messages may show up as one chunk. Over UDP each message is
//! its own datagram.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, info};

use pixrec_core::{CancellationToken, DatagramChannel, PixrecError};

use crate::config::{Mode, PixrecConfig};
use crate::service::{BoxError, resolve};

/// Text of the `index`-th message.
pub fn message(index: u32) -> String {
    format!("<{index}>")
}

/// Send `count` numbered messages to the configured peer.
///
/// Returns the number of bytes sent.
pub async fn run_seq_send(config: &PixrecConfig, count: u32) -> Result<u64, BoxError> {
    let peer = resolve(&config.network.interface, config.network.port).await?;
    let mut bytes = 0u64;

    match config.network.mode {
        Mode::Tcp => {
            let mut stream = TcpStream::connect(peer).await?;
            info!("connected {} → {peer} (tcp)", stream.local_addr()?);
            for i in 0..count {
                let msg = message(i);
                stream.write_all(msg.as_bytes()).await?;
                bytes += msg.len() as u64;
            }
            stream.shutdown().await?;
        }
        Mode::Udp => {
            let bind = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
            let socket = UdpSocket::bind(bind).await?;
            info!("sending from {} → {peer} (udp)", socket.local_addr()?);
            for i in 0..count {
                let msg = message(i);
                let sent = socket.send_datagram(msg.as_bytes(), peer).await?;
                if sent != msg.len() {
                    return Err(PixrecError::ShortSend {
                        expected: msg.len(),
                        actual: sent,
                    }
                    .into());
                }
                bytes += sent as u64;
            }
        }
    }

    info!("sent {count} messages ({bytes} bytes)");
    Ok(bytes)
}

/// Bind on the configured address and log incoming messages.
pub async fn run_seq_receive(
    config: &PixrecConfig,
    cancel: &CancellationToken,
) -> Result<Vec<String>, BoxError> {
    let addr = resolve(&config.network.interface, config.network.port).await?;
    let buffer = config.transfer.datagram_buffer.max(1);

    let received = match config.network.mode {
        Mode::Tcp => {
            let listener = TcpListener::bind(addr).await?;
            info!("listening on {} (tcp)", listener.local_addr()?);
            serve_seq_tcp(listener, buffer, cancel).await?
        }
        Mode::Udp => {
            let socket = UdpSocket::bind(addr).await?;
            info!("bound on {} (udp)", socket.local_addr()?);
            let idle = config.to_receiver_config().idle_timeout;
            serve_seq_udp(&socket, buffer, idle, cancel).await?
        }
    };

    info!("received {} chunks", received.len());
    Ok(received)
}

/// Accept one connection and collect every chunk read until the peer closes.
pub async fn serve_seq_tcp(
    listener: TcpListener,
    buffer: usize,
    cancel: &CancellationToken,
) -> Result<Vec<String>, PixrecError> {
    let (mut stream, peer) = tokio::select! {
        accepted = listener.accept() => accepted?,
        _ = cancel.cancelled() => return Err(PixrecError::Cancelled),
    };
    info!("accepted connection from {peer}");

    let mut buf = vec![0u8; buffer];
    let mut chunks = Vec::new();
    loop {
        let n = tokio::select! {
            read = stream.read(&mut buf) => read?,
            _ = cancel.cancelled() => break,
        };
        if n == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
        info!("received {text:?}");
        chunks.push(text);
    }
    Ok(chunks)
}

/// Collect datagrams until cancelled or until `idle` passes with nothing new.
///
/// UDP has no end-of-transfer marker here, so both are a normal finish.
pub async fn serve_seq_udp(
    socket: &UdpSocket,
    buffer: usize,
    idle: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<Vec<String>, PixrecError> {
    let mut buf = vec![0u8; buffer];
    let mut messages = Vec::new();
    loop {
        let recv = async {
            match idle {
                Some(limit) => tokio::time::timeout(limit, socket.recv_datagram(&mut buf))
                    .await
                    .ok(),
                None => Some(socket.recv_datagram(&mut buf).await),
            }
        };
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = recv => next,
        };
        let Some(result) = next else {
            debug!("sequence receive finished");
            break;
        };

        let (n, source) = result?;
        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
        info!(%source, "received {text:?}");
        messages.push(text);
    }
    Ok(messages)
}
