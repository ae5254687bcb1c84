//! Integration tests: full transfers over real localhost TCP and UDP
//! sockets, plus round-trip properties over both framings.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pixrec_core::{
    CancellationToken, DatagramChannel, DatagramSender, PixrecError, RECORD_SIZE,
    ReceiverConfig, Record, Rgb, RgbGrid, encode, encode_bytes, receive_datagrams,
    receive_stream, send_stream,
};
use proptest::prelude::*;
use tokio::net::{TcpListener, TcpStream, UdpSocket};

// ── Helpers ──────────────────────────────────────────────────────

/// The four-color 2×2 image used throughout the protocol docs.
fn four_colors() -> RgbGrid {
    let mut grid = RgbGrid::new(2, 2);
    grid.set(0, 0, Rgb::new(255, 0, 0));
    grid.set(1, 0, Rgb::new(0, 255, 0));
    grid.set(0, 1, Rgb::new(0, 0, 255));
    grid.set(1, 1, Rgb::new(255, 255, 0));
    grid
}

/// Datagram channel that replays a fixed list of payloads.
struct Replay {
    queue: Mutex<VecDeque<Vec<u8>>>,
}

impl Replay {
    fn new(datagrams: Vec<Vec<u8>>) -> Self {
        Self {
            queue: Mutex::new(datagrams.into()),
        }
    }
}

#[async_trait]
impl DatagramChannel for Replay {
    async fn send_datagram(&self, payload: &[u8], _dest: SocketAddr) -> io::Result<usize> {
        Ok(payload.len())
    }

    async fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(d) => {
                let n = d.len().min(buf.len());
                buf[..n].copy_from_slice(&d[..n]);
                Ok((n, "127.0.0.1:1".parse().unwrap()))
            }
            None => std::future::pending().await,
        }
    }
}

fn arb_grid() -> impl Strategy<Value = RgbGrid> {
    (1u32..=64, 1u32..=64).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<[u8; 3]>(), (w * h) as usize).prop_map(move |colors| {
            RgbGrid::from_fn(w, h, |x, y| Rgb::from(colors[(y * w + x) as usize]))
        })
    })
}

// ── Concrete scenario ────────────────────────────────────────────

#[test]
fn four_color_scenario_bytes() {
    let records = encode(&four_colors()).unwrap();
    assert_eq!(records.len(), 6);
    assert_eq!(
        records[0],
        Record::Init {
            width: 2,
            height: 2
        }
    );
    assert_eq!(records[5], Record::End);

    let bytes = encode_bytes(&four_colors()).unwrap();
    assert_eq!(bytes.len(), 6 * RECORD_SIZE);

    let mut builder = tokio_test::io::Builder::new();
    builder.read(&bytes);
    let got = tokio_test::block_on(receive_stream(
        builder.build(),
        &ReceiverConfig::default(),
        &CancellationToken::new(),
    ))
    .unwrap();

    assert_eq!(got.grid.get(0, 0), Some(Rgb::new(255, 0, 0)));
    assert_eq!(got.grid.get(1, 0), Some(Rgb::new(0, 255, 0)));
    assert_eq!(got.grid.get(0, 1), Some(Rgb::new(0, 0, 255)));
    assert_eq!(got.grid.get(1, 1), Some(Rgb::new(255, 255, 0)));
}

// ── TCP ──────────────────────────────────────────────────────────

#[tokio::test]
async fn tcp_transfer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let grid = RgbGrid::from_fn(40, 30, |x, y| Rgb::new(x as u8, y as u8, 7));
    let records = encode(&grid).unwrap();

    let sender = tokio::spawn(async move {
        let stream = TcpStream::connect(addr).await.unwrap();
        send_stream(stream, &records).await
    });

    let (conn, _) = listener.accept().await.unwrap();
    let got = tokio::time::timeout(
        Duration::from_secs(5),
        receive_stream(conn, &ReceiverConfig::default(), &CancellationToken::new()),
    )
    .await
    .expect("timeout")
    .unwrap();

    sender.await.unwrap().unwrap();
    assert_eq!(got.grid, grid);
    assert_eq!(got.stats.records, 40 * 30 + 2);
}

#[tokio::test]
async fn tcp_truncated_transfer_is_framing_error() {
    use tokio::io::AsyncWriteExt;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let bytes = encode_bytes(&four_colors()).unwrap();
    let sender = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(&bytes[..bytes.len() - 4]).await.unwrap();
        stream.shutdown().await.unwrap();
    });

    let (conn, _) = listener.accept().await.unwrap();
    let err = receive_stream(conn, &ReceiverConfig::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    sender.await.unwrap();

    assert!(matches!(err, PixrecError::Framing { len: 8, .. }));
}

// ── UDP ──────────────────────────────────────────────────────────

#[tokio::test]
async fn udp_transfer() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let dest = receiver.local_addr().unwrap();

    let grid = RgbGrid::from_fn(8, 8, |x, y| Rgb::new(0, x as u8 * 30, y as u8 * 30));
    let records = encode(&grid).unwrap();

    let config = ReceiverConfig::default().with_idle_timeout(Duration::from_secs(5));
    let recv = tokio::spawn(async move {
        receive_datagrams(&receiver, &config, &CancellationToken::new()).await
    });

    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut sender = DatagramSender::new(sock, dest).with_pacing(16, Duration::ZERO);
    sender.send_records(&records).await.unwrap();

    let got = recv.await.unwrap().unwrap();
    assert_eq!(got.grid, grid);
    assert_eq!(got.stats.dropped, 0);
}

#[tokio::test]
async fn udp_receiver_survives_garbage() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let dest = receiver.local_addr().unwrap();
    let records = encode(&four_colors()).unwrap();

    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sock.send_to(&records[0].to_bytes(), dest).await.unwrap();
    sock.send_to(b"hello there", dest).await.unwrap();
    sock.send_to(&[0u8; 13], dest).await.unwrap();
    for record in &records[1..] {
        sock.send_to(&record.to_bytes(), dest).await.unwrap();
    }

    let got = receive_datagrams(
        &receiver,
        &ReceiverConfig::default().with_idle_timeout(Duration::from_secs(5)),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(got.grid, four_colors());
    assert_eq!(got.stats.dropped, 2);
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn stream_roundtrip(grid in arb_grid(), chunk in 1usize..200) {
        let bytes = encode_bytes(&grid).unwrap();
        let mut builder = tokio_test::io::Builder::new();
        for piece in bytes.chunks(chunk) {
            builder.read(piece);
        }
        let got = tokio_test::block_on(receive_stream(
            builder.build(),
            &ReceiverConfig::default(),
            &CancellationToken::new(),
        ))
        .unwrap();
        prop_assert_eq!(got.grid, grid);
    }

    #[test]
    fn datagram_roundtrip_any_pixel_order(grid in arb_grid(), seed in any::<u64>()) {
        let mut records = encode(&grid).unwrap();
        prop_assert_eq!(records.len(), grid.len() + 2);

        let end = records.pop().unwrap();
        let mut pixels = records.split_off(1);
        // Deterministic shuffle driven by the seed.
        let mut state = seed | 1;
        for i in (1..pixels.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            pixels.swap(i, (state % (i as u64 + 1)) as usize);
        }
        records.extend(pixels);
        records.push(end);

        let channel = Replay::new(records.iter().map(|r| r.to_bytes().to_vec()).collect());
        let got = tokio_test::block_on(receive_datagrams(
            &channel,
            &ReceiverConfig::default(),
            &CancellationToken::new(),
        ))
        .unwrap();
        prop_assert_eq!(got.grid, grid);
    }
}
