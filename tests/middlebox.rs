//! Middlebox loop against an in-memory capture
//!
//! Topology:
//! ```text
//!   client (10.0.0.1:5000) --> middlebox (h2) --> server (10.0.0.3:6000)
//! ```

use flowsteer::capture::{Capture, RxInfo};
use flowsteer::middlebox::{Denylist, MiddleboxFilter, MiddleboxListener};
use flowsteer::protocol::ethernet::FrameBuilder;
use flowsteer::protocol::ipv4::{Ipv4Builder, Ipv4Header, Protocol};
use flowsteer::protocol::udp::{UdpBuilder, UdpHeader};
use flowsteer::protocol::{EtherType, MacAddr};
use flowsteer::{Error, Result};
use std::collections::VecDeque;
use std::io::Write;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);
const SERVER_PORT: u16 = 6000;

/// Replays queued frames, records transmissions, and cancels the loop once
/// the queue is drained.
struct ReplayCapture {
    queue: VecDeque<(Vec<u8>, bool)>,
    sent: Vec<Vec<u8>>,
    fail_sends: usize,
    drained: CancellationToken,
}

impl ReplayCapture {
    fn new(frames: Vec<Vec<u8>>, drained: CancellationToken) -> Self {
        Self {
            queue: frames.into_iter().map(|f| (f, false)).collect(),
            sent: Vec::new(),
            fail_sends: 0,
            drained,
        }
    }
}

impl Capture for ReplayCapture {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<RxInfo> {
        match self.queue.pop_front() {
            Some((frame, outgoing)) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(RxInfo { len, outgoing })
            }
            None => {
                self.drained.cancel();
                std::future::pending().await
            }
        }
    }

    async fn send(&mut self, buf: &[u8]) -> Result<usize> {
        if self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "network is down",
            )));
        }
        self.sent.push(buf.to_vec());
        Ok(buf.len())
    }
}

fn udp_frame(dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let datagram = UdpBuilder::new()
        .src_port(5000)
        .dst_port(dst_port)
        .payload(payload)
        .build(CLIENT, SERVER);
    let packet = Ipv4Builder::new()
        .ttl(64)
        .protocol(Protocol::Udp as u8)
        .src_addr(CLIENT)
        .dst_addr(SERVER)
        .payload(&datagram)
        .build();
    FrameBuilder::new()
        .dst_mac(MacAddr([0, 0, 0, 0, 0, 3]))
        .src_mac(MacAddr([0, 0, 0, 0, 0, 1]))
        .ethertype(EtherType::Ipv4 as u16)
        .payload(&packet)
        .build()
}

fn filter() -> MiddleboxFilter {
    MiddleboxFilter::new(SERVER_PORT, Denylist::parse("secret, password"))
}

async fn run(capture: ReplayCapture, cancel: CancellationToken) -> (ReplayCapture, Arc<flowsteer::telemetry::MetricsRegistry>) {
    let mut listener = MiddleboxListener::new(capture, filter());
    tokio::time::timeout(Duration::from_secs(5), listener.run(cancel))
        .await
        .expect("listener did not stop")
        .unwrap();
    let metrics = listener.metrics().clone();
    (listener.into_capture(), metrics)
}

#[tokio::test]
async fn test_hello_forwarded_with_ttl_decremented() {
    let cancel = CancellationToken::new();
    let capture = ReplayCapture::new(vec![udp_frame(SERVER_PORT, b"hello")], cancel.clone());

    let (capture, metrics) = run(capture, cancel).await;

    assert_eq!(capture.sent.len(), 1);
    let ip = Ipv4Header::parse(&capture.sent[0][14..]).unwrap();
    assert_eq!(ip.ttl(), 63);
    assert!(ip.validate_checksum());
    assert_eq!(ip.src_addr(), CLIENT);
    assert_eq!(ip.dst_addr(), SERVER);

    let datagram = UdpHeader::parse(ip.payload()).unwrap();
    assert_eq!(datagram.dst_port(), SERVER_PORT);
    assert_eq!(datagram.payload(), b"hello");
    assert!(datagram.validate_checksum(CLIENT, SERVER));

    assert_eq!(metrics.frames_forwarded.get(), 1);
}

#[tokio::test]
async fn test_secret_dropped_without_transmission() {
    let cancel = CancellationToken::new();
    let capture = ReplayCapture::new(
        vec![udp_frame(SERVER_PORT, b"this is secret")],
        cancel.clone(),
    );

    let (capture, metrics) = run(capture, cancel).await;

    assert!(capture.sent.is_empty());
    assert_eq!(metrics.frames_blocked.get(), 1);
}

#[tokio::test]
async fn test_empty_payload_always_forwarded() {
    let cancel = CancellationToken::new();
    let capture = ReplayCapture::new(vec![udp_frame(SERVER_PORT, b"")], cancel.clone());

    let (capture, _) = run(capture, cancel).await;

    assert_eq!(capture.sent.len(), 1);
    let ip = Ipv4Header::parse(&capture.sent[0][14..]).unwrap();
    assert_eq!(ip.ttl(), 63);
    assert!(UdpHeader::parse(ip.payload()).unwrap().payload().is_empty());
}

#[tokio::test]
async fn test_mixed_traffic() {
    let cancel = CancellationToken::new();
    let capture = ReplayCapture::new(
        vec![
            udp_frame(SERVER_PORT, b"first"),
            udp_frame(53, b"secret dns"),
            udp_frame(SERVER_PORT, b"my PASSWORD is hunter2"),
            vec![0xff; 10],
            udp_frame(SERVER_PORT, b"second"),
        ],
        cancel.clone(),
    );

    let (capture, metrics) = run(capture, cancel).await;

    let payloads: Vec<Vec<u8>> = capture
        .sent
        .iter()
        .map(|frame| {
            let ip = Ipv4Header::parse(&frame[14..]).unwrap();
            UdpHeader::parse(ip.payload()).unwrap().payload().to_vec()
        })
        .collect();
    assert_eq!(payloads, vec![b"first".to_vec(), b"second".to_vec()]);
    assert_eq!(metrics.frames_received.get(), 5);
    assert_eq!(metrics.frames_ignored.get(), 2);
    assert_eq!(metrics.frames_blocked.get(), 1);
    assert_eq!(metrics.frames_forwarded.get(), 2);
}

#[tokio::test]
async fn test_transmit_error_does_not_stop_loop() {
    let cancel = CancellationToken::new();
    let mut capture = ReplayCapture::new(
        vec![udp_frame(SERVER_PORT, b"one"), udp_frame(SERVER_PORT, b"two")],
        cancel.clone(),
    );
    capture.fail_sends = 1;

    let (capture, metrics) = run(capture, cancel).await;

    assert_eq!(capture.sent.len(), 1);
    assert_eq!(metrics.tx_errors.get(), 1);
    assert_eq!(metrics.frames_forwarded.get(), 1);
}

#[tokio::test]
async fn test_own_transmissions_skipped() {
    let cancel = CancellationToken::new();
    let mut capture = ReplayCapture::new(vec![], cancel.clone());
    capture
        .queue
        .push_back((udp_frame(SERVER_PORT, b"looped back"), true));

    let (capture, metrics) = run(capture, cancel).await;

    assert!(capture.sent.is_empty());
    assert_eq!(metrics.frames_received.get(), 0);
}

#[tokio::test]
async fn test_cancelled_before_first_receive() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let capture = ReplayCapture::new(vec![udp_frame(SERVER_PORT, b"hello")], cancel.clone());

    let (capture, _) = run(capture, cancel).await;

    assert_eq!(capture.queue.len(), 1);
    assert!(capture.sent.is_empty());
}

#[tokio::test]
async fn test_denylist_file_drives_filter() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"classified\n").unwrap();

    let cancel = CancellationToken::new();
    let capture = ReplayCapture::new(
        vec![
            udp_frame(SERVER_PORT, b"Classified report"),
            udp_frame(SERVER_PORT, b"this is secret"),
        ],
        cancel.clone(),
    );
    let filter = MiddleboxFilter::new(SERVER_PORT, Denylist::load(file.path()));
    let mut listener = MiddleboxListener::new(capture, filter);
    listener.run(cancel).await.unwrap();

    // "secret" is not in this denylist
    let capture = listener.into_capture();
    assert_eq!(capture.sent.len(), 1);
}
