use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, info, warn};

use crate::{
    buffer::{marker_buffer, MarkerReader, MarkerWriter},
    Decoder, ListenerError, Result, DEFAULT_PREFIX,
};

/// Port the motion-capture bridge sends to.
pub const DEFAULT_PORT: u16 = 5005;

/// Largest UDP payload. A smaller buffer would let `recv_from` cut a
/// datagram short and hand the decoder a truncated but parsable message.
const MAX_DATAGRAM_SIZE: usize = 65536;

const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Configuration for the telemetry listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Local address to bind, all interfaces by default
    pub bind_addr: IpAddr,
    /// UDP port to bind, 0 picks an ephemeral port
    pub port: u16,
    /// Prefix every marker message starts with
    pub prefix: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Counters kept by the receive loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Datagrams received, valid or not
    pub received: u64,
    /// Datagrams decoded and written to the buffer
    pub decoded: u64,
    /// Datagrams dropped by the decoder
    pub decode_errors: u64,
    /// Decoded messages whose label differs from the slot they were written to
    pub label_mismatches: u64,
    /// Receive calls that failed for a reason other than shutdown
    pub receive_errors: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    received: AtomicU64,
    decoded: AtomicU64,
    decode_errors: AtomicU64,
    label_mismatches: AtomicU64,
    receive_errors: AtomicU64,
}

impl StatCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> ListenerStats {
        ListenerStats {
            received: self.received.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            label_mismatches: self.label_mismatches.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
        }
    }
}

/// UDP socket that can be closed from another thread while a receive is
/// blocked on it.
///
/// Closing marks the socket closed and sends it an empty datagram; the
/// blocked receive returns, sees the mark and reports `SocketClosed`.
#[derive(Debug)]
struct TelemetrySocket {
    socket: UdpSocket,
    local_addr: SocketAddr,
    closed: AtomicBool,
}

impl TelemetrySocket {
    fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_broadcast(true)?;
        let local_addr = socket.local_addr()?;
        Ok(Self {
            socket,
            local_addr,
            closed: AtomicBool::new(false),
        })
    }

    /// Block until a datagram arrives or the socket is closed.
    fn recv<'b>(&self, buf: &'b mut [u8]) -> Result<&'b [u8]> {
        let received = self.socket.recv_from(buf);
        if self.closed.load(Ordering::Acquire) {
            return Err(ListenerError::SocketClosed);
        }
        let (len, _source) = received?;
        Ok(&buf[..len])
    }

    /// Mark the socket closed and wake any pending receive.
    ///
    /// Safe to call again after a failure: every call sends a fresh wake.
    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        let target = self.wake_addr();
        let waker = match target {
            SocketAddr::V4(_) => UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?,
            SocketAddr::V6(_) => UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0))?,
        };
        waker.send_to(&[], target)?;
        Ok(())
    }

    fn wake_addr(&self) -> SocketAddr {
        match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => {
                SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.local_addr.port())
            }
            IpAddr::V6(ip) if ip.is_unspecified() => {
                SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), self.local_addr.port())
            }
            _ => self.local_addr,
        }
    }
}

/// Exponential backoff between failed receives.
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current: INITIAL_BACKOFF,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_BACKOFF);
        delay
    }

    fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
    }
}

struct ListenerWorker {
    socket: Arc<TelemetrySocket>,
    decoder: Decoder,
    writer: MarkerWriter,
    stats: Arc<StatCounters>,
}

impl ListenerWorker {
    fn run(mut self) {
        info!("Telemetry listener receiving on {}", self.socket.local_addr);

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut backoff = Backoff::new();
        loop {
            match self.socket.recv(&mut buf) {
                Ok(datagram) => {
                    backoff.reset();
                    self.handle(datagram);
                }
                Err(ListenerError::SocketClosed) => {
                    info!("Telemetry socket closed, listener exiting");
                    return;
                }
                Err(e) => {
                    StatCounters::bump(&self.stats.receive_errors);
                    let delay = backoff.next_delay();
                    error!("Error receiving telemetry: {}, retrying in {:?}", e, delay);
                    thread::sleep(delay);
                }
            }
        }
    }

    fn handle(&mut self, datagram: &[u8]) {
        StatCounters::bump(&self.stats.received);

        let frame = match self.decoder.decode_frame(datagram) {
            Ok(frame) => frame,
            Err(e) => {
                StatCounters::bump(&self.stats.decode_errors);
                warn!(
                    "Dropping datagram {:?}: {}",
                    String::from_utf8_lossy(datagram),
                    e
                );
                return;
            }
        };

        let slot = self.writer.write(frame.sample);
        StatCounters::bump(&self.stats.decoded);

        if let Some(label) = frame.label {
            if label.parse::<u8>().ok() != Some(slot.number()) {
                StatCounters::bump(&self.stats.label_mismatches);
                debug!("Message labelled {:?} written to slot {}", label, slot);
            }
        }

        let s = frame.sample;
        debug!("Marker {} - X: {}, Y: {}, Z: {}", slot, s.x, s.y, s.z);
    }
}

/// Background receiver feeding the marker cycle buffer.
///
/// Started with [`TelemetryListener::start`]; runs until [`stop`](Self::stop)
/// or drop closes its socket.
pub struct TelemetryListener {
    socket: Arc<TelemetrySocket>,
    reader: MarkerReader,
    stats: Arc<StatCounters>,
    worker_thread: Option<JoinHandle<()>>,
}

impl TelemetryListener {
    /// Bind the socket and launch the receive thread.
    ///
    /// Bind failures are returned here; nothing after startup is fatal.
    pub fn start(config: ListenerConfig) -> Result<Self> {
        let socket = Arc::new(TelemetrySocket::bind(config.socket_addr())?);
        let (writer, reader) = marker_buffer();
        let stats = Arc::new(StatCounters::default());

        let worker = ListenerWorker {
            socket: socket.clone(),
            decoder: Decoder::new(config.prefix),
            writer,
            stats: stats.clone(),
        };
        let worker_thread = thread::Builder::new()
            .name("telemetry-listener".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            socket,
            reader,
            stats,
            worker_thread: Some(worker_thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    pub fn reader(&self) -> MarkerReader {
        self.reader.clone()
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats.load()
    }

    pub fn is_running(&self) -> bool {
        self.worker_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Close the socket and wait for the receive thread to exit.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.worker_thread.is_none() {
            return Ok(());
        }
        // keep the handle if close fails so a later stop or drop can retry
        self.socket.close()?;
        match self.worker_thread.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for TelemetryListener {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Failed to stop telemetry listener: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::new();
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        for _ in 0..20 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), MAX_BACKOFF);
        backoff.reset();
        assert_eq!(backoff.next_delay(), INITIAL_BACKOFF);
    }

    #[test]
    fn test_default_config() {
        let config = ListenerConfig::default();
        assert_eq!(config.socket_addr(), "0.0.0.0:5005".parse().unwrap());
        assert_eq!(config.prefix, "Marker Hand");
    }

    #[test]
    fn test_wake_addr_for_unspecified_bind() {
        let socket = TelemetrySocket::bind("0.0.0.0:0".parse().unwrap()).unwrap();
        let wake = socket.wake_addr();
        assert_eq!(wake.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(wake.port(), socket.local_addr.port());
    }

    #[test]
    fn test_close_unblocks_receive() {
        let socket = Arc::new(TelemetrySocket::bind("127.0.0.1:0".parse().unwrap()).unwrap());
        let receiver = socket.clone();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            receiver.recv(&mut buf).map(|datagram| datagram.len())
        });
        // give the thread time to block
        thread::sleep(Duration::from_millis(50));
        socket.close().unwrap();
        let result = handle.join().unwrap();
        assert!(
            matches!(result, Err(ListenerError::SocketClosed)),
            "expected closed socket, got {:?}",
            result
        );
        // closing twice is harmless
        socket.close().unwrap();
    }

    #[test]
    fn test_close_retry_still_wakes_receive() {
        let socket = Arc::new(TelemetrySocket::bind("127.0.0.1:0".parse().unwrap()).unwrap());
        let receiver = socket.clone();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            receiver.recv(&mut buf).map(|datagram| datagram.len())
        });
        thread::sleep(Duration::from_millis(50));

        // an earlier close marked the socket but never got its wake out
        socket.closed.store(true, Ordering::Release);
        socket.close().unwrap();

        let result = handle.join().unwrap();
        assert!(
            matches!(result, Err(ListenerError::SocketClosed)),
            "expected closed socket, got {:?}",
            result
        );
    }
}
