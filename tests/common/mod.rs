//! Shared fakes for the integration tests: a tunnel server on loopback and
//! a platform whose device and network configurator record every call.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outernet::client::{ClientConfig, ClientConfigBuilder};
use outernet::core::{
    DeviceError, IDENTIFICATION_SIZE, Ipv4Setup, NetworkConfigurator, NetworkError, Platform,
    TunDevice,
};
use outernet::crypto::CipherBox;
use outernet::transport::{ipv4_to_wire, parse_header, Header};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub const SECRET: &str = "correct horse battery staple";
pub const USERNAME: &str = "alice";
pub const TUNNEL_ADDR: Ipv4Addr = Ipv4Addr::new(10, 8, 0, 1);
pub const PEER_ADDR: Ipv4Addr = Ipv4Addr::new(10, 8, 0, 2);

/// How the fake server treats handshakes.
#[derive(Debug, Clone, Copy)]
pub enum ServerMode {
    /// Answer with [`TUNNEL_ADDR`] / [`PEER_ADDR`] and echo data frames.
    Answer,
    /// Count handshakes, never reply.
    Silent,
}

/// A tunnel server on 127.0.0.1.
pub struct FakeServer {
    pub addr: SocketAddrV4,
    pub handshakes: Arc<AtomicUsize>,
    pub data_frames: Arc<AtomicUsize>,
    pub identifications: Arc<Mutex<Vec<[u8; IDENTIFICATION_SIZE]>>>,
    task: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start(secret: &str, mode: ServerMode) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(addr) = socket.local_addr().unwrap() else {
            unreachable!("bound to an IPv4 address");
        };
        let cipher = CipherBox::new(secret);
        let handshakes = Arc::new(AtomicUsize::new(0));
        let data_frames = Arc::new(AtomicUsize::new(0));
        let identifications = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let handshakes = handshakes.clone();
            let data_frames = data_frames.clone();
            let identifications = identifications.clone();
            async move {
                let mut buf = [0u8; 2048];
                loop {
                    let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                        break;
                    };
                    let Ok(frame) = cipher.decrypt(&buf[..len]) else {
                        continue;
                    };
                    let parsed = parse_header(&frame);
                    let reply = match parsed.header {
                        Some(Header::ClientHandshake { identification }) => {
                            handshakes.fetch_add(1, Ordering::SeqCst);
                            identifications
                                .lock()
                                .unwrap()
                                .push(*identification.as_bytes());
                            match mode {
                                ServerMode::Answer => Header::ServerHandshake {
                                    tunnel_addr: ipv4_to_wire(TUNNEL_ADDR),
                                    peer_addr: ipv4_to_wire(PEER_ADDR),
                                }
                                .to_bytes(),
                                ServerMode::Silent => continue,
                            }
                        }
                        Some(Header::ClientData { .. }) => {
                            data_frames.fetch_add(1, Ordering::SeqCst);
                            let mut reply = Header::ServerData.to_bytes();
                            reply.insert_back(&frame[parsed.consumed..]);
                            reply
                        }
                        _ => continue,
                    };
                    let sealed = cipher.encrypt(&reply);
                    let _ = socket.send_to(&sealed, from).await;
                }
            }
        });

        Self {
            addr,
            handshakes,
            data_frames,
            identifications,
            task,
        }
    }

    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfigBuilder::new()
            .server(self.addr.ip().to_string(), self.addr.port())
            .username(USERNAME)
            .secret(SECRET)
            .build()
    }

    /// Config with a short handshake interval so give-up tests stay fast.
    pub fn fast_config(&self) -> ClientConfig {
        let mut config = self.config();
        config.handshake_interval = Duration::from_millis(40);
        config
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Switches that make individual collaborator calls fail.
#[derive(Debug, Default)]
pub struct Failures {
    pub device_init: AtomicBool,
    pub device_session: AtomicBool,
    pub device_read: AtomicBool,
    pub network_init: AtomicBool,
    pub add_route: AtomicBool,
}

pub type CallLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CallLog, call: &str) {
    log.lock().unwrap().push(call.to_string());
}

/// In-memory TUN device.
pub struct FakeDevice {
    log: CallLog,
    failures: Arc<Failures>,
    session: AtomicBool,
    outbound: Mutex<VecDeque<Vec<u8>>>,
    pub written: Mutex<Vec<Vec<u8>>>,
}

impl FakeDevice {
    pub fn new(log: CallLog, failures: Arc<Failures>) -> Self {
        Self {
            log,
            failures,
            session: AtomicBool::new(false),
            outbound: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn standalone() -> Self {
        Self::new(CallLog::default(), Arc::default())
    }

    pub fn failures(&self) -> &Failures {
        &self.failures
    }

    /// Queue a packet for the session to read.
    pub fn push_outbound(&self, packet: &[u8]) {
        self.outbound.lock().unwrap().push_back(packet.to_vec());
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }
}

impl TunDevice for FakeDevice {
    fn init(&self) -> Result<(), DeviceError> {
        record(&self.log, "tun.init");
        if self.failures.device_init.load(Ordering::SeqCst) {
            return Err(DeviceError::Failed("no adapter".into()));
        }
        Ok(())
    }

    fn start_session(&self) -> Result<(), DeviceError> {
        record(&self.log, "tun.start_session");
        if self.failures.device_session.load(Ordering::SeqCst) {
            return Err(DeviceError::Failed("ring setup".into()));
        }
        self.session.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close_session(&self) -> Result<(), DeviceError> {
        record(&self.log, "tun.close_session");
        self.session.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn uninit(&self) -> Result<(), DeviceError> {
        record(&self.log, "tun.uninit");
        Ok(())
    }

    fn read_packet(&self) -> Result<Option<Vec<u8>>, DeviceError> {
        if !self.session.load(Ordering::SeqCst) {
            return Err(DeviceError::NotReady);
        }
        if self.failures.device_read.load(Ordering::SeqCst) {
            return Err(DeviceError::Failed("read".into()));
        }
        Ok(self.outbound.lock().unwrap().pop_front())
    }

    fn write_packet(&self, packet: &[u8]) -> Result<(), DeviceError> {
        if !self.session.load(Ordering::SeqCst) {
            return Err(DeviceError::NotReady);
        }
        self.written.lock().unwrap().push(packet.to_vec());
        Ok(())
    }
}

/// Network configurator that only records.
pub struct FakeNetwork {
    log: CallLog,
    failures: Arc<Failures>,
    pub setups: Arc<Mutex<Vec<Ipv4Setup>>>,
}

impl NetworkConfigurator for FakeNetwork {
    fn init_network_ipv4(&mut self, setup: &Ipv4Setup) -> Result<(), NetworkError> {
        record(&self.log, "net.init_network_ipv4");
        self.setups.lock().unwrap().push(*setup);
        if self.failures.network_init.load(Ordering::SeqCst) {
            return Err(NetworkError::CommandFailed("netsh".into()));
        }
        Ok(())
    }

    fn uninit_network(&mut self) -> Result<(), NetworkError> {
        record(&self.log, "net.uninit_network");
        Ok(())
    }

    fn add_route(&mut self, ip: Ipv4Addr, prefix: u8) -> Result<(), NetworkError> {
        record(&self.log, &format!("net.add_route {ip}/{prefix}"));
        if self.failures.add_route.load(Ordering::SeqCst) {
            return Err(NetworkError::CommandFailed("route add".into()));
        }
        Ok(())
    }

    fn del_route(&mut self, ip: Ipv4Addr, prefix: u8) -> Result<(), NetworkError> {
        record(&self.log, &format!("net.del_route {ip}/{prefix}"));
        Ok(())
    }
}

/// Platform handing out recording fakes.
#[derive(Default)]
pub struct FakePlatform {
    pub log: CallLog,
    pub failures: Arc<Failures>,
    pub setups: Arc<Mutex<Vec<Ipv4Setup>>>,
}

impl FakePlatform {
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

impl Platform for FakePlatform {
    fn tun_device(&self) -> Arc<dyn TunDevice> {
        Arc::new(FakeDevice::new(self.log.clone(), self.failures.clone()))
    }

    fn network_configurator(&self) -> Box<dyn NetworkConfigurator> {
        Box::new(FakeNetwork {
            log: self.log.clone(),
            failures: self.failures.clone(),
            setups: self.setups.clone(),
        })
    }
}

/// Poll `condition` until it holds, panicking after `timeout`.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Await `fut`, panicking after `timeout`.
pub async fn within<T>(timeout: Duration, fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(timeout, fut)
        .await
        .expect("timed out")
}
