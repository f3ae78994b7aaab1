//! Remote device client.
//!
//! Persistent TCP stream carrying newline-terminated ASCII commands. Lines
//! coming back from the peer are decoded lossily, logged and otherwise
//! ignored. There is no
//! acknowledgement, retry or reconnect: losing the stream simply leaves the
//! client disconnected.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not connected to device")]
    NotConnected,

    #[error("unknown device command `{0}`")]
    UnknownCommand(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    FeedPet,
    ToggleLight,
}

impl DeviceCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeedPet => "FEED_PET",
            Self::ToggleLight => "TOGGLE_LIGHT",
        }
    }

    /// Bytes as they go on the wire, terminator included.
    pub fn wire(&self) -> String {
        format!("{}\n", self.as_str())
    }
}

impl FromStr for DeviceCommand {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "FEED_PET" => Ok(Self::FeedPet),
            "TOGGLE_LIGHT" => Ok(Self::ToggleLight),
            _ => Err(DeviceError::UnknownCommand(s.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct DeviceClient {
    stream: TcpStream,
    connected: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl DeviceClient {
    /// Connect and spawn the background receive loop.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, DeviceError> {
        let stream = TcpStream::connect(addr)?;
        let peer = stream.peer_addr()?;
        info!("connected to device at {}", peer);

        let connected = Arc::new(AtomicBool::new(true));
        let reader = stream.try_clone()?;
        let flag = Arc::clone(&connected);
        let receiver = thread::Builder::new()
            .name("device-rx".into())
            .spawn(move || receive_loop(reader, flag))?;

        Ok(Self {
            stream,
            connected,
            receiver: Some(receiver),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn send(&mut self, command: DeviceCommand) -> Result<(), DeviceError> {
        if !self.is_connected() {
            return Err(DeviceError::NotConnected);
        }

        let result = self
            .stream
            .write_all(command.wire().as_bytes())
            .and_then(|_| self.stream.flush());

        match result {
            Ok(()) => {
                info!("sent {}", command.as_str());
                Ok(())
            }
            Err(e) => {
                warn!("send failed, marking device disconnected: {}", e);
                self.connected.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Shut the stream down and wait for the receive loop to finish.
    pub fn close(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("shutdown: {}", e);
        }
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                warn!("device receive thread panicked");
            }
        }
    }
}

impl Drop for DeviceClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn receive_loop(stream: TcpStream, connected: Arc<AtomicBool>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                info!("device says: {}", text.trim());
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                if connected.load(Ordering::SeqCst) {
                    warn!("device receive error: {}", e);
                }
                break;
            }
        }
    }
    if connected.swap(false, Ordering::SeqCst) {
        info!("device disconnected");
    }
}
