//! Transport dialer
//!
//! Adapters are reachable over a serial TTY (USB or Bluetooth-SPP devices)
//! or a TCP socket (WiFi dongles). Both are plain byte streams; everything
//! above this module is transport-agnostic.
//!
//! URL forms:
//! - `tcp://<host>:<port>`
//! - `tty://[<baud>]/<device-path>`, e.g. `tty://115200/dev/ttyUSB0` or
//!   `tty:///dev/rfcomm0` (default baud 38400)

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

use crate::error::TermError;

/// Default baud rate when the URL does not carry one
const DEFAULT_BAUD: u32 = 38400;

/// A bidirectional adapter byte stream
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ByteStream for T {}

/// A parsed connection URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Serial device
    Serial {
        /// Device path, e.g. `/dev/ttyUSB0`
        path: String,
        /// Baud rate
        baud: u32,
    },
    /// TCP socket
    Tcp {
        /// Host name or address
        host: String,
        /// Port number
        port: u16,
    },
}

impl Endpoint {
    /// Parse a connection URL
    pub fn parse(url: &str) -> Result<Self, TermError> {
        if let Some(rest) = url.strip_prefix("tty://") {
            return Self::parse_serial(url, rest);
        }
        if let Some(rest) = url.strip_prefix("tcp://") {
            return Self::parse_tcp(url, rest);
        }
        Err(TermError::InvalidUrl(format!(
            "{}: expected tty:// or tcp:// scheme",
            url
        )))
    }

    fn parse_serial(url: &str, rest: &str) -> Result<Self, TermError> {
        // tty://<baud>/<path> or tty:///<path>
        let (head, tail) = rest
            .split_once('/')
            .ok_or_else(|| TermError::InvalidUrl(format!("{}: missing device path", url)))?;
        let path = format!("/{}", tail);
        if path == "/" {
            return Err(TermError::InvalidUrl(format!("{}: missing device path", url)));
        }
        let baud = if head.is_empty() {
            DEFAULT_BAUD
        } else {
            head.parse::<u32>().map_err(|_| {
                TermError::InvalidUrl(format!("{}: bad baud rate {:?}", url, head))
            })?
        };
        Ok(Endpoint::Serial { path, baud })
    }

    fn parse_tcp(url: &str, rest: &str) -> Result<Self, TermError> {
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| TermError::InvalidUrl(format!("{}: missing port", url)))?;
        if host.is_empty() {
            return Err(TermError::InvalidUrl(format!("{}: missing host", url)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| TermError::InvalidUrl(format!("{}: bad port {:?}", url, port)))?;
        Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Serial { path, baud } => write!(f, "{} at {} baud", path, baud),
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// Open the transport, bounded by the connect timeout.
pub async fn dial(
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<Box<dyn ByteStream>, TermError> {
    let stream = tokio::time::timeout(timeout, open(endpoint))
        .await
        .map_err(|_| TermError::ConnectTimeout(timeout))??;
    info!("connected to {}", endpoint);
    Ok(stream)
}

async fn open(endpoint: &Endpoint) -> Result<Box<dyn ByteStream>, TermError> {
    match endpoint {
        Endpoint::Serial { path, baud } => {
            let stream = tokio_serial::new(path, *baud)
                .timeout(Duration::from_millis(100))
                .open_native_async()?;
            Ok(Box::new(stream))
        }
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
    }
}
