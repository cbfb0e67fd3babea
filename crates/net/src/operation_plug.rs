//! [`OperationPlug`]: the client-side tee that mirrors a running stream to a
//! [`crate::plug::Plug`] listening elsewhere.

use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use facq_buffer::Chunk;
use facq_core::{Error, Result};
use facq_logging::tracing::{instrument, warn};
use facq_pipeline::Operation;
use facq_stream_data::StreamData;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::net::send_all;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SEND_RETRIES: u32 = 3;

/// An [`Operation`] that byte-swaps every chunk to big-endian, forwards it to
/// a connected viewer, then swaps it back so downstream operations still see
/// native-endian doubles. A disconnected or unreachable viewer never fails
/// the capture; send errors are logged and otherwise ignored.
pub struct OperationPlug {
    host: String,
    port: u16,
    connect_timeout: Duration,
    send_retries: u32,
    stream: Option<TcpStream>,
}

impl OperationPlug {
    /// Targets `host:port`. The connection is not attempted until
    /// [`Operation::start`] is called.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        OperationPlug {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_retries: DEFAULT_SEND_RETRIES,
            stream: None,
        }
    }

    /// Overrides the per-candidate connect timeout (default 5s).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the per-chunk send retry budget (default 3).
    pub fn with_send_retries(mut self, retries: u32) -> Self {
        self.send_retries = retries;
        self
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(Error::Resource)?
            .collect();
        if addrs.is_empty() {
            return Err(Error::Config(format!(
                "{}:{} did not resolve to any address",
                self.host, self.port
            )));
        }
        Ok(addrs)
    }

    fn connect_one(addr: SocketAddr, timeout: Duration) -> std::io::Result<TcpStream> {
        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.connect_timeout(&SockAddr::from(addr), timeout)?;
        Ok(socket.into())
    }
}

impl Operation for OperationPlug {
    fn name(&self) -> &str {
        "plug"
    }

    #[instrument(skip_all, fields(host = %self.host, port = self.port))]
    fn start(&mut self, stream_data: &StreamData) -> Result<()> {
        let candidates = self.resolve()?;
        let mut last_err = None;
        let mut connected = None;
        for addr in candidates {
            match Self::connect_one(addr, self.connect_timeout) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(err) => last_err = Some(err),
            }
        }
        let mut stream = connected.ok_or_else(|| {
            Error::Resource(last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotConnected, "no address connected")
            }))
        })?;

        stream_data
            .write_wire(&mut stream)
            .map_err(|err| Error::io_error("failed to send plug handshake", err))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self, _stream_data: &StreamData) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }

    fn apply(&mut self, chunk: &mut Chunk, _stream_data: &StreamData) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        chunk.to_big_endian_f64();
        let result = send_all(stream, chunk.used_bytes(), self.send_retries);
        chunk.to_big_endian_f64();
        if let Err(err) = result {
            warn!(error = %err, "operation-plug send failed; capture continues");
        }
        Ok(())
    }
}
