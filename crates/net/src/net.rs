//! Retrying send/recv helpers shared by [`crate::plug::Plug`] and
//! [`crate::operation_plug::OperationPlug`].

use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;

use facq_core::{Error, Result};

/// Writes all of `buf` to `stream`, retrying on a timed-out or interrupted
/// write. `retries = 0` means "retry until the whole buffer is sent or a
/// hard error occurs"; any other value bounds the number of timeout retries.
pub fn send_all(stream: &mut TcpStream, buf: &[u8], retries: u32) -> Result<()> {
    let mut written = 0usize;
    let mut attempts = 0u32;
    while written < buf.len() {
        match stream.write(&buf[written..]) {
            Ok(0) => {
                return Err(Error::io_error(
                    "peer closed the connection during send",
                    io::Error::from(ErrorKind::ConnectionAborted),
                ))
            }
            Ok(n) => {
                written += n;
                attempts = 0;
            }
            Err(err) if is_retryable(&err) => {
                attempts += 1;
                if retries != 0 && attempts > retries {
                    return Err(Error::io_error("timed out sending", err));
                }
            }
            Err(err) => return Err(Error::io_error("error while sending", err)),
        }
    }
    Ok(())
}

/// Reads exactly `buf.len()` bytes from `stream`, retrying on a timed-out or
/// interrupted read. Returns `Ok(0)` if the peer disconnected before any byte
/// of this call was read (mirroring a `recv` returning 0); a disconnect
/// mid-buffer is reported as an error since the frame would be incomplete.
pub fn recv_all(stream: &mut TcpStream, buf: &mut [u8], retries: u32) -> Result<usize> {
    if buf.is_empty() {
        return Err(Error::Config("recv_all called with an empty buffer".into()));
    }
    let mut read = 0usize;
    let mut attempts = 0u32;
    while read < buf.len() {
        match stream.read(&mut buf[read..]) {
            Ok(0) if read == 0 => return Ok(0),
            Ok(0) => {
                return Err(Error::io_error(
                    "peer disconnected mid-frame",
                    io::Error::from(ErrorKind::UnexpectedEof),
                ))
            }
            Ok(n) => {
                read += n;
                attempts = 0;
            }
            Err(err) if is_retryable(&err) => {
                attempts += 1;
                if retries != 0 && attempts > retries {
                    return Err(Error::io_error("timed out receiving", err));
                }
            }
            Err(err) => return Err(Error::io_error("error while receiving", err)),
        }
    }
    Ok(read)
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}
