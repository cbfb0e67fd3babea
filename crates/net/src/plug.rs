//! [`Plug`]: a TCP server endpoint that accepts at most one viewer, receives
//! a handshake, and hands decoded chunks to the host application's own poll
//! loop.

use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use facq_buffer::RingBuffer;
use facq_core::{Error, Result};
use facq_logging::tracing::{instrument, warn};
use facq_stream_data::StreamData;

use crate::net::recv_all;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const RING_SIZE: usize = 4;

/// Observable events a [`Plug`] emits; the host drains these with
/// [`Plug::poll_event`] the same way it drains a pipeline's
/// [`facq_pipeline::Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlugEvent {
    /// A viewer completed the handshake and is now streaming.
    Connected,
    /// The viewer disconnected or its producer thread hit an error; teardown
    /// has already completed by the time this is observed.
    Disconnected,
}

struct ClientSession {
    socket: Arc<Mutex<Option<TcpStream>>>,
    ring: Arc<RingBuffer>,
    stream_data: StreamData,
    producer_handle: Option<JoinHandle<()>>,
    producer_done: Arc<AtomicBool>,
}

struct Shared {
    client: Mutex<Option<ClientSession>>,
    events_tx: Sender<PlugEvent>,
}

/// A one-client-at-a-time TCP server. See the module docs for the accept /
/// handshake / drain lifecycle.
pub struct Plug {
    shared: Arc<Shared>,
    events_rx: Receiver<PlugEvent>,
    accept_shutdown: Arc<AtomicBool>,
    accept_handle: Option<JoinHandle<()>>,
    listen_addr: SocketAddr,
}

impl Plug {
    /// Binds `addr` and starts listening in the background.
    pub fn new(addr: SocketAddr) -> Result<Self> {
        let (events_tx, events_rx) = unbounded();
        let shared = Arc::new(Shared {
            client: Mutex::new(None),
            events_tx,
        });
        let accept_shutdown = Arc::new(AtomicBool::new(false));
        let listener = bind_nonblocking(addr)?;
        let accept_handle = spawn_accept_thread(listener, Arc::clone(&shared), Arc::clone(&accept_shutdown));
        Ok(Plug {
            shared,
            events_rx,
            accept_shutdown,
            accept_handle: Some(accept_handle),
            listen_addr: addr,
        })
    }

    /// The address currently being listened on.
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Whether a viewer is currently connected.
    pub fn is_connected(&self) -> bool {
        self.shared.client.lock().unwrap().is_some()
    }

    /// Returns one pending [`PlugEvent`], if any, without blocking.
    pub fn poll_event(&self) -> Option<PlugEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Drains every chunk currently buffered from the connected client,
    /// decoding each from big-endian wire bytes to native `f64` and invoking
    /// `cb` once per chunk. If the producer has observed a disconnect since
    /// the last call, tears the client down and posts
    /// [`PlugEvent::Disconnected`] after delivering whatever data remains.
    #[instrument(skip_all)]
    pub fn drain<F: FnMut(&StreamData, &[f64])>(&self, mut cb: F) {
        let mut guard = self.shared.client.lock().unwrap();
        let Some(session) = guard.as_mut() else {
            return;
        };

        while let Some(mut chunk) = session.ring.try_pop() {
            chunk.to_big_endian_f64();
            let doubles: Vec<f64> = chunk
                .used_bytes()
                .chunks_exact(8)
                .map(|b| f64::from_ne_bytes(b.try_into().unwrap()))
                .collect();
            cb(&session.stream_data, &doubles);
            session.ring.recycle(chunk);
        }

        if session.producer_done.load(Ordering::SeqCst) {
            let mut session = guard.take().expect("checked Some above");
            if let Some(sock) = session.socket.lock().unwrap().take() {
                let _ = sock.shutdown(Shutdown::Both);
            }
            if let Some(handle) = session.producer_handle.take() {
                let _ = handle.join();
            }
            let _ = self.shared.events_tx.send(PlugEvent::Disconnected);
        }
    }

    /// Idempotent: if no client is connected, does nothing. Otherwise closes
    /// the client socket, joins its producer thread, and posts
    /// [`PlugEvent::Disconnected`].
    #[instrument(skip_all)]
    pub fn disconnect(&self) {
        let mut guard = self.shared.client.lock().unwrap();
        let Some(mut session) = guard.take() else {
            return;
        };
        if let Some(sock) = session.socket.lock().unwrap().take() {
            let _ = sock.shutdown(Shutdown::Both);
        }
        if let Some(handle) = session.producer_handle.take() {
            let _ = handle.join();
        }
        let _ = self.shared.events_tx.send(PlugEvent::Disconnected);
    }

    /// Stops listening, disconnects any client, then rebinds and resumes
    /// listening on `addr`.
    #[instrument(skip_all)]
    pub fn set_listen_address(&mut self, addr: SocketAddr) -> Result<()> {
        self.disconnect();

        self.accept_shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_handle.take() {
            let _ = handle.join();
        }

        let listener = bind_nonblocking(addr)?;
        self.accept_shutdown = Arc::new(AtomicBool::new(false));
        self.accept_handle = Some(spawn_accept_thread(
            listener,
            Arc::clone(&self.shared),
            Arc::clone(&self.accept_shutdown),
        ));
        self.listen_addr = addr;
        Ok(())
    }
}

impl Drop for Plug {
    fn drop(&mut self) {
        self.disconnect();
        self.accept_shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_handle.take() {
            let _ = handle.join();
        }
    }
}

fn bind_nonblocking(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).map_err(Error::Resource)?;
    listener.set_nonblocking(true).map_err(Error::Resource)?;
    Ok(listener)
}

fn spawn_accept_thread(
    listener: TcpListener,
    shared: Arc<Shared>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("facq-plug-accept".into())
        .spawn(move || accept_loop(listener, shared, shutdown))
        .expect("spawning the plug accept thread should not fail")
}

fn accept_loop(listener: TcpListener, shared: Arc<Shared>, shutdown: Arc<AtomicBool>) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _peer)) => {
                let already_connected = shared.client.lock().unwrap().is_some();
                if already_connected {
                    let _ = stream.shutdown(Shutdown::Both);
                    continue;
                }
                match handshake_and_spawn(stream) {
                    Ok(session) => {
                        *shared.client.lock().unwrap() = Some(session);
                        let _ = shared.events_tx.send(PlugEvent::Connected);
                    }
                    Err(err) => warn!(error = %err, "plug handshake failed"),
                }
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) => {
                warn!(error = %err, "plug accept failed");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

fn handshake_and_spawn(mut stream: TcpStream) -> Result<ClientSession> {
    stream.set_nonblocking(false).map_err(Error::Resource)?;
    let stream_data = StreamData::read_wire(&mut stream)?;
    let chunk_bytes = stream_data.recommended_chunk_bytes();
    let ring = Arc::new(RingBuffer::new(RING_SIZE, chunk_bytes)?);

    let read_stream = stream.try_clone().map_err(Error::Resource)?;
    let socket = Arc::new(Mutex::new(Some(stream)));
    let producer_done = Arc::new(AtomicBool::new(false));

    let producer_ring = Arc::clone(&ring);
    let producer_done_flag = Arc::clone(&producer_done);
    let producer_handle = thread::Builder::new()
        .name("facq-plug-producer".into())
        .spawn(move || run_producer(read_stream, producer_ring, producer_done_flag))
        .expect("spawning the plug producer thread should not fail");

    Ok(ClientSession {
        socket,
        ring,
        stream_data,
        producer_handle: Some(producer_handle),
        producer_done,
    })
}

fn run_producer(mut read_stream: TcpStream, ring: Arc<RingBuffer>, done: Arc<AtomicBool>) {
    loop {
        if ring.exit() {
            break;
        }
        let Some(mut chunk) = ring.get_recycled() else {
            break;
        };
        let cap = chunk.capacity();
        let result = recv_all(&mut read_stream, &mut chunk.write_position()[..cap], 0);
        match result {
            Ok(0) => {
                ring.recycle(chunk);
                break;
            }
            Ok(n) => {
                chunk.add_used(n);
                ring.push(chunk);
            }
            Err(_) => {
                ring.recycle(chunk);
                break;
            }
        }
    }
    done.store(true, Ordering::SeqCst);
}
