use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::controller::Controller;
use crate::utilities::command::{handle_line, CommandError, HELP};

/// Accept and read timeouts are this long, so `stop` never waits much longer.
const POLL: Duration = Duration::from_millis(50);

/// Longest line a client may send, terminator included.
const MAX_LINE: usize = 1024;

const WELCOME: &str = "Welcome to the Elevator Control System!";

/// Newline-terminated text commands over TCP, one thread per client.
pub struct Server {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

impl Server {
    /// Binds `0.0.0.0:port`; port 0 picks a free one.
    pub fn start(controller: Arc<Controller>, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let running = Arc::new(AtomicBool::new(true));

        let acceptor = {
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("server".to_string())
                .spawn(move || accept(listener, controller, running))?
        };

        info!(%local_addr, "server listening");
        Ok(Server { local_addr, running, acceptor: Some(acceptor) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Closes every session and waits for their threads.
    pub fn stop(&mut self) {
        let Some(acceptor) = self.acceptor.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        if acceptor.join().is_err() {
            warn!("server thread panicked");
        }
        info!("server stopped");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept(listener: TcpListener, controller: Arc<Controller>, running: Arc<AtomicBool>) {
    let mut sessions: Vec<JoinHandle<()>> = Vec::new();

    while running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!(%peer, "client connected");
                let controller = Arc::clone(&controller);
                let running = Arc::clone(&running);
                let spawned = thread::Builder::new()
                    .name(format!("client-{peer}"))
                    .spawn(move || {
                        if let Err(e) = session(stream, &controller, &running) {
                            debug!(%peer, "session ended: {e}");
                        }
                        info!(%peer, "client disconnected");
                    });
                match spawned {
                    Ok(handle) => sessions.push(handle),
                    Err(e) => warn!(%peer, "cannot serve client: {e}"),
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL),
            Err(e) => {
                warn!("accept failed: {e}");
                thread::sleep(POLL);
            }
        }
        sessions.retain(|handle| !handle.is_finished());
    }

    for handle in sessions {
        if handle.join().is_err() {
            warn!("client thread panicked");
        }
    }
}

fn session(mut stream: TcpStream, controller: &Controller, running: &AtomicBool) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(POLL))?;
    writeln!(stream, "{WELCOME}\n{HELP}")?;

    // bytes of a line not yet terminated, kept across read timeouts
    let mut pending: Vec<u8> = Vec::new();
    // set once an overlong line was refused, until its newline arrives
    let mut discarding = false;
    let mut chunk = [0u8; 1024];

    while running.load(Ordering::Acquire) {
        let read = match stream.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(read) => read,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                continue;
            }
            Err(e) => return Err(e),
        };
        pending.extend_from_slice(&chunk[..read]);

        while let Some(end) = pending.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = pending.drain(..=end).collect();
            if std::mem::take(&mut discarding) {
                continue;
            }
            if raw.len() > MAX_LINE {
                writeln!(stream, "{}", CommandError::TooLong(MAX_LINE))?;
                continue;
            }
            let line = String::from_utf8_lossy(&raw);
            let Some(reply) = handle_line(controller, line.trim()) else {
                continue;
            };
            writeln!(stream, "{}", reply.text)?;
            if reply.close {
                return Ok(());
            }
        }

        if pending.len() > MAX_LINE {
            pending.clear();
            if !discarding {
                warn!(limit = MAX_LINE, "overlong line refused");
                writeln!(stream, "{}", CommandError::TooLong(MAX_LINE))?;
                discarding = true;
            }
        }
    }
    Ok(())
}
