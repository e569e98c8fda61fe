//! The stdin reader thread.
//!
//! Raw-mode input arrives as arbitrary byte chunks split at the OS's
//! whim; one named thread reads them and forwards each chunk over an
//! mpsc channel. The thread owns no reactive state and never parses.
//! It polls with a short timeout so the stop flag can end it without
//! waiting on a read that may never return.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What the reader thread can send the loop.
pub(crate) enum ReaderEvent {
    /// One chunk of raw bytes, exactly as read from the descriptor.
    Input(Vec<u8>),
    /// Stdin hit end of file or broke; no more input will ever come.
    Closed,
}

/// Poll window for stop-flag checks. Input is never delayed by it:
/// poll returns the moment the descriptor turns readable.
const STOP_POLL: Duration = Duration::from_millis(50);

pub(crate) struct StdinReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl StdinReader {
    pub(crate) fn spawn(tx: Sender<ReaderEvent>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::Builder::new()
            .name("glint-stdin".to_string())
            .spawn(move || read_loop(tx, stop_flag))?;
        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Ask the thread to stop and wait for it; returns within one poll
    /// window.
    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            #[cfg(unix)]
            let _ = handle.join();
            // Elsewhere the thread may be parked in a blocking read;
            // leave it to die with the process.
            #[cfg(not(unix))]
            drop(handle);
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn read_loop(tx: Sender<ReaderEvent>, stop: Arc<AtomicBool>) {
    use std::os::unix::io::AsRawFd;

    let fd = io::stdin().as_raw_fd();
    let mut buf = [0u8; 1024];

    while !stop.load(Ordering::SeqCst) {
        let mut pollfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&mut pollfd, 1, STOP_POLL.as_millis() as i32) };
        if ready < 0 {
            if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            let _ = tx.send(ReaderEvent::Closed);
            return;
        }
        if ready == 0 || pollfd.revents & (libc::POLLIN | libc::POLLHUP) == 0 {
            continue;
        }

        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n > 0 {
            let chunk = buf[..n as usize].to_vec();
            if tx.send(ReaderEvent::Input(chunk)).is_err() {
                return; // loop side is gone
            }
        } else if n == 0 {
            let _ = tx.send(ReaderEvent::Closed);
            return;
        } else {
            if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            let _ = tx.send(ReaderEvent::Closed);
            return;
        }
    }
}

#[cfg(not(unix))]
fn read_loop(tx: Sender<ReaderEvent>, stop: Arc<AtomicBool>) {
    use std::io::Read;

    // No portable poll here: block on read, exit when either side
    // closes.
    let mut stdin = io::stdin();
    let mut buf = [0u8; 1024];
    while !stop.load(Ordering::SeqCst) {
        match stdin.read(&mut buf) {
            Ok(0) => {
                let _ = tx.send(ReaderEvent::Closed);
                return;
            }
            Ok(n) => {
                if tx.send(ReaderEvent::Input(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => {
                let _ = tx.send(ReaderEvent::Closed);
                return;
            }
        }
    }
}
