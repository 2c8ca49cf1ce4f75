use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const STDIN_CHUNK: usize = 256;
const STDIN_QUEUE: usize = 64;

/// Holds the terminal in raw mode; dropping it restores cooked mode.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn acquire() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        tracing::debug!("raw mode enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(error) = crossterm::terminal::disable_raw_mode() {
            tracing::warn!(?error, "failed to restore terminal mode");
        }
    }
}

pub fn terminal_size() -> io::Result<(u16, u16)> {
    crossterm::terminal::size()
}

/// Sets `flag` whenever the process receives SIGWINCH. Nothing else is
/// touched from the signal path; the renderer clears the flag.
#[cfg(unix)]
pub fn spawn_resize_watcher(flag: Arc<AtomicBool>) -> io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut winch = signal(SignalKind::window_change())?;
    Ok(tokio::spawn(async move {
        while winch.recv().await.is_some() {
            flag.store(true, Ordering::Release);
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_resize_watcher(flag: Arc<AtomicBool>) -> io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        let mut last = terminal_size().ok();
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(250));
        loop {
            interval.tick().await;
            let current = terminal_size().ok();
            if current != last {
                last = current;
                flag.store(true, Ordering::Release);
            }
        }
    }))
}

/// Reads raw stdin bytes on a dedicated thread so a pending read never
/// blocks the runtime. The channel closes on EOF or read error.
pub fn spawn_stdin_reader() -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(STDIN_QUEUE);
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let mut handle = stdin.lock();
            let mut buf = [0u8; STDIN_CHUNK];
            loop {
                match handle.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                    Err(error) => {
                        tracing::warn!(?error, "stdin read failed");
                        break;
                    }
                }
            }
        });
    if let Err(error) = spawned {
        tracing::warn!(?error, "could not start stdin reader");
    }
    rx
}
