//! Single-writer advisory lock for SQLite. A second server process pointed
//! at the same database file exits with a clear error instead of fighting
//! over the WAL.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::mpsc;
use std::thread;

const MSG: &str = "Another canopy instance is already using this database. \
Stop it first or use a different DATABASE_URL.";

/// Derive the lock file path for a database URL. In-memory databases need
/// no lock.
fn lock_path(url: &str) -> Result<Option<PathBuf>, String> {
    if url.contains(":memory:") {
        return Ok(None);
    }
    let db_path = sqlx::sqlite::SqliteConnectOptions::from_str(url)
        .map_err(|e| format!("DATABASE_URL: {}", e))?
        .get_filename()
        .to_path_buf();
    if db_path.to_string_lossy().is_empty() || db_path.to_string_lossy().contains(":memory:") {
        return Ok(None);
    }
    let name = db_path
        .file_name()
        .map(|n| format!("{}.lock", n.to_string_lossy()))
        .unwrap_or_else(|| "db.lock".into());
    Ok(Some(
        db_path
            .parent()
            .map(|dir| dir.join(&name))
            .unwrap_or_else(|| PathBuf::from(name)),
    ))
}

/// Try to take the advisory lock. Returns `None` for in-memory databases,
/// a guard on success, and an error message when another process holds it.
/// The lock lives on a dedicated thread so the fd stays open for the
/// process lifetime; dropping the guard releases it.
pub fn acquire(url: &str) -> Result<Option<SingleWriterGuard>, String> {
    let path = match lock_path(url)? {
        Some(path) => path,
        None => return Ok(None),
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&path)
        .map_err(|e| format!("Lock file {}: {}", path.display(), e))?;

    let (res_tx, res_rx) = mpsc::channel();
    let (exit_tx, exit_rx) = mpsc::channel();
    let join = thread::spawn(move || {
        let mut lock = fd_lock::RwLock::new(file);
        let guard = lock.try_write();
        match &guard {
            Ok(_) => {
                let _ = res_tx.send(Ok(()));
                let _ = exit_rx.recv();
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                let _ = res_tx.send(Err(MSG.to_string()));
            }
            Err(e) => {
                let _ = res_tx.send(Err(e.to_string()));
            }
        }
        drop(guard);
    });

    match res_rx
        .recv()
        .map_err(|_| "Lock thread exited without sending".to_string())?
    {
        Ok(()) => Ok(Some(SingleWriterGuard {
            exit_tx,
            join: Some(join),
        })),
        Err(msg) => Err(msg),
    }
}

pub struct SingleWriterGuard {
    exit_tx: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl Drop for SingleWriterGuard {
    fn drop(&mut self) {
        let _ = self.exit_tx.send(());
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}
