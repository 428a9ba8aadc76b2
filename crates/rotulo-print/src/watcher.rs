// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hot reload of the printer directory on file change.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{Debouncer, new_debouncer};
use tracing::{error, info, warn};

use rotulo_core::error::{Result, RotuloError};

use crate::directory::PrinterDirectory;

const DEBOUNCE: Duration = Duration::from_millis(500);
const POLL: Duration = Duration::from_millis(100);

/// Background thread that reloads a [`PrinterDirectory`] whenever its file
/// changes on disk.
///
/// Watches the parent directory rather than the file itself, so the
/// rename-over-save pattern editors and config pushers use still fires.
pub struct DirectoryWatcher {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl DirectoryWatcher {
    pub fn spawn(directory: Arc<PrinterDirectory>) -> Result<Self> {
        let file: PathBuf = directory.path().to_path_buf();
        let parent = match file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer: Debouncer<RecommendedWatcher> =
            new_debouncer(DEBOUNCE, tx).map_err(|e| RotuloError::Watch(e.to_string()))?;
        debouncer
            .watcher()
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| RotuloError::Watch(e.to_string()))?;

        info!(path = %file.display(), "watching printer file for changes");

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = std::thread::spawn(move || {
            // keeps the underlying watcher alive for the thread's lifetime
            let _debouncer = debouncer;
            loop {
                if flag.load(Ordering::Relaxed) {
                    break;
                }
                match rx.recv_timeout(POLL) {
                    Ok(Ok(events)) => {
                        let relevant = events
                            .iter()
                            .any(|event| event.path.file_name() == file.file_name());
                        if relevant {
                            match directory.reload() {
                                Ok(count) => {
                                    info!(printers = count, "printer directory reloaded");
                                }
                                Err(e) => {
                                    warn!(
                                        error = %e,
                                        "printer directory reload failed, keeping previous table"
                                    );
                                }
                            }
                        }
                    }
                    Ok(Err(e)) => error!(error = %e, "directory watch error"),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Signals the watch thread and waits for it to exit.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        false
    }

    #[test]
    fn file_change_triggers_a_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("printers.json");
        std::fs::write(&path, r#"{"1-1": {"nome": "Cozinha", "ativo": true}}"#).unwrap();

        let dir = Arc::new(PrinterDirectory::open(&path));
        assert_eq!(dir.len(), 1);

        let mut watcher = DirectoryWatcher::spawn(Arc::clone(&dir)).unwrap();

        std::fs::write(
            &path,
            r#"{"1-1": {"nome": "Cozinha", "ativo": true},
               "2-2": {"nome": "Padaria", "ativo": true}}"#,
        )
        .unwrap();

        assert!(
            wait_until(Duration::from_secs(10), || dir.resolve("2-2").is_some()),
            "watcher never picked up the new record"
        );
        watcher.stop();
    }

    #[test]
    fn broken_edit_keeps_the_previous_table() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("printers.json");
        std::fs::write(&path, r#"{"1-1": {"nome": "Cozinha", "ativo": true}}"#).unwrap();

        let dir = Arc::new(PrinterDirectory::open(&path));
        let mut watcher = DirectoryWatcher::spawn(Arc::clone(&dir)).unwrap();

        std::fs::write(&path, "{ truncated").unwrap();
        // give the debouncer time to fire and fail the reload
        std::thread::sleep(Duration::from_secs(2));
        assert_eq!(dir.resolve("1-1").unwrap().nome, "Cozinha");
        watcher.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("printers.json");
        std::fs::write(&path, "{}").unwrap();

        let dir = Arc::new(PrinterDirectory::open(&path));
        let mut watcher = DirectoryWatcher::spawn(dir).unwrap();
        watcher.stop();
        watcher.stop();
    }
}
