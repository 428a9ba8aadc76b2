// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer directory: maps routing keys to printer records, hot-reloadable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use tracing::{info, warn};

use rotulo_core::error::{Result, RotuloError};
use rotulo_core::{PrinterRecord, de_lenient_string};

/// Raw-socket port assumed when a record carries an address without one.
const DEFAULT_RAW_PORT: u16 = 9100;

/// The on-disk file comes in two shapes. The list shape keys each record
/// by an `id` field; the map shape keys records directly by routing key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DirectoryFile {
    Lista { impressoras: Vec<ListEntry> },
    Mapa(HashMap<String, PrinterRecord>),
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    #[serde(default, deserialize_with = "de_lenient_string")]
    id: Option<String>,
    #[serde(flatten)]
    record: PrinterRecord,
}

/// Routing table for label delivery.
///
/// Reloads swap the whole cache at once; a reload that fails to read,
/// parse, or validate leaves the previous cache in place, so a half-saved
/// edit of the file never knocks out printing.
pub struct PrinterDirectory {
    path: PathBuf,
    cache: RwLock<Arc<HashMap<String, PrinterRecord>>>,
}

impl PrinterDirectory {
    /// Opens the directory and performs the initial load. A missing or
    /// invalid file logs a warning and starts empty; a later reload can
    /// still populate it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let dir = Self {
            path: path.into(),
            cache: RwLock::new(Arc::new(HashMap::new())),
        };
        match dir.reload() {
            Ok(count) => {
                info!(printers = count, path = %dir.path.display(), "printer directory loaded");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %dir.path.display(),
                    "printer directory unavailable, starting empty"
                );
            }
        }
        dir
    }

    /// Re-reads the file and replaces the cache. On any error the cache
    /// is left untouched.
    pub fn reload(&self) -> Result<usize> {
        let raw = std::fs::read_to_string(&self.path)?;
        let parsed: DirectoryFile = serde_json::from_str(&raw)
            .map_err(|e| RotuloError::Directory(format!("unreadable printer file: {e}")))?;
        let map = normalize(parsed);
        validate(&map)?;
        let count = map.len();
        *self.cache.write().expect("printer cache lock poisoned") = Arc::new(map);
        Ok(count)
    }

    /// Record for a routing key, if one is configured.
    pub fn resolve(&self, store_key: &str) -> Option<PrinterRecord> {
        self.snapshot().get(store_key).cloned()
    }

    /// Consistent view of the whole table for the duration of a batch.
    pub fn snapshot(&self) -> Arc<HashMap<String, PrinterRecord>> {
        self.cache
            .read()
            .expect("printer cache lock poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn normalize(file: DirectoryFile) -> HashMap<String, PrinterRecord> {
    let mut map = match file {
        DirectoryFile::Lista { impressoras } => {
            let mut map = HashMap::with_capacity(impressoras.len());
            for entry in impressoras {
                match entry.id {
                    Some(id) if !id.is_empty() => {
                        map.insert(id, entry.record);
                    }
                    _ => warn!(printer = %entry.record.nome, "list entry without id skipped"),
                }
            }
            map
        }
        DirectoryFile::Mapa(map) => map,
    };
    for record in map.values_mut() {
        if record.porta.is_none() && record.ip.as_deref().is_some_and(|ip| !ip.is_empty()) {
            record.porta = Some(DEFAULT_RAW_PORT);
        }
    }
    map
}

fn validate(map: &HashMap<String, PrinterRecord>) -> Result<()> {
    for (store_key, record) in map {
        if record.nome.trim().is_empty() {
            return Err(RotuloError::Directory(format!(
                "invalid record for routing key {store_key}: empty printer name"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn map_shape_resolves_by_routing_key() {
        let f = write_file(
            r#"{
                "1-1": {"nome": "Cozinha", "ip": "192.168.0.50", "porta": 9100, "ativo": true},
                "1-2": {"nome": "Balcao", "ativo": false}
            }"#,
        );
        let dir = PrinterDirectory::open(f.path());
        assert_eq!(dir.len(), 2);
        let cozinha = dir.resolve("1-1").unwrap();
        assert_eq!(cozinha.raw_endpoint(), Some(("192.168.0.50", 9100)));
        assert!(!dir.resolve("1-2").unwrap().ativo);
        assert!(dir.resolve("9-9").is_none());
    }

    #[test]
    fn list_shape_normalizes_and_skips_entries_without_id() {
        let f = write_file(
            r#"{"impressoras": [
                {"id": "2-1", "nome": "Padaria", "ip": "10.0.0.9", "ativo": true},
                {"nome": "Fantasma", "ativo": true},
                {"id": 3, "impressora": "Acougue", "ativo": true}
            ]}"#,
        );
        let dir = PrinterDirectory::open(f.path());
        assert_eq!(dir.len(), 2);
        let padaria = dir.resolve("2-1").unwrap();
        assert_eq!(padaria.raw_endpoint(), Some(("10.0.0.9", DEFAULT_RAW_PORT)));
        assert_eq!(dir.resolve("3").unwrap().nome, "Acougue");
    }

    #[test]
    fn record_without_address_stays_spool_only() {
        let f = write_file(r#"{"5-5": {"nome": "Escritorio", "ativo": true}}"#);
        let dir = PrinterDirectory::open(f.path());
        let rec = dir.resolve("5-5").unwrap();
        assert!(rec.raw_endpoint().is_none());
        assert_eq!(rec.porta, None);
    }

    #[test]
    fn failed_reload_keeps_the_previous_cache() {
        let f = write_file(r#"{"1-1": {"nome": "Cozinha", "ativo": true}}"#);
        let dir = PrinterDirectory::open(f.path());
        assert_eq!(dir.len(), 1);

        std::fs::write(f.path(), r#"{"1-1": {"nome": "", "ativo": true}}"#).unwrap();
        assert!(dir.reload().is_err());
        assert_eq!(dir.resolve("1-1").unwrap().nome, "Cozinha");

        std::fs::write(f.path(), r#"{"1-1": {"nome": "X", "ativo": "sim"}}"#).unwrap();
        assert!(dir.reload().is_err());
        assert_eq!(dir.resolve("1-1").unwrap().nome, "Cozinha");

        std::fs::write(f.path(), "not json at all").unwrap();
        assert!(dir.reload().is_err());
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = PrinterDirectory::open("/nonexistent/rotulo/printers.json");
        assert!(dir.is_empty());
        assert!(dir.resolve("1-1").is_none());
    }

    #[test]
    fn reload_replaces_the_whole_cache() {
        let f = write_file(r#"{"1-1": {"nome": "Cozinha", "ativo": true}}"#);
        let dir = PrinterDirectory::open(f.path());
        std::fs::write(f.path(), r#"{"2-2": {"nome": "Padaria", "ativo": true}}"#).unwrap();
        assert_eq!(dir.reload().unwrap(), 1);
        assert!(dir.resolve("1-1").is_none());
        assert!(dir.resolve("2-2").is_some());
    }
}
