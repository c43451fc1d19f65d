// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Append-only audit trail for broadcast txids and imported pubkeys.
//!
//! One file per kind and day (`logs/TXIDS_08-08-2026.log`), one
//! `{unix_millis}-{data}` line per event. Audit failures are logged and
//! swallowed — they never fail the pipeline that triggered them.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;

/// Kinds of audited records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// Transaction ids accepted by `sendrawtransaction`.
    Txids,
    /// Public keys imported into the node as watch-only.
    Pubkeys,
}

impl AuditKind {
    fn as_str(&self) -> &'static str {
        match self {
            AuditKind::Txids => "TXIDS",
            AuditKind::Pubkeys => "PUBKEYS",
        }
    }
}

/// Daily append-only audit log.
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Append one record. Best-effort: failures are traced, not returned.
    pub fn append(&self, kind: AuditKind, data: &str) {
        if let Err(e) = self.try_append(kind, data) {
            tracing::warn!(kind = kind.as_str(), error = %e, "audit append failed");
        }
    }

    fn try_append(&self, kind: AuditKind, data: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let now = Utc::now();
        let name = format!("{}_{}.log", kind.as_str(), now.format("%d-%m-%Y"));
        let line = format!("{}-{}\n", now.timestamp_millis(), data);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(name))?;
        file.write_all(line.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_lines_to_daily_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().to_path_buf());

        log.append(AuditKind::Txids, "deadbeef");
        log.append(AuditKind::Txids, "cafebabe");

        let name = format!("TXIDS_{}.log", Utc::now().format("%d-%m-%Y"));
        let content = fs::read_to_string(dir.path().join(name)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("-deadbeef"));
        assert!(lines[1].ends_with("-cafebabe"));
    }

    #[test]
    fn kinds_use_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().to_path_buf());

        log.append(AuditKind::Pubkeys, "02ab");
        let name = format!("PUBKEYS_{}.log", Utc::now().format("%d-%m-%Y"));
        assert!(dir.path().join(name).exists());
    }
}
