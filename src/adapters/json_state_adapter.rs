//! JSON file position store.
//!
//! Saves go to a sibling temp file which is then renamed over the target,
//! so readers only ever see a complete document.

use crate::domain::error::TurtleError;
use crate::domain::ledger::LedgerState;
use crate::ports::state_port::StatePort;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct JsonStateAdapter {
    path: PathBuf,
}

impl JsonStateAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StatePort for JsonStateAdapter {
    fn load(&self) -> Result<LedgerState, TurtleError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LedgerState::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(LedgerState::new());
        }
        serde_json::from_str(&content).map_err(|e| TurtleError::State {
            reason: format!("corrupt state file {}: {e}", self.path.display()),
        })
    }

    fn save(&self, state: &LedgerState) -> Result<(), TurtleError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            TurtleError::State {
                reason: format!("atomic rename to {} failed: {e}", self.path.display()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{Position, Side};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn position() -> Position {
        Position {
            side: Side::Short,
            amount: 0.123_456_789,
            entry_price: 43_210.987_654_321,
            leverage: 3,
            entry_time: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateAdapter::new(dir.path().join("positions.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_is_exact() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateAdapter::new(dir.path().join("nested/positions.json"));
        let mut state = LedgerState::new();
        state.insert("BTC/USDT-20".into(), position());

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn corrupt_file_is_state_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("positions.json");
        fs::write(&path, "{not json").unwrap();
        let store = JsonStateAdapter::new(path);
        assert!(matches!(store.load(), Err(TurtleError::State { .. })));
    }

    #[test]
    fn file_uses_slot_keys_and_uppercase_sides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("positions.json");
        let store = JsonStateAdapter::new(&path);
        let mut state = LedgerState::new();
        state.insert("ETH/USDT-5".into(), position());
        store.save(&state).unwrap();

        let raw = fs::read_to_string(path).unwrap();
        assert!(raw.contains("\"ETH/USDT-5\""));
        assert!(raw.contains("\"SHORT\""));
    }
}
