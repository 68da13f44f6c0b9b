//! Position state persistence port.

use crate::domain::error::TurtleError;
use crate::domain::ledger::LedgerState;

/// Save must be all-or-nothing: a crash mid-save leaves the previous state.
pub trait StatePort {
    /// Missing state is an empty map, not an error.
    fn load(&self) -> Result<LedgerState, TurtleError>;

    fn save(&self, state: &LedgerState) -> Result<(), TurtleError>;
}
