//! Per-bar strategy signals.

use super::error::CoinsimError;

/// Discrete strategy output attached 1:1 to a bar index.
///
/// Raw integer convention at the collaborator boundary: 1 = enter long,
/// -1 = exit, 0 = hold. Anything else is a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    EnterLong,
    Exit,
    Hold,
}

impl Signal {
    pub fn from_raw(value: i8) -> Result<Signal, CoinsimError> {
        match value {
            1 => Ok(Signal::EnterLong),
            -1 => Ok(Signal::Exit),
            0 => Ok(Signal::Hold),
            other => Err(CoinsimError::InvalidSignal { value: other }),
        }
    }

    pub fn as_raw(self) -> i8 {
        match self {
            Signal::EnterLong => 1,
            Signal::Exit => -1,
            Signal::Hold => 0,
        }
    }
}
