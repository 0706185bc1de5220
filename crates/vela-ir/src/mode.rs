//! Memory mode (spec §4.3/§4.4/§6.4/§7): one global flag, consulted by the
//! ownership analyzer, the null checker, and the backend. Owned here rather
//! than by any one stage crate since all three need to agree on it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryMode {
    /// Reference-counted/traced garbage collection. Ownership cycles are
    /// reported (diagnostic 301) but demoted to `Severity::Warning`; the
    /// null checker is skipped entirely (spec §4.4 "GC mode").
    Gc,
    /// Static ownership checking. Cycles are `Severity::Error`; the null
    /// checker runs (401-403).
    Ownership,
}

impl MemoryMode {
    pub fn is_gc(self) -> bool {
        matches!(self, MemoryMode::Gc)
    }
}
