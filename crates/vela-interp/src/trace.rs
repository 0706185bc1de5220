//! Execution tracing, enabled via [`crate::state::InterpreterConfig`].

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One step of a trace: what was evaluated and what it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: usize,
    pub description: String,
    pub value: Option<Value>,
}

impl TraceEntry {
    pub fn new(step: usize, description: impl Into<String>, value: Option<Value>) -> Self {
        TraceEntry {
            step,
            description: description.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_entry_carries_step_and_value() {
        let entry = TraceEntry::new(3, "call add(2, 3)", Some(Value::Integer(5)));
        assert_eq!(entry.step, 3);
        assert_eq!(entry.value, Some(Value::Integer(5)));
    }
}
