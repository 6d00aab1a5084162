//! A grid cell carrying a source fragment.

use crate::forth::value::Stack;
use crate::forth::{interpret, sigil, Output, State};

use super::{Coord, World};

/// Message given to freshly created nodes.
pub const DEFAULT_MESSAGE: &str = "print";

/// The explicit no-op message: a visited `_` node leaves stack, state and
/// output untouched, and the head's modifier is not applied either.
pub const NOOP_MESSAGE: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nod {
    id: String,
    message: String,
    /// Successor cell; a dangling coordinate is tolerated and simply fails
    /// the lookup on the tick that follows it.
    next: Option<Coord>,
}

impl Nod {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() {
            return Err("nod id cannot be empty".to_string());
        }
        Ok(Self {
            id,
            message: message.into(),
            next: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn next(&self) -> Option<Coord> {
        self.next
    }

    pub fn set_next(&mut self, next: Option<Coord>) {
        self.next = next;
    }

    /// Evaluate this node's message against a head's stack and state.
    ///
    /// The modifier is appended after a single space, the sigil pass runs
    /// over the combined text, and the result is interpreted. An output
    /// whose first line carries the `Error:` prefix is escalated to a
    /// failure so the clock can log it.
    pub fn bang(
        &self,
        stack: &mut Stack,
        state: &mut State,
        modifier: &str,
        world: &mut World,
    ) -> Result<Output, String> {
        if self.message == NOOP_MESSAGE {
            return Ok(Output::new());
        }

        let msg = if modifier.is_empty() {
            self.message.clone()
        } else {
            format!("{} {}", self.message, modifier)
        };

        let expanded = sigil::expand(&msg).map_err(|e| format!("error parsing sigil: {e}"))?;
        let output = interpret(&expanded, stack, state, world);

        if let Some(first) = output.first() {
            if first.starts_with("Error:") {
                return Err(first.clone());
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forth::value::Value;
    use crate::world::test_support::test_world;

    #[test]
    fn empty_id_is_rejected() {
        assert!(Nod::new("", "print").is_err());
    }

    #[test]
    fn bang_interprets_message() {
        let mut world = test_world();
        let mut stack = Stack::new();
        let mut state = State::initial();
        let nod = Nod::new("0,0", "1 2 +").unwrap();

        let output = nod.bang(&mut stack, &mut state, "", &mut world).unwrap();
        assert!(output.is_empty());
        assert_eq!(stack, vec![Value::Number(3.0)]);
    }

    #[test]
    fn modifier_is_appended_with_a_space() {
        let mut world = test_world();
        let mut stack = Stack::new();
        let mut state = State::initial();
        let nod = Nod::new("0,0", "4").unwrap();

        nod.bang(&mut stack, &mut state, "1 +", &mut world).unwrap();
        assert_eq!(stack, vec![Value::Number(5.0)]);
    }

    #[test]
    fn noop_message_skips_modifier_entirely() {
        let mut world = test_world();
        let mut stack = Stack::new();
        let mut state = State::initial();
        let nod = Nod::new("0,0", NOOP_MESSAGE).unwrap();

        let output = nod
            .bang(&mut stack, &mut state, "boom boom", &mut world)
            .unwrap();
        assert!(output.is_empty());
        assert!(stack.is_empty());
    }

    #[test]
    fn sigils_expand_before_interpretation() {
        let mut world = test_world();
        let mut stack = Stack::new();
        let mut state = State::initial();
        let nod = Nod::new("0,0", "$r2:2").unwrap();

        nod.bang(&mut stack, &mut state, "", &mut world).unwrap();
        assert_eq!(stack, vec![Value::Number(2.0)]);
    }

    #[test]
    fn sigil_failure_is_an_error() {
        let mut world = test_world();
        let mut stack = Stack::new();
        let mut state = State::initial();
        let nod = Nod::new("0,0", "$zoops").unwrap();

        let err = nod.bang(&mut stack, &mut state, "", &mut world).unwrap_err();
        assert!(err.contains("error parsing sigil"), "{err}");
    }

    #[test]
    fn error_output_escalates() {
        let mut world = test_world();
        let mut stack = Stack::new();
        let mut state = State::initial();
        crate::world::words::install_world_words(&state.dictionary);
        // m-osc with nothing on the stack produces an "Error:" line
        let nod = Nod::new("0,0", "m-osc").unwrap();

        assert!(nod.bang(&mut stack, &mut state, "", &mut world).is_err());
    }
}
