//! A reader head walking a chain of nodes.
//!
//! Each head owns a private stack and interpreter state: two heads walking
//! the same nodes never share intermediate values. That isolation is what
//! makes sequences composable.

use crate::forth::value::Stack;
use crate::forth::{Output, State};

use super::{Coord, World};

pub struct Hed {
    id: String,
    first: Option<Coord>,
    current: Option<Coord>,
    /// End of a windowed walk. Kept for wiring (`hed-last`, `hed-loop`);
    /// a nil successor always wraps to `first` regardless.
    last: Option<Coord>,
    every: u64,
    bangs: u64,
    stopped: bool,
    stack: Stack,
    state: State,
    /// Appended to every executed node message, except the `_` no-op.
    modifier: String,
}

impl Hed {
    pub fn new(
        id: impl Into<String>,
        first: Option<Coord>,
        last: Option<Coord>,
        every: u64,
        modifier: impl Into<String>,
        state: State,
    ) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() {
            return Err("hed id cannot be empty".to_string());
        }
        if every == 0 {
            return Err("every must be a positive integer".to_string());
        }
        Ok(Self {
            id,
            first,
            current: first,
            last,
            every,
            bangs: 0,
            stopped: true,
            stack: Stack::new(),
            state,
            modifier: modifier.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn first(&self) -> Option<Coord> {
        self.first
    }

    pub fn current(&self) -> Option<Coord> {
        self.current
    }

    pub fn bangs(&self) -> u64 {
        self.bangs
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn start(&mut self) {
        self.stopped = false;
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn set_first(&mut self, first: Coord) {
        self.first = Some(first);
        self.current = Some(first);
    }

    pub fn set_last(&mut self, last: Coord) {
        self.last = Some(last);
    }

    pub fn set_every(&mut self, every: u64) {
        self.every = every;
    }

    pub fn set_modifier(&mut self, modifier: impl Into<String>) {
        self.modifier = modifier.into();
    }

    pub fn modifier(&self) -> &str {
        &self.modifier
    }

    /// Process one clock tick.
    ///
    /// A stopped head ignores the tick entirely. Otherwise the bang counter
    /// advances and, on every `every`-th bang, the current node's message is
    /// run against this head's own stack and state. Afterwards the head
    /// follows the node's successor, wrapping to `first` at a nil link.
    pub fn bang(&mut self, world: &mut World) -> Result<Output, String> {
        if self.stopped {
            return Ok(Output::new());
        }

        self.bangs += 1;
        if self.bangs % self.every != 0 {
            return Ok(Output::new());
        }

        let Some(at) = self.current else {
            return Err("current node is nil".to_string());
        };
        let nod = world
            .memory
            .get_nod(at)
            .map_err(|e| format!("error fetching node: {e}"))?
            .clone();

        let output = nod
            .bang(&mut self.stack, &mut self.state, &self.modifier, world)
            .map_err(|e| format!("error processing node: {e}"))?;

        // Re-read the link after the message ran: a node that re-points
        // itself takes effect immediately. A vanished node wraps to first.
        self.current = match world.memory.get_nod(at).ok().and_then(|n| n.next()) {
            Some(next) => Some(next),
            None => self.first,
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forth::value::Value;
    use crate::world::node::Nod;
    use crate::world::test_support::test_world;

    fn seeded_world(messages: &[&str]) -> World {
        let mut world = test_world();
        for (i, message) in messages.iter().enumerate() {
            let at = Coord::new(i as i64, 0);
            let mut nod = Nod::new(at.to_string(), *message).unwrap();
            if i + 1 < messages.len() {
                nod.set_next(Some(Coord::new(i as i64 + 1, 0)));
            }
            world.memory.add_nod(at, nod).unwrap();
        }
        world
    }

    fn head_at_origin(every: u64) -> Hed {
        Hed::new("9,9", Some(Coord::new(0, 0)), None, every, "", State::initial()).unwrap()
    }

    #[test]
    fn zero_every_is_rejected() {
        assert!(Hed::new("0,0", None, None, 0, "", State::initial()).is_err());
    }

    #[test]
    fn stopped_head_ignores_ticks() {
        let mut world = seeded_world(&["1"]);
        let mut hed = head_at_origin(1);

        for _ in 0..5 {
            hed.bang(&mut world).unwrap();
        }
        assert_eq!(hed.bangs(), 0);
        assert!(hed.stack.is_empty());
    }

    #[test]
    fn fires_on_every_nth_tick() {
        let mut world = seeded_world(&["1"]);
        let mut hed = head_at_origin(3);
        hed.start();

        hed.bang(&mut world).unwrap();
        hed.bang(&mut world).unwrap();
        assert!(hed.stack.is_empty());

        hed.bang(&mut world).unwrap();
        assert_eq!(hed.stack, vec![Value::Number(1.0)]);
    }

    #[test]
    fn walks_chain_and_wraps_to_first() {
        let mut world = seeded_world(&["1", "2", "3"]);
        let mut hed = head_at_origin(1);
        hed.start();

        for _ in 0..4 {
            hed.bang(&mut world).unwrap();
        }
        // 1 2 3 then wrap: 1 again
        assert_eq!(
            hed.stack,
            vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0),
                Value::Number(1.0),
            ]
        );
    }

    #[test]
    fn nil_current_is_an_error() {
        let mut world = seeded_world(&[]);
        let mut hed = Hed::new("0,0", None, None, 1, "", State::initial()).unwrap();
        hed.start();
        assert!(hed.bang(&mut world).is_err());
    }

    #[test]
    fn heads_do_not_share_stacks() {
        let mut world = seeded_world(&["1"]);
        let mut a = head_at_origin(1);
        let mut b = head_at_origin(1);
        a.start();
        b.start();

        a.bang(&mut world).unwrap();
        a.bang(&mut world).unwrap();
        b.bang(&mut world).unwrap();

        assert_eq!(a.stack.len(), 2);
        assert_eq!(b.stack.len(), 1);
    }

    #[test]
    fn modifier_applies_per_visit() {
        let mut world = seeded_world(&["2"]);
        let mut hed = head_at_origin(1);
        hed.set_modifier("3 +");
        hed.start();

        hed.bang(&mut world).unwrap();
        assert_eq!(hed.stack, vec![Value::Number(5.0)]);
    }
}
