//! The world service.
//!
//! One thread owns the grid, the process-global stack/state and the
//! emitters, and drains a command channel. Evaluations, clock ticks and
//! snapshot reads are totally ordered by that channel, so the HTTP path can
//! never observe or mutate the grid mid-tick, and every dictionary word,
//! including the grid-mutating ones, is safe to run from tick context.

use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};

use crate::events::{OscClient, UiEvent, UiSender};
use crate::forth::value::{Stack, Value};
use crate::forth::{interpret, State};
use crate::world::clock::Clock;
use crate::world::memory::Memory2D;
use crate::world::words::install_world_words;
use crate::world::{Coord, World};

pub enum WorldMsg {
    Eval {
        input: String,
        reply: oneshot::Sender<EvalOutcome>,
    },
    Tick,
    Snapshot {
        reply: oneshot::Sender<MemorySnapshot>,
    },
}

/// Result of evaluating one input line against the global stack and state.
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    pub output: Vec<String>,
    pub stack: Vec<Value>,
}

/// The memory-stream payload: every node and head currently on the grid.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemorySnapshot {
    pub objects: Vec<MemoryObject>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryObject {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub id: String,
    pub x: i64,
    pub y: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub connects_to_x: Option<i64>,
    pub connects_to_y: Option<i64>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Nod,
    Hed,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub rows: usize,
    pub cols: usize,
    pub interval_ms: u64,
    pub osc_host: String,
    pub osc_port: u16,
    /// Start ticking immediately, the way a live session expects.
    pub start_clock: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: 20,
            interval_ms: 100,
            osc_host: "localhost".to_string(),
            osc_port: 7001,
            start_clock: true,
        }
    }
}

/// Client side of the service channel. Cheap to clone; used by the HTTP
/// shell and by tests.
#[derive(Clone)]
pub struct WorldHandle {
    tx: Sender<WorldMsg>,
    ui: UiSender,
}

impl WorldHandle {
    pub async fn evaluate(&self, input: impl Into<String>) -> anyhow::Result<EvalOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorldMsg::Eval {
                input: input.into(),
                reply,
            })
            .map_err(|_| anyhow::anyhow!("world service is gone"))?;
        Ok(rx.await?)
    }

    pub async fn snapshot(&self) -> anyhow::Result<MemorySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorldMsg::Snapshot { reply })
            .map_err(|_| anyhow::anyhow!("world service is gone"))?;
        Ok(rx.await?)
    }

    pub fn subscribe_ui(&self) -> broadcast::Receiver<UiEvent> {
        self.ui.subscribe()
    }
}

/// Build the world, install the dictionaries and spawn the service thread.
pub fn spawn(config: ServiceConfig) -> anyhow::Result<WorldHandle> {
    let (tx, rx) = unbounded();
    let clock = Clock::new(config.interval_ms, tx.clone());
    let osc = OscClient::new(&config.osc_host, config.osc_port)?;
    let ui = UiSender::new(256);

    let world = World {
        memory: Memory2D::new(config.rows, config.cols),
        clock: clock.clone(),
        osc,
        ui: ui.clone(),
    };

    let state = State::initial();
    install_world_words(&state.dictionary);

    if config.start_clock {
        clock
            .start()
            .map_err(|e| anyhow::anyhow!("starting clock: {e}"))?;
    }

    thread::spawn(move || run(rx, world, state));

    Ok(WorldHandle { tx, ui })
}

fn run(rx: Receiver<WorldMsg>, mut world: World, mut state: State) {
    let mut stack = Stack::new();

    for msg in rx {
        match msg {
            WorldMsg::Eval { input, reply } => {
                let output = interpret(&input, &mut stack, &mut state, &mut world);
                let _ = reply.send(EvalOutcome {
                    output,
                    stack: stack.clone(),
                });
            }
            WorldMsg::Tick => tick(&mut world),
            WorldMsg::Snapshot { reply } => {
                let _ = reply.send(snapshot(&world.memory));
            }
        }
    }
}

/// Fire every head once, in insertion order.
///
/// Each head is detached from the list while it bangs, so the words its node
/// runs may freely rewire the grid, even drop or replace the head itself.
pub fn tick(world: &mut World) {
    for id in world.memory.hed_ids() {
        let epoch = world.memory.epoch();
        let Some((index, mut hed)) = world.memory.take_hed(&id) else {
            continue;
        };
        if let Err(e) = hed.bang(world) {
            tracing::error!("error during bang: head {id}: {e}");
        }
        world.memory.restore_hed(index, hed, epoch);
    }
}

/// Project the grid into the wire shape of the memory stream.
pub fn snapshot(memory: &Memory2D) -> MemorySnapshot {
    let current: Vec<Coord> = memory.heds().iter().filter_map(|h| h.current()).collect();

    let mut objects = Vec::new();
    for (at, nod) in memory.nods() {
        objects.push(MemoryObject {
            kind: ObjectKind::Nod,
            id: nod.id().to_string(),
            x: at.x,
            y: at.y,
            message: Some(nod.message().to_string()),
            connects_to_x: nod.next().map(|n| n.x),
            connects_to_y: nod.next().map(|n| n.y),
            is_current: current.contains(&at),
        });
    }
    for hed in memory.heds() {
        let at = hed
            .id()
            .split_once(',')
            .and_then(|(x, y)| Some(Coord::new(x.parse().ok()?, y.parse().ok()?)))
            .unwrap_or(Coord::new(0, 0));
        objects.push(MemoryObject {
            kind: ObjectKind::Hed,
            id: hed.id().to_string(),
            x: at.x,
            y: at.y,
            message: None,
            connects_to_x: hed.first().map(|f| f.x),
            connects_to_y: hed.first().map(|f| f.y),
            is_current: false,
        });
    }

    MemorySnapshot { objects }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::test_world;

    fn run_line(world: &mut World, input: &str) {
        let mut stack = Stack::new();
        let mut state = State::initial();
        install_world_words(&state.dictionary);
        let output = interpret(input, &mut stack, &mut state, world);
        assert!(output.is_empty(), "{output:?}");
    }

    #[test]
    fn snapshot_projects_nodes_and_heads() {
        let mut world = test_world();
        run_line(&mut world, "[ 1 2 ] 0 0 seq 0 0 5 5 1 hed");

        let snap = snapshot(&world.memory);
        assert_eq!(snap.objects.len(), 3);

        let first = &snap.objects[0];
        assert_eq!(first.kind, ObjectKind::Nod);
        assert_eq!(first.id, "0,0");
        assert_eq!(first.message.as_deref(), Some("1"));
        assert_eq!((first.connects_to_x, first.connects_to_y), (Some(1), Some(0)));
        // the head's current node
        assert!(first.is_current);

        let last = &snap.objects[1];
        assert_eq!((last.connects_to_x, last.connects_to_y), (None, None));

        let hed = &snap.objects[2];
        assert_eq!(hed.kind, ObjectKind::Hed);
        assert_eq!((hed.x, hed.y), (5, 5));
        assert_eq!((hed.connects_to_x, hed.connects_to_y), (Some(0), Some(0)));
        assert!(hed.message.is_none());
    }

    #[test]
    fn snapshot_serialises_wire_fields() {
        let mut world = test_world();
        run_line(&mut world, "[ 7 ] 0 0 seq");

        let json = serde_json::to_value(snapshot(&world.memory)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "objects": [{
                    "type": "nod",
                    "id": "0,0",
                    "x": 0,
                    "y": 0,
                    "message": "7",
                    "connectsToX": null,
                    "connectsToY": null,
                }]
            })
        );
    }

    #[test]
    fn tick_fires_started_heads_in_order() {
        let mut world = test_world();
        run_line(
            &mut world,
            "[ `\"a\" m-lg` ] 0 0 seq [ `\"b\" m-lg` ] 1 0 seq \
             0 0 5 0 1 hed 1 0 6 0 1 hed 5 0 start 6 0 start",
        );
        let mut rx = world.ui.subscribe();

        tick(&mut world);
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::Line { content: "a".to_string() }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::Line { content: "b".to_string() }
        );
    }

    #[test]
    fn tick_survives_head_errors() {
        let mut world = test_world();
        // head with no current node errors every tick but stays registered
        run_line(&mut world, "3 3 hed-new 3 3 1 hed-freq 3 3 start");

        tick(&mut world);
        tick(&mut world);
        assert_eq!(world.memory.heds().len(), 1);
    }

    #[test]
    fn node_may_clear_memory_mid_tick() {
        let mut world = test_world();
        run_line(&mut world, "[ `clear-memory` ] 0 0 seq 0 0 5 0 1 hed 5 0 start");

        tick(&mut world);
        assert_eq!(world.memory.nods().count(), 0);
        assert!(world.memory.heds().is_empty());
    }

    #[test]
    fn stopped_heads_do_not_fire() {
        let mut world = test_world();
        run_line(&mut world, "[ `\"a\" m-lg` ] 0 0 seq 0 0 5 0 1 hed");
        let mut rx = world.ui.subscribe();

        tick(&mut world);
        assert!(rx.try_recv().is_err());
    }
}
