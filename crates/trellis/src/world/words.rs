//! Dictionary words that create and wire nodes, heads and sequences,
//! control the clock, and emit outbound events.
//!
//! Failures come back as `Error: …` output lines; the interpreter keeps
//! going and a head bang escalates them to the clock's error log.

use rand::Rng;

use crate::events::UiEvent;
use crate::forth::value::{pop_array, pop_int, pop_number, pop_text, Stack, Value};
use crate::forth::{interpret, Dictionary, Output, State, Word};

use super::head::Hed;
use super::node::{Nod, DEFAULT_MESSAGE};
use super::{Coord, World};

pub fn install_world_words(dictionary: &Dictionary) {
    dictionary.insert("random", Word::Builtin(w_random));
    dictionary.insert("print-memory", Word::Builtin(w_print_memory));
    dictionary.insert("start-clock", Word::Builtin(w_start_clock));
    dictionary.insert("stop-clock", Word::Builtin(w_stop_clock));
    dictionary.insert("m-osc", Word::Builtin(w_m_osc));
    dictionary.insert("m-lg", Word::Builtin(w_m_lg));
    dictionary.insert("m-hg", Word::Builtin(w_m_hg));
    dictionary.insert("seq", Word::Builtin(w_seq));
    dictionary.insert("qs", Word::Builtin(w_qs));
    dictionary.insert("qs-m", Word::Builtin(w_qs_m));
    dictionary.insert("qsm", Word::Builtin(w_qsm));
    dictionary.insert("qs-lg", Word::Builtin(w_qs_lg));
    dictionary.insert("qs-hg", Word::Builtin(w_qs_hg));
    dictionary.insert("stitch", Word::Builtin(w_stitch));
    dictionary.insert("hydra", Word::Builtin(w_hydra));
    dictionary.insert("maybe", Word::Builtin(w_maybe));
    dictionary.insert("one-of", Word::Builtin(w_one_of));
    dictionary.insert("_", Word::Builtin(w_noop));
    dictionary.insert("nod", Word::Builtin(w_nod));
    dictionary.insert("point", Word::Builtin(w_point));
    dictionary.insert("r-m", Word::Builtin(w_r_m));
    dictionary.insert("hed", Word::Builtin(w_hed));
    dictionary.insert("hed-new", Word::Builtin(w_hed_new));
    dictionary.insert("hed-first", Word::Builtin(w_hed_first));
    dictionary.insert("hed-last", Word::Builtin(w_hed_last));
    dictionary.insert("hed-wrap", Word::Builtin(w_hed_wrap));
    dictionary.insert("hed-wrapped", Word::Builtin(w_hed_wrapped));
    dictionary.insert("hed-loop", Word::Builtin(w_hed_loop));
    dictionary.insert("hed-freq", Word::Builtin(w_hed_freq));
    dictionary.insert("mod", Word::Builtin(w_hed_wrap));
    dictionary.insert("start", Word::Builtin(w_start));
    dictionary.insert("stop", Word::Builtin(w_stop));
    dictionary.insert("clear-memory", Word::Builtin(w_clear_memory));
}

fn err(e: String) -> String {
    format!("Error: {e}")
}

fn push_yx(stack: &mut Stack, y: i64, x: i64) {
    stack.push(Value::Number(y as f64));
    stack.push(Value::Number(x as f64));
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Text(s) | Value::Symbol(s) => s.clone(),
        Value::Number(n) => format!("{n}"),
        other => crate::forth::value::format_value(other),
    }
}

// ( -- n ) uniform double in [0,1)
fn w_random(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    stack.push(Value::Number(rand::thread_rng().gen::<f64>()));
    Ok(Output::new())
}

// ( -- ) one-line population summary
fn w_print_memory(world: &mut World, _stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let nods = world.memory.nods().count();
    let heds = world.memory.heds().len();
    let (rows, cols) = world.memory.dimensions();
    tracing::debug!("memory {rows}x{cols}: {nods} nods, {heds} heds");
    Ok(vec![format!("memory: {nods} nods, {heds} heds")])
}

fn w_start_clock(world: &mut World, _stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    world
        .clock
        .start()
        .map_err(|e| format!("Error starting clock: {e}"))?;
    Ok(Output::new())
}

fn w_stop_clock(world: &mut World, _stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    world
        .clock
        .stop()
        .map_err(|e| format!("Error stopping clock: {e}"))?;
    Ok(Output::new())
}

// ( n address -- ) one OSC datagram to /<address> with a single f32
fn w_m_osc(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    if stack.len() < 2 {
        return Err("Error: stack underflow".to_string());
    }
    let address = pop_text(stack).map_err(err)?;
    let value = pop_number(stack).map_err(err)?;
    world.osc.send(&address, value as f32);
    Ok(Output::new())
}

// ( text -- ) line-graphics UI event
fn w_m_lg(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let content = pop_text(stack).map_err(err)?;
    world.ui.send(UiEvent::Line { content });
    Ok(Output::new())
}

// ( text -- ) hydra-graphics UI event
fn w_m_hg(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let content = pop_text(stack).map_err(err)?;
    world.ui.send(UiEvent::Hydra { content });
    Ok(Output::new())
}

// ( array y x -- y x ) horizontal chain of nodes, element i at (x+i, y)
fn w_seq(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;
    let items = pop_array(stack).map_err(err)?;

    let mut nods = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let at = Coord::new(x + i as i64, y);
        let mut nod = Nod::new(at.to_string(), stringify(item))
            .map_err(|e| format!("error creating node: {e}"))?;
        if i + 1 < items.len() {
            nod.set_next(Some(Coord::new(x + i as i64 + 1, y)));
        }
        nods.push((at, nod));
    }

    for (at, nod) in nods {
        world
            .memory
            .add_nod(at, nod)
            .map_err(|e| format!("error adding node: {e}"))?;
    }

    push_yx(stack, y, x);
    Ok(Output::new())
}

// ( array every y x -- y x ) sequence at x+1 with a bare head at x
fn w_qs(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;
    let every = pop_number(stack).map_err(err)?;
    let items = pop_array(stack).map_err(|e| format!("Error getting array: {e}"))?;

    stack.push(Value::Array(items));
    push_yx(stack, y, x + 1);

    Ok(interpret(
        &format!("seq {y} {x} {every} hed"),
        stack,
        state,
        world,
    ))
}

// ( array address every y x -- y x ) sequence plus an OSC-sending head
fn w_qs_m(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;
    let every = pop_number(stack).map_err(err)?;
    let address = pop_text(stack).map_err(err)?;
    let items = pop_array(stack).map_err(|e| format!("Error getting array: {e}"))?;

    stack.push(Value::Array(items));
    push_yx(stack, y, x + 1);

    let modifier = format!("\"{address}\" m-osc");
    Ok(interpret(
        &format!("seq {y} {x} `{modifier}` {every} hed-wrapped"),
        stack,
        state,
        world,
    ))
}

// deprecated spelling of qs-m
fn w_qsm(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    Ok(interpret("qs-m", stack, state, world))
}

// ( array every y x -- y x ) sequence plus a line-graphics head
fn w_qs_lg(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;
    let every = pop_number(stack).map_err(err)?;
    let items = pop_array(stack).map_err(|e| format!("Error getting array: {e}"))?;

    stack.push(Value::Array(items));
    push_yx(stack, y, x + 1);

    Ok(interpret(
        &format!("seq {y} {x} `m-lg` {every} hed-wrapped"),
        stack,
        state,
        world,
    ))
}

// ( array every y x -- y x ) sequence plus a hydra-graphics head
fn w_qs_hg(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;
    let every = pop_number(stack).map_err(err)?;
    let items = pop_array(stack).map_err(|e| format!("Error getting array: {e}"))?;

    stack.push(Value::Array(items));
    push_yx(stack, y, x + 1);

    Ok(interpret(
        &format!("seq {y} {x} `m-hg` {every} hed-wrapped"),
        stack,
        state,
        world,
    ))
}

// ( array -- text ) join text elements with '.'
fn w_stitch(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let items = pop_array(stack).map_err(err)?;
    let joined = items
        .iter()
        .filter_map(|item| match item {
            Value::Text(s) | Value::Symbol(s) => Some(s.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".");
    stack.push(Value::Text(joined));
    Ok(Output::new())
}

// ( array -- ) stitch and send as a hydra event
fn w_hydra(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    Ok(interpret("stitch m-hg", stack, state, world))
}

// ( text p -- … ) run text with probability p
fn w_maybe(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    if stack.len() < 2 {
        return Err("Error: stack underflow".to_string());
    }
    let probability = pop_number(stack).map_err(err)?;
    let message = pop_text(stack).map_err(err)?;

    if rand::thread_rng().gen::<f64>() < probability {
        return Ok(interpret(&message, stack, state, world));
    }
    Ok(Output::new())
}

// ( t2 t1 p -- … ) run t1 with probability p, otherwise t2
fn w_one_of(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    if stack.len() < 3 {
        return Err("Error: stack underflow".to_string());
    }
    let probability = pop_number(stack).map_err(err)?;
    let first = pop_text(stack).map_err(err)?;
    let second = pop_text(stack).map_err(err)?;

    if rand::thread_rng().gen::<f64>() < probability {
        return Ok(interpret(&first, stack, state, world));
    }
    Ok(interpret(&second, stack, state, world))
}

fn w_noop(_world: &mut World, _stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    Ok(Output::new())
}

// ( ny nx tY tX -- tY tX ) node at (nx,ny) pointing at the node at (tX,tY)
fn w_nod(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let next_x = pop_int(stack).map_err(err)?;
    let next_y = pop_int(stack).map_err(err)?;
    let nod_x = pop_int(stack).map_err(err)?;
    let nod_y = pop_int(stack).map_err(err)?;

    let next = Coord::new(next_x, next_y);
    world
        .memory
        .get_nod(next)
        .map_err(|e| format!("Error fetching destNod: {e}"))?;

    let at = Coord::new(nod_x, nod_y);
    let mut nod = Nod::new(at.to_string(), DEFAULT_MESSAGE).map_err(err)?;
    nod.set_next(Some(next));
    world
        .memory
        .add_nod(at, nod)
        .map_err(|e| format!("Error adding nod: {e}"))?;

    push_yx(stack, next_y, next_x);
    Ok(Output::new())
}

// ( y1 x1 y2 x2 -- y2 x2 ) link two nodes; same coordinates clear the link
fn w_point(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let x2 = pop_int(stack).map_err(err)?;
    let y2 = pop_int(stack).map_err(err)?;
    let x1 = pop_int(stack).map_err(err)?;
    let y1 = pop_int(stack).map_err(err)?;

    let from = Coord::new(x1, y1);
    let to = Coord::new(x2, y2);
    world
        .memory
        .get_nod(to)
        .map_err(|e| format!("Error getting nod: {e}"))?;
    let nod = world
        .memory
        .get_nod_mut(from)
        .map_err(|e| format!("Error getting nod: {e}"))?;

    nod.set_next(if from == to { None } else { Some(to) });

    push_yx(stack, y2, x2);
    Ok(Output::new())
}

// ( y x text -- y x ) rewrite a node's message
fn w_r_m(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let message = pop_text(stack).map_err(err)?;
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;

    let nod = world
        .memory
        .get_nod_mut(Coord::new(x, y))
        .map_err(|e| format!("Error getting nod: {e}"))?;
    nod.set_message(message);

    push_yx(stack, y, x);
    Ok(Output::new())
}

// ( nY nX dY dX every -- dY dX ) head at (dX,dY) walking from (nX,nY)
fn w_hed(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let every = pop_int(stack).map_err(err)?;
    let dest_x = pop_int(stack).map_err(err)?;
    let dest_y = pop_int(stack).map_err(err)?;
    let nod_x = pop_int(stack).map_err(err)?;
    let nod_y = pop_int(stack).map_err(err)?;

    if every < 1 {
        return Err("Error: every must be a positive integer".to_string());
    }
    let first = Coord::new(nod_x, nod_y);
    world
        .memory
        .get_nod(first)
        .map_err(|e| format!("Error getting nod: {e}"))?;

    let dest = Coord::new(dest_x, dest_y);
    let hed = Hed::new(
        dest.to_string(),
        Some(first),
        None,
        every as u64,
        "",
        state.clone(),
    )
    .map_err(|e| format!("Error creating hed: {e}"))?;
    world
        .memory
        .add_hed(dest, hed)
        .map_err(|e| format!("Error adding head: {e}"))?;

    push_yx(stack, dest_y, dest_x);
    Ok(Output::new())
}

// ( y x -- y x ) bare head, every=4, no chain yet
fn w_hed_new(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let dest_x = pop_int(stack).map_err(err)?;
    let dest_y = pop_int(stack).map_err(err)?;

    let dest = Coord::new(dest_x, dest_y);
    let hed = Hed::new(dest.to_string(), None, None, 4, "", state.clone())
        .map_err(|e| format!("Error creating hed: {e}"))?;
    world
        .memory
        .add_hed(dest, hed)
        .map_err(|e| format!("Error adding head: {e}"))?;

    push_yx(stack, dest_y, dest_x);
    Ok(Output::new())
}

// ( hY hX fY fX -- hY hX ) point a head's first and current at a node
fn w_hed_first(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let first_x = pop_int(stack).map_err(err)?;
    let first_y = pop_int(stack).map_err(err)?;
    let hed_x = pop_int(stack).map_err(err)?;
    let hed_y = pop_int(stack).map_err(err)?;

    let first = Coord::new(first_x, first_y);
    world
        .memory
        .get_nod(first)
        .map_err(|e| format!("Error fetching nod: {e}"))?;
    let hed = world
        .memory
        .get_hed_mut(Coord::new(hed_x, hed_y))
        .map_err(|e| format!("Error fetching hed: {e}"))?;
    hed.set_first(first);

    push_yx(stack, hed_y, hed_x);
    Ok(Output::new())
}

// ( hY hX lY lX -- hY hX ) set a head's last node
fn w_hed_last(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let last_x = pop_int(stack).map_err(err)?;
    let last_y = pop_int(stack).map_err(err)?;
    let hed_x = pop_int(stack).map_err(err)?;
    let hed_y = pop_int(stack).map_err(err)?;

    let last = Coord::new(last_x, last_y);
    world
        .memory
        .get_nod(last)
        .map_err(|e| format!("Error fetching nod: {e}"))?;
    let hed = world
        .memory
        .get_hed_mut(Coord::new(hed_x, hed_y))
        .map_err(|e| format!("Error fetching hed: {e}"))?;
    hed.set_last(last);

    push_yx(stack, hed_y, hed_x);
    Ok(Output::new())
}

// ( y x text -- y x ) replace a head's modifier; "0" clears it
fn w_hed_wrap(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let wrapper = pop_text(stack).map_err(err)?;
    let hed_x = pop_int(stack).map_err(err)?;
    let hed_y = pop_int(stack).map_err(err)?;

    let hed = world
        .memory
        .get_hed_mut(Coord::new(hed_x, hed_y))
        .map_err(|e| format!("Error getting hed: {e}"))?;
    if wrapper == "0" {
        hed.set_modifier("");
    } else {
        hed.set_modifier(wrapper);
    }

    push_yx(stack, hed_y, hed_x);
    Ok(Output::new())
}

// ( nY nX dY dX wrapper every -- dY dX ) head with a modifier preset
fn w_hed_wrapped(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let every = pop_int(stack).map_err(err)?;
    let wrapper = pop_text(stack).map_err(err)?;
    let dest_x = pop_int(stack).map_err(err)?;
    let dest_y = pop_int(stack).map_err(err)?;
    let nod_x = pop_int(stack).map_err(err)?;
    let nod_y = pop_int(stack).map_err(err)?;

    if every < 1 {
        return Err("Error: every must be a positive integer".to_string());
    }
    let first = Coord::new(nod_x, nod_y);
    world
        .memory
        .get_nod(first)
        .map_err(|e| format!("Error getting nod: {e}"))?;

    let dest = Coord::new(dest_x, dest_y);
    let hed = Hed::new(
        dest.to_string(),
        Some(first),
        None,
        every as u64,
        wrapper,
        state.clone(),
    )
    .map_err(|e| format!("Error creating hed: {e}"))?;
    world
        .memory
        .add_hed(dest, hed)
        .map_err(|e| format!("Error adding head: {e}"))?;

    push_yx(stack, dest_y, dest_x);
    Ok(Output::new())
}

// ( hY hX fY fX lY lX address every -- hY hX ) windowed head sending OSC
fn w_hed_loop(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let every = pop_int(stack).map_err(err)?;
    let address = pop_text(stack).map_err(err)?;
    let last_x = pop_int(stack).map_err(err)?;
    let last_y = pop_int(stack).map_err(err)?;
    let first_x = pop_int(stack).map_err(err)?;
    let first_y = pop_int(stack).map_err(err)?;
    let hed_x = pop_int(stack).map_err(err)?;
    let hed_y = pop_int(stack).map_err(err)?;

    if every < 1 {
        return Err("Error: every must be a positive integer".to_string());
    }
    let first = Coord::new(first_x, first_y);
    let last = Coord::new(last_x, last_y);
    world
        .memory
        .get_nod(first)
        .map_err(|e| format!("Error getting nod: {e}"))?;
    world
        .memory
        .get_nod(last)
        .map_err(|e| format!("Error getting nod: {e}"))?;

    let at = Coord::new(hed_x, hed_y);
    let hed = Hed::new(
        at.to_string(),
        Some(first),
        Some(last),
        every as u64,
        format!("\"{address}\" m-osc"),
        state.clone(),
    )
    .map_err(|e| format!("Error creating hed: {e}"))?;
    world
        .memory
        .add_hed(at, hed)
        .map_err(|e| format!("Error adding head: {e}"))?;

    push_yx(stack, hed_y, hed_x);
    Ok(Output::new())
}

// ( y x n -- y x ) change a head's firing period
fn w_hed_freq(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let freq = pop_number(stack).map_err(err)?;
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;

    if (freq as i64) < 1 {
        return Err("Error: every must be a positive integer".to_string());
    }
    let hed = world
        .memory
        .get_hed_mut(Coord::new(x, y))
        .map_err(|e| format!("Error getting head: {e}"))?;
    hed.set_every(freq as u64);

    push_yx(stack, y, x);
    Ok(Output::new())
}

// ( y x -- y x ) wake a head
fn w_start(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;

    let hed = world
        .memory
        .get_hed_mut(Coord::new(x, y))
        .map_err(|e| format!("Error getting head: {e}"))?;
    hed.start();

    push_yx(stack, y, x);
    Ok(Output::new())
}

// ( y x -- y x ) halt a head
fn w_stop(world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let x = pop_int(stack).map_err(err)?;
    let y = pop_int(stack).map_err(err)?;

    let hed = world
        .memory
        .get_hed_mut(Coord::new(x, y))
        .map_err(|e| format!("Error getting head: {e}"))?;
    hed.stop();

    push_yx(stack, y, x);
    Ok(Output::new())
}

// ( -- ) wipe the grid and drop every head
fn w_clear_memory(world: &mut World, _stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    world.memory.clear();
    Ok(Output::new())
}
