//! trellis is a live-coding runtime: a stack interpreter wired to a 2D grid
//! of message-carrying nodes, walked by clock-driven heads.
//!
//! The [`forth`] module is the interpreter, [`world`] the spatial execution
//! graph, [`events`] the outbound emitters, and [`service`] the
//! single-threaded owner that serialises evaluations against clock ticks.

pub mod events;
pub mod forth;
pub mod service;
pub mod world;
