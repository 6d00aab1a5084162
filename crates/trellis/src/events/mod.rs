//! Outbound event emitters: OSC datagrams and the UI event channel.

pub mod osc;
pub mod ui;

pub use osc::OscClient;
pub use ui::{UiEvent, UiSender};
