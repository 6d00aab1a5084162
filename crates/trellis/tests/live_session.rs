//! Full-runtime sessions: service thread, clock, OSC egress and snapshots.

use std::net::UdpSocket;
use std::time::Duration;

use rosc::{OscPacket, OscType};
use trellis::service::{spawn, ObjectKind, ServiceConfig, WorldHandle};

fn osc_receiver() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

fn live_handle(osc_port: u16, interval_ms: u64) -> WorldHandle {
    spawn(ServiceConfig {
        interval_ms,
        osc_host: "127.0.0.1".to_string(),
        osc_port,
        start_clock: false,
        ..ServiceConfig::default()
    })
    .unwrap()
}

fn recv_float(socket: &UdpSocket) -> (String, f32) {
    let mut buf = [0u8; rosc::decoder::MTU];
    let (len, _) = socket.recv_from(&mut buf).unwrap();
    let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();
    let OscPacket::Message(msg) = packet else {
        panic!("expected an OSC message");
    };
    let OscType::Float(value) = msg.args[0] else {
        panic!("expected a float argument");
    };
    (msg.addr, value)
}

#[tokio::test]
async fn evaluate_mutates_global_session() {
    let (_socket, port) = osc_receiver();
    let handle = live_handle(port, 1000);

    let outcome = handle.evaluate("3 4 + .").await.unwrap();
    assert_eq!(outcome.output, vec!["7"]);
    assert!(outcome.stack.is_empty());

    handle.evaluate(": bump 1 + ;").await.unwrap();
    let outcome = handle.evaluate("41 bump .").await.unwrap();
    assert_eq!(outcome.output, vec!["42"]);
}

#[tokio::test]
async fn sequence_head_emits_osc_in_order() {
    let (socket, port) = osc_receiver();
    let handle = live_handle(port, 10);

    let outcome = handle
        .evaluate(r#"[ `1 "freq" m-osc` `2 "freq" m-osc` `_` ] 0 0 seq"#)
        .await
        .unwrap();
    assert!(outcome.output.is_empty(), "{:?}", outcome.output);

    handle.evaluate("0 0 0 0 2 hed").await.unwrap();
    handle.evaluate("0 0 start").await.unwrap();
    let outcome = handle.evaluate("start-clock").await.unwrap();
    assert!(outcome.output.is_empty(), "{:?}", outcome.output);

    // the `_` cell contributes nothing, so the stream is 1 2 1 2 …
    let (addr, first) = recv_float(&socket);
    assert_eq!(addr, "/freq");
    assert_eq!(first, 1.0);

    let (_, second) = recv_float(&socket);
    assert_eq!(second, 2.0);

    let (_, wrapped) = recv_float(&socket);
    assert_eq!(wrapped, 1.0);

    handle.evaluate("stop-clock").await.unwrap();
}

#[tokio::test]
async fn ui_events_reach_subscribers() {
    let (_socket, port) = osc_receiver();
    let handle = live_handle(port, 1000);
    let mut rx = handle.subscribe_ui();

    handle.evaluate("`osc(10).out()` m-hg").await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        serde_json::json!({"type": "hydra", "content": "osc(10).out()"})
    );
}

#[tokio::test]
async fn snapshot_reflects_grid_then_clears() {
    let (_socket, port) = osc_receiver();
    let handle = live_handle(port, 1000);

    handle.evaluate("[ 1 2 3 ] 0 0 seq").await.unwrap();
    handle.evaluate("0 0 9 9 4 hed").await.unwrap();

    let snap = handle.snapshot().await.unwrap();
    let nods = snap
        .objects
        .iter()
        .filter(|o| o.kind == ObjectKind::Nod)
        .count();
    let heds = snap
        .objects
        .iter()
        .filter(|o| o.kind == ObjectKind::Hed)
        .count();
    assert_eq!((nods, heds), (3, 1));

    handle.evaluate("clear-memory").await.unwrap();
    let snap = handle.snapshot().await.unwrap();
    assert!(snap.objects.is_empty());
}

#[tokio::test]
async fn head_every_respects_clock_ticks() {
    let (socket, port) = osc_receiver();
    let handle = live_handle(port, 10);

    // single self-looping cell, fires every 4th tick
    handle
        .evaluate(r#"[ `5 "tick" m-osc` ] 0 0 seq"#)
        .await
        .unwrap();
    handle.evaluate("0 0 1 0 4 hed").await.unwrap();
    handle.evaluate("1 0 start start-clock").await.unwrap();

    let (addr, value) = recv_float(&socket);
    assert_eq!(addr, "/tick");
    assert_eq!(value, 5.0);

    handle.evaluate("stop-clock").await.unwrap();
}

#[tokio::test]
async fn errors_come_back_as_output_lines() {
    let (_socket, port) = osc_receiver();
    let handle = live_handle(port, 1000);

    let outcome = handle.evaluate("no-such-word").await.unwrap();
    assert_eq!(outcome.output, vec!["Unknown word: no-such-word"]);

    let outcome = handle.evaluate("5 5 start").await.unwrap();
    assert_eq!(outcome.output.len(), 1);
    assert!(
        outcome.output[0].starts_with("Error getting head:"),
        "{}",
        outcome.output[0]
    );
}
