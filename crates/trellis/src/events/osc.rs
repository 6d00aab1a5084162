//! OSC egress.
//!
//! Fire-and-forget UDP datagrams to a single client. Send failures are
//! logged and swallowed so they can never surface inside the interpreter.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use anyhow::Context;
use rosc::{encoder, OscMessage, OscPacket, OscType};

#[derive(Clone)]
pub struct OscClient {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
}

impl OscClient {
    pub fn new(host: &str, port: u16) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("binding OSC socket")?;
        let target = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("resolving OSC target {host}:{port}"))?
            .next()
            .with_context(|| format!("OSC target {host}:{port} resolved to nothing"))?;
        Ok(Self {
            socket: Arc::new(socket),
            target,
        })
    }

    /// Send one message to `/<address>` carrying a single 32-bit float.
    pub fn send(&self, address: &str, value: f32) {
        let packet = OscPacket::Message(OscMessage {
            addr: format!("/{address}"),
            args: vec![OscType::Float(value)],
        });
        match encoder::encode(&packet) {
            Ok(bytes) => {
                if let Err(e) = self.socket.send_to(&bytes, self.target) {
                    tracing::warn!("OSC send to {} failed: {e}", self.target);
                }
            }
            Err(e) => tracing::warn!("OSC encoding failed for /{address}: {e:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn emits_one_decodable_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let client = OscClient::new("127.0.0.1", port).unwrap();
        client.send("freq", 440.0);

        let mut buf = [0u8; rosc::decoder::MTU];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();

        let OscPacket::Message(msg) = packet else {
            panic!("expected a message packet");
        };
        assert_eq!(msg.addr, "/freq");
        assert_eq!(msg.args, vec![OscType::Float(440.0)]);
    }
}
