use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Packets seen by the broker, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    Connected,
    Subscribed(String),
    Published { topic: String, qos: u8, payload: Vec<u8> },
    Closed,
}

/// MQTT 3.1.1 broker on an ephemeral localhost port. It acknowledges every
/// packet and forwards nothing, so tests can observe what a client sends.
pub struct FakeBroker {
    port: u16,
    events: mpsc::UnboundedReceiver<BrokerEvent>,
    kick: watch::Sender<()>,
    acceptor: JoinHandle<()>,
}

impl FakeBroker {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (sender, events) = mpsc::unbounded_channel();
        let (kick, _) = watch::channel(());

        let acceptor = tokio::spawn({
            let kick = kick.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve(stream, sender.clone(), kick.subscribe()));
                }
            }
        });

        Self {
            port,
            events,
            kick,
            acceptor,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Close every open client socket. The listener keeps accepting.
    pub fn drop_connections(&self) {
        self.kick.send_replace(());
    }

    pub async fn next_event(&mut self, timeout: Duration) -> Option<BrokerEvent> {
        tokio::time::timeout(timeout, self.events.recv()).await.ok().flatten()
    }

    /// Skip other packets until a publish on `topic` arrives.
    pub async fn next_publish(&mut self, topic: &str, timeout: Duration) -> Option<(u8, Vec<u8>)> {
        let deadline = Instant::now() + timeout;

        loop {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(BrokerEvent::Published {
                    topic: published,
                    qos,
                    payload,
                })) if published == topic => return Some((qos, payload)),
                Ok(Some(_)) => continue,
                _ => return None,
            }
        }
    }

    /// Wait for the next CONNECT, then collect subscriptions until the client goes quiet.
    pub async fn session_subscriptions(&mut self, timeout: Duration) -> Option<Vec<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(BrokerEvent::Connected)) => break,
                Ok(Some(_)) => continue,
                _ => return None,
            }
        }

        let mut topics = Vec::new();
        while let Some(event) = self.next_event(Duration::from_millis(500)).await {
            match event {
                BrokerEvent::Subscribed(topic) => topics.push(topic),
                BrokerEvent::Closed => break,
                _ => {}
            }
        }

        Some(topics)
    }
}

impl Drop for FakeBroker {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn serve(mut stream: TcpStream, events: mpsc::UnboundedSender<BrokerEvent>, mut kick: watch::Receiver<()>) {
    kick.borrow_and_update();

    loop {
        let packet = tokio::select! {
            packet = read_packet(&mut stream) => packet,
            _ = kick.changed() => break,
        };

        let Ok((header, body)) = packet else {
            break;
        };

        let reply = match header >> 4 {
            1 => {
                let _ = events.send(BrokerEvent::Connected);
                vec![0x20, 2, 0, 0]
            }
            3 => {
                let qos = (header >> 1) & 0x03;
                let (topic, mut offset) = read_string(&body, 0);
                let mut reply = Vec::new();

                if qos > 0 {
                    let ack = if qos == 1 { 0x40 } else { 0x50 };
                    reply = vec![ack, 2, body[offset], body[offset + 1]];
                    offset += 2;
                }

                let _ = events.send(BrokerEvent::Published {
                    topic,
                    qos,
                    payload: body[offset..].to_vec(),
                });
                reply
            }
            6 => vec![0x70, 2, body[0], body[1]],
            8 => {
                let mut offset = 2;
                let mut granted = 0u8;

                while offset < body.len() {
                    let (topic, next) = read_string(&body, offset);
                    let _ = events.send(BrokerEvent::Subscribed(topic));
                    offset = next + 1;
                    granted += 1;
                }

                let mut reply = vec![0x90, 2 + granted, body[0], body[1]];
                reply.extend(std::iter::repeat_n(0x01, granted as usize));
                reply
            }
            10 => vec![0xB0, 2, body[0], body[1]],
            12 => vec![0xD0, 0],
            14 => break,
            _ => Vec::new(),
        };

        if !reply.is_empty() && stream.write_all(&reply).await.is_err() {
            break;
        }
    }

    let _ = events.send(BrokerEvent::Closed);
}

async fn read_packet(stream: &mut TcpStream) -> io::Result<(u8, Vec<u8>)> {
    let header = stream.read_u8().await?;

    let mut length = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await?;
        length |= ((byte & 0x7F) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let mut body = vec![0; length];
    stream.read_exact(&mut body).await?;

    Ok((header, body))
}

fn read_string(body: &[u8], offset: usize) -> (String, usize) {
    let length = u16::from_be_bytes([body[offset], body[offset + 1]]) as usize;
    let start = offset + 2;

    (
        String::from_utf8_lossy(&body[start..start + length]).into_owned(),
        start + length,
    )
}
