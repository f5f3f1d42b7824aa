use ferrous_netdiag_domain::codec::dns;
use ferrous_netdiag_domain::{DnsMessage, DnsRecord};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy)]
pub enum UpstreamBehaviour {
    /// Answers every A query with this address and a 60 s TTL.
    Answer(Ipv4Addr),
    /// Echoes the id and then sends bytes that do not decode.
    Garbage,
    /// Counts queries but never answers.
    Silent,
}

/// Loopback UDP resolver for proxy tests.
pub struct MockUpstream {
    addr: SocketAddr,
    queries: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockUpstream {
    pub async fn start(behaviour: UpstreamBehaviour) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let queries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&queries);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            counter.fetch_add(1, Ordering::SeqCst);
                            if let Some(response) = Self::build_response(behaviour, &buf[..len]) {
                                let _ = socket.send_to(&response, peer).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            queries,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn build_response(behaviour: UpstreamBehaviour, query: &[u8]) -> Option<Vec<u8>> {
        match behaviour {
            UpstreamBehaviour::Silent => None,
            UpstreamBehaviour::Garbage => {
                let mut bytes = query.get(0..2)?.to_vec();
                bytes.extend_from_slice(&[0x81, 0x80, 0xff, 0xff]);
                Some(bytes)
            }
            UpstreamBehaviour::Answer(ip) => {
                let query = dns::decode(query).ok()?;
                let name = query.first_question()?.name.clone();
                let response = DnsMessage::response_to(&query).with_answer(DnsRecord::a(name, 60, ip));
                dns::encode(&response).ok()
            }
        }
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
