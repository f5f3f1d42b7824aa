use async_trait::async_trait;
use ferrous_netdiag_application::ports::{DatagramTransport, TransportBinder};
use ferrous_netdiag_domain::DomainError;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&[u8], SocketAddr) -> Vec<(Vec<u8>, SocketAddr)> + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub dest: SocketAddr,
    pub bytes: Vec<u8>,
}

/// In-process stand-in for the network. Every datagram sent through a
/// transport it binds is passed to the responder, whose replies are queued
/// on that same transport. An empty queue reads as a timeout.
#[derive(Clone)]
pub struct MockNetwork {
    responder: Arc<Responder>,
    local_addr: SocketAddr,
    sends: Arc<Mutex<Vec<SentDatagram>>>,
    binds: Arc<Mutex<Vec<SocketAddr>>>,
}

impl MockNetwork {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[u8], SocketAddr) -> Vec<(Vec<u8>, SocketAddr)> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            local_addr: "192.168.1.10:50000".parse().unwrap(),
            sends: Arc::new(Mutex::new(Vec::new())),
            binds: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn silent() -> Self {
        Self::new(|_, _| Vec::new())
    }

    pub fn with_local_addr(mut self, local_addr: SocketAddr) -> Self {
        self.local_addr = local_addr;
        self
    }

    pub fn sends(&self) -> Vec<SentDatagram> {
        self.sends.lock().unwrap().clone()
    }

    pub fn destinations(&self) -> Vec<SocketAddr> {
        self.sends().into_iter().map(|s| s.dest).collect()
    }

    pub fn bind_count(&self) -> usize {
        self.binds.lock().unwrap().len()
    }
}

pub struct MockTransport {
    network: MockNetwork,
    inbox: Mutex<VecDeque<(Vec<u8>, SocketAddr)>>,
}

#[async_trait]
impl DatagramTransport for MockTransport {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), DomainError> {
        self.network.sends.lock().unwrap().push(SentDatagram {
            dest,
            bytes: bytes.to_vec(),
        });
        let replies = (self.network.responder)(bytes, dest);
        self.inbox.lock().unwrap().extend(replies);
        Ok(())
    }

    async fn recv_timeout(&self, _timeout: Duration) -> Result<(Vec<u8>, SocketAddr), DomainError> {
        self.inbox
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(DomainError::NoResponse)
    }

    fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        Ok(self.network.local_addr)
    }
}

#[async_trait]
impl TransportBinder for MockNetwork {
    async fn bind(&self, local: SocketAddr) -> Result<Box<dyn DatagramTransport>, DomainError> {
        self.binds.lock().unwrap().push(local);
        Ok(Box::new(MockTransport {
            network: self.clone(),
            inbox: Mutex::new(VecDeque::new()),
        }))
    }
}
