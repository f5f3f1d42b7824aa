use crate::ports::{DatagramTransport, TransportBinder};
use crate::use_cases::exchange::await_reply;
use ferrous_netdiag_domain::codec::stun;
use ferrous_netdiag_domain::{
    DomainError, NatType, StunAttribute, StunMessage, StunMessageType, StunResult, TransactionId,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs the classic RFC 3489 binding tests against one STUN server and
/// classifies the NAT in front of this host.
///
/// Every binding test uses a fresh transaction id and a single attempt
/// bounded by `timeout`. Servers are tried in order only until the first
/// one answers the initial test; the rest of the procedure stays with that
/// server and the alternate address it advertises.
pub struct ClassifyNatUseCase {
    binder: Arc<dyn TransportBinder>,
    servers: Vec<SocketAddr>,
    local_bind: SocketAddr,
    timeout: Duration,
}

struct BindingTest {
    change_ip: bool,
    change_port: bool,
}

impl BindingTest {
    const PLAIN: BindingTest = BindingTest {
        change_ip: false,
        change_port: false,
    };
    const CHANGE_IP_AND_PORT: BindingTest = BindingTest {
        change_ip: true,
        change_port: true,
    };
    const CHANGE_PORT: BindingTest = BindingTest {
        change_ip: false,
        change_port: true,
    };
}

impl ClassifyNatUseCase {
    pub fn new(
        binder: Arc<dyn TransportBinder>,
        servers: Vec<SocketAddr>,
        local_bind: SocketAddr,
        timeout: Duration,
    ) -> Self {
        Self {
            binder,
            servers,
            local_bind,
            timeout,
        }
    }

    /// Fails only when the local socket cannot be bound; every network
    /// outcome maps to a `NatType`.
    pub async fn execute(&self) -> Result<StunResult, DomainError> {
        let transport = self.binder.bind(self.local_bind).await?;
        let local = transport.local_addr()?;
        debug!(local = %local, servers = self.servers.len(), "Starting NAT classification");

        // Initial binding test, falling back across servers.
        let mut committed = None;
        for server in self.servers.iter().copied() {
            match self.run_test(transport.as_ref(), server, BindingTest::PLAIN).await {
                Some(response) => match response.mapped_address() {
                    Some(mapped) => {
                        committed = Some((server, response, SocketAddr::V4(mapped)));
                        break;
                    }
                    None => {
                        warn!(server = %server, "Binding response without a mapped address");
                    }
                },
                None => debug!(server = %server, "No answer to initial binding request"),
            }
        }

        let Some((server, first, public)) = committed else {
            info!("No STUN server answered; UDP appears blocked");
            return Ok(StunResult::blocked());
        };
        let changed = first.changed_address().map(SocketAddr::V4);
        debug!(
            server = %server,
            public = %public,
            changed = ?changed,
            "Initial binding test answered"
        );

        let classify = |nat_type: NatType| {
            info!(nat_type = %nat_type, public = %public, server = %server, "NAT classified");
            Ok(StunResult {
                nat_type,
                public_endpoint: Some(public),
                server: Some(server),
            })
        };

        let change_both = self
            .run_test(transport.as_ref(), server, BindingTest::CHANGE_IP_AND_PORT)
            .await;

        if public == local {
            return classify(if change_both.is_some() {
                NatType::OpenInternet
            } else {
                NatType::SymmetricUdpFirewall
            });
        }

        if change_both.is_some() {
            return classify(NatType::FullCone);
        }

        let Some(alternate) = changed else {
            warn!(server = %server, "Server advertised no alternate address; cannot continue");
            return classify(NatType::UdpBlocked);
        };

        let Some(second) = self
            .run_test(transport.as_ref(), alternate, BindingTest::PLAIN)
            .await
            .and_then(|r| r.mapped_address())
            .map(SocketAddr::V4)
        else {
            return classify(NatType::UdpBlocked);
        };

        if second != public {
            debug!(first = %public, second = %second, "Mapping differs per destination");
            return classify(NatType::Symmetric);
        }

        let change_port = self
            .run_test(transport.as_ref(), alternate, BindingTest::CHANGE_PORT)
            .await;
        classify(if change_port.is_some() {
            NatType::RestrictedCone
        } else {
            NatType::PortRestrictedCone
        })
    }

    /// One binding request/response round trip. Anything other than a
    /// matching BindingResponse before the deadline yields `None`.
    async fn run_test(
        &self,
        transport: &dyn DatagramTransport,
        server: SocketAddr,
        test: BindingTest,
    ) -> Option<StunMessage> {
        let transaction_id = TransactionId(std::array::from_fn(|_| fastrand::u8(..)));
        let mut request = StunMessage::binding_request(transaction_id);
        if test.change_ip || test.change_port {
            request = request.with_attribute(StunAttribute::change_request(
                test.change_ip,
                test.change_port,
            ));
        }

        let bytes = match stun::encode(&request) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode binding request");
                return None;
            }
        };
        if let Err(e) = transport.send_to(&bytes, server).await {
            debug!(server = %server, error = %e, "Failed to send binding request");
            return None;
        }

        let reply = await_reply(transport, self.timeout, |bytes, from| {
            let message = match stun::decode(&bytes) {
                Ok(message) => message,
                Err(e) => {
                    debug!(from = %from, error = %e, "Discarding undecodable STUN datagram");
                    return None;
                }
            };
            if message.transaction_id != transaction_id {
                debug!(
                    from = %from,
                    transaction_id = %message.transaction_id,
                    "Discarding response to another transaction"
                );
                return None;
            }
            match message.message_type {
                StunMessageType::BindingResponse | StunMessageType::BindingErrorResponse => {
                    Some(message)
                }
                _ => None,
            }
        })
        .await;

        match reply {
            Ok(message) if message.message_type == StunMessageType::BindingResponse => {
                Some(message)
            }
            Ok(message) => {
                let (code, reason) = message.error_code().unwrap_or((0, ""));
                warn!(server = %server, code, reason, "Binding error response");
                None
            }
            Err(e) => {
                debug!(
                    server = %server,
                    change_ip = test.change_ip,
                    change_port = test.change_port,
                    error = %e,
                    "No usable binding response"
                );
                None
            }
        }
    }
}
