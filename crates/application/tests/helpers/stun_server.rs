use ferrous_netdiag_domain::codec::stun;
use ferrous_netdiag_domain::{
    StunAttribute, StunAttributeType, StunMessage, StunMessageType, TransactionId,
};
use std::net::{SocketAddr, SocketAddrV4};

/// Scripted STUN server pair (primary address plus advertised alternate)
/// seen through a NAT with configurable filtering and mapping behaviour.
#[derive(Clone)]
pub struct StunServerSim {
    pub primary: SocketAddrV4,
    pub alternate: SocketAddrV4,
    /// Mapping observed by the primary address.
    pub mapped: SocketAddrV4,
    /// Mapping observed by the alternate address.
    pub mapped_at_alternate: SocketAddrV4,
    pub passes_change_ip_and_port: bool,
    pub passes_change_port: bool,
    pub advertises_alternate: bool,
    pub stray_reply_first: bool,
    pub error_reply: bool,
}

impl StunServerSim {
    pub fn new(mapped: SocketAddrV4) -> Self {
        Self {
            primary: "198.51.100.1:3478".parse().unwrap(),
            alternate: "198.51.100.2:3479".parse().unwrap(),
            mapped,
            mapped_at_alternate: mapped,
            passes_change_ip_and_port: false,
            passes_change_port: false,
            advertises_alternate: true,
            stray_reply_first: false,
            error_reply: false,
        }
    }

    pub fn primary_addr(&self) -> SocketAddr {
        SocketAddr::V4(self.primary)
    }

    pub fn respond(&self, bytes: &[u8], dest: SocketAddr) -> Vec<(Vec<u8>, SocketAddr)> {
        let SocketAddr::V4(dest) = dest else {
            return Vec::new();
        };
        if dest != self.primary && dest != self.alternate {
            return Vec::new();
        }
        let Ok(request) = stun::decode(bytes) else {
            return Vec::new();
        };

        let (change_ip, change_port) = request.change_request().unwrap_or((false, false));
        let passes = match (change_ip, change_port) {
            (false, false) => true,
            (true, _) => self.passes_change_ip_and_port,
            (false, true) => self.passes_change_port,
        };
        if !passes {
            return Vec::new();
        }

        let mut replies = Vec::new();
        if self.stray_reply_first {
            let stray = self.response(TransactionId([0xEE; 16]), dest);
            replies.push((stun::encode(&stray).unwrap(), SocketAddr::V4(dest)));
        }

        let reply = if self.error_reply {
            StunMessage::new(StunMessageType::BindingErrorResponse, request.transaction_id)
                .with_attribute(StunAttribute::new(
                    StunAttributeType::ErrorCode,
                    ferrous_netdiag_domain::AttributeValue::ErrorCode {
                        code: 400,
                        reason: "Bad Request".to_string(),
                    },
                ))
        } else {
            self.response(request.transaction_id, dest)
        };
        replies.push((stun::encode(&reply).unwrap(), SocketAddr::V4(dest)));
        replies
    }

    fn response(&self, id: TransactionId, dest: SocketAddrV4) -> StunMessage {
        let mapped = if dest == self.alternate {
            self.mapped_at_alternate
        } else {
            self.mapped
        };
        let mut message = StunMessage::new(StunMessageType::BindingResponse, id)
            .with_attribute(StunAttribute::endpoint(
                StunAttributeType::MappedAddress,
                mapped,
            ))
            .with_attribute(StunAttribute::endpoint(
                StunAttributeType::SourceAddress,
                dest,
            ));
        if self.advertises_alternate {
            message = message.with_attribute(StunAttribute::endpoint(
                StunAttributeType::ChangedAddress,
                self.alternate,
            ));
        }
        message
    }
}
