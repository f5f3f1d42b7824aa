mod dns;
mod stun;

pub use dns::DnsServices;
pub use stun::StunServices;

use std::time::Duration;

/// Upper bound on a single hostname lookup while wiring endpoints.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);
