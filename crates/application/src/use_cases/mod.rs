pub mod dns;
mod exchange;
pub mod stun;

pub use dns::HandleDnsQueryUseCase;
pub use stun::ClassifyNatUseCase;
