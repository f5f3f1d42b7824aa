#![allow(dead_code)]
pub mod upstream_mock;

pub use upstream_mock::{MockUpstream, UpstreamBehaviour};
