use ferrous_netdiag_application::ports::DnsCachePort;
use ferrous_netdiag_application::HandleDnsQueryUseCase;
use ferrous_netdiag_domain::codec::dns;
use ferrous_netdiag_domain::{DnsMessage, RecordType};
use ferrous_netdiag_infrastructure::{
    DnsCache, DnsProxyServer, MalformedReplyDumper, UdpTransportBinder,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::{MockUpstream, UpstreamBehaviour};

struct RunningProxy {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

async fn start_proxy(use_case: HandleDnsQueryUseCase) -> RunningProxy {
    let server = DnsProxyServer::bind("127.0.0.1:0".parse().unwrap(), Arc::new(use_case))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let task = tokio::spawn(async move {
        server.run(token).await.unwrap();
    });
    RunningProxy {
        addr,
        shutdown,
        task,
    }
}

fn use_case(upstreams: Vec<SocketAddr>, timeout_ms: u64) -> HandleDnsQueryUseCase {
    HandleDnsQueryUseCase::new(
        Arc::new(UdpTransportBinder),
        upstreams,
        Duration::from_millis(timeout_ms),
    )
}

async fn ask(proxy: SocketAddr, id: u16, name: &str) -> Option<DnsMessage> {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let query = dns::encode(&DnsMessage::query(id, name, RecordType::A)).unwrap();
    client.send_to(&query, proxy).await.unwrap();

    let mut buf = vec![0u8; 4096];
    let (len, _) = tokio::time::timeout(Duration::from_secs(3), client.recv_from(&mut buf))
        .await
        .ok()?
        .ok()?;
    Some(dns::decode(&buf[..len]).unwrap())
}

#[tokio::test]
async fn test_proxy_relays_answer_with_client_id() {
    let upstream = MockUpstream::start(UpstreamBehaviour::Answer(Ipv4Addr::new(192, 0, 2, 7)))
        .await
        .unwrap();
    let proxy = start_proxy(use_case(vec![upstream.addr()], 1000)).await;

    let response = ask(proxy.addr, 0xBEEF, "relay.test").await.unwrap();

    assert_eq!(response.id(), 0xBEEF);
    assert!(response.is_response());
    assert_eq!(
        response.answers[0].data.as_ipv4(),
        Some(Ipv4Addr::new(192, 0, 2, 7))
    );
    assert_eq!(upstream.queries(), 1);

    proxy.shutdown.cancel();
    proxy.task.await.unwrap();
}

#[tokio::test]
async fn test_proxy_fails_over_to_second_upstream() {
    let silent = MockUpstream::start(UpstreamBehaviour::Silent).await.unwrap();
    let answering = MockUpstream::start(UpstreamBehaviour::Answer(Ipv4Addr::new(198, 51, 100, 1)))
        .await
        .unwrap();
    let proxy = start_proxy(use_case(vec![silent.addr(), answering.addr()], 200)).await;

    let response = ask(proxy.addr, 7, "failover.test").await.unwrap();

    assert_eq!(
        response.answers[0].data.as_ipv4(),
        Some(Ipv4Addr::new(198, 51, 100, 1))
    );
    assert_eq!(silent.queries(), 1);
    assert_eq!(answering.queries(), 1);

    proxy.shutdown.cancel();
    proxy.task.await.unwrap();
}

#[tokio::test]
async fn test_second_query_served_from_cache() {
    let upstream = MockUpstream::start(UpstreamBehaviour::Answer(Ipv4Addr::new(203, 0, 113, 9)))
        .await
        .unwrap();
    let cache = Arc::new(DnsCache::new(100, 0, 3600));
    let proxy = start_proxy(use_case(vec![upstream.addr()], 1000).with_cache(cache.clone())).await;

    let first = ask(proxy.addr, 1, "cached.test").await.unwrap();
    let second = ask(proxy.addr, 2, "CACHED.test").await.unwrap();

    assert_eq!(first.id(), 1);
    assert_eq!(second.id(), 2);
    assert_eq!(second.answers, first.answers);
    assert_eq!(upstream.queries(), 1);
    assert_eq!(cache.stats().hits, 1);

    proxy.shutdown.cancel();
    proxy.task.await.unwrap();
}

#[tokio::test]
async fn test_malformed_reply_is_dumped_and_next_upstream_used() {
    let dir = tempfile::tempdir().unwrap();
    let garbage = MockUpstream::start(UpstreamBehaviour::Garbage).await.unwrap();
    let answering = MockUpstream::start(UpstreamBehaviour::Answer(Ipv4Addr::new(192, 0, 2, 99)))
        .await
        .unwrap();
    let dumper = Arc::new(MalformedReplyDumper::new(dir.path()));
    let proxy = start_proxy(
        use_case(vec![garbage.addr(), answering.addr()], 1000).with_malformed_sink(dumper),
    )
    .await;

    let response = ask(proxy.addr, 3, "broken.test").await.unwrap();
    assert_eq!(
        response.answers[0].data.as_ipv4(),
        Some(Ipv4Addr::new(192, 0, 2, 99))
    );

    let dumped: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(dumped.len(), 1);

    proxy.shutdown.cancel();
    proxy.task.await.unwrap();
}

#[tokio::test]
async fn test_no_reply_when_every_upstream_is_silent() {
    let silent = MockUpstream::start(UpstreamBehaviour::Silent).await.unwrap();
    let proxy = start_proxy(use_case(vec![silent.addr()], 100)).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let query = dns::encode(&DnsMessage::query(9, "void.test", RecordType::A)).unwrap();
    client.send_to(&query, proxy.addr).await.unwrap();

    let mut buf = vec![0u8; 512];
    let waited = tokio::time::timeout(Duration::from_millis(500), client.recv_from(&mut buf)).await;
    assert!(waited.is_err());

    proxy.shutdown.cancel();
    proxy.task.await.unwrap();
}

#[tokio::test]
async fn test_run_returns_on_cancellation() {
    let proxy = start_proxy(use_case(vec!["127.0.0.1:9".parse().unwrap()], 100)).await;
    proxy.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), proxy.task)
        .await
        .expect("server loop did not stop")
        .unwrap();
}
