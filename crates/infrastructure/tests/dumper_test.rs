use ferrous_netdiag_application::ports::MalformedReplySink;
use ferrous_netdiag_infrastructure::MalformedReplyDumper;
use std::net::SocketAddr;

fn upstream() -> SocketAddr {
    "192.0.2.53:53".parse().unwrap()
}

#[tokio::test]
async fn test_reply_written_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let dumper = MalformedReplyDumper::new(dir.path());

    dumper.persist(upstream(), &[0xde, 0xad, 0xbe, 0xef]).await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(std::fs::read(&entries[0]).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    let name = entries[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("malformed-"));
    assert!(name.contains("192.0.2.53_53"));
}

#[tokio::test]
async fn test_each_reply_gets_its_own_file() {
    let dir = tempfile::tempdir().unwrap();
    let dumper = MalformedReplyDumper::new(dir.path());

    for _ in 0..3 {
        dumper.persist(upstream(), b"junk").await.unwrap();
    }

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
}

#[tokio::test]
async fn test_missing_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("dumps").join("dns");
    let dumper = MalformedReplyDumper::new(&nested);

    dumper.persist(upstream(), b"x").await.unwrap();

    assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 1);
}
