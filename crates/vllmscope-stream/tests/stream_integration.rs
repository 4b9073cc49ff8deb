use std::time::Duration;

use futures::SinkExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use vllmscope_stream::{BackoffPolicy, ConnectionState, MetricsStream};

fn metrics_frame(ts: &str, queue: u64) -> String {
    format!(
        r#"{{"timestamp":"{}","metrics":{{"queue_size":{}}}}}"#,
        ts, queue
    )
}

fn fast_policy() -> BackoffPolicy {
    BackoffPolicy {
        base_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        max_attempts: 5,
    }
}

/// Serves one batch of frames per accepted connection, closing after
/// each batch except the last.
async fn serve(batches: Vec<Vec<String>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let total = batches.len();
        for (i, batch) in batches.into_iter().enumerate() {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            for text in batch {
                ws.send(Message::Text(text.into())).await.unwrap();
            }
            if i + 1 < total {
                let _ = ws.close(None).await;
            } else {
                // Keep the last connection open until the test ends
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        }
    });

    format!("ws://{}/api/metrics/stream", addr)
}

/// Pump events into the client until `done` holds
async fn drive_until<F>(client: &mut MetricsStream, mut done: F)
where
    F: FnMut(&MetricsStream) -> bool,
{
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        while !done(client) {
            match client.next_event().await {
                Some(event) => {
                    client.handle(event);
                }
                None => break,
            }
        }
    })
    .await;
    assert!(result.is_ok(), "timed out driving stream client");
}

#[tokio::test]
async fn test_frames_arrive_in_order_and_malformed_are_skipped() {
    let url = serve(vec![vec![
        metrics_frame("t0", 0),
        "definitely not json".to_string(),
        metrics_frame("t1", 1),
        metrics_frame("t2", 2),
    ]])
    .await;

    let mut client = MetricsStream::with_url(url, 10).with_policy(fast_policy());
    client.connect();
    drive_until(&mut client, |c| c.history().len() == 3).await;

    let stamps: Vec<String> = client.history().into_iter().map(|m| m.timestamp).collect();
    assert_eq!(stamps, vec!["t0", "t1", "t2"]);
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(client.connection_error().is_none());

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let url = serve(vec![
        vec![metrics_frame("first", 1)],
        vec![metrics_frame("second", 2)],
    ])
    .await;

    let mut client = MetricsStream::with_url(url, 10).with_policy(fast_policy());
    client.connect();

    drive_until(&mut client, |c| c.history().len() == 2).await;

    let stamps: Vec<String> = client.history().into_iter().map(|m| m.timestamp).collect();
    assert_eq!(stamps, vec!["first", "second"]);
    assert_eq!(client.current().map(|m| m.timestamp.as_str()), Some("second"));

    drive_until(&mut client, |c| c.is_connected()).await;
}

#[tokio::test]
async fn test_unreachable_server_exhausts_retries() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let policy = BackoffPolicy {
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
        max_attempts: 2,
    };
    let mut client =
        MetricsStream::with_url(format!("ws://{}/api/metrics/stream", addr), 10).with_policy(policy);
    client.connect();

    drive_until(&mut client, |c| {
        c.state() == ConnectionState::Disconnected && !c.retry_pending()
    })
    .await;

    assert_eq!(
        client.connection_error(),
        Some(vllmscope_stream::RETRIES_EXHAUSTED)
    );
    assert!(client.history().is_empty());
}
