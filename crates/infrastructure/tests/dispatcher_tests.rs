use squid_tagger_domain::config::RedirectorConfig;
use squid_tagger_domain::ResponseFormat;
use squid_tagger_infrastructure::redirector::{DispatchSummary, Dispatcher};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::{classify_use_case, rule, site, MockPolicyStore, MockPolicyStoreFactory};

fn ads_store() -> MockPolicyStore {
    MockPolicyStore::new(
        vec![site("example.com", "{ads}", None)],
        vec![rule("{ads}", "http://block.local/{path}")],
    )
}

fn config(workers: usize) -> RedirectorConfig {
    RedirectorConfig {
        workers,
        queue_capacity: 4,
        ..RedirectorConfig::default()
    }
}

async fn run_with(
    config: RedirectorConfig,
    store: MockPolicyStore,
    input: &str,
) -> (DispatchSummary, String) {
    let dispatcher = Dispatcher::new(
        &config,
        MockPolicyStoreFactory::new(store),
        classify_use_case(),
    );
    let (mut client, server) = tokio::io::duplex(1 << 20);

    let summary = dispatcher.run(input.as_bytes(), server).await.unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    (summary, output)
}

#[tokio::test]
async fn test_redirect_reply_end_to_end() {
    let (summary, output) = run_with(
        config(1),
        ads_store(),
        "7 http://example.com/x 10.0.0.1/- - GET\n",
    )
    .await;

    assert_eq!(output, "7 http://block.local/x\n");
    assert_eq!(summary.requests, 1);
    assert_eq!(summary.malformed, 0);
}

#[tokio::test]
async fn test_pass_and_malformed_replies() {
    let (summary, output) = run_with(
        config(0),
        ads_store(),
        "3 http://other.org/ 10.0.0.1/- - GET\ngarbage text\n",
    )
    .await;

    assert_eq!(output, "3 -\ngarbage text\n");
    assert_eq!(
        summary,
        DispatchSummary {
            lines: 2,
            requests: 1,
            malformed: 1
        }
    );
}

#[tokio::test]
async fn test_unterminated_last_line_is_answered() {
    let (_, output) = run_with(config(1), ads_store(), "9 http://example.com/ 10.0.0.1/- - GET").await;

    assert_eq!(output, "9 http://block.local/\n");
}

#[tokio::test]
async fn test_inline_mode_preserves_order() {
    let input: String = (1..=20)
        .map(|i| format!("{i} http://example.com/{i} 10.0.0.1/- - GET\n"))
        .collect();

    let (summary, output) = run_with(config(0), ads_store(), &input).await;

    let expected: String = (1..=20)
        .map(|i| format!("{i} http://block.local/{i}\n"))
        .collect();
    assert_eq!(output, expected);
    assert_eq!(summary.requests, 20);
}

#[tokio::test]
async fn test_every_id_answered_once_with_many_workers() {
    let input: String = (0..200)
        .map(|i| {
            let host = if i % 2 == 0 { "example.com" } else { "example.org" };
            format!("{i} http://{host}/p{i} 10.0.0.1/- - GET\n")
        })
        .collect();

    let (summary, output) = run_with(config(4), ads_store(), &input).await;

    let replies: BTreeSet<String> = output.lines().map(str::to_string).collect();
    let expected: BTreeSet<String> = (0..200)
        .map(|i| {
            if i % 2 == 0 {
                format!("{i} http://block.local/p{i}")
            } else {
                format!("{i} -")
            }
        })
        .collect();
    assert_eq!(output.lines().count(), 200);
    assert_eq!(replies, expected);
    assert_eq!(summary.requests, 200);
}

#[tokio::test]
async fn test_each_worker_gets_its_own_store() {
    let factory = MockPolicyStoreFactory::new(ads_store());
    let dispatcher = Dispatcher::new(&config(3), factory.clone(), classify_use_case());
    let (_client, server) = tokio::io::duplex(1 << 16);

    dispatcher.run(&b""[..], server).await.unwrap();

    assert_eq!(factory.created(), 3);
}

#[tokio::test]
async fn test_status_prefixed_replies() {
    let config = RedirectorConfig {
        response_format: ResponseFormat::StatusPrefixed,
        redirect_status: 302,
        ..config(1)
    };

    let (_, output) = run_with(config, ads_store(), "1 http://example.com/a 10.0.0.1/- - GET\n").await;

    assert_eq!(output, "1 302:http://block.local/a\n");
}

#[tokio::test]
async fn test_store_failure_answers_pass() {
    let store = ads_store();
    store.set_should_fail(true);

    let (_, output) = run_with(config(2), store, "5 http://example.com/ 10.0.0.1/- - GET\n").await;

    assert_eq!(output, "5 -\n");
}

#[tokio::test]
async fn test_chunked_input_is_reassembled() {
    let dispatcher = Dispatcher::new(
        &config(1),
        MockPolicyStoreFactory::new(ads_store()),
        classify_use_case(),
    );
    let (mut input_tx, input_rx) = tokio::io::duplex(64);
    let (mut client, server) = tokio::io::duplex(1 << 16);

    let feeder = tokio::spawn(async move {
        for chunk in ["1 http://exa", "mple.com/a 10.0", ".0.1/- - GET\n2 gar", "bage\n"] {
            input_tx.write_all(chunk.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let summary = dispatcher.run(input_rx, server).await.unwrap();
    feeder.await.unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    assert_eq!(output, "1 http://block.local/a\n2 garbage\n");
    assert_eq!(summary.lines, 2);
}

#[tokio::test]
async fn test_cancellation_stops_reading_and_drains() {
    let token = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        &config(1),
        MockPolicyStoreFactory::new(ads_store()),
        classify_use_case(),
    )
    .with_cancellation(token.clone());
    let (mut input_tx, input_rx) = tokio::io::duplex(1024);
    let (mut client, server) = tokio::io::duplex(1 << 16);

    input_tx
        .write_all(b"1 http://example.com/ 10.0.0.1/- - GET\n")
        .await
        .unwrap();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    // The input stays open; only the token ends the run.
    let summary = tokio::time::timeout(Duration::from_secs(5), dispatcher.run(input_rx, server))
        .await
        .expect("dispatcher did not stop on cancellation")
        .unwrap();
    canceller.await.unwrap();
    drop(input_tx);

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    assert_eq!(output, "1 http://block.local/\n");
    assert_eq!(summary.requests, 1);
}
