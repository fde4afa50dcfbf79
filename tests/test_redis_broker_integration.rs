//! Integration Tests with Real Redis Server
//!
//! Exercises `RedisBroker` against a Redis container using testcontainers.
//! These tests validate:
//! - Connection and liveness check against a real server
//! - Channel publish reaching a live subscriber
//! - Queue appends growing the list in order
//! - Release of the connection after a full publisher run


use futures::StreamExt;
use redis::AsyncCommands;
use redis_integration_helpers::RedisTestHarness;
use redis_publisher::config::{DeliveryMode, PublishSection, PublisherConfig};
use redis_publisher::{
    Broker, Message, Publisher, RedisBroker, Shutdown, CHANNEL_NAME, QUEUE_NAME,
};
use std::time::Duration;
use testcontainers::clients::Cli;

fn broker_for(harness: &RedisTestHarness<'_>) -> RedisBroker {
    RedisBroker::new(&harness.redis_section(), &harness.retry_policy())
        .expect("Client creation should succeed")
}

#[tokio::test]
async fn test_connect_to_real_server() {
    // Arrange: Start real Redis server
    let docker = Cli::default();
    let harness = RedisTestHarness::new(&docker);
    let mut broker = broker_for(&harness);

    // Act
    let result = broker.connect().await;

    // Assert: PING succeeded and the connection is held
    assert!(result.is_ok(), "Should connect to real server: {result:?}");
    assert!(broker.is_connected());

    // Close releases it, and a second close is harmless
    broker.close().await.expect("Close should succeed");
    assert!(!broker.is_connected());
    broker.close().await.expect("Second close should succeed");
}

#[tokio::test]
async fn test_publish_reaches_live_subscriber() {
    let docker = Cli::default();
    let harness = RedisTestHarness::new(&docker);

    let mut pubsub = harness
        .observer()
        .get_async_pubsub()
        .await
        .expect("Subscriber connection should succeed");
    pubsub
        .subscribe(CHANNEL_NAME)
        .await
        .expect("Subscription should succeed");

    let mut broker = broker_for(&harness);
    broker.connect().await.expect("Connection should succeed");

    let payload = Message::new(1).to_json().unwrap();
    let subscribers = broker
        .publish(CHANNEL_NAME, &payload)
        .await
        .expect("Publish should succeed");
    assert_eq!(subscribers, 1);

    let received = tokio::time::timeout(Duration::from_secs(5), pubsub.on_message().next())
        .await
        .expect("Subscriber should receive the message")
        .expect("Stream should stay open");
    assert_eq!(received.get_channel_name(), CHANNEL_NAME);
    assert_eq!(received.get_payload::<String>().unwrap(), payload);

    broker.close().await.unwrap();
}

#[tokio::test]
async fn test_publish_without_subscribers_reports_zero() {
    let docker = Cli::default();
    let harness = RedisTestHarness::new(&docker);
    let mut broker = broker_for(&harness);
    broker.connect().await.expect("Connection should succeed");

    let subscribers = broker.publish(CHANNEL_NAME, "{}").await.unwrap();

    assert_eq!(subscribers, 0);
    broker.close().await.unwrap();
}

#[tokio::test]
async fn test_push_grows_queue_in_order() {
    let docker = Cli::default();
    let harness = RedisTestHarness::new(&docker);
    let mut broker = broker_for(&harness);
    broker.connect().await.expect("Connection should succeed");

    let payloads: Vec<String> = (1..=3)
        .map(|count| Message::new(count).to_json().unwrap())
        .collect();

    let mut lengths = Vec::new();
    for payload in &payloads {
        lengths.push(broker.push(QUEUE_NAME, payload).await.unwrap());
    }
    assert_eq!(lengths, vec![1, 2, 3]);

    let mut observer = harness
        .observer()
        .get_multiplexed_async_connection()
        .await
        .unwrap();
    let stored: Vec<String> = observer.lrange(QUEUE_NAME, 0, -1).await.unwrap();
    assert_eq!(stored, payloads);

    broker.close().await.unwrap();
}

#[tokio::test]
async fn test_publisher_run_against_real_server() {
    let docker = Cli::default();
    let harness = RedisTestHarness::new(&docker);

    let config = PublisherConfig {
        redis: harness.redis_section(),
        publish: PublishSection {
            interval: Duration::from_millis(50),
            pattern: DeliveryMode::Both,
        },
        retry: harness.retry_policy(),
    };
    let shutdown = Shutdown::new();
    let mut publisher = Publisher::new(config, broker_for(&harness), shutdown.clone());

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.trigger("SIGTERM");
    });

    let summary = publisher.run().await.expect("Run should end gracefully");
    stopper.await.unwrap();

    assert!(summary.messages_sent >= 1);
    assert!(!publisher.broker().is_connected());

    // Every built message landed on the queue exactly once, in sequence
    let mut observer = harness
        .observer()
        .get_multiplexed_async_connection()
        .await
        .unwrap();
    let stored: Vec<String> = observer.lrange(QUEUE_NAME, 0, -1).await.unwrap();
    assert_eq!(stored.len() as u64, summary.messages_sent);

    let counts: Vec<u64> = stored
        .iter()
        .map(|raw| serde_json::from_str::<Message>(raw).unwrap().count)
        .collect();
    let expected: Vec<u64> = (1..=summary.messages_sent).collect();
    assert_eq!(counts, expected);
}
