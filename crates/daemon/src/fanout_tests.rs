use super::*;

#[tokio::test]
async fn subscribers_each_receive_published_events() {
    let fanout = Fanout::new();
    let mut a = fanout.subscribe();
    let mut b = fanout.subscribe();

    fanout.publish(Bytes::from_static(b"{\"type\":\"CAMPAIGN_STARTED\"}"));

    assert_eq!(a.recv().await.unwrap(), Bytes::from_static(b"{\"type\":\"CAMPAIGN_STARTED\"}"));
    assert_eq!(b.recv().await.unwrap(), Bytes::from_static(b"{\"type\":\"CAMPAIGN_STARTED\"}"));
}

#[tokio::test]
async fn late_subscriber_misses_earlier_events() {
    let fanout = Fanout::new();
    fanout.publish(Bytes::from_static(b"before"));
    let mut late = fanout.subscribe();
    fanout.publish(Bytes::from_static(b"after"));

    assert_eq!(late.recv().await.unwrap(), Bytes::from_static(b"after"));
}

#[tokio::test]
async fn disconnect_all_sends_the_empty_sentinel() {
    let fanout = Fanout::new();
    let mut rx = fanout.subscribe();
    fanout.disconnect_all();

    let received = rx.recv().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn drain_stops_on_sentinel_without_invoking_callback() {
    let fanout = Fanout::new();
    let rx = fanout.subscribe();
    fanout.publish(Bytes::from_static(b"one"));
    fanout.disconnect_all();

    let mut seen = Vec::new();
    drain(rx, |bytes| seen.push(bytes)).await;

    assert_eq!(seen, vec![Bytes::from_static(b"one")]);
}

#[tokio::test]
async fn publish_with_no_subscribers_does_not_panic() {
    let fanout = Fanout::new();
    fanout.publish(Bytes::from_static(b"nobody listening"));
}
