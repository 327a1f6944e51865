use std::net::Ipv4Addr;
use std::time::Duration;

use lanscout_core::wire::JTAG_SIGNATURE;
use lanscout_services::{LinkState, RegistryEvent};
use lanscoutd::DiscoveryEngine;

use crate::*;

fn expect_state(event: RegistryEvent, addr: Ipv4Addr, state: LinkState) {
    match event {
        RegistryEvent::Updated(record) => {
            assert_eq!(record.address, addr);
            assert_eq!(record.state, state);
        }
        other => panic!("expected Updated({state}), got {other:?}"),
    }
}

#[tokio::test]
async fn silent_device_goes_offline_then_back_online() {
    let engine = DiscoveryEngine::new(loopback_config(DISCARD_PORT, 250));
    let mut events = engine.subscribe();
    engine.start().await;

    let addr = Ipv4Addr::new(127, 0, 0, 3);
    reply_from(&engine, addr, JTAG_SIGNATURE).await.unwrap();
    assert!(matches!(
        next_event(&mut events).await.unwrap(),
        RegistryEvent::Added(_)
    ));

    expect_state(next_event(&mut events).await.unwrap(), addr, LinkState::Offline);
    // One demotion per breach, however many cycles pass.
    assert_quiet(&mut events, Duration::from_millis(400)).await;

    reply_from(&engine, addr, JTAG_SIGNATURE).await.unwrap();
    expect_state(next_event(&mut events).await.unwrap(), addr, LinkState::Online);

    let roster = engine.snapshot();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].address, addr);

    engine.stop().await;
}

#[tokio::test]
async fn remove_on_disconnect_drops_silent_devices() {
    let mut config = loopback_config(DISCARD_PORT, 200);
    config.scan.remove_on_disconnect = true;
    let engine = DiscoveryEngine::new(config);
    let mut events = engine.subscribe();
    engine.start().await;

    let addr = Ipv4Addr::new(127, 0, 0, 5);
    reply_from(&engine, addr, JTAG_SIGNATURE).await.unwrap();
    assert!(matches!(
        next_event(&mut events).await.unwrap(),
        RegistryEvent::Added(_)
    ));
    expect_state(next_event(&mut events).await.unwrap(), addr, LinkState::Offline);
    match next_event(&mut events).await.unwrap() {
        RegistryEvent::Removed(record) => assert_eq!(record.state, LinkState::Offline),
        other => panic!("expected Removed, got {other:?}"),
    }
    assert!(engine.snapshot().is_empty());

    engine.stop().await;
}

#[tokio::test]
async fn purge_list_clears_offline_devices_only() {
    let engine = DiscoveryEngine::new(loopback_config(DISCARD_PORT, 250));
    let mut events = engine.subscribe();
    engine.start().await;

    let gone = Ipv4Addr::new(127, 0, 0, 6);
    reply_from(&engine, gone, JTAG_SIGNATURE).await.unwrap();
    assert!(matches!(
        next_event(&mut events).await.unwrap(),
        RegistryEvent::Added(_)
    ));
    expect_state(next_event(&mut events).await.unwrap(), gone, LinkState::Offline);

    engine.stop().await;

    // A fresh online record, added while stopped, must survive the purge.
    let kept = Ipv4Addr::new(127, 0, 0, 7);
    let reply = lanscout_core::decode_reply(JTAG_SIGNATURE).unwrap();
    engine.registry().add(lanscout_services::ConnectionRecord::discovered(
        kept,
        &reply,
        engine.config().network.bridged_subnet,
        std::time::Instant::now(),
    ));
    assert!(matches!(
        next_event(&mut events).await.unwrap(),
        RegistryEvent::Added(_)
    ));

    assert_eq!(engine.purge_list(), 1);
    match next_event(&mut events).await.unwrap() {
        RegistryEvent::Removed(record) => assert_eq!(record.address, gone),
        other => panic!("expected Removed, got {other:?}"),
    }
    let roster = engine.snapshot();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].address, kept);
}

#[tokio::test]
async fn stopped_engine_ignores_replies() {
    let engine = DiscoveryEngine::new(loopback_config(DISCARD_PORT, 5_000));
    let mut events = engine.subscribe();

    engine.start().await;
    engine.start().await;
    let local = engine.local_addr().await.unwrap();
    engine.stop().await;
    engine.stop().await;
    assert!(!engine.is_running());

    // Whatever is at the old port now, the engine does not hear it.
    let socket = tokio::net::UdpSocket::bind("127.0.0.8:0").await.unwrap();
    socket
        .send_to(JTAG_SIGNATURE, ("127.0.0.1", local.port()))
        .await
        .unwrap();
    assert_quiet(&mut events, Duration::from_millis(300)).await;
    assert!(engine.snapshot().is_empty());
}
