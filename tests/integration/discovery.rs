use std::net::Ipv4Addr;
use std::time::Duration;

use lanscout_core::wire::{DEVKIT_SIGNATURE, JTAG_PROBE, JTAG_SIGNATURE};
use lanscout_core::{DeviceKind, SubnetPrefix};
use lanscout_services::{ConnectionKind, LinkState, RegistryEvent};
use lanscoutd::DiscoveryEngine;

use crate::*;

#[tokio::test]
async fn device_answering_probe_is_registered_online() {
    let device = FakeDevice::bind().await.unwrap();
    let engine = DiscoveryEngine::new(loopback_config(device.port(), 3_000));
    let mut events = engine.subscribe();
    engine.start().await;

    let probe = device.answer_probe(JTAG_SIGNATURE).await.unwrap();
    assert_eq!(probe, JTAG_PROBE.to_vec());

    match next_event(&mut events).await.unwrap() {
        RegistryEvent::Added(record) => {
            assert_eq!(record.address, Ipv4Addr::LOCALHOST);
            assert_eq!(record.display_name, "jtag");
            assert_eq!(record.device_kind, DeviceKind::Jtag);
            assert_eq!(record.connection_kind, ConnectionKind::Lan);
            assert_eq!(record.state, LinkState::Online);
        }
        other => panic!("expected Added, got {other:?}"),
    }

    engine.stop().await;
}

#[tokio::test]
async fn devkit_probe_is_sent_when_configured() {
    let device = FakeDevice::bind().await.unwrap();
    let mut config = loopback_config(device.port(), 3_000);
    config.network.probes = vec![DeviceKind::Devkit];
    let engine = DiscoveryEngine::new(config);
    let mut events = engine.subscribe();
    engine.start().await;

    let probe = device.answer_probe(DEVKIT_SIGNATURE).await.unwrap();
    assert_eq!(Some(probe.as_slice()), DeviceKind::Devkit.probe().map(|p| p.as_slice()));
    let event = next_event(&mut events).await.unwrap();
    assert_eq!(event.record().device_kind, DeviceKind::Devkit);

    engine.stop().await;
}

#[tokio::test]
async fn repeated_replies_register_a_device_once() {
    let engine = DiscoveryEngine::new(loopback_config(DISCARD_PORT, 5_000));
    let mut events = engine.subscribe();
    engine.start().await;

    let source = Ipv4Addr::new(127, 0, 0, 2);
    for _ in 0..3 {
        reply_from(&engine, source, b"\x03\x07XDK-001").await.unwrap();
    }

    let event = next_event(&mut events).await.unwrap();
    assert!(matches!(event, RegistryEvent::Added(_)));
    assert_eq!(event.record().address, source);
    assert_eq!(event.record().device_kind, DeviceKind::Unknown);
    assert_quiet(&mut events, Duration::from_millis(300)).await;
    assert_eq!(engine.snapshot().len(), 1);

    engine.stop().await;
}

#[tokio::test]
async fn reply_from_bridged_range_is_marked_bridged() {
    let mut config = loopback_config(DISCARD_PORT, 5_000);
    config.network.bridged_subnet = SubnetPrefix::new(127, 0, 137);
    let engine = DiscoveryEngine::new(config);
    let mut events = engine.subscribe();
    engine.start().await;

    reply_from(&engine, Ipv4Addr::new(127, 0, 137, 12), JTAG_SIGNATURE)
        .await
        .unwrap();
    reply_from(&engine, Ipv4Addr::new(127, 0, 1, 12), JTAG_SIGNATURE)
        .await
        .unwrap();

    let mut kinds = Vec::new();
    for _ in 0..2 {
        let event = next_event(&mut events).await.unwrap();
        kinds.push((event.record().address.octets()[2], event.record().connection_kind));
    }
    kinds.sort_by_key(|(octet, _)| *octet);
    assert_eq!(
        kinds,
        vec![(1, ConnectionKind::Lan), (137, ConnectionKind::Bridged)]
    );

    engine.stop().await;
}

#[tokio::test]
async fn malformed_replies_are_ignored() {
    let engine = DiscoveryEngine::new(loopback_config(DISCARD_PORT, 5_000));
    let mut events = engine.subscribe();
    engine.start().await;

    let source = Ipv4Addr::new(127, 0, 0, 4);
    reply_from(&engine, source, &[]).await.unwrap();
    reply_from(&engine, source, &[0x03]).await.unwrap();
    assert_quiet(&mut events, Duration::from_millis(300)).await;
    assert!(engine.snapshot().is_empty());

    // The listener is still alive after the bad datagrams, and a name that
    // is not clean ASCII still registers the device.
    reply_from(&engine, source, b"\x03\x05caf\xe9").await.unwrap();
    match next_event(&mut events).await.unwrap() {
        RegistryEvent::Added(record) => assert_eq!(record.display_name, "caf?"),
        other => panic!("expected Added, got {other:?}"),
    }

    engine.stop().await;
}
