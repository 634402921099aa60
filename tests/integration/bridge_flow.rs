//! Page bridge behavior against the full stack: correlation, listener
//! hygiene, and installation detection with and without an extension.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_config, launch_rig, ORIGIN};
use stepshot::{BridgeError, Command, PageBridge, PageBus};

#[tokio::test]
async fn detection_and_sequential_calls_keep_listener_baseline() {
    let rig = launch_rig(7);
    tokio::time::sleep(Duration::from_millis(5)).await;
    let baseline = rig.bus.listener_count();

    assert!(rig.bridge.detect_extension_installed().await);
    assert_eq!(rig.bus.listener_count(), baseline);

    for _ in 0..3 {
        let response = rig.bridge.call(Command::Ping {}).await.unwrap();
        assert_eq!(response["installed"], true);
        assert_eq!(rig.bus.listener_count(), baseline);
    }
}

#[tokio::test]
async fn absent_extension_times_out_and_detection_reads_false() {
    // A page with no relay at all: just a window and a bridge.
    let bus = PageBus::new(ORIGIN);
    let bridge = PageBridge::new(Arc::clone(&bus), &fast_config());

    assert!(!bridge.detect_extension_installed().await);

    let err = bridge
        .issue(Command::GetActiveTabContext {}, Duration::from_millis(60))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout(_)));

    // Timed-out calls left no listener behind.
    assert_eq!(bus.listener_count(), 0);
}

#[tokio::test]
async fn torn_down_extension_leaves_callers_to_their_timeouts() {
    let rig = launch_rig(7);
    assert!(rig.bridge.detect_extension_installed().await);

    rig.core.shutdown();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = rig
        .bridge
        .issue(Command::Ping {}, Duration::from_millis(60))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout(_)));
    assert!(!rig.bridge.detect_extension_installed().await);
}
