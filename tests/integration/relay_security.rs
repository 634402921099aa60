//! Origin and channel discipline at the content relay, exercised
//! against the full stack with hostile message injection.

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::{launch_rig, next_of_type, ORIGIN};
use serde_json::{json, Value};
use stepshot::{Command, CHANNEL};

fn raw_request(request_id: &str, command: &str) -> Value {
    json!({
        "channel": CHANNEL,
        "type": "REQUEST",
        "requestId": request_id,
        "command": command,
        "payload": {},
    })
}

#[tokio::test]
async fn cross_origin_requests_are_never_forwarded() {
    let rig = launch_rig(7);
    let mut host = rig.bus.subscribe();

    // A perfectly well-formed envelope from a foreign window.
    rig.bus.post_foreign(
        "https://evil.example.test",
        raw_request("hostile-1", "CAPTURE_SCREENSHOT_ACTIVE_TAB"),
    );

    assert!(
        next_of_type(&mut host, "RESPONSE", Duration::from_millis(150))
            .await
            .is_none(),
        "a cross-origin request must get no response"
    );
    assert_eq!(rig.platform.screenshots_taken(), 0);
}

#[tokio::test]
async fn wrong_channel_traffic_is_dropped_silently() {
    let rig = launch_rig(7);
    let mut host = rig.bus.subscribe();

    let mut off_channel = raw_request("hostile-2", "PING");
    off_channel["channel"] = json!("other-extension");
    rig.bus.post(off_channel, ORIGIN);
    rig.bus.post(json!(42), ORIGIN);
    rig.bus.post(json!({"type": "REQUEST", "requestId": "x"}), ORIGIN);

    assert!(
        next_of_type(&mut host, "RESPONSE", Duration::from_millis(150))
            .await
            .is_none()
    );

    // The relay itself is unharmed and still serves real calls.
    let response = rig.bridge.call(Command::Ping {}).await.unwrap();
    assert_eq!(response["installed"], true);
}

#[tokio::test]
async fn unknown_commands_surface_as_errors_not_silence() {
    // Passes the relay's shallow screening (it is a pure forwarder) and
    // is rejected by the router's closed command vocabulary.
    let rig = launch_rig(7);
    let mut host = rig.bus.subscribe();

    rig.bus.post(raw_request("req-x", "SELF_DESTRUCT"), ORIGIN);

    let response = next_of_type(&mut host, "RESPONSE", Duration::from_millis(200))
        .await
        .expect("a screened request must be answered");
    assert_eq!(response["requestId"], "req-x");
    assert_eq!(response["ok"], false);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .starts_with("Malformed command"));
}

#[tokio::test]
async fn responses_and_pushes_arrive_at_the_page_origin_only() {
    let rig = launch_rig(7);
    let mut host = rig.bus.subscribe();

    rig.bridge
        .call(Command::CaptureScreenshotActiveTab {})
        .await
        .unwrap();

    let wait = async {
        loop {
            let message = host.recv().await.unwrap();
            let kind = message.data.get("type").and_then(Value::as_str);
            if kind == Some("EVIDENCE_CAPTURED") || kind == Some("RESPONSE") {
                assert_eq!(message.origin, ORIGIN);
                assert!(message.same_window);
                if kind == Some("EVIDENCE_CAPTURED") {
                    break;
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_millis(400), wait)
        .await
        .expect("push should arrive at the page origin");
}
