//! End-to-end capture scenarios: arming, screenshots, and the recording
//! lifecycle, observed both as page push events and as the router's
//! in-process capture feed.

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::{launch_rig, next_of_type};
use serde_json::Value;
use stepshot::{BridgeError, CaptureKind, Command};

fn arm_command() -> Command {
    Command::ArmTabContext {
        execution_id: "E1".into(),
        test_case_id: "T1".into(),
        step_number: 3,
    }
}

#[tokio::test]
async fn armed_screenshot_carries_the_exact_triple() {
    let rig = launch_rig(7);
    let mut captures = rig.core.router().subscribe_captures();
    let mut host = rig.bus.subscribe();

    rig.bridge.call(arm_command()).await.unwrap();

    let context = rig
        .bridge
        .call(Command::GetActiveTabContext {})
        .await
        .unwrap();
    assert_eq!(context["executionId"], "E1");
    assert_eq!(context["testCaseId"], "T1");
    assert_eq!(context["stepNumber"], 3);
    assert_eq!(context["tabId"], 7);

    let reply = rig
        .bridge
        .call(Command::CaptureScreenshotActiveTab {})
        .await
        .unwrap();
    assert_eq!(reply["ok"], true);

    let push = next_of_type(&mut host, "EVIDENCE_CAPTURED", Duration::from_millis(300))
        .await
        .expect("page should receive the screenshot push");
    assert_eq!(push["context"]["executionId"], "E1");
    assert_eq!(push["context"]["testCaseId"], "T1");
    assert_eq!(push["context"]["stepNumber"], 3);
    assert_eq!(push["mimeType"], "image/png");

    let result = captures.recv().await.unwrap();
    assert_eq!(result.kind, CaptureKind::Screenshot);
    assert_eq!(result.tab_id, 7);
    assert!(!result.artifact.is_empty());
    assert_eq!(rig.platform.screenshots_taken(), 1);
}

#[tokio::test]
async fn unarmed_screenshot_has_no_context_tag() {
    let rig = launch_rig(7);
    let mut captures = rig.core.router().subscribe_captures();

    rig.bridge
        .call(Command::CaptureScreenshotActiveTab {})
        .await
        .unwrap();
    let result = captures.recv().await.unwrap();
    assert!(result.context.is_none());
}

#[tokio::test]
async fn recording_lifecycle_emits_exactly_one_video() {
    let rig = launch_rig(7);
    let mut host = rig.bus.subscribe();

    let status = rig
        .bridge
        .call(Command::GetRecordingStatus { tab_id: None })
        .await
        .unwrap();
    assert_eq!(status["isRecording"], false);

    rig.bridge
        .call(Command::StartRecordingActiveTab {})
        .await
        .unwrap();
    let status = rig
        .bridge
        .call(Command::GetRecordingStatus { tab_id: None })
        .await
        .unwrap();
    assert_eq!(status["isRecording"], true);

    // Let a few chunks flush before stopping.
    tokio::time::sleep(Duration::from_millis(25)).await;
    rig.bridge
        .call(Command::StopRecordingCurrent {})
        .await
        .unwrap();

    let push = next_of_type(&mut host, "VIDEO_CAPTURED", Duration::from_millis(400))
        .await
        .expect("page should receive the video push");
    assert_eq!(push["mimeType"], "video/webm");
    assert!(!push["artifact"].as_str().unwrap().is_empty());
    assert!(push["fileName"]
        .as_str()
        .unwrap()
        .starts_with("recording-"));

    // Exactly one completion: no second video push follows.
    assert!(
        next_of_type(&mut host, "VIDEO_CAPTURED", Duration::from_millis(120))
            .await
            .is_none()
    );

    let status = rig
        .bridge
        .call(Command::GetRecordingStatus { tab_id: None })
        .await
        .unwrap();
    assert_eq!(status["isRecording"], false);
}

#[tokio::test]
async fn double_start_fails_and_leaves_the_first_session_intact() {
    let rig = launch_rig(7);
    let mut host = rig.bus.subscribe();

    rig.bridge
        .call(Command::StartRecordingActiveTab {})
        .await
        .unwrap();

    let err = rig
        .bridge
        .call(Command::StartRecordingActiveTab {})
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Application("Already recording this tab".to_string())
    );

    // The first session still finalizes correctly.
    tokio::time::sleep(Duration::from_millis(20)).await;
    rig.bridge
        .call(Command::StopRecordingCurrent {})
        .await
        .unwrap();
    let push = next_of_type(&mut host, "VIDEO_CAPTURED", Duration::from_millis(400))
        .await
        .expect("first session should still produce its video");
    assert!(!push["artifact"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn stop_without_a_session_is_an_application_error() {
    let rig = launch_rig(7);
    let err = rig
        .bridge
        .call(Command::StopRecordingCurrent {})
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Application("Not recording this tab".to_string())
    );
}

#[tokio::test]
async fn armed_video_push_is_tagged_like_screenshots() {
    let rig = launch_rig(7);
    let mut host = rig.bus.subscribe();

    rig.bridge.call(arm_command()).await.unwrap();
    rig.bridge
        .call(Command::StartRecordingActiveTab {})
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    rig.bridge
        .call(Command::StopRecordingCurrent {})
        .await
        .unwrap();

    let push = next_of_type(&mut host, "VIDEO_CAPTURED", Duration::from_millis(400))
        .await
        .unwrap();
    assert_eq!(push["context"]["executionId"], "E1");
    assert_eq!(push["context"]["stepNumber"], 3);
}

#[tokio::test]
async fn closing_the_tab_mid_recording_tears_the_session_down() {
    let rig = launch_rig(7);
    let mut host = rig.bus.subscribe();

    rig.bridge
        .call(Command::StartRecordingActiveTab {})
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    rig.core.router().handle_tab_removed(7).await;
    tokio::time::sleep(Duration::from_millis(40)).await;

    // Tracks released, no completion artifact for the dead tab.
    assert!(rig.source.tracks_released("stream-7-1"));
    assert!(
        next_of_type(&mut host, "VIDEO_CAPTURED", Duration::from_millis(120))
            .await
            .is_none()
    );

    // The arena slot is free again.
    let status = rig
        .bridge
        .call(Command::GetRecordingStatus { tab_id: Some(7) })
        .await
        .unwrap();
    assert_eq!(status["isRecording"], false);
}

#[tokio::test]
async fn rearming_overwrites_the_tag_for_later_captures() {
    let rig = launch_rig(7);
    let mut captures = rig.core.router().subscribe_captures();

    rig.bridge.call(arm_command()).await.unwrap();
    rig.bridge
        .call(Command::ArmTabContext {
            execution_id: "E2".into(),
            test_case_id: "T2".into(),
            step_number: 8,
        })
        .await
        .unwrap();

    rig.bridge
        .call(Command::CaptureScreenshotActiveTab {})
        .await
        .unwrap();
    let result = captures.recv().await.unwrap();
    let context = result.context.unwrap();
    assert_eq!(context.execution_id, "E2");
    assert_eq!(context.step_number, 8);
}

#[tokio::test]
async fn disarm_clears_the_tag() {
    let rig = launch_rig(7);

    rig.bridge.call(arm_command()).await.unwrap();
    let cleared = rig
        .bridge
        .call(Command::DisarmTabContext {})
        .await
        .unwrap();
    assert_eq!(cleared["cleared"], true);

    let context: Value = rig
        .bridge
        .call(Command::GetActiveTabContext {})
        .await
        .unwrap();
    assert_eq!(context, Value::Null);
}
