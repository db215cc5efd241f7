use chrono::NaiveTime;
use pipeline_deck::{
    host::{EventBridge, HostEvent, StdioHost},
    pipeline::StageStatus,
    poller::{
        fake::{ManualScheduler, RecordingFetcher},
        ButtonPoller, Timings,
    },
    settings::InstanceId,
    Error,
};
use serde_json::Value;

const ACTION: &str = "dev.pipelinedeck.codepipeline";

fn clock() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 30, 0).unwrap()
}

fn line(event: &str, context: &str, settings: &str) -> String {
    format!(
        r#"{{"event":"{event}","action":"{ACTION}","context":"{context}","payload":{{"settings":{settings}}}}}"#
    )
}

const DEMO_SETTINGS: &str = r#"{"AWS_ACCESS_KEY_ID":"AKIA","AWS_SECRET_ACCESS_KEY":"secret","region":"us-east-1","pipelineName":"demo","displayName":"Demo"}"#;

type Poller = ButtonPoller<StdioHost<Vec<u8>>, ManualScheduler, RecordingFetcher>;

fn poller() -> Poller {
    ButtonPoller::new(
        StdioHost::new(Vec::new()),
        ManualScheduler::new(),
        RecordingFetcher::new(),
        Timings::default(),
    )
    .with_clock(clock)
}

fn feed(bridge: &mut EventBridge, poller: &mut Poller, raw: &str) {
    if let Some(event) = bridge.ingest_line(raw).unwrap() {
        poller.handle_event(event).unwrap();
    }
}

fn sent(poller: &Poller) -> Vec<Value> {
    String::from_utf8(poller.host().get_ref().clone())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn will_appear_round_trip_produces_set_image() {
    let mut bridge = EventBridge::default();
    let mut poller = poller();
    feed(&mut bridge, &mut poller, &line("willAppear", "ctx-1", DEMO_SETTINGS));

    let (ticket, request) = poller.fetcher_mut().take_pending().remove(0);
    assert_eq!(request.pipeline_name, "demo");
    poller
        .complete(ticket, Ok(vec![StageStatus::Succeeded, StageStatus::Failed]))
        .unwrap();

    let out = sent(&poller);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["event"], "setImage");
    assert_eq!(out[0]["context"], "ctx-1");
    assert_eq!(out[0]["payload"]["target"], 0);
    let image = out[0]["payload"]["image"].as_str().unwrap();
    assert!(image.starts_with("data:image/svg+xml"), "{image}");
    assert!(image.contains("08:30"));
    assert!(image.contains('✘'));
}

#[test]
fn settings_are_echoed_back_to_the_host() {
    let mut bridge = EventBridge::default();
    let mut poller = poller();
    feed(&mut bridge, &mut poller, &line("didReceiveSettings", "ctx-9", r#"{"region":"eu-west-1"}"#));

    let out = sent(&poller);
    assert_eq!(out[0]["event"], "setSettings");
    assert_eq!(out[0]["context"], "ctx-9");
    assert_eq!(out[0]["payload"]["region"], "eu-west-1");
    assert_eq!(out[0]["payload"]["pipelineName"], "");
    // Still incomplete, so the placeholder follows.
    assert_eq!(out[1]["event"], "setImage");
    assert_eq!(poller.fetcher().dispatched(), 0);
}

#[test]
fn long_press_sends_open_url() {
    let mut bridge = EventBridge::default();
    let mut poller = poller();
    feed(&mut bridge, &mut poller, &line("keyDown", "ctx-1", DEMO_SETTINGS));
    for key in poller.scheduler_mut().advance(Timings::default().long_press) {
        poller.on_timer(key).unwrap();
    }
    feed(&mut bridge, &mut poller, &line("keyUp", "ctx-1", DEMO_SETTINGS));

    let out = sent(&poller);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["event"], "openUrl");
    assert!(out[0]["payload"]["url"]
        .as_str()
        .unwrap()
        .contains("/codepipeline/pipelines/demo/view?region=us-east-1"));
}

#[test]
fn disappear_forgets_the_instance() {
    let mut bridge = EventBridge::default();
    let mut poller = poller();
    feed(&mut bridge, &mut poller, &line("willAppear", "ctx-1", DEMO_SETTINGS));
    assert!(poller.is_active(&InstanceId::new("ctx-1")));
    feed(
        &mut bridge,
        &mut poller,
        r#"{"event":"willDisappear","action":"dev.pipelinedeck.codepipeline","context":"ctx-1","payload":{"settings":{}}}"#,
    );
    assert!(!poller.is_active(&InstanceId::new("ctx-1")));
}

#[test]
fn foreign_and_unknown_messages_are_skipped() {
    let mut bridge = EventBridge::new(ACTION);
    let other = r#"{"event":"willAppear","action":"com.other.action","context":"x","payload":{"settings":{}}}"#;
    assert!(bridge.ingest_line(other).unwrap().is_none());
    assert!(bridge
        .ingest_line(r#"{"event":"deviceDidConnect","device":"abc"}"#)
        .unwrap()
        .is_none());
    assert_eq!(bridge.ignored(), 2);

    let err = bridge.ingest_line("{not json").unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err:?}");
    let err = bridge
        .ingest_line(r#"{"event":"keyDown","action":"dev.pipelinedeck.codepipeline"}"#)
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err:?}");
}

#[test]
fn property_inspector_messages_are_passed_through() {
    let mut bridge = EventBridge::default();
    let event = bridge
        .ingest_line(r#"{"event":"sendToPlugin","action":"dev.pipelinedeck.codepipeline","context":"ctx-2","payload":{"refresh":true}}"#)
        .unwrap()
        .unwrap();
    match &event {
        HostEvent::PluginMessage { instance, payload } => {
            assert_eq!(instance.as_ref().map(InstanceId::as_str), Some("ctx-2"));
            assert_eq!(payload["refresh"], true);
        }
        other => panic!("unexpected {other:?}"),
    }
    let mut poller = poller();
    poller.handle_event(event).unwrap();
    assert!(sent(&poller).is_empty());
}
