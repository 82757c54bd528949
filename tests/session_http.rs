//! Session and light behaviour over real HTTP against a mock bridge.

use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::timeout;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hue_lights_rs::{
    BridgeAddress, BridgeSession, BridgeStatus, Light, LightConfig, LightEvent, SessionConfig,
    SessionEvent,
};

fn session_for_port(port: u16) -> BridgeSession {
    let config = SessionConfig {
        http_port: port,
        request_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    };
    BridgeSession::new(config).unwrap()
}

async fn wait_for<T: Clone + PartialEq + std::fmt::Debug>(
    rx: &mut broadcast::Receiver<T>,
    wanted: T,
) {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event == wanted {
                return;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {wanted:?}"));
}

#[tokio::test]
async fn create_user_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_json(json!({"devicetype": "hue-lights-rs#test", "username": "abc"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"success": {"username": "abc"}}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for_port(server.address().port());
    let mut events = session.subscribe();
    session.set_bridge(BridgeAddress::new(Ipv4Addr::LOCALHOST));
    session.create_user("hue-lights-rs#test", Some("abc")).unwrap();

    wait_for(&mut events, SessionEvent::StatusChanged(BridgeStatus::Connected)).await;
    assert_eq!(session.api_key(), "abc");
    assert_eq!(
        session.base_url().unwrap(),
        format!("http://127.0.0.1:{}/api/abc/", server.address().port())
    );
}

#[tokio::test]
async fn rejected_key_fails_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stale/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"error": {"type": 1, "address": "/lights", "description": "unauthorized user"}}
        ])))
        .mount(&server)
        .await;

    let session = session_for_port(server.address().port());
    let mut events = session.subscribe();
    session.set_api_key("stale");
    session.set_bridge(BridgeAddress::new(Ipv4Addr::LOCALHOST));

    wait_for(
        &mut events,
        SessionEvent::StatusChanged(BridgeStatus::AuthenticationFailure),
    )
    .await;
    assert_eq!(session.status(), BridgeStatus::AuthenticationFailure);
}

#[tokio::test]
async fn light_write_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/key/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"3": {"name": "Lamp"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/key/lights/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": {"on": true, "bri": 10, "reachable": true, "colormode": "ct", "ct": 300},
            "name": "Lamp", "modelid": "LWB004", "type": "Dimmable light", "swversion": "1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/key/lights/3/state"))
        .and(body_json(json!({"on": true, "bri": 120})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"success": {"/lights/3/state/bri": 120}}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for_port(server.address().port());
    let mut session_events = session.subscribe();
    session.set_api_key("key");
    session.set_bridge(BridgeAddress::new(Ipv4Addr::LOCALHOST));
    wait_for(
        &mut session_events,
        SessionEvent::StatusChanged(BridgeStatus::Connected),
    )
    .await;

    let light = Light::new(3, "Lamp", session.clone(), LightConfig::default());
    let mut events = light.subscribe();
    wait_for(&mut events, LightEvent::MetadataChanged).await;
    assert_eq!(light.model_id(), "LWB004");
    assert_eq!(light.state().bri(), 10);

    light.set_bri(120);
    wait_for(&mut events, LightEvent::WriteOperationFinished).await;
    assert_eq!(light.state().bri(), 120);
    assert!(!light.is_busy());
    wait_for(&mut session_events, SessionEvent::StateChanged).await;
}

#[tokio::test]
async fn strict_get_reports_transport_failure() {
    // Nothing listens on a port that was just released
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let session = session_for_port(port);
    session.set_api_key("key");
    session.set_bridge(BridgeAddress::new(Ipv4Addr::LOCALHOST));
    let mut events = session.subscribe();

    let request_id = session.get_strict("config", |_, _| {}).unwrap();
    let failed = timeout(Duration::from_secs(5), async {
        loop {
            if let SessionEvent::GetFailed { request_id, .. } = events.recv().await.unwrap() {
                return request_id;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(failed, request_id);
    assert_eq!(session.status(), BridgeStatus::Connecting);
}
