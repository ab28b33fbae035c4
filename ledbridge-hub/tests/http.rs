use std::sync::Arc;
use std::time::Duration;

use http_body_util::BodyExt;
use ledbridge_ble::testing::{ConnectBehavior, MockTransport};
use ledbridge_ble::{Executor, Pacing, PeripheralIdentity};
use ledbridge_hub::{
    ACTIVATED_MESSAGE, DEACTIVATED_MESSAGE, DEVICE_ERROR_MESSAGE, Dispatcher, HEALTH_MESSAGE,
};
use ledbridge_proto::{CommandTable, Envelope, Status};

/// Serve a dispatcher over `transport` on an ephemeral port
async fn start(transport: MockTransport) -> String {
    let peripheral = PeripheralIdentity {
        address: "BE:58:30:00:CC:4A".to_string(),
        characteristic: uuid::Uuid::from_u128(0x0000fff3_0000_1000_8000_00805f9b34fb),
    };
    let pacing = Pacing {
        connect_timeout: Duration::from_millis(200),
        command_delay: Duration::from_millis(20),
    };
    let dispatcher = Dispatcher::new(
        Executor::new(transport, peripheral, pacing),
        CommandTable::default(),
    );

    let listener = ledbridge_hub::http::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(ledbridge_hub::http::run_server(listener, Arc::new(dispatcher)));
    format!("http://{addr}")
}

#[tokio::test]
async fn health_check() {
    let mock = MockTransport::new();
    let base = start(mock.clone()).await;

    for _ in 0..3 {
        let outcome = ledbridge_hub::trigger(&format!("{base}/")).await.unwrap();
        assert_eq!(outcome.status, hyper::StatusCode::OK);
        assert_eq!(outcome.envelope, Some(Envelope::ok(HEALTH_MESSAGE)));
    }
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn activate_and_deactivate() {
    let mock = MockTransport::new();
    let base = start(mock.clone()).await;
    let table = CommandTable::default();

    let on = ledbridge_hub::trigger(&format!("{base}/ac")).await.unwrap();
    assert!(on.is_success());
    assert_eq!(on.envelope, Some(Envelope::success(ACTIVATED_MESSAGE)));

    let off = ledbridge_hub::trigger(&format!("{base}/kapat")).await.unwrap();
    assert!(off.is_success());
    assert_eq!(off.envelope, Some(Envelope::success(DEACTIVATED_MESSAGE)));

    assert_eq!(
        mock.writes(),
        vec![
            table.turn_on.as_bytes().to_vec(),
            table.brightness_100.as_bytes().to_vec(),
            table.turn_off.as_bytes().to_vec(),
        ]
    );
    assert_eq!(mock.connect_count(), 2);
    assert_eq!(mock.disconnect_count(), 2);
}

#[tokio::test]
async fn device_failure_is_500() {
    let base = start(MockTransport::new().connect_behavior(ConnectBehavior::Fail)).await;

    let outcome = ledbridge_hub::trigger(&format!("{base}/ac")).await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.status, hyper::StatusCode::INTERNAL_SERVER_ERROR);
    let envelope = outcome.envelope.unwrap();
    assert_eq!(envelope.status, Status::Error);
    assert_eq!(envelope.message, DEVICE_ERROR_MESSAGE);
}

#[tokio::test]
async fn connect_timeout_is_500() {
    let base = start(MockTransport::new().connect_behavior(ConnectBehavior::Hang)).await;

    let outcome = ledbridge_hub::trigger(&format!("{base}/kapat")).await.unwrap();

    assert_eq!(outcome.status, hyper::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(outcome.envelope, Some(Envelope::error(DEVICE_ERROR_MESSAGE)));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let mock = MockTransport::new();
    let base = start(mock.clone()).await;

    let outcome = ledbridge_hub::trigger(&format!("{base}/parlaklik")).await.unwrap();

    assert_eq!(outcome.status, hyper::StatusCode::NOT_FOUND);
    assert_eq!(
        outcome.envelope,
        Some(Envelope::error("not found: /parlaklik"))
    );
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn post_is_405() {
    let mock = MockTransport::new();
    let base = start(mock.clone()).await;

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build_http::<http_body_util::Empty<hyper::body::Bytes>>();
    let request = hyper::Request::post(format!("{base}/ac"))
        .body(http_body_util::Empty::new())
        .unwrap();

    let response = client.request(request).await.unwrap();
    assert_eq!(response.status(), hyper::StatusCode::METHOD_NOT_ALLOWED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let envelope: Envelope = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope.message, "method not allowed: POST");
    assert_eq!(mock.call_count(), 0);
}
