use std::sync::Arc;

use hyper::StatusCode;
use ledbridge_ble::{Executor, Transport};
use ledbridge_proto::{CommandSequence, CommandTable, Envelope};

pub const HEALTH_MESSAGE: &str = "LED bridge server is running.";
pub const ACTIVATED_MESSAGE: &str = "LED turned on and brightness set to 100%.";
pub const DEACTIVATED_MESSAGE: &str = "LED turned off.";
pub const DEVICE_ERROR_MESSAGE: &str =
    "Could not control the LED. Make sure the device is powered on and in range.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Activate,
    Deactivate,
}

impl Route {
    pub fn resolve(path: &str) -> Option<Self> {
        match path {
            "/" => Some(Route::Health),
            "/ac" => Some(Route::Activate),
            "/kapat" => Some(Route::Deactivate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Envelope,
}

impl Reply {
    fn device_error() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Envelope::error(DEVICE_ERROR_MESSAGE),
        }
    }
}

/// Maps routes to command sequences and runs them.
///
/// Every BLE route runs the executor in its own task and waits for it, so a
/// request only returns once the device exchange is over.
pub struct Dispatcher<T> {
    executor: Arc<Executor<T>>,
    commands: CommandTable,
    // held by the BLE task itself, so a dropped request cannot release it early
    gate: Option<Arc<tokio::sync::Mutex<()>>>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(executor: Executor<T>, commands: CommandTable) -> Self {
        Self {
            executor: Arc::new(executor),
            commands,
            gate: None,
        }
    }

    /// Queue BLE exchanges instead of letting concurrent requests race for
    /// the radio
    pub fn serialized(mut self) -> Self {
        self.gate = Some(Arc::new(tokio::sync::Mutex::new(())));
        self
    }

    pub fn executor(&self) -> &Executor<T> {
        &self.executor
    }

    pub async fn dispatch(&self, route: Route) -> Reply {
        match route {
            Route::Health => Reply {
                status: StatusCode::OK,
                body: Envelope::ok(HEALTH_MESSAGE),
            },
            Route::Activate => {
                self.execute(self.commands.activate(), ACTIVATED_MESSAGE)
                    .await
            }
            Route::Deactivate => {
                self.execute(self.commands.deactivate(), DEACTIVATED_MESSAGE)
                    .await
            }
        }
    }

    async fn execute(&self, sequence: CommandSequence, success_message: &str) -> Reply {
        let guard = match &self.gate {
            Some(gate) => Some(Arc::clone(gate).lock_owned().await),
            None => None,
        };

        let executor = Arc::clone(&self.executor);
        let outcome = tokio::task::spawn(async move {
            let _guard = guard;
            executor.run(&sequence).await.is_ok()
        })
        .await;

        match outcome {
            Ok(true) => Reply {
                status: StatusCode::OK,
                body: Envelope::success(success_message),
            },
            Ok(false) => Reply::device_error(),
            Err(e) => {
                tracing::error!("BLE task did not finish: {e}");
                Reply::device_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledbridge_ble::testing::{ConnectBehavior, MockTransport};
    use ledbridge_ble::{Pacing, PeripheralIdentity};
    use ledbridge_proto::Status;
    use std::time::Duration;

    fn dispatcher(transport: MockTransport) -> Dispatcher<MockTransport> {
        let peripheral = PeripheralIdentity {
            address: "BE:58:30:00:CC:4A".to_string(),
            characteristic: uuid::Uuid::from_u128(0x0000fff3_0000_1000_8000_00805f9b34fb),
        };
        Dispatcher::new(
            Executor::new(transport, peripheral, Pacing::default()),
            CommandTable::default(),
        )
    }

    #[test]
    fn resolve_routes() {
        assert_eq!(Route::resolve("/"), Some(Route::Health));
        assert_eq!(Route::resolve("/ac"), Some(Route::Activate));
        assert_eq!(Route::resolve("/kapat"), Some(Route::Deactivate));
        assert_eq!(Route::resolve("/ac/"), None);
        assert_eq!(Route::resolve("/status"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn health_never_touches_transport() {
        let d = dispatcher(MockTransport::new());

        let first = d.dispatch(Route::Health).await;
        for _ in 0..5 {
            assert_eq!(d.dispatch(Route::Health).await, first);
        }

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.body, Envelope::ok(HEALTH_MESSAGE));
        assert_eq!(d.executor().transport().call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn activate_success() {
        let d = dispatcher(MockTransport::new());

        let reply = d.dispatch(Route::Activate).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, Envelope::success(ACTIVATED_MESSAGE));
        assert_eq!(d.executor().transport().writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_success() {
        let d = dispatcher(MockTransport::new());

        let reply = d.dispatch(Route::Deactivate).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, Envelope::success(DEACTIVATED_MESSAGE));
        assert_eq!(
            d.executor().transport().writes(),
            vec![CommandTable::default().turn_off.as_bytes().to_vec()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn every_failure_is_the_same_500() {
        let transports = [
            MockTransport::new().connect_behavior(ConnectBehavior::Fail),
            MockTransport::new().connect_behavior(ConnectBehavior::NotConnected),
            MockTransport::new().connect_behavior(ConnectBehavior::Hang),
            MockTransport::new().fail_write_at(0),
            MockTransport::new().fail_write_at(1),
        ];

        for transport in transports {
            let d = dispatcher(transport);
            let reply = d.dispatch(Route::Activate).await;
            assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(reply.body.status, Status::Error);
            assert_eq!(reply.body.message, DEVICE_ERROR_MESSAGE);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_race_by_default() {
        let d = dispatcher(MockTransport::new().connect_latency(Duration::from_millis(100)));

        let (a, b) = tokio::join!(d.dispatch(Route::Activate), d.dispatch(Route::Deactivate));

        assert_eq!(a.status, StatusCode::OK);
        assert_eq!(b.status, StatusCode::OK);
        assert_eq!(d.executor().transport().max_open_links(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn serialized_requests_never_overlap() {
        let d = dispatcher(MockTransport::new().connect_latency(Duration::from_millis(100)))
            .serialized();

        let (a, b) = tokio::join!(d.dispatch(Route::Activate), d.dispatch(Route::Deactivate));

        assert_eq!(a.status, StatusCode::OK);
        assert_eq!(b.status, StatusCode::OK);
        assert_eq!(d.executor().transport().max_open_links(), 1);
        assert_eq!(d.executor().transport().connect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_request_keeps_the_gate_until_its_exchange_ends() {
        let d = dispatcher(MockTransport::new().connect_latency(Duration::from_millis(500)))
            .serialized();

        // the client goes away while the first exchange is still connecting
        let abandoned =
            tokio::time::timeout(Duration::from_millis(100), d.dispatch(Route::Activate)).await;
        assert!(abandoned.is_err());

        let reply = d.dispatch(Route::Deactivate).await;

        assert_eq!(reply.status, StatusCode::OK);
        let mock = d.executor().transport();
        assert_eq!(mock.max_open_links(), 1);
        assert_eq!(mock.connect_count(), 2);
        // the abandoned exchange still ran to completion before the next one
        let table = CommandTable::default();
        assert_eq!(
            mock.writes(),
            vec![
                table.turn_on.as_bytes().to_vec(),
                table.brightness_100.as_bytes().to_vec(),
                table.turn_off.as_bytes().to_vec(),
            ]
        );
    }
}
