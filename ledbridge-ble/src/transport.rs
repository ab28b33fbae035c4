use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error("invalid peripheral address {0:?}")]
    InvalidAddress(String),
    #[error("peripheral {0} not found")]
    PeripheralNotFound(String),
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),
    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),
    #[error("{0}")]
    Other(String),
}

/// The BLE operations the executor needs.
///
/// `Link` is whatever handle the backend uses for one open connection. Every
/// link returned by `connect` is handed back to `disconnect` exactly once.
pub trait Transport: Send + Sync + 'static {
    type Link: Send + Sync;

    /// Open a link to `address`.
    ///
    /// The caller may drop this future at any point (the executor enforces
    /// the timeout from outside). A dropped or failed connect must release
    /// whatever it had already opened, since no link reaches `disconnect`.
    fn connect(
        &self,
        address: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;

    fn is_connected(
        &self,
        link: &Self::Link,
    ) -> impl Future<Output = Result<bool, TransportError>> + Send;

    /// Confirmed write: resolves once the peripheral acknowledged the payload
    fn write(
        &self,
        link: &Self::Link,
        characteristic: Uuid,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn disconnect(
        &self,
        link: Self::Link,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
