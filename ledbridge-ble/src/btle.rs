//! btleplug backed transport
//!
//! Finds the peripheral by address, connects, discovers services and writes
//! with response.

use btleplug::api::{BDAddr, Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use std::time::Duration;
use uuid::Uuid;

use crate::transport::{Transport, TransportError};

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Get the default Bluetooth adapter
async fn get_adapter() -> Result<Adapter, TransportError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(TransportError::NoAdapter)
}

/// Share of the connect timeout spent scanning; the rest is left for
/// connecting and service discovery
fn scan_budget(timeout: Duration) -> Duration {
    timeout * 3 / 4
}

/// Stops a running scan when dropped, also when the scanning future is
/// cancelled half way
struct ScanGuard {
    adapter: Adapter,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        let adapter = self.adapter.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = adapter.stop_scan().await {
                    tracing::debug!("failed to stop scan: {e}");
                }
            });
        }
    }
}

/// Disconnects a peripheral that never made it back to the caller
struct PendingLink {
    device: Option<Peripheral>,
}

impl PendingLink {
    fn new(device: Peripheral) -> Self {
        Self {
            device: Some(device),
        }
    }

    fn hand_over(mut self) -> Option<Peripheral> {
        self.device.take()
    }
}

impl Drop for PendingLink {
    fn drop(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = device.disconnect().await {
                    tracing::warn!("failed to release abandoned connection: {e}");
                }
            });
        }
    }
}

/// Transport over the host's first Bluetooth adapter
#[derive(Clone)]
pub struct BtleplugTransport {
    adapter: Adapter,
}

impl BtleplugTransport {
    pub async fn new() -> Result<Self, TransportError> {
        let adapter = get_adapter().await?;
        Ok(Self { adapter })
    }

    async fn known_peripheral(
        &self,
        address: BDAddr,
    ) -> Result<Option<Peripheral>, TransportError> {
        let peripherals = self.adapter.peripherals().await?;
        Ok(peripherals.into_iter().find(|p| p.address() == address))
    }

    /// Scan until `address` shows up or `budget` runs out
    async fn find_peripheral(
        &self,
        address: BDAddr,
        budget: Duration,
    ) -> Result<Peripheral, TransportError> {
        // bluez keeps peripherals from earlier scans around
        if let Some(peripheral) = self.known_peripheral(address).await? {
            return Ok(peripheral);
        }

        self.adapter.start_scan(ScanFilter::default()).await?;
        let _scan = ScanGuard {
            adapter: self.adapter.clone(),
        };

        let found = tokio::time::timeout(budget, async {
            loop {
                if let Some(peripheral) = self.known_peripheral(address).await? {
                    return Ok::<_, TransportError>(peripheral);
                }
                tokio::time::sleep(SCAN_POLL_INTERVAL).await;
            }
        })
        .await;

        match found {
            Ok(r) => r,
            Err(_) => Err(TransportError::PeripheralNotFound(address.to_string())),
        }
    }
}

impl Transport for BtleplugTransport {
    type Link = Peripheral;

    async fn connect(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Peripheral, TransportError> {
        let address: BDAddr = address
            .parse()
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;

        let device = self.find_peripheral(address, scan_budget(timeout)).await?;

        // from here on a cancelled or failed connect still releases the radio
        let pending = PendingLink::new(device.clone());
        if let Err(e) = device.connect().await {
            return Err(e.into());
        }
        if let Err(e) = device.discover_services().await {
            if let Some(device) = pending.hand_over() {
                if let Err(e) = device.disconnect().await {
                    tracing::warn!("failed to disconnect after discovery error: {e}");
                }
            }
            return Err(e.into());
        }

        pending
            .hand_over()
            .ok_or_else(|| TransportError::Other("connection already released".to_string()))
    }

    async fn is_connected(&self, link: &Peripheral) -> Result<bool, TransportError> {
        Ok(link.is_connected().await?)
    }

    async fn write(
        &self,
        link: &Peripheral,
        characteristic: Uuid,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let target = link
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic)
            .ok_or(TransportError::CharacteristicNotFound(characteristic))?;

        link.write(&target, payload, WriteType::WithResponse).await?;
        Ok(())
    }

    async fn disconnect(&self, link: Peripheral) -> Result<(), TransportError> {
        // an unknown state still gets a disconnect attempt
        if let Ok(false) = link.is_connected().await {
            return Ok(());
        }
        link.disconnect().await?;
        Ok(())
    }
}
