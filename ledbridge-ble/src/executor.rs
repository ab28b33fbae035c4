use std::time::Duration;
use uuid::Uuid;

use ledbridge_proto::CommandSequence;
use ledbridge_proto::ble::{COMMAND_DELAY_MS, CONNECT_TIMEOUT_MS};

use crate::transport::{Transport, TransportError};

/// Where commands are delivered: one device, one characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralIdentity {
    pub address: String,
    pub characteristic: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub connect_timeout: Duration,
    pub command_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            command_delay: Duration::from_millis(COMMAND_DELAY_MS),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("connecting to {address} timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },
    #[error("could not connect to {address}: {source}")]
    Connect {
        address: String,
        source: TransportError,
    },
    #[error("{address} is not connected")]
    NotConnected { address: String },
    #[error("command {index}/{total} failed: {source}")]
    Write {
        index: usize,
        total: usize,
        source: TransportError,
    },
}

/// Runs one connect, write, disconnect cycle per call.
///
/// Nothing is kept between calls: every `run` opens its own connection and
/// releases it before returning.
pub struct Executor<T> {
    transport: T,
    peripheral: PeripheralIdentity,
    pacing: Pacing,
}

impl<T: Transport> Executor<T> {
    pub fn new(transport: T, peripheral: PeripheralIdentity, pacing: Pacing) -> Self {
        Self {
            transport,
            peripheral,
            pacing,
        }
    }

    pub fn peripheral(&self) -> &PeripheralIdentity {
        &self.peripheral
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deliver `sequence` in order.
    ///
    /// Stops at the first failing write; commands already written stay
    /// applied. The error is logged here, callers only need to know that it
    /// failed.
    pub async fn run(&self, sequence: &CommandSequence) -> Result<(), ExecuteError> {
        let address = self.peripheral.address.as_str();
        tracing::info!(%address, "connecting");

        let result = self.connect_and_write(sequence).await;
        match &result {
            Ok(()) => tracing::info!(%address, commands = sequence.len(), "all commands sent"),
            Err(e) => tracing::error!(%address, "BLE error: {e}"),
        }
        result
    }

    async fn connect_and_write(&self, sequence: &CommandSequence) -> Result<(), ExecuteError> {
        let address = &self.peripheral.address;
        let timeout = self.pacing.connect_timeout;

        // a connect dropped here on timeout releases what it opened itself
        let connect = self.transport.connect(address, timeout);
        let link = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(link)) => link,
            Ok(Err(source)) => {
                return Err(ExecuteError::Connect {
                    address: address.clone(),
                    source,
                });
            }
            Err(_) => {
                return Err(ExecuteError::ConnectTimeout {
                    address: address.clone(),
                    timeout,
                });
            }
        };

        let result = self.write_all(&link, sequence).await;

        // released on every path once a link exists
        if let Err(e) = self.transport.disconnect(link).await {
            tracing::warn!(%address, "disconnect failed: {e}");
        }

        result
    }

    async fn write_all(
        &self,
        link: &T::Link,
        sequence: &CommandSequence,
    ) -> Result<(), ExecuteError> {
        let address = &self.peripheral.address;
        match self.transport.is_connected(link).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(ExecuteError::NotConnected {
                    address: address.clone(),
                });
            }
            Err(source) => {
                return Err(ExecuteError::Connect {
                    address: address.clone(),
                    source,
                });
            }
        }

        let total = sequence.len();
        for (i, command) in sequence.iter().enumerate() {
            tracing::info!("-> command {}/{}: {command}", i + 1, total);
            self.transport
                .write(link, self.peripheral.characteristic, command.as_bytes())
                .await
                .map_err(|source| ExecuteError::Write {
                    index: i + 1,
                    total,
                    source,
                })?;

            if i + 1 < total {
                tokio::time::sleep(self.pacing.command_delay).await;
            }
        }
        Ok(())
    }
}
