//! LED bridge BLE executor
//!
//! Delivers a command sequence to the LED controller: connect, write each
//! command with a pause in between, disconnect.
//!
//! # Example
//!
//! ```ignore
//! use ledbridge_ble::{BtleplugTransport, Executor, Pacing, PeripheralIdentity};
//! use ledbridge_proto::CommandTable;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = BtleplugTransport::new().await?;
//!     let peripheral = PeripheralIdentity {
//!         address: "BE:58:30:00:CC:4A".to_string(),
//!         characteristic: "0000fff3-0000-1000-8000-00805f9b34fb".parse()?,
//!     };
//!     let executor = Executor::new(transport, peripheral, Pacing::default());
//!
//!     executor.run(&CommandTable::default().activate()).await?;
//!     Ok(())
//! }
//! ```

mod btle;
mod executor;
mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use btle::BtleplugTransport;
pub use executor::{ExecuteError, Executor, Pacing, PeripheralIdentity};
pub use transport::{Transport, TransportError};
