//! Default payloads and timings for the LED strip controller
//!
//! The bytes are vendor specific. They match the common `7e .. ef` framed
//! controllers; other models need their own values in the config file.

/// Default port the bridge listens on
pub const DEFAULT_PORT: u16 = 18331;

/// Default bind address (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Upper bound for establishing a connection, in milliseconds
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Pause between two consecutive writes of one sequence, in milliseconds
pub const COMMAND_DELAY_MS: u64 = 200;

/// Command payloads
pub mod commands {
    /// Switch the strip on
    pub const TURN_ON: [u8; 9] = [0x7e, 0x00, 0x04, 0xf0, 0x00, 0x01, 0xff, 0x00, 0xef];

    /// Switch the strip off
    pub const TURN_OFF: [u8; 9] = [0x7e, 0x00, 0x04, 0x00, 0x00, 0x00, 0xff, 0x00, 0xef];

    /// Set brightness to 100%
    pub const BRIGHTNESS_100: [u8; 9] = [0x7e, 0x00, 0x01, 0xff, 0x00, 0x00, 0x00, 0x00, 0xef];
}
