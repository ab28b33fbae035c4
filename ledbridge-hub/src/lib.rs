extern crate self as ledbridge_hub;

mod client;
mod config;
mod dispatcher;
pub mod http;
pub mod logging;

pub use client::{TriggerError, TriggerOutcome, trigger};
pub use config::{CONFIG_FILE, Config, ConfigError, create_config, ledbridge_home, read_config};
pub use dispatcher::{
    ACTIVATED_MESSAGE, DEACTIVATED_MESSAGE, DEVICE_ERROR_MESSAGE, Dispatcher, HEALTH_MESSAGE,
    Reply, Route,
};
