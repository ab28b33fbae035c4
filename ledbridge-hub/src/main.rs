use std::sync::Arc;

#[derive(clap::Parser)]
#[command(name = "ledbridge")]
#[command(about = "HTTP to BLE bridge for an LED strip controller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a config file with the default payloads and timings
    InitConfig {
        /// BLE address of the LED controller
        #[arg(long)]
        address: String,
        /// Characteristic UUID commands are written to
        #[arg(long)]
        characteristic: uuid::Uuid,
    },
    /// Run the server
    Run {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        characteristic: Option<uuid::Uuid>,
        /// Handle one BLE exchange at a time
        #[arg(long)]
        serialize: bool,
    },
    /// Call a bridge endpoint, e.g. http://raspberrypi.local:18331/ac
    Trigger { url: String },
}

#[tokio::main]
async fn main() {
    let cli: Cli = clap::Parser::parse();
    let home = match ledbridge_hub::ledbridge_home() {
        Ok(home) => home,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::InitConfig {
            address,
            characteristic,
        } => {
            let config = ledbridge_hub::Config::new(address, characteristic);
            match ledbridge_hub::create_config(&home, &config) {
                Ok(path) => println!("Created config at {}", path.display()),
                Err(e) => {
                    eprintln!("Failed to create config: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Run {
            host,
            port,
            address,
            characteristic,
            serialize,
        } => {
            let config = match load_config(&home, host, port, address, characteristic, serialize) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to read config: {e}");
                    std::process::exit(1);
                }
            };
            ledbridge_hub::logging::init(&config.log_level);
            if let Err(e) = serve(config).await {
                tracing::error!("server stopped: {e}");
                std::process::exit(1);
            }
        }
        Commands::Trigger { url } => match ledbridge_hub::trigger(&url).await {
            Ok(outcome) => {
                let message = outcome
                    .envelope
                    .as_ref()
                    .map(|e| e.message.as_str())
                    .unwrap_or("(no message)");
                println!("{}: {message}", outcome.status);
                if !outcome.is_success() {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("Failed to trigger webhook: {e}");
                std::process::exit(1);
            }
        },
    }
}

/// Config file plus command line overrides. Without a file, `--address` and
/// `--characteristic` are enough to run with defaults.
fn load_config(
    home: &std::path::Path,
    host: Option<String>,
    port: Option<u16>,
    address: Option<String>,
    characteristic: Option<uuid::Uuid>,
    serialize: bool,
) -> Result<ledbridge_hub::Config, ledbridge_hub::ConfigError> {
    let mut config = match ledbridge_hub::read_config(home) {
        Ok(config) => config,
        Err(ledbridge_hub::ConfigError::NotFound(path)) => match (&address, characteristic) {
            (Some(address), Some(characteristic)) => {
                ledbridge_hub::Config::new(address.clone(), characteristic)
            }
            _ => return Err(ledbridge_hub::ConfigError::NotFound(path)),
        },
        Err(e) => return Err(e),
    };

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(address) = address {
        config.address = address;
    }
    if let Some(characteristic) = characteristic {
        config.characteristic = characteristic;
    }
    config.serialize_requests |= serialize;

    config.validate()?;
    Ok(config)
}

async fn serve(config: ledbridge_hub::Config) -> Result<(), Box<dyn std::error::Error>> {
    let transport = ledbridge_ble::BtleplugTransport::new().await?;
    let executor = ledbridge_ble::Executor::new(transport, config.peripheral(), config.pacing());

    let mut dispatcher = ledbridge_hub::Dispatcher::new(executor, config.commands.clone());
    if config.serialize_requests {
        dispatcher = dispatcher.serialized();
    }

    let addr = config.listen_addr();
    let listener = ledbridge_hub::http::bind(&addr)
        .await
        .map_err(|e| format!("failed to bind to {addr}: {e}"))?;

    tokio::select! {
        r = ledbridge_hub::http::run_server(listener, Arc::new(dispatcher)) => r?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}
