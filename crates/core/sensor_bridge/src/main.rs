use anyhow::Context;
use clap::Parser;
use clock::WallClock;
use figment::providers::Serialized;
use sensor_bridge::config::DEFAULT_CONFIG_DIR;
use sensor_bridge::force_update::force_update;
use sensor_bridge::BridgeConfig;
use std::path::PathBuf;
use std::sync::Arc;

const AFTER_HELP_TEXT: &str = r#"`sensor-bridge` subscribes to the MQTT topics of the sensors found in the data directory,
each sensor having its own sub-directory named after its id, with a `<id>.json` or `<id>.yaml` descriptor.
New sensor directories are detected while running.

The messages received from the sensors are stored in `<data-dir>/<id>/messages/<measurement>-messages.json`,
keeping only the most recent ones.

The `CONFIG_DIR` is used to store:
  * sensor-bridge.toml - the configuration file, with `mqtt`, `data`, `retention` and `discovery` sections"#;

#[derive(Debug, clap::Parser)]
#[clap(
name = clap::crate_name!(),
version = clap::crate_version!(),
about = clap::crate_description!(),
after_help = AFTER_HELP_TEXT
)]
pub struct BridgeOpt {
    /// Turn-on the debug log level.
    ///
    /// If off only reports ERROR, WARN, and INFO
    /// If on also reports DEBUG
    #[clap(long, global = true)]
    pub debug: bool,

    #[clap(long = "config-dir", default_value = DEFAULT_CONFIG_DIR, global = true)]
    pub config_dir: PathBuf,

    /// The MQTT broker to connect, e.g. mqtt://localhost:1883
    #[clap(long = "broker-url", global = true)]
    pub broker_url: Option<String>,

    /// The directory of the sensors
    #[clap(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<BridgeCommand>,
}

#[derive(Debug, clap::Subcommand)]
pub enum BridgeCommand {
    /// Run the bridge (the default)
    Run,

    /// Ask a sensor to publish its measurements now
    ForceUpdate {
        /// The type of the sensor, e.g. ESP32
        #[clap(long = "sensor-type")]
        sensor_type: String,

        /// The id of the sensor
        #[clap(long = "sensor-id")]
        sensor_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    let opt = BridgeOpt::parse();
    bridge_utils::logging::initialise_tracing_subscriber(opt.debug);

    let mut figment = BridgeConfig::figment(&opt.config_dir);
    if let Some(url) = opt.broker_url {
        figment = figment.merge(Serialized::default("mqtt.url", url));
    }
    if let Some(data_dir) = opt.data_dir {
        figment = figment.merge(Serialized::default("data.root", data_dir));
    }
    let config = BridgeConfig::from_figment(figment).with_context(|| {
        format!(
            "Failed to load the configuration from {}",
            opt.config_dir.display()
        )
    })?;

    // The local offset has to be read before any thread is spawned
    let clock = Arc::new(WallClock::new());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match opt.command.unwrap_or(BridgeCommand::Run) {
        BridgeCommand::Run => runtime.block_on(sensor_bridge::run(config, clock))?,
        BridgeCommand::ForceUpdate {
            sensor_type,
            sensor_id,
        } => runtime.block_on(force_update(&config, &sensor_type, &sensor_id))?,
    }
    Ok(())
}
