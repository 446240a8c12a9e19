#[macro_use]
extern crate tracing;

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tuya_collector::hooks::{CsvExportHook, Hook, PlotHook};
use tuya_collector::{list, Config, ConfigWatcher, Poller, Timer};
use tuyaapi::Requestor;

#[derive(Parser)]
#[clap(author, version, about)]
struct Args {
    #[clap(short, long, action)]
    verbose: bool,
    #[clap(short, long, default_value = "config.json", help = "json or yaml config file")]
    config: PathBuf,
    #[clap(long, env = "TUYA_API_KEY", help = "overrides apiKey of the config file")]
    api_key: Option<String>,
    #[clap(
        long,
        env = "TUYA_SECRET_KEY",
        hide_env_values = true,
        help = "overrides secretKey of the config file"
    )]
    secret_key: Option<String>,
    #[clap(long, default_value = "history", help = "root directory of the csv files")]
    history_dir: PathBuf,
    #[clap(long, default_value = "error.log")]
    error_log: PathBuf,
    #[clap(long, action)]
    no_csv: bool,
    #[clap(long, action)]
    no_plot: bool,
    #[clap(long, action, help = "print all devices with their status and exit")]
    list: bool,
}

fn main() {
    dotenv::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        "info,tuyaapi=trace,tuya_collector=debug,reqwest=debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::builder().parse_lossy(log_level))
        .with(tracing_forest::ForestLayer::default())
        .init();

    if let Err(err) = run(args) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> tuya_collector::Result<Config> {
    let mut config = Config::from_file(&args.config)?;
    config.override_credentials(args.api_key.clone(), args.secret_key.clone());
    Ok(config)
}

fn connect(config: &Config) -> tuyaapi::Result<Requestor> {
    Requestor::with_endpoint(
        config.credentials(),
        &config.endpoint,
        config.request_timeout(),
    )
}

fn uid_device_id(config: &Config) -> Result<String> {
    config
        .uid_device_id()
        .map(ToString::to_string)
        .ok_or_else(|| anyhow!("no device configured"))
}

fn hooks(args: &Args, config: &Config) -> Vec<Box<dyn Hook>> {
    let mut hooks: Vec<Box<dyn Hook>> = Vec::new();
    if !args.no_csv {
        hooks.push(Box::new(CsvExportHook::new(&args.history_dir)));
    }
    if !args.no_plot {
        hooks.push(Box::new(PlotHook::new(
            config.devices_config.clone(),
            config.plot.clone(),
        )));
    }
    hooks
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    let requestor = connect(&config)?;

    if args.list {
        let uid = requestor.device_uid(&uid_device_id(&config)?)?;
        list::device_table(&requestor.user_devices(&uid)?).printstd();
        return Ok(());
    }

    let mut poller = Poller::connect(
        requestor,
        &uid_device_id(&config)?,
        hooks(&args, &config),
        Some(args.error_log.clone()),
    )?;
    let timer = Timer::with_period(config.period());

    let watcher = ConfigWatcher::new(&args.config)?;

    enum Action {
        ConfigFileChanged,
        Tick,
        Error(anyhow::Error),
    }
    use Action::*;

    loop {
        let action = flume::Selector::new()
            .recv(watcher.changes(), |recv| match recv {
                Err(err) => Error(anyhow!("config file watcher closed: {err}")),
                Ok(_) => ConfigFileChanged,
            })
            .recv(&timer.timer_rx(), |msg| match msg {
                Err(err) => Error(anyhow!("timer channel closed: {err}")),
                Ok(_) => Tick,
            })
            .wait();

        match action {
            Tick => {
                poller.poll();
            }
            ConfigFileChanged => {
                info!("config changed!");
                let new_config = match load_config(&args) {
                    Ok(c) => c,
                    Err(err) => {
                        error!("Cannot read config file: {err}");
                        warn!("will continue to use old config!");
                        continue;
                    }
                };

                if new_config.connection_changed(&config)
                    || new_config.uid_device_id() != config.uid_device_id()
                {
                    let reconnected = uid_device_id(&new_config).and_then(|device_id| {
                        let requestor = connect(&new_config)?;
                        poller.replace_source(requestor, &device_id)?;
                        Ok(())
                    });
                    if let Err(err) = reconnected {
                        error!("Cannot connect with new config: {err}");
                        warn!("will continue to use old config!");
                        continue;
                    }
                }

                poller.reconfigure(&new_config);
                timer.set_period(new_config.period());
                config = new_config;
            }
            Error(err) => return Err(err),
        };
    }
}
