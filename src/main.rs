use pak_keeper_lib::config::global::load_config;
use pak_keeper_lib::models::error::SError;
use pak_keeper_lib::models::paths::DataPathRules;
use pak_keeper_lib::utils::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("pak_keeper: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), SError> {
    let config = load_config();
    let _log_guard = logging::init(&DataPathRules::new(&config.data_root()).logs)?;

    let (registry, tasks) = pak_keeper_lib::start(&config).await?;

    if let Some(address) = sync_target() {
        let reg = registry.clone();
        match tokio::task::spawn_blocking(move || reg.sync_with_server(&address)).await {
            Ok(Ok(summary)) => info!("{}", summary.message()),
            Ok(Err(e)) => error!("server sync failed: {e}"),
            Err(e) => error!("server sync panicked: {e}"),
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    tasks.shutdown();
    Ok(())
}

fn sync_target() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--sync" {
            return args.next();
        }
    }
    None
}
