use keel::logger::*;
use keel::settings::RunLevel;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    for run_level in [RunLevel::Local, RunLevel::Stage, RunLevel::Production] {
        let config = LogConfig {
            filter: run_level.default_filter().to_string(),
        };
        logger.reload_from_config(&config)?;
        println!("-- run level {:?} ({})", run_level, config.filter);
        debug!("application debug log");
        info!("application info log");
        error!("application error log");
    }

    // malformed directives are refused and the previous filter stays
    let bad = LogConfig {
        filter: "keel=[".to_string(),
    };
    println!("Error on malformed filter: {:?}", logger.reload_from_config(&bad).is_err());

    Ok(())
}
