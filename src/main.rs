use keel::logger::*;
use keel::server::*;
use keel::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    project_settings.validate()?;
    debug!(?project_settings);
    logger.reload_from_config(&project_settings.log_config())?;

    info!(
        service = %project_settings.http.name,
        version = %project_settings.http.version,
        run_level = ?project_settings.http.run_level,
        address = %project_settings.address()?,
        "starting"
    );

    let server = Server::try_new(&project_settings).await?;
    let served = server.run().await;
    if let Err(e) = &served {
        error!(error = %e, "server stopped with an error");
    }
    let closed = server.shutdown().await;

    served.and(closed)?;
    Ok(())
}
