use clap::Parser;
use color_eyre::eyre::WrapErr;
use pwd_expiry_remediator::BatchRemediationController;
use pwd_expiry_remediator::cli::Cli;
use pwd_expiry_remediator::config::load_config;
use pwd_expiry_remediator::directory::LdapDirectory;
use pwd_expiry_remediator::failure_log::FileFailureLog;
use pwd_expiry_remediator::notify::smtp::build_transport;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_standard_tracing() {
    let default_directives = "pwd_expiry_remediator=info,ldap3=warn,lettre=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::eyre::Result<ExitCode> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    initialize_standard_tracing();

    let cli = Cli::parse();

    // Everything fatal happens before the first account is touched.
    let mut config = load_config(&cli.config)?;
    cli.apply_overrides(&mut config);
    let settings = config.into_settings()?;
    let mode = cli.mode()?;
    let identifiers = mode.identifiers();

    let transport = build_transport(&settings.smtp)
        .wrap_err_with(|| format!("Failed to set up SMTP transport for {}", settings.smtp.server))?;
    let failure_log = FileFailureLog::open(&settings.failure_log)?;
    let directory = LdapDirectory::connect(&settings.ldap)
        .await
        .wrap_err_with(|| format!("Failed to connect to {}", settings.ldap.url))?;

    tracing::info!(
        accounts = identifiers.len(),
        failure_log = %settings.failure_log.display(),
        "Starting password expiry remediation"
    );

    let mut controller = BatchRemediationController::new(directory, transport, failure_log);
    let summary = controller.run(identifiers, &settings.message).await;

    if let Err(e) = controller.directory_mut().shutdown().await {
        tracing::warn!(error = %e, "LDAP unbind failed");
    }

    println!(
        "Processed {} account(s): {} remediated, {} failed",
        summary.total,
        summary.succeeded(),
        summary.failed()
    );
    if !summary.is_clean() {
        println!("Failed identifiers were recorded in {}", settings.failure_log.display());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
