use crate::api;
use crate::cli::ServeArgs;
use crate::config::ServiceConfig;
use crate::error::{Result, ResultExt};
use crate::service::Services;
use std::path::Path;
use tracing::info;

/// Execute the serve command.
///
/// # Errors
///
/// Returns an error if configuration, storage or the listener fails.
pub fn execute(config_path: Option<&Path>, args: &ServeArgs) -> Result<()> {
    let config = ServiceConfig::load(config_path, &args.overrides())?;
    let services = Services::open(&config)?;
    info!(
        db = %config.db_path.display(),
        attachments = %config.attachments_dir.display(),
        issues = services.issues.count()?,
        "Storage ready"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(api::serve(services, config.bind))
}
