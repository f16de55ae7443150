use crate::cli::StorageArgs;
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::service::Services;
use std::path::Path;

/// Execute the init command.
///
/// Opening the storage applies the schema, so running it again is harmless.
///
/// # Errors
///
/// Returns an error if the database or attachments directory cannot be
/// created.
pub fn execute(config_path: Option<&Path>, args: &StorageArgs) -> Result<()> {
    let config = ServiceConfig::load(config_path, &args.overrides())?;
    let services = Services::open(&config)?;
    let issues = services.issues.count()?;

    println!(
        "Initialized {} ({issues} issues), attachments in {}",
        config.db_path.display(),
        config.attachments_dir.display()
    );
    Ok(())
}
