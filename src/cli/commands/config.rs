use crate::cli::StorageArgs;
use crate::config::ServiceConfig;
use crate::error::Result;
use std::path::Path;

/// Execute the config command: print the resolved configuration.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or resolved.
pub fn execute(config_path: Option<&Path>, args: &StorageArgs) -> Result<()> {
    let config = ServiceConfig::load(config_path, &args.overrides())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
