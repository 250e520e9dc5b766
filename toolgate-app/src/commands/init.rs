use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::config::Config;

const DEFAULT_RULES: &str = "\
# Tools that only read state. Always allowed.
read_only_tools:
  - db_query
  - echo
# Tools that change state. Allowed only with an approval token.
write_tools:
  - db_update
  - db_delete
# Every tool the gateway knows about. Anything else is denied as unknown.
all_known_tools:
  - db_query
  - echo
  - db_update
  - db_delete
";

/// Write a starter config and rules file.
pub fn run(config_path: &Path, force: bool) -> Result<()> {
    let config = Config::default();

    write_file(config_path, &config.to_yaml()?, force)?;
    println!("✓ Wrote {}", config_path.display());

    write_file(&config.rules_path, DEFAULT_RULES, force)?;
    println!("✓ Wrote {}", config.rules_path.display());

    println!("\nSet TOOLGATE_ADMIN_API_KEY (or admin_api_key) to enable policy reloads.");
    Ok(())
}

fn write_file(path: &Path, content: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
