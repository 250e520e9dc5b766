use anyhow::{Context, Result};
use toolgate_infra::ChainedEvidenceLog;
use toolgate_policy::{RuleSource, YamlRuleSource};

use crate::config::Config;

/// Validate the rules file and evidence log without starting the server.
/// Returns whether everything checked out.
pub async fn run(config: &Config) -> Result<bool> {
    println!("Gateway configuration check\n");
    let mut healthy = true;

    print!("Rules file {} ... ", config.rules_path.display());
    match YamlRuleSource::new(&config.rules_path).fetch().await {
        Ok(rules) => {
            println!(
                "✓ ({} read-only, {} write, {} known)",
                rules.read_only_tools.len(),
                rules.write_tools.len(),
                rules.all_known_tools.len()
            );
            let overlap = rules.overlapping_tools();
            if !overlap.is_empty() {
                println!("  ! classified as both read-only and write: {}", overlap.join(", "));
            }
        }
        Err(e) => {
            println!("✗ ({})", e);
            healthy = false;
        }
    }

    if let Some(path) = &config.evidence_log {
        print!("Evidence log {} ... ", path.display());
        if path.exists() {
            let verified = ChainedEvidenceLog::open(path)
                .and_then(|log| log.load_entries())
                .with_context(|| format!("checking {}", path.display()));
            match verified {
                Ok(entries) => println!("✓ ({} entries, chain intact)", entries.len()),
                Err(e) => {
                    println!("✗ ({:#})", e);
                    healthy = false;
                }
            }
        } else {
            println!("- (not created yet)");
        }
    }

    Ok(finish(healthy, config))
}

fn finish(healthy: bool, config: &Config) -> bool {
    print!("Admin API key ... ");
    if config.admin_api_key.is_some() {
        println!("✓");
    } else {
        println!("- (not set, admin endpoints closed)");
    }

    println!();
    if healthy {
        println!("All checks passed");
    } else {
        println!("Some checks failed");
    }
    healthy
}
