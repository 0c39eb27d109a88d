//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const TEMPLATE: &str = r#"# woven configuration

[weaver]
# Path of the advice runtime in generated code
# runtime = "::woven::runtime"
# Attribute written on every woven method
# marker = "::woven::advised"
output_dir = "target/woven"
# Persistent cache; in memory when unset
cache_dir = "target/woven-cache"
# Units that are never woven
exempt = []

[roots]
crate = "src"

[transformers]
recursive-load = true
source-location = true
proxy = true

# Named pointcuts, referenced as `pointcut(name)`
[pointcuts]
# billing = "within(crate::billing::**)"

# [[aspects]]
# name = "LogAll"
# pointcut = "* charge(*)"
# advice = "crate::aspects::log_call"
# kind = "before"        # before | after | around | after-throwing
# priority = 0           # lower runs outermost
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    write_template(Path::new("woven.toml"), force)?;

    println!("Created woven.toml");
    println!("\nNext steps:");
    println!("  1. Add [[aspects]] to woven.toml");
    println!("  2. Run: woven match");
    println!("  3. Run: woven weave");
    Ok(())
}

fn write_template(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    std::fs::write(path, TEMPLATE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_a_valid_config() {
        let config = woven::Config::parse(TEMPLATE).unwrap();
        assert!(config.aspects.is_empty());
        assert!(config.is_transformer_enabled("proxy"));
    }

    #[test]
    fn existing_file_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("woven.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(write_template(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        write_template(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TEMPLATE);
    }
}
