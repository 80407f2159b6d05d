use std::path::Path;

use crescent_core::CrescentConfig;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    let output = path.join("crescent.toml");
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }
    std::fs::write(&output, CrescentConfig::scaffold().to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_scaffold_once() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path(), false).unwrap();

        let written = CrescentConfig::from_file(&dir.path().join("crescent.toml")).unwrap();
        assert_eq!(written, CrescentConfig::scaffold());

        assert!(init(dir.path(), false).is_err());
        assert!(init(dir.path(), true).is_ok());
    }
}
