//! Shared helpers for CLI commands.

use std::path::Path;

use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use qobf_circuit::{CatalogSet, TechniqueKind};
use qobf_program::Template;

/// Fail unless `path` names an existing file.
pub fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File '{}' does not exist", path.display());
    }
    Ok(())
}

/// Check every requested technique against the fixed list of names.
pub fn validate_techniques(names: &[String]) -> Result<()> {
    let available = TechniqueKind::names();
    for name in names {
        if !available.contains(&name.as_str()) {
            bail!(
                "'{name}' is not a valid circuit technique. Available: {}",
                available.join(", ")
            );
        }
    }
    Ok(())
}

/// Resolve a template id.
pub fn validate_template(name: &str) -> Result<Template> {
    match name.parse::<Template>() {
        Ok(template) => Ok(template),
        Err(_) => bail!(
            "'{name}' is not a valid program template. Available: {}",
            Template::available()
        ),
    }
}

/// Seeded generator when `seed` is given, entropy-seeded otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            debug!("Using seed {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

/// Catalogs from `data_dir`, or the built-in ones.
pub fn load_catalogs(data_dir: Option<&Path>) -> CatalogSet {
    match data_dir {
        Some(dir) => CatalogSet::load_from_dir(dir),
        None => CatalogSet::builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_valid_techniques() {
        let names: Vec<String> = ["cloaked", "inverse", "delayed", "composite"]
            .map(String::from)
            .to_vec();
        assert!(validate_techniques(&names).is_ok());
    }

    #[test]
    fn test_technique_allow_list_is_exact() {
        for bad in ["teleport", "Cloaked", " inverse"] {
            let err = validate_techniques(&[bad.to_string()]).unwrap_err();
            assert!(err.to_string().contains("is not a valid circuit technique"));
        }
    }

    #[test]
    fn test_template_validation() {
        assert_eq!(validate_template("shroud").unwrap(), Template::Shroud);
        let err = validate_template("cloaked").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'cloaked' is not a valid program template. Available: simple_entanglement, variable_pairs, shroud, deterministic"
        );
    }

    #[test]
    fn test_seeded_rng_repeats() {
        let a: u64 = make_rng(Some(9)).r#gen();
        let b: u64 = make_rng(Some(9)).r#gen();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.qasm");
        let err = ensure_exists(&path).unwrap_err();
        assert!(err.to_string().ends_with("gone.qasm' does not exist"));
    }

    #[test]
    fn test_empty_data_dir_gives_empty_catalogs() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_catalogs(Some(dir.path())), CatalogSet::default());
        assert!(!load_catalogs(None).cloaked.is_empty());
    }
}
