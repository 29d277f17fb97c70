//! Program command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use qobf_program::{ProgramObfuscator, TemplateDirectory};

use super::common::{ensure_exists, load_catalogs, make_rng, validate_template};
use crate::config::QobfConfig;

/// Execute the program command.
///
/// Only the first template is applied; extra ones are reported and ignored.
pub fn execute(
    file: &Path,
    templates: &[String],
    config: &QobfConfig,
    seed: Option<u64>,
) -> Result<()> {
    let Some(name) = templates.first() else {
        anyhow::bail!("No template given");
    };
    let template = validate_template(name)?;
    ensure_exists(file)?;

    if templates.len() > 1 {
        println!(
            "{} Program obfuscation applies one template at a time; using {}",
            style("!").yellow().bold(),
            style(template).yellow()
        );
    }
    println!(
        "{} Obfuscating program {} with {}",
        style("→").cyan().bold(),
        style(file.display()).green(),
        style(template).yellow()
    );

    let catalogs = load_catalogs(config.circuit.data_dir.as_deref());
    let mut obfuscator = ProgramObfuscator::new(&catalogs.inverse)
        .with_renamer(config.program.renamer())
        .with_splitter(config.program.splitter());
    if let Some(dir) = &config.program.template_dir {
        obfuscator = obfuscator.with_sink(TemplateDirectory::new(dir));
    }

    let mut rng = make_rng(seed);
    let output = obfuscator.obfuscate_file(file, template, &mut rng)?;
    println!("  {} lines written", output.text.lines().count());
    println!(
        "{} Saved to {}",
        style("✓").green().bold(),
        style(output.path.display()).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("job.py");
        std::fs::write(&input, "widget = 3\nprint(widget * 2)\n").unwrap();

        execute(
            &input,
            &["variable_pairs".to_string()],
            &QobfConfig::default(),
            Some(4),
        )
        .unwrap();
        let written = std::fs::read_to_string(dir.path().join("job_obf_variable_pairs.py")).unwrap();
        assert!(written.contains("# Template: variable_pairs"));
        assert!(!written.contains("widget"));
    }

    #[test]
    fn test_first_template_wins() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("job.py");
        std::fs::write(&input, "print('x')\n").unwrap();

        execute(
            &input,
            &["shroud".to_string(), "deterministic".to_string()],
            &QobfConfig::default(),
            Some(1),
        )
        .unwrap();
        assert!(dir.path().join("job_obf_shroud.py").is_file());
        assert!(!dir.path().join("job_obf_deterministic.py").exists());
    }

    #[test]
    fn test_unknown_template_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("job.py");
        std::fs::write(&input, "print('x')\n").unwrap();
        assert!(execute(&input, &["spiral".to_string()], &QobfConfig::default(), None).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
