//! Circuit command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use qobf_circuit::{CircuitPipeline, PipelineReport, TechniqueRequest};

use super::common::{ensure_exists, load_catalogs, make_rng, validate_techniques};
use crate::config::CircuitConfig;

/// Execute the circuit command.
pub fn execute(
    file: &Path,
    techniques: &[String],
    probability: Option<f64>,
    density: Option<f64>,
    config: &CircuitConfig,
    seed: Option<u64>,
) -> Result<()> {
    validate_techniques(techniques)?;
    ensure_exists(file)?;

    println!(
        "{} Obfuscating circuit {} with {}",
        style("→").cyan().bold(),
        style(file.display()).green(),
        style(techniques.join(", ")).yellow()
    );

    let catalogs = load_catalogs(config.data_dir.as_deref());
    let pipeline = CircuitPipeline::new(catalogs).with_limits(config.limits());
    let requests = requests(techniques, probability, density);

    let mut rng = make_rng(seed);
    let report = pipeline.run_file(file, &requests, &mut rng)?;
    print_report(&report);
    Ok(())
}

/// One request per technique, sharing the command-line tuning values.
fn requests(
    techniques: &[String],
    probability: Option<f64>,
    density: Option<f64>,
) -> Vec<TechniqueRequest> {
    techniques
        .iter()
        .map(|name| {
            let mut request = TechniqueRequest::new(name.as_str());
            request.probability = probability;
            request.density = density;
            request
        })
        .collect()
}

fn print_report(report: &PipelineReport) {
    for stage in &report.stages {
        if stage.applied {
            println!(
                "  {}: {} → {} gates, depth {} ({:.2?})",
                style(&stage.technique).cyan(),
                stage.gates_before,
                stage.gates_after,
                stage.depth,
                stage.elapsed
            );
        } else {
            println!("  {}: skipped", style(&stage.technique).dim());
        }
    }
    for advisory in &report.advisories {
        println!("{} {advisory}", style("!").yellow().bold());
    }
    if let Some(path) = &report.output_path {
        println!(
            "{} Saved to {}",
            style("✓").green().bold(),
            style(path.display()).green()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_share_tuning() {
        let names = vec!["cloaked".to_string(), "composite".to_string()];
        let built = requests(&names, Some(0.5), None);
        assert_eq!(built.len(), 2);
        assert_eq!(built[1].name, "composite");
        assert!(built.iter().all(|r| r.probability == Some(0.5)));
        assert!(built.iter().all(|r| r.density.is_none()));
    }

    #[test]
    fn test_execute_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bell.qasm");
        std::fs::write(
            &input,
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0],q[1];\nmeasure q -> c;\n",
        )
        .unwrap();

        execute(
            &input,
            &["cloaked".to_string(), "inverse".to_string()],
            None,
            None,
            &CircuitConfig::default(),
            Some(3),
        )
        .unwrap();
        assert!(dir.path().join("bell_obfuscated.qasm").is_file());
    }

    #[test]
    fn test_execute_rejects_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bell.qasm");
        let err = execute(
            &input,
            &["teleport".to_string()],
            None,
            None,
            &CircuitConfig::default(),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("'teleport' is not a valid"));
    }

    #[test]
    fn test_qubit_limit_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("wide.qasm");
        std::fs::write(&input, "OPENQASM 2.0;\nqreg q[4];\nh q[0];\n").unwrap();
        let config = CircuitConfig {
            max_qubits: 2,
            ..CircuitConfig::default()
        };

        assert!(execute(&input, &["inverse".to_string()], None, None, &config, Some(0)).is_err());
        assert!(!dir.path().join("wide_obfuscated.qasm").exists());
    }
}
