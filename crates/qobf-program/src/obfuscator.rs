//! The program pipeline: rename, split, fill a template, write.

use std::fs;
use std::path::{Path, PathBuf};

use qobf_circuit::{NoiseSynthesizer, SequenceBank};
use rand::RngCore;
use tracing::{debug, info, instrument};

use crate::decoy::{DEFAULT_PREFIX, DEFAULT_SUFFIX_LEN, decoy_method, identifier};
use crate::error::{ProgramError, ProgramResult};
use crate::renamer::SymbolRenamer;
use crate::snippet::{LINE_SEPARATOR, circuit_lines, noise_snippet};
use crate::splitter::{DependencySplitter, EMPTY_FRAGMENT};
use crate::template::{BuiltinTemplates, Template, TemplateSink, TemplateValues};
use crate::trigger::deterministic_circuit;

/// Indentation of payload code inside a template branch.
const PAYLOAD_INDENT: usize = 8;
/// Indentation of the second shroud fragment, one block deeper.
const NESTED_PAYLOAD_INDENT: usize = 12;

const HEADER_RULE: &str =
    "# ======================================================================";

/// A written program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutput {
    pub path: PathBuf,
    pub text: String,
}

/// Wraps payload programs in circuit-gated control flow.
pub struct ProgramObfuscator {
    renamer: SymbolRenamer,
    splitter: DependencySplitter,
    synthesizer: NoiseSynthesizer,
    sink: Box<dyn TemplateSink + Send + Sync>,
}

impl ProgramObfuscator {
    /// Noise is drawn from `noise_bank` (the inverse catalog).
    pub fn new(noise_bank: &SequenceBank) -> Self {
        Self {
            renamer: SymbolRenamer::new(),
            splitter: DependencySplitter::new(),
            synthesizer: NoiseSynthesizer::new(noise_bank),
            sink: Box::new(BuiltinTemplates),
        }
    }

    #[must_use]
    pub fn with_renamer(mut self, renamer: SymbolRenamer) -> Self {
        self.renamer = renamer;
        self
    }

    #[must_use]
    pub fn with_splitter(mut self, splitter: DependencySplitter) -> Self {
        self.splitter = splitter;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl TemplateSink + Send + Sync + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Obfuscate the file at `path` and write `<base>_obf_<template><ext>`
    /// next to it.
    #[instrument(skip(self, path, rng), fields(path = %path.display(), template = %template))]
    pub fn obfuscate_file(
        &self,
        path: &Path,
        template: Template,
        rng: &mut dyn RngCore,
    ) -> ProgramResult<ProgramOutput> {
        info!("Reading {}", path.display());
        let source = fs::read_to_string(path).map_err(|source| ProgramError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let body = self.obfuscate_source(&source, template, rng)?;
        let origin = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = format!("{}{body}", header(&origin, template));

        let output = output_path(path, template);
        fs::write(&output, &text).map_err(|source| ProgramError::Io {
            path: output.clone(),
            source,
        })?;
        info!("Wrote {} using {}", output.display(), self.sink.describe());
        Ok(ProgramOutput { path: output, text })
    }

    /// Rename `source` and fill `template` around it, without the header.
    pub fn obfuscate_source(
        &self,
        source: &str,
        template: Template,
        rng: &mut dyn RngCore,
    ) -> ProgramResult<String> {
        let (renamed, symbols) = self.renamer.rename_with_map(source, rng);
        let payload = if renamed.trim().is_empty() {
            EMPTY_FRAGMENT
        } else {
            renamed.as_str()
        };

        let qc = identifier(rng, "casss", DEFAULT_SUFFIX_LEN);
        let plan = template.noise_plan();
        let mut values = TemplateValues::new();
        for (key, targets) in ["NoiseGenerator", "NoiseGenerator2", "NoiseGenerator3"]
            .into_iter()
            .zip(plan.targets)
        {
            let snippet = noise_snippet(&self.synthesizer, targets, plan.repeats, &qc, rng)?;
            values.insert(key, snippet);
        }

        values.insert("expected_outcome", "0");
        values.insert("random_method", decoy_method(rng));
        for (key, prefix) in [
            ("rand_var1", DEFAULT_PREFIX),
            ("rand_var2", "val"),
            ("rand_var3", DEFAULT_PREFIX),
            ("rand_result", "res"),
            ("outcome_var", "dsa"),
            ("trigger_func", "func"),
            ("pattern_var", "pattern"),
            ("rand_id", "ctx"),
            ("main", DEFAULT_PREFIX),
        ] {
            values.insert(key, identifier(rng, prefix, DEFAULT_SUFFIX_LEN));
        }

        let indented = indent(&format!("{}\n", payload.trim_end()), PAYLOAD_INDENT);
        if template.splits_payload() {
            let (first, second) = self.splitter.renamed(&symbols).split(payload, rng);
            values.insert("indented_code_part1", indent(&format!("{first}\n"), PAYLOAD_INDENT));
            values.insert(
                "indented_code_part2",
                indent(&format!("{second}\n"), NESTED_PAYLOAD_INDENT),
            );
        } else {
            values.insert("indented_code_part1", &indented);
            values.insert("indented_code_part2", &indented);
        }
        values.insert("indented_code", indented);

        if template.needs_trigger() {
            let (trigger, expected) = deterministic_circuit(rng)?;
            let lines = circuit_lines(&trigger, &qc);
            values.insert(
                "circuit_build_instructions",
                format!("    {}", lines.join(LINE_SEPARATOR)),
            );
            values.insert("expected_outcome", expected);
            values.insert("num_qubits", trigger.num_qubits());
            values.insert("num_clbits", trigger.num_clbits());
        }
        values.insert("qc", qc);

        debug!("Filling {template} from {}", self.sink.describe());
        self.sink.fill(template, &values)
    }
}

/// Prefix every non-blank line with `width` spaces.
fn indent(text: &str, width: usize) -> String {
    let prefix = " ".repeat(width);
    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect()
}

/// Provenance banner placed above the filled template.
fn header(origin: &str, template: Template) -> String {
    let generated = chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f");
    format!(
        "{HEADER_RULE}\n# Obfuscated from: {origin}\n# Template: {template}\n# Generated: {generated}\n{HEADER_RULE}\n\n"
    )
}

/// `<base>_obf_<template><ext>` next to `path`.
pub fn output_path(path: &Path, template: Template) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_obf_{}{ext}", template.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn obfuscator() -> ProgramObfuscator {
        ProgramObfuscator::new(&SequenceBank::new(vec![vec!["x".into(), "x".into()]]))
    }

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(indent("a\n\n  \nb\n", 4), "    a\n\n  \n    b\n");
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/tmp/job/payload.py"), Template::Shroud),
            Path::new("/tmp/job/payload_obf_shroud.py")
        );
        assert_eq!(
            output_path(Path::new("script"), Template::Deterministic),
            Path::new("script_obf_deterministic")
        );
    }

    #[test]
    fn test_header_layout() {
        let text = header("payload.py", Template::VariablePairs);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER_RULE);
        assert_eq!(lines[1], "# Obfuscated from: payload.py");
        assert_eq!(lines[2], "# Template: variable_pairs");
        assert!(lines[3].starts_with("# Generated: 20"));
        assert_eq!(lines[4], HEADER_RULE);
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn test_every_template_fills_and_parses() {
        let source = "import math\nimport json\n\ndef area(r):\n    return math.pi * r ** 2\n\nsize = area(2)\nprint(json.dumps(size))\n";
        for (seed, template) in Template::ALL.into_iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(seed as u64);
            let text = obfuscator()
                .obfuscate_source(source, template, &mut rng)
                .unwrap();
            assert!(!text.contains("def area("), "{template}");
            assert!(text.contains("import json"), "{template}");
            assert!(!text.contains("{NoiseGenerator"), "{template}");
            if let Err(e) = qobf_script::parse(&text) {
                panic!("{template} output does not parse: {e}\n{text}");
            }
        }
    }

    #[test]
    fn test_deterministic_embeds_trigger() {
        let mut rng = StdRng::seed_from_u64(8);
        let text = obfuscator()
            .obfuscate_source("print('payload')\n", Template::Deterministic, &mut rng)
            .unwrap();
        assert!(text.contains("== '11111':\n        print('payload')\n"));
        assert!(text.contains(".QuantumCircuit(5, 5)"));
        assert_eq!(text.matches(".measure(").count(), 5);
    }

    #[test]
    fn test_protected_function_reaches_both_fragments() {
        let source = "def helper():\n    return 1\n\na = 1\nb = 2\nc = 3\nd = 4\n";
        let obfuscator =
            obfuscator().with_splitter(DependencySplitter::new().with_protected(["helper"]));
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let text = obfuscator
                .obfuscate_source(source, Template::Shroud, &mut rng)
                .unwrap();
            // Template functions sit at column 0, payload code is indented.
            let payload_defs = text
                .lines()
                .filter(|line| {
                    line.starts_with("        ") && line.trim_start().starts_with("def var_")
                })
                .count();
            assert!(!text.contains("helper"), "seed {seed}");
            assert_eq!(payload_defs, 2, "seed {seed}:\n{text}");
        }
    }

    #[test]
    fn test_blank_payload_becomes_pass() {
        let mut rng = StdRng::seed_from_u64(2);
        let text = obfuscator()
            .obfuscate_source("import random\n", Template::VariablePairs, &mut rng)
            .unwrap();
        assert!(text.contains("    else:\n        pass\n"));
    }
}
