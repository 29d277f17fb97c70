//! Control-flow templates and the placeholder filler.
//!
//! Template text uses `str.format` conventions: `{key}` is replaced by a
//! value, `{{` and `}}` stand for literal braces.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::error::{ProgramError, ProgramResult};

/// The built-in control-flow templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// Two-qubit Bell measurement choosing between payload and decoy
    /// branches.
    SimpleEntanglement,
    /// Payload runs unless a random Bell-pair measurement matches a random
    /// pattern.
    VariablePairs,
    /// Payload split across two branches guarded by superposition
    /// amplitudes.
    Shroud,
    /// Payload guarded by a circuit that always measures all ones.
    Deterministic,
}

/// Noise placement for one template: targets of the three noise
/// placeholders and how many sequences each gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoisePlan {
    pub targets: [&'static [u32]; 3],
    pub repeats: usize,
}

impl Template {
    pub const ALL: [Template; 4] = [
        Template::SimpleEntanglement,
        Template::VariablePairs,
        Template::Shroud,
        Template::Deterministic,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Template::SimpleEntanglement => "simple_entanglement",
            Template::VariablePairs => "variable_pairs",
            Template::Shroud => "shroud",
            Template::Deterministic => "deterministic",
        }
    }

    /// Comma-separated ids, for error messages and help text.
    pub fn available() -> String {
        Self::ALL.map(Template::id).join(", ")
    }

    pub fn noise_plan(self) -> NoisePlan {
        match self {
            Template::SimpleEntanglement => NoisePlan {
                targets: [&[0, 1], &[0], &[0]],
                repeats: 2,
            },
            Template::VariablePairs => NoisePlan {
                targets: [&[0, 1, 2], &[0], &[0]],
                repeats: 2,
            },
            Template::Shroud => NoisePlan {
                targets: [&[0], &[0], &[0]],
                repeats: 1,
            },
            Template::Deterministic => NoisePlan {
                targets: [&[0], &[1], &[2]],
                repeats: 1,
            },
        }
    }

    /// Whether the payload is split over two guarded blocks.
    pub fn splits_payload(self) -> bool {
        matches!(self, Template::Shroud)
    }

    /// Whether the template embeds the deterministic trigger circuit.
    pub fn needs_trigger(self) -> bool {
        matches!(self, Template::Deterministic)
    }

    fn file_name(self) -> String {
        format!("{}.tmpl", self.id())
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Template {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.id() == s)
            .ok_or_else(|| ProgramError::UnknownTemplate {
                name: s.to_string(),
                available: Self::available(),
            })
    }
}

/// Placeholder values for one fill.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues(FxHashMap<String, String>);

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for TemplateValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (key, value) in iter {
            values.insert(key, value);
        }
        values
    }
}

/// Where template text comes from; filling it is shared.
pub trait TemplateSink {
    /// Raw text of one template.
    fn text(&self, template: Template) -> ProgramResult<Cow<'static, str>>;

    /// Human-readable origin for log messages.
    fn describe(&self) -> String;

    /// Text of `template` with every placeholder replaced.
    fn fill(&self, template: Template, values: &TemplateValues) -> ProgramResult<String> {
        fill(&self.text(template)?, values)
    }
}

/// Templates compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateSink for BuiltinTemplates {
    fn text(&self, template: Template) -> ProgramResult<Cow<'static, str>> {
        Ok(Cow::Borrowed(match template {
            Template::SimpleEntanglement => include_str!("../templates/simple_entanglement.tmpl"),
            Template::VariablePairs => include_str!("../templates/variable_pairs.tmpl"),
            Template::Shroud => include_str!("../templates/shroud.tmpl"),
            Template::Deterministic => include_str!("../templates/deterministic.tmpl"),
        }))
    }

    fn describe(&self) -> String {
        "built-in templates".into()
    }
}

/// `<id>.tmpl` files in a directory.
#[derive(Debug, Clone)]
pub struct TemplateDirectory {
    dir: PathBuf,
}

impl TemplateDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TemplateSink for TemplateDirectory {
    fn text(&self, template: Template) -> ProgramResult<Cow<'static, str>> {
        let path = self.dir.join(template.file_name());
        std::fs::read_to_string(&path)
            .map(Cow::Owned)
            .map_err(|source| ProgramError::Io { path, source })
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Replace `{key}` placeholders in `text`.
pub fn fill(text: &str, values: &TemplateValues) -> ProgramResult<String> {
    let mut out = String::with_capacity(text.len() * 2);
    let mut chars = text.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        match c {
            '{' if chars.next_if(|&(_, c)| c == '{').is_some() => out.push('{'),
            '}' if chars.next_if(|&(_, c)| c == '}').is_some() => out.push('}'),
            '{' => {
                let start = offset + 1;
                let end = loop {
                    match chars.next() {
                        Some((i, '}')) => break i,
                        Some((_, '{')) | None => {
                            return Err(ProgramError::MalformedTemplate {
                                offset,
                                message: "unclosed '{'".into(),
                            });
                        }
                        Some(_) => {}
                    }
                };
                let key = &text[start..end];
                let value = values
                    .get(key)
                    .ok_or_else(|| ProgramError::TemplateMissingKey(key.to_string()))?;
                out.push_str(value);
            }
            '}' => {
                return Err(ProgramError::MalformedTemplate {
                    offset,
                    message: "single '}' encountered".into(),
                });
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Placeholder names used by `text`, in order of first use.
pub fn placeholders(text: &str) -> Vec<&str> {
    let mut keys: Vec<&str> = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        if let Some(stripped) = after.strip_prefix('{') {
            rest = stripped;
            continue;
        }
        let Some(close) = after.find('}') else {
            break;
        };
        let key = &after[..close];
        if !keys.contains(&key) {
            keys.push(key);
        }
        rest = &after[close + 1..];
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_ids_roundtrip() {
        for template in Template::ALL {
            assert_eq!(template.id().parse::<Template>().unwrap(), template);
        }
        let err = "spiral".parse::<Template>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown template 'spiral'. Available: simple_entanglement, variable_pairs, shroud, deterministic"
        );
    }

    #[test]
    fn test_fill_replaces_and_unescapes() {
        let values: TemplateValues = [("name", "x"), ("n", "3")].into_iter().collect();
        assert_eq!(
            fill("{name} = {{'n': {n}}}\nprint(f'{{{name}}}')", &values).unwrap(),
            "x = {'n': 3}\nprint(f'{x}')"
        );
    }

    #[test]
    fn test_fill_missing_key() {
        let err = fill("a = {missing}", &TemplateValues::new()).unwrap_err();
        assert!(matches!(err, ProgramError::TemplateMissingKey(key) if key == "missing"));
    }

    #[test]
    fn test_fill_malformed() {
        let values: TemplateValues = [("a", "1")].into_iter().collect();
        assert!(matches!(
            fill("x = {a", &values),
            Err(ProgramError::MalformedTemplate { offset: 4, .. })
        ));
        assert!(matches!(
            fill("x = a}", &values),
            Err(ProgramError::MalformedTemplate { offset: 5, .. })
        ));
    }

    #[test]
    fn test_placeholders_skip_escapes() {
        assert_eq!(
            placeholders("{a} {{b}} {c} {a} {{{d}}}"),
            vec!["a", "c", "d"]
        );
    }

    #[test]
    fn test_builtin_templates_use_known_placeholders() {
        const COMMON: [&str; 16] = [
            "random_method",
            "trigger_func",
            "qc",
            "NoiseGenerator",
            "NoiseGenerator2",
            "NoiseGenerator3",
            "rand_result",
            "main",
            "outcome_var",
            "indented_code",
            "indented_code_part1",
            "indented_code_part2",
            "rand_var1",
            "rand_var2",
            "rand_var3",
            "pattern_var",
        ];
        const TRIGGER: [&str; 4] = [
            "num_qubits",
            "num_clbits",
            "circuit_build_instructions",
            "expected_outcome",
        ];
        for template in Template::ALL {
            let text = BuiltinTemplates.text(template).unwrap();
            assert!(text.starts_with("\n# OBFUSCATED SCRIPT"));
            for key in placeholders(&text) {
                assert!(
                    COMMON.contains(&key) || (template.needs_trigger() && TRIGGER.contains(&key)),
                    "{template} uses unexpected placeholder '{key}'"
                );
            }
        }
    }

    #[test]
    fn test_template_directory_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shroud.tmpl"), "run({main})").unwrap();
        let sink = TemplateDirectory::new(dir.path());
        let values: TemplateValues = [("main", "go")].into_iter().collect();
        assert_eq!(sink.fill(Template::Shroud, &values).unwrap(), "run(go)");
        assert!(matches!(
            sink.text(Template::Deterministic),
            Err(ProgramError::Io { .. })
        ));
    }
}
