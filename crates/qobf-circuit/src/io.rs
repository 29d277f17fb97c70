//! Reading and writing circuit files.

use std::path::{Path, PathBuf};

use qobf_ir::Circuit;
use tracing::debug;

use crate::error::{ObfuscationError, ObfuscationResult};
use crate::host_script::{circuit_from_script, circuit_to_script};

/// Suffix inserted before the extension of an obfuscated circuit file.
pub const OUTPUT_SUFFIX: &str = "_obfuscated";

/// On-disk circuit representation, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitFormat {
    /// `.qasm`: OpenQASM gate list. Written back as OpenQASM 2.0.
    Qasm,
    /// `.py`: Python host script with a `get_circuit()` builder.
    HostScript,
}

impl CircuitFormat {
    pub fn from_path(path: &Path) -> ObfuscationResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("qasm") => Ok(CircuitFormat::Qasm),
            Some("py") => Ok(CircuitFormat::HostScript),
            other => Err(ObfuscationError::UnsupportedFormat(
                other.map_or_else(String::new, |e| format!(".{e}")),
            )),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            CircuitFormat::Qasm => "qasm",
            CircuitFormat::HostScript => "py",
        }
    }

    /// Parse circuit text in this format.
    pub fn parse(self, source: &str) -> ObfuscationResult<Circuit> {
        match self {
            CircuitFormat::Qasm => Ok(qobf_qasm::parse(source)?),
            CircuitFormat::HostScript => circuit_from_script(source),
        }
    }

    /// Render a circuit in this format.
    pub fn render(self, circuit: &Circuit) -> ObfuscationResult<String> {
        match self {
            CircuitFormat::Qasm => Ok(qobf_qasm::emit_qasm2(circuit)?),
            CircuitFormat::HostScript => circuit_to_script(circuit),
        }
    }
}

/// Load a circuit, picking the reader from the file extension.
pub fn load_circuit(path: &Path) -> ObfuscationResult<(Circuit, CircuitFormat)> {
    let format = CircuitFormat::from_path(path)?;
    let source = std::fs::read_to_string(path).map_err(|source| ObfuscationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut circuit = format.parse(&source)?;
    if format == CircuitFormat::Qasm {
        if let Some(stem) = path.file_stem() {
            circuit.set_name(stem.to_string_lossy());
        }
    }
    debug!(
        "Loaded '{}' from {}: {} qubits, {} instructions",
        circuit.name(),
        path.display(),
        circuit.num_qubits(),
        circuit.len()
    );
    Ok((circuit, format))
}

/// Write a circuit in `format` to `path`.
pub fn save_circuit(circuit: &Circuit, format: CircuitFormat, path: &Path) -> ObfuscationResult<()> {
    let text = format.render(circuit)?;
    std::fs::write(path, text).map_err(|source| ObfuscationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `dir/name.ext` → `dir/name_obfuscated.ext`.
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}{OUTPUT_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{OUTPUT_SUFFIX}"),
    };
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qobf_ir::QubitId;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            CircuitFormat::from_path(Path::new("a/b.qasm")).unwrap(),
            CircuitFormat::Qasm
        );
        assert_eq!(
            CircuitFormat::from_path(Path::new("b.py")).unwrap(),
            CircuitFormat::HostScript
        );
        let err = CircuitFormat::from_path(Path::new("b.txt")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported file type '.txt'. Please use .qasm or .py"
        );
        assert!(CircuitFormat::from_path(Path::new("QASM")).is_err());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/tmp/bell.qasm")),
            PathBuf::from("/tmp/bell_obfuscated.qasm")
        );
        assert_eq!(
            output_path(Path::new("circ.v2.py")),
            PathBuf::from("circ.v2_obfuscated.py")
        );
    }

    #[test]
    fn test_save_and_load_qasm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bell.qasm");
        let mut circuit = Circuit::with_size("bell", 2, 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure_all().unwrap();

        save_circuit(&circuit, CircuitFormat::Qasm, &path).unwrap();
        let (loaded, format) = load_circuit(&path).unwrap();
        assert_eq!(format, CircuitFormat::Qasm);
        assert_eq!(loaded.instructions(), circuit.instructions());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.qasm");
        assert!(matches!(
            load_circuit(&path),
            Err(ObfuscationError::Io { .. })
        ));
    }
}
