//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - catalog-driven quantum circuit and program obfuscation",
        style("qobf").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qobf-ir       Circuit data model");
    println!("  qobf-qasm     OpenQASM reader and writer");
    println!("  qobf-script   Program tree for host scripts and payloads");
    println!("  qobf-circuit  Equivalence catalogs and circuit techniques");
    println!("  qobf-program  Symbol renaming, splitting and templates");
    println!("  qobf-cli      Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style(env!("CARGO_PKG_REPOSITORY")).underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
