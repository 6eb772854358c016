use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stylec_core::{DirResolver, Resolver, compile_style};

#[derive(Parser, Debug)]
#[command(version, about = "Compile bibliography style programs to Groovy", long_about = None)]
struct Cli {
    /// Style source file; reads standard input when neither this nor
    /// --style is given.
    #[arg(short, long, conflicts_with = "style")]
    input: Option<String>,

    /// Style name, resolved as <NAME>.bst under the search roots.
    #[arg(short, long)]
    style: Option<String>,

    /// Directories searched recursively for named styles.
    #[arg(long, value_name = "DIR", default_value = ".")]
    search: Vec<String>,

    /// Output file; writes to standard output when omitted.
    #[arg(short, long)]
    output: Option<String>,

    /// Name of the generated Groovy class.
    #[arg(long, default_value = "Style")]
    class_name: String,

    /// Skip branch canonicalization and dead-store elision.
    #[arg(long)]
    no_optimize: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let source = match (&cli.style, &cli.input) {
        (Some(style), _) => {
            let roots = cli.search.iter().map(PathBuf::from).collect();
            DirResolver::new(roots)
                .find(style)
                .with_context(|| format!("failed to resolve style {style}"))?
        }
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("failed to read input file {path}"))?
        }
        (None, None) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let groovy = compile_style(&source, &cli.class_name, !cli.no_optimize)?;

    match cli.output {
        Some(path) => write_output(&path, groovy.as_bytes())?,
        None => io::stdout().write_all(groovy.as_bytes())?,
    }
    Ok(())
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    const STYLE: &str = "FUNCTION {begin}{ preamble$ write$ newline$ } READ EXECUTE {begin}";

    #[test]
    fn compiles_a_file_to_an_output_path() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("plain.bst");
        fs::write(&input_path, STYLE).expect("write input");
        let output_path = dir.path().join("out/Plain.groovy");

        Command::cargo_bin("stylec-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--class-name")
            .arg("Plain")
            .assert()
            .success();

        let text = fs::read_to_string(&output_path).expect("read output");
        assert!(text.contains("class Plain {"));
        assert!(text.contains("bibWriter.print(bibDB.getPreamble())"));
    }

    #[test]
    fn prints_to_stdout_when_no_output_is_given() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("plain.bst");
        fs::write(&input_path, STYLE).expect("write input");

        Command::cargo_bin("stylec-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .assert()
            .success()
            .stdout(predicate::str::contains("class Style {"));
    }

    #[test]
    fn reads_from_stdin_without_an_input_file() {
        Command::cargo_bin("stylec-cli")
            .expect("binary exists")
            .write_stdin(STYLE)
            .assert()
            .success()
            .stdout(predicate::str::contains("void run() {"));
    }

    #[test]
    fn resolves_named_styles_under_the_search_roots() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("styles");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(nested.join("plain.bst"), STYLE).expect("write style");

        Command::cargo_bin("stylec-cli")
            .expect("binary exists")
            .arg("--style")
            .arg("plain")
            .arg("--search")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("class Style {"));
    }

    #[test]
    fn reports_unknown_identifiers() {
        Command::cargo_bin("stylec-cli")
            .expect("binary exists")
            .write_stdin("FUNCTION {f}{ nonesuch }")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown identifier 'nonesuch'"));
    }

    #[test]
    fn no_optimize_keeps_discarded_values() {
        Command::cargo_bin("stylec-cli")
            .expect("binary exists")
            .arg("--no-optimize")
            .write_stdin("FUNCTION {f}{ #7 pop$ } EXECUTE {f}")
            .assert()
            .success()
            .stdout(predicate::str::contains("    7\n"));
    }
}
