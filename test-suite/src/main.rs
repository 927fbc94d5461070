use anyhow::{anyhow, bail, Context, Result};
use glob::glob;
use std::result::Result as StdResult;

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const INTERPRETER: &str = "../target/release/sbi";

/// Runs every `tests/*.sb` script and compares what it prints to `tests/<name>.out`. A
/// `tests/<name>.in` file, if present, is fed to the script's stdin
fn main() -> Result<()> {
    compile_sbi().context("compiling interpreter")?;

    let scripts: Vec<_> = glob("tests/*.sb")?.collect::<StdResult<_, _>>()?;
    let mut failed = 0;
    for script in &scripts {
        let expected_output = script.with_extension("out");
        let expected_output = fs::read_to_string(&expected_output)
            .context(format!("loading expected output: {}", expected_output.display()))?;
        let output = run_script(script)?;
        if output == expected_output {
            println!("{}: passed", script.display());
        } else {
            failed += 1;
            println!("{}: failed\nactual output:\n{}", script.display(), output);
        }
    }

    if failed > 0 {
        bail!("{} of {} scripts failed", failed, scripts.len());
    }
    Ok(())
}

fn run_script(script: &Path) -> Result<String> {
    let input = fs::read_to_string(script.with_extension("in")).unwrap_or_default();
    let mut child = Command::new(INTERPRETER)
        .arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context(format!("running script {}", script.display()))?;
    child
        .stdin
        .take()
        .context("no stdin for the interpreter")?
        .write_all(input.as_bytes())?;

    let output = child.wait_with_output()?;
    let mut text = String::from_utf8(output.stdout)?;
    // compile errors are part of the expected output
    text.push_str(&String::from_utf8(output.stderr)?);
    Ok(text)
}

fn compile_sbi() -> Result<()> {
    let st = Command::new("cargo")
        .args(["build", "--release", "--bin", "sbi"])
        .current_dir("../interpreter")
        .status()?;
    if st.success() {
        Ok(())
    } else {
        Err(anyhow!("compiling the interpreter failed"))
    }
}
