use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use modegen_generator::HeaderGenerator;

/// Generate the packml_modes constants header from a YAML definition file.
#[derive(Parser)]
#[command(name = "modegen", version)]
struct Args {
    /// Mode definition file (flat `modes:` mapping of name to integer)
    definition: PathBuf,
    /// Path of the generated header
    output: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // usage errors exit with status 1, help/version with 0
            let use_stderr = err.use_stderr();
            let _ = err.print();
            return if use_stderr {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let modes = modegen_parser::load(&args.definition)
        .with_context(|| format!("failed to load {}", args.definition.display()))?;
    HeaderGenerator::new(&modes, &args.definition, &args.output)
        .write()
        .with_context(|| format!("failed to generate {}", args.output.display()))?;
    log::info!(
        "generated {} ({} modes)",
        args.output.display(),
        modes.len()
    );
    Ok(())
}
