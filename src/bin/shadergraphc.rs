use std::path::PathBuf;

use anyhow::{anyhow, Result};
use shadergraph_compiler::error::{has_fatal, Severity};

#[derive(Debug, Clone)]
enum Command {
    Validate { ir_path: PathBuf },
    Generate { ir_path: PathBuf, target: String },
}

fn parse_cli(args: &[String]) -> Result<Command> {
    let Some(sub) = args.first() else {
        return Err(anyhow!(
            "missing subcommand (supported: validate <ir.json>, generate --target msl <ir.json>)"
        ));
    };

    match sub.as_str() {
        "validate" => {
            let ir_path = args
                .get(1)
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("validate requires <ir.json>"))?;
            Ok(Command::Validate { ir_path })
        }
        "generate" => {
            let mut target = "msl".to_string();
            let mut ir_path = None;
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--target" => {
                        let v = args
                            .get(i + 1)
                            .ok_or_else(|| anyhow!("missing value for --target"))?;
                        target = v.clone();
                        i += 2;
                    }
                    other => {
                        ir_path = Some(PathBuf::from(other));
                        i += 1;
                    }
                }
            }
            let ir_path = ir_path.ok_or_else(|| anyhow!("generate requires <ir.json>"))?;
            if target != "msl" {
                return Err(anyhow!("unsupported --target '{target}' (only 'msl' is implemented)"));
            }
            Ok(Command::Generate { ir_path, target })
        }
        other => Err(anyhow!(
            "unknown subcommand: {other} (supported: validate, generate)"
        )),
    }
}

fn print_diagnostics(diagnostics: &[shadergraph_compiler::error::Diagnostic]) {
    for d in diagnostics {
        eprintln!("{d}");
    }
}

fn run_validate(ir_path: &std::path::Path) -> Result<bool> {
    let text = std::fs::read_to_string(ir_path)
        .map_err(|e| anyhow!("failed to read {}: {e}", ir_path.display()))?;
    let doc = shadergraph_compiler::load_document(&text)?;
    let (diagnostics, _) = shadergraph_compiler::validate(&doc);
    print_diagnostics(&diagnostics);
    let fatal = has_fatal(&diagnostics);
    if !fatal {
        println!("ok: {} diagnostic(s), none fatal", diagnostics.len());
    }
    Ok(!fatal)
}

fn run_generate(ir_path: &std::path::Path) -> Result<bool> {
    let text = std::fs::read_to_string(ir_path)
        .map_err(|e| anyhow!("failed to read {}: {e}", ir_path.display()))?;
    let doc = shadergraph_compiler::load_document(&text)?;
    let (diagnostics, manifest) = match shadergraph_compiler::generate(&doc) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e:#}");
            return Ok(false);
        }
    };
    print_diagnostics(&diagnostics);
    println!("{}", manifest.code);
    eprintln!(
        "globalBufferSize={} resourceBindings={:?} varMap={:?}",
        manifest.global_buffer_size, manifest.resource_bindings, manifest.var_map
    );
    let fatal = diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error);
    Ok(!fatal)
}

fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_cli(&argv)?;

    let ok = match command {
        Command::Validate { ir_path } => run_validate(&ir_path)?,
        Command::Generate { ir_path, .. } => run_generate(&ir_path)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cli_validate_requires_a_path() {
        let err = parse_cli(&["validate".to_string()]).unwrap_err().to_string();
        assert!(err.contains("requires <ir.json>"));
    }

    #[test]
    fn parse_cli_generate_defaults_target_to_msl() {
        let cmd = parse_cli(&["generate".to_string(), "ir.json".to_string()]).unwrap();
        match cmd {
            Command::Generate { ir_path, target } => {
                assert_eq!(ir_path, PathBuf::from("ir.json"));
                assert_eq!(target, "msl");
            }
            _ => panic!("expected Generate"),
        }
    }

    #[test]
    fn parse_cli_rejects_unknown_target() {
        let err = parse_cli(&[
            "generate".to_string(),
            "--target".to_string(),
            "hlsl".to_string(),
            "ir.json".to_string(),
        ])
        .unwrap_err()
        .to_string();
        assert!(err.contains("unsupported --target"));
    }

    #[test]
    fn parse_cli_rejects_unknown_subcommand() {
        let err = parse_cli(&["frobnicate".to_string()]).unwrap_err().to_string();
        assert!(err.contains("unknown subcommand"));
    }
}
