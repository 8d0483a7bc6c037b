//! BraneScript compiler CLI.
//!
//! Commands:
//! - `brane compile <file.bs>` - compile a script to IR bytes
//! - `brane dump <file>` - print a human-readable IR listing
//! - `brane run <file> <function> [args...]` - compile (or load) and execute

use std::path::{Path, PathBuf};
use std::process;

use brane_common::SourceMap;
use brane_compiler::compile_source;
use brane_ir::IRScript;
use brane_vm::{Runtime, Value};
use clap::{Parser, Subcommand};

mod ir_text;

#[derive(Parser)]
#[command(name = "brane")]
#[command(about = "BraneScript compiler and runtime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a script to an IR file
    Compile {
        /// Path to a .bs source file
        file: PathBuf,
        /// Output path (default: same name with .bsc extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a human-readable listing of a script's IR
    Dump {
        /// Path to a .bs source or .bsc IR file
        file: PathBuf,
    },

    /// Compile (or load) a script and call a function
    Run {
        /// Path to a .bs source or .bsc IR file
        file: PathBuf,
        /// Function name (mangled or plain)
        function: String,
        /// Arguments, parsed against the function's signature
        args: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile { file, output } => cmd_compile(&file, output),
        Commands::Dump { file } => cmd_dump(&file),
        Commands::Run {
            file,
            function,
            args,
        } => cmd_run(&file, &function, &args),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

/// Compile a source file, rendering diagnostics on failure.
fn load_script(path: &Path) -> Result<IRScript, Box<dyn std::error::Error>> {
    if path.extension().map_or(false, |ext| ext == "bsc") {
        let bytes = std::fs::read(path)?;
        return Ok(IRScript::from_bytes(&bytes)?);
    }

    let source = std::fs::read_to_string(path)?;
    match compile_source(&source, None) {
        Ok(script) => Ok(script),
        Err(errors) => {
            let mut sources = SourceMap::new();
            let file = sources.add(path.display().to_string(), source);
            let count = errors.len();
            brane_common::emit(
                &sources,
                errors.iter().map(|e| e.to_diagnostic(file)),
            );
            Err(format!("{} compile error(s)", count).into())
        }
    }
}

fn cmd_compile(file: &Path, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let script = load_script(file)?;
    let out_path = output.unwrap_or_else(|| file.with_extension("bsc"));
    let bytes = script.to_bytes();
    std::fs::write(&out_path, &bytes)?;
    println!(
        "compiled {} -> {} ({} bytes, {} functions)",
        file.display(),
        out_path.display(),
        bytes.len(),
        script.local_functions.len()
    );
    Ok(())
}

fn cmd_dump(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let script = load_script(file)?;
    print!("{}", ir_text::format_script(&script));
    Ok(())
}

fn cmd_run(
    file: &Path,
    function: &str,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let script = load_script(file)?;

    // Accept either a mangled signature or a plain name.
    let mangled = if function.contains('(') {
        function.to_string()
    } else {
        let prefix = format!("{}(", function);
        script
            .local_functions
            .iter()
            .map(|f| f.name.clone())
            .find(|name| name.starts_with(&prefix))
            .ok_or_else(|| format!("no function named `{}`", function))?
    };

    let func = &script.local_functions[script
        .find_function(&mangled)
        .ok_or_else(|| format!("no function `{}`", mangled))?];
    if args.len() != func.arguments.len() {
        return Err(format!(
            "`{}` takes {} argument(s), got {}",
            mangled,
            func.arguments.len(),
            args.len()
        )
        .into());
    }
    let values: Vec<Value> = args
        .iter()
        .zip(&func.arguments)
        .map(|(text, ty)| parse_value(text, ty))
        .collect::<Result<_, _>>()?;

    let mut rt = Runtime::load(&script)?;
    let result = rt.call(&mangled, &values)?;
    println!("{}", result);
    Ok(())
}

fn parse_value(text: &str, ty: &str) -> Result<Value, String> {
    let bad = || format!("cannot parse `{}` as {}", text, ty);
    Ok(match ty {
        "bool" => Value::Bool(text.parse().map_err(|_| bad())?),
        "char" => Value::Char(text.bytes().next().ok_or_else(bad)?),
        "int" => Value::I32(text.parse().map_err(|_| bad())?),
        "long" => Value::I64(text.parse().map_err(|_| bad())?),
        "float" => Value::F32(text.parse().map_err(|_| bad())?),
        "double" => Value::F64(text.parse().map_err(|_| bad())?),
        other => return Err(format!("cannot pass `{}` arguments from the command line", other)),
    })
}
