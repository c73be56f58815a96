#[macro_use]
extern crate log;

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use transmute::{translate, TranslateOptions, RUNTIME_HEADER};

/// Translates a WebAssembly binary module into one C99 source file.
#[derive(Parser, Debug)]
#[command(name = "runner", version)]
struct Args {
    /// Binary module to translate
    input: PathBuf,

    /// Where to write the generated C
    output: PathBuf,

    /// Namespace part of the symbol prefix, may be empty
    #[arg(default_value = "Wasm")]
    namespace: String,

    /// Container part of the symbol prefix
    #[arg(default_value = "Module")]
    container: String,

    /// Also write the runtime header to this path
    #[arg(long, value_name = "PATH")]
    runtime: Option<PathBuf>,

    /// Pages of linear memory to allocate when the module imports none
    #[arg(long, default_value_t = TranslateOptions::default().memory_pages)]
    memory_pages: u32,
}

impl Args {
    fn options(&self) -> TranslateOptions {
        TranslateOptions {
            namespace: self.namespace.clone(),
            container: self.container.clone(),
            memory_pages: self.memory_pages,
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let input = args.input.display();
    let bytes = fs::read(&args.input).map_err(|e| format!("couldn't read {}: {}", input, e))?;
    let source = translate(&bytes, &args.options()).map_err(|e| format!("{}: {}", input, e))?;
    fs::write(&args.output, source).map_err(|e| format!("couldn't write {}: {}", args.output.display(), e))?;
    info!("Wrote {}", args.output.display());
    if let Some(ref path) = args.runtime {
        fs::write(path, RUNTIME_HEADER).map_err(|e| format!("couldn't write {}: {}", path.display(), e))?;
        info!("Wrote runtime header to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(message) = run(&args) {
        eprintln!("{}", message);
        process::exit(1);
    }
}
