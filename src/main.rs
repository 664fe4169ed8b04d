use std::fs;
use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;

use peregrine::CompileError;

#[derive(Parser)]
#[command(name = "peregrine")]
#[command(about = "Peregrine to C++ compiler front-end", version)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a source file to C++
  Compile {
    /// Source file
    input: String,

    /// Output file, defaults to the input with a .cpp extension
    #[arg(short, long)]
    output: Option<String>,

    /// Print the AST before generating code
    #[arg(long)]
    emit_ast: bool,
  },

  /// Parse a source file and print its AST
  Parse {
    /// Source file
    input: String,
  },
}

fn main() {
  let cli = Cli::parse();

  match cli.command {
    Commands::Compile {
      input,
      output,
      emit_ast,
    } => {
      let source = read_source(&input);

      if emit_ast {
        match peregrine::parse_source(&source, &input) {
          Ok(program) => println!("{program:#?}"),
          Err(errors) => report_and_exit(errors),
        }
      }

      match peregrine::compile(&source, &input) {
        Ok(cpp) => {
          let output_path = output.unwrap_or_else(|| default_output(&input));
          if let Err(err) = fs::write(&output_path, cpp) {
            eprintln!("{} cannot write {output_path}: {err}", "error:".bright_red().bold());
            process::exit(1);
          }
          println!("compiled {input} -> {output_path}");
        }
        Err(errors) => report_and_exit(errors),
      }
    }

    Commands::Parse { input } => {
      let source = read_source(&input);
      match peregrine::parse_source(&source, &input) {
        Ok(program) => println!("{program:#?}"),
        Err(errors) => report_and_exit(errors),
      }
    }
  }
}

fn read_source(input: &str) -> String {
  match fs::read_to_string(input) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("{} cannot read {input}: {err}", "error:".bright_red().bold());
      process::exit(1);
    }
  }
}

fn default_output(input: &str) -> String {
  let path = Path::new(input);
  path.with_extension("cpp").to_string_lossy().into_owned()
}

fn report_and_exit(errors: Vec<CompileError>) -> ! {
  for err in &errors {
    eprintln!("{} {err}", "error:".bright_red().bold());
  }
  eprintln!(
    "{}",
    format!("{} error(s) generated", errors.len()).bright_red()
  );
  process::exit(1);
}
