use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pippin::{assemble_file, disassemble, HaltMode, Machine, MachineConfig, Program, DATA_SIZE};

#[derive(Parser)]
#[command(name = "pippin", about = "Assemble and run Pippin programs")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Assemble a source file into a binary artifact.
  Assemble {
    source   : PathBuf,
    artifact : PathBuf,
  },
  /// Load an artifact and run it until it halts.
  Run {
    artifact  : PathBuf,
    /// Stop after this many instructions even if the program has not halted.
    #[arg(long)]
    max_steps : Option<usize>,
    /// Print the machine state after every instruction.
    #[arg(long)]
    trace     : bool,
    #[arg(long, value_enum, default_value_t = HaltArg::Signal)]
    halt      : HaltArg,
    #[arg(long, default_value_t = DATA_SIZE)]
    data_size : usize,
  },
  /// Print an artifact as assembly source.
  Disassemble {
    artifact : PathBuf,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum HaltArg {
  /// Return to the front end and print the final state.
  Signal,
  /// End the process as soon as `HALT` executes.
  Exit,
}

/// Logging is controlled by `RUST_LOG`, e.g. `RUST_LOG=pippin=debug`.
fn setup_logger() {
  tracing_subscriber::fmt::Subscriber::builder()
    .without_time()
    .with_writer(std::io::stderr)
    .with_env_filter(EnvFilter::from_default_env())
    .finish()
    .init();
}

fn load(path: &Path) -> Result<Program> {
  let text = fs::read_to_string(path)
    .with_context(|| format!("unable to read {}", path.display()))?;
  Program::from_artifact(&text)
    .with_context(|| format!("{} is not a Pippin artifact", path.display()))
}

fn main() -> Result<ExitCode> {
  setup_logger();
  let cli = Cli::parse();

  match cli.command {

    Command::Assemble { source, artifact } => {
      match assemble_file(&source, &artifact) {
        Ok(program) => {
          println!("Assembled {} instructions and {} data entries.", program.code.len(), program.data.len());
          Ok(ExitCode::SUCCESS)
        }
        Err(diagnostics) => {
          eprintln!("{}", diagnostics);
          Ok(ExitCode::FAILURE)
        }
      }
    }

    Command::Run { artifact, max_steps, trace, halt, data_size } => {
      let program = load(&artifact)?;
      let halt_mode = match halt {
        HaltArg::Signal => HaltMode::Signal,
        HaltArg::Exit   => HaltMode::Exit,
      };
      let mut machine = Machine::new(MachineConfig { data_size, halt_mode });
      machine.load_program(&program).context("the data segment does not fit in memory")?;

      let mut steps = 0;
      while machine.is_running() && max_steps.map_or(true, |max| steps < max) {
        if let Err(fault) = machine.step() {
          println!("{}", machine);
          eprintln!("Fault after {} instructions: {}", steps, fault);
          return Ok(ExitCode::FAILURE);
        }
        steps += 1;
        if trace {
          println!("{}", machine);
        }
      }

      if !trace {
        println!("{}", machine);
      }
      println!("Executed {} instructions.", steps);
      Ok(ExitCode::SUCCESS)
    }

    Command::Disassemble { artifact } => {
      print!("{}", disassemble(&load(&artifact)?));
      Ok(ExitCode::SUCCESS)
    }

  }
}
