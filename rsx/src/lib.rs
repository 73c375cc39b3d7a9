//! Convenience entry points for running RaychelScript programs: compile a
//! source file (or load an assembled `.rsbf` file) and execute it in one
//! call.

use std::error::Error as StdError;
use std::fmt;
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use log::debug;

use rsc::OptimizationLevel;
use rvm::{ExecutionOptions, Program};

/// File extension that marks an already assembled program.
pub const BINARY_EXTENSION: &str = "rsbf";

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Compile(rsc::Error),
    Read(rsbf::Error),
    Execution(rvm::ExecutionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(error) => write!(f, "io: {}", error),
            Error::Compile(error) => write!(f, "{}", error),
            Error::Read(error) => write!(f, "rsbf: {}", error),
            Error::Execution(error) => write!(f, "vm: {}", error),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            Error::Compile(error) => Some(error),
            Error::Read(error) => Some(error),
            Error::Execution(error) => Some(error),
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

impl From<rsc::Error> for Error {
    fn from(error: rsc::Error) -> Error {
        Error::Compile(error)
    }
}

impl From<rsbf::Error> for Error {
    fn from(error: rsbf::Error) -> Error {
        Error::Read(error)
    }
}

impl From<rvm::ExecutionError> for Error {
    fn from(error: rvm::ExecutionError) -> Error {
        Error::Execution(error)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    pub level: OptimizationLevel,
    pub execution: ExecutionOptions,
}

impl Default for RunOptions {
    fn default() -> RunOptions {
        RunOptions {
            level: OptimizationLevel::Light,
            execution: ExecutionOptions::default(),
        }
    }
}

/// Executes an assembled program, pairing each output value with its
/// declared identifier.
pub fn run_program(
    program: &Program,
    inputs: &[f64],
    options: &RunOptions,
) -> Result<Vec<(String, f64)>, Error> {
    let mut outputs = vec![0.0; program.num_outputs()];
    let stats = rvm::execute_with(program, inputs, &mut outputs, &options.execution)?;
    debug!(
        "executed {} instructions ({} function calls)",
        stats.instructions_executed, stats.function_calls
    );

    Ok(program
        .output_identifiers
        .iter()
        .cloned()
        .zip(outputs)
        .collect())
}

/// Compiles and executes a source string.
pub fn run_str(
    source: &str,
    inputs: &[f64],
    options: &RunOptions,
) -> Result<Vec<(String, f64)>, Error> {
    let program = rsc::compile_with(source, options.level)?;
    run_program(&program, inputs, options)
}

/// Compiles and executes a source file.
pub fn run_source_file<P: AsRef<Path>>(
    path: P,
    inputs: &[f64],
    options: &RunOptions,
) -> Result<Vec<(String, f64)>, Error> {
    let mut source = String::new();
    BufReader::new(File::open(path)?).read_to_string(&mut source)?;
    run_str(&source, inputs, options)
}

/// Loads and executes an assembled `.rsbf` file.
pub fn run_binary_file<P: AsRef<Path>>(
    path: P,
    inputs: &[f64],
    options: &RunOptions,
) -> Result<Vec<(String, f64)>, Error> {
    let program = rsbf::read_file(path)?;
    run_program(&program, inputs, options)
}

/// Executes a file, treating it as an assembled program if it carries the
/// `.rsbf` extension and as source otherwise.
pub fn run_file<P: AsRef<Path>>(
    path: P,
    inputs: &[f64],
    options: &RunOptions,
) -> Result<Vec<(String, f64)>, Error> {
    let is_binary = path
        .as_ref()
        .extension()
        .map(|extension| extension == BINARY_EXTENSION)
        .unwrap_or(false);

    if is_binary {
        run_binary_file(path, inputs, options)
    } else {
        run_source_file(path, inputs, options)
    }
}
