#[macro_use]
extern crate clap;

use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use clap::Arg;

use rsc::OptimizationLevel;

#[derive(Debug)]
enum IOErrorContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Compile(rsc::Error),
    Io(std::io::Error, IOErrorContext, PathBuf),
    Write(rsbf::Error, PathBuf),
    InvalidLevel(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => write!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IOErrorContext::ReadInput => "Reading input",
                    IOErrorContext::WriteOutput => "Writing output",
                },
                path.display(),
                err
            ),
            Error::Write(err, path) => {
                write!(f, "Writing output file \"{}\" failed: {}", path.display(), err)
            }
            Error::Compile(err) => write!(f, "{}", err),
            Error::InvalidLevel(level) => write!(f, "Unknown optimization level \"{}\"", level),
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the output file to write to"),
        )
        .arg(
            Arg::with_name("opt")
                .short("O")
                .long("opt")
                .takes_value(true)
                .value_name("LEVEL")
                .default_value("light")
                .help("Sets the optimization level (none, light, hard, all)"),
        )
        .arg(
            Arg::with_name("dump")
                .short("d")
                .long("dump")
                .help("Prints the assembled program listing to stdout"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");
    let level = matches.value_of("opt").unwrap();
    let dump = matches.is_present("dump");

    if let Err(err) = compile_file(input, output, level, dump) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn compile_file(
    input: &str,
    output: Option<&str>,
    level: &str,
    dump: bool,
) -> Result<(), Error> {
    let level: OptimizationLevel = level
        .parse()
        .map_err(|_| Error::InvalidLevel(level.to_owned()))?;

    let input_path = Path::new(input);

    let input_file = File::open(input_path)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, input_path.to_owned()))?;
    let mut source = String::new();
    BufReader::new(input_file)
        .read_to_string(&mut source)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, input_path.to_owned()))?;

    let program = rsc::compile_with(&source, level).map_err(Error::Compile)?;

    if dump {
        print!("{}", program);
    }

    let output_path: PathBuf = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("rsbf"));

    rsbf::write_file(&output_path, &program).map_err(|err| Error::Write(err, output_path))?;
    Ok(())
}
