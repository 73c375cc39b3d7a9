#[macro_use]
extern crate clap;

use std::process;

use clap::Arg;

use rsx::RunOptions;
use rvm::ExecutionOptions;

#[derive(Debug)]
enum Error {
    Run(rsx::Error),
    InvalidInput(String),
    InvalidOption(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Run(err) => write!(f, "{}", err),
            Error::InvalidInput(value) => {
                write!(f, "Input value \"{}\" is not a valid number", value)
            }
            Error::InvalidOption(value) => write!(f, "Invalid option value \"{}\"", value),
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Script source (.rsc) or assembled program (.rsbf) to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("VALUES")
                .help("Input values, one per declared input variable")
                .multiple(true)
                .allow_hyphen_values(true)
                .index(2),
        )
        .arg(
            Arg::with_name("memory")
                .short("m")
                .long("memory")
                .takes_value(true)
                .value_name("CELLS")
                .default_value("1024")
                .help("Sets the size of the memory arena in cells"),
        )
        .arg(
            Arg::with_name("depth")
                .short("s")
                .long("depth")
                .takes_value(true)
                .value_name("FRAMES")
                .default_value("64")
                .help("Sets the maximum call depth"),
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
        .get_matches();

    let file = matches.value_of("INPUT").unwrap();
    let values: Vec<&str> = matches
        .values_of("VALUES")
        .map(|values| values.collect())
        .unwrap_or_default();

    let result = run(
        file,
        &values,
        matches.value_of("memory").unwrap(),
        matches.value_of("depth").unwrap(),
        matches.value_of("opt").unwrap(),
    );

    match result {
        Ok(outputs) => {
            for (name, value) in outputs {
                println!("{} = {}", name, value);
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

fn run(
    file: &str,
    values: &[&str],
    memory: &str,
    depth: &str,
    level: &str,
) -> Result<Vec<(String, f64)>, Error> {
    let mut inputs = Vec::with_capacity(values.len());
    for value in values {
        let parsed: f64 = value
            .parse()
            .map_err(|_| Error::InvalidInput((*value).to_owned()))?;
        inputs.push(parsed);
    }

    let options = RunOptions {
        level: level
            .parse()
            .map_err(|_| Error::InvalidOption(level.to_owned()))?,
        execution: ExecutionOptions {
            memory_size: memory
                .parse()
                .map_err(|_| Error::InvalidOption(memory.to_owned()))?,
            max_call_depth: depth
                .parse()
                .map_err(|_| Error::InvalidOption(depth.to_owned()))?,
        },
    };

    rsx::run_file(file, &inputs, &options).map_err(Error::Run)
}
