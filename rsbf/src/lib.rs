//! RSBF, the on-disk serialization of assembled RASM programs.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! u32 magic = 0x000F00D4
//! u32 version
//! u32 n_inputs;  { u32 len; bytes...; u32 index }  x n_inputs
//! u32 n_outputs; { u32 len; bytes...; u32 index }  x n_outputs
//! u32 n_immediates; { f64 value; u32 index }       x n_immediates
//! u32 n_frames; { u32 size; u32 n_instructions; u32 encoded... } x n_frames
//! ```
//!
//! Identifier indices are redundant (inputs occupy the lowest main-frame
//! cells, outputs follow) but kept in the file so tools can inspect a
//! program without reassembling it. Reading back a written program yields
//! a value equal to the original.

use std::error::Error as StdError;
use std::fmt;
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use byteorder::{ReadBytesExt, WriteBytesExt};

use rvm::{CallFrame, Instruction, Program};
use util::Endian;

pub const MAGIC_WORD: u32 = 0x000F_00D4;
pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug)]
pub enum Error {
    /// Underlying I/O failure, including short reads.
    Io(io::Error),
    NoMagicWord,
    WrongVersion(u32),
    /// An instruction word whose opcode byte is unknown.
    InvalidInstruction(u32),
    /// An identifier or immediate record carries an index that does not
    /// match its position.
    InvalidIndex,
    InvalidIdentifier,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(error) => write!(f, "reading failed: {}", error),
            Error::NoMagicWord => f.write_str("missing magic word"),
            Error::WrongVersion(version) => {
                write!(f, "unsupported format version {}", version)
            }
            Error::InvalidInstruction(encoded) => {
                write!(f, "invalid instruction word {:#010X}", encoded)
            }
            Error::InvalidIndex => f.write_str("record index does not match its position"),
            Error::InvalidIdentifier => f.write_str("identifier is not valid UTF-8"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

fn write_identifiers<W: Write>(
    writer: &mut W,
    identifiers: &[String],
    first_index: u32,
) -> Result<(), Error> {
    writer.write_u32::<Endian>(identifiers.len() as u32)?;
    for (position, identifier) in identifiers.iter().enumerate() {
        writer.write_u32::<Endian>(identifier.len() as u32)?;
        writer.write_all(identifier.as_bytes())?;
        writer.write_u32::<Endian>(first_index + position as u32)?;
    }
    Ok(())
}

fn read_identifiers<R: Read>(reader: &mut R, first_index: u32) -> Result<Vec<String>, Error> {
    let count = reader.read_u32::<Endian>()?;
    let mut identifiers = Vec::with_capacity(count as usize);
    for position in 0..count {
        let length = reader.read_u32::<Endian>()?;
        let mut bytes = vec![0u8; length as usize];
        reader.read_exact(&mut bytes)?;
        let identifier = String::from_utf8(bytes).map_err(|_| Error::InvalidIdentifier)?;

        let index = reader.read_u32::<Endian>()?;
        if index != first_index + position {
            return Err(Error::InvalidIndex);
        }
        identifiers.push(identifier);
    }
    Ok(identifiers)
}

/// Writes a program in RSBF layout.
pub fn write<W: Write>(writer: &mut W, program: &Program) -> Result<(), Error> {
    writer.write_u32::<Endian>(MAGIC_WORD)?;
    writer.write_u32::<Endian>(FORMAT_VERSION)?;

    write_identifiers(writer, &program.input_identifiers, 1)?;
    write_identifiers(
        writer,
        &program.output_identifiers,
        1 + program.num_inputs() as u32,
    )?;

    writer.write_u32::<Endian>(program.immediate_values.len() as u32)?;
    for (position, value) in program.immediate_values.iter().enumerate() {
        writer.write_f64::<Endian>(*value)?;
        writer.write_u32::<Endian>(position as u32)?;
    }

    writer.write_u32::<Endian>(program.call_frames.len() as u32)?;
    for frame in &program.call_frames {
        writer.write_u32::<Endian>(u32::from(frame.size))?;
        writer.write_u32::<Endian>(frame.instructions.len() as u32)?;
        for instruction in &frame.instructions {
            writer.write_u32::<Endian>(instruction.to_binary())?;
        }
    }

    Ok(())
}

/// Reads a program in RSBF layout.
pub fn read<R: Read>(reader: &mut R) -> Result<Program, Error> {
    let magic = reader.read_u32::<Endian>()?;
    if magic != MAGIC_WORD {
        return Err(Error::NoMagicWord);
    }

    // Single-version format: the section layout changed in version 2, so
    // older files cannot be parsed either.
    let version = reader.read_u32::<Endian>()?;
    if version != FORMAT_VERSION {
        return Err(Error::WrongVersion(version));
    }

    let input_identifiers = read_identifiers(reader, 1)?;
    let output_identifiers = read_identifiers(reader, 1 + input_identifiers.len() as u32)?;

    let immediate_count = reader.read_u32::<Endian>()?;
    let mut immediate_values = Vec::with_capacity(immediate_count as usize);
    for position in 0..immediate_count {
        let value = reader.read_f64::<Endian>()?;
        let index = reader.read_u32::<Endian>()?;
        if index != position {
            return Err(Error::InvalidIndex);
        }
        immediate_values.push(value);
    }

    let frame_count = reader.read_u32::<Endian>()?;
    let mut call_frames = Vec::with_capacity(frame_count as usize);
    for _ in 0..frame_count {
        let size = reader.read_u32::<Endian>()?;
        if size > 0xFF {
            return Err(Error::InvalidIndex);
        }

        let instruction_count = reader.read_u32::<Endian>()?;
        let mut instructions = Vec::with_capacity(instruction_count as usize);
        for _ in 0..instruction_count {
            let encoded = reader.read_u32::<Endian>()?;
            let instruction =
                Instruction::from_binary(encoded).ok_or(Error::InvalidInstruction(encoded))?;
            instructions.push(instruction);
        }

        call_frames.push(CallFrame {
            size: size as u8,
            instructions,
        });
    }

    Ok(Program {
        input_identifiers,
        output_identifiers,
        immediate_values,
        call_frames,
    })
}

pub trait ReadRsbfExt: Read + Sized {
    fn read_rsbf(&mut self) -> Result<Program, Error> {
        read(self)
    }
}

impl<R: Read + Sized> ReadRsbfExt for R {}

pub trait WriteRsbfExt: Write + Sized {
    fn write_rsbf(&mut self, program: &Program) -> Result<(), Error> {
        write(self, program)
    }
}

impl<W: Write + Sized> WriteRsbfExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Program, Error> {
    BufReader::new(File::open(path)?).read_rsbf()
}

pub fn write_file<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_rsbf(program)?;
    writer.flush()?;
    Ok(())
}
