use std::fmt;

use crate::Instruction;

/// The instruction list and memory requirement of one function, or of the
/// script's main body (always descriptor 0).
#[derive(Clone, Debug, PartialEq)]
pub struct CallFrame {
    /// Number of memory cells the frame occupies, including the A register.
    pub size: u8,
    pub instructions: Vec<Instruction>,
}

/// A fully assembled RASM program.
///
/// Input identifiers occupy the lowest non-accumulator cells of the main
/// frame in declaration order; output identifiers follow them directly.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub input_identifiers: Vec<String>,
    pub output_identifiers: Vec<String>,
    pub immediate_values: Vec<f64>,
    pub call_frames: Vec<CallFrame>,
}

impl Program {
    pub fn num_inputs(&self) -> usize {
        self.input_identifiers.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.output_identifiers.len()
    }

    pub fn main_frame(&self) -> Option<&CallFrame> {
        self.call_frames.first()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "inputs: {}  outputs: {}",
            self.input_identifiers.join(", "),
            self.output_identifiers.join(", ")
        )?;

        if !self.immediate_values.is_empty() {
            writeln!(f, "immediates:")?;
            for (index, value) in self.immediate_values.iter().enumerate() {
                writeln!(f, "  #{}: {}", index, value)?;
            }
        }

        for (id, frame) in self.call_frames.iter().enumerate() {
            writeln!(f, "frame {} ({} cells):", id, frame.size)?;
            for (index, instruction) in frame.instructions.iter().enumerate() {
                writeln!(f, "  {:3}: {}", index, instruction)?;
            }
        }
        Ok(())
    }
}
