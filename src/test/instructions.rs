use super::*;

use matches::assert_matches;

fn single_op_program(
    immediate_values: Vec<f64>,
    size: u8,
    body: Vec<Instruction>,
) -> Program {
    let mut instructions = body;
    instructions.push(Instruction::nullary(OpCode::HLT));
    program(immediate_values, vec![frame(size, instructions)])
}

mod mov {
    use super::*;

    #[test]
    fn from_immediate() {
        let program = single_op_program(
            vec![2.5],
            2,
            vec![Instruction::new(OpCode::MOV, immediate(0), direct(1))],
        );
        assert_eq!(run_program(&program).memory()[1], 2.5);
    }

    #[test]
    fn from_direct() {
        let program = single_op_program(
            vec![7.0],
            3,
            vec![
                Instruction::new(OpCode::MOV, immediate(0), direct(1)),
                Instruction::new(OpCode::MOV, direct(1), direct(2)),
            ],
        );
        assert_eq!(run_program(&program).memory()[2], 7.0);
    }

    #[test]
    fn into_immediate_is_rejected() {
        let program = single_op_program(
            vec![7.0],
            2,
            vec![Instruction::new(OpCode::MOV, direct(1), immediate(0))],
        );
        assert_matches!(
            VMState::new(&program, &Default::default()).err(),
            Some(ExecutionError::InvalidInstructionAccess)
        );
    }
}

mod arithmetic {
    use super::*;

    fn binary_result(op_code: OpCode, lhs: f64, rhs: f64) -> Result<f64, ExecutionError> {
        let program = single_op_program(
            vec![lhs, rhs],
            1,
            vec![Instruction::new(op_code, immediate(0), immediate(1))],
        );
        let mut state = VMState::new(&program, &Default::default()).unwrap();
        state.run()?;
        Ok(state.memory()[0])
    }

    #[test]
    fn add() {
        assert_eq!(binary_result(OpCode::ADD, 42.0, 64.0), Ok(106.0));
    }

    #[test]
    fn sub() {
        assert_eq!(binary_result(OpCode::SUB, 10.0, 12.5), Ok(-2.5));
    }

    #[test]
    fn mul() {
        assert_eq!(binary_result(OpCode::MUL, -4.0, 2.5), Ok(-10.0));
    }

    #[test]
    fn div() {
        assert_eq!(binary_result(OpCode::DIV, 9.0, 2.0), Ok(4.5));
    }

    #[test]
    fn div_by_zero() {
        assert_eq!(
            binary_result(OpCode::DIV, 9.0, 0.0),
            Err(ExecutionError::DivideByZero)
        );
    }

    #[test]
    fn pow() {
        assert_eq!(binary_result(OpCode::POW, 2.0, 10.0), Ok(1024.0));
    }

    #[test]
    fn pow_domain_error() {
        assert_eq!(
            binary_result(OpCode::POW, -1.0, 0.5),
            Err(ExecutionError::InvalidOperand)
        );
    }

    #[test]
    fn overflow_is_an_fp_exception() {
        assert_eq!(
            binary_result(OpCode::MUL, 1.0e308, 1.0e308),
            Err(ExecutionError::FpException)
        );
    }

    #[test]
    fn mag() {
        let program = single_op_program(
            vec![-3.25],
            1,
            vec![Instruction::unary(OpCode::MAG, immediate(0))],
        );
        assert_eq!(run_program(&program).memory()[0], 3.25);
    }

    #[test]
    fn fac_of_five() {
        let program = single_op_program(
            vec![5.0],
            1,
            vec![Instruction::unary(OpCode::FAC, immediate(0))],
        );
        assert_eq!(run_program(&program).memory()[0], 120.0);
    }

    #[test]
    fn fac_of_zero() {
        let program = single_op_program(
            vec![0.0],
            1,
            vec![Instruction::unary(OpCode::FAC, immediate(0))],
        );
        assert_eq!(run_program(&program).memory()[0], 1.0);
    }

    #[test]
    fn fac_of_negative_integer() {
        let program = single_op_program(
            vec![-2.0],
            1,
            vec![Instruction::unary(OpCode::FAC, immediate(0))],
        );
        assert_matches!(
            run_program_error(&program),
            ExecutionError::InvalidOperand
        );
    }
}

mod compound_assign {
    use super::*;

    fn compound_result(op_code: OpCode, initial: f64, rhs: f64) -> Result<f64, ExecutionError> {
        let program = single_op_program(
            vec![initial, rhs],
            2,
            vec![
                Instruction::new(OpCode::MOV, immediate(0), direct(1)),
                Instruction::new(op_code, direct(1), immediate(1)),
            ],
        );
        let mut state = VMState::new(&program, &Default::default()).unwrap();
        state.run()?;
        Ok(state.memory()[1])
    }

    #[test]
    fn inc() {
        assert_eq!(compound_result(OpCode::INC, 4.0, 0.5), Ok(4.5));
    }

    #[test]
    fn dec() {
        assert_eq!(compound_result(OpCode::DEC, 4.0, 6.0), Ok(-2.0));
    }

    #[test]
    fn mas() {
        assert_eq!(compound_result(OpCode::MAS, 4.0, 2.5), Ok(10.0));
    }

    #[test]
    fn das() {
        assert_eq!(compound_result(OpCode::DAS, 9.0, 4.5), Ok(2.0));
    }

    #[test]
    fn das_by_zero() {
        assert_eq!(
            compound_result(OpCode::DAS, 9.0, 0.0),
            Err(ExecutionError::DivideByZero)
        );
    }

    #[test]
    fn pas() {
        assert_eq!(compound_result(OpCode::PAS, 3.0, 3.0), Ok(27.0));
    }
}

mod comparisons {
    use super::*;

    // The comparison result is only observable through JPZ, so every test
    // routes the flag into a memory cell with a conditional jump.
    fn flag_after(op_code: OpCode, lhs: f64, rhs: f64) -> bool {
        let program = single_op_program(
            vec![lhs, rhs, 1.0],
            2,
            vec![
                Instruction::new(op_code, immediate(0), immediate(1)),
                Instruction::unary(OpCode::JPZ, direct(3)),
                Instruction::new(OpCode::MOV, immediate(2), direct(1)),
            ],
        );
        run_program(&program).memory()[1] == 1.0
    }

    #[test]
    fn clt() {
        assert!(flag_after(OpCode::CLT, 1.0, 2.0));
        assert!(!flag_after(OpCode::CLT, 2.0, 1.0));
        assert!(!flag_after(OpCode::CLT, 2.0, 2.0));
    }

    #[test]
    fn cgt() {
        assert!(flag_after(OpCode::CGT, 2.0, 1.0));
        assert!(!flag_after(OpCode::CGT, 1.0, 2.0));
    }

    #[test]
    fn ceq() {
        assert!(flag_after(OpCode::CEQ, 2.0, 2.0));
        assert!(!flag_after(OpCode::CEQ, 2.0, 1.0));
        // Bitwise comparison distinguishes the two zeroes.
        assert!(!flag_after(OpCode::CEQ, 0.0, -0.0));
    }

    #[test]
    fn cne() {
        assert!(flag_after(OpCode::CNE, 2.0, 1.0));
        assert!(!flag_after(OpCode::CNE, 2.0, 2.0));
    }
}

mod jumps {
    use super::*;

    #[test]
    fn jmp_skips_instructions() {
        let program = single_op_program(
            vec![1.0],
            2,
            vec![
                Instruction::unary(OpCode::JMP, direct(2)),
                Instruction::new(OpCode::MOV, immediate(0), direct(1)),
            ],
        );
        assert_eq!(run_program(&program).memory()[1], 0.0);
    }

    #[test]
    fn jpz_taken_only_when_flag_clear() {
        let program = single_op_program(
            vec![1.0],
            2,
            vec![
                Instruction::new(OpCode::CEQ, immediate(0), immediate(0)),
                Instruction::unary(OpCode::JPZ, direct(3)),
                Instruction::new(OpCode::MOV, immediate(0), direct(1)),
            ],
        );
        assert_eq!(run_program(&program).memory()[1], 1.0);
    }

    #[test]
    fn jmp_backwards_terminates_via_condition() {
        // Counts $1 up to 3, then falls through.
        let program = single_op_program(
            vec![3.0, 1.0],
            2,
            vec![
                Instruction::new(OpCode::INC, direct(1), immediate(1)),
                Instruction::new(OpCode::CLT, direct(1), immediate(0)),
                Instruction::unary(OpCode::JPZ, direct(4)),
                Instruction::unary(OpCode::JMP, direct(0)),
            ],
        );
        assert_eq!(run_program(&program).memory()[1], 3.0);
    }
}

mod calls {
    use super::*;

    #[test]
    fn put_marshals_into_the_next_frame() {
        // Callee adds its two arguments.
        let program = program(
            vec![2.0, 3.0],
            vec![
                frame(
                    2,
                    vec![
                        Instruction::new(OpCode::PUT, immediate(0), direct(1)),
                        Instruction::new(OpCode::PUT, immediate(1), direct(2)),
                        Instruction::unary(OpCode::JSR, direct(1)),
                        Instruction::new(OpCode::MOV, direct(0), direct(1)),
                        Instruction::nullary(OpCode::HLT),
                    ],
                ),
                frame(
                    3,
                    vec![
                        Instruction::new(OpCode::ADD, direct(1), direct(2)),
                        Instruction::nullary(OpCode::RET),
                    ],
                ),
            ],
        );

        assert_eq!(run_program(&program).memory()[1], 5.0);
    }

    #[test]
    fn nested_calls_keep_caller_frames_intact() {
        // main calls f, f calls g; f's locals must survive g's execution.
        let program = program(
            vec![1.0, 10.0],
            vec![
                frame(
                    2,
                    vec![
                        Instruction::unary(OpCode::JSR, direct(1)),
                        Instruction::new(OpCode::MOV, direct(0), direct(1)),
                        Instruction::nullary(OpCode::HLT),
                    ],
                ),
                frame(
                    2,
                    vec![
                        Instruction::new(OpCode::MOV, immediate(1), direct(1)),
                        Instruction::unary(OpCode::JSR, direct(2)),
                        Instruction::new(OpCode::ADD, direct(0), direct(1)),
                        Instruction::nullary(OpCode::RET),
                    ],
                ),
                frame(
                    1,
                    vec![
                        Instruction::new(OpCode::ADD, immediate(0), immediate(0)),
                        Instruction::nullary(OpCode::RET),
                    ],
                ),
            ],
        );

        // g returns 2, f returns 2 + 10.
        assert_eq!(run_program(&program).memory()[1], 12.0);
    }

    #[test]
    fn put_outside_the_arena_overflows() {
        let program = program(
            vec![1.0],
            vec![frame(
                4,
                vec![
                    Instruction::new(OpCode::PUT, immediate(0), direct(3)),
                    Instruction::nullary(OpCode::HLT),
                ],
            )],
        );

        let options = ExecutionOptions {
            memory_size: 5,
            max_call_depth: 4,
        };
        let mut state = VMState::new(&program, &options).unwrap();
        assert_matches!(state.run(), Err(ExecutionError::MemoryOverflow));
    }
}
