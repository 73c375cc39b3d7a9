//! AST-to-AST optimization passes.
//!
//! Passes are re-entrant: running any pass (or the whole pipeline) twice in
//! a row reaches a fixed point.

use std::str::FromStr;

use log::debug;

use crate::ast::{Ast, AstNode};
use util::ParseEnumError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OptimizationLevel {
    None,
    Light,
    Hard,
    All,
}

impl FromStr for OptimizationLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<OptimizationLevel, ParseEnumError> {
        match s.to_lowercase().as_str() {
            "none" => Ok(OptimizationLevel::None),
            "light" => Ok(OptimizationLevel::Light),
            "hard" => Ok(OptimizationLevel::Hard),
            "all" => Ok(OptimizationLevel::All),
            _ => Err(ParseEnumError::new(s, "OptimizationLevel")),
        }
    }
}

pub trait OptimizerPass {
    fn name(&self) -> &'static str;

    fn run(&self, ast: &mut Ast);
}

/// Removes statements whose evaluation cannot alter visible state, both at
/// the top level and inside conditional bodies.
pub struct RemoveIfNoSideEffects;

impl RemoveIfNoSideEffects {
    fn sweep(nodes: &mut Vec<AstNode>) {
        let mut index = 0;
        while index < nodes.len() {
            if let AstNode::Conditional {
                body, else_body, ..
            } = &mut nodes[index]
            {
                Self::sweep(body);
                Self::sweep(else_body);
                index += 1;
            } else if !nodes[index].has_side_effect() {
                nodes.remove(index);
            } else {
                index += 1;
            }
        }
    }
}

impl OptimizerPass for RemoveIfNoSideEffects {
    fn name(&self) -> &'static str {
        "remove nodes with no side effects"
    }

    fn run(&self, ast: &mut Ast) {
        Self::sweep(&mut ast.nodes);
    }
}

/// Folds conditionals with a literal condition and drops conditionals with
/// an empty body.
///
/// A taken branch is spliced into the surrounding node list between an
/// `InlinePush`/`InlinePop` pair so that the scope the conditional would
/// have introduced is preserved.
pub struct OptimizeConditionalsLight;

impl OptimizeConditionalsLight {
    fn splice(nodes: &mut Vec<AstNode>, index: usize, branch: Vec<AstNode>) {
        let replacement = std::iter::once(AstNode::InlinePush)
            .chain(branch.into_iter())
            .chain(std::iter::once(AstNode::InlinePop));
        nodes.splice(index..=index, replacement);
    }
}

impl OptimizerPass for OptimizeConditionalsLight {
    fn name(&self) -> &'static str {
        "light-weight optimizations on conditional constructs"
    }

    fn run(&self, ast: &mut Ast) {
        let nodes = &mut ast.nodes;
        let mut index = 0;

        while index < nodes.len() {
            let (is_true, is_false, is_empty) = match &nodes[index] {
                AstNode::Conditional {
                    condition,
                    body,
                    else_body,
                } => match condition.as_ref() {
                    AstNode::BoolConstant { value } => (*value, !*value, false),
                    _ => (false, false, body.is_empty() && else_body.is_empty()),
                },
                _ => {
                    index += 1;
                    continue;
                }
            };

            if is_empty {
                nodes.remove(index);
                continue;
            }
            if !is_true && !is_false {
                index += 1;
                continue;
            }

            let (body, else_body) = match nodes[index].clone() {
                AstNode::Conditional {
                    body, else_body, ..
                } => (body, else_body),
                _ => unreachable!(),
            };

            let branch = if is_true { body } else { else_body };
            if branch.is_empty() {
                nodes.remove(index);
            } else {
                Self::splice(nodes, index, branch);
                // Re-examine from the spliced nodes so nested conditionals
                // are folded in the same run.
            }
        }
    }
}

pub fn passes_for_level(level: OptimizationLevel) -> Vec<Box<dyn OptimizerPass>> {
    match level {
        OptimizationLevel::None => Vec::new(),
        OptimizationLevel::Light | OptimizationLevel::Hard | OptimizationLevel::All => vec![
            Box::new(RemoveIfNoSideEffects),
            Box::new(OptimizeConditionalsLight),
        ],
    }
}

/// Runs the given passes over the AST in order.
pub fn optimize(mut ast: Ast, passes: &[Box<dyn OptimizerPass>]) -> Ast {
    for pass in passes {
        debug!("running optimizer pass: {}", pass.name());
        pass.run(&mut ast);
    }
    ast
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use matches::assert_matches;

    fn optimized(source: &str, level: OptimizationLevel) -> Ast {
        let ast = parse(&lex(source).unwrap()).unwrap();
        optimize(ast, &passes_for_level(level))
    }

    const HEADER: &str = "[[config]]\ninput a\noutput b\n[[body]]\n";

    #[test]
    fn pure_statements_are_removed() {
        let source = format!("{}a + 1\nb = a\na < 2\n", HEADER);
        let ast = optimized(&source, OptimizationLevel::Light);

        assert_eq!(ast.nodes.len(), 1);
        assert_matches!(ast.nodes[0], AstNode::Assignment { .. });
    }

    #[test]
    fn level_none_keeps_everything() {
        let source = format!("{}a + 1\nb = a\n", HEADER);
        let ast = optimized(&source, OptimizationLevel::None);
        assert_eq!(ast.nodes.len(), 2);
    }

    #[test]
    fn literal_true_conditional_is_inlined() {
        let source = format!("{}if true\nb = 1\nendif\n", HEADER);
        let ast = optimized(&source, OptimizationLevel::Light);

        assert_eq!(ast.nodes.len(), 3);
        assert_matches!(ast.nodes[0], AstNode::InlinePush);
        assert_matches!(ast.nodes[1], AstNode::Assignment { .. });
        assert_matches!(ast.nodes[2], AstNode::InlinePop);
    }

    #[test]
    fn literal_false_conditional_is_removed() {
        let source = format!("{}if false\nb = 1\nendif\nb = 2\n", HEADER);
        let ast = optimized(&source, OptimizationLevel::Light);

        assert_eq!(ast.nodes.len(), 1);
        assert_matches!(ast.nodes[0], AstNode::Assignment { .. });
    }

    #[test]
    fn literal_false_keeps_the_else_branch() {
        let source = format!("{}if false\nb = 1\nelse\nb = 2\nendif\n", HEADER);
        let ast = optimized(&source, OptimizationLevel::Light);

        assert_eq!(ast.nodes.len(), 3);
        assert_matches!(ast.nodes[0], AstNode::InlinePush);
        assert_matches!(ast.nodes[2], AstNode::InlinePop);
    }

    #[test]
    fn empty_conditional_is_removed() {
        let source = format!("{}if a > 0\nendif\nb = 1\n", HEADER);
        let ast = optimized(&source, OptimizationLevel::Light);
        assert_eq!(ast.nodes.len(), 1);
    }

    #[test]
    fn nested_literal_conditionals_fold_in_one_run() {
        let source = format!("{}if true\nif true\nb = 1\nendif\nendif\n", HEADER);
        let ast = optimized(&source, OptimizationLevel::Light);

        // Both levels collapse: push push assign pop pop.
        assert_eq!(ast.nodes.len(), 5);
        assert_matches!(ast.nodes[2], AstNode::Assignment { .. });
    }

    #[test]
    fn passes_reach_a_fixed_point() {
        let source = format!("{}if true\na + 1\nb = 1\nendif\n", HEADER);
        let once = optimized(&source, OptimizationLevel::Light);

        let passes = passes_for_level(OptimizationLevel::Light);
        let twice = optimize(once.clone(), &passes);
        assert_eq!(once, twice);
    }
}
