//! Structural validation of the program graph, ahead of points-to
//! construction: every non-root node has a predecessor (barring the
//! exempt kinds), every node's operand count matches its opcode, and
//! every reachable `PHI` has at least one operand (design §4.2
//! "Validation"). Findings accumulate into a [`DiagnosticSink`] instead
//! of failing fast, per the crate's propagation policy.

use crate::shared::error::DiagnosticSink;
use crate::shared::ir::{NodeKind, Operand, Program};

pub struct StructuralValidator;

impl StructuralValidator {
    /// Count only value operands (`Operand::Node`) against
    /// `NodeKind::expected_operand_count` — constant/symbol payloads like
    /// a GEP's shift or a call's callee name ride along in the same
    /// operand list but aren't "operands" in the arity sense.
    fn node_operand_count(operands: &[Operand]) -> usize {
        operands.iter().filter(|op| matches!(op, Operand::Node(_))).count()
    }

    pub fn validate(&self, program: &Program, sink: &mut DiagnosticSink) -> bool {
        for function in program.functions.values() {
            for &id in &function.order {
                let Some(instr) = function.instruction(id) else { continue };

                if instr.predecessors.is_empty() && !instr.kind.exempt_from_predecessor_rule() && id != function.entry
                {
                    sink.error(format!(
                        "{}: node {id} ({:?}) has no predecessor and is not a root-exempt kind",
                        function.name, instr.kind
                    ));
                }

                if let Some(expected) = instr.kind.expected_operand_count() {
                    let actual = Self::node_operand_count(&instr.operands);
                    if actual != expected {
                        sink.error(format!(
                            "{}: node {id} ({:?}) expects {expected} operand(s), has {actual}",
                            function.name, instr.kind, actual
                        ));
                    }
                }

                if instr.kind == NodeKind::Phi && Self::node_operand_count(&instr.operands) == 0 {
                    sink.error(format!("{}: phi node {id} has zero operands", function.name));
                }
            }
        }
        sink.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Function, Instruction};

    #[test]
    fn flags_phi_with_no_operands() {
        let mut f = Function::new(1, "f", 10);
        let mut entry = Instruction::new(10, NodeKind::Alloc);
        entry.successors.push(11);
        let mut phi = Instruction::new(11, NodeKind::Phi);
        phi.predecessors.push(10);
        f.add_instruction(entry);
        f.add_instruction(phi);
        let mut program = Program::new();
        program.add_function(f);

        let mut sink = DiagnosticSink::new();
        assert!(!StructuralValidator.validate(&program, &mut sink));
    }

    #[test]
    fn flags_operand_count_mismatch() {
        let mut f = Function::new(1, "f", 10);
        let mut entry = Instruction::new(10, NodeKind::Alloc);
        entry.successors.push(11);
        let mut load = Instruction::new(11, NodeKind::Load);
        load.predecessors.push(10);
        f.add_instruction(entry);
        f.add_instruction(load);
        let mut program = Program::new();
        program.add_function(f);

        let mut sink = DiagnosticSink::new();
        assert!(!StructuralValidator.validate(&program, &mut sink));
    }

    #[test]
    fn accepts_well_formed_linear_function() {
        let mut f = Function::new(1, "f", 10);
        let entry = Instruction::new(10, NodeKind::Alloc);
        let mut ret = Instruction::new(11, NodeKind::Return);
        ret.predecessors.push(10);
        ret.operands.push(Operand::Node(10));
        f.add_instruction(entry);
        f.add_instruction(ret);
        let mut program = Program::new();
        program.add_function(f);

        let mut sink = DiagnosticSink::new();
        assert!(StructuralValidator.validate(&program, &mut sink));
    }
}
