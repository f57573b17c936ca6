//! Residual-program emission (design §4.6 "Residual emission"): drop every
//! instruction the two-phase walk didn't mark, function by function,
//! leaving a program that still type-checks in the original IR because
//! `Function::delete_instruction` always splices around what it removes.

use crate::features::slicing::domain::SliceMarks;
use crate::shared::ir::Program;

pub struct ResidualEmitter;

impl ResidualEmitter {
    /// Consumes `marks` in place, producing `program` pruned down to the
    /// union of every marked node. A node with no marks at all (empty
    /// criterion) yields the empty program, per the design's stated
    /// failure mode.
    pub fn emit(program: &mut Program, marks: &SliceMarks) {
        let function_ids: Vec<u32> = program.functions.keys().copied().collect();
        for fid in function_ids {
            let Some(function) = program.functions.get(&fid) else { continue };
            let unmarked: Vec<u32> = function.order.iter().copied().filter(|&id| !marks.is_marked(id)).collect();
            if let Some(function) = program.functions.get_mut(&fid) {
                for id in unmarked {
                    function.delete_instruction(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Function, Instruction, NodeKind};

    fn linear_function() -> Function {
        let mut f = Function::new(1, "f", 10);
        let mut a = Instruction::new(10, NodeKind::Alloc);
        a.successors.push(11);
        let mut b = Instruction::new(11, NodeKind::Store);
        b.predecessors.push(10);
        b.successors.push(12);
        let mut c = Instruction::new(12, NodeKind::Return);
        c.predecessors.push(11);
        f.add_instruction(a);
        f.add_instruction(b);
        f.add_instruction(c);
        f
    }

    #[test]
    fn unmarked_instruction_is_dropped_and_neighbors_spliced() {
        let mut program = Program::new();
        program.add_function(linear_function());
        let mut marks = SliceMarks::new();
        marks.mark(10, 1);
        marks.mark(12, 1);

        ResidualEmitter::emit(&mut program, &marks);

        let f = &program.functions[&1];
        assert!(f.instruction(11).is_none());
        assert_eq!(f.instruction(10).unwrap().successors, vec![12]);
        assert_eq!(f.instruction(12).unwrap().predecessors, vec![10]);
    }

    #[test]
    fn empty_criterion_yields_empty_program() {
        let mut program = Program::new();
        program.add_function(linear_function());
        let marks = SliceMarks::new();

        ResidualEmitter::emit(&mut program, &marks);

        let f = &program.functions[&1];
        assert!(f.order.is_empty());
    }
}
