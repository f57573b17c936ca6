use crate::shared::ir::{Function, NodeId};
use rustc_hash::FxHashMap;

/// A maximal straight-line run of instructions. Built once per function and
/// used for display and for `Program::delete_block`'s bulk-removal calls;
/// the analyses themselves operate at instruction granularity and don't
/// need blocks at all.
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub nodes: Vec<NodeId>,
}

/// Computes basic blocks per the block-start rule: a node starts a new
/// block when it has zero, multiple, or a branching predecessor (one with
/// more than one successor); a node with exactly one non-branching
/// predecessor joins that predecessor's block.
pub struct BlockBuilder;

impl BlockBuilder {
    pub fn build(function: &Function) -> Vec<BasicBlock> {
        let mut blocks = Vec::new();
        let mut block_of: FxHashMap<NodeId, usize> = FxHashMap::default();

        for &id in &function.order {
            let instr = function.instruction(id).expect("order is kept in sync with instructions");
            let starts_new_block = match instr.predecessors.as_slice() {
                [] => true,
                [only] => {
                    let pred = function.instruction(*only);
                    pred.map(|p| p.successors.len() > 1).unwrap_or(true)
                }
                _ => true,
            };

            if starts_new_block {
                blocks.push(BasicBlock { nodes: vec![id] });
                block_of.insert(id, blocks.len() - 1);
            } else {
                let pred = instr.predecessors[0];
                let block_idx = *block_of
                    .get(&pred)
                    .expect("predecessor was visited earlier in program order");
                blocks[block_idx].nodes.push(id);
                block_of.insert(id, block_idx);
            }
        }

        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Instruction, NodeKind};

    fn linear() -> Function {
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
    fn straight_line_function_is_one_block() {
        let f = linear();
        let blocks = BlockBuilder::build(&f);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].nodes, vec![10, 11, 12]);
    }

    #[test]
    fn branch_splits_into_separate_blocks() {
        let mut f = Function::new(1, "f", 10);
        let mut a = Instruction::new(10, NodeKind::Alloc);
        a.successors.extend([11, 12]);
        let mut b = Instruction::new(11, NodeKind::Store);
        b.predecessors.push(10);
        let mut c = Instruction::new(12, NodeKind::Load);
        c.predecessors.push(10);
        f.add_instruction(a);
        f.add_instruction(b);
        f.add_instruction(c);

        let blocks = BlockBuilder::build(&f);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].nodes, vec![10]);
    }

    #[test]
    fn join_point_starts_new_block() {
        let mut f = Function::new(1, "f", 10);
        let mut a = Instruction::new(10, NodeKind::Alloc);
        a.successors.push(12);
        let mut b = Instruction::new(11, NodeKind::Alloc);
        b.successors.push(12);
        let mut c = Instruction::new(12, NodeKind::Phi);
        c.predecessors.extend([10, 11]);
        f.add_instruction(a);
        f.add_instruction(b);
        f.add_instruction(c);

        let blocks = BlockBuilder::build(&f);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].nodes, vec![12]);
    }
}
