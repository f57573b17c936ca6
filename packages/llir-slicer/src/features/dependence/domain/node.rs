use crate::shared::ir::NodeId;

/// What a node in the SDG actually is: a real instruction, or one of the
/// synthetic parameter-passing nodes the interprocedural extension adds.
/// Every variant also has a concrete [`NodeId`] (real for `Instruction`,
/// freshly allocated for the synthetic kinds) so edges stay uniform
/// `NodeId -> NodeId` pairs rather than a node-kind-aware graph type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdgNode {
    Instruction(NodeId),
    ActualIn { call: NodeId, index: u32 },
    ActualOut { call: NodeId },
    FormalIn { function: NodeId, index: u32 },
    FormalOut { function: NodeId },
}
