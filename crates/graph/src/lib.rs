pub mod assembler;
pub mod export;
pub mod model;

pub use assembler::GraphAssembler;
pub use export::{EntityRef, GraphExport, Triple};
pub use model::{EdgeKey, GraphEdge, GraphNode, KnowledgeGraph, NodeKey};
