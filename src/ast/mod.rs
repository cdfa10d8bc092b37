pub mod node;
pub mod pass;
pub mod symbol;
pub mod ty;

pub use node::{Node, NodeId};
pub use pass::{PassState, SamplerDescriptor, TextureDescriptor, TextureFormat};
pub use symbol::{Symbol, SymbolId, SymbolTable};
pub use ty::{BaseClass, Qualifiers, Type};

use crate::util::Arena;

/// A fully parsed effect: the node arena plus every top-level declaration,
/// indexed the way the resource manager and backend walker need.
pub struct Ast {
    pub nodes: Arena<Node>,
    pub symbols: SymbolTable,
    pub textures: Vec<TextureDescriptor>,
    pub samplers: Vec<SamplerDescriptor>,
    pub uniforms: Vec<SymbolId>,
    pub functions: Vec<SymbolId>,
    pub techniques: Vec<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            symbols: SymbolTable::new(),
            textures: Vec::new(),
            samplers: Vec::new(),
            uniforms: Vec::new(),
            functions: Vec::new(),
            techniques: Vec::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id).expect("dangling NodeId")
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}
