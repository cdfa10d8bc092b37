pub mod codegen;
pub mod layout;
pub mod shader;
pub mod software;
pub mod target;
