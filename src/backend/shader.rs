//! GLSL-to-SPIR-V compilation, shared by every concrete [`super::target::Backend`]
//! that wants SPIR-V from the GLSL this crate's codegen emits (§4.3).

use naga::back::spv::PipelineOptions;
use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::ShaderStage;

use crate::error::GpuError;

/// Parses, validates and emits SPIR-V for `s`, a single GLSL shader stage.
/// On any failure the compiler's own error is captured verbatim into
/// [`GpuError::BackendCompile`] (§4.3's "backend compile failure captures
/// the compiler's error log verbatim" rule).
pub fn glsl_to_spirv(s: &str, stage: ShaderStage) -> Result<Vec<u32>, GpuError> {
    let module = Frontend::default()
        .parse(&Options { stage, defines: Default::default() }, s)
        .map_err(|err| GpuError::BackendCompile(err.emit_to_string(s)))?;

    let mut validator = Validator::new(ValidationFlags::default(), Capabilities::empty());
    let info = validator
        .validate(&module)
        .map_err(|err| GpuError::BackendCompile(err.emit_to_string(s)))?;

    naga::back::spv::write_vec(
        &module,
        &info,
        &Default::default(),
        Some(&PipelineOptions { shader_stage: stage, entry_point: "main".to_owned() }),
    )
    .map_err(|err| GpuError::BackendCompile(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_glsl_compiles_to_nonempty_spirv() {
        let source = "#version 450\nvoid main() { gl_Position = vec4(0.0); }";
        let words = glsl_to_spirv(source, ShaderStage::Vertex).unwrap();
        assert!(!words.is_empty());
    }

    #[test]
    fn invalid_glsl_reports_backend_compile_error() {
        let source = "#version 450\nvoid main() { this is not glsl }";
        let err = glsl_to_spirv(source, ShaderStage::Vertex).unwrap_err();
        assert!(matches!(err, GpuError::BackendCompile(_)));
    }
}
