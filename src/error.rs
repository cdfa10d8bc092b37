//! Diagnostic codes and typed errors shared across the compiler and backends.

use std::fmt;

use thiserror::Error;

use crate::lexer::Location;

/// A single numbered diagnostic, following the D3D-compiler-style numbering
/// used throughout this crate's source format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,
    pub code: u32,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(
            f,
            "{}:{}: {} X{}: {}",
            self.location.line, self.location.column, kind, self.code, self.message
        )
    }
}

/// Collects diagnostics emitted by the lexer and parser without aborting.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    fatal: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, location: Location, code: u32, message: impl Into<String>) {
        self.fatal = true;
        self.diagnostics.push(Diagnostic {
            location,
            code,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, location: Location, code: u32, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            location,
            code,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    /// A compile is viable iff no fatal diagnostic was ever emitted.
    pub fn is_viable(&self) -> bool {
        !self.fatal
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn extend(&mut self, other: DiagnosticSink) {
        self.fatal |= other.fatal;
        self.diagnostics.extend(other.diagnostics);
    }
}

impl fmt::Display for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diag in &self.diagnostics {
            writeln!(f, "{diag}")?;
        }
        Ok(())
    }
}

/// Error codes used by [`DiagnosticSink::error`]/[`DiagnosticSink::warning`] calls
/// throughout the lexer and parser.
pub mod codes {
    pub const SYNTAX_ERROR: u32 = 3000;
    pub const UNDECLARED_IDENTIFIER: u32 = 3004;
    pub const NO_MATCHING_OVERLOAD: u32 = 3013;
    pub const CANNOT_CONVERT: u32 = 3017;
    pub const INVALID_SWIZZLE: u32 = 3018;
    pub const TYPE_MISMATCH: u32 = 3020;
    pub const LVALUE_IS_CONST: u32 = 3025;
    pub const NON_LITERAL_ARRAY_DIM: u32 = 3058;
    pub const AMBIGUOUS_OVERLOAD: u32 = 3067;
    pub const BITWISE_NOT_ON_NON_INTEGRAL: u32 = 3082;
    pub const DUPLICATE_QUALIFIER: u32 = 3048;
    pub const IMPLICIT_TRUNCATION: u32 = 3206;
    pub const GLOBALS_ARE_UNIFORM: u32 = 5000;
    pub const EMPTY_STRUCT: u32 = 5001;
    pub const SWITCH_NO_CASES: u32 = 5002;
}

/// Errors produced by the GPU resource manager (C5).
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to create texture: {0}")]
    TextureCreation(String),
    #[error("failed to create sampler: {0}")]
    SamplerCreation(String),
    #[error("failed to create shader module: {0}")]
    ShaderCreation(String),
    #[error("failed to create pipeline: {0}")]
    PipelineCreation(String),
    #[error("backend shader compilation failed:\n{0}")]
    BackendCompile(String),
    #[error("device out of memory")]
    OutOfMemory,
    #[error(transparent)]
    Vulkan(#[from] VulkanError),
}

/// Errors produced by the Vulkan backend.
#[derive(Debug, Error)]
pub enum VulkanError {
    #[error("vulkan call failed: {0:?}")]
    Vk(String),
    #[error("no suitable memory type for requested properties")]
    NoSuitableMemoryType,
    #[error("device lost")]
    DeviceLost,
}

/// Errors produced by the per-backend runtime (C6/C7).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("swapchain image acquisition failed")]
    AcquireFailed,
    #[error("failed to save host state: {0}")]
    StateSaveFailed(String),
    #[error("failed to restore host state: {0}")]
    StateRestoreFailed(String),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Top-level error returned by effect compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("effect source is not viable, see diagnostics")]
    NotViable(DiagnosticSink),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}
