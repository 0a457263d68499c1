//! Per-compilation state shared by the parser and the resolver

use crate::common::{CompileResult, Diagnostic, DiagnosticReporter};
use crate::driver::CompilerConfig;
use crate::parser::InfixMode;
use crate::types::TypeTable;

/// Owns the interned types and the diagnostics of one compilation.
///
/// Nothing here is global, so independent compilations can run side by
/// side in one process.
#[derive(Debug)]
pub struct Session {
    pub types: TypeTable,
    pub diagnostics: DiagnosticReporter,
    pub infix: InfixMode,
}

impl Session {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            types: TypeTable::new(),
            diagnostics: DiagnosticReporter::new(
                config.max_errors,
                config.logging_enabled,
                config.style,
            ),
            infix: config.infix,
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) -> CompileResult<()> {
        self.diagnostics.report(diagnostic)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&CompilerConfig::default())
    }
}
