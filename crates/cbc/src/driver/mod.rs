//! Compilation driver: configuration, source loading and the
//! parse-then-resolve pipeline

mod loader;

pub use loader::{FileSystemLoader, MemoryLoader, SourceLoader};

use crate::ast::{
    AstPrinter, CompileUnit, ConstValue, IdentId, ScopeId, StatementKind, ValueId, ValueKind,
};
use crate::common::{
    CompileError, CompileResult, DEFAULT_MAX_ERRORS, Diagnostic, DiagnosticStyle,
};
use crate::lexer::tokenize;
use crate::parser::{self, InfixMode};
use crate::sema::{Resolver, SpecializationCache};
use crate::session::Session;
use log::{debug, info};
use std::collections::HashSet;
use std::path::Path;

/// Compiler options
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Compilation stops once this many errors were reported
    pub max_errors: usize,
    /// Print diagnostics as they are reported
    pub logging_enabled: bool,
    pub style: DiagnosticStyle,
    pub infix: InfixMode,
    /// Function the code generator starts from
    pub entry_point: String,
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub verbose: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
            logging_enabled: true,
            style: DiagnosticStyle::default(),
            infix: InfixMode::default(),
            entry_point: "main".to_string(),
            dump_tokens: false,
            dump_ast: false,
            verbose: false,
        }
    }
}

impl CompilerConfig {
    /// Default options with diagnostic printing off
    pub fn quiet() -> Self {
        Self {
            logging_enabled: false,
            ..Self::default()
        }
    }
}

/// Result of parsing and resolving one entry file, errors included
#[derive(Debug)]
pub struct Analysis {
    pub unit: CompileUnit,
    pub session: Session,
    /// Global scope of the entry file
    pub root: ScopeId,
    pub specializations: SpecializationCache,
}

impl Analysis {
    pub fn error_count(&self) -> usize {
        self.session.error_count()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.session
            .diagnostics
            .error_messages()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Identifier declared at the top level of the entry file
    pub fn ident(&self, name: &str) -> Option<IdentId> {
        self.unit.declared_in(self.root, name)
    }
}

/// What the code generator receives: a fully resolved unit
#[derive(Debug)]
pub struct CodegenInput {
    pub unit: CompileUnit,
    pub session: Session,
    pub root: ScopeId,
    /// The entry point's function value
    pub entry: ValueId,
    /// Entry point and every function reachable from it, in discovery order
    pub functions: Vec<ValueId>,
}

pub struct Compiler {
    config: CompilerConfig,
    loader: Box<dyn SourceLoader>,
}

impl Compiler {
    /// Compiler reading imported files relative to the working directory
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            loader: Box::new(FileSystemLoader::default()),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn SourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Parse and resolve `source`, keeping whatever errors were reported.
    ///
    /// Only an unrecoverable condition (error ceiling, I/O) is an `Err`.
    pub fn analyze_source(&self, name: &str, source: &str) -> CompileResult<Analysis> {
        let mut session = Session::new(&self.config);
        let mut unit = CompileUnit::new(&session.types);

        if self.config.dump_tokens {
            eprintln!("=== Tokens ===");
            for token in tokenize(source, name)? {
                eprintln!("{:?}", token);
            }
            eprintln!("=== End Tokens ===\n");
        }

        if self.config.verbose {
            info!("parsing {}", name);
        }
        let root = match parser::parse_source(&mut unit, &mut session, name, source) {
            Ok(root) => root,
            Err(CompileError::Aborted) => {
                return Ok(Analysis {
                    root: unit.builtin_scope(),
                    unit,
                    session,
                    specializations: SpecializationCache::new(),
                });
            }
            Err(err) => return Err(err),
        };

        if self.config.verbose {
            info!("resolving {}", name);
        }
        let mut resolver = Resolver::new(&mut unit, &mut session, self.loader.as_ref());
        resolver.resolve()?;
        let specializations = resolver.finish();
        debug!(
            "{}: {} statements, {} specializations, {} errors",
            name,
            unit.statement_count(),
            specializations.len(),
            session.error_count()
        );

        if self.config.dump_ast {
            eprintln!("=== AST ===");
            eprintln!("{}", AstPrinter::new(&unit, &session.types).dump(root));
            eprintln!("=== End AST ===\n");
        }

        Ok(Analysis {
            unit,
            session,
            root,
            specializations,
        })
    }

    /// Analyze `source` and hand it over for code generation, which
    /// requires an error-free unit with an entry point
    pub fn compile_source(&self, name: &str, source: &str) -> CompileResult<CodegenInput> {
        let mut analysis = self.analyze_source(name, source)?;
        if analysis.error_count() > 0 {
            return Err(CompileError::Failed {
                errors: analysis.error_count(),
            });
        }

        let entry_name = &self.config.entry_point;
        let entry = analysis.ident(entry_name).and_then(|ident| {
            match analysis.unit.ident(ident).value {
                Some(ConstValue::Function(function)) => Some(function),
                _ => None,
            }
        });
        let Some(entry) = entry else {
            let position = analysis.unit.scope(analysis.root).start.clone();
            analysis.session.report(Diagnostic::error(
                format!("No entry point \"{}\" found in global scope", entry_name),
                position,
            ))?;
            return Err(CompileError::Failed {
                errors: analysis.error_count(),
            });
        };

        let functions = reachable_functions(&analysis.unit, entry);
        info!("{} functions reachable from {}", functions.len(), entry_name);
        Ok(CodegenInput {
            unit: analysis.unit,
            session: analysis.session,
            root: analysis.root,
            entry,
            functions,
        })
    }

    /// Read `path` and compile it; imports resolve next to it
    pub fn compile_file(self, path: &Path) -> CompileResult<CodegenInput> {
        let source = std::fs::read_to_string(path).map_err(|source| CompileError::Load {
            path: path.display().to_string(),
            source,
        })?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.with_loader(Box::new(FileSystemLoader::new(root)))
            .compile_source(&name, &source)
    }
}

/// Functions the entry point can reach: called, referenced by name, used
/// as operators, or created as specializations of generics
fn reachable_functions(unit: &CompileUnit, entry: ValueId) -> Vec<ValueId> {
    let mut found = vec![entry];
    let mut seen: HashSet<ValueId> = HashSet::from([entry]);
    let mut next = 0;

    while next < found.len() {
        let function = found[next];
        next += 1;

        let mut values: Vec<ValueId> = unit
            .statement_ids()
            .filter(|stmt| unit.enclosing_function(unit.stmt(*stmt).scope) == Some(function))
            .flat_map(|stmt| statement_values(&unit.stmt(stmt).kind))
            .collect();
        if let Some(definition) = unit.function(function) {
            values.extend(definition.inputs.iter().filter_map(|p| p.default));
        }

        while let Some(value) = values.pop() {
            let node = unit.value(value);
            let referenced = match &node.kind {
                ValueKind::Identifier { target, .. } | ValueKind::Getter { target, .. } => {
                    match target.and_then(|ident| unit.ident(ident).value.clone()) {
                        Some(ConstValue::Function(callee)) => Some(callee),
                        _ => None,
                    }
                }
                ValueKind::FunctionCall { specialization, .. } => *specialization,
                ValueKind::InfixOp { overload, .. } => *overload,
                ValueKind::Function(_) => Some(value),
                _ => None,
            };
            if let Some(callee) = referenced {
                let concrete = unit.function(callee).is_some_and(|f| !f.is_generic());
                if concrete && seen.insert(callee) {
                    found.push(callee);
                }
            }
            values.extend(child_values(&node.kind));
        }
    }
    found
}

fn statement_values(kind: &StatementKind) -> Vec<ValueId> {
    match kind {
        StatementKind::Declaration { values, .. } => values.clone(),
        StatementKind::Assignment {
            targets, values, ..
        } => targets.iter().chain(values).copied().collect(),
        StatementKind::If { branches, .. } => branches.iter().map(|b| b.condition).collect(),
        StatementKind::While { condition, .. } => vec![*condition],
        StatementKind::For {
            start, end, step, ..
        } => std::iter::once(*start).chain(*end).chain(*step).collect(),
        StatementKind::Return { values, named } => values
            .iter()
            .copied()
            .chain(named.iter().map(|n| n.value))
            .collect(),
        StatementKind::Using { subject } => vec![*subject],
        StatementKind::Call(call) => vec![*call],
        StatementKind::Block(_) | StatementKind::Malformed => Vec::new(),
        StatementKind::Operator { function, .. } => vec![*function],
    }
}

/// Sub-values evaluated as part of a value. Function literals are not
/// descended into; their bodies are walked when they are reached.
fn child_values(kind: &ValueKind) -> Vec<ValueId> {
    match kind {
        ValueKind::InfixOp { lhs, rhs, .. } => vec![*lhs, *rhs],
        ValueKind::FunctionCall {
            callee, args, named, ..
        } => std::iter::once(*callee)
            .chain(args.iter().copied())
            .chain(named.iter().map(|n| n.value))
            .collect(),
        ValueKind::Getter { subject, .. } | ValueKind::Cast { subject, .. } => vec![*subject],
        ValueKind::ArrayLookup { subject, index } => vec![*subject, *index],
        ValueKind::ValueList(items) => items.clone(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compiler() -> Compiler {
        Compiler::new(CompilerConfig::quiet())
    }

    #[test]
    fn test_missing_entry_point() {
        let mut config = CompilerConfig::quiet();
        config.entry_point = "start".to_string();
        let result = Compiler::new(config).compile_source("main.cb", "main := fn() { };\n");
        assert!(matches!(result, Err(CompileError::Failed { errors: 1 })));
    }

    #[test]
    fn test_errors_stop_before_codegen() {
        let result = compiler().compile_source("main.cb", "main := fn() { x := y; };\n");
        assert!(matches!(result, Err(CompileError::Failed { errors: 1 })));
    }

    #[test]
    fn test_reachable_functions() {
        let source = "\
            helper := fn(a: int) -> int { return a + 1; };\n\
            unused := fn() { };\n\
            id := fn(x: $T) -> T { return x; };\n\
            main := fn() { b := helper(2); c := id(3); };\n";
        let input = compiler().compile_source("main.cb", source).unwrap();

        assert_eq!(input.functions.len(), 3);
        assert_eq!(input.functions[0], input.entry);

        let helper = input.unit.declared_in(input.root, "helper").unwrap();
        let Some(ConstValue::Function(helper)) = input.unit.ident(helper).value else {
            panic!("helper is not a function constant");
        };
        assert!(input.functions.contains(&helper));

        let unused = input.unit.declared_in(input.root, "unused").unwrap();
        let Some(ConstValue::Function(unused)) = input.unit.ident(unused).value else {
            panic!("unused is not a function constant");
        };
        assert!(!input.functions.contains(&unused));
    }

    #[test]
    fn test_precedence_mode_is_configurable() {
        let config = CompilerConfig {
            infix: InfixMode::PrecedenceClimbing,
            ..CompilerConfig::quiet()
        };
        let analysis = Compiler::new(config)
            .analyze_source("main.cb", "v := 1 + 2 * 3 == 7;\n")
            .unwrap();

        assert_eq!(analysis.error_messages(), Vec::<String>::new());
        let v = analysis.ident("v").unwrap();
        assert_eq!(analysis.unit.ident(v).ty, Some(analysis.session.types.builtins().bool));
    }

    #[test]
    fn test_error_ceiling_aborts_compilation() {
        let config = CompilerConfig {
            max_errors: 2,
            ..CompilerConfig::quiet()
        };
        let result = Compiler::new(config).compile_source(
            "main.cb",
            "a := x;\nb := y;\nc := z;\nmain := fn() { };\n",
        );
        assert!(matches!(result, Err(CompileError::ErrorLimit { max: 2 })));
    }
}
