//! `using` statements: importing scopes and files

use super::{Dependency, Resolution, Resolver, ready};
use crate::ast::{ConstValue, ScopeId, ValueId};
use crate::common::{CompileError, CompileResult, Position};
use crate::parser;
use log::debug;

impl Resolver<'_> {
    /// Attempt the `using`s of `scope` until none of them changes anything.
    ///
    /// A settled `using` can bring in names another `using` of the same
    /// scope was waiting for, so one sweep is not enough.
    pub(super) fn resolve_imports(&mut self, scope: ScopeId) -> CompileResult<()> {
        loop {
            let usings = self.unit.scope(scope).usings.clone();
            let mut changed = false;
            for using in usings {
                changed |= self.attempt(using)?;
            }
            if !changed {
                return Ok(());
            }
        }
    }

    /// Import the scope or file a `using` names into `scope`
    pub(super) fn resolve_using(
        &mut self,
        scope: ScopeId,
        subject: ValueId,
        position: Position,
    ) -> CompileResult<Resolution<()>> {
        let eager = std::mem::replace(&mut self.eager_lookups, true);
        let ty = self.type_of(subject);
        self.eager_lookups = eager;
        let ty = ready!(ty?);
        let Some(constant) = self.const_value(subject) else {
            return self.error("Using statement requires a constant value", position);
        };

        let builtins = *self.session.types.builtins();
        let imported = match constant {
            ConstValue::Scope(imported) if ty == builtins.scope => imported,
            ConstValue::Str(path) if ty == builtins.string => {
                ready!(self.import_file(&path, position)?)
            }
            _ => {
                return self.error(
                    format!(
                        "Mismatched type in using statement: expected either scope or string type, but found type {}",
                        self.display(ty)
                    ),
                    position,
                );
            }
        };

        if imported != scope && !self.unit.scope(scope).imports.contains(&imported) {
            self.unit.scope_mut(scope).imports.push(imported);
            self.progress = true;
            self.deps.satisfy(Dependency::Imports(scope));
            debug!("scope {} imports scope {}", scope.index(), imported.index());
        }
        Ok(Resolution::Resolved(()))
    }

    /// Global scope of a source file, parsing it on first use
    fn import_file(
        &mut self,
        path: &str,
        position: Position,
    ) -> CompileResult<Resolution<ScopeId>> {
        if let Some(global) = self
            .unit
            .find_source(path)
            .and_then(|file| self.unit.source(file).global)
        {
            return Ok(Resolution::Resolved(global));
        }

        let source = match self.loader.load(path) {
            Ok(source) => source,
            Err(err) => {
                return self.error(format!("Unable to open file \"{}\": {}", path, err), position);
            }
        };
        debug!("loading {}", path);
        match parser::parse_source(self.unit, self.session, path, &source) {
            Ok(global) => {
                self.progress = true;
                Ok(Resolution::Resolved(global))
            }
            Err(CompileError::Aborted) => Ok(Resolution::Failed),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::{Compiler, CompilerConfig, MemoryLoader};
    use pretty_assertions::assert_eq;

    fn compiler(loader: MemoryLoader) -> Compiler {
        Compiler::new(CompilerConfig::quiet()).with_loader(Box::new(loader))
    }

    #[test]
    fn test_using_namespace_brings_names_in() {
        let analysis = compiler(MemoryLoader::new())
            .analyze_source(
                "main.cb",
                "ns := { x := 1; };\nusing ns;\ny := x;\n",
            )
            .unwrap();

        assert_eq!(analysis.error_messages(), Vec::<String>::new());
        let y = analysis.ident("y").unwrap();
        assert_eq!(analysis.unit.ident(y).ty, Some(analysis.session.types.builtins().int));
    }

    #[test]
    fn test_using_file_is_loaded_once() {
        let loader = MemoryLoader::new()
            .with_file("lib.cb", "answer := 42;\n")
            .with_file("other.cb", "using \"lib.cb\";\nagain := answer;\n");
        let analysis = compiler(loader)
            .analyze_source(
                "main.cb",
                "using \"lib.cb\";\nusing \"other.cb\";\nz := answer;\n",
            )
            .unwrap();

        assert_eq!(analysis.error_messages(), Vec::<String>::new());
        let loaded: Vec<&str> = analysis.unit.sources().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(loaded, vec!["main.cb", "lib.cb", "other.cb"]);
    }

    #[test]
    fn test_imports_are_not_transitive() {
        let loader = MemoryLoader::new()
            .with_file("inner.cb", "hidden := 1;\n")
            .with_file("outer.cb", "using \"inner.cb\";\nshown := hidden;\n");
        let analysis = compiler(loader)
            .analyze_source("main.cb", "using \"outer.cb\";\na := shown;\nb := hidden;\n")
            .unwrap();

        assert_eq!(
            analysis.error_messages(),
            vec!["Identifier \"hidden\" could not be found".to_string()]
        );
        assert!(analysis.unit.ident(analysis.ident("a").unwrap()).ty.is_some());
    }

    #[test]
    fn test_using_through_another_using() {
        // The second using can only be decided after the first one
        let analysis = compiler(MemoryLoader::new())
            .analyze_source(
                "main.cb",
                "using inner;\nusing outer;\nouter := { inner := { v := 2; }; };\nw := v;\n",
            )
            .unwrap();

        assert_eq!(analysis.error_messages(), Vec::<String>::new());
    }

    #[test]
    fn test_missing_file() {
        let analysis = compiler(MemoryLoader::new())
            .analyze_source("main.cb", "using \"nope.cb\";\n")
            .unwrap();

        let messages = analysis.error_messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Unable to open file \"nope.cb\""));
    }

    #[test]
    fn test_using_wrong_type() {
        let analysis = compiler(MemoryLoader::new())
            .analyze_source("main.cb", "n := 3;\nusing n;\n")
            .unwrap();

        assert_eq!(
            analysis.error_messages(),
            vec![
                "Mismatched type in using statement: expected either scope or string type, but found type int"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_using_unknown_name() {
        let analysis = compiler(MemoryLoader::new())
            .analyze_source("main.cb", "using x;\n")
            .unwrap();

        assert_eq!(
            analysis.error_messages(),
            vec!["Identifier \"x\" could not be found".to_string()]
        );
    }

    fn ambiguity(loader: MemoryLoader, source: &str) -> Vec<String> {
        compiler(loader)
            .analyze_source("main.cb", source)
            .unwrap()
            .error_messages()
    }

    #[test]
    fn test_ambiguity_through_a_late_using() {
        let expected = vec!["Ambiguous reference to identifier \"x\"".to_string()];

        // `r` is only known to be a scope after two more declarations
        assert_eq!(
            ambiguity(
                MemoryLoader::new(),
                "l := { x := 1; };\nusing l;\nusing r;\ny := x;\nr := r2;\nr2 := { x := 2; };\n",
            ),
            expected
        );
        assert_eq!(
            ambiguity(
                MemoryLoader::new(),
                "x := 1;\nns := { x := 2; };\ninner := { using ns; a := x; };\n",
            ),
            expected
        );
        assert_eq!(
            ambiguity(
                MemoryLoader::new().with_file("lib.cb", "x := 2;\n"),
                "x := 1;\ninner := { using \"lib.cb\"; a := x; };\n",
            ),
            expected
        );
    }

    #[test]
    fn test_parent_binding_kept_when_import_lacks_name() {
        let analysis = compiler(MemoryLoader::new())
            .analyze_source(
                "main.cb",
                "x := 1.5;\nns := { y := 2; };\ninner := { using ns; a := x; b := y; };\n",
            )
            .unwrap();

        assert_eq!(analysis.error_messages(), Vec::<String>::new());
    }
}
