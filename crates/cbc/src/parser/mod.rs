//! Recursive-descent parser
//!
//! The parser builds arena nodes directly, declares identifiers in their
//! scopes as it meets them and leaves every lookup and type question to
//! the resolver. Grammar errors come in two strengths:
//!
//! - `Syntax`: reported by the statement reader, which skips to the next
//!   statement boundary;
//! - `Fatal`: the token stream is too broken to find that boundary, so the
//!   innermost scope gives up and skips to its closing brace.

mod cursor;
mod infix;
mod statement;
mod value;

pub use cursor::TokenCursor;
pub use infix::InfixMode;

use crate::ast::{
    CompileUnit, IdentId, ResolutionStatus, Scope, ScopeId, ScopeKind, ScopeOwner, Statement,
    StatementKind, StmtId, TokenRange, ValueId,
};
use crate::common::{CompileError, CompileResult, Diagnostic, Position};
use crate::lexer::{Token, tokenize};
use crate::session::Session;
use log::debug;
use std::rc::Rc;

/// Tokenize and parse a source file into a new global scope.
///
/// A file that was already parsed into `unit` is not read again; its
/// existing scope is returned.
pub fn parse_source(
    unit: &mut CompileUnit,
    session: &mut Session,
    name: &str,
    source: &str,
) -> CompileResult<ScopeId> {
    if let Some(scope) = unit.find_source(name).and_then(|i| unit.source(i).global) {
        return Ok(scope);
    }
    session.diagnostics.add_file(name, source);
    let tokens = match tokenize(source, name) {
        Ok(tokens) => tokens,
        Err(CompileError::Lexer { message, position }) => {
            session.report(Diagnostic::error(message, position))?;
            return Err(CompileError::Aborted);
        }
        Err(e) => return Err(e),
    };
    parse_tokens(unit, session, name, tokens)
}

/// Parse an externally produced token stream
pub fn parse_tokens(
    unit: &mut CompileUnit,
    session: &mut Session,
    name: &str,
    mut tokens: Vec<Token>,
) -> CompileResult<ScopeId> {
    if !tokens.last().is_some_and(Token::is_eof) {
        let position = tokens
            .last()
            .map_or_else(|| Position::new(name, 1, 1), |t| t.position.clone());
        tokens.push(Token::eof(position));
    }

    let file = unit.add_source(name, tokens);
    let tokens = Rc::clone(&unit.source(file).tokens);
    let start = tokens[0].position.clone();
    let parent = unit.builtin_scope();
    let scope = unit.add_scope(Scope::new(
        ScopeKind::Static,
        Some(parent),
        ScopeOwner::File(file),
        start,
    ));
    unit.source_mut(file).global = Some(scope);

    let mut parser = Parser::new(unit, session, file, tokens, false);
    parser.parse_global(scope)?;
    debug!(
        "parsed {}: {} top-level statements",
        name,
        unit.scope(scope).statements.len()
    );
    Ok(scope)
}

/// Re-read a generic function's tokens as a concrete function declared in
/// `scope`, where the generic's type parameters are bound.
///
/// Grammar errors are reported here; the caller only sees `Aborted`.
pub fn parse_specialization(
    unit: &mut CompileUnit,
    session: &mut Session,
    tokens: TokenRange,
    scope: ScopeId,
) -> CompileResult<ValueId> {
    let source = Rc::clone(&unit.source(tokens.file).tokens);
    let mut parser = Parser::new(unit, session, tokens.file, source, true);
    parser.cursor.seek(tokens.start);

    match parser.parse_function_value(scope) {
        Ok(value) => Ok(value),
        Err(CompileError::Syntax(diag) | CompileError::Fatal(diag)) => {
            parser.fail_declared(0);
            parser.report(*diag)?;
            Err(CompileError::Aborted)
        }
        Err(e) => {
            parser.fail_declared(0);
            Err(e)
        }
    }
}

/// Parser over one source file
pub struct Parser<'a> {
    cursor: TokenCursor,
    unit: &'a mut CompileUnit,
    session: &'a mut Session,
    file: usize,
    /// Re-reading a generic body: `$T` is read as a plain `T`
    specializing: bool,
    /// Identifiers declared by the statements being parsed
    declared: Vec<IdentId>,
    /// Statement nesting depth
    depth: usize,
    /// End token of the current statement, found by `examine`
    statement_end: Option<usize>,
    /// `$` names met while reading function inputs
    deciding: Option<Vec<String>>,
}

impl<'a> Parser<'a> {
    fn new(
        unit: &'a mut CompileUnit,
        session: &'a mut Session,
        file: usize,
        tokens: Rc<[Token]>,
        specializing: bool,
    ) -> Self {
        Self {
            cursor: TokenCursor::new(tokens),
            unit,
            session,
            file,
            specializing,
            declared: Vec::new(),
            depth: 0,
            statement_end: None,
            deciding: None,
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) -> CompileResult<()> {
        self.session.report(diagnostic)
    }

    // ==================== Scopes ====================

    fn parse_global(&mut self, scope: ScopeId) -> CompileResult<()> {
        match self.parse_statements(scope, true) {
            Ok(()) => Ok(()),
            Err(CompileError::Fatal(diag)) => {
                self.report(*diag)?;
                self.unit.scope_mut(scope).aborted = true;
                Ok(())
            }
            Err(CompileError::Aborted) => {
                self.unit.scope_mut(scope).aborted = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Read statements up to the scope's closing brace (consumed) or, for a
    /// global scope, the end of the file.
    fn parse_statements(&mut self, scope: ScopeId, global: bool) -> CompileResult<()> {
        loop {
            let token = self.cursor.peek().clone();
            if token.is_eof() {
                if global {
                    return Ok(());
                }
                let start = self.unit.scope(scope).start.clone();
                return Err(CompileError::fatal(
                    "Missing '}' at end of scope: found unexpected end of file",
                    token.position,
                )
                .with_note("In scope that started here:", start));
            }
            if token.is_symbol("}") {
                self.cursor.advance();
                if global {
                    self.report(Diagnostic::error(
                        "Extra token after statements in global scope",
                        token.position,
                    ))?;
                    continue;
                }
                return Ok(());
            }
            if token.is_symbol(";") {
                self.cursor.advance();
                self.report(Diagnostic::warning("Additional ';' found", token.position))?;
                continue;
            }
            self.parse_statement_recovering(scope)?;
        }
    }

    /// Consume `{` and create the scope it opens. Returns the scope and the
    /// index of the brace.
    fn open_block(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        owner: ScopeOwner,
    ) -> CompileResult<(ScopeId, usize)> {
        let open = self.cursor.index();
        let brace = self.cursor.expect_symbol("{", "Expected \"{\"")?;
        let scope = self
            .unit
            .add_scope(Scope::new(kind, Some(parent), owner, brace.position));
        Ok((scope, open))
    }

    /// Body of a scope opened at `open`. A fatal error inside is reported
    /// here; the parse resumes after the matching brace and the caller
    /// receives `Aborted`.
    fn parse_scope_body(&mut self, scope: ScopeId, open: usize) -> CompileResult<()> {
        match self.parse_statements(scope, false) {
            Ok(()) => Ok(()),
            Err(CompileError::Fatal(diag)) => {
                self.report(*diag)?;
                self.unit.scope_mut(scope).aborted = true;
                let resume = self
                    .cursor
                    .matching_brace(open)
                    .map_or(usize::MAX, |close| close + 1);
                self.cursor.seek(resume);
                Err(CompileError::Aborted)
            }
            Err(e) => Err(e),
        }
    }

    fn parse_block(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        owner: ScopeOwner,
    ) -> CompileResult<ScopeId> {
        let (scope, open) = self.open_block(parent, kind, owner)?;
        self.parse_scope_body(scope, open)?;
        Ok(scope)
    }

    // ==================== Statement recovery ====================

    fn parse_statement_recovering(&mut self, scope: ScopeId) -> CompileResult<()> {
        let start = self.cursor.index();
        let mark = self.declared.len();
        let outer_end = self.statement_end.take();

        self.depth += 1;
        let result = self.parse_statement(scope);
        self.depth -= 1;

        let end = std::mem::replace(&mut self.statement_end, outer_end);
        match result {
            Ok(stmt) => {
                if self.unit.stmt(stmt).deferred {
                    self.unit.scope_mut(scope).defers.push(stmt);
                } else {
                    self.unit.scope_mut(scope).statements.push(stmt);
                }
                if self.depth == 0 {
                    self.declared.clear();
                }
                Ok(())
            }
            Err(CompileError::Syntax(diag)) => {
                self.fail_declared(mark);
                self.report(*diag)?;
                self.record_malformed(scope, start, ResolutionStatus::SyntaxError);
                self.recover(start, end);
                Ok(())
            }
            Err(CompileError::Aborted) => {
                self.fail_declared(mark);
                self.record_malformed(scope, start, ResolutionStatus::FatalError);
                self.recover(start, end);
                Ok(())
            }
            Err(e) => {
                self.fail_declared(mark);
                Err(e)
            }
        }
    }

    /// Keep a statement that failed to parse in its scope, already terminal
    fn record_malformed(&mut self, scope: ScopeId, start: usize, status: ResolutionStatus) {
        let position = self.cursor.at(start).position.clone();
        let stmt = self.add_statement(StatementKind::Malformed, position, scope);
        self.unit.stmt_mut(stmt).status = status;
        self.unit.scope_mut(scope).statements.push(stmt);
    }

    /// Mark identifiers declared since `mark` as failed
    fn fail_declared(&mut self, mark: usize) {
        for ident in self.declared.drain(mark..) {
            self.unit.ident_mut(ident).failed = true;
        }
    }

    /// Skip the rest of a broken statement.
    ///
    /// Statements read through `examine` resume after their `;` (or at the
    /// `}` that ended them). Keyword statements skip their first braced body
    /// and any `elsif`/`else`/`then` bodies after it.
    fn recover(&mut self, start: usize, end: Option<usize>) {
        if let Some(end) = end {
            let resume = if self.cursor.at(end).is_symbol(";") {
                end + 1
            } else {
                end
            };
            self.cursor.seek(resume.max(start + 1));
            return;
        }

        let mut index = start;
        loop {
            let token = self.cursor.at(index);
            if token.is_eof() || (token.is_symbol("}") && index > start) {
                break;
            }
            if token.is_symbol(";") {
                index += 1;
                break;
            }
            if token.is_symbol("{") {
                index = self.skip_braced(index);
                while ["elsif", "else", "then"]
                    .iter()
                    .any(|k| self.cursor.at(index).is_keyword(k))
                {
                    let mut next = index + 1;
                    while !self.cursor.at(next).is_symbol("{") && !self.cursor.at(next).is_eof() {
                        next += 1;
                    }
                    if self.cursor.at(next).is_eof() {
                        index = next;
                        break;
                    }
                    index = self.skip_braced(next);
                }
                break;
            }
            index += 1;
        }
        self.cursor.seek(index);
    }

    fn skip_braced(&self, open: usize) -> usize {
        self.cursor
            .matching_brace(open)
            .map_or(usize::MAX, |close| close + 1)
    }

    // ==================== Helpers ====================

    /// Declare `name` in `scope`; a duplicate is a syntax error
    fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        position: Position,
    ) -> CompileResult<IdentId> {
        let ident = crate::sema::declare(self.unit, scope, name, position)
            .map_err(CompileError::Syntax)?;
        self.declared.push(ident);
        Ok(ident)
    }

    fn add_statement(&mut self, kind: StatementKind, position: Position, scope: ScopeId) -> StmtId {
        self.unit.add_stmt(Statement::new(kind, position, scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstPrinter, ValueKind};
    use crate::driver::CompilerConfig;
    use crate::types::TypeDescriptor;
    use pretty_assertions::assert_eq;

    struct Parsed {
        unit: CompileUnit,
        session: Session,
        scope: ScopeId,
    }

    impl Parsed {
        fn errors(&self) -> Vec<&str> {
            self.session.diagnostics.error_messages()
        }

        /// First value of the `index`-th top-level declaration
        fn declared_value(&self, index: usize) -> ValueId {
            let stmt = self.unit.scope(self.scope).statements[index];
            match &self.unit.stmt(stmt).kind {
                StatementKind::Declaration { values, .. } => values[0],
                other => panic!("expected declaration, found {}", other.describe()),
            }
        }

        fn statuses(&self) -> Vec<ResolutionStatus> {
            self.unit
                .scope(self.scope)
                .statements
                .iter()
                .map(|stmt| self.unit.stmt(*stmt).status)
                .collect()
        }

        fn render(&self, value: ValueId) -> String {
            AstPrinter::new(&self.unit, &self.session.types).value(value)
        }
    }

    fn parse_with(source: &str, infix: InfixMode) -> Parsed {
        let config = CompilerConfig {
            infix,
            ..CompilerConfig::quiet()
        };
        let mut session = Session::new(&config);
        let mut unit = CompileUnit::new(&session.types);
        let scope = parse_source(&mut unit, &mut session, "test.cb", source).unwrap();
        Parsed {
            unit,
            session,
            scope,
        }
    }

    fn parse(source: &str) -> Parsed {
        parse_with(source, InfixMode::default())
    }

    #[test]
    fn test_two_token_lookahead_grouping() {
        let parsed = parse("x := a * b + c * d;\ny := a + b * c;");
        assert!(parsed.errors().is_empty());
        assert_eq!(parsed.render(parsed.declared_value(0)), "(((a * b) + c) * d)");
        assert_eq!(parsed.render(parsed.declared_value(1)), "(a + (b * c))");
    }

    #[test]
    fn test_precedence_climbing_grouping() {
        let parsed = parse_with("x := a * b + c * d;", InfixMode::PrecedenceClimbing);
        assert_eq!(parsed.render(parsed.declared_value(0)), "((a * b) + (c * d))");
    }

    #[test]
    fn test_call_chain() {
        let parsed = parse("x := f(1, b = 2).m[0];");
        assert!(parsed.errors().is_empty());
        assert_eq!(parsed.render(parsed.declared_value(0)), "f(1, b = 2).m[0]");
    }

    #[test]
    fn test_named_argument_order() {
        let parsed = parse("x := f(a = 1, 2);\ny := g(a = 1, a = 2);");
        assert_eq!(
            parsed.errors(),
            vec![
                "Unnamed arguments not allowed after named arguments in function call.",
                "The same argument cannot be named more than once in a function call.",
            ]
        );
    }

    #[test]
    fn test_function_definition() {
        let parsed = parse("main := fn() {\n    x := 1;\n    return;\n};");
        assert!(parsed.errors().is_empty());

        let function = parsed.unit.function(parsed.declared_value(0)).unwrap();
        let body = function.body.unwrap();
        assert_eq!(parsed.unit.scope(body).statements.len(), 2);
        assert!(parsed.unit.scope(body).is_dynamic());
        assert!(parsed.unit.declared_in(body, "x").is_some());
    }

    #[test]
    fn test_parameters_declared_in_body() {
        let parsed = parse("f := fn(a: int, b: int = 2) -> (q: int, int) { };");
        assert!(parsed.errors().is_empty());

        let function = parsed.unit.function(parsed.declared_value(0)).unwrap();
        let body = function.body.unwrap();
        let names: Vec<&str> = parsed
            .unit
            .scope(body)
            .declared
            .iter()
            .map(|id| parsed.unit.ident(*id).name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "q", "__retv_1"]);
        assert!(function.inputs[1].default.is_some());
    }

    #[test]
    fn test_function_type_rejects_body() {
        let parsed = parse("g := fn(int) -> int { };\nh : fn(int, int) -> int;");
        assert_eq!(
            parsed.errors(),
            vec!["Function body not allowed after declaration"]
        );
        assert_eq!(
            parsed.statuses(),
            vec![ResolutionStatus::SyntaxError, ResolutionStatus::PartiallyParsed]
        );
    }

    #[test]
    fn test_generic_body_kept_as_tokens() {
        let parsed = parse("id := fn(x: $T) -> T { return x; };");
        assert!(parsed.errors().is_empty());

        let function = parsed.unit.function(parsed.declared_value(0)).unwrap();
        let generic = function.generic.as_ref().unwrap();
        assert_eq!(generic.params, vec!["T".to_string()]);
        assert_eq!(generic.tokens.start, 3);
        assert!(function.body.is_none());
    }

    #[test]
    fn test_generic_output_rejected() {
        let parsed = parse("f := fn(x: int) -> $T { return x; };");
        assert_eq!(
            parsed.errors(),
            vec!["Generic type \"$T\" is only allowed in function inputs"]
        );
        let f = parsed.unit.declared_in(parsed.scope, "f").unwrap();
        assert!(parsed.unit.ident(f).failed);
    }

    #[test]
    fn test_namespace_and_struct_values() {
        let parsed = parse("ns := { x := 1; };\nP := struct { a, b : int, float; c : int = 3; };");
        assert!(parsed.errors().is_empty());

        let ns = parsed.declared_value(0);
        let ValueKind::Scope(inner) = parsed.unit.value(ns).kind else {
            panic!("expected scope value");
        };
        assert!(parsed.unit.declared_in(inner, "x").is_some());
        assert_eq!(
            parsed.unit.value(ns).ty,
            Some(parsed.session.types.builtins().scope)
        );

        let ValueKind::TypeDescriptor { syntax, .. } =
            parsed.unit.value(parsed.declared_value(1)).kind
        else {
            panic!("expected type value");
        };
        let TypeDescriptor::Struct { members, .. } = parsed.session.types.get(syntax) else {
            panic!("expected struct type");
        };
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(members[2].default.is_some());
    }

    #[test]
    fn test_dynamic_statements_rejected_in_static_scope() {
        let parsed = parse("return 1;\nx := 2;\nx = 3;");
        assert_eq!(
            parsed.errors(),
            vec![
                "Return statements only allowed in dynamic scopes!",
                "Dynamic statement not allowed in static scope!",
            ]
        );
        assert_eq!(
            parsed.statuses(),
            vec![
                ResolutionStatus::SyntaxError,
                ResolutionStatus::PartiallyParsed,
                ResolutionStatus::SyntaxError,
            ]
        );
    }

    #[test]
    fn test_missing_semicolon_before_brace_recovers() {
        let parsed = parse("f := fn() { a := 1 };\nb := 2;");
        assert_eq!(parsed.errors(), vec!["Missing \";\" after statement"]);
        assert_eq!(parsed.unit.scope(parsed.scope).statements.len(), 2);
    }

    #[test]
    fn test_duplicate_declaration_cites_first() {
        let parsed = parse("a := 1;\na := 2;");
        assert_eq!(
            parsed.errors(),
            vec!["Multiple declarations of identifier \"a\""]
        );
        let diagnostic = &parsed.session.diagnostics.diagnostics()[0];
        assert_eq!(diagnostic.position.line, 2);
        assert_eq!(diagnostic.notes[0].message, "Previously declared here");
        assert_eq!(diagnostic.notes[0].position.as_ref().unwrap().line, 1);
    }

    #[test]
    fn test_mismatched_paren_aborts_scope() {
        let parsed = parse("a := (1 ];\nb := 2;");
        assert_eq!(
            parsed.errors(),
            vec!["Mismatched paren: expected \")\" before \"]\""]
        );
        assert!(parsed.unit.scope(parsed.scope).aborted);
    }

    #[test]
    fn test_stray_tokens_in_global_scope() {
        let parsed = parse("; }");
        assert_eq!(
            parsed.errors(),
            vec!["Extra token after statements in global scope"]
        );
        assert_eq!(parsed.session.diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_for_loop_declares_iterator() {
        let parsed = parse("f := fn() { for i in 0..10 by 2 { } for 3 { } };");
        assert!(parsed.errors().is_empty());

        let body = parsed.unit.function(parsed.declared_value(0)).unwrap().body.unwrap();
        let loops = &parsed.unit.scope(body).statements;
        let names: Vec<&str> = loops
            .iter()
            .map(|stmt| match &parsed.unit.stmt(*stmt).kind {
                StatementKind::For { iterator, .. } => parsed.unit.ident(*iterator).name.as_str(),
                other => panic!("expected for loop, found {}", other.describe()),
            })
            .collect();
        assert_eq!(names, vec!["i", "it"]);
    }

    #[test]
    fn test_negative_literal_is_typed() {
        let parsed = parse("x := -4;");
        let value = parsed.unit.value(parsed.declared_value(0));
        assert!(matches!(&value.kind, ValueKind::Literal { text, .. } if text == "-4"));
        assert_eq!(value.ty, Some(parsed.session.types.builtins().int));
    }

    #[test]
    fn test_source_parsed_once() {
        let mut parsed = parse("x := 1;");
        let again =
            parse_source(&mut parsed.unit, &mut parsed.session, "test.cb", "y := 2;").unwrap();
        assert_eq!(again, parsed.scope);
        assert!(parsed.unit.declared_in(again, "y").is_none());
        assert_eq!(parsed.unit.sources().len(), 1);
    }

    #[test]
    fn test_defer_statements_kept_apart() {
        let parsed = parse(
            "f := fn() {\n    a := 1;\n    defer a = 2;\n    defer a = 3;\n    b := a;\n};",
        );
        assert!(parsed.errors().is_empty());

        let body = parsed.unit.function(parsed.declared_value(0)).unwrap().body.unwrap();
        let scope = parsed.unit.scope(body);
        assert_eq!(scope.statements.len(), 2);
        let lines: Vec<u32> = scope
            .defers
            .iter()
            .map(|stmt| {
                assert!(parsed.unit.stmt(*stmt).deferred);
                parsed.unit.stmt(*stmt).position.line
            })
            .collect();
        assert_eq!(lines, vec![3, 4]);

        let parsed = parse("defer x := 1;");
        assert_eq!(
            parsed.errors(),
            vec!["Defer statements only allowed in dynamic scopes!"]
        );
    }

    #[test]
    fn test_fatal_error_marks_enclosing_statement() {
        let parsed = parse("f := fn() { a := (1 ]; };\ng := 2;");
        assert_eq!(
            parsed.errors(),
            vec!["Mismatched paren: expected \")\" before \"]\""]
        );
        assert_eq!(
            parsed.statuses(),
            vec![ResolutionStatus::FatalError, ResolutionStatus::PartiallyParsed]
        );
    }
}
