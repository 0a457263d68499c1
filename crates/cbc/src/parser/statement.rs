//! Statement parsing

use super::Parser;
use crate::ast::{
    AssignOp, IfBranch, InfixOp, NamedArg, ScopeId, ScopeKind, ScopeOwner, StatementKind, StmtId,
    ValueKind,
};
use crate::common::{CompileError, CompileResult, Diagnostic, Position};
use crate::lexer::TokenKind;

/// Shape of an examined statement
#[derive(Debug, Clone, Copy)]
struct Examination {
    /// Index of the terminating `;`
    end: usize,
    /// Type separator `:`
    colon: Option<usize>,
    /// Assignment operator
    assign: Option<usize>,
}

impl Parser<'_> {
    pub(super) fn parse_statement(&mut self, scope: ScopeId) -> CompileResult<StmtId> {
        let token = self.cursor.peek().clone();
        let dynamic = self.unit.scope(scope).is_dynamic();

        if token.kind == TokenKind::Keyword {
            let restricted = match token.lexeme.as_str() {
                "return" => Some("Return statements"),
                "if" => Some("If clause"),
                "for" => Some("For loops"),
                "while" => Some("While loops"),
                "defer" => Some("Defer statements"),
                _ => None,
            };
            if let Some(what) = restricted {
                if !dynamic {
                    return Err(CompileError::syntax(
                        format!("{} only allowed in dynamic scopes!", what),
                        token.position,
                    ));
                }
            }
            match token.lexeme.as_str() {
                "using" => return self.parse_using(scope),
                "operator" => return self.parse_operator(scope),
                "return" => return self.parse_return(scope),
                "if" => return self.parse_if(scope),
                "while" => return self.parse_while(scope),
                "for" => return self.parse_for(scope),
                "defer" => return self.parse_defer(scope),
                _ => {}
            }
        }

        if token.is_symbol("{") {
            if !dynamic {
                return Err(dynamic_in_static(token.position));
            }
            let body = self.parse_block(scope, ScopeKind::Dynamic, ScopeOwner::Block)?;
            return Ok(self.add_statement(StatementKind::Block(body), token.position, scope));
        }

        let exam = self.examine()?;
        if exam.colon.is_some() {
            return self.parse_declaration(scope, exam);
        }
        if !dynamic {
            return Err(dynamic_in_static(token.position));
        }
        match exam.assign {
            Some(assign) => self.parse_assignment(scope, exam, assign),
            None => self.parse_value_statement(scope, exam),
        }
    }

    /// Scan ahead to the statement's `;`, checking bracket nesting and
    /// locating the top-level `:` and assignment operator.
    fn examine(&mut self) -> CompileResult<Examination> {
        let mut index = self.cursor.index();
        let mut parens: Vec<usize> = Vec::new();
        let mut colon = None;
        let mut assign: Option<usize> = None;
        let mut problems: Vec<(String, Position)> = Vec::new();

        loop {
            let token = self.cursor.at(index).clone();
            if token.is_eof() {
                return Err(CompileError::fatal("Missing \";\" after statement", token.position));
            }
            if token.kind != TokenKind::Symbol {
                index += 1;
                continue;
            }
            match token.lexeme.as_str() {
                "(" | "[" => parens.push(index),
                ")" | "]" => {
                    let Some(open) = parens.pop() else {
                        return Err(CompileError::fatal(
                            format!("Unexpected \"{}\" without opening paren", token.lexeme),
                            token.position,
                        ));
                    };
                    let expected = closing_paren(&self.cursor.at(open).lexeme);
                    if token.lexeme != expected {
                        return Err(self.mismatched_paren(open, &token.lexeme, token.position));
                    }
                }
                "{" => match self.cursor.matching_brace(index) {
                    Some(close) => {
                        index = close + 1;
                        continue;
                    }
                    None => {
                        let eof = self.cursor.at(usize::MAX).position.clone();
                        return Err(CompileError::fatal(
                            "Missing '}' at end of scope: found unexpected end of file",
                            eof,
                        )
                        .with_note("In scope that started here:", token.position));
                    }
                },
                "}" | ";" => {
                    if let Some(open) = parens.last() {
                        return Err(self.mismatched_paren(*open, &token.lexeme, token.position));
                    }
                    if token.lexeme == "}" {
                        self.statement_end = Some(index);
                        return Err(CompileError::syntax(
                            "Missing \";\" after statement",
                            token.position,
                        )
                        .with_plain_note("Expected \";\" before \"}\""));
                    }
                    break;
                }
                ":" if parens.is_empty() => {
                    if colon.is_some() {
                        problems.push((
                            "Multiple \":\" operators in statement".to_string(),
                            token.position,
                        ));
                    } else if assign.is_some() {
                        problems.push((
                            "Unexpected \":\" operator found after assignment.".to_string(),
                            token.position,
                        ));
                    } else {
                        colon = Some(index);
                    }
                }
                symbol if parens.is_empty() && AssignOp::from_symbol(symbol).is_some() => {
                    if assign.is_some() {
                        problems.push((
                            "Multiple assignment operators in statement".to_string(),
                            token.position,
                        ));
                    } else {
                        if colon.is_some() && symbol != "=" {
                            problems.push((
                                format!("Unexpected assignment token: \"{}\"", symbol),
                                token.position.clone(),
                            ));
                        }
                        assign = Some(index);
                    }
                }
                _ => {}
            }
            index += 1;
        }

        self.statement_end = Some(index);
        if let Some((message, position)) = problems.pop() {
            for (message, position) in problems {
                self.report(Diagnostic::error(message, position))?;
            }
            return Err(CompileError::syntax(message, position));
        }
        Ok(Examination { end: index, colon, assign })
    }

    fn mismatched_paren(&self, open: usize, found: &str, position: Position) -> CompileError {
        let open = self.cursor.at(open);
        CompileError::fatal(
            format!(
                "Mismatched paren: expected \"{}\" before \"{}\"",
                closing_paren(&open.lexeme),
                found
            ),
            position,
        )
        .with_note("In paren that started here", open.position.clone())
    }

    /// Cursor must sit on the examined `;`; consumes it
    fn expect_statement_end(&mut self, end: usize) -> CompileResult<()> {
        if self.cursor.index() != end {
            let token = self.cursor.peek();
            return Err(CompileError::syntax(
                format!("Unexpected token \"{}\": expected \";\"", token),
                token.position.clone(),
            ));
        }
        self.cursor.advance();
        Ok(())
    }

    // ==================== Declarations and assignments ====================

    fn parse_declaration(&mut self, scope: ScopeId, exam: Examination) -> CompileResult<StmtId> {
        let position = self.cursor.position();

        let mut groups = Vec::new();
        loop {
            let mut group = Vec::new();
            if self.cursor.match_symbol("(") {
                loop {
                    let name = self.cursor.expect_identifier("Expected identifier in declaration")?;
                    group.push(self.declare(scope, &name.lexeme, name.position)?);
                    if !self.cursor.match_symbol("=") {
                        break;
                    }
                }
                self.cursor.expect_symbol(
                    ")",
                    "Expected \")\" after identifier group in declaration",
                )?;
            } else {
                let name = self.cursor.expect_identifier("Expected identifier in declaration")?;
                group.push(self.declare(scope, &name.lexeme, name.position)?);
            }
            groups.push(group);
            if !self.cursor.match_symbol(",") {
                break;
            }
        }
        self.cursor.expect_symbol(":", "Expected \":\" in declaration")?;

        let mut types = Vec::new();
        if !self.cursor.check_symbol("=") {
            if self.cursor.index() == exam.end {
                return Err(CompileError::syntax(
                    "Missing type(s) in declaration",
                    self.cursor.position(),
                ));
            }
            loop {
                types.push(self.parse_type(scope)?);
                if !self.cursor.match_symbol(",") {
                    break;
                }
            }
            if types.len() != groups.len() {
                let found = if types.len() < groups.len() {
                    format!("only {}", types.len())
                } else {
                    types.len().to_string()
                };
                return Err(CompileError::syntax(
                    format!(
                        "Type count mismatch in declaration: expected {} types but found {}",
                        groups.len(),
                        found
                    ),
                    position,
                ));
            }
        }

        let mut values = Vec::new();
        if self.cursor.match_symbol("=") {
            if self.cursor.index() == exam.end {
                return Err(CompileError::syntax(
                    "Missing values after \"=\"",
                    self.cursor.position(),
                ));
            }
            values = self.parse_value_list(scope)?;
        }
        self.expect_statement_end(exam.end)?;

        let idents: Vec<_> = groups.iter().flatten().copied().collect();
        let stmt = self.add_statement(
            StatementKind::Declaration {
                groups,
                types,
                values,
            },
            position,
            scope,
        );
        for ident in idents {
            self.unit.ident_mut(ident).declared_by = Some(stmt);
        }
        Ok(stmt)
    }

    fn parse_assignment(
        &mut self,
        scope: ScopeId,
        exam: Examination,
        assign: usize,
    ) -> CompileResult<StmtId> {
        let position = self.cursor.position();
        let targets = self.parse_value_list(scope)?;
        if self.cursor.index() != assign {
            let token = self.cursor.peek();
            return Err(CompileError::syntax(
                format!("Unexpected token \"{}\" before assignment operator", token),
                token.position.clone(),
            ));
        }
        let op_token = self.cursor.advance();
        let Some(op) = AssignOp::from_symbol(&op_token.lexeme) else {
            return Err(CompileError::syntax(
                format!("Unexpected assignment token: \"{}\"", op_token.lexeme),
                op_token.position,
            ));
        };
        if self.cursor.index() == exam.end {
            return Err(CompileError::syntax(
                format!("Missing values after \"{}\"", op.symbol()),
                self.cursor.position(),
            ));
        }
        let values = self.parse_value_list(scope)?;
        self.expect_statement_end(exam.end)?;
        Ok(self.add_statement(
            StatementKind::Assignment {
                targets,
                op,
                values,
            },
            position,
            scope,
        ))
    }

    fn parse_value_statement(
        &mut self,
        scope: ScopeId,
        exam: Examination,
    ) -> CompileResult<StmtId> {
        let position = self.cursor.position();
        let value = self.parse_value(scope)?;
        if !matches!(self.unit.value(value).kind, ValueKind::FunctionCall { .. }) {
            return Err(CompileError::syntax(
                "Found something that is not a statement where a statement was expected",
                position,
            ));
        }
        self.expect_statement_end(exam.end)?;
        Ok(self.add_statement(StatementKind::Call(value), position, scope))
    }

    // ==================== Keyword statements ====================

    fn parse_using(&mut self, scope: ScopeId) -> CompileResult<StmtId> {
        let position = self.cursor.advance().position;
        let subject = self.parse_value(scope)?;
        self.cursor
            .expect_symbol(";", "Missing \";\" after statement")?;
        let stmt = self.add_statement(StatementKind::Using { subject }, position, scope);
        self.unit.scope_mut(scope).usings.push(stmt);
        Ok(stmt)
    }

    /// `operator + := fn(a: V, b: V) -> V { ... };`
    fn parse_operator(&mut self, scope: ScopeId) -> CompileResult<StmtId> {
        let position = self.cursor.advance().position;
        let symbol = self.cursor.advance();
        let op = match symbol.kind {
            TokenKind::Symbol => InfixOp::from_symbol(&symbol.lexeme),
            _ => None,
        };
        let Some(op) = op else {
            return Err(CompileError::syntax(
                format!("Expected infix operator after \"operator\", found \"{}\"", symbol),
                symbol.position,
            ));
        };
        if !(self.cursor.match_symbol(":") && self.cursor.match_symbol("=")) {
            return Err(CompileError::syntax(
                "Expected \":=\" after operator symbol",
                self.cursor.position(),
            ));
        }
        let function = self.parse_value(scope)?;
        self.cursor
            .expect_symbol(";", "Missing \";\" after statement")?;
        let stmt = self.add_statement(StatementKind::Operator { op, function }, position, scope);
        self.unit.scope_mut(scope).operator_decls.push(stmt);
        Ok(stmt)
    }

    fn parse_return(&mut self, scope: ScopeId) -> CompileResult<StmtId> {
        let position = self.cursor.advance().position;
        let mut values = Vec::new();
        let mut named: Vec<NamedArg> = Vec::new();

        if !self.cursor.check_symbol(";") {
            loop {
                if self.cursor.check_identifier() && self.cursor.peek_at(1).is_symbol("=") {
                    let name = self.cursor.advance();
                    self.cursor.advance();
                    let value = self.parse_value(scope)?;
                    named.push(NamedArg {
                        name: name.lexeme,
                        position: name.position,
                        value,
                    });
                } else {
                    if !named.is_empty() {
                        return Err(CompileError::syntax(
                            "Unnamed return values not allowed after named return values",
                            self.cursor.position(),
                        ));
                    }
                    values.push(self.parse_value(scope)?);
                }
                if !self.cursor.match_symbol(",") {
                    break;
                }
            }
        }
        self.cursor
            .expect_symbol(";", "Missing \";\" after statement")?;
        Ok(self.add_statement(StatementKind::Return { values, named }, position, scope))
    }

    fn parse_if(&mut self, scope: ScopeId) -> CompileResult<StmtId> {
        let position = self.cursor.advance().position;
        let mut branches = Vec::new();
        loop {
            let condition = self.parse_value(scope)?;
            if !self.cursor.check_symbol("{") {
                return Err(CompileError::syntax(
                    "Missing \"{\" after if condition",
                    self.cursor.position(),
                ));
            }
            let body = self.parse_block(scope, ScopeKind::Dynamic, ScopeOwner::Block)?;
            branches.push(IfBranch { condition, body });
            if !self.cursor.match_keyword("elsif") {
                break;
            }
        }
        let otherwise = self.parse_trailing_block(scope, "else")?;
        let then = self.parse_trailing_block(scope, "then")?;
        Ok(self.add_statement(
            StatementKind::If {
                branches,
                otherwise,
                then,
            },
            position,
            scope,
        ))
    }

    fn parse_trailing_block(
        &mut self,
        scope: ScopeId,
        keyword: &str,
    ) -> CompileResult<Option<ScopeId>> {
        if !self.cursor.match_keyword(keyword) {
            return Ok(None);
        }
        if !self.cursor.check_symbol("{") {
            return Err(CompileError::syntax(
                format!("Missing \"{{\" after {}", keyword),
                self.cursor.position(),
            ));
        }
        self.parse_block(scope, ScopeKind::Dynamic, ScopeOwner::Block)
            .map(Some)
    }

    fn parse_while(&mut self, scope: ScopeId) -> CompileResult<StmtId> {
        let position = self.cursor.advance().position;
        let condition = self.parse_value(scope)?;
        if !self.cursor.check_symbol("{") {
            return Err(CompileError::syntax(
                "Missing \"{\" after while condition",
                self.cursor.position(),
            ));
        }
        let body = self.parse_block(scope, ScopeKind::Dynamic, ScopeOwner::Block)?;
        Ok(self.add_statement(StatementKind::While { condition, body }, position, scope))
    }

    /// `for [name in] start [.. end] [by step] [reverse] { ... }`
    fn parse_for(&mut self, scope: ScopeId) -> CompileResult<StmtId> {
        let position = self.cursor.advance().position;
        let (name, name_position) =
            if self.cursor.check_identifier() && self.cursor.peek_at(1).is_keyword("in") {
                let name = self.cursor.advance();
                self.cursor.advance();
                (name.lexeme, name.position)
            } else {
                ("it".to_string(), position.clone())
            };

        let start = self.parse_value(scope)?;
        let end = if self.cursor.match_symbol("..") {
            Some(self.parse_value(scope)?)
        } else {
            None
        };
        let step = if self.cursor.match_keyword("by") {
            Some(self.parse_value(scope)?)
        } else {
            None
        };
        let reverse = self.cursor.match_keyword("reverse");
        if !self.cursor.check_symbol("{") {
            return Err(CompileError::syntax(
                "Missing \"{\" after for loop header",
                self.cursor.position(),
            ));
        }

        let (body, open) = self.open_block(scope, ScopeKind::Dynamic, ScopeOwner::Block)?;
        let iterator = self.declare(body, &name, name_position)?;
        self.parse_scope_body(body, open)?;
        Ok(self.add_statement(
            StatementKind::For {
                iterator,
                start,
                end,
                step,
                reverse,
                body,
            },
            position,
            scope,
        ))
    }

    fn parse_defer(&mut self, scope: ScopeId) -> CompileResult<StmtId> {
        self.cursor.advance();
        let stmt = self.parse_statement(scope)?;
        self.unit.stmt_mut(stmt).deferred = true;
        Ok(stmt)
    }
}

fn closing_paren(open: &str) -> &'static str {
    if open == "[" { "]" } else { ")" }
}

fn dynamic_in_static(position: Position) -> CompileError {
    CompileError::syntax("Dynamic statement not allowed in static scope!", position)
}
