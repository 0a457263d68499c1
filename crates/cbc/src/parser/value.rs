//! Values and types

use super::Parser;
use crate::ast::{
    Function, Generic, LiteralKind, NamedArg, Parameter, ScopeId, ScopeKind, ScopeOwner,
    TokenRange, ValueId, ValueKind, ValueNode,
};
use crate::common::{CompileError, CompileResult, Position};
use crate::lexer::{Token, TokenKind};
use crate::types::{StructMember, TypeDescriptor, TypeId, TypeTable};

/// Parameter as written, before it is known whether the `fn` is a type
/// or a definition
struct RawParam {
    name: Option<Token>,
    position: Position,
    ty: TypeId,
    default: Option<ValueId>,
}

impl Parser<'_> {
    // ==================== Values ====================

    pub(super) fn parse_value(&mut self, scope: ScopeId) -> CompileResult<ValueId> {
        let lhs = self.parse_operand(scope)?;
        self.parse_infix(scope, lhs)
    }

    pub(super) fn parse_value_list(&mut self, scope: ScopeId) -> CompileResult<Vec<ValueId>> {
        let mut values = vec![self.parse_value(scope)?];
        while self.cursor.match_symbol(",") {
            values.push(self.parse_value(scope)?);
        }
        Ok(values)
    }

    /// Primary value followed by its call chain; no infix operators
    pub(super) fn parse_operand(&mut self, scope: ScopeId) -> CompileResult<ValueId> {
        let primary = self.parse_primary(scope)?;
        self.parse_call_chain(scope, primary)
    }

    fn parse_primary(&mut self, scope: ScopeId) -> CompileResult<ValueId> {
        let token = self.cursor.peek().clone();
        match token.kind {
            TokenKind::Integer | TokenKind::Float | TokenKind::String | TokenKind::Bool => {
                self.cursor.advance();
                Ok(self.literal(scope, &token, token.lexeme.clone()))
            }
            TokenKind::Identifier => {
                self.cursor.advance();
                Ok(self.add_value(
                    ValueKind::Identifier {
                        name: token.lexeme,
                        target: None,
                    },
                    token.position,
                    scope,
                ))
            }
            TokenKind::Keyword if token.lexeme == "fn" => self.parse_function_value(scope),
            TokenKind::Keyword if token.lexeme == "struct" => {
                let syntax = self.parse_struct_type(scope)?;
                Ok(self.add_value(
                    ValueKind::TypeDescriptor {
                        syntax,
                        resolved: None,
                    },
                    token.position,
                    scope,
                ))
            }
            TokenKind::Symbol if token.lexeme == "(" => {
                self.cursor.advance();
                let mut values = self.parse_value_list(scope)?;
                self.cursor
                    .expect_symbol(")", "Missing \")\" at the end of value list")?;
                if values.len() == 1 {
                    return Ok(values.remove(0));
                }
                Ok(self.add_value(ValueKind::ValueList(values), token.position, scope))
            }
            TokenKind::Symbol if token.lexeme == "{" => {
                let namespace = self.parse_block(scope, ScopeKind::Static, ScopeOwner::Namespace)?;
                let value = self.add_value(ValueKind::Scope(namespace), token.position, scope);
                self.unit.value_mut(value).ty = Some(self.session.types.builtins().scope);
                Ok(value)
            }
            TokenKind::Symbol
                if token.lexeme == "-"
                    && matches!(
                        self.cursor.peek_at(1).kind,
                        TokenKind::Integer | TokenKind::Float
                    ) =>
            {
                self.cursor.advance();
                let number = self.cursor.advance();
                Ok(self.literal(scope, &number, format!("-{}", number.lexeme)))
            }
            TokenKind::Eof => Err(CompileError::syntax(
                "Unexpected end of file while reading value",
                token.position,
            )),
            _ => Err(CompileError::syntax(
                format!(
                    "Unexpected token while reading value: a value cannot start with the token \"{}\"",
                    token
                ),
                token.position,
            )),
        }
    }

    fn literal(&mut self, scope: ScopeId, token: &Token, text: String) -> ValueId {
        let builtins = *self.session.types.builtins();
        let (kind, ty) = match token.kind {
            TokenKind::Integer => (LiteralKind::Integer, builtins.int),
            TokenKind::Float => (LiteralKind::Float, builtins.float),
            TokenKind::String => (LiteralKind::String, builtins.string),
            _ => (LiteralKind::Bool, builtins.bool),
        };
        let value = self.add_value(
            ValueKind::Literal { kind, text },
            token.position.clone(),
            scope,
        );
        self.unit.value_mut(value).ty = Some(ty);
        value
    }

    /// Postfix forms in encounter order: call, getter, cast, lookup
    fn parse_call_chain(&mut self, scope: ScopeId, mut value: ValueId) -> CompileResult<ValueId> {
        loop {
            let token = self.cursor.peek().clone();
            if token.is_symbol("(") {
                value = self.parse_call(scope, value)?;
            } else if token.is_symbol(".") {
                self.cursor.advance();
                let member = self
                    .cursor
                    .expect_identifier("Expected data identifier after getter token \".\"")?;
                value = self.add_value(
                    ValueKind::Getter {
                        subject: value,
                        member: member.lexeme,
                        target: None,
                    },
                    member.position,
                    scope,
                );
            } else if token.is_symbol("_") {
                self.cursor.advance();
                let target = self
                    .cursor
                    .expect_identifier("Expected type identifier after cast token \"_\"")?;
                value = self.add_value(
                    ValueKind::Cast {
                        subject: value,
                        target: target.lexeme,
                    },
                    token.position,
                    scope,
                );
            } else if token.is_symbol("[") {
                self.cursor.advance();
                let index = self.parse_value(scope)?;
                self.cursor
                    .expect_symbol("]", "Missing \"]\" at the end of array lookup")?;
                value = self.add_value(
                    ValueKind::ArrayLookup {
                        subject: value,
                        index,
                    },
                    token.position,
                    scope,
                );
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_call(&mut self, scope: ScopeId, callee: ValueId) -> CompileResult<ValueId> {
        let open = self.cursor.advance();
        let mut args = Vec::new();
        let mut named: Vec<NamedArg> = Vec::new();

        if !self.cursor.match_symbol(")") {
            loop {
                if self.cursor.is_eof() {
                    return Err(CompileError::syntax(
                        "Unexpected end of file in function call: expected argument",
                        self.cursor.position(),
                    ));
                }
                if self.cursor.check_identifier() && self.cursor.peek_at(1).is_symbol("=") {
                    let name = self.cursor.advance();
                    self.cursor.advance();
                    if named.iter().any(|n| n.name == name.lexeme) {
                        return Err(CompileError::syntax(
                            "The same argument cannot be named more than once in a function call.",
                            name.position,
                        ));
                    }
                    let value = self.parse_value(scope)?;
                    named.push(NamedArg {
                        name: name.lexeme,
                        position: name.position,
                        value,
                    });
                } else {
                    if !named.is_empty() {
                        return Err(CompileError::syntax(
                            "Unnamed arguments not allowed after named arguments in function call.",
                            self.cursor.position(),
                        ));
                    }
                    args.push(self.parse_value(scope)?);
                }
                if self.cursor.match_symbol(",") {
                    continue;
                }
                self.cursor
                    .expect_symbol(")", "Expected \",\" or \")\" in function call")?;
                break;
            }
        }

        Ok(self.add_value(
            ValueKind::FunctionCall {
                callee,
                args,
                named,
                specialization: None,
            },
            open.position,
            scope,
        ))
    }

    // ==================== Functions ====================

    /// `fn(...) -> ... { ... }` definition or `fn(...) -> ...` type.
    ///
    /// Named inputs make a definition; without inputs a following body
    /// decides. A definition with `$` inputs is generic: its tokens are
    /// kept and the body is skipped until a call specializes it.
    pub(super) fn parse_function_value(&mut self, scope: ScopeId) -> CompileResult<ValueId> {
        let fn_index = self.cursor.index();
        let position = self.cursor.advance().position;
        let (inputs, outputs, deciding) = self.parse_signature(scope)?;
        let specializing = std::mem::take(&mut self.specializing);

        let has_body = self.cursor.check_symbol("{");
        let named_inputs = inputs.iter().filter(|p| p.name.is_some()).count();
        if named_inputs > 0 && named_inputs < inputs.len() {
            return Err(CompileError::syntax(
                "Cannot mix named and unnamed parameters in function",
                position,
            ));
        }
        let definition = if inputs.is_empty() {
            has_body
        } else {
            named_inputs > 0
        };

        if !definition {
            return self.finish_function_type(scope, position, inputs, outputs, has_body, &deciding);
        }
        if !has_body {
            return Err(CompileError::syntax(
                "Missing function body after definition",
                self.cursor.position(),
            ));
        }
        if !specializing {
            let mut inferable = Vec::new();
            for param in inputs.iter().filter(|p| p.default.is_none()) {
                deciding_names(&self.session.types, param.ty, &mut inferable);
            }
            if let Some(name) = deciding.iter().find(|name| !inferable.contains(name)) {
                return Err(CompileError::syntax(
                    format!(
                        "Generic type \"${}\" must appear in a parameter without a default value",
                        name
                    ),
                    position,
                ));
            }
        }

        let value = self.add_value(ValueKind::ValueList(Vec::new()), position, scope);
        let inputs: Vec<Parameter> = inputs.into_iter().map(into_parameter).collect();
        let mut outputs: Vec<Parameter> = outputs.into_iter().map(into_parameter).collect();
        for (index, output) in outputs.iter_mut().enumerate() {
            if output.name.is_empty() {
                output.name = format!("__retv_{}", index);
            }
        }

        if !deciding.is_empty() && !specializing {
            let open = self.cursor.index();
            let Some(close) = self.cursor.matching_brace(open) else {
                return Err(CompileError::fatal(
                    "Missing '}' at end of scope: found unexpected end of file",
                    self.cursor.at(usize::MAX).position.clone(),
                )
                .with_note("In scope that started here:", self.cursor.position()));
            };
            self.cursor.seek(close + 1);
            let generic = Generic {
                params: deciding,
                tokens: TokenRange {
                    file: self.file,
                    start: fn_index,
                    end: close,
                },
            };
            let node = self.unit.value_mut(value);
            node.kind = ValueKind::Function(Function {
                inputs,
                outputs,
                body: None,
                generic: Some(generic),
            });
            node.ty = Some(self.session.types.builtins().generic_fn);
            return Ok(value);
        }

        let (body, open) = self.open_block(scope, ScopeKind::Dynamic, ScopeOwner::Function(value))?;
        let mut function = Function {
            inputs,
            outputs,
            body: Some(body),
            generic: None,
        };
        for param in function.inputs.iter_mut().chain(function.outputs.iter_mut()) {
            param.ident = Some(self.declare(body, &param.name, param.position.clone())?);
        }
        self.unit.value_mut(value).kind = ValueKind::Function(function);
        self.parse_scope_body(body, open)?;
        Ok(value)
    }

    fn finish_function_type(
        &mut self,
        scope: ScopeId,
        position: Position,
        inputs: Vec<RawParam>,
        outputs: Vec<RawParam>,
        has_body: bool,
        deciding: &[String],
    ) -> CompileResult<ValueId> {
        if let Some(param) = inputs.iter().chain(&outputs).find(|p| p.default.is_some()) {
            return Err(CompileError::syntax(
                "Default values not allowed in function type",
                param.position.clone(),
            ));
        }
        if has_body {
            return Err(CompileError::syntax(
                "Function body not allowed after declaration",
                self.cursor.position(),
            ));
        }
        if let Some(name) = deciding.first() {
            return Err(CompileError::syntax(
                format!("Generic type \"${}\" is only allowed in function definitions", name),
                position,
            ));
        }
        let syntax = self.session.types.function(
            inputs.iter().map(|p| p.ty).collect(),
            outputs.iter().map(|p| p.ty).collect(),
        );
        Ok(self.add_value(
            ValueKind::TypeDescriptor {
                syntax,
                resolved: None,
            },
            position,
            scope,
        ))
    }

    /// `( inputs ) [-> output | -> ( outputs )]`, after the `fn` keyword.
    /// Also returns the `$` names found in the inputs.
    fn parse_signature(
        &mut self,
        scope: ScopeId,
    ) -> CompileResult<(Vec<RawParam>, Vec<RawParam>, Vec<String>)> {
        self.cursor.expect_symbol("(", "Expected \"(\" after \"fn\"")?;

        let outer = self.deciding.replace(Vec::new());
        let inputs = self.parse_parameters(scope);
        let deciding = std::mem::replace(&mut self.deciding, outer).unwrap_or_default();
        let inputs = inputs?;

        let outputs = if self.cursor.match_symbol("->") {
            if self.cursor.match_symbol("(") {
                self.parse_parameters(scope)?
            } else {
                let position = self.cursor.position();
                vec![RawParam {
                    name: None,
                    position,
                    ty: self.parse_type(scope)?,
                    default: None,
                }]
            }
        } else {
            Vec::new()
        };
        Ok((inputs, outputs, deciding))
    }

    /// Comma separated `[name :] type [= default]` up to and including `)`
    fn parse_parameters(&mut self, scope: ScopeId) -> CompileResult<Vec<RawParam>> {
        let mut params = Vec::new();
        if self.cursor.match_symbol(")") {
            return Ok(params);
        }
        loop {
            let position = self.cursor.position();
            let name = if self.cursor.check_identifier() && self.cursor.peek_at(1).is_symbol(":") {
                let name = self.cursor.advance();
                self.cursor.advance();
                Some(name)
            } else {
                None
            };
            let ty = self.parse_type(scope)?;
            let default = if self.cursor.match_symbol("=") {
                Some(self.parse_value(scope)?)
            } else {
                None
            };
            params.push(RawParam {
                name,
                position,
                ty,
                default,
            });
            if self.cursor.match_symbol(",") {
                continue;
            }
            self.cursor
                .expect_symbol(")", "Expected \",\" or \")\" in parameter list")?;
            return Ok(params);
        }
    }

    // ==================== Types ====================

    /// A type in type position: name, `$name`, `fn(...)`, `struct {...}`,
    /// followed by any number of `[N]` / `[..]` suffixes
    pub(super) fn parse_type(&mut self, scope: ScopeId) -> CompileResult<TypeId> {
        let token = self.cursor.peek().clone();
        let mut ty = if token.is_keyword("fn") {
            self.cursor.advance();
            let (inputs, outputs, deciding) = self.parse_signature(scope)?;
            if let Some(param) = inputs.iter().chain(&outputs).find(|p| p.default.is_some()) {
                return Err(CompileError::syntax(
                    "Default values not allowed in function type",
                    param.position.clone(),
                ));
            }
            if let Some(outer) = self.deciding.as_mut() {
                for name in deciding {
                    if !outer.contains(&name) {
                        outer.push(name);
                    }
                }
            }
            self.session.types.function(
                inputs.iter().map(|p| p.ty).collect(),
                outputs.iter().map(|p| p.ty).collect(),
            )
        } else if token.is_keyword("struct") {
            self.parse_struct_type(scope)?
        } else if token.is_symbol("$") {
            self.cursor.advance();
            let name = self.cursor.expect_identifier("Expected type name after \"$\"")?;
            if self.specializing {
                self.session
                    .types
                    .placeholder(name.lexeme, name.position, false)
            } else {
                let Some(deciding) = self.deciding.as_mut() else {
                    return Err(CompileError::syntax(
                        format!(
                            "Generic type \"${}\" is only allowed in function inputs",
                            name.lexeme
                        ),
                        token.position,
                    ));
                };
                if !deciding.contains(&name.lexeme) {
                    deciding.push(name.lexeme.clone());
                }
                self.session
                    .types
                    .placeholder(name.lexeme, name.position, true)
            }
        } else if token.kind == TokenKind::Identifier {
            self.cursor.advance();
            self.session
                .types
                .placeholder(token.lexeme, token.position, false)
        } else {
            return Err(CompileError::syntax(
                "Unexpected token: Expected type",
                token.position,
            ));
        };

        while self.cursor.match_symbol("[") {
            let size = if self.cursor.match_symbol("..") {
                None
            } else {
                let size = self.cursor.advance();
                match size.lexeme.parse::<u64>() {
                    Ok(n) if size.kind == TokenKind::Integer => Some(n),
                    _ => {
                        return Err(CompileError::syntax(
                            "Expected array size or \"..\" in array type",
                            size.position,
                        ));
                    }
                }
            };
            self.cursor
                .expect_symbol("]", "Missing \"]\" at the end of array type")?;
            ty = self.session.types.array(ty, size);
        }
        Ok(ty)
    }

    /// `struct { a : int; b, c : int, float; d : int = 3; using e : Other; }`
    pub(super) fn parse_struct_type(&mut self, scope: ScopeId) -> CompileResult<TypeId> {
        self.cursor.advance();
        let open = self.cursor.expect_symbol("{", "Expected \"{\" after \"struct\"")?;
        let mut members: Vec<StructMember> = Vec::new();

        while !self.cursor.match_symbol("}") {
            if self.cursor.is_eof() {
                return Err(CompileError::fatal(
                    "Missing '}' at end of scope: found unexpected end of file",
                    self.cursor.position(),
                )
                .with_note("In scope that started here:", open.position));
            }
            if self.cursor.match_symbol(";") {
                continue;
            }
            let merged = self.cursor.match_keyword("using");

            let mut names = Vec::new();
            loop {
                names.push(self.cursor.expect_identifier("Expected member name in struct")?);
                if !self.cursor.match_symbol(",") {
                    break;
                }
            }
            self.cursor
                .expect_symbol(":", "Expected \":\" after struct member name")?;
            let mut types = Vec::new();
            loop {
                types.push(self.parse_type(scope)?);
                if !self.cursor.match_symbol(",") {
                    break;
                }
            }
            if types.len() != names.len() {
                return Err(CompileError::syntax(
                    format!(
                        "Type count mismatch in struct member: expected {} types but found {}",
                        names.len(),
                        types.len()
                    ),
                    names[0].position.clone(),
                ));
            }
            let default = if self.cursor.match_symbol("=") {
                Some(self.parse_value(scope)?)
            } else {
                None
            };
            self.cursor
                .expect_symbol(";", "Missing \";\" after struct member")?;

            for (name, ty) in names.into_iter().zip(types) {
                if let Some(previous) = members.iter().find(|m| m.name == name.lexeme) {
                    return Err(CompileError::syntax(
                        format!("Multiple declarations of member \"{}\" in struct", name.lexeme),
                        name.position,
                    )
                    .with_note("Previously declared here", previous.position.clone()));
                }
                members.push(StructMember {
                    name: name.lexeme,
                    position: name.position,
                    ty,
                    default,
                    merged,
                });
            }
        }
        Ok(self.session.types.new_struct(members))
    }

    fn add_value(&mut self, kind: ValueKind, position: Position, scope: ScopeId) -> ValueId {
        self.unit.add_value(ValueNode::new(kind, position, scope))
    }
}

fn into_parameter(raw: RawParam) -> Parameter {
    let (name, position) = match raw.name {
        Some(token) => (token.lexeme, token.position),
        None => (String::new(), raw.position),
    };
    Parameter {
        name,
        position,
        ty: raw.ty,
        default: raw.default,
        ident: None,
    }
}
/// Every `$name` placeholder inside `ty`, in order of appearance
fn deciding_names(types: &TypeTable, ty: TypeId, names: &mut Vec<String>) {
    match types.get(ty) {
        TypeDescriptor::Unresolved {
            name,
            deciding: true,
            ..
        } => {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        TypeDescriptor::Function { inputs, outputs } => {
            for ty in inputs.iter().chain(outputs) {
                deciding_names(types, *ty, names);
            }
        }
        TypeDescriptor::Array { element, .. } => deciding_names(types, *element, names),
        _ => {}
    }
}
