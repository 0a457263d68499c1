//! Infix expressions

use super::Parser;
use crate::ast::{InfixOp, ScopeId, ValueId, ValueKind, ValueNode};
use crate::common::{CompileResult, Position};
use crate::lexer::TokenKind;

/// How chains of infix operators are grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfixMode {
    /// Look at two operators at a time and nest by comparing their
    /// priorities; `a * b + c * d` reads as `((a * b) + c) * d`
    #[default]
    TwoTokenLookahead,
    /// Conventional precedence climbing; `a * b + c * d` reads as
    /// `(a * b) + (c * d)`
    PrecedenceClimbing,
}

impl Parser<'_> {
    /// Continue a value whose first operand is `lhs`
    pub(super) fn parse_infix(&mut self, scope: ScopeId, lhs: ValueId) -> CompileResult<ValueId> {
        match self.session.infix {
            InfixMode::TwoTokenLookahead => self.parse_infix_lookahead(scope, lhs),
            InfixMode::PrecedenceClimbing => self.parse_infix_climbing(scope, lhs, 0),
        }
    }

    fn parse_infix_lookahead(
        &mut self,
        scope: ScopeId,
        mut lhs: ValueId,
    ) -> CompileResult<ValueId> {
        while let Some((op, position)) = self.match_infix() {
            let rhs = self.parse_operand(scope)?;
            let Some((next, next_position)) = self.match_infix() else {
                lhs = self.make_infix(scope, lhs, op, rhs, position);
                break;
            };
            let rhs2 = self.parse_operand(scope)?;
            lhs = if op.priority() < next.priority() {
                let inner = self.make_infix(scope, rhs, next, rhs2, next_position);
                self.make_infix(scope, lhs, op, inner, position)
            } else {
                let inner = self.make_infix(scope, lhs, op, rhs, position);
                self.make_infix(scope, inner, next, rhs2, next_position)
            };
        }
        Ok(lhs)
    }

    fn parse_infix_climbing(
        &mut self,
        scope: ScopeId,
        mut lhs: ValueId,
        min_priority: u8,
    ) -> CompileResult<ValueId> {
        while let Some(op) = self.peek_infix() {
            if op.priority() < min_priority {
                break;
            }
            let position = self.cursor.advance().position;
            let mut rhs = self.parse_operand(scope)?;
            while let Some(next) = self.peek_infix() {
                if next.priority() <= op.priority() {
                    break;
                }
                rhs = self.parse_infix_climbing(scope, rhs, next.priority())?;
            }
            lhs = self.make_infix(scope, lhs, op, rhs, position);
        }
        Ok(lhs)
    }

    fn peek_infix(&self) -> Option<InfixOp> {
        let token = self.cursor.peek();
        if token.kind == TokenKind::Symbol {
            InfixOp::from_symbol(&token.lexeme)
        } else {
            None
        }
    }

    fn match_infix(&mut self) -> Option<(InfixOp, Position)> {
        let op = self.peek_infix()?;
        Some((op, self.cursor.advance().position))
    }

    fn make_infix(
        &mut self,
        scope: ScopeId,
        lhs: ValueId,
        op: InfixOp,
        rhs: ValueId,
        position: Position,
    ) -> ValueId {
        self.unit.add_value(ValueNode::new(
            ValueKind::InfixOp {
                lhs,
                op,
                rhs,
                overload: None,
            },
            position,
            scope,
        ))
    }
}
