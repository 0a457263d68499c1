//! Text rendering of the AST, used by `--dump-ast` and in tests

use super::{
    CompileUnit, LiteralKind, ResolutionStatus, ScopeId, StatementKind, StmtId, ValueId,
    ValueKind,
};
use crate::types::TypeTable;
use std::fmt::Write;

pub struct AstPrinter<'a> {
    unit: &'a CompileUnit,
    types: &'a TypeTable,
}

impl<'a> AstPrinter<'a> {
    pub fn new(unit: &'a CompileUnit, types: &'a TypeTable) -> Self {
        Self { unit, types }
    }

    /// Render a value; infix operations are fully parenthesized
    pub fn value(&self, id: ValueId) -> String {
        let node = self.unit.value(id);
        match &node.kind {
            ValueKind::Literal { kind, text } => match kind {
                LiteralKind::String => format!("\"{}\"", text),
                _ => text.clone(),
            },
            ValueKind::Identifier { name, .. } => name.clone(),
            ValueKind::InfixOp { lhs, op, rhs, .. } => {
                format!("({} {} {})", self.value(*lhs), op, self.value(*rhs))
            }
            ValueKind::FunctionCall {
                callee, args, named, ..
            } => {
                let mut parts: Vec<String> = args.iter().map(|a| self.value(*a)).collect();
                parts.extend(
                    named
                        .iter()
                        .map(|n| format!("{} = {}", n.name, self.value(n.value))),
                );
                format!("{}({})", self.value(*callee), parts.join(", "))
            }
            ValueKind::Getter { subject, member, .. } => {
                format!("{}.{}", self.value(*subject), member)
            }
            ValueKind::Cast { subject, target } => format!("{}_{}", self.value(*subject), target),
            ValueKind::ArrayLookup { subject, index } => {
                format!("{}[{}]", self.value(*subject), self.value(*index))
            }
            ValueKind::ValueList(items) => format!("({})", self.list(items)),
            ValueKind::Function(function) => {
                let params = |params: &[super::Parameter]| {
                    params
                        .iter()
                        .map(|p| format!("{}: {}", p.name, self.types.display(p.ty)))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let mut out = format!("fn({})", params(function.inputs.as_slice()));
                if !function.outputs.is_empty() {
                    let _ = write!(out, " -> ({})", params(function.outputs.as_slice()));
                }
                out.push_str(if function.is_generic() { " {..}" } else { " {...}" });
                out
            }
            ValueKind::TypeDescriptor { syntax, resolved } => {
                self.types.display(resolved.unwrap_or(*syntax))
            }
            ValueKind::Scope(_) => "{...}".to_string(),
        }
    }

    /// Indented listing of a scope's statements and nested bodies
    pub fn dump(&self, scope: ScopeId) -> String {
        let mut out = String::new();
        self.dump_scope(scope, 0, &mut out);
        out
    }

    fn dump_scope(&self, scope: ScopeId, depth: usize, out: &mut String) {
        let scope = self.unit.scope(scope);
        for stmt in scope.statements.iter().chain(&scope.defers) {
            self.dump_statement(*stmt, depth, out);
        }
    }

    fn dump_statement(&self, id: StmtId, depth: usize, out: &mut String) {
        let stmt = self.unit.stmt(id);
        let indent = "  ".repeat(depth);
        let status = if stmt.status == ResolutionStatus::Resolved {
            String::new()
        } else {
            format!("  [{:?}]", stmt.status)
        };
        let prefix = if stmt.deferred { "defer " } else { "" };
        let _ = writeln!(out, "{}{}{}{}", indent, prefix, self.header(&stmt.kind), status);

        match &stmt.kind {
            StatementKind::Declaration { values, .. } => {
                for value in values {
                    if let Some(body) = self.unit.function(*value).and_then(|f| f.body) {
                        self.dump_scope(body, depth + 1, out);
                    }
                }
            }
            StatementKind::If {
                branches,
                otherwise,
                then,
            } => {
                for branch in branches {
                    self.dump_scope(branch.body, depth + 1, out);
                }
                if let Some(body) = otherwise {
                    let _ = writeln!(out, "{}else", indent);
                    self.dump_scope(*body, depth + 1, out);
                }
                if let Some(body) = then {
                    let _ = writeln!(out, "{}then", indent);
                    self.dump_scope(*body, depth + 1, out);
                }
            }
            StatementKind::While { body, .. }
            | StatementKind::For { body, .. }
            | StatementKind::Block(body) => self.dump_scope(*body, depth + 1, out),
            _ => {}
        }
    }

    fn header(&self, kind: &StatementKind) -> String {
        match kind {
            StatementKind::Declaration { groups, values, .. } => {
                let lhs: Vec<String> = groups
                    .iter()
                    .map(|group| {
                        group
                            .iter()
                            .map(|ident| {
                                let ident = self.unit.ident(*ident);
                                match ident.ty {
                                    Some(ty) => {
                                        format!("{}: {}", ident.name, self.types.display(ty))
                                    }
                                    None => ident.name.clone(),
                                }
                            })
                            .collect::<Vec<_>>()
                            .join(" = ")
                    })
                    .collect();
                if values.is_empty() {
                    lhs.join(", ")
                } else {
                    format!("{} := {}", lhs.join(", "), self.list(values))
                }
            }
            StatementKind::Assignment {
                targets,
                op,
                values,
            } => format!("{} {} {}", self.list(targets), op.symbol(), self.list(values)),
            StatementKind::If { branches, .. } => {
                let conditions: Vec<String> =
                    branches.iter().map(|b| self.value(b.condition)).collect();
                format!("if {}", conditions.join(" elsif "))
            }
            StatementKind::While { condition, .. } => format!("while {}", self.value(*condition)),
            StatementKind::For {
                iterator,
                start,
                end,
                step,
                reverse,
                ..
            } => {
                let mut out = format!(
                    "for {} in {}",
                    self.unit.ident(*iterator).name,
                    self.value(*start)
                );
                if let Some(end) = end {
                    let _ = write!(out, "..{}", self.value(*end));
                }
                if let Some(step) = step {
                    let _ = write!(out, " by {}", self.value(*step));
                }
                if *reverse {
                    out.push_str(" reverse");
                }
                out
            }
            StatementKind::Return { values, named } => {
                let mut parts: Vec<String> = values.iter().map(|v| self.value(*v)).collect();
                parts.extend(named.iter().map(|n| format!("{} = {}", n.name, self.value(n.value))));
                format!("return {}", parts.join(", "))
            }
            StatementKind::Using { subject } => format!("using {}", self.value(*subject)),
            StatementKind::Call(call) => self.value(*call),
            StatementKind::Block(_) => "block".to_string(),
            StatementKind::Malformed => "<malformed>".to_string(),
            StatementKind::Operator { op, function } => {
                format!("operator {} := {}", op, self.value(*function))
            }
        }
    }

    fn list(&self, values: &[ValueId]) -> String {
        values.iter().map(|v| self.value(*v)).collect::<Vec<_>>().join(", ")
    }
}
