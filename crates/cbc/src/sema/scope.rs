//! Identifier tables: declaration and lookup

use crate::ast::{CompileUnit, IdentId, ScopeId, TypedIdentifier};
use crate::common::{Diagnostic, Position};

/// Outcome of a name lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// `ident` is the binding to use; `others` are further candidates from
    /// independent import branches, which make the reference ambiguous
    Found { ident: IdentId, others: Vec<IdentId> },
    /// Nothing yet, but a `using` of this scope may still bring the name in
    Pending(ScopeId),
    /// Only a declaration at or after the use, in a dynamic scope
    TooEarly(IdentId),
    NotFound,
}

/// Declare `name` in `scope`. A name may only be declared once per scope;
/// the error notes where the first declaration is.
pub fn declare(
    unit: &mut CompileUnit,
    scope: ScopeId,
    name: &str,
    position: Position,
) -> Result<IdentId, Box<Diagnostic>> {
    if let Some(previous) = unit.declared_in(scope, name) {
        let previous = unit.ident(previous).position.clone();
        return Err(Box::new(
            Diagnostic::error(
                format!("Multiple declarations of identifier \"{}\"", name),
                position,
            )
            .with_note("Previously declared here", previous),
        ));
    }
    let ident = unit.add_ident(TypedIdentifier::new(name, position, scope));
    let table = unit.scope_mut(scope);
    table.identifiers.insert(name.to_string(), ident);
    table.declared.push(ident);
    Ok(ident)
}

/// Find the binding of `name` as seen from `position` in `scope`.
///
/// A scope's own table shadows everything else. Below that, the lexical
/// parent chain and each directly imported scope are independent branches;
/// imports are searched in their own table only, never through their
/// parents or their own imports. While a `using` that could add another
/// branch is undecided the lookup stays pending, so an ambiguity is seen
/// whatever order the `using`s settle in.
pub fn lookup(unit: &CompileUnit, scope: ScopeId, name: &str, position: &Position) -> Lookup {
    search(unit, scope, name, position, false)
}

/// Lookup for the subject of a `using`: takes the first binding found
/// without waiting for other undecided `using`s, which may themselves be
/// waiting for this one.
pub fn lookup_eager(
    unit: &CompileUnit,
    scope: ScopeId,
    name: &str,
    position: &Position,
) -> Lookup {
    search(unit, scope, name, position, true)
}

fn search(
    unit: &CompileUnit,
    scope: ScopeId,
    name: &str,
    position: &Position,
    eager: bool,
) -> Lookup {
    let table = unit.scope(scope);
    let mut too_early = None;

    if let Some(&ident) = table.identifiers.get(name) {
        let declaration = unit.ident(ident);
        if !table.is_dynamic() || declaration.position.precedes(position) {
            return Lookup::Found {
                ident,
                others: Vec::new(),
            };
        }
        too_early = Some(ident);
    }

    let mut pending = has_pending_usings(unit, scope).then_some(scope);
    if pending.is_some() && !eager {
        return Lookup::Pending(scope);
    }

    let mut hits = Vec::new();
    match table
        .parent
        .map(|parent| search(unit, parent, name, position, eager))
    {
        Some(Lookup::Found { ident, others }) => {
            hits.push(ident);
            hits.extend(others);
        }
        Some(Lookup::Pending(blocked)) => {
            if !eager {
                return Lookup::Pending(blocked);
            }
            pending = pending.or(Some(blocked));
        }
        Some(Lookup::TooEarly(ident)) => {
            too_early.get_or_insert(ident);
        }
        Some(Lookup::NotFound) | None => {}
    }

    for import in &table.imports {
        if let Some(&ident) = unit.scope(*import).identifiers.get(name) {
            if !hits.contains(&ident) {
                hits.push(ident);
            }
        }
    }

    if !hits.is_empty() {
        let ident = hits.remove(0);
        return Lookup::Found { ident, others: hits };
    }
    if let Some(blocked) = pending {
        return Lookup::Pending(blocked);
    }
    match too_early {
        Some(ident) => Lookup::TooEarly(ident),
        None => Lookup::NotFound,
    }
}

/// True while a `using` of `scope` may still add an import
pub fn has_pending_usings(unit: &CompileUnit, scope: ScopeId) -> bool {
    let table = unit.scope(scope);
    !table.imports_frozen
        && table
            .usings
            .iter()
            .any(|using| !unit.stmt(*using).status.is_terminal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        ResolutionStatus, Scope, ScopeKind, ScopeOwner, Statement, StatementKind, ValueKind,
        ValueNode,
    };
    use crate::types::TypeTable;
    use pretty_assertions::assert_eq;

    fn at(line: u32) -> Position {
        Position::new("test.cb", line, 1)
    }

    fn fixture() -> (CompileUnit, ScopeId) {
        let types = TypeTable::new();
        let mut unit = CompileUnit::new(&types);
        let parent = unit.builtin_scope();
        let global = unit.add_scope(Scope::new(
            ScopeKind::Static,
            Some(parent),
            ScopeOwner::File(0),
            at(1),
        ));
        (unit, global)
    }

    fn child(unit: &mut CompileUnit, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        unit.add_scope(Scope::new(kind, Some(parent), ScopeOwner::Block, at(1)))
    }

    fn add_using(unit: &mut CompileUnit, scope: ScopeId) -> crate::ast::StmtId {
        let subject = unit.add_value(ValueNode::new(
            ValueKind::Identifier {
                name: "ns".to_string(),
                target: None,
            },
            at(1),
            scope,
        ));
        let stmt = unit.add_stmt(Statement::new(StatementKind::Using { subject }, at(1), scope));
        unit.scope_mut(scope).usings.push(stmt);
        stmt
    }

    #[test]
    fn test_duplicate_declaration() {
        let (mut unit, global) = fixture();
        declare(&mut unit, global, "x", at(2)).unwrap();
        let error = declare(&mut unit, global, "x", at(5)).unwrap_err();

        assert_eq!(error.message, "Multiple declarations of identifier \"x\"");
        assert_eq!(error.position.line, 5);
        assert_eq!(error.notes[0].position.as_ref().unwrap().line, 2);
    }

    #[test]
    fn test_own_table_shadows_parent() {
        let (mut unit, global) = fixture();
        let outer = declare(&mut unit, global, "int", at(1)).unwrap();
        let inner_scope = child(&mut unit, global, ScopeKind::Static);
        let inner = declare(&mut unit, inner_scope, "int", at(3)).unwrap();

        assert_eq!(
            lookup(&unit, inner_scope, "int", &at(4)),
            Lookup::Found {
                ident: inner,
                others: vec![]
            }
        );
        assert_eq!(
            lookup(&unit, global, "int", &at(4)),
            Lookup::Found {
                ident: outer,
                others: vec![]
            }
        );
    }

    #[test]
    fn test_dynamic_scope_ordering() {
        let (mut unit, global) = fixture();
        let body = child(&mut unit, global, ScopeKind::Dynamic);
        let b = declare(&mut unit, body, "b", at(3)).unwrap();

        assert_eq!(lookup(&unit, body, "b", &at(2)), Lookup::TooEarly(b));
        assert!(matches!(lookup(&unit, body, "b", &at(4)), Lookup::Found { .. }));

        // Static scopes have no ordering
        let c = declare(&mut unit, global, "c", at(9)).unwrap();
        assert_eq!(
            lookup(&unit, global, "c", &at(2)),
            Lookup::Found {
                ident: c,
                others: vec![]
            }
        );
    }

    #[test]
    fn test_imports_are_not_transitive() {
        let (mut unit, a) = fixture();
        let b = child(&mut unit, a, ScopeKind::Static);
        let c = child(&mut unit, a, ScopeKind::Static);
        let deep = declare(&mut unit, c, "deep", at(1)).unwrap();
        let near = declare(&mut unit, b, "near", at(1)).unwrap();
        unit.scope_mut(b).imports.push(c);
        unit.scope_mut(a).imports.push(b);

        assert_eq!(
            lookup(&unit, a, "near", &at(1)),
            Lookup::Found {
                ident: near,
                others: vec![]
            }
        );
        assert_eq!(
            lookup(&unit, b, "deep", &at(1)),
            Lookup::Found {
                ident: deep,
                others: vec![]
            }
        );
        assert_eq!(lookup(&unit, a, "deep", &at(1)), Lookup::NotFound);
    }

    #[test]
    fn test_ambiguous_imports_keep_first() {
        let (mut unit, global) = fixture();
        let left = child(&mut unit, global, ScopeKind::Static);
        let right = child(&mut unit, global, ScopeKind::Static);
        let first = declare(&mut unit, left, "x", at(1)).unwrap();
        let second = declare(&mut unit, right, "x", at(2)).unwrap();
        let user = child(&mut unit, global, ScopeKind::Static);
        unit.scope_mut(user).imports.extend([left, right]);

        assert_eq!(
            lookup(&unit, user, "x", &at(5)),
            Lookup::Found {
                ident: first,
                others: vec![second]
            }
        );
    }

    #[test]
    fn test_pending_until_usings_settle() {
        let (mut unit, global) = fixture();
        let body = child(&mut unit, global, ScopeKind::Dynamic);
        let using = add_using(&mut unit, global);

        assert_eq!(lookup(&unit, body, "missing", &at(1)), Lookup::Pending(global));

        unit.stmt_mut(using).status = ResolutionStatus::TypeError;
        assert_eq!(lookup(&unit, body, "missing", &at(1)), Lookup::NotFound);

        unit.stmt_mut(using).status = ResolutionStatus::AwaitingDependencies;
        unit.scope_mut(global).imports_frozen = true;
        assert!(!has_pending_usings(&unit, global));
        assert_eq!(lookup(&unit, body, "missing", &at(1)), Lookup::NotFound);
    }

    #[test]
    fn test_parent_hit_waits_for_usings() {
        let (mut unit, global) = fixture();
        let outer = declare(&mut unit, global, "ns", at(1)).unwrap();
        let body = child(&mut unit, global, ScopeKind::Static);
        let using = add_using(&mut unit, body);

        assert_eq!(lookup(&unit, body, "ns", &at(2)), Lookup::Pending(body));
        assert_eq!(
            lookup_eager(&unit, body, "ns", &at(2)),
            Lookup::Found {
                ident: outer,
                others: vec![]
            }
        );
        assert_eq!(lookup_eager(&unit, body, "missing", &at(2)), Lookup::Pending(body));

        unit.stmt_mut(using).status = ResolutionStatus::Resolved;
        assert_eq!(
            lookup(&unit, body, "ns", &at(2)),
            Lookup::Found {
                ident: outer,
                others: vec![]
            }
        );
    }
}
