use thiserror::Error;

use crate::term::{IFF, IMPLIES, Term};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("arity mismatch in {relation}: expected {expected} arguments, found {found}")]
pub struct ArityError {
    pub relation: String,
    pub expected: usize,
    pub found: usize,
}

/// Check every application innermost-first against `valence`.
///
/// `valence` follows the KB convention: negative means unknown, 0 means variable
/// arity; neither is checked. Quantifier variable lists are not applications,
/// and quoted strings are opaque atoms. An application with a row variable among
/// its arguments is skipped, since its real arity is only known after expansion.
pub fn check_arity(term: &Term, valence: &impl Fn(&str) -> i32) -> Result<(), ArityError> {
    let Term::List(items) = term else {
        return Ok(());
    };
    if term.is_quantified() {
        return check_arity(&items[2], valence);
    }
    for item in items {
        check_arity(item, valence)?;
    }
    let Some(head) = items.first() else {
        return Ok(());
    };
    let Some(relation) = head.as_atom() else {
        return Ok(());
    };
    if head.is_variable() || head.is_quoted_string() {
        return Ok(());
    }
    let expected = if relation == IMPLIES || relation == IFF {
        2
    } else {
        valence(relation)
    };
    if expected <= 0 {
        return Ok(());
    }
    let args = &items[1..];
    if args.iter().any(Term::is_row_variable) {
        return Ok(());
    }
    let expected = expected as usize;
    if expected != args.len() {
        return Err(ArityError {
            relation: relation.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}
