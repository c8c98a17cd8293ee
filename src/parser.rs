use crate::diagnostics::{Diagnostic, line_col, make_span};
use crate::formula::Formula;
use crate::term::Term;

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
enum TokenKind {
    LParen,
    RParen,
    Atom(String),
}

#[derive(Debug, Clone)]
enum SExpr {
    Atom(String, usize, usize),
    List(Vec<SExpr>, usize, usize),
}

impl SExpr {
    fn span_bounds(&self) -> (usize, usize) {
        match self {
            SExpr::Atom(_, s, e) | SExpr::List(_, s, e) => (*s, *e),
        }
    }

    fn into_term(self) -> Term {
        match self {
            SExpr::Atom(s, _, _) => Term::Atom(s),
            SExpr::List(items, _, _) => {
                Term::List(items.into_iter().map(SExpr::into_term).collect())
            }
        }
    }
}

pub fn parse_kif(src: &str) -> Result<Vec<Term>, Vec<Diagnostic>> {
    let tokens = lex(src)?;
    let sexprs = parse_sexprs(src, &tokens)?;
    Ok(sexprs.into_iter().map(SExpr::into_term).collect())
}

pub fn parse_kif_with_source(
    src: &str,
    file_id: Option<&str>,
) -> Result<Vec<Formula>, Vec<Diagnostic>> {
    let tokens = lex(src).map_err(|errs| attach_file(errs, file_id))?;
    let sexprs = parse_sexprs(src, &tokens).map_err(|errs| attach_file(errs, file_id))?;
    let mut formulas = Vec::with_capacity(sexprs.len());
    for form in sexprs {
        let (line, _) = line_col(src, form.span_bounds().0);
        let mut formula = Formula::from_term(form.into_term());
        formula.source_file = file_id.map(str::to_string);
        formula.start_line = Some(line);
        formulas.push(formula);
    }
    Ok(formulas)
}

pub fn parse_term(src: &str) -> Result<Term, Vec<Diagnostic>> {
    let mut terms = parse_kif(src)?;
    match terms.len() {
        1 => Ok(terms.remove(0)),
        0 => Err(vec![Diagnostic::new(
            "E-SYNTAX",
            "expected one formula, found none",
            Some(make_span(src, 0, src.len())),
        )]),
        n => Err(vec![Diagnostic::new(
            "E-SYNTAX",
            format!("expected one formula, found {n}"),
            Some(make_span(src, 0, src.len())),
        )]),
    }
}

/// Parentheses and double quotes outside of comments pair up.
pub fn is_balanced(text: &str) -> bool {
    let mut depth = 0i64;
    let mut in_string = false;
    let mut escaped = false;
    let mut in_comment = false;
    for ch in text.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            ';' => in_comment = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !in_string
}

fn attach_file(errs: Vec<Diagnostic>, file_id: Option<&str>) -> Vec<Diagnostic> {
    match file_id {
        Some(file) => errs.into_iter().map(|d| d.with_source(file)).collect(),
        None => errs,
    }
}

fn lex(src: &str) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let mut tokens = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let ch = bytes[i] as char;
        if ch.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if ch == ';' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if ch == '(' {
            tokens.push(Token {
                kind: TokenKind::LParen,
                start: i,
                end: i + 1,
            });
            i += 1;
            continue;
        }
        if ch == ')' {
            tokens.push(Token {
                kind: TokenKind::RParen,
                start: i,
                end: i + 1,
            });
            i += 1;
            continue;
        }
        if ch == '"' {
            let start = i;
            i += 1;
            let mut escaped = false;
            let mut closed = false;
            while i < bytes.len() {
                let c = bytes[i];
                i += 1;
                if escaped {
                    escaped = false;
                } else if c == b'\\' {
                    escaped = true;
                } else if c == b'"' {
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err(vec![Diagnostic::new(
                    "E-SYNTAX",
                    "unterminated string literal",
                    Some(make_span(src, start, src.len())),
                )]);
            }
            tokens.push(Token {
                kind: TokenKind::Atom(src[start..i].to_string()),
                start,
                end: i,
            });
            continue;
        }

        let start = i;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if c.is_ascii_whitespace() || c == '(' || c == ')' || c == ';' || c == '"' {
                break;
            }
            i += 1;
        }
        let text = &src[start..i];
        tokens.push(Token {
            kind: TokenKind::Atom(text.to_string()),
            start,
            end: i,
        });
    }

    Ok(tokens)
}

fn parse_sexprs(src: &str, tokens: &[Token]) -> Result<Vec<SExpr>, Vec<Diagnostic>> {
    let mut idx = 0usize;
    let mut forms = Vec::new();
    let mut errors = Vec::new();

    while idx < tokens.len() {
        match parse_one(src, tokens, &mut idx) {
            Ok(form) => forms.push(form),
            Err(e) => {
                errors.push(e);
                break;
            }
        }
    }

    if errors.is_empty() {
        Ok(forms)
    } else {
        Err(errors)
    }
}

fn parse_one(src: &str, tokens: &[Token], idx: &mut usize) -> Result<SExpr, Diagnostic> {
    if *idx >= tokens.len() {
        return Err(Diagnostic::new(
            "E-SYNTAX",
            "unexpected EOF",
            Some(make_span(src, src.len(), src.len())),
        ));
    }

    let t = &tokens[*idx];
    match &t.kind {
        TokenKind::Atom(s) => {
            *idx += 1;
            Ok(SExpr::Atom(s.clone(), t.start, t.end))
        }
        TokenKind::RParen => Err(Diagnostic::new(
            "E-SYNTAX",
            "unexpected ')'",
            Some(make_span(src, t.start, t.end)),
        )),
        TokenKind::LParen => {
            let start = t.start;
            *idx += 1;
            let mut items = Vec::new();
            loop {
                if *idx >= tokens.len() {
                    return Err(Diagnostic::new(
                        "E-SYNTAX",
                        "unbalanced parentheses",
                        Some(make_span(src, start, start + 1)),
                    ));
                }
                let cur = &tokens[*idx];
                if matches!(cur.kind, TokenKind::RParen) {
                    let end = cur.end;
                    *idx += 1;
                    return Ok(SExpr::List(items, start, end));
                }
                let node = parse_one(src, tokens, idx)?;
                items.push(node);
            }
        }
    }
}
