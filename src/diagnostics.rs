use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn new(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            source: None,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        hint_for_code(self.code)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_warning(&self) -> bool {
        self.code.starts_with("W-")
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hint = self.hint();
        if let Some(source) = self.source() {
            write!(f, "{}: ", source)?;
        }
        if let Some(span) = &self.span {
            write!(
                f,
                "{}: {} at {}:{}",
                self.code, self.message, span.line, span.column
            )?;
        } else {
            write!(f, "{}: {}", self.code, self.message)?;
        }
        if let Some(hint) = hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

pub fn hint_for_code(code: &str) -> Option<&'static str> {
    match code {
        "E-IO" => Some("check the input path and read permissions"),
        "E-CONFIG" => Some("check the TOML keys and value types of the config file"),
        "E-SYNTAX" => Some("check that parentheses and double quotes are balanced"),
        "E-ARITY" => Some("compare the argument count with the relation's declared valence"),
        "E-PREDVAR" => {
            Some("add instance/domain facts that let the predicate variable be instantiated")
        }
        "W-EXPANSION-LIMIT" => Some("narrow row variables or predicate variables in the axiom"),
        "W-UNSUITABLE" => Some("quantify free variables explicitly or remove non-ASCII text"),
        _ => None,
    }
}

pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in src.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

pub fn make_span(src: &str, start: usize, end: usize) -> Span {
    let (line, column) = line_col(src, start);
    Span {
        start,
        end,
        line,
        column,
    }
}
