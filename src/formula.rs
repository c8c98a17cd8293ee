use std::fmt;

use crate::diagnostics::{Diagnostic, Span};
use crate::parser::parse_term;
use crate::term::Term;

/// A term plus the side-channel metadata that travels with it: provenance and
/// the diagnostics accumulated while preprocessing it.
#[derive(Debug, Clone)]
pub struct Formula {
    text: String,
    term: Option<Term>,
    pub source_file: Option<String>,
    pub start_line: Option<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Formula {
    /// Never fails; malformed text keeps `term() == None` and is rejected by the preprocessor.
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let term = parse_term(&text).ok();
        Self {
            text,
            term,
            source_file: None,
            start_line: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn from_term(term: Term) -> Self {
        Self {
            text: term.to_string(),
            term: Some(term),
            source_file: None,
            start_line: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_source(mut self, file: impl Into<String>, line: usize) -> Self {
        self.source_file = Some(file.into());
        self.start_line = Some(line);
        self
    }

    /// A new formula carrying this one's provenance but none of its diagnostics.
    pub fn derive(&self, term: Term) -> Self {
        Self {
            text: term.to_string(),
            term: Some(term),
            source_file: self.source_file.clone(),
            start_line: self.start_line,
            diagnostics: Vec::new(),
        }
    }

    pub fn without_diagnostics(&self) -> Self {
        Self {
            diagnostics: Vec::new(),
            ..self.clone()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn term(&self) -> Option<&Term> {
        self.term.as_ref()
    }

    pub fn span(&self) -> Option<Span> {
        self.start_line.map(|line| Span {
            start: 0,
            end: self.text.len(),
            line,
            column: 1,
        })
    }

    pub fn report(&mut self, code: &'static str, message: impl Into<String>) {
        let mut diag = Diagnostic::new(code, message, self.span());
        if let Some(file) = &self.source_file {
            diag = diag.with_source(file.clone());
        }
        self.diagnostics.push(diag);
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.text == other.text
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
