// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::ir::Span;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, NoColor, StandardStream, WriteColor};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorKind {
    /// Two updates of the same location disagree.
    Conflict,
    /// Call of an undef rule reference or with the wrong number of arguments.
    InvalidCall,
    AssertionFailure,
    /// Operator applied to values it is not defined for.
    UnsupportedOperation,
    /// Explicit `diedie`.
    Abort,
}

impl ExecErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ExecErrorKind::Conflict => "conflicting updates",
            ExecErrorKind::InvalidCall => "invalid call",
            ExecErrorKind::AssertionFailure => "assertion failed",
            ExecErrorKind::UnsupportedOperation => "unsupported operation",
            ExecErrorKind::Abort => "aborted",
        }
    }
}

/// Fatal runtime error. Always points at the statement that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {detail}", .kind.label())]
pub struct ExecError {
    pub kind: ExecErrorKind,
    pub span: Span,
    /// Earlier statement involved in the error, e.g., the first of two conflicting updates.
    pub other: Option<Span>,
    pub detail: String,
}

pub type Result<T> = std::result::Result<T, ExecError>;

impl ExecError {
    pub fn new(kind: ExecErrorKind, span: Span, detail: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            other: None,
            detail: detail.into(),
        }
    }

    pub fn with_other(mut self, other: Span) -> Self {
        self.other = Some(other);
        self
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    fn diagnostic(&self) -> Diagnostic<()> {
        let mut labels = vec![Label::primary((), self.span.range()).with_message(&self.detail)];
        if let Some(other) = self.other {
            labels.push(Label::secondary((), other.range()).with_message("first update here"));
        }
        Diagnostic::error()
            .with_message(self.label())
            .with_labels(labels)
    }
}

/// Prints `error` with a pointer into the specification source to stderr.
pub fn report_error(error: &ExecError, name: &str, source: &str) {
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let mut lock = writer.lock();
    if emit(error, name, source, &mut lock).is_err() {
        eprintln!("{error}");
    }
}

/// Renders `error` without colors, e.g., for logs or tests.
pub fn render_error(error: &ExecError, name: &str, source: &str) -> String {
    let mut out = NoColor::new(Vec::new());
    match emit(error, name, source, &mut out) {
        Ok(()) => String::from_utf8_lossy(&out.into_inner()).into_owned(),
        Err(_) => error.to_string(),
    }
}

fn emit(
    error: &ExecError,
    name: &str,
    source: &str,
    writer: &mut dyn WriteColor,
) -> std::result::Result<(), codespan_reporting::files::Error> {
    let file = SimpleFile::new(name, source);
    let config = term::Config::default();
    term::emit(writer, &config, &file, &error.diagnostic())
}
