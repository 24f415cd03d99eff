#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use treelox as lox;

use lox::ast::{ExprId, Stmt};
use lox::error::LoxError;
use lox::interpreter::{Interpreter, Output};
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

/// Output sink that stores printed lines instead of writing to stdout.
#[derive(Default)]
pub struct CaptureOutput {
    pub lines: Vec<String>,
}

impl Output for CaptureOutput {
    fn print(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

/// Scans and parses `source`, panicking on any static error.
pub fn parse_source(source: &'static str) -> Vec<Stmt<'static>> {
    let tokens: Vec<Token<'static>> = Scanner::new(source)
        .collect::<Result<Vec<_>, _>>()
        .expect("scan failed");
    let tokens: &'static [Token<'static>] = Vec::leak(tokens);

    Parser::new(tokens).parse().expect("parse failed")
}

/// Parses `source` and hands back the accumulated syntax errors, panicking
/// if it parses cleanly.
pub fn parse_errors(source: &'static str) -> Vec<LoxError> {
    let tokens: Vec<Token<'static>> = Scanner::new(source)
        .collect::<Result<Vec<_>, _>>()
        .expect("scan failed");
    let tokens: &'static [Token<'static>] = Vec::leak(tokens);

    Parser::new(tokens)
        .parse()
        .expect_err("expected syntax errors")
}

/// Resolves a parsed program, panicking on any resolution error.
pub fn resolve_source(statements: &[Stmt<'static>]) -> HashMap<ExprId, usize> {
    Resolver::new()
        .resolve(statements)
        .expect("resolution failed")
}

/// Resolves `source` and hands back the accumulated resolution errors,
/// panicking if it resolves cleanly.
pub fn resolve_errors(source: &'static str) -> Vec<LoxError> {
    let statements = parse_source(source);

    Resolver::new()
        .resolve(&statements)
        .expect_err("expected resolution errors")
}

/// Runs a program end to end and returns everything it printed.
pub fn run(source: &'static str) -> Vec<String> {
    try_run(source).expect("program faulted")
}

/// Runs a program end to end, returning the printed lines or the runtime
/// fault that stopped it.
pub fn try_run(source: &'static str) -> Result<Vec<String>, LoxError> {
    let statements = parse_source(source);
    let locals = resolve_source(&statements);

    let sink = Rc::new(RefCell::new(CaptureOutput::default()));
    let mut interpreter = Interpreter::with_output(sink.clone());
    interpreter.add_locals(locals);

    interpreter.interpret(&statements)?;

    let lines = sink.borrow().lines.clone();

    Ok(lines)
}
