//! Line-oriented parser for kernel templates

use std::mem;

use super::program::{Operand, Program, Stmt, UpdateOp};
use crate::traits::CompileError;

const KEYWORDS: &[&str] = &["let", "repeat", "return", "count", "random"];

/// Deepest `repeat` nesting a template may use; execution recurses per level
pub(crate) const MAX_BLOCK_DEPTH: usize = 64;

/// An open `repeat` block: statements collected before it, its count, and
/// the line it opened on
struct OpenBlock {
    outer: Vec<Stmt>,
    times: Operand,
    line: usize,
}

#[derive(Default)]
struct Parser {
    names: Vec<String>,
    current: Vec<Stmt>,
    open: Vec<OpenBlock>,
    ret: Option<usize>,
}

pub(crate) fn parse(source: &str) -> Result<Program, CompileError> {
    let mut parser = Parser::default();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let text = raw.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }
        if parser.ret.is_some() {
            return Err(syntax(line, "statement after `return`"));
        }
        let tokens: Vec<&str> = text.split_whitespace().collect();
        parser.statement(line, &tokens)?;
    }

    if let Some(block) = parser.open.last() {
        return Err(CompileError::UnbalancedBlock { line: block.line });
    }
    let ret = parser.ret.ok_or(CompileError::MissingReturn)?;

    Ok(Program {
        slots: parser.names.len().max(1),
        body: parser.current,
        ret,
    })
}

impl Parser {
    fn statement(&mut self, line: usize, tokens: &[&str]) -> Result<(), CompileError> {
        match tokens {
            ["let", name, "=", value] => {
                let value = self.operand(line, value)?;
                let slot = self.declare(line, name)?;
                self.current.push(Stmt::Let { slot, value });
            }
            ["repeat", times, "{"] => {
                if self.open.len() >= MAX_BLOCK_DEPTH {
                    return Err(syntax(
                        line,
                        &format!("blocks nested deeper than {MAX_BLOCK_DEPTH} levels"),
                    ));
                }
                let times = self.operand(line, times)?;
                self.open.push(OpenBlock {
                    outer: mem::take(&mut self.current),
                    times,
                    line,
                });
            }
            ["}"] => {
                let block = self
                    .open
                    .pop()
                    .ok_or(CompileError::UnbalancedBlock { line })?;
                let body = mem::replace(&mut self.current, block.outer);
                self.current.push(Stmt::Repeat {
                    times: block.times,
                    body,
                });
            }
            ["return", name] => {
                if !self.open.is_empty() {
                    return Err(syntax(line, "`return` inside a block"));
                }
                self.ret = Some(self.lookup(line, name)?);
            }
            [name, op, value] => {
                let op = match *op {
                    "+=" => UpdateOp::Add,
                    "-=" => UpdateOp::Sub,
                    "*=" => UpdateOp::Mul,
                    "^=" => UpdateOp::Xor,
                    other => return Err(syntax(line, &format!("unknown operator `{other}`"))),
                };
                let slot = self.lookup(line, name)?;
                let value = self.operand(line, value)?;
                self.current.push(Stmt::Update { slot, op, value });
            }
            _ => {
                return Err(syntax(
                    line,
                    &format!("unrecognized statement `{}`", tokens.join(" ")),
                ))
            }
        }
        Ok(())
    }

    fn operand(&self, line: usize, token: &str) -> Result<Operand, CompileError> {
        match token {
            "count" => Ok(Operand::Count),
            "random" => Ok(Operand::Random),
            _ => {
                if let Ok(value) = token.parse::<i64>() {
                    return Ok(Operand::Const(value));
                }
                self.lookup(line, token).map(Operand::Var)
            }
        }
    }

    fn declare(&mut self, line: usize, name: &str) -> Result<usize, CompileError> {
        if !is_identifier(name) {
            return Err(syntax(line, &format!("invalid variable name `{name}`")));
        }
        if let Some(slot) = self.names.iter().position(|n| n == name) {
            return Ok(slot);
        }
        self.names.push(name.to_string());
        Ok(self.names.len() - 1)
    }

    fn lookup(&self, line: usize, name: &str) -> Result<usize, CompileError> {
        if !is_identifier(name) {
            return Err(syntax(line, &format!("invalid operand `{name}`")));
        }
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| CompileError::UnknownIdentifier {
                line,
                name: name.to_string(),
            })
    }
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    head_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&token)
}

fn syntax(line: usize, message: &str) -> CompileError {
    CompileError::Syntax {
        line,
        message: message.to_string(),
    }
}
