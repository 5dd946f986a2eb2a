//! Source parser for the generator language
//!
//! This module transforms source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, with layout tokens from
//!   [`indent`])
//! - [`parse`]: The [`parse::Parser`] and its helpers; statement and expression
//!   rules live in `statements` and `expressions`
//! - [`ast`]: AST node definitions
//!
//! # Supported Subset
//!
//! An indentation-based, Python-flavoured language:
//! - Statements: `def`, assignment and augmented assignment to names, `if` /
//!   `elif` / `else`, `while`, `for ... in`, `try` / `except` / `else` /
//!   `finally`, `raise`, `return`, `break`, `continue`, `pass`
//! - Expressions: arithmetic, chained comparisons, `and` / `or` / `not`,
//!   conditional expressions, calls, attribute access, list displays
//! - Suspension: `yield`, `yield expr`, `(yield)` anywhere in an expression,
//!   and `yield from expr`
//! - No classes, closures, keyword arguments, or tuple unpacking
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
mod expressions;
pub mod indent;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{parse_source, ParseError, Parser};
