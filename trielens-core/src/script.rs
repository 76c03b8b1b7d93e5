//! Script surface for batch-driving the inspector.
//!
//! A small line-oriented language executed with exactly four bound
//! capabilities: the validated mirror facade, the raw entry sequence, the
//! hashing functions and the byte canonicalizer. The sandbox trusts the
//! executed code completely; it is a local inspection convenience, not a
//! security boundary.
//!
//! ```text
//! let pallet  = twox_128("System")
//! let storage = twox_128("Account")
//! repeat 10
//!     let pubkey = sha2_256(i)
//!     insert concat(pallet, storage, pubkey) 0xeeee
//! end
//! ```
//!
//! Statements: `let <name> = <expr>`, `insert <key> <value>`,
//! `remove <key>`, `clear`, `commit`, `raw push <key> <value>`,
//! `repeat <count>` ... `end`. Comments start with `#` or `//`. Inside
//! `repeat`, `i` is bound to the iteration counter. Expressions are hex
//! literals, quoted ASCII strings, integers, variables and the calls
//! `bytes`, `concat`, `sha2_256`, `twox_64`, `twox_128`.
//!
//! After a run, success or failure, the owning session unconditionally
//! commits and re-renders on whatever state resulted; script execution is
//! best-effort, never transactional.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::bytes::ByteInput;
use crate::engine::TrieEngine;
use crate::hash;
use crate::mirror::{Entry, Mirror};

/// Failure raised while parsing or executing a script, carrying the
/// 1-based source line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

type ScriptResult<T> = std::result::Result<T, ScriptError>;

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Int(u64),
    Hex(Vec<u8>),
    Str(String),
    Eq,
    LParen,
    RParen,
    Comma,
}

fn lex(line: &str, line_no: usize) -> ScriptResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => break,
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    break;
                }
                return Err(ScriptError::new(line_no, "unexpected character '/'"));
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => text.push(ch),
                        None => {
                            return Err(ScriptError::new(line_no, "unterminated string literal"))
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() {
                        word.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(hex_part) = word.strip_prefix("0x") {
                    let bytes = hex::decode(hex_part).map_err(|e| {
                        ScriptError::new(line_no, format!("invalid hex literal {word}: {e}"))
                    })?;
                    tokens.push(Token::Hex(bytes));
                } else {
                    let n = word.parse::<u64>().map_err(|_| {
                        ScriptError::new(line_no, format!("invalid integer {word}"))
                    })?;
                    tokens.push(Token::Int(n));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        word.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(word));
            }
            other => {
                return Err(ScriptError::new(
                    line_no,
                    format!("unexpected character {other:?}"),
                ))
            }
        }
    }
    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Int(u64),
    Bytes(Vec<u8>),
    Str(String),
    Var(String),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Let {
        name: String,
        expr: Expr,
        line: usize,
    },
    Insert {
        key: Expr,
        value: Expr,
        line: usize,
    },
    Remove {
        key: Expr,
        line: usize,
    },
    Clear,
    Commit {
        line: usize,
    },
    RawPush {
        key: Expr,
        value: Expr,
        line: usize,
    },
    Repeat {
        count: Expr,
        body: Vec<Stmt>,
        line: usize,
    },
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> ExprParser<'a> {
    fn new(tokens: &'a [Token], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> ScriptResult<&'a Token> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| ScriptError::new(self.line, "unexpected end of statement"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expr(&mut self) -> ScriptResult<Expr> {
        match self.next()? {
            Token::Int(n) => Ok(Expr::Int(*n)),
            Token::Hex(bytes) => Ok(Expr::Bytes(bytes.clone())),
            Token::Str(text) => Ok(Expr::Str(text.clone())),
            Token::Ident(name) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Var(name.clone()));
                }
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                } else {
                    loop {
                        args.push(self.expr()?);
                        match self.next()? {
                            Token::Comma => continue,
                            Token::RParen => break,
                            _ => {
                                return Err(ScriptError::new(
                                    self.line,
                                    "expected ',' or ')' in argument list",
                                ))
                            }
                        }
                    }
                }
                Ok(Expr::Call(name.clone(), args))
            }
            other => Err(ScriptError::new(
                self.line,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    fn finish(&self) -> ScriptResult<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(ScriptError::new(self.line, "trailing tokens after statement"))
        }
    }
}

fn parse(source: &str) -> ScriptResult<Vec<Stmt>> {
    // One frame per open `repeat` block, plus the root frame.
    let mut frames: Vec<(Vec<Stmt>, Option<(Expr, usize)>)> = vec![(Vec::new(), None)];

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let tokens = lex(raw, line_no)?;
        if tokens.is_empty() {
            continue;
        }
        let Token::Ident(head) = &tokens[0] else {
            return Err(ScriptError::new(line_no, "expected a statement keyword"));
        };
        let rest = &tokens[1..];

        let stmt = match head.as_str() {
            "let" => {
                let [Token::Ident(name), Token::Eq, ..] = rest else {
                    return Err(ScriptError::new(line_no, "expected: let <name> = <expr>"));
                };
                let mut parser = ExprParser::new(&rest[2..], line_no);
                let expr = parser.expr()?;
                parser.finish()?;
                Stmt::Let {
                    name: name.clone(),
                    expr,
                    line: line_no,
                }
            }
            "insert" => {
                let mut parser = ExprParser::new(rest, line_no);
                let key = parser.expr()?;
                let value = parser.expr()?;
                parser.finish()?;
                Stmt::Insert {
                    key,
                    value,
                    line: line_no,
                }
            }
            "remove" => {
                let mut parser = ExprParser::new(rest, line_no);
                let key = parser.expr()?;
                parser.finish()?;
                Stmt::Remove { key, line: line_no }
            }
            "clear" => {
                if !rest.is_empty() {
                    return Err(ScriptError::new(line_no, "clear takes no arguments"));
                }
                Stmt::Clear
            }
            "commit" => {
                if !rest.is_empty() {
                    return Err(ScriptError::new(line_no, "commit takes no arguments"));
                }
                Stmt::Commit { line: line_no }
            }
            "raw" => {
                let [Token::Ident(verb), ..] = rest else {
                    return Err(ScriptError::new(line_no, "expected: raw push <key> <value>"));
                };
                if verb != "push" {
                    return Err(ScriptError::new(
                        line_no,
                        format!("unknown raw operation '{verb}'"),
                    ));
                }
                let mut parser = ExprParser::new(&rest[1..], line_no);
                let key = parser.expr()?;
                let value = parser.expr()?;
                parser.finish()?;
                Stmt::RawPush {
                    key,
                    value,
                    line: line_no,
                }
            }
            "repeat" => {
                let mut parser = ExprParser::new(rest, line_no);
                let count = parser.expr()?;
                parser.finish()?;
                frames.push((Vec::new(), Some((count, line_no))));
                continue;
            }
            "end" => {
                if !rest.is_empty() {
                    return Err(ScriptError::new(line_no, "end takes no arguments"));
                }
                match frames.pop() {
                    Some((body, Some((count, line)))) => Stmt::Repeat { count, body, line },
                    _ => return Err(ScriptError::new(line_no, "end without repeat")),
                }
            }
            other => {
                return Err(ScriptError::new(
                    line_no,
                    format!("unknown statement '{other}'"),
                ))
            }
        };

        if let Some((body, _)) = frames.last_mut() {
            body.push(stmt);
        }
    }

    if frames.len() > 1 {
        let line = frames
            .last()
            .and_then(|(_, header)| header.as_ref())
            .map(|(_, line)| *line)
            .unwrap_or(1);
        return Err(ScriptError::new(line, "repeat without end"));
    }
    Ok(frames.pop().map(|(body, _)| body).unwrap_or_default())
}

// ============================================================================
// Interpreter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Int(u64),
    Bytes(Vec<u8>),
}

impl Value {
    fn into_input(self) -> ByteInput {
        match self {
            Value::Int(n) => ByteInput::Int(n),
            Value::Bytes(bytes) => ByteInput::Bytes(bytes),
        }
    }

    fn into_bytes(self, line: usize) -> ScriptResult<Vec<u8>> {
        self.into_input()
            .into_bytes()
            .map_err(|e| ScriptError::new(line, e.to_string()))
    }
}

type Env = HashMap<String, Value>;

fn eval(expr: &Expr, env: &Env, line: usize) -> ScriptResult<Value> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Bytes(bytes) => Ok(Value::Bytes(bytes.clone())),
        Expr::Str(text) => {
            let bytes = ByteInput::from_text(text)
                .into_bytes()
                .map_err(|e| ScriptError::new(line, e.to_string()))?;
            Ok(Value::Bytes(bytes))
        }
        Expr::Var(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::new(line, format!("unknown variable '{name}'"))),
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, env, line)?);
            }
            call(name, values, line)
        }
    }
}

fn call(name: &str, args: Vec<Value>, line: usize) -> ScriptResult<Value> {
    let one = |mut args: Vec<Value>| -> ScriptResult<Vec<u8>> {
        if args.len() != 1 {
            return Err(ScriptError::new(
                line,
                format!("{name} expects exactly one argument"),
            ));
        }
        args.remove(0).into_bytes(line)
    };
    match name {
        "bytes" => Ok(Value::Bytes(one(args)?)),
        "concat" => {
            let mut out = Vec::new();
            for value in args {
                out.extend_from_slice(&value.into_bytes(line)?);
            }
            Ok(Value::Bytes(out))
        }
        "sha2_256" => Ok(Value::Bytes(
            hash::sha2_256(one(args)?)
                .map_err(|e| ScriptError::new(line, e.to_string()))?
                .to_vec(),
        )),
        "twox_64" => Ok(Value::Bytes(
            hash::twox_64(one(args)?)
                .map_err(|e| ScriptError::new(line, e.to_string()))?
                .to_vec(),
        )),
        "twox_128" => Ok(Value::Bytes(
            hash::twox_128(one(args)?)
                .map_err(|e| ScriptError::new(line, e.to_string()))?
                .to_vec(),
        )),
        other => Err(ScriptError::new(line, format!("unknown function '{other}'"))),
    }
}

/// Executes scripts against the bound capability set.
pub struct ScriptSandbox<'a, E> {
    mirror: &'a mut Mirror<E>,
}

impl<'a, E: TrieEngine> ScriptSandbox<'a, E> {
    pub fn new(mirror: &'a mut Mirror<E>) -> Self {
        Self { mirror }
    }

    /// Parse and execute `source`. The owning session is responsible for
    /// the commit and re-render that follow regardless of the outcome.
    pub fn run(&mut self, source: &str) -> ScriptResult<()> {
        let program = parse(source)?;
        debug!(statements = program.len(), "running script");
        let mut env = Env::new();
        self.exec_block(&program, &mut env)
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &mut Env) -> ScriptResult<()> {
        for stmt in stmts {
            self.exec(stmt, env)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt, env: &mut Env) -> ScriptResult<()> {
        match stmt {
            Stmt::Let { name, expr, line } => {
                let value = eval(expr, env, *line)?;
                env.insert(name.clone(), value);
            }
            Stmt::Insert { key, value, line } => {
                let key = eval(key, env, *line)?;
                let value = eval(value, env, *line)?;
                self.mirror
                    .insert(key.into_input(), value.into_input())
                    .map_err(|e| ScriptError::new(*line, e.to_string()))?;
            }
            Stmt::Remove { key, line } => {
                let key = eval(key, env, *line)?;
                self.mirror
                    .remove(key.into_input())
                    .map_err(|e| ScriptError::new(*line, e.to_string()))?;
            }
            Stmt::Clear => self.mirror.clear(),
            Stmt::Commit { line } => {
                self.mirror
                    .commit()
                    .map_err(|e| ScriptError::new(*line, e.to_string()))?;
            }
            Stmt::RawPush { key, value, line } => {
                let key = eval(key, env, *line)?.into_bytes(*line)?;
                let value = eval(value, env, *line)?.into_bytes(*line)?;
                self.mirror.raw().entries.push(Entry { key, value });
            }
            Stmt::Repeat { count, body, line } => {
                let count = match eval(count, env, *line)? {
                    Value::Int(n) => n,
                    Value::Bytes(_) => {
                        return Err(ScriptError::new(*line, "repeat count must be an integer"))
                    }
                };
                let saved = env.get("i").cloned();
                for i in 0..count {
                    env.insert("i".to_string(), Value::Int(i));
                    self.exec_block(body, env)?;
                }
                match saved {
                    Some(value) => env.insert("i".to_string(), value),
                    None => env.remove("i"),
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTrie;

    fn run(source: &str) -> (Mirror<MemoryTrie>, ScriptResult<()>) {
        let mut mirror = Mirror::new(MemoryTrie::new());
        let result = ScriptSandbox::new(&mut mirror).run(source);
        (mirror, result)
    }

    #[test]
    fn insert_with_literals() {
        let (mirror, result) = run("insert 0x1234 0xabcdef\n");
        result.unwrap();
        assert_eq!(mirror.get("0x1234").unwrap(), Some(vec![0xab, 0xcd, 0xef]));
    }

    #[test]
    fn let_binds_variables() {
        let (mirror, result) = run("let key = 0xaabb\ninsert key \"hello\"\n");
        result.unwrap();
        assert_eq!(mirror.get("0xaabb").unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn string_literals_canonicalize_by_prefix() {
        let (mirror, result) = run("insert \"0x01\" \"plain\"\n");
        result.unwrap();
        assert_eq!(mirror.get("0x01").unwrap(), Some(b"plain".to_vec()));
    }

    #[test]
    fn concat_and_hash_compose() {
        let (mirror, result) = run(concat!(
            "let pallet = twox_128(\"System\")\n",
            "let storage = twox_128(\"Account\")\n",
            "insert concat(pallet, storage) 0xeeee\n",
        ));
        result.unwrap();
        let key = format!(
            "0x{}{}",
            "26aa394eea5630e07c48ae0c9558cef7", "b99d880ec681799c0cf30e8886371da9"
        );
        assert_eq!(mirror.get(key.as_str()).unwrap(), Some(vec![0xee, 0xee]));
    }

    #[test]
    fn repeat_binds_the_counter() {
        let (mirror, result) = run(concat!(
            "repeat 10\n",
            "    insert sha2_256(i) 0xee\n",
            "end\n",
        ));
        result.unwrap();
        assert_eq!(mirror.len(), 10);
        let first = crate::hash::sha2_256(0u64).unwrap();
        assert_eq!(mirror.get(first.to_vec()).unwrap(), Some(vec![0xee]));
    }

    #[test]
    fn nested_repeat_restores_counter() {
        let (mirror, result) = run(concat!(
            "repeat 2\n",
            "    repeat 3\n",
            "        insert concat(bytes(i)) 0x01\n",
            "    end\n",
            "    insert sha2_256(i) 0x02\n",
            "end\n",
        ));
        result.unwrap();
        // Inner loop keys 0,1,2 plus outer hashes of 0 and 1.
        assert_eq!(mirror.len(), 5);
    }

    #[test]
    fn remove_and_clear_statements() {
        let (mirror, result) = run(concat!(
            "insert 0x01 0xaa\n",
            "insert 0x02 0xbb\n",
            "remove 0x01\n",
        ));
        result.unwrap();
        assert_eq!(mirror.len(), 1);

        let (mirror, result) = run("insert 0x01 0xaa\nclear\n");
        result.unwrap();
        assert!(mirror.is_empty());
    }

    #[test]
    fn raw_push_bypasses_the_engine() {
        let (mirror, result) = run("raw push 0xfe 0xed\n");
        result.unwrap();
        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.get("0xfe").unwrap(), None);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let (mirror, result) = run(concat!(
            "# leading comment\n",
            "\n",
            "insert 0x01 0xaa  // trailing comment\n",
        ));
        result.unwrap();
        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn errors_carry_the_line_number() {
        let (_, result) = run("insert 0x01 0xaa\nfrobnicate\n");
        let err = result.unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn failure_preserves_prior_statements_effects() {
        let (mirror, result) = run(concat!(
            "insert 0x01 0xaa\n",
            "insert 0x02 0xbb\n",
            "let broken = nope(1)\n",
            "insert 0x03 0xcc\n",
        ));
        assert!(result.is_err());
        // Partial state survives for the session's best-effort commit.
        assert_eq!(mirror.len(), 2);
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let (_, result) = run("insert missing 0x01\n");
        let err = result.unwrap_err();
        assert!(err.message.contains("unknown variable"));
    }

    #[test]
    fn unbalanced_repeat_is_an_error() {
        let (_, result) = run("repeat 3\ninsert 0x01 0x02\n");
        assert!(result.unwrap_err().message.contains("repeat without end"));

        let (_, result) = run("end\n");
        assert!(result.unwrap_err().message.contains("end without repeat"));
    }

    #[test]
    fn oversized_repeat_counter_fails_when_canonicalized() {
        let (_, result) = run("repeat 300\ninsert bytes(i) 0x01\nend\n");
        let err = result.unwrap_err();
        assert!(err.message.contains("does not fit in one byte"));
    }
}
