//! Recursive-descent parser for pointcut expressions.
//!
//! ```text
//! expr      := or
//! or        := and (("||" | "or") and)*
//! and       := unary (("&&" | "and") unary)*
//! unary     := ("!" | "not") unary | "(" expr ")" | predicate | signature
//! predicate := execution(sig) | within(path) | has-annotation(glob) | @annotation(glob)
//!            | public | private | crate | restricted | async | unsafe
//!            | name(glob | /regex/) | args(N | N.. | N..M) | receiver(ref | mut | value | none)
//!            | returns(type) | implements(glob) | pointcut(name)
//! signature := [vis] [module::][Type::]method(params) [-> type]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::expr::{ArgsRange, ParamsPattern, Pointcut, SignaturePattern, VisibilityFilter};
use super::pattern::{ModulePattern, NamePattern, TypePattern};
use super::PointcutEvalError;
use crate::reflect::Receiver;

/// Predicates that take a parenthesised argument.
const CALL_PREDICATES: &[&str] = &[
    "execution",
    "within",
    "has-annotation",
    "@annotation",
    "name",
    "args",
    "receiver",
    "returns",
    "implements",
    "pointcut",
];

/// Parses pointcut expressions, resolving `pointcut(name)` references
/// against a table of named expressions.
///
/// Each named pointcut is parsed at most once per parser and shared between
/// every expression that references it.
#[derive(Debug)]
pub struct PointcutParser<'n> {
    named: &'n BTreeMap<String, String>,
    resolved: HashMap<String, Arc<Pointcut>>,
    stack: Vec<String>,
}

impl<'n> PointcutParser<'n> {
    /// Creates a parser over a table of named pointcuts.
    #[must_use]
    pub fn new(named: &'n BTreeMap<String, String>) -> Self {
        Self {
            named,
            resolved: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Parses one expression.
    ///
    /// # Errors
    ///
    /// Returns an error for syntax errors, unknown predicates, invalid
    /// patterns, and unknown or cyclic named pointcuts.
    pub fn parse(&mut self, text: &str) -> Result<Pointcut, PointcutEvalError> {
        if text.trim().is_empty() {
            return Err(PointcutEvalError::Empty);
        }
        let mut cursor = Cursor::new(text);
        let expr = self.or(&mut cursor)?;
        cursor.skip_ws();
        if !cursor.at_end() {
            return Err(cursor.error("end of expression"));
        }
        Ok(expr)
    }

    fn resolve(&mut self, name: &str) -> Result<Arc<Pointcut>, PointcutEvalError> {
        if let Some(expr) = self.resolved.get(name) {
            return Ok(Arc::clone(expr));
        }
        if self.stack.iter().any(|n| n == name) {
            let mut chain = self.stack.clone();
            chain.push(name.to_string());
            return Err(PointcutEvalError::Cycle { chain });
        }
        let named = self.named;
        let text = named
            .get(name)
            .ok_or_else(|| PointcutEvalError::UnknownNamed {
                name: name.to_string(),
            })?;

        self.stack.push(name.to_string());
        let parsed = self.parse(text);
        self.stack.pop();

        let expr = Arc::new(parsed?);
        self.resolved.insert(name.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    fn or(&mut self, c: &mut Cursor<'_>) -> Result<Pointcut, PointcutEvalError> {
        let mut items = vec![self.and(c)?];
        while c.eat("||") || c.eat_word("or") {
            items.push(self.and(c)?);
        }
        Ok(collapse(items, Pointcut::Or))
    }

    fn and(&mut self, c: &mut Cursor<'_>) -> Result<Pointcut, PointcutEvalError> {
        let mut items = vec![self.unary(c)?];
        while c.eat("&&") || c.eat_word("and") {
            items.push(self.unary(c)?);
        }
        Ok(collapse(items, Pointcut::And))
    }

    fn unary(&mut self, c: &mut Cursor<'_>) -> Result<Pointcut, PointcutEvalError> {
        c.skip_ws();
        if c.eat("!") || c.eat_word("not") {
            return Ok(Pointcut::Not(Box::new(self.unary(c)?)));
        }
        if c.eat("(") {
            let inner = self.or(c)?;
            if !c.eat(")") {
                return Err(c.error("`)`"));
            }
            return Ok(inner);
        }
        if c.at_end() {
            return Err(c.error("a predicate"));
        }
        self.atom(c)
    }

    fn atom(&mut self, c: &mut Cursor<'_>) -> Result<Pointcut, PointcutEvalError> {
        let start = c.pos;
        let Some(word) = c.word() else {
            c.pos = start;
            return signature(c);
        };

        if CALL_PREDICATES.contains(&word) {
            c.skip_ws();
            if c.peek() != Some('(') {
                return Err(c.error(&format!("`(` after `{word}`")));
            }
            let arg = c.balanced()?.trim();
            return self.call(word, arg);
        }

        let bare = match word {
            "public" => Some(Pointcut::Visibility(VisibilityFilter::Public)),
            "private" => Some(Pointcut::Visibility(VisibilityFilter::Private)),
            "crate" => Some(Pointcut::Visibility(VisibilityFilter::Crate)),
            "restricted" => Some(Pointcut::Visibility(VisibilityFilter::Restricted)),
            "async" => Some(Pointcut::Async),
            "unsafe" => Some(Pointcut::Unsafe),
            _ => None,
        };
        if c.at_operand_end() {
            return bare.ok_or_else(|| PointcutEvalError::UnknownPredicate {
                name: word.to_string(),
                expr: c.src.to_string(),
            });
        }
        if word.starts_with('@') || word.contains('-') {
            return Err(PointcutEvalError::UnknownPredicate {
                name: word.to_string(),
                expr: c.src.to_string(),
            });
        }

        c.pos = start;
        signature(c)
    }

    fn call(&mut self, word: &str, arg: &str) -> Result<Pointcut, PointcutEvalError> {
        Ok(match word {
            "execution" => Pointcut::Execution(parse_signature(arg)?),
            "within" => Pointcut::Within(ModulePattern::new(arg)?),
            "has-annotation" | "@annotation" => {
                Pointcut::HasAnnotation(NamePattern::new(arg.trim_start_matches('@'))?)
            }
            "name" => Pointcut::Name(NamePattern::new(arg)?),
            "args" => Pointcut::Args(parse_args(arg)?),
            "receiver" => Pointcut::Receiver(match arg {
                "ref" | "&self" => Receiver::Ref,
                "mut" | "&mut self" => Receiver::RefMut,
                "value" | "self" => Receiver::Value,
                "none" => Receiver::None,
                other => {
                    return Err(PointcutEvalError::InvalidPattern {
                        pattern: other.to_string(),
                        reason: "expected one of: ref, mut, value, none".to_string(),
                    })
                }
            }),
            "returns" => Pointcut::Returns(TypePattern::new(arg)?),
            "implements" => Pointcut::Implements(NamePattern::new(arg)?),
            "pointcut" => Pointcut::Named {
                name: arg.to_string(),
                expr: self.resolve(arg)?,
            },
            other => {
                return Err(PointcutEvalError::UnknownPredicate {
                    name: other.to_string(),
                    expr: arg.to_string(),
                })
            }
        })
    }
}

/// Parses an expression that may not reference named pointcuts.
///
/// # Errors
///
/// See [`PointcutParser::parse`].
pub fn parse(text: &str) -> Result<Pointcut, PointcutEvalError> {
    static NONE: BTreeMap<String, String> = BTreeMap::new();
    PointcutParser::new(&NONE).parse(text)
}

fn collapse(mut items: Vec<Pointcut>, wrap: fn(Vec<Pointcut>) -> Pointcut) -> Pointcut {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

/// Reads a bare signature starting at the cursor.
fn signature(c: &mut Cursor<'_>) -> Result<Pointcut, PointcutEvalError> {
    let start = c.pos;
    if c.rest().starts_with("pub(crate)") {
        c.pos += "pub(crate)".len();
    }
    loop {
        match c.peek() {
            Some('(') => break,
            Some(')') | None => return Err(c.error("a signature with `(`")),
            _ if c.rest().starts_with("&&") || c.rest().starts_with("||") => {
                return Err(c.error("a signature with `(`"));
            }
            Some(ch) => c.pos += ch.len_utf8(),
        }
    }
    c.balanced()?;

    let before_arrow = c.pos;
    c.skip_ws();
    if c.eat("->") {
        c.skip_ws();
        c.type_text();
    } else {
        c.pos = before_arrow;
    }

    Ok(Pointcut::Execution(parse_signature(&c.src[start..c.pos])?))
}

/// Parses `[vis] [module::][Type::]method(params) [-> type]`.
fn parse_signature(text: &str) -> Result<SignaturePattern, PointcutEvalError> {
    let text = text.trim();
    let invalid = |reason: &str| PointcutEvalError::InvalidPattern {
        pattern: text.to_string(),
        reason: reason.to_string(),
    };

    let (visibility, rest) = split_visibility(text);

    let open = rest.find('(').ok_or_else(|| invalid("missing parameter list"))?;
    let head = rest[..open].trim();
    let close = matching_paren(rest, open).ok_or_else(|| invalid("unbalanced `(`"))?;
    let params = parse_params(&rest[open + 1..close])?;

    let tail = rest[close + 1..].trim();
    let returns = if tail.is_empty() {
        None
    } else {
        let ty = tail
            .strip_prefix("->")
            .ok_or_else(|| invalid("expected `->` after parameter list"))?;
        Some(TypePattern::new(ty)?)
    };

    if head.is_empty() {
        return Err(invalid("missing method name"));
    }
    let mut segments: Vec<&str> = head.split("::").map(str::trim).collect();
    let method = NamePattern::new(segments.pop().unwrap_or_default())?;

    let (module, class) = match segments.as_slice() {
        [] => (None, None),
        [only] if *only == "**" => (Some(ModulePattern::new("**")?), None),
        [only] => (None, Some(NamePattern::new(only)?)),
        [.., last] if *last == "**" => (Some(ModulePattern::new(&segments.join("::"))?), None),
        [module @ .., last] => (
            Some(ModulePattern::new(&module.join("::"))?),
            Some(NamePattern::new(last)?),
        ),
    };

    Ok(SignaturePattern {
        visibility,
        module,
        class,
        method,
        params,
        returns,
    })
}

fn split_visibility(text: &str) -> (Option<VisibilityFilter>, &str) {
    if let Some(rest) = text.strip_prefix("pub(crate)") {
        return (Some(VisibilityFilter::Crate), rest.trim_start());
    }
    let Some((first, rest)) = text.split_once(char::is_whitespace) else {
        return (None, text);
    };
    let filter = match first {
        "*" => VisibilityFilter::Any,
        "pub" | "public" => VisibilityFilter::Public,
        "private" => VisibilityFilter::Private,
        "crate" => VisibilityFilter::Crate,
        "restricted" => VisibilityFilter::Restricted,
        _ => return (None, text),
    };
    let rest = rest.trim_start();
    // `* (..)` would leave no method; keep `*` as the method glob then.
    if rest.starts_with('(') {
        return (None, text);
    }
    (Some(filter), rest)
}

fn parse_params(inner: &str) -> Result<ParamsPattern, PointcutEvalError> {
    let inner = inner.trim();
    match inner {
        "" => return Ok(ParamsPattern::Exact(Vec::new())),
        "*" | ".." => return Ok(ParamsPattern::Any),
        _ => {}
    }

    let mut parts = split_top_level(inner);
    let open_ended = parts.last().is_some_and(|p| *p == "..");
    if open_ended {
        parts.pop();
    }
    let types = parts
        .into_iter()
        .map(|p| {
            if p == ".." {
                Err(PointcutEvalError::InvalidPattern {
                    pattern: inner.to_string(),
                    reason: "`..` is only allowed last".to_string(),
                })
            } else {
                TypePattern::new(p)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if open_ended {
        ParamsPattern::Prefix(types)
    } else {
        ParamsPattern::Exact(types)
    })
}

fn parse_args(arg: &str) -> Result<ArgsRange, PointcutEvalError> {
    let invalid = || PointcutEvalError::InvalidPattern {
        pattern: arg.to_string(),
        reason: "expected N, N.., or N..M".to_string(),
    };
    let number = |s: &str| s.trim().parse::<usize>().map_err(|_| invalid());

    let range = match arg.split_once("..") {
        None => {
            let n = number(arg)?;
            ArgsRange {
                min: n,
                max: Some(n),
            }
        }
        Some((min, max)) => {
            let max = max.trim_start_matches('=');
            ArgsRange {
                min: if min.trim().is_empty() { 0 } else { number(min)? },
                max: if max.trim().is_empty() {
                    None
                } else {
                    Some(number(max)?)
                },
            }
        }
    };
    if range.max.is_some_and(|max| max < range.min) {
        return Err(invalid());
    }
    Ok(range)
}

/// Splits on commas outside `<>`, `()` and `[]`.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut prev = ' ';
    for (i, ch) in text.char_indices() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' if prev != '-' => depth -= 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        prev = ch;
    }
    parts.push(text[start..].trim());
    parts
}

/// Byte index of the `)` matching the `(` at `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Character cursor over the expression text.
struct Cursor<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        let boundary = rest
            .get(word.len()..)
            .map_or(false, |after| !after.starts_with(is_word_char));
        if rest.starts_with(word) && boundary {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    /// Reads `[@A-Za-z_][A-Za-z0-9_-]*`.
    fn word(&mut self) -> Option<&'s str> {
        self.skip_ws();
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_alphabetic() || c == '_' || c == '@' => {}
            _ => return None,
        }
        let end = chars
            .find(|(_, c)| !is_word_char(*c))
            .map_or(rest.len(), |(i, _)| i);
        // A word directly followed by `::` is a path, not a predicate.
        if rest[end..].starts_with("::") {
            return None;
        }
        self.pos += end;
        Some(&rest[..end])
    }

    /// True if the next token ends the current operand.
    fn at_operand_end(&mut self) -> bool {
        let save = self.pos;
        self.skip_ws();
        let rest = self.rest();
        let end = rest.is_empty()
            || rest.starts_with("&&")
            || rest.starts_with("||")
            || rest.starts_with(')');
        let word_op = self.eat_word("and") || self.eat_word("or");
        self.pos = save;
        end || word_op
    }

    /// Consumes `( ... )` and returns the text inside.
    ///
    /// A `/regex/` argument is read up to its closing `/` so parentheses
    /// inside it need not balance.
    fn balanced(&mut self) -> Result<&'s str, PointcutEvalError> {
        let open = self.pos;
        let inner_start = open + 1;
        let inner = &self.src[inner_start..];
        let inner_trimmed = inner.trim_start();

        if let Some(body) = inner_trimmed.strip_prefix('/') {
            let lead = inner.len() - inner_trimmed.len() + 1;
            for (i, _) in body.match_indices('/') {
                let after = body[i + 1..].trim_start();
                if after.starts_with(')') {
                    let close = inner_start + lead + i + 1 + (body[i + 1..].len() - after.len());
                    self.pos = close + 1;
                    return Ok(&self.src[inner_start..close]);
                }
            }
            return Err(self.error("closing `/` of the regex"));
        }

        match matching_paren(self.src, open) {
            Some(close) => {
                self.pos = close + 1;
                Ok(&self.src[inner_start..close])
            }
            None => Err(self.error("`)`")),
        }
    }

    /// Consumes a return type up to the end of the operand.
    fn type_text(&mut self) {
        let mut depth = 0i32;
        let mut prev = ' ';
        while let Some(ch) = self.peek() {
            if depth == 0 {
                if ch == ')' || self.rest().starts_with("&&") || self.rest().starts_with("||") {
                    break;
                }
                if ch.is_whitespace() {
                    let save = self.pos;
                    if self.at_operand_end() {
                        self.pos = save;
                        break;
                    }
                }
            }
            match ch {
                '<' | '(' | '[' => depth += 1,
                '>' if prev != '-' => depth -= 1,
                ')' | ']' => depth -= 1,
                _ => {}
            }
            prev = ch;
            self.pos += ch.len_utf8();
        }
        // Trailing whitespace belongs to the next operand.
        let consumed = &self.src[..self.pos];
        self.pos = consumed.trim_end().len();
    }

    fn error(&self, expected: &str) -> PointcutEvalError {
        PointcutEvalError::Syntax {
            expr: self.src.to_string(),
            offset: self.pos,
            expected: expected.to_string(),
            found: self
                .peek()
                .map_or_else(|| "end of input".to_string(), |c| format!("`{c}`")),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}
