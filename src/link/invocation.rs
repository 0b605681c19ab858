//! Link helper invocation parsing
//!
//! Recognises `link_to "Label", target, class: "x"` and the parenthesised
//! `link_to("Label", target)` form, and splits the argument list into label,
//! target and keyword arguments.
//!
//! The splitter is a single pass over the argument text that only tracks
//! string literals (including `#{...}` interpolation inside double quotes)
//! and `()`, `[]`, `{}` nesting. Commas at nesting depth zero separate
//! arguments; nothing is evaluated.
//!
//! A call wrapped in an output helper (`raw link_to ...`, `h(link_to ...)`)
//! is unwrapped first. A call guarded by a trailing `if`/`unless` modifier
//! is not an invocation.

use regex::Regex;
use std::sync::LazyLock;

use super::label::{KeywordArg, Label};
use crate::config::ExtractorConfig;
use crate::error::InvocationError;

static BLOCK_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)do(?:\s*\|[^|]*\|)?$").unwrap());

static MODIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:if|unless)\b").unwrap());

static KEYWORD_FORMS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // class: "x"
        Regex::new(r"(?s)^([A-Za-z_]\w*[?!]?):([^:].*)$").unwrap(),
        // :class => "x"
        Regex::new(r"(?s)^:([A-Za-z_]\w*[?!]?)\s*=>(.*)$").unwrap(),
        // "data-x": "y" or "data-x" => "y"
        Regex::new(r#"(?s)^"([^"]*)"\s*(?::|=>)(.*)$"#).unwrap(),
        // 'data-x' => "y"
        Regex::new(r"(?s)^'([^']*)'\s*=>(.*)$").unwrap(),
    ]
});

/// One parsed call to the link helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub label: Label,
    pub target: Option<String>,
    pub keyword_args: Vec<KeywordArg>,
    /// Every argument as written, in order
    pub arguments: Vec<String>,
}

impl Invocation {
    /// The call rewritten in parenthesised form with all of its original
    /// arguments, e.g. `link_to(current_user.name, some_url, class: "x")`.
    pub fn verbatim(&self, helper: &str) -> String {
        format!("{}({})", helper, self.arguments.join(", "))
    }
}

#[derive(Debug)]
enum Frame {
    Quote(char),
    Interpolation,
    Bracket(char),
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

#[derive(Debug, Default)]
struct Scanned {
    /// Byte offsets of commas at depth zero
    commas: Vec<usize>,
    /// Byte offset of the closing `)` when scanning up to one
    close: Option<usize>,
    /// Byte offset of an `if`/`unless` modifier at depth zero
    modifier: Option<usize>,
}

/// Scans `input` for the top-level structure of an argument list.
///
/// With `until_close` set, the scan stops at the first `)` at depth zero and
/// records its offset; reaching the end without one is an error.
fn scan(input: &str, until_close: bool) -> Result<Scanned, InvocationError> {
    let mut scanned = Scanned::default();
    let mut stack: Vec<(Frame, usize)> = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if let Some((Frame::Quote(quote), _)) = stack.last() {
            let quote = *quote;
            if c == '\\' {
                chars.next();
            } else if c == quote {
                stack.pop();
            } else if quote == '"' && c == '#' && chars.peek().map(|(_, n)| *n) == Some('{') {
                chars.next();
                stack.push((Frame::Interpolation, offset));
            }
            continue;
        }

        match c {
            '"' | '\'' => stack.push((Frame::Quote(c), offset)),
            '(' | '[' | '{' => stack.push((Frame::Bracket(c), offset)),
            ')' | ']' | '}' => match stack.last() {
                Some((Frame::Bracket(open), _)) if closer(*open) == c => {
                    stack.pop();
                }
                Some((Frame::Interpolation, _)) if c == '}' => {
                    stack.pop();
                }
                None if until_close && c == ')' => {
                    scanned.close = Some(offset);
                    return Ok(scanned);
                }
                _ => return Err(InvocationError::UnexpectedClose { close: c, offset }),
            },
            ',' if stack.is_empty() => scanned.commas.push(offset),
            'i' | 'u'
                if stack.is_empty()
                    && scanned.modifier.is_none()
                    && input[..offset].ends_with(char::is_whitespace)
                    && MODIFIER.is_match(&input[offset..]) =>
            {
                scanned.modifier = Some(offset);
            }
            _ => {}
        }
    }

    match stack.pop() {
        Some((Frame::Quote(_), offset)) => Err(InvocationError::UnterminatedString { offset }),
        Some((Frame::Bracket(open), offset)) => {
            Err(InvocationError::UnclosedBracket { open, offset })
        }
        Some((Frame::Interpolation, offset)) => {
            Err(InvocationError::UnclosedBracket { open: '{', offset })
        }
        None if until_close => Err(InvocationError::UnclosedBracket {
            open: '(',
            offset: 0,
        }),
        None => Ok(scanned),
    }
}

/// Strips output helpers wrapped around the code, `raw link_to "a", b` and
/// `raw(link_to "a", b)` alike. Code the helpers do not wrap completely is
/// returned as is.
fn unwrap_helpers<'a>(code: &'a str, config: &ExtractorConfig) -> &'a str {
    let mut code = code.trim();
    'peel: loop {
        for helper in &config.wrapper_helpers {
            let Some(rest) = code.strip_prefix(helper.as_str()) else {
                continue;
            };
            if let Some(inner) = rest.strip_prefix('(') {
                if let Ok(Scanned {
                    close: Some(close), ..
                }) = scan(inner, true)
                {
                    if inner[close + 1..].trim().is_empty() {
                        code = inner[..close].trim();
                        continue 'peel;
                    }
                }
            } else if rest.starts_with(char::is_whitespace) {
                code = rest.trim_start();
                continue 'peel;
            }
        }
        return code;
    }
}

/// Splits an argument list on top-level commas.
///
/// Commas inside string literals or nested brackets do not separate
/// arguments. Each argument is returned trimmed.
pub fn split_arguments(input: &str) -> Result<Vec<String>, InvocationError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    let commas = scan(input, false)?.commas;
    let mut arguments = Vec::with_capacity(commas.len() + 1);
    let mut start = 0;
    for comma in commas {
        arguments.push(input[start..comma].trim().to_string());
        start = comma + 1;
    }
    let last = input[start..].trim();
    // A trailing comma does not introduce an argument.
    if !last.is_empty() {
        arguments.push(last.to_string());
    }
    Ok(arguments)
}

fn parse_keyword(argument: &str) -> Option<KeywordArg> {
    KEYWORD_FORMS.iter().find_map(|form| {
        form.captures(argument).map(|caps| KeywordArg {
            name: caps[1].to_string(),
            value: caps[2].trim().to_string(),
            raw: argument.to_string(),
        })
    })
}

/// Parses the source of one code segment as a link helper invocation.
///
/// # Returns
///
/// - `Ok(Some(Invocation))` if the code is a call to the link helper
/// - `Ok(None)` if the code is something else: an unrelated expression, a
///   differently named helper (`link_to_if`), a block-form call or a call
///   guarded by a trailing `if`/`unless`
/// - `Err(InvocationError)` if the code calls the link helper but its
///   argument list cannot be split
pub fn parse_invocation(
    code: &str,
    config: &ExtractorConfig,
) -> Result<Option<Invocation>, InvocationError> {
    let code = unwrap_helpers(code, config);
    let Some(rest) = code.strip_prefix(config.link_helper.as_str()) else {
        return Ok(None);
    };

    let args = match rest.chars().next() {
        Some('(') => {
            let inner = &rest[1..];
            let Some(close) = scan(inner, true)?.close else {
                return Err(InvocationError::UnclosedBracket { open: '(', offset: 0 });
            };
            if !inner[close + 1..].trim().is_empty() {
                // `link_to(...).html_safe`, `link_to(...) do`
                return Ok(None);
            }
            &inner[..close]
        }
        Some(c) if c.is_whitespace() => {
            let args = rest.trim();
            if BLOCK_OPENER.is_match(args) || scan(args, false)?.modifier.is_some() {
                return Ok(None);
            }
            args
        }
        None => return Err(InvocationError::MissingLabel),
        _ => return Ok(None),
    };

    let arguments = split_arguments(args)?;
    let mut positional = Vec::new();
    let mut keyword_args = Vec::new();
    for argument in &arguments {
        match parse_keyword(argument) {
            Some(keyword) => keyword_args.push(keyword),
            // Positional arguments end at the first keyword.
            None if keyword_args.is_empty() => positional.push(argument.clone()),
            None => {}
        }
    }

    let mut positional = positional.into_iter();
    let label = positional.next().ok_or(InvocationError::MissingLabel)?;

    Ok(Some(Invocation {
        label: Label::classify(&label, config),
        target: positional.next(),
        keyword_args,
        arguments,
    }))
}
