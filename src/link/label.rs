//! Label classification and keyword filtering for link invocations.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::ExtractorConfig;

static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)^"((?:[^"\\]|\\.)*)"$"#).unwrap());
static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)^'((?:[^'\\]|\\.)*)'$"#).unwrap());

/// What is known about the visible text of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// A quoted string constant, unescaped.
    Literal(String),
    /// A call to a translation helper, as written.
    AlreadyTranslated(String),
    /// Anything evaluated at run time, as written.
    Expression(String),
}

impl Label {
    /// Classifies the raw source of a label argument.
    pub fn classify(raw: &str, config: &ExtractorConfig) -> Label {
        let raw = raw.trim();

        if let Some(caps) = DOUBLE_QUOTED.captures(raw) {
            let inner = &caps[1];
            // Interpolated strings are only known at run time.
            if !inner.contains("#{") {
                return Label::Literal(unescape(inner));
            }
        } else if let Some(caps) = SINGLE_QUOTED.captures(raw) {
            return Label::Literal(unescape(&caps[1]));
        }

        if config
            .translate_helpers
            .iter()
            .any(|helper| is_call_to(raw, helper))
        {
            return Label::AlreadyTranslated(raw.to_string());
        }

        Label::Expression(raw.to_string())
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Label::Literal(_))
    }

    pub fn is_already_translated(&self) -> bool {
        matches!(self, Label::AlreadyTranslated(_))
    }
}

/// `t('.x')`, `t '.x'` and `I18n.t(:x)` are calls to `t`/`I18n.t`;
/// `title` and `t.foo` are not.
fn is_call_to(raw: &str, helper: &str) -> bool {
    let Some(rest) = raw.strip_prefix(helper) else {
        return false;
    };
    match rest.chars().next() {
        Some('(') => true,
        Some(c) if c.is_whitespace() => !rest.trim_start().is_empty(),
        _ => false,
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// A `name: value` style argument of a link invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordArg {
    pub name: String,
    pub value: String,
    /// The argument exactly as written
    pub raw: String,
}

/// Keyword arguments that may be forwarded into the placeholder helper call.
pub fn allowed_keywords<'a>(
    keyword_args: &'a [KeywordArg],
    config: &ExtractorConfig,
) -> Vec<&'a KeywordArg> {
    keyword_args
        .iter()
        .filter(|arg| config.is_allowed_keyword(&arg.name))
        .collect()
}
