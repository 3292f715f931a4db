//! Static evaluation of property-only expressions
//!
//! Properties can have several observed values (different branches of a
//! condition, different imports), so evaluation produces every permutation,
//! capped by the caller. Item and metadata references cannot be evaluated
//! without running a build and are rejected.

use std::path::{Component, Path, PathBuf};

use text_size::TextRange;
use thiserror::Error;
use tracing::debug;

use super::ast::{ExprKind, ExprNode, InvocationKind, Literal};
use crate::base::NameMap;

/// Source of property values during evaluation.
pub trait EvaluationContext {
    /// Every known value of a property; empty if the property is unknown.
    fn property_values(&self, name: &str) -> Vec<String>;
}

impl EvaluationContext for NameMap<Vec<String>> {
    fn property_values(&self, name: &str) -> Vec<String> {
        self.get(name).cloned().unwrap_or_default()
    }
}

/// Reasons an expression cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("item and metadata references cannot be evaluated here")]
    ItemsNotPermitted(TextRange),

    #[error("function '{0}' cannot be evaluated")]
    UnsupportedFunction(String),

    #[error("expression has syntax errors")]
    Syntax(TextRange),
}

/// Evaluate `node` to all permutations of its property values.
pub fn evaluate(
    node: &ExprNode,
    cx: &dyn EvaluationContext,
    max_permutations: usize,
) -> Result<Vec<String>, EvaluationError> {
    let limit = max_permutations.max(1);
    let mut values = eval(node, cx, limit)?;
    dedup(&mut values);
    Ok(values)
}

fn dedup(values: &mut Vec<String>) {
    let mut seen = rustc_hash::FxHashSet::default();
    values.retain(|v| seen.insert(v.clone()));
}

fn eval(node: &ExprNode, cx: &dyn EvaluationContext, limit: usize) -> Result<Vec<String>, EvaluationError> {
    match &node.kind {
        ExprKind::Text(text) => Ok(vec![unescape(text)]),
        ExprKind::Concat(parts) => {
            let mut acc = vec![String::new()];
            for part in parts {
                let values = eval(part, cx, limit)?;
                acc = product(&acc, &values, limit);
            }
            Ok(acc)
        }
        ExprKind::List(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(eval(item, cx, limit)?);
            }
            out.truncate(limit);
            Ok(out)
        }
        ExprKind::Property(body) => eval_property(body, cx, limit),
        ExprKind::Quoted(inner) => eval(inner, cx, limit),
        ExprKind::Literal(literal) => Ok(vec![match literal {
            Literal::Int(v) => v.to_string(),
            Literal::Float(v) => v.to_string(),
            Literal::Bool(v) => v.to_string(),
            Literal::Null => String::new(),
        }]),
        ExprKind::Item { .. } | ExprKind::Metadata { .. } => Err(EvaluationError::ItemsNotPermitted(node.range)),
        ExprKind::Error { .. } => Err(EvaluationError::Syntax(node.range)),
        _ => Err(EvaluationError::UnsupportedFunction(format!("{:?}", node.kind))),
    }
}

fn eval_property(body: &ExprNode, cx: &dyn EvaluationContext, limit: usize) -> Result<Vec<String>, EvaluationError> {
    match &body.kind {
        ExprKind::PropertyName(name) => {
            let mut values = cx.property_values(name.as_str());
            if values.is_empty() {
                values.push(String::new());
            }
            values.truncate(limit);
            Ok(values)
        }
        ExprKind::FunctionInvocation {
            kind: InvocationKind::Static,
            target,
            function,
            arguments,
        } => {
            let (ExprKind::ClassReference(class), ExprKind::FunctionName(function)) = (&target.kind, &function.kind)
            else {
                return Err(EvaluationError::Syntax(body.range));
            };
            if !class.matches("MSBuild") {
                return Err(EvaluationError::UnsupportedFunction(format!("[{class}]::{function}")));
            }
            let args: &[ExprNode] = match arguments.as_deref().map(|a| &a.kind) {
                Some(ExprKind::ArgumentList(args)) => args.as_slice(),
                _ => &[],
            };
            let mut combinations = vec![Vec::new()];
            for arg in args {
                let values = eval(arg, cx, limit)?;
                let mut next = Vec::new();
                'outer: for combination in &combinations {
                    for value in &values {
                        if next.len() >= limit {
                            break 'outer;
                        }
                        let mut extended: Vec<String> = combination.clone();
                        extended.push(value.clone());
                        next.push(extended);
                    }
                }
                combinations = next;
            }
            combinations
                .iter()
                .map(|combination| msbuild_function(function.as_str(), combination, cx))
                .collect()
        }
        ExprKind::FunctionInvocation { function, .. } => {
            Err(EvaluationError::UnsupportedFunction(format!("{:?}", function.kind)))
        }
        _ => Err(EvaluationError::Syntax(body.range)),
    }
}

fn product(acc: &[String], values: &[String], limit: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(acc.len() * values.len());
    for prefix in acc {
        for value in values {
            if out.len() >= limit {
                debug!(limit, "evaluation permutations capped");
                return out;
            }
            out.push(format!("{prefix}{value}"));
        }
    }
    out
}

/// The `[MSBuild]::` functions that import paths commonly use.
fn msbuild_function(name: &str, args: &[String], cx: &dyn EvaluationContext) -> Result<String, EvaluationError> {
    let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or("");
    let lower = name.to_ascii_lowercase();
    let value = match lower.as_str() {
        "getdirectorynameoffileabove" => find_file_above(Path::new(&native_path(arg(0))), arg(1))
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default(),
        "getpathoffileabove" => {
            let start = match args.get(1) {
                Some(start) => start.clone(),
                None => cx
                    .property_values("MSBuildThisFileDirectory")
                    .into_iter()
                    .next()
                    .unwrap_or_default(),
            };
            find_file_above(Path::new(&native_path(&start)), arg(0))
                .map(|dir| dir.join(arg(0)).to_string_lossy().into_owned())
                .unwrap_or_default()
        }
        "normalizepath" => join_normalized(args).to_string_lossy().into_owned(),
        "normalizedirectory" => ensure_trailing_slash(&join_normalized(args).to_string_lossy()),
        "ensuretrailingslash" => ensure_trailing_slash(arg(0)),
        _ => return Err(EvaluationError::UnsupportedFunction(format!("[MSBuild]::{name}"))),
    };
    Ok(value)
}

fn join_normalized(parts: &[String]) -> PathBuf {
    let mut path = PathBuf::new();
    for part in parts {
        path.push(native_path(part));
    }
    normalize(&path)
}

fn ensure_trailing_slash(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') || path.ends_with('\\') {
        path.to_string()
    } else {
        format!("{path}{}", std::path::MAIN_SEPARATOR)
    }
}

/// Walk up from `start` looking for `file`; returns the directory containing it.
pub fn find_file_above(start: &Path, file: &str) -> Option<PathBuf> {
    if file.is_empty() {
        return None;
    }
    let mut dir = normalize(start);
    loop {
        if dir.join(file).is_file() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Convert MSBuild's Windows-style separators to the host's.
pub fn native_path(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '/' {
        path.replace('\\', "/")
    } else {
        path.replace('/', "\\")
    }
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Expand MSBuild `%XX` escapes.
pub fn unescape(text: &str) -> String {
    if !text.contains('%') {
        return text.to_string();
    }
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(&[high, low]) = bytes.get(i + 1..i + 3)
            && let (Some(high), Some(low)) = (hex_digit(high), hex_digit(low))
        {
            out.push(high << 4 | low);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).and_then(|d| u8::try_from(d).ok())
}
