//! String strategy.
//!
//! Format constraints take priority over plain length synthesis, highest
//! first: email, uuid, url, pattern, then generic length / not-blank.
//! Pattern support covers a small canonical set of regexes; anything else
//! falls back to a literal placeholder, which is a documented limitation.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::constraint::{Constraint, ConstraintKind};
use crate::context::GenerationContext;
use crate::error::GenError;
use crate::request::GenerationRequest;
use crate::value::Value;

/// Buffer added above the minimum when no upper bound is declared.
const UNBOUNDED_PAD: usize = 16;

/// Longest "a"-repeat emitted as a boundary value.
const REPEAT_CAP: usize = 1_000;

const DEFAULT_DOMAINS: &[&str] = &["example.com", "example.org", "mail.test"];

/// Effective length interval: `StringLength` intersected with `NotBlank`.
fn length_bounds(request: &GenerationRequest) -> (usize, Option<usize>) {
    let mut min = 0;
    let mut declared_max = None;
    if let Some(Constraint::StringLength { min: lo, max: hi }) =
        request.find(ConstraintKind::StringLength)
    {
        min = *lo;
        declared_max = *hi;
    }
    if request.has(ConstraintKind::NotBlank) {
        min = min.max(1);
    }
    (min, declared_max)
}

fn working_max(min: usize, declared_max: Option<usize>) -> usize {
    declared_max.unwrap_or(min + UNBOUNDED_PAD).max(min)
}

fn random_lowercase(ctx: &GenerationContext, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'a' + u8::try_from(ctx.choose_index(26)).unwrap_or(0)))
        .collect()
}

fn random_digits(ctx: &GenerationContext, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + u8::try_from(ctx.choose_index(10)).unwrap_or(0)))
        .collect()
}

fn random_uppercase(ctx: &GenerationContext, len: usize) -> String {
    random_lowercase(ctx, len).to_ascii_uppercase()
}

fn random_word(ctx: &GenerationContext, len: usize) -> String {
    const WORD: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789_";
    (0..len)
        .map(|_| char::from(WORD[ctx.choose_index(WORD.len())]))
        .collect()
}

/// Domain pool for email synthesis: the allow list, or the default list,
/// minus blocked entries.
fn email_domains(allow: &[String], block: &[String]) -> Vec<String> {
    let pool: Vec<String> = if allow.is_empty() {
        DEFAULT_DOMAINS.iter().map(ToString::to_string).collect()
    } else {
        allow.to_vec()
    };
    let filtered: Vec<String> = pool
        .iter()
        .filter(|d| !block.contains(d))
        .cloned()
        .collect();
    if filtered.is_empty() {
        pool
    } else {
        filtered
    }
}

fn generate_email(
    allow: &[String],
    block: &[String],
    min: usize,
    max: usize,
    ctx: &GenerationContext,
) -> String {
    let domains = email_domains(allow, block);
    let domain = &domains[ctx.choose_index(domains.len())];
    let overhead = domain.len() + 1;
    if max < overhead + 1 {
        // Infeasible length budget: shortest well-formed fallback.
        return format!("a@{domain}");
    }
    let lo = min.saturating_sub(overhead).max(1);
    let hi = (max - overhead).min(lo + UNBOUNDED_PAD);
    let local_len = ctx.gen_range_usize(lo.min(hi), hi);
    format!("{}@{domain}", random_lowercase(ctx, local_len))
}

fn deterministic_uuid(ctx: &GenerationContext) -> String {
    uuid::Uuid::from_u64_pair(ctx.next_u64(), ctx.next_u64()).to_string()
}

fn synth_host(ctx: &GenerationContext, block: &[String]) -> String {
    for _ in 0..8 {
        let host = format!("svc{}.example.net", ctx.choose_index(10_000));
        if !block.contains(&host) {
            return host;
        }
    }
    "fallback.example.net".to_string()
}

fn generate_url(
    protocols: &[String],
    host_allow: &[String],
    host_block: &[String],
    max: usize,
    ctx: &GenerationContext,
) -> String {
    let scheme = protocols
        .first()
        .cloned()
        .unwrap_or_else(|| "https".to_string());
    let host = host_allow
        .iter()
        .find(|h| !host_block.contains(h))
        .cloned()
        .unwrap_or_else(|| synth_host(ctx, host_block));

    let mut url = format!("{scheme}://{host}");
    if url.len() > max {
        // Truncating the host is the last resort for a hard length cap.
        let available = max.saturating_sub(scheme.len() + 3).max(1);
        let truncated: String = host.chars().take(available).collect();
        url = format!("{scheme}://{truncated}");
        return url;
    }
    let path = format!("/p{}", ctx.choose_index(100));
    if url.len() + path.len() <= max {
        url.push_str(&path);
    }
    let query = format!("?q={}", ctx.choose_index(100));
    if url.len() + query.len() <= max {
        url.push_str(&query);
    }
    url
}

/// Canonical pattern set with generative support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KnownPattern {
    Digits,
    Word,
    Uppercase,
    Lowercase,
}

fn recognize(regex: &str) -> Option<KnownPattern> {
    match regex {
        r"\d+" => Some(KnownPattern::Digits),
        r"\w+" => Some(KnownPattern::Word),
        "^[A-Z]+$" => Some(KnownPattern::Uppercase),
        "^[a-z]+$" => Some(KnownPattern::Lowercase),
        _ => None,
    }
}

fn generate_pattern(
    regex: &str,
    min: usize,
    max: usize,
    ctx: &GenerationContext,
) -> String {
    let len = ctx.gen_range_usize(min.max(1), max.max(1));
    match recognize(regex) {
        Some(KnownPattern::Digits) => random_digits(ctx, len),
        Some(KnownPattern::Word) => random_word(ctx, len),
        Some(KnownPattern::Uppercase) => random_uppercase(ctx, len),
        Some(KnownPattern::Lowercase) => random_lowercase(ctx, len),
        // Documented limitation: unknown regexes yield a placeholder.
        None => format!("Pattern_Placeholder_for_{regex}"),
    }
}

pub(super) fn generate(
    request: &GenerationRequest,
    ctx: &GenerationContext,
) -> Result<Value, GenError> {
    let (min, declared_max) = length_bounds(request);
    let max = working_max(min, declared_max);

    let text = if let Some(Constraint::Email { allow, block }) =
        request.find(ConstraintKind::Email)
    {
        generate_email(allow, block, min, max, ctx)
    } else if request.has(ConstraintKind::Uuid) {
        deterministic_uuid(ctx)
    } else if let Some(Constraint::Url {
        protocols,
        host_allow,
        host_block,
    }) = request.find(ConstraintKind::Url)
    {
        generate_url(protocols, host_allow, host_block, max, ctx)
    } else if let Some(Constraint::Pattern { regex }) = request.find(ConstraintKind::Pattern) {
        generate_pattern(regex, min, max, ctx)
    } else {
        random_lowercase(ctx, ctx.gen_range_usize(min, max))
    };
    Ok(Value::Text(text))
}

pub(super) fn boundaries(
    request: &GenerationRequest,
    ctx: &GenerationContext,
) -> Result<Vec<Value>, GenError> {
    let (min, declared_max) = length_bounds(request);
    let max = working_max(min, declared_max);
    let mut values = Vec::new();

    if let Some(Constraint::Email { allow, block }) = request.find(ConstraintKind::Email) {
        let domains = email_domains(allow, block);
        values.push(Value::Text(format!("a@{}", domains[0])));
    } else if request.has(ConstraintKind::Uuid) {
        values.push(Value::Text(deterministic_uuid(ctx)));
    } else if let Some(Constraint::Url {
        protocols,
        host_allow,
        host_block,
    }) = request.find(ConstraintKind::Url)
    {
        values.push(Value::Text(generate_url(
            protocols, host_allow, host_block, max, ctx,
        )));
    } else if let Some(Constraint::Pattern { regex }) = request.find(ConstraintKind::Pattern) {
        values.push(Value::Text(generate_pattern(regex, min.max(1), min.max(1), ctx)));
    } else {
        values.push(Value::Text("a".repeat(min)));
        if max <= REPEAT_CAP && max != min {
            values.push(Value::Text("a".repeat(max)));
        }
    }
    Ok(values)
}

pub(super) fn invalid(request: &GenerationRequest) -> Result<Vec<Value>, GenError> {
    let (min, declared_max) = length_bounds(request);
    let mut values = Vec::new();

    if min > 0 {
        values.push(Value::Text("a".repeat(min - 1)));
    }
    if let Some(max) = declared_max {
        if max + 1 <= REPEAT_CAP + 1 {
            values.push(Value::Text("a".repeat(max + 1)));
        }
    }
    if request.has(ConstraintKind::NotBlank) {
        if min != 1 {
            values.push(Value::Text(String::new()));
        }
        values.push(Value::Text("   ".to_string()));
    }
    if request.has(ConstraintKind::Email) {
        values.push(Value::Text("not-an-email".to_string()));
        values.push(Value::Text("@domain.com".to_string()));
    }
    if request.has(ConstraintKind::Uuid) {
        values.push(Value::Text("not-a-uuid".to_string()));
    }
    if request.has(ConstraintKind::Url) {
        values.push(Value::Text("no-scheme.test".to_string()));
    }
    if let Some(Constraint::Pattern { regex }) = request.find(ConstraintKind::Pattern) {
        if let Some(counter) = counter_example(regex) {
            values.push(Value::Text(counter.to_string()));
        }
    }
    Ok(values)
}

fn counter_example(regex: &str) -> Option<&'static str> {
    match recognize(regex) {
        Some(KnownPattern::Digits) => Some("digits-only-please"),
        Some(KnownPattern::Word) => Some("no spaces allowed"),
        Some(KnownPattern::Uppercase) => Some("lower"),
        Some(KnownPattern::Lowercase) => Some("UPPER"),
        None => None,
    }
}
