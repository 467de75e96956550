//! Heuristic output simulation for languages without a runtime on the host.
//!
//! This is not an interpreter. The simulator scans source text for a small
//! set of output-producing shapes and synthesizes what they would print:
//!
//! 1. print statements whose argument is a plain string literal
//! 2. interpolated print statements, where embedded `<int> <op> <int>`
//!    expressions are evaluated with integer arithmetic
//! 3. counted loops over `0..N`, unrolled so their body prints repeat once
//!    per iteration with the loop variable bound to the index
//! 4. a generic success line when nothing was recognized but the source has
//!    the language's entry point
//!
//! Passes run in that order and each appends in source order. Statements
//! outside these shapes are omitted from the output, never reported as
//! errors, and wrong programs are never corrected.

use async_trait::async_trait;
use regex::{Captures, Regex};
use std::ops::Range;
use std::time::Instant;
use tracing::debug;

use crate::{
    error::Error,
    executor::Backend,
    languages,
    types::{BackendKind, ResultEnvelope},
};

/// Upper bound on unrolled iterations per loop
pub const MAX_LOOP_ITERATIONS: u64 = 1000;

/// Text substituted for arithmetic that cannot be evaluated
const ARITHMETIC_ERROR: &str = "Error";

/// Stand-ins for escaped `{{` and `}}` while placeholders are rewritten
const OPEN_BRACE_ESCAPE: &str = "\u{E000}";
const CLOSE_BRACE_ESCAPE: &str = "\u{E001}";

/// Lexical patterns for one simulated language.
///
/// Print patterns capture the string content in their first participating
/// group.
pub struct SimulatorRules {
    language: &'static str,
    literal_print: Regex,
    interpolation: Option<Interpolation>,
    counted_loop: Option<CountedLoop>,
    entry_point: Option<Regex>,
    brace_escapes: bool,
}

struct Interpolation {
    print: Regex,
    arithmetic: Regex,
}

/// Groups: header (1) indentation, (2) loop variable, (3) exclusive bound.
/// Body print: (1)/(2) template string, (3) bare identifier.
struct CountedLoop {
    header: Regex,
    body_print: Regex,
    placeholder: Regex,
}

struct LoopSite<'a> {
    variable: &'a str,
    bound: u64,
    body: Range<usize>,
}

impl SimulatorRules {
    pub(crate) fn new(language: &'static str, literal_print: &str) -> Self {
        Self {
            language,
            literal_print: compile(literal_print),
            interpolation: None,
            counted_loop: None,
            entry_point: None,
            brace_escapes: false,
        }
    }

    pub(crate) fn with_interpolation(mut self, print: &str, arithmetic: &str) -> Self {
        self.interpolation = Some(Interpolation {
            print: compile(print),
            arithmetic: compile(arithmetic),
        });
        self
    }

    pub(crate) fn with_counted_loop(
        mut self,
        header: &str,
        body_print: &str,
        placeholder: &str,
    ) -> Self {
        self.counted_loop = Some(CountedLoop {
            header: compile(header),
            body_print: compile(body_print),
            placeholder: compile(placeholder),
        });
        self
    }

    pub(crate) fn with_entry_point(mut self, pattern: &str) -> Self {
        self.entry_point = Some(compile(pattern));
        self
    }

    /// Treat `{{` and `}}` in interpolated strings as literal braces
    pub(crate) fn with_brace_escapes(mut self) -> Self {
        self.brace_escapes = true;
        self
    }

    pub fn language(&self) -> &'static str {
        self.language
    }

    /// Synthesize the output of `code`, trailing whitespace trimmed
    pub fn simulate(&self, code: &str) -> String {
        let mut buffer = OutputBuffer::default();
        let loops = self
            .counted_loop
            .as_ref()
            .map(|rule| rule.find(code))
            .unwrap_or_default();

        for caps in self.literal_print.captures_iter(code) {
            buffer.push_line(&unescape(first_group(&caps)));
        }

        if let Some(interpolation) = &self.interpolation {
            for caps in interpolation.print.captures_iter(code) {
                let start = caps.get(0).map_or(0, |m| m.start());
                // Owned by the loop pass
                if loops.iter().any(|site| site.body.contains(&start)) {
                    continue;
                }
                let template = self.mask_braces(first_group(&caps));
                let rendered = interpolation.substitute(&template);
                buffer.push_line(&unescape(&self.unmask_braces(rendered)));
            }
        }

        if let Some(rule) = &self.counted_loop {
            for site in &loops {
                rule.unroll(site, code, self, &mut buffer);
            }
        }

        if buffer.recognized == 0 {
            if let Some(entry_point) = &self.entry_point {
                if entry_point.is_match(code) {
                    buffer.push_line(&format!("{} code executed successfully.", self.language));
                }
            }
        }

        buffer.finish()
    }

    fn mask_braces(&self, template: &str) -> String {
        if !self.brace_escapes {
            return template.to_string();
        }
        template
            .replace("{{", OPEN_BRACE_ESCAPE)
            .replace("}}", CLOSE_BRACE_ESCAPE)
    }

    fn unmask_braces(&self, rendered: String) -> String {
        if !self.brace_escapes {
            return rendered;
        }
        rendered
            .replace(OPEN_BRACE_ESCAPE, "{")
            .replace(CLOSE_BRACE_ESCAPE, "}")
    }
}

impl Interpolation {
    fn substitute(&self, template: &str) -> String {
        self.arithmetic
            .replace_all(template, |caps: &Captures| {
                evaluate(&caps[1], &caps[2], &caps[3])
            })
            .into_owned()
    }
}

impl CountedLoop {
    fn find<'a>(&self, code: &'a str) -> Vec<LoopSite<'a>> {
        self.header
            .captures_iter(code)
            .filter_map(|caps| {
                let header = caps.get(0)?;
                let indent = caps.get(1).map_or(0, |m| m.as_str().len());
                let variable = caps.get(2)?.as_str();
                // Bounds too large for u64 are not a recognized shape
                let bound = caps.get(3)?.as_str().parse::<u64>().ok()?;
                Some(LoopSite {
                    variable,
                    bound,
                    body: indented_block(code, header.end(), indent),
                })
            })
            .collect()
    }

    fn unroll(
        &self,
        site: &LoopSite<'_>,
        code: &str,
        rules: &SimulatorRules,
        buffer: &mut OutputBuffer,
    ) {
        let body = &code[site.body.clone()];
        let prints: Vec<Captures> = self.body_print.captures_iter(body).collect();
        if prints.is_empty() {
            return;
        }

        for index in 0..site.bound.min(MAX_LOOP_ITERATIONS) {
            for caps in &prints {
                if let Some(identifier) = caps.get(3) {
                    if identifier.as_str() == site.variable {
                        buffer.push_line(&index.to_string());
                    }
                    continue;
                }

                let template = rules.mask_braces(first_group(caps));
                let bound = self.bind(&template, site.variable, index);
                let rendered = match &rules.interpolation {
                    Some(interpolation) => interpolation.substitute(&bound),
                    None => bound,
                };
                buffer.push_line(&unescape(&rules.unmask_braces(rendered)));
            }
        }
    }

    /// Substitute the index into placeholders that mention the variable.
    /// A placeholder reduced to a bare integer is replaced by it; anything
    /// else keeps its braces for the arithmetic pass.
    fn bind(&self, template: &str, variable: &str, index: u64) -> String {
        let value = index.to_string();
        self.placeholder
            .replace_all(template, |caps: &Captures| {
                let inner = &caps[1];
                if !has_identifier(inner, variable) {
                    return caps[0].to_string();
                }
                let bound = replace_identifier(inner, variable, &value);
                let trimmed = bound.trim();
                if trimmed.parse::<i64>().is_ok() {
                    trimmed.to_string()
                } else {
                    format!("{{{}}}", bound)
                }
            })
            .into_owned()
    }
}

/// Backend wrapper around a language's simulator rules
pub struct PatternSimulator {
    rules: &'static SimulatorRules,
}

impl PatternSimulator {
    /// Simulator for a canonical language name, if one exists
    pub fn for_language(language: &str) -> Option<Self> {
        languages::simulator_rules(language).map(|rules| Self { rules })
    }

    pub fn language(&self) -> &'static str {
        self.rules.language()
    }

    pub fn simulate(&self, code: &str) -> String {
        self.rules.simulate(code)
    }
}

#[async_trait]
impl Backend for PatternSimulator {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    async fn run(&self, code: &str) -> Result<ResultEnvelope, Error> {
        let started = Instant::now();
        let output = self.simulate(code);
        debug!(
            "Simulated {} snippet: {} output line(s)",
            self.language(),
            output.lines().count()
        );
        Ok(ResultEnvelope::success(output, started.elapsed()))
    }
}

#[derive(Default)]
struct OutputBuffer {
    text: String,
    recognized: usize,
}

impl OutputBuffer {
    fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
        self.recognized += 1;
    }

    fn finish(self) -> String {
        self.text.trim_end().to_string()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("simulator patterns are valid regexes")
}

fn first_group<'t>(caps: &Captures<'t>) -> &'t str {
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .map_or("", |m| m.as_str())
}

/// Evaluate `<lhs> <op> <rhs>` with checked integer arithmetic
pub(crate) fn evaluate(lhs: &str, op: &str, rhs: &str) -> String {
    let (Ok(lhs), Ok(rhs)) = (lhs.parse::<i64>(), rhs.parse::<i64>()) else {
        return ARITHMETIC_ERROR.to_string();
    };
    let value = match op {
        "+" => lhs.checked_add(rhs),
        "-" => lhs.checked_sub(rhs),
        "*" => lhs.checked_mul(rhs),
        "/" => lhs.checked_div(rhs),
        _ => None,
    };
    value.map_or_else(|| ARITHMETIC_ERROR.to_string(), |v| v.to_string())
}

/// Byte range of the lines after `header_end` indented deeper than `indent`
fn indented_block(code: &str, header_end: usize, indent: usize) -> Range<usize> {
    let start = code[header_end..]
        .find('\n')
        .map_or(code.len(), |offset| header_end + offset + 1);
    let mut end = start;
    let mut offset = start;

    for line in code[start..].split_inclusive('\n') {
        let content = line.trim_start_matches(|c: char| c == ' ' || c == '\t');
        if content.trim().is_empty() {
            offset += line.len();
            continue;
        }
        if line.len() - content.len() <= indent {
            break;
        }
        offset += line.len();
        end = offset;
    }

    start..end
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_identifier_char(c))
        .filter(|word| !word.is_empty())
}

fn has_identifier(text: &str, identifier: &str) -> bool {
    identifiers(text).any(|word| word == identifier)
}

fn replace_identifier(text: &str, identifier: &str, value: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    for c in text.chars() {
        if is_identifier_char(c) {
            word.push(c);
            continue;
        }
        flush_word(&mut out, &mut word, identifier, value);
        out.push(c);
    }
    flush_word(&mut out, &mut word, identifier, value);
    out
}

fn flush_word(out: &mut String, word: &mut String, identifier: &str, value: &str) {
    if word == identifier {
        out.push_str(value);
    } else {
        out.push_str(word);
    }
    word.clear();
}

/// Decode the escapes common to the simulated languages
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(escaped @ ('\\' | '"' | '\'' | '$')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
