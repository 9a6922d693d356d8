//! Static check for patterns prone to catastrophic backtracking.
//!
//! `regex` itself runs in linear time, but block patterns are also handed
//! to clients and other engines that backtrack. A pattern is rejected when
//! an unbounded repetition is nested inside another unbounded repetition
//! (star height above one), or when it contains more repetition operators
//! than the configured limit.

use regex_syntax::ast::{parse::Parser, Ast, RepetitionKind, RepetitionRange};

/// Reason a pattern failed the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsafePattern {
    /// The pattern does not parse.
    Syntax(String),
    /// Nested unbounded repetition, e.g. `(a+)+`.
    NestedRepetition,
    /// More repetition operators than allowed.
    TooManyRepetitions { found: usize, limit: usize },
}

impl std::fmt::Display for UnsafePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsafePattern::Syntax(e) => write!(f, "pattern does not parse: {}", e),
            UnsafePattern::NestedRepetition => write!(f, "pattern nests unbounded repetitions"),
            UnsafePattern::TooManyRepetitions { found, limit } => write!(
                f,
                "pattern has {} repetition operators (limit {})",
                found, limit
            ),
        }
    }
}

#[derive(Default)]
struct Stats {
    repetitions: usize,
    star_height: usize,
}

fn is_unbounded(kind: &RepetitionKind) -> bool {
    match kind {
        RepetitionKind::ZeroOrOne => false,
        RepetitionKind::ZeroOrMore | RepetitionKind::OneOrMore => true,
        RepetitionKind::Range(RepetitionRange::Exactly(_)) => false,
        RepetitionKind::Range(RepetitionRange::AtLeast(_)) => true,
        RepetitionKind::Range(RepetitionRange::Bounded(min, max)) => max > min,
    }
}

fn walk(ast: &Ast, height: usize, stats: &mut Stats) {
    match ast {
        Ast::Repetition(rep) => {
            stats.repetitions += 1;
            let height = if is_unbounded(&rep.op.kind) {
                height + 1
            } else {
                height
            };
            stats.star_height = stats.star_height.max(height);
            walk(&rep.ast, height, stats);
        }
        Ast::Group(group) => walk(&group.ast, height, stats),
        Ast::Alternation(alt) => {
            for ast in alt.asts.iter() {
                walk(ast, height, stats);
            }
        }
        Ast::Concat(concat) => {
            for ast in concat.asts.iter() {
                walk(ast, height, stats);
            }
        }
        _ => {}
    }
}

/// Check `pattern` against the star-height and repetition limits.
pub fn check(pattern: &str, max_repetitions: usize) -> Result<(), UnsafePattern> {
    let ast = Parser::new()
        .parse(pattern)
        .map_err(|e| UnsafePattern::Syntax(e.kind().to_string()))?;

    let mut stats = Stats::default();
    walk(&ast, 0, &mut stats);

    if stats.star_height > 1 {
        return Err(UnsafePattern::NestedRepetition);
    }
    if stats.repetitions > max_repetitions {
        return Err(UnsafePattern::TooManyRepetitions {
            found: stats.repetitions,
            limit: max_repetitions,
        });
    }

    Ok(())
}

/// Convenience wrapper returning a bool.
pub fn is_safe(pattern: &str, max_repetitions: usize) -> bool {
    check(pattern, max_repetitions).is_ok()
}
