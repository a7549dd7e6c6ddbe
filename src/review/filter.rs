//! File-list filter for the review panel.
//!
//! An expression is a comma-separated list of rules, each optionally prefixed
//! with `+` (include, the default) or `-` (exclude):
//!
//! - `*.rs`, `src/**`: glob on the operation's path
//! - `created`, `edited`, `deleted`: operation kind
//! - `>N`, `<N`: number of changed lines (added plus removed)
//!
//! A file is visible when it matches any include rule (or there are none)
//! and no exclude rule.

use crate::ops::OperationKind;
use crate::preview::PreviewedOperation;
use glob::{MatchOptions, Pattern};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeOp {
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone)]
pub enum FilterRule {
    Glob { include: bool, pattern: Pattern },
    Kind { include: bool, kind: OperationKind },
    Size { include: bool, op: SizeOp, threshold: usize },
}

impl FilterRule {
    fn include(&self) -> bool {
        match self {
            FilterRule::Glob { include, .. }
            | FilterRule::Kind { include, .. }
            | FilterRule::Size { include, .. } => *include,
        }
    }

    fn matches(&self, op: &PreviewedOperation) -> bool {
        match self {
            FilterRule::Glob { pattern, .. } => pattern.matches_with(op.path(), MATCH_OPTIONS),
            FilterRule::Kind { kind, .. } => op.kind() == *kind,
            FilterRule::Size { op: size_op, threshold, .. } => {
                let (adds, dels) = op.change_counts();
                let changed = adds + dels;
                match size_op {
                    SizeOp::GreaterThan => changed > *threshold,
                    SizeOp::LessThan => changed < *threshold,
                }
            }
        }
    }
}

/// `*` crosses directory separators so `*.rs` matches at any depth
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Parse a filter expression. Segments that are not valid globs are skipped.
pub fn parse_filter_expr(expr: &str) -> Vec<FilterRule> {
    expr.split(',').filter_map(parse_segment).collect()
}

fn parse_segment(segment: &str) -> Option<FilterRule> {
    let segment = segment.trim();
    let (include, body) = match segment.chars().next()? {
        '-' => (false, segment[1..].trim()),
        '+' => (true, segment[1..].trim()),
        _ => (true, segment),
    };
    if body.is_empty() {
        return None;
    }

    if let Some(rule) = parse_size(include, body) {
        return Some(rule);
    }
    if let Some(kind) = parse_kind(body) {
        return Some(FilterRule::Kind { include, kind });
    }
    match Pattern::new(body) {
        Ok(pattern) => Some(FilterRule::Glob { include, pattern }),
        Err(e) => {
            log::debug!("ignoring filter segment {:?}: {}", body, e);
            None
        }
    }
}

fn parse_size(include: bool, body: &str) -> Option<FilterRule> {
    let (op, rest) = if let Some(rest) = body.strip_prefix('>') {
        (SizeOp::GreaterThan, rest)
    } else if let Some(rest) = body.strip_prefix('<') {
        (SizeOp::LessThan, rest)
    } else {
        return None;
    };
    let threshold = rest.trim().parse::<usize>().ok()?;
    Some(FilterRule::Size {
        include,
        op,
        threshold,
    })
}

fn parse_kind(body: &str) -> Option<OperationKind> {
    match body.to_lowercase().as_str() {
        "created" | "create" => Some(OperationKind::Create),
        "edited" | "edit" => Some(OperationKind::Edit),
        "deleted" | "delete" => Some(OperationKind::Delete),
        _ => None,
    }
}

/// Whether `op` stays visible under `rules`
pub fn apply_filter(rules: &[FilterRule], op: &PreviewedOperation) -> bool {
    let mut includes = rules.iter().filter(|r| r.include()).peekable();
    let included = includes.peek().is_none() || includes.any(|r| r.matches(op));
    included && !rules.iter().any(|r| !r.include() && r.matches(op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffLimits;
    use crate::ops::FileOperation;

    fn make_op(kind: OperationKind, path: &str, before: &str, after: &str) -> PreviewedOperation {
        let op = match kind {
            OperationKind::Create => FileOperation::create(path, after),
            OperationKind::Edit => FileOperation::edit(path, after),
            OperationKind::Delete => FileOperation::delete(path),
        };
        PreviewedOperation::new(op, before.to_string(), &DiffLimits::default())
    }

    fn edit(path: &str) -> PreviewedOperation {
        make_op(OperationKind::Edit, path, "a\nb", "a\nc")
    }

    #[test]
    fn empty_and_blank_expressions_have_no_rules() {
        assert!(parse_filter_expr("").is_empty());
        assert!(parse_filter_expr("  ,  , ").is_empty());
        assert!(parse_filter_expr("+, -").is_empty());
    }

    #[test]
    fn prefixes_set_include_flag() {
        let rules = parse_filter_expr("*.rs, +*.ts, -*.lock");
        assert_eq!(rules.len(), 3);
        assert!(matches!(&rules[0], FilterRule::Glob { include: true, .. }));
        assert!(matches!(&rules[1], FilterRule::Glob { include: true, .. }));
        assert!(matches!(&rules[2], FilterRule::Glob { include: false, .. }));
    }

    #[test]
    fn kind_keywords_are_case_insensitive() {
        let rules = parse_filter_expr("+CREATED, -deleted, edit");
        assert!(matches!(
            &rules[0],
            FilterRule::Kind { include: true, kind: OperationKind::Create }
        ));
        assert!(matches!(
            &rules[1],
            FilterRule::Kind { include: false, kind: OperationKind::Delete }
        ));
        assert!(matches!(
            &rules[2],
            FilterRule::Kind { include: true, kind: OperationKind::Edit }
        ));
    }

    #[test]
    fn size_rules_allow_inner_space() {
        let rules = parse_filter_expr("+> 10, -<3");
        assert!(matches!(
            &rules[0],
            FilterRule::Size { include: true, op: SizeOp::GreaterThan, threshold: 10 }
        ));
        assert!(matches!(
            &rules[1],
            FilterRule::Size { include: false, op: SizeOp::LessThan, threshold: 3 }
        ));
    }

    #[test]
    fn invalid_glob_is_skipped() {
        let rules = parse_filter_expr("[oops, *.rs");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn no_rules_shows_everything() {
        assert!(apply_filter(&[], &edit("src/main.rs")));
    }

    #[test]
    fn glob_matches_nested_paths() {
        let rules = parse_filter_expr("*.rs");
        assert!(apply_filter(&rules, &edit("src/deep/nested/lib.rs")));
        assert!(!apply_filter(&rules, &edit("web/app.ts")));
    }

    #[test]
    fn includes_are_ored_then_excludes_remove() {
        let rules = parse_filter_expr("+*.rs, +*.toml, -src/test*");
        assert!(apply_filter(&rules, &edit("src/main.rs")));
        assert!(apply_filter(&rules, &edit("Cargo.toml")));
        assert!(!apply_filter(&rules, &edit("src/test_util.rs")));
        assert!(!apply_filter(&rules, &edit("web/app.ts")));
    }

    #[test]
    fn exclude_only_starts_from_everything() {
        let rules = parse_filter_expr("-*.lock");
        assert!(apply_filter(&rules, &edit("src/main.rs")));
        assert!(!apply_filter(&rules, &edit("Cargo.lock")));
    }

    #[test]
    fn kind_rules_match_operation_kind() {
        let rules = parse_filter_expr("created");
        let created = make_op(OperationKind::Create, "new.rs", "", "x");
        let deleted = make_op(OperationKind::Delete, "old.rs", "x", "");
        assert!(apply_filter(&rules, &created));
        assert!(!apply_filter(&rules, &deleted));
        assert!(!apply_filter(&rules, &edit("mid.rs")));

        let rules = parse_filter_expr("-deleted");
        assert!(apply_filter(&rules, &created));
        assert!(!apply_filter(&rules, &deleted));
    }

    #[test]
    fn size_counts_added_plus_removed() {
        let big = make_op(OperationKind::Create, "big.rs", "", "1\n2\n3\n4\n5");
        let small = edit("small.rs");
        let rules = parse_filter_expr(">2");
        assert!(apply_filter(&rules, &big));
        // strictly greater: two changed lines do not pass >2
        assert!(!apply_filter(&rules, &small));

        let rules = parse_filter_expr("<2");
        assert!(!apply_filter(&rules, &small));
    }

    #[test]
    fn glob_or_kind_include() {
        let rules = parse_filter_expr("+*.rs, +created");
        assert!(apply_filter(&rules, &make_op(OperationKind::Create, "new.ts", "", "x")));
        assert!(apply_filter(&rules, &edit("src/main.rs")));
        assert!(!apply_filter(&rules, &edit("src/app.ts")));
    }
}
