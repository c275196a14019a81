// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Topic removal by exact name or shell-style glob.
//!
//! Patterns follow `fnmatch` conventions: `*` matches any run of
//! characters (including `/`), `?` matches one character and `[...]`
//! matches a character class, with `[!...]` negating it.

use std::collections::BTreeSet;

use glob::{MatchOptions, Pattern};
use tracing::warn;

use crate::core::{Result, ToolError};

/// `*` crosses `/` and leading dots need no literal match.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled set of removal patterns.
#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    patterns: Vec<Pattern>,
}

impl TopicFilter {
    /// Compile removal patterns.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(&normalize(p)).map_err(|e| ToolError::InvalidPattern {
                    pattern: p.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether no pattern was given.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `topic` matches any pattern.
    pub fn matches(&self, topic: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(topic, MATCH_OPTIONS))
    }

    /// Topics that survive removal.
    pub fn retain(&self, topics: &BTreeSet<String>) -> BTreeSet<String> {
        for pattern in &self.patterns {
            if !topics.iter().any(|t| pattern.matches_with(t, MATCH_OPTIONS)) {
                warn!(
                    context = "topic_filter",
                    pattern = %pattern,
                    "Pattern matches no topic in the bag"
                );
            }
        }
        topics
            .iter()
            .filter(|t| !self.matches(t))
            .cloned()
            .collect()
    }
}

/// Remove every topic matching any of `patterns`.
///
/// An empty pattern list returns `topics` unchanged.
pub fn filter_out<S: AsRef<str>>(
    topics: &BTreeSet<String>,
    patterns: &[S],
) -> Result<BTreeSet<String>> {
    Ok(TopicFilter::new(patterns)?.retain(topics))
}

/// Rewrite fnmatch spellings that `glob` rejects.
///
/// Runs of `*` collapse to one, since `glob` reserves `**` for whole path
/// components. A `[` with no closing `]` becomes the literal class `[[]`.
fn normalize(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 4);

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push('*');
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.extend(&chars[i..=end]);
                    i = end;
                }
                None => out.push_str("[[]"),
            },
            c => out.push(c),
        }
        i += 1;
    }
    out
}

/// Index of the `]` closing a class opened at `open`, if any.
///
/// A `]` directly after `[` or `[!` is a literal member of the class.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars[j.min(chars.len())..]
        .iter()
        .position(|&c| c == ']')
        .map(|p| j + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn bag_topics() -> BTreeSet<String> {
        topics(&[
            "/cmd_vel",
            "/imu/data",
            "/imu/data_raw",
            "/imu/odom",
            "/lidar_packets",
            "/map",
            "/velocity",
        ])
    }

    #[test]
    fn test_glob_and_exact_patterns() {
        let kept = filter_out(&bag_topics(), &["/imu/*", "/lidar_packets"]).unwrap();
        assert_eq!(kept, topics(&["/cmd_vel", "/map", "/velocity"]));
    }

    #[test]
    fn test_exact_names_only() {
        let kept = filter_out(&bag_topics(), &["/cmd_vel", "/map", "/velocity"]).unwrap();
        assert_eq!(
            kept,
            topics(&["/imu/data", "/imu/data_raw", "/imu/odom", "/lidar_packets"])
        );
    }

    #[test]
    fn test_unmatched_pattern_keeps_everything() {
        let input = topics(&["/imu/data", "/imu/odom"]);
        let kept = filter_out(&input, &["/camera/image_raw"]).unwrap();
        assert_eq!(kept, input);
    }

    #[test]
    fn test_empty_patterns_is_noop() {
        let empty: [&str; 0] = [];
        assert_eq!(filter_out(&bag_topics(), &empty).unwrap(), bag_topics());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let patterns = ["/imu/data*", "/m?p"];
        let once = filter_out(&bag_topics(), &patterns).unwrap();
        let twice = filter_out(&once, &patterns).unwrap();
        assert_eq!(once, twice);
        assert!(!once.contains("/map"));
        assert!(once.contains("/imu/odom"));
    }

    #[test]
    fn test_star_crosses_slashes() {
        let filter = TopicFilter::new(&["/imu*"]).unwrap();
        assert!(filter.matches("/imu/data/raw"));
        assert!(!filter.matches("/cmd_vel"));
    }

    #[test]
    fn test_character_classes() {
        let filter = TopicFilter::new(&["/cam[01]/image", "/lidar[!0]"]).unwrap();
        assert!(filter.matches("/cam0/image"));
        assert!(filter.matches("/cam1/image"));
        assert!(!filter.matches("/cam2/image"));
        assert!(filter.matches("/lidar1"));
        assert!(!filter.matches("/lidar0"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let filter = TopicFilter::new(&["/a.b", "/c+", "/unclosed["]).unwrap();
        assert!(filter.matches("/a.b"));
        assert!(!filter.matches("/axb"));
        assert!(filter.matches("/c+"));
        assert!(!filter.matches("/cc"));
        assert!(filter.matches("/unclosed["));
    }

    #[test]
    fn test_class_members_are_literal() {
        let kept = filter_out(&topics(&["/xa", "/x&", "/xc"]), &["/x[a&&b]"]).unwrap();
        assert_eq!(kept, topics(&["/xc"]));

        let filter = TopicFilter::new(&["/z[\\w]"]).unwrap();
        assert!(filter.matches("/z\\"));
        assert!(!filter.matches("/z_"));
    }

    #[test]
    fn test_double_star_matches_like_single() {
        let filter = TopicFilter::new(&["/imu**raw"]).unwrap();
        assert!(filter.matches("/imu/data_raw"));
        assert!(!filter.matches("/imu/odom"));
    }

    #[test]
    fn test_pattern_is_anchored() {
        let filter = TopicFilter::new(&["/imu"]).unwrap();
        assert!(!filter.matches("/imu/data"));
        assert!(!filter.matches("/robot/imu"));
    }
}
