#![forbid(unsafe_code)]

//! Fuzzy filter and ranker.
//!
//! [`rank`] takes a haystack of display strings and a needle and returns the
//! indices of the matching entries, best match first.
//!
//! # Query classes
//!
//! | Needle | Strategy |
//! |--------|----------|
//! | empty | every index, original order |
//! | ASCII with at least one letter or digit | fuzzy subsequence, ranked |
//! | anything else (CJK, diacritics, symbols only) | substring, original order |
//!
//! The substring strategy tries a case-sensitive search first and only
//! retries case-insensitively when that finds nothing.
//!
//! # Ranking
//!
//! A fuzzy candidate must contain the needle as a case-insensitive
//! subsequence. Among the alignments of the needle in a candidate the best
//! one is kept, and candidates are ordered by, in turn:
//!
//! 1. match starts at position 0,
//! 2. fewest skipped characters inside the matched span,
//! 3. most characters matching the needle's case exactly,
//! 4. earliest match start,
//! 5. shortest candidate,
//! 6. original index (stable).
//!
//! # Invariants
//!
//! 1. The result is a duplicate-free subset of `0..haystack.len()`.
//! 2. Empty needle: the result is exactly `0..haystack.len()`.
//! 3. Determinism: same input, same output. No input panics.

use smallvec::SmallVec;
use std::borrow::Cow;

/// Matched character positions (char indices into the candidate).
pub type MatchPositions = SmallVec<[usize; 8]>;

/// How a needle is matched against candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Empty needle: everything matches, no re-ranking.
    Empty,
    /// Ranked fuzzy subsequence matching.
    Fuzzy,
    /// Plain substring search (non-Latin or symbol-only needles).
    Substring,
}

/// Decide which strategy applies to `needle`.
pub fn classify_query(needle: &str) -> QueryKind {
    if needle.is_empty() {
        return QueryKind::Empty;
    }
    let latin = needle
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_ascii_punctuation() || c == ' ');
    if !latin {
        return QueryKind::Substring;
    }
    if needle.chars().any(|c| c.is_ascii_alphanumeric()) {
        QueryKind::Fuzzy
    } else {
        QueryKind::Substring
    }
}

/// One ranked result with highlight positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// Index into the haystack.
    pub index: usize,
    /// Char positions of the matched characters in the candidate.
    pub positions: MatchPositions,
}

/// Sort key for a fuzzy candidate. Field order is comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    not_prefix: bool,
    gaps: usize,
    case_misses: usize,
    start: usize,
    len: usize,
}

/// Rank `haystack` against `needle`, returning haystack indices.
pub fn rank<S: AsRef<str>>(haystack: &[S], needle: &str) -> Vec<usize> {
    rank_iter(haystack.iter(), needle)
}

/// Rank any sequence of strings, returning their indices.
pub fn rank_iter<I, S>(haystack: I, needle: &str) -> Vec<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match classify_query(needle) {
        QueryKind::Empty => (0..haystack.into_iter().count()).collect(),
        QueryKind::Substring => substring_filter(haystack, needle, |_, _| ())
            .into_iter()
            .map(|(index, ())| index)
            .collect(),
        QueryKind::Fuzzy => {
            let needle = needle.as_bytes();
            let mut buf = Vec::new();
            let mut scored: Vec<(RankKey, usize)> = Vec::new();
            for (index, candidate) in haystack.into_iter().enumerate() {
                fill_chars(&mut buf, candidate.as_ref());
                if let Some((key, _)) = best_alignment(&buf, needle) {
                    scored.push((key, index));
                }
            }
            scored.sort_unstable();
            scored.into_iter().map(|(_, index)| index).collect()
        }
    }
}

/// Rank `haystack` against `needle`, keeping matched positions for highlighting.
pub fn rank_matches<S: AsRef<str>>(haystack: &[S], needle: &str) -> Vec<FuzzyMatch> {
    match classify_query(needle) {
        QueryKind::Empty => (0..haystack.len())
            .map(|index| FuzzyMatch {
                index,
                positions: MatchPositions::new(),
            })
            .collect(),
        QueryKind::Substring => {
            let needle_chars = needle.chars().count();
            substring_filter(haystack.iter(), needle, |candidate, byte_start| {
                let start = candidate[..byte_start].chars().count();
                (start..start + needle_chars).collect::<MatchPositions>()
            })
            .into_iter()
            .map(|(index, positions)| FuzzyMatch { index, positions })
            .collect()
        }
        QueryKind::Fuzzy => {
            let bytes = needle.as_bytes();
            let mut buf = Vec::new();
            let mut scored: Vec<(RankKey, usize, usize)> = Vec::new();
            for (index, candidate) in haystack.iter().enumerate() {
                fill_chars(&mut buf, candidate.as_ref());
                if let Some((key, start)) = best_alignment(&buf, bytes) {
                    scored.push((key, index, start));
                }
            }
            scored.sort_unstable();
            scored
                .into_iter()
                .map(|(_, index, start)| {
                    fill_chars(&mut buf, haystack[index].as_ref());
                    FuzzyMatch {
                        index,
                        positions: greedy_positions(&buf, bytes, start),
                    }
                })
                .collect()
        }
    }
}

/// Highlight positions of `needle` in a single candidate.
///
/// Empty when the candidate does not match or the needle is empty. Used to
/// highlight only the rows on screen instead of the whole haystack.
pub fn match_positions(candidate: &str, needle: &str) -> MatchPositions {
    match classify_query(needle) {
        QueryKind::Empty => MatchPositions::new(),
        QueryKind::Substring => substring_filter([candidate], needle, |c, byte_start| {
            let start = c[..byte_start].chars().count();
            (start..start + needle.chars().count()).collect::<MatchPositions>()
        })
        .pop()
        .map(|(_, positions)| positions)
        .unwrap_or_default(),
        QueryKind::Fuzzy => {
            let chars: Vec<char> = candidate.chars().collect();
            let bytes = needle.as_bytes();
            best_alignment(&chars, bytes)
                .map(|(_, start)| greedy_positions(&chars, bytes, start))
                .unwrap_or_default()
        }
    }
}

fn fill_chars(buf: &mut Vec<char>, s: &str) {
    buf.clear();
    buf.extend(s.chars());
}

#[inline]
fn eq_ignore_case(c: char, b: u8) -> bool {
    c.is_ascii() && (c as u8).eq_ignore_ascii_case(&b)
}

/// Find the best alignment of `needle` (ASCII) in `chars`.
///
/// For every start position the greedy forward match is the shortest span
/// beginning there, so scanning all starts finds the tightest alignment.
/// Returns the key and the chosen start.
fn best_alignment(chars: &[char], needle: &[u8]) -> Option<(RankKey, usize)> {
    let m = needle.len();
    let n = chars.len();
    if m == 0 || m > n {
        return None;
    }

    let mut best: Option<(RankKey, usize)> = None;
    for start in 0..n {
        if !eq_ignore_case(chars[start], needle[0]) {
            continue;
        }
        let mut case_hits = usize::from(chars[start] as u32 == u32::from(needle[0]));
        let mut matched = 1;
        let mut last = start;
        let mut i = start + 1;
        while matched < m && i < n {
            if eq_ignore_case(chars[i], needle[matched]) {
                if chars[i] as u32 == u32::from(needle[matched]) {
                    case_hits += 1;
                }
                last = i;
                matched += 1;
            }
            i += 1;
        }
        if matched < m {
            // Later starts see a suffix of this one; they cannot match either.
            break;
        }
        let key = RankKey {
            not_prefix: start != 0,
            gaps: (last - start + 1) - m,
            case_misses: m - case_hits,
            start,
            len: n,
        };
        if best.is_none_or(|(b, _)| key < b) {
            best = Some((key, start));
        }
    }
    best
}

fn greedy_positions(chars: &[char], needle: &[u8], start: usize) -> MatchPositions {
    let mut positions = MatchPositions::new();
    let mut matched = 0;
    for (i, &c) in chars.iter().enumerate().skip(start) {
        if matched == needle.len() {
            break;
        }
        if eq_ignore_case(c, needle[matched]) {
            positions.push(i);
            matched += 1;
        }
    }
    positions
}

/// Substring filter preserving haystack order.
///
/// `on_match` receives the candidate and the byte offset of the match.
fn substring_filter<I, S, T>(
    haystack: I,
    needle: &str,
    mut on_match: impl FnMut(&str, usize) -> T,
) -> Vec<(usize, T)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<S> = haystack.into_iter().collect();

    let exact: Vec<(usize, T)> = items
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let candidate = candidate.as_ref();
            candidate
                .find(needle)
                .map(|at| (index, on_match(candidate, at)))
        })
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let needle_lower = needle.to_lowercase();
    items
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let candidate = candidate.as_ref();
            let lowered: Cow<'_, str> = if candidate.chars().any(char::is_uppercase) {
                Cow::Owned(candidate.to_lowercase())
            } else {
                Cow::Borrowed(candidate)
            };
            let at = lowered.find(&needle_lower)?;
            // Lowercasing can change byte lengths; map back through char counts.
            let char_at = lowered[..at].chars().count();
            let byte_at = candidate
                .char_indices()
                .nth(char_at)
                .map_or(candidate.len(), |(b, _)| b);
            Some((index, on_match(candidate, byte_at)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ranked<'a>(haystack: &[&'a str], needle: &str) -> Vec<&'a str> {
        rank(haystack, needle)
            .into_iter()
            .map(|i| haystack[i])
            .collect()
    }

    #[test]
    fn exact_and_prefix_outrank_mid_string() {
        let haystack = ["A", "AA", "AB", "AC", "BC", "C", "CD"];
        assert_eq!(ranked(&haystack, "C"), vec!["C", "CD", "AC", "BC"]);
    }

    #[test]
    fn case_then_position_tie_break() {
        let haystack = [
            "client_service_namespace",
            "namespace",
            "alert_namespace",
            "container_namespace",
            "Namespace",
            "client_k8s_namespace_name",
            "foobar",
        ];
        assert_eq!(
            ranked(&haystack, "Names"),
            vec![
                "Namespace",
                "namespace",
                "alert_namespace",
                "container_namespace",
                "client_k8s_namespace_name",
                "client_service_namespace",
            ]
        );
    }

    #[test]
    fn non_latin_needle_uses_substring() {
        let haystack = ["A水", "AA", "AB", "AC", "BC", "C", "CD"];
        assert_eq!(classify_query("水"), QueryKind::Substring);
        assert_eq!(ranked(&haystack, "水"), vec!["A水"]);
    }

    #[test]
    fn symbol_only_needle_uses_substring() {
        let haystack = ["=", "<=", ">", "!~"];
        assert_eq!(classify_query("="), QueryKind::Substring);
        assert_eq!(classify_query("<="), QueryKind::Substring);
        assert_eq!(ranked(&haystack, "="), vec!["=", "<="]);
    }

    #[test]
    fn substring_prefers_case_sensitive_hits() {
        let haystack = ["Écoute", "écoute", "ÉCOUTE"];
        assert_eq!(ranked(&haystack, "Éc"), vec!["Écoute"]);
        // No case-sensitive hit: retried case-insensitively.
        assert_eq!(ranked(&haystack, "éCo"), vec!["Écoute", "écoute", "ÉCOUTE"]);
    }

    #[test]
    fn empty_needle_is_identity() {
        let haystack = ["b", "a", "c"];
        assert_eq!(rank(&haystack, ""), vec![0, 1, 2]);
    }

    #[test]
    fn empty_haystack() {
        let haystack: [&str; 0] = [];
        assert!(rank(&haystack, "x").is_empty());
        assert!(rank(&haystack, "").is_empty());
        assert!(rank(&haystack, "水").is_empty());
    }

    #[test]
    fn fuzzy_subsequence_with_gaps() {
        let haystack = ["graphite", "prometheus", "gp"];
        assert_eq!(ranked(&haystack, "gp"), vec!["gp", "graphite"]);
    }

    #[test]
    fn contiguous_beats_gapped() {
        let haystack = ["xa_b", "xab"];
        assert_eq!(ranked(&haystack, "ab"), vec!["xab", "xa_b"]);
    }

    #[test]
    fn non_ascii_candidates_with_latin_needle() {
        let haystack = ["café au lait", "cafe", "Ünïcode"];
        assert_eq!(ranked(&haystack, "caf"), vec!["cafe", "café au lait"]);
    }

    #[test]
    fn spaces_stay_on_fuzzy_path() {
        assert_eq!(classify_query("Option 9"), QueryKind::Fuzzy);
        let haystack = ["Option 1", "Option 9", "Option 19"];
        assert_eq!(ranked(&haystack, "Option 9"), vec!["Option 9", "Option 19"]);
    }

    #[test]
    fn match_positions_for_highlight() {
        let haystack = ["alert_namespace", "Namespace"];
        let matches = rank_matches(&haystack, "names");
        assert_eq!(matches[0].index, 1);
        assert_eq!(matches[0].positions.as_slice(), &[0, 1, 2, 3, 4]);
        assert_eq!(matches[1].positions.as_slice(), &[6, 7, 8, 9, 10]);
    }

    #[test]
    fn substring_positions_are_char_indices() {
        let haystack = ["aé水b"];
        let matches = rank_matches(&haystack, "水");
        assert_eq!(matches[0].positions.as_slice(), &[2]);
    }

    #[test]
    fn rank_iter_accepts_cows() {
        let labels: Vec<Cow<'_, str>> = vec![Cow::Borrowed("beta"), Cow::Owned("alpha".into())];
        assert_eq!(rank_iter(labels.iter(), "a"), vec![1, 0]);
    }

    #[test]
    fn single_candidate_positions() {
        assert_eq!(match_positions("alert_namespace", "Names").as_slice(), &[6, 7, 8, 9, 10]);
        assert_eq!(match_positions("client_k8s", "ck").as_slice(), &[0, 7]);
        assert_eq!(match_positions("A水", "水").as_slice(), &[1]);
        assert!(match_positions("abc", "zz").is_empty());
        assert!(match_positions("abc", "").is_empty());
    }

    proptest! {
        #[test]
        fn result_is_unique_subset(
            haystack in proptest::collection::vec("[a-zA-Z_ ]{0,12}", 0..40),
            needle in "[a-zA-Z]{0,4}",
        ) {
            let result = rank(&haystack, &needle);
            let mut seen = std::collections::HashSet::new();
            for &i in &result {
                prop_assert!(i < haystack.len());
                prop_assert!(seen.insert(i));
            }
        }

        #[test]
        fn every_fuzzy_result_contains_subsequence(
            haystack in proptest::collection::vec("[a-cA-C]{0,8}", 0..30),
            needle in "[a-c]{1,3}",
        ) {
            for i in rank(&haystack, &needle) {
                let cand = haystack[i].to_ascii_lowercase();
                let mut it = cand.chars();
                prop_assert!(needle.chars().all(|c| it.any(|h| h == c)));
            }
        }

        #[test]
        fn deterministic(
            haystack in proptest::collection::vec("\\PC{0,10}", 0..30),
            needle in "\\PC{0,3}",
        ) {
            prop_assert_eq!(rank(&haystack, &needle), rank(&haystack, &needle));
        }
    }
}
