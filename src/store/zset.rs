//! Sorted set: members ordered by (score, member)
//!
//! A member -> score map answers point lookups; an ordered set of
//! (score, member) pairs answers range queries.

use bytes::Bytes;
use ordered_float::OrderedFloat;
use std::collections::{BTreeSet, HashMap};

/// One end of a score interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBound {
    pub value: f64,
    pub exclusive: bool,
}

impl ScoreBound {
    pub fn inclusive(value: f64) -> Self {
        ScoreBound { value, exclusive: false }
    }

    pub fn exclusive(value: f64) -> Self {
        ScoreBound { value, exclusive: true }
    }

    /// Parse `5`, `(5`, `-inf`, `+inf`
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let s = std::str::from_utf8(raw).ok()?;
        let (exclusive, s) = match s.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let value = parse_score(s.as_bytes())?;
        Some(ScoreBound { value, exclusive })
    }

    fn admits_above(&self, score: f64) -> bool {
        if self.exclusive {
            score > self.value
        } else {
            score >= self.value
        }
    }

    fn admits_below(&self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

/// Parse a score, accepting `inf`, `+inf` and `-inf`; NaN is rejected
pub fn parse_score(raw: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(raw).ok()?;
    let value = match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" => f64::INFINITY,
        "-inf" => f64::NEG_INFINITY,
        other => other.parse::<f64>().ok()?,
    };
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Render a score the way replies carry it (`10`, not `10.0`)
pub fn format_score(score: f64) -> String {
    if score.is_infinite() {
        if score > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if score.fract() == 0.0 && score.abs() < 1e15 {
        format!("{}", score as i64)
    } else {
        score.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    scores: HashMap<Bytes, f64>,
    ordered: BTreeSet<(OrderedFloat<f64>, Bytes)>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Insert or re-score a member; true when it was not present before
    pub fn insert(&mut self, member: Bytes, score: f64) -> bool {
        match self.scores.insert(member.clone(), score) {
            Some(old) => {
                self.ordered.remove(&(OrderedFloat(old), member.clone()));
                self.ordered.insert((OrderedFloat(score), member));
                false
            }
            None => {
                self.ordered.insert((OrderedFloat(score), member));
                true
            }
        }
    }

    pub fn remove(&mut self, member: &Bytes) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&(OrderedFloat(score), member.clone()));
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &Bytes) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Add `by` to the member's score (starting from 0) and return the result
    pub fn incr(&mut self, member: Bytes, by: f64) -> f64 {
        let score = self.score(&member).unwrap_or(0.0) + by;
        self.insert(member, score);
        score
    }

    /// Zero-based position in ascending order
    pub fn rank(&self, member: &Bytes) -> Option<usize> {
        let score = self.score(member)?;
        Some(self.ordered.range(..(OrderedFloat(score), member.clone())).count())
    }

    /// Zero-based position in descending order
    pub fn rev_rank(&self, member: &Bytes) -> Option<usize> {
        self.rank(member).map(|rank| self.len() - 1 - rank)
    }

    /// Members between two inclusive ranks; negative ranks count from the end
    pub fn range_by_rank(&self, start: i64, stop: i64, reverse: bool) -> Vec<(Bytes, f64)> {
        let len = self.len() as i64;
        let start = if start < 0 { (start + len).max(0) } else { start };
        let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
        if len == 0 || start > stop || start >= len {
            return Vec::new();
        }
        let take = (stop - start + 1) as usize;

        if reverse {
            self.ordered
                .iter()
                .rev()
                .skip(start as usize)
                .take(take)
                .map(|(s, m)| (m.clone(), s.0))
                .collect()
        } else {
            self.ordered
                .iter()
                .skip(start as usize)
                .take(take)
                .map(|(s, m)| (m.clone(), s.0))
                .collect()
        }
    }

    /// Members with `min <= score <= max`, paginated by offset/count
    ///
    /// In reverse order the walk goes from `max` down to `min`.
    pub fn range_by_score(
        &self,
        min: ScoreBound,
        max: ScoreBound,
        reverse: bool,
        offset: usize,
        count: Option<usize>,
    ) -> Vec<(Bytes, f64)> {
        let limit = count.unwrap_or(usize::MAX);
        let in_range = |(s, _): &&(OrderedFloat<f64>, Bytes)| min.admits_above(s.0) && max.admits_below(s.0);

        if reverse {
            self.ordered
                .iter()
                .rev()
                .skip_while(|(s, _)| !max.admits_below(s.0))
                .take_while(|(s, _)| min.admits_above(s.0))
                .filter(in_range)
                .skip(offset)
                .take(limit)
                .map(|(s, m)| (m.clone(), s.0))
                .collect()
        } else {
            self.ordered
                .iter()
                .skip_while(|(s, _)| !min.admits_above(s.0))
                .take_while(|(s, _)| max.admits_below(s.0))
                .filter(in_range)
                .skip(offset)
                .take(limit)
                .map(|(s, m)| (m.clone(), s.0))
                .collect()
        }
    }

    pub fn count(&self, min: ScoreBound, max: ScoreBound) -> usize {
        self.range_by_score(min, max, false, 0, None).len()
    }

    /// Remove every member in the score interval, returning them
    pub fn remove_range_by_score(&mut self, min: ScoreBound, max: ScoreBound) -> Vec<Bytes> {
        let doomed: Vec<Bytes> = self
            .range_by_score(min, max, false, 0, None)
            .into_iter()
            .map(|(member, _)| member)
            .collect();
        for member in &doomed {
            self.remove(member);
        }
        doomed
    }

    /// Members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, f64)> {
        self.ordered.iter().map(|(s, m)| (m, s.0))
    }

    pub fn memory_usage(&self) -> usize {
        let members: usize = self.scores.keys().map(|m| m.len() * 2).sum();
        let scores = self.len() * std::mem::size_of::<f64>() * 2;
        members + scores + std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> SortedSet {
        let mut z = SortedSet::new();
        z.insert(Bytes::from("carol"), 30.0);
        z.insert(Bytes::from("alice"), 10.0);
        z.insert(Bytes::from("bob"), 20.0);
        z.insert(Bytes::from("dave"), 20.0);
        z
    }

    fn members(items: Vec<(Bytes, f64)>) -> Vec<String> {
        items
            .into_iter()
            .map(|(m, _)| String::from_utf8(m.to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_rank_order_breaks_ties_by_member() {
        let z = board();
        assert_eq!(members(z.range_by_rank(0, -1, false)), ["alice", "bob", "dave", "carol"]);
        assert_eq!(members(z.range_by_rank(0, 1, true)), ["carol", "dave"]);
        assert_eq!(z.rank(&Bytes::from("dave")), Some(2));
        assert_eq!(z.rev_rank(&Bytes::from("dave")), Some(1));
        assert_eq!(z.rank(&Bytes::from("erin")), None);
    }

    #[test]
    fn test_rank_bounds_are_clamped() {
        let z = board();
        assert_eq!(z.range_by_rank(2, 100, false).len(), 2);
        assert_eq!(z.range_by_rank(-2, -1, false).len(), 2);
        assert!(z.range_by_rank(5, 10, false).is_empty());
        assert!(z.range_by_rank(3, 1, false).is_empty());
        assert!(SortedSet::new().range_by_rank(0, -1, false).is_empty());
    }

    #[test]
    fn test_rescore_moves_member() {
        let mut z = board();
        assert!(!z.insert(Bytes::from("alice"), 40.0));
        assert_eq!(members(z.range_by_rank(-1, -1, false)), ["alice"]);
        assert_eq!(z.len(), 4);
        assert_eq!(z.incr(Bytes::from("alice"), -5.0), 35.0);
        assert_eq!(z.incr(Bytes::from("erin"), 2.0), 2.0);
    }

    #[test]
    fn test_range_by_score() {
        let z = board();
        let all = ScoreBound::inclusive(f64::NEG_INFINITY);
        let top = ScoreBound::inclusive(f64::INFINITY);
        assert_eq!(members(z.range_by_score(all, top, false, 1, Some(2))), ["bob", "dave"]);
        assert_eq!(members(z.range_by_score(all, ScoreBound::inclusive(20.0), true, 0, None)), ["dave", "bob", "alice"]);
        assert_eq!(z.count(ScoreBound::exclusive(10.0), ScoreBound::inclusive(30.0)), 3);
        assert_eq!(z.count(ScoreBound::inclusive(10.0), ScoreBound::exclusive(20.0)), 1);
    }

    #[test]
    fn test_remove_range_by_score() {
        let mut z = board();
        let removed = z.remove_range_by_score(ScoreBound::inclusive(15.0), ScoreBound::inclusive(25.0));
        assert_eq!(removed.len(), 2);
        assert_eq!(members(z.range_by_rank(0, -1, false)), ["alice", "carol"]);
    }

    #[test]
    fn test_bound_parsing() {
        assert_eq!(ScoreBound::parse(b"(5"), Some(ScoreBound::exclusive(5.0)));
        assert_eq!(ScoreBound::parse(b"-inf"), Some(ScoreBound::inclusive(f64::NEG_INFINITY)));
        assert_eq!(ScoreBound::parse(b"+inf"), Some(ScoreBound::inclusive(f64::INFINITY)));
        assert_eq!(ScoreBound::parse(b"abc"), None);
        assert_eq!(parse_score(b"nan"), None);
        assert_eq!(format_score(10.0), "10");
        assert_eq!(format_score(1.5), "1.5");
        assert_eq!(format_score(f64::NEG_INFINITY), "-inf");
    }
}
