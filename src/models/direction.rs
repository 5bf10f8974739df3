use serde::{Deserialize, Serialize};
use std::fmt;

/// One approach to the intersection, identified by a single uppercase letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Direction(char);

impl Direction {
    /// Builds a direction from a letter, folding it to uppercase.
    pub fn new(letter: char) -> Option<Self> {
        if letter.is_ascii_alphabetic() {
            Some(Direction(letter.to_ascii_uppercase()))
        } else {
            None
        }
    }

    /// Parses a case-insensitive one-letter token such as `"a"` or `" B "`.
    pub fn parse(token: &str) -> Option<Self> {
        let mut chars = token.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => Self::new(letter),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Direction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Direction::parse(&value).ok_or_else(|| format!("invalid direction `{}`", value))
    }
}

impl From<Direction> for String {
    fn from(direction: Direction) -> Self {
        direction.0.to_string()
    }
}

/// The fixed set of approaches, in enumeration order. Order decides ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionSet {
    directions: Vec<Direction>,
}

impl DirectionSet {
    /// Callers are expected to pass a validated, duplicate-free list
    /// (see `ControllerConfig::validate`).
    pub fn new(directions: Vec<Direction>) -> Self {
        Self { directions }
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.directions.contains(&direction)
    }

    /// Resolves an intake token to a member of this set.
    pub fn resolve(&self, token: &str) -> Option<Direction> {
        Direction::parse(token).filter(|d| self.contains(*d))
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        self.directions.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }
}

impl Default for DirectionSet {
    fn default() -> Self {
        Self::new(
            crate::global_variables::DEFAULT_DIRECTIONS
                .iter()
                .filter_map(|letter| Direction::new(*letter))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Direction::parse("a"), Direction::new('A'));
        assert_eq!(Direction::parse(" c "), Direction::new('C'));
    }

    #[test]
    fn parse_rejects_non_letters_and_long_tokens() {
        assert_eq!(Direction::parse(""), None);
        assert_eq!(Direction::parse("1"), None);
        assert_eq!(Direction::parse("AB"), None);
    }

    #[test]
    fn resolve_only_accepts_members() {
        let set = DirectionSet::default();
        assert_eq!(set.resolve("b"), Direction::new('B'));
        assert_eq!(set.resolve("D"), None);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn serde_uses_the_letter() {
        let a = Direction::new('a').unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"A\"");
        let back: Direction = serde_json::from_str("\"a\"").unwrap();
        assert_eq!(back, a);
        assert!(serde_json::from_str::<Direction>("\"7\"").is_err());
    }
}
