//! Scanning of raw query text into key/value tokens.
//!
//! The grammar looks trivial, `KEY:VALUE` pairs separated by single spaces,
//! but values may themselves contain spaces and colons, so token boundaries
//! are ambiguous. The end of a value can only be discovered by looking at the
//! *next* colon and walking backward to the nearest space; when that space
//! falls inside the current token, the scanner has to advance to a later
//! colon and try again.
//!
//! The scanner is a small state machine. For each token it moves through:
//!
//! - scanning the key, up to the next colon;
//! - scanning the value, the forward-colon / backward-space dance above;
//! - balancing join parentheses, entered instead of the value state when the
//!   key is the reserved word `join` and an opening parenthesis shows up
//!   before the next colon.
//!
//! Unbalanced join parentheses drop back to the plain value state, so a
//! mangled join still scans as an ordinary token; deciding what to do with it
//! is the model's job, not ours.
//!
//! Scanning cannot fail beyond the two up-front checks in [scan]: there must
//! be a colon, and it must not be the last character.

use log::debug;

/// `join` keys introduce join clauses, everything else is a plain constraint.
/// Classification happens here, exactly once, so later stages match on the
/// kind instead of re-comparing key strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Constraint,
    Join,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub key: &'a str,
    pub value: &'a str,
}

const KW_JOIN: &str = "join";

/// Cuts the input into tokens. None means the input is definitely malformed:
/// no colon at all, or a colon as the very last character.
pub fn scan(input: &str) -> Option<Vec<Token<'_>>> {
    let first_colon = input.find(':')?;
    if first_colon == input.len() - 1 {
        return None;
    }

    Some(Tokenizer::new(input).collect())
}

struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

/// The states the scanner moves through for a single token.
enum ScanState<'a> {
    ScanningKey,
    ScanningValue { key: &'a str, colon: usize },
    ScanningJoinParens { key: &'a str, colon: usize },
}

/// Where a value ends.
enum ValueEnd {
    /// Everything up to the end of the input; this is the last token.
    Rest,
    /// The value stops right before the space at this index.
    Boundary(usize),
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Tokenizer<'a> {
        Tokenizer { input, cursor: 0 }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.input.len() {
            return None;
        }

        let mut state = ScanState::ScanningKey;

        loop {
            state = match state {
                ScanState::ScanningKey => {
                    // After emitting a token the cursor always sits right
                    // before another key with a colon after it; if not, the
                    // input is exhausted.
                    let colon = Tokenizer::find(self, ':', self.cursor)?;
                    let key = &self.input[self.cursor..colon];

                    if key.eq_ignore_ascii_case(KW_JOIN) {
                        ScanState::ScanningJoinParens { key, colon }
                    } else {
                        ScanState::ScanningValue { key, colon }
                    }
                }
                ScanState::ScanningValue { key, colon } => {
                    let end = self.value_end(colon + 1, colon + 2);

                    return Some(self.emit(TokenKind::Constraint, key, colon, end));
                }
                ScanState::ScanningJoinParens { key, colon } => {
                    match self.join_value_end(colon) {
                        Some(end) => return Some(self.emit(TokenKind::Join, key, colon, end)),
                        // No parenthesized sub-query, or one that never
                        // closes. The token still scans, just with the
                        // ordinary boundary rules.
                        None => {
                            let end = self.value_end(colon + 1, colon + 2);

                            return Some(self.emit(TokenKind::Join, key, colon, end));
                        }
                    }
                }
            };
        }
    }
}

impl<'a> Tokenizer<'a> {
    fn emit(&mut self, kind: TokenKind, key: &'a str, colon: usize, end: ValueEnd) -> Token<'a> {
        let value = match end {
            ValueEnd::Rest => {
                self.cursor = self.input.len();
                &self.input[colon + 1..]
            }
            ValueEnd::Boundary(space) => {
                let value = &self.input[colon + 1..space];
                self.cursor = space + 1;
                value
            }
        };

        debug!("scanned {:?} token {}:{}", kind, key, value);

        Token { kind, key, value }
    }

    /// The generic boundary search. Starting at the first colon at or after
    /// `search_from`, walk backward to the nearest space; a candidate only
    /// counts once it lands at or past `limit` (otherwise it is still inside
    /// the current token). Keep advancing to later colons until a candidate
    /// counts or the colons run out, in which case the remainder is the value.
    fn value_end(&self, search_from: usize, limit: usize) -> ValueEnd {
        let mut next_colon = match self.usable_colon(search_from) {
            Some(index) => index,
            None => return ValueEnd::Rest,
        };

        loop {
            if let Some(space) = self.input[..=next_colon].rfind(' ') {
                if space >= limit {
                    return ValueEnd::Boundary(space);
                }
            }

            next_colon = match self.usable_colon(next_colon + 1) {
                Some(index) => index,
                None => return ValueEnd::Rest,
            };
        }
    }

    /// The join variant: when a parenthesis opens before the next colon, the
    /// sub-query is consumed by balancing parens and the boundary search
    /// resumes after the close, so colons inside the sub-query never end the
    /// value. Returns None when the generic rules should apply instead.
    fn join_value_end(&self, colon: usize) -> Option<ValueEnd> {
        let next_colon = match self.usable_colon(colon + 1) {
            Some(index) => index,
            None => return Some(ValueEnd::Rest),
        };

        let open = colon + self.input[colon..next_colon].find('(')?;
        let close = self.matching_paren(open)?;

        Some(self.value_end(close, close))
    }

    /// Finds the ')' closing the '(' at `open`, honoring nesting.
    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;

        for (offset, ch) in self.input[open..].char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + offset);
                    }
                }
                _ => {}
            }
        }

        None
    }

    /// The next colon at or after `from` that could still delimit a token,
    /// i.e. one that exists and is not the last character.
    fn usable_colon(&self, from: usize) -> Option<usize> {
        match self.find(':', from) {
            Some(index) if index < self.input.len() - 1 => Some(index),
            _ => None,
        }
    }

    fn find(&self, needle: char, from: usize) -> Option<usize> {
        if from >= self.input.len() {
            return None;
        }

        self.input[from..].find(needle).map(|index| index + from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(input: &str) -> Vec<(&str, &str)> {
        scan(input)
            .unwrap()
            .iter()
            .map(|token| (token.key, token.value))
            .collect()
    }

    #[test]
    fn no_colon_is_malformed() {
        assert!(scan("nothing here").is_none());
        assert!(scan("").is_none());
    }

    #[test]
    fn trailing_colon_is_malformed() {
        assert!(scan("age:").is_none());
    }

    #[test]
    fn single_token() {
        assert_eq!(vec![("age", "30")], pairs("age:30"));
    }

    #[test]
    fn two_tokens() {
        assert_eq!(vec![("name", "john"), ("age", "30")], pairs("name:john age:30"));
    }

    #[test]
    fn value_with_spaces() {
        assert_eq!(
            vec![("District", "new york"), ("Temperature", "12")],
            pairs("District:new york Temperature:12")
        );
    }

    #[test]
    fn value_with_colon_needs_a_later_boundary() {
        // The colon inside "a:b" is found first, but the nearest space before
        // it sits inside the current token, so the scanner advances to the
        // colon after "c" and walks back from there.
        assert_eq!(vec![("k", "a:b"), ("c", "d")], pairs("k:a:b c:d"));
    }

    #[test]
    fn last_value_takes_the_remainder() {
        assert_eq!(vec![("note", "all of this is one value")], pairs("note:all of this is one value"));
    }

    #[test]
    fn join_without_parens_scans_to_the_end() {
        assert_eq!(
            vec![("join", "Households hh_id/household_ref")],
            pairs("join:Households hh_id/household_ref")
        );
    }

    #[test]
    fn join_keyword_ignores_case() {
        let tokens = scan("JOIN:Households hh_id/household_ref").unwrap();

        assert_eq!(TokenKind::Join, tokens[0].kind);
    }

    #[test]
    fn join_parens_swallow_inner_colons() {
        assert_eq!(
            vec![("join", "Households(region:north) hh_id/household_ref")],
            pairs("join:Households(region:north) hh_id/household_ref")
        );
    }

    #[test]
    fn join_parens_nest() {
        assert_eq!(
            vec![("join", "T(a:1(b:2)) x/y")],
            pairs("join:T(a:1(b:2)) x/y")
        );
    }

    #[test]
    fn join_token_can_be_followed_by_constraints() {
        assert_eq!(
            vec![("join", "T(a:1) x/y"), ("b", "2")],
            pairs("join:T(a:1) x/y b:2")
        );
    }

    #[test]
    fn unmatched_join_paren_degrades_to_a_plain_value() {
        assert_eq!(
            vec![("join", "T(a:1 x/y")],
            pairs("join:T(a:1 x/y")
        );
    }

    #[test]
    fn constraint_tokens_are_classified_once() {
        let tokens = scan("age:30 join:T a/b").unwrap();

        assert_eq!(TokenKind::Constraint, tokens[0].kind);
        assert_eq!(TokenKind::Join, tokens[1].kind);
    }
}
