//! Pattern text parser
//!
//! Grammar, whitespace ignored everywhere:
//!
//! ```text
//! sequence    := (element quantor?)*
//! element     := '(' sequence ')' | disjunction
//! quantor     := '{' decimal '}'
//! disjunction := conjunction ('|' conjunction)*
//! conjunction := range ('&' range)*
//! range       := atom ('-' atom)?
//! atom        := hex hex | '?' | '%' bit{8} | '\'' char | '*' decimal
//! ```
//!
//! `hex` may be `x` to accept any nibble, `bit` may be `x` to accept any bit.

use super::predicate::ByteSet;
use crate::BinaryError;

/// Compile pattern text into one byte predicate per position
pub(crate) fn parse(pattern: &str) -> Result<Vec<ByteSet>, BinaryError> {
    let mut parser = Parser {
        text: pattern.as_bytes(),
        pos: 0,
    };
    parser.sequence(false)
}

struct Parser<'a> {
    text: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error<T>(&self, reason: &'static str) -> Result<T, BinaryError> {
        Err(BinaryError::InvalidPattern {
            position: self.pos,
            reason,
        })
    }

    fn skip_whitespace(&mut self) {
        while self.text.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.text.get(self.pos).copied()
    }

    fn next_char(&mut self) -> Result<u8, BinaryError> {
        match self.text.get(self.pos) {
            Some(&c) => {
                self.pos += 1;
                Ok(c)
            }
            None => self.error("unexpected end of pattern"),
        }
    }

    fn sequence(&mut self, nested: bool) -> Result<Vec<ByteSet>, BinaryError> {
        let mut out = Vec::new();
        let mut last: Option<Vec<ByteSet>> = None;
        loop {
            match self.peek() {
                None if nested => return self.error("unclosed group"),
                None => break,
                Some(b')') if nested => {
                    self.pos += 1;
                    break;
                }
                Some(b')') => return self.error("unexpected group end"),
                Some(b'(') => {
                    self.pos += 1;
                    let group = self.sequence(true)?;
                    if group.is_empty() {
                        return self.error("empty group");
                    }
                    out.extend_from_slice(&group);
                    last = Some(group);
                }
                Some(b'{') => {
                    self.pos += 1;
                    let count = self.decimal()?;
                    if self.peek() != Some(b'}') {
                        return self.error("unclosed quantor");
                    }
                    self.pos += 1;
                    let Some(element) = last.take() else {
                        return self.error("quantor without element");
                    };
                    if count == 0 {
                        return self.error("zero quantor");
                    }
                    for _ in 1..count {
                        out.extend_from_slice(&element);
                    }
                }
                Some(_) => {
                    let set = self.disjunction()?;
                    out.push(set);
                    last = Some(vec![set]);
                }
            }
        }
        Ok(out)
    }

    fn disjunction(&mut self) -> Result<ByteSet, BinaryError> {
        let mut set = self.conjunction()?;
        while self.peek() == Some(b'|') {
            self.pos += 1;
            set = set.union(self.conjunction()?);
            self.check_composite(set)?;
        }
        Ok(set)
    }

    fn conjunction(&mut self) -> Result<ByteSet, BinaryError> {
        let mut set = self.range()?;
        while self.peek() == Some(b'&') {
            self.pos += 1;
            set = set.intersection(self.range()?);
            self.check_composite(set)?;
        }
        Ok(set)
    }

    fn range(&mut self) -> Result<ByteSet, BinaryError> {
        let lo = self.atom()?;
        if self.peek() != Some(b'-') {
            return Ok(lo);
        }
        self.pos += 1;
        let hi = self.atom()?;
        let (Some(lo), Some(hi)) = (lo.single_value(), hi.single_value()) else {
            return self.error("range bounds must be single values");
        };
        if lo >= hi {
            return self.error("empty range");
        }
        let set = ByteSet::range(lo, hi);
        self.check_composite(set)?;
        Ok(set)
    }

    fn atom(&mut self) -> Result<ByteSet, BinaryError> {
        let Some(c) = self.peek() else {
            return self.error("missing operand");
        };
        self.pos += 1;
        match c {
            b'?' => Ok(ByteSet::FULL),
            b'%' => self.bitmask(),
            b'\'' => self.next_char().map(ByteSet::single),
            b'*' => {
                let divisor = self.decimal()?;
                if !(2..128).contains(&divisor) {
                    return self.error("invalid multiplicity");
                }
                Ok(ByteSet::from_fn(|v| usize::from(v) % divisor == 0))
            }
            _ => {
                let hi = self.nibble(c)?;
                let next = self.next_char()?;
                let lo = self.nibble(next)?;
                Ok(ByteSet::from_fn(|v| {
                    hi.is_none_or(|h| v >> 4 == h) && lo.is_none_or(|l| v & 0x0f == l)
                }))
            }
        }
    }

    /// `None` is a wildcard nibble
    fn nibble(&self, c: u8) -> Result<Option<u8>, BinaryError> {
        match c {
            b'x' | b'X' => Ok(None),
            _ => match (c as char).to_digit(16) {
                Some(d) => Ok(Some(d as u8)),
                None => self.error("invalid character"),
            },
        }
    }

    fn bitmask(&mut self) -> Result<ByteSet, BinaryError> {
        let mut mask = 0u8;
        let mut value = 0u8;
        for _ in 0..8 {
            mask <<= 1;
            value <<= 1;
            match self.next_char()? {
                b'0' => mask |= 1,
                b'1' => {
                    mask |= 1;
                    value |= 1;
                }
                b'x' | b'X' => {}
                _ => return self.error("invalid bitmask"),
            }
        }
        let set = ByteSet::from_fn(|v| v & mask == value);
        if set.is_full() {
            return self.error("bitmask accepts everything");
        }
        Ok(set)
    }

    fn decimal(&mut self) -> Result<usize, BinaryError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut value = 0usize;
        while let Some(&c) = self.text.get(self.pos).filter(|c| c.is_ascii_digit()) {
            value = match value
                .checked_mul(10)
                .and_then(|v| v.checked_add(usize::from(c - b'0')))
            {
                Some(v) => v,
                None => return self.error("number too large"),
            };
            self.pos += 1;
        }
        if self.pos == start {
            return self.error("number expected");
        }
        Ok(value)
    }

    fn check_composite(&self, set: ByteSet) -> Result<(), BinaryError> {
        if set.is_empty() {
            self.error("predicate accepts nothing")
        } else if set.is_full() {
            self.error("predicate accepts everything")
        } else {
            Ok(())
        }
    }
}
