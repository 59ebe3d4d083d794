//! Address-range records.
//!
//! A [`Region`] is a plain value: it names the half-open range
//! `[start, start + length)` inside a simulated address space. Nothing here
//! touches real memory.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A contiguous logical address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// First address covered by the region.
    pub start: usize,
    /// Number of addresses covered. Always positive while held by an allocator.
    pub length: usize,
}

impl Region {
    /// Creates a region covering `[start, start + length)`.
    #[must_use]
    pub const fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// One past the last covered address.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.length
    }

    /// Returns true when `next` begins exactly where `self` ends.
    #[must_use]
    pub const fn is_adjacent_to(&self, next: &Region) -> bool {
        self.end() == next.start
    }

    /// Returns true when the two ranges share at least one address.
    #[must_use]
    pub const fn overlaps(&self, other: &Region) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Splits `length` addresses off the front.
    ///
    /// Returns `(head, tail)` where `tail` is `None` for an exact fit. The
    /// caller guarantees `0 < length <= self.length`.
    #[must_use]
    pub const fn split_front(&self, length: usize) -> (Region, Option<Region>) {
        let head = Region::new(self.start, length);
        if length == self.length {
            (head, None)
        } else {
            (
                head,
                Some(Region::new(self.start + length, self.length - length)),
            )
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} , {})", self.start, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_and_adjacency() {
        let a = Region::new(0, 20);
        let b = Region::new(20, 80);
        assert_eq!(a.end(), 20);
        assert!(a.is_adjacent_to(&b));
        assert!(!b.is_adjacent_to(&a));
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = Region::new(10, 10);
        assert!(!a.overlaps(&Region::new(20, 5)));
        assert!(!a.overlaps(&Region::new(0, 10)));
        assert!(a.overlaps(&Region::new(19, 1)));
        assert!(a.overlaps(&Region::new(0, 11)));
    }

    #[test]
    fn test_split_front() {
        let r = Region::new(250, 20);
        assert_eq!(
            r.split_front(17),
            (Region::new(250, 17), Some(Region::new(267, 3)))
        );
        assert_eq!(r.split_front(20), (Region::new(250, 20), None));
    }

    #[test]
    fn test_display() {
        assert_eq!(Region::new(0, 100).to_string(), "(0 , 100)");
    }
}
