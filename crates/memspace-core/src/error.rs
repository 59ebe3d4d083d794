//! Error types for region lists and the allocator.

use thiserror::Error;

use crate::region::Region;

/// Failures raised by [`crate::list::RegionList`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("index {index} out of bounds for region list of size {size}")]
    IndexOutOfBounds { index: usize, size: usize },
    #[error("region {0} not found in list")]
    NotFound(Region),
    #[error("handle does not refer to a live element of this list")]
    ForeignHandle,
}

/// Failures raised by [`crate::malloc::Allocator`] operations.
///
/// Running out of contiguous space is not an error; `malloc` reports it
/// as `Ok(None)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocatorError {
    #[error("free called with nothing allocated")]
    EmptyAllocation,
    #[error("allocation length must be positive")]
    ZeroLength,
    #[error("memory space size must be positive")]
    ZeroCapacity,
    #[error("no allocated region starts at address {0}")]
    UnknownAddress(usize),
    #[error(transparent)]
    List(#[from] ListError),
}

/// A breach of the partition invariant found by
/// [`crate::malloc::Allocator::check_partition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("region {0} is empty")]
    EmptyRegion(Region),
    #[error("region {region} extends past the end of a {max_size}-address space")]
    OutOfRange { region: Region, max_size: usize },
    #[error("regions {0} and {1} overlap")]
    Overlap(Region, Region),
    #[error("addresses [{start}, {end}) are not covered by any region")]
    Gap { start: usize, end: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_error_wraps_transparently() {
        let err: AllocatorError = ListError::IndexOutOfBounds { index: 4, size: 3 }.into();
        assert_eq!(
            err.to_string(),
            "index 4 out of bounds for region list of size 3"
        );
    }

    #[test]
    fn test_messages_name_the_region() {
        let err = ListError::NotFound(Region::new(8, 2));
        assert_eq!(err.to_string(), "region (8 , 2) not found in list");
        let gap = InvariantViolation::Gap { start: 3, end: 9 };
        assert_eq!(gap.to_string(), "addresses [3, 9) are not covered by any region");
    }
}
