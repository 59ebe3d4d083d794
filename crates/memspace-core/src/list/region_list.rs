//! Ordered region sequence backed by a slot arena.
//!
//! Elements live in a `Vec` of slots threaded into a doubly linked chain.
//! Positions are addressed either by index (linear walk) or by a
//! [`RegionHandle`], which stays valid until its element is removed. Each
//! slot carries a generation counter that is bumped on release, so a stale or
//! foreign handle is rejected instead of silently aliasing a recycled slot.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::ListError;
use crate::region::Region;

/// Source of per-list identities stamped into handles.
static NEXT_LIST_ID: AtomicU32 = AtomicU32::new(1);

fn next_list_id() -> u32 {
    NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Stable reference to one element of a [`RegionList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionHandle {
    list_id: u32,
    slot: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    region: Region,
    generation: u32,
    occupied: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Insertion-ordered sequence of regions.
///
/// O(1) insertion at either end and O(1) removal through a handle; positional
/// lookup, insertion and removal walk from the front.
pub struct RegionList {
    id: u32,
    slots: Vec<Slot>,
    /// Released slot indices available for reuse.
    vacant: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl RegionList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_list_id(),
            slots: Vec::new(),
            vacant: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of regions in the list.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the list holds no regions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handle of the first element, if any.
    #[must_use]
    pub fn first(&self) -> Option<RegionHandle> {
        self.head.map(|slot| self.handle(slot))
    }

    /// Handle of the last element, if any.
    #[must_use]
    pub fn last(&self) -> Option<RegionHandle> {
        self.tail.map(|slot| self.handle(slot))
    }

    /// Returns the handle at `index`.
    ///
    /// `index == len()` is accepted as the one-past-the-end cursor position
    /// and yields `Ok(None)`; anything larger is out of bounds.
    pub fn get(&self, index: usize) -> Result<Option<RegionHandle>, ListError> {
        if index > self.len {
            return Err(self.out_of_bounds(index));
        }
        Ok(self.slot_at(index).map(|slot| self.handle(slot)))
    }

    /// Returns the region stored at `index`.
    ///
    /// Unlike [`RegionList::get`], the end cursor has nothing to dereference,
    /// so the valid range is `[0, len())`.
    pub fn value_at(&self, index: usize) -> Result<Region, ListError> {
        self.slot_at(index)
            .map(|slot| self.slots[slot].region)
            .ok_or_else(|| self.out_of_bounds(index))
    }

    /// Returns the region a handle points at.
    pub fn region(&self, handle: RegionHandle) -> Result<Region, ListError> {
        let slot = self.resolve(handle)?;
        Ok(self.slots[slot].region)
    }

    /// Returns the handle following `handle`, or `None` at the end.
    pub fn next_handle(&self, handle: RegionHandle) -> Result<Option<RegionHandle>, ListError> {
        let slot = self.resolve(handle)?;
        Ok(self.slots[slot].next.map(|next| self.handle(next)))
    }

    /// Inserts `region` so that it ends up at position `index`.
    ///
    /// `index` must lie in `[0, len()]`. Constant time at either end.
    pub fn insert(&mut self, index: usize, region: Region) -> Result<RegionHandle, ListError> {
        if index > self.len {
            return Err(self.out_of_bounds(index));
        }
        let before = self.slot_at(index);
        let slot = self.claim_slot(region);
        match before {
            None => self.link_back(slot),
            Some(at) => self.link_before(at, slot),
        }
        Ok(self.handle(slot))
    }

    /// Inserts `region` at the front.
    pub fn push_front(&mut self, region: Region) -> RegionHandle {
        let slot = self.claim_slot(region);
        self.link_front(slot);
        self.handle(slot)
    }

    /// Appends `region` at the back.
    pub fn push_back(&mut self, region: Region) -> RegionHandle {
        let slot = self.claim_slot(region);
        self.link_back(slot);
        self.handle(slot)
    }

    /// Position of the first region equal to `region`, scanning front to back.
    #[must_use]
    pub fn index_of(&self, region: &Region) -> Option<usize> {
        self.iter().position(|candidate| candidate == region)
    }

    /// Removes and returns the region at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<Region, ListError> {
        let slot = self
            .slot_at(index)
            .ok_or_else(|| self.out_of_bounds(index))?;
        Ok(self.unlink(slot))
    }

    /// Removes the element `handle` refers to.
    ///
    /// A handle minted by another list, or one whose element was already
    /// removed, is rejected with [`ListError::ForeignHandle`].
    pub fn remove_handle(&mut self, handle: RegionHandle) -> Result<Region, ListError> {
        let slot = self.resolve(handle)?;
        Ok(self.unlink(slot))
    }

    /// Removes the first region equal to `region`.
    pub fn remove_value(&mut self, region: &Region) -> Result<Region, ListError> {
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            if self.slots[slot].region == *region {
                return Ok(self.unlink(slot));
            }
            cursor = self.slots[slot].next;
        }
        Err(ListError::NotFound(*region))
    }

    /// Swaps the payload at `handle` for `region`, returning the old value.
    ///
    /// The element keeps its position and its handle stays valid.
    pub fn replace(&mut self, handle: RegionHandle, region: Region) -> Result<Region, ListError> {
        let slot = self.resolve(handle)?;
        Ok(std::mem::replace(&mut self.slots[slot].region, region))
    }

    /// Reorders the payloads by ascending `start`.
    ///
    /// Bubble sort over the chain, swapping payloads between positions.
    /// Handles keep naming positions, not regions.
    pub fn sort_by_start(&mut self) {
        if self.len < 2 {
            return;
        }
        let order: Vec<usize> = self.slot_order().collect();
        for pass in 0..order.len() - 1 {
            let mut swapped = false;
            for j in 0..order.len() - pass - 1 {
                let (a, b) = (order[j], order[j + 1]);
                if self.slots[a].region.start > self.slots[b].region.start {
                    let held = self.slots[a].region;
                    self.slots[a].region = self.slots[b].region;
                    self.slots[b].region = held;
                    swapped = true;
                }
            }
            if !swapped {
                break;
            }
        }
    }

    /// Removes every element. Outstanding handles become invalid.
    pub fn clear(&mut self) {
        while let Some(slot) = self.head {
            self.unlink(slot);
        }
    }

    /// Forward iterator over the regions, front to back.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Forward iterator yielding each element's handle alongside its region.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Copies the regions out in list order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Region> {
        self.iter().copied().collect()
    }

    fn handle(&self, slot: usize) -> RegionHandle {
        RegionHandle {
            list_id: self.id,
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn resolve(&self, handle: RegionHandle) -> Result<usize, ListError> {
        if handle.list_id != self.id {
            return Err(ListError::ForeignHandle);
        }
        match self.slots.get(handle.slot) {
            Some(slot) if slot.occupied && slot.generation == handle.generation => Ok(handle.slot),
            _ => Err(ListError::ForeignHandle),
        }
    }

    fn out_of_bounds(&self, index: usize) -> ListError {
        ListError::IndexOutOfBounds {
            index,
            size: self.len,
        }
    }

    /// Slot index of position `index`, or `None` at or past the end.
    fn slot_at(&self, index: usize) -> Option<usize> {
        if index >= self.len {
            return None;
        }
        if index == self.len - 1 {
            return self.tail;
        }
        self.slot_order().nth(index)
    }

    fn slot_order(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.head, |&slot| self.slots[slot].next)
    }

    fn claim_slot(&mut self, region: Region) -> usize {
        if let Some(slot) = self.vacant.pop() {
            let entry = &mut self.slots[slot];
            entry.region = region;
            entry.occupied = true;
            entry.prev = None;
            entry.next = None;
            slot
        } else {
            self.slots.push(Slot {
                region,
                generation: 0,
                occupied: true,
                prev: None,
                next: None,
            });
            self.slots.len() - 1
        }
    }

    fn link_front(&mut self, slot: usize) {
        self.slots[slot].next = self.head;
        match self.head {
            Some(head) => self.slots[head].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.len += 1;
    }

    fn link_back(&mut self, slot: usize) {
        self.slots[slot].prev = self.tail;
        match self.tail {
            Some(tail) => self.slots[tail].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;
    }

    fn link_before(&mut self, at: usize, slot: usize) {
        let prev = self.slots[at].prev;
        self.slots[slot].prev = prev;
        self.slots[slot].next = Some(at);
        self.slots[at].prev = Some(slot);
        match prev {
            Some(prev) => self.slots[prev].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.len += 1;
    }

    fn unlink(&mut self, slot: usize) -> Region {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => self.tail = prev,
        }

        let entry = &mut self.slots[slot];
        entry.occupied = false;
        entry.generation = entry.generation.wrapping_add(1);
        entry.prev = None;
        entry.next = None;
        self.vacant.push(slot);
        self.len -= 1;
        entry.region
    }
}

impl Default for RegionList {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning yields an independent list with its own identity; handles from
/// the source do not resolve against the clone.
impl Clone for RegionList {
    fn clone(&self) -> Self {
        self.iter().copied().collect()
    }
}

impl PartialEq for RegionList {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for RegionList {}

impl fmt::Debug for RegionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Each region followed by a single space, front to back.
impl fmt::Display for RegionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for region in self {
            write!(f, "{region} ")?;
        }
        Ok(())
    }
}

impl FromIterator<Region> for RegionList {
    fn from_iter<I: IntoIterator<Item = Region>>(iter: I) -> Self {
        let mut list = RegionList::new();
        for region in iter {
            list.push_back(region);
        }
        list
    }
}

/// Borrowing iterator over a [`RegionList`].
pub struct Iter<'a> {
    list: &'a RegionList,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Region;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let entry = &self.list.slots[slot];
        self.cursor = entry.next;
        self.remaining -= 1;
        Some(&entry.region)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a RegionList {
    type Item = &'a Region;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over `(handle, region)` pairs of a [`RegionList`].
pub struct Entries<'a> {
    list: &'a RegionList,
    cursor: Option<usize>,
    remaining: usize,
}

impl Iterator for Entries<'_> {
    type Item = (RegionHandle, Region);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let entry = &self.list.slots[slot];
        self.cursor = entry.next;
        self.remaining -= 1;
        Some((self.list.handle(slot), entry.region))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(regions: &[(usize, usize)]) -> RegionList {
        regions
            .iter()
            .map(|&(start, length)| Region::new(start, length))
            .collect()
    }

    fn starts(list: &RegionList) -> Vec<usize> {
        list.iter().map(|r| r.start).collect()
    }

    #[test]
    fn test_new_list_is_empty() {
        let list = RegionList::new();
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert!(list.first().is_none());
        assert!(list.last().is_none());
        assert!(list.iter().next().is_none());
    }

    #[test]
    fn test_push_front_and_back() {
        let mut list = RegionList::new();
        list.push_back(Region::new(10, 1));
        list.push_front(Region::new(0, 1));
        list.push_back(Region::new(20, 1));
        assert_eq!(starts(&list), vec![0, 10, 20]);
        assert_eq!(list.region(list.first().unwrap()), Ok(Region::new(0, 1)));
        assert_eq!(list.region(list.last().unwrap()), Ok(Region::new(20, 1)));
    }

    #[test]
    fn test_insert_in_middle() {
        let mut list = list_of(&[(0, 1), (20, 1), (30, 1)]);
        list.insert(1, Region::new(10, 1)).unwrap();
        assert_eq!(starts(&list), vec![0, 10, 20, 30]);
        list.insert(4, Region::new(40, 1)).unwrap();
        list.insert(0, Region::new(99, 1)).unwrap();
        assert_eq!(starts(&list), vec![99, 0, 10, 20, 30, 40]);
        assert_eq!(list.len(), 6);
    }

    #[test]
    fn test_insert_past_end_fails() {
        let mut list = list_of(&[(0, 1)]);
        assert_eq!(
            list.insert(2, Region::new(5, 1)),
            Err(ListError::IndexOutOfBounds { index: 2, size: 1 })
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_get_tolerates_end_cursor() {
        let list = list_of(&[(0, 1), (5, 1)]);
        assert!(list.get(1).unwrap().is_some());
        assert_eq!(list.get(2), Ok(None));
        assert_eq!(
            list.get(3),
            Err(ListError::IndexOutOfBounds { index: 3, size: 2 })
        );
        assert_eq!(RegionList::new().get(0), Ok(None));
    }

    #[test]
    fn test_value_at_rejects_end_cursor() {
        let list = list_of(&[(0, 1), (5, 2)]);
        assert_eq!(list.value_at(1), Ok(Region::new(5, 2)));
        assert_eq!(
            list.value_at(2),
            Err(ListError::IndexOutOfBounds { index: 2, size: 2 })
        );
    }

    #[test]
    fn test_extreme_indices_are_out_of_bounds() {
        let mut list = list_of(&[(0, 1)]);
        assert_eq!(
            list.value_at(usize::MAX),
            Err(ListError::IndexOutOfBounds {
                index: usize::MAX,
                size: 1
            })
        );
        assert_eq!(
            list.get(usize::MAX),
            Err(ListError::IndexOutOfBounds {
                index: usize::MAX,
                size: 1
            })
        );
        assert_eq!(
            list.remove_at(usize::MAX),
            Err(ListError::IndexOutOfBounds {
                index: usize::MAX,
                size: 1
            })
        );
        assert_eq!(
            RegionList::new().remove_at(usize::MAX),
            Err(ListError::IndexOutOfBounds {
                index: usize::MAX,
                size: 0
            })
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_index_of_finds_first_match() {
        let list = list_of(&[(0, 1), (5, 2), (0, 1)]);
        assert_eq!(list.index_of(&Region::new(0, 1)), Some(0));
        assert_eq!(list.index_of(&Region::new(5, 2)), Some(1));
        assert_eq!(list.index_of(&Region::new(7, 1)), None);
    }

    #[test]
    fn test_remove_at_relinks() {
        let mut list = list_of(&[(0, 1), (10, 1), (20, 1)]);
        assert_eq!(list.remove_at(1), Ok(Region::new(10, 1)));
        assert_eq!(starts(&list), vec![0, 20]);
        assert_eq!(list.remove_at(1), Ok(Region::new(20, 1)));
        assert_eq!(list.region(list.last().unwrap()), Ok(Region::new(0, 1)));
        assert_eq!(list.remove_at(0), Ok(Region::new(0, 1)));
        assert!(list.is_empty());
        assert!(list.last().is_none());
        assert_eq!(
            list.remove_at(0),
            Err(ListError::IndexOutOfBounds { index: 0, size: 0 })
        );
    }

    #[test]
    fn test_remove_handle_and_stale_handle() {
        let mut list = list_of(&[(0, 1), (10, 1)]);
        let handle = list.first().unwrap();
        assert_eq!(list.remove_handle(handle), Ok(Region::new(0, 1)));
        assert_eq!(list.remove_handle(handle), Err(ListError::ForeignHandle));

        // The freed slot is recycled, but the old handle must not alias it.
        list.push_back(Region::new(30, 1));
        assert_eq!(list.region(handle), Err(ListError::ForeignHandle));
        assert_eq!(starts(&list), vec![10, 30]);
    }

    #[test]
    fn test_remove_handle_from_other_list_fails() {
        let mut a = list_of(&[(0, 1)]);
        let b = list_of(&[(0, 1)]);
        let foreign = b.first().unwrap();
        assert_eq!(a.remove_handle(foreign), Err(ListError::ForeignHandle));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_remove_value() {
        let mut list = list_of(&[(0, 1), (5, 2), (5, 2)]);
        assert_eq!(list.remove_value(&Region::new(5, 2)), Ok(Region::new(5, 2)));
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.remove_value(&Region::new(9, 9)),
            Err(ListError::NotFound(Region::new(9, 9)))
        );
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut list = list_of(&[(0, 10), (10, 5)]);
        let handle = list.first().unwrap();
        assert_eq!(list.replace(handle, Region::new(3, 7)), Ok(Region::new(0, 10)));
        assert_eq!(list.to_vec(), vec![Region::new(3, 7), Region::new(10, 5)]);
        assert_eq!(list.region(handle), Ok(Region::new(3, 7)));
    }

    #[test]
    fn test_sort_by_start() {
        let mut list = list_of(&[(50, 1), (0, 1), (30, 1), (10, 1), (20, 1)]);
        list.sort_by_start();
        assert_eq!(starts(&list), vec![0, 10, 20, 30, 50]);
        assert_eq!(list.len(), 5);
        assert_eq!(list.region(list.last().unwrap()), Ok(Region::new(50, 1)));
    }

    #[test]
    fn test_sort_after_recycling_slots() {
        let mut list = list_of(&[(1, 1), (2, 1), (3, 1)]);
        list.remove_at(0).unwrap();
        list.push_front(Region::new(9, 1));
        list.insert(2, Region::new(0, 1)).unwrap();
        list.sort_by_start();
        assert_eq!(starts(&list), vec![0, 2, 3, 9]);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let list = list_of(&[(0, 1), (4, 2)]);
        let first: Vec<_> = list.iter().copied().collect();
        let second: Vec<_> = (&list).into_iter().copied().collect();
        assert_eq!(first, second);
        assert_eq!(list.iter().len(), 2);
    }

    #[test]
    fn test_entries_walk_with_next_handle() {
        let list = list_of(&[(0, 1), (4, 2), (8, 3)]);
        let mut cursor = list.first();
        let mut walked = Vec::new();
        while let Some(handle) = cursor {
            walked.push(list.region(handle).unwrap());
            cursor = list.next_handle(handle).unwrap();
        }
        let via_entries: Vec<_> = list.entries().map(|(_, region)| region).collect();
        assert_eq!(walked, via_entries);
    }

    #[test]
    fn test_clone_has_own_identity() {
        let list = list_of(&[(0, 1)]);
        let copy = list.clone();
        assert_eq!(list, copy);
        assert_eq!(copy.region(list.first().unwrap()), Err(ListError::ForeignHandle));
    }

    #[test]
    fn test_clear() {
        let mut list = list_of(&[(0, 1), (2, 1)]);
        let handle = list.first().unwrap();
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.region(handle), Err(ListError::ForeignHandle));
    }

    #[test]
    fn test_display() {
        let list = list_of(&[(0, 20), (20, 80)]);
        assert_eq!(list.to_string(), "(0 , 20) (20 , 80) ");
        assert_eq!(RegionList::new().to_string(), "");
    }
}
