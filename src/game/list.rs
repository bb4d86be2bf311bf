//! Index-based singly-linked entity pool.
//!
//! Nodes live in a slot vector and link to each other by index. New entries
//! always become the head. Slots are reused through a free list and carry a
//! generation so a stale [`SlotId`] never resolves to a newer entity.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    #[error("entity list is full")]
    Full,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

#[derive(Debug)]
pub struct EntityList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    len: usize,
    capacity: usize,
}

impl<T> EntityList<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            len: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push_front(&mut self, value: T) -> Result<SlotId, ListError> {
        if self.is_full() {
            return Err(ListError::Full);
        }
        let node = Node {
            value,
            next: self.head,
        };
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };
        self.head = Some(index);
        self.len += 1;
        Ok(SlotId {
            index,
            generation: self.slots[index].generation,
        })
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref().map(|n| &n.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut().map(|n| &mut n.value)
    }

    /// Unlinks `id`, walking from the head to find its predecessor.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        let mut cursor = self.cursor_mut();
        while let Some(current) = cursor.current_id() {
            if current == id {
                return cursor.remove_current();
            }
            cursor.advance();
        }
        None
    }

    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<SlotId> {
        self.iter().find(|(_, v)| pred(v)).map(|(id, _)| id)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            next: self.head,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.iter().map(|(_, v)| v)
    }

    pub fn cursor_mut(&mut self) -> CursorMut<'_, T> {
        let current = self.head;
        CursorMut {
            list: self,
            prev: None,
            current,
        }
    }

    /// Runs `f` on every entry in list order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        let mut cursor = self.cursor_mut();
        while let Some(value) = cursor.current() {
            f(value);
            cursor.advance();
        }
    }

    /// Empties the list, handing back the entries in list order.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.cursor_mut();
        while let Some(value) = cursor.remove_current() {
            out.push(value);
        }
        out
    }

    fn node(&self, index: usize) -> Option<&Node<T>> {
        self.slots.get(index).and_then(|s| s.node.as_ref())
    }

    fn id_of(&self, index: usize) -> SlotId {
        SlotId {
            index,
            generation: self.slots[index].generation,
        }
    }
}

pub struct Iter<'a, T> {
    list: &'a EntityList<T>,
    next: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let node = self.list.node(index)?;
        self.next = node.next;
        Some((self.list.id_of(index), &node.value))
    }
}

/// Walks the list keeping track of the predecessor, so the current entry
/// can be spliced out in place.
pub struct CursorMut<'a, T> {
    list: &'a mut EntityList<T>,
    prev: Option<usize>,
    current: Option<usize>,
}

impl<T> CursorMut<'_, T> {
    pub fn current(&mut self) -> Option<&mut T> {
        let index = self.current?;
        self.list.slots[index].node.as_mut().map(|n| &mut n.value)
    }

    pub fn current_id(&self) -> Option<SlotId> {
        self.current.map(|index| self.list.id_of(index))
    }

    pub fn advance(&mut self) {
        if let Some(index) = self.current {
            self.prev = Some(index);
            self.current = self.list.node(index).and_then(|n| n.next);
        }
    }

    /// Relinks predecessor to successor and moves onto the successor.
    pub fn remove_current(&mut self) -> Option<T> {
        let index = self.current?;
        let node = self.list.slots[index].node.take()?;
        match self.prev {
            Some(prev) => {
                if let Some(prev_node) = self.list.slots[prev].node.as_mut() {
                    prev_node.next = node.next;
                }
            }
            None => self.list.head = node.next,
        }
        self.list.free.push(index);
        self.list.len -= 1;
        self.current = node.next;
        Some(node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(values: &[u32]) -> (EntityList<u32>, Vec<SlotId>) {
        let mut list = EntityList::with_capacity(16);
        let ids = values
            .iter()
            .map(|v| list.push_front(*v).unwrap())
            .collect();
        (list, ids)
    }

    fn contents(list: &EntityList<u32>) -> Vec<u32> {
        list.values().copied().collect()
    }

    #[test]
    fn test_push_front_becomes_head() {
        let (list, _) = list_of(&[1, 2, 3]);
        assert_eq!(contents(&list), vec![3, 2, 1]);
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let (mut list, ids) = list_of(&[1, 2, 3, 4, 5]);

        assert_eq!(list.remove(ids[4]), Some(5), "head");
        assert_eq!(contents(&list), vec![4, 3, 2, 1]);

        assert_eq!(list.remove(ids[2]), Some(3), "middle");
        assert_eq!(contents(&list), vec![4, 2, 1]);

        assert_eq!(list.remove(ids[0]), Some(1), "tail");
        assert_eq!(contents(&list), vec![4, 2]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_cursor_splices_consecutive_entries() {
        let (mut list, _) = list_of(&[1, 2, 3, 4, 5, 6]);
        let mut cursor = list.cursor_mut();
        while let Some(value) = cursor.current() {
            if *value % 2 == 0 || *value == 5 {
                cursor.remove_current();
            } else {
                cursor.advance();
            }
        }
        assert_eq!(contents(&list), vec![3, 1]);
    }

    #[test]
    fn test_stale_id_does_not_resolve_after_reuse() {
        let (mut list, ids) = list_of(&[1]);
        list.remove(ids[0]);
        let fresh = list.push_front(9).unwrap();
        assert_eq!(list.get(ids[0]), None);
        assert_eq!(list.get(fresh), Some(&9));
        assert_eq!(list.remove(ids[0]), None);
    }

    #[test]
    fn test_capacity_rejects_without_touching_list() {
        let mut list = EntityList::with_capacity(2);
        list.push_front(1).unwrap();
        list.push_front(2).unwrap();
        assert_eq!(list.push_front(3), Err(ListError::Full));
        assert_eq!(contents(&list), vec![2, 1]);
    }

    #[test]
    fn test_drain_returns_list_order() {
        let (mut list, _) = list_of(&[1, 2, 3]);
        assert_eq!(list.drain(), vec![3, 2, 1]);
        assert!(list.is_empty());
        list.push_front(4).unwrap();
        assert_eq!(contents(&list), vec![4]);
    }
}
