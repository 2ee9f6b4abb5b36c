//! Queue: кольцевой буфер фиксированной ёмкости
//! Queue: fixed-capacity circular buffer
//!
//! Одна структура, три применения / One structure, three uses:
//!   A  FIFO конвертов сообщений        / FIFO of message envelopes
//!   B  FIFO идентификаторов процессов  / FIFO of process ids
//!   C  двоичная min-куча процессов     / binary min-heap of process ids
//!
//! Ключ кучи не хранится в очереди: его даёт замыкание `key` при каждой
//! операции, поэтому порядок всегда отражает текущий приоритет.
//! The heap key is not stored in the queue: a `key` closure supplies it on
//! every operation, so ordering always reflects the live priority.
//!
//! Индексы логические, 0 соответствует слоту `front`. Очередь используется либо как
//! FIFO, либо как куча, но не одновременно.
//! Indices are logical: 0 is the `front` slot. A queue is used either as a
//! FIFO or as a heap, never both at once.

pub mod pid;

pub use pid::{Discipline, PidQueue};

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::{Error, Result};

/// Кольцевой буфер / Circular buffer
pub struct Queue<T> {
    /// Хранилище выделяется один раз / Backing store, allocated once.
    slots: Box<[Option<T>]>,
    front: usize,
    end:   usize,
    count: usize,
}

impl<T> Queue<T> {
    /// Create an empty queue holding at most `capacity` items.
    ///
    /// Нулевая ёмкость допустима: такая очередь всегда полна.
    /// Zero capacity is allowed: such a queue is always full.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots: slots.into_boxed_slice(), front: 0, end: 0, count: 0 }
    }

    /// Сбросить в пустое состояние; память не освобождается.
    /// Reset to empty without releasing the backing store.
    pub fn init(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.front = 0;
        self.end = 0;
        self.count = 0;
    }

    pub fn capacity(&self) -> usize { self.slots.len() }
    pub fn len(&self) -> usize      { self.count }
    pub fn is_empty(&self) -> bool  { self.count == 0 }
    pub fn is_full(&self) -> bool   { self.count == self.slots.len() }

    #[inline]
    fn phys(&self, index: usize) -> usize {
        (self.front + index) % self.slots.len()
    }

    #[inline]
    fn retreat_end(&mut self) {
        let cap = self.slots.len();
        self.end = (self.end + cap - 1) % cap;
    }

    /// Элемент по логическому индексу / Item at a logical index.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.count {
            return None;
        }
        self.slots[self.phys(index)].as_ref()
    }

    /// Положить в хвост / Append at `end`.
    ///
    /// Полная очередь даёт `Err(NoSpace)`, элемент не теряется молча.
    /// A full queue yields `Err(NoSpace)`; nothing is dropped silently.
    pub fn enqueue(&mut self, item: T) -> Result<()> {
        if self.is_full() {
            return Err(Error::NoSpace);
        }
        self.slots[self.end] = Some(item);
        self.end = (self.end + 1) % self.slots.len();
        self.count += 1;
        Ok(())
    }

    /// Взять из головы / Take from `front`.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let item = self.slots[self.front].take();
        self.front = (self.front + 1) % self.slots.len();
        self.count -= 1;
        item
    }

    pub fn peek(&self) -> Option<&T> {
        self.get(0)
    }

    /// Position of the first item matching `pred`, oldest first.
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        (0..self.count).find(|&i| self.slots[self.phys(i)].as_ref().is_some_and(&mut pred))
    }

    /// Удалить первый подходящий элемент, сдвинув хвост на одну позицию.
    /// Remove the first item matching `pred`, shifting later items back by one.
    pub fn fifo_delete(&mut self, pred: impl FnMut(&T) -> bool) -> Result<T> {
        let at = self.position(pred).ok_or(Error::NotFound)?;
        let phys = self.phys(at);
        let removed = self.slots[phys].take();
        for i in at..self.count - 1 {
            let (dst, src) = (self.phys(i), self.phys(i + 1));
            self.slots[dst] = self.slots[src].take();
        }
        self.count -= 1;
        self.retreat_end();
        removed.ok_or(Error::NotFound)
    }

    /// Iterate from oldest to newest (heap order when used as a heap).
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).filter_map(move |i| self.slots[self.phys(i)].as_ref())
    }

    /// Drain everything, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        core::iter::from_fn(move || self.dequeue())
    }

    // ── Двоичная куча / Binary heap ──────────────────────────────────────────

    #[inline]
    fn key_at<K: Ord>(&self, index: usize, key: &impl Fn(&T) -> K) -> Option<K> {
        self.slots[self.phys(index)].as_ref().map(key)
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        let (pa, pb) = (self.phys(a), self.phys(b));
        self.slots.swap(pa, pb);
    }

    fn sift_up<K: Ord>(&mut self, mut index: usize, key: &impl Fn(&T) -> K) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.key_at(parent, key) <= self.key_at(index, key) {
                break;
            }
            self.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down<K: Ord>(&mut self, mut index: usize, key: &impl Fn(&T) -> K) {
        loop {
            let left = 2 * index + 1;
            if left >= self.count {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < self.count && self.key_at(right, key) < self.key_at(left, key) {
                child = right;
            }
            if self.key_at(index, key) <= self.key_at(child, key) {
                break;
            }
            self.swap(index, child);
            index = child;
        }
    }

    /// O(log n) вставка в кучу / O(log n) heap insert.
    pub fn heap_insert<K: Ord>(&mut self, item: T, key: impl Fn(&T) -> K) -> Result<()> {
        self.enqueue(item)?;
        self.sift_up(self.count - 1, &key);
        debug_assert!(self.is_heap(&key));
        Ok(())
    }

    /// O(log n) извлечение минимума / O(log n) extract-min.
    pub fn heap_extract_min<K: Ord>(&mut self, key: impl Fn(&T) -> K) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let last = self.count - 1;
        self.swap(0, last);
        let min = self.slots[self.phys(last)].take();
        self.count -= 1;
        self.retreat_end();
        self.sift_down(0, &key);
        debug_assert!(self.is_heap(&key));
        min
    }

    /// Удалить произвольный элемент: поднять его в корень как «минус
    /// бесконечность», затем извлечь минимум.
    /// Delete an arbitrary item: float it to the root as if its key were
    /// minus infinity, then extract the minimum.
    pub fn heap_delete<K: Ord>(
        &mut self,
        pred: impl FnMut(&T) -> bool,
        key: impl Fn(&T) -> K,
    ) -> Result<T> {
        let mut index = self.position(pred).ok_or(Error::NotFound)?;
        while index > 0 {
            let parent = (index - 1) / 2;
            self.swap(parent, index);
            index = parent;
        }
        self.heap_extract_min(key).ok_or(Error::NotFound)
    }

    /// Проверка инварианта кучи / Heap invariant check.
    pub fn is_heap<K: Ord>(&self, key: &impl Fn(&T) -> K) -> bool {
        (1..self.count).all(|i| self.key_at((i - 1) / 2, key) <= self.key_at(i, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let mut q = Queue::with_capacity(4);
        q.enqueue('a').unwrap();
        q.enqueue('b').unwrap();
        assert_eq!(q.dequeue(), Some('a'));
        assert_eq!(q.dequeue(), Some('b'));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn full_queue_reports_no_space() {
        let mut q = Queue::with_capacity(2);
        q.enqueue(1).unwrap();
        q.enqueue(2).unwrap();
        assert_eq!(q.enqueue(3), Err(Error::NoSpace));
        assert_eq!(q.len(), 2);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn wraps_around_the_backing_store() {
        let mut q = Queue::with_capacity(3);
        for i in 0..3 {
            q.enqueue(i).unwrap();
        }
        assert_eq!(q.dequeue(), Some(0));
        assert_eq!(q.dequeue(), Some(1));
        q.enqueue(3).unwrap();
        q.enqueue(4).unwrap();
        assert!(q.is_full());
        assert_eq!(q.drain().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert!(q.is_empty());
    }

    #[test]
    fn fifo_delete_shifts_through_the_wrap() {
        let mut q = Queue::with_capacity(4);
        for i in 0..4 {
            q.enqueue(i).unwrap();
        }
        q.dequeue();
        q.dequeue();
        q.enqueue(4).unwrap();
        q.enqueue(5).unwrap(); // 2 3 | 4 5 wrapped
        assert_eq!(q.fifo_delete(|&x| x == 3), Ok(3));
        assert_eq!(q.fifo_delete(|&x| x == 9), Err(Error::NotFound));
        q.enqueue(6).unwrap();
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![2, 4, 5, 6]);
    }

    #[test]
    fn init_resets_to_empty() {
        let mut q = Queue::with_capacity(2);
        q.enqueue(7).unwrap();
        q.init();
        assert!(q.is_empty());
        assert_eq!(q.capacity(), 2);
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let mut q: Queue<u8> = Queue::with_capacity(0);
        assert!(q.is_full() && q.is_empty());
        assert_eq!(q.enqueue(1), Err(Error::NoSpace));
        assert_eq!(q.heap_insert(1, |&x| x), Err(Error::NoSpace));
        assert_eq!(q.dequeue(), None);
        assert_eq!(q.heap_extract_min(|&x| x), None);
        assert_eq!(q.fifo_delete(|&x| x == 1), Err(Error::NotFound));
    }

    #[test]
    fn heap_extracts_in_key_order() {
        let mut q = Queue::with_capacity(8);
        for v in [5u8, 1, 3, 7, 0, 4] {
            q.heap_insert(v, |&x| x).unwrap();
        }
        let mut out = Vec::new();
        while let Some(v) = q.heap_extract_min(|&x| x) {
            out.push(v);
        }
        assert_eq!(out, vec![0, 1, 3, 4, 5, 7]);
    }

    #[test]
    fn heap_delete_keeps_invariant() {
        let mut q = Queue::with_capacity(8);
        for v in [6u8, 2, 9, 4, 8, 1, 7] {
            q.heap_insert(v, |&x| x).unwrap();
        }
        assert_eq!(q.heap_delete(|&x| x == 4, |&x| x), Ok(4));
        assert_eq!(q.heap_delete(|&x| x == 1, |&x| x), Ok(1));
        assert_eq!(q.heap_delete(|&x| x == 3, |&x| x), Err(Error::NotFound));
        assert!(q.is_heap(&|&x: &u8| x));
        assert_eq!(q.len(), 5);
        assert_eq!(q.heap_extract_min(|&x| x), Some(2));
    }

    #[test]
    fn heap_reads_live_keys() {
        // Ключи снаружи, как приоритеты в таблице / Keys live outside, like table priorities
        let prio = [3u8, 1, 2];
        let mut q = Queue::with_capacity(3);
        for i in 0..3usize {
            q.heap_insert(i, |&i| prio[i]).unwrap();
        }
        assert_eq!(q.heap_extract_min(|&i| prio[i]), Some(1));
        assert_eq!(q.heap_extract_min(|&i| prio[i]), Some(2));
        assert_eq!(q.heap_extract_min(|&i| prio[i]), Some(0));
    }
}
