//! Fixed-capacity object pools
//!
//! Projectiles and particles are spawned and retired many times per second.
//! They live in preallocated slots that are locked while in use and handed
//! out again once the object reports it can be reused.

/// Objects that can live in a [`Pool`]
pub trait Poolable {
    /// The object has finished (expired, hit something, animation over)
    fn can_be_reused(&self) -> bool;
}

/// Fixed number of slots with locked/free tracking
#[derive(Debug, Clone)]
pub struct Pool<T> {
    objects: Vec<T>,
    locked: Vec<bool>,
    locked_count: usize,
    /// Slots freed most recently are handed out first
    free: Vec<usize>,
    name: &'static str,
}

impl<T: Poolable + Default> Pool<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let mut objects = Vec::with_capacity(capacity);
        objects.resize_with(capacity, T::default);
        Self {
            objects,
            locked: vec![false; capacity],
            locked_count: 0,
            free: (0..capacity).rev().collect(),
            name,
        }
    }
}

impl<T: Poolable> Pool<T> {
    pub fn capacity(&self) -> usize {
        self.objects.len()
    }

    pub fn locked_count(&self) -> usize {
        self.locked_count
    }

    pub fn has_locked(&self) -> bool {
        self.locked_count > 0
    }

    pub fn is_locked(&self, index: usize) -> bool {
        self.locked.get(index).copied().unwrap_or(false)
    }

    /// Put `value` into a free slot and lock it.
    ///
    /// Returns `None` when every slot is in use; the object is dropped.
    pub fn acquire(&mut self, value: T) -> Option<usize> {
        let Some(index) = self.free.pop() else {
            log::warn!(
                "{} pool exhausted ({} slots), dropping new object",
                self.name,
                self.capacity()
            );
            return None;
        };
        self.objects[index] = value;
        self.locked[index] = true;
        self.locked_count += 1;
        Some(index)
    }

    pub fn release(&mut self, index: usize) {
        if !self.is_locked(index) {
            return;
        }
        self.locked[index] = false;
        self.locked_count -= 1;
        self.free.push(index);
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if self.is_locked(index) {
            self.objects.get(index)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if self.is_locked(index) {
            self.objects.get_mut(index)
        } else {
            None
        }
    }

    /// Objects in locked slots
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(i, _)| self.locked[*i])
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        let locked = &self.locked;
        self.objects
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| locked[*i])
    }

    /// Free every locked slot whose object can be reused. Returns how many
    /// slots were freed.
    pub fn recycle(&mut self) -> usize {
        let mut freed = 0;
        for index in 0..self.objects.len() {
            if self.locked[index] && self.objects[index].can_be_reused() {
                self.release(index);
                freed += 1;
            }
        }
        freed
    }

    /// Free every slot
    pub fn clear(&mut self) {
        for index in 0..self.objects.len() {
            self.release(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Spark {
        ttl: u32,
        tag: Option<&'static str>,
        trail: Vec<u32>,
    }

    impl Poolable for Spark {
        fn can_be_reused(&self) -> bool {
            self.ttl == 0
        }
    }

    fn spark(ttl: u32) -> Spark {
        Spark {
            ttl,
            ..Default::default()
        }
    }

    #[test]
    fn test_acquire_until_full() {
        let mut pool = Pool::new("spark", 2);
        assert_eq!(pool.acquire(spark(1)), Some(0));
        assert_eq!(pool.acquire(spark(1)), Some(1));
        assert_eq!(pool.acquire(spark(1)), None);
        assert_eq!(pool.locked_count(), 2);
    }

    #[test]
    fn test_recycle_frees_finished_only() {
        let mut pool = Pool::new("spark", 4);
        pool.acquire(spark(2));
        pool.acquire(spark(1));
        pool.acquire(spark(3));

        for (_, s) in pool.iter_mut() {
            s.ttl -= 1;
        }
        assert_eq!(pool.recycle(), 1);
        assert_eq!(pool.locked_count(), 2);
        assert!(pool.get(1).is_none());
        assert_eq!(pool.iter().count(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pool = Pool::new("spark", 1);
        let i = pool.acquire(spark(1)).unwrap();
        pool.release(i);
        pool.release(i);
        assert_eq!(pool.locked_count(), 0);
        assert_eq!(pool.acquire(spark(1)), Some(i));
        assert_eq!(pool.acquire(spark(1)), None);
    }

    #[test]
    fn test_reacquired_slot_is_overwritten() {
        let mut pool = Pool::new("spark", 1);
        let i = pool.acquire(Spark {
            ttl: 5,
            tag: Some("old"),
            trail: vec![1, 2, 3],
        })
        .unwrap();
        pool.release(i);
        let j = pool.acquire(spark(7)).unwrap();
        assert_eq!(i, j);
        assert_eq!(pool.get(j), Some(&spark(7)));
    }

    proptest! {
        #[test]
        fn prop_locked_count_matches_slots(
            ops in prop::collection::vec((any::<bool>(), 0usize..8), 0..100)
        ) {
            let mut pool = Pool::new("spark", 8);
            for (acquire, index) in ops {
                if acquire {
                    pool.acquire(spark(1));
                } else {
                    pool.release(index);
                }
                prop_assert_eq!(pool.locked_count(), pool.iter().count());
                prop_assert!(pool.locked_count() <= pool.capacity());
            }
        }
    }
}
