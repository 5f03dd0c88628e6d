use crate::error::{ServerError, ServerResult};
use parking_lot::{Condvar, Mutex};

/// A counting semaphore built from a mutex-guarded permit count
struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Block until a permit is available, then take it
    fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Take a permit if one is available right now
    fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Return a permit and wake one waiter
    fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }
}

/// Fixed ring of slots; `len` counts occupied slots, `capacity - len` free ones
struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    fn insert(&mut self, item: T) {
        let capacity = self.slots.len();
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % capacity;
        self.len += 1;
    }

    fn remove(&mut self) -> Option<T> {
        let capacity = self.slots.len();
        let item = self.slots[self.head].take()?;
        self.head = (self.head + 1) % capacity;
        self.len -= 1;
        Some(item)
    }
}

/// A fixed-capacity FIFO with blocking push and pop.
///
/// Index updates happen under a mutex. Two counting semaphores track occupied
/// and free slots, so a producer blocks exactly while all `capacity` slots are
/// full and a consumer blocks exactly while none are. Items are moved in and
/// out, never cloned, so an item has one owner at a time.
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    occupied: Semaphore,
    free: Semaphore,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    pub fn new(capacity: usize) -> ServerResult<Self> {
        if capacity == 0 {
            return Err(ServerError::Config("queue capacity must be at least 1".to_string()));
        }

        Ok(Self {
            ring: Mutex::new(Ring::with_capacity(capacity)),
            occupied: Semaphore::new(0),
            free: Semaphore::new(capacity),
            capacity,
        })
    }

    /// Insert at the tail, blocking while the queue is full
    pub fn push(&self, item: T) {
        self.free.acquire();
        self.ring.lock().insert(item);
        self.occupied.release();
    }

    /// Insert at the tail if a slot is free, handing the item back otherwise
    pub fn try_push(&self, item: T) -> Result<(), T> {
        if !self.free.try_acquire() {
            return Err(item);
        }
        self.ring.lock().insert(item);
        self.occupied.release();
        Ok(())
    }

    /// Remove from the head, blocking while the queue is empty
    pub fn pop(&self) -> T {
        loop {
            self.occupied.acquire();
            // Holding an occupied permit means the head slot was filled.
            let Some(item) = self.ring.lock().remove() else {
                debug_assert!(false, "occupied permit without a queued item");
                continue;
            };
            self.free.release();
            return item;
        }
    }

    /// Remove from the head if an item is queued
    pub fn try_pop(&self) -> Option<T> {
        if !self.occupied.try_acquire() {
            return None;
        }
        let item = self.ring.lock().remove();
        self.free.release();
        item
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.ring.lock().len
    }

    /// Whether no item is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of free slots
    pub fn free_slots(&self) -> usize {
        self.capacity - self.len()
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
