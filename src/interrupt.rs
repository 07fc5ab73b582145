//! Interrupt emulation for the host build.
//!
//! The controller has one timer compare-match interrupt and two pin-change
//! interrupts preempting a single main loop, with the global interrupt
//! enable as the only lock. On a desktop the `critical-section` crate's
//! `std` implementation stands in for that lock: `critical_section::with`
//! takes a process-wide lock that nests on the same thread, and state shared
//! with a handler lives in a `critical_section::Mutex`.
//!
//! [`InterruptTable`] is the fixed vector table that context-free entry
//! points (timer thread, pin simulation) fire into. Every handler body runs
//! inside a critical section, so handlers never interleave with each other
//! or with a main-context critical section.

use critical_section::Mutex;
use log::{debug, trace};
use std::cell::RefCell;
use std::sync::Arc;

/// Interrupt sources of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    /// Timer 1 compare match A.
    TimerCompare,
    /// External interrupt 0 (encoder phase A).
    PinChange0,
    /// External interrupt 1 (encoder phase B).
    PinChange1,
}

impl Vector {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            Vector::TimerCompare => 0,
            Vector::PinChange0 => 1,
            Vector::PinChange1 => 2,
        }
    }
}

/// Anything that can be attached to a [`Vector`].
pub trait InterruptHandler: Send + Sync {
    fn on_interrupt(&self);
}

type Slots = [Option<Arc<dyn InterruptHandler>>; Vector::COUNT];

/// Fixed table of interrupt entry points.
pub struct InterruptTable {
    slots: Mutex<RefCell<Slots>>,
}

impl Default for InterruptTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptTable {
    pub const fn new() -> Self {
        InterruptTable {
            slots: Mutex::new(RefCell::new([None, None, None])),
        }
    }

    /// Installs `handler` on `vector`, replacing whatever was there.
    pub fn attach(&self, vector: Vector, handler: Arc<dyn InterruptHandler>) {
        critical_section::with(|cs| {
            self.slots.borrow_ref_mut(cs)[vector.index()] = Some(handler);
        });
        debug!("Attached handler to {:?}", vector);
    }

    pub fn detach(&self, vector: Vector) {
        critical_section::with(|cs| {
            self.slots.borrow_ref_mut(cs)[vector.index()] = None;
        });
        debug!("Detached handler from {:?}", vector);
    }

    pub fn is_attached(&self, vector: Vector) -> bool {
        critical_section::with(|cs| self.slots.borrow_ref(cs)[vector.index()].is_some())
    }

    /// Raises `vector`. Returns false when nothing is attached.
    pub fn fire(&self, vector: Vector) -> bool {
        critical_section::with(|cs| {
            let handler = self.slots.borrow_ref(cs)[vector.index()].clone();
            match handler {
                Some(handler) => {
                    handler.on_interrupt();
                    true
                }
                None => {
                    trace!("Spurious interrupt on {:?}", vector);
                    false
                }
            }
        })
    }
}

/// The controller's vector table.
pub static VECTORS: InterruptTable = InterruptTable::new();

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    struct Counter(AtomicU32);

    impl InterruptHandler for Counter {
        fn on_interrupt(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fire_without_handler_is_spurious() {
        let table = InterruptTable::new();
        assert!(!table.fire(Vector::TimerCompare));
    }

    #[test]
    fn test_attach_fire_detach() {
        let table = InterruptTable::new();
        let counter = Arc::new(Counter(AtomicU32::new(0)));
        table.attach(Vector::PinChange0, counter.clone());

        assert!(table.is_attached(Vector::PinChange0));
        assert!(!table.is_attached(Vector::PinChange1));
        assert!(table.fire(Vector::PinChange0));
        assert!(table.fire(Vector::PinChange0));
        assert!(!table.fire(Vector::PinChange1));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        table.detach(Vector::PinChange0);
        assert!(!table.fire(Vector::PinChange0));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_nested_critical_sections() {
        let shared = Mutex::new(Cell::new(1u32));
        let value = critical_section::with(|outer| {
            let inner = critical_section::with(|cs| shared.borrow(cs).get());
            shared.borrow(outer).set(inner + 1);
            shared.borrow(outer).get()
        });
        assert_eq!(value, 2);
    }

    struct Reentrant {
        hits: Mutex<Cell<u32>>,
    }

    impl InterruptHandler for Reentrant {
        fn on_interrupt(&self) {
            critical_section::with(|cs| {
                let hits = self.hits.borrow(cs);
                hits.set(hits.get() + 1);
            });
        }
    }

    #[test]
    fn test_handler_can_take_its_own_critical_section() {
        let table = InterruptTable::new();
        let handler = Arc::new(Reentrant {
            hits: Mutex::new(Cell::new(0)),
        });
        table.attach(Vector::TimerCompare, handler.clone());

        // fired from main context already inside a critical section
        critical_section::with(|_| {
            assert!(table.fire(Vector::TimerCompare));
            assert!(table.fire(Vector::TimerCompare));
        });
        assert_eq!(critical_section::with(|cs| handler.hits.borrow(cs).get()), 2);
    }

    #[test]
    fn test_multi_field_updates_are_never_torn() {
        let pair = Arc::new(Mutex::new(Cell::new((0u32, 0u32))));
        let writer_pair = pair.clone();

        let writer = thread::spawn(move || {
            for i in 1..=10_000u32 {
                critical_section::with(|cs| writer_pair.borrow(cs).set((i, i)));
            }
        });

        for _ in 0..10_000 {
            let (a, b) = critical_section::with(|cs| pair.borrow(cs).get());
            assert_eq!(a, b);
        }
        writer.join().unwrap();
    }
}
