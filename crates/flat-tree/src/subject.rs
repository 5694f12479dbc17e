//! Minimal observable value container

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`Subject::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer<T> = Rc<dyn Fn(&T)>;

/// Holds the latest value and notifies subscribers whenever a new one is published
///
/// Observers are called after internal borrows are released, so an observer
/// may read the subject, publish to it, or change the subscriber list.
pub struct Subject<T> {
    value: RefCell<Rc<T>>,
    observers: RefCell<Vec<(SubscriptionId, Observer<T>)>>,
    next_id: Cell<u64>,
}

impl<T> Subject<T> {
    /// Create a subject with an initial value. Nobody is notified.
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(Rc::new(value)),
            observers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// The latest published value
    pub fn current(&self) -> Rc<T> {
        Rc::clone(&self.value.borrow())
    }

    /// Register an observer for future values
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.observers.borrow_mut().push((id, Rc::new(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Store a new value and notify every observer registered at this moment
    pub fn next(&self, value: T) {
        let value = Rc::new(value);
        *self.value.borrow_mut() = Rc::clone(&value);

        let observers: Vec<Observer<T>> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            observer(&value);
        }
    }
}

impl<T: Default> Default for Subject<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("value", &self.value.borrow())
            .field("observers", &self.observer_count())
            .finish()
    }
}
