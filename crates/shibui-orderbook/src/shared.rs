//! Handle through which several exchange instances share one ledger.
//!
//! The lock serializes calls from different threads. A call that reaches the
//! ledger again on the thread already holding it (an outbound transfer's
//! callback calling into another exchange instance) never waits on the lock:
//! - reads see the view the outer call last published
//! - writes fail with [`ShibuiError::ReentrantCall`]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use shibui_types::{Result, ShibuiError};

use crate::book::OrderBook;

thread_local! {
    /// Ledgers held by this thread, keyed by handle, with the view nested
    /// reads get.
    static ENTERED: RefCell<BTreeMap<usize, Option<OrderBook>>> = const { RefCell::new(BTreeMap::new()) };
}

#[derive(Debug, Clone)]
pub struct SharedOrderBook {
    inner: Arc<Mutex<OrderBook>>,
}

impl SharedOrderBook {
    #[must_use]
    pub fn new(book: OrderBook) -> Self {
        Self {
            inner: Arc::new(Mutex::new(book)),
        }
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner).addr()
    }

    /// Whether the current thread is inside a call on this ledger.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        let id = self.id();
        ENTERED.with_borrow(|entered| entered.contains_key(&id))
    }

    /// Lock the ledger for a mutating call. The lock is released when the
    /// guard drops.
    ///
    /// # Errors
    /// `ReentrantCall` if this thread already holds the ledger.
    pub fn enter(&self) -> Result<LedgerGuard<'_>> {
        if self.is_entered() {
            tracing::warn!("Reentrant ledger write rejected");
            return Err(ShibuiError::ReentrantCall);
        }
        let guard = self.inner.lock();
        let id = self.id();
        ENTERED.with_borrow_mut(|entered| entered.insert(id, None));
        Ok(LedgerGuard { guard, id })
    }

    /// Run `read` against the ledger.
    ///
    /// # Errors
    /// `ReentrantCall` if this thread holds the ledger and has not published
    /// a view yet.
    pub fn read<T>(&self, read: impl FnOnce(&OrderBook) -> T) -> Result<T> {
        if !self.is_entered() {
            let book = self.inner.lock();
            return Ok(read(&*book));
        }
        let id = self.id();
        ENTERED.with_borrow(|entered| {
            entered
                .get(&id)
                .and_then(Option::as_ref)
                .map(read)
                .ok_or(ShibuiError::ReentrantCall)
        })
    }
}

/// Exclusive access to the ledger for the length of one call.
pub struct LedgerGuard<'a> {
    guard: MutexGuard<'a, OrderBook>,
    id: usize,
}

impl LedgerGuard<'_> {
    /// Let nested reads on this thread see the ledger as it is now.
    pub fn publish(&self) {
        let view = (*self.guard).clone();
        ENTERED.with_borrow_mut(|entered| entered.insert(self.id, Some(view)));
    }
}

impl Deref for LedgerGuard<'_> {
    type Target = OrderBook;

    fn deref(&self) -> &OrderBook {
        &self.guard
    }
}

impl DerefMut for LedgerGuard<'_> {
    fn deref_mut(&mut self) -> &mut OrderBook {
        &mut self.guard
    }
}

impl Drop for LedgerGuard<'_> {
    fn drop(&mut self) {
        let _ = ENTERED.try_with(|entered| entered.borrow_mut().remove(&self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shibui_types::{Address, SellOrder, Timestamp};

    const NOW: Timestamp = Timestamp(0);

    #[test]
    fn second_entry_on_same_thread_fails_fast() {
        let shared = OrderBook::new(Address::random()).into_shared();
        let other = shared.clone();

        let guard = shared.enter().unwrap();
        assert!(other.is_entered());
        assert!(matches!(other.enter(), Err(ShibuiError::ReentrantCall)));
        drop(guard);

        assert!(!other.is_entered());
        assert!(other.enter().is_ok());
    }

    #[test]
    fn nested_read_needs_a_published_view() {
        let seller = Address::random();
        let shared = OrderBook::new(Address::random()).into_shared();
        let order = SellOrder::dummy(seller, Address::random(), 1, 10);

        let mut guard = shared.enter().unwrap();
        guard.book_sell_order(seller, order, NOW).unwrap();
        assert!(matches!(
            shared.read(|book| book.store().sell_count()),
            Err(ShibuiError::ReentrantCall)
        ));

        guard.publish();
        assert_eq!(shared.read(|book| book.sell_order(&order.key(), NOW).copied()).unwrap(), Some(order));
        drop(guard);

        assert_eq!(shared.read(|book| book.store().sell_count()).unwrap(), 1);
    }

    #[test]
    fn separate_ledgers_do_not_interfere() {
        let first = OrderBook::new(Address::random()).into_shared();
        let second = OrderBook::new(Address::random()).into_shared();

        let _guard = first.enter().unwrap();
        assert!(!second.is_entered());
        assert!(second.enter().is_ok());
        assert_eq!(second.read(|book| book.store().sell_count()).unwrap(), 0);
    }
}
