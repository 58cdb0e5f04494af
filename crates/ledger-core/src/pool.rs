use crate::Transaction;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct Pending {
    txs: Vec<Transaction>,
    /// Bumped by `clear`, so a commit can tell its snapshot was discarded.
    generation: u64,
}

/// Which prefix of the pool a mining attempt took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Taken {
    count: usize,
    generation: u64,
}

/// Transactions waiting to be mined, in submission order.
#[derive(Debug, Default)]
pub struct TransactionPool {
    pending: Mutex<Pending>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sender: impl Into<String>, recipient: impl Into<String>, amount: f64) {
        self.pending
            .lock()
            .txs
            .push(Transaction::transfer(sender, recipient, amount));
    }

    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.lock().txs.clone()
    }

    pub fn clear(&self) {
        let mut pending = self.pending.lock();
        pending.txs.clear();
        pending.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.pending.lock().txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().txs.is_empty()
    }

    /// Runs `f` over the pending transactions with the pool locked, so
    /// nothing is added or committed while `f` looks at them.
    pub(crate) fn snapshot_with<T>(&self, f: impl FnOnce(&[Transaction]) -> T) -> (T, Taken) {
        let pending = self.pending.lock();
        let taken = Taken {
            count: pending.txs.len(),
            generation: pending.generation,
        };
        (f(&pending.txs), taken)
    }

    /// Runs `f` with the pool locked and, if it succeeds, drops the prefix
    /// described by `taken`. Anything added after the snapshot stays pending;
    /// if the pool was cleared since, nothing is dropped.
    pub(crate) fn commit<T, E>(
        &self,
        taken: Taken,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let mut pending = self.pending.lock();
        let out = f()?;
        if pending.generation == taken.generation {
            let count = taken.count.min(pending.txs.len());
            pending.txs.drain(..count);
            debug!(taken = count, remaining = pending.txs.len(), "pool committed");
        } else {
            debug!(
                remaining = pending.txs.len(),
                "pool cleared since snapshot, nothing to drop"
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_submission_order() {
        let pool = TransactionPool::new();
        pool.add("alice", "bob", 5.0);
        pool.add("bob", "carol", -2.0);
        assert_eq!(
            pool.snapshot(),
            vec![
                Transaction::transfer("alice", "bob", 5.0),
                Transaction::transfer("bob", "carol", -2.0),
            ]
        );
        pool.clear();
        assert!(pool.is_empty());
    }

    #[test]
    fn snapshot_is_a_copy() {
        let pool = TransactionPool::new();
        pool.add("alice", "bob", 5.0);
        let snap = pool.snapshot();
        pool.add("bob", "carol", 1.0);
        assert_eq!(snap.len(), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn commit_keeps_late_arrivals() {
        let pool = TransactionPool::new();
        pool.add("alice", "bob", 5.0);
        pool.add("bob", "carol", 1.0);
        let (len, taken) = pool.snapshot_with(|txs| txs.len());
        assert_eq!(len, 2);
        pool.add("carol", "dave", 2.0);

        let res: Result<(), ()> = pool.commit(taken, || Ok(()));
        assert!(res.is_ok());
        assert_eq!(
            pool.snapshot(),
            vec![Transaction::transfer("carol", "dave", 2.0)]
        );
    }

    #[test]
    fn commit_after_clear_keeps_new_transactions() {
        let pool = TransactionPool::new();
        pool.add("alice", "bob", 5.0);
        pool.add("bob", "carol", 1.0);
        let ((), taken) = pool.snapshot_with(|_| ());
        pool.clear();
        pool.add("dave", "erin", 3.0);

        let res: Result<(), ()> = pool.commit(taken, || Ok(()));
        assert!(res.is_ok());
        assert_eq!(
            pool.snapshot(),
            vec![Transaction::transfer("dave", "erin", 3.0)]
        );
    }

    #[test]
    fn failed_commit_leaves_pool_untouched() {
        let pool = TransactionPool::new();
        pool.add("alice", "bob", 5.0);
        let ((), taken) = pool.snapshot_with(|_| ());
        let res: Result<(), &str> = pool.commit(taken, || Err("rejected"));
        assert_eq!(res, Err("rejected"));
        assert_eq!(pool.len(), 1);
    }
}
