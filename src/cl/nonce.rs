use super::constants::{LARGE_NONCE, MAX_CONSUMED_NONCES, MAX_NONCE_DRAWS};
use super::Nonce;

use crate::errors::prelude::*;
use crate::utils::random::RandomSource;

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct NonceState {
    /// Issued and not yet consumed, oldest first.
    pending: VecDeque<String>,
    consumed: HashSet<String>,
    /// Same keys as `consumed`, oldest first.
    consumed_order: VecDeque<String>
}

impl NonceState {
    fn remember_consumed(&mut self, key: String, max_consumed: usize) {
        if self.consumed.insert(key.clone()) {
            self.consumed_order.push_back(key);
        }
        while self.consumed_order.len() > max_consumed {
            if let Some(oldest) = self.consumed_order.pop_front() {
                self.consumed.remove(&oldest);
            }
        }
    }
}

/// Issues single use nonces and accepts each of them at most once.
///
/// At most `max_pending` nonces are outstanding; issuing one more drops the oldest.
/// A fresh draw that matches an outstanding or remembered consumed nonce is redrawn.
///
/// Only the last `max_consumed` consumed nonces are remembered. Forgetting one never
/// reopens it: `consume` accepts outstanding nonces only.
pub struct NonceRegistry {
    rng: Arc<dyn RandomSource>,
    max_pending: usize,
    max_consumed: usize,
    state: Mutex<NonceState>
}

impl NonceRegistry {
    pub fn new(rng: Arc<dyn RandomSource>, max_pending: usize) -> NonceRegistry {
        Self::with_capacity(rng, max_pending, MAX_CONSUMED_NONCES)
    }

    pub fn with_capacity(rng: Arc<dyn RandomSource>, max_pending: usize, max_consumed: usize) -> NonceRegistry {
        NonceRegistry {
            rng,
            max_pending,
            max_consumed,
            state: Mutex::new(NonceState::default())
        }
    }

    pub fn issue(&self) -> ClCryptoResult<Nonce> {
        trace!("NonceRegistry::issue: >>>");

        let mut state = self._lock()?;

        for _ in 0..MAX_NONCE_DRAWS {
            let nonce = self.rng.rand_bits(LARGE_NONCE)?;
            let key = nonce.to_dec()?;

            if state.consumed.contains(&key) || state.pending.contains(&key) {
                debug!("NonceRegistry::issue: drawn nonce is already known, redrawing");
                continue;
            }

            state.pending.push_back(key);
            while state.pending.len() > self.max_pending {
                state.pending.pop_front();
            }

            trace!("NonceRegistry::issue: <<< nonce: {:?}", nonce);

            return Ok(nonce);
        }

        Err(err_msg(ClCryptoErrorKind::InvalidState,
                    format!("No fresh nonce after {} draws", MAX_NONCE_DRAWS)))
    }

    /// Accepts an outstanding nonce once. Unknown, evicted or replayed nonces fail with `NonceRejected`.
    pub fn consume(&self, nonce: &Nonce) -> ClCryptoResult<()> {
        trace!("NonceRegistry::consume: >>> nonce: {:?}", nonce);

        let key = nonce.to_dec()?;
        let mut state = self._lock()?;

        match state.pending.iter().position(|pending| *pending == key) {
            Some(pos) => {
                state.pending.remove(pos);
                state.remember_consumed(key, self.max_consumed);
            }
            None => {
                let reason = if state.consumed.contains(&key) { "already consumed" } else { "not issued" };
                return Err(err_msg(ClCryptoErrorKind::NonceRejected, format!("Nonce {} is {}", key, reason)));
            }
        }

        trace!("NonceRegistry::consume: <<<");

        Ok(())
    }

    pub fn pending_count(&self) -> ClCryptoResult<usize> {
        Ok(self._lock()?.pending.len())
    }

    pub fn consumed_count(&self) -> ClCryptoResult<usize> {
        Ok(self._lock()?.consumed.len())
    }

    fn _lock(&self) -> ClCryptoResult<::std::sync::MutexGuard<'_, NonceState>> {
        self.state.lock()
            .map_err(|_| err_msg(ClCryptoErrorKind::InvalidState, "Nonce registry lock is poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::random::mocks::StuckRandom;
    use crate::utils::random::OpenSslRandom;

    use std::thread;

    #[test]
    fn issue_consume_works() {
        let registry = NonceRegistry::new(Arc::new(OpenSslRandom), 16);
        let nonce = registry.issue().unwrap();

        registry.consume(&nonce).unwrap();
        assert_eq!(0, registry.pending_count().unwrap());
    }

    #[test]
    fn replayed_nonce_is_rejected() {
        let registry = NonceRegistry::new(Arc::new(OpenSslRandom), 16);
        let nonce = registry.issue().unwrap();
        registry.consume(&nonce).unwrap();

        let err = registry.consume(&nonce).unwrap_err();
        assert_eq!(ClCryptoErrorKind::NonceRejected, err.kind());
    }

    #[test]
    fn unknown_nonce_is_rejected() {
        let registry = NonceRegistry::new(Arc::new(OpenSslRandom), 16);
        let err = registry.consume(&Nonce::from_u32(42).unwrap()).unwrap_err();
        assert_eq!(ClCryptoErrorKind::NonceRejected, err.kind());
    }

    #[test]
    fn oldest_pending_nonce_is_evicted() {
        let registry = NonceRegistry::new(Arc::new(OpenSslRandom), 2);
        let first = registry.issue().unwrap();
        let second = registry.issue().unwrap();
        let third = registry.issue().unwrap();

        assert_eq!(2, registry.pending_count().unwrap());
        assert_eq!(ClCryptoErrorKind::NonceRejected, registry.consume(&first).unwrap_err().kind());
        registry.consume(&second).unwrap();
        registry.consume(&third).unwrap();
    }

    #[test]
    fn consumed_memory_is_bounded() {
        let registry = NonceRegistry::with_capacity(Arc::new(OpenSslRandom), 16, 4);

        let nonces: Vec<Nonce> = (0..10).map(|_| registry.issue().unwrap()).collect();
        for nonce in nonces.iter() {
            registry.consume(nonce).unwrap();
        }
        assert_eq!(4, registry.consumed_count().unwrap());

        for nonce in nonces.iter() {
            let err = registry.consume(nonce).unwrap_err();
            assert_eq!(ClCryptoErrorKind::NonceRejected, err.kind());
        }
    }

    #[test]
    fn stuck_rng_fails_instead_of_reusing() {
        let registry = NonceRegistry::new(Arc::new(StuckRandom { value: 7 }), 16);
        let nonce = registry.issue().unwrap();

        let err = registry.issue().unwrap_err();
        assert_eq!(ClCryptoErrorKind::InvalidState, err.kind());

        registry.consume(&nonce).unwrap();
        let err = registry.issue().unwrap_err();
        assert_eq!(ClCryptoErrorKind::InvalidState, err.kind());
    }

    #[test]
    fn concurrent_nonces_are_distinct() {
        let registry = Arc::new(NonceRegistry::new(Arc::new(OpenSslRandom), 1024));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    (0..50).map(|_| registry.issue().unwrap().to_dec().unwrap()).collect::<Vec<String>>()
                })
            })
            .collect();

        let mut all = hashset!();
        for handle in handles {
            for nonce in handle.join().unwrap() {
                assert!(all.insert(nonce));
            }
        }
        assert_eq!(400, all.len());
    }
}
