use crate::state::mode::LookupMode;

/// Per-mode token counter used to drop superseded responses.
///
/// A response is current only if its token equals the last token issued
/// for its mode; anything older is stale.
#[derive(Debug, Clone, Default)]
pub struct ResponseGuard {
    last_issued: [u64; 3],
}

impl ResponseGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next token for `mode`
    pub fn issue(&mut self, mode: LookupMode) -> u64 {
        let slot = &mut self.last_issued[mode.index()];
        *slot += 1;
        *slot
    }

    pub fn last_issued(&self, mode: LookupMode) -> u64 {
        self.last_issued[mode.index()]
    }

    pub fn is_current(&self, mode: LookupMode, token: u64) -> bool {
        token == self.last_issued(mode)
    }

    /// Make every outstanding token of `mode` stale
    pub fn invalidate(&mut self, mode: LookupMode) {
        self.last_issued[mode.index()] += 1;
    }

    pub fn invalidate_all(&mut self) {
        for mode in LookupMode::ALL {
            self.invalidate(mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_increase_per_mode() {
        let mut guard = ResponseGuard::new();
        assert_eq!(guard.issue(LookupMode::Find), 1);
        assert_eq!(guard.issue(LookupMode::Find), 2);
        assert_eq!(guard.issue(LookupMode::Aggregate), 1);
        assert!(guard.is_current(LookupMode::Find, 2));
        assert!(!guard.is_current(LookupMode::Find, 1));
        assert!(guard.is_current(LookupMode::Aggregate, 1));
    }

    #[test]
    fn test_invalidate_makes_outstanding_stale() {
        let mut guard = ResponseGuard::new();
        let token = guard.issue(LookupMode::ObjectId);
        guard.invalidate(LookupMode::ObjectId);
        assert!(!guard.is_current(LookupMode::ObjectId, token));
        assert!(guard.issue(LookupMode::ObjectId) > token);
    }

    #[test]
    fn test_invalidate_all() {
        let mut guard = ResponseGuard::new();
        let tokens: Vec<u64> = LookupMode::ALL.iter().map(|m| guard.issue(*m)).collect();
        guard.invalidate_all();
        for (mode, token) in LookupMode::ALL.iter().zip(tokens) {
            assert!(!guard.is_current(*mode, token));
        }
    }
}
