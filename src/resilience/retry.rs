use crate::utils::constants::AUTH_RETRY_ATTEMPTS;

/// Forced-refresh retries left for one client call.
///
/// Starts at [`AUTH_RETRY_ATTEMPTS`], goes down by one per rejected dispatch
/// and is terminal at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
}

impl RetryBudget {
    pub const fn new(attempts: u32) -> Self {
        Self { remaining: attempts }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Take one retry; `false` once the budget is spent.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(AUTH_RETRY_ATTEMPTS)
    }
}
