#![no_std]
use soroban_sdk::{contract, contractimpl, contracttype, Env};

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Counter,
}

#[contract]
pub struct CounterContract;

#[contractimpl]
impl CounterContract {
    /// Increment the stored counter and return the new value.
    pub fn increment(env: Env) -> u32 {
        let count = Self::get(env.clone()) + 1;
        env.storage().instance().set(&DataKey::Counter, &count);
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        count
    }

    /// Current counter value; `0` before the first increment.
    pub fn get(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::Counter)
            .unwrap_or(0)
    }

    pub fn reset(env: Env) {
        env.storage().instance().remove(&DataKey::Counter);
    }
}

#[cfg(test)]
mod test;
