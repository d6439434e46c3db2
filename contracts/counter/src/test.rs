use soroban_sdk::Env;

use crate::{CounterContract, CounterContractClient};

fn setup() -> (Env, CounterContractClient<'static>) {
    let env = Env::default();
    let contract_id = env.register(CounterContract, ());
    let client = CounterContractClient::new(&env, &contract_id);
    (env, client)
}

#[test]
fn test_counter_starts_at_zero() {
    let (_env, client) = setup();
    assert_eq!(client.get(), 0);
}

#[test]
fn test_increment_is_cumulative() {
    let (_env, client) = setup();
    assert_eq!(client.increment(), 1);
    assert_eq!(client.increment(), 2);
    assert_eq!(client.get(), 2);
}

#[test]
fn test_reset_clears_counter() {
    let (_env, client) = setup();
    client.increment();
    client.reset();
    assert_eq!(client.get(), 0);
    assert_eq!(client.increment(), 1);
}
