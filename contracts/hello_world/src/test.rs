use soroban_sdk::{symbol_short, vec, Env};

use crate::{HelloContract, HelloContractClient};

#[test]
fn test_hello_returns_greeting() {
    let env = Env::default();
    let contract_id = env.register(HelloContract, ());
    let client = HelloContractClient::new(&env, &contract_id);

    let words = client.hello(&symbol_short!("Dev"));
    assert_eq!(
        words,
        vec![&env, symbol_short!("Hello"), symbol_short!("Dev")]
    );
}
