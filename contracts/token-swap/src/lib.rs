//! This is an example token swap smart contract.
//!
//! The contract swaps between two token types, a higher valued token (MHT) and a lower
//! valued token (MLT), at the exchange rate given by the ratio between the contract's
//! recorded MLT liquidity and MHT liquidity. <br>
//! The rate is recomputed from the liquidity counters on every swap, using integer (floor)
//! division, and is not fixed at contract creation. <br><br>
//!
//! Any user can grow the liquidity of the contract through [`add_liquidity`], which pulls
//! both token types from the caller via `transfer_from` calls to the token contracts. <br>
//! An addition is only accepted if the resulting MLT liquidity is at least as large as the
//! resulting MHT liquidity, such that the exchange rate never drops below 1. <br><br>
//!
//! A user swaps MHT for MLT through [`swap_high_to_low`] and MLT for MHT through
//! [`swap_low_to_high`]. A swap pulls the input token from the caller, transfers the
//! swapped amount of the opposite token back to the caller and appends a
//! [`TokensSwapped`] record to the contract's swap log. <br><br>
//!
//! Both liquidity counters grow on every swap. The counters track the recorded liquidity
//! used for rate computation and as a capacity bound for swaps; they are deliberately not
//! a balance-conserving model of the token amounts held by the contract.
#![allow(unused_variables)]


#[macro_use]
extern crate pbc_contract_codegen;

use create_type_spec_derive::CreateTypeSpec;
use pbc_contract_common::address::{Address, AddressType, Shortname};
use pbc_contract_common::context::{CallbackContext, ContractContext};
use pbc_contract_common::events::EventGroup;
use read_write_state_derive::ReadWriteState;

/// A record of an executed swap. <br>
/// The swap log is the observable trace of [`swap_high_to_low`] and [`swap_low_to_high`].
///
/// ### Fields:
///
/// * `user`: [`Address`], the account that performed the swap.
///
/// * `amount`: [`u128`], the swapped amount of the opposite token paid out to `user`.
///
/// * `high_to_low`: [`bool`], true if the swap was MHT to MLT, false if MLT to MHT.
#[derive(ReadWriteState, CreateTypeSpec)]
#[cfg_attr(test, derive(PartialEq, Eq, Clone, Debug))]
pub struct TokensSwapped {
    pub user: Address,
    pub amount: u128,
    pub high_to_low: bool,
}

/// This is the state of the contract which is persisted on the chain.
///
/// The #\[state\] macro generates serialization logic for the struct.
///
/// ### Fields:
///
/// * `ht_token_address`: [`Address`], the address of the MHT token contract.
///
/// * `lt_token_address`: [`Address`], the address of the MLT token contract.
///
/// * `ht_liquidity`: [`u128`], the recorded MHT liquidity of the contract.
///
/// * `lt_liquidity`: [`u128`], the recorded MLT liquidity of the contract.
///
/// * `swap_log`: [`Vec<TokensSwapped>`], all swaps executed by the contract, oldest first.
#[state]
#[cfg_attr(test, derive(Clone, PartialEq, Eq, Debug))]
pub struct TokenSwapContractState {
    pub ht_token_address: Address,
    pub lt_token_address: Address,
    pub ht_liquidity: u128,
    pub lt_liquidity: u128,
    pub swap_log: Vec<TokensSwapped>,
}

impl TokenSwapContractState {
    /// Retrieves the current exchange rate between MLT and MHT liquidity. <br>
    /// The rate is recomputed from the current counters on every call; it is never cached.
    ///
    /// # Returns
    /// The floored exchange rate of type [`u128`]
    pub fn exchange_rate(&self) -> u128 {
        calculate_exchange_rate(self.ht_liquidity, self.lt_liquidity)
    }

    /// Appends a [`TokensSwapped`] record to the swap log.
    ///
    /// ### Parameters:
    ///
    /// * `user`: [`Address`] - The account that performed the swap.
    ///
    /// * `amount`: [`u128`] - The swapped amount paid out to `user`.
    ///
    /// * `high_to_low`: [`bool`] - The direction of the swap.
    fn record_swap(&mut self, user: Address, amount: u128, high_to_low: bool) {
        self.swap_log.push(TokensSwapped {
            user,
            amount,
            high_to_low,
        });
    }
}

/// Initialize the contract.
///
/// # Parameters
///
///   * `context`: [`ContractContext`] - The contract context containing sender and chain information.
///
///   * `ht_token_address`: [`Address`] - The address of the MHT token contract.
///
///   * `lt_token_address`: [`Address`] - The address of the MLT token contract.
///
/// # Returns
/// The new state object of type [`TokenSwapContractState`] with both token addresses bound
/// to their final value and both liquidity counters initialized to zero.
#[init]
pub fn initialize(
    context: ContractContext,
    ht_token_address: Address,
    lt_token_address: Address,
) -> (TokenSwapContractState, Vec<EventGroup>) {
    assert_ne!(
        ht_token_address.address_type,
        AddressType::Account,
        "Tried to provide an account as the MHT token"
    );
    assert_ne!(
        lt_token_address.address_type,
        AddressType::Account,
        "Tried to provide an account as the MLT token"
    );
    assert_ne!(
        ht_token_address, lt_token_address,
        "Cannot initialize swap with duplicate tokens"
    );

    let new_state = TokenSwapContractState {
        ht_token_address,
        lt_token_address,
        ht_liquidity: 0,
        lt_liquidity: 0,
        swap_log: vec![],
    };

    (new_state, vec![])
}

/// Add liquidity of both token types to the contract. <br>
/// The caller must have approved at least `ht_amount` of MHT and `lt_amount` of MLT
/// to this contract beforehand. <br><br>
///
/// The ratio of the resulting totals is validated before any transfer is issued:
/// if the resulting MLT liquidity would be smaller than the resulting MHT liquidity the
/// action fails and no tokens move. <br>
/// The liquidity counters are only updated once the transfers have succeeded, in
/// [`add_liquidity_callback`].
///
/// ### Parameters:
///
///  * `context`: [`ContractContext`] - The contract context containing sender and chain information.
///
///  * `state`: [`TokenSwapContractState`] - The current state of the contract.
///
///  * `ht_amount`: [`u128`] - The amount of MHT to add.
///
///  * `lt_amount`: [`u128`] - The amount of MLT to add.
///
/// # Returns
/// The unchanged state object of type [`TokenSwapContractState`] and the event group
/// containing both transfer events and the callback event.
#[action(shortname = 0x01)]
pub fn add_liquidity(
    context: ContractContext,
    state: TokenSwapContractState,
    ht_amount: u128,
    lt_amount: u128,
) -> (TokenSwapContractState, Vec<EventGroup>) {
    // The invariant is checked against the resulting totals, not the added amounts.
    let new_ht_liquidity = state
        .ht_liquidity
        .checked_add(ht_amount)
        .expect("MHT liquidity overflow");
    let new_lt_liquidity = state
        .lt_liquidity
        .checked_add(lt_amount)
        .expect("MLT liquidity overflow");
    assert!(
        new_lt_liquidity >= new_ht_liquidity,
        "Please input higher number for MLT"
    );

    let mut event_group_builder = EventGroup::builder();
    event_group_builder
        .call(state.ht_token_address, token_contract_transfer_from())
        .argument(context.sender)
        .argument(context.contract_address)
        .argument(ht_amount)
        .done();
    event_group_builder
        .call(state.lt_token_address, token_contract_transfer_from())
        .argument(context.sender)
        .argument(context.contract_address)
        .argument(lt_amount)
        .done();
    event_group_builder
        .with_callback(SHORTNAME_ADD_LIQUIDITY_CALLBACK)
        .argument(ht_amount)
        .argument(lt_amount)
        .done();

    (state, vec![event_group_builder.build()])
}

/// Handles callback from [`add_liquidity`]. <br>
/// If both transfer events were successful, the added amounts are committed to the
/// liquidity counters. If a transfer failed the callback panics and nothing is committed.
///
/// ### Parameters:
///
/// * `context`: [`ContractContext`] - The contractContext for the callback.
///
/// * `callback_context`: [`CallbackContext`] - The callbackContext.
///
/// * `state`: [`TokenSwapContractState`] - The current state of the contract.
///
/// * `ht_amount`: [`u128`] - The amount of MHT that was transferred.
///
/// * `lt_amount`: [`u128`] - The amount of MLT that was transferred.
///
/// ### Returns
///
/// The updated state object of type [`TokenSwapContractState`] with both liquidity
/// counters grown by the added amounts.
#[callback(shortname = 0x10)]
pub fn add_liquidity_callback(
    context: ContractContext,
    callback_context: CallbackContext,
    mut state: TokenSwapContractState,
    ht_amount: u128,
    lt_amount: u128,
) -> (TokenSwapContractState, Vec<EventGroup>) {
    assert!(
        callback_context.success,
        "Transfer event did not succeed for add_liquidity"
    );

    state.ht_liquidity = state
        .ht_liquidity
        .checked_add(ht_amount)
        .expect("MHT liquidity overflow");
    state.lt_liquidity = state
        .lt_liquidity
        .checked_add(lt_amount)
        .expect("MLT liquidity overflow");

    (state, vec![])
}

/// Swap `amount` of MHT to MLT at the current exchange rate. <br>
/// The caller receives `amount` times the current rate of MLT, and the swap is appended
/// to the swap log. <br><br>
///
/// The rate and the swapped amount are computed from the counters as they are at call
/// time. The action only validates and pulls the input token from the caller; the
/// counters, the swap log and the payout transfer are committed by [`swap_callback`]
/// once the incoming transfer has succeeded, so a failed pull leaves no trace.
///
/// ### Parameters:
///
///  * `context`: [`ContractContext`] - The contract context containing sender and chain information.
///
///  * `state`: [`TokenSwapContractState`] - The current state of the contract.
///
///  * `amount`: [`u128`] - The amount of MHT to swap.
///
/// # Returns
/// The unchanged state object of type [`TokenSwapContractState`] and the event group
/// containing the transfer event and the callback event.
#[action(shortname = 0x02)]
pub fn swap_high_to_low(
    context: ContractContext,
    state: TokenSwapContractState,
    amount: u128,
) -> (TokenSwapContractState, Vec<EventGroup>) {
    assert!(amount > 0, "Amount must be greater than 0");
    assert!(amount <= state.ht_liquidity, "Not enough MHT liquidity");

    // Rate is taken from the counters as they are before this swap.
    let rate = state.exchange_rate();
    let swapped = amount.checked_mul(rate).expect("Swap amount overflow");

    let mut event_group_builder = EventGroup::builder();
    event_group_builder
        .call(state.ht_token_address, token_contract_transfer_from())
        .argument(context.sender)
        .argument(context.contract_address)
        .argument(amount)
        .done();
    event_group_builder
        .with_callback(SHORTNAME_SWAP_CALLBACK)
        .argument(amount)
        .argument(swapped)
        .argument(true)
        .done();

    (state, vec![event_group_builder.build()])
}

/// Swap `amount` of MLT to MHT at the current exchange rate. <br>
/// The caller receives `amount` divided by the current rate of MHT (rounded down), and
/// the swap is appended to the swap log. <br><br>
///
/// This is the mirror image of [`swap_high_to_low`] and commits through the same
/// [`swap_callback`].
///
/// ### Parameters:
///
///  * `context`: [`ContractContext`] - The contract context containing sender and chain information.
///
///  * `state`: [`TokenSwapContractState`] - The current state of the contract.
///
///  * `amount`: [`u128`] - The amount of MLT to swap.
///
/// # Returns
/// The unchanged state object of type [`TokenSwapContractState`] and the event group
/// containing the transfer event and the callback event.
#[action(shortname = 0x03)]
pub fn swap_low_to_high(
    context: ContractContext,
    state: TokenSwapContractState,
    amount: u128,
) -> (TokenSwapContractState, Vec<EventGroup>) {
    assert!(amount > 0, "Amount must be greater than 0");
    assert!(amount <= state.lt_liquidity, "Not enough MLT liquidity");

    let rate = state.exchange_rate();
    let swapped = amount / rate;

    let mut event_group_builder = EventGroup::builder();
    event_group_builder
        .call(state.lt_token_address, token_contract_transfer_from())
        .argument(context.sender)
        .argument(context.contract_address)
        .argument(amount)
        .done();
    event_group_builder
        .with_callback(SHORTNAME_SWAP_CALLBACK)
        .argument(amount)
        .argument(swapped)
        .argument(false)
        .done();

    (state, vec![event_group_builder.build()])
}

/// Handles callback from [`swap_high_to_low`] and [`swap_low_to_high`]. <br>
/// If the incoming transfer was successful, the swap is committed: both liquidity
/// counters grow, the swap is appended to the swap log and the swapped amount of the
/// opposite token is transferred to the caller. If the transfer failed the callback
/// panics and no part of the swap is observable.
///
/// ### Parameters:
///
/// * `context`: [`ContractContext`] - The contractContext for the callback.
///
/// * `callback_context`: [`CallbackContext`] - The callbackContext.
///
/// * `state`: [`TokenSwapContractState`] - The current state of the contract.
///
/// * `amount`: [`u128`] - The amount of the input token that was pulled from the caller.
///
/// * `swapped`: [`u128`] - The amount of the opposite token to pay out, as computed at
///   the time the swap was submitted.
///
/// * `high_to_low`: [`bool`] - The direction of the swap.
///
/// ### Returns
///
/// The updated state object of type [`TokenSwapContractState`] and the event group
/// containing the payout transfer event.
#[callback(shortname = 0x11)]
pub fn swap_callback(
    context: ContractContext,
    callback_context: CallbackContext,
    mut state: TokenSwapContractState,
    amount: u128,
    swapped: u128,
    high_to_low: bool,
) -> (TokenSwapContractState, Vec<EventGroup>) {
    assert!(
        callback_context.success,
        "Transfer event did not succeed for swap"
    );

    let payout_token_address = if high_to_low {
        state.ht_liquidity = state
            .ht_liquidity
            .checked_add(amount)
            .expect("MHT liquidity overflow");
        state.lt_liquidity = state
            .lt_liquidity
            .checked_add(swapped)
            .expect("MLT liquidity overflow");
        state.lt_token_address
    } else {
        state.lt_liquidity = state
            .lt_liquidity
            .checked_add(amount)
            .expect("MLT liquidity overflow");
        state.ht_liquidity = state
            .ht_liquidity
            .checked_add(swapped)
            .expect("MHT liquidity overflow");
        state.ht_token_address
    };
    state.record_swap(context.sender, swapped, high_to_low);

    let mut event_group_builder = EventGroup::builder();
    event_group_builder
        .call(payout_token_address, token_contract_transfer())
        .argument(context.sender)
        .argument(swapped)
        .done();

    (state, vec![event_group_builder.build()])
}

/// Creates the `Shortname` corresponding to the `transfer` action of a token contract. <br>
/// This is utilized in combination with an `EventGroupBuilder`'s `call` function.
///
/// ### Returns:
///
/// The `Shortname` corresponding to the `transfer` action of a token contract.
#[inline]
fn token_contract_transfer() -> Shortname {
    Shortname::from_u32(0x01)
}

/// Creates the `Shortname` corresponding to the `transfer_from` action of a token contract. <br>
/// This is utilized in combination with an `EventGroupBuilder`'s `call` function.
///
/// ### Returns:
///
/// The `Shortname` corresponding to the `transfer_from` action of a token contract.
#[inline]
fn token_contract_transfer_from() -> Shortname {
    Shortname::from_u32(0x03)
}

/// Calculates the exchange rate between the two liquidity counters, rounding down. <br>
/// The rate states how many MLT a single MHT is worth, given the current liquidity.
///
/// ### Parameters:
///
/// * `ht_liquidity`: [`u128`] - The recorded MHT liquidity.
///
/// * `lt_liquidity`: [`u128`] - The recorded MLT liquidity.
///
/// # Returns
/// The floored exchange rate of type [`u128`]
pub fn calculate_exchange_rate(ht_liquidity: u128, lt_liquidity: u128) -> u128 {
    if ht_liquidity == 0 {
        panic!("Cannot compute exchange rate without MHT liquidity");
    }
    lt_liquidity / ht_liquidity
}
