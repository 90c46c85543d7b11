//! The call and create family.
//!
//! The dynamic-gas handlers have already charged for the forwarded gas and
//! stashed it in [`RunState::message_gas_limit`]; these functions build the
//! nested frame, run it, and settle the caller's stack and return buffer.

use ember_primitives::{Address, Bytes, B256, U256};

use super::{as_usize_saturated, bool_to_word, word_to_address};
use crate::{
    evm::{CallInputs, CreateInputs, Evm, FrameResult},
    interpreter::{Control, RunState},
    result::{EvmError, ExceptionalHalt},
};

fn take_message_gas(state: &mut RunState) -> Result<u64, EvmError> {
    state
        .message_gas_limit
        .take()
        .ok_or_else(|| ExceptionalHalt::OutOfGas.into())
}

fn settle_call(
    state: &mut RunState,
    result: &FrameResult,
    returned_gas: u64,
    out_offset: usize,
    out_size: usize,
) -> Result<(), EvmError> {
    state.gas_left += returned_gas;

    let output = result.output();
    if out_size > 0 && !output.is_empty() {
        let len = out_size.min(output.len());
        state.memory.write(out_offset, &output[..len]);
    }
    state.return_bytes = output;

    state.stack.push(bool_to_word(result.is_success()))?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn do_call(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    code_address: Address,
    recipient: Address,
    caller: Address,
    value: U256,
    transfers_value: bool,
    is_static: bool,
) -> Result<Control, EvmError> {
    let gas_limit = take_message_gas(state)?;

    let [in_offset, in_size, out_offset, out_size] = state.stack.pop_array()?;
    let input = state
        .memory
        .read(as_usize_saturated(in_offset), as_usize_saturated(in_size));

    let outcome = evm.call(CallInputs {
        caller,
        code_address,
        recipient,
        value,
        transfers_value,
        input,
        gas_limit,
        is_static,
        depth: state.depth + 1,
    })?;

    settle_call(
        state,
        &outcome.result,
        outcome.gas_left,
        as_usize_saturated(out_offset),
        as_usize_saturated(out_size),
    )?;

    Ok(Control::Continue)
}

pub fn call(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [_gas, to, value] = state.stack.pop_array()?;
    let to = word_to_address(to);

    do_call(
        state,
        evm,
        to,
        to,
        state.address,
        value,
        true,
        state.is_static,
    )
}

pub fn callcode(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [_gas, to, value] = state.stack.pop_array()?;

    // Runs foreign code against the caller's own storage and balance.
    do_call(
        state,
        evm,
        word_to_address(to),
        state.address,
        state.address,
        value,
        true,
        state.is_static,
    )
}

pub fn delegatecall(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [_gas, to] = state.stack.pop_array()?;

    // Keeps the caller's value and sender identity.
    let value = state.value;
    let caller = state.caller;
    do_call(
        state,
        evm,
        word_to_address(to),
        state.address,
        caller,
        value,
        false,
        state.is_static,
    )
}

pub fn staticcall(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [_gas, to] = state.stack.pop_array()?;
    let to = word_to_address(to);

    do_call(state, evm, to, to, state.address, U256::ZERO, false, true)
}

fn do_create(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    salt: Option<B256>,
) -> Result<Control, EvmError> {
    let gas_limit = take_message_gas(state)?;

    let [value, offset, size] = state.stack.pop_array()?;
    if salt.is_some() {
        state.stack.pop()?;
    }

    let init_code = state
        .memory
        .read(as_usize_saturated(offset), as_usize_saturated(size));

    let outcome = evm.create(CreateInputs {
        caller: state.address,
        value,
        init_code,
        gas_limit,
        depth: state.depth + 1,
        salt,
    })?;

    state.gas_left += outcome.gas_left;

    // Only a reverting creation exposes return data to the caller.
    state.return_bytes = match &outcome.result {
        FrameResult::Revert { output } => output.clone(),
        _ => Bytes::new(),
    };

    match outcome.address {
        Some(address) => state
            .stack
            .push(U256::from_be_slice(address.as_slice()))?,
        None => state.stack.push(U256::ZERO)?,
    }

    Ok(Control::Continue)
}

pub fn create(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    do_create(state, evm, None)
}

pub fn create2(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    // The salt is the fourth stack argument; peel it after the common three.
    let salt = state.stack.peek(3)?;

    do_create(state, evm, Some(B256::from(salt.to_be_bytes::<32>())))
}
