//! Flow-control opcodes and `SELFDESTRUCT`.

use ember_forks::Hardfork;
use ember_primitives::U256;

use super::{as_usize_saturated, word_to_address};
use crate::{
    evm::Evm,
    interpreter::{Control, RunState},
    result::{EvmError, ExceptionalHalt},
};

pub fn stop(_state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    Ok(Control::Stop)
}

pub fn jump(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let dest = state.stack.pop()?;
    let dest = as_usize_saturated(dest);

    if !state.is_valid_jump(dest) {
        return Err(ExceptionalHalt::InvalidJump.into());
    }
    state.pc = dest;

    Ok(Control::Continue)
}

pub fn jumpi(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [dest, condition] = state.stack.pop_array()?;

    if condition != U256::ZERO {
        let dest = as_usize_saturated(dest);
        if !state.is_valid_jump(dest) {
            return Err(ExceptionalHalt::InvalidJump.into());
        }
        state.pc = dest;
    }

    Ok(Control::Continue)
}

pub fn jumpdest(_state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    Ok(Control::Continue)
}

pub fn ret(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [offset, len] = state.stack.pop_array()?;
    state.output = state
        .memory
        .read(as_usize_saturated(offset), as_usize_saturated(len));

    Ok(Control::Return)
}

pub fn revert(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [offset, len] = state.stack.pop_array()?;
    state.output = state
        .memory
        .read(as_usize_saturated(offset), as_usize_saturated(len));

    Ok(Control::Revert)
}

pub fn invalid(_state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    Err(ExceptionalHalt::InvalidOpcode(crate::opcode::INVALID).into())
}

pub fn selfdestruct(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let beneficiary = word_to_address(state.stack.pop()?);

    let balance = evm
        .state
        .get_account(state.address)?
        .map(|account| account.balance)
        .unwrap_or(U256::ZERO);

    // Move the balance even when the account survives.
    if balance > U256::ZERO && beneficiary != state.address {
        let beneficiary_balance = evm
            .state
            .get_account(beneficiary)?
            .map(|account| account.balance)
            .unwrap_or(U256::ZERO);
        evm.state
            .set_balance(beneficiary, beneficiary_balance + balance)?;
        evm.state.set_balance(state.address, U256::ZERO)?;
    }

    let first = evm.journal.record_selfdestruct(state.address);
    if first && evm.hardfork < Hardfork::London {
        evm.journal.add_refund(evm.schedule.selfdestruct_refund);
    }

    // From the Cancun rules the account is only reaped when it was created
    // in the same transaction; the state manager applies the event
    // otherwise.
    if evm.hardfork >= Hardfork::Cancun
        && evm.journal.was_created_in_transaction(state.address)
    {
        evm.state.delete_account(state.address)?;
    }

    Ok(Control::SelfDestruct)
}
