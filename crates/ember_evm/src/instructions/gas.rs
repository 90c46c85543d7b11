//! Dynamic-gas handlers.
//!
//! Each receives the running gas total after the constant portion and
//! returns the new total; the main loop charges the result. Handlers for
//! the call and create family also compute the forwarded gas and stash it
//! in [`RunState::message_gas_limit`].

use ember_forks::Hardfork;
use ember_primitives::U256;

use super::{as_u64_saturated, word_to_address};
use crate::{
    evm::Evm,
    gas::all_but_one_64th,
    interpreter::RunState,
    opcode,
    result::{EvmError, ExceptionalHalt},
};

fn mem_expand(
    state: &mut RunState,
    evm: &Evm<'_>,
    offset: U256,
    len: U256,
) -> Result<u64, EvmError> {
    if len == U256::ZERO {
        return Ok(0);
    }

    let cost = evm.schedule.memory_expansion(
        &mut state.memory,
        as_u64_saturated(offset),
        as_u64_saturated(len),
    )?;

    Ok(cost)
}

fn words(len: u64) -> u64 {
    len.div_ceil(32)
}

fn add(gas: u64, amount: u64) -> Result<u64, EvmError> {
    gas.checked_add(amount)
        .ok_or_else(|| ExceptionalHalt::OutOfGas.into())
}

/// Marks the address warm and returns the access cost it incurred.
fn account_access_cost(evm: &mut Evm<'_>, address: ember_primitives::Address) -> u64 {
    if evm.journal.warm_address(address) {
        evm.schedule.cold_account_access
    } else {
        evm.schedule.warm_storage_read
    }
}

pub fn exp(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let exponent = state.stack.peek(1)?;
    let byte_len = (exponent.bit_len() as u64).div_ceil(8);

    add(gas, evm.schedule.exp_byte * byte_len)
}

pub fn keccak256(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let offset = state.stack.peek(0)?;
    let len = state.stack.peek(1)?;

    let gas = add(gas, mem_expand(state, evm, offset, len)?)?;
    add(gas, evm.schedule.keccak256_word * words(as_u64_saturated(len)))
}

/// `CALLDATACOPY`, `CODECOPY`, `RETURNDATACOPY` and `DATACOPY`: per-word
/// copy cost plus memory expansion. The destination is the top stack item
/// and the length the third.
pub fn copy_to_memory(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let dest = state.stack.peek(0)?;
    let len = state.stack.peek(2)?;

    let gas = add(gas, mem_expand(state, evm, dest, len)?)?;
    add(gas, evm.schedule.copy * words(as_u64_saturated(len)))
}

pub use copy_to_memory as returndatacopy;

pub fn extcodecopy(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let dest = state.stack.peek(1)?;
    let len = state.stack.peek(3)?;

    let gas = add(gas, mem_expand(state, evm, dest, len)?)?;
    add(gas, evm.schedule.copy * words(as_u64_saturated(len)))
}

pub fn extcodecopy_eip2929(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    let address = word_to_address(state.stack.peek(0)?);
    let gas = add(gas, account_access_cost(evm, address))?;

    extcodecopy(state, evm, gas)
}

/// EIP-2929 access pricing for `BALANCE`, `EXTCODESIZE` and `EXTCODEHASH`.
pub fn account_access(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let address = word_to_address(state.stack.peek(0)?);

    add(gas, account_access_cost(evm, address))
}

pub fn sload_eip2929(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let key = state.stack.peek(0)?;

    let cost = if evm.journal.warm_storage(state.address, key) {
        evm.schedule.cold_sload
    } else {
        evm.schedule.warm_storage_read
    };

    add(gas, cost)
}

pub fn mload(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let offset = state.stack.peek(0)?;

    add(gas, mem_expand(state, evm, offset, U256::from(32u64))?)
}

pub use mload as mstore;

pub fn mstore8(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let offset = state.stack.peek(0)?;

    add(gas, mem_expand(state, evm, offset, U256::from(1u64))?)
}

pub fn mcopy(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let dest = state.stack.peek(0)?;
    let src = state.stack.peek(1)?;
    let len = state.stack.peek(2)?;

    let gas = add(gas, mem_expand(state, evm, dest, len)?)?;
    let gas = add(gas, mem_expand(state, evm, src, len)?)?;
    add(gas, evm.schedule.copy * words(as_u64_saturated(len)))
}

/// `RETURN` and `REVERT`: memory expansion over the output range.
pub fn memory_return(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let offset = state.stack.peek(0)?;
    let len = state.stack.peek(1)?;

    add(gas, mem_expand(state, evm, offset, len)?)
}

pub fn log(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let op = state.code[state.pc - 1];
    let topic_count = u64::from(op - opcode::LOG0);

    let offset = state.stack.peek(0)?;
    let len = state.stack.peek(1)?;

    let gas = add(gas, mem_expand(state, evm, offset, len)?)?;
    let gas = add(gas, evm.schedule.log_topic * topic_count)?;
    add(gas, evm.schedule.log_data * as_u64_saturated(len))
}

// ---------------------------------------------------------------------------
// SSTORE through the eras.

pub fn sstore_frontier(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    let key = state.stack.peek(0)?;
    let new = state.stack.peek(1)?;
    let current = evm.state.get_storage(state.address, key)?;

    if new == U256::ZERO && current != U256::ZERO {
        evm.journal.add_refund(evm.schedule.sstore_refund);
    }

    let cost = if current == U256::ZERO && new != U256::ZERO {
        evm.schedule.sstore_set
    } else {
        evm.schedule.sstore_reset
    };

    add(gas, cost)
}

struct NetMeteredCosts {
    noop: u64,
    init: u64,
    clean: u64,
    dirty: u64,
    init_refund: u64,
    clean_refund: u64,
    clear_refund: u64,
}

/// The shared classification of the net-metered `SSTORE` rules: no-op,
/// fresh write, clean overwrite and the dirty cases with their refund
/// adjustments.
fn sstore_net_metered(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
    costs: &NetMeteredCosts,
) -> Result<u64, EvmError> {
    let key = state.stack.peek(0)?;
    let new = state.stack.peek(1)?;
    let current = evm.state.get_storage(state.address, key)?;
    let original = evm.journal.original_storage(state.address, key, current);

    if current == new {
        return add(gas, costs.noop);
    }

    if original == current {
        if original == U256::ZERO {
            return add(gas, costs.init);
        }
        if new == U256::ZERO {
            evm.journal.add_refund(costs.clear_refund);
        }

        return add(gas, costs.clean);
    }

    // The slot is dirty: charge the cheap write and square up the refunds.
    if original != U256::ZERO {
        if current == U256::ZERO {
            evm.journal.sub_refund(costs.clear_refund)?;
        } else if new == U256::ZERO {
            evm.journal.add_refund(costs.clear_refund);
        }
    }
    if original == new {
        if original == U256::ZERO {
            evm.journal.add_refund(costs.init_refund);
        } else {
            evm.journal.add_refund(costs.clean_refund);
        }
    }

    add(gas, costs.dirty)
}

pub fn sstore_eip1283(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    let costs = NetMeteredCosts {
        noop: evm.param("netSstoreNoopGas").unwrap_or(200),
        init: evm.param("netSstoreInitGas").unwrap_or(20000),
        clean: evm.param("netSstoreCleanGas").unwrap_or(5000),
        dirty: evm.param("netSstoreDirtyGas").unwrap_or(200),
        init_refund: evm.param("netSstoreResetClearRefundGas").unwrap_or(19800),
        clean_refund: evm.param("netSstoreResetRefundGas").unwrap_or(4800),
        clear_refund: evm.param("netSstoreClearRefundGas").unwrap_or(15000),
    };

    sstore_net_metered(state, evm, gas, &costs)
}

fn sstore_sentry(state: &RunState, evm: &Evm<'_>) -> Result<(), EvmError> {
    let sentry = evm.param("sstoreSentryEIP2200Gas").unwrap_or(2300);
    if state.gas_left <= sentry {
        return Err(ExceptionalHalt::OutOfGas.into());
    }

    Ok(())
}

fn eip2200_costs(evm: &Evm<'_>) -> NetMeteredCosts {
    NetMeteredCosts {
        noop: evm.param("sstoreNoopEIP2200Gas").unwrap_or(800),
        init: evm.param("sstoreInitEIP2200Gas").unwrap_or(20000),
        clean: evm.param("sstoreCleanEIP2200Gas").unwrap_or(5000),
        dirty: evm.param("sstoreDirtyEIP2200Gas").unwrap_or(800),
        init_refund: evm.param("sstoreInitRefundEIP2200Gas").unwrap_or(19200),
        clean_refund: evm.param("sstoreCleanRefundEIP2200Gas").unwrap_or(4200),
        clear_refund: evm.param("sstoreClearRefundEIP2200Gas").unwrap_or(15000),
    }
}

pub fn sstore_eip2200(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    sstore_sentry(state, evm)?;
    let costs = eip2200_costs(evm);

    sstore_net_metered(state, evm, gas, &costs)
}

/// The combined EIP-2200 and EIP-2929 handler: the sentry, then the cold
/// surcharge up front, then the warm-scaled net-metered classification.
pub fn sstore_eip2929(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    sstore_sentry(state, evm)?;

    let key = state.stack.peek(0)?;
    let mut gas = gas;
    if evm.journal.warm_storage(state.address, key) {
        gas = add(gas, evm.schedule.cold_sload)?;
    }

    let costs = eip2200_costs(evm);
    sstore_net_metered(state, evm, gas, &costs)
}

// ---------------------------------------------------------------------------
// Call and create family.

#[derive(Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

fn call_family(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    mut gas: u64,
    kind: CallKind,
    eip2929: bool,
) -> Result<u64, EvmError> {
    let requested = state.stack.peek(0)?;
    let to = word_to_address(state.stack.peek(1)?);

    let (value, args_at) = match kind {
        CallKind::Call | CallKind::CallCode => (state.stack.peek(2)?, 3),
        CallKind::DelegateCall | CallKind::StaticCall => (U256::ZERO, 2),
    };

    if kind == CallKind::Call && state.is_static && value != U256::ZERO {
        return Err(ExceptionalHalt::StaticStateChange.into());
    }

    let in_offset = state.stack.peek(args_at)?;
    let in_size = state.stack.peek(args_at + 1)?;
    let out_offset = state.stack.peek(args_at + 2)?;
    let out_size = state.stack.peek(args_at + 3)?;

    gas = add(gas, mem_expand(state, evm, in_offset, in_size)?)?;
    gas = add(gas, mem_expand(state, evm, out_offset, out_size)?)?;

    if eip2929 {
        gas = add(gas, account_access_cost(evm, to))?;
    }

    let transfers = matches!(kind, CallKind::Call | CallKind::CallCode) && value != U256::ZERO;
    if transfers {
        gas = add(gas, evm.schedule.call_value_transfer)?;
    }

    // Account-creation surcharge, for plain calls only.
    if kind == CallKind::Call {
        let account = evm.state.get_account(to)?;
        let charge = if evm.hardfork >= Hardfork::SpuriousDragon {
            value != U256::ZERO && account.map_or(true, |account| account.is_empty())
        } else {
            account.is_none()
        };
        if charge {
            gas = add(gas, evm.schedule.call_new_account)?;
        }
    }

    let available = state
        .gas_left
        .checked_sub(gas)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    let requested = as_u64_saturated(requested);
    let forwarded = if evm.hardfork >= Hardfork::TangerineWhistle {
        requested.min(all_but_one_64th(available))
    } else {
        requested
    };

    gas = add(gas, forwarded)?;

    let stipend = if transfers { evm.schedule.call_stipend } else { 0 };
    state.message_gas_limit = Some(forwarded + stipend);

    Ok(gas)
}

pub fn call(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    call_family(state, evm, gas, CallKind::Call, false)
}

pub fn callcode(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    call_family(state, evm, gas, CallKind::CallCode, false)
}

pub fn delegatecall(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    call_family(state, evm, gas, CallKind::DelegateCall, false)
}

pub fn staticcall(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    call_family(state, evm, gas, CallKind::StaticCall, false)
}

pub fn call_eip2929(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    call_family(state, evm, gas, CallKind::Call, true)
}

pub fn callcode_eip2929(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    call_family(state, evm, gas, CallKind::CallCode, true)
}

pub fn delegatecall_eip2929(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    call_family(state, evm, gas, CallKind::DelegateCall, true)
}

pub fn staticcall_eip2929(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    call_family(state, evm, gas, CallKind::StaticCall, true)
}

fn create_family(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    mut gas: u64,
    hashes_init_code: bool,
    eip3860: bool,
) -> Result<u64, EvmError> {
    let offset = state.stack.peek(1)?;
    let size = state.stack.peek(2)?;

    gas = add(gas, mem_expand(state, evm, offset, size)?)?;

    let size = as_u64_saturated(size);
    if eip3860 {
        if !evm.cfg.allow_unlimited_init_code && size > evm.schedule.max_init_code_size {
            return Err(ExceptionalHalt::InitcodeSizeViolation.into());
        }
        gas = add(gas, evm.schedule.initcode_word * words(size))?;
    }
    if hashes_init_code {
        gas = add(gas, evm.schedule.keccak256_word * words(size))?;
    }

    let available = state
        .gas_left
        .checked_sub(gas)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    let forwarded = if evm.hardfork >= Hardfork::TangerineWhistle {
        all_but_one_64th(available)
    } else {
        available
    };

    gas = add(gas, forwarded)?;
    state.message_gas_limit = Some(forwarded);

    Ok(gas)
}

pub fn create(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    create_family(state, evm, gas, false, false)
}

pub fn create2(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    create_family(state, evm, gas, true, false)
}

pub fn create_eip3860(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    create_family(state, evm, gas, false, true)
}

pub fn create2_eip3860(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    create_family(state, evm, gas, true, true)
}

fn selfdestruct_family(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    mut gas: u64,
    eip2929: bool,
) -> Result<u64, EvmError> {
    let beneficiary = word_to_address(state.stack.peek(0)?);

    if eip2929 && evm.journal.warm_address(beneficiary) {
        gas = add(gas, evm.schedule.cold_account_access)?;
    }

    let charge = if evm.hardfork >= Hardfork::SpuriousDragon {
        let balance = evm
            .state
            .get_account(state.address)?
            .map(|account| account.balance)
            .unwrap_or(U256::ZERO);

        balance != U256::ZERO
            && evm
                .state
                .get_account(beneficiary)?
                .map_or(true, |account| account.is_empty())
    } else if evm.hardfork >= Hardfork::TangerineWhistle {
        evm.state.get_account(beneficiary)?.is_none()
    } else {
        false
    };
    if charge {
        gas = add(gas, evm.schedule.call_new_account)?;
    }

    Ok(gas)
}

pub fn selfdestruct(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    selfdestruct_family(state, evm, gas, false)
}

pub fn selfdestruct_eip2929(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    selfdestruct_family(state, evm, gas, true)
}

// ---------------------------------------------------------------------------
// Object-format externals: a retained-gas rule instead of 63/64 forwarding.

fn ext_call_family(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    mut gas: u64,
    has_value: bool,
) -> Result<u64, EvmError> {
    let target = state.stack.peek(0)?;
    if target > U256::from_be_slice(&[0xffu8; 20]) {
        return Err(ExceptionalHalt::InvalidExtcallTarget.into());
    }
    let target = word_to_address(target);

    let in_offset = state.stack.peek(1)?;
    let in_size = state.stack.peek(2)?;
    let value = if has_value {
        state.stack.peek(3)?
    } else {
        U256::ZERO
    };

    if state.is_static && value != U256::ZERO {
        return Err(ExceptionalHalt::StaticStateChange.into());
    }

    gas = add(gas, mem_expand(state, evm, in_offset, in_size)?)?;
    gas = add(gas, account_access_cost(evm, target))?;

    if value != U256::ZERO {
        gas = add(gas, evm.schedule.call_value_transfer)?;
        if evm
            .state
            .get_account(target)?
            .map_or(true, |account| account.is_empty())
        {
            gas = add(gas, evm.schedule.call_new_account)?;
        }
    }

    let available = state
        .gas_left
        .checked_sub(gas)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    let retained = evm.schedule.min_retained_gas.max(available / 64);
    let forwarded = available.saturating_sub(retained);

    gas = add(gas, forwarded)?;
    state.message_gas_limit = Some(forwarded);

    Ok(gas)
}

pub fn extcall(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    ext_call_family(state, evm, gas, true)
}

pub fn extdelegatecall(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    gas: u64,
) -> Result<u64, EvmError> {
    ext_call_family(state, evm, gas, false)
}

pub fn extstaticcall(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    ext_call_family(state, evm, gas, false)
}

pub fn eofcreate(state: &mut RunState, evm: &mut Evm<'_>, gas: u64) -> Result<u64, EvmError> {
    let container_len = state
        .eof
        .as_ref()
        .and_then(|eof| {
            let index = usize::from(state.code.get(state.pc).copied().unwrap_or(0));
            eof.container
                .container_sections
                .get(index)
                .map(|container| container.len() as u64)
        })
        .unwrap_or(0);

    let in_offset = state.stack.peek(2)?;
    let in_size = state.stack.peek(3)?;

    let mut gas = add(gas, mem_expand(state, evm, in_offset, in_size)?)?;
    gas = add(gas, evm.schedule.keccak256_word * words(container_len))?;

    let available = state
        .gas_left
        .checked_sub(gas)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    let forwarded = all_but_one_64th(available);

    gas = add(gas, forwarded)?;
    state.message_gas_limit = Some(forwarded);

    Ok(gas)
}

#[cfg(test)]
mod tests {
    use ember_forks::Hardfork;
    use ember_primitives::{Address, Bytes, U256};

    use crate::{
        opcode,
        state::InMemoryState,
        test_support::{run_code, run_code_at, run_code_with},
    };

    #[test]
    fn exp_charges_per_exponent_byte() {
        // PUSH32 (2^256 - 1) as the exponent, PUSH1 1 as the base.
        let mut code = vec![0x7f];
        code.extend_from_slice(&[0xff; 32]);
        code.extend_from_slice(&[0x60, 0x01, opcode::EXP, 0x00]);

        let (stack, gas) = run_code_at(&code, 100_000, Hardfork::Frontier);
        assert_eq!(stack, vec![U256::from(1u64)]);
        // Two pushes plus 10 base and 10 per exponent byte.
        assert_eq!(gas, 3 + 3 + 10 + 32 * 10);

        // EIP-160 reprices the exponent byte.
        let (_stack, gas) = run_code_at(&code, 100_000, Hardfork::SpuriousDragon);
        assert_eq!(gas, 3 + 3 + 10 + 32 * 50);
    }

    #[test]
    fn sstore_cold_set_under_berlin() {
        // PUSH1 7, PUSH1 0, SSTORE on a fresh slot.
        let code = [0x60, 0x07, 0x60, 0x00, opcode::SSTORE, 0x00];
        let (_stack, gas) = run_code(&code, 100_000);

        // Cold slot access plus the fresh-write cost.
        assert_eq!(gas, 3 + 3 + 2100 + 20000);
    }

    #[test]
    fn sstore_warm_noop_under_berlin() {
        // Write 7 twice; the second store is a warm no-op.
        let code = [
            0x60, 0x07, 0x60, 0x00, opcode::SSTORE,
            0x60, 0x07, 0x60, 0x00, opcode::SSTORE,
            0x00,
        ];
        let (_stack, gas) = run_code(&code, 100_000);

        assert_eq!(gas, (3 + 3 + 22100) + (3 + 3 + 100));
    }

    #[test]
    fn sstore_clearing_adds_the_refund() {
        let code = [
            0x60, 0x07, 0x60, 0x00, opcode::SSTORE, // 0 -> 7
            0x60, 0x00, 0x60, 0x00, opcode::SSTORE, // 7 -> 0 undoes the write
            0x00,
        ];
        let (outcome, _logs) = crate::test_support::run_frame_full(
            &code,
            100_000,
            Hardfork::Berlin,
            false,
            |_setup| {},
        );
        // The undo of a fresh write charges the warm dirty rate.
        let crate::test_support::Outcome::Success { gas_used, .. } = outcome else {
            panic!("expected success");
        };
        assert_eq!(gas_used, (3 + 3 + 22100) + (3 + 3 + 100));
    }

    #[test]
    fn sstore_sentry_rejects_low_gas() {
        let code = [0x60, 0x07, 0x60, 0x00, opcode::SSTORE, 0x00];
        // 2300 gas left at the SSTORE is not enough under EIP-2200.
        let halt = {
            let (outcome, _logs) = crate::test_support::run_frame_full(
                &code,
                2306,
                Hardfork::Istanbul,
                false,
                |_setup| {},
            );
            match outcome {
                crate::test_support::Outcome::Halt(halt) => halt,
                other => panic!("expected halt, got {other:?}"),
            }
        };
        assert_eq!(halt, crate::result::ExceptionalHalt::OutOfGas);
    }

    #[test]
    fn call_forwards_sixty_three_sixty_fourths() {
        let target = Address::repeat_byte(0xdd);
        // An infinite loop: the callee burns everything it is given.
        let looping: Bytes = Bytes::copy_from_slice(&[0x5b, 0x60, 0x00, opcode::JUMP]);

        // Seven pushes cost 21 gas and the cold account access 2600,
        // leaving exactly 64,000 at the forwarding decision.
        let code = [
            0x60, 0x00, // out size
            0x60, 0x00, // out offset
            0x60, 0x00, // in size
            0x60, 0x00, // in offset
            0x60, 0x00, // value
            0x73, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd,
            0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, // PUSH20 target
            0x62, 0x01, 0x86, 0xa0, // PUSH3 100000, far above the cap
            opcode::CALL,
            0x00,
        ];

        let (stack, gas) = run_code_with(&code, 21 + 2600 + 64_000, Hardfork::Berlin, |setup| {
            setup.state = InMemoryState::new().with_code(target, looping.clone());
        });

        // The callee fails out of gas, pushing 0; the caller paid the
        // forwarded 63,000 and keeps the withheld 1,000.
        assert_eq!(stack, vec![U256::ZERO]);
        assert_eq!(gas, 21 + 2600 + 63_000);
    }

    #[test]
    fn call_returns_unused_gas() {
        let target = Address::repeat_byte(0xdd);
        // The callee stops immediately.
        let stopping: Bytes = Bytes::copy_from_slice(&[0x00]);

        let code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00,
            0x73, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd,
            0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd,
            0x62, 0x01, 0x86, 0xa0,
            opcode::CALL,
            0x00,
        ];

        let (stack, gas) = run_code_with(&code, 100_000, Hardfork::Berlin, |setup| {
            setup.state = InMemoryState::new().with_code(target, stopping.clone());
        });

        assert_eq!(stack, vec![U256::from(1u64)]);
        assert_eq!(gas, 21 + 2600);
    }

    #[test]
    fn static_call_with_value_is_rejected() {
        let code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00,
            0x60, 0x01, // value
            0x60, 0xdd, // target
            0x60, 0x00, // gas
            opcode::CALL,
            0x00,
        ];

        let halt = crate::test_support::run_code_err_at(&code, 100_000, Hardfork::Berlin, true);
        assert_eq!(halt, crate::result::ExceptionalHalt::StaticStateChange);
    }

    #[test]
    fn initcode_size_cap_applies_from_shanghai() {
        // CREATE with a 49,153-byte init code region, one past the cap.
        let code = [
            0x62, 0x00, 0xc0, 0x01, // size = 49153
            0x60, 0x00, // offset
            0x60, 0x00, // value
            opcode::CREATE,
            0x00,
        ];

        let halt = crate::test_support::run_code_err_at(&code, 30_000_000, Hardfork::Shanghai, false);
        assert_eq!(halt, crate::result::ExceptionalHalt::InitcodeSizeViolation);
    }
}
