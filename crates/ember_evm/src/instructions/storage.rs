//! Persistent and transient storage opcodes.
//!
//! All gas work, including the era-dependent `SSTORE` pricing, lives in the
//! dynamic-gas handlers; these functions only move values.

use crate::{
    evm::Evm,
    interpreter::{Control, RunState},
    result::EvmError,
};

pub fn sload(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let key = state.stack.pop()?;
    let value = evm.state.get_storage(state.address, key)?;
    state.stack.push(value)?;

    Ok(Control::Continue)
}

pub fn sstore(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [key, value] = state.stack.pop_array()?;
    evm.state.set_storage(state.address, key, value)?;

    Ok(Control::Continue)
}

pub fn tload(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let key = state.stack.pop()?;
    let value = evm.journal.get_transient(state.address, key);
    state.stack.push(value)?;

    Ok(Control::Continue)
}

pub fn tstore(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [key, value] = state.stack.pop_array()?;
    evm.journal.set_transient(state.address, key, value);

    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use ember_forks::Hardfork;
    use ember_primitives::U256;

    use crate::{opcode, test_support::{run_code_at, run_code_err_at}};

    #[test]
    fn tstore_tload_round_trip() {
        // PUSH1 7, PUSH1 0, TSTORE, PUSH1 0, TLOAD
        let code = [
            0x60, 0x07, 0x60, 0x00, opcode::TSTORE, 0x60, 0x00, opcode::TLOAD, 0x00,
        ];
        let (stack, gas) = run_code_at(&code, 100_000, Hardfork::Cancun);
        assert_eq!(stack, vec![U256::from(7u64)]);
        // Four pushes at 3 plus 100 each for TSTORE and TLOAD.
        assert_eq!(gas, 4 * 3 + 100 + 100);
    }

    #[test]
    fn tstore_is_a_state_write() {
        let code = [0x60, 0x07, 0x60, 0x00, opcode::TSTORE, 0x00];
        let halt = run_code_err_at(&code, 100_000, Hardfork::Cancun, true);
        assert_eq!(halt, crate::result::ExceptionalHalt::StaticStateChange);
    }
}
