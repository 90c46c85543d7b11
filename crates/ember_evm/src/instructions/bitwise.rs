//! Comparison and bitwise opcodes.

use ember_primitives::{I256, U256};

use super::bool_to_word;
use crate::{
    evm::Evm,
    interpreter::{Control, RunState},
    result::EvmError,
};

pub fn lt(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(bool_to_word(a < b))?;

    Ok(Control::Continue)
}

pub fn gt(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(bool_to_word(a > b))?;

    Ok(Control::Continue)
}

pub fn slt(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state
        .stack
        .push(bool_to_word(I256::from_raw(a) < I256::from_raw(b)))?;

    Ok(Control::Continue)
}

pub fn sgt(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state
        .stack
        .push(bool_to_word(I256::from_raw(a) > I256::from_raw(b)))?;

    Ok(Control::Continue)
}

pub fn eq(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(bool_to_word(a == b))?;

    Ok(Control::Continue)
}

pub fn iszero(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let a = state.stack.pop()?;
    state.stack.push(bool_to_word(a == U256::ZERO))?;

    Ok(Control::Continue)
}

pub fn and(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(a & b)?;

    Ok(Control::Continue)
}

pub fn or(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(a | b)?;

    Ok(Control::Continue)
}

pub fn xor(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(a ^ b)?;

    Ok(Control::Continue)
}

pub fn not(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let a = state.stack.pop()?;
    state.stack.push(!a)?;

    Ok(Control::Continue)
}

pub fn byte(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [index, value] = state.stack.pop_array()?;

    let result = if index < U256::from(32u64) {
        let byte = value.to_be_bytes::<32>()[index.to::<usize>()];
        U256::from(byte)
    } else {
        U256::ZERO
    };
    state.stack.push(result)?;

    Ok(Control::Continue)
}

pub fn shl(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [shift, value] = state.stack.pop_array()?;

    let result = if shift < U256::from(256u64) {
        value << shift.to::<usize>()
    } else {
        U256::ZERO
    };
    state.stack.push(result)?;

    Ok(Control::Continue)
}

pub fn shr(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [shift, value] = state.stack.pop_array()?;

    let result = if shift < U256::from(256u64) {
        value >> shift.to::<usize>()
    } else {
        U256::ZERO
    };
    state.stack.push(result)?;

    Ok(Control::Continue)
}

pub fn sar(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [shift, value] = state.stack.pop_array()?;
    let value = I256::from_raw(value);

    let result = if shift < U256::from(256u64) {
        value.asr(shift.to::<usize>())
    } else if value.is_negative() {
        I256::MINUS_ONE
    } else {
        I256::ZERO
    };
    state.stack.push(result.into_raw())?;

    Ok(Control::Continue)
}

pub fn clz(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let value = state.stack.pop()?;
    state.stack.push(U256::from(value.leading_zeros()))?;

    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{opcode, test_support::run_code_at, test_support::run_code};
    use ember_forks::Hardfork;

    #[test]
    fn comparisons() {
        // PUSH1 2, PUSH1 1, LT -> 1 < 2
        let (stack, _gas) = run_code(&[0x60, 0x02, 0x60, 0x01, opcode::LT, 0x00], 100_000);
        assert_eq!(stack, vec![U256::from(1u64)]);

        let (stack, _gas) = run_code(&[0x60, 0x02, 0x60, 0x01, opcode::GT, 0x00], 100_000);
        assert_eq!(stack, vec![U256::ZERO]);
    }

    #[test]
    fn byte_out_of_range_is_zero() {
        // PUSH1 0xab, PUSH1 32, BYTE
        let (stack, _gas) = run_code(&[0x60, 0xab, 0x60, 0x20, opcode::BYTE, 0x00], 100_000);
        assert_eq!(stack, vec![U256::ZERO]);

        // Byte 31 is the lowest-order byte.
        let (stack, _gas) = run_code(&[0x60, 0xab, 0x60, 0x1f, opcode::BYTE, 0x00], 100_000);
        assert_eq!(stack, vec![U256::from(0xabu64)]);
    }

    #[test]
    fn oversized_shifts_clear() {
        // PUSH1 1, PUSH2 0x0100, SHL
        let (stack, _gas) = run_code(
            &[0x60, 0x01, 0x61, 0x01, 0x00, opcode::SHL, 0x00],
            100_000,
        );
        assert_eq!(stack, vec![U256::ZERO]);
    }

    #[test]
    fn sar_saturates_by_sign() {
        // PUSH32 -1, PUSH2 256, SAR -> all ones
        let mut code = vec![0x7f];
        code.extend_from_slice(&[0xff; 32]);
        code.extend_from_slice(&[0x61, 0x01, 0x00, opcode::SAR, 0x00]);

        let (stack, _gas) = run_code(&code, 100_000);
        assert_eq!(stack, vec![U256::MAX]);

        // PUSH1 4, PUSH2 256, SAR -> 0
        let (stack, _gas) = run_code(
            &[0x60, 0x04, 0x61, 0x01, 0x00, opcode::SAR, 0x00],
            100_000,
        );
        assert_eq!(stack, vec![U256::ZERO]);
    }

    #[test]
    fn clz_of_zero_is_256() {
        let (stack, _gas) = run_code_at(
            &[0x60, 0x00, opcode::CLZ, 0x00],
            100_000,
            Hardfork::Osaka,
        );
        assert_eq!(stack, vec![U256::from(256u64)]);

        let (stack, _gas) = run_code_at(
            &[0x60, 0x01, opcode::CLZ, 0x00],
            100_000,
            Hardfork::Osaka,
        );
        assert_eq!(stack, vec![U256::from(255u64)]);
    }
}
