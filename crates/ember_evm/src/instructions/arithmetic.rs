//! Arithmetic opcodes. All operations wrap modulo 2^256; division by zero
//! yields zero.

use ember_primitives::{I256, U256};

use crate::{
    evm::Evm,
    interpreter::{Control, RunState},
    result::EvmError,
};

pub fn add(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(a.wrapping_add(b))?;

    Ok(Control::Continue)
}

pub fn mul(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(a.wrapping_mul(b))?;

    Ok(Control::Continue)
}

pub fn sub(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    state.stack.push(a.wrapping_sub(b))?;

    Ok(Control::Continue)
}

pub fn div(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    let quotient = if b == U256::ZERO { U256::ZERO } else { a / b };
    state.stack.push(quotient)?;

    Ok(Control::Continue)
}

pub fn sdiv(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    let a = I256::from_raw(a);
    let b = I256::from_raw(b);

    let quotient = if b == I256::ZERO {
        I256::ZERO
    } else if a == I256::MIN && b == I256::MINUS_ONE {
        // The lone signed overflow case wraps back to itself.
        I256::MIN
    } else {
        a / b
    };
    state.stack.push(quotient.into_raw())?;

    Ok(Control::Continue)
}

pub fn rem(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    let remainder = if b == U256::ZERO { U256::ZERO } else { a % b };
    state.stack.push(remainder)?;

    Ok(Control::Continue)
}

pub fn smod(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b] = state.stack.pop_array()?;
    let a = I256::from_raw(a);
    let b = I256::from_raw(b);

    // The sign of the result follows the dividend.
    let remainder = if b == I256::ZERO || (a == I256::MIN && b == I256::MINUS_ONE) {
        I256::ZERO
    } else {
        a % b
    };
    state.stack.push(remainder.into_raw())?;

    Ok(Control::Continue)
}

pub fn addmod(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b, n] = state.stack.pop_array()?;
    let result = if n == U256::ZERO {
        U256::ZERO
    } else {
        a.add_mod(b, n)
    };
    state.stack.push(result)?;

    Ok(Control::Continue)
}

pub fn mulmod(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [a, b, n] = state.stack.pop_array()?;
    let result = if n == U256::ZERO {
        U256::ZERO
    } else {
        a.mul_mod(b, n)
    };
    state.stack.push(result)?;

    Ok(Control::Continue)
}

pub fn exp(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [base, exponent] = state.stack.pop_array()?;
    state.stack.push(base.pow(exponent))?;

    Ok(Control::Continue)
}

pub fn signextend(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [k, value] = state.stack.pop_array()?;

    // Byte indices of 31 and above already span the full width.
    let result = if k < U256::from(31u64) {
        let bit = k.to::<usize>() * 8 + 7;
        let mask = (U256::from(1u64) << bit) - U256::from(1u64);
        if value.bit(bit) {
            value | !mask
        } else {
            value & mask
        }
    } else {
        value
    };
    state.stack.push(result)?;

    Ok(Control::Continue)
}
