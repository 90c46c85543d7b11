//! Object-format opcodes: static relative jumps, sections as functions,
//! unbounded stack manipulation, data-section access and the external call
//! family. Every handler traps when executed from legacy code.

use ember_primitives::{Bytes, B256, U256};

use super::{as_usize_saturated, word_to_address};
use crate::{
    eof::{ReturnFrame, RETURN_STACK_LIMIT},
    evm::{CallInputs, Evm, FrameResult},
    interpreter::{Control, RunState},
    result::{EvmError, ExceptionalHalt},
};

fn require_eof(state: &RunState) -> Result<(), EvmError> {
    if state.eof.is_none() {
        let op = state.code[state.pc - 1];
        return Err(ExceptionalHalt::InvalidOpcode(op).into());
    }

    Ok(())
}

fn relative_target(state: &RunState, after: usize, offset: i16) -> Result<usize, EvmError> {
    let target = i64::try_from(after)
        .ok()
        .map(|after| after + i64::from(offset))
        .filter(|target| *target >= 0 && *target <= state.code.len() as i64);

    match target {
        Some(target) => Ok(target as usize),
        None => Err(ExceptionalHalt::InvalidJump.into()),
    }
}

pub fn rjump(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let immediate = state.immediate(2);
    let offset = i16::from_be_bytes([immediate[0], immediate[1]]);
    state.pc = relative_target(state, state.pc + 2, offset)?;

    Ok(Control::Continue)
}

pub fn rjumpi(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let condition = state.stack.pop()?;
    let immediate = state.immediate(2);
    let offset = i16::from_be_bytes([immediate[0], immediate[1]]);

    if condition != U256::ZERO {
        state.pc = relative_target(state, state.pc + 2, offset)?;
    } else {
        state.pc += 2;
    }

    Ok(Control::Continue)
}

pub fn rjumpv(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let case = state.stack.pop()?;
    let max_index = usize::from(state.immediate(1)[0]);
    let table_end = state.pc + 1 + (max_index + 1) * 2;

    let case = as_usize_saturated(case);
    if case <= max_index {
        let entry = state.pc + 1 + case * 2;
        if entry + 2 > state.code.len() {
            return Err(ExceptionalHalt::InvalidJump.into());
        }
        let immediate = i16::from_be_bytes([state.code[entry], state.code[entry + 1]]);
        state.pc = relative_target(state, table_end, immediate)?;
    } else {
        state.pc = table_end;
    }

    Ok(Control::Continue)
}

fn switch_section(state: &mut RunState, section: usize) -> Result<(), EvmError> {
    let code = {
        let Some(eof) = state.eof.as_mut() else {
            return Err(ExceptionalHalt::InvalidOpcode(0).into());
        };
        let Some(code) = eof.container.code_sections.get(section) else {
            return Err(ExceptionalHalt::InvalidEofContainer.into());
        };
        eof.section = section;
        code.clone()
    };

    state.code = code;
    state.pc = 0;

    Ok(())
}

pub fn callf(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let immediate = state.immediate(2);
    let target = usize::from(u16::from_be_bytes([immediate[0], immediate[1]]));
    let return_pc = state.pc + 2;

    {
        let Some(eof) = state.eof.as_mut() else {
            return Err(ExceptionalHalt::InvalidOpcode(0).into());
        };
        if eof.return_stack.len() >= RETURN_STACK_LIMIT {
            return Err(ExceptionalHalt::ReturnStackOverflow.into());
        }
        let section = eof.section;
        eof.return_stack.push(ReturnFrame {
            section,
            pc: return_pc,
        });
    }

    switch_section(state, target)?;

    Ok(Control::Continue)
}

pub fn retf(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let frame = {
        let Some(eof) = state.eof.as_mut() else {
            return Err(ExceptionalHalt::InvalidOpcode(0).into());
        };
        eof.return_stack
            .pop()
            .ok_or(ExceptionalHalt::RetfNoReturn)?
    };

    switch_section(state, frame.section)?;
    state.pc = frame.pc;

    Ok(Control::Continue)
}

pub fn jumpf(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let immediate = state.immediate(2);
    let target = usize::from(u16::from_be_bytes([immediate[0], immediate[1]]));

    // A tail call: the section switches without a new return frame.
    switch_section(state, target)?;

    Ok(Control::Continue)
}

pub fn dupn(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let n = usize::from(state.immediate(1)[0]);
    state.stack.dup(n + 1)?;
    state.pc += 1;

    Ok(Control::Continue)
}

pub fn swapn(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let n = usize::from(state.immediate(1)[0]);
    state.stack.swap(n + 1)?;
    state.pc += 1;

    Ok(Control::Continue)
}

pub fn exchange(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let immediate = state.immediate(1)[0];
    let n = usize::from(immediate >> 4) + 1;
    let m = usize::from(immediate & 0x0f) + 1;
    state.stack.exchange(n, n + m)?;
    state.pc += 1;

    Ok(Control::Continue)
}

fn data_word(data: &[u8], offset: usize) -> U256 {
    let mut word = [0u8; 32];
    if offset < data.len() {
        let available = (data.len() - offset).min(32);
        word[..available].copy_from_slice(&data[offset..offset + available]);
    }

    U256::from_be_bytes(word)
}

pub fn dataload(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let offset = as_usize_saturated(state.stack.pop()?);
    let word = state
        .eof
        .as_ref()
        .map(|eof| data_word(&eof.container.data, offset))
        .unwrap_or(U256::ZERO);
    state.stack.push(word)?;

    Ok(Control::Continue)
}

pub fn dataloadn(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let immediate = state.immediate(2);
    let offset = usize::from(u16::from_be_bytes([immediate[0], immediate[1]]));
    let word = state
        .eof
        .as_ref()
        .map(|eof| data_word(&eof.container.data, offset))
        .unwrap_or(U256::ZERO);
    state.stack.push(word)?;
    state.pc += 2;

    Ok(Control::Continue)
}

pub fn datasize(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let size = state
        .eof
        .as_ref()
        .map(|eof| eof.container.data.len())
        .unwrap_or(0);
    state.stack.push(U256::from(size))?;

    Ok(Control::Continue)
}

pub fn datacopy(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let [dest, offset, len] = state.stack.pop_array()?;
    let dest = as_usize_saturated(dest);
    let offset = as_usize_saturated(offset);
    let len = as_usize_saturated(len);

    let data = state
        .eof
        .as_ref()
        .map(|eof| eof.container.data.clone())
        .unwrap_or_default();

    let mut out = vec![0u8; len];
    if offset < data.len() {
        let available = (data.len() - offset).min(len);
        out[..available].copy_from_slice(&data[offset..offset + available]);
    }
    state.memory.write(dest, &out);

    Ok(Control::Continue)
}

pub fn returndataload(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let offset = as_usize_saturated(state.stack.pop()?);
    let word = data_word(&state.return_bytes, offset);
    state.stack.push(word)?;

    Ok(Control::Continue)
}

/// Status codes pushed by the external call family.
const EXT_SUCCESS: u64 = 0;
const EXT_REVERT: u64 = 1;
const EXT_FAILURE: u64 = 2;

#[allow(clippy::too_many_arguments)]
fn ext_call_common(
    state: &mut RunState,
    evm: &mut Evm<'_>,
    has_value: bool,
    delegate: bool,
    is_static: bool,
) -> Result<Control, EvmError> {
    let gas_limit = state
        .message_gas_limit
        .take()
        .ok_or(ExceptionalHalt::OutOfGas)?;

    let target = word_to_address(state.stack.pop()?);
    let [in_offset, in_size] = state.stack.pop_array()?;
    let value = if has_value { state.stack.pop()? } else { U256::ZERO };

    let input = state
        .memory
        .read(as_usize_saturated(in_offset), as_usize_saturated(in_size));

    // Light failures return the forwarded gas and push the revert code
    // without entering the target.
    let mut light_failure = gas_limit < evm.schedule.min_callee_gas
        || state.depth + 1 > crate::evm::CALL_DEPTH_LIMIT
        || (value != U256::ZERO
            && evm
                .state
                .get_account(state.address)?
                .map(|account| account.balance)
                .unwrap_or(U256::ZERO)
                < value);

    // Delegating from an object-format frame into legacy code is refused.
    if delegate && !light_failure {
        let code = evm.state.get_code(target)?;
        if !crate::eof::is_eof(&code) {
            light_failure = true;
        }
    }

    if light_failure {
        state.gas_left += gas_limit;
        state.return_bytes = Bytes::new();
        state.stack.push(U256::from(EXT_REVERT))?;

        return Ok(Control::Continue);
    }

    let (caller, recipient, value, transfers) = if delegate {
        (state.caller, state.address, state.value, false)
    } else {
        (state.address, target, value, true)
    };

    let outcome = evm.call(CallInputs {
        caller,
        code_address: target,
        recipient,
        value,
        transfers_value: transfers,
        input,
        gas_limit,
        is_static: is_static || state.is_static,
        depth: state.depth + 1,
    })?;

    state.gas_left += outcome.gas_left;
    state.return_bytes = outcome.result.output();

    let status = match outcome.result {
        FrameResult::Success { .. } => EXT_SUCCESS,
        FrameResult::Revert { .. } => EXT_REVERT,
        FrameResult::Fatal { .. } => EXT_FAILURE,
    };
    state.stack.push(U256::from(status))?;

    Ok(Control::Continue)
}

pub fn extcall(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    ext_call_common(state, evm, true, false, false)
}

pub fn extdelegatecall(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    ext_call_common(state, evm, false, true, false)
}

pub fn extstaticcall(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    ext_call_common(state, evm, false, false, true)
}

pub fn eofcreate(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let gas_limit = state
        .message_gas_limit
        .take()
        .ok_or(ExceptionalHalt::OutOfGas)?;

    let container_index = usize::from(state.immediate(1)[0]);
    let container = state
        .eof
        .as_ref()
        .and_then(|eof| eof.container.container_sections.get(container_index))
        .cloned()
        .ok_or(ExceptionalHalt::InvalidEofContainer)?;
    state.pc += 1;

    let [value, salt, in_offset, in_size] = state.stack.pop_array()?;
    let input = state
        .memory
        .read(as_usize_saturated(in_offset), as_usize_saturated(in_size));

    let outcome = evm.eofcreate(
        state.address,
        value,
        B256::from(salt.to_be_bytes::<32>()),
        container,
        input,
        gas_limit,
        state.depth + 1,
    )?;

    state.gas_left += outcome.gas_left;
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

pub fn returncontract(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    require_eof(state)?;

    let container_index = usize::from(state.immediate(1)[0]);
    state.pc += 1;

    let [aux_offset, aux_size] = state.stack.pop_array()?;
    let aux = state
        .memory
        .read(as_usize_saturated(aux_offset), as_usize_saturated(aux_size));

    let container = state
        .eof
        .as_ref()
        .and_then(|eof| eof.container.container_sections.get(container_index))
        .cloned()
        .ok_or(ExceptionalHalt::InvalidEofContainer)?;

    // The aux data lands at the tail of the deployed container, topping up
    // its data section.
    let mut deployed = container.to_vec();
    deployed.extend_from_slice(&aux);
    let deployed: Bytes = deployed.into();

    state.output = deployed.clone();
    if let Some(eof) = state.eof.as_mut() {
        eof.deploy_container = Some(deployed);
    }

    Ok(Control::Return)
}
