use ember_primitives::{Address, Bytes, U256};

use crate::{
    eof::EofState,
    evm::Evm,
    memory::Memory,
    opcode,
    result::{EvmError, ExceptionalHalt},
    stack::Stack,
};

/// What an opcode handler tells the main loop to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Fall through to the next opcode.
    Continue,
    /// Halt successfully without return data.
    Stop,
    /// Halt successfully with the frame's output as return data.
    Return,
    /// Halt, reverting state but preserving the remaining gas.
    Revert,
    /// Halt successfully after scheduling the frame's own destruction.
    SelfDestruct,
}

/// The mutable state of a single execution frame.
#[derive(Debug)]
pub struct RunState {
    /// The code being executed.
    pub code: Bytes,
    /// Byte index into the current code.
    pub pc: usize,
    /// The operand stack.
    pub stack: Stack,
    /// The frame's memory.
    pub memory: Memory,
    /// Gas remaining in the frame.
    pub gas_left: u64,
    /// Whether state writes are forbidden.
    pub is_static: bool,
    /// The frame's call depth.
    pub depth: usize,
    /// The call data.
    pub input: Bytes,
    /// The value carried by the frame.
    pub value: U256,
    /// The calling address.
    pub caller: Address,
    /// The address the frame executes as.
    pub address: Address,
    /// Return data of the most recent nested call.
    pub return_bytes: Bytes,
    /// Gas forwarded to the next nested call, stashed by the dynamic-gas
    /// handler for the execute function.
    pub message_gas_limit: Option<u64>,
    /// Output set by `RETURN`, `REVERT` or `RETURNCONTRACT`.
    pub output: Bytes,
    /// Object-format context, present when executing an EOF container.
    pub eof: Option<EofState>,
    valid_jumps: Option<Vec<bool>>,
}

impl RunState {
    /// Creates the state for a fresh frame.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: Bytes,
        input: Bytes,
        caller: Address,
        address: Address,
        value: U256,
        gas_limit: u64,
        depth: usize,
        is_static: bool,
    ) -> Self {
        Self {
            code,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            gas_left: gas_limit,
            is_static,
            depth,
            input,
            value,
            caller,
            address,
            return_bytes: Bytes::new(),
            message_gas_limit: None,
            output: Bytes::new(),
            eof: None,
            valid_jumps: None,
        }
    }

    /// Deducts gas, or halts the frame with all gas consumed.
    pub fn use_gas(&mut self, amount: u64) -> Result<(), ExceptionalHalt> {
        if amount > self.gas_left {
            self.gas_left = 0;
            return Err(ExceptionalHalt::OutOfGas);
        }
        self.gas_left -= amount;

        Ok(())
    }

    /// Reads `len` immediate bytes at the program counter, zero-padded past
    /// the end of the code.
    pub fn immediate(&self, len: usize) -> Bytes {
        let mut out = vec![0u8; len];
        if self.pc < self.code.len() {
            let available = (self.code.len() - self.pc).min(len);
            out[..available].copy_from_slice(&self.code[self.pc..self.pc + available]);
        }

        out.into()
    }

    /// Whether `dest` is a `JUMPDEST` outside push data. The destination
    /// bitmap is computed on first use and cached.
    pub fn is_valid_jump(&mut self, dest: usize) -> bool {
        let valid_jumps = self
            .valid_jumps
            .get_or_insert_with(|| analyze_jump_destinations(&self.code));

        dest < valid_jumps.len() && valid_jumps[dest]
    }
}

/// One pass over the code marking `JUMPDEST` positions, skipping over
/// `PUSH1..=PUSH32` immediates.
fn analyze_jump_destinations(code: &[u8]) -> Vec<bool> {
    let mut valid = vec![false; code.len()];
    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        if op == opcode::JUMPDEST {
            valid[i] = true;
        } else if opcode::is_push(op) {
            i += usize::from(op - opcode::PUSH1) + 1;
        }
        i += 1;
    }

    valid
}

/// Runs the frame to a halt. State-manager failures propagate unchanged;
/// exceptional halts surface as [`EvmError::Halt`] with the frame's gas
/// already consumed.
pub fn execute_frame(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    loop {
        let Some(op) = state.code.get(state.pc).copied() else {
            // Running off the end of the code is an implicit STOP.
            return Ok(Control::Stop);
        };
        state.pc += 1;

        // `Operation` is `Copy`, releasing the borrow on the table before
        // the handler takes the context mutably.
        let entry = evm.table[op];
        log::trace!(
            "depth {} pc {} op {} gas {}",
            state.depth,
            state.pc - 1,
            entry.name,
            state.gas_left
        );

        if entry.undefined {
            state.gas_left = 0;
            return Err(ExceptionalHalt::InvalidOpcode(op).into());
        }
        if state.stack.len() < entry.min_stack {
            state.gas_left = 0;
            return Err(ExceptionalHalt::StackUnderflow.into());
        }
        if state.stack.len() > entry.max_stack {
            state.gas_left = 0;
            return Err(ExceptionalHalt::StackOverflow.into());
        }
        if state.is_static && entry.writes_state {
            state.gas_left = 0;
            return Err(ExceptionalHalt::StaticStateChange.into());
        }

        let mut gas = entry.constant_gas;
        if let Some(dynamic_gas) = entry.dynamic_gas {
            gas = match dynamic_gas(state, evm, gas) {
                Ok(gas) => gas,
                Err(error) => return Err(consume_on_halt(state, error)),
            };
        }
        if let Err(halt) = state.use_gas(gas) {
            return Err(halt.into());
        }

        match (entry.execute)(state, evm) {
            Ok(Control::Continue) => {}
            Ok(control) => return Ok(control),
            Err(error) => return Err(consume_on_halt(state, error)),
        }
    }
}

/// Exceptional halts consume all remaining gas; state errors leave it for
/// the caller to discard.
fn consume_on_halt(state: &mut RunState, error: EvmError) -> EvmError {
    if matches!(error, EvmError::Halt(_)) {
        state.gas_left = 0;
    }

    error
}
