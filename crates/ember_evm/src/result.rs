use ember_primitives::{Address, Bytes, B256};

use crate::state::StateError;

/// The ways a frame can halt exceptionally. Every variant consumes all gas
/// remaining in the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExceptionalHalt {
    /// Ran out of gas.
    #[error("out of gas")]
    OutOfGas,
    /// Popped an empty stack.
    #[error("stack underflow")]
    StackUnderflow,
    /// Pushed beyond the stack capacity.
    #[error("stack overflow")]
    StackOverflow,
    /// Executed an opcode the jump table leaves undefined.
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),
    /// Jumped to a destination that is not a `JUMPDEST`.
    #[error("invalid JUMP")]
    InvalidJump,
    /// Attempted a state write inside a static frame.
    #[error("state modification attempted in static context")]
    StaticStateChange,
    /// Init code longer than the protocol cap.
    #[error("initcode size exceeds the maximum")]
    InitcodeSizeViolation,
    /// Read past the end of the return buffer.
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
    /// The refund counter would fall below zero.
    #[error("refund counter below zero")]
    RefundCounterBelowZero,
    /// Deployed code longer than the protocol cap.
    #[error("deployed code size exceeds the maximum")]
    CodeSizeExceeded,
    /// Deployed code starting with the reserved `0xEF` byte.
    #[error("deployed code starts with 0xEF")]
    CreateContractStartsWithEf,
    /// Address collision during contract creation.
    #[error("contract creation collision")]
    CreateCollision,
    /// Pushed a return frame beyond the return-stack capacity.
    #[error("return stack overflow")]
    ReturnStackOverflow,
    /// Executed `RETF` with an empty return stack.
    #[error("RETF with no return frame")]
    RetfNoReturn,
    /// An `EXT*CALL` target wider than an address.
    #[error("invalid EXTCALL target")]
    InvalidExtcallTarget,
    /// A malformed object-format container.
    #[error("invalid object-format container")]
    InvalidEofContainer,
}

/// An error inside the interpreter: an exceptional halt, or a state-manager
/// failure that propagates unchanged.
#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    /// The frame halted exceptionally.
    #[error(transparent)]
    Halt(#[from] ExceptionalHalt),
    /// The state manager failed.
    #[error(transparent)]
    State(#[from] StateError),
}

/// A log emitted during execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// The emitting contract.
    pub address: Address,
    /// The log's topics, at most four.
    pub topics: Vec<B256>,
    /// The log's payload.
    pub data: Bytes,
}

/// How a frame concluded successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuccessReason {
    /// Halted via `STOP` or by running off the end of the code.
    Stop,
    /// Halted via `RETURN`.
    Return,
    /// Halted via `SELFDESTRUCT`.
    SelfDestruct,
}

/// The outcome of a transaction-level message run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The message succeeded; state changes are committed.
    Success {
        /// How the outermost frame halted.
        reason: SuccessReason,
        /// Gas consumed, before refunds.
        gas_used: u64,
        /// The capped refund granted to the caller.
        gas_refunded: u64,
        /// Logs emitted across all frames.
        logs: Vec<Log>,
        /// The return value.
        output: Bytes,
    },
    /// The message reverted; the caller keeps the remaining gas.
    Revert {
        /// Gas consumed up to the revert.
        gas_used: u64,
        /// The revert payload.
        output: Bytes,
    },
    /// The message halted exceptionally, consuming all gas.
    Halt {
        /// The halting condition.
        reason: ExceptionalHalt,
        /// Gas consumed, which is the full message budget.
        gas_used: u64,
    },
}

impl ExecutionResult {
    /// Whether the message succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// The output or revert payload, if any.
    pub fn output(&self) -> Option<&Bytes> {
        match self {
            ExecutionResult::Success { output, .. }
            | ExecutionResult::Revert { output, .. } => Some(output),
            ExecutionResult::Halt { .. } => None,
        }
    }

    /// Gas consumed by the message.
    pub fn gas_used(&self) -> u64 {
        match self {
            ExecutionResult::Success { gas_used, .. }
            | ExecutionResult::Revert { gas_used, .. }
            | ExecutionResult::Halt { gas_used, .. } => *gas_used,
        }
    }
}
