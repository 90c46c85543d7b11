#![warn(missing_docs)]

//! An EVM bytecode interpreter with hardfork-parameterized semantics.
//!
//! The jump table is data: 256 [`table::Operation`] records assembled per
//! hardfork from fork-chained base tables, gas-modifying EIP layers and the
//! protocol parameter tables. A [`evm::Evm`] drives one transaction against
//! an injected [`state::StateManager`], tracking warm/cold access, refunds
//! and transient storage in its [`journal::Journal`].

/// Execution environments
pub mod env;
/// Object-format containers
pub mod eof;
/// The transaction-level execution context
pub mod evm;
/// Dynamic gas arithmetic
pub mod gas;
pub(crate) mod instructions;
/// The frame interpreter
pub mod interpreter;
/// The access witness and side-effect journal
pub mod journal;
/// Frame memory
pub mod memory;
/// Opcode bytes
pub mod opcode;
/// Precompile dispatch
pub mod precompile;
/// Results and errors
pub mod result;
/// The operand stack
pub mod stack;
/// The state-manager interface
pub mod state;
/// Jump tables
pub mod table;

pub use self::{
    env::{BlockEnv, CfgEnv, TxEnv},
    evm::{CallMessage, Evm, CALL_DEPTH_LIMIT},
    interpreter::RunState,
    journal::Journal,
    memory::Memory,
    result::{EvmError, ExceptionalHalt, ExecutionResult, Log, SuccessReason},
    stack::{Stack, STACK_LIMIT},
    state::{AccountInfo, InMemoryState, StateError, StateManager},
    table::{make_jump_table, JumpTable, Operation},
};

#[cfg(test)]
pub(crate) mod test_support {
    use ember_forks::{chains::mainnet_config, Hardfork};
    use ember_primitives::{Address, Bytes, U256};

    use crate::{
        env::{BlockEnv, CfgEnv, TxEnv},
        evm::Evm,
        interpreter::{execute_frame, Control, RunState},
        result::{EvmError, ExceptionalHalt, Log},
        state::InMemoryState,
        table::make_jump_table,
    };

    /// The address test frames execute as.
    pub const FRAME_ADDRESS: Address = Address::repeat_byte(0xc0);
    /// The caller of test frames.
    pub const FRAME_CALLER: Address = Address::repeat_byte(0xca);

    /// Everything a single-frame test can configure.
    #[derive(Default)]
    pub struct TestSetup {
        pub block: BlockEnv,
        pub tx: TxEnv,
        pub cfg: CfgEnv,
        pub state: InMemoryState,
        pub input: Bytes,
        pub value: U256,
    }

    impl TestSetup {
        fn new() -> Self {
            Self::default()
        }
    }

    /// How a test frame concluded.
    #[derive(Debug)]
    pub enum Outcome {
        Success {
            stack: Vec<U256>,
            gas_used: u64,
            output: Bytes,
        },
        Revert {
            output: Bytes,
            gas_used: u64,
        },
        Halt(ExceptionalHalt),
    }

    pub fn run_frame_full(
        code: &[u8],
        gas_limit: u64,
        hardfork: Hardfork,
        is_static: bool,
        configure: impl FnOnce(&mut TestSetup),
    ) -> (Outcome, Vec<Log>) {
        let chain = mainnet_config();
        let mut setup = TestSetup::new();
        configure(&mut setup);

        let table = make_jump_table(chain, hardfork, &[]);
        let mut state = setup.state;
        let mut evm = Evm::new(
            &mut state,
            chain,
            hardfork,
            &table,
            setup.block,
            setup.tx,
            setup.cfg,
        );

        let mut frame = RunState::new(
            Bytes::copy_from_slice(code),
            setup.input,
            FRAME_CALLER,
            FRAME_ADDRESS,
            setup.value,
            gas_limit,
            0,
            is_static,
        );

        let outcome = match execute_frame(&mut frame, &mut evm) {
            Ok(Control::Stop) | Ok(Control::Continue) | Ok(Control::SelfDestruct) => {
                Outcome::Success {
                    stack: frame.stack.data().to_vec(),
                    gas_used: gas_limit - frame.gas_left,
                    output: Bytes::new(),
                }
            }
            Ok(Control::Return) => Outcome::Success {
                stack: frame.stack.data().to_vec(),
                gas_used: gas_limit - frame.gas_left,
                output: frame.output.clone(),
            },
            Ok(Control::Revert) => Outcome::Revert {
                output: frame.output.clone(),
                gas_used: gas_limit - frame.gas_left,
            },
            Err(EvmError::Halt(halt)) => Outcome::Halt(halt),
            Err(EvmError::State(error)) => panic!("state error in test frame: {error}"),
        };

        (outcome, evm.logs)
    }

    pub fn run_code_with(
        code: &[u8],
        gas_limit: u64,
        hardfork: Hardfork,
        configure: impl FnOnce(&mut TestSetup),
    ) -> (Vec<U256>, u64) {
        let (outcome, _logs) = run_frame_full(code, gas_limit, hardfork, false, configure);
        match outcome {
            Outcome::Success { stack, gas_used, .. } => (stack, gas_used),
            other => panic!("expected success, got {other:?}"),
        }
    }

    pub fn run_code_at(code: &[u8], gas_limit: u64, hardfork: Hardfork) -> (Vec<U256>, u64) {
        run_code_with(code, gas_limit, hardfork, |_setup| {})
    }

    pub fn run_code(code: &[u8], gas_limit: u64) -> (Vec<U256>, u64) {
        run_code_at(code, gas_limit, Hardfork::Berlin)
    }

    pub fn run_code_outcome(code: &[u8], gas_limit: u64) -> Outcome {
        run_frame_full(code, gas_limit, Hardfork::Berlin, false, |_setup| {}).0
    }

    pub fn run_code_err(code: &[u8], gas_limit: u64) -> ExceptionalHalt {
        run_code_err_at(code, gas_limit, Hardfork::Berlin, false)
    }

    pub fn run_code_err_at(
        code: &[u8],
        gas_limit: u64,
        hardfork: Hardfork,
        is_static: bool,
    ) -> ExceptionalHalt {
        let (outcome, _logs) = run_frame_full(code, gas_limit, hardfork, is_static, |_setup| {});
        match outcome {
            Outcome::Halt(halt) => halt,
            other => panic!("expected exceptional halt, got {other:?}"),
        }
    }

    pub fn run_frame_logs(code: &[u8], gas_limit: u64, hardfork: Hardfork) -> Vec<Log> {
        run_frame_full(code, gas_limit, hardfork, false, |_setup| {}).1
    }
}
