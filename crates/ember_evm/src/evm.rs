use alloy_rlp::Encodable as _;
use ember_forks::{ChainConfig, Hardfork};
use ember_primitives::{keccak256, Address, Bytes, B256, U256};

use crate::{
    env::{BlockEnv, CfgEnv, TxEnv},
    eof::{self, EofContainer, EofState},
    gas::GasSchedule,
    interpreter::{execute_frame, Control, RunState},
    journal::Journal,
    precompile::Precompiles,
    result::{EvmError, ExceptionalHalt, ExecutionResult, Log, SuccessReason},
    state::{StateError, StateManager},
    table::JumpTable,
};

/// Call depth limit for nested frames.
pub const CALL_DEPTH_LIMIT: usize = 1024;

/// A top-level message: a call to an address, or a creation when `to` is
/// `None`.
#[derive(Clone, Debug)]
pub struct CallMessage {
    /// The sending address.
    pub caller: Address,
    /// The target, or `None` to create a contract.
    pub to: Option<Address>,
    /// The transferred value.
    pub value: U256,
    /// Call data, or init code for creations.
    pub data: Bytes,
    /// The message gas budget.
    pub gas_limit: u64,
    /// Access-list entries to pre-warm.
    pub access_list: Vec<(Address, Vec<B256>)>,
}

/// How a single frame concluded.
#[derive(Clone, Debug)]
pub(crate) enum FrameResult {
    /// The frame halted successfully.
    Success {
        /// How it halted.
        reason: SuccessReason,
        /// Its return data.
        output: Bytes,
    },
    /// The frame reverted, keeping its remaining gas.
    Revert {
        /// The revert payload.
        output: Bytes,
    },
    /// The frame halted exceptionally with no gas left.
    Fatal {
        /// The halting condition.
        reason: ExceptionalHalt,
    },
}

impl FrameResult {
    pub(crate) fn is_success(&self) -> bool {
        matches!(self, FrameResult::Success { .. })
    }

    pub(crate) fn output(&self) -> Bytes {
        match self {
            FrameResult::Success { output, .. } | FrameResult::Revert { output } => {
                output.clone()
            }
            FrameResult::Fatal { .. } => Bytes::new(),
        }
    }
}

/// The outcome of a nested call frame.
#[derive(Clone, Debug)]
pub(crate) struct CallOutcome {
    pub result: FrameResult,
    pub gas_left: u64,
}

/// The outcome of a nested creation frame.
#[derive(Clone, Debug)]
pub(crate) struct CreateOutcome {
    pub result: FrameResult,
    pub gas_left: u64,
    pub address: Option<Address>,
}

/// Inputs of a nested call frame.
#[derive(Clone, Debug)]
pub(crate) struct CallInputs {
    pub caller: Address,
    /// The account whose code runs.
    pub code_address: Address,
    /// The account whose storage and balance the frame sees.
    pub recipient: Address,
    pub value: U256,
    /// Whether the value actually moves.
    pub transfers_value: bool,
    pub input: Bytes,
    pub gas_limit: u64,
    pub is_static: bool,
    pub depth: usize,
}

/// Inputs of a nested creation frame.
#[derive(Clone, Debug)]
pub(crate) struct CreateInputs {
    pub caller: Address,
    pub value: U256,
    pub init_code: Bytes,
    pub gas_limit: u64,
    pub depth: usize,
    /// `Some` selects the salted address scheme.
    pub salt: Option<B256>,
}

/// The execution context of one transaction: the injected state manager,
/// the journal, environments and the jump table in force.
pub struct Evm<'ctx> {
    /// The injected state manager.
    pub state: &'ctx mut dyn StateManager,
    /// The chain configuration.
    pub chain: &'ctx ChainConfig,
    /// The hardfork in force.
    pub hardfork: Hardfork,
    /// The jump table in force.
    pub table: &'ctx JumpTable,
    /// Dynamic-cost parameters.
    pub schedule: GasSchedule,
    /// Block context.
    pub block: BlockEnv,
    /// Transaction context.
    pub tx: TxEnv,
    /// Environment configuration.
    pub cfg: CfgEnv,
    /// The access witness and side-effect journal.
    pub journal: Journal,
    /// The precompile dispatch table.
    pub precompiles: Precompiles,
    /// Logs emitted so far.
    pub logs: Vec<Log>,
}

impl<'ctx> Evm<'ctx> {
    /// Creates a context for one transaction.
    pub fn new(
        state: &'ctx mut dyn StateManager,
        chain: &'ctx ChainConfig,
        hardfork: Hardfork,
        table: &'ctx JumpTable,
        block: BlockEnv,
        tx: TxEnv,
        cfg: CfgEnv,
    ) -> Self {
        let schedule = GasSchedule::new(chain, hardfork);

        Self {
            state,
            chain,
            hardfork,
            table,
            schedule,
            block,
            tx,
            cfg,
            journal: Journal::new(),
            precompiles: Precompiles::for_hardfork(hardfork),
            logs: Vec::new(),
        }
    }

    /// Whether the provided EIP applies.
    pub fn is_eip_active(&self, eip: u64) -> bool {
        self.chain.is_eip_active_at_hardfork(eip, self.hardfork)
    }

    /// The value of the named protocol parameter.
    pub fn param(&self, name: &str) -> Option<u64> {
        self.chain.param_at_hardfork(name, self.hardfork)
    }

    /// Runs a top-level message and converts the outermost frame's outcome
    /// into an [`ExecutionResult`]. Pre-warms the transaction's access sets
    /// first.
    pub fn execute_message(
        &mut self,
        message: CallMessage,
    ) -> Result<ExecutionResult, StateError> {
        if self.is_eip_active(2929) {
            let coinbase = self.is_eip_active(3651).then_some(self.block.coinbase);
            let precompiles: Vec<Address> = self.precompiles.addresses().to_vec();
            self.journal.prepare_transaction(
                message.caller,
                message.to,
                coinbase,
                precompiles,
                message.access_list.clone(),
            );
        }

        let gas_limit = message.gas_limit;
        let (result, gas_left) = match message.to {
            Some(to) => {
                let outcome = self.call(CallInputs {
                    caller: message.caller,
                    code_address: to,
                    recipient: to,
                    value: message.value,
                    transfers_value: true,
                    input: message.data,
                    gas_limit,
                    is_static: false,
                    depth: 0,
                })?;

                (outcome.result, outcome.gas_left)
            }
            None => {
                let outcome = self.create(CreateInputs {
                    caller: message.caller,
                    value: message.value,
                    init_code: message.data,
                    gas_limit,
                    depth: 0,
                    salt: None,
                })?;

                (outcome.result, outcome.gas_left)
            }
        };

        let gas_used = gas_limit - gas_left;
        let result = match result {
            FrameResult::Success { reason, output } => {
                let max_refund_quotient =
                    self.param("maxRefundQuotient").unwrap_or(2).max(1);
                let gas_refunded = self.journal.refund().min(gas_used / max_refund_quotient);

                ExecutionResult::Success {
                    reason,
                    gas_used,
                    gas_refunded,
                    logs: self.logs.clone(),
                    output,
                }
            }
            FrameResult::Revert { output } => ExecutionResult::Revert { gas_used, output },
            FrameResult::Fatal { reason } => ExecutionResult::Halt { reason, gas_used },
        };

        log::debug!(
            "message used {} gas, success: {}",
            result.gas_used(),
            result.is_success()
        );

        Ok(result)
    }

    fn balance_of(&mut self, address: Address) -> Result<U256, StateError> {
        Ok(self
            .state
            .get_account(address)?
            .map(|account| account.balance)
            .unwrap_or(U256::ZERO))
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), StateError> {
        if value == U256::ZERO || from == to {
            return Ok(());
        }

        let from_balance = self.balance_of(from)?;
        let to_balance = self.balance_of(to)?;
        self.state
            .set_balance(from, from_balance.saturating_sub(value))?;
        self.state.set_balance(to, to_balance + value)?;

        Ok(())
    }

    /// Runs a nested call frame. Depth and balance failures are light: the
    /// full gas budget returns and the result reads as a revert.
    pub(crate) fn call(&mut self, inputs: CallInputs) -> Result<CallOutcome, StateError> {
        if inputs.depth > CALL_DEPTH_LIMIT {
            return Ok(CallOutcome {
                result: FrameResult::Revert {
                    output: Bytes::new(),
                },
                gas_left: inputs.gas_limit,
            });
        }
        if inputs.transfers_value
            && inputs.value > U256::ZERO
            && self.balance_of(inputs.caller)? < inputs.value
        {
            return Ok(CallOutcome {
                result: FrameResult::Revert {
                    output: Bytes::new(),
                },
                gas_left: inputs.gas_limit,
            });
        }

        self.state.checkpoint()?;
        self.journal.checkpoint();
        let logs_mark = self.logs.len();

        if inputs.transfers_value {
            self.transfer(inputs.caller, inputs.recipient, inputs.value)?;
        }

        // Precompiles run instead of code when installed at the target.
        if let Some(outcome) = self.dispatch_precompile(&inputs)? {
            return Ok(outcome);
        }

        let code = self.state.get_code(inputs.code_address)?;
        if code.is_empty() {
            self.state.commit()?;
            self.journal.commit();

            return Ok(CallOutcome {
                result: FrameResult::Success {
                    reason: SuccessReason::Stop,
                    output: Bytes::new(),
                },
                gas_left: inputs.gas_limit,
            });
        }

        let mut frame = RunState::new(
            code.clone(),
            inputs.input,
            inputs.caller,
            inputs.recipient,
            inputs.value,
            inputs.gas_limit,
            inputs.depth,
            inputs.is_static,
        );
        if self.is_eip_active(3540) && eof::is_eof(&code) {
            match EofContainer::decode(&code) {
                Ok(container) => {
                    let eof_state = EofState::new(container);
                    frame.code = eof_state.container.code_sections[0].clone();
                    frame.eof = Some(eof_state);
                }
                Err(_error) => {
                    self.state.revert()?;
                    self.journal.revert();
                    self.logs.truncate(logs_mark);

                    return Ok(CallOutcome {
                        result: FrameResult::Fatal {
                            reason: ExceptionalHalt::InvalidEofContainer,
                        },
                        gas_left: 0,
                    });
                }
            }
        }

        let result = self.interpret(&mut frame)?;
        self.settle(result.is_success(), logs_mark)?;

        Ok(CallOutcome {
            result,
            gas_left: frame.gas_left,
        })
    }

    fn dispatch_precompile(
        &mut self,
        inputs: &CallInputs,
    ) -> Result<Option<CallOutcome>, StateError> {
        let Some(run) = self.precompiles.get(inputs.code_address) else {
            return Ok(None);
        };

        let outcome = match run(&inputs.input, inputs.gas_limit) {
            Ok(output) => {
                self.state.commit()?;
                self.journal.commit();

                CallOutcome {
                    gas_left: inputs.gas_limit - output.gas_used,
                    result: FrameResult::Success {
                        reason: SuccessReason::Return,
                        output: output.output,
                    },
                }
            }
            Err(error) => {
                log::trace!("precompile at {} failed: {error}", inputs.code_address);
                self.state.revert()?;
                self.journal.revert();

                CallOutcome {
                    result: FrameResult::Fatal {
                        reason: ExceptionalHalt::OutOfGas,
                    },
                    gas_left: 0,
                }
            }
        };

        Ok(Some(outcome))
    }

    /// Runs a nested creation frame.
    pub(crate) fn create(&mut self, inputs: CreateInputs) -> Result<CreateOutcome, StateError> {
        if inputs.depth > CALL_DEPTH_LIMIT {
            return Ok(CreateOutcome {
                result: FrameResult::Revert {
                    output: Bytes::new(),
                },
                gas_left: inputs.gas_limit,
                address: None,
            });
        }
        if inputs.value > U256::ZERO && self.balance_of(inputs.caller)? < inputs.value {
            return Ok(CreateOutcome {
                result: FrameResult::Revert {
                    output: Bytes::new(),
                },
                gas_left: inputs.gas_limit,
                address: None,
            });
        }

        let caller_nonce = self
            .state
            .get_account(inputs.caller)?
            .map(|account| account.nonce)
            .unwrap_or(0);
        self.state.increment_nonce(inputs.caller)?;

        let address = match inputs.salt {
            Some(salt) => {
                create2_address(inputs.caller, salt, keccak256(&inputs.init_code))
            }
            None => create_address(inputs.caller, caller_nonce),
        };

        if self.is_eip_active(2929) {
            self.journal.warm_address(address);
        }

        // An account with code or a used nonce blocks the address.
        if let Some(existing) = self.state.get_account(address)? {
            let has_code = !self.state.get_code(address)?.is_empty();
            if existing.nonce > 0 || has_code {
                return Ok(CreateOutcome {
                    result: FrameResult::Fatal {
                        reason: ExceptionalHalt::CreateCollision,
                    },
                    gas_left: 0,
                    address: None,
                });
            }
        }

        self.state.checkpoint()?;
        self.journal.checkpoint();
        let logs_mark = self.logs.len();

        self.journal.mark_created(address);
        if self.is_eip_active(161) {
            self.state.increment_nonce(address)?;
        }
        self.transfer(inputs.caller, address, inputs.value)?;

        let mut frame = RunState::new(
            inputs.init_code.clone(),
            Bytes::new(),
            inputs.caller,
            address,
            inputs.value,
            inputs.gas_limit,
            inputs.depth,
            false,
        );

        let result = self.interpret(&mut frame)?;
        let outcome = match result {
            FrameResult::Success { output, .. } => {
                match self.deposit_code(&mut frame, address, output) {
                    Ok(()) => {
                        self.settle(true, logs_mark)?;

                        CreateOutcome {
                            result: FrameResult::Success {
                                reason: SuccessReason::Return,
                                output: Bytes::new(),
                            },
                            gas_left: frame.gas_left,
                            address: Some(address),
                        }
                    }
                    Err(EvmError::Halt(reason)) => {
                        self.settle(false, logs_mark)?;

                        CreateOutcome {
                            result: FrameResult::Fatal { reason },
                            gas_left: 0,
                            address: None,
                        }
                    }
                    Err(EvmError::State(error)) => return Err(error),
                }
            }
            result => {
                self.settle(false, logs_mark)?;

                CreateOutcome {
                    gas_left: frame.gas_left,
                    result,
                    address: None,
                }
            }
        };

        Ok(outcome)
    }

    /// Runs a nested object-format creation frame: the provided container
    /// executes as init code and deploys what its `RETURNCONTRACT` returns.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn eofcreate(
        &mut self,
        caller: Address,
        value: U256,
        salt: B256,
        container: Bytes,
        input: Bytes,
        gas_limit: u64,
        depth: usize,
    ) -> Result<CreateOutcome, StateError> {
        if depth > CALL_DEPTH_LIMIT {
            return Ok(CreateOutcome {
                result: FrameResult::Revert {
                    output: Bytes::new(),
                },
                gas_left: gas_limit,
                address: None,
            });
        }
        if value > U256::ZERO && self.balance_of(caller)? < value {
            return Ok(CreateOutcome {
                result: FrameResult::Revert {
                    output: Bytes::new(),
                },
                gas_left: gas_limit,
                address: None,
            });
        }

        let decoded = match EofContainer::decode(&container) {
            Ok(decoded) => decoded,
            Err(_error) => {
                return Ok(CreateOutcome {
                    result: FrameResult::Fatal {
                        reason: ExceptionalHalt::InvalidEofContainer,
                    },
                    gas_left: 0,
                    address: None,
                })
            }
        };

        let address = create2_address(caller, salt, keccak256(&container));
        self.state.increment_nonce(caller)?;
        self.journal.warm_address(address);

        if let Some(existing) = self.state.get_account(address)? {
            let has_code = !self.state.get_code(address)?.is_empty();
            if existing.nonce > 0 || has_code {
                return Ok(CreateOutcome {
                    result: FrameResult::Fatal {
                        reason: ExceptionalHalt::CreateCollision,
                    },
                    gas_left: 0,
                    address: None,
                });
            }
        }

        self.state.checkpoint()?;
        self.journal.checkpoint();
        let logs_mark = self.logs.len();

        self.journal.mark_created(address);
        self.state.increment_nonce(address)?;
        self.transfer(caller, address, value)?;

        let eof_state = EofState::new(decoded);
        let mut frame = RunState::new(
            eof_state.container.code_sections[0].clone(),
            input,
            caller,
            address,
            value,
            gas_limit,
            depth,
            false,
        );
        frame.eof = Some(eof_state);

        let result = self.interpret(&mut frame)?;
        let deployed = frame
            .eof
            .as_ref()
            .and_then(|eof| eof.deploy_container.clone());

        let outcome = match (result, deployed) {
            (FrameResult::Success { .. }, Some(deployed)) => {
                match self.deposit_code(&mut frame, address, deployed) {
                    Ok(()) => {
                        self.settle(true, logs_mark)?;

                        CreateOutcome {
                            result: FrameResult::Success {
                                reason: SuccessReason::Return,
                                output: Bytes::new(),
                            },
                            gas_left: frame.gas_left,
                            address: Some(address),
                        }
                    }
                    Err(EvmError::Halt(reason)) => {
                        self.settle(false, logs_mark)?;

                        CreateOutcome {
                            result: FrameResult::Fatal { reason },
                            gas_left: 0,
                            address: None,
                        }
                    }
                    Err(EvmError::State(error)) => return Err(error),
                }
            }
            // Halting an init container without RETURNCONTRACT discards the
            // creation.
            (FrameResult::Success { .. }, None) => {
                self.settle(false, logs_mark)?;

                CreateOutcome {
                    result: FrameResult::Fatal {
                        reason: ExceptionalHalt::InvalidEofContainer,
                    },
                    gas_left: 0,
                    address: None,
                }
            }
            (result, _) => {
                self.settle(false, logs_mark)?;

                CreateOutcome {
                    gas_left: frame.gas_left,
                    result,
                    address: None,
                }
            }
        };

        Ok(outcome)
    }

    /// Charges the deposit gas and installs the returned code, enforcing the
    /// size and leading-byte rules. The caller settles the checkpoint.
    fn deposit_code(
        &mut self,
        frame: &mut RunState,
        address: Address,
        code: Bytes,
    ) -> Result<(), EvmError> {
        if self.is_eip_active(170)
            && !self.cfg.allow_unlimited_contract_size
            && code.len() as u64 > self.schedule.max_code_size
        {
            return Err(ExceptionalHalt::CodeSizeExceeded.into());
        }
        if self.is_eip_active(3541) && code.first() == Some(&0xef) && frame.eof.is_none() {
            return Err(ExceptionalHalt::CreateContractStartsWithEf.into());
        }

        frame.use_gas(self.schedule.code_deposit * code.len() as u64)?;
        self.state.set_code(address, code)?;

        Ok(())
    }

    /// Runs the interpreter loop for a prepared frame, mapping its halt into
    /// a [`FrameResult`] without touching the checkpoints.
    fn interpret(&mut self, frame: &mut RunState) -> Result<FrameResult, StateError> {
        match execute_frame(frame, self) {
            Ok(Control::Stop) | Ok(Control::Continue) => Ok(FrameResult::Success {
                reason: SuccessReason::Stop,
                output: Bytes::new(),
            }),
            Ok(Control::SelfDestruct) => Ok(FrameResult::Success {
                reason: SuccessReason::SelfDestruct,
                output: Bytes::new(),
            }),
            Ok(Control::Return) => Ok(FrameResult::Success {
                reason: SuccessReason::Return,
                output: frame.output.clone(),
            }),
            Ok(Control::Revert) => Ok(FrameResult::Revert {
                output: frame.output.clone(),
            }),
            Err(EvmError::Halt(reason)) => Ok(FrameResult::Fatal { reason }),
            Err(EvmError::State(error)) => Err(error),
        }
    }

    /// Commits or reverts the innermost checkpoint pair opened by a frame.
    /// Reverts truncate the logs emitted since the frame entered; the warm
    /// sets survive either way.
    fn settle(&mut self, success: bool, logs_mark: usize) -> Result<(), StateError> {
        if success {
            self.state.commit()?;
            self.journal.commit();
        } else {
            self.state.revert()?;
            self.journal.revert();
            self.logs.truncate(logs_mark);
        }

        Ok(())
    }
}

/// The address a creation with the caller's current nonce deploys to:
/// `keccak256(rlp([caller, nonce]))[12..]`.
pub fn create_address(caller: Address, nonce: u64) -> Address {
    let mut payload = Vec::new();
    caller.encode(&mut payload);
    nonce.encode(&mut payload);

    let mut encoded = Vec::with_capacity(payload.len() + 2);
    alloy_rlp::Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut encoded);
    encoded.extend_from_slice(&payload);

    Address::from_slice(&keccak256(encoded)[12..])
}

/// The salted creation address:
/// `keccak256(0xff ++ caller ++ salt ++ keccak256(init_code))[12..]`.
pub fn create2_address(caller: Address, salt: B256, init_code_hash: B256) -> Address {
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(caller.as_slice());
    preimage.extend_from_slice(salt.as_slice());
    preimage.extend_from_slice(init_code_hash.as_slice());

    Address::from_slice(&keccak256(preimage)[12..])
}
