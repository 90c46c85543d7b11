//! Jump tables as data: 256 [`Operation`] records per hardfork.
//!
//! A table is built in layers. A fork-specific base constructor copies the
//! previous fork's table and adds the opcodes that fork introduced; the
//! gas-modifying EIP enablers are applied next, in a fixed order; then every
//! defined slot's constant gas is filled from the parameter tables; custom
//! overrides land last.

use ember_forks::{ChainConfig, Hardfork};

use crate::{
    evm::Evm,
    instructions::{self, gas},
    interpreter::{Control, RunState},
    opcode,
    result::{EvmError, ExceptionalHalt},
    stack::STACK_LIMIT,
};

/// An opcode's execute function.
pub type ExecuteFn = fn(&mut RunState, &mut Evm<'_>) -> Result<Control, EvmError>;

/// An opcode's dynamic-gas function: receives the running gas total and
/// returns the new one. May stash a forwarded-gas amount in
/// [`RunState::message_gas_limit`] and may trap.
pub type DynamicGasFn = fn(&mut RunState, &mut Evm<'_>, u64) -> Result<u64, EvmError>;

/// One slot of the jump table.
#[derive(Clone, Copy, Debug)]
pub struct Operation {
    /// The opcode byte.
    pub opcode: u8,
    /// The mnemonic.
    pub name: &'static str,
    /// The execute function.
    pub execute: ExecuteFn,
    /// Gas charged before the dynamic portion.
    pub constant_gas: u64,
    /// The dynamic-gas function, if the opcode has one.
    pub dynamic_gas: Option<DynamicGasFn>,
    /// Minimum stack height before execution.
    pub min_stack: usize,
    /// Maximum stack height before execution.
    pub max_stack: usize,
    /// Whether the handler may suspend into the state manager.
    pub accesses_state: bool,
    /// Whether the opcode writes state and is therefore barred from static
    /// frames.
    pub writes_state: bool,
    /// Whether the slot is undefined and always traps.
    pub undefined: bool,
}

fn undefined_execute(_state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    Err(ExceptionalHalt::InvalidOpcode(0).into())
}

impl Operation {
    /// A defined operation popping `pops` and pushing `pushes` stack items.
    pub fn new(opcode: u8, name: &'static str, execute: ExecuteFn, pops: usize, pushes: usize) -> Self {
        Self {
            opcode,
            name,
            execute,
            constant_gas: 0,
            dynamic_gas: None,
            min_stack: pops,
            max_stack: STACK_LIMIT + pops - pushes,
            accesses_state: false,
            writes_state: false,
            undefined: false,
        }
    }

    /// The slot filler for undefined opcodes.
    pub fn undefined(opcode: u8) -> Self {
        Self {
            opcode,
            name: "INVALID",
            execute: undefined_execute,
            constant_gas: 0,
            dynamic_gas: None,
            min_stack: 0,
            max_stack: STACK_LIMIT,
            accesses_state: false,
            writes_state: false,
            undefined: true,
        }
    }

    fn dynamic(mut self, dynamic_gas: DynamicGasFn) -> Self {
        self.dynamic_gas = Some(dynamic_gas);
        self
    }

    fn state_access(mut self) -> Self {
        self.accesses_state = true;
        self
    }

    fn state_write(mut self) -> Self {
        self.accesses_state = true;
        self.writes_state = true;
        self
    }
}

/// An indexed table of the 256 opcode slots.
#[derive(Clone)]
pub struct JumpTable {
    operations: Box<[Operation; 256]>,
}

impl core::ops::Index<u8> for JumpTable {
    type Output = Operation;

    fn index(&self, opcode: u8) -> &Operation {
        &self.operations[usize::from(opcode)]
    }
}

impl core::fmt::Debug for JumpTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let defined = self
            .operations
            .iter()
            .filter(|operation| !operation.undefined)
            .count();
        f.debug_struct("JumpTable").field("defined", &defined).finish()
    }
}

impl JumpTable {
    fn empty() -> Self {
        let operations: Vec<Operation> = (0..=255u8).map(Operation::undefined).collect();
        let operations: Box<[Operation; 256]> = operations
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| unreachable!("exactly 256 slots"));

        Self { operations }
    }

    fn insert(&mut self, operation: Operation) {
        self.operations[usize::from(operation.opcode)] = operation;
    }

    fn slot_mut(&mut self, opcode: u8) -> &mut Operation {
        &mut self.operations[usize::from(opcode)]
    }

    /// The operation defined for the opcode, if any.
    pub fn get(&self, opcode: u8) -> Option<&Operation> {
        let operation = &self.operations[usize::from(opcode)];
        (!operation.undefined).then_some(operation)
    }
}

fn frontier_table() -> JumpTable {
    use crate::instructions::{arithmetic, bitwise, block, control, environment, logging, message, stack_memory, storage};

    let mut table = JumpTable::empty();

    table.insert(Operation::new(opcode::STOP, "STOP", control::stop, 0, 0));
    table.insert(Operation::new(opcode::ADD, "ADD", arithmetic::add, 2, 1));
    table.insert(Operation::new(opcode::MUL, "MUL", arithmetic::mul, 2, 1));
    table.insert(Operation::new(opcode::SUB, "SUB", arithmetic::sub, 2, 1));
    table.insert(Operation::new(opcode::DIV, "DIV", arithmetic::div, 2, 1));
    table.insert(Operation::new(opcode::SDIV, "SDIV", arithmetic::sdiv, 2, 1));
    table.insert(Operation::new(opcode::MOD, "MOD", arithmetic::rem, 2, 1));
    table.insert(Operation::new(opcode::SMOD, "SMOD", arithmetic::smod, 2, 1));
    table.insert(Operation::new(opcode::ADDMOD, "ADDMOD", arithmetic::addmod, 3, 1));
    table.insert(Operation::new(opcode::MULMOD, "MULMOD", arithmetic::mulmod, 3, 1));
    table.insert(
        Operation::new(opcode::EXP, "EXP", arithmetic::exp, 2, 1).dynamic(gas::exp),
    );
    table.insert(Operation::new(
        opcode::SIGNEXTEND,
        "SIGNEXTEND",
        arithmetic::signextend,
        2,
        1,
    ));

    table.insert(Operation::new(opcode::LT, "LT", bitwise::lt, 2, 1));
    table.insert(Operation::new(opcode::GT, "GT", bitwise::gt, 2, 1));
    table.insert(Operation::new(opcode::SLT, "SLT", bitwise::slt, 2, 1));
    table.insert(Operation::new(opcode::SGT, "SGT", bitwise::sgt, 2, 1));
    table.insert(Operation::new(opcode::EQ, "EQ", bitwise::eq, 2, 1));
    table.insert(Operation::new(opcode::ISZERO, "ISZERO", bitwise::iszero, 1, 1));
    table.insert(Operation::new(opcode::AND, "AND", bitwise::and, 2, 1));
    table.insert(Operation::new(opcode::OR, "OR", bitwise::or, 2, 1));
    table.insert(Operation::new(opcode::XOR, "XOR", bitwise::xor, 2, 1));
    table.insert(Operation::new(opcode::NOT, "NOT", bitwise::not, 1, 1));
    table.insert(Operation::new(opcode::BYTE, "BYTE", bitwise::byte, 2, 1));

    table.insert(
        Operation::new(opcode::KECCAK256, "KECCAK256", environment::keccak256, 2, 1)
            .dynamic(gas::keccak256),
    );

    table.insert(Operation::new(opcode::ADDRESS, "ADDRESS", environment::address, 0, 1));
    table.insert(
        Operation::new(opcode::BALANCE, "BALANCE", environment::balance, 1, 1).state_access(),
    );
    table.insert(Operation::new(opcode::ORIGIN, "ORIGIN", environment::origin, 0, 1));
    table.insert(Operation::new(opcode::CALLER, "CALLER", environment::caller, 0, 1));
    table.insert(Operation::new(
        opcode::CALLVALUE,
        "CALLVALUE",
        environment::callvalue,
        0,
        1,
    ));
    table.insert(Operation::new(
        opcode::CALLDATALOAD,
        "CALLDATALOAD",
        environment::calldataload,
        1,
        1,
    ));
    table.insert(Operation::new(
        opcode::CALLDATASIZE,
        "CALLDATASIZE",
        environment::calldatasize,
        0,
        1,
    ));
    table.insert(
        Operation::new(
            opcode::CALLDATACOPY,
            "CALLDATACOPY",
            environment::calldatacopy,
            3,
            0,
        )
        .dynamic(gas::copy_to_memory),
    );
    table.insert(Operation::new(
        opcode::CODESIZE,
        "CODESIZE",
        environment::codesize,
        0,
        1,
    ));
    table.insert(
        Operation::new(opcode::CODECOPY, "CODECOPY", environment::codecopy, 3, 0)
            .dynamic(gas::copy_to_memory),
    );
    table.insert(Operation::new(
        opcode::GASPRICE,
        "GASPRICE",
        environment::gasprice,
        0,
        1,
    ));
    table.insert(
        Operation::new(
            opcode::EXTCODESIZE,
            "EXTCODESIZE",
            environment::extcodesize,
            1,
            1,
        )
        .state_access(),
    );
    table.insert(
        Operation::new(
            opcode::EXTCODECOPY,
            "EXTCODECOPY",
            environment::extcodecopy,
            4,
            0,
        )
        .state_access()
        .dynamic(gas::extcodecopy),
    );

    table.insert(
        Operation::new(opcode::BLOCKHASH, "BLOCKHASH", block::blockhash, 1, 1).state_access(),
    );
    table.insert(Operation::new(opcode::COINBASE, "COINBASE", block::coinbase, 0, 1));
    table.insert(Operation::new(opcode::TIMESTAMP, "TIMESTAMP", block::timestamp, 0, 1));
    table.insert(Operation::new(opcode::NUMBER, "NUMBER", block::number, 0, 1));
    table.insert(Operation::new(
        opcode::DIFFICULTY,
        "DIFFICULTY",
        block::difficulty,
        0,
        1,
    ));
    table.insert(Operation::new(opcode::GASLIMIT, "GASLIMIT", block::gaslimit, 0, 1));

    table.insert(Operation::new(opcode::POP, "POP", stack_memory::pop, 1, 0));
    table.insert(
        Operation::new(opcode::MLOAD, "MLOAD", stack_memory::mload, 1, 1)
            .dynamic(gas::mload),
    );
    table.insert(
        Operation::new(opcode::MSTORE, "MSTORE", stack_memory::mstore, 2, 0)
            .dynamic(gas::mstore),
    );
    table.insert(
        Operation::new(opcode::MSTORE8, "MSTORE8", stack_memory::mstore8, 2, 0)
            .dynamic(gas::mstore8),
    );
    table.insert(
        Operation::new(opcode::SLOAD, "SLOAD", storage::sload, 1, 1).state_access(),
    );
    table.insert(
        Operation::new(opcode::SSTORE, "SSTORE", storage::sstore, 2, 0)
            .state_write()
            .dynamic(gas::sstore_frontier),
    );
    table.insert(Operation::new(opcode::JUMP, "JUMP", control::jump, 1, 0));
    table.insert(Operation::new(opcode::JUMPI, "JUMPI", control::jumpi, 2, 0));
    table.insert(Operation::new(opcode::PC, "PC", stack_memory::pc, 0, 1));
    table.insert(Operation::new(opcode::MSIZE, "MSIZE", stack_memory::msize, 0, 1));
    table.insert(Operation::new(opcode::GAS, "GAS", stack_memory::gas, 0, 1));
    table.insert(Operation::new(
        opcode::JUMPDEST,
        "JUMPDEST",
        control::jumpdest,
        0,
        0,
    ));

    for push in opcode::PUSH1..=opcode::PUSH32 {
        table.insert(Operation::new(push, "PUSH", stack_memory::push, 0, 1));
    }
    for dup in opcode::DUP1..=opcode::DUP16 {
        let n = usize::from(dup - opcode::DUP1) + 1;
        table.insert(Operation::new(dup, "DUP", stack_memory::dup, n, n + 1));
    }
    for swap in opcode::SWAP1..=opcode::SWAP16 {
        let n = usize::from(swap - opcode::SWAP1) + 1;
        table.insert(Operation::new(swap, "SWAP", stack_memory::swap, n + 1, n + 1));
    }
    for log in opcode::LOG0..=opcode::LOG4 {
        let topics = usize::from(log - opcode::LOG0);
        table.insert(
            Operation::new(log, "LOG", logging::log, topics + 2, 0)
                .state_write()
                .dynamic(gas::log),
        );
    }

    table.insert(
        Operation::new(opcode::CREATE, "CREATE", message::create, 3, 1)
            .state_write()
            .dynamic(gas::create),
    );
    table.insert(
        Operation::new(opcode::CALL, "CALL", message::call, 7, 1)
            .state_access()
            .dynamic(gas::call),
    );
    table.insert(
        Operation::new(opcode::CALLCODE, "CALLCODE", message::callcode, 7, 1)
            .state_access()
            .dynamic(gas::callcode),
    );
    table.insert(
        Operation::new(opcode::RETURN, "RETURN", control::ret, 2, 0)
            .dynamic(gas::memory_return),
    );
    table.insert(Operation::new(opcode::INVALID, "INVALID", control::invalid, 0, 0));
    table.insert(
        Operation::new(
            opcode::SELFDESTRUCT,
            "SELFDESTRUCT",
            control::selfdestruct,
            1,
            0,
        )
        .state_write()
        .dynamic(gas::selfdestruct),
    );

    table
}

fn homestead_table() -> JumpTable {
    use crate::instructions::message;

    let mut table = frontier_table();
    table.insert(
        Operation::new(
            opcode::DELEGATECALL,
            "DELEGATECALL",
            message::delegatecall,
            6,
            1,
        )
        .state_access()
        .dynamic(gas::delegatecall),
    );

    table
}

fn byzantium_table() -> JumpTable {
    use crate::instructions::{control, environment, message};

    let mut table = homestead_table();
    table.insert(Operation::new(
        opcode::RETURNDATASIZE,
        "RETURNDATASIZE",
        environment::returndatasize,
        0,
        1,
    ));
    table.insert(
        Operation::new(
            opcode::RETURNDATACOPY,
            "RETURNDATACOPY",
            environment::returndatacopy,
            3,
            0,
        )
        .dynamic(gas::returndatacopy),
    );
    table.insert(
        Operation::new(opcode::STATICCALL, "STATICCALL", message::staticcall, 6, 1)
            .state_access()
            .dynamic(gas::staticcall),
    );
    table.insert(
        Operation::new(opcode::REVERT, "REVERT", control::revert, 2, 0)
            .dynamic(gas::memory_return),
    );

    table
}

fn constantinople_table() -> JumpTable {
    use crate::instructions::{bitwise, environment, message};

    let mut table = byzantium_table();
    table.insert(Operation::new(opcode::SHL, "SHL", bitwise::shl, 2, 1));
    table.insert(Operation::new(opcode::SHR, "SHR", bitwise::shr, 2, 1));
    table.insert(Operation::new(opcode::SAR, "SAR", bitwise::sar, 2, 1));
    table.insert(
        Operation::new(
            opcode::EXTCODEHASH,
            "EXTCODEHASH",
            environment::extcodehash,
            1,
            1,
        )
        .state_access(),
    );
    table.insert(
        Operation::new(opcode::CREATE2, "CREATE2", message::create2, 4, 1)
            .state_write()
            .dynamic(gas::create2),
    );

    table
}

fn istanbul_table() -> JumpTable {
    use crate::instructions::{block, environment};

    let mut table = constantinople_table();
    table.insert(Operation::new(opcode::CHAINID, "CHAINID", block::chainid, 0, 1));
    table.insert(
        Operation::new(
            opcode::SELFBALANCE,
            "SELFBALANCE",
            environment::selfbalance,
            0,
            1,
        )
        .state_access(),
    );

    table
}

fn london_table() -> JumpTable {
    use crate::instructions::block;

    let mut table = istanbul_table();
    table.insert(Operation::new(opcode::BASEFEE, "BASEFEE", block::basefee, 0, 1));

    table
}

fn shanghai_table() -> JumpTable {
    use crate::instructions::stack_memory;

    let mut table = london_table();
    table.insert(Operation::new(opcode::PUSH0, "PUSH0", stack_memory::push0, 0, 1));

    table
}

fn cancun_table() -> JumpTable {
    use crate::instructions::{block, stack_memory, storage};

    let mut table = shanghai_table();
    table.insert(
        Operation::new(opcode::TLOAD, "TLOAD", storage::tload, 1, 1),
    );
    table.insert(
        Operation::new(opcode::TSTORE, "TSTORE", storage::tstore, 2, 0).state_write(),
    );
    table.insert(
        Operation::new(opcode::MCOPY, "MCOPY", stack_memory::mcopy, 3, 0)
            .dynamic(gas::mcopy),
    );
    table.insert(Operation::new(opcode::BLOBHASH, "BLOBHASH", block::blobhash, 1, 1));
    table.insert(Operation::new(
        opcode::BLOBBASEFEE,
        "BLOBBASEFEE",
        block::blobbasefee,
        0,
        1,
    ));

    table
}

fn osaka_table() -> JumpTable {
    use crate::instructions::{bitwise, eof};

    let mut table = cancun_table();
    table.insert(Operation::new(opcode::CLZ, "CLZ", bitwise::clz, 1, 1));

    table.insert(Operation::new(opcode::DATALOAD, "DATALOAD", eof::dataload, 1, 1));
    table.insert(Operation::new(
        opcode::DATALOADN,
        "DATALOADN",
        eof::dataloadn,
        0,
        1,
    ));
    table.insert(Operation::new(opcode::DATASIZE, "DATASIZE", eof::datasize, 0, 1));
    table.insert(
        Operation::new(opcode::DATACOPY, "DATACOPY", eof::datacopy, 3, 0)
            .dynamic(gas::copy_to_memory),
    );

    table.insert(Operation::new(opcode::RJUMP, "RJUMP", eof::rjump, 0, 0));
    table.insert(Operation::new(opcode::RJUMPI, "RJUMPI", eof::rjumpi, 1, 0));
    table.insert(Operation::new(opcode::RJUMPV, "RJUMPV", eof::rjumpv, 1, 0));
    table.insert(Operation::new(opcode::CALLF, "CALLF", eof::callf, 0, 0));
    table.insert(Operation::new(opcode::RETF, "RETF", eof::retf, 0, 0));
    table.insert(Operation::new(opcode::JUMPF, "JUMPF", eof::jumpf, 0, 0));
    table.insert(Operation::new(opcode::DUPN, "DUPN", eof::dupn, 0, 1));
    table.insert(Operation::new(opcode::SWAPN, "SWAPN", eof::swapn, 0, 0));
    table.insert(Operation::new(opcode::EXCHANGE, "EXCHANGE", eof::exchange, 0, 0));
    table.insert(Operation::new(
        opcode::RETURNDATALOAD,
        "RETURNDATALOAD",
        eof::returndataload,
        1,
        1,
    ));
    table.insert(
        Operation::new(opcode::EXTCALL, "EXTCALL", eof::extcall, 4, 1)
            .state_access()
            .dynamic(gas::extcall),
    );
    table.insert(
        Operation::new(
            opcode::EXTDELEGATECALL,
            "EXTDELEGATECALL",
            eof::extdelegatecall,
            3,
            1,
        )
        .state_access()
        .dynamic(gas::extdelegatecall),
    );
    table.insert(
        Operation::new(
            opcode::EXTSTATICCALL,
            "EXTSTATICCALL",
            eof::extstaticcall,
            3,
            1,
        )
        .state_access()
        .dynamic(gas::extstaticcall),
    );
    table.insert(
        Operation::new(opcode::EOFCREATE, "EOFCREATE", eof::eofcreate, 4, 1)
            .state_write()
            .dynamic(gas::eofcreate),
    );
    table.insert(Operation::new(
        opcode::RETURNCONTRACT,
        "RETURNCONTRACT",
        eof::returncontract,
        2,
        0,
    ));

    table
}

fn base_table(hardfork: Hardfork) -> JumpTable {
    match hardfork {
        Hardfork::Frontier | Hardfork::FrontierThawing => frontier_table(),
        Hardfork::Homestead
        | Hardfork::DaoFork
        | Hardfork::TangerineWhistle
        | Hardfork::SpuriousDragon => homestead_table(),
        Hardfork::Byzantium => byzantium_table(),
        Hardfork::Constantinople | Hardfork::Petersburg => constantinople_table(),
        Hardfork::Istanbul | Hardfork::MuirGlacier | Hardfork::Berlin => istanbul_table(),
        Hardfork::London | Hardfork::ArrowGlacier | Hardfork::GrayGlacier | Hardfork::Merge => {
            london_table()
        }
        Hardfork::Shanghai => shanghai_table(),
        Hardfork::Cancun | Hardfork::Prague => cancun_table(),
        Hardfork::Osaka => osaka_table(),
    }
}

/// EIP-1283 net gas metering, Constantinople only.
fn enable_eip1283(table: &mut JumpTable) {
    table.slot_mut(opcode::SSTORE).dynamic_gas = Some(gas::sstore_eip1283);
}

/// EIP-2200 net gas metering with the low-gas sentry. Supersedes EIP-1283.
fn enable_eip2200(table: &mut JumpTable) {
    table.slot_mut(opcode::SSTORE).dynamic_gas = Some(gas::sstore_eip2200);
}

/// EIP-2929 warm/cold access accounting.
fn enable_eip2929(table: &mut JumpTable) {
    table.slot_mut(opcode::BALANCE).dynamic_gas = Some(gas::account_access);
    table.slot_mut(opcode::EXTCODESIZE).dynamic_gas = Some(gas::account_access);
    table.slot_mut(opcode::EXTCODEHASH).dynamic_gas = Some(gas::account_access);
    table.slot_mut(opcode::EXTCODECOPY).dynamic_gas = Some(gas::extcodecopy_eip2929);
    table.slot_mut(opcode::SLOAD).dynamic_gas = Some(gas::sload_eip2929);
    table.slot_mut(opcode::SSTORE).dynamic_gas = Some(gas::sstore_eip2929);
    table.slot_mut(opcode::CALL).dynamic_gas = Some(gas::call_eip2929);
    table.slot_mut(opcode::CALLCODE).dynamic_gas = Some(gas::callcode_eip2929);
    table.slot_mut(opcode::DELEGATECALL).dynamic_gas = Some(gas::delegatecall_eip2929);
    table.slot_mut(opcode::STATICCALL).dynamic_gas = Some(gas::staticcall_eip2929);
    table.slot_mut(opcode::SELFDESTRUCT).dynamic_gas = Some(gas::selfdestruct_eip2929);
}

/// EIP-3860 init-code metering for the create family.
fn enable_eip3860(table: &mut JumpTable) {
    table.slot_mut(opcode::CREATE).dynamic_gas = Some(gas::create_eip3860);
    table.slot_mut(opcode::CREATE2).dynamic_gas = Some(gas::create2_eip3860);
}

/// The constant-gas parameter key for a slot. `PUSH*`, `DUP*`, `SWAP*` and
/// `LOG*` share their suffix-stripped base name; the `0x44` slot keeps its
/// original key through the post-merge rename.
fn gas_param_key(operation: &Operation) -> String {
    if operation.opcode == opcode::DIFFICULTY {
        return "difficultyGas".to_owned();
    }

    format!("{}Gas", operation.name.to_lowercase())
}

/// Builds the jump table for the provided hardfork, applying custom
/// overrides last.
pub fn make_jump_table(
    chain: &ChainConfig,
    hardfork: Hardfork,
    custom: &[Operation],
) -> JumpTable {
    let mut table = base_table(hardfork);

    // Gas-modifying EIPs first, in supersession order.
    if chain.is_eip_active_at_hardfork(1283, hardfork) {
        enable_eip1283(&mut table);
    }
    if chain.is_eip_active_at_hardfork(2200, hardfork) {
        enable_eip2200(&mut table);
    }
    if chain.is_eip_active_at_hardfork(2929, hardfork) {
        enable_eip2929(&mut table);
    }
    if chain.is_eip_active_at_hardfork(3860, hardfork) {
        enable_eip3860(&mut table);
    }

    for index in 0..=255u8 {
        let slot = table.slot_mut(index);
        if slot.undefined {
            continue;
        }
        let key = gas_param_key(slot);
        slot.constant_gas = chain.param_at_hardfork(&key, hardfork).unwrap_or(0);
    }

    // EIP-4399: the slot is renamed, the parameter key and gas are not.
    if hardfork >= Hardfork::Merge {
        table.slot_mut(opcode::DIFFICULTY).name = "PREVRANDAO";
    }

    for operation in custom {
        table.insert(*operation);
    }

    log::trace!("built jump table for {hardfork}");

    table
}

#[cfg(test)]
mod tests {
    use ember_forks::chains::mainnet_config;

    use super::*;

    #[test]
    fn stack_bounds_follow_the_formula() {
        let table = make_jump_table(mainnet_config(), Hardfork::Berlin, &[]);

        let add = table.get(opcode::ADD).unwrap();
        assert_eq!(add.min_stack, 2);
        assert_eq!(add.max_stack, STACK_LIMIT + 1);

        let push = table.get(opcode::PUSH1).unwrap();
        assert_eq!(push.min_stack, 0);
        assert_eq!(push.max_stack, STACK_LIMIT - 1);

        let dup16 = table.get(opcode::DUP16).unwrap();
        assert_eq!(dup16.min_stack, 16);
        assert_eq!(dup16.max_stack, STACK_LIMIT - 1);
    }

    #[test]
    fn constant_gas_tracks_repricings() {
        let frontier = make_jump_table(mainnet_config(), Hardfork::Frontier, &[]);
        assert_eq!(frontier.get(opcode::SLOAD).unwrap().constant_gas, 50);
        assert_eq!(frontier.get(opcode::BALANCE).unwrap().constant_gas, 20);

        let istanbul = make_jump_table(mainnet_config(), Hardfork::Istanbul, &[]);
        assert_eq!(istanbul.get(opcode::SLOAD).unwrap().constant_gas, 800);
        assert_eq!(istanbul.get(opcode::BALANCE).unwrap().constant_gas, 700);

        let berlin = make_jump_table(mainnet_config(), Hardfork::Berlin, &[]);
        assert_eq!(berlin.get(opcode::SLOAD).unwrap().constant_gas, 0);
        assert!(berlin.get(opcode::SLOAD).unwrap().dynamic_gas.is_some());
    }

    #[test]
    fn opcode_availability_follows_forks() {
        let frontier = make_jump_table(mainnet_config(), Hardfork::Frontier, &[]);
        assert!(frontier.get(opcode::DELEGATECALL).is_none());
        assert!(frontier.get(opcode::REVERT).is_none());

        let byzantium = make_jump_table(mainnet_config(), Hardfork::Byzantium, &[]);
        assert!(byzantium.get(opcode::REVERT).is_some());
        assert!(byzantium.get(opcode::SHL).is_none());

        let shanghai = make_jump_table(mainnet_config(), Hardfork::Shanghai, &[]);
        assert_eq!(shanghai.get(opcode::PUSH0).unwrap().constant_gas, 2);

        let osaka = make_jump_table(mainnet_config(), Hardfork::Osaka, &[]);
        assert_eq!(osaka.get(opcode::CLZ).unwrap().constant_gas, 5);
        assert!(osaka.get(opcode::EXTCALL).is_some());
    }

    #[test]
    fn prevrandao_rename_keeps_gas() {
        let gray_glacier = make_jump_table(mainnet_config(), Hardfork::GrayGlacier, &[]);
        let merge = make_jump_table(mainnet_config(), Hardfork::Merge, &[]);

        assert_eq!(gray_glacier.get(opcode::DIFFICULTY).unwrap().name, "DIFFICULTY");
        assert_eq!(merge.get(opcode::DIFFICULTY).unwrap().name, "PREVRANDAO");
        assert_eq!(
            gray_glacier.get(opcode::DIFFICULTY).unwrap().constant_gas,
            merge.get(opcode::DIFFICULTY).unwrap().constant_gas,
        );
    }

    #[test]
    fn custom_overrides_win() {
        fn nop(_state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
            Ok(Control::Continue)
        }

        let custom = [Operation::new(0x0c, "CUSTOM", nop, 0, 0)];
        let table = make_jump_table(mainnet_config(), Hardfork::Berlin, &custom);

        assert_eq!(table.get(0x0c).unwrap().name, "CUSTOM");
    }

    #[test]
    fn undefined_slots_trap(){
        let table = make_jump_table(mainnet_config(), Hardfork::Frontier, &[]);
        assert!(table.get(0x0c).is_none());
        assert!(table[0x0c].undefined);
    }
}
