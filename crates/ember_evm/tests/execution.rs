//! End-to-end message execution against an in-memory state.

use ember_evm::{
    eof::{EofContainer, EofState, SectionType},
    evm::create_address,
    interpreter::{execute_frame, Control, RunState},
    make_jump_table, BlockEnv, CallMessage, CfgEnv, Evm, ExceptionalHalt, ExecutionResult,
    InMemoryState, StateManager as _, TxEnv,
};
use ember_forks::{chains::mainnet_config, Hardfork};
use ember_primitives::{Address, Bytes, U256};

const CALLER: Address = Address::repeat_byte(0xca);
const CONTRACT: Address = Address::repeat_byte(0xc0);

fn run_message(
    state: &mut InMemoryState,
    hardfork: Hardfork,
    message: CallMessage,
) -> ExecutionResult {
    let chain = mainnet_config();
    let table = make_jump_table(chain, hardfork, &[]);
    let mut evm = Evm::new(
        state,
        chain,
        hardfork,
        &table,
        BlockEnv::default(),
        TxEnv {
            origin: CALLER,
            ..TxEnv::default()
        },
        CfgEnv::default(),
    );

    evm.execute_message(message).expect("in-memory state never fails")
}

fn call_message(to: Address, gas_limit: u64) -> CallMessage {
    CallMessage {
        caller: CALLER,
        to: Some(to),
        value: U256::ZERO,
        data: Bytes::new(),
        gas_limit,
        access_list: Vec::new(),
    }
}

#[test]
fn message_to_empty_account_succeeds() {
    let mut state = InMemoryState::new();

    let result = run_message(&mut state, Hardfork::Berlin, call_message(CONTRACT, 50_000));

    assert!(result.is_success());
    assert_eq!(result.gas_used(), 0);
}

#[test]
fn revert_preserves_remaining_gas() {
    // PUSH1 0, PUSH1 0, REVERT
    let code = Bytes::copy_from_slice(&[0x60, 0x00, 0x60, 0x00, 0xfd]);
    let mut state = InMemoryState::new().with_code(CONTRACT, code);

    let result = run_message(&mut state, Hardfork::Berlin, call_message(CONTRACT, 50_000));

    assert_eq!(
        result,
        ExecutionResult::Revert {
            gas_used: 6,
            output: Bytes::new(),
        }
    );
}

#[test]
fn exceptional_halt_consumes_all_gas() {
    let code = Bytes::copy_from_slice(&[0xfe]);
    let mut state = InMemoryState::new().with_code(CONTRACT, code);

    let result = run_message(&mut state, Hardfork::Berlin, call_message(CONTRACT, 50_000));

    assert_eq!(
        result,
        ExecutionResult::Halt {
            reason: ExceptionalHalt::InvalidOpcode(0xfe),
            gas_used: 50_000,
        }
    );
}

#[test]
fn create_message_deploys_code() {
    // Init code: MSTORE8(0, 0xfe), RETURN(0, 1) deploys the single byte
    // 0xfe.
    let init_code = Bytes::copy_from_slice(&[
        0x60, 0xfe, 0x60, 0x00, 0x53, // MSTORE8
        0x60, 0x01, 0x60, 0x00, 0xf3, // RETURN
    ]);
    let mut state = InMemoryState::new();

    let result = run_message(
        &mut state,
        Hardfork::Berlin,
        CallMessage {
            caller: CALLER,
            to: None,
            value: U256::ZERO,
            data: init_code,
            gas_limit: 100_000,
            access_list: Vec::new(),
        },
    );

    assert!(result.is_success());

    let deployed = create_address(CALLER, 0);
    assert_eq!(state.get_code(deployed).unwrap().as_ref(), &[0xfe]);
    assert_eq!(state.get_account(deployed).unwrap().unwrap().nonce, 1);
}

#[test]
fn deployed_code_may_not_start_with_ef() {
    // Init code returning a single 0xef byte.
    let init_code = Bytes::copy_from_slice(&[
        0x60, 0xef, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3,
    ]);
    let mut state = InMemoryState::new();

    let result = run_message(
        &mut state,
        Hardfork::London,
        CallMessage {
            caller: CALLER,
            to: None,
            value: U256::ZERO,
            data: init_code,
            gas_limit: 100_000,
            access_list: Vec::new(),
        },
    );

    assert_eq!(
        result,
        ExecutionResult::Halt {
            reason: ExceptionalHalt::CreateContractStartsWithEf,
            gas_used: 100_000,
        }
    );
}

#[test]
fn reverted_storage_rolls_back_but_warm_set_persists() {
    let inner = Address::repeat_byte(0xbb);
    // Inner contract: SSTORE(0, 7) then REVERT(0, 0).
    let inner_code = Bytes::copy_from_slice(&[
        0x60, 0x07, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0xfd,
    ]);
    // Outer contract calls the inner one and stops.
    let outer_code = Bytes::copy_from_slice(&[
        0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out/in/value
        0x73, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb,
        0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, // PUSH20 inner
        0x61, 0xff, 0xff, // PUSH2 gas
        0xf1, // CALL
        0x00,
    ]);
    let mut state = InMemoryState::new()
        .with_code(inner, inner_code)
        .with_code(CONTRACT, outer_code);

    let chain = mainnet_config();
    let table = make_jump_table(chain, Hardfork::Berlin, &[]);
    let mut evm = Evm::new(
        &mut state,
        chain,
        Hardfork::Berlin,
        &table,
        BlockEnv::default(),
        TxEnv::default(),
        CfgEnv::default(),
    );
    let result = evm
        .execute_message(call_message(CONTRACT, 200_000))
        .unwrap();
    assert!(result.is_success());

    // The inner frame reverted: its write is gone, its warming is not.
    assert!(evm.journal.is_warm_address(inner));
    assert!(evm.journal.is_warm_storage(inner, U256::ZERO));
    assert_eq!(evm.journal.refund(), 0);
    assert_eq!(state.get_storage(inner, U256::ZERO).unwrap(), U256::ZERO);
}

#[test]
fn call_depth_is_capped() {
    // The contract calls itself with all its gas, recursing until the depth
    // cap trips and the innermost call fails lightly.
    let code = Bytes::copy_from_slice(&[
        0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out/in/value
        0x30, // ADDRESS
        0x5a, // GAS
        0xf1, // CALL
        0x00,
    ]);
    let mut state = InMemoryState::new().with_code(CONTRACT, code);

    let result = run_message(
        &mut state,
        Hardfork::Berlin,
        call_message(CONTRACT, 10_000_000),
    );

    // Recursion bottoms out without an exceptional halt.
    assert!(result.is_success());
}

#[test]
fn precompiles_dispatch_and_warm() {
    let sha256_address = Address::with_last_byte(0x02);
    // Call SHA-256 over one zero byte and return nothing.
    let code = Bytes::copy_from_slice(&[
        0x60, 0x20, // out size
        0x60, 0x00, // out offset
        0x60, 0x01, // in size
        0x60, 0x00, // in offset
        0x60, 0x00, // value
        0x60, 0x02, // precompile address
        0x61, 0xff, 0xff, // gas
        0xf1, // CALL
        0x00,
    ]);
    let mut state = InMemoryState::new().with_code(CONTRACT, code);

    let chain = mainnet_config();
    let table = make_jump_table(chain, Hardfork::Berlin, &[]);
    let mut evm = Evm::new(
        &mut state,
        chain,
        Hardfork::Berlin,
        &table,
        BlockEnv::default(),
        TxEnv::default(),
        CfgEnv::default(),
    );
    let result = evm
        .execute_message(call_message(CONTRACT, 200_000))
        .unwrap();

    assert!(result.is_success());
    // Precompiles are pre-warmed at transaction start.
    assert!(evm.journal.is_warm_address(sha256_address));
}

fn eof_frame(container: EofContainer, gas_limit: u64) -> RunState {
    let eof = EofState::new(container);
    let mut frame = RunState::new(
        eof.container.code_sections[0].clone(),
        Bytes::new(),
        CALLER,
        CONTRACT,
        U256::ZERO,
        gas_limit,
        0,
        false,
    );
    frame.eof = Some(eof);

    frame
}

fn two_section_container() -> EofContainer {
    EofContainer {
        types: vec![
            SectionType {
                inputs: 0,
                outputs: SectionType::NON_RETURNING,
                max_stack_height: 1,
            },
            SectionType {
                inputs: 0,
                outputs: 1,
                max_stack_height: 1,
            },
        ],
        // Section 0: CALLF 1, STOP. Section 1: PUSH1 7, RETF.
        code_sections: vec![
            Bytes::copy_from_slice(&[0xe3, 0x00, 0x01, 0x00]),
            Bytes::copy_from_slice(&[0x60, 0x07, 0xe4]),
        ],
        container_sections: Vec::new(),
        data: Bytes::copy_from_slice(&[0xaa, 0xbb]),
    }
}

#[test]
fn callf_and_retf_round_trip() {
    let chain = mainnet_config();
    let table = make_jump_table(chain, Hardfork::Osaka, &[]);
    let mut state = InMemoryState::new();
    let mut evm = Evm::new(
        &mut state,
        chain,
        Hardfork::Osaka,
        &table,
        BlockEnv::default(),
        TxEnv::default(),
        CfgEnv::default(),
    );

    let mut frame = eof_frame(two_section_container(), 100_000);
    let control = execute_frame(&mut frame, &mut evm).unwrap();

    assert_eq!(control, Control::Stop);
    assert_eq!(frame.stack.data(), &[U256::from(7u64)]);
    // CALLF 5, PUSH 3, RETF 3, STOP 0.
    assert_eq!(frame.gas_left, 100_000 - 11);
}

#[test]
fn retf_with_empty_return_stack_halts() {
    let mut container = two_section_container();
    // Section 0 opens with a bare RETF.
    container.code_sections[0] = Bytes::copy_from_slice(&[0xe4]);

    let chain = mainnet_config();
    let table = make_jump_table(chain, Hardfork::Osaka, &[]);
    let mut state = InMemoryState::new();
    let mut evm = Evm::new(
        &mut state,
        chain,
        Hardfork::Osaka,
        &table,
        BlockEnv::default(),
        TxEnv::default(),
        CfgEnv::default(),
    );

    let mut frame = eof_frame(container, 100_000);
    let error = execute_frame(&mut frame, &mut evm).unwrap_err();

    assert!(matches!(
        error,
        ember_evm::EvmError::Halt(ExceptionalHalt::RetfNoReturn)
    ));
}

#[test]
fn eof_opcodes_trap_in_legacy_code() {
    let chain = mainnet_config();
    let table = make_jump_table(chain, Hardfork::Osaka, &[]);
    let mut state = InMemoryState::new();
    let mut evm = Evm::new(
        &mut state,
        chain,
        Hardfork::Osaka,
        &table,
        BlockEnv::default(),
        TxEnv::default(),
        CfgEnv::default(),
    );

    // RJUMP from a legacy (non-container) frame.
    let mut frame = RunState::new(
        Bytes::copy_from_slice(&[0xe0, 0x00, 0x00]),
        Bytes::new(),
        CALLER,
        CONTRACT,
        U256::ZERO,
        100_000,
        0,
        false,
    );
    let error = execute_frame(&mut frame, &mut evm).unwrap_err();

    assert!(matches!(
        error,
        ember_evm::EvmError::Halt(ExceptionalHalt::InvalidOpcode(0xe0))
    ));
}

#[test]
fn rjump_moves_relative_to_the_immediate() {
    let container = EofContainer {
        types: vec![SectionType {
            inputs: 0,
            outputs: SectionType::NON_RETURNING,
            max_stack_height: 1,
        }],
        // RJUMP +3 over PUSH1 1 STOP, then PUSH1 2 STOP.
        code_sections: vec![Bytes::copy_from_slice(&[
            0xe0, 0x00, 0x03, // RJUMP +3
            0x60, 0x01, 0x00, // skipped
            0x60, 0x02, 0x00,
        ])],
        container_sections: Vec::new(),
        data: Bytes::new(),
    };

    let chain = mainnet_config();
    let table = make_jump_table(chain, Hardfork::Osaka, &[]);
    let mut state = InMemoryState::new();
    let mut evm = Evm::new(
        &mut state,
        chain,
        Hardfork::Osaka,
        &table,
        BlockEnv::default(),
        TxEnv::default(),
        CfgEnv::default(),
    );

    let mut frame = eof_frame(container, 100_000);
    execute_frame(&mut frame, &mut evm).unwrap();

    assert_eq!(frame.stack.data(), &[U256::from(2u64)]);
}

#[test]
fn dataload_reads_the_data_section() {
    let container = EofContainer {
        types: vec![SectionType {
            inputs: 0,
            outputs: SectionType::NON_RETURNING,
            max_stack_height: 2,
        }],
        // PUSH1 0, DATALOAD, DATASIZE, STOP
        code_sections: vec![Bytes::copy_from_slice(&[0x60, 0x00, 0xd0, 0xd2, 0x00])],
        container_sections: Vec::new(),
        data: Bytes::copy_from_slice(&[0xaa, 0xbb]),
    };

    let chain = mainnet_config();
    let table = make_jump_table(chain, Hardfork::Osaka, &[]);
    let mut state = InMemoryState::new();
    let mut evm = Evm::new(
        &mut state,
        chain,
        Hardfork::Osaka,
        &table,
        BlockEnv::default(),
        TxEnv::default(),
        CfgEnv::default(),
    );

    let mut frame = eof_frame(container, 100_000);
    execute_frame(&mut frame, &mut evm).unwrap();

    let mut padded = [0u8; 32];
    padded[0] = 0xaa;
    padded[1] = 0xbb;
    assert_eq!(
        frame.stack.data(),
        &[U256::from_be_bytes(padded), U256::from(2u64)]
    );
}

#[test]
fn gas_left_is_monotonically_non_increasing() {
    // A straight-line program: verify the meter never rises inside a frame
    // by sampling it with repeated GAS opcodes.
    let code = Bytes::copy_from_slice(&[
        0x5a, 0x5a, 0x5a, 0x00, // GAS GAS GAS STOP
    ]);
    let mut state = InMemoryState::new().with_code(CONTRACT, code);

    let chain = mainnet_config();
    let table = make_jump_table(chain, Hardfork::Berlin, &[]);
    let mut evm = Evm::new(
        &mut state,
        chain,
        Hardfork::Berlin,
        &table,
        BlockEnv::default(),
        TxEnv::default(),
        CfgEnv::default(),
    );

    let mut frame = RunState::new(
        Bytes::copy_from_slice(&[0x5a, 0x5a, 0x5a, 0x00]),
        Bytes::new(),
        CALLER,
        CONTRACT,
        U256::ZERO,
        1_000,
        0,
        false,
    );
    execute_frame(&mut frame, &mut evm).unwrap();

    let samples: Vec<U256> = frame.stack.data().to_vec();
    assert!(samples.windows(2).all(|pair| pair[0] > pair[1]));
}
