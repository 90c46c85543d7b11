//! The `LOG0..LOG4` opcodes.

use ember_primitives::B256;

use super::as_usize_saturated;
use crate::{
    evm::Evm,
    interpreter::{Control, RunState},
    opcode,
    result::{EvmError, Log},
};

pub fn log(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let op = state.code[state.pc - 1];
    let topic_count = usize::from(op - opcode::LOG0);

    let [offset, len] = state.stack.pop_array()?;
    let mut topics = Vec::with_capacity(topic_count);
    for _ in 0..topic_count {
        topics.push(B256::from(state.stack.pop()?.to_be_bytes::<32>()));
    }

    let data = state
        .memory
        .read(as_usize_saturated(offset), as_usize_saturated(len));

    evm.logs.push(Log {
        address: state.address,
        topics,
        data,
    });
    evm.journal.log_emitted();

    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use ember_forks::Hardfork;

    use crate::{
        opcode,
        result::ExceptionalHalt,
        test_support::{run_code_err_at, run_frame_logs},
    };

    #[test]
    fn log_captures_topics_and_data() {
        // MSTORE8 0xaa at 0; PUSH1 topic 0x42; LOG1(0, 1)
        let code = [
            0x60, 0xaa, 0x60, 0x00, opcode::MSTORE8, // memory[0] = 0xaa
            0x60, 0x42, // topic
            0x60, 0x01, 0x60, 0x00, // len, offset
            0xa1, // LOG1
            0x00,
        ];
        let logs = run_frame_logs(&code, 100_000, Hardfork::Berlin);

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].topics.len(), 1);
        assert_eq!(logs[0].topics[0].0[31], 0x42);
        assert_eq!(logs[0].data.as_ref(), &[0xaa]);
    }

    #[test]
    fn log_is_forbidden_in_static_frames() {
        let code = [0x60, 0x00, 0x60, 0x00, 0xa0, 0x00];
        let halt = run_code_err_at(&code, 100_000, Hardfork::Berlin, true);
        assert_eq!(halt, ExceptionalHalt::StaticStateChange);
    }
}
