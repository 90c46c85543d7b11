//! Object-format (EOF) containers.

use ember_primitives::Bytes;

/// The two magic bytes opening every container.
pub const EOF_MAGIC: [u8; 2] = [0xef, 0x00];

/// Capacity of the `CALLF` return stack.
pub const RETURN_STACK_LIMIT: usize = 1024;

const KIND_TERMINATOR: u8 = 0x00;
const KIND_TYPES: u8 = 0x01;
const KIND_CODE: u8 = 0x02;
const KIND_CONTAINER: u8 = 0x03;
const KIND_DATA: u8 = 0x04;

/// A malformed container.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EofDecodeError {
    /// The bytes do not open with the magic.
    #[error("missing EOF magic")]
    MissingMagic,
    /// Unsupported container version.
    #[error("unsupported EOF version: {0}")]
    UnsupportedVersion(u8),
    /// The header ended prematurely.
    #[error("truncated EOF header")]
    TruncatedHeader,
    /// A section kind out of order or unknown.
    #[error("unexpected section kind: {0:#04x}")]
    UnexpectedSectionKind(u8),
    /// The type section size must be four bytes per code section.
    #[error("invalid type section size: {0}")]
    InvalidTypeSectionSize(usize),
    /// No code sections, or more than the protocol allows.
    #[error("invalid code section count: {0}")]
    InvalidCodeSectionCount(usize),
    /// The body is shorter than the header promises.
    #[error("truncated EOF body")]
    TruncatedBody,
    /// The first code section must take no arguments and not return.
    #[error("invalid first section type")]
    InvalidFirstSectionType,
}

/// The declared shape of one code section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionType {
    /// Stack items consumed by the section.
    pub inputs: u8,
    /// Stack items produced; `0x80` marks a non-returning section.
    pub outputs: u8,
    /// The section's declared maximum stack height.
    pub max_stack_height: u16,
}

impl SectionType {
    /// Marker for sections that never return.
    pub const NON_RETURNING: u8 = 0x80;
}

/// A decoded object-format container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EofContainer {
    /// One type entry per code section.
    pub types: Vec<SectionType>,
    /// The code sections.
    pub code_sections: Vec<Bytes>,
    /// Nested containers for `EOFCREATE`/`RETURNCONTRACT`.
    pub container_sections: Vec<Bytes>,
    /// The data section.
    pub data: Bytes,
}

/// Whether the bytes carry the container magic.
pub fn is_eof(code: &[u8]) -> bool {
    code.len() >= 2 && code[0..2] == EOF_MAGIC
}

struct Reader<'bytes> {
    bytes: &'bytes [u8],
    pos: usize,
}

impl<'bytes> Reader<'bytes> {
    fn u8(&mut self) -> Result<u8, EofDecodeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(EofDecodeError::TruncatedHeader)?;
        self.pos += 1;

        Ok(byte)
    }

    fn u16(&mut self) -> Result<u16, EofDecodeError> {
        Ok(u16::from_be_bytes([self.u8()?, self.u8()?]))
    }

    fn u32(&mut self) -> Result<u32, EofDecodeError> {
        Ok(u32::from_be_bytes([
            self.u8()?,
            self.u8()?,
            self.u8()?,
            self.u8()?,
        ]))
    }

    fn take(&mut self, len: usize) -> Result<&'bytes [u8], EofDecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(EofDecodeError::TruncatedBody)?;
        if end > self.bytes.len() {
            return Err(EofDecodeError::TruncatedBody);
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;

        Ok(slice)
    }
}

impl EofContainer {
    /// Decodes a container, validating its structure: magic, version, the
    /// section table, type arity and size consistency.
    pub fn decode(bytes: &[u8]) -> Result<Self, EofDecodeError> {
        if !is_eof(bytes) {
            return Err(EofDecodeError::MissingMagic);
        }

        let mut reader = Reader { bytes, pos: 2 };

        let version = reader.u8()?;
        if version != 1 {
            return Err(EofDecodeError::UnsupportedVersion(version));
        }

        let kind = reader.u8()?;
        if kind != KIND_TYPES {
            return Err(EofDecodeError::UnexpectedSectionKind(kind));
        }
        let types_size = reader.u16()? as usize;
        if types_size == 0 || types_size % 4 != 0 {
            return Err(EofDecodeError::InvalidTypeSectionSize(types_size));
        }

        let kind = reader.u8()?;
        if kind != KIND_CODE {
            return Err(EofDecodeError::UnexpectedSectionKind(kind));
        }
        let code_count = reader.u16()? as usize;
        if code_count == 0 || code_count > 1024 || code_count * 4 != types_size {
            return Err(EofDecodeError::InvalidCodeSectionCount(code_count));
        }
        let mut code_sizes = Vec::with_capacity(code_count);
        for _ in 0..code_count {
            code_sizes.push(reader.u16()? as usize);
        }

        let mut kind = reader.u8()?;
        let mut container_sizes = Vec::new();
        if kind == KIND_CONTAINER {
            let container_count = reader.u16()? as usize;
            for _ in 0..container_count {
                container_sizes.push(reader.u32()? as usize);
            }
            kind = reader.u8()?;
        }

        if kind != KIND_DATA {
            return Err(EofDecodeError::UnexpectedSectionKind(kind));
        }
        let data_size = reader.u16()? as usize;

        let kind = reader.u8()?;
        if kind != KIND_TERMINATOR {
            return Err(EofDecodeError::UnexpectedSectionKind(kind));
        }

        let mut types = Vec::with_capacity(code_count);
        for _ in 0..code_count {
            let type_bytes = reader.take(4)?;
            types.push(SectionType {
                inputs: type_bytes[0],
                outputs: type_bytes[1],
                max_stack_height: u16::from_be_bytes([type_bytes[2], type_bytes[3]]),
            });
        }

        let first = &types[0];
        if first.inputs != 0 || first.outputs != SectionType::NON_RETURNING {
            return Err(EofDecodeError::InvalidFirstSectionType);
        }

        let mut code_sections = Vec::with_capacity(code_count);
        for size in code_sizes {
            code_sections.push(Bytes::copy_from_slice(reader.take(size)?));
        }

        let mut container_sections = Vec::with_capacity(container_sizes.len());
        for size in container_sizes {
            container_sections.push(Bytes::copy_from_slice(reader.take(size)?));
        }

        // The data section of a deployment container may be truncated; it is
        // topped up by RETURNCONTRACT.
        let available = (bytes.len() - reader.pos).min(data_size);
        let data = Bytes::copy_from_slice(reader.take(available)?);

        Ok(Self {
            types,
            code_sections,
            container_sections,
            data,
        })
    }
}

/// A pending `CALLF` return location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReturnFrame {
    /// The section to return to.
    pub section: usize,
    /// The program counter to resume at.
    pub pc: usize,
}

/// Per-frame object-format execution context.
#[derive(Clone, Debug)]
pub struct EofState {
    /// The decoded container.
    pub container: EofContainer,
    /// Index of the executing code section.
    pub section: usize,
    /// The `CALLF` return stack.
    pub return_stack: Vec<ReturnFrame>,
    /// Aux data returned by `RETURNCONTRACT`, making the frame a deployment.
    pub deploy_container: Option<Bytes>,
}

impl EofState {
    /// Creates the context for the container's first code section.
    pub fn new(container: EofContainer) -> Self {
        Self {
            container,
            section: 0,
            return_stack: Vec::new(),
            deploy_container: None,
        }
    }
}
