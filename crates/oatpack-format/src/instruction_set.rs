//! Target instruction sets and their code placement rules.

/// Architectures a container can carry code for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionSet {
    Arm,
    Thumb2,
    X86,
}

impl InstructionSet {
    /// Required alignment for code and invoke stubs in the executable
    /// section.
    pub fn code_alignment(self) -> u32 {
        match self {
            Self::Arm | Self::Thumb2 => 8,
            Self::X86 => 16,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::Arm => 1,
            Self::Thumb2 => 2,
            Self::X86 => 3,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Arm),
            2 => Some(Self::Thumb2),
            3 => Some(Self::X86),
            _ => None,
        }
    }
}
