//! Access operations and data types.
//!
//! An [`AccessType`] is the pair (operation, data width) that a generated instruction
//! performs; paths are extracted per access type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Memory operation performed by an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Memory read.
    Load,
    /// Memory write.
    Store,
}

/// Width of the data moved by an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// 1 byte.
    Byte,
    /// 2 bytes.
    Hword,
    /// 4 bytes.
    Word,
    /// 8 bytes.
    Dword,
}

impl DataType {
    /// Size of the data in bytes.
    pub const fn size(self) -> u64 {
        match self {
            Self::Byte => 1,
            Self::Hword => 2,
            Self::Word => 4,
            Self::Dword => 8,
        }
    }

    /// Number of low address bits that must be zero for a naturally aligned access.
    pub const fn align_bits(self) -> u32 {
        self.size().trailing_zeros()
    }

    /// Rounds `address` down to the natural alignment of this data type.
    pub const fn align(self, address: u64) -> u64 {
        address & !(self.size() - 1)
    }

    /// Returns whether `address` is naturally aligned for this data type.
    pub const fn is_aligned(self, address: u64) -> bool {
        address & (self.size() - 1) == 0
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "LOAD"),
            Self::Store => write!(f, "STORE"),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "BYTE",
            Self::Hword => "HWORD",
            Self::Word => "WORD",
            Self::Dword => "DWORD",
        };
        write!(f, "{name}")
    }
}

/// Operation and data width of one memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessType {
    /// Load or store.
    pub operation: Operation,
    /// Width of the accessed data.
    pub data_type: DataType,
}

impl AccessType {
    /// Creates an access type.
    pub const fn new(operation: Operation, data_type: DataType) -> Self {
        Self {
            operation,
            data_type,
        }
    }

    /// A load of `data_type`.
    pub const fn load(data_type: DataType) -> Self {
        Self::new(Operation::Load, data_type)
    }

    /// A store of `data_type`.
    pub const fn store(data_type: DataType) -> Self {
        Self::new(Operation::Store, data_type)
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.data_type)
    }
}
