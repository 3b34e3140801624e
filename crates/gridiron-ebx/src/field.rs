//! EBX field kinds.

/// Kind of an EBX field or type, taken from bits 4..9 of its flags.
///
/// The values are the binary values used by Frostbite type descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EbxFieldType {
    /// Base-class marker; its class reference points at the parent type.
    Inherited,
    DbObject,
    /// Nested value type laid out inline.
    Struct,
    Pointer,
    Array,
    FixedArray,
    String,
    /// Offset of a null-terminated string in the payload.
    CString,
    Enum,
    FileRef,
    Boolean,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Guid,
    Sha1,
    ResourceRef,
    Function,
    TypeRef,
    BoxedValueRef,
    Interface,
    Delegate,
    /// A kind this decoder does not know.
    Unknown(u8),
}

impl EbxFieldType {
    /// Extract the kind from raw type flags.
    pub fn from_flags(flags: u16) -> Self {
        Self::from_u8(((flags >> 4) & 0x1F) as u8)
    }

    /// Parse from the 5-bit kind value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Inherited,
            0x01 => Self::DbObject,
            0x02 => Self::Struct,
            0x03 => Self::Pointer,
            0x04 => Self::Array,
            0x05 => Self::FixedArray,
            0x06 => Self::String,
            0x07 => Self::CString,
            0x08 => Self::Enum,
            0x09 => Self::FileRef,
            0x0A => Self::Boolean,
            0x0B => Self::Int8,
            0x0C => Self::UInt8,
            0x0D => Self::Int16,
            0x0E => Self::UInt16,
            0x0F => Self::Int32,
            0x10 => Self::UInt32,
            0x11 => Self::Int64,
            0x12 => Self::UInt64,
            0x13 => Self::Float32,
            0x14 => Self::Float64,
            0x15 => Self::Guid,
            0x16 => Self::Sha1,
            0x17 => Self::ResourceRef,
            0x18 => Self::Function,
            0x19 => Self::TypeRef,
            0x1A => Self::BoxedValueRef,
            0x1B => Self::Interface,
            0x1C => Self::Delegate,
            other => Self::Unknown(other),
        }
    }

    /// Get the 5-bit kind value.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Inherited => 0x00,
            Self::DbObject => 0x01,
            Self::Struct => 0x02,
            Self::Pointer => 0x03,
            Self::Array => 0x04,
            Self::FixedArray => 0x05,
            Self::String => 0x06,
            Self::CString => 0x07,
            Self::Enum => 0x08,
            Self::FileRef => 0x09,
            Self::Boolean => 0x0A,
            Self::Int8 => 0x0B,
            Self::UInt8 => 0x0C,
            Self::Int16 => 0x0D,
            Self::UInt16 => 0x0E,
            Self::Int32 => 0x0F,
            Self::UInt32 => 0x10,
            Self::Int64 => 0x11,
            Self::UInt64 => 0x12,
            Self::Float32 => 0x13,
            Self::Float64 => 0x14,
            Self::Guid => 0x15,
            Self::Sha1 => 0x16,
            Self::ResourceRef => 0x17,
            Self::Function => 0x18,
            Self::TypeRef => 0x19,
            Self::BoxedValueRef => 0x1A,
            Self::Interface => 0x1B,
            Self::Delegate => 0x1C,
            Self::Unknown(value) => *value,
        }
    }

    /// Build raw type flags carrying this kind.
    pub fn to_flags(&self) -> u16 {
        u16::from(self.as_u8()) << 4
    }

    /// Size in bytes when stored inline, for kinds with a fixed size.
    pub fn inline_size(&self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 | Self::Enum | Self::CString => Some(4),
            Self::Int64
            | Self::UInt64
            | Self::Float64
            | Self::Pointer
            | Self::FileRef
            | Self::ResourceRef => Some(8),
            Self::Guid => Some(16),
            Self::Sha1 => Some(20),
            _ => None,
        }
    }
}

impl std::fmt::Display for EbxFieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(value) => write!(f, "Unknown({:#04x})", value),
            other => write!(f, "{:?}", other),
        }
    }
}
