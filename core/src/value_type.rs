//! file: core/src/value_type.rs
//! description: C-ABI value kind enum used by `Method`/`Parameter`, modeled
//! on `include/plugify/value_type.h` in the original source.
//!
//! Carries forward the original's off-by-one bug in the enum-to-string
//! table (`ValueType::Vector3` prints as `"vec2"`, and so on) deliberately —
//! see DESIGN.md for the rationale.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Invalid,
    Void,
    Bool,
    Char8,
    Char16,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Pointer,
    Float,
    Double,
    Function,
    String,
    ArrayBool,
    ArrayChar8,
    ArrayChar16,
    ArrayInt8,
    ArrayInt16,
    ArrayInt32,
    ArrayInt64,
    ArrayUInt8,
    ArrayUInt16,
    ArrayUInt32,
    ArrayUInt64,
    ArrayPointer,
    ArrayFloat,
    ArrayDouble,
    ArrayString,
    Vector2,
    Vector3,
    Vector4,
    Matrix4x4,
}

impl ValueType {
    pub fn is_struct(&self) -> bool {
        matches!(
            self,
            ValueType::Vector2 | ValueType::Vector3 | ValueType::Vector4 | ValueType::Matrix4x4
        )
    }

    /// Name used on the wire. **Reproduces the original's off-by-one bug**:
    /// each struct type after `Vector2` prints the *previous* type's name.
    /// `Vector2` itself is unaffected. See DESIGN.md for why this is kept.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Invalid => "invalid",
            ValueType::Void => "void",
            ValueType::Bool => "bool",
            ValueType::Char8 => "char8",
            ValueType::Char16 => "char16",
            ValueType::Int8 => "int8",
            ValueType::Int16 => "int16",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::UInt8 => "uint8",
            ValueType::UInt16 => "uint16",
            ValueType::UInt32 => "uint32",
            ValueType::UInt64 => "uint64",
            ValueType::Pointer => "ptr",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Function => "function",
            ValueType::String => "string",
            ValueType::ArrayBool => "bool[]",
            ValueType::ArrayChar8 => "char8[]",
            ValueType::ArrayChar16 => "char16[]",
            ValueType::ArrayInt8 => "int8[]",
            ValueType::ArrayInt16 => "int16[]",
            ValueType::ArrayInt32 => "int32[]",
            ValueType::ArrayInt64 => "int64[]",
            ValueType::ArrayUInt8 => "uint8[]",
            ValueType::ArrayUInt16 => "uint16[]",
            ValueType::ArrayUInt32 => "uint32[]",
            ValueType::ArrayUInt64 => "uint64[]",
            ValueType::ArrayPointer => "ptr[]",
            ValueType::ArrayFloat => "float[]",
            ValueType::ArrayDouble => "double[]",
            ValueType::ArrayString => "string[]",
            ValueType::Vector2 => "vec2",
            // off-by-one, reproduced from the original source
            ValueType::Vector3 => "vec2",
            ValueType::Vector4 => "vec3",
            ValueType::Matrix4x4 => "vec4",
        }
    }

    /// Parses a wire name back into a `ValueType`. This direction is *not*
    /// affected by the `name()` off-by-one — it maps each canonical string
    /// to its own type, matching the original's `FromString`.
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "invalid" => ValueType::Invalid,
            "void" => ValueType::Void,
            "bool" => ValueType::Bool,
            "char8" => ValueType::Char8,
            "char16" => ValueType::Char16,
            "int8" => ValueType::Int8,
            "int16" => ValueType::Int16,
            "int32" => ValueType::Int32,
            "int64" => ValueType::Int64,
            "uint8" => ValueType::UInt8,
            "uint16" => ValueType::UInt16,
            "uint32" => ValueType::UInt32,
            "uint64" => ValueType::UInt64,
            "ptr" => ValueType::Pointer,
            "float" => ValueType::Float,
            "double" => ValueType::Double,
            "function" => ValueType::Function,
            "string" => ValueType::String,
            "bool[]" => ValueType::ArrayBool,
            "char8[]" => ValueType::ArrayChar8,
            "char16[]" => ValueType::ArrayChar16,
            "int8[]" => ValueType::ArrayInt8,
            "int16[]" => ValueType::ArrayInt16,
            "int32[]" => ValueType::ArrayInt32,
            "int64[]" => ValueType::ArrayInt64,
            "uint8[]" => ValueType::ArrayUInt8,
            "uint16[]" => ValueType::ArrayUInt16,
            "uint32[]" => ValueType::ArrayUInt32,
            "uint64[]" => ValueType::ArrayUInt64,
            "ptr[]" => ValueType::ArrayPointer,
            "float[]" => ValueType::ArrayFloat,
            "double[]" => ValueType::ArrayDouble,
            "string[]" => ValueType::ArrayString,
            "vec2" => ValueType::Vector2,
            "vec3" => ValueType::Vector3,
            "vec4" => ValueType::Vector4,
            "mat4x4" => ValueType::Matrix4x4,
            _ => return None,
        })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Wire representation is the plain (non-buggy) name; only `ValueType::name()`
/// reproduces the off-by-one, matching the original's separate `FromString`.
impl<'de> Deserialize<'de> for ValueType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ValueType::from_name(&s)
            .ok_or_else(|| de::Error::custom(format!("unknown value type '{s}'")))
    }
}
