//! Signature encodings for native methods.
//!
//! Every native method carries a compact encoding of its return type and
//! parameter types. The bridge uses it to validate host arguments before a
//! native call, to convert return values, and to decide whether a method
//! can be bound at all.
//!
//! # Encoding Format
//!
//! The first token is the return type, every following token is a
//! parameter. A token is an optional `?` (nullable) followed by a type
//! character:
//!
//! - `v` - void (return position only)
//! - `B` - boolean
//! - `c` / `s` / `i` / `q` - signed 8, 16, 32 and 64 bit integers
//! - `C` / `z` - unsigned 8 bit integer and `usize`
//! - `d` - double
//! - `T` - text, a `Clownfish::String` object
//! - `@` - any object, optionally constrained as `@<Class::Name>`
//! - `^` - raw pointer, never bindable
//!
//! Example encodings:
//! - `"q"` - returns an i64, no parameters
//! - `"vT@"` - returns nothing, takes a string and an object
//! - `"?@z"` - returns an object or null, takes a `usize`
//! - `"v@<Clownfish::Vector>"` - takes a vector

use crate::error::{Error, Result};
use std::fmt;

/// Native integer widths the bridge range-checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    U8,
    Usize,
}

impl IntWidth {
    /// Inclusive range representable by this width, clamped to `i64`.
    #[must_use]
    pub const fn bounds(self) -> (i64, i64) {
        match self {
            IntWidth::I8 => (i8::MIN as i64, i8::MAX as i64),
            IntWidth::I16 => (i16::MIN as i64, i16::MAX as i64),
            IntWidth::I32 => (i32::MIN as i64, i32::MAX as i64),
            IntWidth::I64 => (i64::MIN, i64::MAX),
            IntWidth::U8 => (0, u8::MAX as i64),
            IntWidth::Usize => (0, i64::MAX),
        }
    }

    /// Returns true if `value` fits this width.
    #[must_use]
    pub const fn contains(self, value: i64) -> bool {
        let (lo, hi) = self.bounds();
        value >= lo && value <= hi
    }

    /// Rust spelling of the width, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::U8 => "u8",
            IntWidth::Usize => "usize",
        }
    }
}

/// The kind of value a token describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    Int(IntWidth),
    Float,
    Text,
    /// Object, optionally constrained to a class and its descendants.
    Object(Option<String>),
    Pointer,
}

/// One parsed token of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub kind: TypeKind,
    pub nullable: bool,
}

impl TypeSpec {
    /// Returns true if values of this type can cross the boundary.
    #[must_use]
    pub fn is_bindable(&self) -> bool {
        self.kind != TypeKind::Pointer
    }

    /// Human-readable kind name used in argument errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.kind {
            TypeKind::Void => "nothing".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Int(width) => format!("int ({})", width.name()),
            TypeKind::Float => "float".to_string(),
            TypeKind::Text => "str".to_string(),
            TypeKind::Object(Some(class)) => class.clone(),
            TypeKind::Object(None) => "object".to_string(),
            TypeKind::Pointer => "pointer".to_string(),
        }
    }
}

/// A parsed method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    encoding: String,
    ret: TypeSpec,
    params: Vec<TypeSpec>,
}

impl Signature {
    /// Parses an encoding string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] if the string is empty, contains an
    /// unknown type character, puts `v` in a parameter position, marks `v`
    /// nullable, or has a malformed `@<...>` constraint.
    ///
    /// # Example
    ///
    /// ```
    /// use finbridge::runtime::encoding::{Signature, TypeKind};
    ///
    /// let sig = Signature::parse("?@T").unwrap();
    /// assert!(sig.ret().nullable);
    /// assert_eq!(sig.params()[0].kind, TypeKind::Text);
    /// assert!(Signature::parse("Tv").is_err());
    /// ```
    pub fn parse(encoding: &str) -> Result<Self> {
        let invalid = || Error::InvalidEncoding {
            encoding: encoding.to_string(),
        };

        let mut tokens = Vec::new();
        let mut chars = encoding.chars().peekable();

        while let Some(mut ch) = chars.next() {
            let nullable = ch == '?';
            if nullable {
                ch = chars.next().ok_or_else(invalid)?;
            }

            let kind = match ch {
                'v' => TypeKind::Void,
                'B' => TypeKind::Bool,
                'c' => TypeKind::Int(IntWidth::I8),
                's' => TypeKind::Int(IntWidth::I16),
                'i' => TypeKind::Int(IntWidth::I32),
                'q' => TypeKind::Int(IntWidth::I64),
                'C' => TypeKind::Int(IntWidth::U8),
                'z' => TypeKind::Int(IntWidth::Usize),
                'd' => TypeKind::Float,
                'T' => TypeKind::Text,
                '^' => TypeKind::Pointer,
                '@' => {
                    if chars.peek() == Some(&'<') {
                        chars.next();
                        let mut class = String::new();
                        loop {
                            match chars.next() {
                                Some('>') => break,
                                Some(c) => class.push(c),
                                None => return Err(invalid()),
                            }
                        }
                        if class.is_empty() {
                            return Err(invalid());
                        }
                        TypeKind::Object(Some(class))
                    } else {
                        TypeKind::Object(None)
                    }
                }
                _ => return Err(invalid()),
            };

            if kind == TypeKind::Void && (nullable || !tokens.is_empty()) {
                return Err(invalid());
            }

            tokens.push(TypeSpec { kind, nullable });
        }

        if tokens.is_empty() {
            return Err(invalid());
        }

        let ret = tokens.remove(0);
        Ok(Signature {
            encoding: encoding.to_string(),
            ret,
            params: tokens,
        })
    }

    /// The encoding this signature was parsed from.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Return type.
    #[must_use]
    pub fn ret(&self) -> &TypeSpec {
        &self.ret
    }

    /// Parameter types, in order.
    #[must_use]
    pub fn params(&self) -> &[TypeSpec] {
        &self.params
    }

    /// Returns true if neither the return type nor any parameter is a raw
    /// pointer.
    #[must_use]
    pub fn is_bindable(&self) -> bool {
        self.ret.is_bindable() && self.params.iter().all(TypeSpec::is_bindable)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoding)
    }
}
