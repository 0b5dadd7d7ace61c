//! Variables, bit-fields and bit-field expressions.

use serde::{Deserialize, Serialize};

use crate::common::bits;

/// Index of a variable in its subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(pub usize);

/// A named bit vector of at most 64 bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Unique variable name.
    pub name: String,
    /// Width in bits (`1..=64`).
    pub width: u32,
}

/// Inclusive bit range `[hi:lo]` of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field {
    /// Variable the bits belong to.
    pub var: VarId,
    /// Low bit.
    pub lo: u32,
    /// High bit.
    pub hi: u32,
}

impl Field {
    /// Creates the field `var[hi:lo]`.
    pub const fn new(var: VarId, lo: u32, hi: u32) -> Self {
        Self { var, lo, hi }
    }

    /// Creates a field covering the low `width` bits of `var`.
    pub const fn whole(var: VarId, width: u32) -> Self {
        Self::new(var, 0, width - 1)
    }

    /// Number of bits in the field.
    pub const fn width(&self) -> u32 {
        self.hi - self.lo + 1
    }
}

/// Concatenation of fields, least significant field first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression {
    fields: Vec<Field>,
}

impl Expression {
    /// Creates an expression from fields ordered least significant first.
    pub const fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// An expression with no bits.
    pub const fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// A single-field expression.
    pub fn field(field: Field) -> Self {
        Self::new(vec![field])
    }

    /// The fields, least significant first.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns whether the expression has no bits.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total width in bits.
    pub fn width(&self) -> u32 {
        self.fields.iter().map(Field::width).sum()
    }

    /// Evaluates the concatenation given the value of each variable.
    ///
    /// # Arguments
    ///
    /// * `value_of` - Returns the current value of a variable.
    pub fn evaluate(&self, mut value_of: impl FnMut(VarId) -> u64) -> u64 {
        let mut result = 0;
        let mut shift = 0;
        for f in &self.fields {
            let part = bits::extract(value_of(f.var), f.lo, f.hi);
            if shift < 64 {
                result |= part << shift;
            }
            shift += f.width();
        }
        result
    }

    /// Scatters `value` into `target` along the fields of the expression.
    ///
    /// Only meaningful for expressions over a single variable whose current value is
    /// `target`; the inverse of [`Expression::evaluate`] for that variable.
    pub fn deposit(&self, target: u64, value: u64) -> u64 {
        let mut result = target;
        let mut shift = 0;
        for f in &self.fields {
            let part = if shift < 64 { value >> shift } else { 0 };
            result = bits::insert(result, f.lo, f.hi, part);
            shift += f.width();
        }
        result
    }

    /// Mask of the bits of a single-variable expression's variable that it covers.
    pub fn coverage(&self) -> u64 {
        self.fields
            .iter()
            .fold(0, |acc, f| acc | (bits::mask(f.width()) << f.lo))
    }

    /// Returns whether every field refers to `var`.
    pub fn is_over(&self, var: VarId) -> bool {
        self.fields.iter().all(|f| f.var == var)
    }
}

impl From<Field> for Expression {
    fn from(field: Field) -> Self {
        Self::field(field)
    }
}
