use crate::{
    lang::code::Handle,
    runtime::error::{self, type_mismatch},
};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{DefaultHasher, Hash, Hasher},
};

/// The payload of the number table.  Machine sized integers never make it here, they live directly
/// in their cells.
#[derive(Clone, PartialEq, Debug)]
pub enum Number {
    /// An integer too large for an i64, or one forced through the big number path.
    Big(BigInt),

    /// A floating point value.
    Double(f64),
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Number::Big(value) => write!(f, "{}", value),
            Number::Double(value) => write!(f, "{}", format_double(*value)),
        }
    }
}

/// Doubles always show a fractional part so that they can be told apart from integers.
fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Anything that can be stored in an interning table must be able to produce a stable content
/// hash.  The hash is only the first guess at a handle, collisions are resolved by the table.
pub trait InternKey: Clone + PartialEq {
    fn content_hash(&self) -> u64;
}

impl InternKey for String {
    fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl InternKey for Number {
    fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        match self {
            Number::Big(value) => {
                0u8.hash(&mut hasher);
                value.hash(&mut hasher);
            }
            Number::Double(value) => {
                1u8.hash(&mut hasher);
                value.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}

/// A fully resolved stack value.  Cells only hold handles, operations work with values.  Popping a
/// cell resolves it through the scope chain, pushing a value interns whatever it needs to.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Double(f64),
    Str(String),

    /// The name of a word that was pushed as a value.
    Word(String),

    /// Blocks are never copied, the value keeps the block's handle.
    Block(Handle),
}

/// Convert a rust value into a script value.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for usize {
    fn to_value(&self) -> Value {
        match i64::try_from(*self) {
            Ok(value) => Value::Int(value),
            Err(_) => Value::BigInt(BigInt::from(*self)),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::Str(value.to_string())
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Value {
        match number {
            Number::Big(value) => Value::BigInt(value),
            Number::Double(value) => Value::Double(value),
        }
    }
}

/// Big integers that fit back into a machine integer are narrowed so that cells stay inline.
impl From<BigInt> for Value {
    fn from(value: BigInt) -> Value {
        match value.to_i64() {
            Some(small) => Value::Int(small),
            None => Value::BigInt(value),
        }
    }
}

/// The canonical string form of a value.  This is what gets printed and what loose equality
/// compares when the values are not both numbers.
impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::BigInt(value) => write!(f, "{}", value),
            Value::Double(value) => write!(f, "{}", format_double(*value)),
            Value::Str(value) => write!(f, "{}", value),
            Value::Word(value) => write!(f, "{}", value),
            Value::Block(handle) => write!(f, "<block {}>", handle),
        }
    }
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::BigInt(_) | Value::Double(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn both_are_numeric(a: &Value, b: &Value) -> bool {
        a.is_numeric() && b.is_numeric()
    }

    pub fn either_is_string(a: &Value, b: &Value) -> bool {
        a.is_string() || b.is_string()
    }

    pub fn either_is_double(a: &Value, b: &Value) -> bool {
        matches!(a, Value::Double(_)) || matches!(b, Value::Double(_))
    }

    /// The value as a floating point number, numbers only.
    pub fn as_f64(&self) -> error::Result<f64> {
        match self {
            Value::Int(value) => Ok(*value as f64),
            Value::BigInt(value) => Ok(value.to_f64().unwrap_or(f64::NAN)),
            Value::Double(value) => Ok(*value),
            _ => type_mismatch("a number"),
        }
    }

    /// The value as an arbitrary precision integer, integers only.
    pub fn as_big_int(&self) -> error::Result<BigInt> {
        match self {
            Value::Int(value) => Ok(BigInt::from(*value)),
            Value::BigInt(value) => Ok(value.clone()),
            _ => type_mismatch("an integer"),
        }
    }

    /// Is this number equal to zero?  Non numbers are never zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(value) => *value == 0,
            Value::BigInt(value) => value.is_zero(),
            Value::Double(value) => *value == 0.0,
            _ => false,
        }
    }

    /// Compare two numbers, exactly for integers and as doubles if either side is a double.
    fn numeric_cmp(a: &Value, b: &Value) -> error::Result<Ordering> {
        if let (Value::Int(x), Value::Int(y)) = (a, b) {
            return Ok(x.cmp(y));
        }

        if Value::either_is_double(a, b) {
            let (x, y) = (a.as_f64()?, b.as_f64()?);
            return Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal));
        }

        Ok(a.as_big_int()?.cmp(&b.as_big_int()?))
    }

    /// Loose equality, `1` equals `"1"`.  Numbers compare by value, everything else by its
    /// canonical string form.
    pub fn loose_eq(a: &Value, b: &Value) -> bool {
        if Value::both_are_numeric(a, b) {
            matches!(Value::numeric_cmp(a, b), Ok(Ordering::Equal))
        } else {
            a.to_string() == b.to_string()
        }
    }

    /// Ordering is numeric for two numbers and lexical when either side is a string.  Anything else
    /// can not be ordered.
    pub fn compare(a: &Value, b: &Value) -> error::Result<Ordering> {
        if Value::both_are_numeric(a, b) {
            Value::numeric_cmp(a, b)
        } else if Value::either_is_string(a, b) {
            Ok(a.to_string().cmp(&b.to_string()))
        } else {
            type_mismatch("two numbers or a string")
        }
    }

    /// Total order used for sorting, values that can not be ordered fall back to their string form.
    pub fn sort_cmp(a: &Value, b: &Value) -> Ordering {
        Value::compare(a, b).unwrap_or_else(|_| a.to_string().cmp(&b.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_equality_crosses_kinds() {
        assert!(Value::loose_eq(&Value::Int(1), &Value::from("1")));
        assert!(!Value::loose_eq(&Value::Int(1), &Value::from("2")));
        assert!(Value::loose_eq(&Value::Int(2), &Value::Double(2.0)));
        assert!(Value::loose_eq(&Value::Bool(true), &Value::from("true")));
    }

    #[test]
    fn doubles_always_print_a_fraction() {
        assert_eq!(Value::Double(2.0).to_string(), "2.0");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
    }

    #[test]
    fn ordering_rules() {
        assert_eq!(
            Value::compare(&Value::Int(2), &Value::Double(10.0)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Value::compare(&Value::from("b"), &Value::Int(10)).unwrap(),
            Ordering::Greater
        );
        assert!(Value::compare(&Value::Bool(true), &Value::Int(1)).is_err());
    }

    #[test]
    fn big_integers_narrow_when_they_fit() {
        assert_eq!(Value::from(BigInt::from(7)), Value::Int(7));
        assert!(matches!(
            Value::from(BigInt::from(i64::MAX) + 1),
            Value::BigInt(_)
        ));
    }

    #[test]
    fn content_hashes_are_stable() {
        assert_eq!("abc".to_string().content_hash(), "abc".to_string().content_hash());
        assert_ne!(
            Number::Double(1.0).content_hash(),
            Number::Big(BigInt::from(1)).content_hash()
        );
    }
}
