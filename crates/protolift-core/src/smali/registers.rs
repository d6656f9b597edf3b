//! Symbolic register file used while simulating a method body.

use std::collections::HashMap;
use std::fmt;
use tracing::{trace, warn};

/// Abstract value bound to a register
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// Decoded numeric constant
    Integer(i64),
    /// `const-string` literal
    Literal(String),
    /// Scalar keyword (`int32`) or short message/enum name (`Bar`)
    TypeName(String),
    /// Name of the instance field read into the register
    FieldName(String),
}

impl Symbol {
    /// Integer view of the value, parsing textual values when possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Symbol::Integer(value) => Some(*value),
            Symbol::Literal(text) | Symbol::TypeName(text) | Symbol::FieldName(text) => {
                text.parse().ok()
            }
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Integer(value) => write!(f, "{}", value),
            Symbol::Literal(text) | Symbol::TypeName(text) | Symbol::FieldName(text) => {
                f.write_str(text)
            }
        }
    }
}

/// Register name to symbolic value mapping.
///
/// One instance lives for exactly one extraction pass.
#[derive(Debug, Default)]
pub struct RegisterFile {
    slots: HashMap<String, Symbol>,
}

impl RegisterFile {
    /// Creates an empty register file
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `register`, replacing the previous value
    pub fn bind(&mut self, register: &str, value: Symbol) {
        trace!(register, value = %value, "bind");
        self.slots.insert(register.to_string(), value);
    }

    /// Copies the value of `source` into `target`.
    ///
    /// If `source` is unbound, `target` becomes unbound too.
    pub fn alias(&mut self, source: &str, target: &str) {
        match self.slots.get(source).cloned() {
            Some(value) => {
                trace!(source, target, value = %value, "alias");
                self.slots.insert(target.to_string(), value);
            }
            None => {
                trace!(source, target, "alias of unbound register");
                self.slots.remove(target);
            }
        }
    }

    /// Current value of `register`
    pub fn get(&self, register: &str) -> Option<&Symbol> {
        self.slots.get(register)
    }

    /// Text value of `register`, or an empty string with a warning when unbound
    pub fn resolve_text(&self, register: &str, line: usize) -> String {
        match self.slots.get(register) {
            Some(value) => value.to_string(),
            None => {
                warn!(register, line, "register read before assignment, using empty value");
                String::new()
            }
        }
    }

    /// Integer value of `register`, with a warning when unbound or not numeric
    pub fn resolve_integer(&self, register: &str, line: usize) -> Option<i64> {
        match self.slots.get(register) {
            Some(value) => {
                let number = value.as_integer();
                if number.is_none() {
                    warn!(register, line, value = %value, "register does not hold an integer");
                }
                number
            }
            None => {
                warn!(register, line, "register read before assignment");
                None
            }
        }
    }
}
