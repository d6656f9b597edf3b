//! JVM type descriptor parsing for method signatures.
//!
//! Only parameter lists are parsed, e.g. `Ljava/lang/String;II` from
//! `<init>(Ljava/lang/String;II)V`. Register layout follows the Dalvik calling
//! convention: one register per parameter, two for `long` and `double`.

/// A single parameter type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// One of `Z B S C I J F D`
    Primitive(char),
    /// `L<class>;`, class path without the `L` and `;`
    Object(String),
    /// `[<element>`
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Number of registers the parameter occupies
    pub fn register_width(&self) -> usize {
        match self {
            TypeDescriptor::Primitive('J' | 'D') => 2,
            _ => 1,
        }
    }

    /// True for `I`
    pub fn is_int(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive('I'))
    }

    /// True for `Ljava/lang/String;`
    pub fn is_string(&self) -> bool {
        matches!(self, TypeDescriptor::Object(class) if class == "java/lang/String")
    }
}

/// Parse a parameter descriptor list.
///
/// Returns `None` on malformed input (unknown primitive, unterminated class
/// name, `V` used as a parameter).
pub fn parse_parameters(signature: &str) -> Option<Vec<TypeDescriptor>> {
    let mut params = Vec::new();
    let mut rest = signature.trim();

    while !rest.is_empty() {
        let (param, tail) = parse_one(rest)?;
        params.push(param);
        rest = tail;
    }

    Some(params)
}

fn parse_one(input: &str) -> Option<(TypeDescriptor, &str)> {
    let mut chars = input.chars();
    let first = chars.next()?;

    match first {
        'Z' | 'B' | 'S' | 'C' | 'I' | 'J' | 'F' | 'D' => {
            Some((TypeDescriptor::Primitive(first), &input[1..]))
        }
        'L' => {
            let end = input.find(';')?;
            let class = &input[1..end];
            if class.is_empty() {
                return None;
            }
            Some((TypeDescriptor::Object(class.to_string()), &input[end + 1..]))
        }
        '[' => {
            let (element, tail) = parse_one(&input[1..])?;
            Some((TypeDescriptor::Array(Box::new(element)), tail))
        }
        _ => None,
    }
}

/// Argument register index of every parameter.
///
/// Index 0 is the receiver, so the first parameter lives at index 1.
pub fn register_offsets(params: &[TypeDescriptor]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(params.len());
    let mut next = 1;
    for param in params {
        offsets.push(next);
        next += param.register_width();
    }
    offsets
}
