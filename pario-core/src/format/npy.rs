//! Array file header (`.npy`)
//!
//! Layout: the six magic bytes, a major and minor version byte, a little
//! endian header length (`u16` for version 1.0, `u32` for 2.0 and 3.0), then
//! a Python dictionary literal such as
//! `{'descr': '<f8', 'fortran_order': False, 'shape': (8, 4), }`, padded with
//! spaces and terminated by a newline so the payload starts on a 64 byte
//! boundary. The raw elements of the whole array follow immediately.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write as _;

use super::constants::{ARRAY_ALIGN, MAGIC, MAX_HEADER_LEN, PREAMBLE_LEN, V1_MAX_HEADER_LEN};
use crate::{ElementType, Order, ParioError, Result};

/// Decoded array file header
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NpyHeader {
    version: (u8, u8),
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
    data_offset: usize,
}

impl NpyHeader {
    /// Number of bytes needed before [`NpyHeader::required_len`] can answer
    pub const PREFIX_LEN: usize = PREAMBLE_LEN + 4;

    /// Total header length (preamble through padding) announced by `prefix`
    ///
    /// `prefix` must hold at least the preamble and the length field.
    pub fn required_len(prefix: &[u8]) -> Result<usize> {
        if prefix.len() < PREAMBLE_LEN + 2 {
            return Err(ParioError::InsufficientBuffer);
        }
        if prefix[..MAGIC.len()] != MAGIC {
            return Err(ParioError::InvalidHeader);
        }

        let (field, header_len) = match prefix[MAGIC.len()] {
            1 => (
                2,
                u16::from_le_bytes([prefix[PREAMBLE_LEN], prefix[PREAMBLE_LEN + 1]]) as usize,
            ),
            2 | 3 => {
                if prefix.len() < PREAMBLE_LEN + 4 {
                    return Err(ParioError::InsufficientBuffer);
                }
                let mut len = [0u8; 4];
                len.copy_from_slice(&prefix[PREAMBLE_LEN..PREAMBLE_LEN + 4]);
                (4, u32::from_le_bytes(len) as usize)
            }
            _ => return Err(ParioError::UnsupportedFormat),
        };

        if header_len > MAX_HEADER_LEN {
            return Err(ParioError::InvalidHeader);
        }
        Ok(PREAMBLE_LEN + field + header_len)
    }

    /// Parse a complete header
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let total = Self::required_len(bytes)?;
        if bytes.len() < total {
            return Err(ParioError::InsufficientBuffer);
        }
        let version = (bytes[MAGIC.len()], bytes[MAGIC.len() + 1]);
        let field = if version.0 == 1 { 2 } else { 4 };

        let text = core::str::from_utf8(&bytes[PREAMBLE_LEN + field..total])
            .map_err(|_| ParioError::InvalidHeader)?;
        let fields = parse_dict(text)?;

        Ok(Self {
            version,
            descr: fields.descr,
            fortran_order: fields.fortran_order,
            shape: fields.shape,
            data_offset: total,
        })
    }

    /// Header describing a full array of `element` values
    pub fn for_array(element: ElementType, order: Order, shape: &[usize]) -> Self {
        let fortran_order = order == Order::Fortran;
        let descr = element.descr();
        let dict = dict_literal(&descr, fortran_order, shape);

        let v1_len = padded_len(dict.len(), 2);
        let (version, field, header_len) = if v1_len <= V1_MAX_HEADER_LEN {
            ((1, 0), 2, v1_len)
        } else {
            ((2, 0), 4, padded_len(dict.len(), 4))
        };

        Self {
            version,
            descr,
            fortran_order,
            shape: shape.to_vec(),
            data_offset: PREAMBLE_LEN + field + header_len,
        }
    }

    /// Encode this header, padding included
    pub fn to_bytes(&self) -> Vec<u8> {
        let dict = dict_literal(&self.descr, self.fortran_order, &self.shape);
        let field = if self.version.0 == 1 { 2 } else { 4 };
        let header_len = padded_len(dict.len(), field);

        let mut bytes = Vec::with_capacity(PREAMBLE_LEN + field + header_len);
        bytes.extend_from_slice(&MAGIC);
        bytes.push(self.version.0);
        bytes.push(self.version.1);
        if field == 2 {
            bytes.extend_from_slice(&(header_len as u16).to_le_bytes());
        } else {
            bytes.extend_from_slice(&(header_len as u32).to_le_bytes());
        }
        bytes.extend_from_slice(dict.as_bytes());
        bytes.resize(PREAMBLE_LEN + field + header_len - 1, b' ');
        bytes.push(b'\n');
        bytes
    }

    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    pub fn descr(&self) -> &str {
        &self.descr
    }

    pub fn fortran_order(&self) -> bool {
        self.fortran_order
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Byte offset of the first array element
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    pub fn order(&self) -> Order {
        if self.fortran_order {
            Order::Fortran
        } else {
            Order::C
        }
    }

    /// Element type tag; fails for non-numeric or foreign-endian types
    pub fn element_type(&self) -> Result<ElementType> {
        ElementType::from_descr(&self.descr)
    }

    /// Payload size in bytes, if the element type is supported
    pub fn payload_len(&self) -> Result<usize> {
        let element = self.element_type()?;
        self.shape
            .iter()
            .try_fold(element.size_bytes(), |acc, &n| acc.checked_mul(n))
            .ok_or(ParioError::SizeOverflow)
    }
}

/// Header length (dict, padding and newline) for a given length field width
fn padded_len(dict_len: usize, field: usize) -> usize {
    let hlen = dict_len + 1;
    let pad = ARRAY_ALIGN - (PREAMBLE_LEN + field + hlen) % ARRAY_ALIGN;
    hlen + pad
}

fn dict_literal(descr: &str, fortran_order: bool, shape: &[usize]) -> String {
    let mut dict = String::new();
    let order = if fortran_order { "True" } else { "False" };
    // Infallible for String
    let _ = write!(dict, "{{'descr': '{descr}', 'fortran_order': {order}, 'shape': (");
    for (i, n) in shape.iter().enumerate() {
        if i > 0 {
            dict.push_str(", ");
        }
        dict.push_str(&n.to_string());
    }
    if shape.len() == 1 {
        dict.push(',');
    }
    dict.push_str("), }");
    dict
}

struct Fields {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

enum Value {
    Str(String),
    Bool(bool),
    Tuple(Vec<usize>),
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(ParioError::InvalidHeader)
        }
    }

    fn string(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(ParioError::InvalidHeader),
        };
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != quote {
            self.pos += 1;
        }
        if self.pos == self.bytes.len() {
            return Err(ParioError::InvalidHeader);
        }
        let text = core::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| ParioError::InvalidHeader)?;
        self.pos += 1;
        Ok(text.to_string())
    }

    fn integer(&mut self) -> Result<usize> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let digits = core::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| ParioError::InvalidHeader)?;
        let value = digits.parse().map_err(|_| ParioError::InvalidHeader)?;
        // Python 2 long suffix
        if self.bytes.get(self.pos) == Some(&b'L') {
            self.pos += 1;
        }
        Ok(value)
    }

    fn keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        if self.bytes[self.pos..].starts_with(word.as_bytes()) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Result<Value> {
        match self.peek() {
            Some(b'\'' | b'"') => self.string().map(Value::Str),
            Some(b'(') => {
                self.pos += 1;
                let mut items = Vec::new();
                while !self.eat(b')') {
                    items.push(self.integer()?);
                    if !self.eat(b',') {
                        self.expect(b')')?;
                        break;
                    }
                }
                Ok(Value::Tuple(items))
            }
            _ if self.keyword("True") => Ok(Value::Bool(true)),
            _ if self.keyword("False") => Ok(Value::Bool(false)),
            _ => Err(ParioError::InvalidHeader),
        }
    }
}

fn parse_dict(text: &str) -> Result<Fields> {
    let mut cursor = Cursor {
        bytes: text.as_bytes(),
        pos: 0,
    };
    let mut descr = None;
    let mut fortran_order = None;
    let mut shape = None;

    cursor.expect(b'{')?;
    while !cursor.eat(b'}') {
        let key = cursor.string()?;
        cursor.expect(b':')?;
        match (key.as_str(), cursor.value()?) {
            ("descr", Value::Str(s)) => descr = Some(s),
            ("fortran_order", Value::Bool(b)) => fortran_order = Some(b),
            ("shape", Value::Tuple(t)) => shape = Some(t),
            _ => return Err(ParioError::InvalidHeader),
        }
        if !cursor.eat(b',') {
            cursor.expect(b'}')?;
            break;
        }
    }
    if cursor.peek().is_some() {
        return Err(ParioError::InvalidHeader);
    }

    match (descr, fortran_order, shape) {
        (Some(descr), Some(fortran_order), Some(shape)) => Ok(Fields {
            descr,
            fortran_order,
            shape,
        }),
        _ => Err(ParioError::InvalidHeader),
    }
}
