//! Canonical encoding of signed parameters.
//!
//! Every field is written with a type tag and, for variable-length data, a
//! big-endian length prefix, so two different parameter lists can never
//! produce the same byte stream.

use coffer_common::{AccountId, Amount};

use crate::hash::{sha256, Hash};

const TAG_BYTES: u8 = 0x01;
const TAG_U64: u8 = 0x02;
const TAG_U128: u8 = 0x03;
const TAG_BOOL: u8 = 0x04;
const TAG_ACCOUNT: u8 = 0x05;
const TAG_NONE: u8 = 0x06;

#[derive(Debug, Clone)]
pub struct CanonicalEncoder {
    buf: Vec<u8>,
}

impl CanonicalEncoder {
    /// Start an encoding under a domain separator
    pub fn new(domain: &str) -> Self {
        let mut encoder = Self { buf: Vec::with_capacity(256) };
        encoder.put_str(domain);
        encoder
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.push(TAG_BYTES);
        self.buf.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn put_str(&mut self, s: &str) -> &mut Self {
        self.put_bytes(s.as_bytes())
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.push(TAG_U64);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_amount(&mut self, value: Amount) -> &mut Self {
        self.buf.push(TAG_U128);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(TAG_BOOL);
        self.buf.push(value as u8);
        self
    }

    pub fn put_account(&mut self, account: &AccountId) -> &mut Self {
        self.buf.push(TAG_ACCOUNT);
        self.buf.extend_from_slice(account.as_bytes());
        self
    }

    /// Optional byte field; `None` and empty bytes encode differently
    pub fn put_opt_bytes(&mut self, bytes: Option<&[u8]>) -> &mut Self {
        match bytes {
            Some(b) => self.put_bytes(b),
            None => {
                self.buf.push(TAG_NONE);
                self
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn digest(&self) -> Hash {
        sha256(&self.buf)
    }
}
