//! Minimal ABI encoding for the prediction contract calls.
//!
//! Only the argument kinds the contract surface needs are supported: unsigned
//! integers and strings on the way in, 32-byte static words on the way out.

use alloy_core::primitives::{Address, U256, keccak256};
use anyhow::{Context, Result};

pub const OWNER: &str = "owner()";
pub const GET_TOTAL_EVENTS: &str = "getTotalEvents()";
pub const CREATE_EVENT: &str = "createEvent(string,string,uint256)";
pub const GET_CURRENT_ROUND_INFO: &str = "getCurrentRoundInfo(uint256)";
pub const IS_GUESS_TIME_ACTIVE: &str = "isGuessTimeActive(uint256)";
pub const GET_PREDICTION_STATS: &str = "getPredictionStats(uint256)";

const WORD: usize = 32;

/// A call argument.
#[derive(Debug, Clone, Copy)]
pub enum Token<'a> {
    Uint(u64),
    Str(&'a str),
}

/// First four bytes of the keccak256 hash of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// ABI-encode a call: selector, head words, then the dynamic tail.
pub fn encode_call(signature: &str, args: &[Token<'_>]) -> Vec<u8> {
    let mut head = Vec::with_capacity(args.len() * WORD);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Str(value) => {
                // Dynamic values are referenced by their offset from the start of the arguments.
                let offset = args.len() * WORD + tail.len();
                head.extend_from_slice(&uint_word(offset as u64));
                tail.extend_from_slice(&uint_word(value.len() as u64));
                tail.extend_from_slice(value.as_bytes());
                tail.resize(tail.len() + padding(value.len()), 0);
            }
        }
    }

    let mut data = selector(signature).to_vec();
    data.extend(head);
    data.extend(tail);
    data
}

fn uint_word(value: u64) -> [u8; WORD] {
    U256::from(value).to_be_bytes::<WORD>()
}

fn padding(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}

/// The `index`-th 32-byte word of a return payload.
fn word(data: &[u8], index: usize) -> Result<&[u8]> {
    let start = index * WORD;
    data.get(start..start + WORD).with_context(|| {
        format!(
            "Return data too short: expected at least {} bytes, got {}",
            start + WORD,
            data.len()
        )
    })
}

/// Decode a `uint256` return word that must fit in a u64.
pub fn decode_u64(data: &[u8], index: usize) -> Result<u64> {
    let word = word(data, index)?;
    if word[..24].iter().any(|b| *b != 0) {
        anyhow::bail!("Return word {} overflows u64", index);
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(bytes))
}

/// Decode a `bool` return word.
pub fn decode_bool(data: &[u8], index: usize) -> Result<bool> {
    let word = word(data, index)?;
    if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
        anyhow::bail!("Return word {} is not a valid bool", index);
    }
    Ok(word[31] == 1)
}

/// Decode an `address` return word.
pub fn decode_address(data: &[u8], index: usize) -> Result<Address> {
    let word = word(data, index)?;
    if word[..12].iter().any(|b| *b != 0) {
        anyhow::bail!("Return word {} is not a valid address", index);
    }
    Ok(Address::from_slice(&word[12..]))
}
