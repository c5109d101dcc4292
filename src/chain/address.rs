use std::fmt;

use bech32::{Bech32, Hrp};
use sha3::{Digest, Keccak256};

use crate::error::AddressError;

pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account address, shared by the bech32 and hex renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let raw: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(raw))
    }

    /// Reads an address out of a 32-byte log word: the word is right-padded
    /// with zeros to 32 bytes and the trailing 20 bytes are kept.
    pub fn from_word(bytes: &[u8]) -> Self {
        let mut word = bytes.to_vec();
        if word.len() < 32 {
            word.resize(32, 0);
        }
        let mut raw = [0u8; ADDRESS_LEN];
        raw.copy_from_slice(&word[word.len() - ADDRESS_LEN..]);
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// EIP-55 mixed-case checksum encoding. This is the canonical display form.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

/// Converts between the chain's two address encodings.
///
/// The account prefix is explicit configuration handed to whoever needs to
/// read addresses; nothing here is process-global.
#[derive(Debug, Clone)]
pub struct AddressCodec {
    hrp: Hrp,
}

impl AddressCodec {
    pub fn new(account_prefix: &str) -> Result<Self, AddressError> {
        let hrp = Hrp::parse(account_prefix)
            .map_err(|_| AddressError::Unrecognized(account_prefix.to_string()))?;
        Ok(Self { hrp })
    }

    pub fn prefix(&self) -> &str {
        self.hrp.as_str()
    }

    /// Accepts either `<prefix>1...` bech32 or 40-digit hex (with or without `0x`).
    pub fn parse(&self, address: &str) -> Result<Address, AddressError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AddressError::Empty);
        }

        if let Ok((hrp, data)) = bech32::decode(address) {
            let found = hrp.as_str().to_ascii_lowercase();
            if found != self.hrp.as_str().to_ascii_lowercase() {
                return Err(AddressError::PrefixMismatch {
                    expected: self.hrp.as_str().to_string(),
                    found,
                });
            }
            return Address::from_slice(&data);
        }

        parse_hex(address)
    }

    /// Parse then render in canonical (checksummed hex) form.
    pub fn normalize(&self, address: &str) -> Result<String, AddressError> {
        Ok(self.parse(address)?.to_checksum())
    }

    pub fn to_bech32(&self, address: &Address) -> Result<String, AddressError> {
        bech32::encode::<Bech32>(self.hrp, address.as_bytes())
            .map_err(|e| AddressError::Unrecognized(e.to_string()))
    }
}

fn parse_hex(address: &str) -> Result<Address, AddressError> {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);

    if digits.len() != ADDRESS_LEN * 2 {
        return Err(AddressError::Unrecognized(address.to_string()));
    }

    let bytes = hex::decode(digits).map_err(|_| AddressError::Unrecognized(address.to_string()))?;
    Address::from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> AddressCodec {
        AddressCodec::new("aioz").unwrap()
    }

    #[test]
    fn test_checksum_vectors() {
        let vectors = [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ];

        for expected in vectors {
            let lower = expected.to_lowercase();
            assert_eq!(codec().normalize(&lower).unwrap(), expected);
            assert_eq!(codec().normalize(&lower[2..]).unwrap(), expected);
        }
    }

    #[test]
    fn test_bech32_and_hex_agree() {
        let codec = codec();
        let addr = codec.parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        let human = codec.to_bech32(&addr).unwrap();

        assert!(human.starts_with("aioz1"));
        assert_eq!(codec.parse(&human).unwrap(), addr);
        assert_eq!(
            codec.normalize(&human).unwrap(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn test_foreign_prefix_rejected() {
        let addr = codec().parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        let cosmos = AddressCodec::new("cosmos").unwrap().to_bech32(&addr).unwrap();

        assert_eq!(
            codec().parse(&cosmos),
            Err(AddressError::PrefixMismatch {
                expected: "aioz".to_string(),
                found: "cosmos".to_string(),
            })
        );
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(codec().parse("   "), Err(AddressError::Empty));
        assert!(matches!(codec().parse("0x1234"), Err(AddressError::Unrecognized(_))));
        assert!(matches!(
            codec().parse("0xzzzzb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            Err(AddressError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_from_word_takes_trailing_bytes() {
        let mut word = [0u8; 32];
        word[31] = 0xc1;
        let addr = Address::from_word(&word);
        assert_eq!(addr.as_bytes()[19], 0xc1);

        // short topics are padded on the right before the trailing 20 bytes are read
        let short = Address::from_word(&[0xab]);
        assert_eq!(short.as_bytes(), &[0u8; 20]);
    }
}
