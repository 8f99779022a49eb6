use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

pub const TX_KEY_LENGTH: usize = 32;

// --- NewTypes ---

/// Fingerprint of a transaction: the SHA-256 digest of its raw bytes.
/// Two transactions with equal bytes have equal keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TxKey(pub [u8; TX_KEY_LENGTH]);

impl fmt::Debug for TxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxKey({})", hex::encode(self.0))
    }
}

impl fmt::Display for TxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for TxKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for TxKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        if bytes.len() != TX_KEY_LENGTH {
            return Err(serde::de::Error::custom("Invalid tx key length"));
        }
        let mut arr = [0u8; TX_KEY_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(TxKey(arr))
    }
}

/// Identifier of the peer a transaction arrived from. Zero is reserved for
/// local submissions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PeerId(pub u16);

impl PeerId {
    pub const LOCAL: PeerId = PeerId(0);

    pub fn is_local(&self) -> bool {
        *self == Self::LOCAL
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Domain Structs ---

/// An opaque candidate transaction. The mempool never interprets the bytes;
/// validity is the application's business.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Tx(#[serde(with = "hex_serde")] pub Vec<u8>);

impl Tx {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Tx(bytes.into())
    }

    /// Computes the fingerprint of this transaction.
    pub fn key(&self) -> TxKey {
        let digest = Sha256::digest(&self.0);
        let mut arr = [0u8; TX_KEY_LENGTH];
        arr.copy_from_slice(&digest);
        TxKey(arr)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tx({})", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for Tx {
    fn from(bytes: Vec<u8>) -> Self {
        Tx(bytes)
    }
}

impl From<&[u8]> for Tx {
    fn from(bytes: &[u8]) -> Self {
        Tx(bytes.to_vec())
    }
}

/// Origin metadata attached to a single CheckTx submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxInfo {
    /// Peer that delivered the transaction; `PeerId::LOCAL` for client
    /// submissions.
    pub sender: PeerId,
}

impl TxInfo {
    pub fn from_peer(sender: PeerId) -> Self {
        Self { sender }
    }
}

// --- Helper Modules for Serde ---

mod hex_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_bytes_equal_keys() {
        let a = Tx::new(vec![0x00, 0x01, 0x02]);
        let b = Tx::new(vec![0x00, 0x01, 0x02]);
        let c = Tx::new(vec![0x00, 0x01, 0x03]);

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_tx_key_hex_roundtrip() {
        let key = Tx::new(vec![0xab; 8]).key();
        let json = serde_json::to_string(&key).unwrap();
        let back: TxKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
        assert_eq!(key.to_string(), hex::encode(key.0));
    }

    #[test]
    fn test_local_peer() {
        assert!(PeerId::LOCAL.is_local());
        assert!(!PeerId(7).is_local());
        assert_eq!(TxInfo::default().sender, PeerId::LOCAL);
    }
}
