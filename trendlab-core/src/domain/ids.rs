//! ID types: sequential counters for in-process objects, BLAKE3 hashes for
//! deterministic cross-run identity (config fingerprints, dataset fingerprints).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! seq_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

seq_id!(RunId);
seq_id!(SignalId);
seq_id!(AnalysisId);
seq_id!(BacktestId);
seq_id!(TradeId);

/// Monotonically increasing ID generator. Not thread-safe by itself; callers
/// that fan out across threads own one generator per worker or guard it with
/// a mutex, per §5's "exactly one writer" discipline for shared counters.
#[derive(Debug, Default)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn next_run_id(&mut self) -> RunId {
        let id = RunId(self.next);
        self.next += 1;
        id
    }

    pub fn next_signal_id(&mut self) -> SignalId {
        let id = SignalId(self.next);
        self.next += 1;
        id
    }

    pub fn next_trade_id(&mut self) -> TradeId {
        let id = TradeId(self.next);
        self.next += 1;
        id
    }
}

/// 32-byte BLAKE3 hash wrapper, hex-displayed and hex-serialized.
macro_rules! hash_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn from_bytes(data: &[u8]) -> Self {
                Self(*blake3::hash(data).as_bytes())
            }

            pub fn as_hex(&self) -> String {
                self.0.iter().map(|b| format!("{b:02x}")).collect()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.as_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.as_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&self.as_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let hex = String::deserialize(d)?;
                let bytes: Vec<u8> = (0..hex.len())
                    .step_by(2)
                    .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
                    .collect::<Result<_, _>>()
                    .map_err(serde::de::Error::custom)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 bytes"))?;
                Ok(Self(arr))
            }
        }
    };
}

hash_id!(ConfigHash);
hash_id!(DatasetHash);
hash_id!(FullHash);
