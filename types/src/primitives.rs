use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, Write};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse a 64-character hex string into 32 bytes.
fn parse_hex_32(s: &str) -> Option<[u8; 32]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != 64 {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out[i] = ((hi << 4) | lo) as u8;
    }
    Some(out)
}

fn fmt_hex_32(bytes: &[u8; 32], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

macro_rules! fixed_32 {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn from_hex(s: &str) -> Option<Self> {
                parse_hex_32(s).map(Self)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt_hex_32(&self.0, f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "("))?;
                fmt_hex_32(&self.0, f)?;
                write!(f, ")")
            }
        }

        impl Write for $name {
            fn write(&self, writer: &mut impl BufMut) {
                writer.put_slice(&self.0);
            }
        }

        impl Read for $name {
            type Cfg = ();

            fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
                if reader.remaining() < 32 {
                    return Err(Error::EndOfBuffer);
                }
                let mut bytes = [0u8; 32];
                reader.copy_to_slice(&mut bytes);
                Ok(Self(bytes))
            }
        }

        impl FixedSize for $name {
            const SIZE: usize = 32;
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s)
                    .ok_or_else(|| serde::de::Error::custom("expected 32-byte hex string"))
            }
        }
    };
}

fixed_32!(
    Identity,
    "Wallet address: the unit of accounting for tickets, sessions, and rewards."
);
fixed_32!(
    SessionToken,
    "One-time 256-bit credential binding an authorized play to its submission."
);
fixed_32!(
    EventId,
    "Digest identifying one revenue-share trigger for idempotent crediting."
);
