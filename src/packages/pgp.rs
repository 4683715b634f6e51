// src/packages/pgp.rs

//! Summary of an OpenPGP signature packet stored in a header
//!
//! Only the fields rpm itself prints are extracted: public key and hash
//! algorithm, key ID and creation time. The signature is not verified.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Cursor, ErrorKind, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgpSignature {
    pub pub_key_algo: u8,
    pub hash_algo: u8,
    pub key_id: [u8; 8],
    /// Creation time in seconds since the epoch
    pub date: i32,
}

impl PgpSignature {
    /// Parse the leading fields of a signature packet
    ///
    /// The packet tag byte is ignored. The signature type and version bytes
    /// select one of three layouts; any other signature type is rejected.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::read(&mut Cursor::new(data)).map_err(|e| match e {
            Error::Io(io) if io.kind() == ErrorKind::UnexpectedEof => Error::Format(format!(
                "PGP signature of {} bytes is truncated",
                data.len()
            )),
            other => other,
        })
    }

    fn read(r: &mut Cursor<&[u8]>) -> Result<Self> {
        let _tag = r.read_u8()?;
        let signature_type = r.read_u8()?;
        let version = r.read_u8()?;

        match (signature_type, version) {
            (0x01, 0x1c) => {
                skip(r, 2)?;
                let pub_key_algo = r.read_u8()?;
                let hash_algo = r.read_u8()?;
                skip(r, 4)?;
                let date = r.read_i32::<BigEndian>()?;
                skip(r, 4)?;
                let key_id = read_key_id(r)?;
                Ok(Self {
                    pub_key_algo,
                    hash_algo,
                    key_id,
                    date,
                })
            }
            (0x02, 0x33) => {
                skip(r, 2)?;
                let pub_key_algo = r.read_u8()?;
                let hash_algo = r.read_u8()?;
                skip(r, 17)?;
                let key_id = read_key_id(r)?;
                skip(r, 2)?;
                let date = r.read_i32::<BigEndian>()?;
                Ok(Self {
                    pub_key_algo,
                    hash_algo,
                    key_id,
                    date,
                })
            }
            (0x01 | 0x02, _) => {
                skip(r, 3)?;
                let date = r.read_i32::<BigEndian>()?;
                let key_id = read_key_id(r)?;
                let pub_key_algo = r.read_u8()?;
                let hash_algo = r.read_u8()?;
                Ok(Self {
                    pub_key_algo,
                    hash_algo,
                    key_id,
                    date,
                })
            }
            _ => Err(Error::UnsupportedValue(format!(
                "PGP signature type {:#04x} (version {:#04x})",
                signature_type, version
            ))),
        }
    }

    pub fn pub_key_algorithm(&self) -> &'static str {
        match self.pub_key_algo {
            1 => "RSA",
            2 => "RSA (Encrypt-Only)",
            3 => "RSA (Sign-Only)",
            16 => "Elgamal",
            17 => "DSA",
            18 => "ECDH",
            19 => "ECDSA",
            22 => "EdDSA",
            _ => "Unknown",
        }
    }

    pub fn hash_algorithm(&self) -> &'static str {
        match self.hash_algo {
            1 => "MD5",
            2 => "SHA1",
            3 => "RIPEMD160",
            8 => "SHA256",
            9 => "SHA384",
            10 => "SHA512",
            11 => "SHA224",
            _ => "Unknown",
        }
    }

    pub fn key_id_hex(&self) -> String {
        self.key_id.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Creation time in the `date(1)` layout rpm prints, in UTC
    pub fn formatted_date(&self) -> String {
        DateTime::from_timestamp(i64::from(self.date), 0)
            .map(|date| date.format("%a %b %e %H:%M:%S %Y").to_string())
            .unwrap_or_else(|| self.date.to_string())
    }
}

impl fmt::Display for PgpSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}, {}, Key ID {}",
            self.pub_key_algorithm(),
            self.hash_algorithm(),
            self.formatted_date(),
            self.key_id_hex()
        )
    }
}

fn skip(r: &mut Cursor<&[u8]>, n: usize) -> Result<()> {
    let mut buf = [0u8; 32];
    r.read_exact(&mut buf[..n])?;
    Ok(())
}

fn read_key_id(r: &mut Cursor<&[u8]>) -> Result<[u8; 8]> {
    let mut key_id = [0u8; 8];
    r.read_exact(&mut key_id)?;
    Ok(key_id)
}
