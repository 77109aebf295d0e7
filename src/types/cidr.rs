// ABOUTME: IPv4 CIDR range parsing for connector address ranges.
// ABOUTME: Rejects host bits set outside the prefix.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCidrError {
    #[error("address range must be in ADDRESS/PREFIX form: {0}")]
    MissingPrefix(String),

    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("invalid prefix length: {0}")]
    InvalidPrefix(String),

    #[error("address {address} has bits set outside the /{prefix} prefix")]
    HostBitsSet { address: Ipv4Addr, prefix: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn parse(input: &str) -> Result<Self, ParseCidrError> {
        let input = input.trim();
        let (addr, prefix) = input
            .split_once('/')
            .ok_or_else(|| ParseCidrError::MissingPrefix(input.to_string()))?;

        let address = Ipv4Addr::from_str(addr)
            .map_err(|_| ParseCidrError::InvalidAddress(addr.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| ParseCidrError::InvalidPrefix(prefix.to_string()))?;

        let mask = if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        };
        if u32::from(address) & !mask != 0 {
            return Err(ParseCidrError::HostBitsSet { address, prefix });
        }

        Ok(Self { address, prefix })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix
    }
}

impl FromStr for Ipv4Cidr {
    type Err = ParseCidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}
