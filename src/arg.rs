//! Command line arguments parsing.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use cidrplan::store::InvalidRole;
use cidrplan::{BaseBlock, Cidr4, Role};
use clap::Parser;
use std::str::FromStr;

/// Error type for `--place` values
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Cidr(#[from] cidrplan::Error),
    #[error(transparent)]
    Role(#[from] InvalidRole),
}

/// A subnet to place, written as `CIDR[:ROLE]`
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Placement {
    pub cidr: Cidr4,
    pub role: Role,
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cidr, role) = match s.split_once(':') {
            Some((cidr, role)) => (cidr, role.parse()?),
            None => (s, Role::Public),
        };
        Ok(Self {
            cidr: cidr.parse()?,
            role,
        })
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CidrPlan {
    /// Base block to partition (/16 or finer, host bits are cleared)
    pub base: BaseBlock,
    /// Subnet to place, as CIDR[:ROLE] with ROLE one of public, private, database
    ///
    /// May be given several times; subnets are placed in order and the first
    /// one that does not fit aborts the run.
    #[arg(short = 'p', long = "place")]
    pub placements: Vec<Placement>,
    /// List every free position for subnets of this prefix length
    #[arg(short = 'f', long, value_parser = clap::value_parser!(u8).range(0..=32))]
    pub free: Option<u8>,
    /// Print the subnet sizes that fit in the base block
    #[arg(short = 'c', long)]
    pub catalog: bool,
    /// Width in pixels of the bar used to report slot geometry
    #[arg(short = 'w', long, default_value = "800")]
    pub bar_width: f64,
    /// Print a JSON document instead of tables
    #[arg(short = 'j', long)]
    pub json: bool,
    /// Verbose mode
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
