//! Expands address blocks into concrete candidates
//!
//! IPv4 blocks are walked one /24 at a time: sparse sampling picks one random
//! last octet per /24, exhaustive sampling emits the whole last-octet range.
//! IPv6 blocks are always sampled sparsely by randomising the two low bytes
//! and then stepping the higher bytes forward by a random amount with carry.

use super::AddressBlock;
use crate::models::Candidate;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// How many addresses to take from each IPv4 /24 partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SamplingPolicy {
    /// One random address per /24
    #[default]
    Sparse,
    /// Every address in the block's last-octet range, per /24
    Exhaustive,
}

impl SamplingPolicy {
    pub fn from_all_ip(all_ip: bool) -> Self {
        if all_ip {
            Self::Exhaustive
        } else {
            Self::Sparse
        }
    }
}

/// Produces candidates that always lie inside the block they came from
pub struct CandidateSampler {
    policy: SamplingPolicy,
    port: u16,
    rng: StdRng,
}

impl CandidateSampler {
    /// Sampler seeded from the OS entropy source
    pub fn new(policy: SamplingPolicy, port: u16) -> Self {
        Self {
            policy,
            port,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sampler for reproducible runs and tests
    pub fn with_seed(policy: SamplingPolicy, port: u16, seed: u64) -> Self {
        Self {
            policy,
            port,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    /// Expand one block into candidates
    pub fn sample(&mut self, block: &AddressBlock) -> Vec<Candidate> {
        if block.is_single_host() {
            return vec![Candidate::new(block.first_address(), self.port)];
        }

        let addresses = match block.net() {
            IpNet::V4(net) => self.sample_v4(net),
            IpNet::V6(net) => self.sample_v6(net),
        };

        addresses
            .into_iter()
            .map(|address| Candidate::new(address, self.port))
            .collect()
    }

    fn sample_v4(&mut self, net: &Ipv4Net) -> Vec<IpAddr> {
        let mask = net.netmask().octets()[3];
        let host_bits = 32 - u32::from(net.prefix_len());
        let total = if host_bits >= 32 { u32::MAX } else { (1u32 << host_bits) - 1 };
        let hosts = total.min(255) as u8;

        let mut cursor = u32::from(net.network());
        let min_octet = (cursor as u8) & mask;
        let mut addresses = Vec::new();

        while net.contains(&Ipv4Addr::from(cursor)) {
            let partition = cursor & 0xFFFF_FF00;
            match self.policy {
                SamplingPolicy::Exhaustive => {
                    for offset in 0..=hosts {
                        let last = u32::from(min_octet.wrapping_add(offset));
                        addresses.push(IpAddr::V4(Ipv4Addr::from(partition | last)));
                    }
                }
                SamplingPolicy::Sparse => {
                    let last = u32::from(min_octet + self.rng.random_range(0..hosts));
                    addresses.push(IpAddr::V4(Ipv4Addr::from(partition | last)));
                }
            }

            // next /24, stop at the top of the address space
            cursor = match cursor.checked_add(256) {
                Some(next) => next,
                None => break,
            };
        }

        addresses
    }

    fn sample_v6(&mut self, net: &Ipv6Net) -> Vec<IpAddr> {
        let mask = net.netmask().octets();
        let mut cursor = net.network().octets();
        let mut addresses = Vec::new();

        while net.contains(&Ipv6Addr::from(cursor)) {
            for i in [15, 14] {
                let random: u8 = self.rng.random_range(0..255);
                cursor[i] = (cursor[i] & mask[i]) | (random & !mask[i]);
            }
            addresses.push(IpAddr::V6(Ipv6Addr::from(cursor)));

            // random add with carry, from byte 13 towards byte 0
            let mut overflowed = true;
            for i in (0..=13).rev() {
                let previous = cursor[i];
                cursor[i] = cursor[i].wrapping_add(self.rng.random_range(0..255));
                if cursor[i] >= previous {
                    overflowed = false;
                    break;
                }
            }
            if overflowed {
                break;
            }
        }

        addresses
    }
}
