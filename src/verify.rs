// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Postback authenticity primitives.
//!
//! Three mechanisms, combined per provider by the adapters:
//!
//! - shared-secret query parameter, compared in constant time
//! - recomputed digest of request fields (md5 for CPX, sha256 for TimeWall),
//!   compared case-insensitively in constant time
//! - source-IP allowlist, after canonicalizing IPv4-mapped IPv6 addresses
//!
//! A provider with no secret configured skips verification entirely
//! (fail-open); `PostbackConfig` warns about that state at startup.

use std::net::IpAddr;

use md5::Md5;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time string equality. Length mismatches return false without
/// leaking where the strings diverge.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).unwrap_u8() == 1
}

/// Compare a provider-supplied hex digest against the expected one.
///
/// Providers are inconsistent about digest casing, so both sides are
/// lowercased before the constant-time comparison.
pub fn hash_matches(provided: &str, expected_hex: &str) -> bool {
    let provided = provided.trim().to_ascii_lowercase();
    let expected = expected_hex.to_ascii_lowercase();
    constant_time_eq(&provided, &expected)
}

/// Hex-encoded md5 of the input (CPX signs `<trans_id>-<secret>` this way).
pub fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hex-encoded sha256 of the input (TimeWall signs `<userID><revenue><key>`).
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonicalize an address so IPv4-mapped IPv6 (`::ffff:a.b.c.d`) compares
/// equal to its plain IPv4 form.
pub fn normalize_ip(ip: IpAddr) -> IpAddr {
    ip.to_canonical()
}

/// Whether a remote address is present in the allowlist.
///
/// An empty allowlist means the check is not configured and passes; callers
/// decide whether that state deserves a startup warning.
pub fn ip_allowed(remote: IpAddr, allowlist: &[IpAddr]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let remote = normalize_ip(remote);
    allowlist.iter().any(|ip| normalize_ip(*ip) == remote)
}
