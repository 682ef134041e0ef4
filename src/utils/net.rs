use std::collections::BTreeSet;
use std::net::IpAddr;

/// Parses an address, folding IPv4-mapped IPv6 (`::ffff:a.b.c.d`) to IPv4.
pub fn normalize_ip(raw: &str) -> Option<IpAddr> {
    let ip: IpAddr = raw.trim().parse().ok()?;
    Some(match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    })
}

/// Membership test against an office allow-list.
pub fn is_whitelisted(whitelist: &BTreeSet<String>, ip: &str) -> bool {
    let Some(candidate) = normalize_ip(ip) else {
        return false;
    };
    whitelist
        .iter()
        .filter_map(|entry| normalize_ip(entry))
        .any(|allowed| allowed == candidate)
}
