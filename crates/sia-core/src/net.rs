use std::{fmt::Display, net::Ipv4Addr, sync::LazyLock};

use regex::Regex;

static IPV4_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+){3}").expect("static ipv4 pattern"));

/// Address blocks treated as internal: `(network, prefix length)`.
const INTERNAL_BLOCKS: [(u32, u32); 6] = [
    (0x0A00_0000, 8),  // 10.0.0.0/8
    (0xAC10_0000, 12), // 172.16.0.0/12
    (0xC0A8_0000, 16), // 192.168.0.0/16
    (0x7F00_0000, 8),  // 127.0.0.0/8
    (0xA9FE_0000, 16), // 169.254.0.0/16
    (0xE000_0000, 8),  // 224.0.0.0/8
];

/// Dotted-quad IPv4 address as an integer; `0` for anything unparsable.
pub fn ip_into_int(ip: &str) -> u32 {
    ip.trim().parse::<Ipv4Addr>().map(u32::from).unwrap_or(0)
}

/// `true` for private, loopback, link-local and the 224/8 multicast block.
pub fn is_internal_ip(ip: &str) -> bool {
    let ip = ip_into_int(ip);
    INTERNAL_BLOCKS
        .iter()
        .any(|&(net, prefix)| ip >> (32 - prefix) == net >> (32 - prefix))
}

/// First IPv4-looking substring of `text`.
pub fn match_ip(text: &str) -> Option<&str> {
    IPV4_LIKE.find(text).map(|m| m.as_str())
}

/// Build `protocol://host:port/path[?k=v&...]`.
///
/// Query values are inserted verbatim, without percent-encoding.
pub fn parse_url<K, V>(host: &str, path: &str, port: u16, protocol: &str, query: &[(K, V)]) -> String
where
    K: Display,
    V: Display,
{
    let mut url = format!("{protocol}://{host}:{port}{path}");
    for (i, (key, value)) in query.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(&format!("{key}={value}"));
    }
    url
}

/// Builder over [`parse_url`] with the usual defaults (`http`, port 80, path `/`).
#[derive(Debug, Clone)]
pub struct UrlParts {
    host: String,
    path: String,
    port: u16,
    protocol: String,
    query: Vec<(String, String)>,
}

impl UrlParts {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: "/".to_string(),
            port: 80,
            protocol: "http".to_string(),
            query: Vec::new(),
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn query(mut self, key: impl Display, value: impl Display) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(&self) -> String {
        parse_url(&self.host, &self.path, self.port, &self.protocol, &self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_to_int() {
        assert_eq!(ip_into_int("10.2.83.162"), 0x0A02_53A2);
        assert_eq!(ip_into_int("0.0.0.1"), 1);
        assert_eq!(ip_into_int(" 255.255.255.255 "), u32::MAX);
    }

    #[test]
    fn malformed_ip_is_zero() {
        assert_eq!(ip_into_int(""), 0);
        assert_eq!(ip_into_int("10.2.83"), 0);
        assert_eq!(ip_into_int("300.1.1.1"), 0);
        assert_eq!(ip_into_int("a.b.c.d"), 0);
    }

    #[test]
    fn internal_ranges() {
        for ip in [
            "10.2.83.162",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.1",
            "127.0.0.1",
            "169.254.10.10",
            "224.0.0.251",
        ] {
            assert!(is_internal_ip(ip), "{ip} should be internal");
        }
    }

    #[test]
    fn external_ranges() {
        for ip in ["8.8.8.8", "172.32.0.1", "172.15.255.255", "192.169.0.1", "225.0.0.1", "garbage"] {
            assert!(!is_internal_ip(ip), "{ip} should be external");
        }
    }

    #[test]
    fn match_ip_finds_first_address() {
        assert_eq!(match_ip("inet 10.0.0.5/24 brd 10.0.0.255"), Some("10.0.0.5"));
        assert_eq!(match_ip("no address here"), None);
    }

    #[test]
    fn url_without_query() {
        let url = parse_url::<&str, &str>("cmdb", "/", 80, "http", &[]);
        assert_eq!(url, "http://cmdb:80/");
    }

    #[test]
    fn url_with_query() {
        let url = UrlParts::new("10.0.0.1")
            .path("/v1/hosts")
            .port(8092)
            .protocol("https")
            .query("page", 2)
            .query("name", "web")
            .build();
        assert_eq!(url, "https://10.0.0.1:8092/v1/hosts?page=2&name=web");
    }
}
