use anyhow::Result;

pub const DEFAULT_FTP_PORT: u16 = 21;

/// Remote endpoint resolved from the `ftpaddr` config value.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// `host:port` form accepted by `ToSocketAddrs`.
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.socket_addr())
    }
}

/// Parse `host[:port]`, tolerating an `ftp://` prefix and a trailing `/`.
/// Bracketed IPv6 (`[::1]:2121`) is supported; the port defaults to 21.
pub fn parse_endpoint(input: &str) -> Result<Endpoint> {
    let s = input.trim();
    let s = s.strip_prefix("ftp://").unwrap_or(s);
    let s = s.trim_end_matches('/');
    if s.is_empty() {
        return Err(anyhow::anyhow!("empty address"));
    }

    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) =
            rest.split_once(']').ok_or_else(|| anyhow::anyhow!("unclosed '[' in {}", input))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => parse_port(p)?,
            None if tail.is_empty() => DEFAULT_FTP_PORT,
            None => return Err(anyhow::anyhow!("unexpected text after ']': {}", tail)),
        };
        if host.is_empty() {
            return Err(anyhow::anyhow!("empty host"));
        }
        return Ok(Endpoint { host: host.to_string(), port });
    }

    let (host, port) = match s.rsplit_once(':') {
        Some((h, p)) => (h, parse_port(p)?),
        None => (s, DEFAULT_FTP_PORT),
    };
    if host.is_empty() {
        return Err(anyhow::anyhow!("empty host"));
    }
    if host.contains(':') {
        return Err(anyhow::anyhow!("IPv6 hosts must be bracketed: {}", input));
    }
    Ok(Endpoint { host: host.to_string(), port })
}

fn parse_port(p: &str) -> Result<u16> {
    match p.parse::<u16>() {
        Ok(0) | Err(_) => Err(anyhow::anyhow!("invalid port: {}", p)),
        Ok(n) => Ok(n),
    }
}
