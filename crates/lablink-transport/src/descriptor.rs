use crate::error::{Result, TransportError};

/// Split a target descriptor into host and optional port.
///
/// Accepted forms: `host`, `host:port`, `[v6addr]`, `[v6addr]:port`, and a
/// bare IPv6 address (two or more colons, no brackets). The port stays
/// optional so a driver can fill in its protocol default later.
pub fn split_host_port(descriptor: &str) -> Result<(String, Option<u16>)> {
    let invalid = || TransportError::InvalidDescriptor {
        descriptor: descriptor.to_string(),
    };

    if descriptor.is_empty() {
        return Err(invalid());
    }

    if let Some(rest) = descriptor.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        return match tail {
            "" => Ok((host.to_string(), None)),
            _ => {
                let port = tail.strip_prefix(':').ok_or_else(invalid)?;
                Ok((host.to_string(), Some(port.parse().map_err(|_| invalid())?)))
            }
        };
    }

    match descriptor.bytes().filter(|b| *b == b':').count() {
        0 => Ok((descriptor.to_string(), None)),
        1 => {
            let (host, port) = descriptor.split_once(':').ok_or_else(invalid)?;
            if host.is_empty() {
                return Err(invalid());
            }
            Ok((host.to_string(), Some(port.parse().map_err(|_| invalid())?)))
        }
        // Bare IPv6 address.
        _ => Ok((descriptor.to_string(), None)),
    }
}
