//! Docker daemon availability probe.
//!
//! Container-backed suites call [`available`] up front and skip with a
//! message when no daemon is reachable, so `cargo test` stays green on
//! machines without Docker.

use std::path::Path;
use std::process::Command;

/// Returns `true` if a Docker daemon is reachable for integration tests.
#[must_use]
pub fn available() -> bool {
    available_with_host(std::env::var("DOCKER_HOST").ok())
}

fn available_with_host(host: Option<String>) -> bool {
    if let Some(host) = host {
        if let Some(path) = host.strip_prefix("unix://") {
            return Path::new(path).exists();
        }
        // tcp:// and other remote schemes are taken at face value.
        return true;
    }

    Path::new("/var/run/docker.sock").exists()
        || Command::new("docker")
            .args(["info"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_unix_socket_is_unavailable() {
        assert!(!available_with_host(Some(
            "unix:///definitely/missing.sock".into()
        )));
    }

    #[test]
    fn tcp_host_is_trusted() {
        assert!(available_with_host(Some("tcp://127.0.0.1:2375".into())));
    }

    #[test]
    fn probe_matches_env_override() {
        let env_value = std::env::var("DOCKER_HOST").ok();
        let expected = available_with_host(env_value);
        assert_eq!(available(), expected);
    }

    #[test]
    fn default_probe_path_executes() {
        let _ = available_with_host(None);
    }
}
