use tracing_subscriber::EnvFilter;

/// Installs the global compact subscriber on stderr, stdout carries command
/// output. `RUST_LOG` wins over `env_filter`.
pub fn set_log(env_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .init();
}

/// Filter directive that raises the workspace crates to `level` and keeps
/// dependencies at `warn`.
pub fn crate_filter(level: &str, crates: &[&str]) -> String {
    std::iter::once("warn".to_string())
        .chain(crates.iter().map(|c| format!("{}={}", c.replace('-', "_"), level)))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_filter() {
        assert_eq!(
            crate_filter("debug", &["overlay-sync", "overlaycore"]),
            "warn,overlay_sync=debug,overlaycore=debug"
        );
    }
}
