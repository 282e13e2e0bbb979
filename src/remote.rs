//! Utility functions for dealing with cluster connections.
//!
//! This module owns hostname validation and client creation, including the
//! basic-auth and TLS-verification options the CLI resolves from flags or
//! the environment.
use anyhow::{anyhow, Result};
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::Elasticsearch;
use url::Url;

/// Connection parameters for the administered cluster.
pub struct Connection<'a> {
    pub url: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub skip_verify: bool,
}

/// Creates a new client based on the provided connection parameters.
pub fn create_client(conn: &Connection<'_>) -> Result<Elasticsearch> {
    let url = parse_cluster(conn.url)?;

    let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url));

    if let Some(username) = conn.username {
        let password = conn.password.unwrap_or_default();
        builder = builder.auth(Credentials::Basic(username.to_owned(), password.to_owned()));
    }

    if conn.skip_verify {
        builder = builder.cert_validation(CertificateValidation::None);
    }

    Ok(Elasticsearch::new(builder.build()?))
}

/// Attempts to parse a cluster address out of the CLI arguments.
///
/// This logic is pretty vague; we don't actually test the connection beyond
/// looking to see if the provided scheme is HTTP(S). Every administrative
/// call fails fast later on if the host turns out to be unreachable.
pub fn parse_cluster(target: &str) -> Result<Url> {
    // attempt to parse the resource
    let url = Url::parse(target)?;

    // this is invalid, so not entirely sure what to do here
    if !url.has_host() || !url.scheme().starts_with("http") {
        return Err(anyhow!("Invalid cluster resource provided"));
    }

    // assume we have a cluster now, so pass it back
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::parse_cluster;

    #[test]
    fn http_and_https_hosts_are_accepted() {
        assert!(parse_cluster("http://localhost:9200").is_ok());
        assert!(parse_cluster("https://search.internal:9243").is_ok());
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(parse_cluster("ftp://localhost:9200").is_err());
        assert!(parse_cluster("localhost:9200").is_err());
    }
}
