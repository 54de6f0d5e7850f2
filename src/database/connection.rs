use log::error;
use openssl::ssl::{SslConnector, SslConnectorBuilder, SslMethod};
use postgres_openssl::MakeTlsConnector;
use tokio::time::Duration;
use tokio_postgres::{Client, NoTls};
use url::Url;

const WAIT_BETWEEN_RETRIES: u64 = 5;

/// TLS builder verifying the server against the CA in `sslrootcert_path`
fn ssl_connector_builder(sslrootcert_path: &str) -> Result<SslConnectorBuilder, String> {
    let mut builder =
        SslConnector::builder(SslMethod::tls()).map_err(|e| format!("SSL builder error: {}", e))?;

    builder
        .set_ca_file(sslrootcert_path)
        .map_err(|e| format!("Error loading CA cert: {}", e))?;

    Ok(builder)
}

pub fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector, String> {
    let builder = ssl_connector_builder(sslrootcert_path)?;
    Ok(MakeTlsConnector::new(builder.build()))
}

/// Split the `sslrootcert` parameter out of a connection URL
///
/// tokio-postgres does not understand `sslrootcert`, so it is removed from
/// the query string and returned separately.
pub fn split_sslrootcert(database_url: &str) -> Result<(String, Option<String>), String> {
    let url = Url::parse(database_url).map_err(|e| format!("URL parse error: {}", e))?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }

    Ok((clean_url.to_string(), sslrootcert_path))
}

/// Open a client, with TLS when the URL names a root certificate
async fn connect(database_url: &str) -> Result<Client, String> {
    let (clean_database_url, sslrootcert_path) = split_sslrootcert(database_url)?;

    let client = match sslrootcert_path {
        Some(path) => {
            let connector = create_ssl_connector(&path)?;
            let (client, connection) = tokio_postgres::connect(&clean_database_url, connector)
                .await
                .map_err(|e| format!("Connection error: {}", e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            client
        }
        None => {
            let (client, connection) = tokio_postgres::connect(&clean_database_url, NoTls)
                .await
                .map_err(|e| format!("Connection error: {}", e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            client
        }
    };

    Ok(client)
}

/// Run `operation` on a fresh connection, retrying up to `max_retries` times
///
/// Each attempt opens its own connection; failures are logged and followed
/// by a fixed wait before the next attempt.
pub async fn execute_with_retry<T, F, Fut>(
    database_url: &str,
    max_retries: usize,
    operation: F,
) -> Result<T, String>
where
    F: Fn(Client) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<T, tokio_postgres::Error>> + Send,
{
    for attempt in 0..max_retries {
        match connect(database_url).await {
            Ok(client) => match operation(client).await {
                Ok(value) => return Ok(value),
                Err(e) => error!("Attempt {}: query error: {}", attempt + 1, e),
            },
            Err(e) => error!("Attempt {}: {}", attempt + 1, e),
        }

        if attempt + 1 < max_retries {
            tokio::time::sleep(Duration::from_secs(WAIT_BETWEEN_RETRIES)).await;
        }
    }

    Err("Max retries exceeded".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sslrootcert_removes_parameter() {
        let (url, cert) = split_sslrootcert(
            "postgres://user:pw@db.local:5432/vents?sslmode=require&sslrootcert=/etc/ca.pem",
        )
        .unwrap();

        assert_eq!(url, "postgres://user:pw@db.local:5432/vents?sslmode=require");
        assert_eq!(cert.as_deref(), Some("/etc/ca.pem"));
    }

    #[test]
    fn test_split_without_sslrootcert() {
        let (url, cert) = split_sslrootcert("postgres://user@localhost/vents").unwrap();

        assert_eq!(url, "postgres://user@localhost/vents");
        assert!(cert.is_none());
    }

    #[test]
    fn test_tls_builder_verifies_peer() {
        use openssl::ssl::SslVerifyMode;

        let cert_path = std::env::temp_dir().join("vent-monitor-test-ca.pem");
        let key = openssl::pkey::PKey::from_rsa(openssl::rsa::Rsa::generate(2048).unwrap()).unwrap();
        let mut name = openssl::x509::X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "vent-monitor-test").unwrap();
        let name = name.build();
        let mut cert = openssl::x509::X509::builder().unwrap();
        cert.set_version(2).unwrap();
        cert.set_subject_name(&name).unwrap();
        cert.set_issuer_name(&name).unwrap();
        cert.set_pubkey(&key).unwrap();
        cert.set_not_before(&openssl::asn1::Asn1Time::days_from_now(0).unwrap()).unwrap();
        cert.set_not_after(&openssl::asn1::Asn1Time::days_from_now(1).unwrap()).unwrap();
        cert.sign(&key, openssl::hash::MessageDigest::sha256()).unwrap();
        std::fs::write(&cert_path, cert.build().to_pem().unwrap()).unwrap();

        let builder = ssl_connector_builder(cert_path.to_str().unwrap()).unwrap();

        assert_eq!(builder.build().context().verify_mode(), SslVerifyMode::PEER);
    }

    #[test]
    fn test_tls_builder_rejects_missing_ca_file() {
        assert!(ssl_connector_builder("/nonexistent/vent-monitor-ca.pem").is_err());
    }

    #[test]
    fn test_split_rejects_invalid_url() {
        assert!(split_sslrootcert("not a url").is_err());
    }
}
