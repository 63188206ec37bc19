use std::time::{Duration, Instant};

use async_trait::async_trait;
use credentials::CredentialBundle;
use native_tls::{Certificate, TlsConnector};
use postgres_native_tls::MakeTlsConnector;
use tokio::task::JoinHandle;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::Type;
use tokio_postgres::Client;
use tracing::{debug, info, warn};

use crate::config::{validate_table_name, DatabaseConfig, TlsConfig, TlsVerification};
use crate::{DocumentConnection, DocumentStore, InsertedDocument, StoreError};

/// How long `close` waits for the driver task to flush the terminate message.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// PostgreSQL + pgvector store. Every [`connect`](DocumentStore::connect)
/// opens a fresh TLS connection; nothing is pooled.
pub struct PgStore {
    config: DatabaseConfig,
    tls: MakeTlsConnector,
    insert_sql: String,
}

impl PgStore {
    pub fn new(config: DatabaseConfig) -> Result<Self, StoreError> {
        validate_table_name(&config.table)?;
        let tls = build_tls(&config.tls)?;
        let insert_sql = format!(
            "INSERT INTO {} (content, embedding) VALUES ($1, $2::vector) RETURNING id::text",
            config.table
        );
        Ok(Self {
            config,
            tls,
            insert_sql,
        })
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }
}

fn build_tls(cfg: &TlsConfig) -> Result<MakeTlsConnector, StoreError> {
    let mut builder = TlsConnector::builder();

    if let Some(path) = &cfg.ca_cert_path {
        let pem = std::fs::read(path).map_err(|e| {
            StoreError::InvalidConfig(format!("failed to read CA bundle {}: {e}", path.display()))
        })?;
        let certs = pem_certificates(&pem)?;
        debug!(path = %path.display(), count = certs.len(), "tls_ca_bundle_loaded");
        for cert in certs {
            builder.add_root_certificate(cert);
        }
    }

    if cfg.verification == TlsVerification::Relaxed {
        warn!(
            "tls_verification_relaxed: database certificate and host name will not be verified"
        );
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    let connector = builder
        .build()
        .map_err(|e| StoreError::InvalidConfig(format!("failed to build TLS connector: {e}")))?;
    Ok(MakeTlsConnector::new(connector))
}

/// Splits a PEM bundle (RDS ships all regional roots in one file).
fn pem_certificates(pem: &[u8]) -> Result<Vec<Certificate>, StoreError> {
    const END: &str = "-----END CERTIFICATE-----";
    let text = std::str::from_utf8(pem)
        .map_err(|_| StoreError::InvalidConfig("CA bundle is not valid PEM text".into()))?;

    let certs = text
        .split_inclusive(END)
        .filter(|block| block.contains(END))
        .map(|block| {
            Certificate::from_pem(block.trim().as_bytes())
                .map_err(|e| StoreError::InvalidConfig(format!("invalid CA certificate: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        return Err(StoreError::InvalidConfig(
            "CA bundle contains no certificates".into(),
        ));
    }
    Ok(certs)
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn connect(
        &self,
        credentials: &CredentialBundle,
    ) -> Result<Box<dyn DocumentConnection>, StoreError> {
        let start = Instant::now();
        let timeout = self.config.connect_timeout();

        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .dbname(&self.config.dbname)
            .user(credentials.username())
            .password(credentials.password())
            .ssl_mode(SslMode::Require)
            .connect_timeout(timeout)
            .application_name("ragingest");

        let (client, connection) =
            match tokio::time::timeout(timeout, pg.connect(self.tls.clone())).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(StoreError::ConnectionFailed(e.to_string())),
                Err(_) => {
                    return Err(StoreError::ConnectionFailed(format!(
                        "connect timed out after {}ms",
                        timeout.as_millis()
                    )))
                }
            };

        let driver = tokio::spawn(async move {
            if let Err(err) = connection.await {
                warn!(error = %err, "database_connection_error");
            }
        });

        info!(
            host = %self.config.host,
            port = self.config.port,
            dbname = %self.config.dbname,
            elapsed_micros = start.elapsed().as_micros(),
            "database_connected"
        );

        Ok(Box::new(PgConnection {
            client: Some(client),
            driver: Some(driver),
            insert_sql: self.insert_sql.clone(),
            statement_timeout: self.config.statement_timeout(),
        }))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// One open connection. Dropping it without [`close`](DocumentConnection::close)
/// (e.g. when the surrounding future is cancelled) aborts the driver task,
/// which tears the socket down.
struct PgConnection {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
    insert_sql: String,
    statement_timeout: Duration,
}

fn write_error(err: tokio_postgres::Error) -> StoreError {
    if err.is_closed() {
        return StoreError::ConnectionFailed(err.to_string());
    }
    match err.code() {
        Some(code) if code.code().starts_with("23") => {
            StoreError::ConstraintViolation(err.to_string())
        }
        _ => StoreError::WriteFailed(err.to_string()),
    }
}

#[async_trait]
impl DocumentConnection for PgConnection {
    async fn insert(
        &mut self,
        content: &str,
        vector_literal: &str,
    ) -> Result<InsertedDocument, StoreError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| StoreError::ConnectionFailed("connection already closed".into()))?;

        // Both parameters travel as text; the server casts the second to `vector`.
        let write = async {
            let statement = client
                .prepare_typed(&self.insert_sql, &[Type::TEXT, Type::TEXT])
                .await?;
            let row = client
                .query_one(&statement, &[&content, &vector_literal])
                .await?;
            row.try_get::<_, String>(0)
        };
        let id = match tokio::time::timeout(self.statement_timeout, write).await {
            Ok(result) => result.map_err(write_error)?,
            Err(_) => {
                return Err(StoreError::WriteFailed(format!(
                    "insert timed out after {}ms",
                    self.statement_timeout.as_millis()
                )))
            }
        };
        Ok(InsertedDocument { id })
    }

    async fn close(mut self: Box<Self>) -> Result<(), StoreError> {
        // Dropping the client makes the driver send Terminate and finish.
        drop(self.client.take());
        let Some(mut driver) = self.driver.take() else {
            return Ok(());
        };
        match tokio::time::timeout(CLOSE_GRACE, &mut driver).await {
            Ok(Ok(())) => {
                debug!("database_connection_closed");
                Ok(())
            }
            Ok(Err(join_err)) => Err(StoreError::ConnectionFailed(format!(
                "connection task failed: {join_err}"
            ))),
            Err(_) => {
                driver.abort();
                warn!("database_connection_close_timeout");
                Ok(())
            }
        }
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn insert_statement_lets_storage_generate_the_key() {
        let store = PgStore::new(DatabaseConfig {
            host: "db.internal".into(),
            table: "rag.documents".into(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            store.insert_sql(),
            "INSERT INTO rag.documents (content, embedding) VALUES ($1, $2::vector) RETURNING id::text"
        );
        assert!(!store.insert_sql().contains("id,"));
    }

    #[test]
    fn invalid_table_is_rejected_at_construction() {
        let err = PgStore::new(DatabaseConfig {
            host: "db.internal".into(),
            table: "documents; --".into(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }

    #[test]
    fn relaxed_tls_still_builds() {
        let store = PgStore::new(DatabaseConfig {
            host: "db.internal".into(),
            tls: TlsConfig {
                verification: TlsVerification::Relaxed,
                ca_cert_path: None,
            },
            ..Default::default()
        });
        assert!(store.is_ok());
    }

    #[test]
    fn missing_ca_bundle_is_config_error() {
        let err = PgStore::new(DatabaseConfig {
            host: "db.internal".into(),
            tls: TlsConfig {
                verification: TlsVerification::Full,
                ca_cert_path: Some("/nonexistent/rds-ca.pem".into()),
            },
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }

    #[test]
    fn bundle_without_certificates_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let err = PgStore::new(DatabaseConfig {
            host: "db.internal".into(),
            tls: TlsConfig {
                verification: TlsVerification::Full,
                ca_cert_path: Some(file.path().to_path_buf()),
            },
            ..Default::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err,
            StoreError::InvalidConfig("CA bundle contains no certificates".into())
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_connection_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = PgStore::new(DatabaseConfig {
            host: "127.0.0.1".into(),
            port,
            connect_timeout_ms: 2_000,
            ..Default::default()
        })
        .unwrap();

        let err = store
            .connect(&CredentialBundle::new("raguser", "hunter2"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::ConnectionFailed(_)));
        assert!(!err.to_string().contains("hunter2"));
    }
}
