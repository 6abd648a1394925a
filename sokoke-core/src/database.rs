//! Persistence selection and connection settings.
//!
//! The `persistence` key picks the storage engine once, at process start.
//! Changing it requires a restart.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::config::{ConfigError, SokokeConfig};

/// The storage engine the process runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persistence {
    MongoDb,
    Sqlite,
    Postgres,
    MySql,
}

/// Backend families. All relational variants share one query compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendFamily {
    Document,
    Relational,
}

impl Persistence {
    pub const ALL: [Persistence; 4] = [
        Persistence::MongoDb,
        Persistence::Sqlite,
        Persistence::Postgres,
        Persistence::MySql,
    ];

    pub fn family(self) -> BackendFamily {
        match self {
            Persistence::MongoDb => BackendFamily::Document,
            Persistence::Sqlite | Persistence::Postgres | Persistence::MySql => {
                BackendFamily::Relational
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Persistence::MongoDb => "mongodb",
            Persistence::Sqlite => "sqlite",
            Persistence::Postgres => "postgres",
            Persistence::MySql => "mysql",
        }
    }
}

impl fmt::Display for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persistence {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Persistence::MongoDb),
            "sqlite" => Ok(Persistence::Sqlite),
            "postgres" | "postgresql" => Ok(Persistence::Postgres),
            "mysql" => Ok(Persistence::MySql),
            _ => Err(ConfigError::Invalid {
                key: "persistence".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Connection settings for the configured persistence.
#[derive(Clone, PartialEq)]
pub struct DatabaseSettings {
    pub persistence: Persistence,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub sql_host: String,
    pub sql_port: Option<u16>,
    pub sql_username: Option<String>,
    pub sql_password: Option<String>,
    pub sql_database: String,
    pub sqlite_path: String,
    pub pool_size: u32,
}

impl DatabaseSettings {
    /// Read the database section of `config`.
    ///
    /// An unknown `persistence` value is a fatal configuration error.
    pub fn from_config(config: &SokokeConfig) -> Result<Self, ConfigError> {
        let persistence: Persistence = config
            .get_or("persistence", "mongodb".to_string())?
            .parse()?;

        Ok(DatabaseSettings {
            persistence,
            mongodb_uri: config.get_or("mongodb.uri", "mongodb://localhost:27017".to_string())?,
            mongodb_database: config.get_or("mongodb.database", "sokoke-planner".to_string())?,
            sql_host: config.get_or("sql.host", "localhost".to_string())?,
            sql_port: config.get_or("sql.port", None)?,
            sql_username: config.get_or("sql.username", None)?,
            sql_password: config.get_or("sql.password", None)?,
            sql_database: config.get_or("sql.database", "sokoke_planner".to_string())?,
            sqlite_path: config.get_or("sqlite.path", "./database.sqlite".to_string())?,
            pool_size: config.get_or("sql.pool.size", 10u32)?,
        })
    }

    /// Connection URL for the relational variants; `None` for the document store.
    ///
    /// Credentials are percent-encoded. An empty or malformed host, or
    /// credentials the URL cannot carry, are configuration errors.
    pub fn sql_url(&self) -> Result<Option<String>, ConfigError> {
        let scheme = match self.persistence {
            Persistence::MongoDb => return Ok(None),
            Persistence::Sqlite => {
                if self.sqlite_path == ":memory:" {
                    return Ok(Some("sqlite::memory:".to_string()));
                }
                return Ok(Some(format!("sqlite://{}?mode=rwc", self.sqlite_path)));
            }
            Persistence::Postgres => "postgres",
            Persistence::MySql => "mysql",
        };
        let invalid = |key: &str, value: &str| ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        };

        if self.sql_host.trim().is_empty() {
            return Err(invalid("sql.host", &self.sql_host));
        }
        let mut url = Url::parse(&format!("{scheme}://localhost"))
            .map_err(|_| invalid("persistence", scheme))?;
        url.set_host(Some(&self.sql_host))
            .map_err(|_| invalid("sql.host", &self.sql_host))?;
        url.set_port(self.sql_port)
            .map_err(|_| invalid("sql.port", &format!("{:?}", self.sql_port)))?;
        if let Some(user) = &self.sql_username {
            url.set_username(user)
                .map_err(|_| invalid("sql.username", user))?;
            if let Some(password) = &self.sql_password {
                url.set_password(Some(password))
                    .map_err(|_| invalid("sql.password", "***"))?;
            }
        }
        url.set_path(&format!("/{}", self.sql_database));
        Ok(Some(url.into()))
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("persistence", &self.persistence)
            .field("mongodb_database", &self.mongodb_database)
            .field("sql_host", &self.sql_host)
            .field("sql_port", &self.sql_port)
            .field("sql_username", &self.sql_username)
            .field("sql_password", &self.sql_password.as_ref().map(|_| "***"))
            .field("sql_database", &self.sql_database)
            .field("sqlite_path", &self.sqlite_path)
            .field("pool_size", &self.pool_size)
            .finish_non_exhaustive()
    }
}
