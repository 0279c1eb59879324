//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Builder for creating a database [`Handle`](crate::Handle)
//!

use std::default::Default;
use std::env;
use std::result::Result;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Certificate;
use reqwest::Client;

use crate::config_file::{file_to_string, load_profile, read_credentials};
use crate::error::{ia_err, DriverError};
use crate::handle::Handle;
use crate::transport::{Credentials, Transport};

/// Builder used to set all the parameters to create a [`Handle`](crate::Handle).
///
#[derive(Default, Debug, Clone)]
pub struct HandleBuilder {
    pub(crate) endpoint: String,
    pub(crate) database: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) credentials: Credentials,
    pub(crate) add_cert: Option<Certificate>,
    pub(crate) client: Option<Client>,
    pub(crate) accept_invalid_certs: bool,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    // For error messaging
    pub(crate) from_environment: bool,
}

impl HandleBuilder {
    /// Create a new HandleBuilder struct.
    ///
    /// The default HandleBuilder has no endpoint and no credentials, and
    /// addresses the `_system` database. Consider calling
    /// [`from_environment()`](HandleBuilder::from_environment()) to collect all parameters from
    /// the local environment by default.
    pub fn new() -> Self {
        HandleBuilder {
            ..Default::default()
        }
    }
    /// Build a new [`Handle`].
    ///
    /// Note: Internally, if the [`HandleBuilder`] contains
    /// a reference to an existing [`reqwest::Client`], it will clone and
    /// use that. Otherwise, it will create a new [`reqwest::Client`] for its
    /// own internal use. See [`reqwest_client()`](HandleBuilder::reqwest_client()).
    pub async fn build(self) -> Result<Handle, DriverError> {
        Handle::new(&self).await
    }
    /// Gather configuration settings from the current environment.
    ///
    /// This method will scan the process [`standard environment`](std::env::Vars) to collect and
    /// set the configuration parameters. The values can be overridden in code if this method is
    /// called first and other methods are called afterwards, for example:
    ///```no_run
    /// # use arangodb_rust_driver::Handle;
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    ///   let handle = Handle::builder()
    ///       .from_environment()?
    ///       .database("shop")?
    ///       .build()
    ///       .await?;
    /// # Ok(())
    /// # }
    ///```
    /// The following environment variables are used, in this order (later
    /// settings override earlier ones):
    ///
    /// | variable | description |
    /// | -------- | ----------- |
    /// | `ARANGODB_CONFIG_FILE` | Path to an INI config file. See [`HandleBuilder::from_config_file()`]. |
    /// | `ARANGODB_PROFILE` | Profile to read from the config file. Defaults to `DEFAULT`. |
    /// | `ARANGODB_ENDPOINT` | The URL endpoint to use. See [`HandleBuilder::endpoint()`]. |
    /// | `ARANGODB_DATABASE` | The database to address. See [`HandleBuilder::database()`]. |
    /// | `ARANGODB_AUTH_FILE` | Path to a `username=`/`password=` file. See [`HandleBuilder::auth_from_file()`]. |
    /// | `ARANGODB_USERNAME`, `ARANGODB_PASSWORD` | Basic auth credentials. See [`HandleBuilder::basic_auth()`]. |
    /// | `ARANGODB_JWT` | A JWT bearer token. See [`HandleBuilder::jwt_auth()`]. |
    /// | `ARANGODB_CA_CERT` | Path to a certificate file in `pem` format (see [`HandleBuilder::add_cert_from_pemfile()`]). |
    /// | `ARANGODB_ACCEPT_INVALID_CERTS` | If this is set to `1` or `true`, do not check certificates (see [`HandleBuilder::danger_accept_invalid_certs()`]). |
    ///
    pub fn from_environment(mut self) -> Result<Self, DriverError> {
        self.from_environment = true;
        if let Ok(val) = env::var("ARANGODB_CONFIG_FILE") {
            let profile = env::var("ARANGODB_PROFILE").unwrap_or("DEFAULT".to_string());
            self = self.from_config_file(&val, &profile)?;
        }
        if let Ok(val) = env::var("ARANGODB_ENDPOINT") {
            self = self.endpoint(&val)?;
        }
        if let Ok(val) = env::var("ARANGODB_DATABASE") {
            self = self.database(&val)?;
        }
        if let Ok(val) = env::var("ARANGODB_AUTH_FILE") {
            self = self.auth_from_file(&val)?;
        }
        if let Ok(val) = env::var("ARANGODB_USERNAME") {
            let pass = env::var("ARANGODB_PASSWORD").unwrap_or_default();
            self = self.basic_auth(&val, &pass)?;
        }
        if let Ok(val) = env::var("ARANGODB_JWT") {
            self = self.jwt_auth(&val)?;
        }
        if let Ok(val) = env::var("ARANGODB_CA_CERT") {
            self = self.add_cert_from_pemfile(&val)?;
        }
        if let Ok(val) = env::var("ARANGODB_ACCEPT_INVALID_CERTS") {
            let lv = val.to_lowercase();
            if lv == "true" || lv == "1" {
                self = self.danger_accept_invalid_certs(true)?;
            }
        }
        Ok(self)
    }
    /// Read settings from one profile of an INI config file.
    ///
    /// A leading `~/` in the path is expanded to the user's home directory.
    /// Recognized keys are `endpoint`, `database`, `username`, `password`,
    /// `jwt`, `ca_cert`, `accept_invalid_certs` and `timeout_ms`:
    ///```text
    /// [DEFAULT]
    /// endpoint = http://localhost:8529
    /// database = shop
    ///
    /// [production]
    /// endpoint = https://db.example.com:8529
    /// username = reporting
    /// password = 1234567
    /// ca_cert = ~/certs/db.pem
    ///```
    pub fn from_config_file(mut self, config_file: &str, profile: &str) -> Result<Self, DriverError> {
        let p = load_profile(config_file, profile)?;
        if let Some(v) = &p.endpoint {
            self = self.endpoint(v)?;
        }
        if let Some(v) = &p.database {
            self = self.database(v)?;
        }
        if let Some(u) = &p.username {
            self = self.basic_auth(u, p.password.as_deref().unwrap_or(""))?;
        }
        if let Some(t) = &p.jwt {
            self = self.jwt_auth(t)?;
        }
        if let Some(c) = &p.ca_cert {
            self = self.add_cert_from_pemfile(c)?;
        }
        if p.accept_invalid_certs {
            self = self.danger_accept_invalid_certs(true)?;
        }
        if let Some(t) = p.timeout {
            self = self.timeout(t)?;
        }
        Ok(self)
    }
    /// Set the server endpoint, for example `http://localhost:8529`.
    ///
    /// If no scheme is given, `http://` is assumed.
    pub fn endpoint(mut self, endpoint: &str) -> Result<Self, DriverError> {
        let ep = endpoint.trim().trim_end_matches('/');
        if ep.is_empty() {
            return ia_err!("endpoint must not be empty");
        }
        if ep.starts_with("https://") || ep.starts_with("http://") {
            self.endpoint = ep.to_string();
        } else {
            self.endpoint = format!("http://{}", ep);
        }
        Ok(self)
    }
    /// Set the database all requests are addressed to.
    ///
    /// The default is `_system`.
    pub fn database(mut self, database: &str) -> Result<Self, DriverError> {
        if database.is_empty() {
            return ia_err!("database name must not be empty");
        }
        self.database = database.to_string();
        Ok(self)
    }
    /// Authenticate every request with http basic auth.
    pub fn basic_auth(mut self, username: &str, password: &str) -> Result<Self, DriverError> {
        if username.is_empty() {
            return ia_err!("username must not be empty");
        }
        self.credentials = Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
        Ok(self)
    }
    /// Authenticate every request with a JWT bearer token.
    pub fn jwt_auth(mut self, token: &str) -> Result<Self, DriverError> {
        if token.is_empty() {
            return ia_err!("jwt token must not be empty");
        }
        self.credentials = Credentials::Jwt(token.to_string());
        Ok(self)
    }
    /// Specify basic auth credentials from a local file.
    ///
    /// The format of the file is one value per line, using
    /// a `key=value` pair syntax, such as:
    ///```text
    /// username=testuser
    /// password=1234567
    ///```
    pub fn auth_from_file(self, filename: &str) -> Result<Self, DriverError> {
        let (user, pass) = read_credentials(filename)?;
        self.basic_auth(&user, &pass)
    }
    /// Add a certificate to use for https connections from a file.
    ///
    /// The file must contain an x509 certificate in `PEM` file format.
    pub fn add_cert_from_pemfile(self, pemfile: &str) -> Result<Self, DriverError> {
        let buf = file_to_string(pemfile)?.into_bytes();
        match reqwest::Certificate::from_pem(&buf) {
            Ok(cert) => self.add_cert(cert),
            Err(e) => ia_err!(
                "error getting certificate from pemfile {}: {}",
                pemfile,
                e.to_string()
            ),
        }
    }
    /// Add a certificate to use for https connections.
    pub fn add_cert(mut self, cert: Certificate) -> Result<Self, DriverError> {
        self.add_cert = Some(cert);
        Ok(self)
    }
    /// Allow https connection without validating certificates.
    ///
    /// **Warning:** This is only recommended for local testing purposes. Its use is insecure. See [`reqwest::ClientBuilder::danger_accept_invalid_certs()`] for details.
    ///
    pub fn danger_accept_invalid_certs(
        mut self,
        accept_invalid_certs: bool,
    ) -> Result<Self, DriverError> {
        self.accept_invalid_certs = accept_invalid_certs;
        Ok(self)
    }
    /// Specify a [`reqwest::Client`] to use for all http/s connections.
    ///
    /// By default, the [`Handle`](crate::Handle) creates an internal [`reqwest::Client`] to use for
    /// all communications. If your application already has a reqwest Client, you can pass that
    /// into the HandleBuilder to avoid creating multiple connection pools.
    pub fn reqwest_client(mut self, client: &Client) -> Result<Self, DriverError> {
        self.client = Some(client.clone());
        Ok(self)
    }
    /// Specify the timeout used for operations.
    ///
    /// This is the deadline of each single server round trip. It can be
    /// overridden on a per-request basis. The default timeout is 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Result<Self, DriverError> {
        if timeout.is_zero() {
            return ia_err!("timeout must be greater than zero");
        }
        self.timeout = Some(timeout);
        Ok(self)
    }
    /// Use a custom [`Transport`] instead of the built-in http client.
    ///
    /// When set, the endpoint, credentials and tls settings are ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Result<Self, DriverError> {
        self.transport = Some(transport);
        Ok(self)
    }
}
