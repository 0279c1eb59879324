//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use ini::Ini;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ia_err, DriverError};

const ENDPOINT: &str = "endpoint";
const DATABASE: &str = "database";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";
const JWT: &str = "jwt";
const CA_CERT: &str = "ca_cert";
const ACCEPT_INVALID_CERTS: &str = "accept_invalid_certs";
const TIMEOUT_MS: &str = "timeout_ms";

/// Connection settings read from one profile of an INI config file.
///
/// Every field is optional; only the keys present in the profile are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ConfigProfile {
    pub(crate) endpoint: Option<String>,
    pub(crate) database: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) jwt: Option<String>,
    pub(crate) ca_cert: Option<String>,
    pub(crate) accept_invalid_certs: bool,
    pub(crate) timeout: Option<Duration>,
}

/// Expand a leading `~/` to the current user's home directory.
pub(crate) fn expand_user_home(file_path: &str) -> Result<String, DriverError> {
    if file_path.starts_with("~/") || file_path.starts_with("~\\") {
        let Some(home_dir) = dirs::home_dir() else {
            return ia_err!("cannot expand '{}': no home directory", file_path);
        };
        let full_path = home_dir.join(PathBuf::from(correct_path(&file_path[2..])));
        return Ok(format!("{}", full_path.display()));
    }
    Ok(file_path.to_string())
}

fn correct_path(file_path: &str) -> String {
    if cfg!(target_os = "windows") {
        file_path.replace('/', "\\")
    } else {
        file_path.to_string()
    }
}

pub(crate) fn file_to_string(filename: &str) -> Result<String, DriverError> {
    let path = expand_user_home(filename)?;
    match std::fs::read_to_string(&path) {
        Ok(s) => Ok(s),
        Err(e) => ia_err!("error reading file '{}': {}", path, e.to_string()),
    }
}

/// Read `username=` and `password=` lines from a credentials file.
pub(crate) fn read_credentials(filename: &str) -> Result<(String, String), DriverError> {
    let mut user = String::new();
    let mut pass = String::new();
    let data = file_to_string(filename)?;
    for line in data.lines() {
        if let Some((k, v)) = line.split_once('=') {
            match k.trim() {
                USERNAME => user = v.trim().to_string(),
                PASSWORD => pass = v.trim().to_string(),
                _ => {}
            }
        }
    }
    if user.is_empty() {
        return ia_err!("username field missing from auth file {}", filename);
    }
    Ok((user, pass))
}

pub(crate) fn load_profile(config_file: &str, profile: &str) -> Result<ConfigProfile, DriverError> {
    tracing::debug!(
        "reading connection profile '{}' from {}",
        profile,
        config_file
    );
    let file_path = expand_user_home(config_file)?;
    let config = match Ini::load_from_file(&file_path) {
        Ok(c) => c,
        Err(e) => {
            return ia_err!(
                "error reading config file '{}': {}",
                file_path,
                e.to_string()
            );
        }
    };
    let Some(props) = config.section(Some(profile)) else {
        return ia_err!(
            "error reading config file '{}': missing profile '{}'",
            file_path,
            profile
        );
    };

    let get = |k: &str| props.get(k).map(|v| v.to_string());
    let mut p = ConfigProfile {
        endpoint: get(ENDPOINT),
        database: get(DATABASE),
        username: get(USERNAME),
        password: get(PASSWORD),
        jwt: get(JWT),
        ca_cert: get(CA_CERT),
        ..Default::default()
    };
    if let Some(v) = props.get(ACCEPT_INVALID_CERTS) {
        let lv = v.to_lowercase();
        p.accept_invalid_certs = lv == "true" || lv == "1";
    }
    if let Some(v) = props.get(TIMEOUT_MS) {
        match v.parse::<u64>() {
            Ok(ms) => p.timeout = Some(Duration::from_millis(ms)),
            Err(_) => {
                return ia_err!(
                    "error reading config file '{}': '{}' is not a number of milliseconds",
                    file_path,
                    TIMEOUT_MS
                );
            }
        }
    }
    if p.password.is_some() && p.username.is_none() {
        return ia_err!(
            "error reading config file '{}': '{}' given without '{}'",
            file_path,
            PASSWORD,
            USERNAME
        );
    }
    Ok(p)
}
