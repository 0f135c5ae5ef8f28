use std::{env, time::Duration};

use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::{error::Error, util::default_ureq_agent_builder};

pub const DEFAULT_PASSWORD: &str = "1234";
pub const PASSWORD_ENV_VAR: &str = "ARSIP_PASSWORD";

/// Checks a submitted password against the single shared secret.
pub trait Authenticator {
    fn verify(&self, password: &str) -> Result<bool, Error>;
}

/// Local authenticator holding the secret itself.
pub struct SharedSecret {
    secret: String,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Secret from `ARSIP_PASSWORD`, or the default one.
    pub fn from_env() -> Self {
        match env::var(PASSWORD_ENV_VAR) {
            Ok(secret) if !secret.is_empty() => Self::new(secret),
            _ => Self::new(DEFAULT_PASSWORD),
        }
    }
}

impl Authenticator for SharedSecret {
    fn verify(&self, password: &str) -> Result<bool, Error> {
        Ok(password == self.secret)
    }
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthReply {
    #[serde(default)]
    success: bool,
}

/// Remote auth endpoint, `POST {password}` answered by `{success}`.
pub struct AuthClient {
    agent: Agent,
    url: String,
}

impl AuthClient {
    pub fn new(url: impl Into<String>, proxy_url: Option<&str>, timeout: Duration) -> Self {
        Self {
            // A wrong password comes back as 401 with a regular JSON body.
            agent: default_ureq_agent_builder(proxy_url, timeout)
                .http_status_as_error(false)
                .build()
                .into(),
            url: url.into(),
        }
    }
}

impl Authenticator for AuthClient {
    fn verify(&self, password: &str) -> Result<bool, Error> {
        let mut response = self
            .agent
            .post(self.url.as_str())
            .send_json(AuthRequest { password })?;
        let status = response.status();
        if status.is_server_error() {
            return Err(Error::Rejected(format!("auth endpoint answered {status}")));
        }
        let reply: AuthReply = response.body_mut().read_json()?;
        Ok(reply.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::tests::respond_once;

    #[test]
    fn shared_secret_compares_exactly() {
        let auth = SharedSecret::new(DEFAULT_PASSWORD);
        assert!(auth.verify("1234").unwrap());
        assert!(!auth.verify("1234 ").unwrap());
        assert!(!auth.verify("").unwrap());
    }

    #[test]
    fn client_accepts_success_reply() {
        let (url, server) = respond_once(200, r#"{"success":true}"#);
        let auth = AuthClient::new(url, None, Duration::from_secs(5));
        assert!(auth.verify("1234").unwrap());

        let captured = server.join().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&captured.body).unwrap(),
            serde_json::json!({"password": "1234"})
        );
        assert!(captured
            .header("content-type")
            .is_some_and(|value| value.starts_with("application/json")));
    }

    #[test]
    fn client_reads_unauthorized_reply_as_failure() {
        let (url, server) = respond_once(401, r#"{"success":false,"error":"Password salah"}"#);
        let auth = AuthClient::new(url, None, Duration::from_secs(5));
        assert!(!auth.verify("0000").unwrap());
        server.join().unwrap();
    }

    #[test]
    fn client_reports_server_errors() {
        let (url, server) = respond_once(500, r#"{"error":"Server error"}"#);
        let auth = AuthClient::new(url, None, Duration::from_secs(5));
        assert!(auth.verify("1234").is_err());
        server.join().unwrap();
    }
}
