//! Minimal MediaWiki API client: login, read a page, edit a page.
//!
//! Talks to `api.php` over a cookie-holding `ureq` agent. Only `action=query`
//! goes out as GET; everything else is a form POST. Requests made after a
//! successful login carry `assert=user` so an expired session fails loudly
//! instead of editing anonymously.

use std::time::Duration;

use serde_json::Value;

use crate::config::WikiConfig;
use crate::error::SessionError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A client for one wiki's `api.php`.
pub struct Api {
    api_path: String,
    username: String,
    password: String,
    agent: ureq::Agent,
    assert_param: Option<&'static str>,
}

impl Api {
    pub fn new(config: &WikiConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build();
        Self {
            api_path: config.api_path.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            agent,
            assert_param: None,
        }
    }

    fn call(&self, params: &[(&str, &str)]) -> Result<Value, SessionError> {
        let is_get = params
            .iter()
            .any(|(key, value)| *key == "action" && *value == "query");

        let mut params: Vec<(&str, &str)> = params.to_vec();
        params.push(("format", "json"));
        if let Some(assertion) = self.assert_param {
            params.push(("assert", assertion));
        }

        let response = if is_get {
            // Only GETs are logged: POST parameters carry credentials.
            tracing::debug!(api = %self.api_path, ?params, "api query");
            let mut request = self.agent.get(&self.api_path);
            for (key, value) in params.iter().copied() {
                request = request.query(key, value);
            }
            request.call()
        } else {
            self.agent.post(&self.api_path).send_form(&params)
        }
        .map_err(|err| SessionError::Http {
            message: err.to_string(),
        })?;

        let body = response.into_string().map_err(|err| SessionError::Http {
            message: err.to_string(),
        })?;

        let decoded: Value = serde_json::from_str(strip_bom(&body)).map_err(|err| {
            SessionError::Decode {
                message: err.to_string(),
            }
        })?;

        if let Some(error) = decoded.get("error") {
            return Err(SessionError::Api {
                detail: error.to_string(),
            });
        }

        Ok(decoded)
    }

    /// Fetch a token of the given kind ("login", "csrf", ...).
    fn token(&self, kind: &str) -> Result<String, SessionError> {
        let result = self.call(&[("action", "query"), ("meta", "tokens"), ("type", kind)])?;

        result["query"]["tokens"][format!("{kind}token")]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| SessionError::Api {
                detail: format!("no {kind} token in response"),
            })
    }

    /// Log in with the configured bot credentials.
    pub fn login(&mut self) -> Result<(), SessionError> {
        tracing::debug!(api = %self.api_path, user = %self.username, "logging in");

        let token = self.token("login")?;
        let result = self.call(&[
            ("action", "login"),
            ("lgname", &self.username),
            ("lgpassword", &self.password),
            ("lgtoken", &token),
        ])?;

        let outcome = result["login"]["result"].as_str().unwrap_or("no result");
        if outcome != "Success" {
            return Err(SessionError::Login {
                username: self.username.clone(),
                result: outcome.to_string(),
            });
        }

        self.assert_param = Some("user");
        Ok(())
    }

    /// Log out; failures are logged, not raised, since the session dies with
    /// the process anyway.
    pub fn logout(&mut self) {
        tracing::debug!(api = %self.api_path, user = %self.username, "logging out");

        let result = self
            .token("csrf")
            .and_then(|token| self.call(&[("action", "logout"), ("token", &token)]));

        if let Err(err) = result {
            tracing::warn!(error = %err, "logout failed");
        }

        self.assert_param = None;
    }

    /// Get the current wikitext of a page.
    pub fn get_page_content(&self, title: &str) -> Result<String, SessionError> {
        tracing::debug!(title, "requesting page content");

        let result = self.call(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("titles", title),
            ("rvprop", "content"),
        ])?;

        result["query"]["pages"]
            .as_object()
            .and_then(|pages| pages.values().next())
            .and_then(|page| page["revisions"][0]["*"].as_str())
            .map(str::to_owned)
            .ok_or_else(|| SessionError::MissingContent {
                title: title.to_string(),
            })
    }

    /// Replace a page's content. A fresh CSRF token is fetched per edit.
    pub fn edit_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
        bot: bool,
    ) -> Result<(), SessionError> {
        let token = self.token("csrf")?;

        let mut params = vec![
            ("action", "edit"),
            ("title", title),
            ("text", text),
            ("summary", summary),
            ("token", token.as_str()),
        ];
        if bot {
            params.push(("bot", "true"));
        }

        let result = self.call(&params)?;

        if result["edit"]["result"].as_str() != Some("Success") {
            return Err(SessionError::Edit {
                title: title.to_string(),
                detail: result["edit"].to_string(),
            });
        }

        tracing::debug!(title, "edit complete");
        Ok(())
    }
}

/// Some MediaWiki installs prefix responses with a UTF-8 BOM.
fn strip_bom(body: &str) -> &str {
    body.strip_prefix('\u{feff}').unwrap_or(body)
}
