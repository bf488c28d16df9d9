use std::time::Duration;

use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, Result};

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Minimal W3C WebDriver client. The driver server (chromedriver or
/// similar) must already be running at `base_url`.
#[derive(Clone)]
pub struct WebDriver {
    client: Client,
    base_url: String,
}

/// How to find an element.
#[derive(Debug, Clone)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn xpath(expr: &str) -> Self {
        Locator::XPath(expr.to_string())
    }

    fn to_json(&self) -> Value {
        match self {
            Locator::Css(s) => json!({ "using": "css selector", "value": s }),
            Locator::XPath(s) => json!({ "using": "xpath", "value": s }),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css {s}"),
            Locator::XPath(s) => write!(f, "xpath {s}"),
        }
    }
}

/// An element handle within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element(String);

/// A live browser session. Call [`Session::quit`] when done.
pub struct Session {
    driver: WebDriver,
    id: String,
}

impl WebDriver {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Start a Chrome session.
    pub async fn new_session(&self, headless: bool) -> Result<Session> {
        let value = self
            .command(Method::POST, "/session", Some(chrome_capabilities(headless)))
            .await?;

        let id = value["sessionId"]
            .as_str()
            .ok_or_else(|| AppError::Browser("No sessionId in new session response".to_string()))?
            .to_string();

        tracing::debug!(session = %id, "WebDriver session started");
        Ok(Session {
            driver: self.clone(),
            id,
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Browser(format!("WebDriver request failed: {e}")))?;
        let status = response.status();
        let payload: WireResponse = response
            .json()
            .await
            .map_err(|e| AppError::Browser(format!("Invalid WebDriver response ({status}): {e}")))?;

        if !status.is_success() {
            return Err(AppError::Browser(describe_error(&payload.value, status.as_u16())));
        }

        Ok(payload.value)
    }
}

impl Session {
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    pub async fn current_url(&self) -> Result<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Browser("Current URL is not a string".to_string()))
    }

    /// Find one element; `Ok(None)` when nothing matches yet.
    pub async fn find(&self, locator: &Locator) -> Result<Option<Element>> {
        match self.command(Method::POST, "/element", Some(locator.to_json())).await {
            Ok(value) => parse_element(&value).map(Some),
            Err(AppError::Browser(msg)) if msg.starts_with("no such element") => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn send_keys(&self, element: &Element, text: &str) -> Result<()> {
        let path = format!("/element/{}/value", element.0);
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await
            .map(|_| ())
    }

    pub async fn click(&self, element: &Element) -> Result<()> {
        let path = format!("/element/{}/click", element.0);
        self.command(Method::POST, &path, Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn is_clickable(&self, element: &Element) -> Result<bool> {
        let displayed = self
            .command(Method::GET, &format!("/element/{}/displayed", element.0), None)
            .await?;
        let enabled = self
            .command(Method::GET, &format!("/element/{}/enabled", element.0), None)
            .await?;
        Ok(displayed.as_bool().unwrap_or(false) && enabled.as_bool().unwrap_or(false))
    }

    /// Poll until an element matching `locator` exists.
    pub async fn wait_for_present(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Element> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(locator).await? {
                return Ok(element);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::Timeout(format!(
                    "{locator} not present after {}s",
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Poll until an element matching `locator` is displayed and enabled.
    pub async fn wait_for_clickable(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Element> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(locator).await? {
                if self.is_clickable(&element).await? {
                    return Ok(element);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::Timeout(format!(
                    "{locator} not clickable after {}s",
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Poll the current URL until `predicate` holds. Returns the last URL
    /// seen either way.
    pub async fn wait_for_url<F>(
        &self,
        predicate: F,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<(bool, String)>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let url = self.current_url().await?;
            if predicate(&url) {
                return Ok((true, url));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok((false, url));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// End the session. Errors are logged, not returned.
    pub async fn quit(self) {
        let path = format!("/session/{}", self.id);
        if let Err(e) = self.driver.command(Method::DELETE, &path, None).await {
            tracing::warn!(session = %self.id, error = %e, "Failed to close WebDriver session");
        }
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let full = format!("/session/{}{path}", self.id);
        self.driver.command(method, &full, body).await
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
}

fn chrome_capabilities(headless: bool) -> Value {
    let mut args = vec![
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-blink-features=AutomationControlled",
        "--window-size=1920,1080",
    ];
    if headless {
        args.insert(0, "--headless");
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

fn parse_element(value: &Value) -> Result<Element> {
    value[ELEMENT_KEY]
        .as_str()
        .map(|id| Element(id.to_string()))
        .ok_or_else(|| AppError::Browser("Element reference missing from response".to_string()))
}

/// Render a WebDriver error payload as `"<error>: <message>"`.
fn describe_error(value: &Value, status: u16) -> String {
    let error = value["error"].as_str().unwrap_or("unknown error");
    let message = value["message"].as_str().unwrap_or("");
    if message.is_empty() {
        format!("{error} (HTTP {status})")
    } else {
        format!("{error}: {message}")
    }
}
