use std::time::Duration;

use async_trait::async_trait;

use crate::accept::AcceptanceSink;
use crate::browser::{Locator, Session, WebDriver};
use crate::config::{BrowserConfig, GitHubConfig};
use crate::error::{AppError, Result};
use crate::workflow::types::{AcceptanceTarget, InvitationCandidate};

const ACCEPT_BUTTON_XPATH: &str = "//button[contains(text(), 'Accept invitation')]";

/// Accepts invitations by logging in through a WebDriver-controlled browser
/// and clicking the accept button on the invitation page.
pub struct BrowserAcceptor {
    driver: WebDriver,
    login_url: String,
    username: String,
    password: String,
    headless: bool,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl BrowserAcceptor {
    pub fn new(
        browser: &BrowserConfig,
        github: &GitHubConfig,
        request_timeout: Duration,
    ) -> Result<Self> {
        let username = github
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::Config("github.username is required for browser acceptance".into()))?;
        let password = github
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Config("github.password is required for browser acceptance".into()))?;

        Ok(Self {
            driver: WebDriver::new(&browser.webdriver_url, request_timeout)?,
            login_url: format!("{}/login", github.web_base.trim_end_matches('/')),
            username,
            password,
            headless: browser.headless,
            wait_timeout: Duration::from_secs(browser.wait_timeout_secs),
            poll_interval: Duration::from_millis(browser.poll_interval_millis),
        })
    }

    async fn login(&self, session: &Session) -> Result<()> {
        tracing::debug!(url = %self.login_url, "Logging in");
        session.navigate(&self.login_url).await?;

        let login_field = session
            .wait_for_present(&Locator::css("#login_field"), self.wait_timeout, self.poll_interval)
            .await?;
        session.send_keys(&login_field, &self.username).await?;

        let password_field = session
            .find(&Locator::css("#password"))
            .await?
            .ok_or_else(|| AppError::Browser("password field not found on login page".into()))?;
        session.send_keys(&password_field, &self.password).await?;

        let submit = session
            .find(&Locator::css("[name=commit]"))
            .await?
            .ok_or_else(|| AppError::Browser("sign-in button not found on login page".into()))?;
        session.click(&submit).await?;

        let login_url = self.login_url.clone();
        let (left_login, url) = session
            .wait_for_url(move |u| !u.starts_with(&login_url), self.wait_timeout, self.poll_interval)
            .await?;
        if !left_login {
            return Err(AppError::Browser(format!("Login did not complete, still at {url}")));
        }
        Ok(())
    }

    async fn accept_in(&self, session: &Session, url: &str, repo_full_name: &str) -> Result<()> {
        self.login(session).await?;

        session.navigate(url).await?;
        let button = session
            .wait_for_clickable(&Locator::xpath(ACCEPT_BUTTON_XPATH), self.wait_timeout, self.poll_interval)
            .await?;
        session.click(&button).await?;

        let (confirmed, current) = session
            .wait_for_url(
                |u| acceptance_confirmed(u, url, repo_full_name),
                self.wait_timeout,
                self.poll_interval,
            )
            .await?;
        if !confirmed {
            return Err(AppError::Browser(format!(
                "Acceptance verification failed: landed on {current}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AcceptanceSink for BrowserAcceptor {
    fn name(&self) -> &str {
        "browser"
    }

    async fn accept(&self, candidate: &InvitationCandidate) -> Result<()> {
        let AcceptanceTarget::Url(url) = &candidate.acceptance else {
            return Err(AppError::Internal(format!(
                "browser acceptance needs an invitation URL, got {}",
                candidate.acceptance
            )));
        };

        let session = self.driver.new_session(self.headless).await?;
        let result = self.accept_in(&session, url, &candidate.repo_full_name).await;
        session.quit().await;
        result
    }
}

/// Whether `url` refers to the repository `owner/name`. Slashes are ignored
/// on both sides so trailing separators and the path prefix do not matter.
pub fn url_confirms_repo(url: &str, repo_full_name: &str) -> bool {
    let wanted = repo_full_name.replace('/', "").to_lowercase();
    !wanted.is_empty() && url.replace('/', "").to_lowercase().contains(&wanted)
}

/// Whether the browser left the invitation page for the repository itself.
/// Staying on `acceptance_url` means the click had no effect.
pub fn acceptance_confirmed(current: &str, acceptance_url: &str, repo_full_name: &str) -> bool {
    let here = page_path(current);
    here != page_path(acceptance_url)
        && !here.ends_with("/invitations")
        && url_confirms_repo(current, repo_full_name)
}

fn page_path(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].trim_end_matches('/').to_lowercase()
}
