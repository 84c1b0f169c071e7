// =============================================================================
// INTERACTIVE AUTHORIZATION FLOWS
// =============================================================================
//
// Three interchangeable ways to get an authorization code out of the person
// running `content-agent auth`:
//
// 1. **loopback**: listen on localhost, let Google redirect the browser back
//    to us, read the code off the request. Needs a browser on the same machine.
// 2. **paste**: the browser lands on a localhost URL that may fail to load;
//    the user copies the whole URL from the address bar and pastes it here.
// 3. **console**: the user pastes just the code.
//
// All three print the consent URL and leave the token exchange to the
// credential service.

use std::collections::HashMap;
use std::io::Write;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::google_oauth_client::authorization_url;
use crate::core::credentials::{
    AuthorizationFlow, AuthorizationGrant, AuthorizationRequest, CredentialError,
};

const DEFAULT_REDIRECT_URI: &str = "http://localhost";

const SUCCESS_PAGE: &str = "<html><body><h2>Authorization complete.</h2>\
    <p>You can close this window and return to the terminal.</p></body></html>";
const FAILURE_PAGE: &str = "<html><body><h2>Authorization failed.</h2>\
    <p>Check the terminal for details.</p></body></html>";
const MISSING_CODE_PAGE: &str = "<html><body><h2>No authorization code in this request.</h2>\
    <p>Finish the sign-in in the window Google opened.</p></body></html>";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlowKind {
    Loopback,
    Paste,
    Console,
}

impl FromStr for AuthFlowKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "loopback" | "local" | "browser" => Ok(AuthFlowKind::Loopback),
            "paste" | "manual" => Ok(AuthFlowKind::Paste),
            "console" | "code" => Ok(AuthFlowKind::Console),
            other => Err(format!(
                "'{}' is not one of loopback, paste, console",
                other
            )),
        }
    }
}

pub fn flow_for(kind: AuthFlowKind, port: u16) -> Box<dyn AuthorizationFlow> {
    match kind {
        AuthFlowKind::Loopback => Box::new(LoopbackFlow::new(port)),
        AuthFlowKind::Paste => Box::new(PastedRedirectFlow),
        AuthFlowKind::Console => Box::new(ConsoleCodeFlow),
    }
}

// =============================================================================
// LOOPBACK
// =============================================================================

pub struct LoopbackFlow {
    port: u16,
}

impl LoopbackFlow {
    /// Port 0 lets the OS pick a free port.
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait]
impl AuthorizationFlow for LoopbackFlow {
    fn name(&self) -> &'static str {
        "loopback"
    }

    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, CredentialError> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .map_err(|e| CredentialError::Flow(format!("cannot listen on port {}: {}", self.port, e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| CredentialError::Flow(e.to_string()))?
            .port();
        let redirect_uri = format!("http://localhost:{}/", port);

        let url = authorization_url(request, &redirect_uri)?;
        println!("Please visit this URL to authorize the application:");
        println!("{}", url);
        tracing::info!("Waiting for the OAuth redirect on port {}...", port);

        let code = wait_for_code(listener, &request.state).await?;
        Ok(AuthorizationGrant { code, redirect_uri })
    }
}

/// Shared between the callback handler and `wait_for_code`. The sender is
/// taken by the first request that settles the flow.
#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<String>,
    outcome: Arc<Mutex<Option<oneshot::Sender<Result<String, CredentialError>>>>>,
}

/// Serves the listener until a redirect carries a code (or an OAuth error),
/// then shuts the server down. Any other path gets axum's 404.
async fn wait_for_code(listener: TcpListener, expected_state: &str) -> Result<String, CredentialError> {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let state = CallbackState {
        expected_state: Arc::new(expected_state.to_string()),
        outcome: Arc::new(Mutex::new(Some(outcome_tx))),
    };
    let app = Router::new()
        .route("/", get(handle_callback))
        .with_state(state);

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let outcome = outcome_rx
        .await
        .map_err(|_| CredentialError::Flow("callback server stopped before a redirect arrived".to_string()));

    let _ = shutdown_tx.send(());
    // Idle browser connections can hold graceful shutdown open; don't wait on them.
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Err(e))) => tracing::debug!("Callback server error: {}", e),
        Ok(Err(e)) => tracing::debug!("Callback server task failed: {}", e),
        Ok(Ok(Ok(()))) | Err(_) => {}
    }

    outcome?
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    let (status, page, outcome) = match code_from_query(params.iter(), &state.expected_state) {
        Ok(Some(code)) => (StatusCode::OK, SUCCESS_PAGE, Ok(code)),
        // A reload or a bare visit to the root: keep waiting.
        Ok(None) => return (StatusCode::BAD_REQUEST, Html(MISSING_CODE_PAGE)),
        Err(e) => (StatusCode::BAD_REQUEST, FAILURE_PAGE, Err(e)),
    };

    let sender = match state.outcome.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(sender) = sender {
        let _ = sender.send(outcome);
    }
    (status, Html(page))
}

// =============================================================================
// PASTE / CONSOLE
// =============================================================================

pub struct PastedRedirectFlow;

#[async_trait]
impl AuthorizationFlow for PastedRedirectFlow {
    fn name(&self) -> &'static str {
        "paste"
    }

    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, CredentialError> {
        let redirect_uri = registered_redirect_uri(request);
        let url = authorization_url(request, &redirect_uri)?;

        println!("1. Open this URL in your browser and complete the sign-in:");
        println!("{}", url);
        println!("2. The browser will be sent to a localhost page that may not load.");
        println!("   That's fine: copy the ENTIRE URL from the address bar (it contains 'code=').");

        let pasted = prompt_line("Paste the complete redirect URL here: ").await?;
        let code = code_from_pasted_url(&pasted, &request.state)?;
        Ok(AuthorizationGrant { code, redirect_uri })
    }
}

pub struct ConsoleCodeFlow;

#[async_trait]
impl AuthorizationFlow for ConsoleCodeFlow {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, CredentialError> {
        let redirect_uri = registered_redirect_uri(request);
        let url = authorization_url(request, &redirect_uri)?;

        println!("Please visit this URL to authorize the application:");
        println!("{}", url);

        let input = prompt_line("Enter authorization code: ").await?;
        // People paste the whole redirect URL here too.
        let code = if input.starts_with("http://") || input.starts_with("https://") {
            code_from_pasted_url(&input, &request.state)?
        } else {
            input
        };
        Ok(AuthorizationGrant { code, redirect_uri })
    }
}

fn registered_redirect_uri(request: &AuthorizationRequest) -> String {
    request
        .client
        .redirect_uris
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
}

fn code_from_pasted_url(pasted: &str, expected_state: &str) -> Result<String, CredentialError> {
    let url = Url::parse(pasted.trim())
        .map_err(|e| CredentialError::Flow(format!("could not parse URL: {}", e)))?;
    code_from_redirect(&url, expected_state)?.ok_or_else(|| {
        CredentialError::Flow("no authorization code found in URL (look for 'code=')".to_string())
    })
}

fn code_from_redirect(url: &Url, expected_state: &str) -> Result<Option<String>, CredentialError> {
    code_from_query(url.query_pairs(), expected_state)
}

/// `Ok(None)` when the query has no code at all. A `state` that does not match
/// the one we sent is rejected; a missing `state` is tolerated for pasted URLs.
fn code_from_query<K, V>(
    pairs: impl IntoIterator<Item = (K, V)>,
    expected_state: &str,
) -> Result<Option<String>, CredentialError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut code = None;
    for (key, value) in pairs {
        let value = value.as_ref();
        match key.as_ref() {
            "error" => {
                return Err(CredentialError::Flow(format!(
                    "authorization denied: {}",
                    value
                )))
            }
            "state" if value != expected_state => {
                return Err(CredentialError::Flow(
                    "state mismatch in redirect, refusing code".to_string(),
                ))
            }
            "code" if !value.is_empty() => code = Some(value.to_string()),
            _ => {}
        }
    }
    Ok(code)
}

async fn prompt_line(prompt: &str) -> Result<String, CredentialError> {
    print!("{}", prompt);
    std::io::stdout()
        .flush()
        .map_err(|e| CredentialError::Flow(e.to_string()))?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| CredentialError::Flow(e.to_string()))?;

    let line = line.trim().to_string();
    if line.is_empty() {
        return Err(CredentialError::Flow("no input provided".to_string()));
    }
    Ok(line)
}
