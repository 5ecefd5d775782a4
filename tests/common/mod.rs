//! Common test utilities for E2E tests

use tempfile::TempDir;
use tokio::net::TcpListener;
use tunedeck::{AppState, config};

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with default (unreachable)
    /// Google endpoints.
    pub async fn new() -> Self {
        Self::with_google_base_url(None).await
    }

    /// Create a test server whose Google OAuth endpoints point at a
    /// stand-in server (wiremock).
    pub async fn with_google_base_url(google_base_url: Option<&str>) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let (auth_url, token_url, userinfo_url) = match google_base_url {
            Some(base) => (
                format!("{base}/auth"),
                format!("{base}/token"),
                format!("{base}/userinfo"),
            ),
            None => (
                "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                "https://oauth2.googleapis.com/token".to_string(),
                "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            ),
        };

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                google: config::GoogleOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
                    auth_url,
                    token_url,
                    userinfo_url,
                },
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = tunedeck::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a test account directly in the database
    pub async fn create_test_account(&self, email: &str, password: &str) -> tunedeck::data::Account {
        self.state
            .accounts
            .register("Test User", email, password)
            .await
            .unwrap()
    }

    /// Mint a valid session token for an account
    pub fn create_session_token(&self, account: &tunedeck::data::Account) -> String {
        let (_, token) = tunedeck::auth::issue_session(
            account,
            &self.state.config.auth.session_secret,
            self.state.config.auth.session_max_age,
        )
        .expect("failed to mint test session token");
        token
    }
}

/// A client that does not follow redirects, for asserting on them.
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Pull the session cookie pair ("session=<value>") out of a response's
/// Set-Cookie headers.
pub fn session_cookie_from(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}
