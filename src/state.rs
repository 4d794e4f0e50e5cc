//! Shared application state for the web server

use minijinja::Environment;
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::Settings;
use crate::error::ApiError;
use crate::services::settings_store::SettingsStore;
use crate::storage::Database;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Shared state injected into every Axum handler
pub struct AppState {
    pub settings: Settings,
    pub db: Mutex<Database>,
    pub http: Client,
    pub templates: Environment<'static>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        db: Database,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            settings,
            db: Mutex::new(db),
            http,
            templates: build_templates()?,
        })
    }

    /// Lock the database for a batch of queries.
    ///
    /// Queries are synchronous and short; the guard must not be held across
    /// an await point.
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }

    pub fn settings_store(&self) -> SettingsStore {
        SettingsStore::new(self.settings.settings_path())
    }

    /// Render one of the embedded templates.
    pub fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, ApiError> {
        Ok(self.templates.get_template(name)?.render(ctx)?)
    }
}

/// Templates are compiled into the binary.
fn build_templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("base.html", include_str!("../templates/base.html"))?;
    env.add_template("index.html", include_str!("../templates/index.html"))?;
    env.add_template("library.html", include_str!("../templates/library.html"))?;
    env.add_template("paper.html", include_str!("../templates/paper.html"))?;
    env.add_template("settings.html", include_str!("../templates/settings.html"))?;
    Ok(env)
}

pub type SharedState = Arc<AppState>;
