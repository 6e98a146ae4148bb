//! Command handlers.
//!
//! Each handler returns `Ok(true)` on success and `Ok(false)` when the
//! failure has already been shown to the user. Only unexpected errors are
//! propagated.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use profilesync_core::{
    AccessGate, ApiError, Config, Credentials, Error, GateDecision, NavigationEvent, Notifier,
    ProfilePatch, ProfileSync, RegistrationForm, SessionState, UpdateOutcome,
};

use crate::console::{self, ConsoleNotifier};

/// Read the password from here instead of prompting (for scripting)
const ENV_PASSWORD: &str = "PROFILESYNC_PASSWORD";

pub struct App {
    config: Config,
    client: ProfileSync,
    notifier: Arc<ConsoleNotifier>,
    navigation: broadcast::Receiver<NavigationEvent>,
    /// Latest navigation the client asked for, shown once on exit
    pending: Option<NavigationEvent>,
}

impl App {
    pub async fn new() -> Result<Self> {
        let config = Config::load()
            .unwrap_or_else(|e| {
                warn!("Failed to load config, using defaults: {:#}", e);
                Config::default()
            })
            .with_env_overrides();
        debug!(api_url = config.api_url(), backend = ?config.credential_backend, "Loaded config");

        let notifier = Arc::new(ConsoleNotifier);
        let client = ProfileSync::from_config(&config, notifier.clone())
            .context("Failed to set up client")?;
        let navigation = client.navigation();
        client.start().await;

        Ok(Self {
            config,
            client,
            notifier,
            navigation,
            pending: None,
        })
    }

    pub async fn login(&mut self, identifier: Option<String>) -> Result<bool> {
        let identifier = match identifier.or_else(|| self.config.last_identifier.clone()) {
            Some(identifier) => identifier,
            None => prompt("Email or username: ")?,
        };
        let password = password("Password: ")?;

        let credentials = Credentials::new(identifier.trim(), password);
        let Some(session) = self.settle(self.client.sign_in(&credentials).await)? else {
            return Ok(false);
        };

        self.config.last_identifier = Some(credentials.identifier);
        if let Err(e) = self.config.save() {
            warn!("Failed to save config: {:#}", e);
        }
        println!("Signed in as {}", session.profile.display_name());
        Ok(true)
    }

    pub async fn register(&mut self, username: String, email: String) -> Result<bool> {
        let form = RegistrationForm {
            username,
            email,
            password: password("Password: ")?,
            confirm_password: password("Confirm password: ")?,
        };
        let Some(session) = self.settle(self.client.sign_up(&form).await)? else {
            return Ok(false);
        };

        self.config.last_identifier = Some(form.email);
        if let Err(e) = self.config.save() {
            warn!("Failed to save config: {:#}", e);
        }
        println!("Signed in as {}", session.profile.display_name());
        Ok(true)
    }

    pub fn logout(&mut self) {
        if !self.client.sessions().is_authenticated() {
            println!("Not signed in.");
            return;
        }
        self.client.sign_out();
        // Signing out is the user's own request; no need to point them at login
        self.drain_navigation();
        self.pending = None;
    }

    pub async fn whoami(&mut self, json: bool) -> Result<bool> {
        if !self.gate().await {
            return Ok(false);
        }

        let profile = match self.client.profile().await {
            Ok(profile) => profile,
            Err(Error::Api(ApiError::Unauthorized)) => return Ok(false),
            Err(Error::Api(e)) => {
                self.notifier.error(&e.to_string());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        } else {
            console::print_dashboard(&profile, self.client.cache().entry().as_ref());
        }
        Ok(true)
    }

    pub async fn update(&mut self, patch: ProfilePatch) -> Result<bool> {
        if !self.gate().await {
            return Ok(false);
        }
        if patch.is_empty() {
            self.notifier
                .warning("Nothing to change. Pass --username, --email or --set KEY=VALUE.");
            return Ok(false);
        }

        match self.settle(self.client.update_profile(patch).await)? {
            Some(UpdateOutcome::Committed(profile)) => {
                for line in console::render_profile(&profile) {
                    println!("{}", line);
                }
                Ok(true)
            }
            // Already reported by the updater
            Some(UpdateOutcome::NothingToUpdate) => Ok(true),
            None => Ok(false),
        }
    }

    pub fn status(&self) {
        match self.client.sessions().state() {
            SessionState::Authenticated(session) => {
                println!("Signed in as {}", session.profile.display_name());
                println!("  api      {}", self.client.api().base_url());
                println!("  session  {} old", format_age(session.age()));
            }
            SessionState::Unauthenticated | SessionState::Hydrating => {
                println!("Not signed in.");
                println!("  api      {}", self.client.api().base_url());
            }
        }
    }

    /// Print a hint for the last navigation the client requested
    pub fn follow_navigation(&mut self) {
        self.drain_navigation();
        if let Some(event) = self.pending.take() {
            debug!(to = event.to.path(), replace = event.replace, "Navigation requested");
            if let Some(hint) = console::navigation_hint(event.to) {
                eprintln!("{}", hint);
            }
        }
    }

    fn drain_navigation(&mut self) {
        loop {
            match self.navigation.try_recv() {
                Ok(event) => self.pending = Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Navigation receiver lagged");
                }
                Err(_) => break,
            }
        }
    }

    /// Run the access gate; on redirect remember where to send the user
    async fn gate(&mut self) -> bool {
        match AccessGate::resolve(self.client.sessions()).await {
            GateDecision::Render(()) => true,
            GateDecision::Redirect(event) => {
                println!("Not signed in.");
                self.pending = Some(event);
                false
            }
            GateDecision::Loading => false,
        }
    }

    /// Sort a core result into success, an already-reported failure, or an
    /// unexpected error
    fn settle<T>(&self, result: profilesync_core::Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            // Api failures are notified by the core before they reach us
            Err(Error::Api(_)) => Ok(None),
            Err(Error::Validation(e)) => {
                self.notifier.error(&format!("{}: {}", e.field, e.message));
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", label)?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn password(label: &str) -> Result<String> {
    if let Ok(password) = std::env::var(ENV_PASSWORD) {
        return Ok(password);
    }
    rpassword::prompt_password(label).context("Failed to read password")
}

fn format_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes().max(0);
    if minutes < 1 {
        "<1m".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 1440 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}d", minutes / 1440)
    }
}
