//! Passphrase resolution.
//!
//! Resolution for an environment is an ordered chain, each step tried only
//! when the previous one yields nothing:
//! 1. the process-level override captured when the resolver was built
//! 2. the passphrase cached in the credential store
//! 3. an interactive prompt, whose answer is written back to the cache
//!
//! The resolver only decides *which* passphrase to use. Checking it against
//! a vault fingerprint happens in [`VaultStore`](crate::VaultStore).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use envsecrets_common::{EnvName, Error, Passphrase, Result};
use envsecrets_credentials::CredentialStore;

/// Interactive input from the operator.
pub trait Prompter: Send + Sync {
    /// Read a secret without echoing it.
    ///
    /// # Errors
    /// - `Cancelled` if the operator aborts
    fn passphrase(&self, message: &str) -> Result<String>;

    /// Ask a yes/no question. Anything but an explicit yes is `false`.
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Prompter answering from a fixed script, for headless use and tests.
///
/// Clones share the same script. Running out of answers is reported as a
/// cancelled prompt.
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    state: Arc<Mutex<Script>>,
}

#[derive(Default)]
struct Script {
    passphrases: VecDeque<String>,
    confirmations: VecDeque<bool>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    /// Script the answers to successive passphrase prompts.
    pub fn new<I, S>(passphrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = Script {
            passphrases: passphrases.into_iter().map(Into::into).collect(),
            ..Script::default()
        };
        Self {
            state: Arc::new(Mutex::new(script)),
        }
    }

    /// Queue an answer to the next unanswered confirmation.
    pub fn push_confirmation(&self, answer: bool) {
        self.lock().confirmations.push_back(answer);
    }

    /// Queue an answer to the next unanswered passphrase prompt.
    pub fn push_passphrase(&self, answer: impl Into<String>) {
        self.lock().passphrases.push_back(answer.into());
    }

    /// Messages shown so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.lock().asked.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Prompter for ScriptedPrompter {
    fn passphrase(&self, message: &str) -> Result<String> {
        let mut script = self.lock();
        script.asked.push(message.to_string());
        script
            .passphrases
            .pop_front()
            .ok_or_else(|| Error::Cancelled("no answer for passphrase prompt".to_string()))
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        let mut script = self.lock();
        script.asked.push(message.to_string());
        script
            .confirmations
            .pop_front()
            .ok_or_else(|| Error::Cancelled("no answer for confirmation".to_string()))
    }
}

/// Produces the passphrase for an environment.
pub struct PassphraseResolver {
    override_passphrase: Option<Passphrase>,
    credentials: Arc<dyn CredentialStore>,
    prompter: Arc<dyn Prompter>,
}

impl PassphraseResolver {
    /// Create a resolver.
    ///
    /// `override_passphrase` is used verbatim for every environment and is
    /// never cached.
    pub fn new(
        override_passphrase: Option<Passphrase>,
        credentials: Arc<dyn CredentialStore>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            override_passphrase,
            credentials,
            prompter,
        }
    }

    /// Create a resolver whose override is read once from the environment
    /// variable `var`. Unset or empty means no override.
    pub fn from_env_var(
        var: &str,
        credentials: Arc<dyn CredentialStore>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        let override_passphrase = std::env::var(var)
            .ok()
            .and_then(|value| Passphrase::new(value).ok());
        if override_passphrase.is_some() {
            debug!("Passphrase override present in {}", var);
        }
        Self::new(override_passphrase, credentials, prompter)
    }

    /// The override passphrase, if one was supplied.
    pub fn override_passphrase(&self) -> Option<&Passphrase> {
        self.override_passphrase.as_ref()
    }

    /// Resolve the passphrase for `env` through the full chain.
    ///
    /// # Errors
    /// - `InvalidInput` if the prompt yields an empty string
    /// - `Cancelled` if the prompt is aborted
    pub fn resolve(&self, env: &EnvName) -> Result<Passphrase> {
        if let Some(passphrase) = &self.override_passphrase {
            debug!("Using override passphrase for environment {}", env);
            return Ok(passphrase.clone());
        }

        match self.credentials.get(env) {
            Ok(Some(passphrase)) => {
                debug!("Using cached passphrase for environment {}", env);
                return Ok(passphrase);
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read cached passphrase for {}: {}", env, e),
        }

        let passphrase = self.ask(&format!("Enter passphrase for environment {:?}:", env.as_str()))?;
        self.remember(env, &passphrase);
        Ok(passphrase)
    }

    /// Ask the operator to choose a new passphrase for `env`, twice.
    ///
    /// Neither the override nor the cache is consulted, and nothing is cached.
    ///
    /// # Errors
    /// - `InvalidInput` if the answer is empty or the two answers differ
    pub fn prompt_new(&self, env: &EnvName) -> Result<Passphrase> {
        let passphrase = self.ask(&format!(
            "Enter new passphrase for environment {:?}:",
            env.as_str()
        ))?;
        let confirmation = self.ask("Confirm passphrase:")?;
        if passphrase != confirmation {
            return Err(Error::InvalidInput("passphrases do not match".to_string()));
        }
        Ok(passphrase)
    }

    /// Ask once for a passphrase, bypassing the override and the cache.
    pub fn prompt_fresh(&self, message: &str) -> Result<Passphrase> {
        self.ask(message)
    }

    /// Ask the operator a yes/no question.
    pub fn confirm(&self, message: &str) -> Result<bool> {
        self.prompter.confirm(message)
    }

    /// Cache `passphrase` for `env`. Failure is logged, not returned.
    pub fn remember(&self, env: &EnvName, passphrase: &Passphrase) {
        if let Err(e) = self.credentials.set(env, passphrase) {
            warn!("Failed to cache passphrase for {} in keyring: {}", env, e);
        }
    }

    /// Remove any cached passphrase for `env`.
    pub fn forget(&self, env: &EnvName) -> Result<()> {
        self.credentials.delete(env)
    }

    fn ask(&self, message: &str) -> Result<Passphrase> {
        let answer = self.prompter.passphrase(message)?;
        Passphrase::new(answer)
    }
}
