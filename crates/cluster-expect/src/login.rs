//! Data-driven login sequences.
//!
//! A login flow is a list of (expect, send) steps — data, not code. The
//! institution-specific strings (a second-factor banner, a shell prompt
//! keyed to the username) arrive through [`DuoLogin`] configuration and
//! are rendered into a [`LoginDialog`] at call time. Nothing in this
//! module hard-codes any site's prompt text.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::duration_secs;
use crate::error::{Error, Result};
use crate::expect::{ExpectOptions, Prompt};
use crate::shell::ShellSession;

/// One step of a login dialog: optionally wait for a prompt, optionally
/// send a line.
#[derive(Debug, Clone)]
pub struct LoginStep {
    /// Name of the step, for reports and logs.
    pub name: String,
    /// Prompt to wait for before acting.
    pub expect: Option<Prompt>,
    /// Line to send (terminator appended by the engine).
    pub send: Option<String>,
    /// Wall-clock budget override for this step's expect.
    pub timeout: Option<Duration>,
    /// Keep going even if the prompt never matched.
    pub continue_on_timeout: bool,
}

impl LoginStep {
    /// Create a named step.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expect: None,
            send: None,
            timeout: None,
            continue_on_timeout: false,
        }
    }

    /// Wait for this prompt before acting.
    #[must_use]
    pub fn expect(mut self, prompt: impl Into<Prompt>) -> Self {
        self.expect = Some(prompt.into());
        self
    }

    /// Send this line after the prompt matches.
    #[must_use]
    pub fn send(mut self, text: impl Into<String>) -> Self {
        self.send = Some(text.into());
        self
    }

    /// Override the expect budget for this step.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Do not fail the dialog when this step's prompt never matches.
    #[must_use]
    pub const fn continue_on_timeout(mut self, cont: bool) -> Self {
        self.continue_on_timeout = cont;
        self
    }
}

/// An ordered login sequence with shared expect tuning.
#[derive(Debug, Clone)]
pub struct LoginDialog {
    /// Name of the dialog, for reports and logs.
    pub name: String,
    /// The steps, executed in order.
    pub steps: Vec<LoginStep>,
    /// Expect tuning shared by all steps (per-step budget overrides via
    /// [`LoginStep::timeout`]).
    pub options: ExpectOptions,
}

impl LoginDialog {
    /// Create a named, empty dialog.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            options: ExpectOptions::default(),
        }
    }

    /// Append a step.
    #[must_use]
    pub fn step(mut self, step: LoginStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Set the shared expect tuning.
    #[must_use]
    pub fn options(mut self, options: ExpectOptions) -> Self {
        self.options = options;
        self
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the dialog has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Name of the step.
    pub step_name: String,
    /// Whether the step's prompt matched (true for steps without one).
    pub matched: bool,
    /// The last chunk received while waiting.
    pub last_chunk: String,
    /// The line that was sent, if any.
    pub sent: Option<String>,
}

/// Outcome of a whole dialog run.
#[derive(Debug, Clone)]
pub struct LoginReport {
    /// Name of the dialog.
    pub dialog_name: String,
    /// Whether every required step matched.
    pub success: bool,
    /// Per-step outcomes, in execution order.
    pub steps: Vec<StepOutcome>,
}

impl LoginReport {
    /// Get a step outcome by name.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step_name == name)
    }
}

/// The second-factor delivery method, as offered by a Duo-style banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecondFactor {
    /// Push notification (option 1).
    #[default]
    Push,
    /// Phone call (option 2).
    PhoneCall,
    /// SMS passcode (option 3).
    Sms,
}

impl SecondFactor {
    /// The digit the banner expects for this method.
    #[must_use]
    pub const fn digit(self) -> char {
        match self {
            Self::Push => '1',
            Self::PhoneCall => '2',
            Self::Sms => '3',
        }
    }
}

/// Configuration for a two-factor login flow.
///
/// The two prompt strings are deployment data: the banner fragment that
/// asks for a passcode method, and the shell prompt fragment that proves
/// login finished (with `{user}` substituted at render time). Load them
/// from TOML next to the rest of the session configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DuoLogin {
    /// Substring of the banner asking for a passcode method.
    pub factor_prompt: String,
    /// Substring of the post-login shell prompt; `{user}` is replaced
    /// with the username.
    pub shell_prompt: String,
    /// Which second-factor method to select.
    pub factor: SecondFactor,
    /// Skip the second-factor exchange entirely (e.g. hosts inside the
    /// trusted network).
    pub skip_second_factor: bool,
    /// Wall-clock budget per step.
    #[serde(with = "duration_secs")]
    pub step_timeout: Duration,
    /// Receive timeout per expect iteration.
    #[serde(with = "duration_secs")]
    pub recv_timeout: Duration,
}

impl Default for DuoLogin {
    fn default() -> Self {
        Self {
            factor_prompt: String::new(),
            shell_prompt: String::new(),
            factor: SecondFactor::default(),
            skip_second_factor: false,
            step_timeout: Duration::from_secs(60),
            recv_timeout: Duration::from_millis(300),
        }
    }
}

impl DuoLogin {
    /// Create a flow from the two deployment-specific prompt strings.
    #[must_use]
    pub fn new(factor_prompt: impl Into<String>, shell_prompt: impl Into<String>) -> Self {
        Self {
            factor_prompt: factor_prompt.into(),
            shell_prompt: shell_prompt.into(),
            ..Default::default()
        }
    }

    /// Select the second-factor method.
    #[must_use]
    pub const fn factor(mut self, factor: SecondFactor) -> Self {
        self.factor = factor;
        self
    }

    /// Skip the second-factor exchange.
    #[must_use]
    pub const fn skip_second_factor(mut self, skip: bool) -> Self {
        self.skip_second_factor = skip;
        self
    }

    /// Set the per-step budget.
    #[must_use]
    pub const fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        crate::config::from_toml_str(s)
    }

    /// Load from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        crate::config::from_toml_file(path.as_ref())
    }

    /// Render the dialog for a user.
    ///
    /// With the second factor skipped, the dialog is a single wait for
    /// the shell prompt; otherwise it is
    /// expect-banner → send-digit → expect-shell-prompt.
    pub fn dialog(&self, user: &str) -> Result<LoginDialog> {
        let shell_prompt = self.shell_prompt.replace("{user}", user);
        if shell_prompt.is_empty() {
            return Err(Error::config("shell_prompt must not be empty"));
        }

        let options = ExpectOptions::new(self.step_timeout).recv_timeout(self.recv_timeout);
        let mut dialog = LoginDialog::named("two-factor-login").options(options);

        if !self.skip_second_factor {
            if self.factor_prompt.is_empty() {
                return Err(Error::config(
                    "factor_prompt must not be empty unless skip_second_factor is set",
                ));
            }
            dialog = dialog.step(
                LoginStep::new("second-factor")
                    .expect(Prompt::contains(self.factor_prompt.as_str()))
                    .send(self.factor.digit().to_string()),
            );
        }

        Ok(dialog.step(LoginStep::new("shell-prompt").expect(Prompt::contains(shell_prompt))))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> ShellSession<T> {
    /// Execute a login dialog on this session.
    ///
    /// Steps run in order. A step whose prompt does not match within its
    /// budget ends the dialog with `success = false` — unless the step is
    /// marked `continue_on_timeout`, in which case its send still happens
    /// and execution moves on. I/O failures propagate as errors; an
    /// unmatched prompt does not.
    pub async fn run_login(&mut self, dialog: &LoginDialog) -> Result<LoginReport> {
        let mut steps = Vec::with_capacity(dialog.steps.len());

        for step in &dialog.steps {
            let mut matched = true;
            let mut last_chunk = String::new();

            if let Some(prompt) = &step.expect {
                let mut options = dialog.options.clone();
                if let Some(budget) = step.timeout {
                    options.total_timeout = budget;
                }
                let outcome = self.expect_with(prompt, &options).await?;
                matched = outcome.matched;
                last_chunk = outcome.last_chunk;
            }

            let proceed = matched || step.continue_on_timeout;
            let sent = if proceed {
                if let Some(text) = &step.send {
                    self.send_line(text).await?;
                    Some(text.clone())
                } else {
                    None
                }
            } else {
                None
            };

            steps.push(StepOutcome {
                step_name: step.name.clone(),
                matched,
                last_chunk,
                sent,
            });

            if !proceed {
                tracing::warn!(
                    dialog = %dialog.name,
                    step = %step.name,
                    "login step prompt did not match within budget"
                );
                return Ok(LoginReport {
                    dialog_name: dialog.name.clone(),
                    success: false,
                    steps,
                });
            }
        }

        tracing::info!(dialog = %dialog.name, "login dialog completed");
        Ok(LoginReport {
            dialog_name: dialog.name.clone(),
            success: true,
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duo_dialog_renders_three_phase_flow() {
        let flow = DuoLogin::new("Passcode or option (1-3)", "[{user}@").factor(SecondFactor::Sms);
        let dialog = flow.dialog("alice").unwrap();

        assert_eq!(dialog.len(), 2);
        let factor = &dialog.steps[0];
        assert_eq!(factor.name, "second-factor");
        assert!(factor.expect.as_ref().unwrap().matches("Passcode or option (1-3):"));
        assert_eq!(factor.send.as_deref(), Some("3"));

        let prompt = &dialog.steps[1];
        assert_eq!(prompt.name, "shell-prompt");
        assert!(prompt.expect.as_ref().unwrap().matches("[alice@login01 ~]$"));
        assert!(!prompt.expect.as_ref().unwrap().matches("[bob@login01 ~]$"));
    }

    #[test]
    fn duo_dialog_skip_second_factor() {
        let flow = DuoLogin::new("", "[{user}@").skip_second_factor(true);
        let dialog = flow.dialog("alice").unwrap();
        assert_eq!(dialog.len(), 1);
        assert_eq!(dialog.steps[0].name, "shell-prompt");
    }

    #[test]
    fn duo_dialog_requires_prompts() {
        let err = DuoLogin::new("", "[{user}@").dialog("alice").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = DuoLogin::new("Passcode", "").dialog("alice").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn duo_from_toml() {
        let flow = DuoLogin::from_toml_str(
            r#"
            factor_prompt = "Passcode or option (1-3)"
            shell_prompt = "[{user}@"
            factor = "phone-call"
            step_timeout = 45
            recv_timeout = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(flow.factor, SecondFactor::PhoneCall);
        assert_eq!(flow.factor.digit(), '2');
        assert_eq!(flow.step_timeout, Duration::from_secs(45));

        let dialog = flow.dialog("alice").unwrap();
        assert_eq!(dialog.options.total_timeout, Duration::from_secs(45));
        assert_eq!(dialog.options.recv_timeout, Duration::from_millis(300));
    }

    #[test]
    fn step_builder() {
        let step = LoginStep::new("probe")
            .expect("$ ")
            .send("echo ok")
            .timeout(Duration::from_secs(5))
            .continue_on_timeout(true);
        assert!(step.expect.is_some());
        assert_eq!(step.send.as_deref(), Some("echo ok"));
        assert_eq!(step.timeout, Some(Duration::from_secs(5)));
        assert!(step.continue_on_timeout);
    }
}
