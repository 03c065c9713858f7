use std::fmt;
use thiserror::Error;

/// The three-way error taxonomy: transient failures are
/// retried with backoff, logical failures are surfaced to the supervisor,
/// fatal failures abort the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
	Transient,
	Logical,
	Fatal,
}

/// Implemented by every crate-local `Error` type so the supervisor can
/// dispatch restart-vs-abort policy without matching on concrete variants.
pub trait Classify {
	fn class(&self) -> ErrorClass;
}

/// Error type used at the worker/supervisor boundary. Crate-local errors
/// (`relay_ethereum_client::Error`, `relay_substrate_client::Error`,
/// `beefy_relay::Error`) are folded into this type via [`Classify`] at the
/// point a worker is wired up in `relay-cli`.
#[derive(Debug, Error)]
pub enum RelayError {
	#[error("transient failure in {context}: {message}")]
	Transient { context: String, message: String },
	#[error("logical failure in {context}: {message}")]
	Logical { context: String, message: String },
	#[error("fatal failure in {context}: {message}")]
	Fatal { context: String, message: String },
	#[error("worker '{worker}' exhausted its restart budget after {attempts} attempts")]
	RestartBudgetExhausted { worker: String, attempts: u32 },
	#[error("failed to install signal handler")]
	Signal(#[source] std::io::Error),
}

impl RelayError {
	pub fn transient(context: impl Into<String>, message: impl fmt::Display) -> Self {
		RelayError::Transient { context: context.into(), message: message.to_string() }
	}

	pub fn logical(context: impl Into<String>, message: impl fmt::Display) -> Self {
		RelayError::Logical { context: context.into(), message: message.to_string() }
	}

	pub fn fatal(context: impl Into<String>, message: impl fmt::Display) -> Self {
		RelayError::Fatal { context: context.into(), message: message.to_string() }
	}

	/// Folds any crate-local error into a [`RelayError`], preserving its
	/// `Classify::class()` verdict and rendering it with `Display`.
	pub fn from_classified(context: impl Into<String>, err: &(impl Classify + fmt::Display)) -> Self {
		let context = context.into();
		match err.class() {
			ErrorClass::Transient => RelayError::transient(context, err),
			ErrorClass::Logical => RelayError::logical(context, err),
			ErrorClass::Fatal => RelayError::fatal(context, err),
		}
	}
}

impl Classify for RelayError {
	fn class(&self) -> ErrorClass {
		match self {
			RelayError::Transient { .. } => ErrorClass::Transient,
			RelayError::Logical { .. } => ErrorClass::Logical,
			RelayError::Fatal { .. }
			| RelayError::RestartBudgetExhausted { .. }
			| RelayError::Signal(_) => ErrorClass::Fatal,
		}
	}
}
