use std::future::Future;

use thiserror::Error;
use tracing::debug;

/// Classifies an error as worth another attempt.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    pub result: T,
    pub attempts: usize,
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: E },
    #[error("non-retryable failure on attempt {attempt}: {error}")]
    Fatal { attempt: usize, error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Fatal { attempt, .. } => *attempt,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal { error, .. } => error,
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// `max_attempts` attempts were made. The operation receives the 0-based
/// attempt number. No delay is inserted between attempts.
pub async fn retry<F, Fut, T, E>(
    max_attempts: usize,
    mut operation: F,
) -> Result<RetryOutcome<T>, RetryError<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0usize;
    loop {
        match operation(attempt).await {
            Ok(result) => {
                return Ok(RetryOutcome {
                    result,
                    attempts: attempt + 1,
                });
            }
            Err(error) => {
                attempt += 1;
                if !error.is_transient() {
                    return Err(RetryError::Fatal { attempt, error });
                }
                debug!(attempt, max_attempts, error = %error, "attempt failed");
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
            }
        }
    }
}
