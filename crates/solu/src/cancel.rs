use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, SoluError};

/// Run `fut` unless `token` fires first
pub(crate) async fn run_cancellable<F>(token: &CancellationToken, fut: F) -> Result<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SoluError::Cancelled),
        output = fut => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let token = CancellationToken::new();
        assert_eq!(run_cancellable(&token, async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let result = run_cancellable(&token, std::future::pending::<()>()).await;
        assert!(matches!(result, Err(SoluError::Cancelled)));
    }
}
