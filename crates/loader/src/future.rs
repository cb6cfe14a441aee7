//! Single-assignment future behind [`Loader::load`](crate::Loader::load).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::LoadError;

/// Single-assignment future for one require.
///
/// Resolves to the require's outcome, or to [`LoadError::Abandoned`] if the
/// loader went away before answering.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled, but the request has already been issued"]
pub struct LoadFuture<T> {
	receiver: oneshot::Receiver<Result<T, LoadError>>,
}

impl<T> LoadFuture<T> {
	pub(crate) fn new(receiver: oneshot::Receiver<Result<T, LoadError>>) -> Self {
		Self { receiver }
	}
}

impl<T> Future for LoadFuture<T> {
	type Output = Result<T, LoadError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.receiver)
			.poll(cx)
			.map(|received| received.unwrap_or(Err(LoadError::Abandoned)))
	}
}
