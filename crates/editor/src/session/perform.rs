use mdm_rpc::{Diagnostic, Error, EvaluatorChannel, RemoteError, RenderOutput};

use crate::coordinator::{EvaluationCall, EvaluationOutcome, Failure};

/// Performs one evaluation call and converts every rejection into an outcome.
///
/// Document calls first reset the evaluator context and configure it from
/// the source; an incomplete configuration means a dependency is still
/// loading and is reported as not ready. The context is held for the whole
/// sequence, so concurrent performs never evaluate under each other's
/// configuration.
pub async fn perform(channel: &EvaluatorChannel, call: EvaluationCall) -> EvaluationOutcome {
	match run(channel, call).await {
		Ok(Some(render)) => EvaluationOutcome::Success(render),
		Ok(None) => EvaluationOutcome::Invalidated,
		Err(error) => EvaluationOutcome::Failure(classify(error)),
	}
}

async fn run(channel: &EvaluatorChannel, call: EvaluationCall) -> mdm_rpc::Result<Option<RenderOutput>> {
	let _context = channel.lock_context().await;
	if call.needs_configuration() {
		channel.reset_context().await?;
		if !channel.configure_from_source(call.source()).await? {
			return Err(RemoteError::NotReady {
				detail: "configuration incomplete".into(),
			}
			.into());
		}
	}

	let text = match call {
		EvaluationCall::Evaluate { source, format } => return channel.evaluate(source, format).await,
		EvaluationCall::EvaluateFragment { source, format } => return channel.evaluate_fragment(source, format).await,
		EvaluationCall::SyntaxTree { source } => channel.abstract_syntax_tree(source).await?,
		EvaluationCall::DebugSyntaxTree { source } => channel.debug_abstract_syntax_tree(source).await?,
		EvaluationCall::StructuredOutput { source } => channel.structured_output(source).await?,
	};
	Ok(text.map(RenderOutput::text))
}

/// Maps a call error onto the coordinator's failure kinds.
///
/// Errors the worker raised while evaluating are shown to the user like
/// evaluation errors; only an unreachable or misbehaving worker is a
/// transport failure.
pub fn classify(error: Error) -> Failure {
	match error {
		Error::Remote(RemoteError::NotReady { detail }) => Failure::NotReady { detail },
		Error::Remote(RemoteError::Evaluation(diagnostics)) => Failure::Evaluation(diagnostics),
		Error::Remote(remote) => Failure::Evaluation(vec![Diagnostic::from_message(remote.to_string())]),
		other => Failure::Transport { detail: other.to_string() },
	}
}
