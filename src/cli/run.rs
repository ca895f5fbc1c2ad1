//! Executes parsed CLI commands against the model server.

use std::io::Write;
use std::path::Path;

use base64::Engine;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Section;

use super::args::PromptOptions;
use crate::conversation::{ConversationEntry, ConversationRecorder};
use crate::error::{ChatError, ErrorContext};
use crate::models::{ChatCompletionRequest, ChatMessage, ChatRequest, GenerateRequest};
use crate::ollama::{ClientError, OllamaClient};
use crate::settings::Settings;
use crate::stream::{AbortController, AbortReason, StreamFormat};
use crate::traits::HttpClient;

/// Model named on the command line, else the settings default.
pub fn resolve_model(options: &PromptOptions, settings: &Settings) -> String {
    options
        .model
        .clone()
        .unwrap_or_else(|| settings.global_settings.default_model.clone())
}

/// Read an image file and base64-encode it for the request body.
pub fn encode_image(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .wrap_err_with(|| format!("Failed to read image {}", path.display()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Listener that writes each fragment to `out` and flushes.
///
/// The first failed write is logged and aborts the stream; later fragments
/// are dropped.
pub fn output_listener<W>(mut out: W, abort: AbortController) -> impl FnMut(&str) + Send + 'static
where
    W: Write + Send + 'static,
{
    let mut failed = false;
    move |text: &str| {
        if failed {
            return;
        }
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            failed = true;
            tracing::warn!(error = %err, "failed to write reply, stopping generation");
            abort.abort(AbortReason::User);
        }
    }
}

/// Stream one reply, handing each text fragment to `listener`.
///
/// `--format openai` goes through the OpenAI-compatible endpoint,
/// `--chat` through `/api/chat` (with tools from settings), anything else
/// through `/api/generate`.
pub async fn run_prompt<C, F>(
    client: &OllamaClient<C>,
    settings: &Settings,
    options: &PromptOptions,
    abort: &AbortController,
    listener: F,
) -> Result<ConversationEntry>
where
    C: HttpClient,
    F: FnMut(&str) + Send + 'static,
{
    let model = resolve_model(options, settings);
    let image = options.image.as_deref().map(encode_image).transpose()?;
    let recorder = ConversationRecorder::new(options.prompt.clone()).with_listener(listener);

    let mut message = ChatMessage::user(options.prompt.clone());
    if let Some(image) = image.clone() {
        message = message.with_image(image);
    }

    let result = match (options.format, options.chat) {
        (StreamFormat::Sse, _) => {
            let request = ChatCompletionRequest::new(&model, vec![message]);
            client.chat_completions_stream(&request, recorder, abort).await
        }
        (StreamFormat::LineJson, true) => {
            let request = ChatRequest::new(&model, vec![message]).with_tools(settings.tools());
            client.chat_stream(&request, recorder, abort).await
        }
        (StreamFormat::LineJson, false) => {
            let mut request = GenerateRequest::new(&model, options.prompt.clone());
            if let Some(image) = image {
                request = request.with_image(image);
            }
            client.generate_stream(&request, recorder, abort).await
        }
    };

    let operation = match (options.format, options.chat) {
        (StreamFormat::Sse, _) => "chat_completions_stream",
        (StreamFormat::LineJson, true) => "chat_stream",
        (StreamFormat::LineJson, false) => "generate_stream",
    };
    let recorder = result.map_err(|err| report(err, operation, &model))?;

    for call in recorder.tool_calls() {
        tracing::info!("model requested tool {} with {}", call.function.name, call.function.arguments);
    }

    match recorder.error_message() {
        Some(message) => Err(eyre!(message)),
        None => recorder.into_entry().map_err(ChatError::from).wrap_err("Stream did not complete"),
    }
}

/// A client failure as a report carrying its context and a recovery hint.
fn report(err: ClientError, operation: &str, model: &str) -> Report {
    let mut context = ErrorContext::new(operation).with_component("cli");
    if !model.is_empty() {
        context = context.with_model(model);
    }
    let err = ChatError::from(err).with_context(context);
    tracing::debug!(
        code = err.error_code(),
        retryable = err.is_retryable(),
        cause = %err.inner(),
        "{}",
        err.context().map(ErrorContext::to_log_string).unwrap_or_default()
    );
    let note = failure_note(&err);
    let hint = err.recovery_hint();
    Report::new(err).note(note).suggestion(hint)
}

/// One-line classification shown under a failed command.
fn failure_note(err: &ChatError) -> String {
    format!("{} ({})", err.category().description(), err.error_code())
}

/// Print installed models, marking the ones currently loaded.
pub async fn list_models<C, W>(client: &OllamaClient<C>, out: &mut W) -> Result<()>
where
    C: HttpClient,
    W: Write,
{
    let installed = client
        .list_models()
        .await
        .map_err(|err| report(err, "list_models", ""))?;
    let running = match client.running_models().await {
        Ok(running) => running,
        Err(e) => {
            tracing::warn!("could not query running models: {}", e);
            Default::default()
        }
    };

    if installed.models.is_empty() {
        writeln!(out, "No models installed.")?;
        return Ok(());
    }
    for name in installed.names() {
        let loaded = running.models.iter().any(|m| m.name == name);
        if loaded {
            writeln!(out, "{} (running)", name)?;
        } else {
            writeln!(out, "{}", name)?;
        }
    }
    Ok(())
}
