//! Simple query function for one-shot interactions
//!
//! [`query`] starts the CLI, runs one prompt, and yields the typed messages of
//! that turn. In lightweight mode the prompt travels as a CLI argument and no
//! control channel is opened; otherwise a full session is opened so hooks,
//! the permission callback, and in-process tools work for the query too.

use futures::Stream;

use crate::client::{ClaudeSDKClient, SessionEvent, Subscription};
use crate::control::{TransportMode, select_mode};
use crate::error::{ClaudeError, Result};
use crate::transport::{PromptInput, SubprocessTransport, Transport};
use crate::types::messages::Message;
use crate::types::options::ClaudeAgentOptions;

/// Query Claude Code for one-shot interactions
///
/// The stream ends after the `result` message. Partial-message events are
/// not requested, since the stream only carries whole messages.
///
/// # Examples
///
/// ```no_run
/// use kodegen_claude_control::{ClaudeAgentOptions, Message, query};
/// use futures::StreamExt;
///
/// # async fn example() -> kodegen_claude_control::Result<()> {
/// let stream = query("What is 2 + 2?", ClaudeAgentOptions::default()).await?;
/// let mut stream = Box::pin(stream);
///
/// while let Some(message) = stream.next().await {
///     if let Message::Assistant { message, .. } = message? {
///         log::info!("Claude: {}", message.text());
///     }
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns error if the CLI cannot be found or started, or if the session
/// cannot be initialized
pub async fn query(
    prompt: impl Into<String>,
    mut options: ClaudeAgentOptions,
) -> Result<impl Stream<Item = Result<Message>>> {
    options.include_partial_messages = false;
    let prompt = prompt.into();
    let input = match select_mode(&options) {
        TransportMode::Lightweight => PromptInput::String(prompt.clone()),
        TransportMode::FullControl => PromptInput::Stream,
    };
    let transport = SubprocessTransport::from_options(&input, &options)?;
    query_with_transport(prompt, options, transport).await
}

/// Run [`query`] over an already built transport
///
/// When the transport was launched with the prompt as an argument (a
/// lightweight [`SubprocessTransport`]), the prompt is not written again.
/// If the turn ends before a `result` arrives (a `message_stop` from a CLI
/// that streams partial messages), the stream yields `ControlProtocol`.
///
/// # Errors
/// Same as [`query`]
pub async fn query_with_transport<T>(
    prompt: impl Into<String>,
    options: ClaudeAgentOptions,
    transport: T,
) -> Result<impl Stream<Item = Result<Message>>>
where
    T: Transport + PromptCarrier + 'static,
{
    let prompt = prompt.into();
    let prompt_in_args = transport.carries_prompt();
    let mut client = ClaudeSDKClient::connect_with_transport(transport, options).await?;

    let subscription = if prompt_in_args {
        let subscription = client.subscribe()?;
        client.end_input().await?;
        subscription
    } else {
        let subscription = client.query(prompt).await?;
        if client.mode() == TransportMode::Lightweight {
            client.end_input().await?;
        }
        subscription
    };

    Ok(async_stream::stream! {
        let mut subscription: Subscription = subscription;
        let mut finished = false;
        while let Some(event) = subscription.recv().await {
            match event {
                Ok(SessionEvent::Message(message)) => {
                    finished = message.is_result();
                    yield Ok(message);
                    if finished {
                        break;
                    }
                }
                Ok(SessionEvent::Stream(_) | SessionEvent::Raw(_)) => {}
                Err(e) => {
                    finished = true;
                    yield Err(e);
                    break;
                }
            }
        }
        if !finished {
            log::warn!("Query turn ended before its result message");
            yield Err(ClaudeError::control_protocol(
                "Turn ended before its result message",
            ));
        }
        drop(subscription);
        if let Err(e) = client.close().await {
            log::warn!("Failed to close query session: {e}");
        }
    })
}

/// Whether a transport was started with the prompt already in its arguments
pub trait PromptCarrier {
    /// `true` when the prompt must not be written to the input stream
    fn carries_prompt(&self) -> bool {
        false
    }
}

impl PromptCarrier for SubprocessTransport {
    fn carries_prompt(&self) -> bool {
        self.spec().has_flag("--print")
    }
}

impl PromptCarrier for crate::transport::MemoryTransport {}
