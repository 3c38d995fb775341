//! Conversation orchestration for one household
//!
//! A turn first goes through the rule matcher. Anything it does not handle
//! is handed to the reasoning service together with the live device and
//! schedule context, and the tool calls it requests are executed until it
//! produces a final answer.

use std::sync::Arc;

use home_state::{DeviceController, RuleMatcher};
use schedule_engine::ScheduleStore;
use tokio::sync::Mutex;

use crate::reasoning::{ReasoningError, ReasoningService, ReasoningTurn, ToolSpec, TurnMessage};
use crate::tools::{self, Toolbox};

/// Upper bound on reasoning/tool rounds per turn
pub const MAX_ROUNDS: usize = 5;

pub const NO_REASONER_REPLY: &str = "I can handle simple commands like \"turn on the bedroom light\" or \"pause the music\". Configure OPENAI_API_KEY for anything else.";

const GAVE_UP_REPLY: &str = "Sorry, I couldn't finish that request.";

pub struct Butler {
    rules: RuleMatcher,
    tools: Toolbox,
    catalogue: Vec<ToolSpec>,
    controller: DeviceController,
    schedules: Arc<ScheduleStore>,
    reasoner: Option<Arc<dyn ReasoningService>>,
    history: Mutex<Vec<TurnMessage>>,
}

impl Butler {
    pub fn new(
        controller: DeviceController,
        schedules: Arc<ScheduleStore>,
        reasoner: Option<Arc<dyn ReasoningService>>,
    ) -> Self {
        Self {
            rules: RuleMatcher::new(controller.clone()),
            tools: Toolbox::new(controller.clone(), schedules.clone()),
            catalogue: tools::catalogue(),
            controller,
            schedules,
            reasoner,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Handle one user message and return the reply text.
    ///
    /// A failed reasoning call leaves the conversation history as it was
    /// before the turn.
    pub async fn chat(&self, input: &str) -> Result<String, ReasoningError> {
        let mut history = self.history.lock().await;

        let outcome = self.rules.process(input).await;
        if outcome.matched {
            tracing::debug!("Rule matcher handled {:?}", input);
            history.push(TurnMessage::User(input.to_string()));
            history.push(TurnMessage::Assistant {
                text: outcome.response.clone(),
                tool_calls: Vec::new(),
            });
            return Ok(outcome.response);
        }

        let Some(reasoner) = &self.reasoner else {
            return Ok(NO_REASONER_REPLY.to_string());
        };

        let checkpoint = history.len();
        history.push(TurnMessage::User(input.to_string()));

        for round in 0..MAX_ROUNDS {
            let turn = ReasoningTurn {
                system_prompt: self.system_prompt(),
                transcript: &history,
                tools: &self.catalogue,
            };
            let reply = match reasoner.respond(turn).await {
                Ok(reply) => reply,
                Err(e) => {
                    history.truncate(checkpoint);
                    return Err(e);
                }
            };

            if reply.tool_calls.is_empty() {
                history.push(TurnMessage::Assistant {
                    text: reply.text.clone(),
                    tool_calls: Vec::new(),
                });
                return Ok(reply.text);
            }

            tracing::debug!("Round {}: {} tool calls", round + 1, reply.tool_calls.len());
            let calls = reply.tool_calls.clone();
            history.push(TurnMessage::Assistant {
                text: reply.text,
                tool_calls: reply.tool_calls,
            });
            for call in &calls {
                let content = self.tools.dispatch(call).await;
                history.push(TurnMessage::Tool {
                    call_id: call.id.clone(),
                    content,
                });
            }
        }

        tracing::warn!("No final answer after {} rounds", MAX_ROUNDS);
        history.push(TurnMessage::Assistant {
            text: GAVE_UP_REPLY.to_string(),
            tool_calls: Vec::new(),
        });
        Ok(GAVE_UP_REPLY.to_string())
    }

    /// Forget the conversation
    pub async fn reset(&self) {
        self.history.lock().await.clear();
    }

    /// Number of messages in the conversation so far
    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are Butler, a smart home assistant.\n\n{}\n\n{}\n\n\
             Use the tools to control devices and to manage reminders and schedules. \
             Answer questions about device status or schedules from the context above. \
             When the user describes a comfort problem (too dark, too hot, too loud), \
             look at the current device state and pick a sensible action. \
             Reply in the user's language, briefly and friendly.",
            self.controller.device_status(),
            self.schedules.render_context()
        )
    }
}
