//! Fast-path command matcher
//!
//! Handles a fixed set of simple command shapes ("turn on bedroom light",
//! "pause") directly against the store, without the reasoning service.

use regex::{Captures, Regex};
use serde::Serialize;

use crate::control::DeviceController;
use crate::device::{device_id, DeviceStatus, DeviceType, DeviceUpdate};
use crate::room;
use crate::sync::DeviceCommand;

/// Result of matching one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub matched: bool,
    pub response: String,
    pub action_taken: bool,
}

impl RuleOutcome {
    fn miss() -> Self {
        Self {
            matched: false,
            response: String::new(),
            action_taken: false,
        }
    }

    fn done(response: impl Into<String>) -> Self {
        Self {
            matched: true,
            response: response.into(),
            action_taken: true,
        }
    }

    fn not_found() -> Self {
        Self {
            matched: true,
            response: "Device not found.".to_string(),
            action_taken: false,
        }
    }
}

/// What a matched rule does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleAction {
    LightOn,
    LightOff,
    AcOn,
    AcOff,
    SpeakerPause,
    SpeakerPlay,
}

struct Rule {
    pattern: Regex,
    action: RuleAction,
}

/// Ordered rule list; the first matching rule wins
pub struct RuleMatcher {
    rules: Vec<Rule>,
    controller: DeviceController,
}

impl RuleMatcher {
    pub fn new(controller: DeviceController) -> Self {
        let rules = [
            (r"(?i)^(turn on|open)\s*(.*?)\s*(lights?)$", RuleAction::LightOn),
            (r"(?i)^(turn off|close)\s*(.*?)\s*(lights?)$", RuleAction::LightOff),
            (r"(?i)^(turn on)\s*(.*?)\s*(ac|air\s*con)$", RuleAction::AcOn),
            (r"(?i)^(turn off)\s*(.*?)\s*(ac|air\s*con)$", RuleAction::AcOff),
            (r"(?i)^(pause|stop)\s*(music)?$", RuleAction::SpeakerPause),
            (r"(?i)^(play)\s*(music)?$", RuleAction::SpeakerPlay),
        ]
        .into_iter()
        .filter_map(|(pattern, action)| match Regex::new(pattern) {
            Ok(pattern) => Some(Rule { pattern, action }),
            Err(e) => {
                tracing::error!("Invalid rule pattern {}: {}", pattern, e);
                None
            }
        })
        .collect();

        Self { rules, controller }
    }

    /// Try to handle `input` directly. `matched == false` means the caller
    /// should fall through to the reasoning service.
    pub async fn process(&self, input: &str) -> RuleOutcome {
        let input = input.trim();
        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(input) {
                tracing::debug!("Fast path matched {:?} for {:?}", rule.action, input);
                return self.handle(rule.action, &caps).await;
            }
        }
        RuleOutcome::miss()
    }

    async fn handle(&self, action: RuleAction, caps: &Captures<'_>) -> RuleOutcome {
        let room_key = room::normalize(caps.get(2).map_or("", |m| m.as_str()));
        match action {
            RuleAction::LightOn => {
                self.switch(
                    DeviceType::Light,
                    &room_key,
                    DeviceUpdate::status(DeviceStatus::On).property("brightness", 100),
                    DeviceCommand::LightOn {
                        brightness: Some(100),
                    },
                    format!("Turned on {} light.", room::title(&room_key)),
                )
                .await
            }
            RuleAction::LightOff => {
                self.switch(
                    DeviceType::Light,
                    &room_key,
                    DeviceUpdate::status(DeviceStatus::Off).property("brightness", 0),
                    DeviceCommand::LightOff,
                    format!("Turned off {} light.", room::title(&room_key)),
                )
                .await
            }
            RuleAction::AcOn => {
                self.switch(
                    DeviceType::Ac,
                    &room_key,
                    DeviceUpdate::status(DeviceStatus::On),
                    DeviceCommand::ClimateOn,
                    format!("Turned on {} AC.", room::title(&room_key)),
                )
                .await
            }
            RuleAction::AcOff => {
                self.switch(
                    DeviceType::Ac,
                    &room_key,
                    DeviceUpdate::status(DeviceStatus::Off),
                    DeviceCommand::ClimateOff,
                    format!("Turned off {} AC.", room::title(&room_key)),
                )
                .await
            }
            RuleAction::SpeakerPause => self.pause_speakers().await,
            RuleAction::SpeakerPlay => self.play_first_speaker().await,
        }
    }

    async fn switch(
        &self,
        device_type: DeviceType,
        room_key: &str,
        update: DeviceUpdate,
        command: DeviceCommand,
        reply: String,
    ) -> RuleOutcome {
        let id = device_id(device_type, room_key);
        let store = self.controller.store();
        if !store.update(&id, update) {
            return RuleOutcome::not_found();
        }
        self.push(&id, &command).await;
        RuleOutcome::done(reply)
    }

    /// Stop every speaker that is currently on
    async fn pause_speakers(&self) -> RuleOutcome {
        let playing: Vec<String> = self
            .controller
            .store()
            .devices()
            .into_iter()
            .filter(|d| d.device_type == DeviceType::Speaker && d.status.is_on())
            .map(|d| d.device_id)
            .collect();

        for id in playing {
            if self
                .controller
                .store()
                .update(&id, DeviceUpdate::status(DeviceStatus::Off))
            {
                self.push(&id, &DeviceCommand::MediaPause).await;
            }
        }
        RuleOutcome::done("Paused.")
    }

    /// Resume the first speaker in store order, regardless of room
    async fn play_first_speaker(&self) -> RuleOutcome {
        let first = self
            .controller
            .store()
            .devices()
            .into_iter()
            .find(|d| d.device_type == DeviceType::Speaker);

        if let Some(speaker) = first {
            if self
                .controller
                .store()
                .update(&speaker.device_id, DeviceUpdate::status(DeviceStatus::On))
            {
                self.push(&speaker.device_id, &DeviceCommand::MediaPlay { volume: None })
                    .await;
            }
        }
        RuleOutcome::done("Playing.")
    }

    async fn push(&self, device_id: &str, command: &DeviceCommand) {
        let sync = self.controller.sync();
        if sync.is_enabled() {
            sync.push(self.controller.store(), device_id, command).await;
        }
    }
}
