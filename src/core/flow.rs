// src/core/flow.rs — Dispatch table for text input
//
// Maps (flow state, text) to the action the router performs. Pure, so every
// transition can be tested without a transport or backend.

use crate::core::session::FlowState;

/// Keyword that opens the image-generation flow from idle.
pub const IMAGE_FLOW_TRIGGER: &str = "testgenerating";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub steps: u32,
    pub cfg_scale: u32,
    pub denoising_strength: f64,
}

impl GenerationParams {
    /// Parse `<int steps> <int cfg_scale> <float denoising_strength>`.
    /// Exactly three whitespace-separated tokens are accepted.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let steps = parts.next()?.parse().ok()?;
        let cfg_scale = parts.next()?.parse().ok()?;
        let denoising_strength: f64 = parts.next()?.parse().ok()?;
        if parts.next().is_some() || !denoising_strength.is_finite() {
            return None;
        }
        Some(Self {
            steps,
            cfg_scale,
            denoising_strength,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowAction {
    /// Idle + trigger keyword → AwaitingPrompt.
    StartImageFlow,
    /// AwaitingPrompt → AwaitingNegativePrompt.
    StorePrompt(String),
    /// AwaitingNegativePrompt → AwaitingGenerationParams.
    StoreNegativePrompt(String),
    /// AwaitingGenerationParams with valid numbers → Idle once images are sent.
    Generate(GenerationParams),
    /// AwaitingGenerationParams with unparseable numbers; state unchanged.
    RepromptParams,
    /// Idle + anything else: chat round-trip.
    Chat(String),
}

impl FlowAction {
    /// State the session moves to before any backend call is made.
    /// `None` means the state is left alone.
    pub fn next_state(&self) -> Option<FlowState> {
        match self {
            FlowAction::StartImageFlow => Some(FlowState::AwaitingPrompt),
            FlowAction::StorePrompt(_) => Some(FlowState::AwaitingNegativePrompt),
            FlowAction::StoreNegativePrompt(_) => Some(FlowState::AwaitingGenerationParams),
            FlowAction::Generate(_) | FlowAction::RepromptParams | FlowAction::Chat(_) => None,
        }
    }
}

pub fn plan(state: FlowState, text: &str) -> FlowAction {
    match state {
        FlowState::Idle if text.trim().eq_ignore_ascii_case(IMAGE_FLOW_TRIGGER) => {
            FlowAction::StartImageFlow
        }
        FlowState::Idle => FlowAction::Chat(text.to_string()),
        FlowState::AwaitingPrompt => FlowAction::StorePrompt(text.to_string()),
        FlowState::AwaitingNegativePrompt => FlowAction::StoreNegativePrompt(text.to_string()),
        FlowState::AwaitingGenerationParams => match GenerationParams::parse(text) {
            Some(params) => FlowAction::Generate(params),
            None => FlowAction::RepromptParams,
        },
    }
}
