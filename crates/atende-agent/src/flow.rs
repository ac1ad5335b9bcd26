// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state transitions.
//!
//! [`FlowEngine`] owns the state of every contact of one device and decides
//! the next step for a classified event. It performs no I/O: the
//! orchestrator executes the returned step and reports the outcome back.

use std::time::Duration;

use atende_core::ContactKey;
use atende_core::types::CustomFlowDefinition;
use atende_extract::{Extraction, Identifier, Pass};
use tracing::debug;

use crate::classify::{Answer, Instruction, Screen};
use crate::state::{ConversationState, PendingIdentifierRequest, PendingRequests, StateStore};

/// Outcome of a readable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierStep {
    Provision(Identifier),
    /// The reading is uncertain; ask the contact to confirm it.
    Confirm(Identifier),
}

/// Outcome of a reply to an open yes/no question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmStep {
    Provision {
        product: String,
        identifier: Identifier,
    },
    RequestPrint,
    Handoff,
    Wait,
}

/// Outcome of a screen-check screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenStep {
    Provision { product: String },
    PlaylistHint,
    RepeatRequest,
    Wait,
}

/// Outcome of a message inside a custom flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStep {
    /// Send this stage; the flow is over once it is the last one.
    Send(usize),
    /// The flow vanished or ran out of stages; the contact is idle again.
    Reset,
}

/// State machine for the contacts of one device.
#[derive(Debug)]
pub struct FlowEngine {
    states: StateStore,
    pending: PendingRequests,
}

impl FlowEngine {
    /// `state_timeout` bounds how long any non-idle state survives without
    /// being re-entered.
    pub fn new(state_timeout: Duration) -> Self {
        Self {
            states: StateStore::new(state_timeout),
            pending: PendingRequests::default(),
        }
    }

    pub fn state(&mut self, key: &ContactKey) -> ConversationState {
        self.states.get(key)
    }

    pub fn set_state(&mut self, key: &ContactKey, state: ConversationState) {
        debug!(contact = %key, state = state.label(), "state entered");
        self.states.set(key, state);
    }

    pub fn pending(&self, chat_id: &str) -> Option<&PendingIdentifierRequest> {
        self.pending.get(chat_id)
    }

    /// Ends every wait of a conversation: its state and its pending
    /// identifier request.
    pub fn finish(&mut self, key: &ContactKey, chat_id: &str) {
        self.states.clear(key);
        if self.pending.take(chat_id).is_some() {
            debug!(contact = %key, "pending identifier request cleared");
        }
    }

    /// An agent gave the contact an instruction. Only idle contacts start
    /// the identifier walkthrough. Returns `true` when the state changed.
    pub fn begin_instruction(
        &mut self,
        key: &ContactKey,
        instruction: Instruction,
        product: &str,
    ) -> bool {
        if !self.states.get(key).is_idle() {
            return false;
        }
        let (confirming, print_requested) = match instruction {
            Instruction::DownloadApp => (true, false),
            Instruction::SendScreenshot => (false, true),
        };
        self.set_state(
            key,
            ConversationState::AwaitingIdentifierProof {
                product: product.to_string(),
                print_reminder_sent: false,
                confirming,
                identifier: None,
                print_requested,
            },
        );
        true
    }

    /// An identifier product was requested but no identifier is at hand:
    /// escalate to a pending request and wait for the contact's screenshot.
    pub fn await_identifier(&mut self, chat_id: &str, request: PendingIdentifierRequest) {
        let key = request.contact.clone();
        let product = request.product.clone();
        self.pending.register(chat_id, request);
        self.set_state(
            &key,
            ConversationState::AwaitingIdentifierProof {
                product,
                print_reminder_sent: false,
                confirming: false,
                identifier: None,
                print_requested: true,
            },
        );
    }

    /// Automated reading failed for good: leave the identifier to a human
    /// agent and stop waiting on the contact.
    pub fn escalate(&mut self, chat_id: &str, request: PendingIdentifierRequest) {
        self.states.clear(&request.contact);
        self.pending.register(chat_id, request);
    }

    /// Resolves the pending request of `chat_id`, dropping any state of the
    /// waiting contact.
    pub fn resolve_pending(&mut self, chat_id: &str) -> Option<PendingIdentifierRequest> {
        let request = self.pending.take(chat_id)?;
        self.states.clear(&request.contact);
        Some(request)
    }

    /// A screenshot or text yielded an identifier for `key`.
    ///
    /// Aggressive substitutions and fallback OCR passes are uncertain and
    /// need the contact's confirmation.
    pub fn identifier_found(
        &mut self,
        key: &ContactKey,
        product: &str,
        extraction: Extraction,
        uncertain_ocr: bool,
    ) -> IdentifierStep {
        if extraction.pass == Pass::Conservative && !uncertain_ocr {
            return IdentifierStep::Provision(extraction.identifier);
        }
        let (print_reminder_sent, print_requested) = match self.states.get(key) {
            ConversationState::AwaitingIdentifierProof {
                print_reminder_sent,
                print_requested,
                ..
            } => (print_reminder_sent, print_requested),
            _ => (false, true),
        };
        self.set_state(
            key,
            ConversationState::AwaitingIdentifierProof {
                product: product.to_string(),
                print_reminder_sent,
                confirming: true,
                identifier: Some(extraction.identifier.clone()),
                print_requested,
            },
        );
        IdentifierStep::Confirm(extraction.identifier)
    }

    /// A screenshot had no readable identifier. Registers the pending
    /// request and returns `true` when the single re-ask must be sent.
    pub fn identifier_missing(
        &mut self,
        key: &ContactKey,
        chat_id: &str,
        request: PendingIdentifierRequest,
    ) -> bool {
        self.pending.register(chat_id, request);
        match self.states.get(key) {
            ConversationState::AwaitingIdentifierProof {
                product,
                print_reminder_sent: false,
                confirming,
                identifier,
                print_requested,
            } => {
                self.set_state(
                    key,
                    ConversationState::AwaitingIdentifierProof {
                        product,
                        print_reminder_sent: true,
                        confirming,
                        identifier,
                        print_requested,
                    },
                );
                true
            }
            _ => false,
        }
    }

    /// A reply while a yes/no question is open.
    pub fn confirmation_reply(&mut self, key: &ContactKey, answer: Answer) -> ConfirmStep {
        let ConversationState::AwaitingIdentifierProof {
            product,
            print_reminder_sent,
            confirming: true,
            identifier,
            print_requested,
        } = self.states.get(key)
        else {
            return ConfirmStep::Wait;
        };
        match answer {
            Answer::Yes => match identifier {
                Some(identifier) => ConfirmStep::Provision {
                    product,
                    identifier,
                },
                None => {
                    self.set_state(
                        key,
                        ConversationState::AwaitingIdentifierProof {
                            product,
                            print_reminder_sent,
                            confirming: false,
                            identifier: None,
                            print_requested: true,
                        },
                    );
                    if print_requested {
                        ConfirmStep::Wait
                    } else {
                        ConfirmStep::RequestPrint
                    }
                }
            },
            Answer::No => {
                self.states.clear(key);
                ConfirmStep::Handoff
            }
            Answer::Unclear => ConfirmStep::Wait,
        }
    }

    /// A screen-check screenshot was read.
    pub fn screen_shot(&mut self, key: &ContactKey, screen: Screen) -> ScreenStep {
        let (product, in_playlist, reminded) = match self.states.get(key) {
            ConversationState::AwaitingPhoto { product, reminded } => (product, false, reminded),
            ConversationState::AwaitingPlaylistClick { product, reminded } => {
                (product, true, reminded)
            }
            _ => return ScreenStep::Wait,
        };
        match (screen, in_playlist, reminded) {
            (Screen::Code, _, _) => ScreenStep::Provision { product },
            (Screen::Playlist, false, _) => {
                self.set_state(
                    key,
                    ConversationState::AwaitingPlaylistClick {
                        product,
                        reminded: false,
                    },
                );
                ScreenStep::PlaylistHint
            }
            (_, _, true) => ScreenStep::Wait,
            (_, true, false) => {
                self.set_state(
                    key,
                    ConversationState::AwaitingPlaylistClick {
                        product,
                        reminded: true,
                    },
                );
                ScreenStep::PlaylistHint
            }
            (_, false, false) => {
                self.set_state(
                    key,
                    ConversationState::AwaitingPhoto {
                        product,
                        reminded: true,
                    },
                );
                ScreenStep::RepeatRequest
            }
        }
    }

    /// Starts `flow` for `key`. Returns the stage to send (always 0).
    pub fn start_custom_flow(&mut self, key: &ContactKey, flow: &CustomFlowDefinition) -> usize {
        if flow.stages.len() > 1 {
            self.set_state(
                key,
                ConversationState::CustomFlow {
                    flow_id: flow.id,
                    stage_index: 0,
                },
            );
        } else {
            self.states.clear(key);
        }
        0
    }

    /// Any message inside a custom flow advances it one stage. `flow` is the
    /// current definition of the running flow, `None` when it was deleted or
    /// disabled.
    pub fn advance_custom_flow(
        &mut self,
        key: &ContactKey,
        stage_index: usize,
        flow: Option<&CustomFlowDefinition>,
    ) -> StageStep {
        let next = stage_index + 1;
        let Some(flow) = flow.filter(|f| next < f.stages.len()) else {
            self.states.clear(key);
            return StageStep::Reset;
        };
        if next + 1 >= flow.stages.len() {
            self.states.clear(key);
        } else {
            self.set_state(
                key,
                ConversationState::CustomFlow {
                    flow_id: flow.id,
                    stage_index: next,
                },
            );
        }
        StageStep::Send(next)
    }

    /// Number of contacts in a non-idle state and of pending requests.
    pub fn load(&self) -> (usize, usize) {
        (self.states.active(), self.pending.len())
    }
}
