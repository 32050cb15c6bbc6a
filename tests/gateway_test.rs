// tests/gateway_test.rs — Integration test: dispatcher + router with fake backends

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use chatgate::audio::{VoiceFile, VoicePreparer};
use chatgate::core::router::{Backends, Router, RouterConfig, GREETING};
use chatgate::core::session::{FlowState, SessionStore};
use chatgate::core::types::{ChatId, InboundEvent, OutboundReply, UserId};
use chatgate::gateway::Dispatcher;
use chatgate::imagegen::{ImageGenerator, Txt2ImgRequest};
use chatgate::infra::errors::GatewayError;
use chatgate::integrations::MessagingAdapter;
use chatgate::provider::{ChatProvider, ChatRequest, ChatResponse, Message, Transcriber};

/// Echoes the last user message; messages starting with "slow" take a while.
struct EchoChat;

#[async_trait]
impl ChatProvider for EchoChat {
    fn id(&self) -> &str {
        "echo"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if last.starts_with("slow") {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(ChatResponse {
            content: Some(format!("re: {last}")),
            ..Default::default()
        })
    }
}

struct NoTranscriber;

#[async_trait]
impl Transcriber for NoTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<String, GatewayError> {
        Err(GatewayError::Provider {
            provider: "none".into(),
            message: "not used".into(),
        })
    }
}

struct NoImages;

#[async_trait]
impl ImageGenerator for NoImages {
    fn id(&self) -> &str {
        "none"
    }

    async fn generate(&self, _request: &Txt2ImgRequest) -> Result<Vec<String>, GatewayError> {
        Ok(vec![])
    }
}

struct NoVoice;

#[async_trait]
impl VoicePreparer for NoVoice {
    async fn prepare(&self, _file_id: &str, _user: UserId) -> Result<VoiceFile, GatewayError> {
        Err(GatewayError::Audio("not used".into()))
    }
}

/// Records every reply with its chat, in global send order.
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<(ChatId, OutboundReply)>>,
}

impl Recorder {
    fn for_chat(&self, chat: ChatId) -> Vec<OutboundReply> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn position(&self, chat: ChatId, reply: &OutboundReply) -> Option<usize> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .position(|(c, r)| *c == chat && r == reply)
    }
}

#[async_trait]
impl MessagingAdapter for Recorder {
    async fn send(&self, chat: ChatId, reply: &OutboundReply) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((chat, reply.clone()));
        Ok(())
    }
}

const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);
const ALICE_CHAT: ChatId = ChatId(10);
const BOB_CHAT: ChatId = ChatId(20);

fn setup() -> (Arc<SessionStore>, Arc<Recorder>, Dispatcher) {
    let store = Arc::new(SessionStore::new());
    let recorder = Arc::new(Recorder::default());
    let router = Arc::new(Router::new(
        store.clone(),
        Backends {
            chat: Arc::new(EchoChat),
            transcriber: Arc::new(NoTranscriber),
            images: Arc::new(NoImages),
            voice: Arc::new(NoVoice),
        },
        RouterConfig::default(),
    ));
    let dispatcher = Dispatcher::new(router, recorder.clone());
    (store, recorder, dispatcher)
}

#[tokio::test(start_paused = true)]
async fn test_same_user_events_processed_in_arrival_order() {
    let (store, recorder, mut dispatcher) = setup();

    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "slow first"));
    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "second"));
    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "testgenerating"));
    assert_eq!(dispatcher.active_users(), 1);
    dispatcher.shutdown().await;

    let session = store.get(ALICE);
    assert_eq!(
        session.messages,
        vec![
            Message::user("slow first"),
            Message::assistant("re: slow first"),
            Message::user("second"),
            Message::assistant("re: second"),
        ]
    );
    assert_eq!(session.state, FlowState::AwaitingPrompt);

    let texts: Vec<OutboundReply> = recorder
        .for_chat(ALICE_CHAT)
        .into_iter()
        .filter(|r| matches!(r, OutboundReply::Text(_)))
        .collect();
    assert_eq!(
        texts,
        vec![
            OutboundReply::Text("re: slow first".into()),
            OutboundReply::Text("re: second".into()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_users_interleave_without_sharing_state() {
    let (store, recorder, mut dispatcher) = setup();

    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "slow hello"));
    dispatcher.dispatch(InboundEvent::from_text(BOB, BOB_CHAT, "testgenerating"));
    dispatcher.dispatch(InboundEvent::from_text(BOB, BOB_CHAT, "a red fox"));
    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "/new"));
    assert_eq!(dispatcher.active_users(), 2);
    dispatcher.shutdown().await;

    // Alice's reset wiped only Alice.
    let alice = store.get(ALICE);
    assert!(alice.messages.is_empty());
    assert_eq!(alice.state, FlowState::Idle);

    let bob = store.get(BOB);
    assert_eq!(bob.state, FlowState::AwaitingNegativePrompt);
    assert_eq!(bob.prompt.as_deref(), Some("a red fox"));
    assert!(bob.messages.is_empty());

    // Bob was served while Alice's slow chat call was in flight.
    let bob_done = recorder
        .position(BOB_CHAT, &OutboundReply::Code("Please enter your negative prompt:".into()))
        .unwrap();
    let alice_answer = recorder
        .position(ALICE_CHAT, &OutboundReply::Text("re: slow hello".into()))
        .unwrap();
    assert!(bob_done < alice_answer);

    assert_eq!(
        recorder.for_chat(ALICE_CHAT).last(),
        Some(&OutboundReply::Text(GREETING.into()))
    );
    assert!(recorder
        .for_chat(BOB_CHAT)
        .iter()
        .all(|r| !matches!(r, OutboundReply::Text(t) if t.starts_with("re:"))));
}

#[tokio::test(start_paused = true)]
async fn test_idle_worker_retires_and_user_keeps_session() {
    let (store, recorder, dispatcher) = setup();
    let mut dispatcher = dispatcher.with_idle_timeout(Duration::from_secs(1));

    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "first"));
    dispatcher.dispatch(InboundEvent::from_text(BOB, BOB_CHAT, "hi"));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(dispatcher.reap(), 2);
    assert_eq!(dispatcher.active_users(), 0);

    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "second"));
    assert_eq!(dispatcher.active_users(), 1);
    dispatcher.shutdown().await;

    assert_eq!(
        store.get(ALICE).messages,
        vec![
            Message::user("first"),
            Message::assistant("re: first"),
            Message::user("second"),
            Message::assistant("re: second"),
        ]
    );
    assert_eq!(
        recorder.for_chat(BOB_CHAT).last(),
        Some(&OutboundReply::Text("re: hi".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_event_for_retired_but_unreaped_worker_is_handled() {
    let (store, _recorder, dispatcher) = setup();
    let mut dispatcher = dispatcher.with_idle_timeout(Duration::from_secs(1));

    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "testgenerating"));
    tokio::time::sleep(Duration::from_secs(5)).await;

    // The table still holds the retired worker; its queue is closed.
    assert_eq!(dispatcher.active_users(), 1);
    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "a lighthouse"));
    dispatcher.shutdown().await;

    let alice = store.get(ALICE);
    assert_eq!(alice.state, FlowState::AwaitingNegativePrompt);
    assert_eq!(alice.prompt.as_deref(), Some("a lighthouse"));
}

#[tokio::test(start_paused = true)]
async fn test_busy_worker_is_not_reaped() {
    let (_store, _recorder, dispatcher) = setup();
    let mut dispatcher = dispatcher.with_idle_timeout(Duration::from_secs(1));

    dispatcher.dispatch(InboundEvent::from_text(ALICE, ALICE_CHAT, "hello"));
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(dispatcher.reap(), 0);
    assert_eq!(dispatcher.active_users(), 1);
    dispatcher.shutdown().await;
}
