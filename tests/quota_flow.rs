//! End-to-end turn flow over a mock agent and delivery: a whitelisted
//! conversation chats normally until the free-tier cap, then gets the fixed
//! notices and no further agent calls.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teloxide::types::ChatId;

use companion_bot::companion::{
    clean_text, quota_notices, Agent, AgentError, Block, CompanionService, ConversationContext,
    EmitFn, HistoryEntry, Metadata,
};
use companion_bot::config::CompanionConfig;

#[derive(Default)]
struct RecordingEmit {
    calls: Mutex<Vec<Vec<Block>>>,
}

#[async_trait]
impl EmitFn for RecordingEmit {
    async fn emit(&self, blocks: &[Block], _metadata: &Metadata) -> Result<(), String> {
        self.calls.lock().unwrap().push(blocks.to_vec());
        Ok(())
    }
}

struct EchoAgent {
    invocations: AtomicUsize,
}

#[async_trait]
impl Agent for EchoAgent {
    async fn respond(&self, ctx: &ConversationContext) -> Result<Vec<Block>, AgentError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let last = ctx.history.last().map(|e| e.text.as_str()).unwrap_or("");
        Ok(vec![Block::text(format!("you said: {last}"))])
    }
}

fn whitelisted_config(limit: usize) -> CompanionConfig {
    CompanionConfig {
        bot_token: "123:abc".to_string(),
        openai_api_key: "sk-test".to_string(),
        voice: None,
        chat_ids: [ChatId(7)].into_iter().collect::<HashSet<_>>(),
        name: "Luna".to_string(),
        byline: "your AI companion".to_string(),
        identity: "a warm, curious companion".to_string(),
        behavior: "playful and supportive".to_string(),
        use_gpt4: true,
        temperature: 0.7,
        free_message_limit: limit,
        data_dir: PathBuf::from("."),
    }
}

/// Drive turns the way the bot loop does: append the user message, run the
/// turn, append the sanitized reply.
async fn drive_turn(
    service: &CompanionService,
    history: &mut Vec<HistoryEntry>,
    emit: &Arc<RecordingEmit>,
    text: &str,
) -> usize {
    history.push(HistoryEntry::user(text));
    let ctx = ConversationContext::new(7, history.clone(), vec![emit.clone() as Arc<dyn EmitFn>]);
    let batch = service.run_turn(&ctx).await.unwrap();
    for block in &batch {
        if block.is_text() {
            let reply = clean_text(block.text_content());
            if !reply.is_empty() {
                history.push(HistoryEntry::companion(reply));
            }
        }
    }
    batch.len()
}

#[tokio::test]
async fn test_conversation_runs_until_cap_then_notices() {
    let agent = Arc::new(EchoAgent { invocations: AtomicUsize::new(0) });
    let service = CompanionService::with_speech(whitelisted_config(3), agent.clone(), None);
    let emit = Arc::new(RecordingEmit::default());
    let mut history = Vec::new();

    // With limit 3, the gate closes once more than 6 messages are on
    // record. Turns 1-3 run; the gate sees 1, 3, then 5 messages.
    for i in 1..=3 {
        let produced = drive_turn(&service, &mut history, &emit, &format!("hello {i}")).await;
        assert_eq!(produced, 1, "turn {i} should produce a reply");
    }
    assert_eq!(agent.invocations.load(Ordering::SeqCst), 3);

    // Turn 4: 3 exchanges plus the new user message = 7 messages > 6,
    // the gate closes
    let produced = drive_turn(&service, &mut history, &emit, "hello again").await;
    assert_eq!(produced, 0);
    assert_eq!(agent.invocations.load(Ordering::SeqCst), 3, "agent not invoked past the cap");

    let calls = emit.calls.lock().unwrap().clone();
    let last = calls.last().unwrap();
    assert_eq!(last, &quota_notices("Luna"));

    // Further turns stay capped
    let produced = drive_turn(&service, &mut history, &emit, "please?").await;
    assert_eq!(produced, 0);
    assert_eq!(agent.invocations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_open_deployment_never_hits_cap() {
    let mut config = whitelisted_config(1);
    config.chat_ids = HashSet::new();
    let agent = Arc::new(EchoAgent { invocations: AtomicUsize::new(0) });
    let service = CompanionService::with_speech(config, agent.clone(), None);
    let emit = Arc::new(RecordingEmit::default());
    let mut history = Vec::new();

    for i in 1..=10 {
        let produced = drive_turn(&service, &mut history, &emit, &format!("msg {i}")).await;
        assert_eq!(produced, 1);
    }
    assert_eq!(agent.invocations.load(Ordering::SeqCst), 10);
}
