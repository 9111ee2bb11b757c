//! Tool Panel
//!
//! The panel watches a realtime session's event log, registers the career
//! tools once per session, keeps the latest tool output for display and asks
//! the assistant to collect feedback after every tool call.

use crate::{
    events::EventLog,
    protocol::{ClientEvent, FunctionCall, OutputItem, ServerEvent},
    render::{Rendered, render_function_call},
    sink::EventSink,
    tools::{RegisteredTool, session_update},
};
use anyhow::Result;
use serde::Serialize;
use std::{fmt, sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Delay between a tool call and the follow-up feedback prompt.
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(500);

pub const PANEL_TITLE: &str = "Career Advice and Job Post Tool";

/// What the panel currently shows.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelView {
    /// No realtime session is running.
    Inactive,
    /// A session is running but no tool has been called yet.
    AwaitingToolCall,
    /// The latest tool output.
    Output { rendered: Rendered },
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", PANEL_TITLE)?;
        match self {
            PanelView::Inactive => write!(f, "Start the session to use this tool..."),
            PanelView::AwaitingToolCall => {
                write!(f, "Ask for career advice or create a job post...")
            }
            PanelView::Output { rendered } => write!(f, "{}", rendered),
        }
    }
}

/// Per-session state of the tool panel.
///
/// Dropping the panel cancels every feedback prompt that has not fired yet.
pub struct ToolPanel {
    sink: Arc<dyn EventSink>,
    feedback_delay: Duration,
    active: bool,
    tools_registered: bool,
    output: Option<FunctionCall>,
    interactions: Vec<FunctionCall>,
    follow_ups: JoinSet<()>,
}

impl ToolPanel {
    /// Creates an inactive panel that sends its client events to `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            feedback_delay: DEFAULT_FEEDBACK_DELAY,
            active: false,
            tools_registered: false,
            output: None,
            interactions: Vec::new(),
            follow_ups: JoinSet::new(),
        }
    }

    pub fn with_feedback_delay(mut self, delay: Duration) -> Self {
        self.feedback_delay = delay;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tools_registered(&self) -> bool {
        self.tools_registered
    }

    /// The most recent qualifying function call.
    pub fn output(&self) -> Option<&FunctionCall> {
        self.output.as_ref()
    }

    /// Every qualifying function call seen in this session, oldest first.
    pub fn interactions(&self) -> &[FunctionCall] {
        &self.interactions
    }

    /// Feedback prompts scheduled but not yet sent.
    pub fn pending_follow_ups(&mut self) -> usize {
        while self.follow_ups.try_join_next().is_some() {}
        self.follow_ups.len()
    }

    /// Applies a change of the session-active flag.
    ///
    /// Going inactive clears all session state and cancels pending feedback
    /// prompts. No message is sent on either transition.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if !active {
            self.tools_registered = false;
            self.output = None;
            self.interactions.clear();
            self.follow_ups.abort_all();
            debug!("Tool panel reset after session end");
        }
    }

    /// Reacts to an update of the session's event log.
    ///
    /// Registers the tools if the session was just created, then processes any
    /// function calls in the newest `response.done` event.
    pub async fn on_events_updated(&mut self, events: &EventLog) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        if !self.tools_registered && events.oldest().is_some_and(ServerEvent::is_session_created) {
            // Marked first so a failed send is not repeated on the next update.
            self.tools_registered = true;
            info!("Registering career tools with the realtime session");
            self.sink.send(session_update()).await?;
        }

        if let Some(ServerEvent::ResponseDone { response }) = events.newest() {
            for item in response.output.iter().flatten() {
                let OutputItem::FunctionCall(call) = item else {
                    continue;
                };
                if let Some(tool) = call.tool() {
                    self.record_tool_call(tool, call.clone());
                }
            }
        }

        Ok(())
    }

    /// What the panel shows for the current state.
    pub fn view(&self) -> PanelView {
        match (&self.output, self.active) {
            (_, false) => PanelView::Inactive,
            (None, true) => PanelView::AwaitingToolCall,
            (Some(call), true) => PanelView::Output {
                rendered: render_function_call(call),
            },
        }
    }

    fn record_tool_call(&mut self, tool: RegisteredTool, call: FunctionCall) {
        info!(tool = tool.name(), arguments = %call.arguments, "User interaction");
        self.interactions.push(call.clone());
        self.output = Some(call);
        self.schedule_feedback(tool);
    }

    fn schedule_feedback(&mut self, tool: RegisteredTool) {
        let sink = self.sink.clone();
        let delay = self.feedback_delay;
        self.follow_ups.spawn(async move {
            tokio::time::sleep(delay).await;
            let event = ClientEvent::response_with_instructions(tool.feedback_instructions());
            if let Err(e) = sink.send(event).await {
                warn!(tool = tool.name(), error = %e, "Failed to send feedback prompt");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseResource;
    use crate::sink::MockEventSink;
    use anyhow::anyhow;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Records every event it is asked to send.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<ClientEvent>>,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<ClientEvent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl EventSink for RecordingSink {
        async fn send(&self, event: ClientEvent) -> Result<()> {
            self.sent.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn session_created() -> ServerEvent {
        ServerEvent::SessionCreated {
            session: Value::Null,
        }
    }

    fn response_done(output: Value) -> ServerEvent {
        serde_json::from_value(json!({
            "type": "response.done",
            "response": { "id": "resp_1", "output": output }
        }))
        .unwrap()
    }

    fn career_call() -> Value {
        json!({
            "type": "function_call",
            "name": "provide_career_advice",
            "call_id": "call_1",
            "arguments": "{\"topic\":\"networking\",\"advice\":\"Attend meetups\"}"
        })
    }

    fn job_call() -> Value {
        json!({
            "type": "function_call",
            "name": "create_job_post",
            "call_id": "call_2",
            "arguments": "{\"title\":\"Engineer\",\"description\":\"Build things\",\"requirements\":\"3 yrs exp\"}"
        })
    }

    fn instructions(event: &ClientEvent) -> Option<&str> {
        match event {
            ClientEvent::ResponseCreate { response } => response.instructions.as_deref(),
            _ => None,
        }
    }

    fn active_panel(sink: Arc<dyn EventSink>) -> ToolPanel {
        let mut panel = ToolPanel::new(sink);
        panel.set_active(true);
        panel
    }

    #[tokio::test]
    async fn test_registers_tools_once_per_session() {
        let mut mock = MockEventSink::new();
        mock.expect_send()
            .withf(|event| *event == session_update())
            .times(1)
            .returning(|_| Ok(()));
        let mut panel = active_panel(Arc::new(mock));

        let mut events = EventLog::new();
        events.push(session_created());
        panel.on_events_updated(&events).await.unwrap();
        assert!(panel.tools_registered());

        events.push(ServerEvent::Other);
        panel.on_events_updated(&events).await.unwrap();
        events.push(ServerEvent::Other);
        panel.on_events_updated(&events).await.unwrap();
    }

    #[tokio::test]
    async fn test_does_not_register_without_session_created() {
        let mut mock = MockEventSink::new();
        mock.expect_send().never();
        let mut panel = active_panel(Arc::new(mock));

        let events: EventLog = [ServerEvent::Other, session_created()].into_iter().collect();
        panel.on_events_updated(&events).await.unwrap();

        assert!(!panel.tools_registered());
    }

    #[tokio::test]
    async fn test_registration_failure_is_not_retried() {
        let mut mock = MockEventSink::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Err(anyhow!("socket gone")));
        let mut panel = active_panel(Arc::new(mock));

        let mut events: EventLog = [session_created()].into_iter().collect();
        assert!(panel.on_events_updated(&events).await.is_err());

        events.push(ServerEvent::Other);
        panel.on_events_updated(&events).await.unwrap();
        assert!(panel.tools_registered());
    }

    #[tokio::test]
    async fn test_empty_log_is_ignored() {
        let mut mock = MockEventSink::new();
        mock.expect_send().never();
        let mut panel = active_panel(Arc::new(mock));

        panel.on_events_updated(&EventLog::new()).await.unwrap();
        assert_eq!(panel.view(), PanelView::AwaitingToolCall);
    }

    #[tokio::test(start_paused = true)]
    async fn test_career_advice_call_is_stored_and_prompts_feedback() {
        let sink = Arc::new(RecordingSink::default());
        let mut panel = active_panel(sink.clone());

        let events: EventLog = [session_created(), response_done(json!([career_call()]))]
            .into_iter()
            .collect();
        panel.on_events_updated(&events).await.unwrap();

        let stored = panel.output().unwrap();
        assert_eq!(stored.name, "provide_career_advice");
        assert_eq!(
            stored.arguments,
            "{\"topic\":\"networking\",\"advice\":\"Attend meetups\"}"
        );
        // Only the registration has gone out so far.
        assert_eq!(sink.sent(), vec![session_update()]);

        tokio::time::sleep(Duration::from_millis(600)).await;

        let sent = sink.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            instructions(&sent[1]),
            Some("Ask for feedback about the career advice provided.")
        );
        assert_eq!(panel.pending_follow_ups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feedback_waits_for_the_delay() {
        let sink = Arc::new(RecordingSink::default());
        let mut panel = active_panel(sink.clone()).with_feedback_delay(Duration::from_secs(2));

        let events: EventLog = [response_done(json!([job_call()]))].into_iter().collect();
        panel.on_events_updated(&events).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(sink.sent().is_empty());
        assert_eq!(panel.pending_follow_ups(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            instructions(&sent[0]),
            Some("Ask for feedback about the job post provided.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_post_call_renders_job_post() {
        let sink = Arc::new(RecordingSink::default());
        let mut panel = active_panel(sink.clone());

        let events: EventLog = [response_done(json!([job_call()]))].into_iter().collect();
        panel.on_events_updated(&events).await.unwrap();

        let text = panel.view().to_string();
        assert!(text.starts_with(PANEL_TITLE));
        assert!(text.contains("Title: Engineer"));
        assert!(text.contains("Description: Build things"));
        assert!(text.contains("Requirements: 3 yrs exp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_qualifying_call_prompts_and_last_one_wins() {
        let sink = Arc::new(RecordingSink::default());
        let mut panel = active_panel(sink.clone());

        let events: EventLog = [response_done(json!([
            career_call(),
            { "type": "message", "role": "assistant", "content": [] },
            { "type": "function_call", "name": "get_weather", "arguments": "{}" },
            job_call()
        ]))]
        .into_iter()
        .collect();
        panel.on_events_updated(&events).await.unwrap();

        assert_eq!(panel.output().unwrap().name, "create_job_post");
        assert_eq!(panel.interactions().len(), 2);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let mut prompts: Vec<_> = sink
            .sent()
            .iter()
            .filter_map(|e| instructions(e).map(str::to_string))
            .collect();
        prompts.sort();
        assert_eq!(
            prompts,
            vec![
                "Ask for feedback about the career advice provided.".to_string(),
                "Ask for feedback about the job post provided.".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_sibling_does_not_hide_valid_call() {
        let sink = Arc::new(RecordingSink::default());
        let mut panel = active_panel(sink.clone());

        let event: ServerEvent = serde_json::from_value(json!({
            "type": "response.done",
            "response": {
                "output": [
                    { "type": "function_call", "arguments": "{}" },
                    career_call()
                ]
            }
        }))
        .unwrap();
        let events: EventLog = [event].into_iter().collect();
        panel.on_events_updated(&events).await.unwrap();

        assert_eq!(panel.output().unwrap().name, "provide_career_advice");
        assert_eq!(panel.interactions().len(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            instructions(&sent[0]),
            Some("Ask for feedback about the career advice provided.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_newest_response_is_inspected() {
        let sink = Arc::new(RecordingSink::default());
        let mut panel = active_panel(sink.clone());

        let events: EventLog = [response_done(json!([career_call()])), ServerEvent::Other]
            .into_iter()
            .collect();
        panel.on_events_updated(&events).await.unwrap();

        assert!(panel.output().is_none());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(sink.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_without_output_is_ignored() {
        let sink = Arc::new(RecordingSink::default());
        let mut panel = active_panel(sink.clone());

        let events: EventLog = [ServerEvent::ResponseDone {
            response: ResponseResource::default(),
        }]
        .into_iter()
        .collect();
        panel.on_events_updated(&events).await.unwrap();

        assert!(panel.output().is_none());
        assert_eq!(panel.pending_follow_ups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_end_resets_state_and_cancels_prompts() {
        let sink = Arc::new(RecordingSink::default());
        let mut panel = active_panel(sink.clone());

        let events: EventLog = [session_created(), response_done(json!([career_call()]))]
            .into_iter()
            .collect();
        panel.on_events_updated(&events).await.unwrap();
        assert!(panel.tools_registered());
        assert!(panel.output().is_some());

        panel.set_active(false);

        assert!(!panel.tools_registered());
        assert!(panel.output().is_none());
        assert!(panel.interactions().is_empty());
        assert_eq!(panel.view(), PanelView::Inactive);

        tokio::time::sleep(Duration::from_millis(600)).await;
        // Nothing beyond the registration was ever sent.
        assert_eq!(sink.sent(), vec![session_update()]);
    }

    #[tokio::test]
    async fn test_next_session_registers_again() {
        let mut mock = MockEventSink::new();
        mock.expect_send()
            .withf(|event| *event == session_update())
            .times(2)
            .returning(|_| Ok(()));
        let mut panel = active_panel(Arc::new(mock));

        let events: EventLog = [session_created()].into_iter().collect();
        panel.on_events_updated(&events).await.unwrap();

        panel.set_active(false);
        panel.set_active(true);

        let events: EventLog = [session_created()].into_iter().collect();
        panel.on_events_updated(&events).await.unwrap();
        assert!(panel.tools_registered());
    }

    #[test]
    fn test_placeholder_views() {
        let mock = MockEventSink::new();
        let mut panel = ToolPanel::new(Arc::new(mock));
        assert_eq!(
            panel.view().to_string(),
            format!("{}\nStart the session to use this tool...", PANEL_TITLE)
        );

        panel.set_active(true);
        assert_eq!(
            panel.view().to_string(),
            format!("{}\nAsk for career advice or create a job post...", PANEL_TITLE)
        );
    }
}
