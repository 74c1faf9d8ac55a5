//! Prompt construction
//!
//! Every prompt asks for a single JSON object so answers go through the same
//! extraction path.

use crate::agent::schedule::ScheduleSlot;
use crate::agent::scratch::Identity;
use crate::cognition::{
    ChoiceLevel, ChoiceRequest, ConversationContext, DailyPlanItem, DecompositionRequest, RedecompositionRequest,
    SocialContext,
};
use crate::memory::node::transcript;
use crate::memory::{ChatTurn, MemoryKind};

const SYSTEM: &str = "You simulate the inner life of a character in a small town. \
Stay in character, keep answers short, and reply with one JSON object only.";

pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    fn new(user: String) -> Self {
        Self {
            system: SYSTEM.to_string(),
            user,
        }
    }
}

fn numbered(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| format!("{}. {}", i, l))
        .collect::<Vec<_>>()
        .join("\n")
}

fn slots(slots: &[ScheduleSlot]) -> String {
    slots
        .iter()
        .map(|s| format!("- {} ({} min)", s.activity, s.duration))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hhmm(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60 % 24, minute % 60)
}

pub fn rate_poignancy(identity: &Identity, kind: MemoryKind, description: &str) -> Prompt {
    let what = match kind {
        MemoryKind::Chat => "conversation",
        MemoryKind::Thought => "thought",
        _ => "event",
    };
    Prompt::new(format!(
        "{}\n\nOn a scale of 1 to 10, where 1 is purely mundane (brushing teeth, making bed) and 10 is extremely poignant (a break up, college acceptance), rate the likely poignancy of this {} for {}.\n{}: {}\n\nJSON: {{\"rating\": <1-10>}}",
        identity.summary(),
        what,
        identity.name,
        what,
        description
    ))
}

fn social(context: &SocialContext) -> String {
    format!(
        "Context for {}:\n{}\n\nLast chat: {}\nIt is {}.\n{} is {}.\n{} is {}.",
        context.initiator,
        context.memories.join("\n"),
        context.last_chat.as_deref().unwrap_or("none"),
        context.time,
        context.initiator,
        context.initiator_activity,
        context.target,
        context.target_activity
    )
}

pub fn decide_to_talk(context: &SocialContext) -> Prompt {
    Prompt::new(format!(
        "{}\n\nWould {} start a conversation with {} right now?\n\nJSON: {{\"reasoning\": \"...\", \"answer\": \"yes\" | \"no\"}}",
        social(context),
        context.initiator,
        context.target
    ))
}

pub fn decide_to_react(context: &SocialContext) -> Prompt {
    Prompt::new(format!(
        "{}\n\nHow should {} react?\n1: wait until {} is done with the current activity\n2: do other things\n3: keep doing the current activity\n\nJSON: {{\"reasoning\": \"...\", \"option\": 1 | 2 | 3}}",
        social(context),
        context.initiator,
        context.target
    ))
}

pub fn wake_up_hour(identity: &Identity) -> Prompt {
    Prompt::new(format!(
        "{}\n\nWhat time does {} usually wake up?\n\nJSON: {{\"wake_up\": \"HH:MM AM/PM\"}}",
        identity.summary(),
        identity.name
    ))
}

pub fn daily_plan(identity: &Identity, wake_up_hour: u32) -> Prompt {
    Prompt::new(format!(
        "{}\n\n{} wakes up at {}:00. List today's plan in broad strokes, 5 to 8 items with times.\n\nJSON: {{\"plan\": [{{\"time\": \"8:00 am\", \"activity\": \"...\"}}]}}",
        identity.summary(),
        identity.name,
        wake_up_hour
    ))
}

pub fn daily_plan_and_status(identity: &Identity, yesterday: &[String], wake_up_hour: u32) -> Prompt {
    Prompt::new(format!(
        "{}\n\nWhat {} did and thought yesterday:\n{}\n\nGiven this, write {}'s status for today in one sentence and today's broad-strokes plan starting at {}:00.\n\nJSON: {{\"status\": \"...\", \"plan\": [{{\"time\": \"8:00 am\", \"activity\": \"...\"}}]}}",
        identity.summary(),
        identity.name,
        yesterday.join("\n"),
        identity.name,
        wake_up_hour
    ))
}

pub fn hourly_schedule(identity: &Identity, plan: &[DailyPlanItem], wake_up_hour: u32) -> Prompt {
    let plan = plan.iter().map(|p| p.to_string()).collect::<Vec<_>>().join("; ");
    Prompt::new(format!(
        "{}\n\nToday's plan: {}\n{} sleeps until {}:00. Give one activity for every hour from 0 to 23.\n\nJSON: {{\"hours\": [{{\"hour\": 0, \"activity\": \"sleeping\"}}]}}",
        identity.summary(),
        plan,
        identity.name,
        wake_up_hour
    ))
}

pub fn decompose(identity: &Identity, request: &DecompositionRequest) -> Prompt {
    Prompt::new(format!(
        "{}\n\nAround it: {}\nFrom {} {} will be {} for {} minutes. Break this into sub-tasks of at least 5 minutes whose durations add up to exactly {}.\n\nJSON: {{\"subtasks\": [{{\"activity\": \"...\", \"duration\": 15}}]}}",
        identity.summary(),
        request.surrounding.join("; "),
        hhmm(request.start_minute),
        identity.name,
        request.activity,
        request.duration,
        request.duration
    ))
}

pub fn redecompose(identity: &Identity, request: &RedecompositionRequest) -> Prompt {
    Prompt::new(format!(
        "{}\n\nOriginal plan from {}:\n{}\n\nWhat actually happened so far:\n{}\n\nFill the remaining {} minutes with activities.\n\nJSON: {{\"subtasks\": [{{\"activity\": \"...\", \"duration\": 15}}]}}",
        identity.summary(),
        hhmm(request.window_start_minute),
        slots(&request.original),
        slots(&request.fixed),
        request.remaining
    ))
}

pub fn choose(request: &ChoiceRequest) -> Prompt {
    let level = match request.level {
        ChoiceLevel::Sector => "area",
        ChoiceLevel::Arena => "room or part of the area",
        ChoiceLevel::GameObject => "object",
    };
    Prompt::new(format!(
        "{}\n{} is going to be {}. Which {} should {} use? Pick exactly one of: {}\n\nJSON: {{\"answer\": \"<one option, verbatim>\"}}",
        request.context,
        request.agent,
        request.activity,
        level,
        request.agent,
        request.options.join(", ")
    ))
}

pub fn pronunciatio(description: &str) -> Prompt {
    Prompt::new(format!(
        "Convert this action into one or two emoji: {}\n\nJSON: {{\"emoji\": \"...\"}}",
        description
    ))
}

pub fn event_triple(name: &str, description: &str) -> Prompt {
    Prompt::new(format!(
        "Turn the statement into a (subject, predicate, object) triple. The subject is {}.\nStatement: {}\n\nJSON: {{\"subject\": \"...\", \"predicate\": \"...\", \"object\": \"...\"}}",
        name, description
    ))
}

pub fn object_state(name: &str, object: &str, action_description: &str) -> Prompt {
    Prompt::new(format!(
        "{} is {} using the {}. What state is the {} in?\n\nJSON: {{\"description\": \"<object> is <state>\", \"predicate\": \"is\", \"object\": \"<state>\"}}",
        name, action_description, object, object
    ))
}

pub fn conversation_turn(context: &ConversationContext) -> Prompt {
    let past = context
        .past_context
        .as_ref()
        .map(|p| format!("\nEarlier: {}", p))
        .unwrap_or_default();
    Prompt::new(format!(
        "{}\n\nIt is {}. {}{}\nWhat {} remembers:\n{}\n\n{} is {}.\nConversation so far:\n{}\n\nWhat does {} say next, and does this end the conversation?\n\nJSON: {{\"utterance\": \"...\", \"end\": true | false}}",
        context.speaker.summary(),
        context.time,
        context.relationship,
        past,
        context.speaker.name,
        context.memories.join("\n"),
        context.listener,
        context.listener_activity,
        if context.transcript.is_empty() { "(not started)".to_string() } else { transcript(&context.transcript) },
        context.speaker.name
    ))
}

pub fn summarize_conversation(turns: &[ChatTurn]) -> Prompt {
    Prompt::new(format!(
        "Conversation:\n{}\n\nSummarize what it was about in one short phrase starting with \"conversing about\".\n\nJSON: {{\"summary\": \"...\"}}",
        transcript(turns)
    ))
}

pub fn summarize_relationship(initiator: &str, target: &str, memories: &[String]) -> Prompt {
    Prompt::new(format!(
        "What {} remembers:\n{}\n\nSummarize the relationship between {} and {} in one sentence.\n\nJSON: {{\"summary\": \"...\"}}",
        initiator,
        memories.join("\n"),
        initiator,
        target
    ))
}

pub fn reflection_points(name: &str, memories: &[String], count: usize) -> Prompt {
    Prompt::new(format!(
        "Recent memories of {}:\n{}\n\nGiven only this, what are the {} most salient high-level questions we can answer about {}?\n\nJSON: {{\"questions\": [\"...\"]}}",
        name,
        memories.join("\n"),
        count,
        name
    ))
}

pub fn insights(name: &str, statements: &[String], count: usize) -> Prompt {
    Prompt::new(format!(
        "Statements about {}:\n{}\n\nWhat {} high-level insights can you infer? Cite the statement numbers supporting each.\n\nJSON: {{\"insights\": [{{\"insight\": \"...\", \"evidence\": [0, 2]}}]}}",
        name,
        numbered(statements),
        count
    ))
}

pub fn conversation_memo(name: &str, text: &str) -> Prompt {
    Prompt::new(format!(
        "Conversation:\n{}\n\nWrite a short first-person memo of what {} found interesting in it.\n\nJSON: {{\"memo\": \"...\"}}",
        text, name
    ))
}

pub fn conversation_planning(name: &str, text: &str) -> Prompt {
    Prompt::new(format!(
        "Conversation:\n{}\n\nWrite a short first-person note of what {} should remember for planning.\n\nJSON: {{\"memo\": \"...\"}}",
        text, name
    ))
}
