//! Built-in canned scenario: two partners planning a vacation.

use crate::config::{PrepResponseConfig, SeedMessage, TurnResponseConfig};
use crate::session::Role;
use crate::synthesis::Synthesis;

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

/// Opening transcript of the facilitated conversation.
pub fn get_default_seed_messages() -> Vec<SeedMessage> {
    vec![
        SeedMessage {
            sender: Role::Ai,
            content: "Welcome! I'm here to help you both discuss the vacation planning. Would you like to start by sharing your thoughts?".to_string(),
            offset_secs: 180,
        },
        SeedMessage {
            sender: Role::User,
            content: "I really think we should go somewhere warm. I'm tired of cold weather.".to_string(),
            offset_secs: 120,
        },
        SeedMessage {
            sender: Role::Other,
            content: "But skiing would be so fun! Plus warm places are expensive in winter".to_string(),
            offset_secs: 60,
        },
    ]
}

pub fn get_default_turn_responses() -> TurnResponseConfig {
    TurnResponseConfig {
        other: owned(&[
            "Actually, you make a good point about the weather. Maybe we could find somewhere that has both warm weather and some activities?",
            "I've been thinking about what you said, and I realize I might be too focused on the budget. What if we look for deals?",
            "You know what, I'm starting to see your perspective. Relaxation does sound really nice after this stressful year.",
            "I found some places that might work for both of us - they have warm weather but also hiking and outdoor activities.",
            "Maybe we could do a mix? A few days of relaxation and a few days of more active stuff?",
            "I'm sorry if I seemed too focused on costs. This trip is important and we should make it special.",
            "What if we each pick our top 3 destinations and see if there's any overlap?",
            "I'm really excited about planning this together. Thanks for being patient with my concerns.",
            "You're right that we both want quality time. That's what matters most to me too.",
            "I think we're getting closer to something we'll both love. Should we start looking at specific places?",
        ]),
        ai: owned(&[
            "I'm noticing you both have different preferences for climate. Let's explore what's most important to each of you about this vacation. What would make this trip feel most meaningful to you both?",
            "That's a great point about budget considerations. How do you feel about Mike's concern regarding costs? Are there ways we could find warm destinations that work within your budget?",
            "I hear both of your perspectives. It sounds like you value relaxation and warmth, while Mike is excited about activities and being mindful of expenses. What if we explored options that could satisfy both needs?",
            "This is productive! You're both sharing your core values around this trip. Let's dig deeper - what does the perfect vacation day look like for each of you?",
            "I'm sensing some common ground emerging. Both of you seem to value quality time together. How might we build on that shared priority?",
            "Excellent discussion! You're both being very thoughtful about each other's needs. What compromises feel most comfortable to you both?",
            "I can see you're both working hard to understand each other's perspective. That's wonderful! What questions do you have for each other about your vacation preferences?",
            "This conversation is really evolving nicely. You're both showing great flexibility. What feels like the most important thing to get right about this trip?",
            "I'm impressed by how well you're both listening to each other. What aspects of this vacation planning feel most exciting to you both now?",
            "Great progress! You're finding ways to honor both of your needs. What would help you feel most confident about moving forward with a decision?",
        ]),
    }
}

pub fn get_default_prep_greeting() -> String {
    "Hi! I'm here to help you prepare for a productive conversation with someone important to you. This is a private prep session - nothing is saved and it will auto-delete when we're done.\n\nTake your time and share what's on your mind. What situation would you like to discuss with them?".to_string()
}

pub fn get_default_prep_responses() -> PrepResponseConfig {
    PrepResponseConfig {
        understanding: owned(&[
            "I hear you're feeling frustrated. Tell me what's making this situation difficult?",
            "That sounds challenging. Can you help me understand what's most important to you here?",
            "I can sense this matters to you. What would you most want the other person to understand?",
            "It sounds like there are different perspectives at play. What's your main concern?",
            "Help me understand - what's making this feel stuck for you?",
        ]),
        framing: owned(&[
            "What would a good outcome look like for both of you?",
            "If this conversation went really well, what would change?",
            "What do you think they might be feeling about this situation?",
            "What's the most important thing for them to hear from you?",
            "How would you want to feel after this conversation?",
        ]),
        ready: owned(&[
            "I think I understand the situation now. Let me help you frame this constructively.",
            "You've shared some important insights. Here's how we might approach this together.",
            "Based on what you've told me, I can help create a good foundation for this conversation.",
        ]),
    }
}

pub fn get_default_synthesis() -> Synthesis {
    Synthesis {
        message: "Based on what you've shared, I think I understand the situation. You're looking for rest and relaxation, while your partner wants adventure and activities. You both care about the vacation but have different ways of recharging. Let me help you frame this constructively for your conversation.".to_string(),
        summary: "You and your partner have different vacation preferences - you need rest and relaxation to recharge from work stress, while they're excited about adventure and activities. You both want the vacation to be meaningful but approach it differently.".to_string(),
    }
}
