//! Offline keyword responder.
//!
//! Deterministic mapping from a user message to one of a few canned replies.
//! Only the generic fallback involves randomness, and the picker is injected
//! so tests can fix it.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ChatError, Coach, Role, WireMessage};

pub const CRAVING_REPLY: &str = "I understand cravings can be intense. Here are some quick tips:

🧘 **Deep breathing**: Take 10 slow, deep breaths
💧 **Drink water**: Stay hydrated, it helps reduce cravings
🚶 **Take a walk**: Even 5 minutes can help
🍎 **Healthy snack**: Try crunchy vegetables or fruits
⏰ **Wait it out**: Cravings usually pass in 3-5 minutes

You've got this! Every craving you overcome makes you stronger.";

pub const MOTIVATION_REPLY: &str = "Remember why you started this journey! Here's what you're gaining:

❤️ Your heart is getting healthier every day
💰 You're saving money for things that matter
🏃 Your energy levels are increasing
👨‍👩‍👧‍👦 You're setting an example for loved ones
🌟 You're proving to yourself that you CAN do this

Every smoke-free moment is a victory. Be proud of yourself!";

pub const WITHDRAWAL_REPLY: &str = "Withdrawal symptoms are temporary signs that your body is healing. Common symptoms include:

😤 Irritability - Try relaxation techniques
😴 Sleep changes - Maintain a regular schedule
🤔 Difficulty concentrating - Take breaks, stay hydrated
🍽️ Increased appetite - Keep healthy snacks nearby
😟 Anxiety - Exercise and deep breathing help

These symptoms typically peak in the first 3 days and improve significantly after 2 weeks. You're doing great!";

pub const RELAPSE_REPLY: &str = "A slip doesn't erase your progress! Here's what to do:

1. **Don't give up** - One cigarette doesn't mean failure
2. **Learn from it** - What triggered the slip?
3. **Reset immediately** - You can start fresh right now
4. **Reach out** - Talk to someone supportive
5. **Review your reasons** - Why do you want to quit?

Many successful quitters had slips along the way. What matters is that you keep trying!";

pub const BENEFITS_REPLY: &str = "Here's what happens when you quit smoking:

⏱️ **20 minutes**: Heart rate drops
⏱️ **8 hours**: Oxygen levels normalize
⏱️ **24 hours**: Heart attack risk decreases
⏱️ **48 hours**: Nicotine leaves your body
⏱️ **72 hours**: Breathing becomes easier
⏱️ **2 weeks**: Circulation improves
⏱️ **1 month**: Lung function increases 30%
⏱️ **1 year**: Heart disease risk halved

Every moment smoke-free counts!";

pub const SCOPE_REDIRECT_REPLY: &str = "I'm specialized in helping with smoking cessation. I can answer questions about cravings, motivation, withdrawal symptoms, health benefits of quitting, and tips for staying smoke-free. How can I help with your quit journey?";

pub const GENERIC_REPLIES: [&str; 3] = [
    "I'm here to help you with your smoke-free journey! You can ask me about cravings, motivation, withdrawal symptoms, or the benefits of quitting.",
    "That's a great question about your health journey! Remember, every step forward matters, no matter how small.",
    "I understand this journey can be challenging. Would you like some tips on handling cravings or staying motivated?",
];

/// Checked in order; the first group with a matching keyword wins.
const KEYWORD_GROUPS: [(&[&str], &str); 5] = [
    (&["craving", "urge", "want to smoke"], CRAVING_REPLY),
    (&["motivat", "why", "reason"], MOTIVATION_REPLY),
    (&["withdrawal", "symptom", "feeling bad"], WITHDRAWAL_REPLY),
    (&["relapse", "slip", "smoked", "failed"], RELAPSE_REPLY),
    (&["benefit", "health", "happen"], BENEFITS_REPLY),
];

const SMOKING_VOCABULARY: [&str; 8] = [
    "smoke",
    "cigarette",
    "nicotine",
    "quit",
    "tobacco",
    "lung",
    "cough",
    "breath",
];

/// Messages longer than this without smoking vocabulary get redirected
const REDIRECT_MIN_CHARS: usize = 10;

/// Delay before the canned reply appears
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(1000);

/// Chooses one of the generic replies.
pub trait ReplyPicker: Send {
    /// Index in `0..len`
    fn pick(&mut self, len: usize) -> usize;
}

/// Uniform random choice
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyPicker for RandomPicker {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Always the same index (wrapped into range)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker(pub usize);

impl ReplyPicker for FixedPicker {
    fn pick(&mut self, len: usize) -> usize {
        self.0 % len
    }
}

/// Keyword-based canned replies.
pub struct KeywordResponder {
    picker: Box<dyn ReplyPicker>,
}

impl KeywordResponder {
    pub fn new(picker: impl ReplyPicker + 'static) -> Self {
        Self {
            picker: Box::new(picker),
        }
    }

    pub fn respond(&mut self, text: &str) -> String {
        let lower = text.to_lowercase();

        if let Some(reply) = keyword_reply(&lower) {
            return reply.to_string();
        }

        let smoking_related = SMOKING_VOCABULARY.iter().any(|word| lower.contains(word));
        if !smoking_related && text.chars().count() > REDIRECT_MIN_CHARS {
            return SCOPE_REDIRECT_REPLY.to_string();
        }

        let index = self.picker.pick(GENERIC_REPLIES.len());
        GENERIC_REPLIES[index % GENERIC_REPLIES.len()].to_string()
    }
}

impl Default for KeywordResponder {
    fn default() -> Self {
        Self::new(RandomPicker::new())
    }
}

fn keyword_reply(lower: &str) -> Option<&'static str> {
    KEYWORD_GROUPS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|(_, reply)| *reply)
}

/// Coach that answers locally with [`KeywordResponder`].
pub struct OfflineCoach {
    responder: Mutex<KeywordResponder>,
    typing_delay: Duration,
}

impl OfflineCoach {
    pub fn new(responder: KeywordResponder) -> Self {
        Self {
            responder: Mutex::new(responder),
            typing_delay: DEFAULT_TYPING_DELAY,
        }
    }

    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }
}

impl Default for OfflineCoach {
    fn default() -> Self {
        Self::new(KeywordResponder::default())
    }
}

#[async_trait]
impl Coach for OfflineCoach {
    async fn stream_reply(
        &self,
        history: &[WireMessage],
        on_update: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, ChatError> {
        let last_user = history
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .ok_or_else(|| ChatError::Backend("no user message to answer".to_string()))?;

        if !self.typing_delay.is_zero() {
            tokio::time::sleep(self.typing_delay).await;
        }

        let reply = self.responder.lock().respond(&last_user.content);
        on_update(&reply);
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responder() -> KeywordResponder {
        KeywordResponder::new(FixedPicker(0))
    }

    #[test]
    fn test_keyword_groups() {
        let mut r = responder();
        assert_eq!(r.respond("I have an URGE right now"), CRAVING_REPLY);
        assert_eq!(r.respond("Need motivation"), MOTIVATION_REPLY);
        assert_eq!(r.respond("what symptoms should I expect"), WITHDRAWAL_REPLY);
        assert_eq!(r.respond("I smoked yesterday"), RELAPSE_REPLY);
        assert_eq!(r.respond("What are the benefits?"), BENEFITS_REPLY);
    }

    #[test]
    fn test_first_matching_group_wins() {
        let mut r = responder();
        // matches craving and motivation; craving is checked first
        assert_eq!(r.respond("why do I get cravings?"), CRAVING_REPLY);
        // matches relapse and benefits
        assert_eq!(r.respond("I failed, is my health ruined"), RELAPSE_REPLY);
    }

    #[test]
    fn test_generic_fallback_for_short_input() {
        let mut r = KeywordResponder::new(FixedPicker(2));
        assert_eq!(r.respond("hello"), GENERIC_REPLIES[2]);
    }

    #[test]
    fn test_smoking_vocabulary_gets_generic_reply() {
        let mut r = responder();
        assert_eq!(
            r.respond("Tell me about nicotine patches please"),
            GENERIC_REPLIES[0]
        );
    }

    #[test]
    fn test_off_topic_redirect() {
        let mut r = responder();
        assert_eq!(
            r.respond("What is the capital of France?"),
            SCOPE_REDIRECT_REPLY
        );
        // exactly ten characters is not redirected
        assert_eq!(r.respond("abcdefghij"), GENERIC_REPLIES[0]);
    }

    #[test]
    fn test_random_picker_stays_in_range() {
        let mut picker = RandomPicker::seeded(7);
        for _ in 0..100 {
            assert!(picker.pick(3) < 3);
        }
    }

    #[tokio::test]
    async fn test_offline_coach_answers_last_user_message() {
        let coach = OfflineCoach::new(responder()).with_typing_delay(Duration::ZERO);
        let history = vec![
            WireMessage::user("hello"),
            WireMessage {
                role: Role::Assistant,
                content: "Hi!".to_string(),
            },
            WireMessage::user("I'm having a craving"),
        ];

        let mut updates = Vec::new();
        let mut on_update = |content: &str| updates.push(content.to_string());
        let reply = coach.stream_reply(&history, &mut on_update).await.unwrap();

        assert_eq!(reply, CRAVING_REPLY);
        assert_eq!(updates, vec![CRAVING_REPLY.to_string()]);
    }

    #[tokio::test]
    async fn test_offline_coach_without_user_message() {
        let coach = OfflineCoach::new(responder()).with_typing_delay(Duration::ZERO);
        let mut on_update = |_: &str| {};
        let result = coach.stream_reply(&[], &mut on_update).await;
        assert!(matches!(result, Err(ChatError::Backend(_))));
    }
}
