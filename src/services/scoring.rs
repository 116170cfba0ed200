//! Deterministic keyword tables used to score check-ins, estimate mood from
//! chat text and compose the companion's replies.
//!
//! All matching is case-insensitive substring matching on trimmed input, and
//! every table is ordered: the first rule that matches wins.

pub const NEUTRAL_SCORE: i32 = 5;
pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 10;

/// Appended when a reply would repeat the previous assistant turn verbatim.
pub const REPEAT_RIDER: &str =
    "If you’d like, we can try a different angle—what outcome would feel 10% better?";

const LABEL_SCORES: &[(&str, i32)] = &[
    ("anxious", 1),
    ("stressed", 3),
    ("tired", 5),
    ("calm", 7),
    ("excited", 9),
    ("happy", 10),
];

/// Check-in note rules, strongest negative to strongest positive.
const NOTE_RULES: &[(&[&str], i32)] = &[
    (&["depressed", "miserable", "hopeless", "suicidal"], 1),
    (&["very sad", "so sad", "really sad"], 2),
    (&["sad", "down", "crying", "lonely", "unhappy"], 3),
    (&["panic attack", "panic"], 2),
    (&["very anxious", "super anxious"], 2),
    (&["anxious", "anxiety", "worried", "stressed", "overwhelmed"], 3),
    (&["exhausted", "burnt out", "burned out"], 3),
    (&["tired", "drained", "no energy"], 4),
    (&["meh", "bored"], 5),
    (&["fine", "okay", "ok", "calm"], 7),
    (&["good day", "feeling good"], 7),
    (&["happy", "better", "grateful", "relieved"], 9),
    (&["amazing", "fantastic", "great", "awesome", "wonderful"], 10),
];

/// Chat mood rules. Strong positives are checked first.
const CHAT_RULES: &[(&[&str], i32)] = &[
    (&["very happy", "amazing", "fantastic", "wonderful", "ecstatic"], 9),
    (&["happy", "good", "great", "excited", "grateful", "proud"], 7),
    (&["depressed", "terrible", "awful", "hopeless", "miserable"], 1),
    (&["angry", "furious", "mad", "rage", "frustrated"], 2),
    (&["anxious", "anxiety", "worried", "panic", "stressed", "overwhelmed"], 4),
    (&["sad", "down", "unhappy", "low", "lonely"], 3),
    (&["tired", "exhausted", "burnt out", "burned out", "fatigued"], 4),
    (&["sick", "ill", "fever", "pain", "hurts"], 3),
    (&["bored", "meh", "nothing to do"], 5),
    (&["confused", "lost", "don’t know", "don't know"], 4),
];

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn first_match(text: &str, rules: &[(&[&str], i32)]) -> Option<i32> {
    rules
        .iter()
        .find(|(keywords, _)| contains_any(text, keywords))
        .map(|(_, score)| *score)
}

pub fn clamp_score(score: i32) -> i32 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Score a check-in: explicit score, then known label, then note keywords,
/// then neutral.
pub fn score_checkin(score: Option<i32>, label: Option<&str>, note: Option<&str>) -> i32 {
    if let Some(score) = score {
        return clamp_score(score);
    }

    if let Some(label) = label.map(normalize).filter(|l| !l.is_empty()) {
        if let Some((_, score)) = LABEL_SCORES.iter().find(|(name, _)| *name == label) {
            return *score;
        }
    }

    note.map(normalize)
        .filter(|n| !n.is_empty())
        .and_then(|n| first_match(&n, NOTE_RULES))
        .map(clamp_score)
        .unwrap_or(NEUTRAL_SCORE)
}

/// Emoji stored alongside check-ins whose score has a face on the picker.
pub fn emoji_for_score(score: i32) -> Option<&'static str> {
    match score {
        1 => Some("😞"),
        3 => Some("☹️"),
        5 => Some("😐"),
        7 => Some("🙂"),
        9 => Some("😊"),
        10 => Some("😍"),
        _ => None,
    }
}

/// Mood estimate for free chat text.
pub fn estimate_mood(text: &str) -> (i32, &'static str) {
    let score = clamp_score(first_match(&normalize(text), CHAT_RULES).unwrap_or(NEUTRAL_SCORE));
    (score, mood_label(score))
}

pub fn mood_label(score: i32) -> &'static str {
    match score {
        s if s >= 8 => "Very positive",
        s if s >= 6 => "Positive",
        s if s >= 4 => "Neutral / mixed",
        s if s >= 2 => "Low / sad",
        _ => "Very low",
    }
}

// ============================================================================
// Replies
// ============================================================================

/// Detected theme of a chat message, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCategory {
    Low,
    Anxious,
    Angry,
    Tired,
    Unwell,
    Stuck,
    Bored,
    Positive,
    Thanks,
    Help,
    General,
}

const REPLY_RULES: &[(&[&str], ReplyCategory)] = &[
    (&["sad", "down", "depressed", "low", "lonely"], ReplyCategory::Low),
    (
        &["anxious", "anxiety", "worried", "nervous", "stressed", "overwhelmed"],
        ReplyCategory::Anxious,
    ),
    (&["angry", "mad", "frustrated", "furious"], ReplyCategory::Angry),
    (
        &["tired", "exhausted", "burnt out", "burned out", "fatigued"],
        ReplyCategory::Tired,
    ),
    (&["sick", "ill", "fever", "pain", "hurts"], ReplyCategory::Unwell),
    (&["confused", "lost", "stuck"], ReplyCategory::Stuck),
    (&["bored", "meh", "nothing to do"], ReplyCategory::Bored),
    (
        &["proud", "grateful", "happy", "good", "great", "excited"],
        ReplyCategory::Positive,
    ),
    (&["thank"], ReplyCategory::Thanks),
    (&["help", "advice", "tips", "tip"], ReplyCategory::Help),
];

impl ReplyCategory {
    pub fn detect(message: &str) -> Self {
        let text = normalize(message);
        REPLY_RULES
            .iter()
            .find(|(keywords, _)| contains_any(&text, keywords))
            .map(|(_, category)| *category)
            .unwrap_or(ReplyCategory::General)
    }

    fn empathy(self) -> &'static str {
        match self {
            ReplyCategory::Low => {
                "I'm really sorry you're feeling low. It's okay to have days like this. \
                 Do you want to share what made today feel heavy?"
            }
            ReplyCategory::Anxious => {
                "Anxiety and stress can feel intense. Let’s slow things down for a moment. \
                 What thought or situation is most in front of you right now?"
            }
            ReplyCategory::Angry => {
                "It sounds like you're really frustrated or angry. Those feelings are valid. \
                 What happened just before the anger showed up?"
            }
            ReplyCategory::Tired => {
                "You sound drained. Fatigue can make everything feel harder. \
                 Is it mental load, lack of sleep, or something specific today?"
            }
            ReplyCategory::Unwell => {
                "Not feeling well is rough. How are your symptoms right now, and do you have \
                 support if you need it?"
            }
            ReplyCategory::Stuck => {
                "Feeling stuck or confused is normal when things are complex. \
                 Tell me the goal in one sentence—then we’ll map a next step."
            }
            ReplyCategory::Bored => {
                "Boredom can hide behind low energy. What’s one tiny, doable activity you \
                 wouldn’t hate for 10 minutes?"
            }
            ReplyCategory::Positive => {
                "I love hearing that. What exactly made you feel this way? Let’s highlight it \
                 so you can revisit it later."
            }
            ReplyCategory::Thanks => {
                "You're welcome—I'm here anytime. Is there anything else you want to explore \
                 right now?"
            }
            ReplyCategory::Help => {
                "I’ll do my best to help. Can you describe the situation in a few bullet points \
                 so we can get specific?"
            }
            ReplyCategory::General => {
                "Thank you for sharing. I’m here to listen and support you without judgment. \
                 What feels most important to talk about next?"
            }
        }
    }

    pub fn tip(self) -> &'static str {
        match self {
            ReplyCategory::Angry => {
                "Try a 90-second reset: slow inhale 4s, hold 4s, long exhale 6–8s. \
                 Shake out the shoulders."
            }
            ReplyCategory::Anxious => {
                "Grounding tip: name 5 things you can see, 4 you can feel, 3 you can hear, \
                 2 you can smell, 1 you can taste."
            }
            ReplyCategory::Low => {
                "Tiny lift: step outside for 2 minutes of fresh air or light; message someone \
                 you trust one sentence."
            }
            ReplyCategory::Tired => {
                "Micro-recharge: 20-minute break with phone away, drink water, blink slowly \
                 10 times."
            }
            ReplyCategory::Unwell => {
                "Be gentle today—hydrate, rest if you can, and consider a quick check-in with \
                 a clinician if symptoms persist."
            }
            ReplyCategory::Bored => {
                "Pick a 10-minute task with a clear finish—then reward yourself. Momentum \
                 beats motivation."
            }
            ReplyCategory::Stuck => {
                "Write 3 bullet points: what you know, what you don’t, and one next step."
            }
            ReplyCategory::Positive => {
                "Awesome—savor this! Take a breath and note one specific detail you appreciate \
                 right now."
            }
            ReplyCategory::Thanks | ReplyCategory::Help | ReplyCategory::General => {
                "Small steps count. Pick one doable action for the next 10 minutes—then come \
                 back and we’ll reflect."
            }
        }
    }
}

/// A composed companion reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub category: ReplyCategory,
}

/// Compose the reply for `message`. `last_assistant` is the previous
/// assistant turn, if any.
pub fn generate_reply(message: &str, last_assistant: Option<&str>) -> Reply {
    let category = ReplyCategory::detect(message);
    let mut text = format!("{}\n\n💡 Tip: {}", category.empathy(), category.tip());

    if let Some(previous) = last_assistant.map(str::trim).filter(|p| !p.is_empty()) {
        if previous == text.trim() {
            text.push_str("\n\n");
            text.push_str(REPEAT_RIDER);
        }
    }

    Reply { text, category }
}
