//! Urdu / Roman-Urdu input normalization
//!
//! Detects secondary-language input (Arabic-script characters or known
//! Roman-Urdu words) and rewrites it into English command vocabulary before
//! dispatch. Replacement works on raw substrings, not tokens, so an English
//! word that happens to contain a Roman-Urdu trigger ("kab" in "kebab" does
//! not, "kab" in "kabul" does) is rewritten as well.

use regex::Regex;

/// Arabic script block (covers Urdu)
const SCRIPT_RANGE: std::ops::RangeInclusive<char> = '\u{0600}'..='\u{06FF}';

/// Secondary-language phrase → English equivalent
const PHRASES: &[(&str, &str)] = &[
    // Greetings
    ("سلام", "hello"),
    ("السلام علیکم", "hello"),
    ("assalam o alaikum", "hello"),
    ("salam", "hello"),
    ("kya hal hai", "how are you"),
    ("کیا حال ہے", "how are you"),
    // Time
    ("waqt", "time"),
    ("وقت", "time"),
    ("waqt kya hua", "what time is it"),
    ("وقت کیا ہوا", "what time is it"),
    ("tareekh", "date"),
    ("تاریخ", "date"),
    ("aaj kya din hai", "what day is today"),
    ("آج کیا دن ہے", "what day is today"),
    // Weather
    ("mausam", "weather"),
    ("موسم", "weather"),
    ("mausam kaisa hai", "how is the weather"),
    ("موسم کیسا ہے", "how is the weather"),
    // Music
    ("gaana", "song"),
    ("گانا", "song"),
    ("gaana bajao", "play song"),
    ("گانا بجاؤ", "play song"),
    ("music chalao", "play music"),
    ("music band karo", "stop music"),
    ("موسیقی بند کرو", "stop music"),
    ("roko", "stop"),
    ("روکو", "stop"),
    // Alarms
    ("الارم", "alarm"),
    ("alarm lagao", "set alarm"),
    ("الارم لگاؤ", "set alarm"),
    ("yaad dilao", "remind me"),
    ("یاد دلاؤ", "remind me"),
    // Common words
    ("kya", "what"),
    ("کیا", "what"),
    ("kaise", "how"),
    ("کیسے", "how"),
    ("kab", "when"),
    ("کب", "when"),
    ("kahan", "where"),
    ("کہاں", "where"),
    ("kyun", "why"),
    ("کیوں", "why"),
    ("haan", "yes"),
    ("ہاں", "yes"),
    ("nahi", "no"),
    ("نہیں", "no"),
    ("shukriya", "thank you"),
    ("شکریہ", "thank you"),
    ("meherbani", "please"),
    ("مہربانی", "please"),
];

/// English phrase → canned Urdu reply
const URDU_RESPONSES: &[(&str, &str)] = &[
    ("hello", "السلام علیکم"),
    ("how are you", "میں ٹھیک ہوں، شکریہ"),
    ("thank you", "خوش آمدید"),
    ("goodbye", "اللہ حافظ"),
    ("yes", "ہاں"),
    ("no", "نہیں"),
    ("playing", "بجا رہا ہوں"),
    ("stopped", "بند کر دیا"),
    ("alarm set", "الارم لگا دیا"),
];

/// Appended to the chat system prompt when the user spoke Urdu
pub const URDU_PROMPT_NOTE: &str = "Note: User may speak in Urdu/Hindi (Roman Urdu). \
Understand common Urdu phrases and respond appropriately. \
You can use simple Urdu words in your response if appropriate.";

/// Stateless secondary-language detector and normalizer
pub struct Translator {
    /// Longest phrase first, so multi-word phrases win over their parts
    rules: Vec<Rule>,
}

struct Rule {
    phrase: &'static str,
    pattern: Regex,
    english: &'static str,
}

impl Translator {
    /// Build the translator from the fixed phrase table
    #[must_use]
    pub fn new() -> Self {
        let mut rules: Vec<Rule> = PHRASES
            .iter()
            .filter_map(|&(phrase, english)| {
                Regex::new(&format!("(?i){}", regex::escape(phrase)))
                    .ok()
                    .map(|pattern| Rule {
                        phrase,
                        pattern,
                        english,
                    })
            })
            .collect();
        rules.sort_by_key(|r| std::cmp::Reverse(r.phrase.chars().count()));

        Self { rules }
    }

    /// True if the text contains Urdu script or a known Roman-Urdu phrase
    #[must_use]
    pub fn detect(&self, text: &str) -> bool {
        if text.chars().any(|c| SCRIPT_RANGE.contains(&c)) {
            return true;
        }
        let lower = text.to_lowercase();
        self.rules.iter().any(|r| lower.contains(r.phrase))
    }

    /// Replace every known phrase (case-insensitively) with its English equivalent
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        let mut out = text.to_string();
        for rule in &self.rules {
            if rule.pattern.is_match(&out) {
                out = rule.pattern.replace_all(&out, rule.english).into_owned();
            }
        }
        if out != text {
            tracing::debug!(original = text, translated = %out, "urdu translation");
        }
        out
    }

    /// Normalize only if secondary-language input was detected
    ///
    /// Returns the text to dispatch and whether translation applied.
    #[must_use]
    pub fn prepare(&self, text: &str) -> (String, bool) {
        if self.detect(text) {
            (self.normalize(text), true)
        } else {
            (text.to_string(), false)
        }
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

/// Canned Urdu reply for a common English phrase, if any
#[must_use]
pub fn urdu_response(english: &str) -> Option<&'static str> {
    let lower = english.to_lowercase();
    URDU_RESPONSES
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, urdu)| *urdu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_script_and_roman_words() {
        let t = Translator::new();
        assert!(t.detect("موسم"));
        assert!(t.detect("Mausam kaisa hai"));
        assert!(!t.detect("what is the weather"));
    }

    #[test]
    fn test_longest_phrase_wins() {
        let t = Translator::new();
        assert_eq!(t.normalize("waqt kya hua"), "what time is it");
        assert_eq!(t.normalize("music band karo"), "stop music");
    }

    #[test]
    fn test_case_insensitive_and_preserves_rest() {
        let t = Translator::new();
        assert_eq!(t.normalize("Gaana bajao Shape of You"), "play song Shape of You");
    }

    #[test]
    fn test_urdu_script_normalized() {
        let t = Translator::new();
        assert_eq!(t.normalize("موسم کیسا ہے"), "how is the weather");
    }

    #[test]
    fn test_substring_collision_is_preserved() {
        // "kab" inside "kabul" is rewritten too
        let t = Translator::new();
        assert!(t.detect("weather in kabul"));
        assert_eq!(t.normalize("weather in kabul"), "weather in whenul");
    }

    #[test]
    fn test_prepare_leaves_english_untouched() {
        let t = Translator::new();
        let (text, translated) = t.prepare("Play Shape Of You");
        assert_eq!(text, "Play Shape Of You");
        assert!(!translated);
    }

    #[test]
    fn test_urdu_response() {
        assert_eq!(urdu_response("Music stopped."), Some("بند کر دیا"));
        assert_eq!(urdu_response("zzz"), None);
    }
}
