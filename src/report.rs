//! Text shown to the respondent for a prediction.

use crate::scoring::RiskLabel;

const HIGH_RISK_ADVICE: &[&str] = &[
    "Talk to someone you trust: a friend, mentor, or school counselor.",
    "Prioritize sleep, food, and rest. It is self-care, not laziness.",
    "Reduce your academic pressure where possible and ask for help.",
    "You are not alone. Many students feel this way and things can get better.",
];

const LOW_RISK_ADVICE: &[&str] = &[
    "Stay connected to friends and activities you enjoy.",
    "Take breaks to recharge, even when things feel okay.",
    "Check in on your friends too. A kind word can go a long way.",
];

pub fn headline(name: Option<&str>, label: RiskLabel) -> String {
    let who = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Hi");
    match label {
        RiskLabel::High => format!("{}, your result shows a High Mental Health Risk.", who),
        RiskLabel::Low => format!("{}, your result shows a Low Mental Health Risk.", who),
    }
}

pub fn advice(label: RiskLabel) -> &'static [&'static str] {
    match label {
        RiskLabel::High => HIGH_RISK_ADVICE,
        RiskLabel::Low => LOW_RISK_ADVICE,
    }
}

/// Headline followed by the advice list for `label`.
pub fn render(name: Option<&str>, label: RiskLabel) -> String {
    let mut text = headline(name, label);
    text.push_str("\n\n");
    match label {
        RiskLabel::High => text.push_str(
            "This does not mean something is wrong with you. It signals that you may be \
             under more stress than usual, and it is okay to need support.\n\nWhat you can do:\n",
        ),
        RiskLabel::Low => text.push_str(
            "You seem to be handling things well right now.\n\nKeep it up by:\n",
        ),
    }
    for line in advice(label) {
        text.push_str("  - ");
        text.push_str(line);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline_uses_name() {
        assert_eq!(
            headline(Some("Ada"), RiskLabel::High),
            "Ada, your result shows a High Mental Health Risk."
        );
        assert!(headline(Some("  "), RiskLabel::Low).starts_with("Hi,"));
        assert!(headline(None, RiskLabel::Low).contains("Low Mental Health Risk"));
    }

    #[test]
    fn test_render_lists_advice() {
        let text = render(None, RiskLabel::High);
        for line in advice(RiskLabel::High) {
            assert!(text.contains(line));
        }
        assert!(!text.contains(LOW_RISK_ADVICE[0]));
    }
}
