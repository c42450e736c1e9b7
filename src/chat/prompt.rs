//! Prompt Builder - persona + dashboard + conversation → prompt text.
//!
//! Pure string rendering: no I/O, no shared state. The persona is the
//! assistant's fixed behavioral contract:
//!
//! - answer only e-rickshaw topics, redirect everything else
//! - greet with "Namaste" on the first message of a conversation only
//! - close every reply with the SMV contact line
//! - for critical failures, tell the driver to stop and call SMV urgently
//!
//! # Example Output (abridged)
//!
//! ```text
//! You are the SMV E-rickshaw Assistant, ...
//!
//! DASHBOARD DATA (...):
//! - Battery: 93%
//! - Vehicle: UP32 BZ 5678
//! ...
//! CONVERSATION SO FAR:
//! User: my battery drains fast
//! Assistant: ...
//!
//! USER QUESTION: what about charging?
//! ```

use super::dashboard::{DashboardSnapshot, Place};
use super::session::{Role, Turn};
use crate::config::DEFAULT_SUPPORT_NUMBER;

/// Rendered in place of a missing dashboard value.
pub const MISSING_VALUE: &str = "not available";

/// Opening line for the first reply in a conversation.
pub const GREETING: &str = "Namaste! I am your SMV E-rickshaw assistant.";

/// Words that trigger the safety-escalation rule.
pub const CRITICAL_KEYWORDS: &[&str] = &[
    "smoke",
    "fire",
    "burning",
    "spark",
    "unusual sound",
    "strange noise",
    "battery damage",
    "swollen",
    "swelling",
    "leak",
    "brake fail",
];

/// The assistant's fixed behavioral contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    support_number: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORT_NUMBER)
    }
}

impl Persona {
    pub fn new(support_number: impl Into<String>) -> Self {
        Self {
            support_number: support_number.into(),
        }
    }

    /// Mandatory closing line of every reply.
    pub fn contact_line(&self) -> String {
        format!("For assistance, contact SMV at {}", self.support_number)
    }

    /// Opening line for the first reply of a conversation.
    pub fn greeting(&self) -> &'static str {
        GREETING
    }

    /// Reply used whenever generation fails. Always carries the contact line.
    pub fn fallback_reply(&self, first_message: bool) -> String {
        let body = "I apologize, but I'm experiencing technical difficulties. Please try again.";
        if first_message {
            format!("{} {} {}", GREETING, body, self.contact_line())
        } else {
            format!("{} {}", body, self.contact_line())
        }
    }

    /// Whether `message` mentions a critical-failure keyword.
    pub fn is_critical(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        CRITICAL_KEYWORDS.iter().any(|k| lower.contains(k))
    }

    /// The system turn stored at the head of every session.
    pub fn system_instruction(&self) -> String {
        format!(
            "You are the SMV E-rickshaw Assistant, a professional and helpful AI assistant for e-rickshaw drivers.

CORE PRINCIPLES:
1. Maintain a professional, helpful tone at all times.
2. ONLY answer questions about e-rickshaw operation, maintenance and troubleshooting, battery and charging, vehicle performance and mileage, dashboard information, service schedules, safety, nearby places, and SMV support.
3. For any other question respond ONLY with: \"I am specialized in e-rickshaw support. Please ask me about your e-rickshaw, its maintenance, battery, or dashboard information.\"
4. Provide specific, actionable advice and include safety precautions when discussing technical issues.
5. Use \"{greeting}\" ONLY as the opening of the first reply in a conversation.
6. End EVERY response with: \"{contact}\"
7. SAFETY FIRST: for critical issues (smoke, fire, burning smell, sparks, unusual sounds, battery damage, swelling or leaks) tell the driver to stop the vehicle immediately, switch it off, move away from it, and contact SMV support urgently at {number}.
8. Never use casual expressions or colloquial phrases.",
            greeting = GREETING,
            contact = self.contact_line(),
            number = self.support_number,
        )
    }

    /// Bring a model reply in line with the contract: greeting on the first
    /// message if missing, contact line at the end if missing. Idempotent.
    pub fn enforce_contract(&self, reply: &str, first_message: bool) -> String {
        let mut out = reply.trim().to_string();
        if first_message && !out.to_lowercase().starts_with("namaste") {
            out = format!("{} {}", GREETING, out);
        }
        let contact = self.contact_line();
        if !out.contains(&contact) {
            out = format!("{}\n\n{}", out, contact);
        }
        out
    }
}

/// Render the full prompt for one turn.
///
/// `conversation` is the session's turns so far (system turns are skipped;
/// the persona section already covers them). Missing dashboard values render
/// as [`MISSING_VALUE`]; this function cannot fail.
pub fn build_prompt(
    persona: &Persona,
    dashboard: &DashboardSnapshot,
    conversation: &[Turn],
    user_message: &str,
    first_message: bool,
) -> String {
    let mut sections = Vec::with_capacity(6);

    sections.push(persona.system_instruction());
    sections.push(render_dashboard(dashboard));
    sections.push(render_nearby(dashboard));

    let mut guidance = String::from(
        "RESPONSE GUIDELINES:
- For greetings: respond professionally without listing dashboard data.
- For battery issues: give specific troubleshooting steps first; mention the battery level only when relevant.
- For maintenance issues: give specific advice first; mention service dates only when relevant.
- For location questions: use the nearby places above.",
    );
    guidance.push_str(&format!(
        "\n- This is {} message in the conversation.",
        if first_message {
            "the FIRST"
        } else {
            "NOT the first"
        }
    ));
    if persona.is_critical(user_message) {
        guidance.push_str(
            "\n- The driver describes a CRITICAL issue: apply the SAFETY FIRST rule before anything else.",
        );
    }
    sections.push(guidance);

    let history = render_history(conversation);
    if !history.is_empty() {
        sections.push(format!("CONVERSATION SO FAR:\n{}", history));
    }

    sections.push(format!("USER QUESTION: {}", user_message.trim()));
    sections.join("\n\n")
}

fn value(field: &Option<String>) -> &str {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(MISSING_VALUE)
}

fn render_dashboard(d: &DashboardSnapshot) -> String {
    let battery = match value(&d.battery_percentage) {
        MISSING_VALUE => MISSING_VALUE.to_string(),
        v => format!("{}%", v.trim_end_matches('%')),
    };
    format!(
        "DASHBOARD DATA (mention only when directly relevant to the question):
- Battery: {}
- Vehicle: {}
- Last Service: {}
- Next Service: {}
- Driver Rating: {}
- Location: {}",
        battery,
        value(&d.vehicle_number),
        value(&d.last_service),
        value(&d.next_service),
        value(&d.driver_rating),
        value(&d.location),
    )
}

fn render_places(places: &[Place]) -> String {
    if places.is_empty() {
        return "none recorded".to_string();
    }
    places
        .iter()
        .map(|p| format!("{} ({})", p.name, p.distance))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_nearby(d: &DashboardSnapshot) -> String {
    format!(
        "NEARBY PLACES (only for location-related questions):
- Schools: {}
- Bus Stations: {}
- Malls: {}",
        render_places(&d.nearby.schools),
        render_places(&d.nearby.bus_stations),
        render_places(&d.nearby.malls),
    )
}

fn render_history(conversation: &[Turn]) -> String {
    conversation
        .iter()
        .filter(|t| t.role != Role::System)
        .map(|t| format!("{}: {}", t.role.label(), t.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_every_dashboard_value() {
        let persona = Persona::default();
        let prompt = build_prompt(&persona, &DashboardSnapshot::demo(), &[], "hi", true);
        for expected in [
            "Battery: 93%",
            "Vehicle: UP32 BZ 5678",
            "Last Service: 10 June 2024",
            "Next Service: 10 December 2024",
            "Driver Rating: 4.5",
            "Location: Lucknow, Uttar Pradesh",
            "APS Academy (1.1 km)",
            "Charbagh Bus Station (3.5 km)",
            "Phoenix Palassio (4.2 km)",
        ] {
            assert!(prompt.contains(expected), "missing {:?}", expected);
        }
        assert!(prompt.ends_with("USER QUESTION: hi"));
        assert!(prompt.contains("the FIRST message"));
    }

    #[test]
    fn test_missing_fields_use_placeholder() {
        let dashboard = DashboardSnapshot {
            battery_percentage: Some("40".into()),
            ..Default::default()
        };
        let prompt = build_prompt(&Persona::default(), &dashboard, &[], "battery?", false);
        assert!(prompt.contains("Battery: 40%"));
        assert!(prompt.contains("Vehicle: not available"));
        assert!(prompt.contains("Schools: none recorded"));
        assert!(prompt.contains("NOT the first message"));
    }

    #[test]
    fn test_prompt_is_deterministic_and_contains_contract() {
        let persona = Persona::new("1800-111-2222");
        let a = build_prompt(&persona, &DashboardSnapshot::demo(), &[], "hi", true);
        let b = build_prompt(&persona, &DashboardSnapshot::demo(), &[], "hi", true);
        assert_eq!(a, b);
        assert!(a.contains("For assistance, contact SMV at 1800-111-2222"));
        assert!(a.contains("ONLY answer questions about e-rickshaw"));
        assert!(a.contains("stop the vehicle immediately"));
    }

    #[test]
    fn test_history_flattened_without_system_turn() {
        let persona = Persona::default();
        let turns = vec![
            Turn::new(Role::System, persona.system_instruction()),
            Turn::new(Role::User, "my battery drains fast"),
            Turn::new(Role::Assistant, "Check the charger."),
        ];
        let prompt = build_prompt(&persona, &DashboardSnapshot::demo(), &turns, "and now?", false);
        assert!(prompt.contains(
            "CONVERSATION SO FAR:\nUser: my battery drains fast\nAssistant: Check the charger."
        ));
        assert_eq!(prompt.matches("CORE PRINCIPLES").count(), 1);
    }

    #[test]
    fn test_critical_keyword_adds_safety_note() {
        let persona = Persona::default();
        assert!(persona.is_critical("There is SMOKE coming from the battery"));
        assert!(!persona.is_critical("when is my next service"));
        let prompt = build_prompt(
            &persona,
            &DashboardSnapshot::demo(),
            &[],
            "I see smoke near the motor",
            false,
        );
        assert!(prompt.contains("CRITICAL issue"));
    }

    #[test]
    fn test_enforce_contract_first_message() {
        let persona = Persona::default();
        let out = persona.enforce_contract("How can I help you today?", true);
        assert!(out.starts_with(GREETING));
        assert!(out.ends_with(&persona.contact_line()));
        assert_eq!(persona.enforce_contract(&out, true), out);
    }

    #[test]
    fn test_enforce_contract_later_message() {
        let persona = Persona::default();
        let reply = format!("Check the fuse. {}", persona.contact_line());
        let out = persona.enforce_contract(&reply, false);
        assert_eq!(out, reply);
        assert!(!out.starts_with("Namaste"));
    }

    #[test]
    fn test_fallback_carries_contact_line() {
        let persona = Persona::default();
        assert!(persona.fallback_reply(true).starts_with(GREETING));
        assert!(persona.fallback_reply(false).ends_with(&persona.contact_line()));
    }
}
