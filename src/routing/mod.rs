//! Routing policy: canned response or external agent
//!
//! Rules, evaluated in order, first match wins:
//! 1. Agent unavailable -> local, always
//! 2. Message longer than the length threshold -> delegate
//! 3. Message contains a complex-question marker -> delegate
//! 4. Basic intent (greeting/goodbye/thanks) -> delegate only below the confidence bar
//! 5. Message contains a special term -> delegate
//! 6. Otherwise -> delegate
//!
//! Delegation is the default outcome: only confident, short basic-intent
//! messages are answered from the canned responses.

use std::collections::HashSet;
use std::fmt;

use crate::config::ChatbotConfig;
use crate::intents::RoutingTables;

/// Why a message was routed the way it was.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteReason {
    AgentUnavailable,
    LongMessage { chars: usize },
    ComplexQuestion { marker: String },
    LowConfidenceBasic { intent: String, confidence: f32 },
    ConfidentBasic { intent: String, confidence: f32 },
    SpecialTerm { term: String },
    Default,
}

impl fmt::Display for RouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteReason::AgentUnavailable => write!(f, "agent unavailable"),
            RouteReason::LongMessage { chars } => write!(f, "long message ({chars} chars)"),
            RouteReason::ComplexQuestion { marker } => write!(f, "complex question marker '{marker}'"),
            RouteReason::LowConfidenceBasic { intent, confidence } => {
                write!(f, "basic intent '{intent}' below bar ({confidence:.3})")
            }
            RouteReason::ConfidentBasic { intent, confidence } => {
                write!(f, "basic intent '{intent}' confident ({confidence:.3})")
            }
            RouteReason::SpecialTerm { term } => write!(f, "special term '{term}'"),
            RouteReason::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub delegate: bool,
    pub reason: RouteReason,
}

impl RouteDecision {
    fn local(reason: RouteReason) -> Self {
        Self { delegate: false, reason }
    }

    fn delegate(reason: RouteReason) -> Self {
        Self { delegate: true, reason }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    length_threshold: usize,
    basic_confidence_bar: f32,
    basic_intents: HashSet<String>,
    complex_markers: Vec<String>,
    special_terms: Vec<String>,
}

impl RoutingPolicy {
    pub fn new(tables: &RoutingTables, length_threshold: usize, basic_confidence_bar: f32) -> Self {
        Self {
            length_threshold,
            basic_confidence_bar,
            basic_intents: tables.basic_intents.iter().cloned().collect(),
            complex_markers: tables.complex_markers.iter().map(|m| m.to_lowercase()).collect(),
            special_terms: tables.special_terms.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn from_config(tables: &RoutingTables, config: &ChatbotConfig) -> Self {
        Self::new(
            tables,
            config.message_length_threshold,
            config.basic_confidence_threshold,
        )
    }

    pub fn decide(
        &self,
        message: &str,
        intent: &str,
        confidence: f32,
        agent_available: bool,
    ) -> RouteDecision {
        if !agent_available {
            return RouteDecision::local(RouteReason::AgentUnavailable);
        }

        let chars = message.chars().count();
        if chars > self.length_threshold {
            return RouteDecision::delegate(RouteReason::LongMessage { chars });
        }

        let lowered = message.to_lowercase();
        if let Some(marker) = first_match(&lowered, &self.complex_markers) {
            return RouteDecision::delegate(RouteReason::ComplexQuestion { marker });
        }

        if self.basic_intents.contains(intent) {
            let intent = intent.to_string();
            return if confidence < self.basic_confidence_bar {
                RouteDecision::delegate(RouteReason::LowConfidenceBasic { intent, confidence })
            } else {
                RouteDecision::local(RouteReason::ConfidentBasic { intent, confidence })
            };
        }

        if let Some(term) = first_match(&lowered, &self.special_terms) {
            return RouteDecision::delegate(RouteReason::SpecialTerm { term });
        }

        RouteDecision::delegate(RouteReason::Default)
    }

    /// Shorthand for `decide(..).delegate`.
    pub fn should_delegate(
        &self,
        message: &str,
        intent: &str,
        confidence: f32,
        agent_available: bool,
    ) -> bool {
        self.decide(message, intent, confidence, agent_available).delegate
    }

    pub fn length_threshold(&self) -> usize {
        self.length_threshold
    }
}

fn first_match(haystack: &str, needles: &[String]) -> Option<String> {
    needles
        .iter()
        .find(|n| !n.is_empty() && haystack.contains(n.as_str()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intents::Lexicon;

    fn policy() -> RoutingPolicy {
        let lexicon = Lexicon::builtin().unwrap();
        RoutingPolicy::new(&lexicon.routing, 50, 0.95)
    }

    #[test]
    fn test_unavailable_agent_never_delegates() {
        let p = policy();
        let long = "a".repeat(500);
        for (msg, intent, conf) in [
            ("Xin chào", "greeting", 0.99),
            ("Tại sao trời mưa?", "weather", 0.1),
            (long.as_str(), "help", 0.0),
            ("viết code python", "help", 0.5),
        ] {
            let d = p.decide(msg, intent, conf, false);
            assert!(!d.delegate);
            assert_eq!(d.reason, RouteReason::AgentUnavailable);
        }
    }

    #[test]
    fn test_long_message_always_delegates() {
        let p = policy();
        let msg = "chào ".repeat(20);
        assert!(msg.chars().count() > 50);
        let d = p.decide(&msg, "greeting", 1.0, true);
        assert!(d.delegate);
        assert!(matches!(d.reason, RouteReason::LongMessage { .. }));
    }

    #[test]
    fn test_length_is_measured_in_chars() {
        let p = RoutingPolicy::new(&RoutingTables::default(), 5, 0.95);
        // 5 chars, 10+ bytes
        assert!(!matches!(
            p.decide("chào!", "greeting", 0.1, true).reason,
            RouteReason::LongMessage { .. }
        ));
        assert!(matches!(
            p.decide("chào!!", "greeting", 0.1, true).reason,
            RouteReason::LongMessage { chars: 6 }
        ));
    }

    #[test]
    fn test_complex_marker_is_case_insensitive() {
        let p = policy();
        let d = p.decide("TẠI SAO vậy", "greeting", 0.99, true);
        assert!(d.delegate);
        assert_eq!(d.reason, RouteReason::ComplexQuestion { marker: "tại sao".into() });
    }

    #[test]
    fn test_confident_basic_intent_stays_local() {
        let p = policy();
        let d = p.decide("Xin chào", "greeting", 0.97, true);
        assert!(!d.delegate);
        assert!(matches!(d.reason, RouteReason::ConfidentBasic { .. }));
    }

    #[test]
    fn test_unsure_basic_intent_delegates() {
        let p = policy();
        let d = p.decide("Cảm ơn", "thanks", 0.80, true);
        assert!(d.delegate);
        assert!(matches!(d.reason, RouteReason::LowConfidenceBasic { .. }));
    }

    #[test]
    fn test_special_term_and_default() {
        let p = policy();
        let d = p.decide("lập trình", "help", 0.99, true);
        assert_eq!(d.reason, RouteReason::SpecialTerm { term: "lập trình".into() });

        let d = p.decide("Bạn khỏe không", "mood", 0.99, true);
        assert!(d.delegate);
        assert_eq!(d.reason, RouteReason::Default);
    }

    #[test]
    fn test_basic_check_precedes_special_terms() {
        let p = policy();
        // "code" is a special term, but a confident basic intent short-circuits first
        assert!(!p.should_delegate("hi code", "greeting", 0.99, true));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(RouteReason::Default.to_string(), "default");
        assert_eq!(
            RouteReason::LongMessage { chars: 70 }.to_string(),
            "long message (70 chars)"
        );
    }
}
