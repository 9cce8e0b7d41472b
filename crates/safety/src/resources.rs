use serde::Serialize;

/// Shown before any listed resource.
pub const EMERGENCY_GUIDANCE: &str =
    "If you are in immediate danger, call 911 or go to your nearest emergency room.";

/// A crisis line an escalation notifier can surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrisisResource {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'static str>,
}

impl CrisisResource {
    /// One display line, e.g. `988 Suicide & Crisis Lifeline: call 988, text 988`.
    pub fn summary(&self) -> String {
        let contact = match (self.phone, self.text) {
            (Some(phone), Some(text)) => format!("call {phone}, {}", lower_first(text)),
            (Some(phone), None) => format!("call {phone}"),
            (None, Some(text)) => lower_first(text),
            (None, None) => self.description.to_owned(),
        };
        format!("{}: {contact}", self.name)
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// US crisis resources, most general first.
pub fn crisis_resources() -> &'static [CrisisResource] {
    const RESOURCES: &[CrisisResource] = &[
        CrisisResource {
            name: "988 Suicide & Crisis Lifeline",
            description: "24/7 free and confidential support",
            phone: Some("988"),
            text: Some("Text 988"),
        },
        CrisisResource {
            name: "Crisis Text Line",
            description: "Text support for any crisis",
            phone: None,
            text: Some("Text HOME to 741741"),
        },
        CrisisResource {
            name: "SAMHSA National Helpline",
            description: "Treatment referral and information",
            phone: Some("1-800-662-4357"),
            text: None,
        },
        CrisisResource {
            name: "Veterans Crisis Line",
            description: "Support for veterans and their families",
            phone: Some("988 (Press 1)"),
            text: Some("Text 838255"),
        },
        CrisisResource {
            name: "The Trevor Project",
            description: "LGBTQ+ youth crisis support",
            phone: Some("1-866-488-7386"),
            text: Some("Text START to 678678"),
        },
    ];
    RESOURCES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifeline_is_listed_first() {
        let first = &crisis_resources()[0];
        assert_eq!(first.phone, Some("988"));
        assert_eq!(first.summary(), "988 Suicide & Crisis Lifeline: call 988, text 988");
    }

    #[test]
    fn text_only_resource_summary() {
        let ctl = &crisis_resources()[1];
        assert_eq!(ctl.summary(), "Crisis Text Line: text HOME to 741741");
    }

    #[test]
    fn serializes_without_missing_channels() {
        let json = serde_json::to_value(&crisis_resources()[2]).unwrap();
        assert!(json.get("text").is_none());
        assert_eq!(json["phone"], "1-800-662-4357");
    }
}
