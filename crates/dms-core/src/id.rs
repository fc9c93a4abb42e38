// ── Composite identifiers ──
//
// Elements and services are addressed by `(agent id, local id)`. Both
// parts are either -1 together (unset) or both >= 1. The text form is
// `"<agentId>/<localId>"` in both directions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DmsError;

const UNSET: i32 = -1;

fn check_pair(agent_id: i32, local_id: i32, local_name: &str) -> Result<(), DmsError> {
    if agent_id == UNSET && local_id == UNSET {
        return Ok(());
    }
    if agent_id < 1 {
        return Err(DmsError::out_of_range(
            "agentId",
            format!("{agent_id} is not a valid agent id (expected -1 together with {local_name} -1, or >= 1)"),
        ));
    }
    if local_id < 1 {
        return Err(DmsError::out_of_range(
            local_name,
            format!("{local_id} is not a valid {local_name} (expected >= 1)"),
        ));
    }
    Ok(())
}

fn parse_pair(s: &str, what: &str) -> Result<(i32, i32), DmsError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(DmsError::invalid(what, "value must not be empty"));
    }

    let mut parts = trimmed.split('/');
    let (Some(agent), Some(local), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DmsError::invalid(
            what,
            format!("'{trimmed}' is not of the form <agentId>/<id>"),
        ));
    };

    let parse = |part: &str| {
        part.trim().parse::<i32>().map_err(|_| {
            DmsError::invalid(what, format!("'{part}' in '{trimmed}' is not an integer"))
        })
    };
    Ok((parse(agent)?, parse(local)?))
}

macro_rules! composite_id {
    ($(#[$meta:meta])* $name:ident, $local:ident, $local_wire:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name {
            agent_id: i32,
            $local: i32,
        }

        impl $name {
            /// Build an id from its two parts, enforcing the pairing rule.
            pub fn new(agent_id: i32, $local: i32) -> Result<Self, DmsError> {
                check_pair(agent_id, $local, $local_wire)?;
                Ok(Self { agent_id, $local })
            }

            /// The unset id, `-1/-1`.
            pub const fn unset() -> Self {
                Self {
                    agent_id: UNSET,
                    $local: UNSET,
                }
            }

            pub fn agent_id(&self) -> i32 {
                self.agent_id
            }

            pub fn $local(&self) -> i32 {
                self.$local
            }

            pub fn is_unset(&self) -> bool {
                self.agent_id == UNSET
            }

            /// Text form, `"<agentId>/<id>"`.
            pub fn value(&self) -> String {
                self.to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}/{}", self.agent_id, self.$local)
            }
        }

        impl FromStr for $name {
            type Err = DmsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (agent_id, $local) = parse_pair(s, stringify!($name))?;
                Self::new(agent_id, $local)
            }
        }

        impl TryFrom<String> for $name {
            type Error = DmsError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }
    };
}

composite_id!(
    /// Identifier of an element: `(agent id, element id)`.
    DmsElementId,
    element_id,
    "elementId"
);

composite_id!(
    /// Identifier of a service: `(agent id, service id)`.
    DmsServiceId,
    service_id,
    "serviceId"
);

impl From<DmsElementId> for dms_api::messages::ElementKey {
    fn from(id: DmsElementId) -> Self {
        Self {
            agent_id: id.agent_id,
            element_id: id.element_id,
        }
    }
}

impl TryFrom<dms_api::messages::ElementKey> for DmsElementId {
    type Error = DmsError;

    fn try_from(key: dms_api::messages::ElementKey) -> Result<Self, Self::Error> {
        Self::new(key.agent_id, key.element_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_agent_and_element() {
        let id: DmsElementId = "400/201".parse().unwrap();
        assert_eq!(id.agent_id(), 400);
        assert_eq!(id.element_id(), 201);
        assert_eq!(id.value(), "400/201");
    }

    #[test]
    fn display_round_trips() {
        for (agent, local) in [(1, 1), (400, 201), (i32::MAX, 7), (-1, -1)] {
            let id = DmsServiceId::new(agent, local).unwrap();
            let parsed: DmsServiceId = id.to_string().parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn half_unset_is_rejected() {
        assert!(DmsElementId::new(-1, 5).is_err());
        assert!(DmsElementId::new(5, -1).is_err());
        assert!(DmsElementId::new(-1, -1).unwrap().is_unset());
    }

    #[test]
    fn values_below_minus_one_are_rejected() {
        assert!(DmsElementId::new(-2, 5).is_err());
        assert!(DmsElementId::new(5, -7).is_err());
        assert!(DmsElementId::new(0, 0).is_err());
        assert!(DmsServiceId::new(3, 0).is_err());
    }

    #[test]
    fn malformed_text_is_rejected() {
        for text in ["", "   ", "400", "400/", "/201", "400/201/3", "a/201", "400/2.5"] {
            assert!(
                text.parse::<DmsElementId>().is_err(),
                "'{text}' should not parse"
            );
        }
    }

    #[test]
    fn ordering_is_agent_then_local() {
        let a = DmsElementId::new(1, 900).unwrap();
        let b = DmsElementId::new(2, 1).unwrap();
        let c = DmsElementId::new(2, 5).unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn converts_into_text() {
        let id = DmsElementId::new(400, 201).unwrap();
        assert_eq!(String::from(id), "400/201");
        assert_eq!(DmsElementId::try_from("400/201".to_string()).unwrap(), id);
    }
}
