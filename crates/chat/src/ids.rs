use std::fmt;
use std::str::FromStr;

use snafu::ResultExt;
use uuid::Uuid;

use super::error::{ChatError, ChatResult, InvalidIdSnafu};

// Both chat IDs share one shape; only the generator differs.
macro_rules! define_chat_id {
    ($name:ident, $id_type:literal, $generate:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new(raw: Uuid) -> Self {
                Self(raw)
            }

            pub fn generate() -> Self {
                Self($generate)
            }

            pub fn parse(raw: &str) -> ChatResult<Self> {
                let parsed = Uuid::parse_str(raw.trim()).context(InvalidIdSnafu {
                    stage: "parse-chat-id",
                    id_type: $id_type,
                    raw: raw.to_string(),
                })?;
                Ok(Self(parsed))
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = ChatError;

            fn from_str(raw: &str) -> ChatResult<Self> {
                Self::parse(raw)
            }
        }
    };
}

// Time-ordered so ids sort in submission order.
define_chat_id!(MessageId, "message-id", Uuid::now_v7());
// One per process run; scopes answer notifications to this chat.
define_chat_id!(SessionId, "session-id", Uuid::new_v4());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_round_trip_through_display() {
        let first = MessageId::generate();
        let second = MessageId::generate();

        assert_ne!(first, second);
        assert_eq!(MessageId::parse(&first.to_string()).unwrap(), first);
        assert_eq!(second.to_string().parse::<MessageId>().unwrap(), second);
    }

    #[test]
    fn parse_rejects_garbage() {
        let error = SessionId::parse("not-a-session").unwrap_err();
        assert!(matches!(
            error,
            ChatError::InvalidId {
                id_type: "session-id",
                ..
            }
        ));
    }
}
