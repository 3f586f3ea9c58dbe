//! Chat event routing
//!
//! Turns one `ChatEvent` into a `ChatCommand` and applies it to the match.

use tracing::{debug, warn};

use crate::ws::protocol::{ChatEvent, Outcome};

use super::commands::{command_body, COMMAND_SIGIL};
use super::error::GameError;
use super::r#match::ParkourMatch;

/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `!parkour`
    StartGame,
    /// `!1`..`!N`, 1-based catalogue position
    SelectMap(usize),
    /// `!ben`
    Join,
    /// `!go`
    ManualStart,
    /// `!stop`
    StopGame,
    /// `!end`
    ForceEnd,
    /// Anything else with the sigil, handed to the command translator
    Movement(String),
}

impl ChatCommand {
    /// `None` when the text does not start with the sigil
    pub fn parse(raw: &str) -> Option<Self> {
        let body = command_body(raw)?;
        let command = match body.as_str() {
            "parkour" => Self::StartGame,
            "ben" => Self::Join,
            "go" => Self::ManualStart,
            "stop" => Self::StopGame,
            "end" => Self::ForceEnd,
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                match digits.parse::<usize>() {
                    Ok(n) if n > 0 => Self::SelectMap(n),
                    _ => Self::Movement(format!("{COMMAND_SIGIL}{body}")),
                }
            }
            _ => Self::Movement(format!("{COMMAND_SIGIL}{body}")),
        };
        Some(command)
    }

    /// Match-control commands gated behind moderator rights
    pub fn requires_privilege(&self) -> bool {
        matches!(
            self,
            Self::StartGame
                | Self::SelectMap(_)
                | Self::ManualStart
                | Self::StopGame
                | Self::ForceEnd
        )
    }
}

/// Apply one chat event. Returns the outcome of top-level commands; movement
/// and non-command chatter return `None`.
pub fn dispatch(
    game: &mut ParkourMatch,
    event: &ChatEvent,
    now_ms: u64,
    restrict_control: bool,
) -> Option<Outcome> {
    let command = ChatCommand::parse(&event.command)?;

    if restrict_control && command.requires_privilege() && !event.user_type.can_control() {
        warn!(
            user_id = %event.user_id,
            tier = ?event.user_type,
            command = ?command,
            "Privileged command rejected"
        );
        return Some(Outcome::fail(GameError::NotPrivileged.to_string()));
    }

    let outcome = match command {
        ChatCommand::StartGame => game.start_game(),
        ChatCommand::SelectMap(n) => match game.map_id_for_token(n) {
            Some(map_id) => game.select_map(map_id),
            None => Outcome::fail(GameError::UnknownMapToken(n).to_string()),
        },
        ChatCommand::Join => {
            game.join_game(&*event.user_id, &*event.username, event.user_type, now_ms)
        }
        ChatCommand::ManualStart => game.manual_start(now_ms),
        ChatCommand::StopGame => game.stop_game(now_ms),
        ChatCommand::ForceEnd => game.force_end_game(now_ms),
        ChatCommand::Movement(raw) => {
            let applied = game.apply_movement(&event.user_id, &raw, now_ms);
            debug!(user_id = %event.user_id, command = %raw, applied, "Movement");
            return None;
        }
    };

    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::maps;
    use crate::game::r#match::{MatchPhase, MatchSettings};
    use crate::ws::protocol::UserTier;
    use chrono::Utc;

    fn chat(command: &str, user_id: &str, tier: UserTier) -> ChatEvent {
        ChatEvent {
            command: command.to_string(),
            args: Vec::new(),
            user_id: user_id.to_string(),
            username: format!("user-{user_id}"),
            user_type: tier,
            timestamp: Utc::now(),
        }
    }

    fn game() -> ParkourMatch {
        ParkourMatch::new(MatchSettings::default(), maps::catalogue())
    }

    #[test]
    fn parses_control_tokens_case_insensitively() {
        assert_eq!(ChatCommand::parse("!Parkour"), Some(ChatCommand::StartGame));
        assert_eq!(ChatCommand::parse(" !BEN "), Some(ChatCommand::Join));
        assert_eq!(ChatCommand::parse("!go"), Some(ChatCommand::ManualStart));
        assert_eq!(ChatCommand::parse("!stop"), Some(ChatCommand::StopGame));
        assert_eq!(ChatCommand::parse("!end"), Some(ChatCommand::ForceEnd));
        assert_eq!(ChatCommand::parse("!2"), Some(ChatCommand::SelectMap(2)));
    }

    #[test]
    fn everything_else_is_movement() {
        assert_eq!(
            ChatCommand::parse("!WD"),
            Some(ChatCommand::Movement("!wd".to_string()))
        );
        assert_eq!(
            ChatCommand::parse("!0"),
            Some(ChatCommand::Movement("!0".to_string()))
        );
        assert_eq!(ChatCommand::parse("hello"), None);
        assert_eq!(ChatCommand::parse("!"), None);
    }

    #[test]
    fn viewers_cannot_control_when_restricted() {
        let mut g = game();
        let outcome = dispatch(&mut g, &chat("!parkour", "v", UserTier::Viewer), 0, true);
        assert_eq!(outcome, Some(Outcome::fail("Only moderators can do that")));
        assert_eq!(g.phase(), MatchPhase::Idle);

        let outcome = dispatch(&mut g, &chat("!parkour", "v", UserTier::Viewer), 0, false);
        assert!(outcome.is_some_and(|o| o.success));
        assert_eq!(g.phase(), MatchPhase::MapSelection);
    }

    #[test]
    fn full_chat_flow_reaches_running() {
        let mut g = game();
        let m = UserTier::Moderator;
        assert!(dispatch(&mut g, &chat("!parkour", "mod", m), 0, true).unwrap().success);
        assert!(dispatch(&mut g, &chat("!3", "mod", m), 0, true).unwrap().success);
        assert_eq!(g.selected_map().map(|map| map.id), Some(3));

        for id in ["a", "b"] {
            let joined = dispatch(&mut g, &chat("!ben", id, UserTier::Viewer), 10, true);
            assert!(joined.unwrap().success);
        }
        assert!(dispatch(&mut g, &chat("!go", "mod", m), 20, true).unwrap().success);
        assert_eq!(g.phase(), MatchPhase::Running);

        let moved = dispatch(&mut g, &chat("!d", "a", UserTier::Viewer), 30, true);
        assert_eq!(moved, None);
        assert!(g
            .player("a")
            .unwrap()
            .input
            .is_held(crate::game::player::InputFlag::Right));
    }

    #[test]
    fn out_of_range_map_token_is_rejected() {
        let mut g = game();
        g.start_game();
        let outcome = dispatch(&mut g, &chat("!9", "mod", UserTier::Broadcaster), 0, true);
        assert_eq!(outcome, Some(Outcome::fail("No map for !9")));
        assert_eq!(g.phase(), MatchPhase::MapSelection);
    }

    #[test]
    fn huge_map_token_is_reported_verbatim() {
        let mut g = game();
        g.start_game();
        let outcome = dispatch(
            &mut g,
            &chat("!99999999999", "mod", UserTier::Broadcaster),
            0,
            true,
        );
        assert_eq!(outcome, Some(Outcome::fail("No map for !99999999999")));
        assert_eq!(g.phase(), MatchPhase::MapSelection);
        assert!(g.selected_map().is_none());
    }

    #[test]
    fn join_is_open_to_every_tier() {
        let mut g = game();
        g.start_game();
        g.select_map(1);
        let outcome = dispatch(&mut g, &chat("!ben", "s", UserTier::Subscriber), 5, true);
        assert!(outcome.unwrap().success);
        assert_eq!(g.player("s").map(|p| p.tier), Some(UserTier::Subscriber));
    }

    #[test]
    fn movement_from_strangers_is_silent() {
        let mut g = game();
        assert_eq!(dispatch(&mut g, &chat("!w", "nobody", UserTier::Viewer), 0, true), None);
    }
}
