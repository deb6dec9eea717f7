//! Domain model for anonymous gift-exchange draws.
//!
//! An [`Event`] owns its participants keyed by capability [`Token`]. The only
//! ways to read participant data back out are [`Event::manage_view`] (the
//! organizer roster, never carrying assignments) and [`Event::resolve_view`]
//! (one participant's own view, keyed by their token).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

pub mod assign;
pub mod token;

pub use assign::run_draw;
pub use token::{new_token, try_new_token, Token};

pub type EventId = Token;

pub const MAX_ACTIVE_EVENTS: usize = 1000;
pub const MIN_PARTICIPANTS: usize = 3;
pub const MAX_PARTICIPANTS: usize = 50;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_WISH_LENGTH: usize = 500;
/// Events are swept this long after creation, drawn or not.
pub const RETENTION: Duration = Duration::days(30);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) wish: String,
    /// Token of the participant this one gifts. Set by the draw.
    #[serde(default)]
    pub(crate) gift_for: Option<Token>,
    pub(crate) submitted: bool,
}

impl Participant {
    fn new(name: String, wish: String) -> Self {
        Self {
            name,
            wish,
            gift_for: None,
            submitted: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub(crate) name: String,
    pub(crate) expected_participants: Option<usize>,
    pub(crate) participants: HashMap<Token, Participant>,
    pub(crate) draw_done: bool,
    pub(crate) created_at: OffsetDateTime,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },
    #[error("{field} is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },
    #[error("expected participants must be between 3 and 50, got {0}")]
    ExpectedOutOfRange(usize),
    #[error("not found")]
    NotFound,
    #[error("server is at capacity, please try again later")]
    StoreFull,
    #[error("draw is full - maximum participants reached")]
    EventFull,
    #[error("draw already done")]
    AlreadyDrawn,
    #[error("need at least 3 participants, have {0}")]
    InsufficientParticipants(usize),
}

impl DrawError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DrawError::EmptyField { .. } | DrawError::TooLong { .. } | DrawError::ExpectedOutOfRange(_)
        )
    }

    pub fn is_capacity(&self) -> bool {
        matches!(self, DrawError::StoreFull | DrawError::EventFull)
    }
}

/// Organizer-facing roster entry. Carries neither tokens nor assignments.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub wish: String,
    pub submitted: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManageView {
    pub name: String,
    pub expected_participants: Option<usize>,
    pub participant_count: usize,
    pub participants: Vec<RosterEntry>,
    pub all_submitted: bool,
    pub expected_reached: bool,
    pub draw_done: bool,
    pub can_draw: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParticipantView {
    pub self_name: String,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_wish: Option<String>,
}

/// Trims `input` and checks it is non-empty and at most `MAX_NAME_LENGTH`
/// characters.
pub fn validate_name(input: &str, field: &'static str) -> Result<String, DrawError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DrawError::EmptyField { field });
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(DrawError::TooLong {
            field,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(trimmed.to_string())
}

pub fn validate_wish(input: &str) -> Result<String, DrawError> {
    let trimmed = input.trim();
    if trimmed.chars().count() > MAX_WISH_LENGTH {
        return Err(DrawError::TooLong {
            field: "wish",
            max: MAX_WISH_LENGTH,
        });
    }
    Ok(trimmed.to_string())
}

pub fn validate_expected(expected: Option<usize>) -> Result<Option<usize>, DrawError> {
    match expected {
        Some(k) if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&k) => {
            Err(DrawError::ExpectedOutOfRange(k))
        }
        other => Ok(other),
    }
}

impl Event {
    /// Builds a new event with the organizer as its first participant and
    /// returns it together with the organizer's token.
    pub fn new(
        name: &str,
        organizer_name: &str,
        organizer_wish: &str,
        expected_participants: Option<usize>,
        created_at: OffsetDateTime,
    ) -> Result<(Self, Token), DrawError> {
        let name = validate_name(name, "draw name")?;
        let organizer_name = validate_name(organizer_name, "organizer name")?;
        let organizer_wish = validate_wish(organizer_wish)?;
        let expected_participants = validate_expected(expected_participants)?;

        let organizer_token = new_token();
        let mut participants = HashMap::new();
        participants.insert(
            organizer_token.clone(),
            Participant::new(organizer_name, organizer_wish),
        );

        let event = Self {
            name,
            expected_participants,
            participants,
            draw_done: false,
            created_at,
        };
        Ok((event, organizer_token))
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn draw_done(&self) -> bool {
        self.draw_done
    }

    pub fn is_full(&self) -> bool {
        self.expected_participants
            .is_some_and(|expected| self.participants.len() >= expected)
    }

    /// The expected head count is in, or, without a cap, there are enough
    /// people for a draw.
    pub fn expected_reached(&self) -> bool {
        match self.expected_participants {
            Some(_) => self.is_full(),
            None => self.participants.len() >= MIN_PARTICIPANTS,
        }
    }

    /// Adds a participant and returns their token. The token is the
    /// participant's only credential.
    pub fn join(&mut self, name: &str, wish: &str) -> Result<Token, DrawError> {
        if self.draw_done {
            return Err(DrawError::AlreadyDrawn);
        }
        if self.is_full() {
            return Err(DrawError::EventFull);
        }
        let name = validate_name(name, "name")?;
        let wish = validate_wish(wish)?;

        let token = self.fresh_token();
        self.participants
            .insert(token.clone(), Participant::new(name, wish));
        Ok(token)
    }

    fn fresh_token(&self) -> Token {
        loop {
            let token = new_token();
            if !self.participants.contains_key(&token) {
                return token;
            }
        }
    }

    pub fn manage_view(&self) -> ManageView {
        let mut participants: Vec<RosterEntry> = self
            .participants
            .values()
            .map(|p| RosterEntry {
                name: p.name.clone(),
                wish: p.wish.clone(),
                submitted: p.submitted,
            })
            .collect();
        participants.sort_by(|a, b| a.name.cmp(&b.name));

        let all_submitted = self.participants.values().all(|p| p.submitted);
        let expected_reached = self.expected_reached();
        let can_draw = all_submitted
            && expected_reached
            && !self.draw_done
            && self.participants.len() >= MIN_PARTICIPANTS;

        ManageView {
            name: self.name.clone(),
            expected_participants: self.expected_participants,
            participant_count: self.participants.len(),
            participants,
            all_submitted,
            expected_reached,
            draw_done: self.draw_done,
            can_draw,
        }
    }

    /// Resolves what the holder of `token` is allowed to see.
    pub fn resolve_view(&self, token: &str) -> Result<ParticipantView, DrawError> {
        let me = self.participants.get(token).ok_or(DrawError::NotFound)?;
        if !self.draw_done {
            return Ok(ParticipantView {
                self_name: me.name.clone(),
                ready: false,
                recipient_name: None,
                recipient_wish: None,
            });
        }

        let recipient = me
            .gift_for
            .as_ref()
            .and_then(|t| self.participants.get(t))
            .ok_or(DrawError::NotFound)?;
        Ok(ParticipantView {
            self_name: me.name.clone(),
            ready: true,
            recipient_name: Some(recipient.name.clone()),
            recipient_wish: Some(recipient.wish.clone()),
        })
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.created_at < now - RETENTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office_party() -> (Event, Token) {
        Event::new(
            "Office Party",
            "Alice",
            "socks",
            Some(3),
            OffsetDateTime::now_utc(),
        )
        .unwrap()
    }

    #[test]
    fn new_event_holds_only_the_organizer() {
        let (event, organizer) = office_party();
        assert_eq!(event.participant_count(), 1);
        assert!(!event.draw_done());
        let view = event.resolve_view(&organizer).unwrap();
        assert_eq!(view.self_name, "Alice");
        assert!(!view.ready);
        assert_eq!(view.recipient_name, None);
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  Bob \t", "name").unwrap(), "Bob");
        assert_eq!(
            validate_name("   ", "name").unwrap_err(),
            DrawError::EmptyField { field: "name" }
        );
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(
            validate_name(&long, "name").unwrap_err(),
            DrawError::TooLong {
                field: "name",
                max: MAX_NAME_LENGTH
            }
        );
        // limits count characters, not bytes
        let accented = "é".repeat(MAX_NAME_LENGTH);
        assert!(validate_name(&accented, "name").is_ok());
    }

    #[test]
    fn wish_is_optional_but_bounded() {
        assert_eq!(validate_wish("").unwrap(), "");
        assert!(validate_wish(&"w".repeat(MAX_WISH_LENGTH)).is_ok());
        assert!(validate_wish(&"w".repeat(MAX_WISH_LENGTH + 1))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn expected_participants_must_be_in_range() {
        assert_eq!(validate_expected(None).unwrap(), None);
        assert_eq!(validate_expected(Some(3)).unwrap(), Some(3));
        assert_eq!(validate_expected(Some(50)).unwrap(), Some(50));
        assert_eq!(
            validate_expected(Some(2)).unwrap_err(),
            DrawError::ExpectedOutOfRange(2)
        );
        assert_eq!(
            validate_expected(Some(51)).unwrap_err(),
            DrawError::ExpectedOutOfRange(51)
        );
    }

    #[test]
    fn join_rejects_beyond_expected_count() {
        let (mut event, _) = Event::new(
            "Book club",
            "Ann",
            "",
            Some(4),
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        for name in ["Ben", "Cid", "Dee"] {
            event.join(name, "").unwrap();
        }
        assert_eq!(event.participant_count(), 4);
        let err = event.join("Eve", "").unwrap_err();
        assert_eq!(err, DrawError::EventFull);
        assert!(err.is_capacity());
        assert_eq!(event.participant_count(), 4);
    }

    #[test]
    fn join_without_cap_is_unbounded_by_expected() {
        let (mut event, _) =
            Event::new("Open", "Ann", "", None, OffsetDateTime::now_utc()).unwrap();
        for i in 0..10 {
            event.join(&format!("guest {i}"), "").unwrap();
        }
        assert_eq!(event.participant_count(), 11);
        assert!(event.manage_view().expected_reached);
    }

    #[test]
    fn uncapped_event_is_ready_once_a_draw_is_possible() {
        let (mut event, _) =
            Event::new("Open", "Ann", "", None, OffsetDateTime::now_utc()).unwrap();
        event.join("Ben", "").unwrap();
        let view = event.manage_view();
        assert!(!view.expected_reached);
        assert!(!view.can_draw);

        for name in ["Cid", "Dee", "Eve"] {
            event.join(name, "").unwrap();
        }
        let view = event.manage_view();
        assert!(view.expected_reached);
        assert!(view.can_draw);

        let mut rng = rand::thread_rng();
        assert_eq!(run_draw(&mut event, &mut rng), Ok(()));
        assert!(!event.manage_view().can_draw);
    }

    #[test]
    fn can_draw_agrees_with_run_draw() {
        for expected in [None, Some(3), Some(5)] {
            for joined in 0..5 {
                let (mut event, _) =
                    Event::new("Party", "Ann", "", expected, OffsetDateTime::now_utc()).unwrap();
                for i in 0..joined {
                    let _ = event.join(&format!("guest {i}"), "");
                }
                let can_draw = event.manage_view().can_draw;
                let mut rng = rand::thread_rng();
                let drew = run_draw(&mut event, &mut rng).is_ok();
                if can_draw {
                    assert!(drew, "expected={expected:?} joined={joined}");
                }
            }
        }
    }

    #[test]
    fn join_validates_input_before_inserting() {
        let (mut event, _) = office_party();
        assert!(event.join("  ", "").unwrap_err().is_validation());
        assert!(event
            .join("Bob", &"w".repeat(MAX_WISH_LENGTH + 1))
            .unwrap_err()
            .is_validation());
        assert_eq!(event.participant_count(), 1);
    }

    #[test]
    fn manage_view_reports_readiness_without_secrets() {
        let (mut event, organizer) = office_party();
        let view = event.manage_view();
        assert!(view.all_submitted);
        assert!(!view.expected_reached);
        assert!(!view.can_draw);

        let bob = event.join("Bob", "").unwrap();
        event.join("Carol", "books").unwrap();
        let view = event.manage_view();
        assert!(view.expected_reached);
        assert!(view.can_draw);
        assert_eq!(view.participant_count, 3);
        let names: Vec<&str> = view.participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);

        let rendered = format!("{view:?}");
        assert!(!rendered.contains(&organizer));
        assert!(!rendered.contains(&bob));
    }

    #[test]
    fn unknown_token_is_not_found() {
        let (event, _) = office_party();
        assert_eq!(
            event.resolve_view("00000000000000000000000000000000"),
            Err(DrawError::NotFound)
        );
    }

    #[test]
    fn expiry_is_relative_to_creation() {
        let now = OffsetDateTime::now_utc();
        let (old, _) =
            Event::new("Old", "Ann", "", Some(3), now - Duration::days(31)).unwrap();
        let (recent, _) =
            Event::new("Recent", "Ann", "", Some(3), now - Duration::days(29)).unwrap();
        assert!(old.is_expired(now));
        assert!(!recent.is_expired(now));
    }
}
