//! What the presentation layer can ask the review session to do.

use crate::error::ValidationError;
use crate::scheduling::rating_from_input;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewCommand {
    /// Show the next hidden side of the current card.
    Reveal,
    /// Rate the current card. 0 means "again in a few minutes", n means n days.
    Rate(u32),
    Skip,
    /// Defer (or pull forward) the current card by a number of positions.
    Move(i64),
    AddToDefaultGroup,
    Help,
    Quit,
}

fn parse_step(step: &str) -> Option<i64> {
    let step = step.trim();
    let step = step.strip_prefix('+').unwrap_or(step);
    step.parse::<i64>().ok()
}

impl FromStr for ReviewCommand {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let lower = trimmed.to_ascii_lowercase();

        match lower.as_str() {
            "" => return Ok(ReviewCommand::Reveal),
            "0" | "r" | "retry" | "again" => return Ok(ReviewCommand::Rate(0)),
            "s" | "skip" | "n" | "next" => return Ok(ReviewCommand::Skip),
            "g" | "group" => return Ok(ReviewCommand::AddToDefaultGroup),
            "?" | "h" | "help" => return Ok(ReviewCommand::Help),
            "q" | "quit" | "exit" => return Ok(ReviewCommand::Quit),
            _ => {}
        }

        if lower.chars().all(|c| c.is_ascii_digit()) {
            if lower.trim_start_matches('0').is_empty() {
                return Ok(ReviewCommand::Rate(0));
            }
            return Ok(ReviewCommand::Rate(rating_from_input(&lower)));
        }

        let step = lower
            .strip_prefix("move")
            .or_else(|| lower.strip_prefix('m'))
            .and_then(parse_step);
        match step {
            Some(step) => Ok(ReviewCommand::Move(step)),
            None => Err(ValidationError::UnknownCommand(trimmed.to_string())),
        }
    }
}

pub const HELP: &str = "\
enter      show the next side
0 / r      again in 10 minutes
<n>        due again in n days (1-999)
s          skip to the next card
m <+/-n>   move this card n places later (or earlier)
g          add this card to the default group
q          quit";
