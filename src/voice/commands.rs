use crate::{
    playback::{PlaybackController, ReaderError},
    speech::RATE_STEP,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    Restart,
    Start,
    Pause,
    Resume,
    IncreaseSpeed,
    DecreaseSpeed,
}

/// Trigger phrases in priority order; the first row with a phrase contained in
/// the utterance wins. "restart" has to come before "start".
pub const COMMAND_TABLE: &[(&[&str], VoiceCommand)] = &[
    (&["restart"], VoiceCommand::Restart),
    (&["start"], VoiceCommand::Start),
    (&["pause", "stop"], VoiceCommand::Pause),
    (&["resume"], VoiceCommand::Resume),
    (&["increase speed"], VoiceCommand::IncreaseSpeed),
    (&["decrease speed"], VoiceCommand::DecreaseSpeed),
];

pub fn parse_command(phrase: &str) -> Option<VoiceCommand> {
    let phrase = phrase.to_lowercase();
    COMMAND_TABLE
        .iter()
        .find(|(triggers, _)| triggers.iter().any(|trigger| phrase.contains(trigger)))
        .map(|(_, command)| *command)
}

impl VoiceCommand {
    /// Runs the command against `controller`.
    pub fn apply(self, controller: &PlaybackController) -> Result<(), ReaderError> {
        match self {
            VoiceCommand::Restart => controller.restart(),
            VoiceCommand::Start | VoiceCommand::Resume => controller.start(),
            VoiceCommand::Pause => controller.stop(),
            VoiceCommand::IncreaseSpeed => {
                controller.adjust_rate(RATE_STEP as i32);
                Ok(())
            }
            VoiceCommand::DecreaseSpeed => {
                controller.adjust_rate(-(RATE_STEP as i32));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_wins_over_start() {
        assert_eq!(
            parse_command("please restart reading"),
            Some(VoiceCommand::Restart)
        );
        assert_eq!(parse_command("Start Reading"), Some(VoiceCommand::Start));
    }

    #[test]
    fn maps_each_phrase() {
        assert_eq!(parse_command("pause"), Some(VoiceCommand::Pause));
        assert_eq!(parse_command("stop now"), Some(VoiceCommand::Pause));
        assert_eq!(parse_command("resume"), Some(VoiceCommand::Resume));
        assert_eq!(
            parse_command("increase speed please"),
            Some(VoiceCommand::IncreaseSpeed)
        );
        assert_eq!(
            parse_command("DECREASE SPEED"),
            Some(VoiceCommand::DecreaseSpeed)
        );
    }

    #[test]
    fn earlier_rows_take_priority() {
        // "stop" outranks "resume" and the speed commands.
        assert_eq!(parse_command("resume or stop"), Some(VoiceCommand::Pause));
        assert_eq!(
            parse_command("stop and increase speed"),
            Some(VoiceCommand::Pause)
        );
        // Substring matching: "startled" still contains "start".
        assert_eq!(parse_command("I was startled"), Some(VoiceCommand::Start));
    }

    #[test]
    fn unmatched_phrases_are_ignored() {
        assert_eq!(parse_command("what time is it"), None);
        assert_eq!(parse_command("speed"), None);
        assert_eq!(parse_command(""), None);
    }
}
